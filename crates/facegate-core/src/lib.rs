//! facegate-core — face dataset, encoding and matching.
//!
//! Faces are located with SCRFD and encoded with ArcFace, both via ONNX
//! Runtime. Identities live in a JSON dataset of index-aligned encodings
//! and names.

pub mod alignment;
pub mod dataset;
pub mod detector;
pub mod encoder;
pub mod enrollment;
pub mod recognizer;
pub mod types;

pub use dataset::{Dataset, DatasetError, DatasetStore};
pub use encoder::{default_model_dir, EncoderError, FaceEncoder};
pub use enrollment::{EnrollError, PoseSession, POSES};
pub use types::{
    Encoding, EncodingError, FaceBox, FirstMatch, MatchPolicy, MatchResult, Matcher, NearestMatch,
    DEFAULT_TOLERANCE,
};
