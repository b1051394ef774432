//! Detection and encoding behind one handle.

use crate::detector::{DetectorError, FaceDetector};
use crate::recognizer::{FaceRecognizer, RecognizerError};
use crate::types::{Encoding, FaceBox};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DETECTOR_MODEL: &str = "det_10g.onnx";
pub const RECOGNIZER_MODEL: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EncoderError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("recognizer error: {0}")]
    Recognizer(#[from] RecognizerError),
}

/// Locates faces in grayscale frames and turns them into encodings.
pub struct FaceEncoder {
    detector: FaceDetector,
    recognizer: FaceRecognizer,
}

impl FaceEncoder {
    /// Load both models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, EncoderError> {
        let model = |name: &str| model_dir.join(name).to_string_lossy().into_owned();

        let detector = FaceDetector::load(&model(DETECTOR_MODEL))?;
        let recognizer = FaceRecognizer::load(&model(RECOGNIZER_MODEL))?;
        tracing::info!(dir = %model_dir.display(), "face models ready");

        Ok(Self { detector, recognizer })
    }

    /// Face locations, most confident first.
    pub fn locate(&mut self, gray: &[u8], width: u32, height: u32) -> Result<Vec<FaceBox>, EncoderError> {
        Ok(self.detector.detect(gray, width, height)?)
    }

    pub fn encode(&mut self, gray: &[u8], width: u32, height: u32, face: &FaceBox) -> Result<Encoding, EncoderError> {
        Ok(self.recognizer.encode(gray, width, height, face)?)
    }
}

/// `$XDG_DATA_HOME/facegate/models`, falling back to `~/.local/share`.
pub fn default_model_dir() -> PathBuf {
    data_dir(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
    .join("models")
}

fn data_dir(xdg_data_home: Option<PathBuf>, home: Option<PathBuf>) -> PathBuf {
    xdg_data_home
        .unwrap_or_else(|| home.unwrap_or_else(|| PathBuf::from("/tmp")).join(".local/share"))
        .join("facegate")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_dir_prefers_xdg() {
        let dir = data_dir(Some("/xdg".into()), Some("/home/u".into()));
        assert_eq!(dir, PathBuf::from("/xdg/facegate"));
    }

    #[test]
    fn test_data_dir_home_fallback() {
        assert_eq!(data_dir(None, Some("/home/u".into())), PathBuf::from("/home/u/.local/share/facegate"));
        assert_eq!(data_dir(None, None), PathBuf::from("/tmp/.local/share/facegate"));
    }

    #[test]
    fn test_load_missing_models() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = FaceEncoder::load(dir.path()).err().unwrap();
        assert!(matches!(err, EncoderError::Detector(DetectorError::ModelNotFound(_))));
    }
}
