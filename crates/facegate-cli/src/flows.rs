//! Enrollment, recognition and deletion flows.
//!
//! Camera, face analysis and preview sit behind small traits so the flows
//! can be driven without hardware.

use crate::overlay::{Overlay, BLUE, GREEN, RED};
use anyhow::Result;
use facegate_core::{Dataset, DatasetError, DatasetStore, EnrollError, Encoding, FaceBox, FaceEncoder, Matcher, PoseSession};
use facegate_hw::{CameraError, Frame, FrameStream};
use std::io::{BufRead, Write};

pub const UNKNOWN: &str = "Unknown";
pub const DOOR_OPENED: &str = "Door Opened";
pub const DOOR_CLOSED: &str = "Door Closed";

/// Produces live frames.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Frame, CameraError>;
}

impl FrameSource for FrameStream<'_> {
    fn next_frame(&mut self) -> Result<Frame, CameraError> {
        FrameStream::next_frame(self)
    }
}

/// Locates and encodes faces in a frame.
pub trait FaceAnalyzer {
    /// Face locations, most confident first.
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceBox>>;
    fn encode(&mut self, frame: &Frame, face: &FaceBox) -> Result<Encoding>;
}

impl FaceAnalyzer for FaceEncoder {
    fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceBox>> {
        Ok(FaceEncoder::locate(self, &frame.data, frame.width, frame.height)?)
    }

    fn encode(&mut self, frame: &Frame, face: &FaceBox) -> Result<Encoding> {
        Ok(FaceEncoder::encode(self, &frame.data, frame.width, frame.height, face)?)
    }
}

/// Key input from the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Confirm,
    Cancel,
}

/// Live preview window.
pub trait Preview {
    /// Show `frame` with `overlay`; returns the key pressed since the last call, if any.
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<Option<Signal>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollOutcome {
    Enrolled,
    Cancelled,
    CameraFailed,
    Incomplete,
}

/// Capture one encoding per pose and store their mean under `name`.
///
/// Nothing is written unless every pose was captured.
pub fn enroll<W: Write + ?Sized>(
    name: &str,
    frames: &mut impl FrameSource,
    analyzer: &mut impl FaceAnalyzer,
    preview: &mut impl Preview,
    store: &mut DatasetStore,
    out: &mut W,
) -> Result<EnrollOutcome> {
    let mut session = PoseSession::new();

    while let Some(pose) = session.current_pose() {
        writeln!(out, "Please position your face for '{pose}' and press 'space' to save.")?;

        loop {
            let frame = match frames.next_frame() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, pose, "camera read failed during enrollment");
                    writeln!(out, "Failed to access the camera.")?;
                    return Ok(EnrollOutcome::CameraFailed);
                }
            };

            let mut overlay = Overlay::new();
            overlay.text(format!("{pose}: Press 'Space' to capture, 'Esc' to cancel."), 10, 30, 2, GREEN);

            match preview.present(&frame, &overlay)? {
                Some(Signal::Confirm) => {
                    let faces = analyzer.locate(&frame)?;
                    let Some(face) = faces.first() else {
                        tracing::debug!(pose, "no face in confirmed frame");
                        writeln!(out, "Face not detected. Please retry.")?;
                        continue;
                    };
                    let recorded = session.record(analyzer.encode(&frame, face)?);
                    debug_assert!(recorded, "pose loop ran past the last pose");
                    tracing::debug!(pose, score = face.score, captured = session.captured(), "pose captured");
                    writeln!(out, "Face for '{pose}' saved successfully.")?;
                    break;
                }
                Some(Signal::Cancel) => {
                    writeln!(out, "Capture cancelled.")?;
                    return Ok(EnrollOutcome::Cancelled);
                }
                None => {}
            }
        }
    }

    match session.finish() {
        Ok(mean) => {
            store.add(mean, name)?;
            writeln!(out, "Face '{name}' has been successfully added to the dataset.")?;
            Ok(EnrollOutcome::Enrolled)
        }
        Err(EnrollError::Incomplete { captured, required }) => {
            tracing::warn!(captured, required, "pose capture incomplete");
            writeln!(out, "Pose capture incomplete. Please try again.")?;
            Ok(EnrollOutcome::Incomplete)
        }
        Err(e) => Err(e.into()),
    }
}

/// Frames processed by a recognition run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RecognizeStats {
    pub frames: usize,
    pub faces: usize,
    pub matches: usize,
}

/// Identify the first face of each frame until cancelled or the camera fails.
pub fn recognize<W: Write + ?Sized>(
    frames: &mut impl FrameSource,
    analyzer: &mut impl FaceAnalyzer,
    preview: &mut impl Preview,
    dataset: &Dataset,
    matcher: &dyn Matcher,
    tolerance: f32,
    out: &mut W,
) -> Result<RecognizeStats> {
    let mut stats = RecognizeStats::default();

    loop {
        let frame = match frames.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "camera read failed during recognition");
                writeln!(out, "Failed to read frame from camera.")?;
                break;
            }
        };
        stats.frames += 1;

        let mut overlay = Overlay::new();
        let faces = analyzer.locate(&frame)?;
        let opened = match faces.first() {
            Some(face) => {
                stats.faces += 1;
                let probe = analyzer.encode(&frame, face)?;
                let name = dataset.identify(&probe, matcher, tolerance);
                tracing::debug!(seq = frame.sequence, name = name.unwrap_or(UNKNOWN), "face identified");

                overlay
                    .face(face, GREEN)
                    .text(name.unwrap_or(UNKNOWN), face.left as i32, face.top as i32 - 10, 2, BLUE);
                name.is_some()
            }
            None => false,
        };

        if opened {
            stats.matches += 1;
            overlay.text(DOOR_OPENED, 50, 50, 3, GREEN);
        } else {
            overlay.text(DOOR_CLOSED, 50, 50, 3, RED);
        }

        if preview.present(&frame, &overlay)? == Some(Signal::Cancel) {
            break;
        }
    }

    tracing::info!(frames = stats.frames, faces = stats.faces, matches = stats.matches, "recognition stopped");
    Ok(stats)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Removed(String),
    Cancelled,
    InvalidNumber,
    InvalidInput,
}

/// Print the enrolled names with 1-based indices.
pub fn list_names<W: Write + ?Sized>(store: &DatasetStore, out: &mut W) -> Result<()> {
    for (i, name) in store.names().iter().enumerate() {
        writeln!(out, "{}. {name}", i + 1)?;
    }
    Ok(())
}

/// List names, read a 1-based index or `c`, and remove that entry.
pub fn delete<R: BufRead, W: Write + ?Sized>(store: &mut DatasetStore, input: &mut R, out: &mut W) -> Result<DeleteOutcome> {
    writeln!(out, "List of names in the dataset:")?;
    list_names(store, out)?;

    write!(out, "Enter the number of the face you want to delete (or press 'c' to cancel): ")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    let choice = line.trim();

    if choice.eq_ignore_ascii_case("c") {
        writeln!(out, "Deletion cancelled.")?;
        return Ok(DeleteOutcome::Cancelled);
    }

    match choice.parse::<i64>() {
        Ok(number) => delete_number(store, number, out),
        // Digits too large for i64 are still a number, just not a listed one.
        Err(_) if is_integer(choice) => {
            writeln!(out, "Invalid number.")?;
            Ok(DeleteOutcome::InvalidNumber)
        }
        Err(_) => {
            writeln!(out, "Invalid input. Deletion cancelled.")?;
            Ok(DeleteOutcome::InvalidInput)
        }
    }
}

/// Remove the entry with the given 1-based `number`.
pub fn delete_number<W: Write + ?Sized>(store: &mut DatasetStore, number: i64, out: &mut W) -> Result<DeleteOutcome> {
    let index = match number.checked_sub(1).and_then(|n| usize::try_from(n).ok()) {
        Some(index) => index,
        None => {
            writeln!(out, "Invalid number.")?;
            return Ok(DeleteOutcome::InvalidNumber);
        }
    };

    match store.remove(index) {
        Ok(name) => {
            writeln!(out, "{name}'s face has been successfully removed from the dataset.")?;
            Ok(DeleteOutcome::Removed(name))
        }
        Err(DatasetError::IndexOutOfRange { .. }) => {
            writeln!(out, "Invalid number.")?;
            Ok(DeleteOutcome::InvalidNumber)
        }
        Err(e) => Err(e.into()),
    }
}

/// An optional sign followed by one or more ASCII digits.
fn is_integer(s: &str) -> bool {
    let digits = s.strip_prefix(&['+', '-'][..]).unwrap_or(s);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}
