//! Pose capture session for enrollment.

use crate::types::{Encoding, EncodingError};
use thiserror::Error;

/// Poses walked through during enrollment, in order.
pub const POSES: [&str; 10] = [
    "Front", "Right", "Left", "Pose 1", "Pose 2", "Pose 3", "Pose 4", "Pose 5", "Pose 6", "Pose 7",
];

#[derive(Error, Debug, PartialEq)]
pub enum EnrollError {
    #[error("pose capture incomplete: {captured} of {required} poses")]
    Incomplete { captured: usize, required: usize },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// Collects one encoding per pose and averages them once all are present.
#[derive(Debug, Default)]
pub struct PoseSession {
    captured: Vec<Encoding>,
}

impl PoseSession {
    pub fn new() -> Self {
        Self {
            captured: Vec::with_capacity(POSES.len()),
        }
    }

    /// Label of the pose awaiting capture, or `None` when all are captured.
    pub fn current_pose(&self) -> Option<&'static str> {
        POSES.get(self.captured.len()).copied()
    }

    /// Record the encoding for the current pose.
    ///
    /// Returns `false` and drops the encoding once every pose is captured.
    #[must_use]
    pub fn record(&mut self, encoding: Encoding) -> bool {
        if self.current_pose().is_none() {
            tracing::warn!("pose encoding recorded after all poses were captured");
            return false;
        }
        self.captured.push(encoding);
        true
    }

    pub fn captured(&self) -> usize {
        self.captured.len()
    }

    pub fn is_complete(&self) -> bool {
        self.captured.len() == POSES.len()
    }

    /// Average of all pose encodings; fails unless every pose was captured.
    pub fn finish(self) -> Result<Encoding, EnrollError> {
        if !self.is_complete() {
            return Err(EnrollError::Incomplete {
                captured: self.captured.len(),
                required: POSES.len(),
            });
        }
        Ok(Encoding::mean(&self.captured)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_order() {
        assert_eq!(&POSES[..3], ["Front", "Right", "Left"]);
        assert_eq!(POSES[9], "Pose 7");
    }

    #[test]
    fn test_session_walks_poses() {
        let mut session = PoseSession::new();
        for (i, pose) in POSES.iter().enumerate() {
            assert_eq!(session.current_pose(), Some(*pose));
            assert!(session.record(Encoding::new(vec![i as f32, 1.0])));
        }
        assert_eq!(session.current_pose(), None);
        assert!(session.is_complete());

        let mean = session.finish().unwrap();
        assert_eq!(mean.values, vec![4.5, 1.0]);
    }

    #[test]
    fn test_record_rejected_after_complete() {
        let mut session = PoseSession::new();
        for _ in 0..POSES.len() {
            assert!(session.record(Encoding::new(vec![0.0])));
        }
        assert!(!session.record(Encoding::new(vec![1.0])));
        assert!(!session.record(Encoding::new(vec![1.0])));
        assert_eq!(session.captured(), POSES.len());
        assert_eq!(session.finish().unwrap().values, vec![0.0]);
    }

    #[test]
    fn test_finish_incomplete() {
        let mut session = PoseSession::new();
        assert!(session.record(Encoding::new(vec![0.0])));
        assert_eq!(
            session.finish(),
            Err(EnrollError::Incomplete { captured: 1, required: 10 })
        );
    }
}
