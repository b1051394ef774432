use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Euclidean distance under which two encodings belong to the same person.
pub const DEFAULT_TOLERANCE: f32 = 0.4;

#[derive(Error, Debug, PartialEq)]
pub enum EncodingError {
    #[error("cannot average an empty set of encodings")]
    Empty,
    #[error("encoding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Face encoding: a fixed-length feature vector (512 values for ArcFace).
///
/// Serialized as a bare JSON array of floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    pub values: Vec<f32>,
}

impl Encoding {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    /// Euclidean distance between two encodings, or `None` when their
    /// dimensions differ or either is empty.
    pub fn distance(&self, other: &Encoding) -> Option<f32> {
        if self.values.is_empty() || self.dim() != other.dim() {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(other.values.iter())
                .map(|(a, b)| (a - b).powi(2))
                .sum::<f32>()
                .sqrt(),
        )
    }

    /// Element-wise arithmetic mean of a set of encodings.
    ///
    /// All encodings must share the dimension of the first one.
    pub fn mean(samples: &[Encoding]) -> Result<Encoding, EncodingError> {
        let first = samples.first().ok_or(EncodingError::Empty)?;
        let dim = first.dim();
        let mut sum = vec![0.0f64; dim];

        for sample in samples {
            if sample.dim() != dim {
                return Err(EncodingError::DimensionMismatch {
                    expected: dim,
                    actual: sample.dim(),
                });
            }
            for (acc, v) in sum.iter_mut().zip(&sample.values) {
                *acc += *v as f64;
            }
        }

        let n = samples.len() as f64;
        Ok(Encoding {
            values: sum.into_iter().map(|s| (s / n) as f32).collect(),
        })
    }
}

/// Bounding box of a detected face in frame pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceBox {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub score: f32,
    /// Five-point landmarks: [left_eye, right_eye, nose, left_mouth, right_mouth].
    pub landmarks: Option<[(f32, f32); 5]>,
}

impl FaceBox {
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn area(&self) -> f32 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Intersection-over-union with another box.
    pub fn iou(&self, other: &FaceBox) -> f32 {
        let inter = FaceBox {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
            score: 0.0,
            landmarks: None,
        }
        .area();

        let union = self.area() + other.area() - inter;
        if union > 0.0 {
            inter / union
        } else {
            0.0
        }
    }
}

/// A gallery entry that satisfied the tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    pub index: usize,
    pub distance: f32,
}

/// Strategy for picking a gallery entry for a probe encoding.
pub trait Matcher {
    fn find(&self, probe: &Encoding, gallery: &[Encoding], tolerance: f32) -> Option<MatchResult>;
}

/// Returns the first gallery entry within tolerance, in gallery order.
///
/// Entries whose dimension differs from the probe never match.
pub struct FirstMatch;

impl Matcher for FirstMatch {
    fn find(&self, probe: &Encoding, gallery: &[Encoding], tolerance: f32) -> Option<MatchResult> {
        gallery.iter().enumerate().find_map(|(index, enc)| {
            let distance = probe.distance(enc)?;
            (distance <= tolerance).then_some(MatchResult { index, distance })
        })
    }
}

/// Returns the closest gallery entry, if it is within tolerance.
pub struct NearestMatch;

impl Matcher for NearestMatch {
    fn find(&self, probe: &Encoding, gallery: &[Encoding], tolerance: f32) -> Option<MatchResult> {
        gallery
            .iter()
            .enumerate()
            .filter_map(|(index, enc)| Some(MatchResult {
                index,
                distance: probe.distance(enc)?,
            }))
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .filter(|m| m.distance <= tolerance)
    }
}

/// Which [`Matcher`] to use, as selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPolicy {
    #[default]
    First,
    Nearest,
}

impl MatchPolicy {
    pub fn matcher(self) -> &'static dyn Matcher {
        match self {
            MatchPolicy::First => &FirstMatch,
            MatchPolicy::Nearest => &NearestMatch,
        }
    }
}

impl std::str::FromStr for MatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" => Ok(MatchPolicy::First),
            "nearest" => Ok(MatchPolicy::Nearest),
            other => Err(format!("unknown match policy: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enc(values: &[f32]) -> Encoding {
        Encoding::new(values.to_vec())
    }

    #[test]
    fn test_distance_identical() {
        let a = enc(&[0.1, 0.2, 0.3]);
        assert!(a.distance(&a).unwrap().abs() < 1e-6);
    }

    #[test]
    fn test_distance_known() {
        let a = enc(&[0.0, 0.0]);
        let b = enc(&[3.0, 4.0]);
        assert!((a.distance(&b).unwrap() - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_distance_undefined_across_dimensions() {
        assert_eq!(enc(&[0.1, 0.2]).distance(&enc(&[0.1])), None);
        assert_eq!(enc(&[0.1, 0.2]).distance(&enc(&[])), None);
        assert_eq!(enc(&[]).distance(&enc(&[])), None);
    }

    #[test]
    fn test_mismatched_gallery_entry_never_matches() {
        let gallery = vec![enc(&[]), enc(&[0.0]), enc(&[0.9, 0.0])];
        let probe = enc(&[0.0, 0.0]);
        assert!(FirstMatch.find(&probe, &gallery, DEFAULT_TOLERANCE).is_none());
        assert!(NearestMatch.find(&probe, &gallery, DEFAULT_TOLERANCE).is_none());

        let gallery = vec![enc(&[]), enc(&[0.1, 0.0])];
        assert_eq!(FirstMatch.find(&probe, &gallery, DEFAULT_TOLERANCE).map(|m| m.index), Some(1));
    }

    #[test]
    fn test_mean_elementwise() {
        let samples = vec![enc(&[1.0, 0.0, 2.0]), enc(&[3.0, 2.0, 2.0])];
        let mean = Encoding::mean(&samples).unwrap();
        assert_eq!(mean.values, vec![2.0, 1.0, 2.0]);
    }

    #[test]
    fn test_mean_of_ten_unit_vectors() {
        let samples: Vec<Encoding> = (0..10)
            .map(|i| {
                let mut v = vec![0.0f32; 10];
                v[i] = 1.0;
                enc(&v)
            })
            .collect();
        let mean = Encoding::mean(&samples).unwrap();
        assert!(mean.values.iter().all(|&v| (v - 0.1).abs() < 1e-6));
    }

    #[test]
    fn test_mean_empty() {
        assert_eq!(Encoding::mean(&[]), Err(EncodingError::Empty));
    }

    #[test]
    fn test_mean_dimension_mismatch() {
        let samples = vec![enc(&[1.0, 2.0]), enc(&[1.0])];
        assert_eq!(
            Encoding::mean(&samples),
            Err(EncodingError::DimensionMismatch { expected: 2, actual: 1 })
        );
    }

    #[test]
    fn test_first_match_wins_over_closer() {
        // Probe is within tolerance of both; the second is closer.
        let gallery = vec![enc(&[0.3, 0.0]), enc(&[0.05, 0.0])];
        let probe = enc(&[0.0, 0.0]);

        let first = FirstMatch.find(&probe, &gallery, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(first.index, 0);

        let nearest = NearestMatch.find(&probe, &gallery, DEFAULT_TOLERANCE).unwrap();
        assert_eq!(nearest.index, 1);
    }

    #[test]
    fn test_match_tolerance_inclusive() {
        let gallery = vec![enc(&[0.4, 0.0])];
        let probe = enc(&[0.0, 0.0]);
        assert!(FirstMatch.find(&probe, &gallery, 0.4).is_some());
        assert!(FirstMatch.find(&probe, &gallery, 0.39).is_none());
    }

    #[test]
    fn test_no_match_outside_tolerance() {
        let gallery = vec![enc(&[1.0, 0.0]), enc(&[0.0, 1.0])];
        let probe = enc(&[-1.0, 0.0]);
        assert!(FirstMatch.find(&probe, &gallery, DEFAULT_TOLERANCE).is_none());
        assert!(NearestMatch.find(&probe, &gallery, DEFAULT_TOLERANCE).is_none());
    }

    #[test]
    fn test_empty_gallery() {
        let probe = enc(&[1.0, 0.0]);
        assert!(FirstMatch.find(&probe, &[], DEFAULT_TOLERANCE).is_none());
        assert!(NearestMatch.find(&probe, &[], DEFAULT_TOLERANCE).is_none());
    }

    #[test]
    fn test_match_policy_parse() {
        assert_eq!("first".parse::<MatchPolicy>(), Ok(MatchPolicy::First));
        assert_eq!(" Nearest ".parse::<MatchPolicy>(), Ok(MatchPolicy::Nearest));
        assert!("best".parse::<MatchPolicy>().is_err());
    }

    #[test]
    fn test_iou() {
        let a = FaceBox { left: 0.0, top: 0.0, right: 10.0, bottom: 10.0, score: 1.0, landmarks: None };
        let b = FaceBox { left: 5.0, ..a.clone() };
        let c = FaceBox { left: 20.0, top: 20.0, right: 30.0, bottom: 30.0, ..a.clone() };
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);
        // Overlap 5x10 = 50; union 100 + 50 - 50 = 100
        assert!((a.iou(&b) - 0.5).abs() < 1e-6);
        assert_eq!(a.iou(&c), 0.0);
    }
}
