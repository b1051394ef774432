//! SCRFD face detector via ONNX Runtime.
//!
//! Letterboxes the grayscale frame into the 640×640 model input, decodes the
//! three anchor-free stride heads, and suppresses overlaps with NMS.

use crate::types::FaceBox;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const INPUT_SIZE: usize = 640;
const PIXEL_MEAN: f32 = 127.5;
const PIXEL_STD: f32 = 128.0;
const SCORE_THRESHOLD: f32 = 0.5;
const NMS_IOU: f32 = 0.4;
const STRIDES: [usize; 3] = [8, 16, 32];
const ANCHORS_PER_CELL: usize = 2;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("detection model not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("frame is {actual} bytes, expected {expected} for {width}x{height}")]
    BadFrame {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Output slots of one stride head: score, bbox, keypoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeadOutputs {
    score: usize,
    bbox: usize,
    kps: usize,
}

/// SCRFD-based face detector.
pub struct FaceDetector {
    session: Session,
    heads: [HeadOutputs; 3],
}

impl FaceDetector {
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        if names.len() < 9 {
            return Err(DetectorError::InferenceFailed(format!(
                "expected 9 outputs (score/bbox/kps per stride), model has {}",
                names.len()
            )));
        }

        let heads = map_heads(&names);
        tracing::info!(path = model_path, outputs = ?names, ?heads, "loaded SCRFD model");

        Ok(Self { session, heads })
    }

    /// Detect faces in a grayscale frame, most confident first.
    pub fn detect(&mut self, gray: &[u8], width: u32, height: u32) -> Result<Vec<FaceBox>, DetectorError> {
        let expected = width as usize * height as usize;
        if gray.len() < expected || expected == 0 {
            return Err(DetectorError::BadFrame {
                width,
                height,
                expected,
                actual: gray.len(),
            });
        }

        let letterbox = Letterbox::fit(width as usize, height as usize, INPUT_SIZE);
        let input = letterbox.tensor(gray);

        let outputs = self.session.run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let mut candidates = Vec::new();
        for (head, &stride) in self.heads.iter().zip(STRIDES.iter()) {
            let tensor = |slot: usize, what: &str| {
                outputs[slot]
                    .try_extract_tensor::<f32>()
                    .map(|(_, data)| data)
                    .map_err(|e| DetectorError::InferenceFailed(format!("{what} stride {stride}: {e}")))
            };
            let scores = tensor(head.score, "scores")?;
            let bboxes = tensor(head.bbox, "bboxes")?;
            let kps = tensor(head.kps, "kps")?;

            candidates.extend(decode_head(scores, bboxes, kps, stride, &letterbox));
        }

        let faces = suppress(candidates, NMS_IOU);
        tracing::debug!(faces = faces.len(), "detection complete");
        Ok(faces)
    }
}

/// Map output tensors to stride heads.
///
/// Uses `score_8`/`bbox_8`/`kps_8`-style names when every one is present,
/// otherwise the conventional export order: scores 0-2, bboxes 3-5, kps 6-8.
fn map_heads(names: &[String]) -> [HeadOutputs; 3] {
    let slot = |prefix: &str, stride: usize| {
        let wanted = format!("{prefix}_{stride}");
        names.iter().position(|n| *n == wanted)
    };

    let named: Option<Vec<HeadOutputs>> = STRIDES
        .iter()
        .map(|&s| {
            Some(HeadOutputs {
                score: slot("score", s)?,
                bbox: slot("bbox", s)?,
                kps: slot("kps", s)?,
            })
        })
        .collect();

    match named {
        Some(h) => [h[0], h[1], h[2]],
        None => std::array::from_fn(|i| HeadOutputs {
            score: i,
            bbox: i + 3,
            kps: i + 6,
        }),
    }
}

/// Uniform scale plus centered padding that fits a frame into the square model input.
#[derive(Debug, Clone, Copy)]
struct Letterbox {
    src_w: usize,
    src_h: usize,
    size: usize,
    scale: f32,
    scaled_w: usize,
    scaled_h: usize,
    pad_x: usize,
    pad_y: usize,
}

impl Letterbox {
    fn fit(src_w: usize, src_h: usize, size: usize) -> Self {
        let scale = (size as f32 / src_w as f32).min(size as f32 / src_h as f32);
        let scaled_w = ((src_w as f32 * scale).round() as usize).min(size);
        let scaled_h = ((src_h as f32 * scale).round() as usize).min(size);
        Self {
            src_w,
            src_h,
            size,
            scale,
            scaled_w,
            scaled_h,
            pad_x: (size - scaled_w) / 2,
            pad_y: (size - scaled_h) / 2,
        }
    }

    /// Map a point in model-input space back to frame space.
    fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_x as f32) / self.scale,
            (y - self.pad_y as f32) / self.scale,
        )
    }

    /// Bilinear sample of the source frame at the given model-input pixel.
    fn sample(&self, gray: &[u8], x: usize, y: usize) -> f32 {
        let sx = ((x - self.pad_x) as f32 + 0.5) / self.scale - 0.5;
        let sy = ((y - self.pad_y) as f32 + 0.5) / self.scale - 0.5;

        let x0 = (sx.floor().max(0.0) as usize).min(self.src_w - 1);
        let y0 = (sy.floor().max(0.0) as usize).min(self.src_h - 1);
        let x1 = (x0 + 1).min(self.src_w - 1);
        let y1 = (y0 + 1).min(self.src_h - 1);
        let fx = (sx - x0 as f32).clamp(0.0, 1.0);
        let fy = (sy - y0 as f32).clamp(0.0, 1.0);

        let px = |x: usize, y: usize| gray[y * self.src_w + x] as f32;
        let top = px(x0, y0) * (1.0 - fx) + px(x1, y0) * fx;
        let bottom = px(x0, y1) * (1.0 - fx) + px(x1, y1) * fx;
        (top * (1.0 - fy) + bottom * fy).round()
    }

    /// Build the normalized NCHW input; padding normalizes to zero.
    fn tensor(&self, gray: &[u8]) -> Array4<f32> {
        let mut tensor = Array4::<f32>::zeros((1, 3, self.size, self.size));

        for y in self.pad_y..self.pad_y + self.scaled_h {
            for x in self.pad_x..self.pad_x + self.scaled_w {
                let v = (self.sample(gray, x, y) - PIXEL_MEAN) / PIXEL_STD;
                for c in 0..3 {
                    tensor[[0, c, y, x]] = v;
                }
            }
        }

        tensor
    }
}

/// Decode one stride head into frame-space boxes above the score threshold.
fn decode_head(scores: &[f32], bboxes: &[f32], kps: &[f32], stride: usize, letterbox: &Letterbox) -> Vec<FaceBox> {
    let cols = letterbox.size / stride;
    let rows = letterbox.size / stride;
    let step = stride as f32;

    (0..rows * cols * ANCHORS_PER_CELL)
        .filter_map(|i| {
            let score = *scores.get(i)?;
            if score <= SCORE_THRESHOLD {
                return None;
            }
            let d = bboxes.get(i * 4..i * 4 + 4)?;

            let cell = i / ANCHORS_PER_CELL;
            let ax = (cell % cols) as f32 * step;
            let ay = (cell / cols) as f32 * step;

            let (left, top) = letterbox.unmap(ax - d[0] * step, ay - d[1] * step);
            let (right, bottom) = letterbox.unmap(ax + d[2] * step, ay + d[3] * step);

            let landmarks = kps.get(i * 10..i * 10 + 10).map(|k| {
                std::array::from_fn(|p| letterbox.unmap(ax + k[p * 2] * step, ay + k[p * 2 + 1] * step))
            });

            Some(FaceBox {
                left,
                top,
                right,
                bottom,
                score,
                landmarks,
            })
        })
        .collect()
}

/// Greedy non-maximum suppression; output is sorted by descending score.
fn suppress(mut candidates: Vec<FaceBox>, iou_threshold: f32) -> Vec<FaceBox> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<FaceBox> = Vec::new();
    for face in candidates {
        if kept.iter().all(|k| k.iou(&face) <= iou_threshold) {
            kept.push(face);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(left: f32, top: f32, size: f32, score: f32) -> FaceBox {
        FaceBox {
            left,
            top,
            right: left + size,
            bottom: top + size,
            score,
            landmarks: None,
        }
    }

    #[test]
    fn test_suppress_overlapping() {
        let faces = vec![
            face(5.0, 5.0, 100.0, 0.8),
            face(200.0, 200.0, 50.0, 0.7),
            face(0.0, 0.0, 100.0, 0.9),
        ];
        let kept = suppress(faces, NMS_IOU);
        assert_eq!(kept.len(), 2);
        assert!((kept[0].score - 0.9).abs() < 1e-6);
        assert!((kept[1].score - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_suppress_disjoint_sorted() {
        let faces = vec![face(0.0, 0.0, 10.0, 0.6), face(50.0, 50.0, 10.0, 0.95)];
        let kept = suppress(faces, NMS_IOU);
        assert_eq!(kept.len(), 2);
        assert!(kept[0].score > kept[1].score);
    }

    #[test]
    fn test_suppress_empty() {
        assert!(suppress(Vec::new(), NMS_IOU).is_empty());
    }

    #[test]
    fn test_letterbox_640x480() {
        let lb = Letterbox::fit(640, 480, INPUT_SIZE);
        assert!((lb.scale - 1.0).abs() < 1e-6);
        assert_eq!((lb.scaled_w, lb.scaled_h), (640, 480));
        assert_eq!((lb.pad_x, lb.pad_y), (0, 80));

        let (x, y) = lb.unmap(100.0, 130.0);
        assert!((x - 100.0).abs() < 1e-4);
        assert!((y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn test_letterbox_upscale_roundtrip() {
        let lb = Letterbox::fit(320, 240, INPUT_SIZE);
        assert!((lb.scale - 2.0).abs() < 1e-6);
        let (ox, oy) = (100.0f32, 50.0f32);
        let (x, y) = lb.unmap(ox * lb.scale + lb.pad_x as f32, oy * lb.scale + lb.pad_y as f32);
        assert!((x - ox).abs() < 0.1 && (y - oy).abs() < 0.1, "({x}, {y})");
    }

    #[test]
    fn test_tensor_uniform_frame_and_padding() {
        let gray = vec![128u8; 320 * 240];
        let lb = Letterbox::fit(320, 240, INPUT_SIZE);
        let t = lb.tensor(&gray);
        assert_eq!(t.shape(), &[1, 3, INPUT_SIZE, INPUT_SIZE]);

        let inside = (128.0 - PIXEL_MEAN) / PIXEL_STD;
        assert!((t[[0, 0, 320, 320]] - inside).abs() < 1e-6);
        assert_eq!(t[[0, 1, 320, 320]], t[[0, 2, 320, 320]]);
        // Row 0 is in the top padding band.
        assert_eq!(t[[0, 0, 0, 320]], 0.0);
    }

    #[test]
    fn test_decode_head_single_anchor() {
        let stride = 32;
        let lb = Letterbox::fit(640, 640, INPUT_SIZE);
        let cells = (INPUT_SIZE / stride).pow(2) * ANCHORS_PER_CELL;

        let mut scores = vec![0.0f32; cells];
        let mut bboxes = vec![0.0f32; cells * 4];
        let kps = vec![0.0f32; cells * 10];

        // Anchor 2 → cell 1 → (x=32, y=0); box extends one stride each way.
        scores[2] = 0.9;
        bboxes[8..12].copy_from_slice(&[1.0, 0.0, 1.0, 2.0]);

        let faces = decode_head(&scores, &bboxes, &kps, stride, &lb);
        assert_eq!(faces.len(), 1);
        let f = &faces[0];
        assert!((f.left - 0.0).abs() < 1e-4);
        assert!((f.top - 0.0).abs() < 1e-4);
        assert!((f.right - 64.0).abs() < 1e-4);
        assert!((f.bottom - 64.0).abs() < 1e-4);
        assert_eq!(f.landmarks.map(|l| l[0]), Some((32.0, 0.0)));
    }

    #[test]
    fn test_map_heads_named() {
        let names: Vec<String> = [
            "bbox_8", "kps_8", "score_8", "bbox_16", "kps_16", "score_16", "bbox_32", "kps_32", "score_32",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let heads = map_heads(&names);
        assert_eq!(heads[0], HeadOutputs { score: 2, bbox: 0, kps: 1 });
        assert_eq!(heads[2], HeadOutputs { score: 8, bbox: 6, kps: 7 });
    }

    #[test]
    fn test_map_heads_positional() {
        let names: Vec<String> = (0..9).map(|i: usize| (440 + i).to_string()).collect();
        let heads = map_heads(&names);
        assert_eq!(heads[1], HeadOutputs { score: 1, bbox: 4, kps: 7 });
    }
}
