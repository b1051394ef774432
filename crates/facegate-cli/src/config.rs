//! Runtime settings from `FACEGATE_*` environment variables.
//!
//! Unset or unparseable values fall back to the defaults.

use facegate_core::{MatchPolicy, DEFAULT_TOLERANCE};
use std::path::PathBuf;

/// Runtime configuration, loaded from environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Dataset JSON file (default: face_dataset.json in the working directory).
    pub dataset_path: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    /// Requested capture size; the driver may negotiate another.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Directory holding det_10g.onnx and w600k_r50.onnx.
    pub model_dir: PathBuf,
    /// Maximum Euclidean distance for a match.
    pub tolerance: f32,
    pub match_policy: MatchPolicy,
}

impl Config {
    /// Load configuration from `FACEGATE_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let parsed = |key: &str| var(key).and_then(|v| v.trim().parse().ok());

        Self {
            dataset_path: var("FACEGATE_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("face_dataset.json")),
            camera_device: var("FACEGATE_CAMERA_DEVICE").unwrap_or_else(|| "/dev/video0".to_string()),
            frame_width: parsed("FACEGATE_FRAME_WIDTH").unwrap_or(640),
            frame_height: parsed("FACEGATE_FRAME_HEIGHT").unwrap_or(480),
            model_dir: var("FACEGATE_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(facegate_core::default_model_dir),
            tolerance: var("FACEGATE_TOLERANCE")
                .and_then(|v| v.trim().parse::<f32>().ok())
                .filter(|t| t.is_finite() && *t >= 0.0)
                .unwrap_or(DEFAULT_TOLERANCE),
            match_policy: var("FACEGATE_MATCH_POLICY")
                .and_then(|v| v.parse().ok())
                .unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.dataset_path, PathBuf::from("face_dataset.json"));
        assert_eq!(cfg.camera_device, "/dev/video0");
        assert_eq!((cfg.frame_width, cfg.frame_height), (640, 480));
        assert_eq!(cfg.tolerance, 0.4);
        assert_eq!(cfg.match_policy, MatchPolicy::First);
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("FACEGATE_DATASET_PATH", "/var/lib/facegate/faces.json"),
            ("FACEGATE_CAMERA_DEVICE", "/dev/video2"),
            ("FACEGATE_FRAME_WIDTH", "1280"),
            ("FACEGATE_FRAME_HEIGHT", " 720 "),
            ("FACEGATE_MODEL_DIR", "/opt/models"),
            ("FACEGATE_TOLERANCE", "0.55"),
            ("FACEGATE_MATCH_POLICY", "nearest"),
        ]);
        assert_eq!(cfg.dataset_path, PathBuf::from("/var/lib/facegate/faces.json"));
        assert_eq!(cfg.camera_device, "/dev/video2");
        assert_eq!((cfg.frame_width, cfg.frame_height), (1280, 720));
        assert_eq!(cfg.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(cfg.tolerance, 0.55);
        assert_eq!(cfg.match_policy, MatchPolicy::Nearest);
    }

    #[test]
    fn test_bad_values_fall_back() {
        let cfg = config(&[
            ("FACEGATE_FRAME_WIDTH", "wide"),
            ("FACEGATE_TOLERANCE", "-1"),
            ("FACEGATE_MATCH_POLICY", "best"),
        ]);
        assert_eq!(cfg.frame_width, 640);
        assert_eq!(cfg.tolerance, DEFAULT_TOLERANCE);
        assert_eq!(cfg.match_policy, MatchPolicy::First);
    }
}
