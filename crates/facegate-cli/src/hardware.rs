//! Camera-backed flows: opens the camera and preview for the span of each flow.

use crate::config::Config;
use crate::flows;
use crate::menu::CameraFlows;
use crate::preview::PreviewWindow;
use anyhow::{Context, Result};
use facegate_core::{DatasetStore, FaceEncoder};
use facegate_hw::Camera;
use std::io::Write;

pub struct Hardware {
    config: Config,
    encoder: Option<FaceEncoder>,
}

impl Hardware {
    pub fn new(config: Config) -> Self {
        Self { config, encoder: None }
    }

    fn open_camera(&self) -> Result<Camera> {
        let cfg = &self.config;
        Camera::open(&cfg.camera_device, cfg.frame_width, cfg.frame_height)
            .with_context(|| format!("failed to open camera {}", cfg.camera_device))
    }

    /// Face models are loaded on first use and kept for later flows.
    fn encoder(&mut self) -> Result<&mut FaceEncoder> {
        let encoder = match self.encoder.take() {
            Some(encoder) => encoder,
            None => FaceEncoder::load(&self.config.model_dir)
                .with_context(|| format!("failed to load face models from {}", self.config.model_dir.display()))?,
        };
        Ok(self.encoder.insert(encoder))
    }
}

impl CameraFlows for Hardware {
    fn enroll(&mut self, name: &str, store: &mut DatasetStore, out: &mut dyn Write) -> Result<()> {
        let camera = self.open_camera()?;
        let mut stream = camera.stream()?;
        let mut window = PreviewWindow::open("Capture Face", camera.width, camera.height)?;

        let outcome = flows::enroll(name, &mut stream, self.encoder()?, &mut window, store, out)?;
        tracing::info!(name, ?outcome, "enrollment finished");
        Ok(())
    }

    fn recognize(&mut self, store: &DatasetStore, out: &mut dyn Write) -> Result<()> {
        let camera = self.open_camera()?;
        let mut stream = camera.stream()?;
        let mut window = PreviewWindow::open("OpenFace", camera.width, camera.height)?;

        let matcher = self.config.match_policy.matcher();
        let tolerance = self.config.tolerance;
        flows::recognize(&mut stream, self.encoder()?, &mut window, store.dataset(), matcher, tolerance, out)?;
        Ok(())
    }
}
