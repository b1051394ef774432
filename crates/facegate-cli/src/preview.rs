//! Preview window backed by `minifb`.

use crate::flows::{Preview, Signal};
use crate::overlay::Overlay;
use anyhow::{Context, Result};
use facegate_hw::Frame;
use minifb::{Key, KeyRepeat, Window, WindowOptions};

pub struct PreviewWindow {
    window: Window,
    buffer: Vec<u32>,
}

impl PreviewWindow {
    pub fn open(title: &str, width: u32, height: u32) -> Result<Self> {
        let window = Window::new(title, width as usize, height as usize, WindowOptions::default())
            .with_context(|| format!("failed to open preview window '{title}'"))?;
        tracing::debug!(title, width, height, "preview window opened");

        Ok(Self {
            window,
            buffer: Vec::new(),
        })
    }
}

impl Preview for PreviewWindow {
    fn present(&mut self, frame: &Frame, overlay: &Overlay) -> Result<Option<Signal>> {
        if !self.window.is_open() {
            return Ok(Some(Signal::Cancel));
        }

        let canvas = overlay.render(frame);
        self.buffer.clear();
        self.buffer
            .extend(canvas.pixels().map(|p| u32::from_be_bytes([0, p[0], p[1], p[2]])));

        self.window
            .update_with_buffer(&self.buffer, canvas.width() as usize, canvas.height() as usize)
            .context("failed to update preview window")?;

        Ok(signal_for(&self.window.get_keys_pressed(KeyRepeat::No)))
    }
}

/// Escape cancels, space confirms; escape wins if both arrive in one frame.
fn signal_for(keys: &[Key]) -> Option<Signal> {
    if keys.contains(&Key::Escape) {
        Some(Signal::Cancel)
    } else if keys.contains(&Key::Space) {
        Some(Signal::Confirm)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_for_keys() {
        assert_eq!(signal_for(&[]), None);
        assert_eq!(signal_for(&[Key::A]), None);
        assert_eq!(signal_for(&[Key::Space]), Some(Signal::Confirm));
        assert_eq!(signal_for(&[Key::Space, Key::Escape]), Some(Signal::Cancel));
    }
}
