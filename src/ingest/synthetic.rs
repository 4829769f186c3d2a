use anyhow::{anyhow, Result};

use super::{CameraConfig, CameraStats};
use crate::frame::Frame;

/// Synthetic camera for `stub://` devices.
///
/// Renders a dim gradient with a bright block sweeping left and right, in
/// step with the synthetic detector so the overlay lines up with the block.
pub struct SyntheticCamera {
    config: CameraConfig,
    frame_count: u64,
    failures: u64,
    fail_every: Option<u64>,
    attempts: u64,
    connected: bool,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            frame_count: 0,
            failures: 0,
            fail_every: None,
            attempts: 0,
            connected: false,
        }
    }

    /// Make every `n`th read fail, to exercise the skip path.
    pub fn fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    pub fn connect(&mut self) -> Result<()> {
        self.connected = true;
        log::info!(
            "Camera: connected to {} (synthetic, {}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    pub fn read_into(&mut self, frame: &mut Frame) -> Result<()> {
        if !self.connected {
            return Err(anyhow!("camera {} not connected", self.config.device));
        }
        self.attempts += 1;
        if let Some(n) = self.fail_every {
            if self.attempts % n == 0 {
                self.failures += 1;
                return Err(anyhow!("synthetic capture failure on read {}", self.attempts));
            }
        }

        self.frame_count += 1;
        frame.reshape(self.config.width, self.config.height, 3)?;
        self.render(frame);
        Ok(())
    }

    fn render(&self, frame: &mut Frame) {
        let width = self.config.width as usize;
        let height = self.config.height as usize;
        let phase = self.frame_count as f32 * 0.15;
        let cx = ((0.5 + 0.35 * phase.sin()) * width as f32) as usize;
        let cy = height / 2;
        let half = (width.min(height) / 8).max(1);

        for (i, px) in frame.pixels_mut().chunks_exact_mut(3).enumerate() {
            let x = i % width;
            let y = i / width;
            let inside = x.abs_diff(cx) <= half && y.abs_diff(cy) <= half;
            if inside {
                px.copy_from_slice(&[230, 200, 40]);
            } else {
                let shade = (32 + (x * 64) / width.max(1) + (y * 32) / height.max(1)) as u8;
                px.copy_from_slice(&[shade, shade, shade]);
            }
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.connected
    }

    pub fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            failures: self.failures,
            device: self.config.device.clone(),
        }
    }

    pub fn close(&mut self) {
        self.connected = false;
    }
}
