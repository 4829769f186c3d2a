//! Camera acquisition.
//!
//! - `stub://...` devices render synthetic frames (tests and demos)
//! - device paths such as `/dev/video0` open a V4L2 camera (feature: ingest-v4l2)
//!
//! Every source writes into a caller-owned `Frame`, reshaping it when the
//! device size changes. Frames are never stored or forwarded by this layer.

pub mod normalize;
mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

pub use synthetic::SyntheticCamera;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Camera;

/// Device path prefix selecting the synthetic camera.
pub const STUB_DEVICE_PREFIX: &str = "stub://";

/// Configuration for the camera.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Device path (e.g., "/dev/video0") or `stub://name`.
    pub device: String,
    /// Preferred frame width.
    pub width: u32,
    /// Preferred frame height.
    pub height: u32,
    /// Requested frame rate; 0 leaves the driver default.
    pub target_fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            target_fps: 10,
        }
    }
}

/// Capture counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub failures: u64,
    pub device: String,
}

/// Camera frame source.
pub struct Camera {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "ingest-v4l2")]
    Device(V4l2Camera),
}

impl Camera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        if config.device.starts_with(STUB_DEVICE_PREFIX) {
            return Ok(Self::from_synthetic(SyntheticCamera::new(config)));
        }

        #[cfg(feature = "ingest-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::Device(V4l2Camera::new(config)?),
            })
        }

        #[cfg(not(feature = "ingest-v4l2"))]
        {
            anyhow::bail!(
                "camera device '{}' requires the ingest-v4l2 feature",
                config.device
            )
        }
    }

    /// Wrap a preconfigured synthetic camera.
    pub fn from_synthetic(camera: SyntheticCamera) -> Self {
        Self {
            backend: CameraBackend::Synthetic(camera),
        }
    }

    /// Open the device and start streaming.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.connect(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.connect(),
        }
    }

    /// Capture the next frame into `frame`.
    ///
    /// On error the contents of `frame` are unspecified and must not be
    /// processed.
    pub fn read_into(&mut self, frame: &mut Frame) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.read_into(frame),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.read_into(frame),
        }
    }

    /// Check if the camera is healthy.
    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.is_healthy(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(camera) => camera.stats(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.stats(),
        }
    }

    /// Release the device.
    pub fn close(&mut self) {
        match &mut self.backend {
            CameraBackend::Synthetic(camera) => camera.close(),
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(camera) => camera.close(),
        }
    }
}

impl Drop for Camera {
    fn drop(&mut self) {
        self.close();
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
