//! V4L2 camera device.
//!
//! Requests packed RGB at the configured size and accepts whatever the
//! driver settles on, converting YUYV or NV12 buffers to RGB in place.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use ouroboros::self_referencing;

use super::normalize::{normalize_into, PixelFormat};
use super::{CameraConfig, CameraStats};
use crate::frame::Frame;

pub struct V4l2Camera {
    config: CameraConfig,
    state: Option<V4l2State>,
    format: PixelFormat,
    frame_count: u64,
    failures: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct V4l2State {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl V4l2Camera {
    pub fn new(config: CameraConfig) -> Result<Self> {
        Ok(Self {
            active_width: config.width,
            active_height: config.height,
            config,
            state: None,
            format: PixelFormat::Rgb24,
            frame_count: 0,
            failures: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    pub fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(&self.config.device)
            .with_context(|| format!("open v4l2 device {}", self.config.device))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = self.config.width;
        format.height = self.config.height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!(
                    "Camera: failed to set format on {}: {}",
                    self.config.device,
                    err
                );
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        self.format = PixelFormat::from_fourcc(&format.fourcc.repr).ok_or_else(|| {
            anyhow!(
                "v4l2 device {} delivers unsupported pixel format {}",
                self.config.device,
                format.fourcc
            )
        })?;

        if self.config.target_fps > 0 {
            let params = v4l::video::capture::Parameters::with_fps(self.config.target_fps);
            if let Err(err) = device.set_params(&params) {
                log::warn!(
                    "Camera: failed to set fps on {}: {}",
                    self.config.device,
                    err
                );
            }
        }

        self.active_width = format.width;
        self.active_height = format.height;
        self.last_error = None;

        let state = V4l2StateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()
        .map_err(|err| {
            self.last_error = Some(err.to_string());
            err
        })?;
        self.state = Some(state);

        log::info!(
            "Camera: connected to {} ({}x{} {:?})",
            self.config.device,
            self.active_width,
            self.active_height,
            self.format
        );
        Ok(())
    }

    pub fn read_into(&mut self, frame: &mut Frame) -> Result<()> {
        use v4l::io::traits::CaptureStream;

        let (width, height, format) = (self.active_width, self.active_height, self.format);
        let state = self.state.as_mut().context("v4l2 device not connected")?;
        let result = state.with_mut(|fields| -> Result<()> {
            let (buf, meta) = fields
                .stream
                .next()
                .map_err(|err| anyhow::Error::new(err).context("capture v4l2 frame"))?;
            // Drivers may hand back a buffer larger than the payload.
            let used = (meta.bytesused as usize).min(buf.len());
            let payload = if used == 0 { buf } else { &buf[..used] };
            normalize_into(payload, width, height, format, frame)
        });

        match result {
            Ok(()) => {
                self.frame_count += 1;
                self.last_frame_at = Some(Instant::now());
                self.last_error = None;
                Ok(())
            }
            Err(err) => {
                self.failures += 1;
                self.last_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub fn is_healthy(&self) -> bool {
        if self.state.is_none() || self.last_error.is_some() {
            return false;
        }
        let Some(last_frame_at) = self.last_frame_at else {
            return true;
        };
        last_frame_at.elapsed() <= self.health_grace()
    }

    pub fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            failures: self.failures,
            device: self.config.device.clone(),
        }
    }

    pub fn close(&mut self) {
        if self.state.take().is_some() {
            log::info!("Camera: released {}", self.config.device);
        }
    }

    fn health_grace(&self) -> Duration {
        let base_ms = if self.config.target_fps == 0 {
            2_000
        } else {
            (1000 / self.config.target_fps).saturating_mul(6)
        };
        Duration::from_millis(base_ms.max(2_000) as u64)
    }
}
