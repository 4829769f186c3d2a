//! Display of the annotated frame.
//!
//! The frame loop draws into an overlay (`draw_box`, `draw_text`) and then
//! hands the frame to `present`, which shows it together with the overlay
//! and clears the overlay for the next iteration. Every acquired frame is
//! presented, with or without annotations.
//!
//! - `LogRenderer`: headless, logs what would be shown
//! - `SnapshotRenderer`: rasterizes the overlay and writes the frame to an
//!   image file (feature: render-image)

mod headless;
#[cfg(feature = "render-image")]
mod snapshot;

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::detect::BoundingBox;
use crate::frame::Frame;

pub use headless::LogRenderer;
#[cfg(feature = "render-image")]
pub use snapshot::SnapshotRenderer;

/// Anchor of the direction text, in frame pixels.
pub const TEXT_ORIGIN: (i32, i32) = (60, 60);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    pub const RED: Color = Color([255, 0, 0]);
    pub const GREEN: Color = Color([0, 255, 0]);
}

/// One annotation queued for the next `present`.
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayItem {
    /// Box in normalized frame coordinates.
    Box { bbox: BoundingBox, color: Color },
    Text {
        text: String,
        x: i32,
        y: i32,
        color: Color,
    },
}

/// Display configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Window title.
    pub window: String,
    pub width: u32,
    pub height: u32,
    /// Where `SnapshotRenderer` writes the latest presented frame.
    pub snapshot_path: Option<PathBuf>,
    /// TrueType font for overlay text. Without one, text is logged only.
    pub font_path: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            window: "Main".to_string(),
            width: 800,
            height: 480,
            snapshot_path: None,
            font_path: None,
        }
    }
}

/// Render collaborator of the frame loop.
pub trait Renderer {
    /// Queue a box outline.
    fn draw_box(&mut self, bbox: &BoundingBox, color: Color);

    /// Queue a text label anchored at (x, y).
    fn draw_text(&mut self, text: &str, x: i32, y: i32, color: Color);

    /// Show `frame` with the queued overlay, then clear the overlay.
    fn present(&mut self, frame: &Frame) -> Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn draw_box(&mut self, bbox: &BoundingBox, color: Color) {
        (**self).draw_box(bbox, color)
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, color: Color) {
        (**self).draw_text(text, x, y, color)
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        (**self).present(frame)
    }
}

/// Renderer for the given configuration: snapshots when a path is set and
/// the `render-image` feature is enabled, logging otherwise.
pub fn renderer_for(config: &RenderConfig) -> Result<Box<dyn Renderer + Send>> {
    #[cfg(feature = "render-image")]
    if config.snapshot_path.is_some() {
        return Ok(Box::new(SnapshotRenderer::new(config)?));
    }

    #[cfg(not(feature = "render-image"))]
    if let Some(path) = &config.snapshot_path {
        log::warn!(
            "snapshot path {} ignored: built without the render-image feature",
            path.display()
        );
    }

    Ok(Box::new(LogRenderer::new(&config.window)))
}
