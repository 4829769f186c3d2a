use anyhow::Result;

use super::{Color, OverlayItem, Renderer};
use crate::detect::BoundingBox;
use crate::frame::Frame;

/// Headless renderer: logs each presented frame and its overlay.
#[derive(Debug, Default)]
pub struct LogRenderer {
    window: String,
    overlay: Vec<OverlayItem>,
    last_overlay: Vec<OverlayItem>,
    draw_calls: u64,
    presented: u64,
}

impl LogRenderer {
    pub fn new(window: &str) -> Self {
        Self {
            window: window.to_string(),
            ..Self::default()
        }
    }

    /// Total `draw_box` and `draw_text` calls so far.
    pub fn draw_calls(&self) -> u64 {
        self.draw_calls
    }

    /// Frames presented so far.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Overlay shown with the most recent frame.
    pub fn last_overlay(&self) -> &[OverlayItem] {
        &self.last_overlay
    }

    /// Text items of the most recent frame, in draw order.
    pub fn last_texts(&self) -> Vec<&str> {
        self.last_overlay
            .iter()
            .filter_map(|item| match item {
                OverlayItem::Text { text, .. } => Some(text.as_str()),
                OverlayItem::Box { .. } => None,
            })
            .collect()
    }
}

impl Renderer for LogRenderer {
    fn draw_box(&mut self, bbox: &BoundingBox, color: Color) {
        self.draw_calls += 1;
        self.overlay.push(OverlayItem::Box { bbox: *bbox, color });
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, color: Color) {
        self.draw_calls += 1;
        self.overlay.push(OverlayItem::Text {
            text: text.to_string(),
            x,
            y,
            color,
        });
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        self.presented += 1;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!(
                "[{}] frame {} ({}x{}) overlay {:?}",
                self.window,
                self.presented,
                frame.width(),
                frame.height(),
                self.overlay
            );
        }
        self.last_overlay = std::mem::take(&mut self.overlay);
        Ok(())
    }
}
