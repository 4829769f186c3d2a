use std::path::PathBuf;

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use super::{Color, OverlayItem, RenderConfig, Renderer};
use crate::detect::BoundingBox;
use crate::frame::Frame;

/// Text height in pixels, close to a 1.3 scale Hershey font.
const TEXT_SCALE: f32 = 40.0;

/// Renderer that writes each presented frame, overlay included, to an image
/// file. The file is overwritten every frame so it always shows the latest
/// view; the format follows the file extension.
pub struct SnapshotRenderer {
    path: PathBuf,
    font: Option<FontVec>,
    overlay: Vec<OverlayItem>,
    presented: u64,
}

impl SnapshotRenderer {
    pub fn new(config: &RenderConfig) -> Result<Self> {
        let path = config
            .snapshot_path
            .clone()
            .ok_or_else(|| anyhow!("snapshot renderer requires render.snapshot_path"))?;
        let font = match &config.font_path {
            Some(font_path) => {
                let bytes = std::fs::read(font_path)
                    .with_context(|| format!("failed to read font {}", font_path.display()))?;
                let font = FontVec::try_from_vec(bytes)
                    .map_err(|err| anyhow!("invalid font {}: {}", font_path.display(), err))?;
                Some(font)
            }
            None => {
                log::info!("no render.font_path configured; overlay text will be logged only");
                None
            }
        };
        log::info!("[{}] writing snapshots to {}", config.window, path.display());
        Ok(Self {
            path,
            font,
            overlay: Vec::new(),
            presented: 0,
        })
    }

    fn to_image(frame: &Frame) -> Result<RgbImage> {
        if frame.channels() != 3 {
            return Err(anyhow!(
                "snapshot expects RGB frames, got {} channels",
                frame.channels()
            ));
        }
        RgbImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
            .ok_or_else(|| anyhow!("frame buffer does not match its dimensions"))
    }

    fn pixel_rect(bbox: &BoundingBox, width: u32, height: u32) -> Option<Rect> {
        let left = (bbox.left() * width as f32).max(0.0);
        let top = (bbox.top() * height as f32).max(0.0);
        let right = (bbox.right() * width as f32).min(width as f32);
        let bottom = (bbox.bottom() * height as f32).min(height as f32);
        let w = (right - left) as u32;
        let h = (bottom - top) as u32;
        (w > 0 && h > 0).then(|| Rect::at(left as i32, top as i32).of_size(w, h))
    }
}

impl Renderer for SnapshotRenderer {
    fn draw_box(&mut self, bbox: &BoundingBox, color: Color) {
        self.overlay.push(OverlayItem::Box { bbox: *bbox, color });
    }

    fn draw_text(&mut self, text: &str, x: i32, y: i32, color: Color) {
        self.overlay.push(OverlayItem::Text {
            text: text.to_string(),
            x,
            y,
            color,
        });
    }

    fn present(&mut self, frame: &Frame) -> Result<()> {
        let overlay = std::mem::take(&mut self.overlay);
        let mut image = Self::to_image(frame)?;
        let (width, height) = image.dimensions();

        for item in &overlay {
            match item {
                OverlayItem::Box { bbox, color } => {
                    if let Some(rect) = Self::pixel_rect(bbox, width, height) {
                        draw_hollow_rect_mut(&mut image, rect, Rgb(color.0));
                    }
                }
                OverlayItem::Text { text, x, y, color } => match &self.font {
                    // The anchor is the text baseline; imageproc draws from the top.
                    Some(font) => draw_text_mut(
                        &mut image,
                        Rgb(color.0),
                        *x,
                        (*y as f32 - TEXT_SCALE).max(0.0) as i32,
                        PxScale::from(TEXT_SCALE),
                        font,
                        text,
                    ),
                    None => log::debug!("overlay text '{}' at ({}, {})", text, x, y),
                },
            }
        }

        image
            .save(&self.path)
            .with_context(|| format!("failed to write snapshot {}", self.path.display()))?;
        self.presented += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_snapshot_with_box() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("latest.png");
        let config = RenderConfig {
            snapshot_path: Some(path.clone()),
            ..RenderConfig::default()
        };
        let mut renderer = SnapshotRenderer::new(&config)?;
        let frame = Frame::new(40, 20, 3)?;

        renderer.draw_box(&BoundingBox::new(0.5, 0.5, 0.5, 0.5), Color::GREEN);
        renderer.draw_text("RIGHT", 60, 60, Color::RED);
        renderer.present(&frame)?;

        let written = image::open(&path)?.to_rgb8();
        assert_eq!(written.dimensions(), (40, 20));
        assert_eq!(written.get_pixel(10, 5), &Rgb([0, 255, 0]));
        assert_eq!(written.get_pixel(20, 10), &Rgb([0, 0, 0]));
        Ok(())
    }

    #[test]
    fn box_outside_frame_is_skipped() {
        let bbox = BoundingBox::new(1.5, 0.5, 0.2, 0.2);
        assert!(SnapshotRenderer::pixel_rect(&bbox, 40, 20).is_none());
    }
}
