//! Conversion of device pixel formats into packed RGB frames.

use anyhow::{anyhow, Result};

use crate::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb24,
    /// Packed 4:2:2, `Y0 U Y1 V` per pixel pair.
    Yuyv,
    Nv12,
}

impl PixelFormat {
    /// Format for a V4L2 fourcc code.
    pub fn from_fourcc(code: &[u8; 4]) -> Option<Self> {
        match code {
            b"RGB3" => Some(Self::Rgb24),
            b"YUYV" => Some(Self::Yuyv),
            b"NV12" => Some(Self::Nv12),
            _ => None,
        }
    }

    fn expected_len(&self, width: u32, height: u32) -> Result<usize> {
        let pixels = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        let len = match self {
            Self::Rgb24 => pixels.checked_mul(3),
            Self::Yuyv => pixels.checked_mul(2),
            Self::Nv12 => pixels.checked_add(pixels / 2),
        };
        len.ok_or_else(|| anyhow!("frame dimensions overflow"))
    }
}

/// Convert `pixels` into `frame`, reshaping it to `width` x `height` RGB.
///
/// The frame's buffer is reused when the size is unchanged.
pub fn normalize_into(
    pixels: &[u8],
    width: u32,
    height: u32,
    format: PixelFormat,
    frame: &mut Frame,
) -> Result<()> {
    let expected = format.expected_len(width, height)?;
    if pixels.len() != expected {
        return Err(anyhow!(
            "{:?} frame length mismatch: expected {}, got {}",
            format,
            expected,
            pixels.len()
        ));
    }
    if format == PixelFormat::Yuyv && width % 2 != 0 {
        return Err(anyhow!("YUYV frame width must be even (got {})", width));
    }
    if format == PixelFormat::Nv12 && (width % 2 != 0 || height % 2 != 0) {
        return Err(anyhow!(
            "NV12 frame dimensions must be even (got {}x{})",
            width,
            height
        ));
    }

    frame.reshape(width, height, 3)?;
    let out = frame.pixels_mut();
    match format {
        PixelFormat::Rgb24 => out.copy_from_slice(pixels),
        PixelFormat::Yuyv => yuyv_to_rgb(pixels, out),
        PixelFormat::Nv12 => nv12_to_rgb(pixels, width as usize, height as usize, out),
    }
    Ok(())
}

fn yuyv_to_rgb(pixels: &[u8], out: &mut [u8]) {
    for (pair, rgb) in pixels.chunks_exact(4).zip(out.chunks_exact_mut(6)) {
        let u = pair[1] as f32 - 128.0;
        let v = pair[3] as f32 - 128.0;
        write_rgb(pair[0] as f32, u, v, &mut rgb[..3]);
        write_rgb(pair[2] as f32, u, v, &mut rgb[3..]);
    }
}

fn nv12_to_rgb(pixels: &[u8], w: usize, h: usize, out: &mut [u8]) {
    let y_plane = w * h;
    for j in 0..h {
        for i in 0..w {
            let y = pixels[j * w + i] as f32;
            let uv_index = y_plane + (j / 2) * w + (i / 2) * 2;
            let u = pixels[uv_index] as f32 - 128.0;
            let v = pixels[uv_index + 1] as f32 - 128.0;
            let offset = (j * w + i) * 3;
            write_rgb(y, u, v, &mut out[offset..offset + 3]);
        }
    }
}

fn write_rgb(y: f32, u: f32, v: f32, out: &mut [u8]) {
    out[0] = clamp_to_u8(y + 1.402_f32 * v);
    out[1] = clamp_to_u8(y - 0.344_136_f32 * u - 0.714_136_f32 * v);
    out[2] = clamp_to_u8(y + 1.772_f32 * u);
}

fn clamp_to_u8(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
