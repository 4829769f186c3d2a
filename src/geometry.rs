//! Letterbox geometry between camera frames and the network input.
//!
//! `encode` scales a frame into the fixed network input without distortion
//! and centers it on neutral gray padding. `decode` maps boxes predicted in
//! letterboxed space back into original-frame space. Both sides derive the
//! scale and padding from the same four dimensions through `Letterbox::new`,
//! so the two directions never drift apart.

use crate::detect::BoundingBox;
use crate::error::FollowError;
use crate::frame::{Frame, LetterboxedFrame};

/// Scale and padding of one frame-size / network-size pair.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub frame_width: u32,
    pub frame_height: u32,
    pub net_width: u32,
    pub net_height: u32,
    /// min(net_width / frame_width, net_height / frame_height)
    pub scale: f32,
    /// Size of the scaled image inside the network input.
    pub inner_width: u32,
    pub inner_height: u32,
    /// Offset of the scaled image inside the network input.
    pub pad_x: u32,
    pub pad_y: u32,
}

impl Letterbox {
    pub fn new(
        frame_width: u32,
        frame_height: u32,
        net_width: u32,
        net_height: u32,
    ) -> Result<Self, FollowError> {
        FollowError::check_dimension("frame_width", frame_width)?;
        FollowError::check_dimension("frame_height", frame_height)?;
        FollowError::check_dimension("net_width", net_width)?;
        FollowError::check_dimension("net_height", net_height)?;

        let sx = net_width as f32 / frame_width as f32;
        let sy = net_height as f32 / frame_height as f32;

        // The limiting side fills the input exactly; the other side is
        // truncated to whole pixels.
        let (inner_width, inner_height) = if sx < sy {
            let h = (frame_height as u64 * net_width as u64) / frame_width as u64;
            (net_width, (h as u32).clamp(1, net_height))
        } else {
            let w = (frame_width as u64 * net_height as u64) / frame_height as u64;
            ((w as u32).clamp(1, net_width), net_height)
        };

        Ok(Self {
            frame_width,
            frame_height,
            net_width,
            net_height,
            scale: sx.min(sy),
            inner_width,
            inner_height,
            pad_x: (net_width - inner_width) / 2,
            pad_y: (net_height - inner_height) / 2,
        })
    }

    /// True when the frame already has the network's size.
    pub fn is_identity(&self) -> bool {
        self.frame_width == self.net_width && self.frame_height == self.net_height
    }

    /// Map a box from letterboxed space to original-frame space.
    pub fn decode_box(&self, b: &BoundingBox) -> BoundingBox {
        let (nw, nh) = (self.net_width as f32, self.net_height as f32);
        let (iw, ih) = (self.inner_width as f32, self.inner_height as f32);
        BoundingBox {
            x: (b.x * nw - self.pad_x as f32) / iw,
            y: (b.y * nh - self.pad_y as f32) / ih,
            w: b.w * nw / iw,
            h: b.h * nh / ih,
        }
    }

    /// Map a box from original-frame space to letterboxed space.
    pub fn encode_box(&self, b: &BoundingBox) -> BoundingBox {
        let (nw, nh) = (self.net_width as f32, self.net_height as f32);
        let (iw, ih) = (self.inner_width as f32, self.inner_height as f32);
        BoundingBox {
            x: (b.x * iw + self.pad_x as f32) / nw,
            y: (b.y * ih + self.pad_y as f32) / nh,
            w: b.w * iw / nw,
            h: b.h * ih / nh,
        }
    }
}

/// Letterbox `frame` into a freshly allocated network input.
pub fn encode(
    frame: &Frame,
    net_width: u32,
    net_height: u32,
) -> Result<LetterboxedFrame, FollowError> {
    let mut out = LetterboxedFrame::new(net_width, net_height, frame.channels())?;
    encode_into(frame, &mut out)?;
    Ok(out)
}

/// Letterbox `frame` into an existing network input buffer.
///
/// The whole buffer is rewritten: padding first, then the bilinearly
/// resampled image at the padding offset.
pub fn encode_into(frame: &Frame, out: &mut LetterboxedFrame) -> Result<Letterbox, FollowError> {
    let lb = Letterbox::new(frame.width(), frame.height(), out.width(), out.height())?;
    out.reset(frame.channels())?;

    let channels = frame.channels();
    let src_w = frame.width();
    let src_h = frame.height();
    let step_x = resample_step(src_w, lb.inner_width);
    let step_y = resample_step(src_h, lb.inner_height);

    for y in 0..lb.inner_height {
        let sy = y as f32 * step_y;
        let y0 = (sy.floor() as u32).min(src_h - 1);
        let y1 = (y0 + 1).min(src_h - 1);
        let fy = sy - y0 as f32;

        for x in 0..lb.inner_width {
            let sx = x as f32 * step_x;
            let x0 = (sx.floor() as u32).min(src_w - 1);
            let x1 = (x0 + 1).min(src_w - 1);
            let fx = sx - x0 as f32;

            let (p00, p10) = (frame.pixel(x0, y0), frame.pixel(x1, y0));
            let (p01, p11) = (frame.pixel(x0, y1), frame.pixel(x1, y1));

            for c in 0..channels as usize {
                let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
                let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
                let value = (top * (1.0 - fy) + bottom * fy) / 255.0;
                out.set(c as u32, x + lb.pad_x, y + lb.pad_y, value);
            }
        }
    }

    Ok(lb)
}

/// Map a letterboxed-space box back into original-frame space.
pub fn decode(
    b: &BoundingBox,
    original_width: u32,
    original_height: u32,
    net_width: u32,
    net_height: u32,
) -> Result<BoundingBox, FollowError> {
    let lb = Letterbox::new(original_width, original_height, net_width, net_height)?;
    Ok(lb.decode_box(b))
}

// Corner-aligned sampling: the first and last output pixels land exactly on
// the first and last source pixels, so an unscaled axis copies verbatim.
fn resample_step(src: u32, dst: u32) -> f32 {
    if dst <= 1 || src <= 1 {
        return 0.0;
    }
    (src - 1) as f32 / (dst - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::NEUTRAL_GRAY;
    use approx::assert_relative_eq;

    fn gradient_frame(width: u32, height: u32) -> Frame {
        let mut data = Vec::with_capacity((width * height * 3) as usize);
        for y in 0..height {
            for x in 0..width {
                data.extend_from_slice(&[(x % 256) as u8, (y % 256) as u8, 200]);
            }
        }
        Frame::from_raw(data, width, height, 3).unwrap()
    }

    #[test]
    fn wide_frame_is_padded_top_and_bottom() {
        let lb = Letterbox::new(640, 480, 416, 416).unwrap();
        assert_eq!(lb.inner_width, 416);
        assert_eq!(lb.inner_height, 312);
        assert_eq!((lb.pad_x, lb.pad_y), (0, 52));
        assert_relative_eq!(lb.scale, 0.65);
    }

    #[test]
    fn tall_frame_is_padded_left_and_right() {
        let lb = Letterbox::new(480, 640, 416, 416).unwrap();
        assert_eq!((lb.inner_width, lb.inner_height), (312, 416));
        assert_eq!((lb.pad_x, lb.pad_y), (52, 0));
    }

    #[test]
    fn non_positive_network_size_is_rejected() {
        assert_eq!(
            Letterbox::new(640, 480, 0, 416),
            Err(FollowError::InvalidDimension {
                what: "net_width",
                value: 0
            })
        );
        let frame = gradient_frame(8, 8);
        assert!(encode(&frame, 416, 0).is_err());
        assert!(decode(&BoundingBox::default(), 640, 480, 416, 0).is_err());
    }

    #[test]
    fn matching_size_is_identity() {
        let frame = gradient_frame(16, 8);
        let input = encode(&frame, 16, 8).unwrap();
        for y in 0..8 {
            for x in 0..16 {
                let px = frame.pixel(x, y);
                for c in 0..3 {
                    assert_eq!(input.value(c, x, y), px[c as usize] as f32 / 255.0);
                }
            }
        }

        let b = BoundingBox::new(0.3, 0.7, 0.2, 0.1);
        assert_eq!(decode(&b, 16, 8, 16, 8).unwrap(), b);
    }

    #[test]
    fn padding_is_neutral_gray() {
        let frame = gradient_frame(64, 32);
        let input = encode(&frame, 32, 32).unwrap();
        // inner image is 32x16 centered vertically at rows 8..24
        for c in 0..3 {
            assert_eq!(input.value(c, 5, 0), NEUTRAL_GRAY);
            assert_eq!(input.value(c, 5, 7), NEUTRAL_GRAY);
            assert_eq!(input.value(c, 5, 24), NEUTRAL_GRAY);
            assert_eq!(input.value(c, 31, 31), NEUTRAL_GRAY);
        }
        assert_relative_eq!(input.value(2, 5, 8), 200.0 / 255.0, epsilon = 1e-6);
    }

    #[test]
    fn encode_is_deterministic_and_reuses_buffer() {
        let frame = gradient_frame(40, 30);
        let first = encode(&frame, 20, 20).unwrap();
        let mut reused = LetterboxedFrame::new(20, 20, 3).unwrap();
        encode_into(&gradient_frame(10, 40), &mut reused).unwrap();
        encode_into(&frame, &mut reused).unwrap();
        assert_eq!(first, reused);
    }

    #[test]
    fn decode_maps_padded_center_to_frame_center() {
        let b = BoundingBox::new(0.5, 0.5, 0.1, 0.1);
        let out = decode(&b, 640, 480, 416, 416).unwrap();
        assert_relative_eq!(out.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(out.y, 0.5, epsilon = 1e-6);
        assert_relative_eq!(out.w, 0.1, epsilon = 1e-6);
        assert_relative_eq!(out.h, 0.1 * 416.0 / 312.0, epsilon = 1e-6);
    }

    #[test]
    fn encode_box_inverts_decode_box() {
        let lb = Letterbox::new(1280, 720, 608, 608).unwrap();
        let b = BoundingBox::new(0.42, 0.61, 0.2, 0.15);
        let back = lb.encode_box(&lb.decode_box(&b));
        assert_relative_eq!(back.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(back.w, b.w, epsilon = 1e-5);
        assert_relative_eq!(back.h, b.h, epsilon = 1e-5);
    }
}
