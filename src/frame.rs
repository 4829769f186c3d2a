//! Pixel buffers owned by the frame loop.
//!
//! - `Frame`: interleaved 8-bit camera image (HWC). Reused as the acquisition
//!   destination every iteration.
//! - `LetterboxedFrame`: fixed-size, planar (CHW) float input for the
//!   inference engine, values normalized to [0, 1].
//!
//! Neither buffer is shared across threads or kept beyond the orchestrator's
//! iteration state.

use crate::error::FollowError;

/// Fill value for the padded region of a letterboxed input.
pub const NEUTRAL_GRAY: f32 = 0.5;

// ----------------------------------------------------------------------------
// Frame: camera image
// ----------------------------------------------------------------------------

/// Interleaved camera frame.
///
/// Pixel data is private; writers go through `pixels_mut` after `reshape`
/// guarantees the buffer length matches the dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u32,
}

impl Frame {
    /// Allocate a zeroed frame.
    pub fn new(width: u32, height: u32, channels: u32) -> Result<Self, FollowError> {
        let len = buffer_len(width, height, channels)?;
        Ok(Self {
            data: vec![0u8; len],
            width,
            height,
            channels,
        })
    }

    /// Wrap existing interleaved pixel data.
    pub fn from_raw(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u32,
    ) -> Result<Self, FollowError> {
        let expected = buffer_len(width, height, channels)?;
        if data.len() != expected {
            return Err(FollowError::BufferMismatch {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            channels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Channel values of the pixel at (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let offset = (y as usize * self.width as usize + x as usize) * c;
        &self.data[offset..offset + c]
    }

    /// Change the frame geometry, reallocating only when the size changes.
    ///
    /// Sources call this before writing so a mid-stream resolution change
    /// never leaves a short buffer behind.
    pub fn reshape(&mut self, width: u32, height: u32, channels: u32) -> Result<(), FollowError> {
        let len = buffer_len(width, height, channels)?;
        if self.data.len() != len {
            self.data.resize(len, 0);
        }
        self.width = width;
        self.height = height;
        self.channels = channels;
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// LetterboxedFrame: network input
// ----------------------------------------------------------------------------

/// Planar float buffer of the network's fixed input size.
#[derive(Clone, Debug, PartialEq)]
pub struct LetterboxedFrame {
    data: Vec<f32>,
    width: u32,
    height: u32,
    channels: u32,
}

impl LetterboxedFrame {
    /// Allocate an input buffer filled with neutral gray.
    pub fn new(width: u32, height: u32, channels: u32) -> Result<Self, FollowError> {
        FollowError::check_dimension("net_width", width)?;
        FollowError::check_dimension("net_height", height)?;
        let len = buffer_len(width, height, channels)?;
        Ok(Self {
            data: vec![NEUTRAL_GRAY; len],
            width,
            height,
            channels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    /// Planar CHW data, channel-major.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn value(&self, channel: u32, x: u32, y: u32) -> f32 {
        self.data[self.index(channel, x, y)]
    }

    pub(crate) fn set(&mut self, channel: u32, x: u32, y: u32, value: f32) {
        let idx = self.index(channel, x, y);
        self.data[idx] = value;
    }

    /// Refill with neutral gray, switching channel count if needed.
    pub(crate) fn reset(&mut self, channels: u32) -> Result<(), FollowError> {
        let len = buffer_len(self.width, self.height, channels)?;
        self.channels = channels;
        self.data.clear();
        self.data.resize(len, NEUTRAL_GRAY);
        Ok(())
    }

    fn index(&self, channel: u32, x: u32, y: u32) -> usize {
        let plane = self.width as usize * self.height as usize;
        channel as usize * plane + y as usize * self.width as usize + x as usize
    }
}

fn buffer_len(width: u32, height: u32, channels: u32) -> Result<usize, FollowError> {
    FollowError::check_dimension("width", width)?;
    FollowError::check_dimension("height", height)?;
    FollowError::check_dimension("channels", channels)?;
    Ok(width as usize * height as usize * channels as usize)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_zero_dimensions() {
        assert_eq!(
            Frame::new(0, 480, 3),
            Err(FollowError::InvalidDimension {
                what: "width",
                value: 0
            })
        );
        assert!(Frame::new(640, 480, 0).is_err());
    }

    #[test]
    fn frame_from_raw_validates_length() {
        let err = Frame::from_raw(vec![0u8; 10], 2, 2, 3).unwrap_err();
        assert_eq!(
            err,
            FollowError::BufferMismatch {
                expected: 12,
                actual: 10
            }
        );
    }

    #[test]
    fn reshape_keeps_allocation_when_size_matches() {
        let mut frame = Frame::new(4, 2, 3).unwrap();
        let ptr = frame.pixels().as_ptr();
        frame.reshape(2, 4, 3).unwrap();
        assert_eq!(frame.pixels().as_ptr(), ptr);
        assert_eq!((frame.width(), frame.height()), (2, 4));

        frame.reshape(8, 8, 3).unwrap();
        assert_eq!(frame.pixels().len(), 8 * 8 * 3);
    }

    #[test]
    fn pixel_reads_interleaved_channels() {
        let data: Vec<u8> = (0..12).collect();
        let frame = Frame::from_raw(data, 2, 2, 3).unwrap();
        assert_eq!(frame.pixel(1, 0), &[3, 4, 5]);
        assert_eq!(frame.pixel(0, 1), &[6, 7, 8]);
    }

    #[test]
    fn letterboxed_frame_starts_gray() {
        let input = LetterboxedFrame::new(4, 4, 3).unwrap();
        assert!(input.data().iter().all(|v| *v == NEUTRAL_GRAY));
        assert!(LetterboxedFrame::new(0, 4, 3).is_err());
    }
}
