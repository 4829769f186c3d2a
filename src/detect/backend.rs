use anyhow::Result;

use crate::detect::result::Detection;
use crate::frame::LetterboxedFrame;

/// Parameters for retrieving the detections of the last prediction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionRequest {
    /// Size of the original camera frame.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Class scores at or below this are reported as 0.
    pub confidence: f32,
    /// Secondary threshold; its meaning belongs to the backend.
    pub hierarchy: f32,
    /// The prediction input was letterboxed; boxes must be mapped back.
    pub letterboxed: bool,
}

/// Inference engine behind the follower.
///
/// The pipeline treats a backend as an opaque, blocking two-step call:
/// `predict` consumes the normalized network input, `detections` returns the
/// boxes of that prediction in original-frame space with one score per
/// class. Backends may use worker threads internally; none of that is
/// observable to the caller.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Network input size as (width, height).
    fn input_size(&self) -> (u32, u32);

    /// Length of every detection's score vector.
    fn num_classes(&self) -> usize;

    /// Run the network on a letterboxed input.
    fn predict(&mut self, input: &LetterboxedFrame) -> Result<()>;

    /// Detections of the most recent `predict` call.
    fn detections(&mut self, request: &DetectionRequest) -> Result<Vec<Detection>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<B: DetectorBackend + ?Sized> DetectorBackend for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn input_size(&self) -> (u32, u32) {
        (**self).input_size()
    }

    fn num_classes(&self) -> usize {
        (**self).num_classes()
    }

    fn predict(&mut self, input: &LetterboxedFrame) -> Result<()> {
        (**self).predict(input)
    }

    fn detections(&mut self, request: &DetectionRequest) -> Result<Vec<Detection>> {
        (**self).detections(request)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
