use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::{DetectionRequest, DetectorBackend};
use crate::detect::result::Detection;
use crate::frame::LetterboxedFrame;

/// Backend that replays prepared detection sets, one per prediction.
///
/// Sets are returned verbatim; once the script runs out every further
/// prediction yields nothing. Used to drive the pipeline through exact
/// scenarios without a network.
pub struct ScriptedBackend {
    width: u32,
    height: u32,
    num_classes: usize,
    script: VecDeque<Vec<Detection>>,
    current: Option<Vec<Detection>>,
    predictions: u64,
    requests: Vec<DetectionRequest>,
}

impl ScriptedBackend {
    pub fn new(width: u32, height: u32, num_classes: usize) -> Self {
        Self {
            width,
            height,
            num_classes,
            script: VecDeque::new(),
            current: None,
            predictions: 0,
            requests: Vec::new(),
        }
    }

    /// Append one frame's detections.
    pub fn push(&mut self, detections: Vec<Detection>) -> &mut Self {
        self.script.push_back(detections);
        self
    }

    pub fn with_frames<I>(mut self, frames: I) -> Self
    where
        I: IntoIterator<Item = Vec<Detection>>,
    {
        self.script.extend(frames);
        self
    }

    pub fn predictions(&self) -> u64 {
        self.predictions
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    /// Requests seen so far, in call order.
    pub fn requests(&self) -> &[DetectionRequest] {
        &self.requests
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&mut self, input: &LetterboxedFrame) -> Result<()> {
        if (input.width(), input.height()) != (self.width, self.height) {
            return Err(anyhow!(
                "input size {}x{} does not match model input {}x{}",
                input.width(),
                input.height(),
                self.width,
                self.height
            ));
        }
        self.predictions += 1;
        self.current = Some(self.script.pop_front().unwrap_or_default());
        Ok(())
    }

    fn detections(&mut self, request: &DetectionRequest) -> Result<Vec<Detection>> {
        self.requests.push(*request);
        self.current
            .take()
            .ok_or_else(|| anyhow!("detections requested before predict"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn request() -> DetectionRequest {
        DetectionRequest {
            frame_width: 64,
            frame_height: 48,
            confidence: 0.5,
            hierarchy: 0.25,
            letterboxed: true,
        }
    }

    #[test]
    fn replays_frames_in_order_then_runs_dry() {
        let first = vec![Detection::single(BoundingBox::new(0.3, 0.5, 0.1, 0.1), 1, 0, 0.8)];
        let mut backend = ScriptedBackend::new(16, 16, 1).with_frames(vec![first.clone(), vec![]]);
        let input = LetterboxedFrame::new(16, 16, 3).unwrap();

        backend.predict(&input).unwrap();
        assert_eq!(backend.detections(&request()).unwrap(), first);
        backend.predict(&input).unwrap();
        assert!(backend.detections(&request()).unwrap().is_empty());
        backend.predict(&input).unwrap();
        assert!(backend.detections(&request()).unwrap().is_empty());

        assert_eq!(backend.predictions(), 3);
        assert_eq!(backend.requests().len(), 3);
        assert_eq!(backend.remaining(), 0);
    }

    #[test]
    fn detections_without_predict_fail() {
        let mut backend = ScriptedBackend::new(16, 16, 1);
        assert!(backend.detections(&request()).is_err());
    }
}
