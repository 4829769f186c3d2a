use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::{DetectionRequest, DetectorBackend};
use crate::detect::result::{BoundingBox, Detection};
use crate::frame::LetterboxedFrame;
use crate::model::ModelSpec;

/// Seed used when none is configured.
pub const DEFAULT_STUB_SEED: u64 = 2_222_222;

/// Synthetic backend: one object sweeping left and right across the frame.
///
/// Every few frames it adds a jittered duplicate of the object (for the
/// overlap filter), a distractor of another class, or nothing at all
/// (object out of view). Output is fully determined by the seed.
pub struct StubBackend {
    width: u32,
    height: u32,
    num_classes: usize,
    object_class: usize,
    rng: StdRng,
    frames: u64,
    predicted: bool,
}

impl StubBackend {
    pub fn new(spec: &ModelSpec) -> Self {
        Self {
            width: spec.width,
            height: spec.height,
            num_classes: spec.classes,
            object_class: 0,
            rng: StdRng::seed_from_u64(DEFAULT_STUB_SEED),
            frames: 0,
            predicted: false,
        }
    }

    /// Class reported for the sweeping object.
    pub fn with_object_class(mut self, class: usize) -> Self {
        self.object_class = class.min(self.num_classes.saturating_sub(1));
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    fn object_box(&mut self) -> BoundingBox {
        let phase = self.frames as f32 * 0.15;
        let jitter: f32 = self.rng.gen_range(-0.01..0.01);
        BoundingBox::new(
            0.5 + 0.35 * phase.sin() + jitter,
            0.5 + 0.1 * (phase * 0.5).cos(),
            0.18,
            0.3,
        )
    }

    fn scores(&self, class: usize, score: f32, threshold: f32) -> Vec<f32> {
        let mut scores = vec![0.0; self.num_classes];
        if score > threshold {
            scores[class] = score;
        }
        scores
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn input_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn num_classes(&self) -> usize {
        self.num_classes
    }

    fn predict(&mut self, input: &LetterboxedFrame) -> Result<()> {
        if input.width() != self.width || input.height() != self.height {
            return Err(anyhow!(
                "input size {}x{} does not match model input {}x{}",
                input.width(),
                input.height(),
                self.width,
                self.height
            ));
        }
        self.frames += 1;
        self.predicted = true;
        Ok(())
    }

    fn detections(&mut self, request: &DetectionRequest) -> Result<Vec<Detection>> {
        if !std::mem::take(&mut self.predicted) {
            return Err(anyhow!("detections requested before predict"));
        }
        if self.frames % 5 == 0 {
            return Ok(Vec::new());
        }

        let mut detections = Vec::with_capacity(3);
        let object = self.object_box();
        let score = self.rng.gen_range(0.6..0.95);
        detections.push(Detection::new(
            object,
            self.scores(self.object_class, score, request.confidence),
        ));

        if self.frames % 3 == 0 {
            let shifted = BoundingBox::new(object.x + 0.015, object.y - 0.01, object.w, object.h);
            let weaker = score - self.rng.gen_range(0.05..0.2);
            detections.push(Detection::new(
                shifted,
                self.scores(self.object_class, weaker, request.confidence),
            ));
        }

        if self.num_classes > 1 && self.frames % 4 == 0 {
            let other = (self.object_class + 1) % self.num_classes;
            let distractor = BoundingBox::new(1.0 - object.x, 0.7, 0.1, 0.15);
            let score = self.rng.gen_range(0.55..0.9);
            detections.push(Detection::new(
                distractor,
                self.scores(other, score, request.confidence),
            ));
        }

        detections.retain(|det| !det.is_empty());
        Ok(detections)
    }
}
