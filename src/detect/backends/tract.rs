#![cfg(feature = "backend-tract")]

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tract_onnx::prelude::*;

use crate::detect::backend::{DetectionRequest, DetectorBackend};
use crate::detect::decode::decode_rows;
use crate::detect::result::Detection;
use crate::frame::LetterboxedFrame;
use crate::model::ModelSpec;

/// Tract-based backend for single-output YOLO-style ONNX detectors.
///
/// The model takes a `[1, 3, H, W]` f32 input and produces one row per
/// candidate box as described by the [`ModelSpec`]. This backend does not
/// perform any network I/O or write to disk beyond model loading.
pub struct TractBackend {
    model: TypedRunnableModel<TypedModel>,
    spec: ModelSpec,
    /// Raw output of the last prediction: shape and values.
    output: Option<(Vec<usize>, Vec<f32>)>,
}

impl TractBackend {
    /// Load an ONNX model from disk and prepare it for inference.
    ///
    /// `threads` is recorded for diagnostics only; tract plans run on the
    /// calling thread.
    pub fn new<P: AsRef<Path>>(model_path: P, spec: &ModelSpec, threads: usize) -> Result<Self> {
        let model_path = model_path.as_ref();
        let model = tract_onnx::onnx()
            .model_for_path(model_path)
            .with_context(|| format!("failed to load ONNX model from {}", model_path.display()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, 3, spec.height as usize, spec.width as usize),
                ),
            )
            .context("failed to set input fact")?
            .into_optimized()
            .context("failed to optimize ONNX model")?
            .into_runnable()
            .context("failed to build runnable ONNX model")?;

        log::debug!(
            "tract backend ready: {}x{} input, {} classes, {} worker thread hint",
            spec.width,
            spec.height,
            spec.classes,
            threads
        );

        Ok(Self {
            model,
            spec: spec.clone(),
            output: None,
        })
    }

    fn build_input(&self, input: &LetterboxedFrame) -> Result<Tensor> {
        if input.width() != self.spec.width || input.height() != self.spec.height {
            return Err(anyhow!(
                "input size {}x{} does not match model input {}x{}",
                input.width(),
                input.height(),
                self.spec.width,
                self.spec.height
            ));
        }
        if input.channels() != 3 {
            return Err(anyhow!(
                "model expects 3 input channels, received {}",
                input.channels()
            ));
        }
        let shape = [
            1,
            input.channels() as usize,
            input.height() as usize,
            input.width() as usize,
        ];
        Tensor::from_shape(&shape, input.data()).context("failed to build input tensor")
    }
}

impl DetectorBackend for TractBackend {
    fn name(&self) -> &'static str {
        "tract"
    }

    fn input_size(&self) -> (u32, u32) {
        (self.spec.width, self.spec.height)
    }

    fn num_classes(&self) -> usize {
        self.spec.classes
    }

    fn predict(&mut self, input: &LetterboxedFrame) -> Result<()> {
        let tensor = self.build_input(input)?;
        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .context("ONNX inference failed")?;
        let output = outputs
            .first()
            .ok_or_else(|| anyhow!("model produced no outputs"))?;
        let values = output
            .as_slice::<f32>()
            .context("model output tensor was not f32")?
            .to_vec();
        self.output = Some((output.shape().to_vec(), values));
        Ok(())
    }

    fn detections(&mut self, request: &DetectionRequest) -> Result<Vec<Detection>> {
        let (shape, values) = self
            .output
            .take()
            .ok_or_else(|| anyhow!("detections requested before predict"))?;
        decode_rows(&self.spec, &shape, &values, request)
    }
}
