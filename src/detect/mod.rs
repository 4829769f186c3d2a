//! Detector backends and their output types.

mod backend;
pub mod backends;
mod decode;
mod result;

use anyhow::Result;

pub use backend::{DetectionRequest, DetectorBackend};
pub use backends::{ScriptedBackend, StubBackend, DEFAULT_STUB_SEED};
pub use decode::decode_rows;
pub use result::{BoundingBox, Detection, DetectionSet};

#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;

use crate::model::ModelSpec;

/// Weights path selecting the built-in synthetic backend.
pub const STUB_WEIGHTS: &str = "stub://";

/// Construction options shared by all backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendOptions {
    /// Worker thread hint for the inference engine.
    pub threads: usize,
    pub seed: u64,
    /// Class the synthetic backend reports for its moving object.
    pub object_class: usize,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            threads: 4,
            seed: DEFAULT_STUB_SEED,
            object_class: 0,
        }
    }
}

/// Load the backend named by `weights`.
///
/// `stub://` selects the synthetic backend; anything else is an ONNX model
/// path and requires the `backend-tract` feature.
pub fn load_backend(
    spec: &ModelSpec,
    weights: &str,
    options: &BackendOptions,
) -> Result<Box<dyn DetectorBackend>> {
    spec.validate()?;
    if weights.starts_with(STUB_WEIGHTS) {
        let backend = StubBackend::new(spec)
            .with_seed(options.seed)
            .with_object_class(options.object_class);
        return Ok(Box::new(backend));
    }

    #[cfg(feature = "backend-tract")]
    {
        let backend = TractBackend::new(weights, spec, options.threads)?;
        Ok(Box::new(backend))
    }

    #[cfg(not(feature = "backend-tract"))]
    {
        anyhow::bail!(
            "loading weights from '{}' requires the backend-tract feature",
            weights
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_scheme_loads_synthetic_backend() {
        let spec = ModelSpec::synthetic(64, 64, 2);
        let backend = load_backend(&spec, "stub://", &BackendOptions::default()).unwrap();
        assert_eq!(backend.name(), "stub");
        assert_eq!(backend.input_size(), (64, 64));
        assert_eq!(backend.num_classes(), 2);
    }

    #[test]
    fn invalid_model_definition_is_rejected() {
        let spec = ModelSpec::synthetic(0, 64, 2);
        assert!(load_backend(&spec, "stub://", &BackendOptions::default()).is_err());
    }

    #[cfg(not(feature = "backend-tract"))]
    #[test]
    fn model_path_requires_tract_feature() {
        let spec = ModelSpec::synthetic(64, 64, 2);
        let Err(err) = load_backend(&spec, "yolo.onnx", &BackendOptions::default()) else {
            panic!("model path loaded without the tract backend");
        };
        assert!(err.to_string().contains("backend-tract"));
    }
}
