//! Typed errors for the follower core.
//!
//! Geometry, filtering, selection and the decision rule cannot fail on their
//! own. The only failures below the orchestrator come from malformed
//! configuration, which is checked once at startup.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FollowError {
    #[error("invalid dimension: {what} must be positive (got {value})")]
    InvalidDimension { what: &'static str, value: u32 },

    #[error("{name} threshold {value} is outside [0, 1]")]
    ThresholdOutOfRange { name: &'static str, value: f32 },

    #[error("target class {class} is out of range for a model with {num_classes} classes")]
    ClassOutOfRange { class: usize, num_classes: usize },

    #[error("buffer length mismatch: expected {expected} bytes, got {actual}")]
    BufferMismatch { expected: usize, actual: usize },
}

impl FollowError {
    pub(crate) fn check_dimension(what: &'static str, value: u32) -> Result<u32, FollowError> {
        if value == 0 {
            return Err(FollowError::InvalidDimension { what, value });
        }
        Ok(value)
    }

    pub(crate) fn check_threshold(name: &'static str, value: f32) -> Result<f32, FollowError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(FollowError::ThresholdOutOfRange { name, value });
        }
        Ok(value)
    }
}
