//! Model definition file.
//!
//! The follower is started with a model definition and a weights path. The
//! definition is a small TOML document describing the network's input size,
//! class list and output layout, e.g.:
//!
//! ```toml
//! width = 416
//! height = 416
//! classes = 80
//! names = ["person", "bicycle"]
//! layout = "objectness"
//! coordinates = "normalized"
//! transposed = false
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::FollowError;

/// Column layout of a detection output row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputLayout {
    /// `cx, cy, w, h, objectness, class_0 .. class_n`
    #[default]
    Objectness,
    /// `cx, cy, w, h, class_0 .. class_n`
    ClassScores,
}

impl OutputLayout {
    /// Columns before the first class score.
    pub fn box_columns(&self) -> usize {
        match self {
            OutputLayout::Objectness => 5,
            OutputLayout::ClassScores => 4,
        }
    }
}

/// Units of the box columns in the network output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordinateUnits {
    /// Already in [0, 1] relative to the network input.
    #[default]
    Normalized,
    /// Pixels of the network input.
    Pixels,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ModelSpec {
    pub width: u32,
    pub height: u32,
    pub classes: usize,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub layout: OutputLayout,
    #[serde(default)]
    pub coordinates: CoordinateUnits,
    /// Output is `[1, columns, rows]` instead of `[1, rows, columns]`.
    #[serde(default)]
    pub transposed: bool,
}

impl ModelSpec {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read model definition {}", path.display()))?;
        Self::from_toml_str(&raw)
            .with_context(|| format!("invalid model definition {}", path.display()))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let spec: ModelSpec = toml::from_str(raw)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Definition for the built-in synthetic backend.
    pub fn synthetic(width: u32, height: u32, classes: usize) -> Self {
        Self {
            width,
            height,
            classes,
            names: Vec::new(),
            layout: OutputLayout::default(),
            coordinates: CoordinateUnits::default(),
            transposed: false,
        }
    }

    pub fn validate(&self) -> Result<(), FollowError> {
        FollowError::check_dimension("model width", self.width)?;
        FollowError::check_dimension("model height", self.height)?;
        if self.classes == 0 {
            return Err(FollowError::ClassOutOfRange {
                class: 0,
                num_classes: 0,
            });
        }
        Ok(())
    }

    /// Human-readable class name, falling back to the index.
    pub fn class_name(&self, class: usize) -> String {
        self.names
            .get(class)
            .cloned()
            .unwrap_or_else(|| format!("class {}", class))
    }

    /// Values per output row.
    pub fn row_len(&self) -> usize {
        self.layout.box_columns() + self.classes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_definition_with_defaults() {
        let spec = ModelSpec::from_toml_str("width = 416\nheight = 416\nclasses = 80\n").unwrap();
        assert_eq!(spec.layout, OutputLayout::Objectness);
        assert_eq!(spec.coordinates, CoordinateUnits::Normalized);
        assert!(!spec.transposed);
        assert_eq!(spec.row_len(), 85);
        assert_eq!(spec.class_name(3), "class 3");
    }

    #[test]
    fn parses_full_definition() {
        let raw = r#"
            width = 640
            height = 640
            classes = 2
            names = ["person", "dog"]
            layout = "class_scores"
            coordinates = "pixels"
            transposed = true
        "#;
        let spec = ModelSpec::from_toml_str(raw).unwrap();
        assert_eq!(spec.layout, OutputLayout::ClassScores);
        assert_eq!(spec.coordinates, CoordinateUnits::Pixels);
        assert!(spec.transposed);
        assert_eq!(spec.row_len(), 6);
        assert_eq!(spec.class_name(1), "dog");
    }

    #[test]
    fn rejects_zero_sized_input() {
        assert!(ModelSpec::from_toml_str("width = 0\nheight = 416\nclasses = 1\n").is_err());
        assert!(ModelSpec::from_toml_str("width = 416\nheight = 416\nclasses = 0\n").is_err());
    }
}
