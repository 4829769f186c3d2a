//! Follower configuration.
//!
//! Sources, lowest precedence first: built-in defaults, a JSON file (path
//! from `--config` or `FOLLOWER_CONFIG`), `FOLLOWER_*` environment variables.
//! Command-line flags are applied on top by the binary, which then calls
//! `validate` and `validate_for_model` once before the loop starts.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::FollowError;
use crate::ingest::CameraConfig;
use crate::model::ModelSpec;
use crate::render::RenderConfig;
use crate::select::SelectionPolicy;

pub const CONFIG_ENV: &str = "FOLLOWER_CONFIG";

const DEFAULT_CONFIDENCE: f32 = 0.5;
const DEFAULT_HIERARCHY: f32 = 0.25;
const DEFAULT_NMS_IOU: f32 = 0.4;
const DEFAULT_TARGET_CLASS: usize = 0;
const DEFAULT_INFERENCE_THREADS: usize = 4;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FollowerConfigFile {
    camera: Option<CameraConfigFile>,
    thresholds: Option<ThresholdsConfigFile>,
    target_class: Option<usize>,
    selection: Option<SelectionPolicy>,
    inference_threads: Option<usize>,
    render: Option<RenderConfigFile>,
    debug: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct CameraConfigFile {
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ThresholdsConfigFile {
    confidence: Option<f32>,
    hierarchy: Option<f32>,
    nms_iou: Option<f32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct RenderConfigFile {
    window: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    snapshot_path: Option<PathBuf>,
    font_path: Option<PathBuf>,
}

/// Score thresholds used by one frame iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Minimum class score (exclusive) for a detection to count.
    pub confidence: f32,
    /// Secondary threshold passed to the inference backend.
    pub hierarchy: f32,
    /// IoU at or above which a lower-scored box is suppressed.
    pub nms_iou: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            hierarchy: DEFAULT_HIERARCHY,
            nms_iou: DEFAULT_NMS_IOU,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), FollowError> {
        FollowError::check_threshold("confidence", self.confidence)?;
        FollowError::check_threshold("hierarchy", self.hierarchy)?;
        FollowError::check_threshold("nms", self.nms_iou)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FollowerConfig {
    pub camera: CameraConfig,
    pub thresholds: Thresholds,
    pub target_class: usize,
    pub selection: SelectionPolicy,
    pub inference_threads: usize,
    pub render: RenderConfig,
    pub debug: bool,
}

impl Default for FollowerConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig::default(),
            thresholds: Thresholds::default(),
            target_class: DEFAULT_TARGET_CLASS,
            selection: SelectionPolicy::default(),
            inference_threads: DEFAULT_INFERENCE_THREADS,
            render: RenderConfig::default(),
            debug: false,
        }
    }
}

impl FollowerConfig {
    /// Load from the file named by `FOLLOWER_CONFIG` (if any) plus the
    /// environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Like `load`, with an explicit file path taking precedence over
    /// `FOLLOWER_CONFIG`.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let env_path = std::env::var(CONFIG_ENV)
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let file_cfg = match path.map(Path::to_path_buf).or(env_path) {
            Some(path) => read_config_file(&path)?,
            None => FollowerConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FollowerConfigFile) -> Self {
        let defaults = Self::default();

        let camera = match file.camera {
            Some(camera) => CameraConfig {
                device: camera.device.unwrap_or(defaults.camera.device),
                width: camera.width.unwrap_or(defaults.camera.width),
                height: camera.height.unwrap_or(defaults.camera.height),
                target_fps: camera.target_fps.unwrap_or(defaults.camera.target_fps),
            },
            None => defaults.camera,
        };
        let thresholds = match file.thresholds {
            Some(t) => Thresholds {
                confidence: t.confidence.unwrap_or(DEFAULT_CONFIDENCE),
                hierarchy: t.hierarchy.unwrap_or(DEFAULT_HIERARCHY),
                nms_iou: t.nms_iou.unwrap_or(DEFAULT_NMS_IOU),
            },
            None => defaults.thresholds,
        };
        let render = match file.render {
            Some(render) => RenderConfig {
                window: render.window.unwrap_or(defaults.render.window),
                width: render.width.unwrap_or(defaults.render.width),
                height: render.height.unwrap_or(defaults.render.height),
                snapshot_path: render.snapshot_path,
                font_path: render.font_path,
            },
            None => defaults.render,
        };

        Self {
            camera,
            thresholds,
            target_class: file.target_class.unwrap_or(defaults.target_class),
            selection: file.selection.unwrap_or(defaults.selection),
            inference_threads: file
                .inference_threads
                .unwrap_or(defaults.inference_threads),
            render,
            debug: file.debug.unwrap_or(defaults.debug),
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(device) = env_value("FOLLOWER_CAMERA") {
            self.camera.device = device;
        }
        if let Some(value) = env_value("FOLLOWER_CONF_THRESHOLD") {
            self.thresholds.confidence = parse_env("FOLLOWER_CONF_THRESHOLD", &value)?;
        }
        if let Some(value) = env_value("FOLLOWER_NMS_THRESHOLD") {
            self.thresholds.nms_iou = parse_env("FOLLOWER_NMS_THRESHOLD", &value)?;
        }
        if let Some(value) = env_value("FOLLOWER_TARGET_CLASS") {
            self.target_class = parse_env("FOLLOWER_TARGET_CLASS", &value)?;
        }
        if let Some(value) = env_value("FOLLOWER_SELECTION") {
            self.selection = value
                .parse()
                .map_err(|e| anyhow!("FOLLOWER_SELECTION: {}", e))?;
        }
        if let Some(path) = env_value("FOLLOWER_SNAPSHOT_PATH") {
            self.render.snapshot_path = Some(PathBuf::from(path));
        }
        if let Some(value) = env_value("FOLLOWER_DEBUG") {
            self.debug = parse_flag(&value)
                .ok_or_else(|| anyhow!("FOLLOWER_DEBUG must be true/false or 1/0"))?;
        }
        Ok(())
    }

    /// Checks that need no model: thresholds and positive dimensions.
    pub fn validate(&self) -> Result<(), FollowError> {
        self.thresholds.validate()?;
        FollowError::check_dimension("camera width", self.camera.width)?;
        FollowError::check_dimension("camera height", self.camera.height)?;
        FollowError::check_dimension("render width", self.render.width)?;
        FollowError::check_dimension("render height", self.render.height)?;
        if self.inference_threads == 0 {
            return Err(FollowError::InvalidDimension {
                what: "inference_threads",
                value: 0,
            });
        }
        Ok(())
    }

    /// The followed class must exist in the loaded model.
    pub fn validate_for_model(&self, model: &ModelSpec) -> Result<(), FollowError> {
        self.validate()?;
        model.validate()?;
        if self.target_class >= model.classes {
            return Err(FollowError::ClassOutOfRange {
                class: self.target_class,
                num_classes: model.classes,
            });
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<FollowerConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| anyhow!("{} has an invalid value '{}'", key, value))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
