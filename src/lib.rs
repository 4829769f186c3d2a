//! Target Follower
//!
//! Real-time single-camera object follower: every frame is letterboxed into
//! the network input, run through a detector, filtered with per-class
//! overlap suppression, and the chosen target of one class is turned into a
//! LEFT / RIGHT steering decision that is printed and drawn on the frame.
//!
//! # Pipeline
//!
//! 1. **Acquire** the next camera frame into a reused buffer (`ingest`).
//! 2. **Letterbox** it into the fixed network input (`geometry::encode`).
//! 3. **Infer** with a `DetectorBackend`; boxes come back in frame space
//!    (`geometry::decode`).
//! 4. **Suppress** overlapping boxes of the same class (`nms::suppress`).
//! 5. **Select** the target among qualifying detections (`select`).
//! 6. **Decide** LEFT or RIGHT from the target's center (`decision`).
//! 7. **Render** the overlay and present the frame (`render`).
//!
//! # Module Structure
//!
//! - `frame`: camera frames and letterboxed network inputs
//! - `geometry`, `nms`, `select`, `decision`: the per-frame core
//! - `detect`: detector backends (synthetic, scripted, ONNX via tract)
//! - `ingest`, `render`: capture and display collaborators
//! - `config`, `model`: startup configuration and model definition
//! - `pipeline`: the frame loop orchestrator

pub mod config;
pub mod decision;
pub mod detect;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod ingest;
pub mod model;
pub mod nms;
pub mod pipeline;
pub mod render;
pub mod select;

pub use config::{FollowerConfig, Thresholds};
pub use decision::{decide, Decision};
pub use detect::{
    decode_rows, load_backend, BackendOptions, BoundingBox, Detection, DetectionRequest,
    DetectionSet, DetectorBackend, ScriptedBackend, StubBackend,
};
pub use error::FollowError;
pub use frame::{Frame, LetterboxedFrame};
pub use geometry::{decode, encode, encode_into, Letterbox};
pub use ingest::{Camera, CameraConfig, CameraStats, SyntheticCamera};
pub use model::ModelSpec;
pub use nms::suppress;
pub use pipeline::{
    FollowStats, Follower, FrameBudget, FrameReport, FrameStatus, PipelineSettings,
    ShutdownFlag, StopSignal,
};
pub use render::{LogRenderer, RenderConfig, Renderer};
pub use select::{select, SelectionPolicy, Target, TargetSelector};
