//! Frame loop orchestrator.
//!
//! One iteration: acquire into the reused frame buffer, letterbox into the
//! network input, predict, fetch detections, suppress overlaps per class,
//! select targets, decide, draw, present. Iterations are strictly
//! sequential; the stop signal is polled once after each one, so an
//! iteration always completes once started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::config::{FollowerConfig, Thresholds};
use crate::decision::{decide, Decision};
use crate::detect::{Detection, DetectionRequest, DetectorBackend};
use crate::error::FollowError;
use crate::frame::{Frame, LetterboxedFrame};
use crate::geometry;
use crate::ingest::Camera;
use crate::nms;
use crate::render::{Color, Renderer, TEXT_ORIGIN};
use crate::select::{SelectionPolicy, Target, TargetSelector};

const HEALTH_LOG_INTERVAL: Duration = Duration::from_secs(5);

// ----------------------------------------------------------------------------
// Stop signals
// ----------------------------------------------------------------------------

/// Polled once at the end of every iteration.
pub trait StopSignal {
    fn stop_requested(&mut self) -> bool;
}

impl<F: FnMut() -> bool> StopSignal for F {
    fn stop_requested(&mut self) -> bool {
        self()
    }
}

/// Shared stop flag, set from a signal handler or another thread.
#[derive(Clone, Debug, Default)]
pub struct ShutdownFlag(Arc<AtomicBool>);

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that is raised on Ctrl-C.
    ///
    /// Only one handler can be installed per process.
    pub fn install_ctrlc() -> Result<Self> {
        let flag = Self::new();
        let handle = flag.clone();
        ctrlc::set_handler(move || handle.request()).context("error setting Ctrl-C handler")?;
        Ok(flag)
    }

    pub fn request(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

impl StopSignal for ShutdownFlag {
    fn stop_requested(&mut self) -> bool {
        self.is_requested()
    }
}

/// Stops after a fixed number of iterations.
///
/// The stop poll follows each iteration, so a budget of 0 still runs one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameBudget {
    remaining: u64,
}

impl FrameBudget {
    pub fn new(frames: u64) -> Self {
        Self { remaining: frames }
    }
}

impl StopSignal for FrameBudget {
    fn stop_requested(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

// ----------------------------------------------------------------------------
// Settings, state, reports
// ----------------------------------------------------------------------------

/// Per-iteration parameters, fixed for the life of the loop.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PipelineSettings {
    pub target_class: usize,
    pub thresholds: Thresholds,
    pub policy: SelectionPolicy,
    /// Log every class score and every target box at debug level.
    pub debug: bool,
    /// Print each reported direction to stdout.
    pub print_decisions: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            target_class: 0,
            thresholds: Thresholds::default(),
            policy: SelectionPolicy::default(),
            debug: false,
            print_decisions: true,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &FollowerConfig) -> Self {
        Self {
            target_class: config.target_class,
            thresholds: config.thresholds,
            policy: config.selection,
            debug: config.debug,
            print_decisions: true,
        }
    }
}

/// Buffers reused across iterations. Owned by the follower and never
/// shared.
#[derive(Debug)]
pub struct IterationState {
    pub frame: Frame,
    pub input: LetterboxedFrame,
    pub detections: Vec<Detection>,
}

impl IterationState {
    fn new(net_width: u32, net_height: u32) -> Result<Self, FollowError> {
        Ok(Self {
            frame: Frame::new(net_width, net_height, 3)?,
            input: LetterboxedFrame::new(net_width, net_height, 3)?,
            detections: Vec::new(),
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameStatus {
    Processed,
    /// Acquisition or inference failed; nothing was decided or presented.
    Skipped { reason: String },
}

/// Outcome of one iteration.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// 1-based iteration number, skipped iterations included.
    pub index: u64,
    pub status: FrameStatus,
    pub decision: Decision,
    /// Reported targets in report order; the last one drives `decision`.
    pub targets: Vec<Target>,
    /// Detections returned by the backend.
    pub detections: usize,
    /// Class scores zeroed by overlap suppression.
    pub suppressed: usize,
}

impl FrameReport {
    fn skipped(index: u64, reason: String) -> Self {
        Self {
            index,
            status: FrameStatus::Skipped { reason },
            decision: Decision::None,
            targets: Vec::new(),
            detections: 0,
            suppressed: 0,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self.status, FrameStatus::Skipped { .. })
    }
}

/// Loop counters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FollowStats {
    pub iterations: u64,
    pub processed: u64,
    pub skipped: u64,
    pub left: u64,
    pub right: u64,
    pub none: u64,
}

impl FollowStats {
    fn record(&mut self, report: &FrameReport) {
        self.iterations += 1;
        if report.is_skipped() {
            self.skipped += 1;
            return;
        }
        self.processed += 1;
        match report.decision {
            Decision::Left => self.left += 1,
            Decision::Right => self.right += 1,
            Decision::None => self.none += 1,
        }
    }
}

// ----------------------------------------------------------------------------
// Follower
// ----------------------------------------------------------------------------

pub struct Follower<B: DetectorBackend, R: Renderer> {
    camera: Camera,
    backend: B,
    renderer: R,
    settings: PipelineSettings,
    selector: TargetSelector,
    state: IterationState,
    stats: FollowStats,
}

impl<B: DetectorBackend, R: Renderer> Follower<B, R> {
    /// Checks the settings against the backend and allocates the iteration
    /// buffers. The camera must already be connected.
    pub fn new(
        camera: Camera,
        backend: B,
        renderer: R,
        settings: PipelineSettings,
    ) -> Result<Self, FollowError> {
        settings.thresholds.validate()?;
        let num_classes = backend.num_classes();
        if settings.target_class >= num_classes {
            return Err(FollowError::ClassOutOfRange {
                class: settings.target_class,
                num_classes,
            });
        }
        let (net_width, net_height) = backend.input_size();
        let state = IterationState::new(net_width, net_height)?;
        let selector = TargetSelector::new(
            settings.target_class,
            settings.thresholds.confidence,
            settings.policy,
        );
        Ok(Self {
            camera,
            backend,
            renderer,
            settings,
            selector,
            state,
            stats: FollowStats::default(),
        })
    }

    /// Run exactly one iteration.
    ///
    /// Capture and inference failures skip the frame and are reported in
    /// the returned `FrameReport`; a failure to present is returned as an
    /// error.
    pub fn step(&mut self) -> Result<FrameReport> {
        let index = self.stats.iterations + 1;

        if let Err(err) = self.camera.read_into(&mut self.state.frame) {
            log::debug!("frame {}: capture failed, skipping: {:#}", index, err);
            return Ok(self.finish(FrameReport::skipped(index, format!("capture: {:#}", err))));
        }

        geometry::encode_into(&self.state.frame, &mut self.state.input)?;

        let request = DetectionRequest {
            frame_width: self.state.frame.width(),
            frame_height: self.state.frame.height(),
            confidence: self.settings.thresholds.confidence,
            hierarchy: self.settings.thresholds.hierarchy,
            letterboxed: true,
        };
        let detections = self
            .backend
            .predict(&self.state.input)
            .and_then(|()| self.backend.detections(&request));
        self.state.detections = match detections {
            Ok(detections) => detections,
            Err(err) => {
                log::warn!("frame {}: inference failed, skipping: {:#}", index, err);
                return Ok(
                    self.finish(FrameReport::skipped(index, format!("inference: {:#}", err)))
                );
            }
        };

        let num_classes = self.backend.num_classes();
        let suppressed = nms::suppress(
            &mut self.state.detections,
            num_classes,
            self.settings.thresholds.nms_iou,
        );
        if self.settings.debug {
            self.dump_scores(index);
        }

        let targets = self.selector.targets(&self.state.detections);
        let mut decision = Decision::None;
        for target in &targets {
            decision = decide(&target.bbox);
            if self.settings.debug {
                log::debug!(
                    "frame {}: box for class {} at (x, y) = ({:.4}, {:.4})",
                    index,
                    self.settings.target_class,
                    target.bbox.x,
                    target.bbox.y
                );
            }
            if self.settings.print_decisions {
                println!("{}", decision);
            }
            self.renderer.draw_box(&target.bbox, Color::GREEN);
            self.renderer
                .draw_text(decision.as_str(), TEXT_ORIGIN.0, TEXT_ORIGIN.1, Color::RED);
        }

        self.renderer
            .present(&self.state.frame)
            .with_context(|| format!("failed to present frame {}", index))?;

        Ok(self.finish(FrameReport {
            index,
            status: FrameStatus::Processed,
            decision,
            targets,
            detections: self.state.detections.len(),
            suppressed,
        }))
    }

    /// Iterate until `stop` asks to stop. Returns the final counters.
    pub fn run<S: StopSignal + ?Sized>(&mut self, stop: &mut S) -> Result<FollowStats> {
        let mut last_health_log = Instant::now();
        log::info!(
            "follower running: backend={} class={} policy={} conf={} nms={}",
            self.backend.name(),
            self.settings.target_class,
            self.settings.policy,
            self.settings.thresholds.confidence,
            self.settings.thresholds.nms_iou
        );

        loop {
            self.step()?;

            if last_health_log.elapsed() >= HEALTH_LOG_INTERVAL {
                self.log_health();
                last_health_log = Instant::now();
            }
            if stop.stop_requested() {
                break;
            }
        }

        let stats = &self.stats;
        log::info!(
            "follower stopped after {} frames: processed={} skipped={} left={} right={} none={}",
            stats.iterations,
            stats.processed,
            stats.skipped,
            stats.left,
            stats.right,
            stats.none
        );
        Ok(self.stats.clone())
    }

    fn finish(&mut self, report: FrameReport) -> FrameReport {
        self.stats.record(&report);
        report
    }

    fn dump_scores(&self, index: u64) {
        for det in &self.state.detections {
            for (class, prob) in det.scores.iter().enumerate() {
                if *prob > 0.0 {
                    log::debug!("frame {}: found class {} with prob {}", index, class, prob);
                }
            }
        }
    }

    fn log_health(&self) {
        let camera = self.camera.stats();
        log::info!(
            "camera health={} frames={} failures={} device={} | processed={} skipped={} left={} right={} none={}",
            self.camera.is_healthy(),
            camera.frames_captured,
            camera.failures,
            camera.device,
            self.stats.processed,
            self.stats.skipped,
            self.stats.left,
            self.stats.right,
            self.stats.none
        );
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn stats(&self) -> &FollowStats {
        &self.stats
    }

    pub fn state(&self) -> &IterationState {
        &self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Release the camera and hand back the collaborators.
    pub fn into_parts(mut self) -> (B, R) {
        self.camera.close();
        (self.backend, self.renderer)
    }
}
