//! follower - steer toward one object class seen by a camera
//!
//! This binary:
//! 1. Loads the model definition and weights
//! 2. Opens the camera
//! 3. Runs the frame loop: letterbox, detect, suppress, select, decide
//! 4. Prints LEFT / RIGHT for every reported target and presents the frame
//! 5. Stops on Ctrl-C or after `--max-frames`

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use target_follower::render::renderer_for;
use target_follower::{
    load_backend, BackendOptions, Camera, Follower, FollowerConfig, ModelSpec, PipelineSettings,
    SelectionPolicy, ShutdownFlag,
};

const EXIT_RUNTIME: u8 = 1;
const EXIT_USAGE: u8 = 255;
const EXIT_CAMERA: u8 = 2;
const EXIT_MODEL: u8 = 3;
const EXIT_CONFIG: u8 = 4;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Model definition (TOML: input size, classes, output layout).
    model: PathBuf,
    /// ONNX weights, or `stub://` for the synthetic detector.
    weights: String,
    /// JSON config file.
    #[arg(long, env = "FOLLOWER_CONFIG")]
    config: Option<PathBuf>,
    /// Camera device path, or `stub://name` for synthetic frames.
    #[arg(long)]
    camera: Option<String>,
    /// Class score threshold.
    #[arg(long)]
    conf: Option<f32>,
    /// Secondary (objectness) threshold.
    #[arg(long)]
    hier: Option<f32>,
    /// Overlap suppression IoU threshold.
    #[arg(long)]
    nms: Option<f32>,
    /// Class index to follow.
    #[arg(long)]
    target_class: Option<usize>,
    /// first_match, best_match or all_matches.
    #[arg(long)]
    selection: Option<SelectionPolicy>,
    /// Write every presented frame to this image file.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Stop after this many frames (at least 1).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    max_frames: Option<u64>,
    /// Debug logging with per-class scores.
    #[arg(long, short)]
    verbose: bool,
}

/// Failure with the exit code it maps to.
struct Failure {
    code: u8,
    error: anyhow::Error,
}

trait ExitWith<T> {
    fn exit_with(self, code: u8) -> Result<T, Failure>;
}

impl<T, E: Into<anyhow::Error>> ExitWith<T> for Result<T, E> {
    fn exit_with(self, code: u8) -> Result<T, Failure> {
        self.map_err(|error| Failure {
            code,
            error: error.into(),
        })
    }
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.use_stderr() => {
            let _ = err.print();
            return ExitCode::from(EXIT_USAGE);
        }
        // --help and --version
        Err(err) => err.exit(),
    };

    // Config is read before the logger so a config file can turn on debug output.
    let config = FollowerConfig::load_from(args.config.as_deref()).map(|mut config| {
        apply_args(&mut config, &args);
        config
    });
    let debug = args.verbose || config.as_ref().is_ok_and(|config| config.debug);
    let filter = if debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match config.exit_with(EXIT_CONFIG).and_then(|config| run(&args, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(failure) => {
            log::error!("{:#}", failure.error);
            ExitCode::from(failure.code)
        }
    }
}

fn run(args: &Args, config: FollowerConfig) -> Result<(), Failure> {
    let model = ModelSpec::load(&args.model).exit_with(EXIT_MODEL)?;
    config.validate_for_model(&model).exit_with(EXIT_CONFIG)?;

    log::info!("loading network {} ({})", args.model.display(), args.weights);
    let options = BackendOptions {
        threads: config.inference_threads,
        ..BackendOptions::default()
    };
    let mut backend = load_backend(&model, &args.weights, &options).exit_with(EXIT_MODEL)?;
    backend.warm_up().exit_with(EXIT_MODEL)?;

    let mut camera = Camera::new(config.camera.clone()).exit_with(EXIT_CAMERA)?;
    camera
        .connect()
        .context("couldn't initialize camera")
        .exit_with(EXIT_CAMERA)?;

    let renderer = renderer_for(&config.render).exit_with(EXIT_CONFIG)?;
    let settings = PipelineSettings::from_config(&config);
    let mut follower = Follower::new(camera, backend, renderer, settings).exit_with(EXIT_CONFIG)?;

    let shutdown = ShutdownFlag::install_ctrlc().exit_with(EXIT_RUNTIME)?;
    let mut remaining = args.max_frames;
    let mut stop = || {
        let budget_spent = match remaining.as_mut() {
            Some(left) => {
                *left = left.saturating_sub(1);
                *left == 0
            }
            None => false,
        };
        budget_spent || shutdown.is_requested()
    };

    log::info!(
        "following class {} ({}) on {}",
        config.target_class,
        model.class_name(config.target_class),
        config.camera.device
    );
    follower.run(&mut stop).exit_with(EXIT_RUNTIME)?;
    Ok(())
}

fn apply_args(config: &mut FollowerConfig, args: &Args) {
    if let Some(camera) = &args.camera {
        config.camera.device = camera.clone();
    }
    if let Some(conf) = args.conf {
        config.thresholds.confidence = conf;
    }
    if let Some(hier) = args.hier {
        config.thresholds.hierarchy = hier;
    }
    if let Some(nms) = args.nms {
        config.thresholds.nms_iou = nms;
    }
    if let Some(class) = args.target_class {
        config.target_class = class;
    }
    if let Some(selection) = args.selection {
        config.selection = selection;
    }
    if let Some(snapshot) = &args.snapshot {
        config.render.snapshot_path = Some(snapshot.clone());
    }
    if args.verbose {
        config.debug = true;
    }
}
