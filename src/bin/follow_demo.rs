//! follow_demo - end-to-end synthetic run of the follower
//!
//! Drives the full frame loop with a synthetic camera and the synthetic
//! detector, then prints a summary of the decisions taken.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use target_follower::render::renderer_for;
use target_follower::{
    load_backend, BackendOptions, Camera, CameraConfig, Follower, FollowerConfig, FrameBudget,
    ModelSpec, PipelineSettings, RenderConfig, SelectionPolicy,
};

const DEMO_DEVICE: &str = "stub://demo";
const DEMO_CLASSES: usize = 3;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Number of frames to run.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    frames: u64,
    /// Network input size (square).
    #[arg(long, default_value_t = 416)]
    input: u32,
    /// Seed for the synthetic detector.
    #[arg(long)]
    seed: Option<u64>,
    /// first_match, best_match or all_matches.
    #[arg(long, default_value = "best_match")]
    selection: SelectionPolicy,
    /// Write the latest annotated frame to this image file.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Print each direction to stdout.
    #[arg(long)]
    print: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = FollowerConfig {
        camera: CameraConfig {
            device: DEMO_DEVICE.to_string(),
            ..CameraConfig::default()
        },
        selection: args.selection,
        render: RenderConfig {
            snapshot_path: args.snapshot.clone(),
            ..RenderConfig::default()
        },
        ..FollowerConfig::default()
    };
    let model = ModelSpec::synthetic(args.input, args.input, DEMO_CLASSES);
    config.validate_for_model(&model)?;

    let mut options = BackendOptions::default();
    if let Some(seed) = args.seed {
        options.seed = seed;
    }
    let backend = load_backend(&model, "stub://", &options)?;

    let mut camera = Camera::new(config.camera.clone())?;
    camera.connect()?;
    let renderer = renderer_for(&config.render)?;

    let settings = PipelineSettings {
        print_decisions: args.print,
        ..PipelineSettings::from_config(&config)
    };
    let mut follower = Follower::new(camera, backend, renderer, settings)?;
    let stats = follower.run(&mut FrameBudget::new(args.frames))?;

    println!("follow_demo summary");
    println!("  frames:    {}", stats.iterations);
    println!("  processed: {}", stats.processed);
    println!("  skipped:   {}", stats.skipped);
    println!("  LEFT:      {}", stats.left);
    println!("  RIGHT:     {}", stats.right);
    println!("  NONE:      {}", stats.none);
    if let Some(path) = &args.snapshot {
        println!("  snapshot:  {}", path.display());
    }
    Ok(())
}
