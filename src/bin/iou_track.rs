use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;

use iou_track::config::load_config;
use iou_track::integration::{ImageDirSink, ImageDirSource, ReplayDetector};
use iou_track::logging::init_logging;
use iou_track::{DetectionInterval, StreamRunner, TrackerPipeline};

/// Detection backends selectable from the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DetectorKind {
    /// Pre-computed detections read from the `--detections` JSON file
    Replay,
}

#[derive(Parser)]
#[command(name = "iou-track", version)]
#[command(about = "Track objects through a frame sequence with periodic detection")]
struct Cli {
    /// Directory of input frames, read in file-name order
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving annotated frames
    #[arg(short, long)]
    output: PathBuf,

    /// Detection backend
    #[arg(long, value_enum, default_value_t = DetectorKind::Replay)]
    detector: DetectorKind,

    /// JSON file with pre-computed detections per frame
    #[arg(short, long)]
    detections: PathBuf,

    /// Seconds between detector calls
    #[arg(short = 'n', long, conflicts_with = "interval_frames")]
    interval: Option<f64>,

    /// Frames between detector calls
    #[arg(long)]
    interval_frames: Option<u32>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write frames without drawing track boxes
    #[arg(long)]
    no_draw: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref()).context("loading configuration")?;
    if let Some(secs) = cli.interval {
        cfg.detection_interval = DetectionInterval::Seconds(secs);
    }
    if let Some(frames) = cli.interval_frames {
        cfg.detection_interval = DetectionInterval::Frames(frames);
    }

    let detector = match cli.detector {
        DetectorKind::Replay => ReplayDetector::from_path(&cli.detections)
            .with_context(|| format!("reading detections from {}", cli.detections.display()))?,
    };
    let pipeline = TrackerPipeline::new(detector, cfg)?;

    let mut source = ImageDirSource::open(&cli.input)
        .with_context(|| format!("opening input {}", cli.input.display()))?;
    let mut sink = ImageDirSink::create(&cli.output)
        .with_context(|| format!("creating output {}", cli.output.display()))?;

    let mut runner = StreamRunner::new(pipeline);
    if cli.no_draw {
        runner = runner.without_annotation();
    }

    info!(
        input = %cli.input.display(),
        output = %cli.output.display(),
        detector = ?cli.detector,
        interval = ?runner.pipeline().config().detection_interval,
        "starting"
    );
    let summary = runner.run(&mut source, &mut sink)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
