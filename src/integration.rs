//! Integration module connecting detection backends, frames, and the tracker.
//!
//! This module provides the detector capability trait, frame preprocessing,
//! the detection schedule, the per-frame pipeline, and stream plumbing.

pub mod annotate;
mod builder;
mod detector;
mod device;
mod frame;
mod pipeline;
mod replay;
mod schedule;
mod video;

pub use builder::DetectionBuilder;
pub use detector::{DetectionSource, IntoDetections};
pub use device::{Device, DeviceGuard};
pub use frame::{ChannelOrder, Frame};
pub use pipeline::{Cycle, CycleReport, PipelineConfig, TrackView, TrackerPipeline};
pub use replay::{ReplayDetector, ReplayRecord};
pub use schedule::{DetectionInterval, DetectionSchedule};
pub use video::{
    FrameSink, FrameSource, ImageDirSink, ImageDirSource, StreamRunner, StreamSummary, VecSink,
    VecSource,
};

#[cfg(feature = "burn-backend")]
mod burn_backend;

#[cfg(feature = "burn-backend")]
pub use burn_backend::{BurnDetector, BurnDetectorError, BurnModel, RawDetection};
