//! Periodic object detection with continuous IoU-based multi-object tracking.
//!
//! A [`TrackerPipeline`] preprocesses each video frame, calls a
//! [`DetectionSource`] every configured interval, and feeds the (possibly
//! empty) detections to an [`IouTracker`] every cycle so tracks keep aging,
//! confirming, and expiring between detector calls.

pub mod config;
pub mod error;
pub mod integration;
pub mod logging;
pub mod tracker;

pub use error::{ConfigError, DeviceError, FrameError, MalformedDetection, PipelineError, VideoError};
pub use integration::{
    ChannelOrder, DetectionBuilder, DetectionInterval, DetectionSource, Device, DeviceGuard, Frame,
    FrameSink, FrameSource, IntoDetections, PipelineConfig, StreamRunner, TrackView, TrackerPipeline,
};
pub use tracker::{Detection, IouTracker, Rect, Size, Track, TrackState, Tracker, TrackerConfig};
