//! TrackerPipeline for combining periodic detection with continuous tracking.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, DeviceError, PipelineError};
use crate::integration::schedule::{DetectionInterval, DetectionSchedule};
use crate::integration::{ChannelOrder, DetectionSource, Frame};
use crate::tracker::{IouTracker, Rect, Size, Track, TrackState, Tracker, TrackerConfig};

/// Configuration for the pipeline. Read-only once the pipeline is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Resolution the detector expects.
    pub input_size: Size,
    /// Channel order the detector expects.
    pub channel_order: ChannelOrder,
    pub detection_interval: DetectionInterval,
    pub tracker: TrackerConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            input_size: Size::new(300, 300),
            channel_order: ChannelOrder::Rgb,
            detection_interval: DetectionInterval::default(),
            tracker: TrackerConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.input_size.is_empty() {
            return Err(ConfigError::Invalid(format!(
                "input_size must be non-zero, got {}x{}",
                self.input_size.width, self.input_size.height
            )));
        }
        let iou = self.tracker.iou_threshold;
        if !(iou > 0.0 && iou <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "tracker.iou_threshold must be in (0, 1], got {iou}"
            )));
        }
        if self.tracker.min_hits == 0 {
            return Err(ConfigError::Invalid("tracker.min_hits must be at least 1".into()));
        }
        match self.detection_interval {
            DetectionInterval::Frames(0) => {
                return Err(ConfigError::Invalid(
                    "detection_interval.frames must be at least 1".into(),
                ));
            }
            DetectionInterval::Frames(n) if self.tracker.max_age.saturating_add(1) < n => {
                warn!(
                    interval = n,
                    max_age = self.tracker.max_age,
                    "tracks will expire between detector calls"
                );
            }
            DetectionInterval::Seconds(secs) if !secs.is_finite() || secs < 0.0 => {
                return Err(ConfigError::Invalid(format!(
                    "detection_interval.seconds must be finite and non-negative, got {secs}"
                )));
            }
            _ => {}
        }
        Ok(())
    }
}

/// A track as handed to rendering/output, in original-frame coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackView {
    pub id: u64,
    pub bbox: Rect,
    pub state: TrackState,
    pub score: f32,
    pub class_label: Option<String>,
}

impl TrackView {
    fn from_track(track: &Track, detector: Size, frame: Size) -> Self {
        Self {
            id: track.track_id,
            bbox: track.bbox.rescale(detector, frame).clip_to_frame(frame),
            state: track.state,
            score: track.score,
            class_label: track.class_label.clone(),
        }
    }
}

/// Timing and counts for one processed cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct CycleReport {
    /// 1-based cycle number
    pub cycle: u64,
    pub detector_called: bool,
    /// Detections handed to the tracker (0 when the detector was skipped)
    pub detections: usize,
    /// Tracks in the output
    pub tracks: usize,
    pub detect_time: Option<Duration>,
    pub track_time: Duration,
}

/// Output of one cycle.
#[derive(Debug, Clone)]
pub struct Cycle {
    pub tracks: Vec<TrackView>,
    pub report: CycleReport,
}

/// A combined tracker that bundles periodic detection with IoU tracking.
///
/// Holds no track state of its own; tracks live in the tracker.
pub struct TrackerPipeline<D: DetectionSource, T: Tracker = IouTracker> {
    detector: D,
    tracker: T,
    config: PipelineConfig,
    schedule: DetectionSchedule,
    cycle: u64,
    frame_size: Option<Size>,
}

impl<D: DetectionSource> TrackerPipeline<D> {
    /// Create a new tracking pipeline with the given detector and config.
    ///
    /// Unless the config names tracker bounds, detections are bounded by the
    /// detector input rectangle.
    pub fn new(detector: D, config: PipelineConfig) -> Result<Self, ConfigError> {
        let mut tracker_config = config.tracker.clone();
        tracker_config.bounds.get_or_insert(config.input_size.to_rect());
        Self::with_tracker(detector, IouTracker::new(tracker_config), config)
    }

    /// Create a new tracking pipeline with default configuration.
    pub fn with_default_config(detector: D) -> Self {
        let config = PipelineConfig::default();
        let mut tracker_config = config.tracker.clone();
        tracker_config.bounds = Some(config.input_size.to_rect());
        Self::assemble(detector, IouTracker::new(tracker_config), config)
    }
}

impl<D: DetectionSource, T: Tracker> TrackerPipeline<D, T> {
    /// Create a pipeline around any tracker implementation.
    pub fn with_tracker(detector: D, tracker: T, config: PipelineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(detector, tracker, config))
    }

    fn assemble(detector: D, tracker: T, config: PipelineConfig) -> Self {
        Self {
            detector,
            tracker,
            schedule: DetectionSchedule::new(config.detection_interval),
            config,
            cycle: 0,
            frame_size: None,
        }
    }

    /// Process a single frame and return the visible tracks in frame space.
    pub fn process(&mut self, frame: &Frame) -> Result<Vec<TrackView>, PipelineError> {
        Ok(self.process_at(frame, Instant::now())?.tracks)
    }

    /// Process a single frame as of `now` and return tracks plus timings.
    ///
    /// A detector failure aborts the cycle with [`PipelineError::Device`];
    /// the tracker is left untouched and the next cycle retries detection.
    pub fn process_at(&mut self, frame: &Frame, now: Instant) -> Result<Cycle, PipelineError> {
        let image = frame.preprocess(self.config.input_size, self.config.channel_order)?;
        let cycle = self.cycle + 1;

        let detector_called = self.schedule.is_due(now);
        let (detections, detect_time) = if detector_called {
            let t0 = Instant::now();
            let detections = self
                .detector
                .detect(&image)
                .map_err(|err| DeviceError::new(format!("detector failed on cycle {cycle}"), err))?;
            (detections, Some(t0.elapsed()))
        } else {
            (Vec::new(), None)
        };
        self.schedule.record(detector_called, now);
        self.cycle = cycle;

        let num_detections = detections.len();
        let t0 = Instant::now();
        let tracks = self.tracker.update(detections);
        let track_time = t0.elapsed();

        let frame_size = frame.size();
        self.frame_size = Some(frame_size);
        let views: Vec<TrackView> = tracks
            .iter()
            .map(|t| TrackView::from_track(t, self.config.input_size, frame_size))
            .collect();

        let report = CycleReport {
            cycle,
            detector_called,
            detections: num_detections,
            tracks: views.len(),
            detect_time,
            track_time,
        };
        debug!(
            cycle,
            frame = frame.index,
            detector_called,
            detections = num_detections,
            tracks = views.len(),
            detect_time = ?detect_time,
            track_time = ?track_time,
            "cycle processed"
        );

        Ok(Cycle {
            tracks: views,
            report,
        })
    }

    /// Boxes of the confirmed tracks from the last cycle, in frame space.
    pub fn get_boxes(&self) -> Vec<Rect> {
        let Some(frame_size) = self.frame_size else {
            return Vec::new();
        };
        self.tracker
            .get_boxes()
            .into_iter()
            .map(|b| b.rescale(self.config.input_size, frame_size).clip_to_frame(frame_size))
            .collect()
    }

    /// Number of cycles processed so far.
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Get a reference to the underlying detector.
    pub fn detector(&self) -> &D {
        &self.detector
    }

    /// Get a mutable reference to the underlying detector.
    pub fn detector_mut(&mut self) -> &mut D {
        &mut self.detector
    }

    /// Get a reference to the underlying tracker.
    pub fn tracker(&self) -> &T {
        &self.tracker
    }

    /// Release the detector and tracker.
    pub fn into_parts(self) -> (D, T) {
        (self.detector, self.tracker)
    }
}
