//! Frame sources, sinks, and the per-stream processing loop.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::error::{PipelineError, VideoError};
use crate::integration::annotate::{GREEN, draw_boxes};
use crate::integration::{DetectionSource, Frame, TrackerPipeline};
use crate::tracker::{IouTracker, Tracker};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Pull-based frame source. `Ok(None)` marks the end of the stream.
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError>;
}

/// Push-based frame sink receiving frames in stream order.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), VideoError>;
}

/// Frames held in memory.
#[derive(Debug, Default)]
pub struct VecSource {
    frames: VecDeque<Frame>,
}

impl VecSource {
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }
}

impl FrameSource for VecSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        Ok(self.frames.pop_front())
    }
}

/// Collects written frames in memory.
#[derive(Debug, Default)]
pub struct VecSink {
    pub frames: Vec<Frame>,
}

impl FrameSink for VecSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), VideoError> {
        self.frames.push(frame.clone());
        Ok(())
    }
}

/// Reads a directory of image files in lexicographic order.
#[derive(Debug)]
pub struct ImageDirSource {
    paths: VecDeque<PathBuf>,
    next_index: u64,
}

impl ImageDirSource {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, VideoError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if path.is_file() && is_image {
                paths.push(path);
            }
        }
        paths.sort();
        info!(dir = %dir.as_ref().display(), frames = paths.len(), "opened image directory");
        Ok(Self {
            paths: paths.into(),
            next_index: 0,
        })
    }

    /// Frames not yet read.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}

impl FrameSource for ImageDirSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
        let Some(path) = self.paths.pop_front() else {
            return Ok(None);
        };
        let image = image::open(&path)
            .map_err(|err| VideoError::Read(format!("{}: {err}", path.display())))?
            .to_rgb8();
        let frame = Frame::from_rgb_image(self.next_index, image)?;
        self.next_index += 1;
        Ok(Some(frame))
    }
}

/// Writes each frame as `frame_NNNNNN.png` into a directory.
#[derive(Debug)]
pub struct ImageDirSink {
    dir: PathBuf,
}

impl ImageDirSink {
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, VideoError> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn frame_path(&self, index: u64) -> PathBuf {
        self.dir.join(format!("frame_{index:06}.png"))
    }
}

impl FrameSink for ImageDirSink {
    fn write_frame(&mut self, frame: &Frame) -> Result<(), VideoError> {
        let path = self.frame_path(frame.index);
        frame
            .to_rgb_image()?
            .save(&path)
            .map_err(|err| VideoError::Write(format!("{}: {err}", path.display())))
    }
}

/// Outcome of a stream run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub frames: u64,
    pub detector_calls: u64,
    pub write_failures: u64,
    /// The source reported a read failure, which ended the stream.
    pub read_failed: bool,
    /// The stop signal ended the stream.
    pub stopped: bool,
}

/// Drives frames from a source through the pipeline into a sink.
pub struct StreamRunner<D: DetectionSource, T: Tracker = IouTracker> {
    pipeline: TrackerPipeline<D, T>,
    stop: Arc<AtomicBool>,
    box_color: Option<[u8; 3]>,
}

impl<D: DetectionSource, T: Tracker> StreamRunner<D, T> {
    pub fn new(pipeline: TrackerPipeline<D, T>) -> Self {
        Self {
            pipeline,
            stop: Arc::new(AtomicBool::new(false)),
            box_color: Some(GREEN),
        }
    }

    /// Share an externally owned stop flag.
    pub fn with_stop_signal(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn with_box_color(mut self, rgb: [u8; 3]) -> Self {
        self.box_color = Some(rgb);
        self
    }

    /// Pass frames through to the sink without drawing boxes.
    pub fn without_annotation(mut self) -> Self {
        self.box_color = None;
        self
    }

    /// Setting the returned flag ends the stream before the next frame.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn pipeline(&self) -> &TrackerPipeline<D, T> {
        &self.pipeline
    }

    pub fn into_pipeline(self) -> TrackerPipeline<D, T> {
        self.pipeline
    }

    /// Process frames until the source is exhausted, fails to read, or the
    /// stop flag is set.
    ///
    /// Write failures are logged and counted; tracking carries on. Detector
    /// failures abort the run.
    pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<StreamSummary, PipelineError>
    where
        S: FrameSource + ?Sized,
        K: FrameSink + ?Sized,
    {
        let mut summary = StreamSummary::default();
        let started = Instant::now();

        loop {
            if self.stop.load(Ordering::Relaxed) {
                info!("stop requested");
                summary.stopped = true;
                break;
            }

            let frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(err) => {
                    warn!("frame read failed, ending stream: {err}");
                    summary.read_failed = true;
                    break;
                }
            };

            let cycle = self.pipeline.process_at(&frame, Instant::now())?;
            summary.frames += 1;
            if cycle.report.detector_called {
                summary.detector_calls += 1;
            }

            let output = match self.box_color {
                // Only confirmed tracks are outlined, whatever the tracker emits
                Some(color) => draw_boxes(frame, &self.pipeline.get_boxes(), color)?,
                None => frame,
            };

            if let Err(err) = sink.write_frame(&output) {
                warn!(frame = output.index, "frame write failed: {err}");
                summary.write_failures += 1;
            }
        }

        info!(
            frames = summary.frames,
            detector_calls = summary.detector_calls,
            write_failures = summary.write_failures,
            elapsed = ?started.elapsed(),
            "stream finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integration::{ChannelOrder, PipelineConfig};
    use crate::tracker::{Detection, Size, TrackerConfig};

    #[derive(Debug, thiserror::Error)]
    #[error("inference engine crashed")]
    struct Crash;

    struct FixedDetector {
        fail: bool,
    }

    impl DetectionSource for FixedDetector {
        type Error = Crash;

        fn detect(&mut self, _image: &Frame) -> Result<Vec<Detection>, Crash> {
            if self.fail {
                return Err(Crash);
            }
            Ok(vec![Detection::new(30.0, 30.0, 90.0, 90.0, 0.9)])
        }
    }

    struct FlakySource {
        frames: VecSource,
        fail_after: usize,
        served: usize,
    }

    impl FrameSource for FlakySource {
        fn next_frame(&mut self) -> Result<Option<Frame>, VideoError> {
            if self.served == self.fail_after {
                return Err(VideoError::Read("device unplugged".into()));
            }
            self.served += 1;
            self.frames.next_frame()
        }
    }

    struct FailingSink {
        attempts: usize,
    }

    impl FrameSink for FailingSink {
        fn write_frame(&mut self, _frame: &Frame) -> Result<(), VideoError> {
            self.attempts += 1;
            Err(VideoError::Write("disk full".into()))
        }
    }

    fn frames(n: u64) -> Vec<Frame> {
        (0..n)
            .map(|i| Frame::filled(i, Size::new(150, 150), ChannelOrder::Rgb, [0, 0, 0]).unwrap())
            .collect()
    }

    fn runner(fail: bool) -> StreamRunner<FixedDetector> {
        let config = PipelineConfig {
            detection_interval: crate::integration::DetectionInterval::Frames(2),
            ..PipelineConfig::default()
        };
        StreamRunner::new(TrackerPipeline::new(FixedDetector { fail }, config).unwrap())
    }

    #[test]
    fn test_run_until_exhausted() {
        let mut runner = runner(false);
        let mut source = VecSource::new(frames(5));
        let mut sink = VecSink::default();

        let summary = runner.run(&mut source, &mut sink).unwrap();
        assert_eq!(summary.frames, 5);
        assert_eq!(summary.detector_calls, 3);
        assert!(!summary.read_failed);
        assert_eq!(sink.frames.len(), 5);
        assert_eq!(sink.frames[4].index, 4);

        // Track confirmed on the third frame: 300x300 box (30..90) maps to 15..45 in 150x150
        assert_eq!(sink.frames[1].pixel(15, 15), Some([0, 0, 0]));
        assert_eq!(sink.frames[2].pixel(15, 15), Some(GREEN));
        assert_eq!(sink.frames[3].pixel(15, 30), Some(GREEN));
    }

    #[test]
    fn test_tentative_tracks_not_drawn() {
        let config = PipelineConfig {
            tracker: TrackerConfig {
                emit_tentative: true,
                min_hits: 5,
                ..TrackerConfig::default()
            },
            ..PipelineConfig::default()
        };
        let mut runner = StreamRunner::new(TrackerPipeline::new(FixedDetector { fail: false }, config).unwrap());
        let mut source = VecSource::new(frames(1));
        let mut sink = VecSink::default();

        runner.run(&mut source, &mut sink).unwrap();
        assert!(runner.pipeline().get_boxes().is_empty());
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0].pixel(15, 15), Some([0, 0, 0]));
        assert_eq!(sink.frames[0].pixel(15, 30), Some([0, 0, 0]));
    }

    #[test]
    fn test_read_failure_ends_gracefully() {
        let mut runner = runner(false).without_annotation();
        let mut source = FlakySource {
            frames: VecSource::new(frames(5)),
            fail_after: 2,
            served: 0,
        };
        let mut sink = VecSink::default();

        let summary = runner.run(&mut source, &mut sink).unwrap();
        assert_eq!(summary.frames, 2);
        assert!(summary.read_failed);
        assert_eq!(sink.frames[0].pixel(15, 15), Some([0, 0, 0]));
    }

    #[test]
    fn test_write_failures_do_not_stop_tracking() {
        let mut runner = runner(false);
        let mut source = VecSource::new(frames(3));
        let mut sink = FailingSink { attempts: 0 };

        let summary = runner.run(&mut source, &mut sink).unwrap();
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.write_failures, 3);
        assert_eq!(sink.attempts, 3);
        assert_eq!(runner.pipeline().get_boxes().len(), 1);
    }

    #[test]
    fn test_device_failure_aborts() {
        let mut runner = runner(true);
        let mut source = VecSource::new(frames(3));
        let mut sink = VecSink::default();

        let err = runner.run(&mut source, &mut sink).unwrap_err();
        assert!(err.is_device());
        assert!(sink.frames.is_empty());
    }

    #[test]
    fn test_stop_signal() {
        let stop = Arc::new(AtomicBool::new(true));
        let mut runner = runner(false).with_stop_signal(Arc::clone(&stop));
        let mut source = VecSource::new(frames(3));
        let mut sink = VecSink::default();

        let summary = runner.run(&mut source, &mut sink).unwrap();
        assert!(summary.stopped);
        assert_eq!(summary.frames, 0);
        assert!(runner.stop_handle().load(Ordering::Relaxed));
    }
}
