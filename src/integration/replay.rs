//! Detector that serves pre-computed detections, for offline runs.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::VideoError;
use crate::integration::{DetectionBuilder, DetectionSource, Frame, IntoDetections};
use crate::tracker::Detection;

/// One detection as stored on disk. Coordinates are in detector space.
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayRecord {
    pub frame: u64,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    #[serde(default)]
    pub label: Option<String>,
}

impl IntoDetections for Vec<ReplayRecord> {
    fn into_detections(self) -> Vec<Detection> {
        self.into_iter()
            .map(|r| {
                let builder = DetectionBuilder::new().tlbr(r.x1, r.y1, r.x2, r.y2).score(r.score);
                match r.label {
                    Some(label) => builder.label(label).build(),
                    None => builder.build(),
                }
            })
            .collect()
    }
}

/// Replays detections keyed by frame index.
///
/// The input is a JSON array of [`ReplayRecord`]s. Frames without records
/// yield no detections.
#[derive(Debug, Clone, Default)]
pub struct ReplayDetector {
    frames: HashMap<u64, Vec<ReplayRecord>>,
}

impl ReplayDetector {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, VideoError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, VideoError> {
        let records: Vec<ReplayRecord> = serde_json::from_reader(reader)?;
        Ok(Self::from_records(records))
    }

    pub fn from_records(records: Vec<ReplayRecord>) -> Self {
        let mut frames: HashMap<u64, Vec<ReplayRecord>> = HashMap::new();
        for record in records {
            frames.entry(record.frame).or_default().push(record);
        }
        Self { frames }
    }

    /// Number of frames that carry at least one detection.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl DetectionSource for ReplayDetector {
    type Error = Infallible;

    fn detect(&mut self, image: &Frame) -> Result<Vec<Detection>, Self::Error> {
        let detections = self
            .frames
            .get(&image.index)
            .cloned()
            .unwrap_or_default()
            .into_detections();
        debug!(frame = image.index, count = detections.len(), "replayed detections");
        Ok(detections)
    }
}
