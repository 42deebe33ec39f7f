//! IoU-based track association engine.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::tracker::matching::{self, AssignmentResult, Detection};
use crate::tracker::rect::{Rect, iou_batch};
use crate::tracker::track::Track;
use crate::tracker::track_state::TrackState;

/// Anything that turns a cycle's detections into an updated track set.
///
/// The pipeline depends only on this trait, so alternative association
/// strategies can be swapped in without touching orchestration.
pub trait Tracker {
    /// Advance one cycle with a (possibly empty) detection set and return
    /// the visible tracks.
    fn update(&mut self, detections: Vec<Detection>) -> Vec<Track>;

    /// Boxes of the confirmed tracks as of the last processed cycle.
    fn get_boxes(&self) -> Vec<Rect>;
}

/// Configuration for the IouTracker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Minimum IoU for a detection to continue a track.
    pub iou_threshold: f32,
    /// Matches needed before a track is confirmed.
    pub min_hits: u32,
    /// Missed cycles tolerated before a track is deleted.
    pub max_age: u32,
    /// Report tentative (unconfirmed) tracks as well.
    pub emit_tentative: bool,
    /// Report tracks that missed the current cycle.
    pub emit_lost: bool,
    /// Detector-space extent; detections entirely outside it are skipped.
    pub bounds: Option<Rect>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            iou_threshold: 0.3,
            min_hits: 2,
            max_age: 10,
            emit_tentative: false,
            emit_lost: true,
            bounds: None,
        }
    }
}

/// Greedy IoU tracker.
///
/// Owns the live track set. Tracks are stored in ascending id order, which
/// the greedy matcher relies on for its tie-break.
pub struct IouTracker {
    tracks: Vec<Track>,
    next_id: u64,
    frame_id: u64,
    config: TrackerConfig,
}

impl IouTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            tracks: Vec::new(),
            next_id: 1,
            frame_id: 0,
            config,
        }
    }

    pub fn update(&mut self, detections: Vec<Detection>) -> Vec<Track> {
        self.frame_id += 1;

        // Step 1: Drop malformed detections; they must not disturb other tracks
        let detections: Vec<Detection> = detections
            .into_iter()
            .filter(|det| match det.validate(self.config.bounds.as_ref()) {
                Ok(()) => true,
                Err(err) => {
                    warn!(frame = self.frame_id, bbox = ?det.bbox, score = det.score, "skipping detection: {err}");
                    false
                }
            })
            .collect();

        // Step 2: Greedy association on IoU
        let track_rects: Vec<Rect> = self.tracks.iter().map(|t| t.rect()).collect();
        let det_rects: Vec<Rect> = detections.iter().map(|d| d.bbox).collect();
        let ious = iou_batch(&track_rects, &det_rects);

        let AssignmentResult {
            matches,
            unmatched_tracks,
            unmatched_detections,
        } = matching::greedy_assignment(&ious, self.config.iou_threshold);

        // Step 3: Matched tracks take the detection's box
        for (itracked, idet) in matches {
            let track = &mut self.tracks[itracked];
            let was_confirmed = track.state == TrackState::Confirmed;
            track.update(&detections[idet], self.config.min_hits);
            if !was_confirmed && track.state == TrackState::Confirmed {
                debug!(track_id = track.track_id, hits = track.hits, "track confirmed");
            }
        }

        // Step 4: Unmatched tracks age; those past max_age are removed now
        for itracked in unmatched_tracks {
            self.tracks[itracked].mark_missed(self.config.max_age);
        }
        self.tracks.retain(|t| {
            if t.state == TrackState::Deleted {
                debug!(track_id = t.track_id, hits = t.hits, age = t.age, "track deleted");
                false
            } else {
                true
            }
        });

        // Step 5: Init new tracks
        for idet in unmatched_detections {
            let track_id = self.next_track_id();
            let track = Track::new(track_id, &detections[idet], self.config.min_hits);
            debug!(track_id, bbox = ?track.bbox, "track spawned");
            self.tracks.push(track);
        }

        self.tracks
            .iter()
            .filter(|t| self.is_visible(t))
            .cloned()
            .collect()
    }

    pub fn get_boxes(&self) -> Vec<Rect> {
        self.tracks
            .iter()
            .filter(|t| t.is_confirmed(self.config.min_hits) && self.is_visible(t))
            .map(|t| t.rect())
            .collect()
    }

    /// Every live track regardless of state.
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Number of cycles processed so far.
    pub fn frame_id(&self) -> u64 {
        self.frame_id
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    fn next_track_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn is_visible(&self, track: &Track) -> bool {
        match track.state {
            TrackState::Confirmed => true,
            TrackState::Tentative => self.config.emit_tentative,
            TrackState::Lost => {
                self.config.emit_lost
                    && (track.hits >= self.config.min_hits || self.config.emit_tentative)
            }
            TrackState::Deleted => false,
        }
    }
}

impl Default for IouTracker {
    fn default() -> Self {
        Self::new(TrackerConfig::default())
    }
}

impl Tracker for IouTracker {
    fn update(&mut self, detections: Vec<Detection>) -> Vec<Track> {
        IouTracker::update(self, detections)
    }

    fn get_boxes(&self) -> Vec<Rect> {
        IouTracker::get_boxes(self)
    }
}
