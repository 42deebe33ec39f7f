//! Single tracked object.

use serde::Serialize;

use crate::tracker::matching::Detection;
use crate::tracker::rect::Rect;
use crate::tracker::track_state::TrackState;

/// Single object track.
///
/// Boxes are kept in detector space; conversion to frame space happens at
/// the pipeline output and never touches the stored track.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    /// Unique track identifier, never reused by the owning tracker
    pub track_id: u64,
    /// Last known bounding box
    pub bbox: Rect,
    /// Current track state
    pub state: TrackState,
    /// Number of detections matched over the track's life
    pub hits: u32,
    /// Cycles since the track last matched a detection
    pub time_since_update: u32,
    /// Cycles since the track was spawned
    pub age: u32,
    /// Score of the last matched detection
    pub score: f32,
    /// Class label of the last matched detection
    pub class_label: Option<String>,
}

impl Track {
    /// Spawn a track from an unmatched detection.
    ///
    /// New tracks are Tentative unless a single hit already satisfies
    /// `min_hits`.
    pub fn new(track_id: u64, detection: &Detection, min_hits: u32) -> Self {
        let state = if min_hits <= 1 {
            TrackState::Confirmed
        } else {
            TrackState::Tentative
        };
        Self {
            track_id,
            bbox: detection.bbox,
            state,
            hits: 1,
            time_since_update: 0,
            age: 0,
            score: detection.score,
            class_label: detection.class_label.clone(),
        }
    }

    /// Absorb the detection matched to this track in the current cycle.
    pub fn update(&mut self, detection: &Detection, min_hits: u32) {
        self.bbox = detection.bbox;
        self.score = detection.score;
        if detection.class_label.is_some() {
            self.class_label = detection.class_label.clone();
        }
        self.hits = self.hits.saturating_add(1);
        self.age = self.age.saturating_add(1);
        self.time_since_update = 0;
        self.state = if self.hits >= min_hits {
            TrackState::Confirmed
        } else {
            TrackState::Tentative
        };
    }

    /// Age a track that found no detection this cycle. The box is carried
    /// forward unchanged.
    pub fn mark_missed(&mut self, max_age: u32) {
        self.age = self.age.saturating_add(1);
        self.time_since_update = self.time_since_update.saturating_add(1);
        if self.time_since_update > max_age {
            self.mark_deleted();
        } else {
            self.mark_lost();
        }
    }

    pub fn mark_lost(&mut self) {
        self.state = TrackState::Lost;
    }

    pub fn mark_deleted(&mut self) {
        self.state = TrackState::Deleted;
    }

    /// Confirmed, or lost after having been confirmed.
    pub fn is_confirmed(&self, min_hits: u32) -> bool {
        match self.state {
            TrackState::Confirmed => true,
            TrackState::Lost => self.hits >= min_hits,
            TrackState::Tentative | TrackState::Deleted => false,
        }
    }

    pub fn rect(&self) -> Rect {
        self.bbox
    }
}
