mod iou_tracker;
mod matching;
mod rect;
mod track;
mod track_state;

pub use iou_tracker::{IouTracker, Tracker, TrackerConfig};
pub use matching::{AssignmentResult, Detection, greedy_assignment};
pub use rect::{Rect, Size, iou_batch};
pub use track::Track;
pub use track_state::TrackState;
