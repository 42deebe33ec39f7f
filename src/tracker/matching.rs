//! Detections and detection-to-track association.

use std::cmp::Ordering;

use ndarray::Array2;

use crate::error::MalformedDetection;
use crate::tracker::rect::Rect;

/// Detection input for the tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// Bounding box in detector-space coordinates
    pub bbox: Rect,
    /// Detection confidence score in `[0, 1]`
    pub score: f32,
    /// Class name reported by the detector, if any
    pub class_label: Option<String>,
}

impl Detection {
    /// Create a detection from TLBR corners.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32, score: f32) -> Self {
        Self {
            bbox: Rect::from_tlbr(x1, y1, x2, y2),
            score,
            class_label: None,
        }
    }

    pub fn from_rect(bbox: Rect, score: f32) -> Self {
        Self {
            bbox,
            score,
            class_label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.class_label = Some(label.into());
        self
    }

    /// Check that the detection is usable for association.
    ///
    /// `bounds` is the detector-space rectangle; a box that does not touch
    /// it at all is rejected. Partially visible boxes are fine.
    pub fn validate(&self, bounds: Option<&Rect>) -> Result<(), MalformedDetection> {
        if !self.bbox.is_finite() || !self.score.is_finite() {
            return Err(MalformedDetection::NonFinite);
        }
        if self.bbox.is_degenerate() {
            return Err(MalformedDetection::Degenerate {
                width: self.bbox.width,
                height: self.bbox.height,
            });
        }
        if !(0.0..=1.0).contains(&self.score) {
            return Err(MalformedDetection::ScoreOutOfRange(self.score));
        }
        if let Some(bounds) = bounds {
            if self.bbox.intersection_area(bounds) <= 0.0 {
                return Err(MalformedDetection::OutOfBounds);
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentResult {
    pub matches: Vec<(usize, usize)>,
    pub unmatched_tracks: Vec<usize>,
    pub unmatched_detections: Vec<usize>,
}

/// Greedy highest-IoU-first assignment.
///
/// `ious` is a (tracks x detections) similarity matrix whose rows are ordered
/// by ascending track id. The best remaining pair is committed while its IoU
/// is at least `thresh`. Equal IoUs go to the lower row (the older track),
/// then to the lower detection index.
///
/// Unmatched indices are returned in ascending order.
pub fn greedy_assignment(ious: &Array2<f32>, thresh: f32) -> AssignmentResult {
    let (num_rows, num_cols) = ious.dim();

    let mut candidates: Vec<(usize, usize, f32)> = ious
        .indexed_iter()
        .filter(|&(_, &iou)| iou >= thresh)
        .map(|((row, col), &iou)| (row, col, iou))
        .collect();

    candidates.sort_by(|a, b| match b.2.total_cmp(&a.2) {
        Ordering::Equal => (a.0, a.1).cmp(&(b.0, b.1)),
        other => other,
    });

    let mut row_used = vec![false; num_rows];
    let mut col_used = vec![false; num_cols];
    let mut matches = Vec::new();

    for (row, col, _) in candidates {
        if row_used[row] || col_used[col] {
            continue;
        }
        row_used[row] = true;
        col_used[col] = true;
        matches.push((row, col));
    }

    let unmatched_tracks = (0..num_rows).filter(|&i| !row_used[i]).collect();
    let unmatched_detections = (0..num_cols).filter(|&j| !col_used[j]).collect();

    AssignmentResult {
        matches,
        unmatched_tracks,
        unmatched_detections,
    }
}
