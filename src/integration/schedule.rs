//! When to call the detector.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Spacing between detector calls. Tracking runs every cycle regardless.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionInterval {
    /// Call the detector once every `n` cycles.
    Frames(u32),
    /// Call the detector once at least this many seconds have passed.
    Seconds(f64),
}

impl Default for DetectionInterval {
    fn default() -> Self {
        DetectionInterval::Frames(6)
    }
}

/// Tracks the cycles or time elapsed since the last detector call.
///
/// The first cycle is always due. Checking and recording are separate so
/// that a failed detector call does not consume the slot.
#[derive(Debug, Clone)]
pub struct DetectionSchedule {
    interval: DetectionInterval,
    cycles_since_call: Option<u32>,
    last_call: Option<Instant>,
}

impl DetectionSchedule {
    pub fn new(interval: DetectionInterval) -> Self {
        Self {
            interval,
            cycles_since_call: None,
            last_call: None,
        }
    }

    pub fn interval(&self) -> DetectionInterval {
        self.interval
    }

    /// Whether the detector should run in the cycle starting at `now`.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.interval {
            DetectionInterval::Frames(n) => match self.cycles_since_call {
                None => true,
                Some(cycles) => cycles.saturating_add(1) >= n,
            },
            DetectionInterval::Seconds(secs) => match self.last_call {
                None => true,
                Some(last) => {
                    let interval = Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX);
                    now.saturating_duration_since(last) >= interval
                }
            },
        }
    }

    /// Record a completed cycle.
    pub fn record(&mut self, detector_called: bool, now: Instant) {
        if detector_called {
            self.cycles_since_call = Some(0);
            self.last_call = Some(now);
        } else if let Some(cycles) = self.cycles_since_call.as_mut() {
            *cycles = cycles.saturating_add(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_cycles(schedule: &mut DetectionSchedule, n: usize) -> Vec<usize> {
        let now = Instant::now();
        let mut calls = Vec::new();
        for cycle in 1..=n {
            let due = schedule.is_due(now);
            if due {
                calls.push(cycle);
            }
            schedule.record(due, now);
        }
        calls
    }

    #[test]
    fn test_every_n_frames() {
        let mut schedule = DetectionSchedule::new(DetectionInterval::Frames(6));
        assert_eq!(run_cycles(&mut schedule, 14), vec![1, 7, 13]);
    }

    #[test]
    fn test_every_frame() {
        let mut schedule = DetectionSchedule::new(DetectionInterval::Frames(1));
        assert_eq!(run_cycles(&mut schedule, 4), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unrecorded_cycle_stays_due() {
        let mut schedule = DetectionSchedule::new(DetectionInterval::Frames(3));
        let now = Instant::now();
        assert!(schedule.is_due(now));
        // detector failed, nothing recorded
        assert!(schedule.is_due(now));
        schedule.record(true, now);
        assert!(!schedule.is_due(now));
    }

    #[test]
    fn test_wall_clock_interval() {
        let mut schedule = DetectionSchedule::new(DetectionInterval::Seconds(6.0));
        let start = Instant::now();

        assert!(schedule.is_due(start));
        schedule.record(true, start);

        let later = start + Duration::from_secs(5);
        assert!(!schedule.is_due(later));
        schedule.record(false, later);

        let due = start + Duration::from_secs(6);
        assert!(schedule.is_due(due));
        schedule.record(true, due);
        assert!(!schedule.is_due(due + Duration::from_millis(10)));
    }
}
