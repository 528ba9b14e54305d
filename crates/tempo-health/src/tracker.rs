//! Hysteresis state machine.
//!
//! Tracks consecutive probe results and decides when a monitor moves
//! between healthy, suspect, and unhealthy.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::IntervalConfig;
use crate::status::Status;

/// Status before and after a single recorded result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Status,
    pub to: Status,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Snapshot of the hysteresis counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Consecutive failures since leaving healthy.
    pub suspect: u32,
    /// Consecutive successes.
    pub healthy: u32,
}

/// Tracks consecutive probe results for a single monitor.
#[derive(Debug)]
pub struct StatusTracker {
    status: Status,
    suspect_count: u32,
    healthy_count: u32,
    /// Failures (counting the one that left healthy) before unhealthy.
    max_suspect_count: u32,
    /// Successes needed to return to healthy.
    min_healthy_count: u32,
}

impl StatusTracker {
    /// Create a tracker from an interval config. Starts healthy.
    pub fn new(config: &IntervalConfig) -> Self {
        Self::with_thresholds(config.max_suspect_count, config.min_healthy_count)
    }

    /// Create a tracker with custom thresholds.
    pub fn with_thresholds(max_suspect_count: u32, min_healthy_count: u32) -> Self {
        Self {
            status: Status::Healthy,
            suspect_count: 0,
            healthy_count: 0,
            max_suspect_count,
            min_healthy_count,
        }
    }

    /// Record a probe result and return the resulting transition.
    pub fn record(&mut self, healthy: bool) -> Transition {
        let from = self.status;

        if healthy {
            self.suspect_count = 0;
            self.healthy_count = self.healthy_count.saturating_add(1);

            if self.healthy_count >= self.min_healthy_count {
                if from != Status::Healthy {
                    info!(
                        successes = self.healthy_count,
                        %from,
                        "monitor recovered to healthy"
                    );
                }
                self.status = Status::Healthy;
            }
        } else {
            self.healthy_count = 0;

            match self.status {
                Status::Healthy | Status::Suspect => {
                    self.suspect_count = self.suspect_count.saturating_add(1);

                    if self.suspect_count >= self.max_suspect_count {
                        warn!(
                            failures = self.suspect_count,
                            threshold = self.max_suspect_count,
                            "monitor marked unhealthy"
                        );
                        self.status = Status::Unhealthy;
                    } else {
                        if from == Status::Healthy {
                            info!(failures = self.suspect_count, "monitor marked suspect");
                        }
                        self.status = Status::Suspect;
                    }
                }
                // Only accumulated successes leave unhealthy.
                Status::Unhealthy => {}
            }
        }

        Transition {
            from,
            to: self.status,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn counters(&self) -> Counters {
        Counters {
            suspect: self.suspect_count,
            healthy: self.healthy_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_starts_healthy() {
        let tracker = StatusTracker::with_thresholds(3, 2);
        assert_eq!(tracker.status(), Status::Healthy);
        assert_eq!(tracker.counters(), Counters::default());
    }

    #[test]
    fn first_failure_enters_suspect() {
        let mut tracker = StatusTracker::with_thresholds(3, 2);
        let t = tracker.record(false);
        assert_eq!(t.from, Status::Healthy);
        assert_eq!(t.to, Status::Suspect);
        assert!(t.changed());
        assert_eq!(tracker.counters().suspect, 1);
    }

    #[test]
    fn single_failure_threshold_goes_straight_to_unhealthy() {
        let mut tracker = StatusTracker::with_thresholds(1, 2);
        let t = tracker.record(false);
        assert_eq!(t.to, Status::Unhealthy);
    }

    #[test]
    fn suspect_escalates_at_threshold_counting_entry_failure() {
        let mut tracker = StatusTracker::with_thresholds(3, 2);
        assert_eq!(tracker.record(false).to, Status::Suspect);

        let t = tracker.record(false);
        assert_eq!(t.to, Status::Suspect);
        assert!(!t.changed());
        assert_eq!(tracker.counters().suspect, 2);

        let t = tracker.record(false);
        assert_eq!(t.from, Status::Suspect);
        assert_eq!(t.to, Status::Unhealthy);
    }

    #[test]
    fn unhealthy_ignores_failures() {
        let mut tracker = StatusTracker::with_thresholds(1, 2);
        tracker.record(false);
        let before = tracker.counters();

        for _ in 0..5 {
            let t = tracker.record(false);
            assert!(!t.changed());
        }
        assert_eq!(tracker.status(), Status::Unhealthy);
        assert_eq!(tracker.counters(), before);
    }

    #[test]
    fn success_resets_suspect_count() {
        let mut tracker = StatusTracker::with_thresholds(3, 2);
        tracker.record(false);
        tracker.record(false);
        tracker.record(true);
        assert_eq!(tracker.counters().suspect, 0);
        assert_eq!(tracker.counters().healthy, 1);
        assert_eq!(tracker.status(), Status::Suspect);
    }

    #[test]
    fn failure_resets_healthy_count() {
        let mut tracker = StatusTracker::with_thresholds(3, 2);
        tracker.record(false);
        tracker.record(true);
        tracker.record(false);
        assert_eq!(tracker.counters().healthy, 0);
        assert_eq!(tracker.counters().suspect, 1);
    }

    #[test]
    fn recovery_needs_min_healthy_count() {
        let mut tracker = StatusTracker::with_thresholds(1, 3);
        tracker.record(false);
        assert_eq!(tracker.status(), Status::Unhealthy);

        assert!(!tracker.record(true).changed());
        assert!(!tracker.record(true).changed());
        let t = tracker.record(true);
        assert_eq!(t.from, Status::Unhealthy);
        assert_eq!(t.to, Status::Healthy);
    }

    #[test]
    fn repeated_success_while_healthy_is_not_a_transition() {
        let mut tracker = StatusTracker::with_thresholds(3, 1);
        for _ in 0..4 {
            assert!(!tracker.record(true).changed());
        }
        assert_eq!(tracker.counters().healthy, 4);
    }

    #[test]
    fn interrupted_recovery_restarts_suspect_count() {
        let mut tracker = StatusTracker::with_thresholds(3, 2);
        tracker.record(false);
        tracker.record(false);
        // One success is not enough to recover but clears the failure run.
        tracker.record(true);
        tracker.record(false);
        tracker.record(false);
        assert_eq!(tracker.status(), Status::Suspect);
        assert_eq!(tracker.record(false).to, Status::Unhealthy);
    }

    #[test]
    fn new_reads_thresholds_from_config() {
        let config = IntervalConfig::new(
            std::time::Duration::from_secs(1),
            std::time::Duration::from_secs(1),
            std::time::Duration::from_secs(1),
        )
        .with_max_suspect_count(1);
        let mut tracker = StatusTracker::new(&config);
        assert_eq!(tracker.record(false).to, Status::Unhealthy);
    }
}
