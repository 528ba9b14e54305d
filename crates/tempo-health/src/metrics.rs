//! Metrics derived from probe history.
//!
//! Nothing here is stored: metrics are recomputed from the history on
//! every request.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::history::{History, HistoryEntry};
use crate::status::Status;

/// Default recency window for history and metrics.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60 * 60);

/// Entry counts per status inside a window.
///
/// `error` is kept for the shape of the report; history never records it,
/// so it is always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub healthy: usize,
    pub suspect: usize,
    pub unhealthy: usize,
    pub error: usize,
}

impl StatusCounts {
    /// Counts reported for an empty window: one implied healthy probe.
    pub fn empty_window() -> Self {
        Self {
            healthy: 1,
            suspect: 0,
            unhealthy: 0,
            error: 0,
        }
    }

    fn tally(entries: &[HistoryEntry]) -> Self {
        let mut counts = Self {
            healthy: 0,
            suspect: 0,
            unhealthy: 0,
            error: 0,
        };
        for entry in entries {
            match entry.status {
                Status::Healthy => counts.healthy += 1,
                Status::Suspect => counts.suspect += 1,
                Status::Unhealthy => counts.unhealthy += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: Status) -> usize {
        match status {
            Status::Healthy => self.healthy,
            Status::Suspect => self.suspect,
            Status::Unhealthy => self.unhealthy,
        }
    }
}

/// Availability and streak figures for a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Fraction of healthy entries in the window, 1.0 when it is empty.
    pub availability: f64,
    pub status_counts: StatusCounts,
    /// Length of the latest same-status run over the whole history.
    pub current_streak: usize,
}

impl Metrics {
    /// Compute metrics over entries no older than `window` before `now`.
    ///
    /// The streak ignores the window and scans the full history.
    pub fn compute(history: &History, window: Duration, now: Instant) -> Self {
        let recent = history.within(window, now);
        Self::from_window(&recent, history.streak())
    }

    fn from_window(recent: &[HistoryEntry], current_streak: usize) -> Self {
        if recent.is_empty() {
            return Self {
                availability: 1.0,
                status_counts: StatusCounts::empty_window(),
                current_streak,
            };
        }

        let status_counts = StatusCounts::tally(recent);
        Self {
            availability: status_counts.healthy as f64 / recent.len() as f64,
            status_counts,
            current_streak,
        }
    }
}

impl Default for Metrics {
    /// Metrics of a monitor that has not probed yet.
    fn default() -> Self {
        Self::from_window(&[], 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(history: &mut History, status: Status, at: Instant) {
        history.push(HistoryEntry {
            status,
            timestamp: at,
        });
    }

    #[test]
    fn empty_history_reports_defaults() {
        let metrics = Metrics::compute(&History::new(), DEFAULT_WINDOW, Instant::now());
        assert_eq!(metrics.availability, 1.0);
        assert_eq!(metrics.status_counts, StatusCounts::empty_window());
        assert_eq!(metrics.current_streak, 0);
        assert_eq!(metrics, Metrics::default());
    }

    #[test]
    fn empty_window_keeps_full_history_streak() {
        let base = Instant::now();
        let mut history = History::new();
        for _ in 0..4 {
            push(&mut history, Status::Unhealthy, base);
        }

        let now = base + Duration::from_secs(2 * 60 * 60);
        let metrics = Metrics::compute(&history, DEFAULT_WINDOW, now);
        assert_eq!(metrics.availability, 1.0);
        assert_eq!(metrics.status_counts.healthy, 1);
        assert_eq!(metrics.status_counts.unhealthy, 0);
        assert_eq!(metrics.current_streak, 4);
    }

    #[test]
    fn availability_is_healthy_fraction() {
        let now = Instant::now();
        let mut history = History::new();
        push(&mut history, Status::Healthy, now);
        push(&mut history, Status::Healthy, now);
        push(&mut history, Status::Suspect, now);
        push(&mut history, Status::Healthy, now);

        let metrics = Metrics::compute(&history, DEFAULT_WINDOW, now);
        assert_eq!(metrics.availability, 0.75);
        assert_eq!(metrics.status_counts.healthy, 3);
        assert_eq!(metrics.status_counts.suspect, 1);
        assert_eq!(metrics.status_counts.error, 0);
        assert_eq!(metrics.status_counts.get(Status::Suspect), 1);
        assert_eq!(metrics.current_streak, 1);
    }

    #[test]
    fn window_excludes_stale_entries_but_streak_does_not() {
        let base = Instant::now();
        let mut history = History::new();
        push(&mut history, Status::Suspect, base);
        push(&mut history, Status::Suspect, base + Duration::from_secs(3600));

        let now = base + Duration::from_secs(3600 + 60);
        let metrics = Metrics::compute(&history, Duration::from_secs(120), now);
        assert_eq!(metrics.status_counts.suspect, 1);
        assert_eq!(metrics.availability, 0.0);
        assert_eq!(metrics.current_streak, 2);
    }

    #[test]
    fn metrics_serialize_for_reports() {
        let value = serde_json::to_value(Metrics::default()).unwrap();
        assert_eq!(value["availability"], 1.0);
        assert_eq!(value["status_counts"]["healthy"], 1);
        assert_eq!(value["current_streak"], 0);
    }
}
