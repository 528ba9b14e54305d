//! Bounded probe history.
//!
//! Every completed probe appends one entry, whether or not the status
//! changed. When the log is full the oldest entry is dropped.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::status::Status;

/// Maximum number of entries kept per monitor.
pub const HISTORY_CAPACITY: usize = 100;

/// Status recorded after a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryEntry {
    pub status: Status,
    pub timestamp: Instant,
}

/// Append-only ring of [`HistoryEntry`] values in chronological order.
#[derive(Debug, Clone)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
}

impl History {
    /// Create an empty history with the default capacity (100).
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    /// Create an empty history holding at most `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest if the log is full.
    pub fn push(&mut self, entry: HistoryEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.back()
    }

    /// Entries recorded at or after `now - window`, oldest first.
    pub fn within(&self, window: Duration, now: Instant) -> Vec<HistoryEntry> {
        match now.checked_sub(window) {
            Some(cutoff) => self
                .entries
                .iter()
                .filter(|entry| entry.timestamp >= cutoff)
                .copied()
                .collect(),
            // The window reaches back past the clock's origin.
            None => self.entries.iter().copied().collect(),
        }
    }

    /// Number of most recent consecutive entries sharing the latest status.
    pub fn streak(&self) -> usize {
        let Some(latest) = self.latest() else {
            return 0;
        };
        self.entries
            .iter()
            .rev()
            .take_while(|entry| entry.status == latest.status)
            .count()
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
