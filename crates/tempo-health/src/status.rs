//! Status and event kinds.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Resting status of a monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Healthy,
    Suspect,
    Unhealthy,
}

impl Status {
    pub const ALL: [Status; 3] = [Status::Healthy, Status::Suspect, Status::Unhealthy];

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Healthy => "healthy",
            Status::Suspect => "suspect",
            Status::Unhealthy => "unhealthy",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a monitor can signal: the three statuses plus probe errors.
///
/// `Error` is never a resting status. It only selects the interval used
/// after a failure that has no status of its own (the unhealthy one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Healthy,
    Suspect,
    Unhealthy,
    Error,
}

impl From<Status> for EventKind {
    fn from(status: Status) -> Self {
        match status {
            Status::Healthy => EventKind::Healthy,
            Status::Suspect => EventKind::Suspect,
            Status::Unhealthy => EventKind::Unhealthy,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Healthy => f.write_str("healthy"),
            EventKind::Suspect => f.write_str("suspect"),
            EventKind::Unhealthy => f.write_str("unhealthy"),
            EventKind::Error => f.write_str("error"),
        }
    }
}
