//! tempo-health — adaptive-interval health monitoring.
//!
//! Runs a caller-supplied async probe on a schedule that depends on the
//! current status, with hysteresis between healthy, suspect, and
//! unhealthy. The probe itself (an HTTP call, a DB ping) is opaque to
//! this crate.
//!
//! # Architecture
//!
//! ```text
//! Monitor
//!   ├── Probe loop task (one per check(), replaced on restart)
//!   │   ├── probe() → Ok(healthy) | Err → ProbeError
//!   │   ├── StatusTracker (suspect/healthy counters)
//!   │   └── History (last 100 results)
//!   ├── Status listeners (healthy / suspect / unhealthy)
//!   └── Error listeners (probe failures)
//! ```
//!
//! # Transitions
//!
//! A failure while healthy enters suspect; `max_suspect_count`
//! consecutive failures (counting that first one) escalate to unhealthy.
//! `min_healthy_count` consecutive successes return to healthy from
//! either suspect or unhealthy. Failures while unhealthy change nothing.
//!
//! The delay before each probe is the interval configured for the status
//! the previous probe left behind.

pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod monitor;
pub mod status;
pub mod tracker;

pub use config::IntervalConfig;
pub use error::{HealthError, HealthResult, ProbeError};
pub use history::{History, HistoryEntry};
pub use metrics::{DEFAULT_WINDOW, Metrics, StatusCounts};
pub use monitor::{HealthEvent, Monitor, ProbeFn, ProbeFuture, WeakMonitor, probe_fn};
pub use status::{EventKind, Status};
pub use tracker::{Counters, StatusTracker, Transition};
