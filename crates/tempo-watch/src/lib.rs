//! tempo-watch — observable-state adapter for `tempo-health`.
//!
//! Wraps one [`Monitor`] per mount and mirrors its events into a
//! [`tokio::sync::watch`] channel, so UI layers or other tasks can
//! subscribe to the latest [`HealthView`] instead of registering
//! callbacks. Built only on the monitor's public API.
//!
//! ```text
//! WatchedMonitor
//!   ├── Monitor (probe loop)
//!   │   ├── on(healthy | suspect | unhealthy) → watch::Sender<HealthView>
//!   │   └── on_error → tracing::warn! + HealthView::last_error
//!   └── watch::Receiver<HealthView> (cloned per subscriber)
//! ```
//!
//! Dropping the adapter stops the monitor.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use tempo_health::{
    HealthEvent, HealthResult, HistoryEntry, IntervalConfig, Metrics, Monitor, ProbeFn, Status,
};

/// Latest observable state of a watched monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthView {
    pub status: Status,
    /// History as of the last status change.
    pub history: Vec<HistoryEntry>,
    /// Metrics as of the last status change.
    pub metrics: Metrics,
    /// Message of the most recent probe error since the last recovery.
    pub last_error: Option<String>,
}

impl Default for HealthView {
    fn default() -> Self {
        Self {
            status: Status::Healthy,
            history: Vec::new(),
            metrics: Metrics::default(),
            last_error: None,
        }
    }
}

impl HealthView {
    fn apply(&mut self, event: &HealthEvent) {
        self.status = event.status;
        self.history = event.history.clone();
        self.metrics = event.metrics;
        if event.status == Status::Healthy {
            self.last_error = None;
        }
    }
}

/// A monitor mounted into observable state.
pub struct WatchedMonitor {
    monitor: Monitor,
    rx: watch::Receiver<HealthView>,
}

impl WatchedMonitor {
    /// Build a monitor for `config`, wire its events into the view, and
    /// start probing with `probe`.
    pub fn mount(config: IntervalConfig, probe: ProbeFn) -> HealthResult<Self> {
        Ok(Self::mount_monitor(Monitor::new(config)?, probe))
    }

    /// Mount an already constructed monitor, e.g. one with a log name or
    /// extra listeners.
    pub fn mount_monitor(monitor: Monitor, probe: ProbeFn) -> Self {
        let (tx, rx) = watch::channel(HealthView::default());
        let tx = Arc::new(tx);

        for status in Status::ALL {
            let tx = tx.clone();
            monitor.on(status, move |event| {
                tx.send_modify(|view| view.apply(event));
            });
        }

        let name = monitor.name().to_string();
        monitor.on_error(move |err| {
            warn!(monitor = %name, error = %err, "health probe error");
            tx.send_modify(|view| view.last_error = Some(err.to_string()));
        });

        monitor.check(probe);
        Self { monitor, rx }
    }

    /// Subscribe to view updates.
    pub fn subscribe(&self) -> watch::Receiver<HealthView> {
        self.rx.clone()
    }

    /// Clone of the latest view.
    pub fn current(&self) -> HealthView {
        self.rx.borrow().clone()
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Stop the monitor and release the adapter.
    pub fn unmount(self) {}
}

impl Drop for WatchedMonitor {
    fn drop(&mut self) {
        self.monitor.stop();
    }
}
