//! Health monitor — owns the probe loop for one target.
//!
//! A [`Monitor`] runs a caller-supplied probe, feeds each result through
//! the [`StatusTracker`], records it in the history, and notifies
//! listeners when the status changes. The delay before the next probe
//! depends on the status the probe left behind.
//!
//! At most one probe loop is live per monitor. `check()` and `stop()`
//! both go through `MonitorState::replace_loop`, and every replacement
//! bumps a generation counter so a probe that completes after its loop
//! was replaced is discarded instead of recorded.

use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::config::IntervalConfig;
use crate::error::{HealthResult, ProbeError};
use crate::history::{History, HistoryEntry};
use crate::metrics::{DEFAULT_WINDOW, Metrics};
use crate::status::{EventKind, Status};
use crate::tracker::{Counters, StatusTracker};

/// Future returned by a probe: `Ok(healthy)` or the reason it could not tell.
pub type ProbeFuture = Pin<Box<dyn Future<Output = anyhow::Result<bool>> + Send>>;

/// Caller-supplied health probe.
pub type ProbeFn = Arc<dyn Fn() -> ProbeFuture + Send + Sync>;

/// Listener for status changes.
pub type StatusListener = Arc<dyn Fn(&HealthEvent) + Send + Sync>;

/// Listener for probe errors.
pub type ErrorListener = Arc<dyn Fn(&ProbeError) + Send + Sync>;

/// Wrap an async closure as a [`ProbeFn`].
pub fn probe_fn<F, Fut>(f: F) -> ProbeFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<bool>> + Send + 'static,
{
    Arc::new(move || -> ProbeFuture { Box::pin(f()) })
}

/// Snapshot delivered to status listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct HealthEvent {
    pub status: Status,
    /// History inside the default window, oldest first.
    pub history: Vec<HistoryEntry>,
    pub metrics: Metrics,
}

/// Handle to the running probe loop.
struct LoopSlot {
    handle: JoinHandle<()>,
    shutdown_tx: watch::Sender<bool>,
}

struct MonitorState {
    tracker: StatusTracker,
    history: History,
    probe: Option<ProbeFn>,
    /// Bumped whenever the loop is replaced or stopped.
    generation: u64,
    slot: Option<LoopSlot>,
}

impl MonitorState {
    /// Swap the running loop for `next`, signalling the old one to exit.
    fn replace_loop(&mut self, next: Option<LoopSlot>) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(old) = std::mem::replace(&mut self.slot, next) {
            let _ = old.shutdown_tx.send(true);
            old.handle.abort();
        }
    }

    fn snapshot(&self, now: Instant) -> HealthEvent {
        HealthEvent {
            status: self.tracker.status(),
            history: self.history.within(DEFAULT_WINDOW, now),
            metrics: Metrics::compute(&self.history, DEFAULT_WINDOW, now),
        }
    }
}

#[derive(Default)]
struct Listeners {
    status: HashMap<Status, Vec<StatusListener>>,
    error: Vec<ErrorListener>,
}

/// Result of applying one probe outcome, ready for dispatch.
struct Settled {
    status: Status,
    /// Present only when the status changed.
    event: Option<HealthEvent>,
    error: Option<ProbeError>,
}

struct Shared {
    name: String,
    config: IntervalConfig,
    state: Mutex<MonitorState>,
    listeners: Mutex<Listeners>,
}

/// Adaptive-interval health monitor.
///
/// Cloning yields another handle to the same monitor. The probe loop
/// holds only a weak reference, so it ends once every handle is dropped.
/// Listeners are owned by the monitor: a listener that captures a
/// `Monitor` keeps it (and its loop) alive until `stop()`. Capture a
/// [`WeakMonitor`] from [`downgrade`](Self::downgrade) instead.
#[derive(Clone)]
pub struct Monitor {
    shared: Arc<Shared>,
}

/// Non-owning handle to a [`Monitor`], for use inside its own listeners.
#[derive(Clone)]
pub struct WeakMonitor {
    shared: Weak<Shared>,
}

impl WeakMonitor {
    /// The monitor, if any strong handle is still alive.
    pub fn upgrade(&self) -> Option<Monitor> {
        self.shared.upgrade().map(|shared| Monitor { shared })
    }
}

impl Monitor {
    /// Create a monitor. It starts healthy and does not probe until
    /// [`check`](Self::check) is called.
    pub fn new(config: IntervalConfig) -> HealthResult<Self> {
        Self::named("monitor", config)
    }

    /// Create a monitor whose log lines carry `name`.
    pub fn named(name: impl Into<String>, config: IntervalConfig) -> HealthResult<Self> {
        config.validate()?;
        let tracker = StatusTracker::new(&config);
        Ok(Self {
            shared: Arc::new(Shared {
                name: name.into(),
                config,
                state: Mutex::new(MonitorState {
                    tracker,
                    history: History::new(),
                    probe: None,
                    generation: 0,
                    slot: None,
                }),
                listeners: Mutex::new(Listeners::default()),
            }),
        })
    }

    /// Install `probe` and start the probe loop.
    ///
    /// Any previous probe and loop are replaced. Listeners for the current
    /// status are notified right away with the current snapshot, and the
    /// first probe runs after the current status's interval.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn check(&self, probe: ProbeFn) -> &Self {
        let event = {
            let mut state = self.shared.lock_state();
            state.probe = Some(probe);

            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            let delay = self
                .shared
                .config
                .interval_for(EventKind::from(state.tracker.status()));
            let generation = state.generation.wrapping_add(1);
            let handle = tokio::spawn(run_probe_loop(
                Arc::downgrade(&self.shared),
                generation,
                delay,
                shutdown_rx,
            ));
            state.replace_loop(Some(LoopSlot {
                handle,
                shutdown_tx,
            }));
            debug_assert_eq!(state.generation, generation);

            info!(
                monitor = %self.shared.name,
                status = %state.tracker.status(),
                first_probe_in = ?delay,
                "health monitor started"
            );
            state.snapshot(Instant::now())
        };

        self.shared.notify_status(&event);
        self
    }

    /// Install `probe` without scheduling it or notifying listeners.
    ///
    /// Replaces any previous probe; a running loop picks it up on its next
    /// cycle. Useful together with [`run_once`](Self::run_once).
    pub fn set_probe(&self, probe: ProbeFn) -> &Self {
        self.shared.lock_state().probe = Some(probe);
        self
    }

    /// Cancel the pending probe. A no-op when nothing is scheduled.
    ///
    /// A probe already in flight is dropped and its result discarded.
    pub fn stop(&self) {
        let mut state = self.shared.lock_state();
        if state.slot.is_none() {
            return;
        }
        state.replace_loop(None);
        info!(monitor = %self.shared.name, "health monitor stopped");
    }

    /// Register a listener for transitions into `status`.
    pub fn on<F>(&self, status: Status, listener: F) -> &Self
    where
        F: Fn(&HealthEvent) + Send + Sync + 'static,
    {
        self.shared
            .lock_listeners()
            .status
            .entry(status)
            .or_default()
            .push(Arc::new(listener));
        self
    }

    /// Register a listener for probe errors.
    pub fn on_error<F>(&self, listener: F) -> &Self
    where
        F: Fn(&ProbeError) + Send + Sync + 'static,
    {
        self.shared.lock_listeners().error.push(Arc::new(listener));
        self
    }

    /// Run one probe cycle now, outside the schedule.
    ///
    /// The result is recorded and dispatched exactly as a scheduled probe
    /// would be. Without an installed probe the cycle fails with
    /// [`ProbeError::NoProbe`].
    pub async fn run_once(&self) -> Status {
        let outcome = self.shared.execute_probe().await;
        match self.shared.settle(None, outcome) {
            Some(settled) => {
                let status = settled.status;
                self.shared.dispatch(settled);
                status
            }
            None => self.status(),
        }
    }

    /// History recorded within `window` of now, oldest first.
    pub fn recent_history(&self, window: Duration) -> Vec<HistoryEntry> {
        self.shared
            .lock_state()
            .history
            .within(window, Instant::now())
    }

    /// Metrics over the default 60-minute window.
    pub fn metrics(&self) -> Metrics {
        self.metrics_within(DEFAULT_WINDOW)
    }

    /// Metrics over an arbitrary window.
    pub fn metrics_within(&self, window: Duration) -> Metrics {
        let state = self.shared.lock_state();
        Metrics::compute(&state.history, window, Instant::now())
    }

    pub fn status(&self) -> Status {
        self.shared.lock_state().tracker.status()
    }

    pub fn counters(&self) -> Counters {
        self.shared.lock_state().tracker.counters()
    }

    /// Whether a probe loop is scheduled and its task is still alive.
    pub fn is_running(&self) -> bool {
        self.shared
            .lock_state()
            .slot
            .as_ref()
            .is_some_and(|slot| !slot.handle.is_finished())
    }

    pub fn history_len(&self) -> usize {
        self.shared.lock_state().history.len()
    }

    pub fn config(&self) -> &IntervalConfig {
        &self.shared.config
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn downgrade(&self) -> WeakMonitor {
        WeakMonitor {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("name", &self.shared.name)
            .field("status", &self.status())
            .field("running", &self.is_running())
            .finish()
    }
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, MonitorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Listeners> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn interval_for(&self, status: Status) -> Duration {
        self.config.interval_for(EventKind::from(status))
    }

    async fn execute_probe(&self) -> Result<bool, ProbeError> {
        let probe = self.lock_state().probe.clone();
        let Some(probe) = probe else {
            return Err(ProbeError::NoProbe);
        };

        match self.config.probe_timeout {
            Some(limit) => match tokio::time::timeout(limit, probe()).await {
                Ok(result) => result.map_err(ProbeError::from),
                Err(_) => Err(ProbeError::Timeout(limit)),
            },
            None => probe().await.map_err(ProbeError::from),
        }
    }

    /// Apply a probe outcome to the tracker and history.
    ///
    /// Returns `None` when `generation` no longer matches, meaning the
    /// loop that ran the probe has been stopped or replaced.
    fn settle(&self, generation: Option<u64>, outcome: Result<bool, ProbeError>) -> Option<Settled> {
        let mut state = self.lock_state();
        if generation.is_some_and(|g| g != state.generation) {
            debug!(monitor = %self.name, "discarding result from a stopped probe loop");
            return None;
        }

        let healthy = matches!(outcome, Ok(true));
        let transition = state.tracker.record(healthy);
        let now = Instant::now();
        state.history.push(HistoryEntry {
            status: transition.to,
            timestamp: now,
        });

        let counters = state.tracker.counters();
        debug!(
            monitor = %self.name,
            healthy,
            status = %transition.to,
            suspect_count = counters.suspect,
            healthy_count = counters.healthy,
            "probe completed"
        );

        let event = transition.changed().then(|| state.snapshot(now));
        Some(Settled {
            status: transition.to,
            event,
            error: outcome.err(),
        })
    }

    fn dispatch(&self, settled: Settled) {
        if let Some(event) = &settled.event {
            self.notify_status(event);
        }
        if let Some(err) = &settled.error {
            warn!(monitor = %self.name, error = %err, "health probe failed");
            self.notify_error(err);
        }
    }

    /// Call every listener for `event.status`, in registration order.
    ///
    /// No lock is held while listeners run, and a panicking listener does
    /// not prevent the rest from running.
    fn notify_status(&self, event: &HealthEvent) {
        let listeners = self
            .lock_listeners()
            .status
            .get(&event.status)
            .cloned()
            .unwrap_or_default();

        for (index, listener) in listeners.iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                error!(
                    monitor = %self.name,
                    status = %event.status,
                    listener = index,
                    "status listener panicked"
                );
            }
        }
    }

    fn notify_error(&self, err: &ProbeError) {
        let listeners = self.lock_listeners().error.clone();

        for (index, listener) in listeners.iter().enumerate() {
            if panic::catch_unwind(AssertUnwindSafe(|| listener(err))).is_err() {
                error!(monitor = %self.name, listener = index, "error listener panicked");
            }
        }
    }
}

/// Roughly 30 years; stands in for intervals too large to schedule.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + delay`, clamped to a far-future instant when the sum overflows.
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

/// The probe loop for one `check()` call.
///
/// Sleeps until the next deadline, runs the probe, and picks the next
/// deadline from the resulting status before dispatching events, so slow
/// listeners do not push the schedule back.
async fn run_probe_loop(
    shared: Weak<Shared>,
    generation: u64,
    first_delay: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut deadline = deadline_after(Instant::now(), first_delay);

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => {}
            _ = shutdown.changed() => break,
        }

        let Some(shared) = shared.upgrade() else {
            break;
        };

        let outcome = tokio::select! {
            outcome = shared.execute_probe() => outcome,
            _ = shutdown.changed() => break,
        };

        let Some(settled) = shared.settle(Some(generation), outcome) else {
            break;
        };
        deadline = deadline_after(Instant::now(), shared.interval_for(settled.status));
        shared.dispatch(settled);
    }

    debug!(generation, "probe loop exiting");
}
