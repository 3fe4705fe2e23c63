use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::alert::Alert;
use crate::models::coin::CoinSnapshot;
use crate::notifications::traits::{Notification, NotificationSink};
use crate::providers::traits::MarketSnapshotProvider;

use super::alert_evaluator::{format_threshold, AlertEvaluator};
use super::alert_repository::AlertRepository;
use super::format::format_currency;
use super::refresh_gate::RefreshGate;

/// Whether a tick is running right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Ticking,
}

/// Why a tick did no work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Another market refresh already holds the refresh gate
    RefreshInFlight,
    /// Nothing to evaluate
    NoAlerts,
    /// `stop` was requested
    Stopped,
}

/// Result of one evaluation cycle.
#[derive(Debug)]
pub enum TickOutcome {
    Skipped(SkipReason),
    /// Market data could not be fetched; alerts were left untouched.
    Aborted(CoreError),
    /// Evaluation ran; `triggered` lists the alerts that fired and were removed.
    Completed { triggered: Vec<Alert> },
}

impl TickOutcome {
    /// Alerts fired by this tick (empty unless `Completed`).
    pub fn triggered(&self) -> &[Alert] {
        match self {
            TickOutcome::Completed { triggered } => triggered,
            _ => &[],
        }
    }
}

/// Fixed-interval driver for one-shot price alerts.
///
/// Each tick: skip if a refresh is in flight or there are no alerts, fetch
/// snapshots, evaluate, then for every triggered alert show a notification
/// and remove the alert. Ticks never overlap; a tick that finds the gate
/// taken is dropped, not queued.
pub struct AlertScheduler {
    repository: Arc<Mutex<AlertRepository>>,
    snapshots: Arc<dyn MarketSnapshotProvider>,
    sink: Arc<dyn NotificationSink>,
    evaluator: AlertEvaluator,
    gate: RefreshGate,
    interval: Duration,
    ticking: AtomicBool,
    stopped: AtomicBool,
}

impl AlertScheduler {
    pub fn new(
        repository: Arc<Mutex<AlertRepository>>,
        snapshots: Arc<dyn MarketSnapshotProvider>,
        sink: Arc<dyn NotificationSink>,
        interval: Duration,
    ) -> Self {
        Self {
            repository,
            snapshots,
            sink,
            evaluator: AlertEvaluator::new(),
            gate: RefreshGate::new(),
            interval,
            ticking: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Share a refresh gate with other refreshers (e.g. `MarketService`).
    pub fn with_gate(mut self, gate: RefreshGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn state(&self) -> SchedulerState {
        if self.ticking.load(Ordering::Acquire) {
            SchedulerState::Ticking
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Request that no further ticks start. A tick already running completes.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    fn repository(&self) -> MutexGuard<'_, AlertRepository> {
        self.repository.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run one evaluation cycle.
    pub async fn tick(&self) -> TickOutcome {
        if self.is_stopped() {
            return TickOutcome::Skipped(SkipReason::Stopped);
        }
        let Some(_permit) = self.gate.try_enter() else {
            debug!("Alert tick skipped: market refresh already in flight");
            return TickOutcome::Skipped(SkipReason::RefreshInFlight);
        };
        if self.repository().is_empty() {
            debug!("Alert tick skipped: no alerts configured");
            return TickOutcome::Skipped(SkipReason::NoAlerts);
        }

        let _ticking = TickingFlag::raise(&self.ticking);
        self.run_cycle().await
    }

    async fn run_cycle(&self) -> TickOutcome {
        let snapshots = match self.snapshots.list_snapshots().await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                if e.is_data_unavailable() {
                    warn!("Alert tick aborted, market data unavailable: {e}");
                } else {
                    warn!("Alert tick aborted: {e}");
                }
                return TickOutcome::Aborted(e);
            }
        };

        let alerts: Vec<Alert> = self.repository().list().to_vec();
        let pairs = self.evaluator.triggered_pairs(&alerts, &snapshots);

        let mut triggered = Vec::with_capacity(pairs.len());
        for (alert, snapshot) in pairs {
            if self.fire(alert, snapshot) {
                triggered.push(alert.clone());
            }
        }

        if !triggered.is_empty() {
            info!("{} price alert(s) triggered", triggered.len());
        }
        TickOutcome::Completed { triggered }
    }

    /// Notify and remove one triggered alert. Returns false if the alert was
    /// deleted by someone else after evaluation.
    fn fire(&self, alert: &Alert, snapshot: &CoinSnapshot) -> bool {
        if !self.repository().contains(&alert.id) {
            debug!("Alert {} removed before it could fire; skipping", alert.id);
            return false;
        }

        let notification = build_notification(alert, snapshot);
        // A misbehaving sink must not keep the alert alive or stop the others
        if catch_unwind(AssertUnwindSafe(|| self.sink.show(&notification))).is_err() {
            warn!("Notification sink panicked while showing alert {}", alert.id);
        }

        info!(
            "Alert fired: {} {} (current {})",
            alert.coin_name,
            self.evaluator.describe(alert),
            format_currency(snapshot.current_price)
        );
        self.repository().remove(&alert.id);
        true
    }
}

/// Holds the scheduler in `Ticking` until dropped.
struct TickingFlag<'a>(&'a AtomicBool);

impl<'a> TickingFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for TickingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Title and body for a triggered alert.
pub fn build_notification(alert: &Alert, snapshot: &CoinSnapshot) -> Notification {
    let name = if snapshot.name.is_empty() {
        alert.coin_name.as_str()
    } else {
        snapshot.name.as_str()
    };
    Notification::new(
        format!("Price Alert: {name}"),
        format!(
            "{name} {} {}. Current price: {}. {}",
            alert.rule.label(),
            format_threshold(alert),
            format_currency(snapshot.current_price),
            alert.message
        ),
    )
    .with_icon(snapshot.image.clone())
}

// ── Background loop (native only) ───────────────────────────────────

/// Handle to a running scheduler loop. Dropping it also stops the loop.
#[cfg(not(target_arch = "wasm32"))]
pub struct SchedulerHandle {
    scheduler: Arc<AlertScheduler>,
    stop_tx: tokio::sync::watch::Sender<bool>,
    join: tokio::task::JoinHandle<()>,
}

#[cfg(not(target_arch = "wasm32"))]
impl SchedulerHandle {
    pub fn scheduler(&self) -> &Arc<AlertScheduler> {
        &self.scheduler
    }

    /// Stop scheduling new ticks. Returns immediately.
    pub fn stop(&self) {
        self.scheduler.stop();
        let _ = self.stop_tx.send(true);
    }

    /// Stop and wait for an in-progress tick to finish.
    pub async fn shutdown(self) {
        self.stop();
        if let Err(e) = self.join.await {
            warn!("Alert scheduler task ended abnormally: {e}");
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AlertScheduler {
    /// Start ticking every `interval` on the current tokio runtime.
    /// The first tick happens one full interval after start.
    pub fn spawn(self: Arc<Self>) -> SchedulerHandle {
        use tokio::time::{interval_at, Instant, MissedTickBehavior};

        let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
        let scheduler = Arc::clone(&self);
        let period = self.interval.max(Duration::from_millis(1));

        let join = tokio::spawn(async move {
            info!("Alert scheduler started ({}s interval)", period.as_secs_f64());
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        if scheduler.is_stopped() {
                            break;
                        }
                        scheduler.tick().await;
                    }
                }
            }
            info!("Alert scheduler stopped");
        });

        SchedulerHandle {
            scheduler: self,
            stop_tx,
            join,
        }
    }
}
