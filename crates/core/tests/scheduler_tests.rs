// ═══════════════════════════════════════════════════════════════════
// Scheduler Tests — AlertScheduler ticks, notification delivery,
// failure handling, background loop
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cryptodash_core::errors::CoreError;
use cryptodash_core::models::alert::{AlertDraft, ComparisonRule};
use cryptodash_core::models::coin::CoinSnapshot;
use cryptodash_core::notifications::recording::RecordingSink;
use cryptodash_core::notifications::traits::{Notification, NotificationSink};
use cryptodash_core::providers::traits::MarketSnapshotProvider;
use cryptodash_core::services::alert_repository::AlertRepository;
use cryptodash_core::services::alert_scheduler::{
    build_notification, AlertScheduler, SchedulerState, SkipReason, TickOutcome,
};
use cryptodash_core::services::refresh_gate::RefreshGate;
use cryptodash_core::storage::manager::PersistentStore;

// ═══════════════════════════════════════════════════════════════════
// Test doubles
// ═══════════════════════════════════════════════════════════════════

/// Serves whatever snapshots (or error) the test last configured.
struct ScriptedMarket {
    next: Mutex<Result<Vec<CoinSnapshot>, String>>,
    calls: AtomicUsize,
}

impl ScriptedMarket {
    fn new(snapshots: Vec<CoinSnapshot>) -> Arc<Self> {
        Arc::new(Self {
            next: Mutex::new(Ok(snapshots)),
            calls: AtomicUsize::new(0),
        })
    }

    fn set(&self, snapshots: Vec<CoinSnapshot>) {
        *self.next.lock().unwrap() = Ok(snapshots);
    }

    fn fail(&self, reason: &str) {
        *self.next.lock().unwrap() = Err(reason.to_string());
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketSnapshotProvider for ScriptedMarket {
    async fn list_snapshots(&self) -> Result<Vec<CoinSnapshot>, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.next
            .lock()
            .unwrap()
            .clone()
            .map_err(CoreError::DataUnavailable)
    }
}

/// Deletes one alert while the snapshot fetch is in flight.
struct RemovingMarket {
    repository: Arc<Mutex<AlertRepository>>,
    victim: String,
    snapshots: Vec<CoinSnapshot>,
}

#[async_trait]
impl MarketSnapshotProvider for RemovingMarket {
    async fn list_snapshots(&self) -> Result<Vec<CoinSnapshot>, CoreError> {
        self.repository.lock().unwrap().remove(&self.victim);
        Ok(self.snapshots.clone())
    }
}

struct PanickingSink {
    attempts: AtomicUsize,
}

impl NotificationSink for PanickingSink {
    fn show(&self, _notification: &Notification) {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        panic!("notification backend crashed");
    }
}

fn repository() -> Arc<Mutex<AlertRepository>> {
    Arc::new(Mutex::new(AlertRepository::load(PersistentStore::in_memory())))
}

fn add(repo: &Arc<Mutex<AlertRepository>>, coin: &str, rule: ComparisonRule, threshold: f64) -> String {
    let name = match coin {
        "bitcoin" => "Bitcoin",
        "ethereum" => "Ethereum",
        other => other,
    };
    repo.lock()
        .unwrap()
        .add(AlertDraft::new(coin, name, rule, threshold).with_message("check it"))
        .unwrap()
        .id
}

fn btc(price: f64) -> CoinSnapshot {
    CoinSnapshot::new("bitcoin", price, 0.0).with_name("Bitcoin")
}

fn scheduler(
    repo: &Arc<Mutex<AlertRepository>>,
    market: Arc<dyn MarketSnapshotProvider>,
    sink: Arc<dyn NotificationSink>,
) -> AlertScheduler {
    AlertScheduler::new(Arc::clone(repo), market, sink, Duration::from_secs(30))
}

// ═══════════════════════════════════════════════════════════════════
// Single ticks
// ═══════════════════════════════════════════════════════════════════

mod tick {
    use super::*;

    #[tokio::test]
    async fn fires_once_when_threshold_reached() {
        let repo = repository();
        let id = add(&repo, "bitcoin", ComparisonRule::Above, 50_000.0);
        let market = ScriptedMarket::new(vec![btc(49_999.0)]);
        let sink = Arc::new(RecordingSink::new());
        let scheduler = scheduler(&repo, market.clone(), sink.clone());

        let first = scheduler.tick().await;
        assert!(matches!(first, TickOutcome::Completed { ref triggered } if triggered.is_empty()));
        assert!(sink.is_empty());
        assert_eq!(repo.lock().unwrap().len(), 1);

        market.set(vec![btc(50_000.0)]);
        let second = scheduler.tick().await;
        assert_eq!(second.triggered().len(), 1);
        assert_eq!(second.triggered()[0].id, id);
        assert!(repo.lock().unwrap().is_empty());

        let shown = sink.notifications();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Price Alert: Bitcoin");
        assert!(shown[0].body.contains("$50,000.00"));

        // One-shot: nothing left to fire
        let third = scheduler.tick().await;
        assert!(matches!(third, TickOutcome::Skipped(SkipReason::NoAlerts)));
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn only_triggered_alert_is_removed() {
        let repo = repository();
        let btc_id = add(&repo, "bitcoin", ComparisonRule::Above, 60_000.0);
        let eth_id = add(&repo, "ethereum", ComparisonRule::Below, 2_000.0);
        let market = ScriptedMarket::new(vec![
            btc(67_000.0),
            CoinSnapshot::new("ethereum", 3_500.0, 0.0),
        ]);
        let sink = Arc::new(RecordingSink::new());

        let outcome = scheduler(&repo, market, sink.clone()).tick().await;
        assert_eq!(outcome.triggered().len(), 1);
        assert_eq!(outcome.triggered()[0].id, btc_id);

        let repo = repo.lock().unwrap();
        assert!(!repo.contains(&btc_id));
        assert!(repo.contains(&eth_id));
        assert_eq!(sink.len(), 1);
    }

    #[tokio::test]
    async fn data_unavailable_aborts_and_keeps_alerts() {
        let repo = repository();
        add(&repo, "bitcoin", ComparisonRule::Above, 1.0);
        let market = ScriptedMarket::new(vec![]);
        market.fail("rate limited");
        let sink = Arc::new(RecordingSink::new());
        let scheduler = scheduler(&repo, market.clone(), sink.clone());

        let outcome = scheduler.tick().await;
        assert!(matches!(outcome, TickOutcome::Aborted(ref e) if e.is_data_unavailable()));
        assert_eq!(repo.lock().unwrap().len(), 1);
        assert!(sink.is_empty());

        // The next tick retries normally
        market.set(vec![btc(2.0)]);
        assert_eq!(scheduler.tick().await.triggered().len(), 1);
        assert_eq!(market.calls(), 2);
    }

    #[tokio::test]
    async fn empty_repository_skips_fetch() {
        let repo = repository();
        let market = ScriptedMarket::new(vec![btc(1.0)]);
        let outcome = scheduler(&repo, market.clone(), Arc::new(RecordingSink::new()))
            .tick()
            .await;
        assert!(matches!(outcome, TickOutcome::Skipped(SkipReason::NoAlerts)));
        assert_eq!(market.calls(), 0);
    }

    #[tokio::test]
    async fn busy_gate_skips_tick() {
        let repo = repository();
        add(&repo, "bitcoin", ComparisonRule::Above, 1.0);
        let market = ScriptedMarket::new(vec![btc(2.0)]);
        let gate = RefreshGate::new();
        let scheduler = scheduler(&repo, market.clone(), Arc::new(RecordingSink::new()))
            .with_gate(gate.clone());

        let permit = gate.try_enter().unwrap();
        let outcome = scheduler.tick().await;
        assert!(matches!(outcome, TickOutcome::Skipped(SkipReason::RefreshInFlight)));
        assert_eq!(market.calls(), 0);
        assert_eq!(repo.lock().unwrap().len(), 1);

        drop(permit);
        assert_eq!(scheduler.tick().await.triggered().len(), 1);
        assert!(!gate.is_busy());
    }

    #[tokio::test]
    async fn alert_deleted_mid_tick_does_not_fire() {
        let repo = repository();
        let victim = add(&repo, "bitcoin", ComparisonRule::Above, 1.0);
        let survivor = add(&repo, "ethereum", ComparisonRule::Above, 1.0);
        let market = Arc::new(RemovingMarket {
            repository: Arc::clone(&repo),
            victim: victim.clone(),
            snapshots: vec![btc(10.0), CoinSnapshot::new("ethereum", 10.0, 0.0)],
        });
        let sink = Arc::new(RecordingSink::new());

        let outcome = scheduler(&repo, market, sink.clone()).tick().await;
        let fired: Vec<&str> = outcome.triggered().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(fired, [survivor.as_str()]);
        assert_eq!(sink.len(), 1);
        assert!(repo.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn panicking_sink_still_removes_alerts() {
        let repo = repository();
        add(&repo, "bitcoin", ComparisonRule::Above, 1.0);
        add(&repo, "ethereum", ComparisonRule::Above, 1.0);
        let market = ScriptedMarket::new(vec![btc(5.0), CoinSnapshot::new("ethereum", 5.0, 0.0)]);
        let sink = Arc::new(PanickingSink {
            attempts: AtomicUsize::new(0),
        });

        let outcome = scheduler(&repo, market, sink.clone()).tick().await;
        assert_eq!(outcome.triggered().len(), 2);
        assert_eq!(sink.attempts.load(Ordering::SeqCst), 2);
        assert!(repo.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_coin_is_left_alone() {
        let repo = repository();
        add(&repo, "notacoin", ComparisonRule::Above, 0.0);
        let market = ScriptedMarket::new(vec![btc(1.0)]);
        let outcome = scheduler(&repo, market, Arc::new(RecordingSink::new())).tick().await;
        assert!(outcome.triggered().is_empty());
        assert_eq!(repo.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn stopped_scheduler_skips() {
        let repo = repository();
        add(&repo, "bitcoin", ComparisonRule::Above, 1.0);
        let market = ScriptedMarket::new(vec![btc(2.0)]);
        let scheduler = scheduler(&repo, market.clone(), Arc::new(RecordingSink::new()));

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        scheduler.stop();
        assert!(scheduler.is_stopped());
        assert!(matches!(scheduler.tick().await, TickOutcome::Skipped(SkipReason::Stopped)));
        assert_eq!(market.calls(), 0);
        assert_eq!(scheduler.state(), SchedulerState::Idle);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Notification content
// ═══════════════════════════════════════════════════════════════════

mod notification {
    use super::*;

    #[test]
    fn body_describes_rule_and_price() {
        let mut repo = AlertRepository::load(PersistentStore::in_memory());
        let alert = repo
            .add(
                AlertDraft::new("ethereum", "Ethereum", ComparisonRule::ChangeBelow, -5.0)
                    .with_message("ETH dump"),
            )
            .unwrap();
        let snapshot = CoinSnapshot::new("ethereum", 3_100.5, -6.2).with_name("Ethereum");

        let n = build_notification(&alert, &snapshot);
        assert_eq!(n.title, "Price Alert: Ethereum");
        assert_eq!(
            n.body,
            "Ethereum 24h change below -5.00%. Current price: $3,100.50. ETH dump"
        );
        assert!(n.icon.is_none());
    }

    #[test]
    fn icon_comes_from_snapshot() {
        let mut repo = AlertRepository::load(PersistentStore::in_memory());
        let alert = repo
            .add(AlertDraft::new("bitcoin", "Bitcoin", ComparisonRule::Above, 1.0))
            .unwrap();
        let mut snapshot = btc(2.0);
        snapshot.image = Some("https://img/btc.png".into());
        let n = build_notification(&alert, &snapshot);
        assert_eq!(n.icon.as_deref(), Some("https://img/btc.png"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Background loop
// ═══════════════════════════════════════════════════════════════════

mod background {
    use super::*;

    #[tokio::test]
    async fn spawned_loop_fires_and_stops() {
        let repo = repository();
        add(&repo, "bitcoin", ComparisonRule::Above, 100.0);
        let market = ScriptedMarket::new(vec![btc(50.0)]);
        let sink = Arc::new(RecordingSink::new());
        let scheduler = Arc::new(
            AlertScheduler::new(
                Arc::clone(&repo),
                market.clone(),
                sink.clone(),
                Duration::from_millis(20),
            ),
        );

        let handle = scheduler.spawn();
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(market.calls() >= 2);
        assert!(sink.is_empty());

        market.set(vec![btc(150.0)]);
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(sink.len(), 1);
        assert!(repo.lock().unwrap().is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn no_ticks_after_shutdown() {
        let repo = repository();
        add(&repo, "bitcoin", ComparisonRule::Above, 100.0);
        let market = ScriptedMarket::new(vec![btc(50.0)]);
        let scheduler = Arc::new(AlertScheduler::new(
            Arc::clone(&repo),
            market.clone(),
            Arc::new(RecordingSink::new()),
            Duration::from_millis(20),
        ));

        let handle = scheduler.spawn();
        tokio::time::sleep(Duration::from_millis(70)).await;
        let scheduler = Arc::clone(handle.scheduler());
        handle.shutdown().await;
        assert!(scheduler.is_stopped());

        let calls = market.calls();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(market.calls(), calls);
    }

    #[tokio::test]
    async fn first_tick_waits_one_interval() {
        let repo = repository();
        add(&repo, "bitcoin", ComparisonRule::Above, 100.0);
        let market = ScriptedMarket::new(vec![btc(50.0)]);
        let scheduler = Arc::new(AlertScheduler::new(
            Arc::clone(&repo),
            market.clone(),
            Arc::new(RecordingSink::new()),
            Duration::from_secs(3600),
        ));

        let handle = scheduler.spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(market.calls(), 0);
        handle.shutdown().await;
    }
}
