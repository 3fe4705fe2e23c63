pub mod config;
pub mod errors;
pub mod models;
pub mod notifications;
pub mod providers;
pub mod services;
pub mod storage;

use std::sync::{Arc, Mutex, MutexGuard};

use config::DashboardConfig;
use errors::CoreError;
use models::{
    alert::{Alert, AlertDraft},
    coin::Coin,
    market::{GlobalMarketData, PricePoint},
    sort::CoinSortOrder,
    theme::Theme,
};
use notifications::traits::NotificationSink;
use services::{
    alert_repository::AlertRepository,
    alert_scheduler::{AlertScheduler, TickOutcome},
    market_service::MarketService,
    theme_service::ThemeService,
};
use storage::manager::PersistentStore;

/// Main entry point for the Crypto Dashboard core library.
///
/// One instance per session. It owns the alert repository, market data,
/// theme preference, and notification sink, and hands shared references to
/// the alert scheduler it builds.
#[must_use]
pub struct CryptoDashboard {
    config: DashboardConfig,
    store: PersistentStore,
    alerts: Arc<Mutex<AlertRepository>>,
    market: Arc<MarketService>,
    theme: ThemeService,
    sink: Arc<dyn NotificationSink>,
}

impl std::fmt::Debug for CryptoDashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoDashboard")
            .field("provider", &self.market.provider_name())
            .field("store", &self.store)
            .field("alerts", &self.alerts().len())
            .field("theme", &self.theme.get())
            .finish()
    }
}

impl CryptoDashboard {
    /// Build a dashboard with the provider selected in `config`.
    pub fn new(config: DashboardConfig, store: PersistentStore, sink: Arc<dyn NotificationSink>) -> Self {
        let market = MarketService::from_config(&config);
        Self::with_market(config, store, market, sink)
    }

    /// Build a dashboard around an already-configured market service.
    pub fn with_market(
        config: DashboardConfig,
        store: PersistentStore,
        market: MarketService,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        let alerts = AlertRepository::load(store.clone());
        let theme = ThemeService::new(store.clone());
        Self {
            config,
            store,
            alerts: Arc::new(Mutex::new(alerts)),
            market: Arc::new(market),
            theme,
            sink,
        }
    }

    /// Build a dashboard persisting to files under `config.data_dir` (native only).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open(config: DashboardConfig, sink: Arc<dyn NotificationSink>) -> Result<Self, CoreError> {
        let store = PersistentStore::new(storage::file::FileStore::open(&config.data_dir)?);
        Ok(Self::new(config, store, sink))
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn store(&self) -> &PersistentStore {
        &self.store
    }

    pub fn market(&self) -> &Arc<MarketService> {
        &self.market
    }

    /// Shared handle to the alert repository.
    pub fn alert_repository(&self) -> Arc<Mutex<AlertRepository>> {
        Arc::clone(&self.alerts)
    }

    fn alerts(&self) -> MutexGuard<'_, AlertRepository> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ── Alerts ──────────────────────────────────────────────────────

    /// All alerts, in creation order.
    #[must_use]
    pub fn list_alerts(&self) -> Vec<Alert> {
        self.alerts().list().to_vec()
    }

    /// Create an alert. Fails with `ValidationError` on malformed input.
    pub fn add_alert(&self, draft: AlertDraft) -> Result<Alert, CoreError> {
        self.alerts().add(draft)
    }

    /// Delete an alert. Unknown ids are ignored.
    pub fn remove_alert(&self, id: &str) -> Option<Alert> {
        self.alerts().remove(id)
    }

    pub fn clear_alerts(&self) {
        self.alerts().clear();
    }

    // ── Market data ─────────────────────────────────────────────────

    pub async fn fetch_coins(&self, sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError> {
        self.market.fetch_coins(self.config.coin_limit, sort).await
    }

    pub async fn search_coins(&self, query: &str, sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError> {
        self.market.search_coins(query, sort).await
    }

    pub async fn get_coin(&self, id: &str) -> Result<Coin, CoreError> {
        self.market.get_coin(id).await
    }

    pub async fn get_coin_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>, CoreError> {
        self.market.get_history(id, days).await
    }

    pub async fn get_global_data(&self) -> Result<GlobalMarketData, CoreError> {
        self.market.get_global_data().await
    }

    // ── Theme ───────────────────────────────────────────────────────

    #[must_use]
    pub fn theme(&self) -> Theme {
        self.theme.get()
    }

    pub fn set_theme(&self, theme: Theme) {
        self.theme.set(theme);
    }

    pub fn toggle_theme(&self) -> Theme {
        self.theme.toggle()
    }

    // ── Scheduling ──────────────────────────────────────────────────

    /// A scheduler wired to this dashboard's alerts, market, and sink.
    /// It shares the market service's refresh gate, so user refreshes and
    /// alert ticks never overlap.
    pub fn scheduler(&self) -> AlertScheduler {
        AlertScheduler::new(
            Arc::clone(&self.alerts),
            self.market.clone(),
            Arc::clone(&self.sink),
            self.config.poll_interval(),
        )
        .with_gate(self.market.gate())
    }

    /// Evaluate alerts once, right now.
    pub async fn check_alerts(&self) -> TickOutcome {
        self.scheduler().tick().await
    }

    /// Start the periodic alert scheduler on the current tokio runtime.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn spawn_scheduler(&self) -> services::alert_scheduler::SchedulerHandle {
        Arc::new(self.scheduler()).spawn()
    }
}
