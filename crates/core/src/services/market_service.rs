use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::config::DashboardConfig;
use crate::errors::CoreError;
use crate::models::coin::{Coin, CoinSnapshot};
use crate::models::market::{GlobalMarketData, PricePoint};
use crate::models::sort::{sort_coins, CoinSortOrder};
use crate::providers::registry::MarketProviderRegistry;
use crate::providers::traits::{MarketDataProvider, MarketSnapshotProvider};

use super::refresh_gate::RefreshGate;

/// Longest history window a chart may request.
pub const MAX_HISTORY_DAYS: u32 = 365;

/// How long a fetched history stays fresh.
const HISTORY_TTL_SECS: i64 = 300;

/// Market data for the dashboard, on top of a provider (usually a
/// `MarketProviderRegistry` with fallback).
///
/// - Listings and search results are sorted, with the pinned coin first.
/// - The most recent listing is kept as the "current" coin list.
/// - Price histories are cached per (coin, days) for `HISTORY_TTL_SECS`.
pub struct MarketService {
    provider: Box<dyn MarketDataProvider>,
    pinned_coin: Option<String>,
    coin_limit: usize,
    gate: RefreshGate,
    coins: Mutex<Vec<Coin>>,
    sort: Mutex<CoinSortOrder>,
    history_cache: Mutex<HashMap<(String, u32), (DateTime<Utc>, Vec<PricePoint>)>>,
}

impl MarketService {
    pub fn new(provider: Box<dyn MarketDataProvider>, coin_limit: usize, pinned_coin: Option<String>) -> Self {
        Self {
            provider,
            pinned_coin,
            coin_limit,
            gate: RefreshGate::new(),
            coins: Mutex::new(Vec::new()),
            sort: Mutex::new(CoinSortOrder::default()),
            history_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Build the service with the provider selected in `config`.
    pub fn from_config(config: &DashboardConfig) -> Self {
        Self::new(
            Box::new(MarketProviderRegistry::from_config(config)),
            config.coin_limit,
            config.pinned_coin.clone(),
        )
    }

    /// The gate guarding market refreshes; share it with the alert scheduler.
    pub fn gate(&self) -> RefreshGate {
        self.gate.clone()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// The most recently fetched coin list.
    pub fn current_coins(&self) -> Vec<Coin> {
        self.coins.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// The sort order used by the last listing.
    pub fn sort_order(&self) -> CoinSortOrder {
        *self.sort.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn pinned(&self) -> Option<&str> {
        self.pinned_coin.as_deref()
    }

    /// Fetch the top `limit` coins in `sort` order and make them current.
    pub async fn fetch_coins(&self, limit: usize, sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError> {
        let mut coins = self.provider.list_coins(limit, sort).await?;
        sort_coins(&mut coins, sort, self.pinned());
        coins.truncate(limit);

        *self.sort.lock().unwrap_or_else(|e| e.into_inner()) = sort;
        *self.coins.lock().unwrap_or_else(|e| e.into_inner()) = coins.clone();
        Ok(coins)
    }

    /// User-initiated reload of the current listing.
    /// Returns `Ok(None)` if another refresh (or an alert tick) is in flight.
    pub async fn refresh_coins(&self) -> Result<Option<Vec<Coin>>, CoreError> {
        let Some(_permit) = self.gate.try_enter() else {
            return Ok(None);
        };
        let sort = self.sort_order();
        self.fetch_coins(self.coin_limit, sort).await.map(Some)
    }

    /// Search by name, symbol, or id. An empty query lists the top coins.
    pub async fn search_coins(&self, query: &str, sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError> {
        if query.trim().is_empty() {
            return self.fetch_coins(self.coin_limit, sort).await;
        }
        let mut coins = self.provider.search_coins(query.trim()).await?;
        sort_coins(&mut coins, sort, self.pinned());
        Ok(coins)
    }

    pub async fn get_coin(&self, id: &str) -> Result<Coin, CoreError> {
        self.provider.get_coin(id).await
    }

    /// Daily price history for charts, oldest first.
    pub async fn get_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>, CoreError> {
        if !(1..=MAX_HISTORY_DAYS).contains(&days) {
            return Err(CoreError::ValidationError(format!(
                "History range of {days} days out of range (expected 1..={MAX_HISTORY_DAYS})"
            )));
        }

        let key = (id.to_string(), days);
        let now = Utc::now();
        {
            let cache = self.history_cache.lock().unwrap_or_else(|e| e.into_inner());
            if let Some((fetched_at, points)) = cache.get(&key) {
                if (now - *fetched_at).num_seconds() < HISTORY_TTL_SECS {
                    return Ok(points.clone());
                }
            }
        }

        let points = self.provider.get_history(id, days).await?;
        self.history_cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, (now, points.clone()));
        Ok(points)
    }

    pub fn clear_history_cache(&self) {
        self.history_cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }

    pub async fn get_global_data(&self) -> Result<GlobalMarketData, CoreError> {
        self.provider.get_global_data().await
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketSnapshotProvider for MarketService {
    /// Refresh the current listing and return its snapshots.
    /// An empty listing counts as unavailable data.
    async fn list_snapshots(&self) -> Result<Vec<CoinSnapshot>, CoreError> {
        let coins = self.fetch_coins(self.coin_limit, self.sort_order()).await?;
        if coins.is_empty() {
            return Err(CoreError::DataUnavailable(format!(
                "{} returned no coins",
                self.provider_name()
            )));
        }
        Ok(coins.iter().map(Coin::snapshot).collect())
    }
}
