use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::coin::{Coin, CoinSnapshot};
use crate::models::market::{GlobalMarketData, PricePoint};
use crate::models::sort::CoinSortOrder;

/// Trait abstraction for market data sources (SOLID: Dependency Inversion).
///
/// The synthetic `MockMarketProvider` and the real `CoinGeckoProvider` both
/// implement this trait, so switching the dashboard to live data is a
/// one-line change in configuration.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Top `limit` coins in the requested order.
    async fn list_coins(&self, limit: usize, sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError>;

    /// Full market row for one coin.
    async fn get_coin(&self, id: &str) -> Result<Coin, CoreError>;

    /// Coins whose name, symbol, or id match `query`.
    async fn search_coins(&self, query: &str) -> Result<Vec<Coin>, CoreError>;

    /// Daily price history covering the last `days` days, oldest first.
    async fn get_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>, CoreError>;

    /// Market-wide statistics.
    async fn get_global_data(&self) -> Result<GlobalMarketData, CoreError>;
}

/// The narrow view of market data the alert scheduler consumes:
/// the latest snapshot of every tracked coin.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MarketSnapshotProvider: Send + Sync {
    async fn list_snapshots(&self) -> Result<Vec<CoinSnapshot>, CoreError>;
}
