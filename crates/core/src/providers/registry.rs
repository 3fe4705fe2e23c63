use async_trait::async_trait;
use log::warn;

use crate::config::{DashboardConfig, ProviderKind};
use crate::errors::CoreError;
use crate::models::coin::Coin;
use crate::models::market::{GlobalMarketData, PricePoint};
use crate::models::sort::CoinSortOrder;

use super::coingecko::CoinGeckoProvider;
use super::mock::MockMarketProvider;
use super::traits::MarketDataProvider;

/// Ordered list of market data providers with automatic fallback.
///
/// Every call goes to the providers in registration order; the first success
/// wins. If all fail, the last error is returned. The registry is itself a
/// `MarketDataProvider`, so callers never deal with fallback themselves.
pub struct MarketProviderRegistry {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl MarketProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with the provider selected in `config`.
    pub fn from_config(config: &DashboardConfig) -> Self {
        let mut registry = Self::new();
        match config.provider {
            ProviderKind::Mock => {
                registry.register(Box::new(MockMarketProvider::new()));
            }
            ProviderKind::CoinGecko => {
                registry.register(Box::new(CoinGeckoProvider::with_base_url(
                    config.api_base_url.clone(),
                    config.vs_currency.clone(),
                )));
            }
        }
        registry
    }

    /// Register a provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.providers.push(provider);
    }

    /// Builder-style `register`.
    pub fn with_provider(mut self, provider: Box<dyn MarketDataProvider>) -> Self {
        self.register(provider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Names of all registered providers, in priority order.
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }
}

impl Default for MarketProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn log_fallback(provider: &str, op: &str, e: &CoreError) {
    warn!("{provider} failed to {op}: {e}; trying next provider");
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for MarketProviderRegistry {
    fn name(&self) -> &str {
        "Registry"
    }

    async fn list_coins(&self, limit: usize, sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.list_coins(limit, sort).await {
                Ok(coins) => return Ok(coins),
                Err(e) => {
                    log_fallback(provider.name(), "list coins", &e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    async fn get_coin(&self, id: &str) -> Result<Coin, CoreError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.get_coin(id).await {
                Ok(coin) => return Ok(coin),
                Err(e) => {
                    log_fallback(provider.name(), "fetch coin", &e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    async fn search_coins(&self, query: &str) -> Result<Vec<Coin>, CoreError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.search_coins(query).await {
                Ok(coins) => return Ok(coins),
                Err(e) => {
                    log_fallback(provider.name(), "search coins", &e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    async fn get_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>, CoreError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.get_history(id, days).await {
                Ok(points) => return Ok(points),
                Err(e) => {
                    log_fallback(provider.name(), "fetch history", &e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }

    async fn get_global_data(&self) -> Result<GlobalMarketData, CoreError> {
        let mut last_error = None;
        for provider in &self.providers {
            match provider.get_global_data().await {
                Ok(data) => return Ok(data),
                Err(e) => {
                    log_fallback(provider.name(), "fetch global data", &e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(CoreError::NoProvider))
    }
}
