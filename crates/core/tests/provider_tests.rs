// ═══════════════════════════════════════════════════════════════════
// Provider Tests — MockMarketProvider, MarketProviderRegistry fallback,
// CoinGeckoProvider construction
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cryptodash_core::config::{DashboardConfig, ProviderKind};
use cryptodash_core::errors::CoreError;
use cryptodash_core::models::coin::Coin;
use cryptodash_core::models::market::{GlobalMarketData, PricePoint};
use cryptodash_core::models::sort::CoinSortOrder;
use cryptodash_core::providers::coingecko::{CoinGeckoProvider, DEFAULT_BASE_URL};
use cryptodash_core::providers::mock::{default_catalogue, MockMarketProvider};
use cryptodash_core::providers::registry::MarketProviderRegistry;
use cryptodash_core::providers::traits::MarketDataProvider;

// ═══════════════════════════════════════════════════════════════════
// Failing Provider (simulates an API outage)
// ═══════════════════════════════════════════════════════════════════

struct FailingProvider {
    calls: Arc<AtomicUsize>,
}

impl FailingProvider {
    fn new() -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    fn fail<T>(&self) -> Result<T, CoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CoreError::Api {
            provider: "Failing".into(),
            message: "HTTP 503".into(),
        })
    }
}

#[async_trait]
impl MarketDataProvider for FailingProvider {
    fn name(&self) -> &str {
        "Failing"
    }

    async fn list_coins(&self, _limit: usize, _sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError> {
        self.fail()
    }

    async fn get_coin(&self, _id: &str) -> Result<Coin, CoreError> {
        self.fail()
    }

    async fn search_coins(&self, _query: &str) -> Result<Vec<Coin>, CoreError> {
        self.fail()
    }

    async fn get_history(&self, _id: &str, _days: u32) -> Result<Vec<PricePoint>, CoreError> {
        self.fail()
    }

    async fn get_global_data(&self) -> Result<GlobalMarketData, CoreError> {
        self.fail()
    }
}

// ═══════════════════════════════════════════════════════════════════
// MockMarketProvider
// ═══════════════════════════════════════════════════════════════════

mod mock_provider {
    use super::*;

    #[tokio::test]
    async fn lists_in_requested_order_with_limit() {
        let provider = MockMarketProvider::new();
        let coins = provider.list_coins(3, CoinSortOrder::MarketCapDesc).await.unwrap();
        let ids: Vec<&str> = coins.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["bitcoin", "ethereum", "tether"]);

        let cheapest = provider.list_coins(1, CoinSortOrder::PriceAsc).await.unwrap();
        assert_eq!(cheapest[0].id, "vanry");
    }

    #[tokio::test]
    async fn catalogue_is_complete() {
        let provider = MockMarketProvider::new();
        let all = provider.list_coins(100, CoinSortOrder::default()).await.unwrap();
        assert_eq!(all.len(), default_catalogue().len());
        assert!(all.iter().all(|c| c.image.is_some() && c.market_cap_rank.is_some()));
    }

    #[tokio::test]
    async fn unknown_coin_is_not_found() {
        let provider = MockMarketProvider::new();
        let err = provider.get_coin("notacoin").await.unwrap_err();
        assert!(matches!(err, CoreError::CoinNotFound(ref id) if id == "notacoin"));
        assert!(matches!(
            provider.get_history("notacoin", 7).await,
            Err(CoreError::CoinNotFound(_))
        ));
    }

    #[tokio::test]
    async fn search_matches_name_symbol_and_id() {
        let provider = MockMarketProvider::new();
        let by_symbol = provider.search_coins("ETH").await.unwrap();
        assert!(by_symbol.iter().any(|c| c.id == "ethereum"));
        let by_name = provider.search_coins("vanar").await.unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].id, "vanry");
        assert!(provider.search_coins("zzzz").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn set_price_and_change() {
        let provider = MockMarketProvider::new();
        assert!(provider.set_price("bitcoin", 49_999.0));
        assert!(provider.set_change("bitcoin", -12.5));
        assert!(!provider.set_price("notacoin", 1.0));

        let btc = provider.get_coin("bitcoin").await.unwrap();
        assert_eq!(btc.current_price, 49_999.0);
        assert_eq!(btc.price_change_percentage_24h, -12.5);
    }

    #[tokio::test]
    async fn history_is_deterministic_and_ends_at_price() {
        let provider = MockMarketProvider::new();
        let a = provider.get_history("ethereum", 14).await.unwrap();
        let b = provider.get_history("ethereum", 14).await.unwrap();
        assert_eq!(a.len(), 15);
        assert_eq!(a, b);
        assert_eq!(a.last().map(|p| p.price), Some(3_480.0));
        assert!(a.iter().all(|p| p.price > 0.0 && p.volume > 0.0));
    }

    #[tokio::test]
    async fn drift_moves_prices_within_bounds() {
        let provider = MockMarketProvider::new().with_drift(5.0).unwrap();
        let before = default_catalogue();
        let after = provider.list_coins(100, CoinSortOrder::MarketCapDesc).await.unwrap();

        let mut moved = 0;
        for coin in &after {
            let original = before.iter().find(|c| c.id == coin.id).unwrap();
            let ratio = coin.current_price / original.current_price;
            assert!((0.95 - 1e-9..=1.05 + 1e-9).contains(&ratio), "{} moved {ratio}", coin.id);
            if coin.current_price != original.current_price {
                moved += 1;
            }
        }
        assert!(moved > 0);
    }

    #[test]
    fn drift_outside_range_is_rejected() {
        for pct in [100.0, 250.0, -150.0, f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(
                matches!(MockMarketProvider::new().with_drift(pct), Err(CoreError::ValidationError(_))),
                "drift {pct} accepted"
            );
        }
        assert!(MockMarketProvider::new().with_drift(0.0).is_ok());
        assert!(MockMarketProvider::new().with_drift(-3.0).is_ok());
    }

    #[tokio::test]
    async fn large_drift_keeps_prices_positive() {
        let provider = MockMarketProvider::new().with_drift(99.9).unwrap();
        for _ in 0..50 {
            let coins = provider.list_coins(100, CoinSortOrder::MarketCapDesc).await.unwrap();
            assert_eq!(coins.len(), 12);
            for coin in &coins {
                assert!(coin.current_price > 0.0, "{} fell to {}", coin.id, coin.current_price);
                assert!(coin.current_price.is_finite());
            }
        }
    }

    #[tokio::test]
    async fn global_data_reflects_catalogue() {
        let provider = MockMarketProvider::new();
        let global = provider.get_global_data().await.unwrap();
        assert_eq!(global.active_cryptocurrencies, 12);
        assert!(global.btc_dominance > global.eth_dominance);
        assert!(global.btc_dominance > 0.0 && global.btc_dominance < 100.0);
        let cap: f64 = default_catalogue().iter().map(|c| c.market_cap).sum();
        assert!((global.total_market_cap - cap).abs() < 1.0);
    }
}

// ═══════════════════════════════════════════════════════════════════
// MarketProviderRegistry
// ═══════════════════════════════════════════════════════════════════

mod registry {
    use super::*;

    #[tokio::test]
    async fn empty_registry_reports_no_provider() {
        let registry = MarketProviderRegistry::new();
        assert!(registry.is_empty());
        let err = registry.list_coins(10, CoinSortOrder::default()).await.unwrap_err();
        assert!(matches!(err, CoreError::NoProvider));
        assert!(err.is_data_unavailable());
    }

    #[tokio::test]
    async fn falls_back_to_next_provider() {
        let (failing, calls) = FailingProvider::new();
        let registry = MarketProviderRegistry::new()
            .with_provider(Box::new(failing))
            .with_provider(Box::new(MockMarketProvider::new()));
        assert_eq!(registry.provider_names(), vec!["Failing", "Mock"]);

        let coins = registry.list_coins(5, CoinSortOrder::default()).await.unwrap();
        assert_eq!(coins.len(), 5);
        let btc = registry.get_coin("bitcoin").await.unwrap();
        assert_eq!(btc.symbol, "btc");
        assert!(registry.get_global_data().await.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_last_error_when_all_fail() {
        let (first, _) = FailingProvider::new();
        let registry = MarketProviderRegistry::new()
            .with_provider(Box::new(first))
            .with_provider(Box::new(MockMarketProvider::new()));

        // The mock is last and reports its own error
        let err = registry.get_coin("notacoin").await.unwrap_err();
        assert!(matches!(err, CoreError::CoinNotFound(_)));
    }

    #[tokio::test]
    async fn first_success_wins() {
        let (failing, calls) = FailingProvider::new();
        let registry = MarketProviderRegistry::new()
            .with_provider(Box::new(MockMarketProvider::new()))
            .with_provider(Box::new(failing));
        registry.search_coins("btc").await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn from_config_selects_provider() {
        let mut config = DashboardConfig::default();
        assert_eq!(
            MarketProviderRegistry::from_config(&config).provider_names(),
            vec!["Mock"]
        );
        config.provider = ProviderKind::CoinGecko;
        assert_eq!(
            MarketProviderRegistry::from_config(&config).provider_names(),
            vec!["CoinGecko"]
        );
    }
}

// ═══════════════════════════════════════════════════════════════════
// CoinGeckoProvider (no network)
// ═══════════════════════════════════════════════════════════════════

mod coingecko {
    use super::*;

    #[test]
    fn default_base_url() {
        let provider = CoinGeckoProvider::new();
        assert_eq!(provider.base_url(), DEFAULT_BASE_URL);
        assert_eq!(provider.name(), "CoinGecko");
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let provider = CoinGeckoProvider::with_base_url("http://localhost:9999/api/v3/", "EUR");
        assert_eq!(provider.base_url(), "http://localhost:9999/api/v3");
    }

    #[tokio::test]
    async fn unreachable_host_is_data_unavailable() {
        // Port 9 (discard) on localhost is closed in test environments
        let provider = CoinGeckoProvider::with_base_url("http://127.0.0.1:9", "usd");
        let err = provider
            .list_coins(10, CoinSortOrder::default())
            .await
            .unwrap_err();
        assert!(err.is_data_unavailable(), "unexpected error: {err}");
    }
}
