use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::coin::Coin;
use crate::models::market::{GlobalMarketData, PricePoint};
use crate::models::sort::CoinSortOrder;
use super::traits::MarketDataProvider;

pub const DEFAULT_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Maximum number of search hits resolved to full market rows.
const MAX_SEARCH_RESULTS: usize = 25;

/// CoinGecko API provider.
///
/// - **Free tier**: no API key required, rate limited (~30 calls/min).
/// - **Endpoints**: `/coins/markets`, `/search`, `/coins/{id}/market_chart`, `/global`
///
/// CoinGecko cannot order `/coins/markets` by price or 24h change, so the
/// listing is always requested by market cap and re-sorted locally.
pub struct CoinGeckoProvider {
    client: Client,
    base_url: String,
    vs_currency: String,
}

impl CoinGeckoProvider {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, "usd")
    }

    pub fn with_base_url(base_url: impl Into<String>, vs_currency: impl Into<String>) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            vs_currency: vs_currency.into().to_lowercase(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET `{base_url}{path}` with query parameters and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, CoreError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.client.get(&url).query(query).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: "CoinGecko".into(),
                message: format!("HTTP {status} while fetching {what}"),
            });
        }

        resp.json().await.map_err(|e| CoreError::Api {
            provider: "CoinGecko".into(),
            message: format!("Failed to parse {what}: {e}"),
        })
    }

    async fn markets(&self, query: Vec<(&str, String)>, what: &str) -> Result<Vec<Coin>, CoreError> {
        let mut params = vec![
            ("vs_currency", self.vs_currency.clone()),
            ("sparkline", "false".to_string()),
            ("price_change_percentage", "24h".to_string()),
        ];
        params.extend(query);
        self.get_json("/coins/markets", &params, what).await
    }
}

impl Default for CoinGeckoProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── CoinGecko API response types ────────────────────────────────────

#[derive(Deserialize)]
struct SearchResponse {
    coins: Vec<SearchEntry>,
}

#[derive(Deserialize)]
struct SearchEntry {
    id: String,
}

#[derive(Deserialize)]
struct MarketChartResponse {
    /// `[timestamp_ms, price]` pairs
    prices: Vec<(f64, f64)>,
    /// `[timestamp_ms, volume]` pairs
    #[serde(default)]
    total_volumes: Vec<(f64, f64)>,
}

#[derive(Deserialize)]
struct GlobalResponse {
    data: GlobalData,
}

#[derive(Deserialize)]
struct GlobalData {
    active_cryptocurrencies: u32,
    total_market_cap: HashMap<String, f64>,
    total_volume: HashMap<String, f64>,
    market_cap_percentage: HashMap<String, f64>,
    #[serde(default)]
    market_cap_change_percentage_24h_usd: f64,
}

/// Convert a market chart response into daily price points.
fn chart_to_points(chart: MarketChartResponse) -> Vec<PricePoint> {
    chart
        .prices
        .iter()
        .enumerate()
        .filter_map(|(i, (ts, price))| {
            let timestamp = *ts as i64;
            let dt = chrono::DateTime::from_timestamp_millis(timestamp)?;
            let volume = chart.total_volumes.get(i).map(|(_, v)| *v).unwrap_or(0.0);
            Some(PricePoint {
                date: dt.date_naive(),
                timestamp,
                price: *price,
                volume,
            })
        })
        .collect()
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn list_coins(&self, limit: usize, sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError> {
        let mut coins = self
            .markets(
                vec![
                    ("order", CoinSortOrder::MarketCapDesc.as_str().to_string()),
                    ("per_page", limit.clamp(1, 250).to_string()),
                    ("page", "1".to_string()),
                ],
                "coin markets",
            )
            .await?;
        sort.apply(&mut coins);
        Ok(coins)
    }

    async fn get_coin(&self, id: &str) -> Result<Coin, CoreError> {
        let coins = self
            .markets(vec![("ids", id.to_string())], &format!("market data for {id}"))
            .await?;
        coins
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| CoreError::CoinNotFound(id.to_string()))
    }

    async fn search_coins(&self, query: &str) -> Result<Vec<Coin>, CoreError> {
        let resp: SearchResponse = self
            .get_json("/search", &[("query", query.to_string())], &format!("search results for '{query}'"))
            .await?;

        let ids: Vec<String> = resp
            .coins
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .map(|c| c.id)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // /search has no prices; resolve hits to full market rows, keeping search rank order
        let mut coins = self
            .markets(vec![("ids", ids.join(","))], "search market data")
            .await?;
        coins.sort_by_key(|c| ids.iter().position(|id| *id == c.id).unwrap_or(usize::MAX));
        Ok(coins)
    }

    async fn get_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>, CoreError> {
        let mut query = vec![
            ("vs_currency", self.vs_currency.clone()),
            ("days", days.to_string()),
        ];
        // Single-day charts keep the API's default 5-minute granularity
        if days > 1 {
            query.push(("interval", "daily".to_string()));
        }
        let chart: MarketChartResponse = self
            .get_json(&format!("/coins/{id}/market_chart"), &query, &format!("history for {id}"))
            .await?;
        Ok(chart_to_points(chart))
    }

    async fn get_global_data(&self) -> Result<GlobalMarketData, CoreError> {
        let resp: GlobalResponse = self.get_json("/global", &[], "global market data").await?;
        let data = resp.data;
        let pick = |map: &HashMap<String, f64>, key: &str| map.get(key).copied().unwrap_or(0.0);

        Ok(GlobalMarketData {
            total_market_cap: pick(&data.total_market_cap, &self.vs_currency),
            total_volume: pick(&data.total_volume, &self.vs_currency),
            btc_dominance: pick(&data.market_cap_percentage, "btc"),
            eth_dominance: pick(&data.market_cap_percentage, "eth"),
            active_cryptocurrencies: data.active_cryptocurrencies,
            market_cap_change_percentage_24h: data.market_cap_change_percentage_24h_usd,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_response_maps_prices_and_volumes() {
        let json = r#"{
            "prices": [[1704067200000, 42000.5], [1704153600000, 43000.0]],
            "total_volumes": [[1704067200000, 1000.0]]
        }"#;
        let chart: MarketChartResponse = serde_json::from_str(json).unwrap();
        let points = chart_to_points(chart);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].date.to_string(), "2024-01-01");
        assert_eq!(points[0].price, 42000.5);
        assert_eq!(points[0].volume, 1000.0);
        assert_eq!(points[1].volume, 0.0);
    }

    #[test]
    fn global_response_parses() {
        let json = r#"{"data": {
            "active_cryptocurrencies": 13000,
            "total_market_cap": {"usd": 2.5e12, "eur": 2.3e12},
            "total_volume": {"usd": 9.0e10},
            "market_cap_percentage": {"btc": 52.1, "eth": 16.9},
            "market_cap_change_percentage_24h_usd": -1.25
        }}"#;
        let resp: GlobalResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.data.active_cryptocurrencies, 13000);
        assert_eq!(resp.data.market_cap_percentage["btc"], 52.1);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let p = CoinGeckoProvider::with_base_url("http://localhost:9999/api/", "USD");
        assert_eq!(p.base_url(), "http://localhost:9999/api");
        assert_eq!(p.vs_currency, "usd");
    }
}
