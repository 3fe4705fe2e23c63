use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// One row of market data for a coin, as listed on the dashboard.
///
/// Field names follow the CoinGecko `/coins/markets` response so the real
/// API can be deserialized directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    /// Provider-wide unique id (e.g., "bitcoin")
    pub id: String,

    /// Ticker symbol, lowercase as delivered by the API (e.g., "btc")
    pub symbol: String,

    pub name: String,

    #[serde(default)]
    pub image: Option<String>,

    #[serde(deserialize_with = "null_as_zero")]
    pub current_price: f64,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub market_cap: f64,

    #[serde(default)]
    pub market_cap_rank: Option<u32>,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub total_volume: f64,

    #[serde(default)]
    pub high_24h: Option<f64>,

    #[serde(default)]
    pub low_24h: Option<f64>,

    #[serde(default)]
    pub price_change_24h: Option<f64>,

    #[serde(default, deserialize_with = "null_as_zero")]
    pub price_change_percentage_24h: f64,

    #[serde(default)]
    pub circulating_supply: Option<f64>,

    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

/// CoinGecko sends `null` for figures it has no data for (thinly traded coins).
fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl Coin {
    /// The subset of market data the alert evaluator needs.
    pub fn snapshot(&self) -> CoinSnapshot {
        CoinSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            current_price: self.current_price,
            price_change_percentage_24h: self.price_change_percentage_24h,
        }
    }

    /// Case-insensitive match against name, symbol, or id.
    pub fn matches_query(&self, query: &str) -> bool {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&q)
            || self.symbol.to_lowercase().contains(&q)
            || self.id.to_lowercase().contains(&q)
    }
}

/// Latest known price data for one coin. Read-only input to alert evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinSnapshot {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub current_price: f64,
    pub price_change_percentage_24h: f64,
}

impl CoinSnapshot {
    pub fn new(id: impl Into<String>, current_price: f64, price_change_percentage_24h: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            image: None,
            current_price,
            price_change_percentage_24h,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}
