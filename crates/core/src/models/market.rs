use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A single point of a coin's price history (chart data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    pub price: f64,
    pub volume: f64,
}

/// Market-wide statistics shown in the dashboard header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMarketData {
    /// Total market capitalization in USD
    pub total_market_cap: f64,
    /// Total 24h trading volume in USD
    pub total_volume: f64,
    /// Bitcoin share of total market cap, in percent
    pub btc_dominance: f64,
    /// Ethereum share of total market cap, in percent
    pub eth_dominance: f64,
    pub active_cryptocurrencies: u32,
    pub market_cap_change_percentage_24h: f64,
}
