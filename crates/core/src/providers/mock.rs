use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

use crate::errors::CoreError;
use crate::models::coin::Coin;
use crate::models::market::{GlobalMarketData, PricePoint};
use crate::models::sort::CoinSortOrder;
use super::traits::MarketDataProvider;

/// Daily volatility used for synthetic history (±3%).
const HISTORY_VOLATILITY: f64 = 0.03;

/// Upper bound (exclusive) for `with_drift`.
pub const MAX_DRIFT_PCT: f64 = 100.0;

/// Synthetic market data provider.
///
/// - **Offline**: no network, deterministic catalogue of well-known coins.
/// - **History**: seeded random walk per coin id, so the same coin always
///   draws the same chart and the last point equals the current price.
/// - **Drift**: optionally nudges every price by up to ±`drift_pct` percent
///   on each listing, which makes alerts fire during live demos.
pub struct MockMarketProvider {
    state: Mutex<MockState>,
    drift_pct: f64,
}

struct MockState {
    coins: Vec<Coin>,
    rng: StdRng,
}

impl MockMarketProvider {
    pub fn new() -> Self {
        Self::with_coins(default_catalogue())
    }

    /// A provider serving exactly `coins`.
    pub fn with_coins(coins: Vec<Coin>) -> Self {
        Self {
            state: Mutex::new(MockState {
                coins,
                rng: StdRng::seed_from_u64(0x00C0_FFEE),
            }),
            drift_pct: 0.0,
        }
    }

    /// Enable per-listing random price drift of up to ±`pct` percent.
    ///
    /// `pct` must be finite and below 100, otherwise a single step could
    /// wipe a price out entirely.
    pub fn with_drift(mut self, pct: f64) -> Result<Self, CoreError> {
        if !pct.is_finite() || !(0.0..MAX_DRIFT_PCT).contains(&pct.abs()) {
            return Err(CoreError::ValidationError(format!(
                "Price drift of {pct}% out of range (expected 0 to {MAX_DRIFT_PCT}, exclusive)"
            )));
        }
        self.drift_pct = pct.abs();
        Ok(self)
    }

    /// Overwrite a coin's current price. Returns false if the coin is unknown.
    pub fn set_price(&self, id: &str, price: f64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.coins.iter_mut().find(|c| c.id == id) {
            Some(coin) => {
                coin.current_price = price;
                true
            }
            None => false,
        }
    }

    /// Overwrite a coin's 24h percentage change. Returns false if the coin is unknown.
    pub fn set_change(&self, id: &str, pct: f64) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        match state.coins.iter_mut().find(|c| c.id == id) {
            Some(coin) => {
                coin.price_change_percentage_24h = pct;
                true
            }
            None => false,
        }
    }

    fn current_coins(&self) -> Vec<Coin> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if self.drift_pct > 0.0 {
            let MockState { coins, rng } = &mut *state;
            for coin in coins.iter_mut() {
                let pct = rng.gen_range(-self.drift_pct..=self.drift_pct);
                let factor = (1.0 + pct / 100.0).max(f64::EPSILON);
                let old = coin.current_price;
                coin.current_price = old * factor;
                coin.price_change_percentage_24h += pct;
                coin.price_change_24h = Some(coin.price_change_24h.unwrap_or(0.0) + coin.current_price - old);
                coin.high_24h = Some(coin.high_24h.unwrap_or(old).max(coin.current_price));
                coin.low_24h = Some(coin.low_24h.unwrap_or(old).min(coin.current_price));
                coin.last_updated = Some(Utc::now());
            }
        }
        state.coins.clone()
    }
}

impl Default for MockMarketProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable 64-bit seed derived from a coin id (FNV-1a).
fn seed_for(id: &str) -> u64 {
    id.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| {
        (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    })
}

/// Random walk backwards from today's price, `days + 1` points, oldest first.
fn synthetic_history(coin: &Coin, days: u32) -> Vec<PricePoint> {
    let mut rng = StdRng::seed_from_u64(seed_for(&coin.id));
    let today = Utc::now().date_naive();

    let mut prices = Vec::with_capacity(days as usize + 1);
    let mut price = coin.current_price;
    prices.push(price);
    for _ in 0..days {
        let step = rng.gen_range(-HISTORY_VOLATILITY..=HISTORY_VOLATILITY);
        price /= 1.0 + step;
        prices.push(price);
    }
    prices.reverse();

    prices
        .into_iter()
        .enumerate()
        .map(|(i, price)| {
            let date = today - Duration::days(i64::from(days) - i as i64);
            let timestamp = date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis())
                .unwrap_or_default();
            PricePoint {
                date,
                timestamp,
                price,
                volume: coin.total_volume * rng.gen_range(0.7..=1.3),
            }
        })
        .collect()
}

#[allow(clippy::too_many_arguments)]
fn coin(
    id: &str,
    symbol: &str,
    name: &str,
    rank: u32,
    price: f64,
    market_cap: f64,
    volume: f64,
    change_pct: f64,
    supply: f64,
) -> Coin {
    let change_abs = price - price / (1.0 + change_pct / 100.0);
    Coin {
        id: id.into(),
        symbol: symbol.into(),
        name: name.into(),
        image: Some(format!("https://assets.coingecko.com/coins/images/{rank}/large/{id}.png")),
        current_price: price,
        market_cap,
        market_cap_rank: Some(rank),
        total_volume: volume,
        high_24h: Some(price.max(price - change_abs) * 1.01),
        low_24h: Some(price.min(price - change_abs) * 0.99),
        price_change_24h: Some(change_abs),
        price_change_percentage_24h: change_pct,
        circulating_supply: Some(supply),
        last_updated: Some(Utc::now()),
    }
}

/// The built-in synthetic catalogue.
pub fn default_catalogue() -> Vec<Coin> {
    vec![
        coin("bitcoin", "btc", "Bitcoin", 1, 67_250.0, 1_325_000_000_000.0, 28_400_000_000.0, 2.35, 19_700_000.0),
        coin("ethereum", "eth", "Ethereum", 2, 3_480.0, 418_000_000_000.0, 15_200_000_000.0, -1.12, 120_100_000.0),
        coin("tether", "usdt", "Tether", 3, 1.0, 112_000_000_000.0, 48_000_000_000.0, 0.01, 112_000_000_000.0),
        coin("binancecoin", "bnb", "BNB", 4, 585.0, 86_000_000_000.0, 1_700_000_000.0, 0.84, 147_000_000.0),
        coin("solana", "sol", "Solana", 5, 172.5, 79_000_000_000.0, 3_100_000_000.0, 4.71, 458_000_000.0),
        coin("ripple", "xrp", "XRP", 6, 0.52, 29_000_000_000.0, 1_200_000_000.0, -0.63, 55_700_000_000.0),
        coin("cardano", "ada", "Cardano", 7, 0.45, 16_000_000_000.0, 410_000_000.0, -2.18, 35_500_000_000.0),
        coin("dogecoin", "doge", "Dogecoin", 8, 0.158, 22_800_000_000.0, 1_050_000_000.0, 6.02, 144_500_000_000.0),
        coin("polkadot", "dot", "Polkadot", 9, 7.05, 10_100_000_000.0, 230_000_000.0, -3.40, 1_430_000_000.0),
        coin("chainlink", "link", "Chainlink", 10, 16.8, 9_850_000_000.0, 520_000_000.0, 1.57, 587_000_000.0),
        coin("litecoin", "ltc", "Litecoin", 11, 82.4, 6_150_000_000.0, 390_000_000.0, 0.22, 74_600_000.0),
        coin("vanry", "vanry", "Vanar Chain", 12, 0.121, 190_000_000.0, 14_000_000.0, 3.15, 1_570_000_000.0),
    ]
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for MockMarketProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn list_coins(&self, limit: usize, sort: CoinSortOrder) -> Result<Vec<Coin>, CoreError> {
        let mut coins = self.current_coins();
        sort.apply(&mut coins);
        coins.truncate(limit);
        Ok(coins)
    }

    async fn get_coin(&self, id: &str) -> Result<Coin, CoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .coins
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| CoreError::CoinNotFound(id.to_string()))
    }

    async fn search_coins(&self, query: &str) -> Result<Vec<Coin>, CoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        Ok(state
            .coins
            .iter()
            .filter(|c| c.matches_query(query))
            .cloned()
            .collect())
    }

    async fn get_history(&self, id: &str, days: u32) -> Result<Vec<PricePoint>, CoreError> {
        let coin = self.get_coin(id).await?;
        Ok(synthetic_history(&coin, days))
    }

    async fn get_global_data(&self) -> Result<GlobalMarketData, CoreError> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let coins = &state.coins;

        let total_market_cap: f64 = coins.iter().map(|c| c.market_cap).sum();
        let total_volume: f64 = coins.iter().map(|c| c.total_volume).sum();
        let share = |id: &str| -> f64 {
            if total_market_cap <= 0.0 {
                return 0.0;
            }
            coins
                .iter()
                .find(|c| c.id == id)
                .map(|c| c.market_cap / total_market_cap * 100.0)
                .unwrap_or(0.0)
        };
        let weighted_change = if total_market_cap > 0.0 {
            coins
                .iter()
                .map(|c| c.price_change_percentage_24h * c.market_cap)
                .sum::<f64>()
                / total_market_cap
        } else {
            0.0
        };

        Ok(GlobalMarketData {
            total_market_cap,
            total_volume,
            btc_dominance: share("bitcoin"),
            eth_dominance: share("ethereum"),
            active_cryptocurrencies: coins.len() as u32,
            market_cap_change_percentage_24h: weighted_change,
        })
    }
}
