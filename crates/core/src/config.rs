use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::CoreError;
use crate::providers::coingecko::DEFAULT_BASE_URL;

/// Default alert polling period.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;

/// Default number of coins fetched per refresh.
pub const DEFAULT_COIN_LIMIT: usize = 50;

/// Coin id listed first regardless of sort order.
pub const DEFAULT_PINNED_COIN: &str = "vanry";

/// Largest page the market API serves.
const MAX_COIN_LIMIT: usize = 250;

/// Which market data source backs the dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Synthetic offline data
    #[default]
    Mock,
    /// Live CoinGecko API
    CoinGecko,
}

impl std::str::FromStr for ProviderKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mock" => Ok(ProviderKind::Mock),
            "coingecko" => Ok(ProviderKind::CoinGecko),
            other => Err(CoreError::ValidationError(format!(
                "Unknown provider '{other}' (expected 'mock' or 'coingecko')"
            ))),
        }
    }
}

/// Runtime configuration for a dashboard session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Seconds between alert evaluation ticks.
    pub poll_interval_secs: u64,

    /// Directory holding the durable key/value files.
    pub data_dir: PathBuf,

    pub provider: ProviderKind,

    /// Coins fetched per market refresh.
    pub coin_limit: usize,

    /// Coin always listed first (`None` disables pinning).
    pub pinned_coin: Option<String>,

    /// Quote currency for the live API (e.g., "usd").
    pub vs_currency: String,

    pub api_base_url: String,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            data_dir: PathBuf::from(".cryptodash"),
            provider: ProviderKind::Mock,
            coin_limit: DEFAULT_COIN_LIMIT,
            pinned_coin: Some(DEFAULT_PINNED_COIN.to_string()),
            vs_currency: "usd".to_string(),
            api_base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Load from the process environment (`CRYPTODASH_*`), reading a `.env`
    /// file first if one exists. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, CoreError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same parsing as `from_env`, against any variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(raw) = get("CRYPTODASH_POLL_INTERVAL_SECS") {
            config.poll_interval_secs = parse_number(&raw, "CRYPTODASH_POLL_INTERVAL_SECS")?;
        }
        if let Some(raw) = get("CRYPTODASH_DATA_DIR").filter(|v| !v.is_empty()) {
            config.data_dir = PathBuf::from(raw);
        }
        if let Some(raw) = get("CRYPTODASH_PROVIDER") {
            config.provider = raw.parse()?;
        }
        if let Some(raw) = get("CRYPTODASH_COIN_LIMIT") {
            config.coin_limit = parse_number(&raw, "CRYPTODASH_COIN_LIMIT")?;
        }
        if let Some(raw) = get("CRYPTODASH_PINNED_COIN") {
            config.pinned_coin = match raw.to_lowercase().as_str() {
                "" | "none" => None,
                _ => Some(raw),
            };
        }
        if let Some(raw) = get("CRYPTODASH_VS_CURRENCY").filter(|v| !v.is_empty()) {
            config.vs_currency = raw.to_lowercase();
        }
        if let Some(raw) = get("CRYPTODASH_API_BASE_URL").filter(|v| !v.is_empty()) {
            config.api_base_url = raw;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject values the dashboard cannot run with.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.poll_interval_secs == 0 {
            return Err(CoreError::ValidationError(
                "Poll interval must be at least 1 second".into(),
            ));
        }
        if !(1..=MAX_COIN_LIMIT).contains(&self.coin_limit) {
            return Err(CoreError::ValidationError(format!(
                "Coin limit {} out of range (expected 1..={MAX_COIN_LIMIT})",
                self.coin_limit
            )));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T, CoreError> {
    raw.parse()
        .map_err(|_| CoreError::ValidationError(format!("{key} must be a whole number, got '{raw}'")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = DashboardConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.poll_interval(), Duration::from_secs(30));
    }

    #[test]
    fn overrides_are_applied() {
        let config = DashboardConfig::from_lookup(lookup(&[
            ("CRYPTODASH_POLL_INTERVAL_SECS", "5"),
            ("CRYPTODASH_PROVIDER", "CoinGecko"),
            ("CRYPTODASH_COIN_LIMIT", "10"),
            ("CRYPTODASH_PINNED_COIN", "none"),
            ("CRYPTODASH_VS_CURRENCY", "EUR"),
            ("CRYPTODASH_DATA_DIR", "/tmp/dash"),
        ]))
        .unwrap();
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.provider, ProviderKind::CoinGecko);
        assert_eq!(config.coin_limit, 10);
        assert_eq!(config.pinned_coin, None);
        assert_eq!(config.vs_currency, "eur");
        assert_eq!(config.data_dir, PathBuf::from("/tmp/dash"));
    }

    #[test]
    fn malformed_values_are_rejected() {
        for vars in [
            [("CRYPTODASH_POLL_INTERVAL_SECS", "soon")],
            [("CRYPTODASH_POLL_INTERVAL_SECS", "0")],
            [("CRYPTODASH_COIN_LIMIT", "1000")],
            [("CRYPTODASH_PROVIDER", "binance")],
        ] {
            let result = DashboardConfig::from_lookup(lookup(&vars));
            assert!(matches!(result, Err(CoreError::ValidationError(_))), "{vars:?}");
        }
    }
}
