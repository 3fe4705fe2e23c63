use serde::{Deserialize, Serialize};

use super::coin::Coin;
use crate::errors::CoreError;

/// Sort order for coin listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinSortOrder {
    /// Largest market cap first (default)
    #[default]
    MarketCapDesc,
    /// Most expensive first
    PriceDesc,
    /// Cheapest first
    PriceAsc,
    /// Highest 24h volume first
    VolumeDesc,
    /// Best 24h performer first
    ChangeDesc,
    /// Worst 24h performer first
    ChangeAsc,
}

impl CoinSortOrder {
    pub const ALL: [CoinSortOrder; 6] = [
        CoinSortOrder::MarketCapDesc,
        CoinSortOrder::PriceDesc,
        CoinSortOrder::PriceAsc,
        CoinSortOrder::VolumeDesc,
        CoinSortOrder::ChangeDesc,
        CoinSortOrder::ChangeAsc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CoinSortOrder::MarketCapDesc => "market_cap_desc",
            CoinSortOrder::PriceDesc => "price_desc",
            CoinSortOrder::PriceAsc => "price_asc",
            CoinSortOrder::VolumeDesc => "volume_desc",
            CoinSortOrder::ChangeDesc => "change_desc",
            CoinSortOrder::ChangeAsc => "change_asc",
        }
    }

    /// Sort `coins` in place. The sort is stable, so ties keep provider order.
    pub fn apply(&self, coins: &mut [Coin]) {
        match self {
            CoinSortOrder::MarketCapDesc => coins.sort_by(|a, b| b.market_cap.total_cmp(&a.market_cap)),
            CoinSortOrder::PriceDesc => coins.sort_by(|a, b| b.current_price.total_cmp(&a.current_price)),
            CoinSortOrder::PriceAsc => coins.sort_by(|a, b| a.current_price.total_cmp(&b.current_price)),
            CoinSortOrder::VolumeDesc => coins.sort_by(|a, b| b.total_volume.total_cmp(&a.total_volume)),
            CoinSortOrder::ChangeDesc => coins.sort_by(|a, b| {
                b.price_change_percentage_24h
                    .total_cmp(&a.price_change_percentage_24h)
            }),
            CoinSortOrder::ChangeAsc => coins.sort_by(|a, b| {
                a.price_change_percentage_24h
                    .total_cmp(&b.price_change_percentage_24h)
            }),
        }
    }
}

impl std::fmt::Display for CoinSortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CoinSortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|o| o.as_str() == key).ok_or_else(|| {
            let known: Vec<&str> = Self::ALL.iter().map(|o| o.as_str()).collect();
            CoreError::ValidationError(format!(
                "Unknown sort order '{}' (expected one of {})",
                s.trim(),
                known.join(", ")
            ))
        })
    }
}

/// Sort coins and move the pinned coin (if present) to the top.
pub fn sort_coins(coins: &mut Vec<Coin>, order: CoinSortOrder, pinned: Option<&str>) {
    order.apply(coins);
    if let Some(pinned_id) = pinned {
        if let Some(idx) = coins.iter().position(|c| c.id == pinned_id) {
            if idx > 0 {
                let coin = coins.remove(idx);
                coins.insert(0, coin);
            }
        }
    }
}
