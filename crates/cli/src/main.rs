//! `cryptodash`: terminal front-end for the crypto dashboard core.
//!
//! Log level comes from `RUST_LOG` (default `info`); configuration from
//! `CRYPTODASH_*` variables or a `.env` file, overridable by flags.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cryptodash_core::config::{DashboardConfig, ProviderKind};
use cryptodash_core::models::sort::CoinSortOrder;

#[derive(Parser)]
#[command(name = "cryptodash", version, about = "Crypto prices, search, charts data, and price alerts")]
struct Cli {
    /// Directory for saved alerts and preferences
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Market data source: mock or coingecko
    #[arg(long, global = true)]
    provider: Option<ProviderKind>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List coins
    Coins {
        /// market_cap_desc, price_desc, price_asc, volume_desc, change_desc, change_asc
        #[arg(long, default_value = "market_cap_desc")]
        sort: CoinSortOrder,
        /// Filter by name, symbol, or id
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one coin and its recent price history
    Coin {
        id: String,
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
    /// Global market statistics
    Market,
    /// Manage price alerts
    Alerts {
        #[command(subcommand)]
        action: AlertAction,
    },
    /// Show or change the theme preference
    Theme {
        #[command(subcommand)]
        action: Option<ThemeAction>,
    },
    /// Check alerts on a fixed interval until Ctrl-C
    Watch {
        /// Override the poll interval, in seconds
        #[arg(long)]
        interval: Option<u64>,
        /// Random price drift per refresh in percent, below 100 (mock provider only)
        #[arg(long)]
        drift: Option<f64>,
    },
}

#[derive(Subcommand)]
pub enum AlertAction {
    /// List saved alerts
    List,
    /// Create an alert
    Add {
        coin_id: String,
        /// Target price, or percentage for change rules
        threshold: String,
        /// above, below, change_above, change_below
        #[arg(long, default_value = "above")]
        rule: String,
        #[arg(long)]
        message: Option<String>,
    },
    /// Delete an alert by id
    Remove { id: String },
    /// Delete all alerts
    Clear,
    /// Evaluate alerts once against current prices
    Check,
}

#[derive(Subcommand)]
pub enum ThemeAction {
    Get,
    Set { theme: String },
    Toggle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .format_target(false)
        .init();

    let cli = Cli::parse();

    let mut config = DashboardConfig::from_env()?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(provider) = cli.provider {
        config.provider = provider;
    }

    commands::run(config, cli.command).await
}
