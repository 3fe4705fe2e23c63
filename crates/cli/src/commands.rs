use std::sync::Arc;

use anyhow::{bail, Context};
use log::info;

use cryptodash_core::config::{DashboardConfig, ProviderKind};
use cryptodash_core::models::alert::{Alert, AlertDraft, ComparisonRule};
use cryptodash_core::models::coin::Coin;
use cryptodash_core::models::sort::CoinSortOrder;
use cryptodash_core::models::theme::Theme;
use cryptodash_core::notifications::log_sink::LogSink;
use cryptodash_core::notifications::permission::{NotificationPermission, PermissionGatedSink};
use cryptodash_core::providers::mock::MockMarketProvider;
use cryptodash_core::services::alert_evaluator::AlertEvaluator;
use cryptodash_core::services::alert_scheduler::TickOutcome;
use cryptodash_core::services::format::{format_currency, format_large_number, format_percentage};
use cryptodash_core::services::market_service::MarketService;
use cryptodash_core::services::validation::parse_threshold;
use cryptodash_core::storage::file::FileStore;
use cryptodash_core::storage::manager::PersistentStore;
use cryptodash_core::CryptoDashboard;

use crate::{AlertAction, Command, ThemeAction};

pub async fn run(mut config: DashboardConfig, command: Command) -> anyhow::Result<()> {
    if let Command::Watch { interval: Some(secs), .. } = &command {
        config.poll_interval_secs = *secs;
        config.validate()?;
    }
    let drift = match &command {
        Command::Watch { drift, .. } => *drift,
        _ => None,
    };
    let dashboard = open_dashboard(config, drift)?;

    match command {
        Command::Coins { sort, search } => {
            let coins = match search {
                Some(query) => dashboard.search_coins(&query, sort).await?,
                None => dashboard.fetch_coins(sort).await?,
            };
            print_coins(&coins);
        }
        Command::Coin { id, days } => {
            let coin = dashboard.get_coin(&id).await?;
            let history = dashboard.get_coin_history(&id, days).await?;
            print_coin(&coin);
            println!();
            println!("{:<12} {:>16} {:>14}", "DATE", "PRICE", "VOLUME");
            for point in &history {
                println!(
                    "{:<12} {:>16} {:>14}",
                    point.date,
                    format_currency(point.price),
                    format_large_number(point.volume)
                );
            }
        }
        Command::Market => {
            let global = dashboard.get_global_data().await?;
            println!("Total market cap   {}", format_large_number(global.total_market_cap));
            println!("24h volume         {}", format_large_number(global.total_volume));
            println!("BTC dominance      {:.1}%", global.btc_dominance);
            println!("ETH dominance      {:.1}%", global.eth_dominance);
            println!("Active coins       {}", global.active_cryptocurrencies);
            println!(
                "24h cap change     {}",
                format_percentage(global.market_cap_change_percentage_24h)
            );
        }
        Command::Alerts { action } => run_alerts(&dashboard, action).await?,
        Command::Theme { action } => {
            let theme = match action {
                None | Some(ThemeAction::Get) => dashboard.theme(),
                Some(ThemeAction::Set { theme }) => {
                    let theme: Theme = theme.parse()?;
                    dashboard.set_theme(theme);
                    theme
                }
                Some(ThemeAction::Toggle) => dashboard.toggle_theme(),
            };
            println!("{theme}");
        }
        Command::Watch { .. } => watch(&dashboard).await?,
    }

    Ok(())
}

fn open_dashboard(config: DashboardConfig, drift: Option<f64>) -> anyhow::Result<CryptoDashboard> {
    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    let store = PersistentStore::new(store);

    let gated = PermissionGatedSink::new(LogSink, NotificationPermission::Granted);
    gated.request_permission();
    let sink = Arc::new(gated);

    let dashboard = match drift {
        Some(pct) if config.provider == ProviderKind::Mock => {
            let provider = MockMarketProvider::new().with_drift(pct)?;
            let market = MarketService::new(Box::new(provider), config.coin_limit, config.pinned_coin.clone());
            CryptoDashboard::with_market(config, store, market, sink)
        }
        Some(_) => bail!("--drift only applies to the mock provider"),
        None => CryptoDashboard::new(config, store, sink),
    };
    Ok(dashboard)
}

async fn run_alerts(dashboard: &CryptoDashboard, action: AlertAction) -> anyhow::Result<()> {
    match action {
        AlertAction::List => {
            let alerts = dashboard.list_alerts();
            if alerts.is_empty() {
                println!("No price alerts.");
                return Ok(());
            }
            let evaluator = AlertEvaluator::new();
            for alert in alerts {
                println!(
                    "{}  {:<14} {:<34} {}",
                    alert.id,
                    alert.coin_name,
                    evaluator.describe(&alert),
                    alert.created_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        AlertAction::Add {
            coin_id,
            threshold,
            rule,
            message,
        } => {
            let rule = ComparisonRule::from(rule);
            if !rule.is_known() {
                bail!("unknown rule '{rule}' (expected above, below, change_above, change_below)");
            }
            let threshold = parse_threshold(&threshold, &rule)?;
            let coin = dashboard
                .get_coin(&coin_id)
                .await
                .with_context(|| format!("looking up coin '{coin_id}'"))?;

            let mut draft = AlertDraft::new(coin.id, coin.name, rule, threshold);
            draft.message = message;
            let alert = dashboard.add_alert(draft)?;
            println!("Created alert {}: {}", alert.id, AlertEvaluator::new().describe(&alert));
        }
        AlertAction::Remove { id } => {
            let removed = dashboard.remove_alert(&id);
            println!("{}", removal_message(&id, removed.as_ref()));
        }
        AlertAction::Clear => {
            dashboard.clear_alerts();
            println!("All alerts removed.");
        }
        AlertAction::Check => report_tick(&dashboard.check_alerts().await),
    }
    Ok(())
}

async fn watch(dashboard: &CryptoDashboard) -> anyhow::Result<()> {
    let coins = dashboard.fetch_coins(CoinSortOrder::default()).await?;
    info!(
        "Watching {} alert(s) over {} coins every {}s (Ctrl-C to stop)",
        dashboard.list_alerts().len(),
        coins.len(),
        dashboard.config().poll_interval_secs
    );

    let handle = dashboard.spawn_scheduler();
    tokio::signal::ctrl_c().await.context("waiting for Ctrl-C")?;
    info!("Stopping alert scheduler");
    handle.shutdown().await;
    Ok(())
}

fn removal_message(id: &str, removed: Option<&Alert>) -> String {
    match removed {
        Some(alert) => format!("Removed alert {} ({})", alert.id, alert.coin_name),
        None => format!("No alert with id {id}; nothing removed."),
    }
}

fn report_tick(outcome: &TickOutcome) {
    match outcome {
        TickOutcome::Skipped(reason) => println!("Skipped: {reason:?}"),
        TickOutcome::Aborted(e) => println!("Market data unavailable: {e}"),
        TickOutcome::Completed { triggered } if triggered.is_empty() => println!("No alerts triggered."),
        TickOutcome::Completed { triggered } => {
            for alert in triggered {
                println!("Triggered and removed: {} ({})", alert.id, alert.coin_name);
            }
        }
    }
}

fn print_coins(coins: &[Coin]) {
    println!(
        "{:>4}  {:<16} {:<7} {:>16} {:>9} {:>10} {:>10}",
        "#", "NAME", "SYMBOL", "PRICE", "24H", "MCAP", "VOLUME"
    );
    for coin in coins {
        println!(
            "{:>4}  {:<16} {:<7} {:>16} {:>9} {:>10} {:>10}",
            coin.market_cap_rank.map(|r| r.to_string()).unwrap_or_default(),
            coin.name,
            coin.symbol.to_uppercase(),
            format_currency(coin.current_price),
            format_percentage(coin.price_change_percentage_24h),
            format_large_number(coin.market_cap),
            format_large_number(coin.total_volume)
        );
    }
}

fn print_coin(coin: &Coin) {
    println!("{} ({})", coin.name, coin.symbol.to_uppercase());
    println!("Price        {}", format_currency(coin.current_price));
    println!("24h change   {}", format_percentage(coin.price_change_percentage_24h));
    if let (Some(high), Some(low)) = (coin.high_24h, coin.low_24h) {
        println!("24h range    {} - {}", format_currency(low), format_currency(high));
    }
    println!("Market cap   {}", format_large_number(coin.market_cap));
    println!("Volume       {}", format_large_number(coin.total_volume));
    if let Some(supply) = coin.circulating_supply {
        println!("Supply       {supply:.0} {}", coin.symbol.to_uppercase());
    }
}
