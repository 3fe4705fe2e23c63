use std::collections::HashMap;

use crate::models::alert::{Alert, ComparisonRule};
use crate::models::coin::CoinSnapshot;

use super::format::{format_currency, format_percentage};

/// Decides which alerts are satisfied by the current market snapshots.
///
/// Pure: no I/O and no mutation. Boundaries are inclusive, so an alert set
/// at exactly the current price triggers on the next evaluation.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlertEvaluator;

impl AlertEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Whether `snapshot` satisfies `alert`'s rule. Unknown rules never trigger.
    pub fn is_triggered(&self, alert: &Alert, snapshot: &CoinSnapshot) -> bool {
        match alert.rule {
            ComparisonRule::Above => snapshot.current_price >= alert.threshold,
            ComparisonRule::Below => snapshot.current_price <= alert.threshold,
            ComparisonRule::ChangeAbove => snapshot.price_change_percentage_24h >= alert.threshold,
            ComparisonRule::ChangeBelow => snapshot.price_change_percentage_24h <= alert.threshold,
            ComparisonRule::Other(_) => false,
        }
    }

    /// Alerts triggered by `snapshots`, in input order.
    /// Alerts whose coin has no snapshot are skipped.
    pub fn evaluate_all(&self, alerts: &[Alert], snapshots: &[CoinSnapshot]) -> Vec<Alert> {
        self.triggered_pairs(alerts, snapshots)
            .into_iter()
            .map(|(alert, _)| alert.clone())
            .collect()
    }

    /// Like `evaluate_all`, but pairs each triggered alert with the snapshot
    /// that triggered it (the scheduler needs the live price for the message).
    pub fn triggered_pairs<'a>(
        &self,
        alerts: &'a [Alert],
        snapshots: &'a [CoinSnapshot],
    ) -> Vec<(&'a Alert, &'a CoinSnapshot)> {
        // First snapshot wins if a provider ever returns duplicate ids
        let mut by_id: HashMap<&str, &CoinSnapshot> = HashMap::with_capacity(snapshots.len());
        for snapshot in snapshots {
            by_id.entry(snapshot.id.as_str()).or_insert(snapshot);
        }

        alerts
            .iter()
            .filter_map(|alert| {
                let snapshot = by_id.get(alert.coin_id.as_str())?;
                self.is_triggered(alert, snapshot).then_some((alert, *snapshot))
            })
            .collect()
    }

    /// One-line description of an alert's condition, e.g. "price above $50,000.00".
    pub fn describe(&self, alert: &Alert) -> String {
        format!("{} {}", alert.rule.label(), format_threshold(alert))
    }
}

/// Threshold rendered as money or percentage depending on the rule.
pub fn format_threshold(alert: &Alert) -> String {
    if alert.rule.is_percentage() {
        format_percentage(alert.threshold)
    } else {
        format_currency(alert.threshold)
    }
}
