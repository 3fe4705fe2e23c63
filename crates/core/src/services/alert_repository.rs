use std::collections::HashSet;

use log::warn;

use crate::errors::CoreError;
use crate::models::alert::{Alert, AlertDraft};
use crate::storage::manager::{PersistentStore, ALERTS_KEY};

/// Authoritative list of price alerts, mirrored to durable storage.
///
/// Every mutation writes the whole collection back as one JSON blob. If that
/// write fails the in-memory list still changes and stays authoritative for
/// the rest of the session.
#[derive(Debug)]
pub struct AlertRepository {
    alerts: Vec<Alert>,
    store: PersistentStore,
}

impl AlertRepository {
    /// Open the repository, loading any alerts saved by a previous session.
    /// Unreadable or corrupt storage yields an empty collection.
    pub fn load(store: PersistentStore) -> Self {
        let alerts = dedupe(store.get(ALERTS_KEY, Vec::new()));
        Self { alerts, store }
    }

    /// Re-read the collection from durable storage, replacing in-memory state.
    pub fn reload(&mut self) {
        self.alerts = dedupe(self.store.get(ALERTS_KEY, Vec::new()));
    }

    /// All alerts, in insertion order.
    pub fn list(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn get(&self, id: &str) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.alerts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    /// Validate `draft`, assign a fresh id and creation time, append, persist.
    pub fn add(&mut self, draft: AlertDraft) -> Result<Alert, CoreError> {
        if draft.coin_id.trim().is_empty() {
            return Err(CoreError::ValidationError("A coin must be selected".into()));
        }
        let rule = draft
            .rule
            .clone()
            .ok_or_else(|| CoreError::ValidationError("An alert type must be selected".into()))?;
        if !rule.is_known() {
            return Err(CoreError::ValidationError(format!(
                "Unknown alert type '{rule}'"
            )));
        }
        if !draft.threshold.is_finite() {
            return Err(CoreError::ValidationError(format!(
                "Threshold must be a finite number, got {}",
                draft.threshold
            )));
        }

        let mut alert = Alert::from_draft(draft, rule);
        // v4 collisions are practically impossible, but ids loaded from older
        // data follow a different scheme
        while self.contains(&alert.id) {
            alert.id = uuid::Uuid::new_v4().to_string();
        }

        self.alerts.push(alert.clone());
        self.persist();
        Ok(alert)
    }

    /// Remove the alert with `id`. Missing ids are a no-op.
    /// Returns the removed alert, if there was one.
    pub fn remove(&mut self, id: &str) -> Option<Alert> {
        let idx = self.alerts.iter().position(|a| a.id == id);
        let removed = idx.map(|i| self.alerts.remove(i));
        self.persist();
        removed
    }

    /// Remove every alert and delete the durable copy.
    pub fn clear(&mut self) {
        self.alerts.clear();
        self.store.remove(ALERTS_KEY);
    }

    fn persist(&self) -> bool {
        self.store.set(ALERTS_KEY, &self.alerts)
    }
}

/// Keep the first alert for each id.
fn dedupe(alerts: Vec<Alert>) -> Vec<Alert> {
    let mut seen = HashSet::new();
    let before = alerts.len();
    let unique: Vec<Alert> = alerts
        .into_iter()
        .filter(|a| seen.insert(a.id.clone()))
        .collect();
    if unique.len() != before {
        warn!("Dropped {} stored alerts with duplicate ids", before - unique.len());
    }
    unique
}
