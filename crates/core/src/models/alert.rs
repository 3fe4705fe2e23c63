use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How an alert compares its threshold against a coin snapshot.
///
/// Serialized as a plain string. Values this build does not understand are
/// kept verbatim in `Other` so that a stored alert survives a round-trip;
/// such alerts never trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComparisonRule {
    /// Current price at or above the threshold
    Above,
    /// Current price at or below the threshold
    Below,
    /// 24h percentage change at or above the threshold
    ChangeAbove,
    /// 24h percentage change at or below the threshold
    ChangeBelow,
    /// Unrecognised rule name
    Other(String),
}

impl ComparisonRule {
    /// Canonical wire name.
    pub fn as_str(&self) -> &str {
        match self {
            ComparisonRule::Above => "above",
            ComparisonRule::Below => "below",
            ComparisonRule::ChangeAbove => "change_above",
            ComparisonRule::ChangeBelow => "change_below",
            ComparisonRule::Other(raw) => raw,
        }
    }

    /// Whether the threshold is a percentage (true) or an absolute price.
    pub fn is_percentage(&self) -> bool {
        matches!(self, ComparisonRule::ChangeAbove | ComparisonRule::ChangeBelow)
    }

    /// Whether this is one of the four known rules.
    pub fn is_known(&self) -> bool {
        !matches!(self, ComparisonRule::Other(_))
    }

    /// Human-readable label used in notifications and listings.
    pub fn label(&self) -> &str {
        match self {
            ComparisonRule::Above => "price above",
            ComparisonRule::Below => "price below",
            ComparisonRule::ChangeAbove => "24h change above",
            ComparisonRule::ChangeBelow => "24h change below",
            ComparisonRule::Other(raw) => raw,
        }
    }
}

impl From<String> for ComparisonRule {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "above" => ComparisonRule::Above,
            "below" => ComparisonRule::Below,
            "change_above" | "changeAbove" => ComparisonRule::ChangeAbove,
            "change_below" | "changeBelow" => ComparisonRule::ChangeBelow,
            _ => ComparisonRule::Other(raw),
        }
    }
}

impl From<&str> for ComparisonRule {
    fn from(raw: &str) -> Self {
        ComparisonRule::from(raw.to_string())
    }
}

impl From<ComparisonRule> for String {
    fn from(rule: ComparisonRule) -> Self {
        match rule {
            ComparisonRule::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ComparisonRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user-defined, one-shot price alert.
///
/// Field names on the wire match the layout the dashboard has always written
/// to local storage (`type` for the rule, `price` for the threshold).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// Opaque unique identifier
    pub id: String,

    /// Coin this alert watches; not checked against the market at creation
    pub coin_id: String,

    /// Display name captured when the alert was created
    pub coin_name: String,

    #[serde(rename = "type")]
    pub rule: ComparisonRule,

    /// Absolute price for above/below, percentage for change rules
    #[serde(rename = "price")]
    pub threshold: f64,

    pub message: String,

    pub created_at: DateTime<Utc>,

    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl Alert {
    /// Build a fresh alert from a validated draft.
    pub(crate) fn from_draft(draft: AlertDraft, rule: ComparisonRule) -> Self {
        let message = draft
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| format!("{} price alert", draft.coin_name));

        Self {
            id: Uuid::new_v4().to_string(),
            coin_id: draft.coin_id,
            coin_name: draft.coin_name,
            rule,
            threshold: draft.threshold,
            message,
            created_at: Utc::now(),
            is_active: true,
        }
    }
}

/// User input for creating an alert. Validated by `AlertRepository::add`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertDraft {
    pub coin_id: String,
    pub coin_name: String,
    pub rule: Option<ComparisonRule>,
    pub threshold: f64,
    pub message: Option<String>,
}

impl AlertDraft {
    pub fn new(
        coin_id: impl Into<String>,
        coin_name: impl Into<String>,
        rule: ComparisonRule,
        threshold: f64,
    ) -> Self {
        Self {
            coin_id: coin_id.into(),
            coin_name: coin_name.into(),
            rule: Some(rule),
            threshold,
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}
