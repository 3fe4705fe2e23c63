//! Input checks for the alert form.

use crate::errors::CoreError;
use crate::models::alert::ComparisonRule;

/// Lowest 24h change an alert may watch for.
pub const MIN_PERCENTAGE: f64 = -100.0;

/// Highest 24h change an alert may watch for.
pub const MAX_PERCENTAGE: f64 = 1000.0;

/// A positive, finite number.
pub fn is_valid_price(input: &str) -> bool {
    matches!(input.trim().parse::<f64>(), Ok(v) if v.is_finite() && v > 0.0)
}

/// A finite number in `MIN_PERCENTAGE..=MAX_PERCENTAGE`.
pub fn is_valid_percentage(input: &str) -> bool {
    matches!(
        input.trim().parse::<f64>(),
        Ok(v) if (MIN_PERCENTAGE..=MAX_PERCENTAGE).contains(&v)
    )
}

/// Parse the threshold field of the alert form for `rule`.
///
/// Price rules need a positive price; change rules need a percentage in
/// range. Empty input is reported separately from malformed input.
pub fn parse_threshold(input: &str, rule: &ComparisonRule) -> Result<f64, CoreError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CoreError::ValidationError("Please enter a target value".into()));
    }

    let valid = if rule.is_percentage() {
        is_valid_percentage(trimmed)
    } else {
        is_valid_price(trimmed)
    };
    if !valid {
        let expected = if rule.is_percentage() {
            format!("a percentage between {MIN_PERCENTAGE} and {MAX_PERCENTAGE}")
        } else {
            "a price greater than zero".to_string()
        };
        return Err(CoreError::ValidationError(format!(
            "'{trimmed}' is not a valid target, expected {expected}"
        )));
    }

    trimmed
        .parse()
        .map_err(|_| CoreError::ValidationError(format!("'{trimmed}' is not a number")))
}
