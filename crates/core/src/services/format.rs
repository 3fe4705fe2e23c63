//! Display formatting for prices, percentages, and market totals (USD).

/// `$1,234.57`; values under one dollar keep six decimals (`$0.120000`).
pub fn format_currency(value: f64) -> String {
    let decimals = if value.abs() < 1.0 { 6 } else { 2 };
    let sign = if value < 0.0 { "-" } else { "" };
    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    if frac_part.is_empty() {
        format!("{sign}${}", group_thousands(int_part))
    } else {
        format!("{sign}${}.{frac_part}", group_thousands(int_part))
    }
}

/// `+1.23%` / `-4.50%`.
pub fn format_percentage(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{sign}{value:.2}%")
}

/// `$1.23T`, `$4.56B`, `$7.89M`, `$1.50K`, or `$999.00`.
pub fn format_large_number(value: f64) -> String {
    const UNITS: [(f64, &str); 4] = [(1e12, "T"), (1e9, "B"), (1e6, "M"), (1e3, "K")];
    for (scale, suffix) in UNITS {
        if value >= scale {
            return format!("${:.2}{suffix}", value / scale);
        }
    }
    format!("${value:.2}")
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
