// Utility helpers for leaf values and number formatting.
//
// This module centralizes all the "dirty" attribute handling so the
// extractors can assume every count is an integer and every percentage is
// a displayable string.
use num_format::{Locale, ToFormattedString};

/// Placeholder for a missing or unreadable percentage.
pub const DEFAULT_PERCENT: &str = "0%";

/// Parse a string-like value into `f64` while being forgiving about
/// formatting issues that are common in report exports (commas, spaces,
/// trailing percent signs).
///
/// - Accepts `Option<&str>` so callers can pass attribute lookups through.
/// - Trims whitespace and a single trailing `%`.
/// - Strips thousands separators like `","` before parsing.
/// - Returns `None` for anything that cannot be safely parsed or is not
///   finite.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    let s = s.strip_suffix('%').unwrap_or(s).trim_end();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_i64_safe(s: Option<&str>) -> Option<i64> {
    // `?` propagates `None` early if the attribute is missing.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let s = s.replace(',', "");
    if let Ok(v) = s.parse::<i64>() {
        return Some(v);
    }
    // Some exports render counts as `12.0`.
    s.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v.trunc() as i64)
}

/// Count attribute, `0` when absent or non-numeric.
pub fn count_or_zero(s: Option<&str>) -> i64 {
    parse_i64_safe(s).unwrap_or(0)
}

/// Percentage attribute kept in its report formatting.
///
/// The original text is returned (trimmed) as long as it reads as a
/// number; otherwise the value becomes `"0%"`.
pub fn percent_or_default(s: Option<&str>) -> String {
    match s {
        Some(raw) if parse_f64_safe(Some(raw)).is_some() => raw.trim().to_string(),
        _ => DEFAULT_PERCENT.to_string(),
    }
}

/// Numeric value of a percentage, `0.0` when unreadable.
pub fn percent_value(s: Option<&str>) -> f64 {
    parse_f64_safe(s).unwrap_or(0.0)
}

/// Case-insensitive match against the sentinel denylist.
pub fn is_sentinel(label: &str, sentinels: &[String]) -> bool {
    let label = label.trim();
    sentinels.iter().any(|s| s.trim().eq_ignore_ascii_case(label))
}

/// Fixed decimals with `en` thousands grouping: `1,234,567.89`.
pub fn format_number(n: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, n.abs());
    let (whole, frac) = match fixed.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (fixed.as_str(), None),
    };
    let mut out = String::new();
    if n < 0.0 {
        out.push('-');
    }
    out.push_str(&whole.parse::<u64>().unwrap_or(0).to_formatted_string(&Locale::en));
    if let Some(frac) = frac {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// `1204` renders as `1,204`.
pub fn format_int<T: ToFormattedString>(n: T) -> String {
    n.to_formatted_string(&Locale::en)
}
