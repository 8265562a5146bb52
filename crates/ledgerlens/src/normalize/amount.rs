//! Exact-decimal amount normalization.
//!
//! Rules are tried in order and the first match wins:
//!
//! 1. Integer/float cells convert through their canonical string form.
//! 2. `(1,234.56)` is an accounting negative.
//! 3. `1234.56-` is a trailing-minus negative.
//! 4. `1.5M` style abbreviations (`k`, `m`, `b`).
//! 5. A currency symbol prefix or suffix is stripped.
//! 6. Generic cleaning with US/European separator disambiguation.
//!
//! The inner text of a negative and the remainder after a currency symbol
//! go through rules 4 to 6 again, so `$1.5M`, `(1.5M)` and `1.5M-` all keep
//! their multiplier, matching what the classifier decodes.
//!
//! Abbreviations are scaled in `f64` before the decimal conversion, so
//! `0.1k`-style inputs can pick up binary rounding noise. Every other path
//! is exact.

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use crate::schema::{RawValue, canonical_float};

/// Recognized currency symbols.
pub const CURRENCY_SYMBOLS: [char; 5] = ['$', '€', '£', '¥', '₹'];

static ABBREVIATED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^([+-]?\d*\.?\d+)\s*([kmb])$").unwrap());

/// Parse a raw cell into an exact decimal. `None` means unparseable.
pub fn parse_amount(raw: &RawValue) -> Option<Decimal> {
    match raw {
        RawValue::Null => None,
        RawValue::Integer(i) => Some(Decimal::from(*i)),
        RawValue::Float(f) => Decimal::from_str(&canonical_float(*f)?).ok(),
        RawValue::Text(s) => parse_amount_str(s.trim()),
    }
}

/// Parse a trimmed string into an exact decimal.
pub fn parse_amount_str(value: &str) -> Option<Decimal> {
    if value.is_empty() {
        return None;
    }

    if let Some(inner) = value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        return parse_unsigned(inner.trim()).map(|d| -d);
    }

    if let Some(inner) = value.strip_suffix('-') {
        return parse_unsigned(inner.trim()).map(|d| -d);
    }

    parse_unsigned(value)
}

fn parse_unsigned(value: &str) -> Option<Decimal> {
    if let Some(amount) = parse_abbreviated(value) {
        return Some(amount);
    }

    if let Some(inner) = strip_currency(value).map(|(_, rest)| rest) {
        return parse_abbreviated(inner).or_else(|| clean_number(inner));
    }

    clean_number(value)
}

/// Split off one leading or trailing currency symbol.
pub fn strip_currency(value: &str) -> Option<(char, &str)> {
    let first = value.chars().next()?;
    if CURRENCY_SYMBOLS.contains(&first) {
        let rest = value[first.len_utf8()..].trim();
        return (!rest.is_empty()).then_some((first, rest));
    }
    let last = value.chars().next_back()?;
    if CURRENCY_SYMBOLS.contains(&last) {
        let rest = value[..value.len() - last.len_utf8()].trim();
        return (!rest.is_empty()).then_some((last, rest));
    }
    None
}

/// ISO-ish code used in format hints.
pub fn currency_code(symbol: char) -> &'static str {
    match symbol {
        '$' => "USD",
        '€' => "EUR",
        '£' => "GBP",
        '¥' => "JPY",
        '₹' => "INR",
        _ => "Other",
    }
}

/// Multiplier for an abbreviation suffix.
pub fn abbreviation_multiplier(suffix: char) -> Option<f64> {
    match suffix.to_ascii_lowercase() {
        'k' => Some(1_000.0),
        'm' => Some(1_000_000.0),
        'b' => Some(1_000_000_000.0),
        _ => None,
    }
}

fn parse_abbreviated(value: &str) -> Option<Decimal> {
    let caps = ABBREVIATED.captures(value)?;
    let number: f64 = caps[1].parse().ok()?;
    let suffix = caps[2].chars().next()?;
    scale_abbreviated(number, suffix)
}

/// Scale in binary floating point, then convert the product exactly.
pub(crate) fn scale_abbreviated(number: f64, suffix: char) -> Option<Decimal> {
    let product = number * abbreviation_multiplier(suffix)?;
    Decimal::from_str(&canonical_float(product)?).ok()
}

/// Strip separators and stray characters, then parse.
///
/// With both `.` and `,` present the right-most one is the decimal mark
/// (`1,234.56` vs `1.234,56`). A lone `,` is a US thousands separator, so
/// `1,234` is 1234 and never 1.234. A lone `.` is left alone.
pub fn clean_number(value: &str) -> Option<Decimal> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    let normalized = match (value.rfind('.'), value.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => value.replace('.', "").replace(',', "."),
        (_, Some(_)) => value.replace(',', ""),
        _ => value.to_string(),
    };

    let cleaned: String = normalized
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        .collect();

    Decimal::from_str(&cleaned).ok()
}
