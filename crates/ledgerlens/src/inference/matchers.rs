//! Value matchers used by the type classifier.
//!
//! Date matchers only decide whether a value *looks* like a date; they do not
//! validate the calendar. They run in the order of [`DATE_MATCHERS`] and the
//! first hit names the format.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::normalize::{
    EXCEL_SERIAL_MAX, clean_number, currency_code, excel_serial_year, scale_abbreviated,
};

/// How a single date matcher recognizes its format.
#[derive(Debug)]
pub enum DatePattern {
    /// All-digit value inside the Excel serial range, landing in years 1900..=9999.
    ExcelSerial,
    /// Anchored regular expression.
    Regex(Regex),
}

/// One entry of the ordered date matcher list.
#[derive(Debug)]
pub struct DateMatcher {
    /// Format hint reported when this matcher wins.
    pub hint: &'static str,
    pub pattern: DatePattern,
}

impl DateMatcher {
    fn regex(hint: &'static str, pattern: &str) -> Self {
        Self {
            hint,
            pattern: DatePattern::Regex(Regex::new(pattern).unwrap()),
        }
    }

    /// Whether the trimmed value has this matcher's shape.
    pub fn matches(&self, value: &str) -> bool {
        match &self.pattern {
            DatePattern::ExcelSerial => looks_like_excel_serial(value),
            DatePattern::Regex(re) => re.is_match(value),
        }
    }
}

/// Date matchers in priority order.
pub static DATE_MATCHERS: Lazy<Vec<DateMatcher>> = Lazy::new(|| {
    vec![
        DateMatcher {
            hint: "ExcelSerial",
            pattern: DatePattern::ExcelSerial,
        },
        DateMatcher::regex("MM/DD/YYYY", r"^\d{1,2}/\d{1,2}/\d{4}$"),
        DateMatcher::regex("YYYY-MM-DD", r"^\d{4}-\d{2}-\d{2}$"),
        DateMatcher::regex("DD-MON-YYYY", r"(?i)^\d{1,2}-[a-z]{3}-\d{4}$"),
        DateMatcher::regex(
            "MON YYYY",
            r"(?i)^(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[ -]\d{4}$",
        ),
        DateMatcher::regex(
            "MONTH YYYY",
            r"(?i)^(january|february|march|april|may|june|july|august|september|october|november|december) \d{4}$",
        ),
        DateMatcher::regex("Qn-YY", r"(?i)^q[1-4] ?[-\s]?(\d{2}|\d{4})$"),
        DateMatcher::regex("Quarter n YYYY", r"(?i)^quarter [1-4] \d{4}$"),
    ]
});

/// Sign, optional currency on either side, grouped digits, optional
/// abbreviation suffix.
static NUMBER_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<sign>[+-])?\s*(?P<lead>[$€£¥₹])?\s*(?P<sign2>[+-])?(?P<digits>(?:\d{1,3}(?:[,.\s]\d{3})+|\d+)?(?:[.,]\d+)?)\s*(?P<suffix>[kmb])?\s*(?P<trail>[$€£¥₹])?$",
    )
    .unwrap()
});

/// A value recognized as a number.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberMatch {
    /// Decoded value.
    pub value: Decimal,
    /// Format tag, e.g. `Currency-USD`, `Abbreviated-K`, `Decimal`.
    pub format: String,
}

/// Returns the hint of the first date matcher accepting the value.
pub fn match_date(value: &str) -> Option<&'static str> {
    DATE_MATCHERS
        .iter()
        .find(|m| m.matches(value))
        .map(|m| m.hint)
}

/// Recognize currency amounts, accounting negatives, thousands separators
/// and `k`/`m`/`b` abbreviations.
pub fn match_number(value: &str) -> Option<NumberMatch> {
    let mut body = value.trim();
    if body.is_empty() {
        return None;
    }

    let mut negative = false;
    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        body = inner.trim();
        negative = true;
    } else if body.len() > 1 {
        if let Some(inner) = body.strip_suffix('-') {
            body = inner.trim();
            negative = true;
        }
    }

    let caps = NUMBER_SHAPE.captures(body)?;
    let digits = caps.name("digits").map(|m| m.as_str()).unwrap_or("");
    if !digits.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }

    let lead = caps.name("lead").and_then(|m| m.as_str().chars().next());
    let trail = caps.name("trail").and_then(|m| m.as_str().chars().next());
    if lead.is_some() && trail.is_some() {
        return None;
    }
    if caps.name("sign").is_some() && caps.name("sign2").is_some() {
        return None;
    }
    for sign in [caps.name("sign"), caps.name("sign2")].into_iter().flatten() {
        if sign.as_str() == "-" {
            negative = !negative;
        }
    }

    let mut amount = clean_number(digits)?;
    let suffix = caps.name("suffix").and_then(|m| m.as_str().chars().next());
    if let Some(suffix) = suffix {
        amount = scale_abbreviated(amount.to_f64()?, suffix)?;
    }
    if negative {
        amount = -amount;
    }

    let format = match (suffix, lead.or(trail)) {
        (Some(s), _) => format!("Abbreviated-{}", s.to_ascii_uppercase()),
        (None, Some(symbol)) => format!("Currency-{}", currency_code(symbol)),
        (None, None) => "Decimal".to_string(),
    };

    Some(NumberMatch {
        value: amount,
        format,
    })
}

fn looks_like_excel_serial(value: &str) -> bool {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    match value.parse::<i64>() {
        Ok(serial) if (1..=EXCEL_SERIAL_MAX).contains(&serial) => {
            matches!(excel_serial_year(serial), Some(year) if (1900..=9999).contains(&year))
        }
        _ => false,
    }
}
