//! Core value and type definitions.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single raw cell as handed over by the spreadsheet reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    /// Text cell, untrimmed.
    Text(String),
    /// Whole-number cell.
    Integer(i64),
    /// Floating-point cell.
    Float(f64),
    /// Empty cell.
    Null,
}

impl RawValue {
    /// Returns true for empty cells and NaN floats.
    pub fn is_null(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Canonical textual form used by the matchers and parsers.
    ///
    /// Whole floats keep a trailing `.0` so that `44927.0` never reads as an
    /// Excel serial; non-finite floats have no textual form.
    pub fn canonical_text(&self) -> Option<String> {
        match self {
            RawValue::Text(s) => Some(s.trim().to_string()),
            RawValue::Integer(i) => Some(i.to_string()),
            RawValue::Float(f) => canonical_float(*f),
            RawValue::Null => None,
        }
    }
}

pub(crate) fn canonical_float(f: f64) -> Option<String> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() < 1e16 {
        Some(format!("{f:.1}"))
    } else {
        Some(f.to_string())
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Null)
    }
}

/// Semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    /// Free or categorical text.
    Text,
    /// Monetary or plain numeric amounts.
    Number,
    /// Calendar dates.
    Date,
}

impl SemanticType {
    /// Get a human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            SemanticType::Text => "Text",
            SemanticType::Number => "Number",
            SemanticType::Date => "Date",
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A normalized cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CellValue {
    /// Missing or unparseable.
    Null,
    /// Trimmed text.
    Text(String),
    /// Exact decimal amount.
    Amount(Decimal),
    /// Calendar date.
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_amount(&self) -> Option<Decimal> {
        match self {
            CellValue::Amount(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Text stored in the relational mirror; amounts keep full precision and
    /// dates use ISO-8601.
    pub fn to_mirror_text(&self) -> Option<String> {
        match self {
            CellValue::Null => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Amount(d) => Some(d.to_string()),
            CellValue::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => f.write_str("null"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Amount(d) => write!(f, "{d}"),
            CellValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Amount(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}
