//! Value normalization: raw cells into canonical amounts, dates and text.

mod amount;
mod date;

pub use amount::{
    CURRENCY_SYMBOLS, abbreviation_multiplier, clean_number, currency_code, parse_amount,
    parse_amount_str, strip_currency,
};
pub use date::{
    EXCEL_SERIAL_MAX, excel_serial_to_date, month_from_name, parse_date, parse_date_str,
};

pub(crate) use amount::scale_abbreviated;
pub(crate) use date::excel_serial_year;

use crate::schema::{CellValue, RawValue, SemanticType};

/// A column's worth of normalized cells.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCells {
    pub cells: Vec<CellValue>,
    /// Non-empty raw cells that could not be normalized.
    pub unparseable: usize,
}

/// Converts raw cells into canonical values for a given semantic type.
///
/// Normalization never fails: a cell that does not parse becomes
/// [`CellValue::Null`] and is counted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValueNormalizer;

impl ValueNormalizer {
    pub fn new() -> Self {
        Self
    }

    /// Normalize one cell. `None` means the cell was non-empty but unparseable.
    pub fn normalize(&self, semantic_type: SemanticType, raw: &RawValue) -> Option<CellValue> {
        if is_blank(raw) {
            return Some(CellValue::Null);
        }
        match semantic_type {
            SemanticType::Number => parse_amount(raw).map(CellValue::Amount),
            SemanticType::Date => parse_date(raw).map(CellValue::Date),
            SemanticType::Text => normalize_text(raw).map(CellValue::Text),
        }
    }

    /// Normalize every cell of a column.
    pub fn normalize_column(
        &self,
        semantic_type: SemanticType,
        values: &[RawValue],
    ) -> NormalizedCells {
        let mut unparseable = 0;
        let cells = values
            .iter()
            .map(|raw| {
                self.normalize(semantic_type, raw).unwrap_or_else(|| {
                    unparseable += 1;
                    CellValue::Null
                })
            })
            .collect();

        NormalizedCells { cells, unparseable }
    }

    /// Coerce a caller-supplied value (filter or range bound) to a column's type.
    ///
    /// Values already of the right kind pass through; text is parsed.
    pub fn coerce(&self, semantic_type: SemanticType, value: &CellValue) -> Option<CellValue> {
        match (semantic_type, value) {
            (_, CellValue::Null) => None,
            (SemanticType::Number, CellValue::Amount(_))
            | (SemanticType::Date, CellValue::Date(_)) => Some(value.clone()),
            (SemanticType::Text, CellValue::Text(s)) => {
                normalize_text(&RawValue::Text(s.clone())).map(CellValue::Text)
            }
            (SemanticType::Number, CellValue::Text(s)) => {
                parse_amount_str(s.trim()).map(CellValue::Amount)
            }
            (SemanticType::Date, CellValue::Text(s)) => {
                parse_date_str(s.trim()).map(CellValue::Date)
            }
            (SemanticType::Text, other) => Some(CellValue::Text(other.to_string())),
            _ => None,
        }
    }
}

/// Trimmed text; numbers use their canonical string. Empty text is null.
pub fn normalize_text(raw: &RawValue) -> Option<String> {
    raw.canonical_text().filter(|s| !s.is_empty())
}

fn is_blank(raw: &RawValue) -> bool {
    match raw {
        RawValue::Text(s) => s.trim().is_empty(),
        other => other.is_null(),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_failures_become_null_and_are_counted() {
        let normalizer = ValueNormalizer::new();
        let values = vec![
            RawValue::from("2023-01-15"),
            RawValue::from("garbage"),
            RawValue::Null,
            RawValue::from("   "),
        ];
        let result = normalizer.normalize_column(SemanticType::Date, &values);

        assert_eq!(result.cells.len(), 4);
        assert_eq!(
            result.cells[0],
            CellValue::Date(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap())
        );
        assert!(result.cells[1..].iter().all(CellValue::is_null));
        assert_eq!(result.unparseable, 1);
    }

    #[test]
    fn test_text_columns_keep_numbers_as_text() {
        let normalizer = ValueNormalizer::new();
        assert_eq!(
            normalizer.normalize(SemanticType::Text, &RawValue::Integer(7)),
            Some(CellValue::from("7"))
        );
        assert_eq!(
            normalizer.normalize(SemanticType::Text, &RawValue::from("  Revenue ")),
            Some(CellValue::from("Revenue"))
        );
    }

    #[test]
    fn test_coerce_parses_text_for_typed_columns() {
        let normalizer = ValueNormalizer::new();
        assert_eq!(
            normalizer.coerce(SemanticType::Date, &CellValue::from("2023-01-15")),
            Some(CellValue::Date(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()))
        );
        assert_eq!(
            normalizer.coerce(SemanticType::Number, &CellValue::from("$1,000")),
            Some(CellValue::Amount(Decimal::from_str("1000").unwrap()))
        );
        assert_eq!(normalizer.coerce(SemanticType::Number, &CellValue::from("abc")), None);
        assert_eq!(normalizer.coerce(SemanticType::Text, &CellValue::Null), None);
    }
}
