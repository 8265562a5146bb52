//! Per-column lookup indexes, built once when a dataset is registered.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::error::{LedgerError, Result};
use crate::schema::{CellValue, Column, SemanticType};

/// Date → row ids, ordered by date.
#[derive(Debug, Clone, Default)]
pub struct DateIndex {
    entries: BTreeMap<NaiveDate, Vec<usize>>,
}

impl DateIndex {
    pub fn lookup(&self, date: NaiveDate) -> &[usize] {
        self.entries.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Row ids with a date in `[low, high]`, ascending.
    pub fn range(&self, low: NaiveDate, high: NaiveDate) -> Vec<usize> {
        if low > high {
            return Vec::new();
        }
        let mut ids: Vec<usize> = self
            .entries
            .range(low..=high)
            .flat_map(|(_, ids)| ids.iter().copied())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Number of distinct dates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Normalized text → row ids.
#[derive(Debug, Clone, Default)]
pub struct CategoryIndex {
    entries: HashMap<String, Vec<usize>>,
}

impl CategoryIndex {
    pub fn lookup(&self, key: &str) -> &[usize] {
        self.entries.get(key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct categories.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `(amount, row id)` pairs in ascending order.
#[derive(Debug, Clone, Default)]
pub struct SortedNumericIndex {
    entries: Vec<(Decimal, usize)>,
}

impl SortedNumericIndex {
    /// Row ids with an amount in `[low, high]`, ascending.
    pub fn range(&self, low: Decimal, high: Decimal) -> Vec<usize> {
        if low > high {
            return Vec::new();
        }
        let start = self.entries.partition_point(|(value, _)| *value < low);
        let end = self.entries.partition_point(|(value, _)| *value <= high);
        let mut ids: Vec<usize> = self.entries[start..end].iter().map(|(_, id)| *id).collect();
        ids.sort_unstable();
        ids
    }

    pub fn min(&self) -> Option<Decimal> {
        self.entries.first().map(|(v, _)| *v)
    }

    pub fn max(&self) -> Option<Decimal> {
        self.entries.last().map(|(v, _)| *v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The index kept for one column, chosen by its semantic type.
#[derive(Debug, Clone)]
pub enum ColumnIndex {
    Date(DateIndex),
    Category(CategoryIndex),
    Numeric(SortedNumericIndex),
}

impl ColumnIndex {
    /// Build the index matching the column's type. Nulls are not indexed.
    pub fn build(column: &Column) -> Result<Self> {
        match column.semantic_type {
            SemanticType::Date => {
                let mut entries: BTreeMap<NaiveDate, Vec<usize>> = BTreeMap::new();
                for (row_id, cell) in column.cells.iter().enumerate() {
                    match cell {
                        CellValue::Null => {}
                        CellValue::Date(d) => entries.entry(*d).or_default().push(row_id),
                        other => return Err(mismatch(column, row_id, other)),
                    }
                }
                Ok(ColumnIndex::Date(DateIndex { entries }))
            }
            SemanticType::Text => {
                let mut entries: HashMap<String, Vec<usize>> = HashMap::new();
                for (row_id, cell) in column.cells.iter().enumerate() {
                    match cell {
                        CellValue::Null => {}
                        CellValue::Text(s) => entries.entry(s.clone()).or_default().push(row_id),
                        other => return Err(mismatch(column, row_id, other)),
                    }
                }
                Ok(ColumnIndex::Category(CategoryIndex { entries }))
            }
            SemanticType::Number => {
                let mut entries = Vec::with_capacity(column.cells.len());
                for (row_id, cell) in column.cells.iter().enumerate() {
                    match cell {
                        CellValue::Null => {}
                        CellValue::Amount(d) => entries.push((*d, row_id)),
                        other => return Err(mismatch(column, row_id, other)),
                    }
                }
                entries.sort_unstable();
                Ok(ColumnIndex::Numeric(SortedNumericIndex { entries }))
            }
        }
    }

    /// Exact-match lookup. `None` when this index does not serve equality.
    pub fn lookup(&self, value: &CellValue) -> Option<Vec<usize>> {
        match (self, value) {
            (ColumnIndex::Date(idx), CellValue::Date(d)) => Some(idx.lookup(*d).to_vec()),
            (ColumnIndex::Category(idx), CellValue::Text(s)) => Some(idx.lookup(s).to_vec()),
            _ => None,
        }
    }

    /// Inclusive range lookup. `None` when this index has no ordering.
    pub fn range(&self, low: &CellValue, high: &CellValue) -> Option<Vec<usize>> {
        match (self, low, high) {
            (ColumnIndex::Date(idx), CellValue::Date(lo), CellValue::Date(hi)) => {
                Some(idx.range(*lo, *hi))
            }
            (ColumnIndex::Numeric(idx), CellValue::Amount(lo), CellValue::Amount(hi)) => {
                Some(idx.range(*lo, *hi))
            }
            _ => None,
        }
    }

    pub fn supports_range(&self) -> bool {
        !matches!(self, ColumnIndex::Category(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ColumnIndex::Date(_) => "date",
            ColumnIndex::Category(_) => "category",
            ColumnIndex::Numeric(_) => "numeric",
        }
    }
}

fn mismatch(column: &Column, row_id: usize, cell: &CellValue) -> LedgerError {
    LedgerError::IndexBuild {
        column: column.name.clone(),
        reason: format!(
            "row {row_id} holds '{cell}', which is not a {} value",
            column.semantic_type
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::schema::ClassificationResult;

    fn column(semantic_type: SemanticType, cells: Vec<CellValue>) -> Column {
        Column {
            name: "c".to_string(),
            semantic_type,
            cells,
            classification: ClassificationResult::new(semantic_type, 1.0, None),
            unparseable: 0,
        }
    }

    fn amount(s: &str) -> CellValue {
        CellValue::Amount(Decimal::from_str(s).unwrap())
    }

    fn date(y: i32, m: u32, d: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_numeric_range_is_inclusive_and_sorted_by_row() {
        let col = column(
            SemanticType::Number,
            vec![amount("50"), amount("10"), CellValue::Null, amount("30"), amount("10.00")],
        );
        let index = ColumnIndex::build(&col).unwrap();

        assert_eq!(index.range(&amount("10"), &amount("30")), Some(vec![1, 3, 4]));
        assert_eq!(index.range(&amount("31"), &amount("49.99")), Some(vec![]));
        assert_eq!(index.range(&amount("60"), &amount("10")), Some(vec![]));
        assert_eq!(index.lookup(&amount("10")), None);
    }

    #[test]
    fn test_date_index_lookup_and_range() {
        let col = column(
            SemanticType::Date,
            vec![date(2023, 1, 15), date(2023, 2, 20), date(2023, 1, 15), CellValue::Null],
        );
        let index = ColumnIndex::build(&col).unwrap();

        assert_eq!(index.lookup(&date(2023, 1, 15)), Some(vec![0, 2]));
        assert_eq!(index.lookup(&date(2024, 1, 1)), Some(vec![]));
        assert_eq!(
            index.range(&date(2023, 1, 1), &date(2023, 12, 31)),
            Some(vec![0, 1, 2])
        );
    }

    #[test]
    fn test_category_index_has_no_range() {
        let col = column(
            SemanticType::Text,
            vec![CellValue::from("Revenue"), CellValue::from("Expense")],
        );
        let index = ColumnIndex::build(&col).unwrap();

        assert!(!index.supports_range());
        assert_eq!(index.lookup(&CellValue::from("Expense")), Some(vec![1]));
        assert_eq!(
            index.range(&CellValue::from("A"), &CellValue::from("Z")),
            None
        );
    }

    #[test]
    fn test_irregular_cells_fail_the_build() {
        let col = column(SemanticType::Date, vec![date(2023, 1, 1), CellValue::from("soon")]);
        let err = ColumnIndex::build(&col).unwrap_err();
        assert!(matches!(err, LedgerError::IndexBuild { ref column, .. } if column == "c"));
    }
}
