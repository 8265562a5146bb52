//! Table-level shapes returned to callers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::column::ClassificationResult;
use super::types::{CellValue, SemanticType};

/// Metadata describing a registered dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub name: String,
    /// Table holding the relational mirror.
    pub table_name: String,
    pub row_count: usize,
    pub column_names: Vec<String>,
    pub column_types: IndexMap<String, SemanticType>,
    /// Columns with a usable index, in column order.
    pub indexed_columns: Vec<String>,
    pub classifications: IndexMap<String, ClassificationResult>,
    /// Cells that failed normalization, per column.
    pub unparseable_counts: IndexMap<String, usize>,
}

/// A materialized row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Row {
    /// Dense row id assigned at ingestion.
    pub id: usize,
    /// Cells in dataset column order.
    pub cells: Vec<CellValue>,
}

/// Rows materialized from a dataset snapshot, in ascending row-id order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl RowSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row ids in output order.
    pub fn ids(&self) -> Vec<usize> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// Look up a cell by output position and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.cells.get(idx))
    }
}

/// Result of an ad-hoc query against the relational mirror.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Look up a cell by row position and column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&serde_json::Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_set_lookup_by_name() {
        let set = RowSet {
            columns: vec!["Category".into(), "Amount".into()],
            rows: vec![Row {
                id: 4,
                cells: vec![CellValue::from("Revenue"), CellValue::Null],
            }],
        };
        assert_eq!(set.ids(), vec![4]);
        assert_eq!(set.value(0, "Category"), Some(&CellValue::from("Revenue")));
        assert_eq!(set.value(0, "Amount"), Some(&CellValue::Null));
        assert_eq!(set.value(0, "Missing"), None);
    }
}
