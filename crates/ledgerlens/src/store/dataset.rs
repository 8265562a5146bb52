//! Immutable dataset snapshots.

use std::collections::HashSet;

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::error::{LedgerError, Result};
use crate::inference::TypeClassifier;
use crate::normalize::ValueNormalizer;
use crate::schema::{
    CellValue, Column, DatasetInfo, RawColumn, RawValue, Row, RowSet, SemanticType,
};

use super::index::ColumnIndex;

/// A registered dataset: normalized columns and their indexes, built together
/// and never modified afterwards.
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    table_name: String,
    row_count: usize,
    columns: IndexMap<String, Column>,
    indexes: IndexMap<String, ColumnIndex>,
}

impl Dataset {
    /// Classify, normalize and index raw columns into a snapshot.
    ///
    /// Columns shorter than the longest one are padded with nulls. Cells that
    /// fail to normalize become nulls; a column whose index cannot be built is
    /// left unindexed.
    pub fn build(
        name: &str,
        table_name: &str,
        columns: Vec<RawColumn>,
        classifier: &TypeClassifier,
        parallel: bool,
    ) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(LedgerError::DuplicateColumn {
                    dataset: name.to_string(),
                    column: column.name.clone(),
                });
            }
        }

        let row_count = columns.iter().map(|c| c.values.len()).max().unwrap_or(0);
        let columns: Vec<RawColumn> = columns
            .into_iter()
            .map(|mut column| {
                if column.values.len() < row_count {
                    warn!(
                        dataset = name,
                        column = %column.name,
                        len = column.values.len(),
                        rows = row_count,
                        "Padding short column with nulls"
                    );
                    column.values.resize(row_count, RawValue::Null);
                }
                column
            })
            .collect();

        let built: Vec<(Column, Option<ColumnIndex>)> = if parallel {
            columns
                .into_par_iter()
                .map(|c| build_column(name, c, classifier))
                .collect()
        } else {
            columns
                .into_iter()
                .map(|c| build_column(name, c, classifier))
                .collect()
        };

        Ok(Self::assemble(name, table_name, row_count, built))
    }

    /// Snapshot of already-normalized columns of equal length.
    #[cfg(test)]
    pub(crate) fn from_columns(name: &str, table_name: &str, columns: Vec<Column>) -> Self {
        let row_count = columns.iter().map(Column::len).max().unwrap_or(0);
        let built = columns
            .into_iter()
            .map(|column| {
                let index = index_column(name, &column);
                (column, index)
            })
            .collect();
        Self::assemble(name, table_name, row_count, built)
    }

    fn assemble(
        name: &str,
        table_name: &str,
        row_count: usize,
        built: Vec<(Column, Option<ColumnIndex>)>,
    ) -> Self {
        let mut by_name = IndexMap::with_capacity(built.len());
        let mut indexes = IndexMap::new();
        for (column, index) in built {
            if let Some(index) = index {
                indexes.insert(column.name.clone(), index);
            }
            by_name.insert(column.name.clone(), column);
        }

        Self {
            name: name.to_string(),
            table_name: table_name.to_string(),
            row_count,
            columns: by_name,
            indexes,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the mirror table holding this dataset.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Columns in input order.
    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.values()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.keys().cloned().collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    pub fn index(&self, column: &str) -> Option<&ColumnIndex> {
        self.indexes.get(column)
    }

    /// Metadata summary.
    pub fn info(&self) -> DatasetInfo {
        DatasetInfo {
            name: self.name.clone(),
            table_name: self.table_name.clone(),
            row_count: self.row_count,
            column_names: self.column_names(),
            column_types: self
                .columns
                .values()
                .map(|c| (c.name.clone(), c.semantic_type))
                .collect(),
            indexed_columns: self.indexes.keys().cloned().collect(),
            classifications: self
                .columns
                .values()
                .map(|c| (c.name.clone(), c.classification.clone()))
                .collect(),
            unparseable_counts: self
                .columns
                .values()
                .map(|c| (c.name.clone(), c.unparseable))
                .collect(),
        }
    }

    /// Rows whose cells equal every filter value; all rows when there are no filters.
    ///
    /// Filter values are coerced to the column's type first. A value that
    /// cannot be coerced matches nothing.
    pub fn filter_equals(&self, filters: &[(String, CellValue)]) -> Result<RowSet> {
        self.require_columns(filters.iter().map(|(c, _)| c.as_str()))?;

        let normalizer = ValueNormalizer::new();
        let mut selected: Option<Vec<usize>> = None;

        for (name, value) in filters {
            let Some(column) = self.columns.get(name) else {
                continue;
            };
            let mut ids = match normalizer.coerce(column.semantic_type, value) {
                Some(target) => self.matching_ids(column, &target),
                None => Vec::new(),
            };
            ids.sort_unstable();

            selected = Some(match selected {
                None => ids,
                Some(mut current) => {
                    current.retain(|id| ids.binary_search(id).is_ok());
                    current
                }
            });

            if selected.as_ref().is_some_and(Vec::is_empty) {
                break;
            }
        }

        let ids = selected.unwrap_or_else(|| (0..self.row_count).collect());
        Ok(self.materialize(&ids))
    }

    /// Rows whose value in `column` lies in `[low, high]`.
    pub fn range_query(&self, column: &str, low: &CellValue, high: &CellValue) -> Result<RowSet> {
        let col = self
            .columns
            .get(column)
            .ok_or_else(|| LedgerError::missing(&self.name, vec![column.to_string()]))?;

        let unindexed = || LedgerError::UnindexedColumn {
            dataset: self.name.clone(),
            column: column.to_string(),
        };
        let index = self
            .indexes
            .get(column)
            .filter(|idx| idx.supports_range())
            .ok_or_else(unindexed)?;

        let normalizer = ValueNormalizer::new();
        let coerce = |bound: &CellValue| {
            normalizer
                .coerce(col.semantic_type, bound)
                .ok_or_else(|| LedgerError::UnparseableValue {
                    column: column.to_string(),
                    value: bound.to_string(),
                })
        };
        let low = coerce(low)?;
        let high = coerce(high)?;

        let ids = index.range(&low, &high).ok_or_else(unindexed)?;
        Ok(self.materialize(&ids))
    }

    /// Materialize rows by id in ascending order; unknown ids are skipped.
    pub fn rows(&self, ids: &[usize]) -> RowSet {
        let mut ids: Vec<usize> = ids.iter().copied().filter(|id| *id < self.row_count).collect();
        ids.sort_unstable();
        ids.dedup();
        self.materialize(&ids)
    }

    pub fn row(&self, id: usize) -> Option<Row> {
        (id < self.row_count).then(|| Row {
            id,
            cells: self
                .columns
                .values()
                .map(|c| c.cells.get(id).cloned().unwrap_or(CellValue::Null))
                .collect(),
        })
    }

    /// Fail with every name in `names` that is not a column.
    pub(crate) fn require_columns<'a>(
        &self,
        names: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let mut missing: Vec<String> = Vec::new();
        for name in names {
            if !self.columns.contains_key(name) && !missing.iter().any(|m| m == name) {
                missing.push(name.to_string());
            }
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LedgerError::missing(&self.name, missing))
        }
    }

    fn matching_ids(&self, column: &Column, target: &CellValue) -> Vec<usize> {
        if let Some(ids) = self.indexes.get(&column.name).and_then(|idx| idx.lookup(target)) {
            return ids;
        }
        column
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| *cell == target)
            .map(|(id, _)| id)
            .collect()
    }

    fn materialize(&self, ids: &[usize]) -> RowSet {
        RowSet {
            columns: self.column_names(),
            rows: ids.iter().filter_map(|id| self.row(*id)).collect(),
        }
    }
}

fn build_column(
    dataset: &str,
    raw: RawColumn,
    classifier: &TypeClassifier,
) -> (Column, Option<ColumnIndex>) {
    let classification = classifier.classify(&raw.values);
    let semantic_type: SemanticType = raw.type_override.unwrap_or(classification.semantic_type);
    debug!(
        dataset,
        column = %raw.name,
        inferred = %classification.semantic_type,
        used = %semantic_type,
        confidence = classification.confidence,
        hint = classification.format_hint.as_deref().unwrap_or(""),
        "Classified column"
    );

    let normalized = ValueNormalizer::new().normalize_column(semantic_type, &raw.values);
    debug!(
        dataset,
        column = %raw.name,
        unparseable = normalized.unparseable,
        "Normalized column"
    );

    let column = Column {
        name: raw.name,
        semantic_type,
        cells: normalized.cells,
        classification,
        unparseable: normalized.unparseable,
    };

    let index = index_column(dataset, &column);
    (column, index)
}

fn index_column(dataset: &str, column: &Column) -> Option<ColumnIndex> {
    match ColumnIndex::build(column) {
        Ok(index) => Some(index),
        Err(err) => {
            warn!(dataset, column = %column.name, error = %err, "Skipping column index");
            None
        }
    }
}
