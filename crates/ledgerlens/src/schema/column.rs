//! Column definitions: raw input, classification metadata and normalized storage.

use serde::{Deserialize, Serialize};

use super::types::{CellValue, RawValue, SemanticType};

/// Outcome of classifying one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Inferred semantic type.
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    /// Fraction of the sample supporting the decision (0.0-1.0).
    pub confidence: f64,
    /// Pattern that matched first, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_hint: Option<String>,
}

impl ClassificationResult {
    pub fn new(semantic_type: SemanticType, confidence: f64, format_hint: Option<String>) -> Self {
        Self {
            semantic_type,
            confidence,
            format_hint,
        }
    }
}

/// A named column of raw cells, as produced by the spreadsheet reader.
#[derive(Debug, Clone, PartialEq)]
pub struct RawColumn {
    pub name: String,
    pub values: Vec<RawValue>,
    /// Explicit type that wins over the classifier.
    pub type_override: Option<SemanticType>,
}

impl RawColumn {
    pub fn new<V: Into<RawValue>>(
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
            type_override: None,
        }
    }

    /// Force the column's semantic type regardless of classification.
    pub fn with_type(mut self, semantic_type: SemanticType) -> Self {
        self.type_override = Some(semantic_type);
        self
    }
}

/// A normalized column owned by a dataset snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    /// Column name, unique within its dataset.
    pub name: String,
    /// Type used for normalization and indexing.
    pub semantic_type: SemanticType,
    /// Canonical cells in row-id order.
    pub cells: Vec<CellValue>,
    /// What the classifier concluded, even when overridden.
    pub classification: ClassificationResult,
    /// Non-null raw cells that failed to normalize.
    pub unparseable: usize,
}

impl Column {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, row_id: usize) -> Option<&CellValue> {
        self.cells.get(row_id)
    }

    pub fn null_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_null()).count()
    }
}
