//! Error types for the Ledgerlens library.

use thiserror::Error;

/// Main error type for Ledgerlens operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// No dataset is registered under this name.
    #[error("Dataset '{name}' not found")]
    DatasetNotFound { name: String },

    /// One or more named columns do not exist in the dataset.
    #[error("Missing column(s) in dataset '{dataset}': {}", .columns.join(", "))]
    MissingColumn {
        dataset: String,
        columns: Vec<String>,
    },

    /// The column exists but has no ordered index to answer a range query.
    #[error("Column '{column}' in dataset '{dataset}' has no range index")]
    UnindexedColumn { dataset: String, column: String },

    /// A caller-supplied value could not be normalized for the target column.
    #[error("Value '{value}' cannot be parsed for column '{column}'")]
    UnparseableValue { column: String, value: String },

    /// An ad-hoc query against the relational mirror failed.
    #[error("Backend query failed: {message}")]
    BackendQuery { message: String },

    /// A column index could not be built.
    #[error("Index build failed for column '{column}': {reason}")]
    IndexBuild { column: String, reason: String },

    /// Two input columns share a name.
    #[error("Duplicate column '{column}' in dataset '{dataset}'")]
    DuplicateColumn { dataset: String, column: String },

    /// Two dataset names sanitize to the same mirror table.
    #[error("Dataset '{dataset}' maps to table '{table}', already used by dataset '{owner}'")]
    MirrorNameConflict {
        dataset: String,
        table: String,
        owner: String,
    },

    /// The store has been closed and its backend connection released.
    #[error("Store is closed")]
    StoreClosed,

    /// Error from the embedded SQLite backend.
    #[error("SQLite error: {0}")]
    Backend(#[from] rusqlite::Error),
}

impl LedgerError {
    pub(crate) fn not_found(name: &str) -> Self {
        LedgerError::DatasetNotFound {
            name: name.to_string(),
        }
    }

    pub(crate) fn missing(dataset: &str, columns: Vec<String>) -> Self {
        LedgerError::MissingColumn {
            dataset: dataset.to_string(),
            columns,
        }
    }
}

/// Result type alias for Ledgerlens operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_column_lists_every_name() {
        let err = LedgerError::missing("ledger", vec!["Amount".into(), "Region".into()]);
        assert_eq!(
            err.to_string(),
            "Missing column(s) in dataset 'ledger': Amount, Region"
        );
    }
}
