//! Ledgerlens: typed, indexed datasets from heterogeneous financial spreadsheet columns.
//!
//! Spreadsheet exports mix currency strings, accounting negatives, Excel
//! serial dates and quarter labels in the same workbook. Ledgerlens infers a
//! semantic type for every column, normalizes each cell to an exact decimal,
//! a calendar date or trimmed text, and keeps the result as an immutable,
//! indexed snapshot that can be filtered, range-queried, aggregated and
//! queried with SQL through an in-memory SQLite mirror.
//!
//! # Core Principles
//!
//! - **Exact amounts**: money is `rust_decimal::Decimal`, never `f64`, once normalized
//! - **Partial-failure tolerant**: a cell that does not parse becomes null
//! - **Snapshot semantics**: re-registering a dataset swaps it atomically
//!
//! # Example
//!
//! ```
//! use ledgerlens::{DatasetStore, RawColumn};
//!
//! let store = DatasetStore::new().unwrap();
//! store
//!     .register(
//!         "ledger",
//!         vec![
//!             RawColumn::new("Date", ["2023-01-15", "2023-02-20", "2023-01-15"]),
//!             RawColumn::new("Category", ["Revenue", "Expense", "Revenue"]),
//!             RawColumn::new("Amount", ["$1,234.56", "(2,500.00)", "999.99"]),
//!         ],
//!     )
//!     .unwrap();
//!
//! let rows = store
//!     .filter_equals("ledger", [("Date", "2023-01-15"), ("Category", "Revenue")])
//!     .unwrap();
//! assert_eq!(rows.ids(), vec![0, 2]);
//!
//! let totals = store.aggregate("ledger", &["Category"], &["Amount"]).unwrap();
//! assert_eq!(totals.columns(), vec!["Category", "Amount_sum", "Amount_mean", "Amount_count"]);
//! ```

pub mod aggregate;
pub mod error;
pub mod inference;
pub mod normalize;
pub mod schema;
pub mod store;

pub use aggregate::{
    AccumulationMode, AggregateResult, AggregateRow, AggregationConfig, AggregationEngine,
    MeasureSum, MeasureSummary,
};
pub use error::{LedgerError, Result};
pub use inference::{ClassifierConfig, TypeClassifier};
pub use normalize::{ValueNormalizer, parse_amount, parse_date};
pub use schema::{
    CellValue, ClassificationResult, Column, DatasetInfo, QueryResult, RawColumn, RawValue, Row,
    RowSet, SemanticType,
};
pub use store::{Dataset, DatasetStore, StoreConfig};
