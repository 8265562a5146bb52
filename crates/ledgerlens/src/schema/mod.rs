//! Schema types for raw input, normalized columns and query output.

mod column;
mod table;
mod types;

pub use column::{ClassificationResult, Column, RawColumn};
pub use table::{DatasetInfo, QueryResult, Row, RowSet};
pub use types::{CellValue, RawValue, SemanticType};

pub(crate) use types::canonical_float;
