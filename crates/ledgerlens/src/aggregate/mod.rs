//! Grouped aggregation of numeric measures.

mod engine;
mod result;

pub use engine::{AccumulationMode, AggregationConfig, AggregationEngine};
pub use result::{AggregateResult, AggregateRow, MeasureSum, MeasureSummary};
