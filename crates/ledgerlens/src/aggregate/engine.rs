//! Group-by aggregation over dataset snapshots.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, warn};

use crate::error::Result;
use crate::schema::{CellValue, Column, SemanticType};
use crate::store::Dataset;

use super::result::{AggregateResult, AggregateRow, MeasureSum, MeasureSummary};

/// How measure values are summed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccumulationMode {
    /// Sum in exact decimal; only the mean is computed in floating point.
    #[default]
    ExactDecimal,
    /// Widen every value to `f64` before summing.
    Float,
}

/// Configuration for the aggregation engine.
#[derive(Debug, Clone, Default)]
pub struct AggregationConfig {
    pub accumulation: AccumulationMode,
}

/// Computes `sum`, `mean` and `count` of numeric measures per group.
#[derive(Debug, Clone, Default)]
pub struct AggregationEngine {
    config: AggregationConfig,
}

impl AggregationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AggregationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AggregationConfig {
        &self.config
    }

    /// Group `dataset` by `group_by` and summarize each numeric measure.
    ///
    /// Every unknown group or measure column is reported at once. Measures
    /// that are not `Number` columns are dropped; with none left the result
    /// is empty. Rows with a null in any group column are left out.
    pub fn aggregate(
        &self,
        dataset: &Dataset,
        group_by: &[&str],
        measures: &[&str],
    ) -> Result<AggregateResult> {
        dataset.require_columns(group_by.iter().chain(measures).copied())?;

        let keys: Vec<&Column> = group_by.iter().filter_map(|name| dataset.column(name)).collect();
        let mut numeric: Vec<&Column> = Vec::new();
        for name in measures {
            let Some(column) = dataset.column(name) else {
                continue;
            };
            if column.semantic_type != SemanticType::Number {
                debug!(
                    dataset = dataset.name(),
                    column = %column.name,
                    semantic_type = %column.semantic_type,
                    "Dropping non-numeric measure"
                );
            } else if !numeric.iter().any(|c| c.name == column.name) {
                numeric.push(column);
            }
        }

        let group_by: Vec<String> = group_by.iter().map(|s| s.to_string()).collect();
        if numeric.is_empty() {
            return Ok(AggregateResult {
                group_by,
                ..AggregateResult::default()
            });
        }

        let mut groups: IndexMap<Vec<CellValue>, Vec<Accumulator>> = IndexMap::new();
        'rows: for row in 0..dataset.row_count() {
            let mut key = Vec::with_capacity(keys.len());
            for column in &keys {
                match column.get(row) {
                    Some(cell) if !cell.is_null() => key.push(cell.clone()),
                    _ => continue 'rows,
                }
            }

            let accumulators = groups
                .entry(key)
                .or_insert_with(|| vec![Accumulator::new(self.config.accumulation); numeric.len()]);
            for (acc, column) in accumulators.iter_mut().zip(&numeric) {
                if let Some(value) = column.get(row).and_then(CellValue::as_amount) {
                    acc.add(value);
                }
            }
        }

        let measure_names: Vec<String> = numeric.iter().map(|c| c.name.clone()).collect();
        let rows = groups
            .into_iter()
            .map(|(key, accumulators)| AggregateRow {
                key,
                measures: measure_names
                    .iter()
                    .cloned()
                    .zip(accumulators.into_iter().map(Accumulator::finish))
                    .collect(),
            })
            .collect();

        Ok(AggregateResult {
            group_by,
            measures: measure_names,
            rows,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum Total {
    Exact(Decimal),
    Float(f64),
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    total: Total,
    count: usize,
}

impl Accumulator {
    fn new(mode: AccumulationMode) -> Self {
        let total = match mode {
            AccumulationMode::ExactDecimal => Total::Exact(Decimal::ZERO),
            AccumulationMode::Float => Total::Float(0.0),
        };
        Self { total, count: 0 }
    }

    fn add(&mut self, value: Decimal) {
        self.count += 1;
        self.total = match self.total {
            Total::Exact(sum) => match sum.checked_add(value) {
                Some(next) => Total::Exact(next),
                None => {
                    warn!(%sum, %value, "Decimal sum overflowed; continuing in floating point");
                    Total::Float(to_f64(sum) + to_f64(value))
                }
            },
            Total::Float(sum) => Total::Float(sum + to_f64(value)),
        };
    }

    fn finish(self) -> MeasureSummary {
        let sum = match self.total {
            Total::Exact(d) => MeasureSum::Exact(d),
            Total::Float(f) => MeasureSum::Float(f),
        };
        let mean = (self.count > 0).then(|| sum.to_f64() / self.count as f64);
        MeasureSummary {
            sum,
            mean,
            count: self.count,
        }
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(f64::NAN)
}
