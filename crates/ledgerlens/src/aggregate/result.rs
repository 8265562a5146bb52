//! Grouped aggregation output.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

use crate::schema::CellValue;

/// A measure total, exact unless float accumulation was requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MeasureSum {
    Exact(Decimal),
    Float(f64),
}

impl MeasureSum {
    pub fn to_f64(&self) -> f64 {
        match self {
            MeasureSum::Exact(d) => d.to_f64().unwrap_or(f64::NAN),
            MeasureSum::Float(f) => *f,
        }
    }

    /// The exact total; `None` for float sums.
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            MeasureSum::Exact(d) => Some(*d),
            MeasureSum::Float(_) => None,
        }
    }
}

/// `sum`, `mean` and `count` of one measure within one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasureSummary {
    pub sum: MeasureSum,
    /// Absent when the group has no non-null values.
    pub mean: Option<f64>,
    /// Non-null values in the group.
    pub count: usize,
}

/// One output row: the group key and a summary per measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateRow {
    /// Group-by values in `group_by` order.
    pub key: Vec<CellValue>,
    pub measures: IndexMap<String, MeasureSummary>,
}

/// Aggregation output, one row per distinct group key in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub group_by: Vec<String>,
    /// Measures that contributed (numeric columns only).
    pub measures: Vec<String>,
    pub rows: Vec<AggregateRow>,
}

impl AggregateResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Output column names: group-by columns, then `{measure}_sum`,
    /// `{measure}_mean`, `{measure}_count` per measure.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = self.group_by.clone();
        for measure in &self.measures {
            columns.push(format!("{measure}_sum"));
            columns.push(format!("{measure}_mean"));
            columns.push(format!("{measure}_count"));
        }
        columns
    }

    /// Row whose key equals `key`.
    pub fn group(&self, key: &[CellValue]) -> Option<&AggregateRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Flat records keyed by [`columns`](Self::columns).
    pub fn to_records(&self) -> Vec<IndexMap<String, serde_json::Value>> {
        self.rows
            .iter()
            .map(|row| {
                let mut record = IndexMap::new();
                for (name, value) in self.group_by.iter().zip(&row.key) {
                    let value = match value {
                        CellValue::Null => serde_json::Value::Null,
                        other => serde_json::Value::String(other.to_string()),
                    };
                    record.insert(name.clone(), value);
                }
                for (name, summary) in &row.measures {
                    let sum = match summary.sum {
                        MeasureSum::Exact(d) => serde_json::Value::String(d.to_string()),
                        MeasureSum::Float(f) => float_json(f),
                    };
                    record.insert(format!("{name}_sum"), sum);
                    record.insert(
                        format!("{name}_mean"),
                        summary.mean.map(float_json).unwrap_or(serde_json::Value::Null),
                    );
                    record.insert(format!("{name}_count"), serde_json::Value::from(summary.count));
                }
                record
            })
            .collect()
    }
}

fn float_json(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}
