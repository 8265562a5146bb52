//! Fuzz target for column classification.
//!
//! Builds a column from structured fuzz input and checks that the classifier
//! never panics and always reports a confidence in [0, 1].

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use ledgerlens::{RawValue, TypeClassifier};

#[derive(Debug, Arbitrary)]
enum FuzzCell {
    Text(String),
    Integer(i64),
    Float(f64),
    Null,
}

impl From<FuzzCell> for RawValue {
    fn from(cell: FuzzCell) -> Self {
        match cell {
            FuzzCell::Text(s) => RawValue::Text(s),
            FuzzCell::Integer(i) => RawValue::Integer(i),
            FuzzCell::Float(f) => RawValue::Float(f),
            FuzzCell::Null => RawValue::Null,
        }
    }
}

fuzz_target!(|cells: Vec<FuzzCell>| {
    if cells.len() > 2_000 {
        return;
    }

    let values: Vec<RawValue> = cells.into_iter().map(RawValue::from).collect();
    let result = TypeClassifier::new().classify(&values);
    assert!((0.0..=1.0).contains(&result.confidence));
});
