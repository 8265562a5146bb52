//! Integration tests for Ledgerlens.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;

use ledgerlens::{
    AccumulationMode, AggregationConfig, CellValue, DatasetStore, LedgerError, MeasureSum,
    RawColumn, RawValue, SemanticType, StoreConfig, TypeClassifier, parse_amount, parse_date,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// The three-row ledger used throughout.
fn ledger() -> Vec<RawColumn> {
    vec![
        RawColumn::new("Date", ["2023-01-15", "2023-02-20", "2023-01-15"]),
        RawColumn::new("Category", ["Revenue", "Expense", "Revenue"]),
        RawColumn::new("Amount", ["1234.56", "(2,500.00)", "$999.99"]),
    ]
}

fn store_with_ledger() -> DatasetStore {
    let store = DatasetStore::new().expect("Failed to open store");
    store.register("ledger", ledger()).expect("Registration failed");
    store
}

// =============================================================================
// Classification & Normalization
// =============================================================================

#[test]
fn test_classification_threshold() {
    let mut values: Vec<RawValue> = (1..=8)
        .map(|d| RawValue::from(format!("2023-03-{d:02}")))
        .collect();
    values.push(RawValue::from("n/a"));
    values.push(RawValue::from("see notes"));

    let result = TypeClassifier::new().classify(&values);
    assert_eq!(result.semantic_type, SemanticType::Date);
    assert_eq!(result.confidence, 0.8);
}

#[test]
fn test_parse_date_examples() {
    assert_eq!(parse_date(&RawValue::from("2023-12-31")), Some(date(2023, 12, 31)));
    assert_eq!(parse_date(&RawValue::Integer(44927)), Some(date(2023, 1, 1)));
    assert_eq!(parse_date(&RawValue::Null), None);
}

#[test]
fn test_parse_amount_examples() {
    assert_eq!(parse_amount(&RawValue::from("$1,234.56")), Some(dec("1234.56")));
    assert_eq!(parse_amount(&RawValue::from("(2,500.00)")), Some(dec("-2500.00")));
    assert_eq!(parse_amount(&RawValue::from("1.5M")), Some(dec("1500000")));
    assert_eq!(parse_amount(&RawValue::from("1.234,56")), Some(dec("1234.56")));
    assert_eq!(parse_amount(&RawValue::Null), None);
}

// =============================================================================
// Registration
// =============================================================================

#[test]
fn test_partial_failure_tolerance() {
    let mut values: Vec<String> = (1..=9).map(|d| format!("2024-05-{d:02}")).collect();
    values.insert(4, "not a date".to_string());

    let store = DatasetStore::new().unwrap();
    store
        .register("dates", vec![RawColumn::new("Posted", values)])
        .expect("Garbage cells must not abort registration");

    let info = store.describe("dates").unwrap();
    assert_eq!(info.row_count, 10);
    assert_eq!(info.column_types["Posted"], SemanticType::Date);
    assert_eq!(info.unparseable_counts["Posted"], 1);

    let rows = store.rows("dates", &[4]).unwrap();
    assert_eq!(rows.value(0, "Posted"), Some(&CellValue::Null));
}

#[test]
fn test_registration_is_idempotent() {
    let store = store_with_ledger();
    let first_info = store.describe("ledger").unwrap();
    let first_rows = store.filter_equals("ledger", [("Category", "Revenue")]).unwrap();
    let first_query = store.run_query("SELECT * FROM ledger ORDER BY Date, Amount");

    store.register("ledger", ledger()).unwrap();

    assert_eq!(store.describe("ledger").unwrap(), first_info);
    assert_eq!(
        store.filter_equals("ledger", [("Category", "Revenue")]).unwrap(),
        first_rows
    );
    assert_eq!(
        store.run_query("SELECT * FROM ledger ORDER BY Date, Amount"),
        first_query
    );
    assert_eq!(first_query.len(), 3);
}

#[test]
fn test_describe_reports_indexes_and_classifications() {
    let store = store_with_ledger();
    let info = store.describe("ledger").unwrap();

    assert_eq!(info.column_names, vec!["Date", "Category", "Amount"]);
    assert_eq!(info.indexed_columns, vec!["Date", "Category", "Amount"]);
    assert_eq!(info.classifications["Date"].format_hint.as_deref(), Some("YYYY-MM-DD"));
    assert_eq!(info.classifications["Amount"].semantic_type, SemanticType::Number);

    let json = serde_json::to_value(&info).unwrap();
    assert_eq!(json["column_types"]["Amount"], Value::from("number"));
}

#[test]
fn test_type_override() {
    let store = DatasetStore::new().unwrap();
    store
        .register(
            "codes",
            vec![RawColumn::new("Account", [4000_i64, 4010, 5000]).with_type(SemanticType::Text)],
        )
        .unwrap();

    let rows = store.filter_equals("codes", [("Account", "4010")]).unwrap();
    assert_eq!(rows.ids(), vec![1]);
}

// =============================================================================
// Lookups
// =============================================================================

#[test]
fn test_filter_intersection() {
    let store = store_with_ledger();
    let rows = store
        .filter_equals("ledger", [("Date", "2023-01-15"), ("Category", "Revenue")])
        .unwrap();
    assert_eq!(rows.ids(), vec![0, 2]);
    assert_eq!(
        rows.value(1, "Amount"),
        Some(&CellValue::Amount(dec("999.99")))
    );
}

#[test]
fn test_filter_with_typed_values() {
    let store = store_with_ledger();
    let rows = store
        .filter_equals(
            "ledger",
            [
                ("Date", CellValue::Date(date(2023, 2, 20))),
                ("Amount", CellValue::Amount(dec("-2500"))),
            ],
        )
        .unwrap();
    assert_eq!(rows.ids(), vec![1]);
}

#[test]
fn test_filter_unknown_dataset_and_column() {
    let store = store_with_ledger();
    assert!(matches!(
        store.filter_equals("missing", [("Category", "Revenue")]),
        Err(LedgerError::DatasetNotFound { .. })
    ));
    assert!(matches!(
        store.filter_equals("ledger", [("Region", "EU")]),
        Err(LedgerError::MissingColumn { .. })
    ));
}

#[test]
fn test_range_query() {
    let store = store_with_ledger();

    let rows = store
        .range_query("ledger", "Amount", "-3000", "1000")
        .unwrap();
    assert_eq!(rows.ids(), vec![1, 2]);

    let rows = store
        .range_query("ledger", "Date", date(2023, 1, 15), date(2023, 1, 15))
        .unwrap();
    assert_eq!(rows.ids(), vec![0, 2]);

    let rows = store
        .range_query("ledger", "Amount", "1000", "-1000")
        .unwrap();
    assert!(rows.is_empty());

    assert!(matches!(
        store.range_query("ledger", "Category", "A", "Z"),
        Err(LedgerError::UnindexedColumn { .. })
    ));
}

// =============================================================================
// Aggregation
// =============================================================================

#[test]
fn test_aggregation_by_category() {
    let store = store_with_ledger();
    let result = store.aggregate("ledger", &["Category"], &["Amount"]).unwrap();

    assert_eq!(
        result.columns(),
        vec!["Category", "Amount_sum", "Amount_mean", "Amount_count"]
    );

    let revenue = &result.group(&[CellValue::from("Revenue")]).unwrap().measures["Amount"];
    assert_eq!(revenue.sum, MeasureSum::Exact(dec("2234.55")));
    assert_eq!(revenue.count, 2);
    assert_eq!(revenue.mean, Some(1117.275));

    let expense = &result.group(&[CellValue::from("Expense")]).unwrap().measures["Amount"];
    assert_eq!(expense.sum, MeasureSum::Exact(dec("-2500.00")));
    assert_eq!(expense.count, 1);
    assert_eq!(expense.mean, Some(-2500.0));
}

#[test]
fn test_aggregation_missing_measure() {
    let store = store_with_ledger();
    let err = store
        .aggregate("ledger", &["Category"], &["Amount", "Budget"])
        .unwrap_err();
    match err {
        LedgerError::MissingColumn { columns, .. } => assert_eq!(columns, vec!["Budget"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_float_accumulation_loses_precision() {
    let config = StoreConfig {
        aggregation: AggregationConfig {
            accumulation: AccumulationMode::Float,
        },
        ..StoreConfig::default()
    };
    let fees = || vec![RawColumn::new("Desk", ["FX"; 10]), RawColumn::new("Fee", ["0.10"; 10])];

    let exact = DatasetStore::new().unwrap();
    exact.register("fees", fees()).unwrap();
    let exact_sum = exact.aggregate("fees", &["Desk"], &["Fee"]).unwrap().rows[0].measures["Fee"]
        .sum;
    assert_eq!(exact_sum.as_decimal(), Some(dec("1.00")));

    let float = DatasetStore::with_config(config).unwrap();
    float.register("fees", fees()).unwrap();
    let float_sum = float.aggregate("fees", &["Desk"], &["Fee"]).unwrap().rows[0].measures["Fee"]
        .sum;
    assert_ne!(float_sum.to_f64(), 1.0);
}

// =============================================================================
// Ad-hoc Queries & Lifecycle
// =============================================================================

#[test]
fn test_run_query_against_mirror() {
    let store = store_with_ledger();
    let result = store.run_query(
        "SELECT Category, COUNT(*) AS n FROM ledger GROUP BY Category ORDER BY Category",
    );
    assert_eq!(result.columns, vec!["Category", "n"]);
    assert_eq!(result.rows[0], vec![Value::from("Expense"), Value::from(1)]);
    assert_eq!(result.rows[1], vec![Value::from("Revenue"), Value::from(2)]);

    let amounts = store.run_query("SELECT Amount FROM ledger WHERE Category = 'Expense'");
    assert_eq!(amounts.value(0, "Amount"), Some(&Value::from("-2500.00")));
}

#[test]
fn test_query_failure_is_distinguishable() {
    let store = store_with_ledger();
    assert!(store.run_query("SELECT nope FROM ledger").is_empty());
    assert!(matches!(
        store.try_run_query("SELECT nope FROM ledger"),
        Err(LedgerError::BackendQuery { .. })
    ));
    assert!(store
        .try_run_query("SELECT * FROM ledger WHERE 1 = 0")
        .unwrap()
        .is_empty());
}

#[test]
fn test_transaction_statements_do_not_block_registration() {
    let store = store_with_ledger();
    for sql in ["BEGIN", "SAVEPOINT s1", "BEGIN EXCLUSIVE"] {
        assert!(matches!(
            store.try_run_query(sql),
            Err(LedgerError::BackendQuery { .. })
        ));
        assert!(store.run_query(sql).is_empty());
    }

    store.register("ledger", ledger()).expect("Re-registration failed");
    store.register("other", ledger()).expect("Registration failed");
    assert_eq!(store.run_query("SELECT * FROM other").len(), 3);
}

#[test]
fn test_query_timeout() {
    let config = StoreConfig {
        query_timeout: Some(Duration::from_millis(20)),
        ..StoreConfig::default()
    };
    let store = DatasetStore::with_config(config).unwrap();
    let sql = "WITH RECURSIVE n(i) AS (SELECT 1 UNION ALL SELECT i + 1 FROM n) \
               SELECT MAX(i) FROM n";
    let err = store.try_run_query(sql).unwrap_err();
    assert!(err.to_string().contains("timeout"));
}

#[test]
fn test_close_releases_backend() {
    let store = store_with_ledger();
    store.close();
    store.close();

    assert!(store.is_closed());
    assert!(store.run_query("SELECT * FROM ledger").is_empty());
    assert!(matches!(
        store.register("ledger", ledger()),
        Err(LedgerError::StoreClosed)
    ));
    assert_eq!(store.filter_equals("ledger", [("Category", "Expense")]).unwrap().ids(), vec![1]);
}
