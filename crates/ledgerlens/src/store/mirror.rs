//! Relational mirror of registered datasets in an in-memory SQLite database.
//!
//! Every dataset is copied into one table whose identifiers are reduced to
//! ASCII alphanumerics and underscores. All columns are `TEXT`: amounts keep
//! their exact decimal string and dates are ISO-8601, so nothing is widened
//! to floating point on the way in. Ad-hoc queries are limited to read-only
//! statements.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use rusqlite::types::ValueRef;
use rusqlite::{Connection, ErrorCode, params_from_iter};
use serde_json::Value;

use crate::error::{LedgerError, Result};
use crate::schema::QueryResult;

use super::dataset::Dataset;

/// SQLite VM instructions between timeout checks.
const PROGRESS_INTERVAL: i32 = 1000;

/// Reduce a name to ASCII alphanumerics and `_`, trimming outer underscores.
pub fn sanitize_identifier(raw: &str, fallback: &str) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    let trimmed = cleaned.trim_matches('_');
    if trimmed.is_empty() {
        fallback.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Mirror table name for a dataset.
pub fn table_name(dataset: &str) -> String {
    sanitize_identifier(dataset, "dataset")
}

/// Mirror column identifiers, unique under SQLite's case-insensitive matching.
pub fn column_identifiers<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    names
        .into_iter()
        .enumerate()
        .map(|(i, name)| {
            let base = sanitize_identifier(name, &format!("column_{}", i + 1));
            let mut candidate = base.clone();
            let mut n = 2;
            while !taken.insert(candidate.to_ascii_lowercase()) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            candidate
        })
        .collect()
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Owns the SQLite connection and the table → dataset ownership map.
pub struct Mirror {
    conn: Connection,
    owners: HashMap<String, String>,
}

impl Mirror {
    pub fn open() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            owners: HashMap::new(),
        })
    }

    /// Replace the dataset's table in a single transaction.
    pub fn replace(&mut self, dataset: &Dataset) -> Result<()> {
        let table = dataset.table_name();
        let key = table.to_ascii_lowercase();
        if let Some(owner) = self.owners.get(&key) {
            if owner != dataset.name() {
                return Err(LedgerError::MirrorNameConflict {
                    dataset: dataset.name().to_string(),
                    table: table.to_string(),
                    owner: owner.clone(),
                });
            }
        }

        let columns: Vec<_> = dataset.columns().collect();
        let identifiers = column_identifiers(columns.iter().map(|c| c.name.as_str()));

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote(table)))?;

        if !columns.is_empty() {
            let definitions: Vec<String> = identifiers
                .iter()
                .map(|id| format!("{} TEXT", quote(id)))
                .collect();
            tx.execute_batch(&format!(
                "CREATE TABLE {} ({})",
                quote(table),
                definitions.join(", ")
            ))?;

            let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
            let quoted: Vec<String> = identifiers.iter().map(|id| quote(id)).collect();
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote(table),
                quoted.join(", "),
                placeholders.join(", ")
            ))?;
            for row in 0..dataset.row_count() {
                insert.execute(params_from_iter(
                    columns
                        .iter()
                        .map(|c| c.get(row).and_then(|cell| cell.to_mirror_text())),
                ))?;
            }
        }

        tx.commit()?;
        self.owners.insert(key, dataset.name().to_string());
        Ok(())
    }

    /// Run one read-only statement, optionally bounded by a timeout.
    pub fn query(&self, sql: &str, timeout: Option<Duration>) -> Result<QueryResult> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(LedgerError::BackendQuery {
                message: "empty query".to_string(),
            });
        }

        let fail = |err: rusqlite::Error| query_failed(err, timeout);
        let mut stmt = self.conn.prepare(sql).map_err(fail)?;
        // BEGIN, SAVEPOINT and friends report read-only but return no columns.
        if !stmt.readonly() || stmt.column_count() == 0 {
            return Err(LedgerError::BackendQuery {
                message: "only read-only queries are allowed".to_string(),
            });
        }

        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let _guard = timeout.and_then(|t| ProgressGuard::install(&self.conn, t));

        let mut rows = stmt.query([]).map_err(fail)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(fail)? {
            let mut values = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                values.push(json_value(row.get_ref(i).map_err(fail)?));
            }
            out.push(values);
        }
        drop(rows);

        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK")?;
            return Err(LedgerError::BackendQuery {
                message: "queries may not open transactions".to_string(),
            });
        }

        Ok(QueryResult { columns, rows: out })
    }

    /// Release the connection, surfacing SQLite's close error.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| LedgerError::Backend(err))
    }
}

/// Interrupts the running statement once the deadline passes; removes the
/// handler when dropped.
struct ProgressGuard<'c> {
    conn: &'c Connection,
}

impl<'c> ProgressGuard<'c> {
    fn install(conn: &'c Connection, timeout: Duration) -> Option<Self> {
        let deadline = Instant::now().checked_add(timeout)?;
        conn.progress_handler(PROGRESS_INTERVAL, Some(move || Instant::now() >= deadline));
        Some(Self { conn })
    }
}

impl Drop for ProgressGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

fn query_failed(err: rusqlite::Error, timeout: Option<Duration>) -> LedgerError {
    let message = match (err.sqlite_error_code(), timeout) {
        (Some(ErrorCode::OperationInterrupted), Some(t)) => {
            format!("query exceeded timeout of {} ms", t.as_millis())
        }
        _ => err.to_string(),
    };
    LedgerError::BackendQuery { message }
}

fn json_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::Array(bytes.iter().map(|b| Value::from(*b)).collect()),
    }
}
