//! The dataset store: registration, indexed lookups, the relational mirror and
//! aggregation behind one handle.

mod dataset;
mod index;
mod mirror;

pub use dataset::Dataset;
pub use index::{CategoryIndex, ColumnIndex, DateIndex, SortedNumericIndex};
pub use mirror::{column_identifiers, sanitize_identifier, table_name};

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::{info, warn};

use crate::aggregate::{AggregateResult, AggregationConfig, AggregationEngine};
use crate::error::{LedgerError, Result};
use crate::inference::{ClassifierConfig, TypeClassifier};
use crate::schema::{CellValue, DatasetInfo, QueryResult, RawColumn, RowSet};

use mirror::Mirror;

/// Configuration for a [`DatasetStore`].
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Column classification settings.
    pub classifier: ClassifierConfig,
    /// Aggregation settings.
    pub aggregation: AggregationConfig,
    /// Upper bound on ad-hoc query execution (None = unbounded).
    pub query_timeout: Option<Duration>,
    /// Classify and normalize columns on the rayon pool.
    pub parallel_columns: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            classifier: ClassifierConfig::default(),
            aggregation: AggregationConfig::default(),
            query_timeout: Some(Duration::from_secs(5)),
            parallel_columns: true,
        }
    }
}

/// Registry of immutable dataset snapshots plus their SQLite mirror.
///
/// Registration builds a complete snapshot before publishing it, so readers
/// see either the old dataset or the new one. Snapshots are handed out as
/// `Arc`s and stay valid after a replacement or after [`close`](Self::close).
pub struct DatasetStore {
    config: StoreConfig,
    classifier: TypeClassifier,
    aggregator: AggregationEngine,
    datasets: RwLock<HashMap<String, Arc<Dataset>>>,
    mirror: Mutex<Option<Mirror>>,
}

impl DatasetStore {
    /// Create a store with default settings.
    pub fn new() -> Result<Self> {
        Self::with_config(StoreConfig::default())
    }

    /// Create a store with custom configuration. Opens the SQLite connection.
    pub fn with_config(config: StoreConfig) -> Result<Self> {
        let mirror = Mirror::open()?;
        Ok(Self {
            classifier: TypeClassifier::with_config(config.classifier.clone()),
            aggregator: AggregationEngine::with_config(config.aggregation.clone()),
            config,
            datasets: RwLock::new(HashMap::new()),
            mirror: Mutex::new(Some(mirror)),
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Classify, normalize, index and mirror `columns` under `name`,
    /// replacing any dataset already registered with that name.
    pub fn register(&self, name: &str, columns: Vec<RawColumn>) -> Result<()> {
        if self.is_closed() {
            return Err(LedgerError::StoreClosed);
        }

        let table = table_name(name);
        let dataset = Dataset::build(
            name,
            &table,
            columns,
            &self.classifier,
            self.config.parallel_columns,
        )?;

        let mut mirror = lock(&self.mirror);
        let mirror = mirror.as_mut().ok_or(LedgerError::StoreClosed)?;
        mirror.replace(&dataset)?;

        info!(
            dataset = name,
            table = %table,
            rows = dataset.row_count(),
            columns = dataset.columns().count(),
            "Registered dataset"
        );
        write(&self.datasets).insert(name.to_string(), Arc::new(dataset));
        Ok(())
    }

    /// Rows matching every `column = value` filter, ascending by row id.
    pub fn filter_equals<K, V>(
        &self,
        name: &str,
        filters: impl IntoIterator<Item = (K, V)>,
    ) -> Result<RowSet>
    where
        K: Into<String>,
        V: Into<CellValue>,
    {
        let filters: Vec<(String, CellValue)> = filters
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.dataset(name)?.filter_equals(&filters)
    }

    /// Rows whose `column` value lies in `[low, high]`, ascending by row id.
    pub fn range_query(
        &self,
        name: &str,
        column: &str,
        low: impl Into<CellValue>,
        high: impl Into<CellValue>,
    ) -> Result<RowSet> {
        self.dataset(name)?
            .range_query(column, &low.into(), &high.into())
    }

    /// Run a read-only SQL query against the mirror.
    ///
    /// Failures are logged and reported as an empty result. Use
    /// [`try_run_query`](Self::try_run_query) to tell them apart from "no rows".
    pub fn run_query(&self, sql: &str) -> QueryResult {
        match self.try_run_query(sql) {
            Ok(result) => result,
            Err(err) => {
                warn!(error = %err, "Ad-hoc query failed; returning empty result");
                QueryResult::default()
            }
        }
    }

    /// Run a read-only SQL query against the mirror, surfacing failures.
    pub fn try_run_query(&self, sql: &str) -> Result<QueryResult> {
        let mirror = lock(&self.mirror);
        let mirror = mirror.as_ref().ok_or(LedgerError::StoreClosed)?;
        mirror.query(sql, self.config.query_timeout)
    }

    /// Group `name` by `group_by` and summarize each numeric measure.
    pub fn aggregate(
        &self,
        name: &str,
        group_by: &[&str],
        measures: &[&str],
    ) -> Result<AggregateResult> {
        let dataset = self.dataset(name)?;
        self.aggregator.aggregate(&dataset, group_by, measures)
    }

    /// Metadata for a registered dataset.
    pub fn describe(&self, name: &str) -> Result<DatasetInfo> {
        Ok(self.dataset(name)?.info())
    }

    /// Materialize specific rows; ids past the end are skipped.
    pub fn rows(&self, name: &str, ids: &[usize]) -> Result<RowSet> {
        Ok(self.dataset(name)?.rows(ids))
    }

    /// The current snapshot registered under `name`.
    pub fn dataset(&self, name: &str) -> Result<Arc<Dataset>> {
        read(&self.datasets)
            .get(name)
            .cloned()
            .ok_or_else(|| LedgerError::not_found(name))
    }

    /// Registered dataset names, sorted.
    pub fn dataset_names(&self) -> Vec<String> {
        let mut names: Vec<String> = read(&self.datasets).keys().cloned().collect();
        names.sort();
        names
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.mirror).is_none()
    }

    /// Release the SQLite connection. Later calls do nothing.
    pub fn close(&self) {
        let Some(mirror) = lock(&self.mirror).take() else {
            return;
        };
        match mirror.close() {
            Ok(()) => info!("Closed dataset store"),
            Err(err) => warn!(error = %err, "Error while closing the SQLite connection"),
        }
    }
}

impl Drop for DatasetStore {
    fn drop(&mut self) {
        self.close();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
