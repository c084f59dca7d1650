//! Load executor
//!
//! Applies one partition to the warehouse and reports how many rows it added.
//! The count comes from differencing the target table before and after the
//! load, never from the engine's own report, so it stays correct for engines
//! (like ClickHouse over HTTP) that do not return affected-row counts.

use async_trait::async_trait;
use hourglass_common::{HourglassError, Result};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::engine::{validate_identifier, QueryEngine, SqlTemplate};
use crate::partition::PartitionId;

/// Load statement used when no template file is configured
pub const DEFAULT_LOAD_TEMPLATE: &str = include_str!("../sql/load_partition.sql");

/// A single partition could not be loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to load {partition}: {cause}")]
pub struct LoadError {
    pub partition: String,
    pub cause: String,
}

impl LoadError {
    pub fn new(partition: &PartitionId, cause: impl ToString) -> Self {
        Self {
            partition: partition.to_string(),
            cause: cause.to_string(),
        }
    }
}

impl From<LoadError> for HourglassError {
    fn from(err: LoadError) -> Self {
        HourglassError::Load {
            partition: err.partition,
            cause: err.cause,
        }
    }
}

/// Loads one partition into the warehouse
#[async_trait]
pub trait PartitionLoader: Send + Sync {
    /// Returns the number of rows this load added to the target table
    async fn load(&self, partition: &PartitionId) -> std::result::Result<u64, LoadError>;
}

#[async_trait]
impl<T: PartitionLoader + ?Sized> PartitionLoader for Arc<T> {
    async fn load(&self, partition: &PartitionId) -> std::result::Result<u64, LoadError> {
        (**self).load(partition).await
    }
}

/// Runs a parameterized statement template against a [`QueryEngine`].
///
/// Assumes nothing else writes to the target table while a load is in
/// flight; the row delta would be wrong otherwise.
pub struct StatementLoader<E> {
    engine: E,
    template: SqlTemplate,
    base_url: String,
    target_table: String,
    keyword_table: String,
}

impl<E: QueryEngine> StatementLoader<E> {
    /// Build a loader using [`DEFAULT_LOAD_TEMPLATE`].
    ///
    /// Fails with `HourglassError::Config` if either table name is not a
    /// plain SQL identifier.
    pub fn new(
        engine: E,
        base_url: impl Into<String>,
        target_table: impl Into<String>,
        keyword_table: impl Into<String>,
    ) -> Result<Self> {
        let target_table = target_table.into();
        let keyword_table = keyword_table.into();

        for table in [&target_table, &keyword_table] {
            validate_identifier(table).map_err(|e| HourglassError::config(e.to_string()))?;
        }

        Ok(Self {
            engine,
            template: SqlTemplate::new(DEFAULT_LOAD_TEMPLATE),
            base_url: base_url.into(),
            target_table,
            keyword_table,
        })
    }

    pub fn with_template(mut self, template: SqlTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn target_table(&self) -> &str {
        &self.target_table
    }

    /// Rendered statements for `partition`, in execution order
    pub fn statements_for(&self, partition: &PartitionId) -> Vec<String> {
        self.template
            .render(&[
                ("base_url", self.base_url.as_str()),
                ("date_pattern", partition.as_str()),
                ("target_table", self.target_table.as_str()),
                ("keyword_table", self.keyword_table.as_str()),
            ])
            .statements()
    }
}

#[async_trait]
impl<E: QueryEngine> PartitionLoader for StatementLoader<E> {
    async fn load(&self, partition: &PartitionId) -> std::result::Result<u64, LoadError> {
        info!(partition = %partition, "Loading partition");

        let before = self
            .engine
            .row_count(&self.target_table)
            .await
            .map_err(|e| LoadError::new(partition, e))?;

        let statements = self.statements_for(partition);
        debug!(partition = %partition, statements = statements.len(), "Executing load script");
        self.engine
            .execute_script(&statements)
            .await
            .map_err(|e| LoadError::new(partition, e))?;

        let after = self
            .engine
            .row_count(&self.target_table)
            .await
            .map_err(|e| LoadError::new(partition, e))?;

        let rows = after.checked_sub(before).ok_or_else(|| {
            LoadError::new(
                partition,
                format!(
                    "row count of {} dropped from {} to {} during load",
                    self.target_table, before, after
                ),
            )
        })?;

        info!(partition = %partition, rows, "Partition loaded");
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, QueryOutput};
    use crate::partition::{enumerate_partitions, PartitionRange};
    use std::sync::Mutex;

    /// Fake warehouse holding a single row counter
    struct CountingEngine {
        rows: Mutex<u64>,
        rows_per_insert: u64,
        drop_rows: bool,
        fail_insert: bool,
        executed: Mutex<Vec<String>>,
    }

    impl CountingEngine {
        fn new(start: u64, rows_per_insert: u64) -> Self {
            Self {
                rows: Mutex::new(start),
                rows_per_insert,
                drop_rows: false,
                fail_insert: false,
                executed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl QueryEngine for CountingEngine {
        async fn execute(&self, statement: &str) -> std::result::Result<QueryOutput, EngineError> {
            self.executed.lock().unwrap().push(statement.to_string());
            let mut rows = self.rows.lock().unwrap();
            if statement.starts_with("SELECT count()") {
                return Ok(QueryOutput::new(format!("{}\n", rows)));
            }
            if self.fail_insert {
                return Err(EngineError::Status {
                    status: 404,
                    body: "Code: 86. Received error from remote server".to_string(),
                });
            }
            if self.drop_rows {
                *rows = 0;
            } else {
                *rows += self.rows_per_insert;
            }
            Ok(QueryOutput::default())
        }
    }

    fn first_partition() -> PartitionId {
        enumerate_partitions(&PartitionRange::new(2025, 1, vec![1], vec![0]))
            .unwrap()
            .remove(0)
    }

    fn loader(engine: CountingEngine) -> StatementLoader<CountingEngine> {
        StatementLoader::new(
            engine,
            "https://dumps.example.org/pageviews/",
            "wikistat_data_engineering",
            "data_engineering_keywords",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_rows_are_count_delta() {
        let loader = loader(CountingEngine::new(100, 42));
        let rows = loader.load(&first_partition()).await.unwrap();
        assert_eq!(rows, 42);
    }

    #[tokio::test]
    async fn test_default_template_is_rendered() {
        let loader = loader(CountingEngine::new(0, 1));
        loader.load(&first_partition()).await.unwrap();

        let executed = loader.engine().executed.lock().unwrap();
        assert_eq!(executed.len(), 3);
        assert_eq!(executed[0], "SELECT count() FROM wikistat_data_engineering");
        assert!(executed[1].contains("INSERT INTO wikistat_data_engineering"));
        assert!(executed[1].contains(
            "url('https://dumps.example.org/pageviews/2025/2025-01/pageviews-20250101-000000.gz', LineAsString)"
        ));
        assert!(executed[1].contains("FROM data_engineering_keywords"));
        assert!(!executed[1].contains("{target_table}"));
    }

    #[tokio::test]
    async fn test_multi_statement_template() {
        let loader = loader(CountingEngine::new(0, 5)).with_template(SqlTemplate::new(
            "INSERT INTO {target_table} SELECT 1; INSERT INTO {target_table} SELECT '{date_pattern}';",
        ));
        let rows = loader.load(&first_partition()).await.unwrap();
        assert_eq!(rows, 10);
    }

    #[tokio::test]
    async fn test_engine_failure_is_load_error() {
        let mut engine = CountingEngine::new(0, 1);
        engine.fail_insert = true;
        let partition = first_partition();

        let err = loader(engine).load(&partition).await.unwrap_err();
        assert_eq!(err.partition, partition.as_str());
        assert!(err.cause.contains("404"));
    }

    #[tokio::test]
    async fn test_shrinking_table_is_load_error() {
        let mut engine = CountingEngine::new(50, 1);
        engine.drop_rows = true;

        let err = loader(engine).load(&first_partition()).await.unwrap_err();
        assert!(err.cause.contains("dropped from 50 to 0"));
    }

    #[test]
    fn test_invalid_table_rejected() {
        let result = StatementLoader::new(
            CountingEngine::new(0, 0),
            "https://dumps.example.org/",
            "pageviews; DROP TABLE x",
            "keywords",
        );
        assert!(matches!(result, Err(HourglassError::Config(_))));
    }

    #[test]
    fn test_load_error_converts() {
        let err: HourglassError = LoadError::new(&first_partition(), "timeout").into();
        assert!(!err.is_fatal());
        assert!(matches!(err, HourglassError::Load { .. }));
    }
}
