//! SQLite-backed progress store
//!
//! Uses WAL with `synchronous = FULL`, so an upsert is on disk once
//! [`ProgressStore::record`] returns. A crash mid-run therefore leaves exactly
//! the completed partitions recorded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hourglass_common::types::{PartitionStatus, ProgressRecord};
use hourglass_common::{HourglassError, Result};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use std::collections::HashSet;
use std::str::FromStr;
use tracing::debug;

use super::ProgressStore;

/// Default location of the progress database
pub const DEFAULT_PROGRESS_DATABASE_URL: &str = "sqlite://hourglass_progress.db";

pub struct SqliteProgressStore {
    pool: SqlitePool,
}

impl SqliteProgressStore {
    /// Open (creating if needed) the database at `database_url`
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| HourglassError::store(format!("Invalid database URL '{}': {}", database_url, e)))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full);

        // One writer per run; a single connection keeps statements ordered
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| HourglassError::store(format!("Failed to open {}: {}", database_url, e)))?;

        Self::with_pool(pool).await
    }

    /// Open the database at `database_url` only if its file already exists.
    ///
    /// Read paths (`plan`, `status`) use this so inspecting a fresh setup
    /// does not leave an empty database behind.
    pub async fn open_existing(database_url: &str) -> Result<Option<Self>> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| HourglassError::store(format!("Invalid database URL '{}': {}", database_url, e)))?;

        if !options.get_filename().exists() {
            debug!(database_url, "Progress database does not exist yet");
            return Ok(None);
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.create_if_missing(false))
            .await
            .map_err(|e| HourglassError::store(format!("Failed to open {}: {}", database_url, e)))?;

        Self::with_pool(pool).await.map(Some)
    }

    /// Private in-memory database, gone when the store is dropped
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| HourglassError::store(e.to_string()))?;

        // The database lives as long as its connection, so never recycle it
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| HourglassError::store(format!("Failed to open in-memory database: {}", e)))?;

        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> Result<Self> {
        init_schema(&pool).await?;
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Create the `processed_partitions` table if it does not exist
async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS processed_partitions (
            partition_id  TEXT PRIMARY KEY,
            rows_inserted INTEGER NOT NULL,
            processed_at  TEXT NOT NULL,
            status        TEXT NOT NULL,
            error_message TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| HourglassError::store(format!("Failed to create progress table: {}", e)))?;

    Ok(())
}

// Helper struct for sqlx query_as
#[derive(Debug, sqlx::FromRow)]
struct ProgressRow {
    partition_id: String,
    rows_inserted: i64,
    processed_at: DateTime<Utc>,
    status: String,
    error_message: Option<String>,
}

impl TryFrom<ProgressRow> for ProgressRecord {
    type Error = HourglassError;

    fn try_from(row: ProgressRow) -> Result<Self> {
        let status = PartitionStatus::from_str(&row.status).map_err(|e| {
            HourglassError::store(format!("Corrupt record for {}: {}", row.partition_id, e))
        })?;
        let rows_inserted = u64::try_from(row.rows_inserted).map_err(|_| {
            HourglassError::store(format!(
                "Corrupt record for {}: negative row count {}",
                row.partition_id, row.rows_inserted
            ))
        })?;

        Ok(ProgressRecord {
            partition_id: row.partition_id,
            rows_inserted,
            processed_at: row.processed_at,
            status,
            error_message: row.error_message,
        })
    }
}

#[async_trait]
impl ProgressStore for SqliteProgressStore {
    async fn already_succeeded(&self) -> Result<HashSet<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT partition_id FROM processed_partitions WHERE status = ?1")
                .bind(PartitionStatus::Success.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| HourglassError::store(format!("Failed to read progress: {}", e)))?;

        Ok(ids.into_iter().collect())
    }

    async fn record(
        &self,
        partition_id: &str,
        rows_inserted: u64,
        status: PartitionStatus,
        error_message: Option<&str>,
    ) -> Result<ProgressRecord> {
        let record = ProgressRecord {
            partition_id: partition_id.to_string(),
            rows_inserted,
            processed_at: Utc::now(),
            status,
            error_message: error_message.map(str::to_string),
        };
        let rows = i64::try_from(rows_inserted).map_err(|_| {
            HourglassError::store(format!("Row count {} does not fit the progress table", rows_inserted))
        })?;

        sqlx::query(
            r#"
            INSERT INTO processed_partitions (partition_id, rows_inserted, processed_at, status, error_message)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(partition_id) DO UPDATE SET
                rows_inserted = excluded.rows_inserted,
                processed_at = excluded.processed_at,
                status = excluded.status,
                error_message = excluded.error_message
            "#,
        )
        .bind(&record.partition_id)
        .bind(rows)
        .bind(record.processed_at)
        .bind(record.status.as_str())
        .bind(record.error_message.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            HourglassError::store(format!("Failed to record {}: {}", partition_id, e))
        })?;

        debug!(partition = %partition_id, status = %status, rows = rows_inserted, "Progress recorded");
        Ok(record)
    }

    async fn get(&self, partition_id: &str) -> Result<Option<ProgressRecord>> {
        let row = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT partition_id, rows_inserted, processed_at, status, error_message
            FROM processed_partitions
            WHERE partition_id = ?1
            "#,
        )
        .bind(partition_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| HourglassError::store(format!("Failed to read {}: {}", partition_id, e)))?;

        row.map(ProgressRecord::try_from).transpose()
    }

    async fn records(&self) -> Result<Vec<ProgressRecord>> {
        let rows = sqlx::query_as::<_, ProgressRow>(
            r#"
            SELECT partition_id, rows_inserted, processed_at, status, error_message
            FROM processed_partitions
            ORDER BY partition_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| HourglassError::store(format!("Failed to list progress: {}", e)))?;

        rows.into_iter().map(ProgressRecord::try_from).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const P0: &str = "2025/2025-01/pageviews-20250101-000000.gz";
    const P1: &str = "2025/2025-01/pageviews-20250101-010000.gz";

    #[tokio::test]
    async fn test_empty_store() {
        let store = SqliteProgressStore::in_memory().await.unwrap();
        assert!(store.already_succeeded().await.unwrap().is_empty());
        assert!(store.records().await.unwrap().is_empty());
        assert!(store.get(P0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_only_successes_count_as_done() {
        let store = SqliteProgressStore::in_memory().await.unwrap();
        store.record(P0, 10, PartitionStatus::Success, None).await.unwrap();
        store
            .record(P1, 0, PartitionStatus::Failed, Some("404 Not Found"))
            .await
            .unwrap();

        let done = store.already_succeeded().await.unwrap();
        assert_eq!(done.len(), 1);
        assert!(done.contains(P0));

        let records = store.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].error_message.as_deref(), Some("404 Not Found"));
    }

    #[tokio::test]
    async fn test_upsert_replaces_failed_record() {
        let store = SqliteProgressStore::in_memory().await.unwrap();
        store
            .record(P0, 0, PartitionStatus::Failed, Some("timeout"))
            .await
            .unwrap();
        store.record(P0, 25, PartitionStatus::Success, None).await.unwrap();

        let records = store.records().await.unwrap();
        assert_eq!(records.len(), 1);

        let record = store.get(P0).await.unwrap().unwrap();
        assert_eq!(record.status, PartitionStatus::Success);
        assert_eq!(record.rows_inserted, 25);
        assert!(record.error_message.is_none());
    }

    #[tokio::test]
    async fn test_progress_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("progress.db").display());

        {
            let store = SqliteProgressStore::connect(&url).await.unwrap();
            store.record(P0, 7, PartitionStatus::Success, None).await.unwrap();
            store.close().await;
        }

        let store = SqliteProgressStore::connect(&url).await.unwrap();
        let record = store.get(P0).await.unwrap().unwrap();
        assert_eq!(record.rows_inserted, 7);
        assert!(store.already_succeeded().await.unwrap().contains(P0));
    }

    #[tokio::test]
    async fn test_open_existing_does_not_create_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.db");
        let url = format!("sqlite://{}", path.display());

        assert!(SqliteProgressStore::open_existing(&url).await.unwrap().is_none());
        assert!(!path.exists());

        {
            let store = SqliteProgressStore::connect(&url).await.unwrap();
            store
                .record(P1, 0, PartitionStatus::Failed, Some("timeout"))
                .await
                .unwrap();
            store.close().await;
        }

        let store = SqliteProgressStore::open_existing(&url).await.unwrap().unwrap();
        let records = store.records().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, PartitionStatus::Failed);
    }

    #[tokio::test]
    async fn test_unreachable_database_is_store_unavailable() {
        let err = SqliteProgressStore::connect("sqlite:///nonexistent-dir/sub/progress.db")
            .await
            .err()
            .unwrap();
        assert!(matches!(err, HourglassError::StoreUnavailable(_)));
    }
}
