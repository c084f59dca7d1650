//! Progress tracking
//!
//! The progress store is the only record of what has been loaded. The
//! coordinator reads it once per run to compute the work set and writes to it
//! after every load attempt.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryProgressStore;
pub use sqlite::SqliteProgressStore;

use async_trait::async_trait;
use hourglass_common::types::{PartitionStatus, ProgressRecord};
use hourglass_common::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Durable partition id -> last outcome mapping.
///
/// Every method fails with `HourglassError::StoreUnavailable` when the
/// backing storage cannot be used.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Ids whose latest record has status `success`, read from durable state
    async fn already_succeeded(&self) -> Result<HashSet<String>>;

    /// Insert or fully replace the record for `partition_id`.
    ///
    /// The write is committed before this returns. Returns the stored record.
    async fn record(
        &self,
        partition_id: &str,
        rows_inserted: u64,
        status: PartitionStatus,
        error_message: Option<&str>,
    ) -> Result<ProgressRecord>;

    async fn get(&self, partition_id: &str) -> Result<Option<ProgressRecord>>;

    /// All records ordered by partition id
    async fn records(&self) -> Result<Vec<ProgressRecord>>;
}

#[async_trait]
impl<T: ProgressStore + ?Sized> ProgressStore for Arc<T> {
    async fn already_succeeded(&self) -> Result<HashSet<String>> {
        (**self).already_succeeded().await
    }

    async fn record(
        &self,
        partition_id: &str,
        rows_inserted: u64,
        status: PartitionStatus,
        error_message: Option<&str>,
    ) -> Result<ProgressRecord> {
        (**self)
            .record(partition_id, rows_inserted, status, error_message)
            .await
    }

    async fn get(&self, partition_id: &str) -> Result<Option<ProgressRecord>> {
        (**self).get(partition_id).await
    }

    async fn records(&self) -> Result<Vec<ProgressRecord>> {
        (**self).records().await
    }
}
