//! In-process progress store
//!
//! Not durable. Useful for dry runs and tests; `set_available(false)` makes
//! every call fail the way an unreachable database would.

use async_trait::async_trait;
use chrono::Utc;
use hourglass_common::types::{PartitionStatus, ProgressRecord};
use hourglass_common::{HourglassError, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

use super::ProgressStore;

pub struct MemoryProgressStore {
    records: Mutex<BTreeMap<String, ProgressRecord>>,
    available: AtomicBool,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Seed the store with existing records
    pub fn with_records(records: impl IntoIterator<Item = ProgressRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.partition_id.clone(), r))
            .collect();
        Self {
            records: Mutex::new(map),
            available: AtomicBool::new(true),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(HourglassError::store("in-memory store marked unavailable"))
        }
    }
}

impl Default for MemoryProgressStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn already_succeeded(&self) -> Result<HashSet<String>> {
        self.check_available()?;
        let records = self.records.lock().await;
        Ok(records
            .values()
            .filter(|r| r.status == PartitionStatus::Success)
            .map(|r| r.partition_id.clone())
            .collect())
    }

    async fn record(
        &self,
        partition_id: &str,
        rows_inserted: u64,
        status: PartitionStatus,
        error_message: Option<&str>,
    ) -> Result<ProgressRecord> {
        self.check_available()?;
        let record = ProgressRecord {
            partition_id: partition_id.to_string(),
            rows_inserted,
            processed_at: Utc::now(),
            status,
            error_message: error_message.map(str::to_string),
        };
        self.records
            .lock()
            .await
            .insert(partition_id.to_string(), record.clone());
        Ok(record)
    }

    async fn get(&self, partition_id: &str) -> Result<Option<ProgressRecord>> {
        self.check_available()?;
        Ok(self.records.lock().await.get(partition_id).cloned())
    }

    async fn records(&self) -> Result<Vec<ProgressRecord>> {
        self.check_available()?;
        Ok(self.records.lock().await.values().cloned().collect())
    }
}
