//! Ingestion coordinator
//!
//! Drives one run: enumerate the configured partitions, drop the ones the
//! progress store already has as successful, load the rest one at a time and
//! record every outcome as soon as it is known.
//!
//! A partition that fails is recorded as `failed` and the run moves on. It is
//! picked up again by the next run, which is the only retry mechanism.

use chrono::Utc;
use hourglass_common::types::{PartitionOutcome, PartitionStatus, RunPlan, RunSummary};
use hourglass_common::Result;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::loader::PartitionLoader;
use crate::partition::{enumerate_partitions, PartitionId, PartitionRange};
use crate::progress::ProgressStore;

/// Batch-level state of a run, in the order they are entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Enumerating,
    Filtering,
    Draining,
    Reporting,
    Done,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Enumerating => "enumerating",
            RunPhase::Filtering => "filtering",
            RunPhase::Draining => "draining",
            RunPhase::Reporting => "reporting",
            RunPhase::Done => "done",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Runs incremental loads for one dataset.
///
/// At most one coordinator may run at a time against a given target table
/// and progress store. Row counts are taken by differencing the target table,
/// so a concurrent writer corrupts the accounting. Nothing here locks; the
/// deployment has to guarantee it.
pub struct IngestionCoordinator<S, L> {
    range: PartitionRange,
    store: S,
    loader: L,
}

impl<S: ProgressStore, L: PartitionLoader> IngestionCoordinator<S, L> {
    pub fn new(range: PartitionRange, store: S, loader: L) -> Self {
        Self {
            range,
            store,
            loader,
        }
    }

    pub fn range(&self) -> &PartitionRange {
        &self.range
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Compute what [`run`](Self::run) would attempt, without loading anything
    pub async fn plan(&self) -> Result<RunPlan> {
        let partitions = enumerate_partitions(&self.range)?;
        let work_set = self.pending(&partitions).await?;

        Ok(RunPlan {
            partitions_considered: partitions.len(),
            partitions_skipped: partitions.len() - work_set.len(),
            work_set: work_set.into_iter().map(|p| p.to_string()).collect(),
        })
    }

    /// Load every pending partition and summarize the run.
    ///
    /// Load failures are recorded and counted, never returned. Errors from
    /// enumeration or the progress store abort the run.
    pub async fn run(&self) -> Result<RunSummary> {
        self.run_with_id(Uuid::new_v4()).await
    }

    #[instrument(name = "ingest_run", skip_all, fields(run_id = %run_id))]
    async fn run_with_id(&self, run_id: Uuid) -> Result<RunSummary> {
        let started_at = Utc::now();

        enter(RunPhase::Enumerating);
        let partitions = enumerate_partitions(&self.range)?;

        enter(RunPhase::Filtering);
        let work_set = self.pending(&partitions).await?;
        let skipped = partitions.len() - work_set.len();
        info!(
            considered = partitions.len(),
            skipped,
            pending = work_set.len(),
            "Computed work set"
        );

        let mut outcomes = Vec::with_capacity(work_set.len());
        if work_set.is_empty() {
            info!("All partitions already loaded, nothing to do");
        } else {
            enter(RunPhase::Draining);
            for (index, partition) in work_set.iter().enumerate() {
                debug!(
                    partition = %partition,
                    position = index + 1,
                    total = work_set.len(),
                    "Attempting partition"
                );
                outcomes.push(self.attempt(partition).await?);
            }
        }

        enter(RunPhase::Reporting);
        let summary =
            RunSummary::from_outcomes(run_id, started_at, partitions.len(), skipped, outcomes);
        info!(
            attempted = summary.partitions_attempted,
            succeeded = summary.partitions_succeeded,
            failed = summary.partitions_failed,
            rows_inserted = summary.rows_inserted_total,
            "Run complete"
        );

        enter(RunPhase::Done);
        Ok(summary)
    }

    /// Partitions not yet recorded as successful, in enumeration order
    async fn pending<'a>(&self, partitions: &'a [PartitionId]) -> Result<Vec<&'a PartitionId>> {
        let succeeded = self.store.already_succeeded().await?;
        Ok(partitions
            .iter()
            .filter(|p| !succeeded.contains(p.as_str()))
            .collect())
    }

    /// Load one partition and durably record the outcome.
    ///
    /// Only a store failure is returned as an error.
    async fn attempt(&self, partition: &PartitionId) -> Result<PartitionOutcome> {
        let record = match self.loader.load(partition).await {
            Ok(rows) => {
                self.store
                    .record(partition.as_str(), rows, PartitionStatus::Success, None)
                    .await?
            }
            Err(e) => {
                warn!(partition = %partition, error = %e.cause, "Partition failed, continuing");
                self.store
                    .record(partition.as_str(), 0, PartitionStatus::Failed, Some(&e.cause))
                    .await?
            }
        };

        Ok(record.into())
    }
}

fn enter(phase: RunPhase) {
    debug!(phase = %phase, "Entering run phase");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::loader::LoadError;
    use crate::progress::MemoryProgressStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Loads every partition for a fixed row count, remembering the order
    struct FixedLoader {
        rows: u64,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PartitionLoader for FixedLoader {
        async fn load(&self, partition: &PartitionId) -> std::result::Result<u64, LoadError> {
            self.seen.lock().unwrap().push(partition.to_string());
            Ok(self.rows)
        }
    }

    fn coordinator(range: PartitionRange) -> IngestionCoordinator<MemoryProgressStore, FixedLoader> {
        IngestionCoordinator::new(
            range,
            MemoryProgressStore::new(),
            FixedLoader {
                rows: 3,
                seen: Mutex::new(Vec::new()),
            },
        )
    }

    #[test]
    fn test_phase_names() {
        assert_eq!(RunPhase::Enumerating.to_string(), "enumerating");
        assert_eq!(RunPhase::Done.as_str(), "done");
    }

    #[tokio::test]
    async fn test_loads_in_enumeration_order() {
        let coordinator = coordinator(PartitionRange::default());
        let summary = coordinator.run().await.unwrap();

        let expected: Vec<String> = enumerate_partitions(&PartitionRange::default())
            .unwrap()
            .iter()
            .map(|p| p.to_string())
            .collect();
        assert_eq!(*coordinator.loader().seen.lock().unwrap(), expected);
        assert_eq!(summary.partitions_attempted, 4);
        assert_eq!(summary.rows_inserted_total, 12);
    }

    #[tokio::test]
    async fn test_plan_does_not_load() {
        let coordinator = coordinator(PartitionRange::default());
        let plan = coordinator.plan().await.unwrap();

        assert_eq!(plan.partitions_considered, 4);
        assert_eq!(plan.work_set.len(), 4);
        assert!(coordinator.loader().seen.lock().unwrap().is_empty());
        assert!(coordinator.store().records().await.unwrap().is_empty());

        coordinator.run().await.unwrap();
        assert!(coordinator.plan().await.unwrap().is_converged());
    }

    #[tokio::test]
    async fn test_invalid_range_aborts_before_loading() {
        let coordinator = coordinator(PartitionRange::new(2025, 13, vec![1], vec![0]));
        let err = coordinator.run().await.unwrap_err();

        assert!(matches!(err, hourglass_common::HourglassError::Enumeration(_)));
        assert!(coordinator.loader().seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_range_is_converged() {
        let coordinator = coordinator(PartitionRange::new(2025, 1, vec![], vec![0]));
        let summary = coordinator.run().await.unwrap();

        assert_eq!(summary.partitions_considered, 0);
        assert_eq!(summary.partitions_attempted, 0);
        assert!(summary.is_converged());
    }
}
