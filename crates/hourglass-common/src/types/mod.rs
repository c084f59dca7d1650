//! Types shared between the ingestion core and reporting layers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of the most recent load attempt for a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStatus {
    Success,
    Failed,
}

impl PartitionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartitionStatus::Success => "success",
            PartitionStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PartitionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "success" => Ok(PartitionStatus::Success),
            "failed" => Ok(PartitionStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid partition status: {}", s)),
        }
    }
}

impl std::fmt::Display for PartitionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Persisted state of one partition (maps to the `processed_partitions` table).
///
/// There is at most one record per partition id; a new attempt replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub partition_id: String,
    /// Rows appended to the target table, 0 when the attempt failed
    pub rows_inserted: u64,
    pub processed_at: DateTime<Utc>,
    pub status: PartitionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// Result of one load attempt observed during the current run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionOutcome {
    pub partition_id: String,
    pub status: PartitionStatus,
    pub rows_inserted: u64,
    pub processed_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PartitionOutcome {
    pub fn is_success(&self) -> bool {
        self.status == PartitionStatus::Success
    }
}

impl From<ProgressRecord> for PartitionOutcome {
    fn from(record: ProgressRecord) -> Self {
        Self {
            partition_id: record.partition_id,
            status: record.status,
            rows_inserted: record.rows_inserted,
            processed_at: record.processed_at,
            error_message: record.error_message,
        }
    }
}

/// Statistics for one ingestion run.
///
/// Built from the outcomes observed in this run only; the progress store is
/// never re-queried to produce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub partitions_considered: usize,
    pub partitions_skipped: usize,
    pub partitions_attempted: usize,
    pub partitions_succeeded: usize,
    pub partitions_failed: usize,
    pub rows_inserted_total: u64,
    pub outcomes: Vec<PartitionOutcome>,
}

impl RunSummary {
    /// Aggregate per-partition outcomes into run statistics
    pub fn from_outcomes(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        partitions_considered: usize,
        partitions_skipped: usize,
        outcomes: Vec<PartitionOutcome>,
    ) -> Self {
        let partitions_succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let rows_inserted_total = outcomes
            .iter()
            .filter(|o| o.is_success())
            .map(|o| o.rows_inserted)
            .sum();

        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            partitions_considered,
            partitions_skipped,
            partitions_attempted: outcomes.len(),
            partitions_succeeded,
            partitions_failed: outcomes.len() - partitions_succeeded,
            rows_inserted_total,
            outcomes,
        }
    }

    /// Every considered partition has now succeeded
    pub fn is_converged(&self) -> bool {
        self.partitions_skipped + self.partitions_succeeded == self.partitions_considered
    }

    /// Failed outcomes in processing order
    pub fn failures(&self) -> impl Iterator<Item = &PartitionOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Human-readable multi-line summary
    pub fn render(&self) -> String {
        format!(
            "Ingestion Summary:\n\
             - Partitions considered: {}\n\
             - Skipped (already loaded): {}\n\
             - Attempted: {}\n\
             - Succeeded: {}\n\
             - Failed: {}\n\
             - Rows inserted: {}",
            self.partitions_considered,
            self.partitions_skipped,
            self.partitions_attempted,
            self.partitions_succeeded,
            self.partitions_failed,
            self.rows_inserted_total
        )
    }
}

/// What the next run would do, without loading anything
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPlan {
    pub partitions_considered: usize,
    pub partitions_skipped: usize,
    /// Pending partitions in processing order
    pub work_set: Vec<String>,
}

impl RunPlan {
    pub fn is_converged(&self) -> bool {
        self.work_set.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    impl PartitionOutcome {
        fn succeeded(partition_id: impl Into<String>, rows_inserted: u64) -> Self {
            Self {
                partition_id: partition_id.into(),
                status: PartitionStatus::Success,
                rows_inserted,
                processed_at: Utc::now(),
                error_message: None,
            }
        }

        fn failed(partition_id: impl Into<String>, error_message: impl Into<String>) -> Self {
            Self {
                partition_id: partition_id.into(),
                status: PartitionStatus::Failed,
                rows_inserted: 0,
                processed_at: Utc::now(),
                error_message: Some(error_message.into()),
            }
        }
    }

    #[test]
    fn test_partition_status_round_trips_through_str() {
        assert_eq!("success".parse::<PartitionStatus>().unwrap(), PartitionStatus::Success);
        assert_eq!("failed".parse::<PartitionStatus>().unwrap(), PartitionStatus::Failed);
        assert!("pending".parse::<PartitionStatus>().is_err());
        assert_eq!(PartitionStatus::Failed.to_string(), "failed");
    }

    #[test]
    fn test_summary_counts_only_successful_rows() {
        let outcomes = vec![
            PartitionOutcome::succeeded("a", 10),
            PartitionOutcome::failed("b", "boom"),
            PartitionOutcome::succeeded("c", 5),
        ];

        let summary = RunSummary::from_outcomes(Uuid::new_v4(), Utc::now(), 4, 1, outcomes);

        assert_eq!(summary.partitions_considered, 4);
        assert_eq!(summary.partitions_skipped, 1);
        assert_eq!(summary.partitions_attempted, 3);
        assert_eq!(summary.partitions_succeeded, 2);
        assert_eq!(summary.partitions_failed, 1);
        assert_eq!(summary.rows_inserted_total, 15);
        assert!(!summary.is_converged());
        assert_eq!(summary.failures().count(), 1);
    }

    #[test]
    fn test_empty_summary_is_converged() {
        let summary = RunSummary::from_outcomes(Uuid::new_v4(), Utc::now(), 3, 3, vec![]);
        assert_eq!(summary.partitions_attempted, 0);
        assert!(summary.is_converged());
        assert!(summary.render().contains("Skipped (already loaded): 3"));
    }

    #[test]
    fn test_failed_outcome_has_zero_rows() {
        let outcome = PartitionOutcome::failed("x", "source missing");
        assert_eq!(outcome.rows_inserted, 0);
        assert_eq!(outcome.error_message.as_deref(), Some("source missing"));
        assert!(!outcome.is_success());
    }
}
