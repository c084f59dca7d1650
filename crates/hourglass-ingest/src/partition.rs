//! Partition enumeration
//!
//! Maps a configured time range onto the ordered list of hourly dump files.
//! Pure and deterministic: the same range always yields the same identifiers
//! in the same order, which is also the order partitions are loaded in.

use chrono::NaiveDate;
use hourglass_common::{HourglassError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// File name prefix of the hourly pageview dumps
pub const DUMP_FILE_PREFIX: &str = "pageviews";

/// Identifier of one hourly dump file, e.g.
/// `2025/2025-01/pageviews-20250101-000000.gz`.
///
/// Only ever persisted as its string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    fn new(year: i32, month: u32, day: u32, hour: u32) -> Self {
        Self(format!(
            "{year:04}/{year:04}-{month:02}/{DUMP_FILE_PREFIX}-{year:04}{month:02}{day:02}-{hour:02}0000.gz"
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PartitionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PartitionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The slice of the dataset one run is responsible for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionRange {
    pub year: i32,
    pub month: u32,
    /// Days of month, in processing order
    pub days: Vec<u32>,
    /// Hours of day, in processing order
    pub hours: Vec<u32>,
}

impl PartitionRange {
    pub fn new(year: i32, month: u32, days: Vec<u32>, hours: Vec<u32>) -> Self {
        Self {
            year,
            month,
            days,
            hours,
        }
    }

    /// Check the range without producing any identifiers
    pub fn validate(&self) -> Result<()> {
        if !(1..=9999).contains(&self.year) {
            return Err(HourglassError::enumeration(format!(
                "year must be between 1 and 9999, got {}",
                self.year
            )));
        }
        if !(1..=12).contains(&self.month) {
            return Err(HourglassError::enumeration(format!(
                "month must be between 1 and 12, got {}",
                self.month
            )));
        }

        ensure_unique("day", &self.days)?;
        ensure_unique("hour", &self.hours)?;

        for &day in &self.days {
            if NaiveDate::from_ymd_opt(self.year, self.month, day).is_none() {
                return Err(HourglassError::enumeration(format!(
                    "day {} does not exist in {:04}-{:02}",
                    day, self.year, self.month
                )));
            }
        }
        if let Some(hour) = self.hours.iter().find(|&&h| h > 23) {
            return Err(HourglassError::enumeration(format!(
                "hour must be between 0 and 23, got {}",
                hour
            )));
        }

        Ok(())
    }

    /// Number of partitions the range expands to
    pub fn len(&self) -> usize {
        self.days.len() * self.hours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PartitionRange {
    fn default() -> Self {
        Self::new(2025, 1, vec![1, 2], vec![0, 1])
    }
}

fn ensure_unique(kind: &str, values: &[u32]) -> Result<()> {
    let mut seen = HashSet::with_capacity(values.len());
    match values.iter().find(|v| !seen.insert(**v)) {
        Some(dup) => Err(HourglassError::enumeration(format!(
            "{} {} is listed more than once",
            kind, dup
        ))),
        None => Ok(()),
    }
}

/// Expand a range into partition identifiers, day-major then hour.
///
/// An empty day or hour list yields an empty sequence.
pub fn enumerate_partitions(range: &PartitionRange) -> Result<Vec<PartitionId>> {
    range.validate()?;

    let partitions = range
        .days
        .iter()
        .flat_map(|&day| {
            range
                .hours
                .iter()
                .map(move |&hour| PartitionId::new(range.year, range.month, day, hour))
        })
        .collect();

    Ok(partitions)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ids(range: &PartitionRange) -> Vec<String> {
        enumerate_partitions(range)
            .unwrap()
            .into_iter()
            .map(|p| p.to_string())
            .collect()
    }

    #[test]
    fn test_day_major_order() {
        let range = PartitionRange::new(2025, 1, vec![1, 2], vec![0, 1]);
        assert_eq!(
            ids(&range),
            vec![
                "2025/2025-01/pageviews-20250101-000000.gz",
                "2025/2025-01/pageviews-20250101-010000.gz",
                "2025/2025-01/pageviews-20250102-000000.gz",
                "2025/2025-01/pageviews-20250102-010000.gz",
            ]
        );
    }

    #[test]
    fn test_enumeration_is_deterministic() {
        let range = PartitionRange::new(2024, 11, vec![30, 3, 17], vec![23, 0, 12]);
        assert_eq!(ids(&range), ids(&range.clone()));
        assert_eq!(range.len(), 9);
    }

    #[test]
    fn test_given_order_is_preserved() {
        let range = PartitionRange::new(2025, 3, vec![9, 4], vec![5]);
        assert_eq!(
            ids(&range),
            vec![
                "2025/2025-03/pageviews-20250309-050000.gz",
                "2025/2025-03/pageviews-20250304-050000.gz",
            ]
        );
    }

    #[test]
    fn test_empty_days_or_hours_yield_nothing() {
        assert!(ids(&PartitionRange::new(2025, 1, vec![], vec![0, 1])).is_empty());
        assert!(ids(&PartitionRange::new(2025, 1, vec![1], vec![])).is_empty());
    }

    #[test]
    fn test_invalid_month_is_rejected() {
        for month in [0, 13] {
            let err = enumerate_partitions(&PartitionRange::new(2025, month, vec![1], vec![0]))
                .unwrap_err();
            assert!(matches!(err, HourglassError::Enumeration(_)));
        }
    }

    #[test]
    fn test_day_must_exist_in_month() {
        let err =
            enumerate_partitions(&PartitionRange::new(2025, 2, vec![29], vec![0])).unwrap_err();
        assert!(err.to_string().contains("2025-02"));
        // 2024 is a leap year
        assert_eq!(ids(&PartitionRange::new(2024, 2, vec![29], vec![0])).len(), 1);
    }

    #[test]
    fn test_hour_out_of_range_is_rejected() {
        let err =
            enumerate_partitions(&PartitionRange::new(2025, 1, vec![1], vec![0, 24])).unwrap_err();
        assert!(matches!(err, HourglassError::Enumeration(_)));
    }

    #[test]
    fn test_duplicates_are_rejected() {
        assert!(enumerate_partitions(&PartitionRange::new(2025, 1, vec![1, 1], vec![0])).is_err());
        assert!(enumerate_partitions(&PartitionRange::new(2025, 1, vec![1], vec![3, 3])).is_err());
    }
}
