//! Error types for hourglass
//!
//! Errors fall into two groups. Partition-level failures ([`HourglassError::Load`])
//! are recovered by the coordinator and written to the progress store. Everything
//! else is fatal to the run and propagates to the caller.

use thiserror::Error;

/// Result type alias for hourglass operations
pub type Result<T> = std::result::Result<T, HourglassError>;

/// Main error type for hourglass
#[derive(Error, Debug)]
pub enum HourglassError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The progress store cannot be reached or rejected a statement.
    #[error("Progress store unavailable: {0}")]
    StoreUnavailable(String),

    /// One partition failed to load. Recorded as `failed`, never aborts a batch.
    #[error("Failed to load partition {partition}: {cause}")]
    Load { partition: String, cause: String },

    /// The partition range is invalid (month out of range, duplicate hours, ...).
    #[error("Invalid partition range: {0}")]
    Enumeration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Query engine failure outside of a partition load (bootstrap, connectivity).
    #[error("Query engine error: {0}")]
    Engine(String),
}

impl HourglassError {
    /// Create a store-unavailable error
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create an enumeration error
    pub fn enumeration(msg: impl Into<String>) -> Self {
        Self::Enumeration(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a query engine error
    pub fn engine(msg: impl Into<String>) -> Self {
        Self::Engine(msg.into())
    }

    /// Whether this error must abort the whole run.
    ///
    /// Only partition load failures are recoverable.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, HourglassError::Load { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_load_errors_are_recoverable() {
        let load = HourglassError::Load {
            partition: "2025/2025-01/pageviews-20250101-000000.gz".to_string(),
            cause: "404 Not Found".to_string(),
        };
        assert!(!load.is_fatal());
        assert!(HourglassError::store("database is locked").is_fatal());
        assert!(HourglassError::enumeration("month 13").is_fatal());
        assert!(HourglassError::config("missing table").is_fatal());
    }

    #[test]
    fn test_load_error_message_names_partition() {
        let err = HourglassError::Load {
            partition: "2025/2025-01/pageviews-20250101-010000.gz".to_string(),
            cause: "connection refused".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("pageviews-20250101-010000.gz"));
        assert!(message.contains("connection refused"));
    }
}
