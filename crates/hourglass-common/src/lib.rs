//! Hourglass Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, logging, and error handling for the hourglass workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`HourglassError`] and the crate-wide [`Result`] alias
//! - **Logging**: `tracing` subscriber setup driven by [`logging::LogConfig`]
//! - **Types**: progress records and run summaries shared with reporting layers
//!
//! # Example
//!
//! ```no_run
//! use hourglass_common::{HourglassError, Result};
//! use hourglass_common::types::PartitionStatus;
//!
//! fn parse_status(raw: &str) -> Result<PartitionStatus> {
//!     raw.parse()
//!         .map_err(|e| HourglassError::store(format!("corrupt progress row: {}", e)))
//! }
//! ```

pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{HourglassError, Result};
