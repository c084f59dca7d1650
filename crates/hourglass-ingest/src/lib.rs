//! Hourglass Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Incremental, idempotent loading of hourly pageview dumps into ClickHouse.
//!
//! A run enumerates the configured partitions, skips every partition the
//! progress store already records as successful, and loads the rest one at a
//! time. Each outcome is committed to the progress store before the next
//! partition starts, so re-running after a crash or a partial failure only
//! retries what is missing.
//!
//! # Components
//!
//! - [`partition`]: time range to ordered partition identifiers
//! - [`progress`]: durable record of partition outcomes (SQLite or in-memory)
//! - [`loader`]: applies one partition and measures the rows it added
//! - [`coordinator`]: drives a run and produces the [`RunSummary`]
//! - [`engine`]: ClickHouse HTTP client and SQL templates
//!
//! # Example
//!
//! ```no_run
//! use hourglass_ingest::{
//!     ClickHouseConfig, ClickHouseEngine, IngestionCoordinator, PartitionRange,
//!     SqliteProgressStore, StatementLoader,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = ClickHouseEngine::new(ClickHouseConfig::default())?;
//!     let loader = StatementLoader::new(
//!         engine,
//!         "https://dumps.wikimedia.org/other/pageviews/",
//!         "wikistat_data_engineering",
//!         "data_engineering_keywords",
//!     )?;
//!     let store = SqliteProgressStore::connect("sqlite://progress.db").await?;
//!
//!     let coordinator = IngestionCoordinator::new(PartitionRange::default(), store, loader);
//!     let summary = coordinator.run().await?;
//!     println!("{}", summary.render());
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod cli;
pub mod commands;
pub mod config;
pub mod coordinator;
pub mod engine;
pub mod loader;
pub mod partition;
pub mod progress;

pub use cli::{Cli, Commands};
pub use config::IngestConfig;
pub use coordinator::{IngestionCoordinator, RunPhase};
pub use engine::{ClickHouseConfig, ClickHouseEngine, QueryEngine, SqlTemplate};
pub use hourglass_common::types::{PartitionOutcome, PartitionStatus, RunPlan, RunSummary};
pub use loader::{LoadError, PartitionLoader, StatementLoader};
pub use partition::{enumerate_partitions, PartitionId, PartitionRange};
pub use progress::{MemoryProgressStore, ProgressStore, SqliteProgressStore};
