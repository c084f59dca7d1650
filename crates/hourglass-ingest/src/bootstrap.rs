//! Warehouse setup
//!
//! Applies every `*.sql` file in a directory, in file name order, so setup
//! scripts are numbered (`01_create_wikistat.sql`, `02_...`). Only as
//! idempotent as the scripts themselves.

use hourglass_common::{HourglassError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::engine::{QueryEngine, SqlTemplate};

/// Setup scripts shipped with the crate
pub const BUNDLED_SETUP_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/sql/setup");

/// Execute the SQL files in `dir` and return them in the order applied
pub async fn bootstrap<E: QueryEngine + ?Sized>(
    engine: &E,
    dir: impl AsRef<Path>,
) -> Result<Vec<PathBuf>> {
    let files = sql_files(dir.as_ref())?;

    for file in &files {
        info!(file = %file.display(), "Applying setup script");
        let statements = SqlTemplate::from_file(file)?.statements();
        engine.execute_script(&statements).await.map_err(|e| {
            HourglassError::engine(format!("{} failed: {}", file.display(), e))
        })?;
    }

    info!(count = files.len(), "Warehouse bootstrap complete");
    Ok(files)
}

/// `*.sql` files directly inside `dir`, sorted by file name
fn sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        HourglassError::config(format!("Cannot read setup directory {}: {}", dir.display(), e))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(files)
}
