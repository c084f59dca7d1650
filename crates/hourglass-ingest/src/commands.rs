//! Command implementations behind the `hourglass-ingest` binary

use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use hourglass_common::types::{PartitionStatus, ProgressRecord, RunPlan, RunSummary};
use hourglass_common::Result;
use std::path::Path;
use tracing::info;

use crate::config::IngestConfig;
use crate::coordinator::IngestionCoordinator;
use crate::engine::{ClickHouseEngine, QueryEngine};
use crate::loader::StatementLoader;
use crate::progress::{MemoryProgressStore, ProgressStore, SqliteProgressStore};

/// Coordinator wired to ClickHouse and the SQLite progress database
pub type ClickHouseCoordinator =
    IngestionCoordinator<SqliteProgressStore, StatementLoader<ClickHouseEngine>>;

pub async fn build_coordinator(config: &IngestConfig) -> Result<ClickHouseCoordinator> {
    let store = SqliteProgressStore::connect(&config.progress.database_url).await?;
    coordinator_with_store(config, store)
}

fn coordinator_with_store<S: ProgressStore>(
    config: &IngestConfig,
    store: S,
) -> Result<IngestionCoordinator<S, StatementLoader<ClickHouseEngine>>> {
    let engine = ClickHouseEngine::new(config.clickhouse())?;
    let loader = StatementLoader::new(
        engine,
        config.source.base_url.clone(),
        config.warehouse.target_table.clone(),
        config.warehouse.keyword_table.clone(),
    )?
    .with_template(config.load_template()?);

    Ok(IngestionCoordinator::new(
        config.partitions.clone(),
        store,
        loader,
    ))
}

/// `hourglass-ingest run`
pub async fn run(config: &IngestConfig, json: bool) -> Result<RunSummary> {
    let coordinator = build_coordinator(config).await?;
    let summary = coordinator.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(summary)
}

/// `hourglass-ingest plan`
pub async fn plan(config: &IngestConfig, json: bool) -> Result<RunPlan> {
    // Building the engine does not contact the server
    let plan = match SqliteProgressStore::open_existing(&config.progress.database_url).await? {
        Some(store) => coordinator_with_store(config, store)?.plan().await?,
        None => {
            coordinator_with_store(config, MemoryProgressStore::new())?
                .plan()
                .await?
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(plan);
    }

    if plan.is_converged() {
        println!(
            "{} all {} partitions already loaded",
            "Converged:".green().bold(),
            plan.partitions_considered
        );
        return Ok(plan);
    }

    println!(
        "{} {} of {} partitions pending ({} already loaded)",
        "Plan:".cyan().bold(),
        plan.work_set.len(),
        plan.partitions_considered,
        plan.partitions_skipped
    );
    for partition in &plan.work_set {
        println!("  {}", partition);
    }

    Ok(plan)
}

/// `hourglass-ingest status`
pub async fn status(config: &IngestConfig, json: bool) -> Result<Vec<ProgressRecord>> {
    let records = match SqliteProgressStore::open_existing(&config.progress.database_url).await? {
        Some(store) => store.records().await?,
        None => Vec::new(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("No partitions recorded yet.");
        println!("Run 'hourglass-ingest run' to start loading.");
    } else {
        println!("{}", format_records(&records));
    }

    Ok(records)
}

/// `hourglass-ingest bootstrap <dir>`
pub async fn bootstrap(config: &IngestConfig, dir: &Path) -> Result<()> {
    let engine = ClickHouseEngine::new(config.clickhouse())?;
    engine.ping().await?;

    let applied = crate::bootstrap::bootstrap(&engine, dir).await?;
    println!(
        "{} applied {} setup file(s) from {}",
        "Bootstrap:".cyan().bold(),
        applied.len(),
        dir.display()
    );

    let keyword_table = &config.warehouse.keyword_table;
    if engine.table_exists(keyword_table).await? {
        let keywords = engine.row_count(keyword_table).await?;
        info!(table = %keyword_table, rows = keywords, "Keyword table ready");
        println!("  {} contains {} keyword(s)", keyword_table, keywords);
    } else {
        println!(
            "  {} keyword table {} does not exist yet",
            "Warning:".yellow().bold(),
            keyword_table
        );
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("{}", summary.render());

    let failures: Vec<_> = summary.failures().collect();
    if !failures.is_empty() {
        println!();
        println!("{}", "Failed partitions (retried on next run):".red().bold());
        for outcome in failures {
            println!(
                "  {}: {}",
                outcome.partition_id,
                outcome.error_message.as_deref().unwrap_or("unknown error")
            );
        }
    }
}

fn format_records(records: &[ProgressRecord]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec!["Partition", "Status", "Rows", "Processed At", "Error"]);

    for record in records {
        let status = match record.status {
            PartitionStatus::Success => record.status.as_str().green().to_string(),
            PartitionStatus::Failed => record.status.as_str().red().to_string(),
        };
        table.add_row(vec![
            record.partition_id.clone(),
            status,
            record.rows_inserted.to_string(),
            record.processed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            record.error_message.clone().unwrap_or_default(),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_format_records() {
        colored::control::set_override(false);
        let records = vec![
            ProgressRecord {
                partition_id: "2025/2025-01/pageviews-20250101-000000.gz".to_string(),
                rows_inserted: 10,
                processed_at: Utc::now(),
                status: PartitionStatus::Success,
                error_message: None,
            },
            ProgressRecord {
                partition_id: "2025/2025-01/pageviews-20250101-010000.gz".to_string(),
                rows_inserted: 0,
                processed_at: Utc::now(),
                status: PartitionStatus::Failed,
                error_message: Some("404 Not Found".to_string()),
            },
        ];

        let table = format_records(&records);
        assert!(table.contains("pageviews-20250101-000000.gz"));
        assert!(table.contains("success"));
        assert!(table.contains("404 Not Found"));
    }
}
