//! Hourglass Ingest - incremental pageview loader

use anyhow::{Context, Result};
use clap::Parser;
use hourglass_common::logging::{init_logging, LogConfig, LogLevel};
use hourglass_ingest::{commands, Cli, Commands, IngestConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };
    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("hourglass-ingest")
        .build()
        .merge_env()?;
    // Keep the guard alive so buffered file output is flushed on exit
    let _guard = init_logging(&log_config)?;

    let config = match &cli.config {
        Some(path) => IngestConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => IngestConfig::from_env().context("Failed to load configuration")?,
    };

    if let Err(e) = execute(&cli.command, &config).await {
        error!(error = %e, "Command failed");
        return Err(e);
    }

    Ok(())
}

async fn execute(command: &Commands, config: &IngestConfig) -> Result<()> {
    match command {
        Commands::Run { json } => {
            let summary = commands::run(config, *json).await.context("Ingestion run failed")?;
            // Partition failures are retried next run; they do not fail the process
            if summary.partitions_failed > 0 {
                info!(
                    failed = summary.partitions_failed,
                    "Run finished with failed partitions"
                );
            }
        }
        Commands::Plan { json } => {
            commands::plan(config, *json).await.context("Planning failed")?;
        }
        Commands::Status { json } => {
            commands::status(config, *json)
                .await
                .context("Failed to read progress")?;
        }
        Commands::Bootstrap { dir } => {
            commands::bootstrap(config, dir)
                .await
                .with_context(|| format!("Bootstrap from {} failed", dir.display()))?;
        }
    }

    Ok(())
}
