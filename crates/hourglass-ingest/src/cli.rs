//! Command-line interface definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hourglass-ingest")]
#[command(author, version, about = "Incremental loader for hourly pageview dumps")]
pub struct Cli {
    /// TOML configuration file. Without it, HOURGLASS_* variables and defaults are used.
    #[arg(short, long, global = true, env = "HOURGLASS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load every partition that has not succeeded yet
    Run {
        /// Print the run summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which partitions the next run would load
    Plan {
        #[arg(long)]
        json: bool,
    },

    /// List recorded partition outcomes
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Apply setup SQL files (tables, keywords) in file name order
    Bootstrap {
        /// Directory containing the *.sql files
        dir: PathBuf,
    },
}
