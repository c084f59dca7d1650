//! Ingestion configuration
//!
//! Loaded either from `HOURGLASS_*` environment variables (with `.env`
//! support) or from a TOML file. Every value has a default, so an empty
//! environment describes the stock two-day, two-hour January 2025 load
//! against a local ClickHouse.

use hourglass_common::{HourglassError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::engine::clickhouse::{DEFAULT_CLICKHOUSE_TIMEOUT_SECS, DEFAULT_CLICKHOUSE_URL};
use crate::engine::{validate_identifier, ClickHouseConfig, SqlTemplate};
use crate::loader::DEFAULT_LOAD_TEMPLATE;
use crate::partition::PartitionRange;
use crate::progress::sqlite::DEFAULT_PROGRESS_DATABASE_URL;

/// Default location of the hourly pageview dumps
pub const DEFAULT_SOURCE_BASE_URL: &str = "https://dumps.wikimedia.org/other/pageviews/";

/// Default table the filtered pageviews are loaded into
pub const DEFAULT_TARGET_TABLE: &str = "wikistat_data_engineering";

/// Default table holding the page paths to keep
pub const DEFAULT_KEYWORD_TABLE: &str = "data_engineering_keywords";

pub const DEFAULT_CLICKHOUSE_DATABASE: &str = "default";
pub const DEFAULT_CLICKHOUSE_USER: &str = "default";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub partitions: PartitionRange,
    pub source: SourceConfig,
    pub warehouse: WarehouseConfig,
    pub progress: ProgressConfig,
}

/// Where the raw dump files are fetched from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
}

/// ClickHouse connection and load settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    pub url: String,
    pub database: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub target_table: String,
    pub keyword_table: String,
    /// Replaces the built-in load statement when set
    pub load_template: Option<PathBuf>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub database_url: String,
}

impl IngestConfig {
    /// Load configuration from `.env` and `HOURGLASS_*` variables over the defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let config = Self {
            partitions: PartitionRange {
                year: env_parse("HOURGLASS_YEAR")?.unwrap_or(defaults.partitions.year),
                month: env_parse("HOURGLASS_MONTH")?.unwrap_or(defaults.partitions.month),
                days: env_list("HOURGLASS_DAYS")?.unwrap_or(defaults.partitions.days),
                hours: env_list("HOURGLASS_HOURS")?.unwrap_or(defaults.partitions.hours),
            },
            source: SourceConfig {
                base_url: env_string("HOURGLASS_BASE_URL").unwrap_or(defaults.source.base_url),
            },
            warehouse: WarehouseConfig {
                url: env_string("HOURGLASS_CLICKHOUSE_URL").unwrap_or(defaults.warehouse.url),
                database: env_string("HOURGLASS_CLICKHOUSE_DATABASE")
                    .unwrap_or(defaults.warehouse.database),
                user: env_string("HOURGLASS_CLICKHOUSE_USER").unwrap_or(defaults.warehouse.user),
                password: env_string("HOURGLASS_CLICKHOUSE_PASSWORD")
                    .unwrap_or(defaults.warehouse.password),
                target_table: env_string("HOURGLASS_TARGET_TABLE")
                    .unwrap_or(defaults.warehouse.target_table),
                keyword_table: env_string("HOURGLASS_KEYWORD_TABLE")
                    .unwrap_or(defaults.warehouse.keyword_table),
                load_template: env_string("HOURGLASS_LOAD_TEMPLATE").map(PathBuf::from),
                timeout_secs: env_parse("HOURGLASS_CLICKHOUSE_TIMEOUT")?
                    .unwrap_or(defaults.warehouse.timeout_secs),
            },
            progress: ProgressConfig {
                database_url: env_string("HOURGLASS_PROGRESS_DB")
                    .unwrap_or(defaults.progress.database_url),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            HourglassError::config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            HourglassError::config(format!("Failed to parse config file {}: {}", path.display(), e))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.partitions.validate()?;

        if self.source.base_url.is_empty() {
            return Err(HourglassError::config("Source base URL cannot be empty"));
        }
        if self.warehouse.url.is_empty() {
            return Err(HourglassError::config("ClickHouse URL cannot be empty"));
        }
        if self.warehouse.timeout_secs == 0 {
            return Err(HourglassError::config(
                "ClickHouse timeout must be greater than 0",
            ));
        }
        for table in [&self.warehouse.target_table, &self.warehouse.keyword_table] {
            validate_identifier(table).map_err(|e| HourglassError::config(e.to_string()))?;
        }
        if self.progress.database_url.is_empty() {
            return Err(HourglassError::config("Progress database URL cannot be empty"));
        }

        Ok(())
    }

    pub fn clickhouse(&self) -> ClickHouseConfig {
        ClickHouseConfig {
            url: self.warehouse.url.clone(),
            database: self.warehouse.database.clone(),
            user: self.warehouse.user.clone(),
            password: self.warehouse.password.clone(),
            timeout_secs: self.warehouse.timeout_secs,
        }
    }

    /// The configured load template file, or the built-in statement
    pub fn load_template(&self) -> Result<SqlTemplate> {
        match &self.warehouse.load_template {
            Some(path) => SqlTemplate::from_file(path),
            None => Ok(SqlTemplate::new(DEFAULT_LOAD_TEMPLATE)),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_SOURCE_BASE_URL.to_string(),
        }
    }
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CLICKHOUSE_URL.to_string(),
            database: DEFAULT_CLICKHOUSE_DATABASE.to_string(),
            user: DEFAULT_CLICKHOUSE_USER.to_string(),
            password: String::new(),
            target_table: DEFAULT_TARGET_TABLE.to_string(),
            keyword_table: DEFAULT_KEYWORD_TABLE.to_string(),
            load_template: None,
            timeout_secs: DEFAULT_CLICKHOUSE_TIMEOUT_SECS,
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_PROGRESS_DATABASE_URL.to_string(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str) -> Result<Option<T>> {
    env_string(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .map_err(|_| HourglassError::config(format!("Invalid value for {}: '{}'", name, raw)))
        })
        .transpose()
}

fn env_list(name: &str) -> Result<Option<Vec<u32>>> {
    env_string(name)
        .map(|raw| {
            parse_list(&raw)
                .map_err(|e| HourglassError::config(format!("Invalid value for {}: {}", name, e)))
        })
        .transpose()
}

/// Widest `a-b` range accepted, enough for every day of a month
const MAX_RANGE_WIDTH: u32 = 31;

/// Parse `1,2,5` and inclusive ranges like `1-3` (or a mix, `0-2,6`).
///
/// Order is preserved as written.
pub fn parse_list(raw: &str) -> std::result::Result<Vec<u32>, String> {
    let mut values = Vec::new();

    for item in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                let start = parse_number(start)?;
                let end = parse_number(end)?;
                if start > end {
                    return Err(format!("range '{}' is reversed", item));
                }
                if end - start >= MAX_RANGE_WIDTH {
                    return Err(format!(
                        "range '{}' spans more than {} values",
                        item, MAX_RANGE_WIDTH
                    ));
                }
                values.extend(start..=end);
            }
            None => values.push(parse_number(item)?),
        }
    }

    Ok(values)
}

fn parse_number(raw: &str) -> std::result::Result<u32, String> {
    raw.trim()
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw.trim()))
}
