//! ClickHouse over its HTTP interface
//!
//! Each statement is POSTed as the request body. Results come back in the
//! server's default `TabSeparated` format, which is all the callers need
//! (row counts and `SELECT 1`).

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{EngineError, QueryEngine, QueryOutput};

/// Default ClickHouse HTTP endpoint
pub const DEFAULT_CLICKHOUSE_URL: &str = "http://localhost:8123";

/// Default request timeout in seconds. Loading one hourly dump over the
/// network can take a while.
pub const DEFAULT_CLICKHOUSE_TIMEOUT_SECS: u64 = 600;

/// Statements longer than this are truncated in logs
const LOGGED_STATEMENT_CHARS: usize = 100;

#[derive(Debug, Clone)]
pub struct ClickHouseConfig {
    pub url: String,
    pub database: String,
    pub user: String,
    pub password: String,
    pub timeout_secs: u64,
}

impl Default for ClickHouseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_CLICKHOUSE_URL.to_string(),
            database: "default".to_string(),
            user: "default".to_string(),
            password: String::new(),
            timeout_secs: DEFAULT_CLICKHOUSE_TIMEOUT_SECS,
        }
    }
}

/// HTTP client for a single ClickHouse server
pub struct ClickHouseEngine {
    client: Client,
    config: ClickHouseConfig,
}

impl ClickHouseEngine {
    pub fn new(config: ClickHouseConfig) -> Result<Self, EngineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    /// Check that the server is reachable and answering queries
    pub async fn ping(&self) -> Result<(), EngineError> {
        let output = self.execute("SELECT 1").await?;
        match output.scalar_u64()? {
            1 => Ok(()),
            other => Err(EngineError::Parse(format!("SELECT 1 returned {}", other))),
        }
    }

    pub fn config(&self) -> &ClickHouseConfig {
        &self.config
    }
}

#[async_trait]
impl QueryEngine for ClickHouseEngine {
    async fn execute(&self, statement: &str) -> Result<QueryOutput, EngineError> {
        let preview: String = statement.chars().take(LOGGED_STATEMENT_CHARS).collect();
        debug!(database = %self.config.database, statement = %preview, "Executing statement");

        let mut request = self
            .client
            .post(&self.config.url)
            .query(&[("database", self.config.database.as_str())])
            .header("X-ClickHouse-User", &self.config.user)
            .body(statement.to_string());

        if !self.config.password.is_empty() {
            request = request.header("X-ClickHouse-Key", &self.config.password);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(EngineError::Status {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        Ok(QueryOutput::new(body))
    }
}
