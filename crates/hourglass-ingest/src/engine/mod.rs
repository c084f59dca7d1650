//! Query engine abstraction
//!
//! The warehouse engine is an opaque executor: hand it a statement, get back
//! its textual result. Everything hourglass needs (running load scripts and
//! counting rows) is built on top of [`QueryEngine::execute`].

pub mod clickhouse;
pub mod template;

pub use clickhouse::{ClickHouseConfig, ClickHouseEngine};
pub use template::SqlTemplate;

use async_trait::async_trait;
use thiserror::Error;

/// Errors raised by a query engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Engine returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected engine response: {0}")]
    Parse(String),

    #[error("Invalid table name '{0}'")]
    InvalidIdentifier(String),
}

impl From<EngineError> for hourglass_common::HourglassError {
    fn from(err: EngineError) -> Self {
        hourglass_common::HourglassError::engine(err.to_string())
    }
}

/// Raw result of one statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOutput {
    pub body: String,
}

impl QueryOutput {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Parse a single unsigned integer result, e.g. from `SELECT count()`
    pub fn scalar_u64(&self) -> Result<u64, EngineError> {
        let value = self.body.trim();
        value
            .parse()
            .map_err(|_| EngineError::Parse(format!("expected an unsigned integer, got '{}'", value)))
    }
}

/// Executor for warehouse statements
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Run one statement and return its result
    async fn execute(&self, statement: &str) -> Result<QueryOutput, EngineError>;

    /// Run statements in order, stopping at the first failure.
    ///
    /// Returns the result of the last statement, `None` for an empty script.
    async fn execute_script(&self, statements: &[String]) -> Result<Option<QueryOutput>, EngineError> {
        let mut last = None;
        for statement in statements {
            last = Some(self.execute(statement).await?);
        }
        Ok(last)
    }

    /// Current number of rows in `table`
    async fn row_count(&self, table: &str) -> Result<u64, EngineError> {
        validate_identifier(table)?;
        self.execute(&format!("SELECT count() FROM {}", table))
            .await?
            .scalar_u64()
    }

    async fn table_exists(&self, table: &str) -> Result<bool, EngineError> {
        validate_identifier(table)?;
        let output = self.execute(&format!("EXISTS TABLE {}", table)).await?;
        Ok(output.scalar_u64()? == 1)
    }
}

/// Accept `name` or `database.name` made of ASCII alphanumerics and underscores.
///
/// Table names are spliced into SQL text, so anything else is refused.
pub fn validate_identifier(name: &str) -> Result<(), EngineError> {
    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            part.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        });

    if valid {
        Ok(())
    } else {
        Err(EngineError::InvalidIdentifier(name.to_string()))
    }
}
