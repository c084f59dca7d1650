//! Parameterized SQL statement files
//!
//! Placeholders are written `{name}` and replaced literally before execution;
//! no quoting or escaping is applied. A file may hold several statements
//! separated by `;`.

use hourglass_common::{HourglassError, Result};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlTemplate {
    text: String,
}

impl SqlTemplate {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            HourglassError::config(format!("Failed to read SQL file {}: {}", path.display(), e))
        })?;
        Ok(Self::new(text))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Substitute every `{name}` with its value. Unknown placeholders are left as-is.
    pub fn render(&self, params: &[(&str, &str)]) -> Self {
        let text = params.iter().fold(self.text.clone(), |sql, (key, value)| {
            sql.replace(&format!("{{{}}}", key), value)
        });
        Self { text }
    }

    /// Split into individual statements, dropping empty ones
    pub fn statements(&self) -> Vec<String> {
        self.text
            .split(';')
            .map(str::trim)
            .filter(|stmt| !stmt.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_render_replaces_all_occurrences() {
        let template = SqlTemplate::new("SELECT '{a}', '{a}', '{b}' FROM {table}");
        let rendered = template.render(&[("a", "x"), ("table", "hits")]);
        assert_eq!(rendered.text(), "SELECT 'x', 'x', '{b}' FROM hits");
    }

    #[test]
    fn test_statements_split_and_trimmed() {
        let template = SqlTemplate::new(
            "CREATE TABLE IF NOT EXISTS t (x UInt8);\n\n  INSERT INTO t VALUES (1) ;\n;\n",
        );
        assert_eq!(
            template.statements(),
            vec![
                "CREATE TABLE IF NOT EXISTS t (x UInt8)".to_string(),
                "INSERT INTO t VALUES (1)".to_string(),
            ]
        );
    }

    #[test]
    fn test_whitespace_only_has_no_statements() {
        assert!(SqlTemplate::new(" ;\n ; ").statements().is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "SELECT {{x}}").unwrap();
        let template = SqlTemplate::from_file(file.path()).unwrap();
        assert_eq!(template.render(&[("x", "1")]).text(), "SELECT 1");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = SqlTemplate::from_file("/nonexistent/load.sql").unwrap_err();
        assert!(matches!(err, HourglassError::Config(_)));
    }
}
