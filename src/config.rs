//! Staging configuration loaded from TOML.
//!
//! ```toml
//! connection_string = "DRIVER={ODBC Driver 17 for SQL Server};SERVER=db;DATABASE=etl;Trusted_Connection=yes;"
//! schema = "Stage"
//! default_table = "Orders"
//!
//! [flatten]
//! object_key = "data"
//! remove_empty_lists = true
//! ```

use crate::error::{Result, StageError};
use crate::export::DEFAULT_SCHEMA;
use crate::types::FlattenOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connection and flattening settings for a staging run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// ODBC connection string, passed to the driver unvalidated
    pub connection_string: Option<String>,

    /// Schema holding the staging tables
    pub schema: String,

    /// Staging table used when none is given on the command line
    pub default_table: Option<String>,

    pub flatten: FlattenOptions,
}

impl Default for StageConfig {
    fn default() -> Self {
        StageConfig {
            connection_string: None,
            schema: DEFAULT_SCHEMA.to_string(),
            default_table: None,
            flatten: FlattenOptions::default(),
        }
    }
}

impl StageConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| StageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|e| StageError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

/// Trusted-connection string for a SQL Server ODBC driver
pub fn odbc_connection_string(driver: &str, server: &str, database: &str) -> String {
    format!(
        "DRIVER={{{}}};SERVER={};DATABASE={};Trusted_Connection=yes;",
        driver, server, database
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_connection_string() {
        assert_eq!(
            odbc_connection_string("ODBC Driver 17 for SQL Server", "db01", "etl"),
            "DRIVER={ODBC Driver 17 for SQL Server};SERVER=db01;DATABASE=etl;Trusted_Connection=yes;"
        );
    }

    #[test]
    fn test_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stage.toml");
        std::fs::write(
            &path,
            r#"
connection_string = "DSN=etl"
default_table = "Orders"

[flatten]
object_key = "data"
columns = ["id", "tags"]
remove_empty_lists = true
"#,
        )
        .unwrap();

        let config = StageConfig::from_file(&path).unwrap();
        assert_eq!(config.connection_string.as_deref(), Some("DSN=etl"));
        assert_eq!(config.schema, "Stage");
        assert_eq!(config.default_table.as_deref(), Some("Orders"));
        assert_eq!(config.flatten.object_key.as_deref(), Some("data"));
        assert_eq!(
            config.flatten.columns,
            Some(vec!["id".to_string(), "tags".to_string()])
        );
        assert!(config.flatten.remove_empty_lists);
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stage.toml");
        std::fs::write(&path, "schema = 5").unwrap();

        assert!(matches!(
            StageConfig::from_file(&path),
            Err(StageError::Config { .. })
        ));
    }
}
