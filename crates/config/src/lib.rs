//! Vantage Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Only the store connection and the tables need to be spelled out.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use vantage_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[tables.positions]\ndate_column = \"as_of_date\"").unwrap();
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [query]
//! url = "http://localhost:8123"
//! database = "finance"
//!
//! [cache.ttl]
//! aggregates = 300
//!
//! [tables.positions]
//! date_column = "as_of_date"
//! maturity_column = "maturity_date"
//!
//! [tables.positions.fields]
//! desk = "text"
//! amount = "number"
//! ```

mod cache;
mod error;
mod logging;
mod tables;
mod validation;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use cache::{CacheConfig, TtlConfig};
pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogLevel};
pub use tables::{DateFormat, FieldType, TableConfig};
pub use vantage_query::QueryConfig;

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Analytical store connection
    pub query: QueryConfig,

    /// Read-through cache policy
    pub cache: CacheConfig,

    /// Snapshot tables, keyed by table name
    pub tables: BTreeMap<String, TableConfig>,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or contains invalid TOML.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Declared table names, sorted
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.keys().map(String::as_str).collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.log.level, LogLevel::Info);
        assert!(config.cache.enabled);
        assert!(config.tables.is_empty());
        assert!(config.query.url.is_none());
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"

[query]
url = "http://ch.internal:8123"
database = "finance"
username = "reader"
password = "secret"
max_execution_time = 20

[cache]
namespace = "risk"

[cache.ttl]
aggregates = 120

[tables.positions]
date_column = "as_of_date"
maturity_column = "maturity_date"

[tables.positions.fields]
desk = "text"
amount = "number"
maturity_date = "date"

[tables."archive.trades"]
date_column = "snap"
date_format = "compact"
"#;
        let config = Config::from_str(toml).unwrap();
        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.query.database.as_deref(), Some("finance"));
        assert_eq!(config.query.max_execution_time, Some(20));
        assert_eq!(config.cache.namespace, "risk");
        assert_eq!(config.cache.ttl.aggregates, 120);
        assert_eq!(config.cache.ttl.rows, 60);
        assert_eq!(config.table_names(), vec!["archive.trades", "positions"]);

        let positions = &config.tables["positions"];
        assert_eq!(positions.maturity_column.as_deref(), Some("maturity_date"));
        assert_eq!(positions.fields["amount"], FieldType::Number);
        assert_eq!(config.tables["archive.trades"].date_format, DateFormat::Compact);
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(
            Config::from_str("[tables"),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tables.positions]\ndate_column = \"as_of_date\"").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.table_names(), vec!["positions"]);
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file("/nonexistent/vantage.toml").unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
        assert!(err.to_string().contains("/nonexistent/vantage.toml"));
    }
}
