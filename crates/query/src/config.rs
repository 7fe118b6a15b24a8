//! Query configuration types

use serde::{Deserialize, Serialize};

use crate::backend::clickhouse::ClickHouseBackendConfig;
use crate::error::QueryError;

/// Query configuration
///
/// Connection details for the analytical store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Backend type (only "clickhouse" is supported)
    pub backend: Option<String>,

    /// ClickHouse HTTP URL
    pub url: Option<String>,

    /// Database name
    pub database: Option<String>,

    /// Username for authentication
    pub username: Option<String>,

    /// Password for authentication
    pub password: Option<String>,

    /// Server-side execution limit in seconds
    pub max_execution_time: Option<u64>,
}

impl QueryConfig {
    /// Create config for ClickHouse backend
    pub fn clickhouse(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            backend: Some("clickhouse".to_string()),
            url: Some(url.into()),
            database: Some(database.into()),
            ..Default::default()
        }
    }

    /// Resolve into a ClickHouse backend config
    pub fn to_clickhouse(&self) -> Result<ClickHouseBackendConfig, QueryError> {
        match self.backend.as_deref() {
            None | Some("clickhouse") => {}
            Some(other) => {
                return Err(QueryError::Config(format!("unknown backend: {}", other)));
            }
        }

        let url = self
            .url
            .as_ref()
            .ok_or_else(|| QueryError::Config("url required for clickhouse backend".to_string()))?;
        let database = self.database.as_deref().unwrap_or("default");

        let mut config = ClickHouseBackendConfig::new(url, database);

        if let (Some(user), Some(pass)) = (&self.username, &self.password) {
            config = config.with_credentials(user, pass);
        }
        if let Some(seconds) = self.max_execution_time {
            config = config.with_max_execution_time(seconds);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clickhouse_config() {
        let config = QueryConfig::clickhouse("http://ch:8123", "finance")
            .to_clickhouse()
            .unwrap();
        assert_eq!(config.url, "http://ch:8123");
        assert_eq!(config.database, "finance");
        assert!(config.username.is_none());
    }

    #[test]
    fn test_missing_url() {
        let config = QueryConfig::default();
        assert!(matches!(config.to_clickhouse(), Err(QueryError::Config(_))));
    }

    #[test]
    fn test_unknown_backend() {
        let config = QueryConfig {
            backend: Some("duckdb".to_string()),
            url: Some("http://ch:8123".to_string()),
            ..Default::default()
        };
        assert!(config.to_clickhouse().is_err());
    }

    #[test]
    fn test_credentials_and_limit() {
        let config = QueryConfig {
            url: Some("http://ch:8123".to_string()),
            username: Some("reader".to_string()),
            password: Some("secret".to_string()),
            max_execution_time: Some(15),
            ..Default::default()
        }
        .to_clickhouse()
        .unwrap();
        assert_eq!(config.database, "default");
        assert_eq!(config.username.as_deref(), Some("reader"));
        assert_eq!(config.max_execution_time, 15);
    }
}
