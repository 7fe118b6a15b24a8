//! Cache configuration

use std::time::Duration;

use serde::Deserialize;

/// TTLs in seconds per kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TtlConfig {
    /// Raw row browsing
    /// Default: 60
    pub rows: u64,
    /// Grouped, stat, historical and future aggregates
    /// Default: 300
    pub aggregates: u64,
    /// Distinct values for filter pickers
    /// Default: 3600
    pub distinct: u64,
    /// Snapshot date resolution
    /// Default: 300
    pub snapshot: u64,
}

impl Default for TtlConfig {
    fn default() -> Self {
        Self {
            rows: 60,
            aggregates: 300,
            distinct: 3600,
            snapshot: 300,
        }
    }
}

impl TtlConfig {
    /// Every TTL with its name
    pub fn entries(&self) -> [(&'static str, u64); 4] {
        [
            ("rows", self.rows),
            ("aggregates", self.aggregates),
            ("distinct", self.distinct),
            ("snapshot", self.snapshot),
        ]
    }

    /// Rows TTL
    pub fn rows(&self) -> Duration {
        Duration::from_secs(self.rows)
    }

    /// Aggregates TTL
    pub fn aggregates(&self) -> Duration {
        Duration::from_secs(self.aggregates)
    }

    /// Distinct TTL
    pub fn distinct(&self) -> Duration {
        Duration::from_secs(self.distinct)
    }

    /// Snapshot TTL
    pub fn snapshot(&self) -> Duration {
        Duration::from_secs(self.snapshot)
    }
}

/// Read-through cache configuration
///
/// ```toml
/// [cache]
/// enabled = true
/// namespace = "vantage"
///
/// [cache.ttl]
/// aggregates = 600
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Serve repeated queries from the store
    /// Default: true
    pub enabled: bool,
    /// Key prefix shared by every entry
    /// Default: "vantage"
    pub namespace: String,
    /// TTLs per kind of request
    pub ttl: TtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: "vantage".to_string(),
            ttl: TtlConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: CacheConfig = toml::from_str("").unwrap();
        assert!(config.enabled);
        assert_eq!(config.namespace, "vantage");
        assert_eq!(config.ttl.aggregates(), Duration::from_secs(300));
        assert_eq!(config.ttl.distinct(), Duration::from_secs(3600));
    }

    #[test]
    fn test_partial_ttl_override() {
        let config: CacheConfig = toml::from_str(
            r#"
enabled = false

[ttl]
rows = 10
"#,
        )
        .unwrap();
        assert!(!config.enabled);
        assert_eq!(config.ttl.rows(), Duration::from_secs(10));
        assert_eq!(config.ttl.snapshot(), Duration::from_secs(300));
    }
}
