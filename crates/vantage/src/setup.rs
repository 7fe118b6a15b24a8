//! Engine construction from configuration

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use vantage_analytics::{
    AnalyticsEngine, DateEncoding, FieldKind, QueryContext, TableRegistry, TableSchema,
};
use vantage_cache::{CacheTtls, MemoryStore, ReadThroughCache};
use vantage_config::{Config, DateFormat, FieldType};
use vantage_query::{ClickHouseBackend, QueryBackend};

/// Paths tried when no config is given
const DEFAULT_PATHS: [&str; 2] = ["vantage.toml", "configs/vantage.toml"];

/// Load the config at `path`, or the first default path that exists
///
/// An explicit path must exist. Without one and without a default file,
/// the built-in defaults are used.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        return Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }

    match DEFAULT_PATHS.iter().map(PathBuf::from).find(|p| p.exists()) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn field_kind(field: FieldType) -> FieldKind {
    match field {
        FieldType::Text => FieldKind::Text,
        FieldType::Number => FieldKind::Number,
        FieldType::Date => FieldKind::Date,
    }
}

fn date_encoding(format: DateFormat) -> DateEncoding {
    match format {
        DateFormat::Calendar => DateEncoding::Calendar,
        DateFormat::Compact => DateEncoding::Compact,
    }
}

/// Table registry from the `[tables]` section
pub fn build_registry(config: &Config) -> Result<TableRegistry> {
    let mut registry = TableRegistry::new();

    for (name, table) in &config.tables {
        let mut schema =
            TableSchema::new(name, &table.date_column, date_encoding(table.date_format));
        for (field, kind) in &table.fields {
            schema = schema.with_field(field, field_kind(*kind));
        }
        if let Some(maturity) = &table.maturity_column {
            schema = schema.with_maturity_column(maturity);
        }
        registry
            .register(schema)
            .with_context(|| format!("invalid table '{}'", name))?;
    }

    Ok(registry)
}

/// Cache TTLs from the `[cache.ttl]` section
pub fn cache_ttls(config: &Config) -> CacheTtls {
    let ttl = &config.cache.ttl;
    CacheTtls {
        rows: ttl.rows(),
        aggregates: ttl.aggregates(),
        distinct: ttl.distinct(),
        snapshot: ttl.snapshot(),
    }
}

/// Engine over `backend` with the configured tables and cache policy
pub fn engine_with_backend(
    config: &Config,
    backend: Arc<dyn QueryBackend>,
) -> Result<AnalyticsEngine> {
    let cache = ReadThroughCache::new(backend, Arc::new(MemoryStore::new()))
        .with_namespace(&config.cache.namespace)
        .with_enabled(config.cache.enabled);
    let ctx = QueryContext::new(cache, build_registry(config)?, cache_ttls(config));
    Ok(AnalyticsEngine::from_context(ctx))
}

/// Engine connected to the configured ClickHouse store
pub fn build_engine(config: &Config) -> Result<AnalyticsEngine> {
    let backend_config = config
        .query
        .to_clickhouse()
        .context("invalid [query] section")?;

    tracing::info!(
        url = %backend_config.url,
        database = %backend_config.database,
        tables = config.tables.len(),
        cache = config.cache.enabled,
        "analytics engine ready"
    );

    engine_with_backend(config, Arc::new(ClickHouseBackend::new(&backend_config)))
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::str::FromStr;
    use std::time::Duration;

    use vantage_query::QueryResult;
    use vantage_query::test_utils::ScriptedBackend;

    use super::*;

    const CONFIG: &str = r#"
[cache]
namespace = "test"

[cache.ttl]
rows = 5

[tables.positions]
date_column = "as_of_date"
maturity_column = "maturity_date"

[tables.positions.fields]
desk = "text"
amount = "number"

[tables.trades]
date_column = "snap"
date_format = "compact"
"#;

    #[test]
    fn test_build_registry() {
        let config = Config::from_str(CONFIG).unwrap();
        let registry = build_registry(&config).unwrap();

        assert_eq!(registry.names(), vec!["positions", "trades"]);
        let positions = registry.get("positions").unwrap();
        assert_eq!(positions.field("amount").unwrap(), FieldKind::Number);
        assert_eq!(positions.field("maturity_date").unwrap(), FieldKind::Date);
        assert_eq!(positions.maturity_column(), Some("maturity_date"));
        assert_eq!(
            registry.get("trades").unwrap().date_encoding(),
            DateEncoding::Compact
        );
    }

    #[test]
    fn test_cache_ttls() {
        let config = Config::from_str(CONFIG).unwrap();
        let ttls = cache_ttls(&config);
        assert_eq!(ttls.rows, Duration::from_secs(5));
        assert_eq!(ttls.aggregates, Duration::from_secs(300));
    }

    #[test]
    fn test_engine_uses_namespace() {
        let config = Config::from_str(CONFIG).unwrap();
        let backend = ScriptedBackend::returning(QueryResult::empty()).shared();
        let engine = engine_with_backend(&config, backend).unwrap();

        assert_eq!(engine.context().cache().namespace(), "test");
        assert_eq!(engine.tables(), vec!["positions", "trades"]);
    }

    #[test]
    fn test_build_engine_requires_url() {
        let config = Config::from_str(CONFIG).unwrap();
        assert!(build_engine(&config).is_err());
    }

    #[test]
    fn test_load_explicit_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{}", CONFIG).unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert_eq!(config.tables.len(), 2);
        assert!(load_config(Some(Path::new("/nonexistent/vantage.toml"))).is_err());
    }
}
