//! Configuration validation
//!
//! Validates config consistency:
//! - Table, column and field names are plain identifiers
//! - A declared maturity column is not typed as something other than a date
//! - Cache TTLs are positive and the namespace is usable as a key prefix
//! - The query backend is one we can build

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::tables::FieldType;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_query(config)?;
    validate_cache(config)?;
    validate_tables(config)?;
    Ok(())
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Identifier, optionally qualified by a database (`db.table`)
fn is_table_name(s: &str) -> bool {
    match s.split_once('.') {
        Some((db, table)) => is_identifier(db) && is_identifier(table),
        None => is_identifier(s),
    }
}

fn validate_query(config: &Config) -> Result<()> {
    if let Some(backend) = config.query.backend.as_deref()
        && backend != "clickhouse"
    {
        return Err(ConfigError::invalid_value(
            "query",
            "backend",
            "backend",
            format!("unsupported backend '{}', expected 'clickhouse'", backend),
        ));
    }
    Ok(())
}

fn validate_cache(config: &Config) -> Result<()> {
    let cache = &config.cache;

    if cache.namespace.is_empty() {
        return Err(ConfigError::missing_field("cache", "cache", "namespace"));
    }
    if cache.namespace.contains([':', '*', '?', '[']) {
        return Err(ConfigError::invalid_value(
            "cache",
            "cache",
            "namespace",
            "must not contain ':' or glob characters",
        ));
    }

    for (name, secs) in cache.ttl.entries() {
        if secs == 0 {
            return Err(ConfigError::invalid_value(
                "cache",
                "ttl",
                "ttl",
                format!("{} must be at least 1 second", name),
            ));
        }
    }

    Ok(())
}

fn validate_tables(config: &Config) -> Result<()> {
    for (name, table) in &config.tables {
        if !is_table_name(name) {
            return Err(ConfigError::invalid_value(
                "table",
                name,
                "name",
                "expected an identifier, optionally prefixed by a database",
            ));
        }

        if table.date_column.is_empty() {
            return Err(ConfigError::missing_field("table", name, "date_column"));
        }
        if !is_identifier(&table.date_column) {
            return Err(ConfigError::invalid_value(
                "table",
                name,
                "date_column",
                format!("'{}' is not an identifier", table.date_column),
            ));
        }

        if let Some(maturity) = &table.maturity_column {
            if !is_identifier(maturity) {
                return Err(ConfigError::invalid_value(
                    "table",
                    name,
                    "maturity_column",
                    format!("'{}' is not an identifier", maturity),
                ));
            }
            if let Some(kind) = table.fields.get(maturity)
                && *kind != FieldType::Date
            {
                return Err(ConfigError::invalid_value(
                    "table",
                    name,
                    "maturity_column",
                    format!("'{}' is declared as {:?}, expected date", maturity, kind),
                ));
            }
        }

        if let Some(field) = table.fields.keys().find(|f| !is_identifier(f)) {
            return Err(ConfigError::invalid_value(
                "table",
                name,
                "fields",
                format!("'{}' is not an identifier", field),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_identifiers() {
        assert!(is_identifier("as_of_date"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("desk; DROP"));
        assert!(!is_identifier(""));
        assert!(is_table_name("finance.positions"));
        assert!(!is_table_name("a.b.c"));
    }

    #[test]
    fn test_bad_table_name() {
        let toml = r#"
[tables."positions;"]
date_column = "as_of_date"
"#;
        assert!(matches!(
            Config::from_str(toml),
            Err(ConfigError::InvalidValue { field: "name", .. })
        ));
    }

    #[test]
    fn test_empty_date_column() {
        let toml = r#"
[tables.positions]
date_column = ""
"#;
        assert!(matches!(
            Config::from_str(toml),
            Err(ConfigError::MissingField { field: "date_column", .. })
        ));
    }

    #[test]
    fn test_maturity_column_must_be_date() {
        let toml = r#"
[tables.positions]
date_column = "as_of_date"
maturity_column = "maturity"

[tables.positions.fields]
maturity = "text"
"#;
        assert!(matches!(
            Config::from_str(toml),
            Err(ConfigError::InvalidValue { field: "maturity_column", .. })
        ));
    }

    #[test]
    fn test_bad_field_name() {
        let toml = r#"
[tables.positions]
date_column = "as_of_date"

[tables.positions.fields]
"amount)" = "number"
"#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_zero_ttl() {
        let toml = r#"
[cache.ttl]
distinct = 0
"#;
        let err = Config::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn test_namespace_with_separator() {
        let toml = r#"
[cache]
namespace = "a:b"
"#;
        assert!(Config::from_str(toml).is_err());
    }

    #[test]
    fn test_unsupported_backend() {
        let toml = r#"
[query]
backend = "duckdb"
"#;
        assert!(Config::from_str(toml).is_err());
    }
}
