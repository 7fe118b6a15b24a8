//! Query backend trait and implementations

pub mod clickhouse;

use async_trait::async_trait;

use crate::error::QueryError;
use crate::params::QueryParams;
use crate::result::QueryResult;

/// Query backend trait
///
/// The analytical store boundary. Implementations execute a finished query
/// with its bound parameters and return rows. Timeouts and any retry policy
/// belong here, not to callers.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Execute a SQL query with bound parameters
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, QueryError>;

    /// Check if backend is available
    async fn health_check(&self) -> Result<(), QueryError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Validate SQL query - only allow SELECT and WITH (CTE) queries
///
/// Builders in this workspace only ever produce reads; this catches a
/// hand-written query that would not.
pub fn validate_sql(sql: &str) -> Result<(), QueryError> {
    let trimmed = sql.trim();
    let upper = trimmed.to_uppercase();

    if !upper.starts_with("SELECT") && !upper.starts_with("WITH") {
        return Err(QueryError::InvalidSql(
            "only SELECT and WITH queries are allowed".to_string(),
        ));
    }

    // SELECT ... INTO creates tables in some databases
    if upper.contains(" INTO ") && !upper.contains("INSERT INTO") {
        return Err(QueryError::InvalidSql(
            "SELECT INTO is not allowed".to_string(),
        ));
    }

    // Trailing semicolon is fine, a second statement is not
    if trimmed.contains(';') && !trimmed.ends_with(';') {
        return Err(QueryError::InvalidSql(
            "multiple statements not allowed".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_sql_select() {
        assert!(validate_sql("SELECT * FROM positions").is_ok());
        assert!(validate_sql("  SELECT count(*) FROM trades  ").is_ok());
        assert!(validate_sql("select * from positions").is_ok());
    }

    #[test]
    fn test_validate_sql_with() {
        assert!(validate_sql("WITH cte AS (SELECT 1) SELECT * FROM cte").is_ok());
    }

    #[test]
    fn test_validate_sql_invalid() {
        assert!(validate_sql("INSERT INTO positions VALUES (1)").is_err());
        assert!(validate_sql("DELETE FROM positions").is_err());
        assert!(validate_sql("DROP TABLE positions").is_err());
        assert!(validate_sql("ALTER TABLE positions ADD COLUMN x INT").is_err());
    }

    #[test]
    fn test_validate_sql_multiple_statements() {
        assert!(validate_sql("SELECT 1; DROP TABLE positions").is_err());
    }

    #[test]
    fn test_validate_sql_trailing_semicolon_ok() {
        assert!(validate_sql("SELECT * FROM positions;").is_ok());
    }

    #[test]
    fn test_validate_sql_select_into_blocked() {
        assert!(validate_sql("SELECT * INTO backup FROM positions").is_err());
    }

    #[test]
    fn test_validate_sql_placeholders_ok() {
        assert!(validate_sql("SELECT * FROM positions WHERE desk = {p0:String}").is_ok());
    }
}
