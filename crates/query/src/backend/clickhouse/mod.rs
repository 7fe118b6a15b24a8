//! ClickHouse backend for querying analytics data
//!
//! Executes SQL against a ClickHouse database using the HTTP interface.
//! Bound parameters travel as `param_<name>` URL arguments and are matched
//! to `{name:Type}` placeholders server-side.

use std::time::Instant;

use async_trait::async_trait;

use crate::backend::{QueryBackend, validate_sql};
use crate::error::QueryError;
use crate::params::QueryParams;
use crate::result::{Column, DataType, QueryResult, Record};

// =============================================================================
// Configuration
// =============================================================================

/// ClickHouse backend configuration
#[derive(Debug, Clone)]
pub struct ClickHouseBackendConfig {
    /// ClickHouse HTTP URL (e.g., "http://localhost:8123")
    pub url: String,

    /// Database name
    pub database: String,

    /// Username for authentication (optional)
    pub username: Option<String>,

    /// Password for authentication (optional)
    pub password: Option<String>,

    /// Max execution time in seconds, enforced by the server
    pub max_execution_time: u64,
}

impl Default for ClickHouseBackendConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8123".into(),
            database: "default".into(),
            username: None,
            password: None,
            max_execution_time: 60,
        }
    }
}

impl ClickHouseBackendConfig {
    /// Create a new config with URL and database
    pub fn new(url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            ..Default::default()
        }
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the server-side execution limit
    pub fn with_max_execution_time(mut self, seconds: u64) -> Self {
        self.max_execution_time = seconds;
        self
    }
}

// =============================================================================
// Backend Implementation
// =============================================================================

/// ClickHouse backend for SQL queries using HTTP interface
#[derive(Clone)]
pub struct ClickHouseBackend {
    client: reqwest::Client,
    config: ClickHouseBackendConfig,
}

impl std::fmt::Debug for ClickHouseBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseBackend")
            .field("url", &self.config.url)
            .field("database", &self.config.database)
            .finish()
    }
}

impl ClickHouseBackend {
    /// Create a new ClickHouse backend from config
    pub fn new(config: &ClickHouseBackendConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config: config.clone(),
        }
    }

    /// Create from URL and database directly
    pub fn from_url(url: impl Into<String>, database: impl Into<String>) -> Self {
        let config = ClickHouseBackendConfig::new(url, database);
        Self::new(&config)
    }

    /// Build the query URL with settings and bound parameters
    fn build_url(&self, query: &str, params: &QueryParams) -> String {
        let mut url = format!(
            "{}/?database={}&max_execution_time={}",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(&self.config.database),
            self.config.max_execution_time
        );

        for param in params.iter() {
            url.push_str("&param_");
            url.push_str(&param.name);
            url.push('=');
            url.push_str(&urlencoding::encode(&param.value));
        }

        url.push_str("&query=");
        url.push_str(&urlencoding::encode(query));

        url
    }

    /// Execute a query and get the raw response body
    async fn execute_query(&self, sql: &str, params: &QueryParams) -> Result<String, QueryError> {
        let url = self.build_url(sql, params);

        let mut request = self.client.get(&url);

        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            request = request.basic_auth(user, Some(pass));
        }

        let response = request.send().await.map_err(|e| {
            QueryError::Connection(format!("ClickHouse connection failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Execution(format!(
                "ClickHouse error ({}): {}",
                status, body
            )));
        }

        response
            .text()
            .await
            .map_err(|e| QueryError::Execution(format!("failed to read response: {}", e)))
    }
}

#[async_trait]
impl QueryBackend for ClickHouseBackend {
    async fn execute(&self, sql: &str, params: &QueryParams) -> Result<QueryResult, QueryError> {
        validate_sql(sql)?;
        params.validate()?;

        let start = Instant::now();

        let query_with_format = format!("{} FORMAT JSONEachRow", sql.trim().trim_end_matches(';'));
        let response_text = self.execute_query(&query_with_format, params).await?;

        let execution_time_ms = start.elapsed().as_millis() as u64;

        let result = parse_json_each_row(&response_text, execution_time_ms)?;

        tracing::debug!(
            rows = result.row_count,
            cols = result.columns.len(),
            params = params.len(),
            time_ms = execution_time_ms,
            "ClickHouse query executed"
        );

        Ok(result)
    }

    async fn health_check(&self) -> Result<(), QueryError> {
        self.execute_query("SELECT 1", &QueryParams::new()).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "clickhouse"
    }
}

// =============================================================================
// Response Parsing
// =============================================================================

/// Parse a `JSONEachRow` body into a result
///
/// Columns are taken from the keys of the first row.
fn parse_json_each_row(body: &str, execution_time_ms: u64) -> Result<QueryResult, QueryError> {
    let records: Vec<Record> = body
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).map_err(|e| {
                QueryError::Serialization(format!("failed to parse JSON row: {}", e))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let Some(first_row) = records.first() else {
        return Ok(QueryResult::new(Vec::new(), Vec::new(), execution_time_ms));
    };

    let column_names: Vec<String> = first_row.keys().cloned().collect();

    let columns: Vec<Column> = column_names
        .iter()
        .map(|name| {
            let value = first_row.get(name).unwrap_or(&serde_json::Value::Null);
            Column::new(name.clone(), DataType::infer(value), true)
        })
        .collect();

    let rows: Vec<Vec<serde_json::Value>> = records
        .iter()
        .map(|row| {
            column_names
                .iter()
                .map(|name| row.get(name).cloned().unwrap_or(serde_json::Value::Null))
                .collect()
        })
        .collect();

    Ok(QueryResult::new(columns, rows, execution_time_ms))
}

/// URL encoding helper
mod urlencoding {
    pub fn encode(s: &str) -> String {
        let mut result = String::with_capacity(s.len() * 3);
        for byte in s.bytes() {
            match byte {
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                    result.push(byte as char);
                }
                _ => result.push_str(&format!("%{:02X}", byte)),
            }
        }
        result
    }
}
