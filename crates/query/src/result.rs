//! Query result types
//!
//! Backend-agnostic result format. Also the exact value the read-through
//! cache serializes, so it must round-trip through JSON unchanged.

use serde::{Deserialize, Serialize};

/// A single row as a column-name to value mapping
pub type Record = serde_json::Map<String, serde_json::Value>;

/// Unified query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Column definitions
    pub columns: Vec<Column>,

    /// Row data as JSON values, in column order
    pub rows: Vec<Vec<serde_json::Value>>,

    /// Total row count
    pub row_count: usize,

    /// Query execution time in milliseconds
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Create a new query result
    pub fn new(
        columns: Vec<Column>,
        rows: Vec<Vec<serde_json::Value>>,
        execution_time_ms: u64,
    ) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            execution_time_ms,
        }
    }

    /// Create an empty result
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new(), 0)
    }

    /// Build a result from records, taking column order from `column_names`
    pub fn from_records(column_names: &[&str], records: &[Record]) -> Self {
        let columns = column_names
            .iter()
            .map(|name| {
                let sample = records
                    .iter()
                    .find_map(|r| r.get(*name).filter(|v| !v.is_null()))
                    .unwrap_or(&serde_json::Value::Null);
                Column::new(*name, DataType::infer(sample), true)
            })
            .collect();

        let rows = records
            .iter()
            .map(|record| {
                column_names
                    .iter()
                    .map(|name| record.get(*name).cloned().unwrap_or(serde_json::Value::Null))
                    .collect()
            })
            .collect();

        Self::new(columns, rows, 0)
    }

    /// Check if result is empty
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get column names
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Value at (row, column name)
    pub fn value(&self, row: usize, column: &str) -> Option<&serde_json::Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    /// Rows as column-name to value mappings
    pub fn records(&self) -> Vec<Record> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row.iter())
                    .map(|(col, value)| (col.name.clone(), value.clone()))
                    .collect()
            })
            .collect()
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,

    /// Data type
    pub data_type: DataType,

    /// Whether the column is nullable
    pub nullable: bool,
}

impl Column {
    /// Create a new column definition
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

/// Data types supported in query results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Signed 64-bit integer
    Int64,
    /// Unsigned 64-bit integer
    UInt64,
    /// 64-bit floating point
    Float64,
    /// UTF-8 string (dates arrive as strings over JSONEachRow)
    String,
    /// Boolean
    Boolean,
    /// JSON array or object
    Json,
    /// Unknown/other type
    Unknown,
}

impl DataType {
    /// Infer a data type from a JSON value
    pub fn infer(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DataType::Unknown,
            serde_json::Value::Bool(_) => DataType::Boolean,
            serde_json::Value::Number(n) => {
                if n.is_f64() {
                    DataType::Float64
                } else if n.is_u64() {
                    DataType::UInt64
                } else {
                    DataType::Int64
                }
            }
            serde_json::Value::String(_) => DataType::String,
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => DataType::Json,
        }
    }
}
