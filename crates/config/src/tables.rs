//! Table declarations
//!
//! Each table lists the fields requests may reference; anything else is
//! rejected before SQL is built.

use std::collections::BTreeMap;

use serde::Deserialize;

/// Declared type of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Free text, grouped and matched by substring
    Text,
    /// Numeric, aggregated
    Number,
    /// Calendar date
    Date,
}

/// How a table stores its snapshot date
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFormat {
    /// `Date` column, `YYYY-MM-DD` (default)
    #[default]
    Calendar,
    /// String column, `YYYYMMDD`
    Compact,
}

/// One snapshot table
///
/// ```toml
/// [tables.positions]
/// date_column = "as_of_date"
/// maturity_column = "maturity_date"
///
/// [tables.positions.fields]
/// desk = "text"
/// amount = "number"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TableConfig {
    /// Snapshot date column
    pub date_column: String,

    /// Storage of the snapshot date
    /// Default: calendar
    #[serde(default)]
    pub date_format: DateFormat,

    /// Maturity date column for future series
    #[serde(default)]
    pub maturity_column: Option<String>,

    /// Queryable fields and their types
    #[serde(default)]
    pub fields: BTreeMap<String, FieldType>,
}
