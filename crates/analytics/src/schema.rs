//! Table schemas and the static table registry
//!
//! Every field that may appear in a filter, group-by or measure must be
//! declared here. Request input never reaches SQL as an identifier unless it
//! matched a declared field.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vantage_query::{ParamType, QueryParams};

use crate::error::{AnalyticsError, Result};

/// Kind of a declared field, deciding how filter values are bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Free text / categorical
    Text,
    /// Numeric
    Number,
    /// Calendar date
    Date,
}

impl FieldKind {
    /// Parameter type for values compared against this field
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Text => ParamType::String,
            Self::Number => ParamType::Float64,
            Self::Date => ParamType::Date,
        }
    }
}

/// How a table stores its snapshot dates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateEncoding {
    /// `Date` column, `YYYY-MM-DD`
    #[default]
    Calendar,
    /// String column, `YYYYMMDD`
    Compact,
}

impl DateEncoding {
    /// Parameter type used to bind snapshot dates
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Calendar => ParamType::Date,
            Self::Compact => ParamType::String,
        }
    }

    /// Format a date in this encoding
    pub fn format(&self, date: NaiveDate) -> String {
        match self {
            Self::Calendar => date.format("%Y-%m-%d").to_string(),
            Self::Compact => date.format("%Y%m%d").to_string(),
        }
    }

    /// Parse a stored value
    ///
    /// Both layouts are accepted whatever the declared encoding, and a time
    /// suffix is ignored. The epoch counts as "no date": it is what an empty
    /// non-nullable aggregate returns.
    pub fn parse(&self, s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        let date = if s.len() == 8 && s.bytes().all(|b| b.is_ascii_digit()) {
            NaiveDate::parse_from_str(s, "%Y%m%d").ok()
        } else {
            s.get(..10)
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        }?;

        if date == NaiveDate::default() {
            None
        } else {
            Some(date)
        }
    }
}

/// One table's static configuration
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    name: String,
    date_column: String,
    date_encoding: DateEncoding,
    maturity_column: Option<String>,
    fields: BTreeMap<String, FieldKind>,
}

impl TableSchema {
    /// Create a schema; the date column is declared as a field
    pub fn new(
        name: impl Into<String>,
        date_column: impl Into<String>,
        date_encoding: DateEncoding,
    ) -> Self {
        let date_column = date_column.into();
        let date_kind = match date_encoding {
            DateEncoding::Calendar => FieldKind::Date,
            DateEncoding::Compact => FieldKind::Text,
        };
        let mut fields = BTreeMap::new();
        fields.insert(date_column.clone(), date_kind);

        Self {
            name: name.into(),
            date_column,
            date_encoding,
            maturity_column: None,
            fields,
        }
    }

    /// Declare a field
    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), kind);
        self
    }

    /// Declare the maturity date column used by forward-looking series
    pub fn with_maturity_column(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.fields.insert(name.clone(), FieldKind::Date);
        self.maturity_column = Some(name);
        self
    }

    /// Table name as used in SQL
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot date column
    pub fn date_column(&self) -> &str {
        &self.date_column
    }

    /// Snapshot date encoding
    pub fn date_encoding(&self) -> DateEncoding {
        self.date_encoding
    }

    /// Maturity column, if declared
    pub fn maturity_column(&self) -> Option<&str> {
        self.maturity_column.as_deref()
    }

    /// Declared fields, sorted by name
    pub fn fields(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        self.fields.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    /// Look up a field in the allow-list
    pub fn field(&self, name: &str) -> Result<FieldKind> {
        self.fields
            .get(name)
            .copied()
            .ok_or_else(|| AnalyticsError::UnknownField {
                table: self.name.clone(),
                field: name.to_string(),
            })
    }

    /// Bind a snapshot date and return its placeholder
    pub fn bind_date(&self, params: &mut QueryParams, name: &str, date: NaiveDate) -> String {
        params.bind(
            name,
            self.date_encoding.param_type(),
            self.date_encoding.format(date),
        )
    }

    /// Check names are plain identifiers
    pub fn validate(&self) -> Result<()> {
        if !is_table_identifier(&self.name) {
            return Err(AnalyticsError::InvalidSchema(format!(
                "table name '{}' is not an identifier",
                self.name
            )));
        }
        for name in self.fields.keys() {
            if !is_identifier(name) {
                return Err(AnalyticsError::InvalidSchema(format!(
                    "field '{}' of table '{}' is not an identifier",
                    name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// Registry of every queryable table, built once at startup
#[derive(Debug, Clone, Default)]
pub struct TableRegistry {
    tables: HashMap<String, TableSchema>,
}

impl TableRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a table after validating it
    pub fn register(&mut self, schema: TableSchema) -> Result<()> {
        schema.validate()?;
        self.tables.insert(schema.name.clone(), schema);
        Ok(())
    }

    /// Builder form of [`register`](Self::register)
    pub fn with_table(mut self, schema: TableSchema) -> Result<Self> {
        self.register(schema)?;
        Ok(self)
    }

    /// Look up a table
    pub fn get(&self, name: &str) -> Result<&TableSchema> {
        self.tables
            .get(name)
            .ok_or_else(|| AnalyticsError::UnknownTable(name.to_string()))
    }

    /// Table names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Check if no tables are registered
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Table names may carry a database prefix (`finance.positions`)
fn is_table_identifier(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() <= 2 && parts.iter().all(|p| is_identifier(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positions() -> TableSchema {
        TableSchema::new("positions", "as_of_date", DateEncoding::Calendar)
            .with_field("desk", FieldKind::Text)
            .with_field("amount", FieldKind::Number)
    }

    #[test]
    fn test_date_column_is_declared() {
        let schema = positions();
        assert_eq!(schema.field("as_of_date").unwrap(), FieldKind::Date);

        let compact = TableSchema::new("trades", "snap", DateEncoding::Compact);
        assert_eq!(compact.field("snap").unwrap(), FieldKind::Text);
    }

    #[test]
    fn test_unknown_field() {
        let err = positions().field("pnl; DROP TABLE x").unwrap_err();
        assert!(matches!(err, AnalyticsError::UnknownField { .. }));
    }

    #[test]
    fn test_maturity_column() {
        let schema = positions().with_maturity_column("maturity_date");
        assert_eq!(schema.maturity_column(), Some("maturity_date"));
        assert_eq!(schema.field("maturity_date").unwrap(), FieldKind::Date);
    }

    #[test]
    fn test_encoding_format_and_parse() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(DateEncoding::Calendar.format(date), "2024-03-01");
        assert_eq!(DateEncoding::Compact.format(date), "20240301");

        assert_eq!(DateEncoding::Calendar.parse("2024-03-01"), Some(date));
        assert_eq!(DateEncoding::Calendar.parse("2024-03-01 00:00:00"), Some(date));
        assert_eq!(DateEncoding::Compact.parse("20240301"), Some(date));
        assert_eq!(DateEncoding::Calendar.parse("1970-01-01"), None);
        assert_eq!(DateEncoding::Calendar.parse(""), None);
        assert_eq!(DateEncoding::Compact.parse("garbage"), None);
    }

    #[test]
    fn test_registry() {
        let registry = TableRegistry::new()
            .with_table(positions())
            .unwrap()
            .with_table(TableSchema::new("finance.cashflows", "snap", DateEncoding::Compact))
            .unwrap();

        assert_eq!(registry.names(), vec!["finance.cashflows", "positions"]);
        assert!(registry.get("positions").is_ok());
        assert!(matches!(
            registry.get("missing"),
            Err(AnalyticsError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_registry_rejects_bad_identifiers() {
        let bad_field = positions().with_field("desk name", FieldKind::Text);
        assert!(TableRegistry::new().register(bad_field).is_err());

        let bad_table = TableSchema::new("a.b.c", "d", DateEncoding::Calendar);
        assert!(TableRegistry::new().register(bad_table).is_err());
    }
}
