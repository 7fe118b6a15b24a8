//! Bound query parameters
//!
//! Values never get spliced into SQL text. Builders emit ClickHouse
//! placeholders (`{name:Type}`) and carry the values alongside; the backend
//! sends them as `param_<name>` arguments of the HTTP request.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// ClickHouse type a parameter is bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// UTF-8 string
    String,
    /// 64-bit float
    Float64,
    /// Calendar date (`YYYY-MM-DD`)
    Date,
}

impl ParamType {
    /// ClickHouse type name used in the placeholder
    pub fn clickhouse_type(&self) -> &'static str {
        match self {
            Self::String => "String",
            Self::Float64 => "Float64",
            Self::Date => "Date",
        }
    }
}

/// A single named, typed parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryParam {
    /// Parameter name (alphanumeric and underscore only)
    pub name: String,
    /// Bound type
    pub param_type: ParamType,
    /// Value in ClickHouse text form
    pub value: String,
}

impl QueryParam {
    /// Placeholder text for this parameter, e.g. `{p0:String}`
    pub fn placeholder(&self) -> String {
        format!("{{{}:{}}}", self.name, self.param_type.clickhouse_type())
    }
}

/// Ordered set of bound parameters for one query
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QueryParams(Vec<QueryParam>);

impl QueryParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Bind a value and return its placeholder
    pub fn bind(
        &mut self,
        name: impl Into<String>,
        param_type: ParamType,
        value: impl Into<String>,
    ) -> String {
        let param = QueryParam {
            name: name.into(),
            param_type,
            value: value.into(),
        };
        let placeholder = param.placeholder();
        self.0.push(param);
        placeholder
    }

    /// Append every parameter from another set
    pub fn extend(&mut self, other: QueryParams) {
        self.0.extend(other.0);
    }

    /// Look up a parameter by name
    pub fn get(&self, name: &str) -> Option<&QueryParam> {
        self.0.iter().find(|p| p.name == name)
    }

    /// Iterate parameters in bind order
    pub fn iter(&self) -> impl Iterator<Item = &QueryParam> {
        self.0.iter()
    }

    /// Number of bound parameters
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no parameters are bound
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check names are safe for URL keys and placeholders, and unique
    pub fn validate(&self) -> Result<(), QueryError> {
        for (i, param) in self.0.iter().enumerate() {
            if param.name.is_empty()
                || !param
                    .name
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return Err(QueryError::InvalidParam {
                    name: param.name.clone(),
                    reason: "names must be alphanumeric or underscore".to_string(),
                });
            }
            if self.0[..i].iter().any(|p| p.name == param.name) {
                return Err(QueryError::InvalidParam {
                    name: param.name.clone(),
                    reason: "bound more than once".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Render SQL with quoted literals substituted for placeholders
    ///
    /// For logs and debugging only. Never send the output to a backend.
    pub fn inline(&self, sql: &str) -> String {
        let mut rendered = sql.to_string();
        for param in &self.0 {
            let literal = match param.param_type {
                ParamType::Float64 => param.value.clone(),
                ParamType::String | ParamType::Date => {
                    format!("'{}'", param.value.replace('\\', "\\\\").replace('\'', "\\'"))
                }
            };
            rendered = rendered.replace(&param.placeholder(), &literal);
        }
        rendered
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|p| format!("{}={}", p.name, p.value))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}
