//! Request filters
//!
//! A filter is `{field, operator, values}` as sent by dashboard pages. The
//! operator vocabulary is the one filter pickers display ("is any of",
//! "does not contain", ...) plus terse snake_case and symbol spellings.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    /// Field name to filter on
    pub field: String,
    /// Operator for comparison
    pub operator: Operator,
    /// Values to compare against
    #[serde(default)]
    pub values: Vec<String>,
}

impl Filter {
    /// Create a filter
    pub fn new(field: impl Into<String>, operator: Operator, values: Vec<String>) -> Self {
        Self {
            field: field.into(),
            operator,
            values,
        }
    }

    /// Create an equality filter
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Operator::Equals, vec![value.into()])
    }

    /// Create a not-equal filter
    pub fn ne(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Operator::NotEquals, vec![value.into()])
    }

    /// Create a contains filter
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(field, Operator::Contains, vec![value.into()])
    }

    /// Create an IN filter
    pub fn one_of<I, S>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            field,
            Operator::OneOf,
            values.into_iter().map(Into::into).collect(),
        )
    }

    /// Whether the filter contributes nothing
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Filter operators
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Operator {
    /// Equal (`is`)
    Equals,
    /// Not equal (`is not`)
    NotEquals,
    /// In list (`is any of`)
    OneOf,
    /// Contains substring
    Contains,
    /// Does not contain substring
    NotContains,
    /// Contains every value (`includes all`)
    AllOf,
    /// Contains at least one value (`includes any`)
    AnyOf,
    /// Contains none of the values (`excludes all`)
    NoneOf,
    /// Less than (`is before`)
    LessThan,
    /// Greater than (`is after`)
    GreaterThan,
    /// Less than or equal (`is on or before`)
    LessOrEqual,
    /// Greater than or equal (`is on or after`)
    GreaterOrEqual,
    /// Operator text nobody recognised; compiled as equality
    Unrecognized(String),
}

impl Operator {
    /// Parse operator from string
    ///
    /// Never fails: unknown text becomes [`Operator::Unrecognized`].
    pub fn parse(s: &str) -> Self {
        let normalized = s.trim().to_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "is" | "eq" | "equals" | "=" | "==" => Self::Equals,
            "is not" | "ne" | "not equals" | "!=" | "<>" => Self::NotEquals,
            "is any of" | "one of" | "in" => Self::OneOf,
            "contains" | "like" => Self::Contains,
            "does not contain" | "not contains" | "not like" => Self::NotContains,
            "includes all" | "all of" => Self::AllOf,
            "includes any" | "any of" => Self::AnyOf,
            "excludes all" | "none of" => Self::NoneOf,
            "is before" | "lt" | "less than" | "<" => Self::LessThan,
            "is after" | "gt" | "greater than" | ">" => Self::GreaterThan,
            "is on or before" | "lte" | "less or equal" | "<=" => Self::LessOrEqual,
            "is on or after" | "gte" | "greater or equal" | ">=" => Self::GreaterOrEqual,
            _ => Self::Unrecognized(s.to_string()),
        }
    }

    /// Canonical spelling
    pub fn as_str(&self) -> &str {
        match self {
            Self::Equals => "is",
            Self::NotEquals => "is not",
            Self::OneOf => "is any of",
            Self::Contains => "contains",
            Self::NotContains => "does not contain",
            Self::AllOf => "includes all",
            Self::AnyOf => "includes any",
            Self::NoneOf => "excludes all",
            Self::LessThan => "is before",
            Self::GreaterThan => "is after",
            Self::LessOrEqual => "is on or before",
            Self::GreaterOrEqual => "is on or after",
            Self::Unrecognized(s) => s,
        }
    }

    /// SQL comparison symbol for ordering operators
    pub fn comparison_symbol(&self) -> Option<&'static str> {
        match self {
            Self::LessThan => Some("<"),
            Self::GreaterThan => Some(">"),
            Self::LessOrEqual => Some("<="),
            Self::GreaterOrEqual => Some(">="),
            _ => None,
        }
    }

    /// Whether values are matched as substrings
    pub fn is_substring(&self) -> bool {
        matches!(
            self,
            Self::Contains | Self::NotContains | Self::AllOf | Self::AnyOf | Self::NoneOf
        )
    }
}

impl From<String> for Operator {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Operator> for String {
    fn from(op: Operator) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
