//! Analytics error types

use thiserror::Error;

/// Analytics errors
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Table is not in the registry
    #[error("unknown table: {0}")]
    UnknownTable(String),

    /// Field is not in the table's allow-list
    #[error("unknown field '{field}' for table '{table}'")]
    UnknownField {
        /// Table name
        table: String,
        /// Rejected field
        field: String,
    },

    /// Weighted average without a weight field
    #[error("weightedAvg on '{0}' requires a weightField")]
    MissingWeightField(String),

    /// More auxiliary result slots than a grouped query carries
    #[error("at most 3 result slots are supported, got {0}")]
    TooManyResults(usize),

    /// Invalid table or field definition
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Filter value does not fit the field
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Malformed request
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid comparison period
    #[error("invalid period: {0}")]
    InvalidPeriod(String),

    /// Value out of range
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// Backend error (analytical store unreachable or query rejected)
    #[error("backend error: {0}")]
    Backend(#[from] vantage_query::QueryError),

    /// Cache store error (administrative operations only)
    #[error("cache error: {0}")]
    Cache(#[from] vantage_cache::CacheError),
}

impl AnalyticsError {
    /// Whether the request was rejected before reaching the store
    pub fn is_configuration_error(&self) -> bool {
        !matches!(self, Self::Backend(_) | Self::Cache(_))
    }

    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownTable(_) => "UNKNOWN_TABLE",
            Self::UnknownField { .. } => "UNKNOWN_FIELD",
            Self::MissingWeightField(_) => "MISSING_WEIGHT_FIELD",
            Self::TooManyResults(_) => "TOO_MANY_RESULTS",
            Self::InvalidSchema(_) => "INVALID_SCHEMA",
            Self::InvalidFilter(_) => "INVALID_FILTER",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidPeriod(_) => "INVALID_PERIOD",
            Self::OutOfRange(_) => "OUT_OF_RANGE",
            Self::Backend(_) => "BACKEND_ERROR",
            Self::Cache(_) => "CACHE_ERROR",
        }
    }
}

/// Result type for analytics operations
pub type Result<T> = std::result::Result<T, AnalyticsError>;
