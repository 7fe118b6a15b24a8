//! Request and response envelopes
//!
//! Requests arrive as JSON tagged by `kind`; responses wrap the payload with
//! the snapshots it was computed against, or carry an error body.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::filter::Filter;
use crate::future::FutureSpec;
use crate::historical::HistoricalSpec;
use crate::measure::GroupMeasureSpec;
use crate::period::{ComparePeriod, comparison_target};
use crate::rows::{DistinctRequest, DistinctValues, RowsPage, RowsRequest};
use crate::series::{FutureSeries, GroupedRow, HistoricalSeries, StatMetric};
use crate::stat::StatSpec;

/// As-of date and comparison period of a two-period request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Window {
    /// As-of date; today when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<NaiveDate>,
    /// Comparison period; previous month when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<ComparePeriod>,
    /// Explicit comparison date, overrides `period`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_date: Option<NaiveDate>,
}

impl Window {
    /// Window ending at `as_of`
    pub fn as_of(as_of: NaiveDate) -> Self {
        Self {
            as_of_date: Some(as_of),
            ..Self::default()
        }
    }

    /// Compare against a period
    pub fn with_period(mut self, period: ComparePeriod) -> Self {
        self.period = Some(period);
        self
    }

    /// Compare against a fixed date
    pub fn with_compare_date(mut self, date: NaiveDate) -> Self {
        self.compare_date = Some(date);
        self
    }

    /// Current and comparison target dates, before snapshot resolution
    pub fn targets(&self, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
        let as_of = self.as_of_date.unwrap_or(today);
        let comparison = comparison_target(as_of, self.period, self.compare_date)?;
        Ok((as_of, comparison))
    }
}

/// Grouped breakdown request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedRequest {
    /// Measure, result slots and ordering
    #[serde(flatten)]
    pub spec: GroupMeasureSpec,
    /// Grouping field
    pub group_by: String,
    /// Filters
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Periods compared
    #[serde(flatten)]
    pub window: Window,
}

/// Stat card request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatRequest {
    /// Measures reported
    #[serde(flatten)]
    pub spec: StatSpec,
    /// Filters
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Periods compared
    #[serde(flatten)]
    pub window: Window,
}

/// Historical series request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalRequest {
    /// Measure, grouping and range
    #[serde(flatten)]
    pub spec: HistoricalSpec,
    /// Filters
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Base date; today when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<NaiveDate>,
}

/// Future series request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FutureRequest {
    /// Measure, maturity field and grouping
    #[serde(flatten)]
    pub spec: FutureSpec,
    /// Filters
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Projection start; today when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of_date: Option<NaiveDate>,
}

/// Any analytics request, tagged by `kind`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AnalyticsRequest {
    /// Grouped breakdown with top 11 + Others
    Grouped(GroupedRequest),
    /// Stat card
    Stat(StatRequest),
    /// Series over past snapshots
    Historical(HistoricalRequest),
    /// Maturity profile
    Future(FutureRequest),
    /// Raw row browsing
    Rows(RowsRequest),
    /// Distinct values of a field
    Distinct(DistinctRequest),
}

impl AnalyticsRequest {
    /// Parse a request from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AnalyticsError::InvalidRequest(e.to_string()))
    }

    /// Request kind, as tagged on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Grouped(_) => "grouped",
            Self::Stat(_) => "stat",
            Self::Historical(_) => "historical",
            Self::Future(_) => "future",
            Self::Rows(_) => "rows",
            Self::Distinct(_) => "distinct",
        }
    }

    /// Table the request reads
    pub fn table(&self) -> &str {
        match self {
            Self::Grouped(r) => &r.spec.table,
            Self::Stat(r) => &r.spec.table,
            Self::Historical(r) => &r.spec.table,
            Self::Future(r) => &r.spec.table,
            Self::Rows(r) => &r.table,
            Self::Distinct(r) => &r.table,
        }
    }
}

/// Payload of a successful response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResponseData {
    /// One row per group, `Others` last when consolidated
    Grouped(Vec<GroupedRow>),
    /// One metric per requested measure
    Stat(Vec<StatMetric>),
    /// Per-snapshot series up to the as-of snapshot
    Historical(HistoricalSeries),
    /// Monthly maturity buckets
    Future(FutureSeries),
    /// A page of raw rows
    Rows(RowsPage),
    /// Distinct values of one field
    Distinct(DistinctValues),
}

/// Context of a successful response
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    /// Table read
    pub table: String,
    /// Requested as-of date
    pub as_of_date: NaiveDate,
    /// Snapshot the current values come from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_snapshot: Option<NaiveDate>,
    /// Snapshot the comparison values come from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison_snapshot: Option<NaiveDate>,
    /// Cache TTL applied to the payload
    pub ttl_secs: u64,
    /// Time spent answering
    pub elapsed_ms: u64,
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    /// Error code (machine-readable)
    pub code: &'static str,
    /// Error message (human-readable)
    pub message: String,
}

impl From<&AnalyticsError> for ErrorBody {
    fn from(err: &AnalyticsError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

/// Response envelope: `{data, meta}` or `{error}`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Success { data: ResponseData, meta: Meta },
    Failure { error: ErrorBody },
}

impl Envelope {
    /// Wrap an error
    pub fn error(err: &AnalyticsError) -> Self {
        Self::Failure { error: err.into() }
    }

    /// Whether this carries data
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> String {
        // Every payload is plain data with string keys
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"error":{{"code":"INTERNAL_ERROR","message":"{}"}}}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}
