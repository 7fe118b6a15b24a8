//! Result data types
//!
//! Shapes returned by the aggregators: grouped rows with period comparison,
//! stat metrics, and historical and future time series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Comparison between current and previous period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    /// Current period value
    pub current: f64,
    /// Previous period value
    pub previous: f64,
    /// Absolute change (current - previous)
    pub change: f64,
    /// Percent change, zero when there is no previous value
    pub change_percent: f64,
}

impl Comparison {
    /// Calculate comparison from current and previous values
    pub fn between(current: f64, previous: f64) -> Self {
        let change = current - previous;
        let change_percent = if previous != 0.0 {
            (change / previous) * 100.0
        } else {
            0.0
        };

        Self {
            current,
            previous,
            change,
            change_percent,
        }
    }
}

/// An auxiliary result slot of a grouped row
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultValue {
    /// Current period value
    pub current: f64,
    /// Previous period value
    pub previous: f64,
}

/// One group of a grouped breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupedRow {
    /// Group label
    pub group: String,
    /// Main aggregate, current period
    pub current: f64,
    /// Main aggregate, comparison period
    pub previous: f64,
    /// `current - previous`
    pub change: f64,
    /// Percent change, zero-guarded
    pub change_percent: f64,
    /// Auxiliary results (`result1..result3`)
    pub results: Vec<ResultValue>,
    /// Share of the full current-period total
    pub percentage_of_total: f64,
    /// Synthetic bucket of consolidated groups
    pub is_others: bool,
}

impl GroupedRow {
    /// Build a row, deriving the comparison fields
    pub fn new(
        group: impl Into<String>,
        current: f64,
        previous: f64,
        results: Vec<ResultValue>,
        grand_total: f64,
    ) -> Self {
        let comparison = Comparison::between(current, previous);
        let percentage_of_total = if grand_total != 0.0 {
            current / grand_total * 100.0
        } else {
            0.0
        };

        Self {
            group: group.into(),
            current,
            previous,
            change: comparison.change,
            change_percent: comparison.change_percent,
            results,
            percentage_of_total,
            is_others: false,
        }
    }

    /// Mark as the consolidated bucket
    pub fn into_others(mut self) -> Self {
        self.is_others = true;
        self
    }
}

/// One metric of a stat card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatMetric {
    /// Report name
    pub name: String,
    /// Values and change
    #[serde(flatten)]
    pub comparison: Comparison,
}

/// One snapshot of a historical series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    /// Snapshot date
    pub date: NaiveDate,
    /// Sum across groups
    pub total: f64,
    /// Per-group values, in series group order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<GroupValue>,
}

/// A group's value at one point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupValue {
    /// Group label
    pub group: String,
    /// Value
    pub value: f64,
}

/// Aggregate per snapshot up to a base date
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSeries {
    /// Group labels present in the series, largest first
    pub groups: Vec<String>,
    /// Points ascending by date
    pub points: Vec<HistoricalPoint>,
}

impl HistoricalSeries {
    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Get number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }
}

/// One monthly bucket of a future series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturePoint {
    /// First day of the maturity month
    pub month: NaiveDate,
    /// Amount maturing in the month
    pub amount: f64,
    /// Amount matured up to and including the month
    pub cumulative: f64,
    /// Amount still outstanding after the month
    pub remaining: f64,
}

/// Monthly maturity profile, optionally per group
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FutureSeries {
    /// Buckets across all groups
    pub total: Vec<FuturePoint>,
    /// Per-group buckets, largest group first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<FutureGroup>,
}

/// One group's maturity profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FutureGroup {
    /// Group label
    pub group: String,
    /// Buckets ascending by month
    pub points: Vec<FuturePoint>,
}

/// Turn ascending monthly amounts into cumulative and remaining values
///
/// `remaining` is the reverse cumulative sum: total minus amount so far.
pub fn cumulate(buckets: &[(NaiveDate, f64)]) -> Vec<FuturePoint> {
    let total: f64 = buckets.iter().map(|(_, amount)| amount).sum();
    let mut running = 0.0;

    buckets
        .iter()
        .map(|&(month, amount)| {
            running += amount;
            FuturePoint {
                month,
                amount,
                cumulative: running,
                remaining: total - running,
            }
        })
        .collect()
}
