//! Future series: maturity profile of one snapshot
//!
//! Buckets a measure by maturity month from the snapshot date onward, then
//! derives what is still outstanding after each month with a reverse
//! cumulative sum.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vantage_cache::fingerprint;
use vantage_query::ParamType;

use crate::builder::{BuiltQuery, QueryBuilder};
use crate::context::QueryContext;
use crate::error::{AnalyticsError, Result};
use crate::filter::Filter;
use crate::measure::MeasureSpec;
use crate::predicate::{Predicate, compile};
use crate::schema::{DateEncoding, FieldKind, TableSchema};
use crate::series::{FutureGroup, FutureSeries, cumulate};
use crate::topn::{GroupValues, MergeRule};
use crate::value::{as_date, as_label, as_number};

/// A future series request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FutureSpec {
    /// Source table
    pub table: String,
    /// Aggregate per month
    #[serde(flatten)]
    pub measure: MeasureSpec,
    /// Maturity date field; the table's maturity column when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_field: Option<String>,
    /// Optional breakdown field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
}

impl FutureSpec {
    /// Create an ungrouped series on the table's maturity column
    pub fn new(table: impl Into<String>, measure: MeasureSpec) -> Self {
        Self {
            table: table.into(),
            measure,
            maturity_field: None,
            group_by: None,
        }
    }

    /// Use a specific maturity field
    pub fn with_maturity_field(mut self, field: impl Into<String>) -> Self {
        self.maturity_field = Some(field.into());
        self
    }

    /// Break down by a field
    pub fn with_group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }
}

/// A validated future request
pub struct FutureQuery<'a> {
    ctx: &'a QueryContext,
    table: &'a TableSchema,
    spec: &'a FutureSpec,
    maturity: &'a str,
    predicate: Predicate,
    key_suffix: String,
}

impl<'a> FutureQuery<'a> {
    /// Validate the request and compile its filters
    pub fn prepare(
        ctx: &'a QueryContext,
        spec: &'a FutureSpec,
        filters: &[Filter],
    ) -> Result<Self> {
        let table = ctx.table(&spec.table)?;
        spec.measure.validate(table)?;

        let maturity = spec
            .maturity_field
            .as_deref()
            .or(table.maturity_column())
            .ok_or_else(|| {
                AnalyticsError::InvalidRequest(format!(
                    "table '{}' has no maturity column",
                    table.name()
                ))
            })?;
        if table.field(maturity)? != FieldKind::Date {
            return Err(AnalyticsError::InvalidRequest(format!(
                "maturity field '{}' is not a date",
                maturity
            )));
        }
        if let Some(group_by) = &spec.group_by {
            table.field(group_by)?;
        }
        let predicate = compile(filters, table)?;

        Ok(Self {
            ctx,
            table,
            spec,
            maturity,
            predicate,
            key_suffix: format!("{}:{}", fingerprint(spec), fingerprint(filters)),
        })
    }

    /// Table the query runs against
    pub fn table(&self) -> &'a TableSchema {
        self.table
    }

    /// Statement for one snapshot
    pub fn build(&self, snapshot: NaiveDate) -> BuiltQuery {
        let mut builder = QueryBuilder::new(self.table.name())
            .select_as(format!("toStartOfMonth({})", self.maturity), "month");
        if let Some(group_by) = &self.spec.group_by {
            builder = builder.select_as(group_by, "group_key");
        }
        builder = builder
            .select_as(self.spec.measure.sql_expr(), "value")
            .where_date(self.table, "=", "snapshot", snapshot)
            .where_param(
                self.maturity,
                ">=",
                "from",
                ParamType::Date,
                DateEncoding::Calendar.format(snapshot),
            )
            .where_predicate(&self.predicate)
            .group_by("month");
        if self.spec.group_by.is_some() {
            builder = builder.group_by("group_key");
        }
        builder = builder.order_by("month");
        if self.spec.group_by.is_some() {
            builder = builder.order_by("group_key");
        }
        builder.build()
    }

    /// Run against a (forward-resolved) snapshot
    pub async fn run(&self, snapshot: NaiveDate) -> Result<FutureSeries> {
        let key = format!("future:{}:{}:{}", self.table.name(), snapshot, self.key_suffix);
        let result = self
            .ctx
            .fetch(&self.build(snapshot), Some(key), self.ctx.ttls().aggregates)
            .await?;

        let mut by_month: BTreeMap<NaiveDate, Vec<GroupValues>> = BTreeMap::new();
        for record in result.records() {
            let Some(month) = record
                .get("month")
                .and_then(|v| as_date(v, DateEncoding::Calendar))
            else {
                tracing::warn!(
                    table = self.table.name(),
                    value = ?record.get("month"),
                    "skipping row with unreadable maturity month"
                );
                continue;
            };
            by_month.entry(month).or_default().push(GroupValues::new(
                record.get("group_key").map(as_label).unwrap_or_default(),
                record.get("value").map(as_number).unwrap_or(0.0),
                Vec::new(),
            ));
        }

        let rule = MergeRule::new(self.spec.measure.aggregation, Vec::new());
        let totals: Vec<(NaiveDate, f64)> = by_month
            .iter()
            .map(|(month, values)| {
                let merged = rule.merge("total", values.iter()).map_or(0.0, |m| m.value);
                (*month, merged)
            })
            .collect();

        let groups = if self.spec.group_by.is_some() {
            group_profiles(&by_month)
        } else {
            Vec::new()
        };

        Ok(FutureSeries {
            total: cumulate(&totals),
            groups,
        })
    }
}

/// Per-group profiles, largest total first
fn group_profiles(by_month: &BTreeMap<NaiveDate, Vec<GroupValues>>) -> Vec<FutureGroup> {
    let mut buckets: HashMap<&str, Vec<(NaiveDate, f64)>> = HashMap::new();
    for (month, values) in by_month {
        for value in values {
            buckets
                .entry(value.group.as_str())
                .or_default()
                .push((*month, value.value));
        }
    }

    let mut groups: Vec<(f64, FutureGroup)> = buckets
        .into_iter()
        .map(|(group, months)| {
            let total: f64 = months.iter().map(|(_, amount)| amount).sum();
            let profile = FutureGroup {
                group: group.to_string(),
                points: cumulate(&months),
            };
            (total, profile)
        })
        .collect();
    groups.sort_by(|(a_total, a), (b_total, b)| {
        b_total
            .total_cmp(a_total)
            .then_with(|| a.group.cmp(&b.group))
    });
    groups.into_iter().map(|(_, profile)| profile).collect()
}

/// Maturity profile of `spec` at `snapshot`
pub async fn compute_future(
    ctx: &QueryContext,
    spec: &FutureSpec,
    snapshot: NaiveDate,
    filters: &[Filter],
) -> Result<FutureSeries> {
    FutureQuery::prepare(ctx, spec, filters)?.run(snapshot).await
}
