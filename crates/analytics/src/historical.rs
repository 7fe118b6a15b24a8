//! Historical series: one aggregate per snapshot up to a base date
//!
//! Unlike grouped breakdowns, which compare exactly two snapshots, this
//! accumulates every snapshot on or before the base date. With a group and a
//! limit, the groups kept are the largest at the base snapshot and the rest
//! fold into `Others` on every point, so the series stay comparable.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vantage_cache::fingerprint;

use crate::builder::{BuiltQuery, QueryBuilder};
use crate::context::QueryContext;
use crate::error::{AnalyticsError, Result};
use crate::filter::Filter;
use crate::measure::MeasureSpec;
use crate::predicate::{Predicate, compile};
use crate::schema::TableSchema;
use crate::series::{GroupValue, HistoricalPoint, HistoricalSeries};
use crate::topn::{GroupValues, MergeRule, OTHERS_LABEL, fold_others, top_groups};
use crate::value::{as_date, as_label, as_number};

/// A historical series request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoricalSpec {
    /// Source table
    pub table: String,
    /// Aggregate per snapshot
    #[serde(flatten)]
    pub measure: MeasureSpec,
    /// Optional breakdown field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<String>,
    /// Earliest snapshot included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    /// Groups shown, `Others` included
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl HistoricalSpec {
    /// Create an ungrouped series over every snapshot
    pub fn new(table: impl Into<String>, measure: MeasureSpec) -> Self {
        Self {
            table: table.into(),
            measure,
            group_by: None,
            start: None,
            limit: None,
        }
    }

    /// Break down by a field
    pub fn with_group_by(mut self, field: impl Into<String>) -> Self {
        self.group_by = Some(field.into());
        self
    }

    /// Skip snapshots before `start`
    pub fn with_start(mut self, start: NaiveDate) -> Self {
        self.start = Some(start);
        self
    }

    /// Limit the groups shown
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// A validated historical request
pub struct HistoricalQuery<'a> {
    ctx: &'a QueryContext,
    table: &'a TableSchema,
    spec: &'a HistoricalSpec,
    predicate: Predicate,
    key_suffix: String,
}

impl<'a> HistoricalQuery<'a> {
    /// Validate the request and compile its filters
    pub fn prepare(
        ctx: &'a QueryContext,
        spec: &'a HistoricalSpec,
        filters: &[Filter],
    ) -> Result<Self> {
        let table = ctx.table(&spec.table)?;
        spec.measure.validate(table)?;
        if let Some(group_by) = &spec.group_by {
            table.field(group_by)?;
        }
        if let Some(limit) = spec.limit
            && limit < 2
        {
            return Err(AnalyticsError::OutOfRange(format!(
                "historical limit must be at least 2, got {}",
                limit
            )));
        }
        let predicate = compile(filters, table)?;

        Ok(Self {
            ctx,
            table,
            spec,
            predicate,
            key_suffix: format!("{}:{}", fingerprint(spec), fingerprint(filters)),
        })
    }

    /// Table the query runs against
    pub fn table(&self) -> &'a TableSchema {
        self.table
    }

    /// Statement covering every snapshot up to `base`
    pub fn build(&self, base: NaiveDate) -> BuiltQuery {
        let mut builder =
            QueryBuilder::new(self.table.name()).select_as(self.table.date_column(), "snapshot");
        if let Some(group_by) = &self.spec.group_by {
            builder = builder.select_as(group_by, "group_key");
        }
        builder = builder
            .select_as(self.spec.measure.sql_expr(), "value")
            .where_date(self.table, "<=", "base", base);
        if let Some(start) = self.spec.start {
            builder = builder.where_date(self.table, ">=", "start", start);
        }
        builder = builder.where_predicate(&self.predicate).group_by("snapshot");
        if self.spec.group_by.is_some() {
            builder = builder.group_by("group_key");
        }
        builder = builder.order_by("snapshot");
        if self.spec.group_by.is_some() {
            builder = builder.order_by("group_key");
        }
        builder.build()
    }

    /// Run with `base` as the latest snapshot
    pub async fn run(&self, base: NaiveDate) -> Result<HistoricalSeries> {
        let key = format!(
            "historical:{}:{}:{}",
            self.table.name(),
            base,
            self.key_suffix
        );
        let result = self
            .ctx
            .fetch(&self.build(base), Some(key), self.ctx.ttls().aggregates)
            .await?;

        // snapshot -> group values, ascending by date
        let mut by_snapshot: BTreeMap<NaiveDate, Vec<GroupValues>> = BTreeMap::new();
        for record in result.records() {
            let Some(date) = record
                .get("snapshot")
                .and_then(|v| as_date(v, self.table.date_encoding()))
            else {
                tracing::warn!(
                    table = self.table.name(),
                    value = ?record.get("snapshot"),
                    "skipping row with unreadable snapshot"
                );
                continue;
            };
            let group = record.get("group_key").map(as_label).unwrap_or_default();
            let value = record.get("value").map(as_number).unwrap_or(0.0);
            by_snapshot
                .entry(date)
                .or_default()
                .push(GroupValues::new(group, value, Vec::new()));
        }

        if self.spec.group_by.is_none() {
            let points = by_snapshot
                .into_iter()
                .map(|(date, values)| HistoricalPoint {
                    date,
                    total: values.iter().map(|v| v.value).sum(),
                    groups: Vec::new(),
                })
                .collect();
            return Ok(HistoricalSeries {
                groups: Vec::new(),
                points,
            });
        }

        Ok(self.grouped_series(by_snapshot))
    }

    fn grouped_series(
        &self,
        by_snapshot: BTreeMap<NaiveDate, Vec<GroupValues>>,
    ) -> HistoricalSeries {
        // Rank by the latest snapshot present, which is the base snapshot
        let latest: &[GroupValues] = by_snapshot
            .values()
            .next_back()
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        let all_groups: HashSet<&str> = by_snapshot
            .values()
            .flatten()
            .map(|g| g.group.as_str())
            .collect();

        let mut ranked = top_groups(latest, latest.len());
        // Groups absent at the base snapshot rank last, by name
        let mut absent: Vec<&str> = all_groups
            .iter()
            .copied()
            .filter(|g| !ranked.iter().any(|r| r == g))
            .collect();
        absent.sort_unstable();
        ranked.extend(absent.into_iter().map(str::to_string));

        let (groups, fold) = match self.spec.limit {
            Some(limit) if ranked.len() > limit => {
                let mut kept = ranked;
                kept.retain(|g| g != OTHERS_LABEL);
                kept.truncate(limit - 1);
                (kept, true)
            }
            _ => (ranked, false),
        };

        let keep: HashSet<&str> = groups.iter().map(String::as_str).collect();
        let rule = MergeRule::new(self.spec.measure.aggregation, Vec::new());

        let points = by_snapshot
            .iter()
            .map(|(date, values)| {
                let present: HashMap<&str, f64> =
                    values.iter().map(|v| (v.group.as_str(), v.value)).collect();
                let mut point_groups: Vec<GroupValue> = groups
                    .iter()
                    .map(|g| GroupValue {
                        group: g.clone(),
                        value: present.get(g.as_str()).copied().unwrap_or(0.0),
                    })
                    .collect();
                if fold {
                    let (_, others) = fold_others(values, &keep, &rule);
                    point_groups.push(GroupValue {
                        group: OTHERS_LABEL.to_string(),
                        value: others.map_or(0.0, |o| o.value),
                    });
                }
                HistoricalPoint {
                    date: *date,
                    total: values.iter().map(|v| v.value).sum(),
                    groups: point_groups,
                }
            })
            .collect();

        let mut labels = groups;
        if fold {
            labels.push(OTHERS_LABEL.to_string());
        }

        HistoricalSeries {
            groups: labels,
            points,
        }
    }
}

/// Historical series of `spec` up to `base`
pub async fn compute_historical(
    ctx: &QueryContext,
    spec: &HistoricalSpec,
    base: NaiveDate,
    filters: &[Filter],
) -> Result<HistoricalSeries> {
    HistoricalQuery::prepare(ctx, spec, filters)?.run(base).await
}
