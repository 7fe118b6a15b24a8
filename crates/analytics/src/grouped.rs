//! Grouped aggregation with period comparison
//!
//! One GROUP BY query per snapshot (current and comparison), executed
//! concurrently through the read-through cache. Rows are then consolidated
//! into top-N + Others, compared across periods and given their share of the
//! current-period total.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use vantage_cache::fingerprint;

use crate::builder::{BuiltQuery, QueryBuilder};
use crate::context::QueryContext;
use crate::error::Result;
use crate::filter::Filter;
use crate::measure::{GroupMeasureSpec, OrderBy, OrderDirection};
use crate::predicate::{Predicate, compile};
use crate::schema::TableSchema;
use crate::series::{GroupedRow, ResultValue};
use crate::topn::{
    GroupValues, MergeRule, OTHERS_LABEL, TOP_N, consolidates, effective_limit, fold_others,
    top_groups,
};
use crate::value::{as_label, as_number};

/// A validated grouped request, ready to run against any pair of snapshots
pub struct GroupedQuery<'a> {
    ctx: &'a QueryContext,
    table: &'a TableSchema,
    spec: &'a GroupMeasureSpec,
    group_by: &'a str,
    predicate: Predicate,
    measure_hash: String,
    filter_hash: String,
}

impl<'a> GroupedQuery<'a> {
    /// Validate the request and compile its filters
    ///
    /// Every configuration error surfaces here, before any query runs.
    pub fn prepare(
        ctx: &'a QueryContext,
        spec: &'a GroupMeasureSpec,
        group_by: &'a str,
        filters: &[Filter],
    ) -> Result<Self> {
        let table = ctx.table(&spec.table)?;
        spec.validate(table)?;
        table.field(group_by)?;
        let predicate = compile(filters, table)?;

        Ok(Self {
            ctx,
            table,
            spec,
            group_by,
            predicate,
            measure_hash: fingerprint(spec),
            filter_hash: fingerprint(filters),
        })
    }

    /// Table the query runs against
    pub fn table(&self) -> &'a TableSchema {
        self.table
    }

    /// Statement for one snapshot
    pub fn build(&self, snapshot: NaiveDate) -> BuiltQuery {
        let mut builder = QueryBuilder::new(self.table.name())
            .select_as(self.group_by, "group_key")
            .select_as(self.spec.measure.sql_expr(), "value");
        for (i, result) in self.spec.results.iter().enumerate() {
            builder = builder.select_as(result.sql_expr(), format!("result{}", i + 1));
        }

        builder = builder
            .where_date(self.table, "=", "snapshot", snapshot)
            .where_predicate(&self.predicate)
            .group_by("group_key");

        // Consolidation ranks by value, so fetch the largest groups first
        let order_by = if consolidates(self.spec.limit) {
            builder = builder.order_by_desc("value");
            OrderBy::Value
        } else {
            builder = builder.order_by_dir(self.spec.order_by.column(), self.spec.order_direction);
            self.spec.order_by
        };
        if order_by != OrderBy::Group {
            builder = builder.order_by("group_key");
        }

        builder.limit(effective_limit(self.spec.limit)).build()
    }

    /// Semantic cache key for one snapshot
    pub fn cache_key(&self, snapshot: NaiveDate) -> String {
        format!(
            "grouped:{}:{}:{}:{}:{}",
            self.table.name(),
            self.group_by,
            snapshot,
            self.measure_hash,
            self.filter_hash
        )
    }

    async fn fetch(&self, snapshot: NaiveDate) -> Result<Vec<GroupValues>> {
        let query = self.build(snapshot);
        let result = self
            .ctx
            .fetch(&query, Some(self.cache_key(snapshot)), self.ctx.ttls().aggregates)
            .await?;

        let slots = self.spec.results.len();
        Ok(result
            .records()
            .iter()
            .map(|record| {
                let cell = |name: &str| record.get(name).map(as_number).unwrap_or(0.0);
                GroupValues::new(
                    record.get("group_key").map(as_label).unwrap_or_default(),
                    cell("value"),
                    (1..=slots).map(|i| cell(&format!("result{}", i))).collect(),
                )
            })
            .collect())
    }

    /// Run for a current and a comparison snapshot
    pub async fn run(&self, current: NaiveDate, comparison: NaiveDate) -> Result<Vec<GroupedRow>> {
        let (current_rows, comparison_rows) =
            tokio::try_join!(self.fetch(current), self.fetch(comparison))?;

        if current_rows.is_empty() {
            return Ok(Vec::new());
        }

        let grand_total: f64 = current_rows.iter().map(|r| r.value).sum();
        let previous: HashMap<&str, &GroupValues> = comparison_rows
            .iter()
            .map(|r| (r.group.as_str(), r))
            .collect();
        let small = consolidates(self.spec.limit);

        let rows = if small && current_rows.len() > TOP_N {
            let rule = MergeRule::new(
                self.spec.measure.aggregation,
                self.spec.results.iter().map(|r| r.aggregation).collect(),
            );
            // A real group labelled like the bucket folds into it
            let top: Vec<String> = top_groups(&current_rows, current_rows.len())
                .into_iter()
                .filter(|g| g != OTHERS_LABEL)
                .take(TOP_N)
                .collect();
            let keep: HashSet<&str> = top.iter().map(String::as_str).collect();
            let (kept, others_current) = fold_others(&current_rows, &keep, &rule);
            let (_, others_previous) = fold_others(&comparison_rows, &keep, &rule);

            let mut rows: Vec<GroupedRow> = kept
                .iter()
                .map(|g| to_row(g, previous.get(g.group.as_str()).copied(), grand_total))
                .collect();
            sort_rows(&mut rows, self.spec.order_by, self.spec.order_direction);

            if let Some(others) = others_current {
                rows.push(to_row(&others, others_previous.as_ref(), grand_total).into_others());
            }
            rows
        } else {
            let mut rows: Vec<GroupedRow> = current_rows
                .iter()
                .map(|g| to_row(g, previous.get(g.group.as_str()).copied(), grand_total))
                .collect();
            if small {
                sort_rows(&mut rows, self.spec.order_by, self.spec.order_direction);
            }
            rows
        };

        tracing::debug!(
            table = self.table.name(),
            group_by = self.group_by,
            %current,
            %comparison,
            groups = current_rows.len(),
            returned = rows.len(),
            "grouped aggregate computed"
        );

        Ok(rows)
    }
}

/// Grouped breakdown of `spec` by `group_by` for two snapshots
pub async fn compute_grouped(
    ctx: &QueryContext,
    spec: &GroupMeasureSpec,
    group_by: &str,
    current: NaiveDate,
    comparison: NaiveDate,
    filters: &[Filter],
) -> Result<Vec<GroupedRow>> {
    GroupedQuery::prepare(ctx, spec, group_by, filters)?
        .run(current, comparison)
        .await
}

fn to_row(current: &GroupValues, previous: Option<&GroupValues>, grand_total: f64) -> GroupedRow {
    let results = current
        .results
        .iter()
        .enumerate()
        .map(|(i, value)| ResultValue {
            current: *value,
            previous: previous
                .and_then(|p| p.results.get(i))
                .copied()
                .unwrap_or(0.0),
        })
        .collect();

    GroupedRow::new(
        current.group.clone(),
        current.value,
        previous.map_or(0.0, |p| p.value),
        results,
        grand_total,
    )
}

fn sort_rows(rows: &mut [GroupedRow], order_by: OrderBy, direction: OrderDirection) {
    rows.sort_by(|a, b| {
        let ordering = match order_by {
            OrderBy::Group => a.group.cmp(&b.group),
            OrderBy::Value => a.current.total_cmp(&b.current),
            slot => {
                let i = slot.result_slot().unwrap_or(0);
                slot_value(a, i).total_cmp(&slot_value(b, i))
            }
        };
        let ordering = match direction {
            OrderDirection::Asc => ordering,
            OrderDirection::Desc => ordering.reverse(),
        };
        match ordering {
            Ordering::Equal => a.group.cmp(&b.group),
            other => other,
        }
    });
}

fn slot_value(row: &GroupedRow, slot: usize) -> f64 {
    row.results.get(slot).map_or(0.0, |r| r.current)
}
