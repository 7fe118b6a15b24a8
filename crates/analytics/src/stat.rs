//! Stat cards: ungrouped totals compared across two periods

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vantage_cache::fingerprint;

use crate::builder::{BuiltQuery, QueryBuilder};
use crate::context::QueryContext;
use crate::error::{AnalyticsError, Result};
use crate::filter::Filter;
use crate::measure::NamedMeasure;
use crate::predicate::{Predicate, compile};
use crate::schema::TableSchema;
use crate::series::{Comparison, StatMetric};
use crate::value::as_number;

/// Measures of one stat card
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatSpec {
    /// Source table
    pub table: String,
    /// Reported measures
    pub measures: Vec<NamedMeasure>,
}

impl StatSpec {
    /// Create a stat spec
    pub fn new(table: impl Into<String>, measures: Vec<NamedMeasure>) -> Self {
        Self {
            table: table.into(),
            measures,
        }
    }
}

/// A validated stat request
pub struct StatQuery<'a> {
    ctx: &'a QueryContext,
    table: &'a TableSchema,
    spec: &'a StatSpec,
    predicate: Predicate,
    key_suffix: String,
}

impl<'a> StatQuery<'a> {
    /// Validate the request and compile its filters
    pub fn prepare(ctx: &'a QueryContext, spec: &'a StatSpec, filters: &[Filter]) -> Result<Self> {
        let table = ctx.table(&spec.table)?;
        if spec.measures.is_empty() {
            return Err(AnalyticsError::InvalidRequest(
                "stat requires at least one measure".to_string(),
            ));
        }
        for named in &spec.measures {
            named.measure.validate(table)?;
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

    /// Statement for one snapshot
    pub fn build(&self, snapshot: NaiveDate) -> BuiltQuery {
        let mut builder = QueryBuilder::new(self.table.name());
        for (i, named) in self.spec.measures.iter().enumerate() {
            builder = builder.select_as(named.measure.sql_expr(), format!("value{}", i));
        }
        builder
            .where_date(self.table, "=", "snapshot", snapshot)
            .where_predicate(&self.predicate)
            .build()
    }

    async fn fetch(&self, snapshot: NaiveDate) -> Result<Vec<f64>> {
        let key = format!("stat:{}:{}:{}", self.table.name(), snapshot, self.key_suffix);
        let result = self
            .ctx
            .fetch(&self.build(snapshot), Some(key), self.ctx.ttls().aggregates)
            .await?;

        Ok((0..self.spec.measures.len())
            .map(|i| {
                result
                    .value(0, &format!("value{}", i))
                    .map(as_number)
                    .unwrap_or(0.0)
            })
            .collect())
    }

    /// Run for a current and a comparison snapshot
    pub async fn run(&self, current: NaiveDate, comparison: NaiveDate) -> Result<Vec<StatMetric>> {
        let (current_values, previous_values) =
            tokio::try_join!(self.fetch(current), self.fetch(comparison))?;

        Ok(self
            .spec
            .measures
            .iter()
            .zip(current_values.into_iter().zip(previous_values))
            .map(|(named, (current, previous))| StatMetric {
                name: named.name.clone(),
                comparison: Comparison::between(current, previous),
            })
            .collect())
    }
}

/// Stat metrics of `spec` for two snapshots
pub async fn compute_stat(
    ctx: &QueryContext,
    spec: &StatSpec,
    current: NaiveDate,
    comparison: NaiveDate,
    filters: &[Filter],
) -> Result<Vec<StatMetric>> {
    StatQuery::prepare(ctx, spec, filters)?
        .run(current, comparison)
        .await
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vantage_query::QueryParams;
    use vantage_query::test_utils::{ScriptedBackend, rows};

    use super::*;
    use crate::measure::{Aggregation, MeasureSpec};
    use crate::test_support::{context, date, param};

    fn spec() -> StatSpec {
        StatSpec::new(
            "positions",
            vec![
                NamedMeasure::new("exposure", MeasureSpec::sum("amount")),
                NamedMeasure::new(
                    "counterparties",
                    MeasureSpec::new("counterparty", Aggregation::CountDistinct),
                ),
            ],
        )
    }

    fn backend() -> ScriptedBackend {
        ScriptedBackend::new(|_sql: &str, params: &QueryParams| {
            let row = match param(params, "snapshot") {
                "2024-03-01" => json!({ "value0": 150.0, "value1": "12" }),
                _ => json!({ "value0": 0, "value1": "10" }),
            };
            Ok(rows(&["value0", "value1"], vec![row]))
        })
    }

    #[tokio::test]
    async fn test_stat_compares_every_measure() {
        let backend = backend().shared();
        let ctx = context(backend.clone());

        let metrics = compute_stat(&ctx, &spec(), date(2024, 3, 1), date(2024, 2, 1), &[])
            .await
            .unwrap();

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].name, "exposure");
        assert_eq!(metrics[0].comparison.current, 150.0);
        assert_eq!(metrics[0].comparison.change, 150.0);
        assert_eq!(metrics[0].comparison.change_percent, 0.0);
        assert_eq!(metrics[1].comparison.previous, 10.0);
        assert!((metrics[1].comparison.change_percent - 20.0).abs() < 1e-9);
        assert_eq!(backend.call_count(), 2);
    }

    #[tokio::test]
    async fn test_stat_query_shape() {
        let backend = backend().shared();
        let ctx = context(backend.clone());
        let filters = vec![Filter::eq("desk", "EQ")];

        compute_stat(&ctx, &spec(), date(2024, 3, 1), date(2024, 3, 1), &filters)
            .await
            .unwrap();

        // Same snapshot twice shares one cache entry, but the concurrent
        // misses may both execute
        let calls = backend.calls();
        assert!(!calls.is_empty());
        assert_eq!(
            calls[0].sql,
            "SELECT sum(toFloat64OrZero(toString(amount))) AS value0, \
             uniqExact(counterparty) AS value1 FROM positions \
             WHERE as_of_date = {snapshot:Date} AND (desk = {p0_0:String})"
        );
    }

    #[tokio::test]
    async fn test_stat_validation() {
        let backend = backend().shared();
        let ctx = context(backend.clone());

        let empty = StatSpec::new("positions", Vec::new());
        assert!(matches!(
            StatQuery::prepare(&ctx, &empty, &[]),
            Err(AnalyticsError::InvalidRequest(_))
        ));

        let weighted = StatSpec::new(
            "positions",
            vec![NamedMeasure::new("rate", MeasureSpec::new("rate", Aggregation::WeightedAvg))],
        );
        assert!(matches!(
            StatQuery::prepare(&ctx, &weighted, &[]),
            Err(AnalyticsError::MissingWeightField(_))
        ));
        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_stat_empty_result_reads_zero() {
        let backend = ScriptedBackend::returning(vantage_query::QueryResult::empty()).shared();
        let ctx = context(backend);

        let metrics = compute_stat(&ctx, &spec(), date(2024, 3, 1), date(2024, 2, 1), &[])
            .await
            .unwrap();
        assert!(metrics.iter().all(|m| m.comparison.current == 0.0));
    }
}
