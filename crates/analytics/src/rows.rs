//! Raw row browsing and distinct values for filter pickers

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vantage_query::Record;

use crate::builder::{BuiltQuery, QueryBuilder};
use crate::context::QueryContext;
use crate::error::{AnalyticsError, Result};
use crate::filter::Filter;
use crate::predicate::{Predicate, compile};
use crate::schema::TableSchema;
use crate::value::as_label;

/// Maximum allowed limit for row and distinct queries
pub const MAX_LIMIT: usize = 10_000;

/// Default page size for row browsing
pub const DEFAULT_ROWS_LIMIT: usize = 100;

/// Default number of distinct values
pub const DEFAULT_DISTINCT_LIMIT: usize = 1_000;

fn default_rows_limit() -> usize {
    DEFAULT_ROWS_LIMIT
}

fn default_distinct_limit() -> usize {
    DEFAULT_DISTINCT_LIMIT
}

fn capped(limit: usize) -> Result<usize> {
    if limit == 0 {
        return Err(AnalyticsError::OutOfRange("limit must be positive".to_string()));
    }
    Ok(limit.min(MAX_LIMIT))
}

/// A page of raw rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowsRequest {
    /// Source table
    pub table: String,
    /// Columns to return; every declared field when empty
    #[serde(default)]
    pub columns: Vec<String>,
    /// Filters
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Sort column
    #[serde(default)]
    pub order_by: Option<String>,
    /// Sort descending
    #[serde(default)]
    pub descending: bool,
    /// Page size (max 10,000)
    #[serde(default = "default_rows_limit")]
    pub limit: usize,
    /// Rows to skip
    #[serde(default)]
    pub offset: usize,
    /// Snapshot to browse; the latest when absent
    #[serde(default)]
    pub as_of_date: Option<NaiveDate>,
}

impl RowsRequest {
    /// Browse a table with default paging
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order_by: None,
            descending: false,
            limit: DEFAULT_ROWS_LIMIT,
            offset: 0,
            as_of_date: None,
        }
    }
}

/// Rows of one snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowsPage {
    /// Column order
    pub columns: Vec<String>,
    /// Rows keyed by column
    pub rows: Vec<Record>,
    /// Snapshot browsed
    pub snapshot: NaiveDate,
    /// Effective page size
    pub limit: usize,
    /// Rows skipped
    pub offset: usize,
}

/// A validated row browsing request
pub struct RowsQuery<'a> {
    ctx: &'a QueryContext,
    table: &'a TableSchema,
    request: &'a RowsRequest,
    columns: Vec<String>,
    limit: usize,
    predicate: Predicate,
}

impl<'a> RowsQuery<'a> {
    /// Validate columns, ordering and filters
    pub fn prepare(ctx: &'a QueryContext, request: &'a RowsRequest) -> Result<Self> {
        let table = ctx.table(&request.table)?;
        let columns: Vec<String> = if request.columns.is_empty() {
            table.fields().map(|(name, _)| name.to_string()).collect()
        } else {
            for column in &request.columns {
                table.field(column)?;
            }
            request.columns.clone()
        };
        if let Some(order_by) = &request.order_by {
            table.field(order_by)?;
        }
        let limit = capped(request.limit)?;
        let predicate = compile(&request.filters, table)?;

        Ok(Self {
            ctx,
            table,
            request,
            columns,
            limit,
            predicate,
        })
    }

    /// Table the query runs against
    pub fn table(&self) -> &'a TableSchema {
        self.table
    }

    /// Statement for one snapshot
    pub fn build(&self, snapshot: NaiveDate) -> BuiltQuery {
        let mut builder = QueryBuilder::new(self.table.name());
        for column in &self.columns {
            builder = builder.select(column);
        }
        builder = builder
            .where_date(self.table, "=", "snapshot", snapshot)
            .where_predicate(&self.predicate);
        if let Some(order_by) = &self.request.order_by {
            builder = if self.request.descending {
                builder.order_by_desc(order_by)
            } else {
                builder.order_by(order_by)
            };
        }
        builder.limit(self.limit).offset(self.request.offset).build()
    }

    /// Fetch the page
    pub async fn run(&self, snapshot: NaiveDate) -> Result<RowsPage> {
        let result = self
            .ctx
            .fetch(&self.build(snapshot), None, self.ctx.ttls().rows)
            .await?;

        Ok(RowsPage {
            columns: self.columns.clone(),
            rows: result.records(),
            snapshot,
            limit: self.limit,
            offset: self.request.offset,
        })
    }
}

/// Browse raw rows of a snapshot
pub async fn browse_rows(
    ctx: &QueryContext,
    request: &RowsRequest,
    snapshot: NaiveDate,
) -> Result<RowsPage> {
    RowsQuery::prepare(ctx, request)?.run(snapshot).await
}

/// Distinct values of one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistinctRequest {
    /// Source table
    pub table: String,
    /// Field to list
    pub field: String,
    /// Filters
    #[serde(default)]
    pub filters: Vec<Filter>,
    /// Maximum values (max 10,000)
    #[serde(default = "default_distinct_limit")]
    pub limit: usize,
    /// Snapshot to read; the latest when absent
    #[serde(default)]
    pub as_of_date: Option<NaiveDate>,
}

impl DistinctRequest {
    /// List values of a field
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            filters: Vec::new(),
            limit: DEFAULT_DISTINCT_LIMIT,
            as_of_date: None,
        }
    }
}

/// Sorted distinct values of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistinctValues {
    /// Field listed
    pub field: String,
    /// Values, ascending, nulls dropped
    pub values: Vec<String>,
}

/// A validated distinct-values request
pub struct DistinctQuery<'a> {
    ctx: &'a QueryContext,
    table: &'a TableSchema,
    request: &'a DistinctRequest,
    limit: usize,
    predicate: Predicate,
}

impl<'a> DistinctQuery<'a> {
    /// Validate field and filters
    pub fn prepare(ctx: &'a QueryContext, request: &'a DistinctRequest) -> Result<Self> {
        let table = ctx.table(&request.table)?;
        table.field(&request.field)?;
        let limit = capped(request.limit)?;
        let predicate = compile(&request.filters, table)?;

        Ok(Self {
            ctx,
            table,
            request,
            limit,
            predicate,
        })
    }

    /// Table the query runs against
    pub fn table(&self) -> &'a TableSchema {
        self.table
    }

    /// Statement for one snapshot
    pub fn build(&self, snapshot: NaiveDate) -> BuiltQuery {
        QueryBuilder::new(self.table.name())
            .select_as(format!("DISTINCT {}", self.request.field), "value")
            .where_date(self.table, "=", "snapshot", snapshot)
            .where_predicate(&self.predicate)
            .order_by("value")
            .limit(self.limit)
            .build()
    }

    /// Fetch the values
    pub async fn run(&self, snapshot: NaiveDate) -> Result<DistinctValues> {
        let result = self
            .ctx
            .fetch(&self.build(snapshot), None, self.ctx.ttls().distinct)
            .await?;

        let values = result
            .rows
            .iter()
            .filter_map(|row| row.first())
            .filter(|v| !v.is_null())
            .map(as_label)
            .collect();

        Ok(DistinctValues {
            field: self.request.field.clone(),
            values,
        })
    }
}

/// Distinct values of a field in a snapshot
pub async fn distinct_values(
    ctx: &QueryContext,
    request: &DistinctRequest,
    snapshot: NaiveDate,
) -> Result<DistinctValues> {
    DistinctQuery::prepare(ctx, request)?.run(snapshot).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use vantage_query::QueryResult;
    use vantage_query::test_utils::{ScriptedBackend, rows};

    use super::*;
    use crate::test_support::{context, date};

    #[tokio::test]
    async fn test_browse_rows() {
        let backend = ScriptedBackend::returning(rows(
            &["desk", "amount"],
            vec![json!({ "desk": "EQ", "amount": 5 })],
        ))
        .shared();
        let ctx = context(backend.clone());
        let mut request = RowsRequest::new("positions");
        request.columns = vec!["desk".to_string(), "amount".to_string()];
        request.filters = vec![Filter::eq("desk", "EQ")];
        request.order_by = Some("amount".to_string());
        request.descending = true;
        request.offset = 20;

        let page = browse_rows(&ctx, &request, date(2024, 3, 1)).await.unwrap();

        assert_eq!(page.columns, vec!["desk", "amount"]);
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0]["desk"], "EQ");
        assert_eq!(page.snapshot, date(2024, 3, 1));
        assert_eq!(
            backend.calls()[0].sql,
            "SELECT desk, amount FROM positions WHERE as_of_date = {snapshot:Date} \
             AND (desk = {p0_0:String}) ORDER BY amount DESC LIMIT 100 OFFSET 20"
        );
    }

    #[tokio::test]
    async fn test_browse_defaults_to_declared_fields_and_caps_limit() {
        let backend = ScriptedBackend::returning(QueryResult::empty()).shared();
        let ctx = context(backend.clone());
        let mut request = RowsRequest::new("trades");
        request.limit = 1_000_000;

        let page = browse_rows(&ctx, &request, date(2024, 3, 1)).await.unwrap();

        assert_eq!(page.columns, vec!["amount", "desk", "snap"]);
        assert_eq!(page.limit, MAX_LIMIT);
        assert!(backend.calls()[0].sql.ends_with("LIMIT 10000"));
    }

    #[tokio::test]
    async fn test_browse_rejects_unknown_columns() {
        let backend = ScriptedBackend::returning(QueryResult::empty()).shared();
        let ctx = context(backend.clone());

        let mut request = RowsRequest::new("positions");
        request.columns = vec!["secret".to_string()];
        assert!(RowsQuery::prepare(&ctx, &request).is_err());

        let mut request = RowsRequest::new("positions");
        request.order_by = Some("1; DROP TABLE positions".to_string());
        assert!(RowsQuery::prepare(&ctx, &request).is_err());

        let mut request = RowsRequest::new("positions");
        request.limit = 0;
        assert!(matches!(
            RowsQuery::prepare(&ctx, &request),
            Err(AnalyticsError::OutOfRange(_))
        ));

        assert_eq!(backend.call_count(), 0);
    }

    #[tokio::test]
    async fn test_distinct_values() {
        let backend = ScriptedBackend::returning(rows(
            &["value"],
            vec![
                json!({ "value": "EQ" }),
                json!({ "value": null }),
                json!({ "value": "FX" }),
            ],
        ))
        .shared();
        let ctx = context(backend.clone());
        let request = DistinctRequest::new("positions", "desk");

        let values = distinct_values(&ctx, &request, date(2024, 3, 1)).await.unwrap();
        assert_eq!(values.field, "desk");
        assert_eq!(values.values, vec!["EQ", "FX"]);
        assert_eq!(
            backend.calls()[0].sql,
            "SELECT DISTINCT desk AS value FROM positions WHERE as_of_date = {snapshot:Date} \
             ORDER BY value LIMIT 1000"
        );

        // Served from cache the second time
        distinct_values(&ctx, &request, date(2024, 3, 1)).await.unwrap();
        assert_eq!(backend.call_count(), 1);
    }

    #[test]
    fn test_request_deserialize_defaults() {
        let request: RowsRequest = serde_json::from_str(r#"{"table":"positions"}"#).unwrap();
        assert_eq!(request.limit, DEFAULT_ROWS_LIMIT);
        assert_eq!(request.offset, 0);
        assert!(!request.descending);

        let request: DistinctRequest =
            serde_json::from_str(r#"{"table":"positions","field":"desk","asOfDate":"2024-03-01"}"#)
                .unwrap();
        assert_eq!(request.limit, DEFAULT_DISTINCT_LIMIT);
        assert_eq!(request.as_of_date, Some(date(2024, 3, 1)));
    }
}
