//! Analytics engine
//!
//! Entry point for every request: validates it, aligns the requested dates
//! to stored snapshots and runs the matching aggregator through the cache.
//!
//! - **grouped**: breakdown by a field, top 11 + Others, two periods
//! - **stat**: ungrouped totals, two periods
//! - **historical**: one aggregate per past snapshot
//! - **future**: maturity profile from a forward-resolved snapshot
//! - **rows** / **distinct**: browsing and filter pickers

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, Utc};
use vantage_cache::{CacheTtls, KvStore, ReadThroughCache};
use vantage_query::QueryBackend;

use crate::context::QueryContext;
use crate::error::Result;
use crate::future::FutureQuery;
use crate::grouped::GroupedQuery;
use crate::historical::HistoricalQuery;
use crate::request::{
    AnalyticsRequest, Envelope, FutureRequest, GroupedRequest, HistoricalRequest, Meta,
    ResponseData, StatRequest,
};
use crate::rows::{DistinctQuery, DistinctRequest, DistinctValues, RowsPage, RowsQuery, RowsRequest};
use crate::schema::{TableRegistry, TableSchema};
use crate::series::{FutureSeries, GroupedRow, HistoricalSeries, StatMetric};
use crate::snapshot::{Direction, SnapshotResolver};
use crate::stat::StatQuery;

/// A computed payload and the snapshots behind it
#[derive(Debug, Clone, PartialEq)]
pub struct Computed<T> {
    /// Payload
    pub data: T,
    /// Snapshots, TTL and timing
    pub meta: Meta,
}

/// Analytics engine over one backend, cache store and table registry
pub struct AnalyticsEngine {
    ctx: QueryContext,
}

impl AnalyticsEngine {
    /// Create an engine with caching enabled under the default namespace
    pub fn new(
        backend: Arc<dyn QueryBackend>,
        store: Arc<dyn KvStore>,
        tables: TableRegistry,
        ttls: CacheTtls,
    ) -> Self {
        let cache = ReadThroughCache::new(backend, store);
        Self::from_context(QueryContext::new(cache, tables, ttls))
    }

    /// Create an engine from a prepared context
    pub fn from_context(ctx: QueryContext) -> Self {
        Self { ctx }
    }

    /// Shared context
    pub fn context(&self) -> &QueryContext {
        &self.ctx
    }

    /// Registered table names
    pub fn tables(&self) -> Vec<&str> {
        self.ctx.tables().names()
    }

    /// Check the analytical store is reachable
    pub async fn health_check(&self) -> Result<()> {
        Ok(self.ctx.cache().backend().health_check().await?)
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    fn meta(
        table: &TableSchema,
        as_of: NaiveDate,
        current: Option<NaiveDate>,
        comparison: Option<NaiveDate>,
        ttl: Duration,
        started: Instant,
    ) -> Meta {
        Meta {
            table: table.name().to_string(),
            as_of_date: as_of,
            current_snapshot: current,
            comparison_snapshot: comparison,
            ttl_secs: ttl.as_secs(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// Align `target` to a snapshot of `table`
    pub async fn resolve_snapshot(
        &self,
        table: &str,
        target: NaiveDate,
        direction: Direction,
    ) -> Result<NaiveDate> {
        let table = self.ctx.table(table)?;
        SnapshotResolver::new(&self.ctx)
            .resolve(target, table, direction)
            .await
    }

    async fn resolve_pair(
        &self,
        table: &TableSchema,
        current: NaiveDate,
        comparison: NaiveDate,
    ) -> Result<(NaiveDate, NaiveDate)> {
        let resolver = SnapshotResolver::new(&self.ctx);
        tokio::try_join!(
            resolver.resolve_backward(current, table),
            resolver.resolve_backward(comparison, table)
        )
    }

    /// Grouped breakdown compared across two periods
    pub async fn grouped(&self, request: &GroupedRequest) -> Result<Computed<Vec<GroupedRow>>> {
        let started = Instant::now();
        let query =
            GroupedQuery::prepare(&self.ctx, &request.spec, &request.group_by, &request.filters)?;
        let (as_of, target) = request.window.targets(Self::today())?;
        let (current, comparison) = self.resolve_pair(query.table(), as_of, target).await?;

        let data = query.run(current, comparison).await?;
        Ok(Computed {
            data,
            meta: Self::meta(
                query.table(),
                as_of,
                Some(current),
                Some(comparison),
                self.ctx.ttls().aggregates,
                started,
            ),
        })
    }

    /// Stat metrics compared across two periods
    pub async fn stat(&self, request: &StatRequest) -> Result<Computed<Vec<StatMetric>>> {
        let started = Instant::now();
        let query = StatQuery::prepare(&self.ctx, &request.spec, &request.filters)?;
        let (as_of, target) = request.window.targets(Self::today())?;
        let (current, comparison) = self.resolve_pair(query.table(), as_of, target).await?;

        let data = query.run(current, comparison).await?;
        Ok(Computed {
            data,
            meta: Self::meta(
                query.table(),
                as_of,
                Some(current),
                Some(comparison),
                self.ctx.ttls().aggregates,
                started,
            ),
        })
    }

    /// Series over every snapshot up to the as-of date
    pub async fn historical(
        &self,
        request: &HistoricalRequest,
    ) -> Result<Computed<HistoricalSeries>> {
        let started = Instant::now();
        let query = HistoricalQuery::prepare(&self.ctx, &request.spec, &request.filters)?;
        let as_of = request.as_of_date.unwrap_or_else(Self::today);
        let base = SnapshotResolver::new(&self.ctx)
            .resolve_backward(as_of, query.table())
            .await?;

        let data = query.run(base).await?;
        Ok(Computed {
            data,
            meta: Self::meta(
                query.table(),
                as_of,
                Some(base),
                None,
                self.ctx.ttls().aggregates,
                started,
            ),
        })
    }

    /// Maturity profile from the first snapshot on or after the as-of date
    pub async fn future(&self, request: &FutureRequest) -> Result<Computed<FutureSeries>> {
        let started = Instant::now();
        let query = FutureQuery::prepare(&self.ctx, &request.spec, &request.filters)?;
        let as_of = request.as_of_date.unwrap_or_else(Self::today);
        let snapshot = SnapshotResolver::new(&self.ctx)
            .resolve_forward(as_of, query.table())
            .await?;

        let data = query.run(snapshot).await?;
        Ok(Computed {
            data,
            meta: Self::meta(
                query.table(),
                as_of,
                Some(snapshot),
                None,
                self.ctx.ttls().aggregates,
                started,
            ),
        })
    }

    /// A page of raw rows
    pub async fn rows(&self, request: &RowsRequest) -> Result<Computed<RowsPage>> {
        let started = Instant::now();
        let query = RowsQuery::prepare(&self.ctx, request)?;
        let as_of = request.as_of_date.unwrap_or_else(Self::today);
        let snapshot = SnapshotResolver::new(&self.ctx)
            .resolve_backward(as_of, query.table())
            .await?;

        let data = query.run(snapshot).await?;
        Ok(Computed {
            data,
            meta: Self::meta(
                query.table(),
                as_of,
                Some(snapshot),
                None,
                self.ctx.ttls().rows,
                started,
            ),
        })
    }

    /// Distinct values of a field
    pub async fn distinct(&self, request: &DistinctRequest) -> Result<Computed<DistinctValues>> {
        let started = Instant::now();
        let query = DistinctQuery::prepare(&self.ctx, request)?;
        let as_of = request.as_of_date.unwrap_or_else(Self::today);
        let snapshot = SnapshotResolver::new(&self.ctx)
            .resolve_backward(as_of, query.table())
            .await?;

        let data = query.run(snapshot).await?;
        Ok(Computed {
            data,
            meta: Self::meta(
                query.table(),
                as_of,
                Some(snapshot),
                None,
                self.ctx.ttls().distinct,
                started,
            ),
        })
    }

    /// Answer any request, folding errors into the envelope
    pub async fn handle(&self, request: &AnalyticsRequest) -> Envelope {
        let outcome = match request {
            AnalyticsRequest::Grouped(r) => respond(self.grouped(r).await, ResponseData::Grouped),
            AnalyticsRequest::Stat(r) => respond(self.stat(r).await, ResponseData::Stat),
            AnalyticsRequest::Historical(r) => {
                respond(self.historical(r).await, ResponseData::Historical)
            }
            AnalyticsRequest::Future(r) => respond(self.future(r).await, ResponseData::Future),
            AnalyticsRequest::Rows(r) => respond(self.rows(r).await, ResponseData::Rows),
            AnalyticsRequest::Distinct(r) => {
                respond(self.distinct(r).await, ResponseData::Distinct)
            }
        };

        match outcome {
            Ok((data, meta)) => {
                tracing::debug!(
                    kind = request.kind(),
                    table = %meta.table,
                    elapsed_ms = meta.elapsed_ms,
                    "analytics request answered"
                );
                Envelope::Success { data, meta }
            }
            Err(err) => {
                if err.is_configuration_error() {
                    tracing::warn!(
                        kind = request.kind(),
                        table = request.table(),
                        error_code = err.code(),
                        error = %err,
                        "analytics request rejected"
                    );
                } else {
                    tracing::error!(
                        kind = request.kind(),
                        table = request.table(),
                        error_code = err.code(),
                        error = %err,
                        "analytics request failed"
                    );
                }
                Envelope::error(&err)
            }
        }
    }

    /// Parse and answer a JSON request
    pub async fn handle_json(&self, json: &str) -> Envelope {
        match AnalyticsRequest::from_json(json) {
            Ok(request) => self.handle(&request).await,
            Err(err) => {
                tracing::warn!(error = %err, "unparseable analytics request");
                Envelope::error(&err)
            }
        }
    }

    /// Drop cached entries matching `pattern`, or the whole namespace when `None`
    pub async fn invalidate(&self, pattern: Option<&str>) -> Result<u64> {
        Ok(self.ctx.cache().invalidate(pattern).await?)
    }
}

fn respond<T>(
    computed: Result<Computed<T>>,
    wrap: fn(T) -> ResponseData,
) -> Result<(ResponseData, Meta)> {
    computed.map(|c| (wrap(c.data), c.meta))
}
