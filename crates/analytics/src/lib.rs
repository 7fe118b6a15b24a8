//! Vantage Analytics
//!
//! Snapshot analytics over a columnar store, built on top of `vantage-query`
//! and `vantage-cache`.
//!
//! # Overview
//!
//! Every table holds one immutable copy per snapshot date. This crate turns
//! declarative requests into parameterized SQL against those snapshots:
//!
//! - **Filters**: declarative conditions compiled into bound predicates
//! - **Snapshots**: requested dates aligned to the stored snapshots
//! - **Grouped**: breakdowns by a field, top 11 + Others, two periods compared
//! - **Stat / Historical / Future**: totals, past series and maturity profiles
//! - **Rows / Distinct**: browsing and filter pickers
//!
//! Fields and tables are checked against a [`TableRegistry`]; values never
//! reach SQL text.
//!
//! # Usage
//!
//! ```ignore
//! use vantage_analytics::{AnalyticsEngine, AnalyticsRequest};
//!
//! let engine = AnalyticsEngine::new(backend, store, tables, CacheTtls::default());
//!
//! let request = AnalyticsRequest::from_json(r#"{
//!     "kind": "grouped",
//!     "table": "positions",
//!     "field": "amount",
//!     "aggregation": "sum",
//!     "groupBy": "desk",
//!     "period": "previousMonth"
//! }"#)?;
//!
//! let envelope = engine.handle(&request).await;
//! println!("{}", envelope.to_json());
//! ```

pub mod builder;
pub mod context;
pub mod engine;
pub mod error;
pub mod filter;
pub mod future;
pub mod grouped;
pub mod historical;
pub mod measure;
pub mod period;
pub mod predicate;
pub mod request;
pub mod rows;
pub mod schema;
pub mod series;
pub mod snapshot;
pub mod stat;
pub mod topn;
pub mod value;

#[cfg(test)]
mod builder_test;
#[cfg(test)]
mod filter_test;
#[cfg(test)]
mod series_test;
#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use builder::{BuiltQuery, QueryBuilder};
pub use context::QueryContext;
pub use engine::{AnalyticsEngine, Computed};
pub use error::{AnalyticsError, Result};
pub use filter::{Filter, Operator};
pub use future::{FutureSpec, compute_future};
pub use grouped::compute_grouped;
pub use historical::{HistoricalSpec, compute_historical};
pub use measure::{
    Aggregation, GroupMeasureSpec, MAX_RESULTS, MeasureSpec, NamedMeasure, OrderBy, OrderDirection,
};
pub use period::{ComparePeriod, comparison_target};
pub use predicate::{Predicate, compile};
pub use request::{
    AnalyticsRequest, Envelope, ErrorBody, FutureRequest, GroupedRequest, HistoricalRequest, Meta,
    ResponseData, StatRequest, Window,
};
pub use rows::{
    DistinctRequest, DistinctValues, MAX_LIMIT, RowsPage, RowsRequest, browse_rows,
    distinct_values,
};
pub use schema::{DateEncoding, FieldKind, TableRegistry, TableSchema};
pub use series::{
    Comparison, FuturePoint, FutureSeries, GroupedRow, HistoricalPoint, HistoricalSeries,
    StatMetric,
};
pub use snapshot::{Direction, SnapshotResolver};
pub use stat::{StatSpec, compute_stat};
pub use topn::{OTHERS_LABEL, TOP_N};
