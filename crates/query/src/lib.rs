//! Vantage Query - analytical query execution
//!
//! The boundary between the analytics core and the column store. Everything
//! above this crate builds SQL with bound parameters; everything below it is
//! the store's business.
//!
//! # Usage
//!
//! ```ignore
//! use vantage_query::{ClickHouseBackend, QueryBackend, QueryParams, ParamType};
//!
//! let backend = ClickHouseBackend::from_url("http://localhost:8123", "finance");
//!
//! let mut params = QueryParams::new();
//! let desk = params.bind("desk", ParamType::String, "EQ");
//! let sql = format!("SELECT count() AS n FROM positions WHERE desk = {}", desk);
//!
//! let result = backend.execute(&sql, &params).await?;
//! println!("Rows: {}", result.row_count);
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod params;
pub mod result;
pub mod test_utils;

// Re-exports
pub use backend::clickhouse::{ClickHouseBackend, ClickHouseBackendConfig};
pub use backend::{QueryBackend, validate_sql};
pub use config::QueryConfig;
pub use error::QueryError;
pub use params::{ParamType, QueryParam, QueryParams};
pub use result::{Column, DataType, QueryResult, Record};
