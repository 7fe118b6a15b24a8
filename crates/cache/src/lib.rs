//! Vantage Cache - read-through caching for analytical queries
//!
//! # Overview
//!
//! - **Store**: [`KvStore`] boundary plus an in-process [`MemoryStore`]
//! - **Keys**: deterministic derivation from query text and parameters,
//!   or explicit semantic keys built with [`fingerprint`]
//! - **Read-through**: [`ReadThroughCache`] executes on miss, serves on hit
//! - **TTLs**: [`CacheTtls`] per kind of request
//!
//! # Usage
//!
//! ```ignore
//! use vantage_cache::{CachedQuery, MemoryStore, ReadThroughCache};
//!
//! let cache = ReadThroughCache::new(backend, Arc::new(MemoryStore::new()));
//! let result = cache
//!     .query(CachedQuery::new(sql, &params, ttls.aggregates))
//!     .await?;
//! ```

pub mod error;
pub mod key;
pub mod read_through;
pub mod store;

use std::time::Duration;

pub use error::{CacheError, Result};
pub use key::{fingerprint, query_key};
pub use read_through::{CacheStats, CachedQuery, DEFAULT_NAMESPACE, ReadThroughCache};
pub use store::{KvStore, MemoryStore};

/// TTLs per kind of cached request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheTtls {
    /// Raw row browsing
    pub rows: Duration,
    /// Grouped, stat, historical and future aggregates
    pub aggregates: Duration,
    /// Distinct-value lookups for filter pickers
    pub distinct: Duration,
    /// Snapshot date resolution (latest snapshot moves as data lands)
    pub snapshot: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            rows: Duration::from_secs(60),
            aggregates: Duration::from_secs(300),
            distinct: Duration::from_secs(3600),
            snapshot: Duration::from_secs(300),
        }
    }
}
