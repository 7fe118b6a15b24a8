//! Shared dependencies of every aggregator

use std::time::Duration;

use vantage_cache::{CacheTtls, CachedQuery, ReadThroughCache};
use vantage_query::QueryResult;

use crate::builder::BuiltQuery;
use crate::error::Result;
use crate::schema::{TableRegistry, TableSchema};

/// Cache, table registry and TTL policy, constructed once and passed by
/// reference into every component
pub struct QueryContext {
    cache: ReadThroughCache,
    tables: TableRegistry,
    ttls: CacheTtls,
}

impl QueryContext {
    /// Create a context
    pub fn new(cache: ReadThroughCache, tables: TableRegistry, ttls: CacheTtls) -> Self {
        Self {
            cache,
            tables,
            ttls,
        }
    }

    /// Read-through cache
    pub fn cache(&self) -> &ReadThroughCache {
        &self.cache
    }

    /// Table registry
    pub fn tables(&self) -> &TableRegistry {
        &self.tables
    }

    /// Cache TTLs
    pub fn ttls(&self) -> &CacheTtls {
        &self.ttls
    }

    /// Look up a table
    pub fn table(&self, name: &str) -> Result<&TableSchema> {
        self.tables.get(name)
    }

    /// Run a built query through the cache
    ///
    /// Without a key the entry is keyed by SQL text and parameters.
    pub async fn fetch(
        &self,
        query: &BuiltQuery,
        key: Option<String>,
        ttl: Duration,
    ) -> Result<QueryResult> {
        tracing::debug!(sql = %query.inline(), key = ?key, "analytics query");

        let mut cached = CachedQuery::new(&query.sql, &query.params, ttl);
        if let Some(key) = key {
            cached = cached.with_key(key);
        }
        Ok(self.cache.query(cached).await?)
    }
}
