//! Read-through cache
//!
//! Wraps query execution with get-or-compute-and-store semantics:
//!
//! 1. **Hit**: stored bytes are decoded and returned; the backend is not called
//! 2. **Miss**: the query runs, the result is stored with its TTL, then returned
//!
//! The store is never load-bearing. A failed or corrupt read counts as a miss
//! and a failed write is logged; the caller gets the same answer either way.
//! Backend errors are passed through untouched and never cached.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::de::DeserializeOwned;
use vantage_query::{QueryBackend, QueryError, QueryParams, QueryResult};

use crate::error::Result;
use crate::key::query_key;
use crate::store::KvStore;

/// Default key namespace
pub const DEFAULT_NAMESPACE: &str = "vantage";

/// Cache statistics
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from the store
    pub hits: AtomicU64,

    /// Lookups that went to the backend
    pub misses: AtomicU64,

    /// Store reads or writes that failed
    pub store_errors: AtomicU64,
}

impl CacheStats {
    /// Hit rate (0.0 - 1.0)
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let total = hits + self.misses.load(Ordering::Relaxed);
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Reset statistics
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.store_errors.store(0, Ordering::Relaxed);
    }
}

/// One cacheable query
#[derive(Debug, Clone)]
pub struct CachedQuery<'a> {
    /// SQL text with placeholders
    pub sql: &'a str,
    /// Bound parameters
    pub params: &'a QueryParams,
    /// Semantic key; derived from `sql` and `params` when absent
    pub key: Option<String>,
    /// Time to live of the stored entry
    pub ttl: Duration,
}

impl<'a> CachedQuery<'a> {
    /// Create a query keyed by its text and parameters
    pub fn new(sql: &'a str, params: &'a QueryParams, ttl: Duration) -> Self {
        Self {
            sql,
            params,
            key: None,
            ttl,
        }
    }

    /// Use an explicit key instead of the derived one
    ///
    /// Callers derive it from the semantic request so that queries which
    /// differ only cosmetically share an entry.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }
}

/// Read-through cache over a query backend and a key-value store
pub struct ReadThroughCache {
    backend: Arc<dyn QueryBackend>,
    store: Arc<dyn KvStore>,
    namespace: String,
    enabled: bool,
    stats: CacheStats,
}

impl ReadThroughCache {
    /// Create a cache with the default namespace
    pub fn new(backend: Arc<dyn QueryBackend>, store: Arc<dyn KvStore>) -> Self {
        Self {
            backend,
            store,
            namespace: DEFAULT_NAMESPACE.to_string(),
            enabled: true,
            stats: CacheStats::default(),
        }
    }

    /// Set the key namespace
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Enable or bypass the store
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Key namespace
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Cache statistics
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// The wrapped backend
    pub fn backend(&self) -> &dyn QueryBackend {
        self.backend.as_ref()
    }

    /// Full store key for a query
    pub fn key_for(&self, query: &CachedQuery<'_>) -> String {
        let key = match &query.key {
            Some(key) => key.clone(),
            None => query_key(query.sql, query.params),
        };
        format!("{}:{}", self.namespace, key)
    }

    /// Execute a query, answering from the store when possible
    pub async fn query(
        &self,
        query: CachedQuery<'_>,
    ) -> std::result::Result<QueryResult, QueryError> {
        if !self.enabled {
            return self.backend.execute(query.sql, query.params).await;
        }

        let key = self.key_for(&query);

        if let Some(result) = self.lookup(&key).await {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(key = %key, rows = result.row_count, "cache hit");
            return Ok(result);
        }
        self.stats.misses.fetch_add(1, Ordering::Relaxed);

        let result = self.backend.execute(query.sql, query.params).await?;

        tracing::debug!(
            key = %key,
            rows = result.row_count,
            ttl_secs = query.ttl.as_secs(),
            "cache miss, storing result"
        );
        self.store(&key, &result, query.ttl).await;

        Ok(result)
    }

    /// Execute a query and deserialize each row into `T`
    ///
    /// Rows are presented as objects keyed by column name.
    pub async fn query_as<T: DeserializeOwned>(
        &self,
        query: CachedQuery<'_>,
    ) -> std::result::Result<Vec<T>, QueryError> {
        let result = self.query(query).await?;
        result
            .records()
            .into_iter()
            .map(|record| {
                serde_json::from_value(serde_json::Value::Object(record)).map_err(QueryError::from)
            })
            .collect()
    }

    /// Delete cached entries in this namespace
    ///
    /// Deletes keys matching `<namespace>:<pattern>` and returns how many
    /// went. Without a pattern, the whole namespace goes; keys written by
    /// other namespaces sharing the store are kept. An administrative
    /// operation; store errors are returned, not swallowed.
    pub async fn invalidate(&self, pattern: Option<&str>) -> Result<u64> {
        let full = format!("{}:{}", self.namespace, pattern.unwrap_or("*"));
        let deleted = self.store.delete_matching(&full).await?;
        tracing::info!(pattern = %full, deleted, store = self.store.name(), "cache invalidated");
        Ok(deleted)
    }

    async fn lookup(&self, key: &str) -> Option<QueryResult> {
        let bytes = match self.store.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                self.stats.store_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(key = %key, error = %e, "cache read failed, executing query");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "corrupt cache entry, executing query");
                None
            }
        }
    }

    async fn store(&self, key: &str, result: &QueryResult, ttl: Duration) {
        let bytes = match serde_json::to_vec(result) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to encode result for cache");
                return;
            }
        };

        if let Err(e) = self.store.set_with_expiry(key, bytes, ttl).await {
            self.stats.store_errors.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(key = %key, error = %e, "cache write failed, result not cached");
        }
    }
}

#[cfg(test)]
#[path = "read_through_test.rs"]
mod tests;
