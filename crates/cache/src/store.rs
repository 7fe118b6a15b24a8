//! Key-value store boundary
//!
//! The cache talks to its store only through [`KvStore`]. Production stores
//! are external, network-accessed services; [`MemoryStore`] is the
//! in-process implementation used for single-node runs and tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{CacheError, Result};

/// Byte-valued key-value store with expiry and pattern deletion
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the value for a key, `None` if absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Set a value that expires after `ttl`
    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()>;

    /// Delete every key matching a glob pattern, returning the count
    async fn delete_matching(&self, pattern: &str) -> Result<u64>;

    /// Store name for logging
    fn name(&self) -> &'static str;
}

struct StoredValue {
    bytes: Vec<u8>,
    expires_at: Instant,
}

/// Writes between sweeps of expired entries
const SWEEP_EVERY: u64 = 256;

/// In-process store with passive expiry
///
/// Expired entries are dropped when read, and swept from the map every
/// [`SWEEP_EVERY`] writes. There is no background task.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
    writes: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .values()
            .filter(|v| v.expires_at > now)
            .count()
    }

    /// Check if the store holds no live entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .iter()
            .filter(|(_, v)| v.expires_at > now)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(stored) if stored.expires_at > Instant::now() => Ok(Some(stored.bytes.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_expiry(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            entries.retain(|_, stored| stored.expires_at > now);
        }
        entries.insert(
            key.to_string(),
            StoredValue {
                bytes: value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn delete_matching(&self, pattern: &str) -> Result<u64> {
        let matcher = glob::Pattern::new(pattern).map_err(|e| CacheError::Pattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let now = Instant::now();
        let mut entries = self.entries.lock();
        let mut deleted = 0;
        entries.retain(|key, stored| {
            if !matcher.matches(key) {
                return true;
            }
            if stored.expires_at > now {
                deleted += 1;
            }
            false
        });
        Ok(deleted)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
