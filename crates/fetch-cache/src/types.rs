//! Cache types

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// A memoized producer result
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub key: String,
    pub data: V,
    /// When the producer that created this entry settled
    pub timestamp: Instant,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(key: String, data: V) -> Self {
        Self {
            key,
            data,
            timestamp: Instant::now(),
        }
    }

    /// Whether the entry may still be served for the given TTL
    pub fn is_fresh(&self, ttl: std::time::Duration) -> bool {
        self.timestamp.elapsed() < ttl
    }
}

/// Statistics about the cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub pending: usize,
    pub hits: u64,
    pub misses: u64,
    /// Calls that joined an already in-flight request
    pub coalesced: u64,
}
