//! Keyed memoization with in-flight request sharing

use crate::types::{CacheEntry, CacheStats};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Default time-to-live for cached results (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// An in-flight fetch for one key
struct Pending<V, E> {
    fetch: SharedFetch<V, E>,
    /// Set when a direct `insert` lands while the fetch is running; the
    /// fetch's result is then handed to its waiters but not stored
    superseded: bool,
}

struct State<V, E> {
    entries: HashMap<String, CacheEntry<V>>,
    pending: HashMap<String, Pending<V, E>>,
}

struct Inner<V, E> {
    /// Entries and pending requests share one lock so that the
    /// check-then-register sequence for a key is atomic
    state: Mutex<State<V, E>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
}

/// A TTL cache that runs at most one producer per key at a time
///
/// Cloning is cheap and yields a handle to the same underlying cache.
pub struct FetchCache<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for FetchCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<V, E> FetchCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Create a cache with the default 5 minute TTL
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    entries: HashMap::new(),
                    pending: HashMap::new(),
                }),
                ttl,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Return the cached value for `key`, or run `producer` to obtain it
    ///
    /// A fresh entry is returned without invoking the producer. If another
    /// caller is already fetching `key`, this call waits for and shares that
    /// result. Otherwise the producer is invoked once, its success is stored
    /// (replacing any expired entry) and its failure is returned to every
    /// waiter without being cached.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, producer: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let fetch = {
            let mut state = self.inner.state.lock().await;

            if let Some(entry) = state.entries.get(key) {
                if entry.is_fresh(self.inner.ttl) {
                    self.inner.hits.fetch_add(1, Ordering::Relaxed);
                    debug!(key = %key, "Cache hit");
                    return Ok(entry.data.clone());
                }
                debug!(key = %key, "Cache entry expired");
            }

            if let Some(pending) = state.pending.get(key) {
                self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Joining in-flight request");
                pending.fetch.clone()
            } else {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key = %key, "Cache miss, fetching");
                let fetch = settle_into(Arc::downgrade(&self.inner), key.to_string(), producer());
                state.pending.insert(
                    key.to_string(),
                    Pending {
                        fetch: fetch.clone(),
                        superseded: false,
                    },
                );
                // Driven to completion even if every caller goes away
                tokio::spawn(fetch.clone());
                fetch
            }
        };

        fetch.await
    }

    /// Remove cached entries
    ///
    /// With `None` every entry is dropped; with a prefix only keys starting
    /// with it are. In-flight requests are left running and will store their
    /// result when they settle. Returns the number of entries removed.
    pub async fn clear_cache(&self, prefix: Option<&str>) -> usize {
        let mut state = self.inner.state.lock().await;
        let before = state.entries.len();

        match prefix {
            None => state.entries.clear(),
            Some(prefix) => state.entries.retain(|key, _| !key.starts_with(prefix)),
        }

        let removed = before - state.entries.len();
        debug!(prefix = ?prefix, removed, "Cache cleared");
        removed
    }

    /// Drop a single entry, returning whether one was present
    pub async fn invalidate(&self, key: &str) -> bool {
        self.inner.state.lock().await.entries.remove(key).is_some()
    }

    /// Store a value directly, replacing any entry for `key`
    ///
    /// A fetch for `key` already in flight still answers its waiters, but
    /// its older result no longer replaces this one when it settles.
    pub async fn insert(&self, key: &str, data: V) {
        let mut state = self.inner.state.lock().await;
        if let Some(pending) = state.pending.get_mut(key) {
            debug!(key = %key, "Direct insert supersedes in-flight fetch");
            pending.superseded = true;
        }
        state
            .entries
            .insert(key.to_string(), CacheEntry::new(key.to_string(), data));
    }

    /// Number of stored entries, including expired ones not yet replaced
    pub async fn len(&self) -> usize {
        self.inner.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Whether a fetch for `key` is currently in flight
    pub async fn is_pending(&self, key: &str) -> bool {
        self.inner.state.lock().await.pending.contains_key(key)
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.inner.state.lock().await;
        CacheStats {
            entries: state.entries.len(),
            pending: state.pending.len(),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
        }
    }
}

impl<V, E> Default for FetchCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Wrap a producer future so that, once it settles, it unregisters itself
/// from the pending map and stores a successful result unless a direct
/// insert superseded it.
fn settle_into<V, E, Fut>(inner: Weak<Inner<V, E>>, key: String, fut: Fut) -> SharedFetch<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    async move {
        let result = fut.await;

        if let Some(inner) = inner.upgrade() {
            let mut state = inner.state.lock().await;
            let superseded = state
                .pending
                .remove(&key)
                .map(|p| p.superseded)
                .unwrap_or(false);
            match &result {
                Ok(_) if superseded => {
                    debug!(key = %key, "Fetch superseded, keeping newer entry");
                }
                Ok(data) => {
                    state
                        .entries
                        .insert(key.clone(), CacheEntry::new(key, data.clone()));
                }
                Err(_) => {
                    debug!(key = %key, "Fetch failed, nothing cached");
                }
            }
        }

        result
    }
    .boxed()
    .shared()
}
