//! In-memory fetch cache with request de-duplication
//!
//! Memoizes the result of an async producer under a string key for a fixed
//! TTL, and collapses concurrent requests for the same key into a single
//! in-flight future whose result is shared with every waiter.
//!
//! # Example
//!
//! ```no_run
//! use fetch_cache::FetchCache;
//!
//! # async fn example() -> Result<(), String> {
//! let cache: FetchCache<u32, String> = FetchCache::new();
//!
//! let value = cache
//!     .get_or_fetch("answer", || async { Ok::<_, String>(42) })
//!     .await?;
//! assert_eq!(value, 42);
//!
//! // Drop everything under a prefix
//! cache.clear_cache(Some("ans")).await;
//! # Ok(())
//! # }
//! ```

mod cache;
mod types;

pub use cache::{FetchCache, DEFAULT_TTL};
pub use types::{CacheEntry, CacheStats};
