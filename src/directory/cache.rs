//! Recipient caches
//!
//! Uses moka for thread-safe concurrent caching. The short cache expires
//! entries a fixed time after insertion; the fallback cache never expires
//! and is only ever overwritten by a newer fetch.

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::client::Recipients;

/// Lifetime of short cache entries
pub const SHORT_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Cached recipients of one team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedRecipients {
    pub recipients: Recipients,
    /// When the row was fetched from the directory
    pub fetched_at: DateTime<Utc>,
}

/// Team to recipients cache with hit/miss accounting
pub struct RecipientCache {
    cache: Cache<String, CachedRecipients>,
    hits: AtomicU64,
    misses: AtomicU64,
    /// None for a cache whose entries never expire
    ttl: Option<Duration>,
}

impl RecipientCache {
    /// Cache whose entries expire `ttl` after insertion, regardless of reads
    pub fn short(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().time_to_live(ttl).build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            ttl: Some(ttl),
        }
    }

    /// Cache whose entries live until overwritten
    pub fn fallback() -> Self {
        Self {
            cache: Cache::builder().build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            ttl: None,
        }
    }

    pub fn get(&self, team: &str) -> Option<CachedRecipients> {
        if let Some(entry) = self.cache.get(team) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            Some(entry)
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            None
        }
    }

    /// Store (or overwrite) the recipients of `team`.
    ///
    /// The whole entry is replaced at once; readers never see a partial one.
    pub fn put(&self, team: &str, entry: CachedRecipients) {
        self.cache.insert(team.to_string(), entry);
    }

    /// Read without touching the hit/miss counters
    pub fn peek(&self, team: &str) -> Option<CachedRecipients> {
        self.cache.get(team)
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        CacheStats {
            hits,
            misses,
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
            entry_count: self.cache.entry_count(),
            ttl_secs: self.ttl.map(|ttl| ttl.as_secs()),
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Hit rate (0.0 - 1.0)
    pub hit_rate: f64,
    /// Approximate; moka applies pending writes lazily
    pub entry_count: u64,
    pub ttl_secs: Option<u64>,
}
