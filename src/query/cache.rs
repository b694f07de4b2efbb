//! LRU + TTL memo of query results.
//!
//! Keys are the canonical query text plus the limit. Every entry records the
//! snapshot generation it was computed against, and lookups only accept
//! entries from the caller's generation. A result that finishes evaluating
//! after a rebuild may still be inserted, but it is never served.

use crate::index::types::ActionRecord;
use lru::LruCache;
use serde::Serialize;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub query: String,
    pub limit: usize,
}

impl CacheKey {
    pub fn new(query: impl Into<String>, limit: usize) -> Self {
        Self {
            query: query.into(),
            limit,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    results: Vec<Arc<ActionRecord>>,
    total_matches: usize,
    generation: u64,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.created_at) >= self.ttl
    }
}

/// A cache hit
#[derive(Debug, Clone)]
pub struct CachedResult {
    pub results: Vec<Arc<ActionRecord>>,
    pub total_matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// 0.0 - 1.0
    pub hit_rate: f64,
}

pub struct ResultCache {
    /// `None` when caching is disabled (`max_size == 0`)
    entries: Option<Mutex<LruCache<CacheKey, CacheEntry>>>,
    max_size: usize,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            entries: NonZeroUsize::new(max_size).map(|cap| Mutex::new(LruCache::new(cap))),
            max_size,
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up `key` as of snapshot `generation`, counting a hit or a miss.
    ///
    /// Expired entries and entries from older generations are evicted.
    /// Entries from a newer generation are left alone but not served.
    pub fn get(&self, key: &CacheKey, generation: u64) -> Option<CachedResult> {
        let found = self.lock().and_then(|mut entries| {
            let entry = entries.peek(key)?;
            if entry.generation > generation {
                return None;
            }
            if entry.generation < generation || entry.is_expired(Instant::now()) {
                entries.pop(key);
                tracing::debug!("evicted stale cache entry: {:?}", key.query);
                return None;
            }
            entries.get(key).map(|entry| CachedResult {
                results: entry.results.clone(),
                total_matches: entry.total_matches,
            })
        });

        match found {
            Some(hit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(hit)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a result computed against snapshot `generation`, evicting the
    /// least recently used entry if full. Never replaces a newer entry.
    pub fn insert(
        &self,
        key: CacheKey,
        generation: u64,
        results: Vec<Arc<ActionRecord>>,
        total_matches: usize,
    ) {
        if let Some(mut entries) = self.lock() {
            if entries
                .peek(&key)
                .is_some_and(|existing| existing.generation > generation)
            {
                return;
            }
            entries.put(
                key,
                CacheEntry {
                    results,
                    total_matches,
                    generation,
                    created_at: Instant::now(),
                    ttl: self.ttl,
                },
            );
        }
    }

    /// Drop every entry; hit/miss counters are kept
    pub fn clear(&self) {
        if let Some(mut entries) = self.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            size: self.len(),
            max_size: self.max_size,
            hits,
            misses,
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
        }
    }

    fn lock(&self) -> Option<MutexGuard<'_, LruCache<CacheKey, CacheEntry>>> {
        let entries = self.entries.as_ref()?;
        Some(match entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        })
    }
}
