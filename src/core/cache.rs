//! Process-wide content cache.
//!
//! A deliberately simple mapping from a semantic cache key to previously
//! generated content. Entries live for the process lifetime: no eviction,
//! no TTL, no size bound. That is acceptable only because the key space is
//! small and fixed (grade x subject x difficulty for stories, difficulty x
//! set-number for word sets).
//!
//! There is no single-flight guarantee: two concurrent misses for the same
//! key may both trigger generation. Writes are idempotent overwrite-last-wins,
//! so the race is an accepted inefficiency, not a correctness problem.
//!
//! The cache is constructed once at process start and handed to each pipeline
//! as an `Arc`, which keeps its lifetime explicit and lets tests substitute a
//! fresh instance per case.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Statistics about cache effectiveness.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of successful lookups.
    pub hits: u64,
    /// Number of failed lookups.
    pub misses: u64,
    /// Current number of entries.
    pub current_size: usize,
}

impl CacheStats {
    /// Cache hit rate in `[0, 1]`. Returns 0.0 before any lookup.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Unbounded keyed cache for generated content.
///
/// All access goes through `tokio::sync::RwLock` for async safety; there is
/// no preemption between an awaited lookup and the subsequent generation, so
/// no further coordination is needed.
pub struct ContentCache<T: Clone> {
    entries: RwLock<HashMap<String, T>>,
    stats: RwLock<CacheStats>,
}

impl<T: Clone> ContentCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Look up previously generated content. Updates hit/miss statistics.
    pub async fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().await;
        let found = entries.get(key).cloned();

        let mut stats = self.stats.write().await;
        match found {
            Some(value) => {
                stats.hits += 1;
                Some(value)
            }
            None => {
                stats.misses += 1;
                None
            }
        }
    }

    /// Store generated content. Last write wins on concurrent inserts.
    pub async fn put(&self, key: impl Into<String>, value: T) {
        let mut entries = self.entries.write().await;
        entries.insert(key.into(), value);

        let mut stats = self.stats.write().await;
        stats.current_size = entries.len();
    }

    /// Check for a key without touching statistics.
    pub async fn contains(&self, key: &str) -> bool {
        let entries = self.entries.read().await;
        entries.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        let entries = self.entries.read().await;
        entries.is_empty()
    }

    /// Remove all entries. Hit/miss counters are cumulative and not reset.
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        entries.clear();

        let mut stats = self.stats.write().await;
        stats.current_size = 0;
    }

    /// Snapshot of current statistics.
    pub async fn stats(&self) -> CacheStats {
        let stats = self.stats.read().await;
        stats.clone()
    }
}

impl<T: Clone> Default for ContentCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
