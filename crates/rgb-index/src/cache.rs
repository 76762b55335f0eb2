//! Query result cache.
//!
//! Entries are keyed by [`QueryMask`] and stamped with the
//! [`IndexGeneration`] they were computed at. An entry whose stamp differs
//! from the index's current generation is stale and is recomputed on the next
//! lookup; stale results are never returned.

use crate::{
    FxHashMap,
    index::IndexGeneration,
    query::{QueryMask, QueryResult},
    stats::QueryStats,
};

struct CacheEntry {
    result: QueryResult,
    generation: IndexGeneration,
}

/// Memoized query results plus hit/miss counters.
pub struct QueryCache {
    entries: FxHashMap<QueryMask, CacheEntry>,
    max_entries: usize,
    total_queries: u64,
    cache_hits: u64,
}

impl QueryCache {
    /// Create a cache holding at most `max_entries` masks.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: FxHashMap::default(),
            max_entries: max_entries.max(1),
            total_queries: 0,
            cache_hits: 0,
        }
    }

    /// Count a query and return the cached result if it is current.
    pub fn lookup(&mut self, mask: &QueryMask, generation: IndexGeneration) -> Option<QueryResult> {
        self.total_queries += 1;

        let entry = self.entries.get(mask)?;
        if entry.generation != generation {
            tracing::trace!(?mask, cached = ?entry.generation, current = ?generation, "stale query");
            return None;
        }

        self.cache_hits += 1;
        tracing::trace!(?mask, "query cache hit");
        Some(entry.result.clone())
    }

    /// Store a freshly computed result.
    pub fn store(&mut self, mask: QueryMask, result: QueryResult, generation: IndexGeneration) {
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&mask) {
            self.evict(generation);
        }
        self.entries.insert(mask, CacheEntry { result, generation });
    }

    /// Drop stale entries; if every entry is current, drop them all.
    fn evict(&mut self, generation: IndexGeneration) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.generation == generation);
        if self.entries.len() >= self.max_entries {
            self.entries.clear();
        }
        tracing::debug!(
            evicted = before - self.entries.len(),
            remaining = self.entries.len(),
            "query cache full"
        );
    }

    /// Number of cached masks (current or stale).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Zero the hit/miss counters.
    pub fn reset_stats(&mut self) {
        self.total_queries = 0;
        self.cache_hits = 0;
    }

    /// Snapshot of the counters.
    #[must_use]
    pub fn stats(&self) -> QueryStats {
        QueryStats {
            total_queries: self.total_queries,
            cache_hits: self.cache_hits,
            cached_queries: self.entries.len(),
        }
    }
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.entries.len())
            .field("max_entries", &self.max_entries)
            .field("total_queries", &self.total_queries)
            .field("cache_hits", &self.cache_hits)
            .finish()
    }
}
