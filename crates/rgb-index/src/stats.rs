//! Diagnostic counters. Observational only; nothing here affects query results.

use crate::index::IndexGeneration;

/// Index shape.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct IndexStats {
    /// Live buckets (distinct signatures in use).
    pub bucket_count: usize,
    /// Current index generation.
    pub generation: u64,
}

impl IndexStats {
    pub(crate) const fn new(bucket_count: usize, generation: IndexGeneration) -> Self {
        Self {
            bucket_count,
            generation: generation.get(),
        }
    }
}

/// Query cache counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct QueryStats {
    /// Every `query` / `query_all` call, hit or miss.
    pub total_queries: u64,
    /// Calls answered from the cache.
    pub cache_hits: u64,
    /// Masks currently held by the cache.
    pub cached_queries: usize,
}

impl QueryStats {
    /// Fraction of queries answered from the cache, `0.0` if none were issued.
    #[must_use]
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_queries as f64
        }
    }
}

/// Everything [`Engine::stats`](crate::Engine::stats) reports.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EngineStats {
    pub entity_count: usize,
    pub index: IndexStats,
    pub queries: QueryStats,
    /// Live reactive queries.
    pub reactive_queries: usize,
}
