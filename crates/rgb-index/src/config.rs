//! Engine configuration.

/// Tuning knobs for an [`Engine`](crate::Engine).
///
/// ```ignore
/// let engine = Engine::with_config(
///     EngineConfig::default()
///         .with_initial_capacity(10_000)
///         .with_max_cached_queries(64),
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EngineConfig {
    /// Entities to reserve room for up front.
    pub initial_capacity: usize,
    /// Distinct query masks the cache keeps before evicting.
    pub max_cached_queries: usize,
}

impl EngineConfig {
    /// Default number of cached query masks.
    pub const DEFAULT_MAX_CACHED_QUERIES: usize = 256;

    /// Set [`initial_capacity`](Self::initial_capacity).
    #[must_use]
    pub const fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Set [`max_cached_queries`](Self::max_cached_queries).
    #[must_use]
    pub const fn with_max_cached_queries(mut self, max: usize) -> Self {
        self.max_cached_queries = max;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            max_cached_queries: Self::DEFAULT_MAX_CACHED_QUERIES,
        }
    }
}
