//! Engine - the query engine facade.
//!
//! The engine owns the component registry, the index store, the query cache
//! and the reactive registry, and keeps them consistent. It never owns entity
//! records: the container that does reports every change through
//! [`add_entity`](Engine::add_entity), [`update_entity`](Engine::update_entity),
//! [`remove_entity`](Engine::remove_entity) or
//! [`set_entities`](Engine::set_entities).
//!
//! Each of those calls runs to completion in a fixed order:
//!
//! 1. bucket migration in the index store,
//! 2. generation bump (which is what stales the cache),
//! 3. reactive diff and subscriber notification.
//!
//! A query issued right after a mutation always sees the post-mutation state.
//!
//! # Example
//!
//! ```ignore
//! let mut engine = Engine::new();
//! let pos = engine.register::<Position>();
//! let vel = engine.register::<Velocity>();
//!
//! let mut record = EntityRecord::new(entity);
//! record.add_component(pos, Position::default())?;
//! engine.add_entity(&record);
//!
//! record.add_component(vel, Velocity::default())?;
//! engine.update_entity(&record);
//!
//! let moving = engine.query_all(&[pos.id(), vel.id()]);
//! assert_eq!(moving.count(), 1);
//! ```

use crate::{
    cache::QueryCache,
    component::{Component, ComponentId, ComponentRegistry, ComponentType},
    config::EngineConfig,
    entity::{Entity, EntityRecord},
    error::IndexResult,
    index::{IndexGeneration, IndexStore},
    query::{QueryMask, QueryResult},
    reactive::{QueryChange, ReactiveQueryId, ReactiveRegistry, SubscriptionId},
    stats::{EngineStats, IndexStats},
};

/// The query engine: registry, index, cache and reactive queries.
pub struct Engine {
    config: EngineConfig,
    registry: ComponentRegistry,
    index: IndexStore,
    cache: QueryCache,
    reactive: ReactiveRegistry,
    /// Nesting depth of [`batch`](Engine::batch) calls.
    batch_depth: u32,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Create an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with the given configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            registry: ComponentRegistry::new(),
            index: IndexStore::with_capacity(config.initial_capacity),
            cache: QueryCache::new(config.max_cached_queries),
            reactive: ReactiveRegistry::new(),
            batch_depth: 0,
            config,
        }
    }

    /// The configuration this engine was built with.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ==================== Component Types ====================

    /// Register a component type, returning its handle.
    pub fn register<T: Component>(&mut self) -> ComponentType<T> {
        self.registry.register::<T>()
    }

    /// Get the handle for a type, if registered.
    #[must_use]
    pub fn component<T: Component>(&self) -> Option<ComponentType<T>> {
        self.registry.get::<T>()
    }

    /// The component type registry.
    #[must_use]
    pub const fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    // ==================== Entity Set Mutation ====================

    /// Start indexing an entity under its current signature.
    ///
    /// Returns `true` if the entity was not indexed before. Adding an entity
    /// that is already indexed behaves like [`update_entity`](Self::update_entity).
    pub fn add_entity(&mut self, record: &EntityRecord) -> bool {
        let is_new = !self.index.contains(record.entity());
        self.sync(record);
        is_new
    }

    /// Re-derive bucket placement after the record's components changed.
    ///
    /// Idempotent: if the signature is unchanged this is a no-op, the
    /// generation stays put and no subscriber is notified. Returns `true` if
    /// the entity moved.
    pub fn update_entity(&mut self, record: &EntityRecord) -> bool {
        self.sync(record)
    }

    /// Stop indexing an entity. Returns `false` if it was not indexed.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        let Some(migration) = self.index.remove(entity) else {
            return false;
        };
        self.reactive.record(&migration);
        self.flush_if_idle();
        true
    }

    /// Replace the indexed entity set wholesale.
    ///
    /// The index is rebuilt in one pass rather than by replaying individual
    /// adds; reactive queries are diffed once against the rebuilt index.
    pub fn set_entities<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = &'a EntityRecord>,
    {
        self.index
            .rebuild(records.into_iter().map(|r| (r.entity(), r.signature())));
        self.reactive.resync(&self.index);
        self.flush_if_idle();
    }

    /// Run `f` as one mutation batch.
    ///
    /// Reactive subscribers are notified once, with the net change, when the
    /// outermost batch returns, instead of once per mutation inside it.
    /// Queries issued inside the batch still see every mutation immediately.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = f(self);
        self.batch_depth -= 1;
        self.flush_if_idle();
        result
    }

    fn sync(&mut self, record: &EntityRecord) -> bool {
        let Some(migration) = self.index.place(record.entity(), record.signature()) else {
            return false;
        };
        self.reactive.record(&migration);
        self.flush_if_idle();
        true
    }

    fn flush_if_idle(&mut self) {
        if self.batch_depth == 0 {
            self.reactive.flush();
        }
    }

    // ==================== Queries ====================

    /// Entities having every component in `types`.
    pub fn query_all(&mut self, types: &[ComponentId]) -> QueryResult {
        self.query(&QueryMask::new(types))
    }

    /// Entities matching `mask`, served from the cache when current.
    pub fn query(&mut self, mask: &QueryMask) -> QueryResult {
        let generation = self.index.generation();
        if let Some(result) = self.cache.lookup(mask, generation) {
            return result;
        }

        let result = mask.evaluate(&self.index);
        self.cache.store(mask.clone(), result.clone(), generation);
        result
    }

    /// Evaluate `mask` directly against the index, bypassing the cache and
    /// its counters.
    #[must_use]
    pub fn query_uncached(&self, mask: &QueryMask) -> QueryResult {
        mask.evaluate(&self.index)
    }

    // ==================== Reactive Queries ====================

    /// Create a live query over entities having every component in `types`.
    pub fn create_reactive_query(&mut self, types: &[ComponentId]) -> ReactiveQueryId {
        self.create_reactive(QueryMask::new(types))
    }

    /// Create a live query over `mask`. Its initial set comes from
    /// [`query`](Self::query); subscribers are not told about it.
    pub fn create_reactive(&mut self, mask: QueryMask) -> ReactiveQueryId {
        let initial = self.query(&mask);
        self.reactive.create(mask, &initial)
    }

    /// Destroy a live query. Effective immediately: no callback for it runs
    /// after this returns, even for changes already pending in a batch.
    pub fn destroy_reactive_query(&mut self, query: ReactiveQueryId) -> IndexResult<()> {
        self.reactive.destroy(query)
    }

    /// Call `callback` every time the query's matching set changes.
    pub fn subscribe<F>(&mut self, query: ReactiveQueryId, callback: F) -> IndexResult<SubscriptionId>
    where
        F: FnMut(&QueryChange<'_>) + Send + 'static,
    {
        self.reactive.subscribe(query, callback)
    }

    /// Detach a callback.
    pub fn unsubscribe(
        &mut self,
        query: ReactiveQueryId,
        subscription: SubscriptionId,
    ) -> IndexResult<()> {
        self.reactive.unsubscribe(query, subscription)
    }

    /// The matching set as of the last notification.
    pub fn reactive_entities(&self, query: ReactiveQueryId) -> IndexResult<QueryResult> {
        self.reactive.entities(query)
    }

    // ==================== Introspection ====================

    /// Check whether an entity is indexed.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.index.contains(entity)
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.index.len()
    }

    /// The index store.
    #[must_use]
    pub const fn index(&self) -> &IndexStore {
        &self.index
    }

    /// Current index generation.
    #[must_use]
    pub const fn generation(&self) -> IndexGeneration {
        self.index.generation()
    }

    /// Diagnostic counters.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            entity_count: self.index.len(),
            index: IndexStats::new(self.index.bucket_count(), self.index.generation()),
            queries: self.cache.stats(),
            reactive_queries: self.reactive.len(),
        }
    }

    /// Zero the query counters.
    pub fn reset_query_stats(&mut self) {
        self.cache.reset_stats();
    }

    /// Tear everything down: reactive queries (silently), cache, index, then
    /// the registry.
    ///
    /// Every [`ComponentType`] handle and [`EntityRecord`] built against this
    /// engine is meaningless afterwards; the caller must drop them first.
    pub fn reset(&mut self) {
        tracing::debug!(
            entities = self.index.len(),
            reactive_queries = self.reactive.len(),
            "resetting engine"
        );
        self.reactive.clear();
        self.cache.clear();
        self.cache.reset_stats();
        self.index.clear();
        self.registry.reset();
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("entity_count", &self.index.len())
            .field("component_types", &self.registry.len())
            .field("bucket_count", &self.index.bucket_count())
            .field("generation", &self.index.generation())
            .field("reactive_queries", &self.reactive.len())
            .finish()
    }
}
