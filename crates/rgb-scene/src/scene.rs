//! Scene - owns entities and their records, and drives systems.

use rgb_index::{
    Component, ComponentId, ComponentType, Engine, EngineConfig, EngineStats, Entity,
    EntityRecord, IndexResult, QueryChange, QueryMask, QueryResult, ReactiveQueryId,
    SubscriptionId,
};

use crate::{
    error::{SceneError, SceneResult},
    plugin::Plugin,
    store::EntityStore,
    system::{System, SystemContext},
};

/// A container of entities indexed by one [`Engine`].
///
/// Every structural change made through the scene is reported to the engine
/// before the call returns, so queries always reflect the current records.
///
/// ```ignore
/// let mut scene = Scene::new();
/// let pos = scene.register::<Position>();
/// let vel = scene.register::<Velocity>();
///
/// let e = scene.spawn_with(|r| {
///     r.add_component(pos, Position::default())?;
///     r.add_component(vel, Velocity { x: 1.0, y: 0.0 })
/// })?;
///
/// scene.remove(e, vel)?;
/// assert!(scene.query_all(&[pos.id(), vel.id()]).is_empty());
/// ```
pub struct Scene {
    engine: Engine,
    store: EntityStore,
    systems: Vec<Box<dyn System>>,
    tick: u64,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create an empty scene.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an empty scene whose engine uses `config`.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            store: EntityStore::with_capacity(config.initial_capacity),
            engine: Engine::with_config(config),
            systems: Vec::new(),
            tick: 0,
        }
    }

    /// Add a plugin to this scene.
    pub fn add_plugin<P: Plugin>(&mut self, plugin: P) -> &mut Self {
        tracing::debug!(plugin = plugin.name(), "adding plugin");
        plugin.build(self);
        self
    }

    /// Register a component type.
    pub fn register<T: Component>(&mut self) -> ComponentType<T> {
        self.engine.register::<T>()
    }

    /// Get the handle for a type, if registered.
    #[must_use]
    pub fn component<T: Component>(&self) -> Option<ComponentType<T>> {
        self.engine.component::<T>()
    }

    // ==================== Entities ====================

    /// Spawn an entity with no components.
    pub fn spawn(&mut self) -> Entity {
        self.store.spawn_empty(&mut self.engine)
    }

    /// Spawn an entity, attaching components with `build` before it is
    /// indexed. Nothing is spawned if `build` fails.
    pub fn spawn_with(
        &mut self,
        build: impl FnOnce(&mut EntityRecord) -> IndexResult<()>,
    ) -> SceneResult<Entity> {
        self.store.spawn(&mut self.engine, build)
    }

    /// Despawn an entity.
    pub fn despawn(&mut self, entity: Entity) -> SceneResult<()> {
        self.store.despawn(&mut self.engine, entity)
    }

    /// Check whether an entity is alive.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.store.is_alive(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.store.len()
    }

    // ==================== Components ====================

    /// Attach a component.
    pub fn insert<T: Component>(
        &mut self,
        entity: Entity,
        ty: ComponentType<T>,
        value: T,
    ) -> SceneResult<()> {
        self.modify(entity, |record| record.add_component(ty, value))?
            .map_err(SceneError::from)
    }

    /// Detach a component, returning its value.
    pub fn remove<T: Component>(&mut self, entity: Entity, ty: ComponentType<T>) -> SceneResult<T> {
        self.modify(entity, |record| record.remove_component(ty))?
            .map_err(SceneError::from)
    }

    /// Read a component.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity, ty: ComponentType<T>) -> Option<&T> {
        self.store.get(entity)?.get_component(ty)
    }

    /// Write a component in place. This cannot change the entity's signature.
    pub fn get_mut<T: Component>(&mut self, entity: Entity, ty: ComponentType<T>) -> Option<&mut T> {
        self.store.get_mut(entity)?.get_component_mut(ty)
    }

    /// Check whether an entity has a component.
    #[must_use]
    pub fn has(&self, entity: Entity, id: impl Into<ComponentId>) -> bool {
        self.store
            .get(entity)
            .is_some_and(|record| record.has_component(id))
    }

    /// The full record of an entity.
    #[must_use]
    pub fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.store.get(entity)
    }

    /// Run `f` on an entity's record, then re-index it.
    pub fn modify<R>(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut EntityRecord) -> R,
    ) -> SceneResult<R> {
        self.store.modify(&mut self.engine, entity, f)
    }

    // ==================== Queries ====================

    /// Entities having every component in `types`.
    pub fn query_all(&mut self, types: &[ComponentId]) -> QueryResult {
        self.engine.query_all(types)
    }

    /// Entities matching `mask`.
    pub fn query(&mut self, mask: &QueryMask) -> QueryResult {
        self.engine.query(mask)
    }

    /// Create a live query over entities having every component in `types`.
    pub fn create_reactive_query(&mut self, types: &[ComponentId]) -> ReactiveQueryId {
        self.engine.create_reactive_query(types)
    }

    /// Destroy a live query.
    pub fn destroy_reactive_query(&mut self, query: ReactiveQueryId) -> SceneResult<()> {
        Ok(self.engine.destroy_reactive_query(query)?)
    }

    /// Call `callback` every time the query's matching set changes.
    pub fn subscribe<F>(&mut self, query: ReactiveQueryId, callback: F) -> SceneResult<SubscriptionId>
    where
        F: FnMut(&QueryChange<'_>) + Send + 'static,
    {
        Ok(self.engine.subscribe(query, callback)?)
    }

    /// Detach a callback.
    pub fn unsubscribe(
        &mut self,
        query: ReactiveQueryId,
        subscription: SubscriptionId,
    ) -> SceneResult<()> {
        Ok(self.engine.unsubscribe(query, subscription)?)
    }

    /// The committed matching set of a live query.
    pub fn reactive_entities(&self, query: ReactiveQueryId) -> SceneResult<QueryResult> {
        Ok(self.engine.reactive_entities(query)?)
    }

    /// The engine indexing this scene.
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Engine diagnostics.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }

    // ==================== Systems ====================

    /// Add a system. Systems run in the order they were added.
    pub fn add_system(&mut self, system: impl System + 'static) -> &mut Self {
        tracing::debug!(system = system.name(), interval = system.interval(), "adding system");
        self.systems.push(Box::new(system));
        self
    }

    /// Number of ticks run so far.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick
    }

    /// Run every system due this tick.
    ///
    /// Each system sees the entities matching its pattern when it starts. Its
    /// queued commands are applied before the next system starts, so later
    /// systems see earlier systems' structural changes. A failing command does
    /// not stop the tick; the first failure is returned at the end.
    pub fn tick(&mut self) -> SceneResult<()> {
        let tick = self.tick;
        self.tick += 1;

        let mut first_error = None;
        let mut systems = std::mem::take(&mut self.systems);
        for system in &mut systems {
            if tick % system.interval().max(1) != 0 {
                continue;
            }

            let entities = self.engine.query(&system.pattern());
            let _span = tracing::trace_span!("system", name = system.name(), tick).entered();
            tracing::trace!(entities = entities.count(), "running");

            let mut ctx = SystemContext::new(tick, entities, &mut self.store);
            system.run(&mut ctx);
            let commands = ctx.into_commands();

            if let Err(err) = commands.apply(&mut self.store, &mut self.engine) {
                first_error.get_or_insert(err);
            }
        }
        self.systems = systems;

        first_error.map_or(Ok(()), Err)
    }

    /// Drop every entity, system and reactive query, then reset the engine.
    ///
    /// Component handles obtained before the call are invalid afterwards.
    pub fn clear(&mut self) {
        tracing::debug!(
            entities = self.store.len(),
            systems = self.systems.len(),
            "clearing scene"
        );
        self.store.clear();
        self.systems.clear();
        self.engine.reset();
    }
}

impl std::fmt::Debug for Scene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scene")
            .field("entity_count", &self.store.len())
            .field("systems", &self.systems.len())
            .field("tick", &self.tick)
            .field("engine", &self.engine)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;
    use rgb_index::IndexError;

    use super::*;
    use crate::system::system_fn;

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[test]
    fn test_spawn_and_query() {
        let mut scene = Scene::new();
        let pos = scene.register::<Position>();
        let vel = scene.register::<Velocity>();

        let e1 = scene
            .spawn_with(|r| r.add_component(pos, Position::default()))
            .unwrap();
        let e2 = scene
            .spawn_with(|r| {
                r.add_component(pos, Position::default())?;
                r.add_component(vel, Velocity::default())
            })
            .unwrap();

        assert_eq!(scene.query_all(&[pos.id()]).to_sorted_vec(), vec![e1, e2]);
        assert_eq!(scene.query_all(&[pos.id(), vel.id()]).as_slice(), &[e2]);
        assert_eq!(scene.entity_count(), 2);
    }

    #[test]
    fn test_failed_spawn_leaves_nothing() {
        let mut scene = Scene::new();
        let pos = scene.register::<Position>();

        let err = scene
            .spawn_with(|r| {
                r.add_component(pos, Position::default())?;
                r.add_component(pos, Position::default())
            })
            .unwrap_err();

        assert!(matches!(
            err,
            SceneError::Index(IndexError::DuplicateComponent { .. })
        ));
        assert_eq!(scene.entity_count(), 0);
        assert_eq!(scene.stats().entity_count, 0);
    }

    #[test]
    fn test_insert_and_remove_update_index() {
        let mut scene = Scene::new();
        let pos = scene.register::<Position>();
        let vel = scene.register::<Velocity>();
        let e = scene.spawn();

        scene.insert(e, pos, Position { x: 1.0, y: 2.0 }).unwrap();
        scene.insert(e, vel, Velocity::default()).unwrap();
        assert_eq!(scene.query_all(&[pos.id(), vel.id()]).as_slice(), &[e]);

        let removed = scene.remove(e, vel).unwrap();
        assert_eq!(removed, Velocity::default());
        assert!(scene.query_all(&[pos.id(), vel.id()]).is_empty());
        assert!(scene.has(e, pos));
        assert!(!scene.has(e, vel));

        assert!(matches!(
            scene.remove(e, vel),
            Err(SceneError::Index(IndexError::MissingComponent { .. }))
        ));
    }

    #[test]
    fn test_get_mut_keeps_signature() {
        let mut scene = Scene::new();
        let pos = scene.register::<Position>();
        let e = scene.spawn_with(|r| r.add_component(pos, Position::default())).unwrap();
        let generation = scene.engine().generation();

        scene.get_mut(e, pos).unwrap().x = 5.0;

        assert_eq!(scene.get(e, pos).unwrap().x, 5.0);
        assert_eq!(scene.engine().generation(), generation);
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut scene = Scene::new();
        let pos = scene.register::<Position>();
        let old = scene.spawn();
        scene.despawn(old).unwrap();
        let new = scene.spawn();

        assert_eq!(new.id(), old.id());
        assert!(!scene.is_alive(old));
        assert_eq!(scene.despawn(old), Err(SceneError::EntityNotFound(old)));
        assert_eq!(
            scene.insert(old, pos, Position::default()),
            Err(SceneError::EntityNotFound(old))
        );
        assert!(scene.get(old, pos).is_none());
        assert!(scene.is_alive(new));
    }

    #[test]
    fn test_reactive_through_scene() {
        let mut scene = Scene::new();
        let pos = scene.register::<Position>();
        let vel = scene.register::<Velocity>();
        let e = scene
            .spawn_with(|r| {
                r.add_component(pos, Position::default())?;
                r.add_component(vel, Velocity::default())
            })
            .unwrap();

        let query = scene.create_reactive_query(&[pos.id(), vel.id()]);
        let removed: Arc<Mutex<Vec<Entity>>> = Arc::default();
        let sink = removed.clone();
        scene
            .subscribe(query, move |change| sink.lock().extend_from_slice(change.removed))
            .unwrap();

        scene.remove(e, vel).unwrap();

        assert_eq!(*removed.lock(), vec![e]);
        assert!(scene.reactive_entities(query).unwrap().is_empty());
    }

    #[test]
    fn test_system_interval() {
        let mut scene = Scene::new();
        let runs = Arc::new(Mutex::new(Vec::new()));
        let sink = runs.clone();
        scene.add_system(
            system_fn("every_third", QueryMask::default(), move |ctx| {
                sink.lock().push(ctx.tick());
            })
            .every(3),
        );

        for _ in 0..7 {
            scene.tick().unwrap();
        }

        assert_eq!(*runs.lock(), vec![0, 3, 6]);
        assert_eq!(scene.tick_count(), 7);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut scene = Scene::new();
        let pos = scene.register::<Position>();
        let e = scene.spawn_with(|r| r.add_component(pos, Position::default())).unwrap();
        scene.create_reactive_query(&[pos.id()]);
        scene.add_system(system_fn("noop", QueryMask::default(), |_| {}));

        scene.clear();

        assert_eq!(scene.entity_count(), 0);
        assert!(!scene.is_alive(e));
        assert_eq!(scene.stats().reactive_queries, 0);
        assert!(scene.engine().registry().is_empty());
        assert!(scene.component::<Position>().is_none());
    }
}
