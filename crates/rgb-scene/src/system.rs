//! Systems - per-tick logic over the entities matching a pattern.

use std::fmt;

use rgb_index::{Component, ComponentType, Entity, EntityRecord, QueryMask, QueryResult};

use crate::{commands::Commands, store::EntityStore};

/// Logic run by [`Scene::tick`](crate::Scene::tick).
///
/// ```ignore
/// struct Gravity {
///     pattern: QueryMask,
///     vel: ComponentType<Velocity>,
/// }
///
/// impl System for Gravity {
///     fn name(&self) -> &str {
///         "gravity"
///     }
///
///     fn pattern(&self) -> QueryMask {
///         self.pattern.clone()
///     }
///
///     fn run(&mut self, ctx: &mut SystemContext<'_>) {
///         for entity in &ctx.entities() {
///             if let Some(vel) = ctx.get_mut(entity, self.vel) {
///                 vel.y -= 9.8;
///             }
///         }
///     }
/// }
/// ```
pub trait System: Send {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Entities this system runs over.
    fn pattern(&self) -> QueryMask;

    /// Run on every `interval`-th tick. `0` is treated as `1`.
    fn interval(&self) -> u64 {
        1
    }

    fn run(&mut self, ctx: &mut SystemContext<'_>);
}

/// What a running system can see and do.
///
/// Component values may be read and written in place. Changes to which
/// components an entity has go through [`commands`](Self::commands).
pub struct SystemContext<'a> {
    tick: u64,
    entities: QueryResult,
    store: &'a mut EntityStore,
    commands: Commands,
}

impl<'a> SystemContext<'a> {
    pub(crate) fn new(tick: u64, entities: QueryResult, store: &'a mut EntityStore) -> Self {
        Self {
            tick,
            entities,
            store,
            commands: Commands::new(),
        }
    }

    /// The tick being run, starting at 0.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Entities matching the system's pattern at the start of its run.
    ///
    /// Returned as a cheap snapshot so the context stays free for writes
    /// while iterating.
    #[must_use]
    pub fn entities(&self) -> QueryResult {
        self.entities.clone()
    }

    /// Read a component of any live entity.
    #[must_use]
    pub fn get<T: Component>(&self, entity: Entity, ty: ComponentType<T>) -> Option<&T> {
        self.store.get(entity)?.get_component(ty)
    }

    /// Write a component of any live entity in place.
    pub fn get_mut<T: Component>(&mut self, entity: Entity, ty: ComponentType<T>) -> Option<&mut T> {
        self.store.get_mut(entity)?.get_component_mut(ty)
    }

    /// The full record of a live entity.
    #[must_use]
    pub fn record(&self, entity: Entity) -> Option<&EntityRecord> {
        self.store.get(entity)
    }

    /// Queue structural changes.
    pub fn commands(&mut self) -> &mut Commands {
        &mut self.commands
    }

    pub(crate) fn into_commands(self) -> Commands {
        self.commands
    }
}

impl fmt::Debug for SystemContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemContext")
            .field("tick", &self.tick)
            .field("entities", &self.entities.count())
            .field("commands", &self.commands)
            .finish()
    }
}

/// A [`System`] backed by a closure. Built by [`system_fn`].
pub struct FnSystem<F> {
    name: String,
    pattern: QueryMask,
    interval: u64,
    run: F,
}

impl<F> FnSystem<F> {
    /// Run every `interval`-th tick instead of every tick.
    #[must_use]
    pub fn every(mut self, interval: u64) -> Self {
        self.interval = interval;
        self
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>) + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn pattern(&self) -> QueryMask {
        self.pattern.clone()
    }

    fn interval(&self) -> u64 {
        self.interval
    }

    fn run(&mut self, ctx: &mut SystemContext<'_>) {
        (self.run)(ctx);
    }
}

/// Wrap a closure as a system.
///
/// ```ignore
/// scene.add_system(system_fn("log_count", QueryMask::new(&[pos.id()]), |ctx| {
///     tracing::info!(count = ctx.entities().count());
/// }).every(20));
/// ```
pub fn system_fn<F>(name: impl Into<String>, pattern: QueryMask, run: F) -> FnSystem<F>
where
    F: FnMut(&mut SystemContext<'_>) + Send,
{
    FnSystem {
        name: name.into(),
        pattern,
        interval: 1,
        run,
    }
}
