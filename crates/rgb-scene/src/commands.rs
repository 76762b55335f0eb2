//! Deferred structural changes queued by systems.
//!
//! A system sees a frozen set of matched entities. Anything that would change
//! which entities match (spawning, despawning, adding or removing components)
//! is queued here and applied once the system returns, in queue order, inside
//! a single engine batch.

use rgb_index::{Component, ComponentId, ComponentType, Engine, Entity, EntityRecord, IndexResult};

use crate::{error::SceneResult, store::EntityStore};

type RecordFn = Box<dyn FnOnce(&mut EntityRecord) -> IndexResult<()>>;

enum Command {
    Spawn(RecordFn),
    Despawn(Entity),
    Modify(Entity, RecordFn),
}

/// Queue of structural changes.
///
/// ```ignore
/// ctx.commands().spawn(move |record| record.add_component(pos, Position::default()));
/// ctx.commands().remove(entity, velocity.id());
/// ```
#[derive(Default)]
pub struct Commands {
    queue: Vec<Command>,
}

impl Commands {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an entity whose components are attached by `build`.
    pub fn spawn(&mut self, build: impl FnOnce(&mut EntityRecord) -> IndexResult<()> + 'static) {
        self.queue.push(Command::Spawn(Box::new(build)));
    }

    /// Despawn an entity.
    pub fn despawn(&mut self, entity: Entity) {
        self.queue.push(Command::Despawn(entity));
    }

    /// Attach a component.
    pub fn insert<T: Component>(&mut self, entity: Entity, ty: ComponentType<T>, value: T) {
        self.modify(entity, move |record| record.add_component(ty, value));
    }

    /// Detach a component, dropping its value.
    pub fn remove(&mut self, entity: Entity, id: impl Into<ComponentId>) {
        let id = id.into();
        self.modify(entity, move |record| record.remove_component_by_type(id));
    }

    /// Run arbitrary record changes; the entity is re-indexed afterwards.
    pub fn modify(
        &mut self,
        entity: Entity,
        f: impl FnOnce(&mut EntityRecord) -> IndexResult<()> + 'static,
    ) {
        self.queue.push(Command::Modify(entity, Box::new(f)));
    }

    /// Number of queued commands.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Apply every command in order within one engine batch.
    ///
    /// A failing command is logged and skipped; the rest still run. The first
    /// failure is returned.
    pub(crate) fn apply(self, store: &mut EntityStore, engine: &mut Engine) -> SceneResult<()> {
        if self.queue.is_empty() {
            return Ok(());
        }

        let count = self.queue.len();
        engine.batch(|engine| {
            let mut first_error = None;
            for command in self.queue {
                let outcome = match command {
                    Command::Spawn(build) => store.spawn(engine, build).map(drop),
                    Command::Despawn(entity) => store.despawn(engine, entity),
                    Command::Modify(entity, f) => {
                        store.modify(engine, entity, f).and_then(|r| r.map_err(Into::into))
                    }
                };
                if let Err(err) = outcome {
                    tracing::warn!(%err, "command failed");
                    first_error.get_or_insert(err);
                }
            }
            tracing::trace!(count, "applied commands");
            first_error.map_or(Ok(()), Err)
        })
    }
}

impl std::fmt::Debug for Commands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commands")
            .field("queued", &self.queue.len())
            .finish()
    }
}
