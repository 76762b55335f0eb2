//! Entity records of a scene, kept in step with its engine.

use rgb_index::{Engine, Entity, EntityRecord, IndexResult};

use crate::{
    allocator::EntityAllocator,
    error::{SceneError, SceneResult},
};

/// Owns every live [`EntityRecord`], slotted by entity id.
///
/// Structural operations take the engine explicitly so command application
/// can run them inside [`Engine::batch`].
#[derive(Debug, Default)]
pub(crate) struct EntityStore {
    allocator: EntityAllocator,
    records: Vec<Option<EntityRecord>>,
}

impl EntityStore {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            allocator: EntityAllocator::with_capacity(capacity),
            records: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records
            .get(entity.id() as usize)?
            .as_ref()
            .filter(|record| record.entity() == entity)
    }

    pub(crate) fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.records
            .get_mut(entity.id() as usize)?
            .as_mut()
            .filter(|record| record.entity() == entity)
    }

    pub(crate) fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.is_alive(entity)
    }

    pub(crate) fn len(&self) -> usize {
        self.allocator.alive_count() as usize
    }

    /// Allocate an entity, let `build` attach its initial components, then
    /// index it. Nothing is indexed if `build` fails.
    pub(crate) fn spawn(
        &mut self,
        engine: &mut Engine,
        build: impl FnOnce(&mut EntityRecord) -> IndexResult<()>,
    ) -> SceneResult<Entity> {
        let entity = self.allocator.allocate();
        let mut record = EntityRecord::new(entity);
        if let Err(err) = build(&mut record) {
            self.allocator.deallocate(entity);
            return Err(err.into());
        }

        self.emplace(engine, record);
        Ok(entity)
    }

    pub(crate) fn spawn_empty(&mut self, engine: &mut Engine) -> Entity {
        let entity = self.allocator.allocate();
        self.emplace(engine, EntityRecord::new(entity));
        entity
    }

    fn emplace(&mut self, engine: &mut Engine, record: EntityRecord) {
        engine.add_entity(&record);

        let entity = record.entity();
        let slot = entity.id() as usize;
        if slot >= self.records.len() {
            self.records.resize_with(slot + 1, || None);
        }
        self.records[slot] = Some(record);

        tracing::trace!(%entity, "spawned");
    }

    pub(crate) fn despawn(&mut self, engine: &mut Engine, entity: Entity) -> SceneResult<()> {
        let record = self
            .records
            .get_mut(entity.id() as usize)
            .and_then(|slot| slot.take_if(|record| record.entity() == entity))
            .ok_or(SceneError::EntityNotFound(entity))?;

        self.allocator.deallocate(entity);
        engine.remove_entity(record.entity());

        tracing::trace!(%entity, components = record.len(), "despawned");
        Ok(())
    }

    /// Run `f` on the record, then re-index it. The engine is told even if
    /// `f` only changed part of what it meant to.
    pub(crate) fn modify<R>(
        &mut self,
        engine: &mut Engine,
        entity: Entity,
        f: impl FnOnce(&mut EntityRecord) -> R,
    ) -> SceneResult<R> {
        let record = self
            .get_mut(entity)
            .ok_or(SceneError::EntityNotFound(entity))?;
        let result = f(record);
        engine.update_entity(record);
        Ok(result)
    }

    /// Drop every record, freeing their handles.
    pub(crate) fn clear(&mut self) {
        for record in self.records.drain(..).flatten() {
            self.allocator.deallocate(record.entity());
        }
    }
}
