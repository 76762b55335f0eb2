//! Entity handles and the component records attached to them.
//!
//! The index never owns entities. The owning container keeps one
//! [`EntityRecord`] per live entity, mutates it through the component
//! operations below, and reports the result to the
//! [`Engine`](crate::Engine) via `add_entity` / `update_entity`.

use std::{any::Any, fmt};

use crate::{
    FxHashMap,
    component::{Component, ComponentId, ComponentType},
    error::{IndexError, IndexResult},
    signature::Signature,
};

/// Generation counter to detect stale entity handles.
/// Incremented each time an entity slot is recycled.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u32);

impl Generation {
    /// Create a new generation (starts at 0).
    #[must_use]
    pub const fn new() -> Self {
        Self(0)
    }

    /// Increment the generation counter.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Get the raw generation value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.0)
    }
}

/// Raw entity slot index.
pub type EntityId = u32;

/// An opaque entity identifier: slot index plus generation.
///
/// Ordering is by slot, then generation; query snapshots handed out by
/// reactive queries are sorted in this order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    id: EntityId,
    generation: Generation,
}

impl Entity {
    /// Create an entity handle with the given slot and generation.
    #[must_use]
    pub const fn new(id: EntityId, generation: Generation) -> Self {
        Self { id, generation }
    }

    /// Handle for slot `id` at generation 0.
    #[must_use]
    pub const fn from_raw(id: EntityId) -> Self {
        Self::new(id, Generation::new())
    }

    /// Get the entity's slot index.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.id
    }

    /// Get the entity's generation.
    #[must_use]
    pub const fn generation(self) -> Generation {
        self.generation
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.id, self.generation.0)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.id, self.generation.0)
    }
}

type BoxedComponent = Box<dyn Any + Send + Sync>;

/// An entity handle together with its attached components.
///
/// At most one instance per component type. The signature is kept in step
/// with the component map on every add and remove: bit `i` is set iff a
/// component with id `i` is attached.
pub struct EntityRecord {
    entity: Entity,
    components: FxHashMap<ComponentId, BoxedComponent>,
    signature: Signature,
}

impl EntityRecord {
    /// Create a record with no components.
    #[must_use]
    pub fn new(entity: Entity) -> Self {
        Self {
            entity,
            components: FxHashMap::default(),
            signature: Signature::new(),
        }
    }

    /// The entity this record belongs to.
    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// The set of attached component ids.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Attach a component.
    ///
    /// Fails with [`IndexError::DuplicateComponent`] if the type is already
    /// attached; the existing value is left untouched.
    pub fn add_component<T: Component>(
        &mut self,
        ty: ComponentType<T>,
        component: T,
    ) -> IndexResult<()> {
        let id = ty.id();
        if self.components.contains_key(&id) {
            return Err(IndexError::DuplicateComponent {
                entity: self.entity,
                component: id,
                name: ty.name(),
            });
        }

        self.components.insert(id, Box::new(component));
        self.signature.insert(id);
        Ok(())
    }

    /// Like [`add_component`](Self::add_component), for chaining during
    /// construction.
    pub fn with<T: Component>(mut self, ty: ComponentType<T>, component: T) -> IndexResult<Self> {
        self.add_component(ty, component)?;
        Ok(self)
    }

    /// Detach a component and return it.
    pub fn remove_component<T: Component>(&mut self, ty: ComponentType<T>) -> IndexResult<T> {
        let id = ty.id();
        match self.components.get(&id) {
            None => return Err(self.missing(id)),
            Some(boxed) if !boxed.is::<T>() => {
                return Err(IndexError::TypeMismatch {
                    component: id,
                    expected: ty.name(),
                });
            }
            Some(_) => {}
        }

        let Some(boxed) = self.components.remove(&id) else {
            unreachable!("component {id:?} vanished between lookup and removal");
        };
        self.signature.remove(id);

        match boxed.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(_) => unreachable!("component {id:?} type checked above"),
        }
    }

    /// Detach a component by id, dropping the value.
    ///
    /// Reports [`IndexError::MissingComponent`] if nothing is attached under
    /// `id`, same as [`remove_component`](Self::remove_component).
    pub fn remove_component_by_type(&mut self, id: ComponentId) -> IndexResult<()> {
        if self.components.remove(&id).is_none() {
            return Err(self.missing(id));
        }
        self.signature.remove(id);
        Ok(())
    }

    /// Check whether a component type is attached.
    #[must_use]
    pub fn has_component(&self, id: impl Into<ComponentId>) -> bool {
        self.signature.contains(id.into())
    }

    /// Borrow a component, if attached.
    #[must_use]
    pub fn get_component<T: Component>(&self, ty: ComponentType<T>) -> Option<&T> {
        self.components.get(&ty.id())?.downcast_ref::<T>()
    }

    /// Mutably borrow a component, if attached.
    ///
    /// Changing a value in place does not alter the signature, so no index
    /// update is needed afterwards.
    #[must_use]
    pub fn get_component_mut<T: Component>(&mut self, ty: ComponentType<T>) -> Option<&mut T> {
        self.components.get_mut(&ty.id())?.downcast_mut::<T>()
    }

    /// Like [`get_component`](Self::get_component), but reports absence as an error.
    pub fn component<T: Component>(&self, ty: ComponentType<T>) -> IndexResult<&T> {
        self.get_component(ty).ok_or_else(|| self.missing(ty.id()))
    }

    /// Number of attached components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// `true` if no components are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Iterate over attached component ids in ascending order.
    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.signature.iter()
    }

    fn missing(&self, component: ComponentId) -> IndexError {
        IndexError::MissingComponent {
            entity: self.entity,
            component,
        }
    }
}

impl fmt::Debug for EntityRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRecord")
            .field("entity", &self.entity)
            .field("signature", &self.signature)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentRegistry;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    #[test]
    fn test_add_and_get() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();

        let mut record = EntityRecord::new(Entity::from_raw(1));
        record.add_component(pos, Position { x: 1.0, y: 2.0 }).unwrap();

        assert!(record.has_component(pos));
        assert!(record.signature().contains(pos.id()));
        assert_eq!(record.get_component(pos), Some(&Position { x: 1.0, y: 2.0 }));
    }

    #[test]
    fn test_duplicate_attachment_rejected() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();

        let mut record = EntityRecord::new(Entity::from_raw(1));
        record.add_component(pos, Position { x: 1.0, y: 2.0 }).unwrap();

        let err = record
            .add_component(pos, Position { x: 9.0, y: 9.0 })
            .unwrap_err();
        assert!(matches!(err, IndexError::DuplicateComponent { .. }));
        // Original value survives
        assert_eq!(record.get_component(pos).unwrap().x, 1.0);
    }

    #[test]
    fn test_remove_returns_value_and_clears_bit() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();
        let vel = registry.register::<Velocity>();

        let mut record = EntityRecord::new(Entity::from_raw(1))
            .with(pos, Position { x: 1.0, y: 2.0 })
            .unwrap()
            .with(vel, Velocity { x: 0.5, y: 0.5 })
            .unwrap();

        let removed = record.remove_component(vel).unwrap();
        assert_eq!(removed, Velocity { x: 0.5, y: 0.5 });
        assert!(!record.has_component(vel));
        assert!(!record.signature().contains(vel.id()));
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_remove_missing_is_reported() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();

        let mut record = EntityRecord::new(Entity::from_raw(7));
        assert!(matches!(
            record.remove_component(pos),
            Err(IndexError::MissingComponent { .. })
        ));
        assert!(matches!(
            record.remove_component_by_type(pos.id()),
            Err(IndexError::MissingComponent { .. })
        ));
        assert!(record.component(pos).is_err());
    }

    #[test]
    fn test_get_component_mut_keeps_signature() {
        let mut registry = ComponentRegistry::new();
        let pos = registry.register::<Position>();

        let mut record = EntityRecord::new(Entity::from_raw(1))
            .with(pos, Position { x: 0.0, y: 0.0 })
            .unwrap();
        let before = record.signature().clone();

        record.get_component_mut(pos).unwrap().x = 5.0;

        assert_eq!(record.signature(), &before);
        assert_eq!(record.get_component(pos).unwrap().x, 5.0);
    }

    #[test]
    fn test_entity_ordering() {
        let a = Entity::new(1, Generation::new());
        let b = Entity::new(1, Generation::new().next());
        let c = Entity::new(2, Generation::new());
        assert!(a < b);
        assert!(b < c);
    }
}
