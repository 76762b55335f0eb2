//! Generational entity id allocation.

use rgb_index::{Entity, EntityId, Generation};

/// Hands out entity handles, recycling ids of despawned entities.
///
/// Every slot carries a generation that is bumped when the slot is freed, so
/// a handle kept past its entity's despawn never matches the slot again.
pub struct EntityAllocator {
    /// Current generation of each slot.
    generations: Vec<Generation>,
    /// Freed slots, reused LIFO.
    free_list: Vec<EntityId>,
    alive_count: u32,
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAllocator {
    /// Create an empty allocator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generations: Vec::new(),
            free_list: Vec::new(),
            alive_count: 0,
        }
    }

    /// Create an allocator with room for `capacity` slots.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            alive_count: 0,
        }
    }

    /// Allocate a handle, reusing a freed slot when one is available.
    pub fn allocate(&mut self) -> Entity {
        self.alive_count += 1;

        if let Some(id) = self.free_list.pop() {
            return Entity::new(id, self.generations[id as usize]);
        }

        let id = self.generations.len() as EntityId;
        self.generations.push(Generation::new());
        Entity::new(id, Generation::new())
    }

    /// Free a handle. Returns `false` if it was already stale.
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        let slot = &mut self.generations[entity.id() as usize];
        *slot = slot.next();
        self.free_list.push(entity.id());
        self.alive_count -= 1;
        true
    }

    /// Check whether `entity` is the current occupant of its slot.
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.generations
            .get(entity.id() as usize)
            .is_some_and(|&generation| generation == entity.generation())
    }

    /// Number of live handles.
    #[must_use]
    pub const fn alive_count(&self) -> u32 {
        self.alive_count
    }
}

impl std::fmt::Debug for EntityAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityAllocator")
            .field("slots", &self.generations.len())
            .field("free", &self.free_list.len())
            .field("alive_count", &self.alive_count)
            .finish()
    }
}
