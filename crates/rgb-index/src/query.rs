//! Query masks and result snapshots.
//!
//! A query is nothing more than a pair of signatures: the components an entity
//! must have and the components it must not have. Masks compare structurally,
//! so two independently built masks over the same ids share a cache entry.
//!
//! ```ignore
//! let moving = QueryMask::new(&[pos.id(), vel.id()]).without(&[frozen.id()]);
//! for entity in &engine.query(&moving) {
//!     // ...
//! }
//! ```

use std::{fmt, sync::Arc};

use crate::{component::ComponentId, entity::Entity, index::IndexStore, signature::Signature};

/// Required and excluded component sets.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct QueryMask {
    required: Signature,
    excluded: Signature,
}

impl QueryMask {
    /// Match entities having all of `required`.
    #[must_use]
    pub fn new(required: &[ComponentId]) -> Self {
        Self {
            required: Signature::from_ids(required),
            excluded: Signature::new(),
        }
    }

    /// Also reject entities having any of `excluded`.
    #[must_use]
    pub fn without(mut self, excluded: &[ComponentId]) -> Self {
        for &id in excluded {
            self.excluded.insert(id);
        }
        self
    }

    /// Add one required component.
    #[must_use]
    pub fn with(mut self, id: impl Into<ComponentId>) -> Self {
        self.required.insert(id.into());
        self
    }

    /// Add one excluded component.
    #[must_use]
    pub fn exclude(mut self, id: impl Into<ComponentId>) -> Self {
        self.excluded.insert(id.into());
        self
    }

    /// The required component set.
    #[must_use]
    pub const fn required(&self) -> &Signature {
        &self.required
    }

    /// The excluded component set.
    #[must_use]
    pub const fn excluded(&self) -> &Signature {
        &self.excluded
    }

    /// `signature & required == required` and nothing excluded is present.
    #[must_use]
    pub fn matches(&self, signature: &Signature) -> bool {
        signature.is_superset(&self.required) && signature.is_disjoint(&self.excluded)
    }

    /// Union the entity lists of every bucket this mask matches.
    ///
    /// Cost is bounded by the number of buckets plus the size of the result,
    /// never by the total entity count.
    #[must_use]
    pub fn evaluate(&self, index: &IndexStore) -> QueryResult {
        let mut entities = Vec::new();
        for bucket in index.iter_matching(self) {
            entities.extend_from_slice(bucket.entities());
        }
        QueryResult::from(entities)
    }
}

impl fmt::Debug for QueryMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryMask")
            .field("required", &self.required)
            .field("excluded", &self.excluded)
            .finish()
    }
}

/// A snapshot of the entities matching a query.
///
/// Cloning is cheap: the entity list is shared with the query cache. The
/// snapshot never changes after it is handed out, even if the index does.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    entities: Arc<[Entity]>,
}

impl QueryResult {
    /// Number of matching entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entities.len()
    }

    /// `true` if nothing matched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The matching entities.
    #[must_use]
    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    /// Iterate over the matching entities.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, Entity>> {
        self.entities.iter().copied()
    }

    /// Linear membership test.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Copy the entities out, sorted.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<Entity> {
        let mut entities = self.entities.to_vec();
        entities.sort_unstable();
        entities
    }

    /// `true` if both snapshots share the same allocation.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entities, &other.entities)
    }
}

impl From<Vec<Entity>> for QueryResult {
    fn from(entities: Vec<Entity>) -> Self {
        Self {
            entities: entities.into(),
        }
    }
}

impl<'a> IntoIterator for &'a QueryResult {
    type Item = Entity;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Entity>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Debug for QueryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entities.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u32) -> ComponentId {
        ComponentId::from_raw(raw)
    }

    #[test]
    fn test_mask_matches() {
        let mask = QueryMask::new(&[id(0), id(1)]);

        assert!(mask.matches(&Signature::from_ids(&[id(0), id(1)])));
        assert!(mask.matches(&Signature::from_ids(&[id(0), id(1), id(2)])));
        assert!(!mask.matches(&Signature::from_ids(&[id(0)])));
    }

    #[test]
    fn test_mask_without() {
        let mask = QueryMask::new(&[id(0)]).without(&[id(3)]);

        assert!(mask.matches(&Signature::from_ids(&[id(0)])));
        assert!(!mask.matches(&Signature::from_ids(&[id(0), id(3)])));
    }

    #[test]
    fn test_empty_mask_matches_everything() {
        let mask = QueryMask::default();
        assert!(mask.matches(&Signature::new()));
        assert!(mask.matches(&Signature::from_ids(&[id(9)])));
    }

    #[test]
    fn test_structural_equality() {
        let a = QueryMask::new(&[id(1), id(0)]);
        let b = QueryMask::default().with(id(0)).with(id(1));
        assert_eq!(a, b);
        assert_ne!(a, b.exclude(id(2)));
    }

    #[test]
    fn test_evaluate_unions_buckets() {
        let mut index = IndexStore::new();
        index.place(Entity::from_raw(1), &Signature::from_ids(&[id(0)]));
        index.place(Entity::from_raw(2), &Signature::from_ids(&[id(0), id(1)]));
        index.place(Entity::from_raw(3), &Signature::from_ids(&[id(1)]));

        let result = QueryMask::new(&[id(0)]).evaluate(&index);
        assert_eq!(result.count(), 2);
        assert_eq!(
            result.to_sorted_vec(),
            vec![Entity::from_raw(1), Entity::from_raw(2)]
        );

        let none = QueryMask::new(&[id(5)]).evaluate(&index);
        assert!(none.is_empty());
    }
}
