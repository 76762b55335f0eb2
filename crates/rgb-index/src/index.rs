//! Index store - entities bucketed by exact signature.
//!
//! Each distinct signature currently held by at least one indexed entity has
//! exactly one [`Bucket`]. Buckets appear on first occupancy and are dropped
//! as soon as they empty out, so the bucket set is always a disjoint cover of
//! the indexed entities.
//!
//! Every structural change (entity placed, moved, removed, bucket created or
//! destroyed, bulk rebuild) bumps the [`IndexGeneration`]. The query cache
//! treats the generation as its only staleness signal, so no mutation path may
//! skip the bump.

use std::fmt;

use crate::{FxHashMap, entity::Entity, query::QueryMask, signature::Signature};

/// Monotonic counter of index structural changes.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IndexGeneration(u64);

impl IndexGeneration {
    /// The generation of a freshly created index.
    pub const INITIAL: Self = Self(0);

    /// Get the raw counter value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for IndexGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexGeneration({})", self.0)
    }
}

/// All indexed entities sharing one exact signature.
pub struct Bucket {
    signature: Signature,
    entities: Vec<Entity>,
}

impl Bucket {
    fn new(signature: Signature) -> Self {
        Self {
            signature,
            entities: Vec::new(),
        }
    }

    /// The signature shared by every entity in this bucket.
    #[must_use]
    pub const fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The entities in this bucket, in no particular order.
    #[must_use]
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Number of entities in the bucket.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Never true for a bucket reachable through [`IndexStore`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket")
            .field("signature", &self.signature)
            .field("entity_count", &self.entities.len())
            .finish()
    }
}

/// Where an indexed entity lives.
#[derive(Clone, Debug)]
struct Slot {
    signature: Signature,
    row: usize,
}

/// A change in bucket membership for one entity.
///
/// `from` is `None` when the entity was not indexed before; `to` is `None`
/// when it was removed from the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Migration {
    pub entity: Entity,
    pub from: Option<Signature>,
    pub to: Option<Signature>,
}

/// Bucket membership keyed by signature.
pub struct IndexStore {
    buckets: FxHashMap<Signature, Bucket>,
    slots: FxHashMap<Entity, Slot>,
    generation: IndexGeneration,
}

impl Default for IndexStore {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStore {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty index with room for `capacity` entities.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buckets: FxHashMap::default(),
            slots: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            generation: IndexGeneration::INITIAL,
        }
    }

    /// Place `entity` in the bucket for `signature`.
    ///
    /// Indexes the entity if it is new, moves it if its signature changed, and
    /// does nothing (returning `None`) if it is already in the right bucket.
    pub fn place(&mut self, entity: Entity, signature: &Signature) -> Option<Migration> {
        let from = match self.slots.get(&entity).map(|slot| slot.signature == *signature) {
            Some(true) => return None,
            Some(false) => self.detach(entity),
            None => None,
        };

        self.attach(entity, signature.clone());
        self.bump();

        tracing::trace!(%entity, ?from, to = ?signature, "entity migrated");

        Some(Migration {
            entity,
            from,
            to: Some(signature.clone()),
        })
    }

    /// Remove `entity` from the index. Returns `None` if it was not indexed.
    pub fn remove(&mut self, entity: Entity) -> Option<Migration> {
        let from = self.detach(entity)?;
        self.bump();

        tracing::trace!(%entity, ?from, "entity unindexed");

        Some(Migration {
            entity,
            from: Some(from),
            to: None,
        })
    }

    /// Replace the whole index contents in a single pass.
    ///
    /// Later entries win if an entity appears more than once. The generation
    /// is bumped once for the whole rebuild.
    pub fn rebuild<'a, I>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (Entity, &'a Signature)>,
    {
        self.buckets.clear();
        self.slots.clear();

        for (entity, signature) in entries {
            if self.slots.contains_key(&entity) {
                self.detach(entity);
            }
            self.attach(entity, signature.clone());
        }

        self.bump();

        tracing::debug!(
            entities = self.slots.len(),
            buckets = self.buckets.len(),
            "index rebuilt"
        );
    }

    /// Drop every entity and bucket.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.slots.clear();
        self.bump();
    }

    /// Iterate over the buckets whose signature satisfies `mask`.
    pub fn iter_matching<'a>(&'a self, mask: &'a QueryMask) -> impl Iterator<Item = &'a Bucket> + 'a {
        self.buckets
            .values()
            .filter(move |bucket| mask.matches(&bucket.signature))
    }

    /// Iterate over all buckets.
    pub fn buckets(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.values()
    }

    /// Look up the bucket for an exact signature.
    #[must_use]
    pub fn bucket(&self, signature: &Signature) -> Option<&Bucket> {
        self.buckets.get(signature)
    }

    /// The signature `entity` is currently indexed under.
    #[must_use]
    pub fn signature_of(&self, entity: Entity) -> Option<&Signature> {
        self.slots.get(&entity).map(|slot| &slot.signature)
    }

    /// Check whether `entity` is indexed.
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.slots.contains_key(&entity)
    }

    /// Number of indexed entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// `true` if no entities are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Number of live buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    /// The current generation.
    #[must_use]
    pub const fn generation(&self) -> IndexGeneration {
        self.generation
    }

    fn bump(&mut self) {
        self.generation = self.generation.next();
    }

    fn attach(&mut self, entity: Entity, signature: Signature) {
        let bucket = self.buckets.entry(signature.clone()).or_insert_with(|| {
            tracing::debug!(?signature, "bucket created");
            Bucket::new(signature.clone())
        });

        let row = bucket.entities.len();
        bucket.entities.push(entity);
        self.slots.insert(entity, Slot { signature, row });
    }

    /// Take `entity` out of its bucket using swap-remove, fixing up the row of
    /// whichever entity filled the hole.
    fn detach(&mut self, entity: Entity) -> Option<Signature> {
        let slot = self.slots.remove(&entity)?;

        let Some(bucket) = self.buckets.get_mut(&slot.signature) else {
            unreachable!("{entity} indexed under {:?} but that bucket does not exist", slot.signature);
        };
        debug_assert_eq!(bucket.entities.get(slot.row), Some(&entity));

        bucket.entities.swap_remove(slot.row);
        if let Some(&moved) = bucket.entities.get(slot.row) {
            let Some(moved_slot) = self.slots.get_mut(&moved) else {
                unreachable!("{moved} is in a bucket but has no slot");
            };
            moved_slot.row = slot.row;
        }

        if bucket.entities.is_empty() {
            self.buckets.remove(&slot.signature);
            tracing::debug!(signature = ?slot.signature, "bucket destroyed");
        }

        Some(slot.signature)
    }
}

impl fmt::Debug for IndexStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexStore")
            .field("entity_count", &self.slots.len())
            .field("bucket_count", &self.buckets.len())
            .field("generation", &self.generation)
            .finish()
    }
}
