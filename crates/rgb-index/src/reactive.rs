//! Reactive queries - live result sets that push diffs to subscribers.
//!
//! A reactive query remembers the set of entities that matched its mask the
//! last time it was notified. Each index [`Migration`] is folded into a
//! pending diff; when the engine finishes a mutation (or the outermost
//! [`batch`](crate::Engine::batch)) the pending diff is committed and every
//! subscriber is called once with the net change.
//!
//! Callbacks only ever see a [`QueryChange`]. They have no path back to the
//! engine, so structural mutation from inside a notification is ruled out by
//! the borrow checker rather than by a runtime guard.

use std::{collections::BTreeMap, fmt};

use crate::{
    FxHashSet,
    entity::Entity,
    error::{IndexError, IndexResult},
    index::{IndexStore, Migration},
    query::{QueryMask, QueryResult},
};

/// Handle to a live reactive query.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReactiveQueryId(u32);

impl ReactiveQueryId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ReactiveQueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReactiveQueryId({})", self.0)
    }
}

/// Handle to one subscriber callback.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u32);

impl SubscriptionId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

/// The net change to a reactive query's result set, as seen by subscribers.
#[derive(Debug)]
pub struct QueryChange<'a> {
    /// The query that changed.
    pub query: ReactiveQueryId,
    /// Entities that started matching. Sorted.
    pub added: &'a [Entity],
    /// Entities that stopped matching. Sorted.
    pub removed: &'a [Entity],
    /// The full matching set after the change. Sorted.
    pub entities: &'a QueryResult,
}

/// Subscriber callback.
pub type ReactiveCallback = Box<dyn FnMut(&QueryChange<'_>) + Send>;

struct Subscriber {
    id: SubscriptionId,
    callback: ReactiveCallback,
}

struct LiveQuery {
    mask: QueryMask,
    /// Committed matching set.
    matching: FxHashSet<Entity>,
    /// Sorted copy of `matching`, handed to subscribers and readers.
    snapshot: QueryResult,
    pending_added: FxHashSet<Entity>,
    pending_removed: FxHashSet<Entity>,
    subscribers: Vec<Subscriber>,
}

impl LiveQuery {
    fn new(mask: QueryMask, initial: &QueryResult) -> Self {
        let matching: FxHashSet<Entity> = initial.iter().collect();
        let snapshot = sorted_snapshot(&matching);
        Self {
            mask,
            matching,
            snapshot,
            pending_added: FxHashSet::default(),
            pending_removed: FxHashSet::default(),
            subscribers: Vec::new(),
        }
    }

    fn record(&mut self, migration: &Migration) {
        let before = migration.from.as_ref().is_some_and(|s| self.mask.matches(s));
        let after = migration.to.as_ref().is_some_and(|s| self.mask.matches(s));
        let entity = migration.entity;

        match (before, after) {
            (true, false) => {
                if !self.pending_added.remove(&entity) {
                    self.pending_removed.insert(entity);
                }
            }
            (false, true) => {
                if !self.pending_removed.remove(&entity) {
                    self.pending_added.insert(entity);
                }
            }
            _ => {}
        }
    }

    /// Replace the pending diff with one computed from scratch.
    fn resync(&mut self, index: &IndexStore) {
        let current: FxHashSet<Entity> = self.mask.evaluate(index).iter().collect();
        self.pending_added = current.difference(&self.matching).copied().collect();
        self.pending_removed = self.matching.difference(&current).copied().collect();
    }

    fn has_pending(&self) -> bool {
        !self.pending_added.is_empty() || !self.pending_removed.is_empty()
    }

    fn commit(&mut self, id: ReactiveQueryId) {
        let mut added: Vec<Entity> = self.pending_added.drain().collect();
        let mut removed: Vec<Entity> = self.pending_removed.drain().collect();
        added.sort_unstable();
        removed.sort_unstable();

        for entity in &removed {
            self.matching.remove(entity);
        }
        self.matching.extend(added.iter().copied());
        self.snapshot = sorted_snapshot(&self.matching);

        tracing::trace!(
            query = id.0,
            added = added.len(),
            removed = removed.len(),
            subscribers = self.subscribers.len(),
            "reactive query changed"
        );

        let change = QueryChange {
            query: id,
            added: &added,
            removed: &removed,
            entities: &self.snapshot,
        };
        for subscriber in &mut self.subscribers {
            (subscriber.callback)(&change);
        }
    }
}

fn sorted_snapshot(set: &FxHashSet<Entity>) -> QueryResult {
    let mut entities: Vec<Entity> = set.iter().copied().collect();
    entities.sort_unstable();
    QueryResult::from(entities)
}

/// All live reactive queries of one engine.
///
/// Queries are notified in creation order; subscribers in subscription order.
#[derive(Default)]
pub struct ReactiveRegistry {
    queries: BTreeMap<ReactiveQueryId, LiveQuery>,
    next_query: u32,
    next_subscription: u32,
}

impl ReactiveRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a live query whose current matching set is `initial`.
    pub fn create(&mut self, mask: QueryMask, initial: &QueryResult) -> ReactiveQueryId {
        let id = ReactiveQueryId(self.next_query);
        self.next_query += 1;

        tracing::debug!(query = id.0, ?mask, matching = initial.count(), "reactive query created");
        self.queries.insert(id, LiveQuery::new(mask, initial));
        id
    }

    /// Remove a live query. Pending changes are discarded without notifying.
    pub fn destroy(&mut self, id: ReactiveQueryId) -> IndexResult<()> {
        self.queries
            .remove(&id)
            .ok_or(IndexError::UnknownReactiveQuery(id))?;
        tracing::debug!(query = id.0, "reactive query destroyed");
        Ok(())
    }

    /// Attach a callback. It is not called for the current state, only for
    /// later changes.
    pub fn subscribe<F>(&mut self, id: ReactiveQueryId, callback: F) -> IndexResult<SubscriptionId>
    where
        F: FnMut(&QueryChange<'_>) + Send + 'static,
    {
        let query = self
            .queries
            .get_mut(&id)
            .ok_or(IndexError::UnknownReactiveQuery(id))?;

        let subscription = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        query.subscribers.push(Subscriber {
            id: subscription,
            callback: Box::new(callback),
        });
        Ok(subscription)
    }

    /// Detach a callback.
    pub fn unsubscribe(&mut self, id: ReactiveQueryId, subscription: SubscriptionId) -> IndexResult<()> {
        let query = self
            .queries
            .get_mut(&id)
            .ok_or(IndexError::UnknownReactiveQuery(id))?;

        let before = query.subscribers.len();
        query.subscribers.retain(|s| s.id != subscription);
        if query.subscribers.len() == before {
            return Err(IndexError::UnknownSubscription {
                query: id,
                subscription,
            });
        }
        Ok(())
    }

    /// The committed matching set of a live query.
    pub fn entities(&self, id: ReactiveQueryId) -> IndexResult<QueryResult> {
        self.queries
            .get(&id)
            .map(|q| q.snapshot.clone())
            .ok_or(IndexError::UnknownReactiveQuery(id))
    }

    /// The mask of a live query.
    pub fn mask(&self, id: ReactiveQueryId) -> IndexResult<&QueryMask> {
        self.queries
            .get(&id)
            .map(|q| &q.mask)
            .ok_or(IndexError::UnknownReactiveQuery(id))
    }

    /// Check whether `id` is still live.
    #[must_use]
    pub fn contains(&self, id: ReactiveQueryId) -> bool {
        self.queries.contains_key(&id)
    }

    /// Fold one index migration into every live query's pending diff.
    pub fn record(&mut self, migration: &Migration) {
        for query in self.queries.values_mut() {
            query.record(migration);
        }
    }

    /// Recompute every pending diff against the index. Used after bulk rebuilds.
    pub fn resync(&mut self, index: &IndexStore) {
        for query in self.queries.values_mut() {
            query.resync(index);
        }
    }

    /// Commit pending diffs and notify subscribers of every query that changed.
    pub fn flush(&mut self) {
        for (&id, query) in &mut self.queries {
            if query.has_pending() {
                query.commit(id);
            }
        }
    }

    /// Number of live queries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// `true` if no queries are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Destroy every query without notifying.
    pub fn clear(&mut self) {
        self.queries.clear();
    }
}

impl fmt::Debug for ReactiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveRegistry")
            .field("query_count", &self.queries.len())
            .finish_non_exhaustive()
    }
}
