#![allow(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_fields_in_debug)]

//! RGB Index - signature-bucketed entity index with cached and reactive queries
//!
//! Answers "which entities currently have components A, B and C?" without
//! scanning every entity, and pushes set differences to subscribers when the
//! answer changes.
//!
//! # Key Concepts
//!
//! - **Entity**: An opaque handle; the index never owns entity data
//! - **EntityRecord**: The components attached to one entity, plus its signature
//! - **Signature**: The exact set of component types an entity has
//! - **Bucket**: All entities sharing one signature
//! - **QueryMask**: Required (and optionally excluded) component types
//! - **Reactive query**: A live result set that notifies on change
//!
//! # Mutation Order
//!
//! Every mutation reported to the [`Engine`] runs to completion:
//! bucket migration, then generation bump (which stales cached results), then
//! reactive notification. Queries never observe a half-applied change.
//!
//! ```ignore
//! let mut engine = Engine::new();
//! let pos = engine.register::<Position>();
//!
//! let record = EntityRecord::new(entity).with(pos, Position::default())?;
//! engine.add_entity(&record);
//!
//! let live = engine.create_reactive_query(&[pos.id()]);
//! engine.subscribe(live, |change| {
//!     tracing::info!(added = ?change.added, removed = ?change.removed, "moved");
//! })?;
//! ```

mod cache;
mod component;
mod config;
mod engine;
mod entity;
mod error;
mod index;
mod query;
mod reactive;
mod signature;
mod stats;

pub use cache::QueryCache;
pub use component::{Component, ComponentId, ComponentInfo, ComponentRegistry, ComponentType};
pub use config::EngineConfig;
pub use engine::Engine;
pub use entity::{Entity, EntityId, EntityRecord, Generation};
pub use error::{IndexError, IndexResult};
pub use index::{Bucket, IndexGeneration, IndexStore, Migration};
pub use query::{QueryMask, QueryResult};
pub use reactive::{
    QueryChange, ReactiveCallback, ReactiveQueryId, ReactiveRegistry, SubscriptionId,
};
pub use signature::Signature;
pub use stats::{EngineStats, IndexStats, QueryStats};

pub(crate) type FxHashMap<K, V> = hashbrown::HashMap<K, V, rustc_hash::FxBuildHasher>;
pub(crate) type FxHashSet<T> = hashbrown::HashSet<T, rustc_hash::FxBuildHasher>;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        Component, ComponentId, ComponentType, Engine, EngineConfig, Entity, EntityRecord,
        IndexError, IndexResult, QueryChange, QueryMask, QueryResult, ReactiveQueryId,
    };
}
