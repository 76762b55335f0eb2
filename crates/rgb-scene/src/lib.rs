#![allow(missing_docs)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_fields_in_debug)]

//! RGB Scene - entity container and system scheduling on top of `rgb-index`
//!
//! The scene owns entity records and reports every structural change to its
//! [`Engine`](rgb_index::Engine). Systems run per tick over the entities
//! matching their pattern.
//!
//! # Structural Changes
//!
//! - Outside systems: [`Scene::insert`], [`Scene::remove`], [`Scene::modify`],
//!   [`Scene::spawn_with`], [`Scene::despawn`] apply and re-index immediately
//! - Inside systems: queue them on [`Commands`]; they are applied in order,
//!   as one engine batch, after the system returns
//! - Component values can be written in place anywhere via `get_mut`
//!
//! ```ignore
//! let mut scene = Scene::new();
//! scene.add_plugin(MovementPlugin);
//!
//! for _ in 0..10 {
//!     scene.tick()?;
//! }
//! ```

mod allocator;
mod commands;
mod error;
mod plugin;
mod scene;
mod store;
mod system;

pub use allocator::EntityAllocator;
pub use commands::Commands;
pub use error::{SceneError, SceneResult};
pub use plugin::Plugin;
pub use scene::Scene;
pub use system::{FnSystem, System, SystemContext, system_fn};

/// Prelude for convenient imports
pub mod prelude {
    pub use rgb_index::prelude::*;

    pub use crate::{Commands, Plugin, Scene, SceneError, SceneResult, System, SystemContext, system_fn};
}
