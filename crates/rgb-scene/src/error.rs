//! Scene error types.

use rgb_index::{Entity, IndexError};
use thiserror::Error;

/// Scene error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The entity was despawned, or the handle is from an older generation.
    #[error("entity not found: {0:?}")]
    EntityNotFound(Entity),

    /// A component or reactive query operation failed.
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Result type for scene operations.
pub type SceneResult<T> = Result<T, SceneError>;
