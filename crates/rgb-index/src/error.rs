//! Index error types.

use thiserror::Error;

use crate::{
    component::ComponentId,
    entity::Entity,
    reactive::{ReactiveQueryId, SubscriptionId},
};

/// Errors reported by component mutation and reactive query operations.
///
/// Queries themselves never fail; an empty result is a valid answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    /// The entity already has a component of this type.
    #[error("entity {entity} already has component {name} ({component})")]
    DuplicateComponent {
        entity: Entity,
        component: ComponentId,
        name: &'static str,
    },

    /// The entity has no component of this type.
    #[error("entity {entity} has no component {component}")]
    MissingComponent {
        entity: Entity,
        component: ComponentId,
    },

    /// The stored value under this id is not the requested type. Happens when
    /// a handle from another registry (or a reset one) is used.
    #[error("component {component} is not a {expected}")]
    TypeMismatch {
        component: ComponentId,
        expected: &'static str,
    },

    /// The reactive query was destroyed or never existed.
    #[error("unknown reactive query: {0:?}")]
    UnknownReactiveQuery(ReactiveQueryId),

    /// The subscription is not registered on this reactive query.
    #[error("unknown subscription {subscription:?} on {query:?}")]
    UnknownSubscription {
        query: ReactiveQueryId,
        subscription: SubscriptionId,
    },
}

/// Result type for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
