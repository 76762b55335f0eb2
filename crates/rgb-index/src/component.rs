//! Component type registration and metadata.
//!
//! Every distinct component type is assigned a dense [`ComponentId`] on first
//! registration. The id doubles as the bit position in a
//! [`Signature`](crate::Signature), so ids start at 0 and are never reused
//! while the registry is live.

use std::{any::TypeId, fmt, marker::PhantomData};

use crate::FxHashMap;

/// Marker trait for types that can be used as components.
///
/// Components are opaque payloads to the index; anything `Send + Sync + 'static`
/// qualifies.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

/// Unique identifier for a component type within one registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(u32);

impl ComponentId {
    /// Create a component ID from a raw value.
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn as_raw(self) -> u32 {
        self.0
    }

    /// Bit position of this component inside a signature.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.0)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Typed handle to a registered component type.
///
/// Returned by [`ComponentRegistry::register`]. Entity records key their
/// storage by the handle's id, so attaching and fetching never goes through
/// type reflection.
pub struct ComponentType<T> {
    id: ComponentId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ComponentType<T> {
    const fn new(id: ComponentId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The registry identity of this component type.
    #[must_use]
    pub const fn id(self) -> ComponentId {
        self.id
    }

    /// The Rust type name, for diagnostics.
    #[must_use]
    pub fn name(self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T> Clone for ComponentType<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentType<T> {}

impl<T> PartialEq for ComponentType<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for ComponentType<T> {}

impl<T> fmt::Debug for ComponentType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentType<{}>({})", std::any::type_name::<T>(), self.id.0)
    }
}

impl<T> From<ComponentType<T>> for ComponentId {
    fn from(ty: ComponentType<T>) -> Self {
        ty.id
    }
}

/// Runtime information about a component type.
#[derive(Clone)]
pub struct ComponentInfo {
    id: ComponentId,
    name: &'static str,
    type_id: TypeId,
}

impl ComponentInfo {
    fn of<T: Component>(id: ComponentId) -> Self {
        Self {
            id,
            name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Get the component ID.
    #[must_use]
    pub const fn id(&self) -> ComponentId {
        self.id
    }

    /// Get the component type name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Check if this info is for the given type.
    #[must_use]
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl fmt::Debug for ComponentInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Registry for component types.
///
/// Owned by an [`Engine`](crate::Engine); there is no process-global registry.
#[derive(Default)]
pub struct ComponentRegistry {
    type_to_id: FxHashMap<TypeId, ComponentId>,
    /// Indexed by `ComponentId`. Dense.
    infos: Vec<ComponentInfo>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component type and return its handle.
    ///
    /// If the type is already registered, returns the existing handle.
    pub fn register<T: Component>(&mut self) -> ComponentType<T> {
        let type_id = TypeId::of::<T>();

        if let Some(&id) = self.type_to_id.get(&type_id) {
            return ComponentType::new(id);
        }

        let id = ComponentId(self.infos.len() as u32);
        self.type_to_id.insert(type_id, id);
        self.infos.push(ComponentInfo::of::<T>(id));

        tracing::trace!(component = std::any::type_name::<T>(), id = id.0, "registered component");

        ComponentType::new(id)
    }

    /// Get the handle for a type, if registered.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<ComponentType<T>> {
        self.type_to_id
            .get(&TypeId::of::<T>())
            .map(|&id| ComponentType::new(id))
    }

    /// Get the component ID for a type, if registered.
    #[must_use]
    pub fn get_id<T: Component>(&self) -> Option<ComponentId> {
        self.type_to_id.get(&TypeId::of::<T>()).copied()
    }

    /// Get component info by ID.
    #[must_use]
    pub fn info(&self, id: ComponentId) -> Option<&ComponentInfo> {
        self.infos.get(id.index())
    }

    /// Diagnostic name for an ID, if registered.
    #[must_use]
    pub fn name(&self, id: ComponentId) -> Option<&'static str> {
        self.info(id).map(ComponentInfo::name)
    }

    /// Get the number of registered components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.infos.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    /// Iterate over all registered component infos, in id order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentInfo> {
        self.infos.iter()
    }

    /// Forget every registered type. Ids restart at 0.
    ///
    /// Handles, signatures and indexes built against the old ids become
    /// meaningless. Only call this once everything from the previous epoch has
    /// been discarded; [`Engine::reset`](crate::Engine::reset) does it in the
    /// right order.
    pub fn reset(&mut self) {
        tracing::debug!(count = self.infos.len(), "resetting component registry");
        self.type_to_id.clear();
        self.infos.clear();
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("count", &self.len())
            .field("components", &self.infos)
            .finish()
    }
}
