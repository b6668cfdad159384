//! Core [`Component`] trait, dense type tags, and the per-store registry.
//!
//! Every piece of data stored in the ECS must implement [`Component`]. The
//! trait requires `Send + Sync + 'static` so values can cross the request
//! queue from input threads, and serde support so snapshots can be exported.
//!
//! ## Type identity
//!
//! Rust code names a component type through its [`ComponentKey`] (a wrapper
//! around [`std::any::TypeId`]). A [`ComponentRegistry`] turns each key into a
//! small dense [`ComponentTypeId`] the first time the type is registered.
//! Storage and indexes are plain vectors addressed by that tag.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ComponentError;
use crate::storage::{ErasedColumn, SparseColumn};

/// Dense identifier of a registered component type.
///
/// Tags are handed out in registration order starting at zero and are only
/// meaningful for the registry that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u32);

impl ComponentTypeId {
    /// The tag as a vector index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// The core component trait.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use engine_component::Component;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Health {
///     current: f32,
///     max: f32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Send + Sync + 'static + Serialize + DeserializeOwned {
    /// A human-readable name for this component type.
    ///
    /// Names key component records in snapshots and must be unique within a
    /// registry.
    fn type_name() -> &'static str;

    /// Returns the [`ComponentKey`] for this component type.
    fn key() -> ComponentKey {
        ComponentKey {
            type_id: TypeId::of::<Self>(),
            name: Self::type_name(),
        }
    }
}

/// Registry-independent handle naming a Rust component type.
///
/// Equality and hashing use the [`TypeId`] only; the name is carried for
/// diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct ComponentKey {
    type_id: TypeId,
    name: &'static str,
}

impl ComponentKey {
    /// Returns the key of `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        T::key()
    }

    /// The underlying [`TypeId`].
    #[must_use]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The component's registered name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ComponentKey {}

impl std::hash::Hash for ComponentKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

/// Metadata about a registered component type.
#[derive(Debug, Clone)]
pub struct ComponentMeta {
    /// The dense tag assigned at registration.
    pub id: ComponentTypeId,
    /// The Rust type this tag stands for.
    pub key: ComponentKey,
    /// Builds an empty column for this type.
    pub new_column: fn() -> Box<dyn ErasedColumn>,
}

fn new_column<T: Component>() -> Box<dyn ErasedColumn> {
    Box::new(SparseColumn::<T>::new())
}

/// Assigns dense [`ComponentTypeId`]s to component types.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    metas: Vec<ComponentMeta>,
    by_type: HashMap<TypeId, ComponentTypeId>,
    by_name: HashMap<&'static str, ComponentTypeId>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`, returning its tag. Registering twice returns the same tag.
    ///
    /// # Panics
    ///
    /// Panics if a different type already registered the same
    /// [`Component::type_name`]. Use [`try_register`](Self::try_register)
    /// where a collision must not abort.
    pub fn register<T: Component>(&mut self) -> ComponentTypeId {
        match self.try_register::<T>() {
            Ok(id) => id,
            Err(err) => panic!("{err}"),
        }
    }

    /// Registers `T`, returning its tag.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NameCollision`] if a different type already
    /// registered the same [`Component::type_name`]. The registry is left
    /// unchanged.
    pub fn try_register<T: Component>(&mut self) -> Result<ComponentTypeId, ComponentError> {
        let key = T::key();
        if let Some(&id) = self.by_type.get(&key.type_id) {
            return Ok(id);
        }
        if self.by_name.contains_key(key.name) {
            return Err(ComponentError::NameCollision { name: key.name });
        }
        let id = ComponentTypeId(self.metas.len() as u32);
        self.metas.push(ComponentMeta {
            id,
            key,
            new_column: new_column::<T>,
        });
        self.by_type.insert(key.type_id, id);
        self.by_name.insert(key.name, id);
        Ok(id)
    }

    /// Returns the tag of `T`, if registered.
    #[must_use]
    pub fn id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the tag for a key, if registered.
    #[must_use]
    pub fn lookup(&self, key: &ComponentKey) -> Option<ComponentTypeId> {
        self.by_type.get(&key.type_id).copied()
    }

    /// Returns the tag registered under `name`, if any.
    #[must_use]
    pub fn lookup_name(&self, name: &str) -> Option<ComponentTypeId> {
        self.by_name.get(name).copied()
    }

    /// Returns the metadata of a registered tag.
    #[must_use]
    pub fn meta(&self, id: ComponentTypeId) -> Option<&ComponentMeta> {
        self.metas.get(id.index())
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.metas.len()
    }

    /// Returns `true` if nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metas.is_empty()
    }

    /// Iterates over registered types in tag order.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentMeta> {
        self.metas.iter()
    }
}

/// A component value with its type erased, plus enough information to
/// register its type later.
///
/// Used for mutations that are queued now and applied at a commit barrier.
pub struct BoxedComponent {
    key: ComponentKey,
    register: fn(&mut ComponentRegistry) -> Result<ComponentTypeId, ComponentError>,
    value: Box<dyn Any + Send + Sync>,
}

impl BoxedComponent {
    /// Box a typed component value.
    #[must_use]
    pub fn new<T: Component>(value: T) -> Self {
        Self {
            key: T::key(),
            register: ComponentRegistry::try_register::<T>,
            value: Box::new(value),
        }
    }

    /// The key of the boxed value's type.
    #[must_use]
    pub fn key(&self) -> ComponentKey {
        self.key
    }

    /// Registers the boxed value's type with `registry` and returns its tag.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::NameCollision`] if another type holds the
    /// value's component name.
    pub fn register_in(&self, registry: &mut ComponentRegistry) -> Result<ComponentTypeId, ComponentError> {
        (self.register)(registry)
    }

    /// Unwraps the value for insertion into a column.
    #[must_use]
    pub fn into_inner(self) -> Box<dyn Any + Send + Sync> {
        self.value
    }
}

impl std::fmt::Debug for BoxedComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedComponent")
            .field("type", &self.key.name)
            .finish_non_exhaustive()
    }
}

/// A bitset of component tags held by one entity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComponentMask {
    words: Vec<u64>,
}

impl ComponentMask {
    /// Create an empty mask.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag. Returns `true` if it was not already present.
    pub fn insert(&mut self, id: ComponentTypeId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let was_set = self.words[word] & (1u64 << bit) != 0;
        self.words[word] |= 1u64 << bit;
        !was_set
    }

    /// Removes a tag. Returns `true` if it was present.
    pub fn remove(&mut self, id: ComponentTypeId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        match self.words.get_mut(word) {
            Some(w) if *w & (1u64 << bit) != 0 => {
                *w &= !(1u64 << bit);
                true
            }
            _ => false,
        }
    }

    /// Returns `true` if the tag is present.
    #[must_use]
    pub fn contains(&self, id: ComponentTypeId) -> bool {
        let (word, bit) = (id.index() / 64, id.index() % 64);
        self.words.get(word).is_some_and(|w| w & (1u64 << bit) != 0)
    }

    /// Returns `true` if no tag is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Returns the number of tags present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Iterates over present tags in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.words.iter().enumerate().flat_map(|(word, &bits)| {
            (0..64usize)
                .filter(move |&bit| bits & (1u64 << bit) != 0)
                .map(move |bit| ComponentTypeId((word * 64 + bit) as u32))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
    struct Health {
        current: f32,
        max: f32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct Velocity {
        x: f32,
        y: f32,
    }

    impl Component for Velocity {
        fn type_name() -> &'static str {
            "Velocity"
        }
    }

    #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
    struct FakeHealth;

    impl Component for FakeHealth {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[test]
    fn test_registration_assigns_dense_ids() {
        let mut registry = ComponentRegistry::new();
        let health = registry.register::<Health>();
        let velocity = registry.register::<Velocity>();
        assert_eq!(health, ComponentTypeId(0));
        assert_eq!(velocity, ComponentTypeId(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut registry = ComponentRegistry::new();
        let first = registry.register::<Health>();
        let second = registry.register::<Health>();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_by_key_and_name() {
        let mut registry = ComponentRegistry::new();
        let id = registry.register::<Velocity>();
        assert_eq!(registry.id_of::<Velocity>(), Some(id));
        assert_eq!(registry.lookup(&ComponentKey::of::<Velocity>()), Some(id));
        assert_eq!(registry.lookup_name("Velocity"), Some(id));
        assert_eq!(registry.id_of::<Health>(), None);
        assert_eq!(registry.meta(id).unwrap().key.name(), "Velocity");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_name_collision_panics() {
        let mut registry = ComponentRegistry::new();
        registry.register::<Health>();
        registry.register::<FakeHealth>();
    }

    #[test]
    fn test_try_register_reports_collision() {
        let mut registry = ComponentRegistry::new();
        let health = registry.try_register::<Health>().unwrap();
        assert!(matches!(
            registry.try_register::<FakeHealth>(),
            Err(ComponentError::NameCollision { name: "Health" })
        ));
        assert!(BoxedComponent::new(FakeHealth).register_in(&mut registry).is_err());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.lookup_name("Health"), Some(health));
        assert_eq!(registry.id_of::<FakeHealth>(), None);
    }

    #[test]
    fn test_keys_compare_by_type() {
        assert_eq!(ComponentKey::of::<Health>(), ComponentKey::of::<Health>());
        assert_ne!(ComponentKey::of::<Health>(), ComponentKey::of::<FakeHealth>());
    }

    #[test]
    fn test_boxed_component_registers_lazily() {
        let mut registry = ComponentRegistry::new();
        let boxed = BoxedComponent::new(Velocity { x: 1.0, y: 0.0 });
        assert_eq!(boxed.key().name(), "Velocity");
        let id = boxed.register_in(&mut registry).unwrap();
        assert_eq!(registry.id_of::<Velocity>(), Some(id));
        let value = boxed.into_inner();
        assert!(value.downcast_ref::<Velocity>().is_some());
    }

    #[test]
    fn test_mask_insert_remove_contains() {
        let mut mask = ComponentMask::new();
        assert!(mask.is_empty());
        assert!(mask.insert(ComponentTypeId(3)));
        assert!(!mask.insert(ComponentTypeId(3)));
        assert!(mask.insert(ComponentTypeId(70)));
        assert!(mask.contains(ComponentTypeId(70)));
        assert!(!mask.contains(ComponentTypeId(4)));
        assert_eq!(mask.len(), 2);
        assert_eq!(
            mask.iter().collect::<Vec<_>>(),
            vec![ComponentTypeId(3), ComponentTypeId(70)]
        );
        assert!(mask.remove(ComponentTypeId(3)));
        assert!(!mask.remove(ComponentTypeId(3)));
        assert!(!mask.remove(ComponentTypeId(500)));
        assert_eq!(mask.len(), 1);
    }
}
