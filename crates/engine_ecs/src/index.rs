//! Per-type entity index.
//!
//! [`ComponentIndex`] keeps, for every registered component type, the set of
//! entities currently holding it. The store only touches it while applying
//! changes outside a pass, so a set read during a pass stays valid for the
//! whole pass.

use std::collections::{BTreeMap, HashMap};

use engine_component::{ComponentTypeId, EntityId};

/// An ordered set of entities.
///
/// Iteration follows the order in which entities were created in the store
/// (their creation serial), not the order of insertion into this set and not
/// the numeric order of their ids. Membership tests are O(1).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntitySet {
    order: BTreeMap<u64, EntityId>,
    serials: HashMap<EntityId, u64>,
}

impl EntitySet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `entity` under its creation serial. Returns `false` if present.
    pub fn insert(&mut self, serial: u64, entity: EntityId) -> bool {
        if self.serials.contains_key(&entity) {
            return false;
        }
        self.serials.insert(entity, serial);
        self.order.insert(serial, entity);
        true
    }

    /// Removes `entity`. Returns `false` if absent.
    pub fn remove(&mut self, entity: EntityId) -> bool {
        match self.serials.remove(&entity) {
            Some(serial) => {
                self.order.remove(&serial);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `entity` is in the set.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.serials.contains_key(&entity)
    }

    /// Returns the creation serial recorded for `entity`.
    #[must_use]
    pub fn serial_of(&self, entity: EntityId) -> Option<u64> {
        self.serials.get(&entity).copied()
    }

    /// Returns the number of entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.serials.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.serials.is_empty()
    }

    /// Iterates in creation order.
    pub fn iter(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.values().copied()
    }

    /// Iterates `(serial, entity)` pairs in creation order.
    pub fn iter_with_serials(&self) -> impl Iterator<Item = (u64, EntityId)> + '_ {
        self.order.iter().map(|(&serial, &entity)| (serial, entity))
    }

    /// Collects the set into a vector in creation order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<EntityId> {
        self.iter().collect()
    }

    /// Removes every entity.
    pub fn clear(&mut self) {
        self.order.clear();
        self.serials.clear();
    }
}

/// Maps each component type to the entities holding it.
#[derive(Debug, Default)]
pub struct ComponentIndex {
    sets: Vec<EntitySet>,
    empty: EntitySet,
}

impl ComponentIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Grows the index to cover `types` component tags.
    pub(crate) fn ensure(&mut self, types: usize) {
        if self.sets.len() < types {
            self.sets.resize_with(types, EntitySet::new);
        }
    }

    pub(crate) fn insert(&mut self, ty: ComponentTypeId, serial: u64, entity: EntityId) {
        self.ensure(ty.index() + 1);
        self.sets[ty.index()].insert(serial, entity);
    }

    pub(crate) fn remove(&mut self, ty: ComponentTypeId, entity: EntityId) {
        if let Some(set) = self.sets.get_mut(ty.index()) {
            set.remove(entity);
        }
    }

    pub(crate) fn clear(&mut self) {
        self.sets.iter_mut().for_each(EntitySet::clear);
    }

    /// Returns the entities holding `ty`. Unknown tags yield an empty set.
    #[must_use]
    pub fn entities_with(&self, ty: ComponentTypeId) -> &EntitySet {
        self.sets.get(ty.index()).unwrap_or(&self.empty)
    }

    /// Returns `true` if `entity` holds `ty`.
    #[must_use]
    pub fn contains(&self, ty: ComponentTypeId, entity: EntityId) -> bool {
        self.entities_with(ty).contains(entity)
    }

    /// Returns the entities holding every type in `types`.
    ///
    /// The smallest per-type set drives the scan; the others are only probed.
    /// An empty `types` slice yields an empty set.
    #[must_use]
    pub fn entities_with_all(&self, types: &[ComponentTypeId]) -> EntitySet {
        let mut result = EntitySet::new();
        let Some(smallest) = types
            .iter()
            .map(|&ty| self.entities_with(ty))
            .min_by_key(|set| set.len())
        else {
            return result;
        };
        for (serial, entity) in smallest.iter_with_serials() {
            if types.iter().all(|&ty| self.contains(ty, entity)) {
                result.insert(serial, entity);
            }
        }
        result
    }

    /// Returns the entities holding at least one type in `types`.
    #[must_use]
    pub fn entities_with_any(&self, types: &[ComponentTypeId]) -> EntitySet {
        let mut result = EntitySet::new();
        for &ty in types {
            for (serial, entity) in self.entities_with(ty).iter_with_serials() {
                result.insert(serial, entity);
            }
        }
        result
    }
}
