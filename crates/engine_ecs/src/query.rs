//! Query execution over the component index.
//!
//! [`QueryEngine`] turns a [`QueryDescriptor`] into the list of matching
//! entities. Results come back in entity creation order, de-duplicated, and
//! reflect the store as of the last commit.

use engine_component::{ComponentKey, ComponentRegistry, ComponentTypeId, EntityId, QueryDescriptor};

use crate::index::{ComponentIndex, EntitySet};

/// Read-only view used to answer queries.
#[derive(Debug, Clone, Copy)]
pub struct QueryEngine<'a> {
    registry: &'a ComponentRegistry,
    index: &'a ComponentIndex,
    alive: &'a EntitySet,
}

/// A descriptor with its keys resolved against one registry.
struct Resolved {
    all: Vec<ComponentTypeId>,
    any: Vec<ComponentTypeId>,
    none: Vec<ComponentTypeId>,
}

impl<'a> QueryEngine<'a> {
    pub(crate) fn new(
        registry: &'a ComponentRegistry,
        index: &'a ComponentIndex,
        alive: &'a EntitySet,
    ) -> Self {
        Self {
            registry,
            index,
            alive,
        }
    }

    /// Resolves keys to tags. Returns `None` when the query cannot match
    /// anything because a required type was never registered.
    fn resolve(&self, query: &QueryDescriptor) -> Option<Resolved> {
        let all = query
            .required()
            .iter()
            .map(|key| self.registry.lookup(key))
            .collect::<Option<Vec<_>>>()?;
        let any = self.registered(&query.any_of);
        if !query.any_of.is_empty() && any.is_empty() {
            return None;
        }
        let none = self.registered(&query.without);
        Some(Resolved { all, any, none })
    }

    fn registered(&self, keys: &[ComponentKey]) -> Vec<ComponentTypeId> {
        keys.iter().filter_map(|key| self.registry.lookup(key)).collect()
    }

    fn accepts(&self, resolved: &Resolved, entity: EntityId) -> bool {
        resolved.all.iter().all(|&ty| self.index.contains(ty, entity))
            && (resolved.any.is_empty() || resolved.any.iter().any(|&ty| self.index.contains(ty, entity)))
            && !resolved.none.iter().any(|&ty| self.index.contains(ty, entity))
    }

    /// Returns every committed entity matching `query`, in creation order.
    ///
    /// An empty descriptor matches every live entity.
    #[must_use]
    pub fn query(&self, query: &QueryDescriptor) -> Vec<EntityId> {
        let Some(resolved) = self.resolve(query) else {
            return Vec::new();
        };

        if let Some(driver) = resolved
            .all
            .iter()
            .map(|&ty| self.index.entities_with(ty))
            .min_by_key(|set| set.len())
        {
            return driver
                .iter()
                .filter(|&entity| self.accepts(&resolved, entity))
                .collect();
        }

        if !resolved.any.is_empty() {
            return self
                .index
                .entities_with_any(&resolved.any)
                .iter()
                .filter(|&entity| self.accepts(&resolved, entity))
                .collect();
        }

        self.alive
            .iter()
            .filter(|&entity| self.accepts(&resolved, entity))
            .collect()
    }

    /// Returns the number of entities matching `query`.
    #[must_use]
    pub fn count(&self, query: &QueryDescriptor) -> usize {
        self.query(query).len()
    }

    /// Returns `true` if `entity` is alive and matches `query`.
    #[must_use]
    pub fn matches(&self, entity: EntityId, query: &QueryDescriptor) -> bool {
        self.alive.contains(entity)
            && self
                .resolve(query)
                .is_some_and(|resolved| self.accepts(&resolved, entity))
    }
}
