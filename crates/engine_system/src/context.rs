//! Per-pass execution context provided to systems.

use engine_component::{Component, EntityId, QueryDescriptor};
use engine_ecs::{EntityStore, MutationOutcome, RequestSender};
use tracing::warn;

use crate::descriptor::SystemDescriptor;

/// Context provided to a system on each pass.
///
/// Wraps the store for the duration of one system's update. Queries see
/// the state as of the last commit; structural mutations made here are
/// queued until the pass ends.
#[derive(Debug)]
pub struct SystemContext<'a> {
    store: &'a mut EntityStore,
    descriptor: &'a SystemDescriptor,
    tick: u64,
    dt: f64,
}

impl<'a> SystemContext<'a> {
    /// Create a context for one system update.
    #[must_use]
    pub fn new(store: &'a mut EntityStore, descriptor: &'a SystemDescriptor, tick: u64, dt: f64) -> Self {
        Self {
            store,
            descriptor,
            tick,
            dt,
        }
    }

    /// The pass counter for this system's rate.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Delta time for this pass, in seconds.
    #[must_use]
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// The running system's name.
    #[must_use]
    pub fn system_name(&self) -> &str {
        &self.descriptor.name
    }

    /// Entities matching the system's own query.
    #[must_use]
    pub fn entities(&self) -> Vec<EntityId> {
        self.store.query(&self.descriptor.query)
    }

    /// Entities matching an ad-hoc query.
    #[must_use]
    pub fn query(&self, query: &QueryDescriptor) -> Vec<EntityId> {
        self.store.query(query)
    }

    /// Returns `true` if `entity` is alive.
    #[must_use]
    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.store.is_alive(entity)
    }

    /// Returns `true` if `entity` holds a `T`.
    #[must_use]
    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        self.store.has_component::<T>(entity)
    }

    /// Reads `entity`'s `T`.
    #[must_use]
    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.store.get_component(entity)
    }

    /// Writes `entity`'s `T` in place.
    ///
    /// Returns `None` if the system did not declare write access to `T`.
    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        if !self.descriptor.query.can_write(&T::key()) {
            warn!(
                system = self.descriptor.name,
                component = T::type_name(),
                "write to undeclared component refused"
            );
            return None;
        }
        self.store.get_component_mut(entity)
    }

    /// Reserves a new entity; it becomes alive when the pass commits.
    pub fn spawn(&mut self) -> EntityId {
        self.store.create_entity()
    }

    /// Queues destruction of `entity`.
    pub fn destroy(&mut self, entity: EntityId) -> MutationOutcome {
        self.store.destroy_entity(entity)
    }

    /// Queues attaching `value` to `entity`.
    pub fn attach<T: Component>(&mut self, entity: EntityId, value: T) -> MutationOutcome {
        self.store.attach(entity, value)
    }

    /// Queues detaching `T` from `entity`.
    pub fn detach<T: Component>(&mut self, entity: EntityId) -> MutationOutcome {
        self.store.detach::<T>(entity)
    }

    /// A sender for applying results of background work on a later pass.
    #[must_use]
    pub fn request_sender(&self) -> RequestSender {
        self.store.request_sender()
    }
}
