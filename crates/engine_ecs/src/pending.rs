//! Deferred structural changes.
//!
//! Structural mutations requested while a pass is running are recorded here
//! and applied together at the pass barrier. Requests from other threads
//! arrive through the [`RequestQueue`](crate::RequestQueue) as the same
//! [`PendingChange`] values.

use engine_component::{BoxedComponent, ComponentKey, EntityId};

/// One queued structural mutation.
#[derive(Debug)]
pub enum PendingChange {
    /// Make a reserved entity id alive.
    Spawn(EntityId),
    /// Remove an entity and every component it holds.
    Destroy(EntityId),
    /// Attach (or replace) a component.
    Attach {
        /// Target entity.
        entity: EntityId,
        /// The component value, type-erased.
        component: BoxedComponent,
    },
    /// Remove a component type from an entity.
    Detach {
        /// Target entity.
        entity: EntityId,
        /// The component type to remove.
        key: ComponentKey,
    },
}

impl PendingChange {
    /// The entity this change targets.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        match self {
            Self::Spawn(entity) | Self::Destroy(entity) => *entity,
            Self::Attach { entity, .. } | Self::Detach { entity, .. } => *entity,
        }
    }
}

/// Ordered queue of changes awaiting the next commit.
#[derive(Debug, Default)]
pub struct PendingChangeSet {
    changes: Vec<PendingChange>,
}

impl PendingChangeSet {
    /// Create an empty change set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a change.
    pub fn push(&mut self, change: PendingChange) {
        self.changes.push(change);
    }

    /// Returns the number of queued changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Iterates over queued changes in request order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter()
    }

    /// Removes and returns every queued change in request order.
    pub fn take(&mut self) -> Vec<PendingChange> {
        std::mem::take(&mut self.changes)
    }
}

/// Counts of what a commit applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    /// Reserved entities made alive.
    pub spawned: usize,
    /// Entities destroyed.
    pub destroyed: usize,
    /// Components attached or replaced.
    pub attached: usize,
    /// Components detached.
    pub detached: usize,
    /// Changes dropped because their target no longer existed.
    pub skipped: usize,
}

impl CommitSummary {
    /// Total number of changes applied.
    #[must_use]
    pub fn applied(&self) -> usize {
        self.spawned + self.destroyed + self.attached + self.detached
    }

    /// Returns `true` if the commit processed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.applied() == 0 && self.skipped == 0
    }
}
