//! Query descriptors for system data access declarations.
//!
//! A [`QueryDescriptor`] declares which component types a system reads and
//! writes, plus optional membership filters. The query engine uses it to
//! select matching entities; the scheduler uses it to spot same-priority
//! systems whose relative order matters.

use crate::component::{Component, ComponentKey};

/// Describes the data access requirements of a system.
///
/// An entity matches when it holds every type in `reads`, `writes`, and
/// `with` (all-of), at least one type in `any_of` when that list is
/// non-empty, and none of the types in `without`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryDescriptor {
    /// Component types the system reads immutably.
    pub reads: Vec<ComponentKey>,
    /// Component types the system writes in place.
    pub writes: Vec<ComponentKey>,
    /// Component types that must be present but are not accessed.
    pub with: Vec<ComponentKey>,
    /// Component types of which at least one must be present.
    pub any_of: Vec<ComponentKey>,
    /// Component types that must be absent.
    pub without: Vec<ComponentKey>,
}

impl QueryDescriptor {
    /// Create a new empty query descriptor. An empty query matches every
    /// live entity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a read-only component requirement.
    #[must_use]
    pub fn read<T: Component>(mut self) -> Self {
        self.reads.push(T::key());
        self
    }

    /// Add a mutable component requirement.
    #[must_use]
    pub fn write<T: Component>(mut self) -> Self {
        self.writes.push(T::key());
        self
    }

    /// Require `T` without declaring access to it.
    #[must_use]
    pub fn with<T: Component>(mut self) -> Self {
        self.with.push(T::key());
        self
    }

    /// Add `T` to the any-of set.
    #[must_use]
    pub fn any_of<T: Component>(mut self) -> Self {
        self.any_of.push(T::key());
        self
    }

    /// Exclude entities holding `T`.
    #[must_use]
    pub fn without<T: Component>(mut self) -> Self {
        self.without.push(T::key());
        self
    }

    /// Returns the all-of set (reads + writes + with), de-duplicated.
    #[must_use]
    pub fn required(&self) -> Vec<ComponentKey> {
        let mut types: Vec<ComponentKey> = Vec::new();
        for key in self.reads.iter().chain(&self.writes).chain(&self.with) {
            if !types.contains(key) {
                types.push(*key);
            }
        }
        types
    }

    /// Returns `true` if the descriptor grants write access to `key`.
    #[must_use]
    pub fn can_write(&self, key: &ComponentKey) -> bool {
        self.writes.contains(key)
    }

    /// Returns `true` if the descriptor has no terms at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
            && self.writes.is_empty()
            && self.with.is_empty()
            && self.any_of.is_empty()
            && self.without.is_empty()
    }

    /// Checks whether this query conflicts with another.
    ///
    /// Two queries conflict when one writes a component type that the other
    /// reads or writes:
    ///
    /// ```text
    /// A.writes ∩ (B.reads ∪ B.writes) ≠ ∅  OR
    /// B.writes ∩ (A.reads ∪ A.writes) ≠ ∅
    /// ```
    #[must_use]
    pub fn conflicts_with(&self, other: &QueryDescriptor) -> bool {
        let touches = |q: &QueryDescriptor, key: &ComponentKey| {
            q.reads.contains(key) || q.writes.contains(key)
        };
        self.writes.iter().any(|w| touches(other, w)) || other.writes.iter().any(|w| touches(self, w))
    }
}
