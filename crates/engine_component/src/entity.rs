//! Entity type and allocation utilities.
//!
//! An [`EntityId`] is a lightweight `(index, generation)` pair with no
//! inherent data. The index addresses a slot in per-type storage; the
//! generation invalidates stale handles once a slot is recycled.

use serde::{Deserialize, Serialize};

/// A unique entity identifier.
///
/// Entities are pure identifiers; they carry no data of their own. Components
/// are attached to entities to give them meaning.
///
/// Two ids with the same index but different generations refer to different
/// logical entities; only the id carrying the slot's current generation is
/// live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId {
    index: u32,
    generation: u32,
}

impl EntityId {
    /// Build an id from raw parts.
    #[must_use]
    pub const fn from_parts(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// The storage slot of this entity.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    /// The generation of the slot when this id was issued.
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}v{})", self.index, self.generation)
    }
}

/// Allocates entity ids, recycling freed slots under a bumped generation.
///
/// Allocation and release are O(1). A slot whose generation would wrap is
/// retired instead of recycled, so an id is never issued twice.
#[derive(Debug, Default)]
pub struct EntityAllocator {
    /// Current generation of every slot ever handed out.
    generations: Vec<u32>,
    /// Liveness of every slot.
    alive: Vec<bool>,
    /// Released slots available for reuse.
    free: Vec<u32>,
    /// Number of live ids.
    live: usize,
}

impl EntityAllocator {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a fresh entity id.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX` slots are requested.
    pub fn allocate(&mut self) -> EntityId {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = index as usize;
            self.alive[slot] = true;
            return EntityId::from_parts(index, self.generations[slot]);
        }
        let index = u32::try_from(self.generations.len()).expect("entity index space exhausted");
        self.generations.push(0);
        self.alive.push(true);
        EntityId::from_parts(index, 0)
    }

    /// Releases a live id. Returns `false` if the id was already stale.
    pub fn release(&mut self, entity: EntityId) -> bool {
        if !self.is_live(entity) {
            return false;
        }
        let slot = entity.index as usize;
        self.alive[slot] = false;
        self.live -= 1;
        // A slot whose generation cannot advance is retired for good.
        if let Some(next) = self.generations[slot].checked_add(1) {
            self.generations[slot] = next;
            self.free.push(entity.index);
        }
        true
    }

    /// Returns `true` if `entity` carries the current generation of a live slot.
    #[must_use]
    pub fn is_live(&self, entity: EntityId) -> bool {
        let slot = entity.index as usize;
        slot < self.alive.len() && self.alive[slot] && self.generations[slot] == entity.generation
    }

    /// Returns the number of live ids.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Returns the generation table, indexed by slot.
    #[must_use]
    pub fn generations(&self) -> &[u32] {
        &self.generations
    }

    /// Rebuilds an allocator from a generation table and the set of live ids.
    ///
    /// Ids whose generation disagrees with the table, or whose index lies
    /// outside it, are ignored.
    #[must_use]
    pub fn restore(generations: Vec<u32>, live: impl IntoIterator<Item = EntityId>) -> Self {
        let mut alive = vec![false; generations.len()];
        let mut count = 0;
        for entity in live {
            let slot = entity.index as usize;
            if slot < generations.len() && generations[slot] == entity.generation && !alive[slot] {
                alive[slot] = true;
                count += 1;
            }
        }
        // Reverse order so low slots are reused first.
        let free = (0..generations.len())
            .rev()
            .filter(|&slot| !alive[slot] && generations[slot] != u32::MAX)
            .map(|slot| slot as u32)
            .collect();
        Self {
            generations,
            alive,
            free,
            live: count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();
        let e2 = alloc.allocate();
        let e3 = alloc.allocate();
        assert_ne!(e1, e2);
        assert_ne!(e2, e3);
        assert_eq!(alloc.live_count(), 3);
    }

    #[test]
    fn test_released_slot_reused_with_new_generation() {
        let mut alloc = EntityAllocator::new();
        let e1 = alloc.allocate();
        assert!(alloc.release(e1));
        let e2 = alloc.allocate();
        assert_eq!(e1.index(), e2.index());
        assert_ne!(e1.generation(), e2.generation());
        assert!(!alloc.is_live(e1));
        assert!(alloc.is_live(e2));
    }

    #[test]
    fn test_double_release_is_rejected() {
        let mut alloc = EntityAllocator::new();
        let e = alloc.allocate();
        assert!(alloc.release(e));
        assert!(!alloc.release(e));
        assert_eq!(alloc.live_count(), 0);
    }

    #[test]
    fn test_exhausted_generation_retires_slot() {
        let mut alloc = EntityAllocator::restore(vec![u32::MAX], [EntityId::from_parts(0, u32::MAX)]);
        let e = EntityId::from_parts(0, u32::MAX);
        assert!(alloc.release(e));
        let fresh = alloc.allocate();
        assert_eq!(fresh.index(), 1);
    }

    #[test]
    fn test_restore_rebuilds_free_list() {
        let live = [EntityId::from_parts(1, 3)];
        let mut alloc = EntityAllocator::restore(vec![2, 3, 0], live);
        assert!(alloc.is_live(EntityId::from_parts(1, 3)));
        assert_eq!(alloc.live_count(), 1);

        let a = alloc.allocate();
        assert_eq!(a, EntityId::from_parts(0, 2));
        let b = alloc.allocate();
        assert_eq!(b, EntityId::from_parts(2, 0));
    }

    #[test]
    fn test_entity_display() {
        assert_eq!(EntityId::from_parts(4, 2).to_string(), "Entity(4v2)");
    }

    #[test]
    fn test_entity_serialization_roundtrip() {
        let entity = EntityId::from_parts(999, 7);
        let bytes = rmp_serde::to_vec(&entity).unwrap();
        let restored: EntityId = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(entity, restored);
    }
}
