//! Point-in-time world snapshots.
//!
//! A [`WorldSnapshot`] records every live entity with its component values
//! encoded as MessagePack and keyed by component name. Any store that has
//! registered the same component types can import it.

use engine_component::EntityId;
use serde::{Deserialize, Serialize};

use crate::error::EcsError;

/// One encoded component value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRecord {
    /// The registered component name.
    pub component: String,
    /// The value as MessagePack.
    pub data: Vec<u8>,
}

/// One entity and its components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    /// The entity id, generation included.
    pub entity: EntityId,
    /// One record per attached component, in registration order.
    pub components: Vec<ComponentRecord>,
}

/// Every committed entity of a store, plus the allocator's generation table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Slot generations at the time of capture. Restoring them keeps
    /// destroyed ids from being reissued.
    pub generations: Vec<u32>,
    /// Entities in creation order.
    pub entities: Vec<EntitySnapshot>,
}

impl WorldSnapshot {
    /// Returns the number of entities captured.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Finds the saved state of `entity`.
    #[must_use]
    pub fn entity(&self, entity: EntityId) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|saved| saved.entity == entity)
    }

    /// Serializes to MessagePack.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Encode`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, EcsError> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    /// Deserializes from MessagePack.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Decode`] if the bytes are not a snapshot.
    pub fn decode(bytes: &[u8]) -> Result<Self, EcsError> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            WorldSnapshot::decode(&[0xc1, 0x00]),
            Err(EcsError::Decode(_))
        ));
    }

    #[test]
    fn test_entity_lookup() {
        let e = EntityId::from_parts(2, 1);
        let snapshot = WorldSnapshot {
            generations: vec![0, 0, 1],
            entities: vec![EntitySnapshot {
                entity: e,
                components: vec![ComponentRecord {
                    component: "Tag".into(),
                    data: vec![0xc0],
                }],
            }],
        };
        assert_eq!(snapshot.entity_count(), 1);
        assert_eq!(snapshot.entity(e).unwrap().components[0].component, "Tag");
        assert!(snapshot.entity(EntityId::from_parts(0, 0)).is_none());
    }
}
