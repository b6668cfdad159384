//! Per-type component storage.
//!
//! Each registered component type owns one [`SparseColumn`]: a sparse array
//! indexed by entity slot that points into a packed value array. Insert,
//! remove, and lookup are O(1); iteration walks the packed array.
//!
//! The store holds columns behind the object-safe [`ErasedColumn`] trait and
//! downcasts to the typed column for typed access.

use std::any::Any;

use crate::component::Component;
use crate::entity::EntityId;
use crate::error::ComponentError;

/// Type-erased operations every column supports.
pub trait ErasedColumn: Send + Sync {
    /// The component name this column stores.
    fn type_name(&self) -> &'static str;

    /// Returns the number of stored values.
    fn len(&self) -> usize;

    /// Returns `true` if the column holds no values.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `entity` (including its generation) has a value.
    fn contains(&self, entity: EntityId) -> bool;

    /// Removes the value of `entity`. Returns `true` if one was present.
    fn remove(&mut self, entity: EntityId) -> bool;

    /// Inserts a boxed value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::TypeMismatch`] if the box holds another type.
    fn insert_boxed(
        &mut self,
        entity: EntityId,
        value: Box<dyn Any + Send + Sync>,
    ) -> Result<(), ComponentError>;

    /// Encodes the value of `entity` to MessagePack, if present.
    fn encode(&self, entity: EntityId) -> Option<Result<Vec<u8>, ComponentError>>;

    /// Decodes a MessagePack value and inserts it for `entity`.
    ///
    /// # Errors
    ///
    /// Returns [`ComponentError::Decode`] if the bytes do not describe a value
    /// of this column's type.
    fn insert_encoded(&mut self, entity: EntityId, bytes: &[u8]) -> Result<(), ComponentError>;

    /// Drops every value.
    fn clear(&mut self);

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl std::fmt::Debug for dyn ErasedColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Column")
            .field("type", &self.type_name())
            .field("len", &self.len())
            .finish()
    }
}

/// Sparse-set storage for one component type.
#[derive(Debug)]
pub struct SparseColumn<T> {
    /// Entity slot -> position in `dense`.
    sparse: Vec<Option<u32>>,
    /// Owner of each packed value, parallel with `values`.
    dense: Vec<EntityId>,
    values: Vec<T>,
}

impl<T: Component> SparseColumn<T> {
    /// Create an empty column.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            values: Vec::new(),
        }
    }

    fn position(&self, entity: EntityId) -> Option<usize> {
        let pos = (*self.sparse.get(entity.index() as usize)?)? as usize;
        // A recycled slot may still point at the previous owner's value.
        (self.dense[pos] == entity).then_some(pos)
    }

    /// Inserts a value, returning the one it replaced.
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        if let Some(pos) = self.position(entity) {
            return Some(std::mem::replace(&mut self.values[pos], value));
        }
        let slot = entity.index() as usize;
        if slot >= self.sparse.len() {
            self.sparse.resize(slot + 1, None);
        }
        // A stale owner of this slot is evicted first.
        if let Some(pos) = self.sparse[slot] {
            let stale = self.dense[pos as usize];
            self.take(stale);
        }
        self.sparse[slot] = Some(self.dense.len() as u32);
        self.dense.push(entity);
        self.values.push(value);
        None
    }

    /// Removes and returns the value of `entity`.
    pub fn take(&mut self, entity: EntityId) -> Option<T> {
        let slot = entity.index() as usize;
        let pos = (*self.sparse.get(slot)?)? as usize;
        if self.dense[pos] != entity {
            return None;
        }
        self.sparse[slot] = None;
        self.dense.swap_remove(pos);
        let value = self.values.swap_remove(pos);
        if let Some(&moved) = self.dense.get(pos) {
            self.sparse[moved.index() as usize] = Some(pos as u32);
        }
        Some(value)
    }

    /// Returns the value of `entity`.
    #[must_use]
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        self.position(entity).map(|pos| &self.values[pos])
    }

    /// Returns the value of `entity` mutably.
    #[must_use]
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        self.position(entity).map(|pos| &mut self.values[pos])
    }

    /// Iterates over `(owner, value)` pairs in packed order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> {
        self.dense.iter().copied().zip(self.values.iter())
    }
}

impl<T: Component> Default for SparseColumn<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> ErasedColumn for SparseColumn<T> {
    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.position(entity).is_some()
    }

    fn remove(&mut self, entity: EntityId) -> bool {
        self.take(entity).is_some()
    }

    fn insert_boxed(
        &mut self,
        entity: EntityId,
        value: Box<dyn Any + Send + Sync>,
    ) -> Result<(), ComponentError> {
        let value = value
            .downcast::<T>()
            .map_err(|_| ComponentError::TypeMismatch {
                expected: T::type_name(),
            })?;
        self.insert(entity, *value);
        Ok(())
    }

    fn encode(&self, entity: EntityId) -> Option<Result<Vec<u8>, ComponentError>> {
        self.get(entity)
            .map(|value| rmp_serde::to_vec_named(value).map_err(ComponentError::from))
    }

    fn insert_encoded(&mut self, entity: EntityId, bytes: &[u8]) -> Result<(), ComponentError> {
        let value: T = rmp_serde::from_slice(bytes)?;
        self.insert(entity, value);
        Ok(())
    }

    fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.values.clear();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
