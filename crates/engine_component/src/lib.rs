//! # engine_component
//!
//! The "E" and "C" in ECS: entity identity, component typing, and per-type
//! storage for the simulation core.
//!
//! This crate provides:
//!
//! - [`EntityId`]: generational `(index, generation)` entity identifiers.
//! - [`EntityAllocator`]: O(1) id allocator with slot recycling.
//! - [`Component`] trait: the contract all ECS data must satisfy.
//! - [`ComponentRegistry`]: assigns dense [`ComponentTypeId`] tags.
//! - [`SparseColumn`] / [`ErasedColumn`]: sparse-set storage per type.
//! - [`QueryDescriptor`]: declarative data access requirements for systems.

pub mod component;
pub mod entity;
pub mod error;
pub mod query;
pub mod storage;

pub use component::{
    BoxedComponent, Component, ComponentKey, ComponentMask, ComponentMeta, ComponentRegistry,
    ComponentTypeId,
};
pub use entity::{EntityAllocator, EntityId};
pub use error::ComponentError;
pub use query::QueryDescriptor;
pub use storage::{ErasedColumn, SparseColumn};
