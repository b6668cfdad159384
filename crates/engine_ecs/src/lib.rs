//! # engine_ecs
//!
//! The entity store for the simulation core.
//!
//! - [`EntityStore`]: owns entities, component columns, and the pass barrier.
//! - [`ComponentIndex`] / [`EntitySet`]: per-type membership backing queries.
//! - [`QueryEngine`]: resolves a [`QueryDescriptor`](engine_component::QueryDescriptor)
//!   to matching entities in creation order.
//! - [`PendingChangeSet`]: structural changes deferred to the next commit.
//! - [`RequestQueue`] / [`RequestSender`]: thread-safe change requests from
//!   outside the simulation thread.
//! - [`WorldSnapshot`]: export and import of the committed world.

pub mod error;
pub mod index;
pub mod pending;
pub mod query;
pub mod requests;
pub mod snapshot;
pub mod store;

pub use error::EcsError;
pub use index::{ComponentIndex, EntitySet};
pub use pending::{CommitSummary, PendingChange, PendingChangeSet};
pub use query::QueryEngine;
pub use requests::{RequestQueue, RequestSender};
pub use snapshot::{ComponentRecord, EntitySnapshot, WorldSnapshot};
pub use store::{EntityRecord, EntityStore, MutationOutcome};
