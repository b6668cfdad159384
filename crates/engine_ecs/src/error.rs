//! Store-level error types.
//!
//! Lookups and structural mutations never fail with these; they report
//! absence through `Option` and [`MutationOutcome`](crate::MutationOutcome).
//! Errors are reserved for whole-store operations such as snapshots.

use engine_component::ComponentError;

/// Errors raised by whole-store operations.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// The operation is only valid between passes.
    #[error("{operation} is not allowed while an update pass is active")]
    PassActive {
        /// The rejected operation.
        operation: &'static str,
    },

    /// Snapshots may only be imported into an empty store.
    #[error("snapshot import requires an empty store")]
    StoreNotEmpty,

    /// A snapshot names a component type this store has not registered.
    #[error("unknown component type: {0}")]
    UnknownComponent(String),

    /// A snapshot is internally inconsistent.
    #[error("corrupt snapshot: {0}")]
    CorruptSnapshot(String),

    /// A component value could not be encoded or decoded.
    #[error(transparent)]
    Component(#[from] ComponentError),

    /// Failed to encode a snapshot to MessagePack.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a snapshot from MessagePack.
    #[error("failed to decode snapshot: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}
