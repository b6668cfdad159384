//! Component-layer error types.

/// Errors raised by type-erased component storage.
#[derive(Debug, thiserror::Error)]
pub enum ComponentError {
    /// Failed to encode a component value to MessagePack.
    #[error("failed to encode component: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a component value from MessagePack.
    #[error("failed to decode component: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// A boxed value was offered to a column of another type.
    #[error("component type mismatch: column stores {expected}")]
    TypeMismatch {
        /// Name of the type the column stores.
        expected: &'static str,
    },

    /// Another type already registered this component name.
    #[error("component name {name:?} is already registered by another type")]
    NameCollision {
        /// The contested [`Component::type_name`](crate::Component::type_name).
        name: &'static str,
    },
}
