//! Loop-level error types.

use engine_ecs::EcsError;

use crate::game_loop::LoopState;

/// Errors raised by the game loop and its configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    /// The operation is not valid in the loop's current state.
    #[error("{operation} is not allowed while the loop is {state}")]
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// The state the loop was in.
        state: LoopState,
    },

    /// A configuration value is out of range.
    #[error("invalid loop configuration: {0}")]
    InvalidConfig(String),

    /// A configuration document could not be parsed.
    #[error("failed to parse loop configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The entity store rejected the operation.
    #[error(transparent)]
    Ecs(#[from] EcsError),
}
