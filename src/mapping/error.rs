//! Error taxonomy for the mapping engine.

use thiserror::Error;

use crate::controller::ControllerError;
use crate::output::OutputError;

/// Errors surfaced by profile binding and the per-step engine
///
/// Everything except [`MappingError::AbortRequested`] indicates a fault the
/// driver should treat as loop-terminating; abort is cooperative cancellation
/// raised only after every held response has been released.
#[derive(Debug, Error)]
pub enum MappingError {
    /// Resolution, normalization, or device polling failure
    #[error(transparent)]
    Controller(#[from] ControllerError),

    /// Output injection or key translation failure
    #[error(transparent)]
    Output(#[from] OutputError),

    /// A trigger type that parses but has no runtime implementation
    #[error("trigger type not supported: {0}")]
    NotSupported(String),

    /// Response string maps to no mouse action, named key, or literal char
    #[error("cannot map response {0:?} to an output action")]
    UnmappableResponse(String),

    /// Malformed profile or descriptor configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Cooperative cancellation; all outputs were released before this
    #[error("abort requested")]
    AbortRequested,

    /// Engine task or channel failure
    #[error("engine error: {0}")]
    Engine(String),
}
