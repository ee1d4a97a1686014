//! Controller-side model: descriptor schema, raw samples, and normalization.
//!
//! The descriptor is static data shared read-only across profiles; the
//! runtime state owns exactly the previous/current sample pair a profile
//! needs for edge detection.

pub mod descriptor;
pub mod gilrs_backend;
pub mod sampler;
pub mod state;

pub use descriptor::{AxisSpec, Channel, CompoundNode, ControllerDescriptor, VectorSpec};
pub use gilrs_backend::GilrsPoller;
pub use sampler::{sample_channel, SampledInput};
pub use state::{ControllerRuntimeState, ControllerSample, DevicePoll};

/// Errors from descriptor resolution, normalization, or device polling
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// Identifier matches no button, axis, vector, or compound alias
    #[error("cannot map {0:?} to a controller input")]
    UnresolvedIdentifier(String),

    /// A channel was used where a different channel kind is required
    #[error("{identifier:?} is a {actual} channel, expected {expected}")]
    TypeMismatch {
        identifier: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// The profile's controller id has no attached controller
    #[error("controller {0} is not connected")]
    DeviceNotConnected(u32),

    /// Other OS-level polling failure
    #[error("device error: {0}")]
    Device(String),
}
