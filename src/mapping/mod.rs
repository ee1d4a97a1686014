//! Turns controller state transitions into synthetic keyboard/mouse actions.
//!
//! A [`profile::Profile`] owns the trigger list and the set of currently held
//! responses; [`engine::ProfileEngineHandle`] drives it at a fixed timestep
//! inside a tokio task. State changes are reported as [`ActionEvent`]s over a
//! channel instead of being printed, so the engine stays output-agnostic.

pub mod dispatch;
pub mod engine;
pub mod error;
pub mod profile;
pub mod trigger;

pub use dispatch::ActionDispatcher;
pub use engine::{ProfileEngine, ProfileEngineHandle, ProfileEngineState};
pub use error::MappingError;
pub use profile::Profile;
pub use trigger::{ProfileConfig, Trigger, TriggerKind};

use chrono::{DateTime, Local};

/// What happened to a response
#[derive(Debug, Clone, PartialEq)]
pub enum ActionState {
    Pressed,
    Released,
    /// Relative mouse delta, reported only for triggers with `debug` set
    Moved { dx: f32, dy: f32 },
}

/// One observable state change emitted by the engine
#[derive(Debug, Clone)]
pub struct ActionEvent {
    pub response: String,
    pub state: ActionState,
    pub timestamp: DateTime<Local>,
}

impl ActionEvent {
    pub fn pressed(response: &str) -> Self {
        Self {
            response: response.to_string(),
            state: ActionState::Pressed,
            timestamp: Local::now(),
        }
    }

    pub fn released(response: &str) -> Self {
        Self {
            response: response.to_string(),
            state: ActionState::Released,
            timestamp: Local::now(),
        }
    }

    pub fn moved(response: &str, dx: f32, dy: f32) -> Self {
        Self {
            response: response.to_string(),
            state: ActionState::Moved { dx, dy },
            timestamp: Local::now(),
        }
    }
}
