//! Profile engine with statum state machine for the fixed-timestep loop.
//!
//! Wraps a bound [`Profile`] in a 5-state lifecycle and drives it from a
//! tokio task at a fixed simulation timestep. Wall-clock time is consumed
//! through an accumulator, so a slow tick is caught up with extra steps of
//! the same `dt` instead of a single oversized one.
//!
//! # State Machine
//!
//! ```text
//! Initializing ──► Bound ──► Running ──► Stopping ──► Stopped
//! ```

use statum::{machine, state};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::profile::Profile;
use super::{ActionEvent, MappingError};

/// Default simulation timestep, roughly 64 steps per second
pub const DEFAULT_STEP_DT: f32 = 0.01555;

/// Never run more catch-up steps than this per tick; a long stall (debugger,
/// suspend) turns into dropped time instead of an input burst.
const MAX_STEPS_PER_TICK: u32 = 8;

/// States for the profile engine lifecycle using statum
#[state]
#[derive(Debug, Clone)]
pub enum ProfileEngineState {
    Initializing, // Setting up engine structure
    Bound,        // Profile loaded and validated
    Running,      // Stepping in the main loop
    Stopping,     // Releasing held outputs
    Stopped,      // Fully stopped, ready for cleanup
}

/// Profile engine with compile-time state safety via statum
#[machine]
pub struct ProfileEngine<S: ProfileEngineState> {
    profile: Option<Profile>,
    event_sender: mpsc::Sender<ActionEvent>,
    step_dt: f32,
    name: String,
}

impl<S: ProfileEngineState> ProfileEngine<S> {
    pub fn get_name(&self) -> &str {
        &self.name
    }
}

impl ProfileEngine<Initializing> {
    pub fn create(event_sender: mpsc::Sender<ActionEvent>, step_dt: f32, name: String) -> Self {
        info!("Initializing profile engine: {}", name);
        Self::new(None, event_sender, step_dt, name)
    }

    /// Attaches an already-bound profile and transitions to Bound
    pub fn attach(mut self, profile: Profile) -> ProfileEngine<Bound> {
        debug!("Attaching profile {:?} to engine {}", profile.name(), self.name);
        self.profile = Some(profile);
        self.transition()
    }
}

impl ProfileEngine<Bound> {
    pub fn activate(self) -> ProfileEngine<Running> {
        info!("Activating profile engine: {}", self.name);
        self.transition()
    }
}

impl ProfileEngine<Running> {
    /// Runs one simulation step and forwards its events
    ///
    /// `AbortRequested` is cooperative and bubbles up unchanged; the caller
    /// decides whether it ends the loop (it does).
    fn step_once(&mut self) -> Result<(), MappingError> {
        let profile = self
            .profile
            .as_mut()
            .ok_or_else(|| MappingError::Engine("no profile attached".to_string()))?;

        let events = profile.step(self.step_dt)?;
        for event in events {
            if let Err(e) = self.event_sender.try_send(event) {
                warn!("Dropping action event, observer lagging: {}", e);
            }
        }
        Ok(())
    }

    /// Main stepping loop with graceful shutdown support
    ///
    /// Runs until the shutdown signal fires, an abort trigger is pressed, or
    /// a step fails. The accumulator converts elapsed wall-clock time into
    /// whole steps of `step_dt`.
    pub async fn run_until_shutdown(
        mut self,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Result<ProfileEngine<Stopping>, MappingError> {
        info!(
            "Starting step loop for {} at dt={}s",
            self.name, self.step_dt
        );

        let tick = Duration::from_secs_f32(self.step_dt);
        let mut interval = tokio::time::interval(tick);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        let mut last = Instant::now();
        let mut accumulator = 0.0_f32;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutdown signal received for: {}", self.name);
                    break;
                }

                now = interval.tick() => {
                    accumulator += (now - last).as_secs_f32();
                    last = now;

                    let mut steps = 0;
                    while accumulator >= self.step_dt {
                        accumulator -= self.step_dt;
                        steps += 1;
                        if steps > MAX_STEPS_PER_TICK {
                            warn!("Step loop fell behind, dropping {:.3}s", accumulator);
                            accumulator = 0.0;
                            break;
                        }

                        match self.step_once() {
                            Ok(()) => {}
                            Err(MappingError::AbortRequested) => {
                                info!("Abort trigger fired, stopping: {}", self.name);
                                return Ok(self.transition());
                            }
                            Err(e) => {
                                error!("Step failed for {}: {}", self.name, e);
                                return Err(e);
                            }
                        }
                    }
                }
            }
        }

        info!("Transitioning to Stopping state: {}", self.name);
        Ok(self.transition())
    }
}

impl ProfileEngine<Stopping> {
    /// Releases every held output and transitions to Stopped
    pub fn stop(mut self) -> ProfileEngine<Stopped> {
        if let Some(profile) = &mut self.profile {
            match profile.release_all() {
                Ok(events) => {
                    for event in events {
                        let _ = self.event_sender.try_send(event);
                    }
                }
                Err(e) => warn!("Failed to release outputs on stop: {}", e),
            }
        }
        info!("Engine stopped: {}", self.name);
        self.transition()
    }
}

impl ProfileEngine<Stopped> {}

/// Handle for managing a profile engine in a tokio task
///
/// Owns the task handle and the shutdown channel; dropping the handle
/// without calling [`ProfileEngineHandle::shutdown`] detaches the task.
#[derive(Debug)]
pub struct ProfileEngineHandle {
    pub name: String,

    task_handle: Option<JoinHandle<Result<(), MappingError>>>,

    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ProfileEngineHandle {
    pub fn new(name: String) -> Self {
        Self {
            name,
            task_handle: None,
            shutdown_tx: None,
        }
    }

    /// Spawns the step loop in a background task
    ///
    /// Returns the receiver for action events; the channel closing signals
    /// that the loop has ended (abort, error, or shutdown).
    pub fn start(
        &mut self,
        profile: Profile,
        step_dt: f32,
    ) -> Result<mpsc::Receiver<ActionEvent>, MappingError> {
        if self.task_handle.is_some() {
            return Err(MappingError::Engine(format!(
                "engine {} already started",
                self.name
            )));
        }

        let (event_sender, event_receiver) = mpsc::channel(100);
        let engine_name = self.name.clone();
        let running = ProfileEngine::create(event_sender, step_dt, engine_name.clone())
            .attach(profile)
            .activate();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);
        let task_handle = tokio::spawn(async move {
            info!("Spawning running engine: {}", engine_name);
            match running.run_until_shutdown(shutdown_rx).await {
                Ok(stopping) => {
                    let _ = stopping.stop();
                    Ok(())
                }
                Err(e) => {
                    error!("Error running engine: {} - {}", engine_name, e);
                    Err(e)
                }
            }
        });
        self.task_handle = Some(task_handle);

        info!("Profile engine started: {}", self.name);
        Ok(event_receiver)
    }

    /// Gracefully shuts down the engine and waits for task completion
    pub async fn shutdown(&mut self) -> Result<(), MappingError> {
        debug!("Sending shutdown signal to engine: {}", self.name);

        if let Some(tx) = self.shutdown_tx.take() {
            if tx.send(()).is_err() {
                warn!("Engine task already terminated: {}", self.name);
            }
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => {
                    debug!("Engine task completed: {}", self.name);
                    result
                }
                Err(e) => {
                    error!("Engine task panicked: {} - {}", self.name, e);
                    Err(MappingError::Engine(format!("engine task panicked: {e}")))
                }
            }
        } else {
            debug!("Engine already shut down: {}", self.name);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{ControllerError, ControllerSample, DevicePoll};
    use crate::mapping::dispatch::ActionDispatcher;
    use crate::mapping::trigger::ProfileConfig;
    use crate::mapping::ActionState;
    use crate::output::TraceSink;
    use std::collections::HashMap;
    use std::sync::Arc;

    struct PulsePoller {
        polls: u32,
    }

    impl DevicePoll for PulsePoller {
        fn poll(&mut self, _controller_id: u32) -> Result<ControllerSample, ControllerError> {
            self.polls += 1;
            // Press on the third poll, release afterwards
            Ok(ControllerSample {
                buttons: vec![self.polls == 3],
                axes: HashMap::new(),
            })
        }
    }

    fn test_profile() -> Profile {
        let descriptor = Arc::new(
            serde_json::from_str(r#"{ "buttons": ["jump"] }"#).unwrap(),
        );
        let config: ProfileConfig = serde_json::from_value(serde_json::json!({
            "controller": "test",
            "id": 0,
            "mappings": { "jump": "w on hold" }
        }))
        .unwrap();
        Profile::bind(
            "test",
            &config,
            descriptor,
            Box::new(PulsePoller { polls: 0 }),
            ActionDispatcher::new(Box::new(TraceSink::new())),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn engine_emits_events_and_shuts_down_cleanly() {
        let mut handle = ProfileEngineHandle::new("test".to_string());
        let mut events = handle.start(test_profile(), 0.002).unwrap();

        let pressed = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("no event before timeout")
            .expect("channel closed early");
        assert_eq!(pressed.state, ActionState::Pressed);
        assert_eq!(pressed.response, "w");

        let released = tokio::time::timeout(Duration::from_secs(2), events.recv())
            .await
            .expect("no event before timeout")
            .expect("channel closed early");
        assert_eq!(released.state, ActionState::Released);

        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let mut handle = ProfileEngineHandle::new("test".to_string());
        let _events = handle.start(test_profile(), 0.002).unwrap();
        assert!(matches!(
            handle.start(test_profile(), 0.002),
            Err(MappingError::Engine(_))
        ));
        handle.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn shutdown_without_start_is_a_no_op() {
        let mut handle = ProfileEngineHandle::new("idle".to_string());
        handle.shutdown().await.unwrap();
    }
}
