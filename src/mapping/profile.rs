//! The trigger engine: one profile bound to one controller.
//!
//! Each `step(dt)` polls the controller once, evaluates every trigger in
//! declaration order against the previous/current sample pair, and emits
//! press/release/move calls through the action dispatcher. The profile
//! exclusively owns the `pressed` set; pressing the reserved `"abort"`
//! response releases everything held and then propagates
//! [`MappingError::AbortRequested`] so the driver can stop cleanly with no
//! output left stuck down.

use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use super::dispatch::ActionDispatcher;
use super::error::MappingError;
use super::trigger::{
    ProfileConfig, Threshold, Trigger, TriggerEntries, TriggerKind, TriggerOptions,
};
use super::ActionEvent;
use crate::controller::{
    sample_channel, Channel, ControllerDescriptor, ControllerError, ControllerRuntimeState,
    DevicePoll, SampledInput,
};

/// Reserved response that cancels the profile instead of producing output
pub const ABORT_RESPONSE: &str = "abort";

/// A loaded profile plus everything it owns at runtime
pub struct Profile {
    name: String,
    controller_id: u32,
    descriptor: Arc<ControllerDescriptor>,
    triggers: Vec<Trigger>,

    /// Responses currently held down by this profile
    pressed: HashSet<String>,

    state: ControllerRuntimeState,
    poller: Box<dyn DevicePoll>,
    dispatcher: ActionDispatcher,
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("name", &self.name)
            .field("controller_id", &self.controller_id)
            .finish_non_exhaustive()
    }
}

impl Profile {
    /// Parses and validates a profile config against its descriptor
    ///
    /// All configuration-shape errors surface here, at load time: unknown
    /// trigger types, unresolvable identifiers, missing thresholds, and the
    /// unimplemented Repeat type.
    pub fn bind(
        name: impl Into<String>,
        config: &ProfileConfig,
        descriptor: Arc<ControllerDescriptor>,
        poller: Box<dyn DevicePoll>,
        dispatcher: ActionDispatcher,
    ) -> Result<Self, MappingError> {
        let name = name.into();
        descriptor.validate()?;

        let mut triggers = Vec::new();
        for (input, value) in &config.mappings {
            let entries: TriggerEntries = serde_json::from_value(value.clone())
                .map_err(|e| MappingError::Config(format!("mapping for {input:?}: {e}")))?;
            for raw in entries.into_vec() {
                let trigger = Trigger::from_raw(input, raw)?;
                Self::validate_trigger(&descriptor, &trigger)?;
                debug!(
                    "Trigger: {:?} -> {:?} on {}",
                    trigger.input, trigger.response, trigger.kind
                );
                triggers.push(trigger);
            }
        }

        info!(
            "Bound profile {:?}: {} triggers on controller {}",
            name,
            triggers.len(),
            config.id
        );
        Ok(Self {
            name,
            controller_id: config.id,
            descriptor,
            triggers,
            pressed: HashSet::new(),
            state: ControllerRuntimeState::default(),
            poller,
            dispatcher,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Responses currently held down
    pub fn pressed(&self) -> &HashSet<String> {
        &self.pressed
    }

    /// One fixed-timestep tick: poll, evaluate every trigger, dispatch
    ///
    /// Returns the action events produced this step. Any error leaves the
    /// loop unrecoverable for the caller; `AbortRequested` alone guarantees
    /// the pressed set was drained first.
    pub fn step(&mut self, dt: f32) -> Result<Vec<ActionEvent>, MappingError> {
        let sample = self.poller.poll(self.controller_id)?;
        self.state.advance(sample);

        let mut events = Vec::new();
        for index in 0..self.triggers.len() {
            let trigger = &self.triggers[index];
            let channel = self.descriptor.resolve(&trigger.input)?;
            let value = sample_channel(&self.descriptor, &self.state, &channel)?;
            Self::apply(
                trigger,
                &value,
                dt,
                &mut self.pressed,
                &mut self.dispatcher,
                &mut events,
            )?;
        }
        Ok(events)
    }

    /// Releases every held response, for shutdown paths outside abort
    pub fn release_all(&mut self) -> Result<Vec<ActionEvent>, MappingError> {
        let mut events = Vec::new();
        Self::release_all_inner(&mut self.pressed, &mut self.dispatcher, &mut events)?;
        Ok(events)
    }

    fn validate_trigger(
        descriptor: &ControllerDescriptor,
        trigger: &Trigger,
    ) -> Result<(), MappingError> {
        if trigger.kind == TriggerKind::Repeat {
            return Err(MappingError::NotSupported(format!(
                "repeat trigger on {:?}",
                trigger.input
            )));
        }

        let channel = descriptor.resolve(&trigger.input)?;
        match (&channel, trigger.kind) {
            (Channel::Vector(vector), TriggerKind::Move) => {
                let spec = descriptor
                    .vectors
                    .get(vector)
                    .ok_or_else(|| ControllerError::UnresolvedIdentifier(vector.clone()))?;
                let (x, y) = &trigger.options.components;
                for component in [x, y] {
                    if !spec.components.contains_key(component) {
                        return Err(MappingError::Config(format!(
                            "vector {vector:?} has no component {component:?}"
                        )));
                    }
                }
                Ok(())
            }
            (_, TriggerKind::Move) => Err(ControllerError::TypeMismatch {
                identifier: trigger.input.clone(),
                expected: "vector",
                actual: channel.kind(),
            }
            .into()),
            (Channel::Button(_), _) => Ok(()),
            (Channel::Axis(_), _) => {
                Self::required_threshold(trigger)?;
                Ok(())
            }
            (Channel::Vector(vector), _) => {
                let threshold = Self::required_threshold(trigger)?;
                let component = threshold.component.as_ref().ok_or_else(|| {
                    MappingError::Config(format!(
                        "{} trigger on vector {:?} needs a [component, min, max] threshold",
                        trigger.kind, trigger.input
                    ))
                })?;
                let spec = descriptor
                    .vectors
                    .get(vector)
                    .ok_or_else(|| ControllerError::UnresolvedIdentifier(vector.clone()))?;
                if !spec.components.contains_key(component) {
                    return Err(MappingError::Config(format!(
                        "vector {vector:?} has no component {component:?}"
                    )));
                }
                Ok(())
            }
        }
    }

    fn apply(
        trigger: &Trigger,
        value: &SampledInput,
        dt: f32,
        pressed: &mut HashSet<String>,
        dispatcher: &mut ActionDispatcher,
        events: &mut Vec<ActionEvent>,
    ) -> Result<(), MappingError> {
        match trigger.kind {
            TriggerKind::Move => return Self::apply_move(trigger, value, dt, dispatcher, events),
            TriggerKind::Repeat => {
                return Err(MappingError::NotSupported(format!(
                    "repeat trigger on {:?}",
                    trigger.input
                )))
            }
            _ => {}
        }

        let (was_active, is_active) = Self::activation(trigger, value)?;
        match trigger.kind {
            TriggerKind::Hold => {
                if !was_active && is_active {
                    Self::press_response(pressed, dispatcher, trigger, events)?;
                } else if was_active && !is_active {
                    Self::release_response(
                        pressed,
                        dispatcher,
                        &trigger.response,
                        &trigger.options,
                        events,
                    )?;
                }
            }
            TriggerKind::Press => {
                if !was_active && is_active {
                    Self::press_response(pressed, dispatcher, trigger, events)?;
                    Self::release_response(
                        pressed,
                        dispatcher,
                        &trigger.response,
                        &trigger.options,
                        events,
                    )?;
                }
            }
            TriggerKind::Release => {
                if was_active && !is_active {
                    Self::press_response(pressed, dispatcher, trigger, events)?;
                    Self::release_response(
                        pressed,
                        dispatcher,
                        &trigger.response,
                        &trigger.options,
                        events,
                    )?;
                }
            }
            TriggerKind::Toggle => {
                if !was_active && is_active {
                    if pressed.contains(&trigger.response) {
                        Self::release_response(
                            pressed,
                            dispatcher,
                            &trigger.response,
                            &trigger.options,
                            events,
                        )?;
                    } else {
                        Self::press_response(pressed, dispatcher, trigger, events)?;
                    }
                }
            }
            TriggerKind::Move | TriggerKind::Repeat => {}
        }
        Ok(())
    }

    /// Boolean-izes a sampled value for the edge-triggered types
    fn activation(trigger: &Trigger, value: &SampledInput) -> Result<(bool, bool), MappingError> {
        match value {
            SampledInput::Button { previous, current } => Ok((*previous, *current)),
            SampledInput::Axis { previous, current } => {
                let threshold = Self::required_threshold(trigger)?;
                Ok((threshold.contains(*previous), threshold.contains(*current)))
            }
            SampledInput::Vector { previous, current } => {
                let threshold = Self::required_threshold(trigger)?;
                let component = threshold.component.as_deref().ok_or_else(|| {
                    MappingError::Config(format!(
                        "{} trigger on vector {:?} needs a [component, min, max] threshold",
                        trigger.kind, trigger.input
                    ))
                })?;
                let was = Self::component_value(trigger, previous, component)?;
                let is = Self::component_value(trigger, current, component)?;
                Ok((threshold.contains(was), threshold.contains(is)))
            }
        }
    }

    fn component_value(
        trigger: &Trigger,
        components: &std::collections::HashMap<String, f32>,
        component: &str,
    ) -> Result<f32, MappingError> {
        components.get(component).copied().ok_or_else(|| {
            MappingError::Config(format!(
                "vector {:?} has no component {component:?}",
                trigger.input
            ))
        })
    }

    fn required_threshold(trigger: &Trigger) -> Result<&Threshold, MappingError> {
        trigger.options.threshold.as_ref().ok_or_else(|| {
            MappingError::Config(format!(
                "{} trigger on {:?} needs a threshold",
                trigger.kind, trigger.input
            ))
        })
    }

    /// Continuous relative mouse movement from the current vector value
    fn apply_move(
        trigger: &Trigger,
        value: &SampledInput,
        dt: f32,
        dispatcher: &mut ActionDispatcher,
        events: &mut Vec<ActionEvent>,
    ) -> Result<(), MappingError> {
        let SampledInput::Vector { current, .. } = value else {
            return Err(ControllerError::TypeMismatch {
                identifier: trigger.input.clone(),
                expected: "vector",
                actual: value.kind(),
            }
            .into());
        };

        let (x_name, y_name) = &trigger.options.components;
        let x = Self::component_value(trigger, current, x_name)?;
        let y = Self::component_value(trigger, current, y_name)?;

        let exp = trigger.options.exp;
        let curved_x = x.abs().powf(exp).copysign(x);
        let curved_y = y.abs().powf(exp).copysign(y);

        // Rescale so the dominant axis carries the true 2D magnitude;
        // independent per-axis curving would foreshorten diagonals. Skipped
        // when either raw component is exactly zero (guards the division).
        let rescale = if x != 0.0 && y != 0.0 {
            (x * x + y * y).sqrt() / curved_x.abs().max(curved_y.abs())
        } else {
            1.0
        };

        let dx = curved_x * rescale * trigger.options.speed.0 * dt;
        let dy = curved_y * rescale * trigger.options.speed.1 * dt;
        if dx != 0.0 || dy != 0.0 {
            dispatcher.move_mouse(dx, dy)?;
            if trigger.options.debug {
                events.push(ActionEvent::moved(&trigger.response, dx, dy));
            }
        }
        Ok(())
    }

    /// Idempotent press; the abort response cancels instead of dispatching
    fn press_response(
        pressed: &mut HashSet<String>,
        dispatcher: &mut ActionDispatcher,
        trigger: &Trigger,
        events: &mut Vec<ActionEvent>,
    ) -> Result<(), MappingError> {
        if trigger.response == ABORT_RESPONSE {
            info!(
                "Abort requested by {:?}, releasing {} held responses",
                trigger.input,
                pressed.len()
            );
            Self::release_all_inner(pressed, dispatcher, events)?;
            return Err(MappingError::AbortRequested);
        }
        if pressed.insert(trigger.response.clone()) {
            dispatcher.press(&trigger.response, &trigger.options)?;
            events.push(ActionEvent::pressed(&trigger.response));
        }
        Ok(())
    }

    /// Releases one response if held; releasing abort is a no-op
    fn release_response(
        pressed: &mut HashSet<String>,
        dispatcher: &mut ActionDispatcher,
        response: &str,
        options: &TriggerOptions,
        events: &mut Vec<ActionEvent>,
    ) -> Result<(), MappingError> {
        if response == ABORT_RESPONSE {
            return Ok(());
        }
        if pressed.remove(response) {
            dispatcher.release(response, options)?;
            events.push(ActionEvent::released(response));
        }
        Ok(())
    }

    fn release_all_inner(
        pressed: &mut HashSet<String>,
        dispatcher: &mut ActionDispatcher,
        events: &mut Vec<ActionEvent>,
    ) -> Result<(), MappingError> {
        // Iterate a snapshot, the live set shrinks as responses release
        let held: Vec<String> = pressed.iter().cloned().collect();
        let options = TriggerOptions::default();
        for response in held {
            Self::release_response(pressed, dispatcher, &response, &options, events)?;
        }
        Ok(())
    }
}
