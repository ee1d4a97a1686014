//! gilrs-backed implementation of the device polling collaborator.
//!
//! Binds a descriptor's symbolic button/axis names to gilrs codes once at
//! construction, then snapshots the gamepad's cached state on every poll.

use gilrs::{Axis, Button, Gilrs};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use super::descriptor::ControllerDescriptor;
use super::state::{ControllerSample, DevicePoll};
use super::ControllerError;

/// Where one descriptor axis reads from
#[derive(Debug, Clone, Copy)]
enum AxisSource {
    /// Analog stick axis, gilrs range [-1, 1]
    Stick(Axis),

    /// Analog trigger exposed as button pressure, gilrs range [0, 1]
    Pressure(Button),
}

/// Polls a connected gamepad through gilrs
pub struct GilrsPoller {
    gilrs: Gilrs,

    /// Descriptor button index to gilrs code; `None` for unmapped names
    buttons: Vec<Option<Button>>,

    /// Descriptor axis name, source, and raw-unit scale
    axes: Vec<(String, AxisSource, f32)>,
}

impl GilrsPoller {
    /// Binds the descriptor's names to gilrs codes
    pub fn new(descriptor: &ControllerDescriptor) -> Result<Self, ControllerError> {
        info!("Initializing gilrs controller interface");
        let gilrs = Gilrs::new().map_err(|e| ControllerError::Device(e.to_string()))?;

        let connected = gilrs.gamepads().count();
        if connected == 0 {
            warn!("No gamepad connected, polls will fail until one appears");
        }
        for (id, gamepad) in gilrs.gamepads() {
            info!("Found gamepad {}: {}", id, gamepad.name());
        }

        let buttons = descriptor
            .buttons
            .iter()
            .map(|name| {
                let code = button_code(name);
                if code.is_none() {
                    warn!("Button {:?} has no gilrs equivalent, it will read released", name);
                }
                code
            })
            .collect();

        let mut axes = Vec::new();
        for (name, spec) in &descriptor.axes {
            match axis_source(name) {
                Some(source) => axes.push((name.clone(), source, spec.max as f32)),
                None => warn!("Axis {:?} has no gilrs equivalent, it will read 0", name),
            }
        }

        debug!("Bound {} buttons and {} axes to gilrs", descriptor.buttons.len(), axes.len());
        Ok(Self { gilrs, buttons, axes })
    }
}

impl DevicePoll for GilrsPoller {
    fn poll(&mut self, controller_id: u32) -> Result<ControllerSample, ControllerError> {
        // Drain pending events so the cached gamepad state is current.
        while self.gilrs.next_event().is_some() {}

        let (_, gamepad) = self
            .gilrs
            .gamepads()
            .nth(controller_id as usize)
            .ok_or(ControllerError::DeviceNotConnected(controller_id))?;

        let buttons = self
            .buttons
            .iter()
            .map(|code| code.map(|c| gamepad.is_pressed(c)).unwrap_or(false))
            .collect();

        let mut axes = HashMap::new();
        for (name, source, scale) in &self.axes {
            let value = match source {
                AxisSource::Stick(axis) => gamepad.value(*axis),
                AxisSource::Pressure(button) => gamepad
                    .button_data(*button)
                    .map(|data| data.value())
                    .unwrap_or(0.0),
            };
            axes.insert(name.clone(), (value * scale) as i32);
        }

        Ok(ControllerSample { buttons, axes })
    }
}

fn button_code(name: &str) -> Option<Button> {
    match name {
        "a" => Some(Button::South),
        "b" => Some(Button::East),
        "x" => Some(Button::West),
        "y" => Some(Button::North),
        "start" => Some(Button::Start),
        "back" | "select" => Some(Button::Select),
        "guide" => Some(Button::Mode),
        "left thumb" => Some(Button::LeftThumb),
        "right thumb" => Some(Button::RightThumb),
        "left bumper" => Some(Button::LeftTrigger),
        "right bumper" => Some(Button::RightTrigger),
        "dpad up" => Some(Button::DPadUp),
        "dpad down" => Some(Button::DPadDown),
        "dpad left" => Some(Button::DPadLeft),
        "dpad right" => Some(Button::DPadRight),
        _ => None,
    }
}

fn axis_source(name: &str) -> Option<AxisSource> {
    match name {
        "l_thumb_x" => Some(AxisSource::Stick(Axis::LeftStickX)),
        "l_thumb_y" => Some(AxisSource::Stick(Axis::LeftStickY)),
        "r_thumb_x" => Some(AxisSource::Stick(Axis::RightStickX)),
        "r_thumb_y" => Some(AxisSource::Stick(Axis::RightStickY)),
        "left_trigger" => Some(AxisSource::Pressure(Button::LeftTrigger2)),
        "right_trigger" => Some(AxisSource::Pressure(Button::RightTrigger2)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xinput_button_names_have_gilrs_codes() {
        assert_eq!(button_code("a"), Some(Button::South));
        assert_eq!(button_code("y"), Some(Button::North));
        assert_eq!(button_code("left bumper"), Some(Button::LeftTrigger));
        assert_eq!(button_code("unused"), None);
    }

    #[test]
    fn triggers_read_button_pressure() {
        assert!(matches!(
            axis_source("left_trigger"),
            Some(AxisSource::Pressure(Button::LeftTrigger2))
        ));
        assert!(matches!(
            axis_source("r_thumb_y"),
            Some(AxisSource::Stick(Axis::RightStickY))
        ));
    }
}
