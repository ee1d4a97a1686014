//! Turns a resolved channel plus the previous/current sample pair into
//! normalized values.
//!
//! Axis normalization removes the configured deadzone from the raw domain,
//! remaps linearly to [0, 1], then applies scale/shift. Vector normalization
//! is radial: the deadzone acts on the Euclidean magnitude of the
//! already-normalized components, preserving direction and giving a smooth
//! entry at the deadzone boundary.

use std::collections::HashMap;

use super::descriptor::{AxisSpec, Channel, ControllerDescriptor, VectorNormalize};
use super::state::ControllerRuntimeState;
use super::ControllerError;

/// Normalized previous/current values for one resolved channel
#[derive(Debug, Clone, PartialEq)]
pub enum SampledInput {
    Button {
        previous: bool,
        current: bool,
    },
    Axis {
        previous: f32,
        current: f32,
    },
    Vector {
        previous: HashMap<String, f32>,
        current: HashMap<String, f32>,
    },
}

impl SampledInput {
    pub fn kind(&self) -> &'static str {
        match self {
            SampledInput::Button { .. } => "button",
            SampledInput::Axis { .. } => "axis",
            SampledInput::Vector { .. } => "vector",
        }
    }
}

/// Reads a channel from both samples and normalizes it
pub fn sample_channel(
    descriptor: &ControllerDescriptor,
    state: &ControllerRuntimeState,
    channel: &Channel,
) -> Result<SampledInput, ControllerError> {
    match channel {
        Channel::Button(index) => Ok(SampledInput::Button {
            previous: state.previous().button(*index),
            current: state.current().button(*index),
        }),
        Channel::Axis(name) => {
            let spec = descriptor
                .axes
                .get(name)
                .ok_or_else(|| ControllerError::UnresolvedIdentifier(name.clone()))?;
            Ok(SampledInput::Axis {
                previous: normalize_axis(state.previous().axis(name), spec),
                current: normalize_axis(state.current().axis(name), spec),
            })
        }
        Channel::Vector(name) => {
            let spec = descriptor
                .vectors
                .get(name)
                .ok_or_else(|| ControllerError::UnresolvedIdentifier(name.clone()))?;

            let mut previous = HashMap::new();
            let mut current = HashMap::new();
            for (component, reference) in &spec.components {
                let axis = match descriptor.resolve(reference)? {
                    Channel::Axis(axis) => axis,
                    other => {
                        return Err(ControllerError::TypeMismatch {
                            identifier: reference.clone(),
                            expected: "axis",
                            actual: other.kind(),
                        })
                    }
                };
                let axis_spec = descriptor
                    .axes
                    .get(&axis)
                    .ok_or_else(|| ControllerError::UnresolvedIdentifier(axis.clone()))?;
                previous.insert(
                    component.clone(),
                    normalize_axis(state.previous().axis(&axis), axis_spec),
                );
                current.insert(
                    component.clone(),
                    normalize_axis(state.current().axis(&axis), axis_spec),
                );
            }

            Ok(SampledInput::Vector {
                previous: normalize_vector(&previous, &spec.normalize),
                current: normalize_vector(&current, &spec.normalize),
            })
        }
    }
}

/// Normalizes one raw axis reading
///
/// A reading inside the deadzone is exactly zero; scale/shift do not apply to
/// it. Outside, the value and the corresponding bounds shrink toward zero by
/// the deadzone before the linear [0, 1] remap.
pub fn normalize_axis(raw: i32, spec: &AxisSpec) -> f32 {
    let mut value = raw as f32;
    let mut min = spec.min as f32;
    let mut max = spec.max as f32;

    if let Some(deadzone) = spec.deadzone {
        let deadzone = deadzone as f32;
        if value.abs() <= deadzone {
            return 0.0;
        }
        if value > 0.0 {
            value -= deadzone;
        } else {
            value += deadzone;
        }
        // Symmetric shrink for zero-spanning ranges, one-sided otherwise
        if min < 0.0 && max > 0.0 {
            min += deadzone;
            max -= deadzone;
        } else if min >= 0.0 {
            max -= deadzone;
        } else {
            min += deadzone;
        }
    }

    let value = (value - min) / (max - min);
    value * spec.scale + spec.shift
}

/// Applies a magnitude-preserving radial deadzone across a component set
pub fn normalize_vector(
    components: &HashMap<String, f32>,
    normalize: &VectorNormalize,
) -> HashMap<String, f32> {
    let magnitude = components
        .values()
        .map(|v| v * v)
        .sum::<f32>()
        .sqrt();

    if magnitude <= normalize.deadzone {
        return components.keys().map(|k| (k.clone(), 0.0)).collect();
    }

    let rescale = (magnitude - normalize.deadzone) / (1.0 - normalize.deadzone);
    components
        .iter()
        .map(|(k, v)| {
            let scaled = v * normalize.scale + normalize.shift;
            (k.clone(), scaled / magnitude * rescale)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis(min: i32, max: i32, deadzone: Option<i32>) -> AxisSpec {
        AxisSpec {
            min,
            max,
            deadzone,
            scale: 1.0,
            shift: 0.0,
        }
    }

    #[test]
    fn bounds_map_to_unit_interval_without_deadzone() {
        let spec = axis(-32768, 32767, None);
        assert_eq!(normalize_axis(-32768, &spec), 0.0);
        assert_eq!(normalize_axis(32767, &spec), 1.0);
        let mid = normalize_axis(0, &spec);
        assert!((mid - 0.5).abs() < 1e-4);
    }

    #[test]
    fn readings_inside_deadzone_are_zero() {
        let spec = axis(-32768, 32767, Some(6000));
        assert_eq!(normalize_axis(0, &spec), 0.0);
        assert_eq!(normalize_axis(5999, &spec), 0.0);
        assert_eq!(normalize_axis(-6000, &spec), 0.0);
    }

    #[test]
    fn deadzone_shrinks_bounds_symmetrically() {
        let spec = axis(-32768, 32767, Some(6000));
        assert!((normalize_axis(32767, &spec) - 1.0).abs() < 1e-4);
        assert!(normalize_axis(-32768, &spec).abs() < 1e-4);
    }

    #[test]
    fn one_sided_range_shrinks_only_the_far_bound() {
        // Trigger-style [0, 255] axis
        let spec = axis(0, 255, Some(30));
        assert_eq!(normalize_axis(10, &spec), 0.0);
        assert!((normalize_axis(255, &spec) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn scale_and_shift_apply_after_remap() {
        let spec = AxisSpec {
            min: -32768,
            max: 32767,
            deadzone: None,
            scale: 2.0,
            shift: -1.0,
        };
        // [0, 1] remapped into [-1, 1]
        assert!((normalize_axis(32767, &spec) - 1.0).abs() < 1e-4);
        assert!((normalize_axis(-32768, &spec) + 1.0).abs() < 1e-4);
    }

    fn vector_of(x: f32, y: f32) -> HashMap<String, f32> {
        HashMap::from([("x".to_string(), x), ("y".to_string(), y)])
    }

    #[test]
    fn radial_deadzone_zeroes_small_magnitudes() {
        let normalize = VectorNormalize {
            deadzone: 0.25,
            scale: 1.0,
            shift: 0.0,
        };
        // Each component is above a naive per-axis cut, but the magnitude
        // (~0.21) is inside the radius.
        let out = normalize_vector(&vector_of(0.15, 0.15), &normalize);
        assert_eq!(out["x"], 0.0);
        assert_eq!(out["y"], 0.0);
    }

    #[test]
    fn radial_deadzone_is_continuous_at_the_boundary() {
        let normalize = VectorNormalize {
            deadzone: 0.25,
            scale: 1.0,
            shift: 0.0,
        };
        let just_outside = 0.2501_f32;
        let out = normalize_vector(&vector_of(just_outside, 0.0), &normalize);
        let magnitude = (out["x"] * out["x"] + out["y"] * out["y"]).sqrt();
        assert!(magnitude < 1e-3, "magnitude jumped to {magnitude}");
    }

    #[test]
    fn radial_deadzone_preserves_direction() {
        let normalize = VectorNormalize {
            deadzone: 0.2,
            scale: 1.0,
            shift: 0.0,
        };
        let out = normalize_vector(&vector_of(0.6, 0.6), &normalize);
        assert!((out["x"] - out["y"]).abs() < 1e-6);
        assert!(out["x"] > 0.0);
    }

    #[test]
    fn full_deflection_stays_at_unit_magnitude() {
        let normalize = VectorNormalize {
            deadzone: 0.2,
            scale: 1.0,
            shift: 0.0,
        };
        let out = normalize_vector(&vector_of(1.0, 0.0), &normalize);
        assert!((out["x"] - 1.0).abs() < 1e-4);
        assert_eq!(out["y"], 0.0);
    }
}
