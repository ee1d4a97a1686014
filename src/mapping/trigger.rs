//! Trigger configuration: the closed trigger-type enum and the eager parse
//! from profile JSON into normalized [`Trigger`] records.
//!
//! Profiles may write a trigger either as the shorthand string
//! `"<response> on <type>"` or as a structured record with per-type options.
//! Both shapes collapse into one `Trigger` at load time; nothing downstream
//! re-interprets configuration shape.

use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::error::MappingError;

/// The closed set of trigger types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerKind {
    /// Output follows the input: press on rising edge, release on falling
    Hold,
    /// Single press/release pulse on the rising edge
    Press,
    /// Single press/release pulse on the falling edge
    Release,
    /// Each rising edge flips the response between held and released
    Toggle,
    /// Continuous relative mouse movement from a vector input
    Move,
    /// Parsed for compatibility, rejected at bind time
    Repeat,
}

impl TriggerKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "hold" => Some(TriggerKind::Hold),
            "press" => Some(TriggerKind::Press),
            "release" => Some(TriggerKind::Release),
            "toggle" => Some(TriggerKind::Toggle),
            "move" => Some(TriggerKind::Move),
            "repeat" => Some(TriggerKind::Repeat),
            _ => None,
        }
    }
}

impl Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TriggerKind::Hold => write!(f, "hold"),
            TriggerKind::Press => write!(f, "press"),
            TriggerKind::Release => write!(f, "release"),
            TriggerKind::Toggle => write!(f, "toggle"),
            TriggerKind::Move => write!(f, "move"),
            TriggerKind::Repeat => write!(f, "repeat"),
        }
    }
}

/// Activation band for axis and vector inputs
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    /// Vector component the band applies to; `None` for plain axes
    pub component: Option<String>,
    pub min: f32,
    pub max: f32,
}

impl Threshold {
    pub fn contains(&self, value: f32) -> bool {
        self.min <= value && value <= self.max
    }
}

/// Normalized per-trigger options with defaults applied
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOptions {
    pub threshold: Option<Threshold>,

    /// Scroll amount in wheel clicks
    pub amount: f32,

    /// Per-axis mouse speed for Move triggers
    pub speed: (f32, f32),

    /// Sensitivity exponent for Move triggers
    pub exp: f32,

    /// Vector component names a Move trigger reads as (x, y)
    pub components: (String, String),

    /// Report Move deltas on the observer channel
    pub debug: bool,
}

impl Default for TriggerOptions {
    fn default() -> Self {
        Self {
            threshold: None,
            amount: 1.0,
            speed: (1.0, 1.0),
            exp: 1.0,
            components: ("x".to_string(), "y".to_string()),
            debug: false,
        }
    }
}

/// One normalized trigger rule, immutable after profile load
#[derive(Debug, Clone, PartialEq)]
pub struct Trigger {
    /// Symbolic input identifier, resolved through the descriptor
    pub input: String,
    pub kind: TriggerKind,
    /// Logical response name handed to the action dispatcher
    pub response: String,
    pub options: TriggerOptions,
}

/// Threshold as written in profile JSON
///
/// `[min, max]` for axes, `["component", min, max]` for vectors.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThresholdSpec {
    Range([f32; 2]),
    ComponentRange((String, f32, f32)),
}

/// Speed as written in profile JSON: one value for both axes or `[x, y]`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SpeedSpec {
    Uniform(f32),
    PerAxis([f32; 2]),
}

/// Structured trigger record from profile JSON
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerRecord {
    pub response: String,
    pub on: TriggerKind,
    #[serde(default)]
    pub threshold: Option<ThresholdSpec>,
    #[serde(default)]
    pub amount: Option<f32>,
    #[serde(default)]
    pub speed: Option<SpeedSpec>,
    #[serde(default)]
    pub exp: Option<f32>,
    #[serde(default)]
    pub components: Option<(String, String)>,
    #[serde(default)]
    pub debug: bool,
}

/// The two accepted trigger shapes
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RawTrigger {
    Shorthand(String),
    Record(TriggerRecord),
}

/// A mapping entry may carry one trigger or a list
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TriggerEntries {
    One(RawTrigger),
    Many(Vec<RawTrigger>),
}

impl TriggerEntries {
    pub fn into_vec(self) -> Vec<RawTrigger> {
        match self {
            TriggerEntries::One(raw) => vec![raw],
            TriggerEntries::Many(list) => list,
        }
    }
}

/// One profile as loaded from JSON
///
/// Mappings stay in declaration order (side-effect order within a step).
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    /// Controller type name, looked up in the descriptor table
    pub controller: String,
    /// Controller id handed to the device poll collaborator
    pub id: u32,
    pub mappings: serde_json::Map<String, serde_json::Value>,
}

impl Trigger {
    /// Normalizes one raw config entry
    pub fn from_raw(input: &str, raw: RawTrigger) -> Result<Self, MappingError> {
        match raw {
            RawTrigger::Shorthand(text) => {
                let (response, kind_name) = text.rsplit_once(" on ").ok_or_else(|| {
                    MappingError::Config(format!(
                        "trigger {text:?} for {input:?} is not of the form \"<response> on <type>\""
                    ))
                })?;
                let kind = TriggerKind::parse(kind_name).ok_or_else(|| {
                    MappingError::Config(format!("unknown trigger type {kind_name:?} for {input:?}"))
                })?;
                Ok(Trigger {
                    input: input.to_string(),
                    kind,
                    response: response.to_string(),
                    options: TriggerOptions::default(),
                })
            }
            RawTrigger::Record(record) => {
                let defaults = TriggerOptions::default();
                let threshold = record.threshold.map(|spec| match spec {
                    ThresholdSpec::Range([min, max]) => Threshold {
                        component: None,
                        min,
                        max,
                    },
                    ThresholdSpec::ComponentRange((component, min, max)) => Threshold {
                        component: Some(component),
                        min,
                        max,
                    },
                });
                let speed = match record.speed {
                    Some(SpeedSpec::Uniform(v)) => (v, v),
                    Some(SpeedSpec::PerAxis([x, y])) => (x, y),
                    None => defaults.speed,
                };
                Ok(Trigger {
                    input: input.to_string(),
                    kind: record.on,
                    response: record.response,
                    options: TriggerOptions {
                        threshold,
                        amount: record.amount.unwrap_or(defaults.amount),
                        speed,
                        exp: record.exp.unwrap_or(defaults.exp),
                        components: record.components.unwrap_or(defaults.components),
                        debug: record.debug,
                    },
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_entry(json: serde_json::Value) -> Vec<Trigger> {
        let entries: TriggerEntries = serde_json::from_value(json).unwrap();
        entries
            .into_vec()
            .into_iter()
            .map(|raw| Trigger::from_raw("left stick", raw).unwrap())
            .collect()
    }

    #[test]
    fn shorthand_parses_response_and_kind() {
        let triggers = parse_entry(serde_json::json!("w on hold"));
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].response, "w");
        assert_eq!(triggers[0].kind, TriggerKind::Hold);
        assert_eq!(triggers[0].options, TriggerOptions::default());
    }

    #[test]
    fn shorthand_response_may_contain_spaces() {
        let triggers = parse_entry(serde_json::json!("left click on press"));
        assert_eq!(triggers[0].response, "left click");
        assert_eq!(triggers[0].kind, TriggerKind::Press);
    }

    #[test]
    fn record_with_component_threshold() {
        let triggers = parse_entry(serde_json::json!({
            "response": "w",
            "on": "toggle",
            "threshold": ["y", 0.5, 1.0]
        }));
        let threshold = triggers[0].options.threshold.clone().unwrap();
        assert_eq!(threshold.component.as_deref(), Some("y"));
        assert!(threshold.contains(0.75));
        assert!(!threshold.contains(0.25));
    }

    #[test]
    fn record_with_move_options() {
        let triggers = parse_entry(serde_json::json!({
            "response": "mouse",
            "on": "move",
            "speed": [900.0, 700.0],
            "exp": 2.0,
            "debug": true
        }));
        assert_eq!(triggers[0].kind, TriggerKind::Move);
        assert_eq!(triggers[0].options.speed, (900.0, 700.0));
        assert_eq!(triggers[0].options.exp, 2.0);
        assert!(triggers[0].options.debug);
    }

    #[test]
    fn list_entries_stay_in_order() {
        let triggers = parse_entry(serde_json::json!([
            "w on hold",
            { "response": "shift", "on": "toggle", "threshold": [0.9, 1.0] }
        ]));
        assert_eq!(triggers.len(), 2);
        assert_eq!(triggers[0].kind, TriggerKind::Hold);
        assert_eq!(triggers[1].kind, TriggerKind::Toggle);
    }

    #[test]
    fn unknown_trigger_type_is_a_config_error() {
        let entries: TriggerEntries = serde_json::from_value(serde_json::json!("w on flick")).unwrap();
        let raw = entries.into_vec().remove(0);
        assert!(matches!(
            Trigger::from_raw("a", raw),
            Err(MappingError::Config(_))
        ));
    }

    #[test]
    fn repeat_still_parses() {
        // Bind-time rejection is the profile's job; the parser accepts it.
        let triggers = parse_entry(serde_json::json!("w on repeat"));
        assert_eq!(triggers[0].kind, TriggerKind::Repeat);
    }
}
