//! Static controller descriptors and symbolic input resolution.
//!
//! A descriptor is the schema for one controller type: the ordered button
//! names (index = bit position in the hardware mask), axis specs with their
//! normalization parameters, vectors composed of axes, and a nested
//! "compound" alias tree for human-friendly names such as `"left stick"`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::ControllerError;

/// Aliases may chain through the compound tree; anything deeper is a cycle.
const MAX_ALIAS_DEPTH: u32 = 8;

fn default_scale() -> f32 {
    1.0
}

/// Normalization parameters for a single raw axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    pub min: i32,
    pub max: i32,

    /// Raw-domain neighborhood around zero treated as rest
    #[serde(default)]
    pub deadzone: Option<i32>,

    /// Applied after the [0, 1] remap
    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default)]
    pub shift: f32,
}

/// Radial normalization applied across a whole vector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorNormalize {
    /// Magnitude deadzone in normalized units
    #[serde(default)]
    pub deadzone: f32,

    #[serde(default = "default_scale")]
    pub scale: f32,

    #[serde(default)]
    pub shift: f32,
}

impl Default for VectorNormalize {
    fn default() -> Self {
        Self {
            deadzone: 0.0,
            scale: 1.0,
            shift: 0.0,
        }
    }
}

/// A named vector built from axis components
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSpec {
    /// Component name (e.g. "x") to axis or compound identifier
    pub components: HashMap<String, String>,

    #[serde(default)]
    pub normalize: VectorNormalize,
}

/// One node of the compound alias tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CompoundNode {
    /// Leaf: a button, axis, vector, or further alias name
    Name(String),

    /// Inner node keyed by the next identifier token
    Tree(HashMap<String, CompoundNode>),
}

/// A resolved physical input source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    /// Index into the descriptor's button order
    Button(usize),
    Axis(String),
    Vector(String),
}

impl Channel {
    pub fn kind(&self) -> &'static str {
        match self {
            Channel::Button(_) => "button",
            Channel::Axis(_) => "axis",
            Channel::Vector(_) => "vector",
        }
    }
}

/// Immutable schema describing one controller type
///
/// Shared read-only across every profile bound to this controller type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerDescriptor {
    /// Button names in bit order; index = bit position in the raw mask
    #[serde(default)]
    pub buttons: Vec<String>,

    #[serde(default)]
    pub axes: HashMap<String, AxisSpec>,

    #[serde(default)]
    pub vectors: HashMap<String, VectorSpec>,

    #[serde(default)]
    pub compound: HashMap<String, CompoundNode>,
}

impl ControllerDescriptor {
    /// Resolves a symbolic identifier to a concrete channel
    ///
    /// Direct button/axis/vector names win; otherwise the identifier is split
    /// on spaces and walked token by token through the compound tree, and the
    /// reached leaf is resolved again from the top.
    pub fn resolve(&self, identifier: &str) -> Result<Channel, ControllerError> {
        self.resolve_depth(identifier, 0)
            .ok_or_else(|| ControllerError::UnresolvedIdentifier(identifier.to_string()))
    }

    fn resolve_depth(&self, identifier: &str, depth: u32) -> Option<Channel> {
        if depth > MAX_ALIAS_DEPTH {
            debug!("alias chain too deep while resolving {:?}", identifier);
            return None;
        }
        if let Some(channel) = self.resolve_direct(identifier) {
            return Some(channel);
        }

        // Walk the compound tree with an index cursor over the tokens; the
        // token list itself stays untouched.
        let tokens: Vec<&str> = identifier.split(' ').collect();
        let mut node = &self.compound;
        let mut pos = 0;
        while pos < tokens.len() {
            match node.get(tokens[pos]) {
                Some(CompoundNode::Tree(inner)) => {
                    node = inner;
                    pos += 1;
                }
                Some(CompoundNode::Name(leaf)) => {
                    return self.resolve_depth(leaf, depth + 1);
                }
                None => return None,
            }
        }
        // Ran out of tokens inside an inner node
        None
    }

    fn resolve_direct(&self, identifier: &str) -> Option<Channel> {
        if let Some(index) = self.buttons.iter().position(|name| name == identifier) {
            return Some(Channel::Button(index));
        }
        if self.axes.contains_key(identifier) {
            return Some(Channel::Axis(identifier.to_string()));
        }
        if self.vectors.contains_key(identifier) {
            return Some(Channel::Vector(identifier.to_string()));
        }
        None
    }

    /// Checks the descriptor invariants after deserialization
    ///
    /// Every compound leaf must resolve transitively to a button, axis, or
    /// vector, and every vector component must ultimately name an axis.
    pub fn validate(&self) -> Result<(), ControllerError> {
        let mut leaves = Vec::new();
        collect_leaves(&self.compound, &mut leaves);
        for leaf in leaves {
            self.resolve(leaf)?;
        }

        for (name, vector) in &self.vectors {
            for reference in vector.components.values() {
                match self.resolve(reference)? {
                    Channel::Axis(_) => {}
                    other => {
                        return Err(ControllerError::TypeMismatch {
                            identifier: format!("{reference} (component of {name})"),
                            expected: "axis",
                            actual: other.kind(),
                        })
                    }
                }
            }
        }
        Ok(())
    }
}

fn collect_leaves<'a>(tree: &'a HashMap<String, CompoundNode>, out: &mut Vec<&'a str>) {
    for node in tree.values() {
        match node {
            CompoundNode::Name(leaf) => out.push(leaf),
            CompoundNode::Tree(inner) => collect_leaves(inner, out),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> ControllerDescriptor {
        serde_json::from_str(
            r#"{
                "buttons": ["a", "b"],
                "axes": {
                    "l_thumb_x": { "min": -32768, "max": 32767 },
                    "l_thumb_y": { "min": -32768, "max": 32767 }
                },
                "vectors": {
                    "left_stick": {
                        "components": { "x": "l_thumb_x", "y": "l_thumb_y" },
                        "normalize": { "deadzone": 0.2 }
                    }
                },
                "compound": {
                    "left": {
                        "stick": "left_stick",
                        "thumb": { "x": "l_thumb_x" }
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn direct_names_resolve_first() {
        let d = descriptor();
        assert_eq!(d.resolve("a").unwrap(), Channel::Button(0));
        assert_eq!(d.resolve("b").unwrap(), Channel::Button(1));
        assert_eq!(
            d.resolve("l_thumb_x").unwrap(),
            Channel::Axis("l_thumb_x".into())
        );
        assert_eq!(
            d.resolve("left_stick").unwrap(),
            Channel::Vector("left_stick".into())
        );
    }

    #[test]
    fn compound_walk_matches_direct_resolution() {
        let d = descriptor();
        assert_eq!(d.resolve("left stick").unwrap(), d.resolve("left_stick").unwrap());
        assert_eq!(
            d.resolve("left thumb x").unwrap(),
            d.resolve("l_thumb_x").unwrap()
        );
    }

    #[test]
    fn partial_compound_path_fails() {
        let d = descriptor();
        // "left" alone stops inside an inner node
        assert!(matches!(
            d.resolve("left"),
            Err(ControllerError::UnresolvedIdentifier(_))
        ));
        assert!(matches!(
            d.resolve("no such input"),
            Err(ControllerError::UnresolvedIdentifier(_))
        ));
    }

    #[test]
    fn validate_accepts_well_formed_descriptor() {
        descriptor().validate().unwrap();
    }

    #[test]
    fn validate_rejects_dangling_compound_leaf() {
        let mut d = descriptor();
        d.compound.insert(
            "broken".into(),
            CompoundNode::Name("missing_axis".into()),
        );
        assert!(d.validate().is_err());
    }

    #[test]
    fn validate_rejects_non_axis_vector_component() {
        let mut d = descriptor();
        d.vectors
            .get_mut("left_stick")
            .unwrap()
            .components
            .insert("z".into(), "a".into());
        assert!(matches!(
            d.validate(),
            Err(ControllerError::TypeMismatch { .. })
        ));
    }
}
