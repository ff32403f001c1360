//! Program definitions: shader sources plus the overrides that steer layout
//! planning.
//!
//! A [`ProgramDefinition`] is plain data. It can be built in code with the
//! `with_*` methods or decoded from JSON, where every field except the two
//! shader sources is optional:
//!
//! ```json
//! {
//!   "vertex": "attribute vec3 position; attribute vec4 color; ...",
//!   "fragment": "...",
//!   "capacity": 1024,
//!   "attributes": { "color": "packed_color" },
//!   "order": ["color", "position"],
//!   "primitive": "points"
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec::CodecKind;
use crate::error::ProgramError;
use crate::value::AttributeValue;

/// Vertex capacity used when a definition does not give one.
pub const DEFAULT_CAPACITY: usize = 128;

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

/// Primitive assembled by a non-instanced draw call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    #[default]
    Triangles,
}

impl Primitive {
    /// The GL draw mode enum.
    pub fn gl_enum(self) -> u32 {
        match self {
            Primitive::Points => 0x0000,
            Primitive::Lines => 0x0001,
            Primitive::LineStrip => 0x0003,
            Primitive::Triangles => 0x0004,
        }
    }
}

/// Static per-corner data for an instanced attribute.
///
/// Instanced attributes live in their own fixed buffer; each entry of `data`
/// is one vertex of the base primitive (six for the instanced quad).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstancedData {
    pub codec: CodecKind,
    pub data: Vec<AttributeValue>,
}

/// Everything needed to compile one render program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramDefinition {
    #[serde(default)]
    pub vertex: String,
    #[serde(default)]
    pub fragment: String,
    /// Initial capacity in vertices.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Enables index-range and missing-field checks on buffer access.
    #[serde(default)]
    pub debug: bool,
    /// Per-attribute codec overrides.
    #[serde(default)]
    pub attributes: BTreeMap<String, CodecKind>,
    #[serde(default)]
    pub instanced: BTreeMap<String, InstancedData>,
    /// Explicit per-vertex attribute order; must name every non-instanced
    /// attribute.
    #[serde(default)]
    pub order: Option<Vec<String>>,
    #[serde(default)]
    pub primitive: Primitive,
}

impl ProgramDefinition {
    pub fn new(vertex: &str, fragment: &str) -> Self {
        Self {
            vertex: vertex.to_string(),
            fragment: fragment.to_string(),
            capacity: DEFAULT_CAPACITY,
            debug: false,
            attributes: BTreeMap::new(),
            instanced: BTreeMap::new(),
            order: None,
            primitive: Primitive::default(),
        }
    }

    /// Decodes a definition from JSON.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError::InvalidDefinition` if the JSON is malformed or
    /// has fields of the wrong type.
    pub fn from_json(json: &str) -> Result<Self, ProgramError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Overrides the codec of one attribute.
    pub fn with_attribute(mut self, name: &str, codec: CodecKind) -> Self {
        self.attributes.insert(name.to_string(), codec);
        self
    }

    /// Moves one attribute into its own static instanced buffer.
    pub fn with_instanced(mut self, name: &str, codec: CodecKind, data: Vec<AttributeValue>) -> Self {
        self.instanced
            .insert(name.to_string(), InstancedData { codec, data });
        self
    }

    pub fn with_order<S: AsRef<str>>(mut self, order: &[S]) -> Self {
        self.order = Some(order.iter().map(|s| s.as_ref().to_string()).collect());
        self
    }

    pub fn with_primitive(mut self, primitive: Primitive) -> Self {
        self.primitive = primitive;
        self
    }
}

/// The six corners of a unit quad as two triangles, in `[-1, 1]` space.
///
/// Handy as the `data` of an instanced `vec2` corner attribute.
pub fn quad_corners() -> Vec<AttributeValue> {
    [
        [-1.0, -1.0],
        [1.0, -1.0],
        [1.0, 1.0],
        [-1.0, -1.0],
        [1.0, 1.0],
        [-1.0, 1.0],
    ]
    .into_iter()
    .map(|c: [f32; 2]| AttributeValue::from(c))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_defaults() {
        let def = ProgramDefinition::new("vs", "fs");
        assert_eq!(def.capacity, DEFAULT_CAPACITY);
        assert!(!def.debug);
        assert!(def.attributes.is_empty());
        assert!(def.instanced.is_empty());
        assert!(def.order.is_none());
        assert_eq!(def.primitive, Primitive::Triangles);
    }

    #[test]
    fn from_json_fills_missing_fields_with_defaults() {
        let def = ProgramDefinition::from_json(r#"{"vertex":"v","fragment":"f"}"#).unwrap();
        assert_eq!(def, ProgramDefinition::new("v", "f"));
    }

    #[test]
    fn from_json_reads_overrides() {
        let json = r#"{
            "vertex": "v",
            "fragment": "f",
            "capacity": 4,
            "debug": true,
            "attributes": {"color": "packed_color"},
            "instanced": {"corner": {"codec": "vec2", "data": [[0, 0], [1, 0]]}},
            "order": ["color", "position"],
            "primitive": "line_strip"
        }"#;
        let def = ProgramDefinition::from_json(json).unwrap();
        assert_eq!(def.capacity, 4);
        assert!(def.debug);
        assert_eq!(def.attributes["color"], CodecKind::PackedColor);
        assert_eq!(def.instanced["corner"].codec, CodecKind::Vec2);
        assert_eq!(def.instanced["corner"].data.len(), 2);
        assert_eq!(def.order.as_deref(), Some(&["color".to_string(), "position".to_string()][..]));
        assert_eq!(def.primitive, Primitive::LineStrip);
    }

    #[test]
    fn from_json_rejects_unknown_codec() {
        let err = ProgramDefinition::from_json(r#"{"attributes":{"a":"mat4"}}"#).unwrap_err();
        assert!(matches!(err, ProgramError::InvalidDefinition(_)));
    }

    #[test]
    fn builder_matches_json_round_trip() {
        let def = ProgramDefinition::new("v", "f")
            .with_capacity(16)
            .with_attribute("color", CodecKind::PackedColor)
            .with_instanced("corner", CodecKind::Vec2, quad_corners())
            .with_order(&["position", "color"])
            .with_primitive(Primitive::Points);
        let json = serde_json::to_string(&def).unwrap();
        assert_eq!(ProgramDefinition::from_json(&json).unwrap(), def);
    }

    #[test]
    fn primitive_gl_enums_match_gl_constants() {
        assert_eq!(Primitive::Points.gl_enum(), 0);
        assert_eq!(Primitive::Lines.gl_enum(), 1);
        assert_eq!(Primitive::LineStrip.gl_enum(), 3);
        assert_eq!(Primitive::Triangles.gl_enum(), 4);
    }

    #[test]
    fn quad_corners_are_two_triangles() {
        let corners = quad_corners();
        assert_eq!(corners.len(), 6);
        assert_eq!(corners[0], corners[3]);
        assert_eq!(corners[2], corners[4]);
    }
}
