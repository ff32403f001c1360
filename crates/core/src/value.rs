//! Named-field values passed across the program boundary.
//!
//! A [`Vertex`] maps attribute names to [`AttributeValue`]s and is what
//! `add`/`update` consume and `get` produces. [`UniformValues`] maps uniform
//! names to [`UniformValue`]s for one draw call.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The value of one attribute for one vertex.
///
/// In JSON, arrays decode as vectors, non-negative integers as packed colors
/// and any other number as a scalar. The scalar codec also accepts packed
/// values, so `"size": 2` still writes `2.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Consecutive floats, read in order by vector codecs.
    Vector(Vec<f32>),
    /// A channel-packed `0xRRGGBBAA` color.
    Packed(u32),
    /// A single float.
    Scalar(f32),
}

impl AttributeValue {
    /// Short human description of the value's shape, used in error messages.
    pub fn shape(&self) -> String {
        match self {
            AttributeValue::Scalar(_) => "a scalar".to_string(),
            AttributeValue::Vector(v) => format!("a vector of {} floats", v.len()),
            AttributeValue::Packed(_) => "a packed color".to_string(),
        }
    }
}

impl From<f32> for AttributeValue {
    fn from(v: f32) -> Self {
        AttributeValue::Scalar(v)
    }
}

impl From<u32> for AttributeValue {
    fn from(v: u32) -> Self {
        AttributeValue::Packed(v)
    }
}

impl<const N: usize> From<[f32; N]> for AttributeValue {
    fn from(v: [f32; N]) -> Self {
        AttributeValue::Vector(v.to_vec())
    }
}

impl From<Vec<f32>> for AttributeValue {
    fn from(v: Vec<f32>) -> Self {
        AttributeValue::Vector(v)
    }
}

impl From<glam::Vec2> for AttributeValue {
    fn from(v: glam::Vec2) -> Self {
        AttributeValue::Vector(v.to_array().to_vec())
    }
}

impl From<glam::Vec3> for AttributeValue {
    fn from(v: glam::Vec3) -> Self {
        AttributeValue::Vector(v.to_array().to_vec())
    }
}

impl From<glam::Vec4> for AttributeValue {
    fn from(v: glam::Vec4) -> Self {
        AttributeValue::Vector(v.to_array().to_vec())
    }
}

/// One vertex as a set of named attribute values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Vertex {
    fields: BTreeMap<String, AttributeValue>,
}

impl Vertex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<AttributeValue>) {
        self.fields.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.fields.get(name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<AttributeValue>> FromIterator<(K, V)> for Vertex {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// The value of one uniform for one draw call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    Int(i32),
    /// Column-major 2x2 matrix.
    Mat2([f32; 4]),
    /// Column-major 3x3 matrix.
    Mat3([f32; 9]),
    /// Column-major 4x4 matrix.
    Mat4([f32; 16]),
}

impl fmt::Display for UniformValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformValue::Float(_) => "float",
            UniformValue::Vec2(_) => "vec2",
            UniformValue::Vec3(_) => "vec3",
            UniformValue::Vec4(_) => "vec4",
            UniformValue::Int(_) => "int",
            UniformValue::Mat2(_) => "mat2",
            UniformValue::Mat3(_) => "mat3",
            UniformValue::Mat4(_) => "mat4",
        };
        f.write_str(name)
    }
}

impl From<f32> for UniformValue {
    fn from(v: f32) -> Self {
        UniformValue::Float(v)
    }
}

impl From<i32> for UniformValue {
    fn from(v: i32) -> Self {
        UniformValue::Int(v)
    }
}

impl From<glam::Vec2> for UniformValue {
    fn from(v: glam::Vec2) -> Self {
        UniformValue::Vec2(v.to_array())
    }
}

impl From<glam::Vec3> for UniformValue {
    fn from(v: glam::Vec3) -> Self {
        UniformValue::Vec3(v.to_array())
    }
}

impl From<glam::Vec4> for UniformValue {
    fn from(v: glam::Vec4) -> Self {
        UniformValue::Vec4(v.to_array())
    }
}

impl From<glam::Mat2> for UniformValue {
    fn from(m: glam::Mat2) -> Self {
        UniformValue::Mat2(m.to_cols_array())
    }
}

impl From<glam::Mat3> for UniformValue {
    fn from(m: glam::Mat3) -> Self {
        UniformValue::Mat3(m.to_cols_array())
    }
}

impl From<glam::Mat4> for UniformValue {
    fn from(m: glam::Mat4) -> Self {
        UniformValue::Mat4(m.to_cols_array())
    }
}

/// Uniform values for one draw call, looked up by uniform name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniformValues {
    values: BTreeMap<String, UniformValue>,
}

impl UniformValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<UniformValue>) -> Self {
        self.set(name, value);
        self
    }

    pub fn set(&mut self, name: &str, value: impl Into<UniformValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&UniformValue> {
        self.values.get(name)
    }

    /// Copies every value of `other` over this set.
    pub fn extend(&mut self, other: &UniformValues) {
        self.values
            .extend(other.values.iter().map(|(k, v)| (k.clone(), *v)));
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_builder_stores_converted_values() {
        let v = Vertex::new()
            .with("position", [1.0_f32, 2.0, 3.0])
            .with("size", 4.0_f32)
            .with("color", 0xff00_ff00_u32);
        assert_eq!(v.len(), 3);
        assert_eq!(
            v.get("position"),
            Some(&AttributeValue::Vector(vec![1.0, 2.0, 3.0]))
        );
        assert_eq!(v.get("size"), Some(&AttributeValue::Scalar(4.0)));
        assert_eq!(v.get("color"), Some(&AttributeValue::Packed(0xff00_ff00)));
        assert!(v.get("missing").is_none());
    }

    #[test]
    fn vertex_from_iterator_collects_pairs() {
        let v: Vertex = [("a", 1.0_f32), ("b", 2.0)].into_iter().collect();
        assert_eq!(v.len(), 2);
        assert_eq!(v.get("b"), Some(&AttributeValue::Scalar(2.0)));
    }

    #[test]
    fn vertex_json_uses_plain_shapes() {
        let v: Vertex =
            serde_json::from_str(r#"{"position":[1.0,2.0],"size":0.5,"color":4278255360}"#)
                .unwrap();
        assert_eq!(v.get("position"), Some(&AttributeValue::Vector(vec![1.0, 2.0])));
        assert_eq!(v.get("size"), Some(&AttributeValue::Scalar(0.5)));
        assert_eq!(v.get("color"), Some(&AttributeValue::Packed(0xff00_ff00)));
    }

    #[test]
    fn glam_vectors_convert_to_attribute_vectors() {
        let value: AttributeValue = glam::Vec3::new(1.0, 2.0, 3.0).into();
        assert_eq!(value, AttributeValue::Vector(vec![1.0, 2.0, 3.0]));
    }

    #[test]
    fn shape_describes_vector_length() {
        assert_eq!(AttributeValue::Vector(vec![0.0; 3]).shape(), "a vector of 3 floats");
        assert_eq!(AttributeValue::Scalar(0.0).shape(), "a scalar");
    }

    #[test]
    fn uniform_values_extend_overwrites() {
        let mut base = UniformValues::new().with("time", 1.0_f32).with("mode", 2_i32);
        let over = UniformValues::new().with("time", 5.0_f32);
        base.extend(&over);
        assert_eq!(base.get("time"), Some(&UniformValue::Float(5.0)));
        assert_eq!(base.get("mode"), Some(&UniformValue::Int(2)));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn mat4_uniform_is_column_major() {
        let m = glam::Mat4::from_translation(glam::Vec3::new(7.0, 8.0, 9.0));
        let UniformValue::Mat4(cols) = UniformValue::from(m) else {
            panic!("expected mat4");
        };
        assert_eq!(&cols[12..15], &[7.0, 8.0, 9.0]);
    }

    #[test]
    fn uniform_value_display_names_glsl_type() {
        assert_eq!(UniformValue::Mat3([0.0; 9]).to_string(), "mat3");
        assert_eq!(UniformValue::Int(1).to_string(), "int");
    }
}
