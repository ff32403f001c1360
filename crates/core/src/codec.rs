//! Attribute codecs: how one attribute's value is laid out in the vertex
//! buffer and how the GPU is told to read it back.
//!
//! Codecs are stateless. The registry hands out `&'static dyn AttributeCodec`
//! instances, so a planned layout is a table of trait objects plus byte
//! offsets. [`VectorCodec`] is generic over its width, which leaves room to
//! monomorphize a whole layout later without changing this interface.
//!
//! Byte conventions: floats are little-endian `f32`. Packed colors are a
//! `0xRRGGBBAA` integer stored big-endian, so memory holds R, G, B, A and a
//! shader reads the attribute as `.rgba` with no swizzle.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProgramError;
use crate::value::AttributeValue;

/// Built-in codec variants, as named in program definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecKind {
    Scalar,
    Vec2,
    Vec3,
    Vec4,
    PackedColor,
}

impl fmt::Display for CodecKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CodecKind::Scalar => "scalar",
            CodecKind::Vec2 => "vec2",
            CodecKind::Vec3 => "vec3",
            CodecKind::Vec4 => "vec4",
            CodecKind::PackedColor => "packed_color",
        };
        f.write_str(name)
    }
}

/// Component type the GPU reads for an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Float,
    UnsignedByte,
}

impl DataType {
    /// The GL enum for this component type.
    pub fn gl_enum(self) -> u32 {
        match self {
            DataType::Float => 0x1406,
            DataType::UnsignedByte => 0x1401,
        }
    }
}

/// Parameters for one `vertexAttribPointer` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttribPointer {
    /// Components per vertex (1-4).
    pub size: i32,
    pub data_type: DataType,
    pub normalized: bool,
    pub stride: i32,
    pub offset: i32,
}

/// Read/write/bind strategy for one attribute.
///
/// `at` arguments are absolute byte positions of the attribute within the
/// buffer (vertex index times stride, plus the attribute's planned offset).
pub trait AttributeCodec: fmt::Debug + Send + Sync {
    fn kind(&self) -> CodecKind;

    /// Components per vertex.
    fn element_count(&self) -> usize;

    fn bytes_per_element(&self) -> usize;

    /// Bytes this attribute occupies in one vertex.
    fn byte_width(&self) -> usize {
        self.element_count() * self.bytes_per_element()
    }

    /// Encodes `value` at `at`. `name` is only used for error messages.
    fn write(
        &self,
        bytes: &mut [u8],
        at: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<(), ProgramError>;

    /// Decodes the value at `at`; the inverse of [`write`](Self::write).
    fn read(&self, bytes: &[u8], at: usize) -> AttributeValue;

    /// Zeroes this attribute's bytes at `at`.
    fn clear(&self, bytes: &mut [u8], at: usize) {
        bytes[at..at + self.byte_width()].fill(0);
    }

    /// Copies this attribute's bytes from one vertex slot to another.
    fn move_value(&self, bytes: &mut [u8], from: usize, to: usize) {
        bytes.copy_within(from..from + self.byte_width(), to);
    }

    /// GPU binding parameters for this attribute at `offset` within a vertex
    /// of `stride` bytes.
    fn bind(&self, stride: usize, offset: usize) -> AttribPointer;

    /// Divisor to set on this attribute's location: 1 when per-vertex data is
    /// stepped per instance, 0 to restore plain per-vertex stepping.
    fn divisor(&self, per_instance: bool) -> u32 {
        u32::from(per_instance)
    }
}

/// GL takes stride and offset as `GLint`; oversized values saturate.
fn gl_int(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn read_f32(bytes: &[u8], at: usize) -> f32 {
    let mut cell = [0u8; 4];
    cell.copy_from_slice(&bytes[at..at + 4]);
    f32::from_le_bytes(cell)
}

fn write_f32(bytes: &mut [u8], at: usize, v: f32) {
    bytes[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// One `float` per vertex.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarCodec;

impl AttributeCodec for ScalarCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::Scalar
    }

    fn element_count(&self) -> usize {
        1
    }

    fn bytes_per_element(&self) -> usize {
        4
    }

    fn write(
        &self,
        bytes: &mut [u8],
        at: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<(), ProgramError> {
        let v = match value {
            AttributeValue::Scalar(v) => *v,
            AttributeValue::Packed(n) => *n as f32,
            AttributeValue::Vector(v) if v.len() == 1 => v[0],
            other => {
                return Err(ProgramError::ValueShape {
                    name: name.to_string(),
                    expected: "a scalar".to_string(),
                    got: other.shape(),
                })
            }
        };
        write_f32(bytes, at, v);
        Ok(())
    }

    fn read(&self, bytes: &[u8], at: usize) -> AttributeValue {
        AttributeValue::Scalar(read_f32(bytes, at))
    }

    fn bind(&self, stride: usize, offset: usize) -> AttribPointer {
        AttribPointer {
            size: 1,
            data_type: DataType::Float,
            normalized: false,
            stride: gl_int(stride),
            offset: gl_int(offset),
        }
    }
}

/// `N` consecutive floats per vertex (`vec2`..`vec4`).
#[derive(Debug, Clone, Copy, Default)]
pub struct VectorCodec<const N: usize>;

impl<const N: usize> AttributeCodec for VectorCodec<N> {
    fn kind(&self) -> CodecKind {
        match N {
            2 => CodecKind::Vec2,
            3 => CodecKind::Vec3,
            _ => CodecKind::Vec4,
        }
    }

    fn element_count(&self) -> usize {
        N
    }

    fn bytes_per_element(&self) -> usize {
        4
    }

    fn write(
        &self,
        bytes: &mut [u8],
        at: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<(), ProgramError> {
        match value {
            AttributeValue::Vector(v) if v.len() >= N => {
                for (i, component) in v.iter().take(N).enumerate() {
                    write_f32(bytes, at + i * 4, *component);
                }
                Ok(())
            }
            other => Err(ProgramError::ValueShape {
                name: name.to_string(),
                expected: format!("a vector of {N} floats"),
                got: other.shape(),
            }),
        }
    }

    fn read(&self, bytes: &[u8], at: usize) -> AttributeValue {
        AttributeValue::Vector((0..N).map(|i| read_f32(bytes, at + i * 4)).collect())
    }

    fn bind(&self, stride: usize, offset: usize) -> AttribPointer {
        AttribPointer {
            size: N as i32,
            data_type: DataType::Float,
            normalized: false,
            stride: gl_int(stride),
            offset: gl_int(offset),
        }
    }
}

/// A `0xRRGGBBAA` color in one 32-bit cell, read by the GPU as four
/// normalized unsigned bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PackedColorCodec;

impl AttributeCodec for PackedColorCodec {
    fn kind(&self) -> CodecKind {
        CodecKind::PackedColor
    }

    fn element_count(&self) -> usize {
        1
    }

    fn bytes_per_element(&self) -> usize {
        4
    }

    fn write(
        &self,
        bytes: &mut [u8],
        at: usize,
        name: &str,
        value: &AttributeValue,
    ) -> Result<(), ProgramError> {
        let AttributeValue::Packed(rgba) = value else {
            return Err(ProgramError::ValueShape {
                name: name.to_string(),
                expected: "a packed color".to_string(),
                got: value.shape(),
            });
        };
        bytes[at..at + 4].copy_from_slice(&rgba.to_be_bytes());
        Ok(())
    }

    fn read(&self, bytes: &[u8], at: usize) -> AttributeValue {
        let mut cell = [0u8; 4];
        cell.copy_from_slice(&bytes[at..at + 4]);
        AttributeValue::Packed(u32::from_be_bytes(cell))
    }

    fn bind(&self, stride: usize, offset: usize) -> AttribPointer {
        AttribPointer {
            size: 4,
            data_type: DataType::UnsignedByte,
            normalized: true,
            stride: gl_int(stride),
            offset: gl_int(offset),
        }
    }
}

/// Packs four 8-bit channels into the `0xRRGGBBAA` form the packed codec expects.
pub fn pack_rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    u32::from_be_bytes([r, g, b, a])
}

/// Inverse of [`pack_rgba`].
pub fn unpack_rgba(rgba: u32) -> [u8; 4] {
    rgba.to_be_bytes()
}
