//! Uniform binders: what to upload for each declared uniform at draw time.
//!
//! Typed uniforms read a same-named value from the caller's
//! [`UniformValues`](crate::value::UniformValues). Sampler uniforms own a
//! texture unit, assigned in declaration order starting at 0; the GL side
//! binds the sampler's texture to that unit and uploads the unit index.

use std::fmt;

use serde::Serialize;

use crate::error::ProgramError;
use crate::introspect::ParsedDeclaration;
use crate::value::UniformValue;

/// Uploadable uniform types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Int,
    Bool,
    Mat2,
    Mat3,
    Mat4,
}

impl UniformKind {
    /// Maps a GLSL type name to a typed uniform kind. Samplers are not typed
    /// uniforms and return `None`.
    pub fn from_glsl(ty: &str) -> Option<Self> {
        let kind = match ty {
            "float" => UniformKind::Float,
            "vec2" => UniformKind::Vec2,
            "vec3" => UniformKind::Vec3,
            "vec4" => UniformKind::Vec4,
            "int" => UniformKind::Int,
            "bool" => UniformKind::Bool,
            "mat2" => UniformKind::Mat2,
            "mat3" => UniformKind::Mat3,
            "mat4" => UniformKind::Mat4,
            _ => return None,
        };
        Some(kind)
    }

    /// Whether `value` can be uploaded to a uniform of this kind.
    pub fn accepts(self, value: &UniformValue) -> bool {
        matches!(
            (self, value),
            (UniformKind::Float, UniformValue::Float(_))
                | (UniformKind::Vec2, UniformValue::Vec2(_))
                | (UniformKind::Vec3, UniformValue::Vec3(_))
                | (UniformKind::Vec4, UniformValue::Vec4(_))
                | (UniformKind::Int | UniformKind::Bool, UniformValue::Int(_))
                | (UniformKind::Mat2, UniformValue::Mat2(_))
                | (UniformKind::Mat3, UniformValue::Mat3(_))
                | (UniformKind::Mat4, UniformValue::Mat4(_))
        )
    }
}

impl fmt::Display for UniformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UniformKind::Float => "float",
            UniformKind::Vec2 => "vec2",
            UniformKind::Vec3 => "vec3",
            UniformKind::Vec4 => "vec4",
            UniformKind::Int => "int",
            UniformKind::Bool => "bool",
            UniformKind::Mat2 => "mat2",
            UniformKind::Mat3 => "mat3",
            UniformKind::Mat4 => "mat4",
        };
        f.write_str(name)
    }
}

const SAMPLER_TYPES: &[&str] = &["sampler2D"];

/// Draw-time behavior for one declared uniform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "binder", rename_all = "lowercase")]
pub enum UniformBinder {
    Typed { name: String, kind: UniformKind },
    Sampler { name: String, unit: u32 },
}

impl UniformBinder {
    pub fn name(&self) -> &str {
        match self {
            UniformBinder::Typed { name, .. } | UniformBinder::Sampler { name, .. } => name.as_str(),
        }
    }

    pub fn is_sampler(&self) -> bool {
        matches!(self, UniformBinder::Sampler { .. })
    }

    /// Checks `value` against this binder's declared type.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError::UniformMismatch` when the value's type differs
    /// from the declaration, or when a value is given for a sampler.
    pub fn check(&self, value: &UniformValue) -> Result<(), ProgramError> {
        match self {
            UniformBinder::Typed { kind, .. } if kind.accepts(value) => Ok(()),
            UniformBinder::Typed { name, kind } => Err(ProgramError::UniformMismatch {
                name: name.clone(),
                expected: kind.to_string(),
            }),
            UniformBinder::Sampler { name, .. } => Err(ProgramError::UniformMismatch {
                name: name.clone(),
                expected: "texture (set through the texture source)".to_string(),
            }),
        }
    }
}

/// Builds binders for the uniform declarations, assigning sampler units in order.
///
/// # Errors
///
/// Returns `ProgramError::UnknownUniformType` for a type that is neither a
/// typed uniform nor a sampler.
pub fn plan_uniforms<'a>(
    declarations: impl IntoIterator<Item = &'a ParsedDeclaration>,
) -> Result<Vec<UniformBinder>, ProgramError> {
    let mut next_unit = 0;
    declarations
        .into_iter()
        .map(|decl| {
            if SAMPLER_TYPES.contains(&decl.ty.as_str()) {
                let unit = next_unit;
                next_unit += 1;
                return Ok(UniformBinder::Sampler {
                    name: decl.name.clone(),
                    unit,
                });
            }
            UniformKind::from_glsl(&decl.ty)
                .map(|kind| UniformBinder::Typed {
                    name: decl.name.clone(),
                    kind,
                })
                .ok_or_else(|| ProgramError::UnknownUniformType {
                    name: decl.name.clone(),
                    ty: decl.ty.clone(),
                })
        })
        .collect()
}
