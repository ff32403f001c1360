//! Maps declared GLSL attribute types to codecs.

use std::collections::BTreeMap;

use crate::codec::{AttributeCodec, CodecKind, PackedColorCodec, ScalarCodec, VectorCodec};
use crate::error::ProgramError;
use crate::introspect::ParsedDeclaration;

static SCALAR: ScalarCodec = ScalarCodec;
static VEC2: VectorCodec<2> = VectorCodec;
static VEC3: VectorCodec<3> = VectorCodec;
static VEC4: VectorCodec<4> = VectorCodec;
static PACKED_COLOR: PackedColorCodec = PackedColorCodec;

/// Returns the shared codec instance for `kind`.
pub fn codec_for(kind: CodecKind) -> &'static dyn AttributeCodec {
    match kind {
        CodecKind::Scalar => &SCALAR,
        CodecKind::Vec2 => &VEC2,
        CodecKind::Vec3 => &VEC3,
        CodecKind::Vec4 => &VEC4,
        CodecKind::PackedColor => &PACKED_COLOR,
    }
}

/// Type table used to pick a codec for each declared attribute.
///
/// Starts with `float`, `vec2`, `vec3` and `vec4`; more GLSL type names can be
/// mapped with [`register`](Self::register). Per-attribute overrides always
/// win over the table.
#[derive(Debug, Clone)]
pub struct CodecRegistry {
    types: BTreeMap<String, CodecKind>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        let types = [
            ("float", CodecKind::Scalar),
            ("vec2", CodecKind::Vec2),
            ("vec3", CodecKind::Vec3),
            ("vec4", CodecKind::Vec4),
        ]
        .into_iter()
        .map(|(ty, kind)| (ty.to_string(), kind))
        .collect();
        Self { types }
    }

    /// Maps an additional GLSL type name to a codec kind.
    pub fn register(&mut self, glsl_type: &str, kind: CodecKind) {
        self.types.insert(glsl_type.to_string(), kind);
    }

    /// The default codec kind for a GLSL type, if any.
    pub fn kind_for_type(&self, glsl_type: &str) -> Option<CodecKind> {
        self.types.get(glsl_type).copied()
    }

    /// Resolves the codec for one attribute declaration.
    ///
    /// # Errors
    ///
    /// Returns `ProgramError::UnknownAttributeType` naming the attribute and
    /// its declared type when neither an override nor the table resolves it.
    pub fn resolve(
        &self,
        declaration: &ParsedDeclaration,
        overrides: &BTreeMap<String, CodecKind>,
    ) -> Result<&'static dyn AttributeCodec, ProgramError> {
        overrides
            .get(&declaration.name)
            .copied()
            .or_else(|| self.kind_for_type(&declaration.ty))
            .map(codec_for)
            .ok_or_else(|| ProgramError::UnknownAttributeType {
                name: declaration.name.clone(),
                ty: declaration.ty.clone(),
            })
    }
}

impl Default for CodecRegistry {
    fn default() -> Self {
        Self::new()
    }
}
