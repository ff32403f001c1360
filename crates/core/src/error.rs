//! Error types for the scenegl program compiler.

use thiserror::Error;

/// Errors produced while compiling a program definition or accessing its
/// vertex buffer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    /// A declared attribute has a type with no built-in codec and no override.
    #[error("unknown type '{ty}' for attribute '{name}' (no codec override given)")]
    UnknownAttributeType { name: String, ty: String },

    /// A declared uniform has a type the uniform binder cannot upload.
    #[error("unknown type '{ty}' for uniform '{name}'")]
    UnknownUniformType { name: String, ty: String },

    /// An explicit attribute ordering was given but omits a declared attribute.
    #[error("attribute '{0}' is missing from the explicit attribute order")]
    UnorderedAttribute(String),

    /// A name in the ordering or in the instanced overrides is not declared
    /// by the vertex shader.
    #[error("attribute '{0}' is not declared by the vertex shader")]
    UndeclaredAttribute(String),

    /// A vertex index was outside the valid range.
    #[error("vertex index {index} out of range (count {count})")]
    IndexOutOfRange { index: usize, count: usize },

    /// A vertex passed to `add`/`update` lacks a field for a declared attribute.
    #[error("vertex is missing field '{0}'")]
    MissingField(String),

    /// A vertex field had a shape the attribute's codec cannot write.
    #[error("attribute '{name}' expects {expected}, got {got}")]
    ValueShape {
        name: String,
        expected: String,
        got: String,
    },

    /// Static data for an instanced attribute could not be encoded.
    #[error("invalid instanced data for '{name}': {reason}")]
    InvalidInstancedData { name: String, reason: String },

    /// A program definition could not be decoded.
    #[error("invalid program definition: {0}")]
    InvalidDefinition(String),

    /// A byte offset or vertex count would exceed the addressable buffer size.
    #[error("buffer size overflow: {what}")]
    BufferOverflow { what: String },

    /// Two programs sharing one buffer disagree on the per-vertex stride.
    #[error("layout mismatch: shared buffer has {expected} bytes per vertex, program expects {got}")]
    LayoutMismatch { expected: usize, got: usize },

    /// A uniform value did not match the uniform's declared type.
    #[error("uniform '{name}' expects a {expected} value")]
    UniformMismatch { name: String, expected: String },

    /// A texture operation named a sampler the program does not declare.
    #[error("no sampler uniform named '{0}'")]
    UnknownTexture(String),

    /// Pixel data did not match the declared texture dimensions.
    #[error("texture '{name}' expects {expected} bytes of RGBA8 data, got {got}")]
    TextureSize {
        name: String,
        expected: usize,
        got: usize,
    },
}

impl From<serde_json::Error> for ProgramError {
    fn from(e: serde_json::Error) -> Self {
        ProgramError::InvalidDefinition(e.to_string())
    }
}
