//! Errors raised by the GL half of a program.

use thiserror::Error;

use super::shader::ShaderError;
use crate::error::ProgramError;

#[derive(Debug, Clone, Error)]
pub enum RenderError {
    #[error(transparent)]
    Shader(#[from] ShaderError),

    #[error(transparent)]
    Program(#[from] ProgramError),

    /// The context lacks an extension the program needs.
    #[error("missing GPU extension: {0}")]
    MissingExtension(String),

    /// A GL object could not be allocated.
    #[error("GL error: {0}")]
    Gl(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_extension_names_the_extension() {
        let err = RenderError::MissingExtension("ANGLE_instanced_arrays".into());
        assert!(err.to_string().contains("ANGLE_instanced_arrays"), "got: {err}");
    }

    #[test]
    fn program_error_passes_through_unchanged() {
        let inner = ProgramError::UnknownTexture("atlas".into());
        let err = RenderError::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
    }

    #[test]
    fn shader_error_converts() {
        let err: RenderError = ShaderError::LinkError("varying mismatch".into()).into();
        assert!(matches!(err, RenderError::Shader(_)));
        assert!(err.to_string().contains("varying mismatch"));
    }
}
