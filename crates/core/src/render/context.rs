//! GPU context wrapper with capability detection.
//!
//! Instanced attributes need instanced drawing, which is core in WebGL2 and
//! GL 3.3+ but an extension (`ANGLE_instanced_arrays`) on WebGL1. Vertex
//! array objects are likewise core only from GL 3 / WebGL2; desktop core
//! profiles require one to be bound before any attribute pointer is set.

use super::error::RenderError;

/// The extension that provides instanced drawing on WebGL1.
pub const INSTANCING_EXTENSION: &str = "ANGLE_instanced_arrays";

/// How instanced draws are available, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instancing {
    Core,
    Extension,
    Unavailable,
}

impl Instancing {
    /// Classifies a context by its major version and extension list.
    pub fn detect(major_version: u32, has_extension: bool) -> Self {
        if major_version >= 3 {
            Instancing::Core
        } else if has_extension {
            Instancing::Extension
        } else {
            Instancing::Unavailable
        }
    }

    pub fn is_available(self) -> bool {
        self != Instancing::Unavailable
    }
}

/// Wraps a `glow::Context` with the capabilities render programs query.
pub struct GpuContext {
    gl: glow::Context,
    instancing: Instancing,
    vertex_arrays: bool,
}

impl GpuContext {
    pub fn new(gl: glow::Context) -> Self {
        use glow::HasContext;

        let major = gl.version().major;
        let instancing = Instancing::detect(
            major,
            gl.supported_extensions().contains(INSTANCING_EXTENSION),
        );
        let vertex_arrays = major >= 3
            || gl.supported_extensions().contains("OES_vertex_array_object");
        log::debug!(
            "GL {}.{} (embedded: {}), instancing {:?}, vertex arrays {}",
            major,
            gl.version().minor,
            gl.version().is_embedded,
            instancing,
            vertex_arrays
        );

        Self {
            gl,
            instancing,
            vertex_arrays,
        }
    }

    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    pub fn into_gl(self) -> glow::Context {
        self.gl
    }

    pub fn instancing(&self) -> Instancing {
        self.instancing
    }

    pub fn supports_vertex_arrays(&self) -> bool {
        self.vertex_arrays
    }

    /// Fails when instanced drawing is unavailable.
    ///
    /// # Errors
    ///
    /// `RenderError::MissingExtension` naming the WebGL1 extension to enable.
    pub fn require_instancing(&self) -> Result<(), RenderError> {
        if self.instancing.is_available() {
            Ok(())
        } else {
            Err(RenderError::MissingExtension(format!(
                "{INSTANCING_EXTENSION} (needed for instanced attributes; use WebGL2 or enable the extension)"
            )))
        }
    }
}
