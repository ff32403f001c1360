//! GL half of a render program.
//!
//! Only compiled with the `render` feature. Everything here goes through
//! `glow`, so the same code runs on WebGL (1 and 2) and desktop GL.
//!
//! - [`context`]: capability detection (instancing, vertex arrays).
//! - [`shader`]: compile and link with annotated driver logs.
//! - [`texture`]: RGBA8 textures behind sampler uniforms.
//! - [`program`]: `RenderProgram`, buffer upload and draw.

pub mod context;
pub mod error;
pub mod program;
pub mod shader;
pub mod texture;

pub use context::{GpuContext, Instancing};
pub use error::RenderError;
pub use program::{DrawHook, RenderProgram, SharedBuffer};
pub use shader::{annotate_source, compile_program, compile_shader, ShaderError, ShaderStage};
pub use texture::{SamplerTexture, TextureConfig};
