#![deny(unsafe_code)]
//! Shader-binding and vertex-buffer compiler for WebGL-class renderers.
//!
//! A [`ProgramDefinition`] (shader sources plus overrides) is compiled into a
//! [`ProgramInfo`]: the declared attributes and uniforms, a packed per-vertex
//! layout and the codecs that read and write it. A [`VertexProgram`] pairs
//! that layout with a growable [`VertexBuffer`] and exposes `add`, `update`,
//! `get`, `remove` and the raw byte round trip.
//!
//! With the `render` feature, `render::RenderProgram` adds the GL half:
//! compile/link, attribute pointers, uniform and sampler upload and draw.

pub mod buffer;
pub mod codec;
pub mod definition;
pub mod draw;
pub mod error;
pub mod info;
pub mod introspect;
pub mod layout;
pub mod program;
pub mod registry;
pub mod uniform;
pub mod value;

#[cfg(feature = "render")]
pub mod render;

pub use buffer::VertexBuffer;
pub use codec::{AttribPointer, AttributeCodec, CodecKind, DataType};
pub use definition::{InstancedData, Primitive, ProgramDefinition, DEFAULT_CAPACITY};
pub use draw::{plan_draw, DrawContext, DrawPlan, SkipReason};
pub use error::ProgramError;
pub use info::{InstancedAttribute, ProgramInfo};
pub use introspect::{introspect, DeclarationKind, ParsedDeclaration};
pub use layout::{AttributeSlot, Layout};
pub use program::{VertexId, VertexProgram};
pub use registry::{codec_for, CodecRegistry};
pub use uniform::{UniformBinder, UniformKind};
pub use value::{AttributeValue, UniformValue, UniformValues, Vertex};
