//! Compiling a [`ProgramDefinition`] into a [`ProgramInfo`]: the GPU-free
//! description of a program's vertex layout, instanced attributes and
//! uniforms.

use serde_json::{json, Value};

use crate::codec::AttributeCodec;
use crate::definition::{Primitive, ProgramDefinition};
use crate::draw::QUAD_VERTICES;
use crate::error::ProgramError;
use crate::introspect::{self, ParsedDeclaration};
use crate::layout::{self, AttributeSlot};
use crate::registry::{codec_for, CodecRegistry};
use crate::uniform::{plan_uniforms, UniformBinder};

/// An attribute fed from a static buffer shared by every instance.
#[derive(Debug, Clone)]
pub struct InstancedAttribute {
    pub name: String,
    pub codec: &'static dyn AttributeCodec,
    /// Encoded data, `vertex_count * codec.byte_width()` bytes.
    pub bytes: Vec<u8>,
    pub vertex_count: usize,
}

/// Compiled, immutable description of a program.
///
/// Invariant: `byte_per_vertex` is the sum of `byte_width()` over
/// `attributes`; instanced attributes never contribute to it.
#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub byte_per_vertex: usize,
    pub item_per_vertex: usize,
    pub attributes: Vec<AttributeSlot>,
    pub instanced: Vec<InstancedAttribute>,
    pub uniforms: Vec<UniformBinder>,
    pub primitive: Primitive,
    pub capacity: usize,
    pub debug: bool,
}

impl ProgramInfo {
    /// Compiles a definition with the built-in codec table.
    ///
    /// # Errors
    ///
    /// See [`compile_with`](Self::compile_with).
    pub fn compile(definition: &ProgramDefinition) -> Result<Self, ProgramError> {
        Self::compile_with(definition, &CodecRegistry::new())
    }

    /// Compiles a definition, resolving attribute types through `registry`.
    ///
    /// # Errors
    ///
    /// - `UnknownAttributeType` / `UnknownUniformType` for unresolvable types.
    /// - `UndeclaredAttribute` when an instanced override or the explicit
    ///   order names an attribute the vertex shader does not declare.
    /// - `UnorderedAttribute` when the explicit order leaves one out.
    /// - `InvalidInstancedData` when instanced data does not fit its codec.
    pub fn compile_with(
        definition: &ProgramDefinition,
        registry: &CodecRegistry,
    ) -> Result<Self, ProgramError> {
        let declarations = introspect::introspect(&definition.vertex, &definition.fragment);
        Self::from_declarations(definition, &declarations, registry)
    }

    fn from_declarations(
        definition: &ProgramDefinition,
        declarations: &[ParsedDeclaration],
        registry: &CodecRegistry,
    ) -> Result<Self, ProgramError> {
        let attribute_decls: Vec<&ParsedDeclaration> =
            introspect::attributes(declarations).collect();

        if let Some(name) = definition
            .instanced
            .keys()
            .find(|name| !attribute_decls.iter().any(|d| &&d.name == name))
        {
            return Err(ProgramError::UndeclaredAttribute(name.clone()));
        }

        let mut per_vertex = Vec::new();
        let mut instanced = Vec::new();
        for decl in &attribute_decls {
            match definition.instanced.get(&decl.name) {
                Some(data) => {
                    instanced.push(encode_instanced(&decl.name, codec_for(data.codec), &data.data)?)
                }
                None => {
                    let codec = registry.resolve(decl, &definition.attributes)?;
                    per_vertex.push((decl.name.clone(), codec));
                }
            }
        }

        // Instanced names are allowed in an explicit order but do not take a slot.
        let order: Option<Vec<String>> = definition.order.as_ref().map(|order| {
            order
                .iter()
                .filter(|name| !definition.instanced.contains_key(*name))
                .cloned()
                .collect()
        });
        let layout = layout::plan(per_vertex, order.as_deref())?;

        let uniforms = plan_uniforms(introspect::uniforms(declarations))?;

        log::debug!(
            "planned program: {} attributes, {} instanced, {} uniforms, {} bytes per vertex",
            layout.slots.len(),
            instanced.len(),
            uniforms.len(),
            layout.byte_per_vertex
        );

        Ok(Self {
            byte_per_vertex: layout.byte_per_vertex,
            item_per_vertex: layout.item_per_vertex,
            attributes: layout.slots,
            instanced,
            uniforms,
            primitive: definition.primitive,
            capacity: definition.capacity,
            debug: definition.debug,
        })
    }

    /// Looks up a per-vertex attribute slot by name.
    pub fn attribute(&self, name: &str) -> Option<&AttributeSlot> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Whether draws go through the instanced path.
    pub fn is_instanced(&self) -> bool {
        !self.instanced.is_empty()
    }

    /// Sampler uniforms, in unit order.
    pub fn samplers(&self) -> impl Iterator<Item = &UniformBinder> {
        self.uniforms.iter().filter(|u| u.is_sampler())
    }

    /// JSON summary of the planned layout.
    pub fn describe(&self) -> Value {
        let attributes: Vec<Value> = self
            .attributes
            .iter()
            .map(|a| {
                json!({
                    "name": a.name,
                    "codec": a.codec.kind(),
                    "offset": a.offset,
                    "elements": a.codec.element_count(),
                    "bytes": a.codec.byte_width(),
                    "pointer": a.codec.bind(self.byte_per_vertex, a.offset),
                })
            })
            .collect();
        let instanced: Vec<Value> = self
            .instanced
            .iter()
            .map(|a| {
                json!({
                    "name": a.name,
                    "codec": a.codec.kind(),
                    "vertices": a.vertex_count,
                })
            })
            .collect();
        json!({
            "bytePerVertex": self.byte_per_vertex,
            "itemPerVertex": self.item_per_vertex,
            "primitive": self.primitive,
            "attributes": attributes,
            "instanced": instanced,
            "uniforms": self.uniforms,
        })
    }
}

fn encode_instanced(
    name: &str,
    codec: &'static dyn AttributeCodec,
    data: &[crate::value::AttributeValue],
) -> Result<InstancedAttribute, ProgramError> {
    // Instanced draws always submit one quad of QUAD_VERTICES corners.
    let expected = QUAD_VERTICES as usize;
    if data.len() != expected {
        return Err(ProgramError::InvalidInstancedData {
            name: name.to_string(),
            reason: format!("expected {expected} entries, got {}", data.len()),
        });
    }
    let width = codec.byte_width();
    let mut bytes = vec![0u8; data.len() * width];
    for (i, value) in data.iter().enumerate() {
        codec
            .write(&mut bytes, i * width, name, value)
            .map_err(|e| ProgramError::InvalidInstancedData {
                name: name.to_string(),
                reason: format!("entry {i}: {e}"),
            })?;
    }
    Ok(InstancedAttribute {
        name: name.to_string(),
        codec,
        bytes,
        vertex_count: data.len(),
    })
}
