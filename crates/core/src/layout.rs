//! Per-vertex layout planning.
//!
//! Attributes are packed back to back with no padding, in declaration order
//! or in an explicit caller order. The planned offsets never change for the
//! life of a program.

use crate::codec::AttributeCodec;
use crate::error::ProgramError;

/// One per-vertex attribute of a compiled layout.
#[derive(Debug, Clone)]
pub struct AttributeSlot {
    pub name: String,
    pub codec: &'static dyn AttributeCodec,
    /// Byte offset from the start of a vertex.
    pub offset: usize,
}

impl AttributeSlot {
    /// Absolute byte position of this attribute for `vertex` in a buffer with
    /// `stride` bytes per vertex.
    pub fn position(&self, vertex: usize, stride: usize) -> usize {
        vertex * stride + self.offset
    }
}

/// Result of planning: the slots plus the per-vertex totals.
#[derive(Debug, Clone)]
pub struct Layout {
    pub slots: Vec<AttributeSlot>,
    /// Stride of one vertex in bytes.
    pub byte_per_vertex: usize,
    /// Components per vertex across all attributes.
    pub item_per_vertex: usize,
}

/// Assigns contiguous offsets to `attributes`.
///
/// With `order`, attributes are rearranged to follow it. Names in `order`
/// that are not in `attributes` are rejected, as is any attribute missing
/// from `order`. Repeated names in `order` count once.
///
/// # Errors
///
/// Returns `ProgramError::UndeclaredAttribute` for an ordering entry with no
/// matching attribute, and `ProgramError::UnorderedAttribute` for an
/// attribute the ordering leaves out.
pub fn plan(
    attributes: Vec<(String, &'static dyn AttributeCodec)>,
    order: Option<&[String]>,
) -> Result<Layout, ProgramError> {
    let ordered = match order {
        None => attributes,
        Some(order) => reorder(attributes, order)?,
    };

    let mut byte_per_vertex = 0;
    let mut item_per_vertex = 0;
    let slots = ordered
        .into_iter()
        .map(|(name, codec)| {
            let slot = AttributeSlot {
                name,
                codec,
                offset: byte_per_vertex,
            };
            byte_per_vertex += codec.byte_width();
            item_per_vertex += codec.element_count();
            slot
        })
        .collect();

    Ok(Layout {
        slots,
        byte_per_vertex,
        item_per_vertex,
    })
}

fn reorder(
    mut attributes: Vec<(String, &'static dyn AttributeCodec)>,
    order: &[String],
) -> Result<Vec<(String, &'static dyn AttributeCodec)>, ProgramError> {
    let mut ordered = Vec::with_capacity(attributes.len());
    for name in order {
        if ordered.iter().any(|(n, _): &(String, _)| n == name) {
            continue;
        }
        let index = attributes
            .iter()
            .position(|(n, _)| n == name)
            .ok_or_else(|| ProgramError::UndeclaredAttribute(name.clone()))?;
        ordered.push(attributes.remove(index));
    }
    if let Some((missing, _)) = attributes.into_iter().next() {
        return Err(ProgramError::UnorderedAttribute(missing));
    }
    Ok(ordered)
}
