//! The GPU-free half of a render program: a compiled layout bound to a
//! growable vertex buffer.
//!
//! `VertexProgram` implements the buffer side of the render program
//! contract (`add`, `update`, `get`, `remove`, `count`/`set_count`,
//! `get_buffer`/`append_buffer`). The GL half in `render::RenderProgram`
//! wraps one of these and adds upload and draw.

use crate::buffer::VertexBuffer;
use crate::definition::ProgramDefinition;
use crate::error::ProgramError;
use crate::info::ProgramInfo;
use crate::value::Vertex;

/// Stable identity of a vertex within one program: its index.
pub type VertexId = usize;

/// A compiled layout plus the vertex buffer it governs.
#[derive(Debug, Clone)]
pub struct VertexProgram {
    info: ProgramInfo,
    buffer: VertexBuffer,
}

impl VertexProgram {
    /// Compiles `definition` and allocates its buffer.
    ///
    /// # Errors
    ///
    /// Returns any configuration error from [`ProgramInfo::compile`].
    pub fn new(definition: &ProgramDefinition) -> Result<Self, ProgramError> {
        Ok(Self::from_info(ProgramInfo::compile(definition)?))
    }

    /// Allocates a buffer for an already compiled layout.
    pub fn from_info(info: ProgramInfo) -> Self {
        let buffer = VertexBuffer::new(info.byte_per_vertex, info.capacity);
        Self { info, buffer }
    }

    pub fn info(&self) -> &ProgramInfo {
        &self.info
    }

    pub fn buffer(&self) -> &VertexBuffer {
        &self.buffer
    }

    pub(crate) fn buffer_mut(&mut self) -> &mut VertexBuffer {
        &mut self.buffer
    }

    /// Appends a vertex and returns its identity, growing the buffer if full.
    ///
    /// The n-th successful call returns `n - 1`. A failed call leaves the
    /// buffer untouched.
    ///
    /// # Errors
    ///
    /// `ValueShape` when a field does not fit its codec; in debug mode also
    /// `MissingField` for an absent attribute.
    pub fn add(&mut self, vertex: &Vertex) -> Result<VertexId, ProgramError> {
        let encoded = self.encode(vertex)?;
        Ok(self.buffer.push(&encoded))
    }

    /// Overwrites the vertex at `id` without changing the count.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` when `id` is past the count (debug mode) or past the
    /// buffer capacity (always), plus the errors of [`add`](Self::add).
    pub fn update(&mut self, id: VertexId, vertex: &Vertex) -> Result<(), ProgramError> {
        self.check_index(id)?;
        let encoded = self.encode(vertex)?;
        self.buffer.write(id, &encoded);
        Ok(())
    }

    /// Reads the vertex at `id` back into named fields.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` under the same rules as [`update`](Self::update).
    pub fn get(&self, id: VertexId) -> Result<Vertex, ProgramError> {
        self.check_index(id)?;
        let stride = self.info.byte_per_vertex;
        let bytes = self.buffer.bytes();
        Ok(self
            .info
            .attributes
            .iter()
            .map(|slot| (slot.name.as_str(), slot.codec.read(bytes, slot.position(id, stride))))
            .collect())
    }

    /// Removes the vertex at `id` by moving the last vertex into its slot.
    ///
    /// Returns the previous identity of the vertex that moved into `id`, or
    /// `None` when `id` was the last vertex. Callers holding that identity
    /// must remap it to `id`.
    ///
    /// # Errors
    ///
    /// `IndexOutOfRange` when `id` is not below the count, in any mode.
    pub fn remove(&mut self, id: VertexId) -> Result<Option<VertexId>, ProgramError> {
        let count = self.buffer.count();
        if id >= count {
            return Err(ProgramError::IndexOutOfRange { index: id, count });
        }
        let last = count - 1;
        let moved = if id == last {
            None
        } else {
            let stride = self.info.byte_per_vertex;
            let bytes = self.buffer.bytes_mut();
            for slot in &self.info.attributes {
                slot.codec
                    .move_value(bytes, slot.position(last, stride), slot.position(id, stride));
            }
            Some(last)
        };
        self.buffer.pop();
        Ok(moved)
    }

    pub fn count(&self) -> usize {
        self.buffer.count()
    }

    /// Overrides the vertex count, e.g. `set_count(0)` to clear without
    /// reallocating.
    ///
    /// # Errors
    ///
    /// `BufferOverflow` when `count` vertices cannot be addressed.
    pub fn set_count(&mut self, count: usize) -> Result<(), ProgramError> {
        self.buffer.set_count(count)
    }

    /// A copy of the bytes of the vertices in use.
    pub fn get_buffer(&self) -> Vec<u8> {
        self.buffer.used().to_vec()
    }

    /// Bulk-loads raw vertex bytes at `byte_offset`; see
    /// [`VertexBuffer::append_bytes`].
    ///
    /// # Errors
    ///
    /// `BufferOverflow` when `byte_offset + bytes.len()` overflows.
    pub fn append_buffer(&mut self, bytes: &[u8], byte_offset: usize) -> Result<(), ProgramError> {
        self.buffer.append_bytes(bytes, byte_offset)
    }

    fn check_index(&self, id: VertexId) -> Result<(), ProgramError> {
        let limit = if self.info.debug {
            self.buffer.count()
        } else {
            self.buffer.capacity_vertices()
        };
        if id < limit {
            Ok(())
        } else {
            Err(ProgramError::IndexOutOfRange {
                index: id,
                count: self.buffer.count(),
            })
        }
    }

    /// Encodes `vertex` into a scratch vertex so failures never leave a
    /// partial write behind.
    fn encode(&self, vertex: &Vertex) -> Result<Vec<u8>, ProgramError> {
        let mut scratch = vec![0u8; self.info.byte_per_vertex];
        for slot in &self.info.attributes {
            match vertex.get(&slot.name) {
                Some(value) => slot.codec.write(&mut scratch, slot.offset, &slot.name, value)?,
                None if self.info.debug => return Err(ProgramError::MissingField(slot.name.clone())),
                None => {}
            }
        }
        Ok(scratch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecKind;
    use crate::value::AttributeValue;

    const VS: &str = "attribute vec3 position;\nattribute vec4 color;\n";

    fn program(capacity: usize, debug: bool) -> VertexProgram {
        let def = ProgramDefinition::new(VS, "")
            .with_attribute("color", CodecKind::PackedColor)
            .with_capacity(capacity)
            .with_debug(debug);
        VertexProgram::new(&def).unwrap()
    }

    fn vertex(p: [f32; 3], color: u32) -> Vertex {
        Vertex::new().with("position", p).with("color", color)
    }

    #[test]
    fn two_adds_past_capacity_one_double_once() {
        let mut prog = program(1, false);
        assert_eq!(prog.buffer().capacity_bytes(), 16);
        assert_eq!(prog.add(&vertex([1.0, 2.0, 3.0], 0xff00_ff00)).unwrap(), 0);
        assert_eq!(prog.add(&vertex([4.0, 5.0, 6.0], 0x00ff_00ff)).unwrap(), 1);
        assert_eq!(prog.buffer().capacity_bytes(), 32, "expected exactly one doubling");

        let first = prog.get(0).unwrap();
        assert_eq!(
            first.get("position"),
            Some(&AttributeValue::Vector(vec![1.0, 2.0, 3.0]))
        );
        let second = prog.get(1).unwrap();
        assert_eq!(second.get("color"), Some(&AttributeValue::Packed(0x00ff_00ff)));
    }

    #[test]
    fn update_overwrites_without_changing_count() {
        let mut prog = program(4, true);
        prog.add(&vertex([0.0; 3], 1)).unwrap();
        prog.update(0, &vertex([7.0, 8.0, 9.0], 2)).unwrap();
        assert_eq!(prog.count(), 1);
        assert_eq!(prog.get(0).unwrap(), vertex([7.0, 8.0, 9.0], 2));
    }

    #[test]
    fn debug_update_out_of_range_fails() {
        let mut prog = program(4, true);
        prog.add(&vertex([0.0; 3], 1)).unwrap();
        let err = prog.update(1, &vertex([0.0; 3], 1)).unwrap_err();
        assert_eq!(err, ProgramError::IndexOutOfRange { index: 1, count: 1 });
        assert!(prog.get(3).is_err());
    }

    #[test]
    fn release_update_within_capacity_is_allowed() {
        let mut prog = program(4, false);
        assert!(prog.update(2, &vertex([1.0; 3], 3)).is_ok());
        assert_eq!(prog.count(), 0);
        assert!(prog.update(4, &vertex([1.0; 3], 3)).is_err(), "past capacity");
    }

    #[test]
    fn debug_missing_field_is_rejected() {
        let mut prog = program(4, true);
        let err = prog
            .add(&Vertex::new().with("position", [1.0_f32, 2.0, 3.0]))
            .unwrap_err();
        assert_eq!(err, ProgramError::MissingField("color".into()));
        assert_eq!(prog.count(), 0);
    }

    #[test]
    fn release_missing_field_writes_zeros() {
        let mut prog = program(4, false);
        prog.add(&Vertex::new().with("position", [1.0_f32, 2.0, 3.0]))
            .unwrap();
        assert_eq!(
            prog.get(0).unwrap().get("color"),
            Some(&AttributeValue::Packed(0))
        );
    }

    #[test]
    fn shape_error_leaves_buffer_untouched() {
        let mut prog = program(4, false);
        prog.add(&vertex([1.0, 2.0, 3.0], 5)).unwrap();
        let bad = Vertex::new()
            .with("position", [9.0_f32, 9.0, 9.0])
            .with("color", 1.5_f32);
        assert!(prog.update(0, &bad).is_err());
        assert_eq!(prog.get(0).unwrap(), vertex([1.0, 2.0, 3.0], 5));
        assert!(prog.add(&bad).is_err());
        assert_eq!(prog.count(), 1);
    }

    #[test]
    fn extra_fields_are_ignored() {
        let mut prog = program(2, true);
        let v = vertex([1.0, 1.0, 1.0], 1).with("unused", 3.0_f32);
        prog.add(&v).unwrap();
        assert_eq!(prog.get(0).unwrap().len(), 2);
    }

    #[test]
    fn remove_swaps_last_into_slot() {
        let mut prog = program(4, true);
        for i in 0..3_u32 {
            prog.add(&vertex([i as f32; 3], i)).unwrap();
        }
        assert_eq!(prog.remove(0).unwrap(), Some(2));
        assert_eq!(prog.count(), 2);
        assert_eq!(prog.get(0).unwrap(), vertex([2.0; 3], 2));
        assert_eq!(prog.get(1).unwrap(), vertex([1.0; 3], 1));
    }

    #[test]
    fn remove_last_moves_nothing() {
        let mut prog = program(4, true);
        prog.add(&vertex([0.0; 3], 0)).unwrap();
        prog.add(&vertex([1.0; 3], 1)).unwrap();
        assert_eq!(prog.remove(1).unwrap(), None);
        assert_eq!(prog.count(), 1);
        assert!(prog.remove(1).is_err());
    }

    #[test]
    fn set_count_resets_without_reallocating() {
        let mut prog = program(8, false);
        prog.add(&vertex([1.0; 3], 1)).unwrap();
        prog.add(&vertex([2.0; 3], 2)).unwrap();
        prog.set_count(0).unwrap();
        assert_eq!(prog.count(), 0);
        assert_eq!(prog.buffer().capacity_bytes(), 8 * 16);
        assert_eq!(prog.add(&vertex([3.0; 3], 3)).unwrap(), 0);
    }

    #[test]
    fn get_buffer_copies_only_used_bytes() {
        let mut prog = program(8, false);
        prog.add(&vertex([1.0; 3], 1)).unwrap();
        assert_eq!(prog.get_buffer().len(), 16);
    }

    #[test]
    fn buffer_round_trips_between_programs() {
        let mut source = program(2, false);
        for i in 0..5_u32 {
            source.add(&vertex([i as f32, 0.5, -1.0], 0x1020_3040 + i)).unwrap();
        }
        let saved = source.get_buffer();

        let mut restored = program(1, true);
        restored.append_buffer(&saved, 0).unwrap();
        assert_eq!(restored.count(), 5);
        for i in 0..5 {
            assert_eq!(restored.get(i).unwrap(), source.get(i).unwrap());
        }
    }

    #[test]
    fn append_buffer_matches_documented_sizes() {
        let vs = "attribute vec4 a;\n";
        let mut prog = VertexProgram::new(&ProgramDefinition::new(vs, "").with_capacity(0)).unwrap();
        assert_eq!(prog.info().byte_per_vertex, 16);
        prog.append_buffer(&[0; 32], 0).unwrap();
        assert_eq!(prog.count(), 2);
        prog.append_buffer(&[0; 48], 32).unwrap();
        assert!(prog.buffer().capacity_bytes() >= 80);
        assert_eq!(prog.count(), 5);
    }

    // -- Property-based tests --

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn growth_preserves_every_vertex(
                positions in proptest::collection::vec(proptest::array::uniform3(-1e4_f32..1e4), 1..64),
                colors in proptest::collection::vec(any::<u32>(), 64),
                capacity in 0_usize..4,
            ) {
                let mut prog = program(capacity, true);
                for (i, p) in positions.iter().enumerate() {
                    let id = prog.add(&vertex(*p, colors[i])).unwrap();
                    prop_assert_eq!(id, i);
                }
                prop_assert_eq!(prog.count(), positions.len());
                for (i, p) in positions.iter().enumerate() {
                    prop_assert_eq!(prog.get(i).unwrap(), vertex(*p, colors[i]));
                }
            }

            #[test]
            fn remove_keeps_the_other_vertices(
                count in 1_usize..20,
                victim in 0_usize..20,
            ) {
                let victim = victim % count;
                let mut prog = program(2, true);
                for i in 0..count {
                    prog.add(&vertex([i as f32; 3], i as u32)).unwrap();
                }
                prog.remove(victim).unwrap();
                let mut remaining: Vec<u32> = (0..prog.count())
                    .map(|i| match prog.get(i).unwrap().get("color") {
                        Some(AttributeValue::Packed(c)) => *c,
                        other => panic!("unexpected color {other:?}"),
                    })
                    .collect();
                remaining.sort_unstable();
                let expected: Vec<u32> = (0..count as u32).filter(|c| *c as usize != victim).collect();
                prop_assert_eq!(remaining, expected);
            }
        }
    }
}
