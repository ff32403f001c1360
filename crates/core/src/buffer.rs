//! Growable CPU-side vertex storage.
//!
//! `VertexBuffer` owns the raw bytes of every vertex plus the count of
//! vertices in use. Capacity is the byte length of the backing storage; the
//! invariant `count * byte_per_vertex <= capacity` holds after every
//! mutating call. Growth keeps all existing bytes in place, so vertex
//! identities are never reordered by growing.

use crate::error::ProgramError;

/// Byte storage for one program's vertices.
#[derive(Debug, Clone)]
pub struct VertexBuffer {
    bytes: Vec<u8>,
    byte_per_vertex: usize,
    count: usize,
    dirty: bool,
}

impl VertexBuffer {
    /// Creates a zero-filled buffer with room for `capacity` vertices.
    pub fn new(byte_per_vertex: usize, capacity: usize) -> Self {
        Self {
            bytes: vec![0; byte_per_vertex * capacity],
            byte_per_vertex,
            count: 0,
            dirty: false,
        }
    }

    pub fn byte_per_vertex(&self) -> usize {
        self.byte_per_vertex
    }

    /// Number of vertices in use.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Size of the backing storage in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.bytes.len()
    }

    /// Number of whole vertices the backing storage can hold.
    pub fn capacity_vertices(&self) -> usize {
        match self.byte_per_vertex {
            0 => usize::MAX,
            bpv => self.bytes.len() / bpv,
        }
    }

    /// The whole backing storage, including unused capacity.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Mutable access to the backing storage. Marks the buffer dirty.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        self.dirty = true;
        &mut self.bytes
    }

    /// The bytes of the vertices in use.
    pub fn used(&self) -> &[u8] {
        &self.bytes[..self.count * self.byte_per_vertex]
    }

    /// Whether the contents changed since the last [`take_dirty`](Self::take_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Returns the dirty flag and clears it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    /// Appends one encoded vertex, doubling capacity if it is full, and
    /// returns the new vertex's index.
    ///
    /// `vertex` must be exactly `byte_per_vertex` bytes.
    pub fn push(&mut self, vertex: &[u8]) -> usize {
        debug_assert_eq!(vertex.len(), self.byte_per_vertex);
        let index = self.count;
        let start = index * self.byte_per_vertex;
        let end = start + self.byte_per_vertex;
        if end > self.bytes.len() {
            self.grow_to(end.max(self.bytes.len() * 2));
        }
        self.bytes[start..end].copy_from_slice(vertex);
        self.count += 1;
        self.dirty = true;
        index
    }

    /// Overwrites the vertex at `index`, which must lie within capacity.
    pub fn write(&mut self, index: usize, vertex: &[u8]) {
        let start = index * self.byte_per_vertex;
        self.bytes[start..start + self.byte_per_vertex].copy_from_slice(vertex);
        self.dirty = true;
    }

    /// Splices `external` in at `byte_offset`, growing to an exact fit when
    /// it would overrun capacity, then sets the count to the number of whole
    /// vertices covered by `byte_offset + external.len()`.
    ///
    /// # Errors
    ///
    /// `ProgramError::BufferOverflow` when the end offset does not fit in
    /// `usize`; the buffer is left untouched.
    pub fn append_bytes(&mut self, external: &[u8], byte_offset: usize) -> Result<(), ProgramError> {
        let end = byte_offset
            .checked_add(external.len())
            .ok_or_else(|| ProgramError::BufferOverflow {
                what: format!("{} bytes at offset {byte_offset}", external.len()),
            })?;
        if end > self.bytes.len() {
            self.grow_to(end);
        }
        self.bytes[byte_offset..end].copy_from_slice(external);
        self.count = match self.byte_per_vertex {
            0 => 0,
            bpv => end / bpv,
        };
        self.dirty = true;
        Ok(())
    }

    /// Overrides the vertex count, growing to an exact fit if needed.
    ///
    /// # Errors
    ///
    /// `ProgramError::BufferOverflow` when `count` vertices would not fit in
    /// `usize` bytes; the count is left unchanged.
    pub fn set_count(&mut self, count: usize) -> Result<(), ProgramError> {
        let needed = count
            .checked_mul(self.byte_per_vertex)
            .ok_or_else(|| ProgramError::BufferOverflow {
                what: format!("{count} vertices of {} bytes", self.byte_per_vertex),
            })?;
        if needed > self.bytes.len() {
            self.grow_to(needed);
        }
        self.count = count;
        self.dirty = true;
        Ok(())
    }

    /// Drops the last vertex from the count; its bytes stay in place.
    pub fn pop(&mut self) {
        self.count = self.count.saturating_sub(1);
        self.dirty = true;
    }

    fn grow_to(&mut self, bytes: usize) {
        log::debug!(
            "vertex buffer grows from {} to {} bytes ({} vertices in use)",
            self.bytes.len(),
            bytes,
            self.count
        );
        self.bytes.resize(bytes, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(fill: u8, len: usize) -> Vec<u8> {
        vec![fill; len]
    }

    #[test]
    fn new_allocates_capacity_times_stride() {
        let buf = VertexBuffer::new(16, 8);
        assert_eq!(buf.capacity_bytes(), 128);
        assert_eq!(buf.capacity_vertices(), 8);
        assert_eq!(buf.count(), 0);
        assert!(!buf.is_dirty());
    }

    #[test]
    fn push_returns_sequential_indices_and_marks_dirty() {
        let mut buf = VertexBuffer::new(4, 4);
        assert_eq!(buf.push(&vertex(1, 4)), 0);
        assert_eq!(buf.push(&vertex(2, 4)), 1);
        assert_eq!(buf.count(), 2);
        assert!(buf.take_dirty());
        assert!(!buf.is_dirty(), "take_dirty should clear the flag");
    }

    #[test]
    fn push_past_capacity_doubles_and_keeps_bytes() {
        let mut buf = VertexBuffer::new(4, 2);
        buf.push(&vertex(1, 4));
        buf.push(&vertex(2, 4));
        assert_eq!(buf.capacity_bytes(), 8);
        buf.push(&vertex(3, 4));
        assert_eq!(buf.capacity_bytes(), 16);
        assert_eq!(buf.used(), &[1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3]);
    }

    #[test]
    fn push_into_zero_capacity_grows_to_fit() {
        let mut buf = VertexBuffer::new(8, 0);
        buf.push(&vertex(7, 8));
        assert_eq!(buf.capacity_bytes(), 8);
        assert_eq!(buf.count(), 1);
    }

    #[test]
    fn push_after_exact_fit_append_still_grows() {
        let mut buf = VertexBuffer::new(16, 0);
        buf.append_bytes(&[0; 40], 0).unwrap();
        assert_eq!(buf.count(), 2);
        buf.push(&vertex(9, 16));
        assert!(buf.capacity_bytes() >= 48);
        assert_eq!(&buf.used()[32..], &[9; 16]);
    }

    #[test]
    fn append_bytes_sets_count_from_end_offset() {
        let mut buf = VertexBuffer::new(16, 0);
        buf.append_bytes(&[1; 32], 0).unwrap();
        assert_eq!(buf.count(), 2);
        buf.append_bytes(&[2; 48], 32).unwrap();
        assert!(buf.capacity_bytes() >= 80);
        assert_eq!(buf.count(), 5);
        assert_eq!(&buf.used()[..32], &[1; 32]);
        assert_eq!(&buf.used()[32..], &[2; 48]);
    }

    #[test]
    fn append_bytes_grows_to_exact_fit() {
        let mut buf = VertexBuffer::new(16, 1);
        buf.append_bytes(&[0; 48], 32).unwrap();
        assert_eq!(buf.capacity_bytes(), 80);
    }

    #[test]
    fn append_within_capacity_does_not_grow() {
        let mut buf = VertexBuffer::new(16, 10);
        buf.append_bytes(&[5; 16], 16).unwrap();
        assert_eq!(buf.capacity_bytes(), 160);
        assert_eq!(buf.count(), 2);
    }

    #[test]
    fn set_count_grows_when_needed() {
        let mut buf = VertexBuffer::new(12, 1);
        buf.set_count(3).unwrap();
        assert_eq!(buf.count(), 3);
        assert_eq!(buf.capacity_bytes(), 36);
        buf.set_count(0).unwrap();
        assert_eq!(buf.count(), 0);
        assert_eq!(buf.capacity_bytes(), 36, "shrinking the count keeps storage");
    }

    #[test]
    fn write_overwrites_in_place() {
        let mut buf = VertexBuffer::new(2, 2);
        buf.push(&[1, 1]);
        buf.push(&[2, 2]);
        buf.take_dirty();
        buf.write(0, &[9, 9]);
        assert_eq!(buf.used(), &[9, 9, 2, 2]);
        assert!(buf.is_dirty());
    }

    #[test]
    fn append_at_overflowing_offset_is_an_error() {
        let mut buf = VertexBuffer::new(4, 2);
        buf.push(&[1; 4]);
        let err = buf.append_bytes(&[0; 8], usize::MAX - 3).unwrap_err();
        assert!(matches!(err, ProgramError::BufferOverflow { .. }), "got {err:?}");
        assert_eq!(buf.count(), 1);
        assert_eq!(buf.capacity_bytes(), 8);
    }

    #[test]
    fn set_count_past_addressable_size_is_an_error() {
        let mut buf = VertexBuffer::new(16, 1);
        assert!(buf.set_count(usize::MAX / 8).is_err());
        assert_eq!(buf.count(), 0);
    }

    #[test]
    fn pop_saturates_at_zero() {
        let mut buf = VertexBuffer::new(4, 1);
        buf.pop();
        assert_eq!(buf.count(), 0);
    }

    #[test]
    fn zero_stride_buffer_counts_without_storage() {
        let mut buf = VertexBuffer::new(0, 4);
        assert_eq!(buf.push(&[]), 0);
        assert_eq!(buf.push(&[]), 1);
        assert_eq!(buf.capacity_bytes(), 0);
        assert!(buf.used().is_empty());
    }

    // -- Property-based tests --

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn capacity_invariant_holds_after_every_push(
                stride in 1_usize..32,
                initial in 0_usize..4,
                pushes in 0_usize..64,
            ) {
                let mut buf = VertexBuffer::new(stride, initial);
                for i in 0..pushes {
                    buf.push(&vec![(i % 251) as u8; stride]);
                    prop_assert!(buf.count() * stride <= buf.capacity_bytes());
                }
                for i in 0..pushes {
                    let at = i * stride;
                    prop_assert!(buf.used()[at..at + stride].iter().all(|b| *b == (i % 251) as u8));
                }
            }

            #[test]
            fn append_count_is_floor_of_end_over_stride(
                stride in 1_usize..32,
                offset in 0_usize..256,
                len in 0_usize..256,
            ) {
                let mut buf = VertexBuffer::new(stride, 1);
                buf.append_bytes(&vec![1u8; len], offset).unwrap();
                prop_assert_eq!(buf.count(), (offset + len) / stride);
                prop_assert!(buf.capacity_bytes() >= offset + len);
                prop_assert!(buf.count() * stride <= buf.capacity_bytes());
            }
        }
    }
}
