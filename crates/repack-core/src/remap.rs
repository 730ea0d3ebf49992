//! Index remapper: rewrites a triangle index list through the remap table
//! produced by the delta encoder, preserving the element width.

use num_traits::{AsPrimitive, PrimInt};

use crate::arena::ScratchArena;
use crate::data_types::IndexWidth;
use crate::error::{RepackError, RepackResult};
use crate::source::IndexSlice;

/// Integer types usable as index buffer elements.
pub trait IndexElement: PrimInt + AsPrimitive<usize> + Default {
    const WIDTH: IndexWidth;
}

impl IndexElement for u16 {
    const WIDTH: IndexWidth = IndexWidth::U16;
}

impl IndexElement for u32 {
    const WIDTH: IndexWidth = IndexWidth::U32;
}

/// Replaces every index `i` with `remap[i]`, in place.
///
/// An index outside the table yields [`RepackError::IndexOutOfRange`]; a
/// remapped value that does not fit `T` yields
/// [`RepackError::IndexWidthOverflow`]. On error `indices` may be partially
/// rewritten, so callers work on a scratch copy.
pub fn apply_remap<T: IndexElement>(indices: &mut [T], remap: &[u32]) -> RepackResult<()> {
    for index in indices.iter_mut() {
        let old: usize = index.as_();
        let new = *remap
            .get(old)
            .ok_or(RepackError::IndexOutOfRange { index: old, len: remap.len() })?;
        *index = num_traits::cast(new).ok_or(RepackError::IndexWidthOverflow { value: new, width: T::WIDTH })?;
    }
    Ok(())
}

/// Checks that every entry of `remap` addresses one of `output_vertex_count`
/// output slots.
pub fn validate_remap(remap: &[u32], output_vertex_count: usize) -> RepackResult<()> {
    match remap.iter().find(|&&new| new as usize >= output_vertex_count) {
        Some(&new) => Err(RepackError::IndexOutOfRange { index: new as usize, len: output_vertex_count }),
        None => Ok(()),
    }
}

/// Owned index buffer with its element width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexBuffer {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl IndexBuffer {
    pub fn width(&self) -> IndexWidth {
        match self {
            IndexBuffer::U16(_) => IndexWidth::U16,
            IndexBuffer::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(v) => v.len(),
            IndexBuffer::U32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.width().byte_length()
    }

    /// The logical index sequence, independent of width.
    pub fn to_u32_vec(&self) -> Vec<u32> {
        match self {
            IndexBuffer::U16(v) => v.iter().map(|&i| i as u32).collect(),
            IndexBuffer::U32(v) => v.clone(),
        }
    }

    pub fn max_index(&self) -> Option<u32> {
        match self {
            IndexBuffer::U16(v) => v.iter().max().map(|&i| i as u32),
            IndexBuffer::U32(v) => v.iter().max().copied(),
        }
    }
}

/// Copies `indices` into scratch memory, remaps it there and copies the
/// result back out. The source buffer is never touched.
pub fn remap_indices(arena: &ScratchArena<'_>, indices: IndexSlice<'_>, remap: &[u32]) -> RepackResult<IndexBuffer> {
    match indices {
        IndexSlice::U16(src) => {
            let mut scratch = arena.alloc_copy(src);
            apply_remap(&mut scratch[..], remap)?;
            Ok(IndexBuffer::U16(scratch.copy_out(src.len())))
        }
        IndexSlice::U32(src) => {
            let mut scratch = arena.alloc_copy(src);
            apply_remap(&mut scratch[..], remap)?;
            Ok(IndexBuffer::U32(scratch.copy_out(src.len())))
        }
    }
}
