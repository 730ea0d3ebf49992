//! Block-anchored delta encoding of 16-bit positions.
//!
//! # Packed delta format, version 1
//!
//! ```text
//!  31        22 21        12 11         2 1  0
//! +------------+------------+------------+----+
//! |  x + 512   |  y + 512   |  z + 512   | 00 |
//! +------------+------------+------------+----+
//! ```
//!
//! Each field stores `coordinate - anchor + 512` in 10 bits. A vertex whose
//! delta does not fit closes the current block: its remaining slots are
//! filled with [`PADDING_CODE`] and the vertex starts the next block, where
//! it becomes the anchor. Decoding is exact.

use tracing::debug;

use crate::arena::{ScratchArena, ScratchBuffer};
use crate::block::BlockSize;
use crate::error::{RepackError, RepackResult};
use crate::source::VertexView;

pub const DELTA_FORMAT_VERSION: u32 = 1;
pub const DELTA_BITS: u32 = 10;
pub const DELTA_BIAS: i32 = 1 << (DELTA_BITS - 1);
pub const DELTA_MASK: u32 = (1 << DELTA_BITS) - 1;
pub const X_SHIFT: u32 = 22;
pub const Y_SHIFT: u32 = 12;
pub const Z_SHIFT: u32 = 2;
/// Code written into padding slots. No index ever references them.
pub const PADDING_CODE: u32 = 0;

/// Packs the offset of `vertex` from `anchor`, or `None` when any axis falls
/// outside the 10-bit field.
pub fn pack_delta(anchor: [u16; 3], vertex: [u16; 3]) -> Option<u32> {
    let mut fields = [0u32; 3];
    for a in 0..3 {
        let biased = DELTA_BIAS + vertex[a] as i32 - anchor[a] as i32;
        if biased < 0 || biased as u32 > DELTA_MASK {
            return None;
        }
        fields[a] = biased as u32;
    }
    Some((fields[0] << X_SHIFT) | (fields[1] << Y_SHIFT) | (fields[2] << Z_SHIFT))
}

/// Signed per-axis offsets stored in `code`.
pub fn unpack_delta(code: u32) -> [i32; 3] {
    [
        ((code >> X_SHIFT) & DELTA_MASK) as i32 - DELTA_BIAS,
        ((code >> Y_SHIFT) & DELTA_MASK) as i32 - DELTA_BIAS,
        ((code >> Z_SHIFT) & DELTA_MASK) as i32 - DELTA_BIAS,
    ]
}

/// `anchor + unpack_delta(code)`, in the integer domain.
pub fn decode_position(anchor: [u16; 3], code: u32) -> [i32; 3] {
    let delta = unpack_delta(code);
    [
        anchor[0] as i32 + delta[0],
        anchor[1] as i32 + delta[1],
        anchor[2] as i32 + delta[2],
    ]
}

/// Core repacking loop over caller-provided buffers.
///
/// Reads `view` at its stride, writes one anchor per started block into
/// `anchors`, one code per output slot into `deltas` and the new slot of
/// every source vertex into `remap`. Returns the real output vertex count,
/// or [`RepackError::CapacityOverflow`] when more than `max_output_vertices`
/// slots would be needed; partial output must then be discarded.
pub fn repack_into(
    block_size: BlockSize,
    view: &VertexView<'_>,
    max_output_vertices: usize,
    anchors: &mut [[u16; 3]],
    deltas: &mut [u32],
    remap: &mut [u32],
) -> RepackResult<usize> {
    let vertex_count = view.len();
    if deltas.len() < max_output_vertices {
        return Err(RepackError::invalid_parameter(format!(
            "delta buffer holds {} codes, capacity is {}",
            deltas.len(),
            max_output_vertices
        )));
    }
    if anchors.len() < block_size.block_count(max_output_vertices) {
        return Err(RepackError::invalid_parameter(format!(
            "anchor buffer holds {} blocks, capacity needs {}",
            anchors.len(),
            block_size.block_count(max_output_vertices)
        )));
    }
    if remap.len() < vertex_count {
        return Err(RepackError::invalid_parameter(format!(
            "remap table holds {} entries for {} vertices",
            remap.len(),
            vertex_count
        )));
    }

    let overflow = RepackError::CapacityOverflow { capacity: max_output_vertices, vertex_count };
    let bs = block_size.as_usize();
    let mut slot = 0usize;
    let mut i = 0usize;
    while i < vertex_count {
        if slot >= max_output_vertices {
            return Err(overflow);
        }
        let vertex = view.vertex(i);
        let block = slot / bs;
        if block_size.is_block_start(slot) {
            anchors[block] = vertex;
        }

        match pack_delta(anchors[block], vertex) {
            Some(code) => {
                deltas[slot] = code;
                remap[i] = slot as u32;
                slot += 1;
                i += 1;
            }
            None => {
                // Close the block; the vertex is retried as the next anchor.
                while !block_size.is_block_start(slot) {
                    if slot >= max_output_vertices {
                        return Err(overflow);
                    }
                    deltas[slot] = PADDING_CODE;
                    slot += 1;
                }
            }
        }
    }
    Ok(slot)
}

/// Output of one encode call, still held in scratch memory.
#[derive(Debug)]
pub struct EncodedBlocks<'s> {
    output_vertex_count: usize,
    block_count: usize,
    source_vertex_count: usize,
    anchors: ScratchBuffer<'s, [u16; 3]>,
    deltas: ScratchBuffer<'s, u32>,
    remap: ScratchBuffer<'s, u32>,
}

impl<'s> EncodedBlocks<'s> {
    pub fn output_vertex_count(&self) -> usize {
        self.output_vertex_count
    }

    pub fn block_count(&self) -> usize {
        self.block_count
    }

    pub fn source_vertex_count(&self) -> usize {
        self.source_vertex_count
    }

    /// Old → new vertex index table, one entry per source vertex.
    pub fn remap_table(&self) -> &[u32] {
        &self.remap[..self.source_vertex_count]
    }

    pub fn anchors(&self) -> &[[u16; 3]] {
        &self.anchors[..self.block_count]
    }

    pub fn deltas(&self) -> &[u32] {
        &self.deltas[..self.output_vertex_count]
    }

    pub fn copy_out_deltas(&self) -> Vec<u32> {
        self.deltas.copy_out(self.output_vertex_count)
    }

    pub fn copy_out_anchors(&self) -> Vec<[u16; 3]> {
        self.anchors.copy_out(self.block_count)
    }

    pub fn copy_out_remap(&self) -> Vec<u32> {
        self.remap.copy_out(self.source_vertex_count)
    }
}

/// Runs [`repack_into`] on scratch buffers sized for `max_output_vertices`.
#[derive(Debug, Clone, Copy)]
pub struct DeltaEncoder {
    block_size: BlockSize,
}

impl DeltaEncoder {
    pub fn new(block_size: BlockSize) -> Self {
        Self { block_size }
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    pub fn encode<'s>(
        &self,
        arena: &ScratchArena<'s>,
        view: &VertexView<'_>,
        max_output_vertices: usize,
    ) -> RepackResult<EncodedBlocks<'s>> {
        let input = arena.alloc_copy(view.samples());
        let mut deltas = arena.alloc::<u32>(max_output_vertices);
        let mut anchors = arena.alloc::<[u16; 3]>(self.block_size.anchor_capacity(max_output_vertices));
        let mut remap = arena.alloc::<u32>(view.len());

        let input_view = VertexView::new(&input, view.stride(), view.len())?;
        let output_vertex_count = repack_into(
            self.block_size,
            &input_view,
            max_output_vertices,
            &mut anchors,
            &mut deltas,
            &mut remap,
        )?;
        drop(input);

        let block_count = self.block_size.block_count(output_vertex_count);
        debug!(
            vertices = view.len(),
            output_vertices = output_vertex_count,
            padding = output_vertex_count - view.len(),
            blocks = block_count,
            "delta encoding done"
        );

        Ok(EncodedBlocks {
            output_vertex_count,
            block_count,
            source_vertex_count: view.len(),
            anchors,
            deltas,
            remap,
        })
    }
}
