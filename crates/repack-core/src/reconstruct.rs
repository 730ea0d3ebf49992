//! CPU rendition of the per-vertex reconstruction a shading stage performs:
//! block lookup, anchor fetch, delta unpack, add, dequantize.

use crate::block::{BlockSize, OutputVertex};
use crate::delta::decode_position;
use crate::error::{RepackError, RepackResult};
use crate::quantization::PositionDequantization;
use crate::texture::AnchorTexture;

/// Borrowed view over the packed buffers of one mesh. Holds no state of its
/// own, so repeated calls return bit-identical results.
#[derive(Debug, Clone, Copy)]
pub struct Reconstructor<'a> {
    block_size: BlockSize,
    anchors: &'a AnchorTexture,
    deltas: &'a [u32],
    dequantization: PositionDequantization,
}

impl<'a> Reconstructor<'a> {
    pub fn new(
        block_size: BlockSize,
        anchors: &'a AnchorTexture,
        deltas: &'a [u32],
        dequantization: PositionDequantization,
    ) -> Self {
        Self { block_size, anchors, deltas, dequantization }
    }

    pub fn vertex_count(&self) -> usize {
        self.deltas.len()
    }

    /// Integer grid coordinate of `vertex`.
    ///
    /// Padding slots decode to `anchor - 512` on every axis, which may leave
    /// the 16-bit range; hence the signed result.
    pub fn grid_position(&self, vertex: OutputVertex) -> RepackResult<[i32; 3]> {
        let slot = usize::from(vertex);
        let code = *self
            .deltas
            .get(slot)
            .ok_or(RepackError::IndexOutOfRange { index: slot, len: self.deltas.len() })?;
        let block = usize::from(self.block_size.block_of(vertex));
        let anchor = self
            .anchors
            .anchor(block)
            .ok_or(RepackError::IndexOutOfRange { index: block, len: self.anchors.block_count() })?;
        Ok(decode_position(anchor, code))
    }

    /// Model-space position of `vertex`.
    pub fn position(&self, vertex: OutputVertex) -> RepackResult<[f32; 3]> {
        let grid = self.grid_position(vertex)?;
        let d = &self.dequantization;
        Ok([
            grid[0] as f32 * d.scale[0] + d.offset[0],
            grid[1] as f32 * d.scale[1] + d.offset[1],
            grid[2] as f32 * d.scale[2] + d.offset[2],
        ])
    }

    /// Grid coordinates of every output slot, padding included.
    pub fn grid_positions(&self) -> RepackResult<Vec<[i32; 3]>> {
        (0..self.deltas.len() as u32).map(|v| self.grid_position(OutputVertex(v))).collect()
    }

    pub fn positions(&self) -> RepackResult<Vec<[f32; 3]>> {
        (0..self.deltas.len() as u32).map(|v| self.position(OutputVertex(v))).collect()
    }
}
