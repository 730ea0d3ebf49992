//! End-to-end repacking of one mesh or a batch of meshes.

use std::io::{self, Write};
use std::time::Instant;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::{debug, info, warn};

use crate::arena::ScratchArena;
use crate::block::BlockSize;
use crate::delta::DeltaEncoder;
use crate::error::RepackResult;
use crate::footprint::MemoryFootprint;
use crate::normals::{requantize_normals, NormalFormat, QuantizedNormals};
use crate::options::CodecContext;
use crate::reconstruct::Reconstructor;
use crate::remap::{remap_indices, IndexBuffer};
use crate::shader::ShaderUniforms;
use crate::source::{adapt, SourceMesh};
use crate::texture::{pack_anchor_texture, AnchorTexture};

/// Every artifact produced for one mesh, in caller-owned memory.
#[derive(Debug, Clone)]
pub struct RepackedMesh {
    name: Option<String>,
    source_vertex_count: usize,
    deltas: Vec<u32>,
    remap: Vec<u32>,
    indices: IndexBuffer,
    normals: QuantizedNormals,
    anchors: AnchorTexture,
    uniforms: ShaderUniforms,
}

impl RepackedMesh {
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn source_vertex_count(&self) -> usize {
        self.source_vertex_count
    }

    /// Output vertex count `R`, padding included.
    pub fn output_vertex_count(&self) -> usize {
        self.deltas.len()
    }

    pub fn block_count(&self) -> usize {
        self.anchors.block_count()
    }

    /// One packed delta per output vertex.
    pub fn deltas(&self) -> &[u32] {
        &self.deltas
    }

    /// Old → new vertex index table.
    pub fn remap(&self) -> &[u32] {
        &self.remap
    }

    pub fn indices(&self) -> &IndexBuffer {
        &self.indices
    }

    pub fn normals(&self) -> &QuantizedNormals {
        &self.normals
    }

    pub fn anchors(&self) -> &AnchorTexture {
        &self.anchors
    }

    pub fn uniforms(&self) -> &ShaderUniforms {
        &self.uniforms
    }

    /// `R / N`; 1.0 for an empty mesh.
    pub fn expansion_ratio(&self) -> f64 {
        if self.source_vertex_count == 0 {
            return 1.0;
        }
        self.output_vertex_count() as f64 / self.source_vertex_count as f64
    }

    pub fn footprint(&self) -> MemoryFootprint {
        MemoryFootprint::new(
            self.deltas.len() * std::mem::size_of::<u32>(),
            self.normals.byte_len(),
            self.indices.byte_len(),
            &self.anchors.descriptor(),
        )
    }

    /// Footprint of the source mesh stored as plain 16-bit positions.
    pub fn baseline_footprint(&self) -> MemoryFootprint {
        MemoryFootprint::baseline(
            self.source_vertex_count,
            self.indices.len(),
            self.indices.width(),
            self.normals.format(),
        )
    }

    pub fn reconstructor(&self) -> RepackResult<Reconstructor<'_>> {
        let block_size = BlockSize::new(self.uniforms.block_size)?;
        Ok(Reconstructor::new(block_size, &self.anchors, &self.deltas, self.uniforms.dequantization))
    }

    pub fn write_deltas<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for &code in &self.deltas {
            writer.write_u32::<LittleEndian>(code)?;
        }
        Ok(())
    }

    /// Writes the rewritten index buffer at its own element width.
    pub fn write_indices<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        match &self.indices {
            IndexBuffer::U16(v) => {
                for &i in v {
                    writer.write_u16::<LittleEndian>(i)?;
                }
            }
            IndexBuffer::U32(v) => {
                for &i in v {
                    writer.write_u32::<LittleEndian>(i)?;
                }
            }
        }
        Ok(())
    }

    pub fn write_normals<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for n in self.normals.values() {
            for &c in n {
                match self.normals.format() {
                    NormalFormat::Snorm8 => writer.write_i8(c as i8)?,
                    NormalFormat::Snorm16 => writer.write_i16::<LittleEndian>(c)?,
                }
            }
        }
        Ok(())
    }

    pub fn write_anchors<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        self.anchors.write_texels(writer)
    }
}

/// Repacks `mesh` with the context's default output capacity,
/// `floor(N * capacity_factor)`.
pub fn repack_mesh(ctx: &CodecContext, mesh: &SourceMesh<'_>) -> RepackResult<RepackedMesh> {
    let capacity = ctx.max_output_vertices(mesh.positions.count);
    repack_mesh_with_capacity(ctx, mesh, capacity)
}

/// Repacks `mesh` with an explicit output capacity. On any error every
/// scratch buffer of the call has been released and the mesh is untouched.
pub fn repack_mesh_with_capacity(
    ctx: &CodecContext,
    mesh: &SourceMesh<'_>,
    max_output_vertices: usize,
) -> RepackResult<RepackedMesh> {
    let start = Instant::now();
    let source = adapt(mesh)?;

    let arena = ScratchArena::new(ctx.arena_stats());
    let encoded = DeltaEncoder::new(ctx.block_size()).encode(&arena, &source.view, max_output_vertices)?;
    let output_vertex_count = encoded.output_vertex_count();

    let indices = remap_indices(&arena, source.indices, encoded.remap_table())?;
    let normals = requantize_normals(source.normals, encoded.remap_table(), output_vertex_count, ctx.normal_format())?;
    let anchors = pack_anchor_texture(encoded.anchors(), ctx.texture_width())?;

    let deltas = encoded.copy_out_deltas();
    let remap = encoded.copy_out_remap();
    drop(encoded);

    let uniforms = ShaderUniforms {
        block_size: ctx.block_size().get(),
        texture_width: anchors.width(),
        texture_height: anchors.height(),
        dequantization: ctx.dequantization(),
    };
    let repacked = RepackedMesh {
        name: mesh.name.map(str::to_owned),
        source_vertex_count: source.view.len(),
        deltas,
        remap,
        indices,
        normals,
        anchors,
        uniforms,
    };

    info!(
        mesh = mesh.display_name(),
        vertices = repacked.source_vertex_count,
        output_vertices = repacked.output_vertex_count(),
        expansion = repacked.expansion_ratio(),
        blocks = repacked.block_count(),
        texture_width = repacked.anchors.width(),
        texture_height = repacked.anchors.height(),
        "mesh repacked"
    );
    debug!(mesh = mesh.display_name(), elapsed = ?start.elapsed(), "repack timing");

    Ok(repacked)
}

/// Result of one mesh in a batch.
#[derive(Debug)]
pub struct MeshOutcome {
    pub index: usize,
    pub name: String,
    pub result: RepackResult<RepackedMesh>,
}

impl MeshOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Repacks `meshes` one after another. A failing mesh is logged and skipped;
/// it keeps its original geometry and the batch continues.
pub fn repack_meshes(ctx: &CodecContext, meshes: &[SourceMesh<'_>]) -> Vec<MeshOutcome> {
    let mut outcomes = Vec::with_capacity(meshes.len());
    for (index, mesh) in meshes.iter().enumerate() {
        let result = repack_mesh(ctx, mesh);
        if let Err(err) = &result {
            warn!(
                mesh = mesh.display_name(),
                kind = err.kind().name(),
                error = %err,
                "mesh left unencoded"
            );
        }
        outcomes.push(MeshOutcome { index, name: mesh.display_name().to_owned(), result });
    }

    let encoded = outcomes.iter().filter(|o| o.is_ok()).count();
    info!(meshes = meshes.len(), encoded, skipped = meshes.len() - encoded, "batch done");
    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::OutputVertex;
    use crate::error::{ErrorKind, RepackError};
    use crate::options::RepackOptions;
    use crate::source::PositionAttribute;

    fn grid(n: usize) -> Vec<u16> {
        (0..n).flat_map(|i| [i as u16 * 3, 7, 1000 - i as u16]).collect()
    }

    #[test]
    fn test_repack_small_mesh() {
        let ctx = CodecContext::new(RepackOptions::default()).unwrap();
        let samples = grid(4);
        let indices = [0u16, 1, 2, 2, 1, 3];
        let mesh = SourceMesh::new(PositionAttribute::packed_u16(&samples)).with_indices(&indices[..]);
        let out = repack_mesh(&ctx, &mesh).unwrap();

        assert_eq!(out.output_vertex_count(), 4);
        assert_eq!(out.block_count(), 1);
        assert_eq!(out.indices(), &IndexBuffer::U16(vec![0, 1, 2, 2, 1, 3]));
        assert!(out.normals().is_placeholder());
        assert_eq!(out.anchors().height(), 1);
        assert_eq!(out.expansion_ratio(), 1.0);
        assert_eq!(out.uniforms().block_size, 96);
        assert_eq!(ctx.arena_stats().live(), 0);

        let r = out.reconstructor().unwrap();
        for v in 0..4u32 {
            let p = r.grid_position(OutputVertex(v)).unwrap();
            let s = &samples[v as usize * 3..v as usize * 3 + 3];
            assert_eq!(p, [s[0] as i32, s[1] as i32, s[2] as i32]);
        }
    }

    #[test]
    fn test_artifact_bytes() {
        let ctx = CodecContext::new(RepackOptions::default()).unwrap();
        let samples = grid(3);
        let indices = [0u32, 1, 2];
        let normals = [[0.0, 0.0, 1.0]; 3];
        let mesh = SourceMesh::new(PositionAttribute::packed_u16(&samples))
            .with_indices(&indices[..])
            .with_normals(&normals);
        let out = repack_mesh(&ctx, &mesh).unwrap();

        let mut deltas = Vec::new();
        out.write_deltas(&mut deltas).unwrap();
        assert_eq!(deltas.len(), 12);
        let mut idx = Vec::new();
        out.write_indices(&mut idx).unwrap();
        assert_eq!(idx.len(), 12);
        let mut nrm = Vec::new();
        out.write_normals(&mut nrm).unwrap();
        assert_eq!(nrm.len(), out.normals().byte_len());
        let mut tex = Vec::new();
        out.write_anchors(&mut tex).unwrap();
        assert_eq!(tex.len(), out.anchors().byte_len());
        assert_eq!(out.footprint().total(), 12 + 12 + 18 + 1024 * 8);
    }

    #[test]
    fn test_batch_continues_after_failure() {
        let ctx = CodecContext::new(RepackOptions::default()).unwrap();
        let samples = grid(3);
        let indices = [0u16, 1, 2];
        let meshes = [
            SourceMesh::new(PositionAttribute::packed_u16(&samples)).with_name("no-index"),
            SourceMesh::new(PositionAttribute::packed_u16(&samples))
                .with_name("ok")
                .with_indices(&indices[..]),
        ];
        let outcomes = repack_meshes(&ctx, &meshes);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].name, "no-index");
        assert_eq!(outcomes[0].result.as_ref().unwrap_err(), &RepackError::MissingIndexBuffer);
        assert!(outcomes[1].is_ok());
        assert_eq!(ctx.arena_stats().live(), 0);
    }

    #[test]
    fn test_overflow_then_retry_with_more_capacity() {
        let ctx = CodecContext::new(RepackOptions::default()).unwrap();
        // Every other vertex jumps far away, forcing a new block each time.
        let samples: Vec<u16> = (0..4u16).flat_map(|i| [i * 10000, 0, 0]).collect();
        let indices = [0u16, 1, 2, 3];
        let mesh = SourceMesh::new(PositionAttribute::packed_u16(&samples)).with_indices(&indices[..]);

        let err = repack_mesh(&ctx, &mesh).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityOverflow);
        assert_eq!(ctx.arena_stats().live(), 0);

        let out = repack_mesh_with_capacity(&ctx, &mesh, 4 * 96).unwrap();
        assert_eq!(out.output_vertex_count(), 3 * 96 + 1);
        assert_eq!(out.remap(), &[0, 96, 192, 288]);
        assert_eq!(out.indices().to_u32_vec(), vec![0, 96, 192, 288]);
    }
}
