//! Offline conversion: quantize, partition and repack a float mesh.

use tracing::{info, warn};

use repack_core::chunking::{extract_chunk, partition_triangles, MeshChunk};
use repack_core::footprint::MemoryFootprint;
use repack_core::options::{CodecContext, RepackOptions};
use repack_core::pipeline::{repack_meshes, MeshOutcome};
use repack_core::quantization::PositionQuantizer;
use repack_core::source::{IndexSlice, PositionAttribute, SourceMesh};

use crate::error::ToolResult;
use crate::obj::ObjMesh;

/// Output slots addressable by a 16-bit index buffer.
const U16_SLOTS: usize = u16::MAX as usize + 1;

/// Index storage of one chunk. Remapped indices address output slots, so
/// the width follows the output capacity rather than the vertex count.
#[derive(Debug, Clone)]
enum ChunkIndices {
    U16(Vec<u16>),
    U32(Vec<u32>),
}

impl ChunkIndices {
    /// Narrows to 16 bits only when every slot below `max_output_vertices`
    /// fits, so padding can never push a remapped index out of range.
    fn from_chunk(chunk: &MeshChunk, max_output_vertices: usize) -> Self {
        if max_output_vertices <= U16_SLOTS {
            if let Some(v) = chunk.indices_u16() {
                return ChunkIndices::U16(v);
            }
        }
        ChunkIndices::U32(chunk.indices_u32())
    }

    fn as_slice(&self) -> IndexSlice<'_> {
        match self {
            ChunkIndices::U16(v) => IndexSlice::U16(v),
            ChunkIndices::U32(v) => IndexSlice::U32(v),
        }
    }
}

/// Quantized buffers of one chunk, ready to be borrowed by a `SourceMesh`.
#[derive(Debug)]
struct PreparedChunk {
    name: String,
    samples: Vec<u16>,
    indices: ChunkIndices,
    normals: Option<Vec<[f32; 3]>>,
}

impl PreparedChunk {
    fn source_mesh(&self) -> SourceMesh<'_> {
        let mut mesh = SourceMesh::new(PositionAttribute::packed_u16(&self.samples)).with_name(&self.name);
        mesh.indices = Some(self.indices.as_slice());
        if let Some(normals) = &self.normals {
            mesh = mesh.with_normals(normals);
        }
        mesh
    }
}

/// Outcome of converting one mesh.
#[derive(Debug)]
pub struct ConversionReport {
    pub outcomes: Vec<MeshOutcome>,
    /// Footprint of the mesh as plain 16-bit positions, all chunks included.
    pub baseline: MemoryFootprint,
}

impl ConversionReport {
    pub fn encoded_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    /// Summed footprint of the chunks that were encoded.
    pub fn footprint(&self) -> MemoryFootprint {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .fold(MemoryFootprint::default(), |acc, m| acc + m.footprint())
    }
}

/// Quantizes `mesh` over its bounding box, splits it into chunks of at most
/// `chunk_limit` vertices and repacks every chunk. The dequantization of
/// `options` is replaced by the one matching the quantization grid.
pub fn convert_mesh(mesh: &ObjMesh, options: &RepackOptions, chunk_limit: usize) -> ToolResult<ConversionReport> {
    let quantizer = PositionQuantizer::fit(&mesh.positions);
    let mut options = *options;
    options.set_dequantization(quantizer.dequantization());
    let ctx = CodecContext::new(options)?;

    let parts = partition_triangles(&mesh.positions, &mesh.triangles, chunk_limit)?;
    info!(
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        chunks = parts.len(),
        "partitioned input mesh"
    );

    let mut prepared = Vec::with_capacity(parts.len());
    let mut baseline = MemoryFootprint::default();
    for (i, part) in parts.iter().enumerate() {
        let chunk = extract_chunk(&mesh.positions, mesh.normals.as_deref(), &mesh.triangles, part)?;
        let indices = ChunkIndices::from_chunk(&chunk, ctx.max_output_vertices(chunk.vertex_count()));
        let index_slice = indices.as_slice();
        baseline = baseline
            + MemoryFootprint::baseline(
                chunk.vertex_count(),
                index_slice.len(),
                index_slice.width(),
                ctx.normal_format(),
            );
        prepared.push(PreparedChunk {
            name: format!("part_{:04}", i),
            samples: quantizer.quantize_all(&chunk.positions),
            indices,
            normals: chunk.normals,
        });
    }

    let meshes: Vec<SourceMesh<'_>> = prepared.iter().map(PreparedChunk::source_mesh).collect();
    let outcomes = repack_meshes(&ctx, &meshes);
    for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
        warn!(chunk = %outcome.name, "chunk kept unencoded");
    }

    Ok(ConversionReport { outcomes, baseline })
}

#[cfg(test)]
mod tests {
    use super::*;
    use repack_core::block::OutputVertex;
    use repack_core::chunking::DEFAULT_CHUNK_LIMIT;
    use repack_core::data_types::IndexWidth;

    fn grid_mesh(side: usize) -> ObjMesh {
        let mut positions = Vec::new();
        for y in 0..side {
            for x in 0..side {
                positions.push([x as f32, y as f32, 0.0]);
            }
        }
        let mut triangles = Vec::new();
        for y in 0..side - 1 {
            for x in 0..side - 1 {
                let i = (y * side + x) as u32;
                let s = side as u32;
                triangles.push([i, i + 1, i + s]);
                triangles.push([i + 1, i + s + 1, i + s]);
            }
        }
        ObjMesh { positions, normals: None, triangles }
    }

    #[test]
    fn test_convert_splits_and_encodes() {
        let mesh = grid_mesh(12);
        let mut options = RepackOptions::new();
        options.set_capacity_factor(96.0);
        let report = convert_mesh(&mesh, &options, 50).unwrap();
        assert!(report.outcomes.len() > 1);
        assert_eq!(report.encoded_count(), report.outcomes.len());
        assert!(report.footprint().total() > 0);
        assert!(report.baseline.total() > 0);
        // 50 vertices at 96 slots each stay within 16-bit indices.
        for outcome in &report.outcomes {
            let out = outcome.result.as_ref().unwrap();
            assert_eq!(out.indices().width(), IndexWidth::U16);
        }
    }

    #[test]
    fn test_padded_chunk_gets_wide_indices() {
        // 400 disjoint triangles whose vertices alternate between two far
        // apart regions, so every vertex opens its own block.
        let mut positions = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..1200u32 {
            let side = if i % 2 == 0 { 0.0 } else { 1000.0 };
            positions.push([side + i as f32 * 0.01, 0.0, 0.0]);
        }
        for t in 0..400u32 {
            triangles.push([3 * t, 3 * t + 1, 3 * t + 2]);
        }
        let mesh = ObjMesh { positions, normals: None, triangles };

        let mut options = RepackOptions::new();
        options.set_capacity_factor(96.0);
        let report = convert_mesh(&mesh, &options, DEFAULT_CHUNK_LIMIT).unwrap();
        assert_eq!(report.outcomes.len(), 1);
        assert_eq!(report.encoded_count(), 1);

        let out = report.outcomes[0].result.as_ref().unwrap();
        assert!(out.output_vertex_count() > U16_SLOTS);
        assert_eq!(out.indices().width(), IndexWidth::U32);
        let max = out.indices().max_index().unwrap() as usize;
        assert!(max >= U16_SLOTS && max < out.output_vertex_count());
    }

    #[test]
    fn test_positions_survive_quantization() {
        let mesh = grid_mesh(4);
        let mut options = RepackOptions::new();
        options.set_capacity_factor(96.0);
        let report = convert_mesh(&mesh, &options, 1000).unwrap();
        let out = report.outcomes[0].result.as_ref().unwrap();
        let r = out.reconstructor().unwrap();
        // Single chunk: local vertex ids equal source ids.
        for (i, &slot) in out.remap().iter().enumerate() {
            let p = r.position(OutputVertex(slot)).unwrap();
            let expected = mesh.positions[i];
            for a in 0..3 {
                assert!((p[a] - expected[a]).abs() < 1e-3, "vertex {} axis {}", i, a);
            }
        }
    }
}
