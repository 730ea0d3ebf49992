use proptest::prelude::*;

use repack_core::block::OutputVertex;
use repack_core::data_types::IndexWidth;
use repack_core::options::{CodecContext, RepackOptions};
use repack_core::pipeline::{repack_mesh_with_capacity, RepackedMesh};
use repack_core::source::{PositionAttribute, SourceMesh};

const BLOCK_SIZE: usize = 96;

/// Positions in a small box so most deltas fit and some do not.
fn positions(max_vertices: usize) -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec((0u16..1800, 0u16..1800, 0u16..1800), 1..max_vertices)
        .prop_map(|v| v.into_iter().flat_map(|(x, y, z)| [x, y, z]).collect())
}

fn mesh_case() -> impl Strategy<Value = (Vec<u16>, Vec<u32>)> {
    positions(160).prop_flat_map(|samples| {
        let n = (samples.len() / 3) as u32;
        let indices = prop::collection::vec(0..n, 0..300);
        (Just(samples), indices)
    })
}

/// Capacity that no mesh can exceed: every vertex opening its own block.
fn worst_case_capacity(n: usize) -> usize {
    n * BLOCK_SIZE
}

fn encode(samples: &[u16], indices: &[u32]) -> RepackedMesh {
    let ctx = CodecContext::new(RepackOptions::default()).unwrap();
    let mesh = SourceMesh::new(PositionAttribute::packed_u16(samples)).with_indices(indices);
    repack_mesh_with_capacity(&ctx, &mesh, worst_case_capacity(samples.len() / 3)).unwrap()
}

proptest! {
    #[test]
    fn output_count_and_remap_stay_in_bounds((samples, indices) in mesh_case()) {
        let n = samples.len() / 3;
        let out = encode(&samples, &indices);
        let r = out.output_vertex_count();
        prop_assert!(r >= n);
        prop_assert!(r <= worst_case_capacity(n));
        prop_assert_eq!(out.remap().len(), n);
        prop_assert!(out.remap().iter().all(|&v| (v as usize) < r));

        let mut seen = out.remap().to_vec();
        seen.sort_unstable();
        seen.dedup();
        prop_assert_eq!(seen.len(), n);
    }

    #[test]
    fn decoding_is_exact((samples, indices) in mesh_case()) {
        let out = encode(&samples, &indices);
        prop_assert_eq!(out.block_count(), (out.output_vertex_count() + BLOCK_SIZE - 1) / BLOCK_SIZE);
        let reconstructor = out.reconstructor().unwrap();
        for (i, &slot) in out.remap().iter().enumerate() {
            let p = reconstructor.grid_position(OutputVertex(slot)).unwrap();
            let expected = [samples[i * 3] as i32, samples[i * 3 + 1] as i32, samples[i * 3 + 2] as i32];
            prop_assert_eq!(p, expected);
        }
    }

    #[test]
    fn reconstruction_is_idempotent((samples, indices) in mesh_case()) {
        let out = encode(&samples, &indices);
        let reconstructor = out.reconstructor().unwrap();
        let first = reconstructor.positions().unwrap();
        let second = reconstructor.positions().unwrap();
        let identical = first.iter().zip(&second).all(|(a, b)| {
            a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
        });
        prop_assert!(identical);
    }

    #[test]
    fn remapped_indices_are_bounded_and_keep_width((samples, indices) in mesh_case()) {
        let out = encode(&samples, &indices);
        let r = out.output_vertex_count() as u32;
        prop_assert_eq!(out.indices().width(), IndexWidth::U32);
        prop_assert_eq!(out.indices().len(), indices.len());
        prop_assert!(out.indices().to_u32_vec().iter().all(|&i| i < r));
        for (old, new) in indices.iter().zip(out.indices().to_u32_vec()) {
            prop_assert_eq!(out.remap()[*old as usize], new);
        }
    }

    #[test]
    fn narrow_and_wide_indices_agree((samples, indices) in mesh_case()) {
        let ctx = CodecContext::new(RepackOptions::default()).unwrap();
        let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
        let capacity = worst_case_capacity(samples.len() / 3);
        let a = SourceMesh::new(PositionAttribute::packed_u16(&samples)).with_indices(&narrow[..]);
        let b = SourceMesh::new(PositionAttribute::packed_u16(&samples)).with_indices(&indices[..]);
        let a = repack_mesh_with_capacity(&ctx, &a, capacity).unwrap();
        let b = repack_mesh_with_capacity(&ctx, &b, capacity).unwrap();
        prop_assert_eq!(a.indices().width(), IndexWidth::U16);
        prop_assert_eq!(a.indices().to_u32_vec(), b.indices().to_u32_vec());
    }

    #[test]
    fn texture_covers_every_block(
        (samples, indices) in mesh_case(),
        width in prop::sample::select(vec![1u32, 2, 7, 64, 1024]),
    ) {
        let mut options = RepackOptions::new();
        options.set_texture_width(width);
        let ctx = CodecContext::new(options).unwrap();
        let mesh = SourceMesh::new(PositionAttribute::packed_u16(&samples)).with_indices(&indices[..]);
        let out = repack_mesh_with_capacity(&ctx, &mesh, worst_case_capacity(samples.len() / 3)).unwrap();

        let blocks = out.block_count();
        let tex = out.anchors();
        prop_assert_eq!(tex.width(), width);
        prop_assert_eq!(tex.height() as usize, (blocks + width as usize - 1) / width as usize);
        prop_assert!(tex.width() as usize * tex.height() as usize >= blocks);
    }

    #[test]
    fn too_small_capacity_always_overflows_and_frees((samples, indices) in mesh_case()) {
        let n = samples.len() / 3;
        let ctx = CodecContext::new(RepackOptions::default()).unwrap();
        let mesh = SourceMesh::new(PositionAttribute::packed_u16(&samples)).with_indices(&indices[..]);
        let err = repack_mesh_with_capacity(&ctx, &mesh, n - 1).unwrap_err();
        prop_assert!(err.is_recoverable());
        prop_assert_eq!(ctx.arena_stats().live(), 0);
    }
}
