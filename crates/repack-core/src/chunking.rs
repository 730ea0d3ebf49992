//! Splits large triangle meshes into parts small enough for 16-bit index
//! buffers.

use tracing::debug;

use crate::error::{RepackError, RepackResult};

/// Unique-vertex limit per part that keeps indices within `u16`.
pub const DEFAULT_CHUNK_LIMIT: usize = 65000;

/// One part of a partitioned mesh with compacted vertex numbering.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshChunk {
    /// Source vertex id of every local vertex, ascending.
    pub source_vertices: Vec<u32>,
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    /// Triangles in local vertex numbering.
    pub triangles: Vec<[u32; 3]>,
}

impl MeshChunk {
    pub fn vertex_count(&self) -> usize {
        self.source_vertices.len()
    }

    /// Flattened triangle list.
    pub fn indices_u32(&self) -> Vec<u32> {
        self.triangles.iter().flatten().copied().collect()
    }

    /// Flattened triangle list narrowed to `u16`, `None` if any index does
    /// not fit.
    pub fn indices_u16(&self) -> Option<Vec<u16>> {
        self.triangles.iter().flatten().map(|&i| u16::try_from(i).ok()).collect()
    }
}

fn unique_vertex_count(triangles: &[[u32; 3]], part: &[u32]) -> usize {
    let mut ids: Vec<u32> = part.iter().flat_map(|&t| triangles[t as usize]).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}

fn centroid(positions: &[[f32; 3]], tri: [u32; 3], axis: usize) -> f32 {
    (positions[tri[0] as usize][axis] + positions[tri[1] as usize][axis] + positions[tri[2] as usize][axis]) / 3.0
}

fn median(values: &mut [f32]) -> f32 {
    values.sort_unstable_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Recursively splits `triangles` at the median triangle centroid, cycling
/// the split axis x, y, z, until every part references at most `limit`
/// unique vertices. A split that leaves one side empty cuts the part in half
/// by order instead. Returns triangle ids per part, in depth-first order.
pub fn partition_triangles(
    positions: &[[f32; 3]],
    triangles: &[[u32; 3]],
    limit: usize,
) -> RepackResult<Vec<Vec<u32>>> {
    if limit < 3 {
        return Err(RepackError::invalid_parameter(format!("chunk limit {} cannot hold a triangle", limit)));
    }
    if let Some(&bad) = triangles.iter().flatten().find(|&&v| v as usize >= positions.len()) {
        return Err(RepackError::IndexOutOfRange { index: bad as usize, len: positions.len() });
    }
    if triangles.is_empty() {
        return Ok(Vec::new());
    }

    let mut parts = Vec::new();
    let mut stack: Vec<(Vec<u32>, usize)> = vec![((0..triangles.len() as u32).collect(), 0)];
    while let Some((part, axis)) = stack.pop() {
        if part.len() <= 1 || unique_vertex_count(triangles, &part) <= limit {
            parts.push(part);
            continue;
        }

        let mut centers: Vec<f32> = part.iter().map(|&t| centroid(positions, triangles[t as usize], axis)).collect();
        let split = median(&mut centers);
        let (mut left, mut right): (Vec<u32>, Vec<u32>) = part
            .iter()
            .partition(|&&t| centroid(positions, triangles[t as usize], axis) <= split);
        if left.is_empty() || right.is_empty() {
            let mid = part.len() / 2;
            left = part[..mid].to_vec();
            right = part[mid..].to_vec();
        }

        let next = (axis + 1) % 3;
        // Right first so the left half is processed (and emitted) first.
        stack.push((right, next));
        stack.push((left, next));
    }

    debug!(triangles = triangles.len(), parts = parts.len(), limit, "partitioned mesh");
    Ok(parts)
}

/// Compacts the triangles of `part` into a standalone chunk whose vertices
/// are the sorted unique source vertices it references.
pub fn extract_chunk(
    positions: &[[f32; 3]],
    normals: Option<&[[f32; 3]]>,
    triangles: &[[u32; 3]],
    part: &[u32],
) -> RepackResult<MeshChunk> {
    let mut source_vertices = Vec::with_capacity(part.len() * 3);
    for &t in part {
        let tri = triangles
            .get(t as usize)
            .ok_or(RepackError::IndexOutOfRange { index: t as usize, len: triangles.len() })?;
        for &v in tri {
            if v as usize >= positions.len() {
                return Err(RepackError::IndexOutOfRange { index: v as usize, len: positions.len() });
            }
            source_vertices.push(v);
        }
    }
    source_vertices.sort_unstable();
    source_vertices.dedup();

    let local = |v: u32| source_vertices.binary_search(&v).map(|i| i as u32).unwrap_or_default();
    let local_triangles = part
        .iter()
        .map(|&t| {
            let tri = triangles[t as usize];
            [local(tri[0]), local(tri[1]), local(tri[2])]
        })
        .collect();

    let chunk_positions = source_vertices.iter().map(|&v| positions[v as usize]).collect();
    let chunk_normals = match normals {
        Some(n) => {
            if n.len() < positions.len() {
                return Err(RepackError::NormalCountMismatch { expected: positions.len(), found: n.len() });
            }
            Some(source_vertices.iter().map(|&v| n[v as usize]).collect())
        }
        None => None,
    };

    Ok(MeshChunk {
        source_vertices,
        positions: chunk_positions,
        normals: chunk_normals,
        triangles: local_triangles,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A strip of `n` disjoint triangles laid out along x.
    fn strip(n: usize) -> (Vec<[f32; 3]>, Vec<[u32; 3]>) {
        let mut positions = Vec::new();
        let mut triangles = Vec::new();
        for i in 0..n {
            let x = i as f32 * 2.0;
            let base = positions.len() as u32;
            positions.extend_from_slice(&[[x, 0.0, 0.0], [x + 1.0, 0.0, 0.0], [x, 1.0, 0.0]]);
            triangles.push([base, base + 1, base + 2]);
        }
        (positions, triangles)
    }

    #[test]
    fn test_small_mesh_is_one_part() {
        let (p, t) = strip(4);
        let parts = partition_triangles(&p, &t, 100).unwrap();
        assert_eq!(parts, vec![vec![0, 1, 2, 3]]);
    }

    #[test]
    fn test_split_respects_limit_and_keeps_every_triangle() {
        let (p, t) = strip(10);
        let parts = partition_triangles(&p, &t, 9).unwrap();
        assert!(parts.len() >= 4);
        for part in &parts {
            assert!(unique_vertex_count(&t, part) <= 9);
        }
        let mut all: Vec<u32> = parts.concat();
        all.sort_unstable();
        assert_eq!(all, (0..10).collect::<Vec<u32>>());
        // Left of the x median comes first.
        assert!(parts[0].contains(&0));
    }

    #[test]
    fn test_coincident_centroids_split_by_order() {
        let positions = vec![[0.0, 0.0, 0.0]; 6];
        let triangles = vec![[0, 1, 2], [3, 4, 5]];
        let parts = partition_triangles(&positions, &triangles, 3).unwrap();
        assert_eq!(parts, vec![vec![0], vec![1]]);
    }

    #[test]
    fn test_rejects_bad_input() {
        let (p, t) = strip(1);
        assert!(partition_triangles(&p, &t, 2).is_err());
        assert_eq!(
            partition_triangles(&p, &[[0, 1, 9]], 10).unwrap_err(),
            RepackError::IndexOutOfRange { index: 9, len: 3 }
        );
        assert!(partition_triangles(&p, &[], 10).unwrap().is_empty());
    }

    #[test]
    fn test_extract_chunk_compacts() {
        let positions = vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0], [3.0, 0.0, 0.0], [4.0, 0.0, 0.0]];
        let normals = vec![[0.0, 0.0, 1.0]; 5];
        let triangles = vec![[0, 1, 2], [4, 3, 1]];
        let chunk = extract_chunk(&positions, Some(&normals), &triangles, &[1]).unwrap();
        assert_eq!(chunk.source_vertices, vec![1, 3, 4]);
        assert_eq!(chunk.triangles, vec![[2, 1, 0]]);
        assert_eq!(chunk.positions[0], [1.0, 0.0, 0.0]);
        assert_eq!(chunk.normals.as_ref().map(Vec::len), Some(3));
        assert_eq!(chunk.indices_u16(), Some(vec![2, 1, 0]));
        assert_eq!(chunk.vertex_count(), 3);
    }
}
