//! Binary artifacts of a repacked mesh, one little-endian file per buffer.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use repack_core::pipeline::RepackedMesh;

use crate::error::ToolResult;

/// Files written for one repacked mesh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub deltas: PathBuf,
    pub indices: PathBuf,
    pub normals: PathBuf,
    pub anchors: PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path, stem: &str) -> Self {
        Self {
            deltas: dir.join(format!("{}.deltas.bin", stem)),
            indices: dir.join(format!("{}.indices.bin", stem)),
            normals: dir.join(format!("{}.normals.bin", stem)),
            anchors: dir.join(format!("{}.anchors.bin", stem)),
        }
    }
}

fn write_file<F>(path: &Path, write: F) -> ToolResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes the four buffers of `mesh` into `dir`, creating it if needed.
/// Files are named after the mesh, or `mesh` when it has no name.
pub fn write_artifacts(dir: &Path, mesh: &RepackedMesh) -> ToolResult<ArtifactPaths> {
    fs::create_dir_all(dir)?;
    let paths = ArtifactPaths::new(dir, mesh.name().unwrap_or("mesh"));

    write_file(&paths.deltas, |w| mesh.write_deltas(w))?;
    write_file(&paths.indices, |w| mesh.write_indices(w))?;
    write_file(&paths.normals, |w| mesh.write_normals(w))?;
    write_file(&paths.anchors, |w| mesh.write_anchors(w))?;

    debug!(dir = %dir.display(), vertices = mesh.output_vertex_count(), "wrote artifacts");
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repack_core::options::CodecContext;
    use repack_core::pipeline::repack_mesh;
    use repack_core::source::{PositionAttribute, SourceMesh};

    #[test]
    fn test_artifact_sizes() {
        let samples: Vec<u16> = vec![10, 10, 10, 12, 11, 9, 14, 8, 10];
        let indices: Vec<u16> = vec![0, 1, 2];
        let ctx = CodecContext::with_block_size(96).unwrap();
        let mesh = SourceMesh::new(PositionAttribute::packed_u16(&samples))
            .with_name("tri")
            .with_indices(&indices[..]);
        let out = repack_mesh(&ctx, &mesh).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let paths = write_artifacts(dir.path(), &out).unwrap();
        assert!(paths.deltas.ends_with("tri.deltas.bin"));

        let len = |p: &PathBuf| fs::metadata(p).unwrap().len() as usize;
        assert_eq!(len(&paths.deltas), out.output_vertex_count() * 4);
        assert_eq!(len(&paths.indices), 3 * 2);
        assert_eq!(len(&paths.normals), out.normals().byte_len());
        assert_eq!(len(&paths.anchors), out.anchors().byte_len());
    }
}
