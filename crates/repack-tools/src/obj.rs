//! Wavefront OBJ reader for triangle meshes with optional normals.

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ToolError, ToolResult};

/// Normal given to vertices no face references with a `vn`.
const DEFAULT_NORMAL: [f32; 3] = [0.0, 1.0, 0.0];

/// Indexed triangle mesh read from an OBJ file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjMesh {
    pub positions: Vec<[f32; 3]>,
    /// One normal per position, present when the file has `vn` records.
    pub normals: Option<Vec<[f32; 3]>>,
    pub triangles: Vec<[u32; 3]>,
}

impl ObjMesh {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }
}

/// OBJ format reader.
#[derive(Debug)]
pub struct ObjReader {
    path: PathBuf,
}

impl ObjReader {
    /// Open an OBJ file for reading.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("File not found: {}", path.display()),
            ));
        }
        Ok(Self { path })
    }

    pub fn read_mesh(&mut self) -> ToolResult<ObjMesh> {
        let file = fs::File::open(&self.path)?;
        let mesh = parse_obj(BufReader::new(file))?;
        debug!(
            path = %self.path.display(),
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            normals = mesh.normals.is_some(),
            "read OBJ mesh"
        );
        Ok(mesh)
    }
}

/// Resolves a 1-based or negative (relative) OBJ index against `count`
/// records seen so far.
fn resolve_index(token: &str, count: usize, line: usize) -> ToolResult<usize> {
    let raw: i64 = token
        .parse()
        .map_err(|_| ToolError::parse(line, format!("bad index '{}'", token)))?;
    let resolved = match raw {
        0 => return Err(ToolError::parse(line, "index 0 is not valid in OBJ")),
        r if r > 0 => (r - 1) as usize,
        r => {
            let back = r.unsigned_abs() as usize;
            if back > count {
                return Err(ToolError::parse(line, format!("relative index {} before the first record", r)));
            }
            count - back
        }
    };
    Ok(resolved)
}

fn parse_vec3<'a>(mut parts: impl Iterator<Item = &'a str>, line: usize) -> ToolResult<[f32; 3]> {
    let mut v = [0.0f32; 3];
    for c in v.iter_mut() {
        *c = parts
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| ToolError::parse(line, "expected three numbers"))?;
    }
    Ok(v)
}

fn normalize(n: [f32; 3]) -> [f32; 3] {
    let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
    if len > 0.0 && len.is_finite() {
        [n[0] / len, n[1] / len, n[2] / len]
    } else {
        DEFAULT_NORMAL
    }
}

/// Parses `v`, `vn` and `f` records. Polygons are fan-triangulated; each
/// position takes the normal of the first face corner that references it.
/// Other record types are ignored.
pub fn parse_obj<R: BufRead>(reader: R) -> ToolResult<ObjMesh> {
    let mut positions = Vec::new();
    let mut file_normals: Vec<[f32; 3]> = Vec::new();
    let mut faces: Vec<(usize, [usize; 3])> = Vec::new();
    let mut normal_refs: Vec<(usize, usize, usize)> = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line_no = i + 1;
        let line = line?;
        let mut parts = line.split_whitespace();
        match parts.next() {
            Some("v") => positions.push(parse_vec3(parts, line_no)?),
            Some("vn") => file_normals.push(parse_vec3(parts, line_no)?),
            Some("f") => {
                let mut corners = Vec::new();
                for token in parts {
                    let mut fields = token.split('/');
                    let v = fields.next().unwrap_or_default();
                    let v = resolve_index(v, positions.len(), line_no)?;
                    let _texcoord = fields.next();
                    let n = match fields.next() {
                        Some(n) if !n.is_empty() => Some(resolve_index(n, file_normals.len(), line_no)?),
                        _ => None,
                    };
                    corners.push(v);
                    if let Some(n) = n {
                        normal_refs.push((line_no, v, n));
                    }
                }
                if corners.len() < 3 {
                    return Err(ToolError::parse(line_no, "face needs at least three vertices"));
                }
                for k in 1..corners.len() - 1 {
                    faces.push((line_no, [corners[0], corners[k], corners[k + 1]]));
                }
            }
            _ => {}
        }
    }

    let mut triangles = Vec::with_capacity(faces.len());
    for (line_no, tri) in faces {
        if let Some(&bad) = tri.iter().find(|&&v| v >= positions.len()) {
            return Err(ToolError::parse(line_no, format!("vertex index {} out of range", bad + 1)));
        }
        triangles.push([tri[0] as u32, tri[1] as u32, tri[2] as u32]);
    }

    let normals = if normal_refs.is_empty() {
        None
    } else {
        let mut assigned: Vec<Option<[f32; 3]>> = vec![None; positions.len()];
        for (line_no, v, n) in normal_refs {
            let normal = *file_normals
                .get(n)
                .ok_or_else(|| ToolError::parse(line_no, format!("normal index {} out of range", n + 1)))?;
            if let Some(slot) = assigned.get_mut(v) {
                slot.get_or_insert_with(|| normalize(normal));
            }
        }
        Some(assigned.into_iter().map(|n| n.unwrap_or(DEFAULT_NORMAL)).collect())
    };

    Ok(ObjMesh { positions, normals, triangles })
}
