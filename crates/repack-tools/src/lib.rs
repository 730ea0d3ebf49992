//! Offline tooling around `repack_core`: OBJ input, chunked conversion and
//! binary artifact output.

pub mod artifacts;
pub mod convert;
pub mod error;
pub mod obj;

pub use artifacts::{write_artifacts, ArtifactPaths};
pub use convert::{convert_mesh, ConversionReport};
pub use error::{ToolError, ToolResult};
pub use obj::{parse_obj, ObjMesh, ObjReader};
