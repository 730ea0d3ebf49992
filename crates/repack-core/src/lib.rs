//! Repack Core Library
//!
//! Block-anchored delta codec for quantized mesh vertex positions. Positions
//! are regrouped into fixed-size blocks; each block stores one full-precision
//! anchor in an integer texture and every vertex stores a 32-bit packed delta
//! from its block's anchor.

#![allow(clippy::needless_range_loop)] // Per-axis loops index three parallel arrays

// =============================================================================
// Core modules - always available
// =============================================================================

pub mod arena;
pub mod block;
pub mod chunking;
pub mod data_types;
pub mod delta;
pub mod error;
pub mod footprint;
pub mod normals;
pub mod options;
pub mod pipeline;
pub mod quantization;
pub mod reconstruct;
pub mod remap;
pub mod shader;
pub mod source;
pub mod texture;

// =============================================================================
// C API - enabled with the "c-api" feature
// =============================================================================

#[cfg(feature = "c-api")]
pub mod c_api;

// =============================================================================
// Core re-exports
// =============================================================================

pub use arena::{ArenaStats, ScratchArena, ScratchBuffer};
pub use block::{block_count_for, BlockIndex, BlockSize, OutputVertex, DEFAULT_BLOCK_SIZE};
pub use chunking::{extract_chunk, partition_triangles, MeshChunk, DEFAULT_CHUNK_LIMIT};
pub use data_types::{DataType, IndexWidth};
pub use delta::{
    decode_position, pack_delta, repack_into, unpack_delta, DeltaEncoder, EncodedBlocks, DELTA_BIAS, DELTA_BITS,
    DELTA_FORMAT_VERSION, PADDING_CODE,
};
pub use error::{ErrorKind, RepackError, RepackResult};
pub use footprint::MemoryFootprint;
pub use normals::{requantize_normals, NormalFormat, QuantizedNormals};
pub use options::{CodecContext, RepackOptions, DEFAULT_CAPACITY_FACTOR};
pub use pipeline::{repack_mesh, repack_mesh_with_capacity, repack_meshes, MeshOutcome, RepackedMesh};
pub use quantization::{PositionDequantization, PositionQuantizer};
pub use reconstruct::Reconstructor;
pub use remap::{apply_remap, remap_indices, validate_remap, IndexBuffer, IndexElement};
pub use shader::{reconstruction_glsl, ShaderUniforms};
pub use source::{
    adapt, AdaptedSource, AttributeSamples, IndexSlice, PositionAttribute, SourceMesh, VertexLayout, VertexView,
};
pub use texture::{
    pack_anchor_texture, AnchorTexture, TextureDescriptor, TextureFilter, TextureFormat, DEFAULT_TEXTURE_WIDTH,
};
