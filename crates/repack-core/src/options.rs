use crate::arena::ArenaStats;
use crate::block::{BlockSize, DEFAULT_BLOCK_SIZE};
use crate::error::{RepackError, RepackResult};
use crate::normals::NormalFormat;
use crate::quantization::PositionDequantization;
use crate::texture::{DEFAULT_TEXTURE_WIDTH, MAX_TEXTURE_WIDTH};

/// Default ratio between output capacity and source vertex count.
pub const DEFAULT_CAPACITY_FACTOR: f32 = 1.5;

/// User-facing knobs of the codec. Validated once when a [`CodecContext`]
/// is built from them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepackOptions {
    block_size: u32,
    texture_width: u32,
    normal_format: NormalFormat,
    capacity_factor: f32,
    dequantization: PositionDequantization,
}

impl Default for RepackOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            texture_width: DEFAULT_TEXTURE_WIDTH,
            normal_format: NormalFormat::Snorm16,
            capacity_factor: DEFAULT_CAPACITY_FACTOR,
            dequantization: PositionDequantization::identity(),
        }
    }
}

impl RepackOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn set_block_size(&mut self, value: u32) -> &mut Self {
        self.block_size = value;
        self
    }

    pub fn texture_width(&self) -> u32 {
        self.texture_width
    }

    pub fn set_texture_width(&mut self, value: u32) -> &mut Self {
        self.texture_width = value;
        self
    }

    pub fn normal_format(&self) -> NormalFormat {
        self.normal_format
    }

    pub fn set_normal_format(&mut self, value: NormalFormat) -> &mut Self {
        self.normal_format = value;
        self
    }

    pub fn capacity_factor(&self) -> f32 {
        self.capacity_factor
    }

    pub fn set_capacity_factor(&mut self, value: f32) -> &mut Self {
        self.capacity_factor = value;
        self
    }

    pub fn dequantization(&self) -> PositionDequantization {
        self.dequantization
    }

    pub fn set_dequantization(&mut self, value: PositionDequantization) -> &mut Self {
        self.dequantization = value;
        self
    }
}

/// Configuration shared by every encode call, constructed once and passed by
/// reference. Also owns the allocation counters of the scratch arenas opened
/// against it.
#[derive(Debug)]
pub struct CodecContext {
    block_size: BlockSize,
    texture_width: u32,
    normal_format: NormalFormat,
    capacity_factor: f32,
    dequantization: PositionDequantization,
    arena_stats: ArenaStats,
}

impl CodecContext {
    pub fn new(options: RepackOptions) -> RepackResult<Self> {
        let block_size = BlockSize::new(options.block_size)?;
        if options.texture_width == 0 || options.texture_width > MAX_TEXTURE_WIDTH {
            return Err(RepackError::InvalidTextureWidth(options.texture_width));
        }
        if !options.capacity_factor.is_finite() || options.capacity_factor < 1.0 {
            return Err(RepackError::invalid_parameter(format!(
                "capacity factor {} must be a finite value >= 1",
                options.capacity_factor
            )));
        }
        Ok(Self {
            block_size,
            texture_width: options.texture_width,
            normal_format: options.normal_format,
            capacity_factor: options.capacity_factor,
            dequantization: options.dequantization,
            arena_stats: ArenaStats::new(),
        })
    }

    pub fn with_block_size(block_size: u32) -> RepackResult<Self> {
        let mut options = RepackOptions::default();
        options.set_block_size(block_size);
        Self::new(options)
    }

    pub fn block_size(&self) -> BlockSize {
        self.block_size
    }

    pub fn texture_width(&self) -> u32 {
        self.texture_width
    }

    pub fn normal_format(&self) -> NormalFormat {
        self.normal_format
    }

    pub fn dequantization(&self) -> PositionDequantization {
        self.dequantization
    }

    /// Output capacity used for a mesh of `vertex_count` source vertices:
    /// `floor(vertex_count * capacity_factor)`.
    pub fn max_output_vertices(&self, vertex_count: usize) -> usize {
        (vertex_count as f64 * self.capacity_factor as f64).floor() as usize
    }

    pub fn arena_stats(&self) -> &ArenaStats {
        &self.arena_stats
    }
}
