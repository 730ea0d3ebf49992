//! Anchor texture packer: lays one anchor per texel into a fixed-width
//! 4-channel unsigned 16-bit image.

use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};

use crate::data_types::ceil_div;
use crate::error::{RepackError, RepackResult};

pub const DEFAULT_TEXTURE_WIDTH: u32 = 1024;
pub const MAX_TEXTURE_WIDTH: u32 = 16384;
pub const TEXEL_CHANNELS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// Four unsigned 16-bit integer channels, fetched without normalization.
    Rgba16Uint,
}

impl TextureFormat {
    pub fn bytes_per_texel(self) -> usize {
        match self {
            TextureFormat::Rgba16Uint => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFilter {
    Nearest,
    Linear,
}

/// Sampler contract a consumer must honor when uploading the texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    pub min_filter: TextureFilter,
    pub mag_filter: TextureFilter,
    pub generate_mipmaps: bool,
    pub unpack_alignment: u32,
}

/// Anchors laid out row-major, block `b` at texel `(b % width, b / width)`
/// as `(x, y, z, 0)`. Texels past the last block are zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorTexture {
    width: u32,
    height: u32,
    block_count: usize,
    texels: Vec<u16>,
}

impl AnchorTexture {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Number of texels holding a real anchor.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Interleaved RGBA channel data.
    pub fn texels(&self) -> &[u16] {
        &self.texels
    }

    pub fn texel_for_block(&self, block: usize) -> (u32, u32) {
        let width = self.width as usize;
        ((block % width) as u32, (block / width) as u32)
    }

    /// Raw texel at `(x, y)`, `None` outside the image.
    pub fn texel(&self, x: u32, y: u32) -> Option<[u16; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let base = (y as usize * self.width as usize + x as usize) * TEXEL_CHANNELS;
        let t = &self.texels[base..base + TEXEL_CHANNELS];
        Some([t[0], t[1], t[2], t[3]])
    }

    /// Anchor of `block`, `None` past the last block.
    pub fn anchor(&self, block: usize) -> Option<[u16; 3]> {
        if block >= self.block_count {
            return None;
        }
        let (x, y) = self.texel_for_block(block);
        self.texel(x, y).map(|t| [t[0], t[1], t[2]])
    }

    pub fn descriptor(&self) -> TextureDescriptor {
        TextureDescriptor {
            format: TextureFormat::Rgba16Uint,
            width: self.width,
            height: self.height,
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            generate_mipmaps: false,
            unpack_alignment: 1,
        }
    }

    pub fn byte_len(&self) -> usize {
        self.texels.len() * std::mem::size_of::<u16>()
    }

    /// Writes every channel as little-endian `u16`, row by row.
    pub fn write_texels<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for &channel in &self.texels {
            writer.write_u16::<LittleEndian>(channel)?;
        }
        Ok(())
    }
}

/// Packs `anchors` into a texture `width` texels wide and
/// `ceil(anchors.len() / width)` texels high.
pub fn pack_anchor_texture(anchors: &[[u16; 3]], width: u32) -> RepackResult<AnchorTexture> {
    if width == 0 || width > MAX_TEXTURE_WIDTH {
        return Err(RepackError::InvalidTextureWidth(width));
    }
    let height = ceil_div(anchors.len(), width as usize);
    let height = u32::try_from(height)
        .map_err(|_| RepackError::invalid_parameter(format!("{} anchors exceed texture height range", anchors.len())))?;

    let mut texels = vec![0u16; width as usize * height as usize * TEXEL_CHANNELS];
    for (block, anchor) in anchors.iter().enumerate() {
        let base = block * TEXEL_CHANNELS;
        texels[base..base + 3].copy_from_slice(anchor);
    }

    Ok(AnchorTexture { width, height, block_count: anchors.len(), texels })
}
