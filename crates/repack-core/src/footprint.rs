//! GPU memory accounting for repacked meshes.

use std::fmt;
use std::ops::Add;

use crate::data_types::IndexWidth;
use crate::normals::NormalFormat;
use crate::texture::TextureDescriptor;

/// Bytes a mesh occupies once uploaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryFootprint {
    /// Position data: packed deltas, or 3×u16 samples for a baseline.
    pub delta_bytes: usize,
    pub normal_bytes: usize,
    pub index_bytes: usize,
    pub texture_bytes: usize,
    /// Extra mip chain storage, estimated as a third of the base level.
    pub mipmap_bytes: usize,
}

impl MemoryFootprint {
    pub fn new(delta_bytes: usize, normal_bytes: usize, index_bytes: usize, texture: &TextureDescriptor) -> Self {
        let texture_bytes = texture.width as usize * texture.height as usize * texture.format.bytes_per_texel();
        let mipmap_bytes = if texture.generate_mipmaps { mipmap_overhead(texture_bytes) } else { 0 };
        Self { delta_bytes, normal_bytes, index_bytes, texture_bytes, mipmap_bytes }
    }

    /// The same mesh stored conventionally: tightly packed 3×u16 positions,
    /// `format` normals and the original index buffer, no texture.
    pub fn baseline(vertex_count: usize, index_count: usize, width: IndexWidth, format: NormalFormat) -> Self {
        Self {
            delta_bytes: vertex_count * 3 * std::mem::size_of::<u16>(),
            normal_bytes: vertex_count * 3 * format.component_bytes(),
            index_bytes: index_count * width.byte_length(),
            texture_bytes: 0,
            mipmap_bytes: 0,
        }
    }

    pub fn total(&self) -> usize {
        self.delta_bytes + self.normal_bytes + self.index_bytes + self.texture_bytes + self.mipmap_bytes
    }

    /// `self.total() / other.total()`, or 0 when `other` is empty.
    pub fn ratio_to(&self, other: &MemoryFootprint) -> f64 {
        match other.total() {
            0 => 0.0,
            t => self.total() as f64 / t as f64,
        }
    }
}

pub(crate) fn mipmap_overhead(texture_bytes: usize) -> usize {
    (texture_bytes as f64 * 0.33).floor() as usize
}

impl Add for MemoryFootprint {
    type Output = MemoryFootprint;

    fn add(self, rhs: Self) -> Self {
        Self {
            delta_bytes: self.delta_bytes + rhs.delta_bytes,
            normal_bytes: self.normal_bytes + rhs.normal_bytes,
            index_bytes: self.index_bytes + rhs.index_bytes,
            texture_bytes: self.texture_bytes + rhs.texture_bytes,
            mipmap_bytes: self.mipmap_bytes + rhs.mipmap_bytes,
        }
    }
}

impl fmt::Display for MemoryFootprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "positions {} B, normals {} B, indices {} B, texture {} B",
            self.delta_bytes, self.normal_bytes, self.index_bytes, self.texture_bytes
        )?;
        if self.mipmap_bytes > 0 {
            write!(f, " (+{} B mipmaps)", self.mipmap_bytes)?;
        }
        write!(f, ", total {} B ({:.2} MB)", self.total(), self.total() as f64 / 1024.0 / 1024.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{TextureFilter, TextureFormat};

    fn descriptor(generate_mipmaps: bool) -> TextureDescriptor {
        TextureDescriptor {
            format: TextureFormat::Rgba16Uint,
            width: 1024,
            height: 2,
            min_filter: TextureFilter::Nearest,
            mag_filter: TextureFilter::Nearest,
            generate_mipmaps,
            unpack_alignment: 1,
        }
    }

    #[test]
    fn test_totals() {
        let f = MemoryFootprint::new(400, 300, 120, &descriptor(false));
        assert_eq!(f.texture_bytes, 1024 * 2 * 8);
        assert_eq!(f.mipmap_bytes, 0);
        assert_eq!(f.total(), 400 + 300 + 120 + 16384);
    }

    #[test]
    fn test_mipmaps_counted_when_enabled() {
        let f = MemoryFootprint::new(0, 0, 0, &descriptor(true));
        assert_eq!(f.mipmap_bytes, 5406);
        assert!(f.to_string().contains("mipmaps"));
    }

    #[test]
    fn test_baseline() {
        let b = MemoryFootprint::baseline(100, 300, IndexWidth::U16, NormalFormat::Snorm8);
        assert_eq!(b.delta_bytes, 600);
        assert_eq!(b.normal_bytes, 300);
        assert_eq!(b.index_bytes, 600);
        assert_eq!(b.total(), 1500);
        assert_eq!((b + b).total(), 3000);
        assert_eq!(b.ratio_to(&b), 1.0);
        assert_eq!(b.ratio_to(&MemoryFootprint::default()), 0.0);
    }
}
