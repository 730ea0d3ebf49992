//! Source adapter: normalizes a mesh's position storage into a uniform
//! `(count, stride, raw 16-bit samples)` view.
//!
//! Layout and index width are resolved here, once. Nothing downstream
//! re-tests whether storage was interleaved or which width the indices use.

use tracing::debug;

use crate::data_types::{DataType, IndexWidth};
use crate::error::{RepackError, RepackResult};

/// Borrowed raw sample array backing a position attribute.
#[derive(Debug, Clone, Copy)]
pub enum AttributeSamples<'a> {
    Int8(&'a [i8]),
    Uint8(&'a [u8]),
    Int16(&'a [i16]),
    Uint16(&'a [u16]),
    Int32(&'a [i32]),
    Uint32(&'a [u32]),
    Float32(&'a [f32]),
}

impl AttributeSamples<'_> {
    pub fn data_type(&self) -> DataType {
        match self {
            AttributeSamples::Int8(_) => DataType::Int8,
            AttributeSamples::Uint8(_) => DataType::Uint8,
            AttributeSamples::Int16(_) => DataType::Int16,
            AttributeSamples::Uint16(_) => DataType::Uint16,
            AttributeSamples::Int32(_) => DataType::Int32,
            AttributeSamples::Uint32(_) => DataType::Uint32,
            AttributeSamples::Float32(_) => DataType::Float32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            AttributeSamples::Int8(s) => s.len(),
            AttributeSamples::Uint8(s) => s.len(),
            AttributeSamples::Int16(s) => s.len(),
            AttributeSamples::Uint16(s) => s.len(),
            AttributeSamples::Int32(s) => s.len(),
            AttributeSamples::Uint32(s) => s.len(),
            AttributeSamples::Float32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How the position components sit in their backing array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexLayout {
    /// xyz triples, back to back.
    Packed,
    /// Positions share the array with other attributes. `stride` is the
    /// number of samples from one vertex record to the next and `offset` the
    /// position's first sample within a record.
    Interleaved { stride: usize, offset: usize },
}

impl VertexLayout {
    pub fn stride(&self) -> usize {
        match self {
            VertexLayout::Packed => 3,
            VertexLayout::Interleaved { stride, .. } => *stride,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            VertexLayout::Packed => 0,
            VertexLayout::Interleaved { offset, .. } => *offset,
        }
    }

    pub fn is_interleaved(&self) -> bool {
        matches!(self, VertexLayout::Interleaved { .. })
    }
}

/// The position attribute of a source mesh.
#[derive(Debug, Clone, Copy)]
pub struct PositionAttribute<'a> {
    pub samples: AttributeSamples<'a>,
    pub layout: VertexLayout,
    /// Logical vertex count.
    pub count: usize,
}

impl<'a> PositionAttribute<'a> {
    /// Tightly packed 16-bit positions; the count is derived from the length.
    pub fn packed_u16(samples: &'a [u16]) -> Self {
        Self {
            samples: AttributeSamples::Uint16(samples),
            layout: VertexLayout::Packed,
            count: samples.len() / 3,
        }
    }

    pub fn interleaved_u16(samples: &'a [u16], stride: usize, offset: usize, count: usize) -> Self {
        Self {
            samples: AttributeSamples::Uint16(samples),
            layout: VertexLayout::Interleaved { stride, offset },
            count,
        }
    }
}

/// Borrowed triangle index list with its element width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSlice<'a> {
    U16(&'a [u16]),
    U32(&'a [u32]),
}

impl IndexSlice<'_> {
    pub fn width(&self) -> IndexWidth {
        match self {
            IndexSlice::U16(_) => IndexWidth::U16,
            IndexSlice::U32(_) => IndexWidth::U32,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            IndexSlice::U16(s) => s.len(),
            IndexSlice::U32(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn byte_len(&self) -> usize {
        self.len() * self.width().byte_length()
    }
}

impl<'a> From<&'a [u16]> for IndexSlice<'a> {
    fn from(s: &'a [u16]) -> Self {
        IndexSlice::U16(s)
    }
}

impl<'a> From<&'a [u32]> for IndexSlice<'a> {
    fn from(s: &'a [u32]) -> Self {
        IndexSlice::U32(s)
    }
}

/// A mesh as handed over by the rendering or asset collaborator.
#[derive(Debug, Clone, Copy)]
pub struct SourceMesh<'a> {
    pub name: Option<&'a str>,
    pub positions: PositionAttribute<'a>,
    pub indices: Option<IndexSlice<'a>>,
    /// Unit-length normals, one per logical vertex.
    pub normals: Option<&'a [[f32; 3]]>,
}

impl<'a> SourceMesh<'a> {
    pub fn new(positions: PositionAttribute<'a>) -> Self {
        Self { name: None, positions, indices: None, normals: None }
    }

    pub fn with_name(mut self, name: &'a str) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_indices(mut self, indices: impl Into<IndexSlice<'a>>) -> Self {
        self.indices = Some(indices.into());
        self
    }

    pub fn with_normals(mut self, normals: &'a [[f32; 3]]) -> Self {
        self.normals = Some(normals);
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.unwrap_or("<unnamed>")
    }
}

/// Uniform view over 16-bit position samples: vertex `i` starts at sample
/// `i * stride`.
#[derive(Debug, Clone, Copy)]
pub struct VertexView<'a> {
    samples: &'a [u16],
    stride: usize,
    count: usize,
}

impl<'a> VertexView<'a> {
    /// Builds a view, checking that `count` vertices of 3 samples each fit in
    /// `samples` at the given stride.
    pub fn new(samples: &'a [u16], stride: usize, count: usize) -> RepackResult<Self> {
        if stride < 3 {
            return Err(RepackError::invalid_layout(format!(
                "stride {} is smaller than one xyz triple",
                stride
            )));
        }
        if count > u32::MAX as usize {
            return Err(RepackError::invalid_layout(format!(
                "{} vertices exceed the 32-bit remap range",
                count
            )));
        }
        if count > 0 {
            let needed = (count - 1)
                .checked_mul(stride)
                .and_then(|n| n.checked_add(3))
                .ok_or_else(|| RepackError::invalid_layout("vertex range overflows"))?;
            if samples.len() < needed {
                return Err(RepackError::invalid_layout(format!(
                    "{} vertices at stride {} need {} samples, found {}",
                    count,
                    stride,
                    needed,
                    samples.len()
                )));
            }
        }
        Ok(Self { samples, stride, count })
    }

    pub fn vertex(&self, i: usize) -> [u16; 3] {
        let base = i * self.stride;
        [self.samples[base], self.samples[base + 1], self.samples[base + 2]]
    }

    pub fn samples(&self) -> &'a [u16] {
        self.samples
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Everything the codec reads from a mesh, after validation.
#[derive(Debug, Clone, Copy)]
pub struct AdaptedSource<'a> {
    pub view: VertexView<'a>,
    pub indices: IndexSlice<'a>,
    pub normals: Option<&'a [[f32; 3]]>,
}

/// Validates `mesh` and resolves its position storage. Rejects meshes without
/// an index buffer and positions that are not 16-bit unsigned samples. Makes
/// no allocations.
pub fn adapt<'a>(mesh: &SourceMesh<'a>) -> RepackResult<AdaptedSource<'a>> {
    let indices = mesh.indices.ok_or(RepackError::MissingIndexBuffer)?;

    let samples = match mesh.positions.samples {
        AttributeSamples::Uint16(samples) => samples,
        other => return Err(RepackError::UnsupportedSampleType { found: other.data_type() }),
    };

    let layout = mesh.positions.layout;
    let offset = layout.offset();
    if offset + 3 > layout.stride() {
        return Err(RepackError::invalid_layout(format!(
            "position offset {} does not fit in stride {}",
            offset,
            layout.stride()
        )));
    }
    let samples = samples.get(offset..).unwrap_or(&[]);
    let view = VertexView::new(samples, layout.stride(), mesh.positions.count)?;

    if let Some(normals) = mesh.normals {
        if normals.len() < view.len() {
            return Err(RepackError::NormalCountMismatch {
                expected: view.len(),
                found: normals.len(),
            });
        }
    }

    debug!(
        mesh = mesh.display_name(),
        vertices = view.len(),
        stride = view.stride(),
        interleaved = layout.is_interleaved(),
        index_width = ?indices.width(),
        indices = indices.len(),
        "adapted source mesh"
    );

    Ok(AdaptedSource { view, indices, normals: mesh.normals })
}
