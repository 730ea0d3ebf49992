//! Normal requantizer: moves per-vertex normals into the encoder's output
//! order and converts them to signed-normalized integers.

use tracing::warn;

use crate::error::{RepackError, RepackResult};

/// Placeholder written to every slot when the source has no normals. It is
/// stored unscaled, so the GPU sees an almost-zero vector.
pub const PLACEHOLDER_NORMAL: [i16; 3] = [0, 1, 0];

/// Signed-normalized integer width of the normal attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NormalFormat {
    Snorm8,
    Snorm16,
}

impl NormalFormat {
    /// Integer value that maps to 1.0.
    pub fn signed_max(self) -> i16 {
        match self {
            NormalFormat::Snorm8 => i8::MAX as i16,
            NormalFormat::Snorm16 => i16::MAX,
        }
    }

    pub fn component_bytes(self) -> usize {
        match self {
            NormalFormat::Snorm8 => 1,
            NormalFormat::Snorm16 => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            NormalFormat::Snorm8 => "snorm8",
            NormalFormat::Snorm16 => "snorm16",
        }
    }
}

/// `round(component * signed_max)`, clamped to the representable range.
pub fn quantize_component(component: f32, format: NormalFormat) -> i16 {
    let max = format.signed_max() as f32;
    (component * max).round().clamp(-max, max) as i16
}

/// Normals in output vertex order, one triple per output slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedNormals {
    format: NormalFormat,
    values: Vec<[i16; 3]>,
    collisions: usize,
    placeholder: bool,
}

impl QuantizedNormals {
    pub fn format(&self) -> NormalFormat {
        self.format
    }

    /// Triples in the attribute's integer domain. For [`NormalFormat::Snorm8`]
    /// every component fits an `i8`.
    pub fn values(&self) -> &[[i16; 3]] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of writes that landed on an already written slot.
    pub fn collisions(&self) -> usize {
        self.collisions
    }

    /// True when the source had no normals and every slot holds the
    /// placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn byte_len(&self) -> usize {
        self.values.len() * 3 * self.format.component_bytes()
    }

    pub fn to_snorm8(&self) -> Option<Vec<[i8; 3]>> {
        if self.format != NormalFormat::Snorm8 {
            return None;
        }
        Some(
            self.values
                .iter()
                .map(|n| [n[0] as i8, n[1] as i8, n[2] as i8])
                .collect(),
        )
    }

    /// Back to unit-range floats, as a GPU would read the attribute.
    pub fn to_f32(&self, slot: usize) -> [f32; 3] {
        let max = self.format.signed_max() as f32;
        let n = self.values[slot];
        [
            (n[0] as f32 / max).max(-1.0),
            (n[1] as f32 / max).max(-1.0),
            (n[2] as f32 / max).max(-1.0),
        ]
    }
}

/// Re-buckets `normals` (indexed by source vertex) through `remap` into
/// `output_vertex_count` slots.
///
/// Without source normals every slot gets [`PLACEHOLDER_NORMAL`]. Slots no
/// source vertex maps to (block padding) stay zero. When two source vertices
/// map to the same slot the last write wins and the collision is counted.
pub fn requantize_normals(
    normals: Option<&[[f32; 3]]>,
    remap: &[u32],
    output_vertex_count: usize,
    format: NormalFormat,
) -> RepackResult<QuantizedNormals> {
    let normals = match normals {
        Some(normals) => normals,
        None => {
            return Ok(QuantizedNormals {
                format,
                values: vec![PLACEHOLDER_NORMAL; output_vertex_count],
                collisions: 0,
                placeholder: true,
            });
        }
    };

    if normals.len() < remap.len() {
        return Err(RepackError::NormalCountMismatch { expected: remap.len(), found: normals.len() });
    }

    let mut values = vec![[0i16; 3]; output_vertex_count];
    let mut written = vec![false; output_vertex_count];
    let mut collisions = 0usize;
    for (old, &new) in remap.iter().enumerate() {
        let new = new as usize;
        if new >= output_vertex_count {
            return Err(RepackError::IndexOutOfRange { index: new, len: output_vertex_count });
        }
        if written[new] {
            collisions += 1;
        }
        let n = normals[old];
        values[new] = [
            quantize_component(n[0], format),
            quantize_component(n[1], format),
            quantize_component(n[2], format),
        ];
        written[new] = true;
    }

    if collisions > 0 {
        warn!(collisions, "remap table maps several vertices to one slot; kept the last normal written");
    }

    Ok(QuantizedNormals { format, values, collisions, placeholder: false })
}
