//! Float ↔ integer grid conversion.
//!
//! Positions reach the codec already quantized to 16 bits; this module holds
//! the upstream quantizer used to produce them and the dequantization that
//! the reconstruction stage applies at the end.

/// Largest value of the 16-bit position grid.
pub const POSITION_GRID_MAX: i32 = u16::MAX as i32;

/// Per-axis affine map from the integer grid back to model space:
/// `model = grid * scale + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionDequantization {
    pub scale: [f32; 3],
    pub offset: [f32; 3],
}

impl Default for PositionDequantization {
    fn default() -> Self {
        Self::identity()
    }
}

impl PositionDequantization {
    pub const fn identity() -> Self {
        Self { scale: [1.0; 3], offset: [0.0; 3] }
    }

    pub fn apply(&self, grid: [u16; 3]) -> [f32; 3] {
        let mut out = [0.0f32; 3];
        for a in 0..3 {
            out[a] = grid[a] as f32 * self.scale[a] + self.offset[a];
        }
        out
    }
}

/// Quantizes float positions into the 16-bit grid spanned by their bounding
/// box. Grid line `q` on axis `a` sits at `min[a] + q * step[a]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionQuantizer {
    min: [f32; 3],
    step: [f32; 3],
}

impl PositionQuantizer {
    /// Fits the grid to the axis-aligned bounds of `positions`. Degenerate
    /// axes get a unit range so every value lands on grid line 0.
    pub fn fit(positions: &[[f32; 3]]) -> Self {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for p in positions {
            for a in 0..3 {
                min[a] = min[a].min(p[a]);
                max[a] = max[a].max(p[a]);
            }
        }
        if positions.is_empty() {
            min = [0.0; 3];
            max = [0.0; 3];
        }

        let mut step = [0.0f32; 3];
        for a in 0..3 {
            let range = max[a] - min[a];
            let range = if range > 0.0 { range } else { 1.0 };
            step[a] = range / POSITION_GRID_MAX as f32;
        }
        Self { min, step }
    }

    /// Spacing of adjacent grid lines per axis.
    pub fn step(&self) -> [f32; 3] {
        self.step
    }

    /// Nearest grid line per axis, clamped to the grid.
    pub fn quantize(&self, p: [f32; 3]) -> [u16; 3] {
        let mut out = [0u16; 3];
        for a in 0..3 {
            let q = ((p[a] - self.min[a]) / self.step[a] + 0.5).floor();
            out[a] = q.clamp(0.0, POSITION_GRID_MAX as f32) as u16;
        }
        out
    }

    /// Quantizes every position into a tightly packed xyz sample array.
    pub fn quantize_all(&self, positions: &[[f32; 3]]) -> Vec<u16> {
        let mut samples = Vec::with_capacity(positions.len() * 3);
        for p in positions {
            samples.extend_from_slice(&self.quantize(*p));
        }
        samples
    }

    pub fn dequantization(&self) -> PositionDequantization {
        PositionDequantization { scale: self.step, offset: self.min }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rounds_to_nearest_grid_line() {
        // Range 65.535 gives a step of exactly 0.001.
        let quantizer = PositionQuantizer::fit(&[[0.0; 3], [65.535; 3]]);
        assert!((quantizer.step()[0] - 0.001).abs() < 1e-7);
        assert_eq!(quantizer.quantize([0.0; 3]), [0; 3]);
        assert_eq!(quantizer.quantize([0.0044, 0.0046, 65.535]), [4, 5, 65535]);
    }

    #[test]
    fn test_clamps_outside_bounds() {
        let quantizer = PositionQuantizer::fit(&[[0.0; 3], [1.0; 3]]);
        assert_eq!(quantizer.quantize([-5.0, 0.25, 7.0]), [0, 16384, 65535]);
    }

    #[test]
    fn test_position_roundtrip_within_half_step() {
        let src = [[0.0, 1.0, 2.0], [10.0, 20.0, 30.0], [-1.0, 0.5, 100.0]];
        let quantizer = PositionQuantizer::fit(&src);
        let deq = quantizer.dequantization();
        for p in &src {
            let restored = deq.apply(quantizer.quantize(*p));
            for a in 0..3 {
                let tol = 0.5 * deq.scale[a] + 1e-4;
                assert!((restored[a] - p[a]).abs() <= tol, "axis {} off by {}", a, (restored[a] - p[a]).abs());
            }
        }
    }

    #[test]
    fn test_degenerate_axis() {
        let src = [[1.0, 5.0, 0.0], [2.0, 5.0, 1.0]];
        let quantizer = PositionQuantizer::fit(&src);
        assert_eq!(quantizer.quantize([1.0, 5.0, 0.0])[1], 0);
        assert_eq!(quantizer.quantize([2.0, 5.0, 1.0]), [65535, 0, 65535]);
        assert_eq!(quantizer.quantize_all(&src).len(), 6);
    }

    #[test]
    fn test_identity_dequantization() {
        let deq = PositionDequantization::default();
        assert_eq!(deq.apply([1, 2, 3]), [1.0, 2.0, 3.0]);
    }
}
