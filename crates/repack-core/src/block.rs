//! Block partitioning of the output vertex index space.
//!
//! Output vertices are grouped into runs of `block_size` consecutive slots;
//! every run shares a single anchor.

use crate::data_types::ceil_div;
use crate::error::{RepackError, RepackResult};

/// Default number of output vertices per block.
pub const DEFAULT_BLOCK_SIZE: u32 = 96;

/// Index of an output vertex slot (after reordering and padding).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputVertex(pub u32);

/// Index of a block; there is one anchor per block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockIndex(pub u32);

impl From<u32> for OutputVertex {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<OutputVertex> for usize {
    fn from(v: OutputVertex) -> Self {
        v.0 as usize
    }
}

impl From<BlockIndex> for usize {
    fn from(v: BlockIndex) -> Self {
        v.0 as usize
    }
}

/// Validated block size: positive and divisible by both 32 and 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockSize(u32);

impl BlockSize {
    pub fn new(size: u32) -> RepackResult<Self> {
        if size == 0 || size % 32 != 0 || size % 3 != 0 {
            return Err(RepackError::InvalidBlockSize(size));
        }
        Ok(Self(size))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub fn block_of(self, vertex: OutputVertex) -> BlockIndex {
        BlockIndex(vertex.0 / self.0)
    }

    /// True when `slot` is the first slot of a block.
    pub fn is_block_start(self, slot: usize) -> bool {
        slot % self.as_usize() == 0
    }

    /// Number of blocks covering `output_vertices` slots.
    pub fn block_count(self, output_vertices: usize) -> usize {
        block_count_for(output_vertices, self.as_usize())
    }

    /// Anchor slots to reserve for an output capacity: one block of slack on
    /// top of the blocks the capacity can span.
    pub fn anchor_capacity(self, max_output_vertices: usize) -> usize {
        self.block_count(max_output_vertices) + 1
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self(DEFAULT_BLOCK_SIZE)
    }
}

/// `ceil(output_vertices / block_size)` for an arbitrary non-zero block size.
pub fn block_count_for(output_vertices: usize, block_size: usize) -> usize {
    ceil_div(output_vertices, block_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_validation() {
        assert!(BlockSize::new(96).is_ok());
        assert!(BlockSize::new(192).is_ok());
        assert_eq!(BlockSize::new(0), Err(RepackError::InvalidBlockSize(0)));
        assert_eq!(BlockSize::new(64), Err(RepackError::InvalidBlockSize(64)));
        assert_eq!(BlockSize::new(48), Err(RepackError::InvalidBlockSize(48)));
        assert_eq!(BlockSize::default().get(), DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_block_of() {
        let size = BlockSize::new(96).unwrap();
        assert_eq!(size.block_of(OutputVertex(0)), BlockIndex(0));
        assert_eq!(size.block_of(OutputVertex(95)), BlockIndex(0));
        assert_eq!(size.block_of(OutputVertex(96)), BlockIndex(1));
        assert!(size.is_block_start(192));
        assert!(!size.is_block_start(193));
    }

    #[test]
    fn test_counts() {
        let size = BlockSize::new(96).unwrap();
        assert_eq!(size.block_count(0), 0);
        assert_eq!(size.block_count(96), 1);
        assert_eq!(size.block_count(97), 2);
        // 150 slots span two blocks, plus one of slack.
        assert_eq!(size.anchor_capacity(150), 3);
        assert_eq!(block_count_for(100, 64), 2);
    }
}
