//! Error handling for repacking operations.
//!
//! Every failure is local to the mesh being processed: the caller logs it,
//! keeps the mesh's original geometry and moves on to the next mesh.

use thiserror::Error;

use crate::data_types::{DataType, IndexWidth};

/// Failure classes a caller can react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The mesh cannot be encoded at all (no topology, wrong sample type).
    UnsupportedInput,
    /// The output capacity was too small; retrying with a larger one may work.
    CapacityOverflow,
    /// Buffers are inconsistent with each other or with the remap table.
    InvalidInput,
    /// The codec context was configured with unusable values.
    Configuration,
}

impl ErrorKind {
    /// Returns the name of this error kind as a string
    pub const fn name(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedInput => "UNSUPPORTED_INPUT",
            ErrorKind::CapacityOverflow => "CAPACITY_OVERFLOW",
            ErrorKind::InvalidInput => "INVALID_INPUT",
            ErrorKind::Configuration => "CONFIGURATION",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RepackError {
    #[error("mesh has no index buffer; the codec requires indexed topology")]
    MissingIndexBuffer,
    #[error("position samples must be 16-bit unsigned quantized values, found {found:?}")]
    UnsupportedSampleType { found: DataType },
    #[error("invalid vertex layout: {0}")]
    InvalidLayout(String),
    #[error("block size {0} must be positive and divisible by 32 and 3")]
    InvalidBlockSize(u32),
    #[error("anchor texture width {0} is out of range")]
    InvalidTextureWidth(u32),
    #[error("output capacity of {capacity} vertices exceeded while repacking {vertex_count} vertices")]
    CapacityOverflow { capacity: usize, vertex_count: usize },
    #[error("index {index} is outside a remap table of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("remapped index {value} does not fit a {width:?} index buffer")]
    IndexWidthOverflow { value: u32, width: IndexWidth },
    #[error("expected {expected} normals, found {found}")]
    NormalCountMismatch { expected: usize, found: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("block size already set to {current}, refusing to change it to {requested}")]
    BlockSizeAlreadySet { current: u32, requested: u32 },
}

impl RepackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RepackError::MissingIndexBuffer | RepackError::UnsupportedSampleType { .. } => {
                ErrorKind::UnsupportedInput
            }
            RepackError::CapacityOverflow { .. } => ErrorKind::CapacityOverflow,
            RepackError::InvalidLayout(_)
            | RepackError::IndexOutOfRange { .. }
            | RepackError::IndexWidthOverflow { .. }
            | RepackError::NormalCountMismatch { .. }
            | RepackError::InvalidParameter(_) => ErrorKind::InvalidInput,
            RepackError::InvalidBlockSize(_)
            | RepackError::InvalidTextureWidth(_)
            | RepackError::BlockSizeAlreadySet { .. } => ErrorKind::Configuration,
        }
    }

    /// True when raising the output capacity and retrying can succeed.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::CapacityOverflow
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        RepackError::InvalidParameter(message.into())
    }

    pub fn invalid_layout(message: impl Into<String>) -> Self {
        RepackError::InvalidLayout(message.into())
    }
}

pub type RepackResult<T> = Result<T, RepackError>;
