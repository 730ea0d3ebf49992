/// Element type of a raw attribute sample array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
}

impl DataType {
    pub fn byte_length(&self) -> usize {
        match self {
            DataType::Int8 | DataType::Uint8 => 1,
            DataType::Int16 | DataType::Uint16 => 2,
            DataType::Int32 | DataType::Uint32 | DataType::Float32 => 4,
        }
    }
}

/// Element width of an index buffer. Resolved once from the source buffer
/// and carried through remapping unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexWidth {
    U16 = 2,
    U32 = 4,
}

impl IndexWidth {
    pub fn byte_length(&self) -> usize {
        *self as usize
    }

    /// Largest vertex index representable at this width.
    pub fn max_index(&self) -> u32 {
        match self {
            IndexWidth::U16 => u16::MAX as u32,
            IndexWidth::U32 => u32::MAX,
        }
    }

    /// Parses the byte width used on the C boundary (2 or 4).
    pub fn from_byte_length(bytes: usize) -> Option<Self> {
        match bytes {
            2 => Some(IndexWidth::U16),
            4 => Some(IndexWidth::U32),
            _ => None,
        }
    }
}

/// Rounds `a / b` up. `b` must be non-zero.
pub(crate) fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_width_bytes() {
        assert_eq!(IndexWidth::U16.byte_length(), 2);
        assert_eq!(IndexWidth::U32.byte_length(), 4);
        assert_eq!(IndexWidth::from_byte_length(2), Some(IndexWidth::U16));
        assert_eq!(IndexWidth::from_byte_length(4), Some(IndexWidth::U32));
        assert_eq!(IndexWidth::from_byte_length(1), None);
        assert_eq!(IndexWidth::U16.max_index(), 65535);
    }

    #[test]
    fn test_ceil_div() {
        assert_eq!(ceil_div(0, 64), 0);
        assert_eq!(ceil_div(1, 64), 1);
        assert_eq!(ceil_div(64, 64), 1);
        assert_eq!(ceil_div(100, 64), 2);
    }
}
