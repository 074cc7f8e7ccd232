//! Error types for lazymat core operations

use crate::format::DataType;

/// Broad failure categories shared by every layer of the library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Array or mask dimensions disagree with the declared axes
    Shape,
    /// Index, label or slice outside the axis it addresses
    Index,
    /// Metadata and backing store disagree
    Consistency,
    /// Operation not available on this dataset or in this state
    Unsupported,
    /// Stored bytes do not describe a valid file
    Format,
}

/// Errors that can occur in lazymat core operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// Value buffer shape does not match (row_count, col_count)
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },
    /// Boolean mask length differs from the axis length
    MaskLength { expected: usize, actual: usize },
    /// Value buffer has an unsupported number of dimensions
    DimensionCount { actual: usize },
    /// Property matrix row count differs from its axis
    PropertyLength { expected: usize, actual: usize },
    /// Index outside `-len..len`
    IndexOutOfBounds { index: isize, len: usize },
    /// Slice step of zero
    ZeroStep,
    /// Label appears more than once where uniqueness is required
    DuplicateLabel { position: usize },
    /// Label is not present on the axis
    LabelNotFound,
    /// A reader returned data whose size contradicts its own metadata
    CountMismatch { declared: usize, actual: usize },
    /// Stored element type differs from the requested handle type
    DataTypeMismatch { expected: DataType, actual: DataType },
    /// Operation needs an open handle
    NotOpen,
    /// Mutation attempted on a read-only mapping
    ReadOnly,
    /// Invalid file header
    InvalidHeader,
    /// Invalid label table
    InvalidMetadata,
    /// Unsupported format version
    UnsupportedFormat,
    /// Data corruption detected
    CorruptedData,
    /// Insufficient buffer space
    InsufficientBuffer,
    /// Byte length or address not aligned to the element type
    ArrayAlignment,
    /// Size computation would overflow
    ArraySizeOverflow,
    /// Unparseable selector text
    InvalidSelector,
}

impl CoreError {
    /// Category of this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            CoreError::ShapeMismatch { .. }
            | CoreError::MaskLength { .. }
            | CoreError::DimensionCount { .. }
            | CoreError::PropertyLength { .. } => ErrorKind::Shape,
            CoreError::IndexOutOfBounds { .. }
            | CoreError::ZeroStep
            | CoreError::DuplicateLabel { .. }
            | CoreError::LabelNotFound
            | CoreError::InvalidSelector => ErrorKind::Index,
            CoreError::CountMismatch { .. } | CoreError::DataTypeMismatch { .. } => {
                ErrorKind::Consistency
            }
            CoreError::NotOpen | CoreError::ReadOnly => ErrorKind::Unsupported,
            CoreError::InvalidHeader
            | CoreError::InvalidMetadata
            | CoreError::UnsupportedFormat
            | CoreError::CorruptedData
            | CoreError::InsufficientBuffer
            | CoreError::ArrayAlignment
            | CoreError::ArraySizeOverflow => ErrorKind::Format,
        }
    }
}

impl core::fmt::Display for CoreError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CoreError::ShapeMismatch { expected, actual } => write!(
                f,
                "Expected value shape ({}, {}), got ({}, {})",
                expected.0, expected.1, actual.0, actual.1
            ),
            CoreError::MaskLength { expected, actual } => {
                write!(f, "Mask length {actual} does not match axis length {expected}")
            }
            CoreError::DimensionCount { actual } => {
                write!(f, "Expected a 2-D or 3-D value buffer, got {actual} dimensions")
            }
            CoreError::PropertyLength { expected, actual } => {
                write!(f, "Property has {actual} rows, axis has {expected}")
            }
            CoreError::IndexOutOfBounds { index, len } => {
                write!(f, "Index {index} out of bounds for axis of length {len}")
            }
            CoreError::ZeroStep => write!(f, "Slice step cannot be zero"),
            CoreError::DuplicateLabel { position } => {
                write!(f, "Duplicate label at position {position}")
            }
            CoreError::LabelNotFound => write!(f, "Label not found"),
            CoreError::CountMismatch { declared, actual } => write!(
                f,
                "Backing store returned {actual} entries where metadata declares {declared}"
            ),
            CoreError::DataTypeMismatch { expected, actual } => {
                write!(f, "Expected data type {expected:?}, file stores {actual:?}")
            }
            CoreError::NotOpen => write!(f, "Handle is not open"),
            CoreError::ReadOnly => write!(f, "Mapping is read-only"),
            CoreError::InvalidHeader => write!(f, "Invalid lazymat header"),
            CoreError::InvalidMetadata => write!(f, "Invalid label table"),
            CoreError::UnsupportedFormat => write!(f, "Unsupported format version"),
            CoreError::CorruptedData => write!(f, "Data corruption detected"),
            CoreError::InsufficientBuffer => write!(f, "Insufficient buffer space"),
            CoreError::ArrayAlignment => write!(f, "Array not aligned to element size"),
            CoreError::ArraySizeOverflow => write!(f, "Array size calculation would overflow"),
            CoreError::InvalidSelector => write!(f, "Invalid selector syntax"),
        }
    }
}

impl std::error::Error for CoreError {}

/// Result type for core operations
pub type Result<T> = core::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CoreError::MaskLength {
                expected: 3,
                actual: 2
            }
            .kind(),
            ErrorKind::Shape
        );
        assert_eq!(
            CoreError::IndexOutOfBounds { index: 7, len: 3 }.kind(),
            ErrorKind::Index
        );
        assert_eq!(CoreError::ReadOnly.kind(), ErrorKind::Unsupported);
        assert_eq!(CoreError::InvalidHeader.kind(), ErrorKind::Format);
    }

    #[test]
    fn test_display() {
        let err = CoreError::IndexOutOfBounds { index: -4, len: 3 };
        assert_eq!(err.to_string(), "Index -4 out of bounds for axis of length 3");
    }
}
