//! File header for memory-mapped lazymat datasets
//!
//! The header is a fixed 96-byte little-endian record at offset zero. It
//! records element type, storage order, dimensions and the location of every
//! region that follows it.

use crate::{CoreError, Result};

/// Element type stored in the value region
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DataType {
    F32 = 0,
    F64 = 1,
}

impl DataType {
    /// Decode from the header byte
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(DataType::F32),
            1 => Some(DataType::F64),
            _ => None,
        }
    }

    /// Element width in bytes
    pub const fn size_bytes(self) -> usize {
        match self {
            DataType::F32 => 4,
            DataType::F64 => 8,
        }
    }
}

/// Physical layout of the value region
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StorageOrder {
    /// Row-major
    C = 0,
    /// Column-major
    F = 1,
}

impl StorageOrder {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(StorageOrder::C),
            1 => Some(StorageOrder::F),
            _ => None,
        }
    }

    /// Flat offset of `(row, col, depth_index)` in a buffer of the given dims
    #[inline]
    pub const fn offset(
        self,
        dims: (usize, usize, usize),
        row: usize,
        col: usize,
        d: usize,
    ) -> usize {
        let (nrows, ncols, depth) = dims;
        match self {
            StorageOrder::C => (row * ncols + col) * depth + d,
            StorageOrder::F => row + nrows * (col + ncols * d),
        }
    }
}

/// Standard header for lazymat files
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatHeader {
    /// Magic bytes: "LZMT"
    pub magic: [u8; 4],
    /// Format version
    pub version: u8,
    /// Element type (f32=0, f64=1)
    pub data_type: u8,
    /// Storage order (C=0, F=1)
    pub order: u8,
    /// Number of value dimensions (2 or 3)
    pub ndim: u8,
    pub nrows: u64,
    pub ncols: u64,
    /// Trailing dimension, 1 for plain matrices
    pub depth: u64,
    /// Columns in the row property matrix
    pub row_property_width: u64,
    /// Columns in the column property matrix
    pub col_property_width: u64,
    /// Offset to the label table
    pub metadata_offset: u64,
    /// Size of the label table in bytes
    pub metadata_size: u64,
    pub row_property_offset: u64,
    pub col_property_offset: u64,
    /// Offset to the value region, aligned to 8 bytes
    pub values_offset: u64,
    /// Size of the value region in bytes
    pub values_size: u64,
}

impl Default for MatHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl MatHeader {
    /// Magic bytes for lazymat files
    pub const MAGIC: [u8; 4] = *b"LZMT";

    /// Current format version
    pub const VERSION: u8 = 1;

    /// Size of the header in bytes
    pub const SIZE: usize = 96;

    /// Create a new header with default values
    pub const fn new() -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            data_type: DataType::F64 as u8,
            order: StorageOrder::F as u8,
            ndim: 2,
            nrows: 0,
            ncols: 0,
            depth: 1,
            row_property_width: 0,
            col_property_width: 0,
            metadata_offset: 0,
            metadata_size: 0,
            row_property_offset: 0,
            col_property_offset: 0,
            values_offset: 0,
            values_size: 0,
        }
    }

    /// Decoded element type
    pub fn data_type(&self) -> Result<DataType> {
        DataType::from_u8(self.data_type).ok_or(CoreError::InvalidHeader)
    }

    /// Decoded storage order
    pub fn storage_order(&self) -> Result<StorageOrder> {
        StorageOrder::from_u8(self.order).ok_or(CoreError::InvalidHeader)
    }

    /// `(nrows, ncols, depth)` as native sizes
    pub fn dims(&self) -> Result<(usize, usize, usize)> {
        let to_usize = |v: u64| usize::try_from(v).map_err(|_| CoreError::ArraySizeOverflow);
        Ok((
            to_usize(self.nrows)?,
            to_usize(self.ncols)?,
            to_usize(self.depth)?,
        ))
    }

    /// Number of stored elements, with overflow protection
    pub fn element_count(&self) -> Result<u64> {
        self.nrows
            .checked_mul(self.ncols)
            .and_then(|n| n.checked_mul(self.depth))
            .ok_or(CoreError::ArraySizeOverflow)
    }

    /// Validate the header structure
    pub fn is_valid(&self) -> bool {
        self.magic == Self::MAGIC && self.version <= Self::VERSION
    }

    /// Check field consistency beyond magic and version
    pub fn validate(&self) -> Result<()> {
        if !self.is_valid() {
            return Err(CoreError::InvalidHeader);
        }
        let data_type = self.data_type()?;
        self.storage_order()?;
        match (self.ndim, self.depth) {
            (2, 1) => {}
            (3, d) if d >= 1 => {}
            _ => return Err(CoreError::InvalidHeader),
        }
        let expected = self
            .element_count()?
            .checked_mul(data_type.size_bytes() as u64)
            .ok_or(CoreError::ArraySizeOverflow)?;
        if expected != self.values_size {
            return Err(CoreError::CorruptedData);
        }
        if self.values_offset % crate::format::constants::ALIGNMENT_BOUNDARY as u64 != 0 {
            return Err(CoreError::ArrayAlignment);
        }
        Ok(())
    }

    /// Parse header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(CoreError::InsufficientBuffer);
        }

        if bytes[0..4] != Self::MAGIC {
            return Err(CoreError::InvalidHeader);
        }

        let version = bytes[4];
        if version > Self::VERSION {
            return Err(CoreError::UnsupportedFormat);
        }

        let field = |index: usize| -> Result<u64> {
            let start = 8 + index * 8;
            let raw: [u8; 8] = bytes[start..start + 8]
                .try_into()
                .map_err(|_| CoreError::InvalidHeader)?;
            Ok(u64::from_le_bytes(raw))
        };

        let header = Self {
            magic: Self::MAGIC,
            version,
            data_type: bytes[5],
            order: bytes[6],
            ndim: bytes[7],
            nrows: field(0)?,
            ncols: field(1)?,
            depth: field(2)?,
            row_property_width: field(3)?,
            col_property_width: field(4)?,
            metadata_offset: field(5)?,
            metadata_size: field(6)?,
            row_property_offset: field(7)?,
            col_property_offset: field(8)?,
            values_offset: field(9)?,
            values_size: field(10)?,
        };
        header.validate()?;
        Ok(header)
    }

    /// Convert header to bytes
    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes[5] = self.data_type;
        bytes[6] = self.order;
        bytes[7] = self.ndim;
        let fields = [
            self.nrows,
            self.ncols,
            self.depth,
            self.row_property_width,
            self.col_property_width,
            self.metadata_offset,
            self.metadata_size,
            self.row_property_offset,
            self.col_property_offset,
            self.values_offset,
            self.values_size,
        ];
        for (i, value) in fields.iter().enumerate() {
            let start = 8 + i * 8;
            bytes[start..start + 8].copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MatHeader {
        let mut header = MatHeader::new();
        header.data_type = DataType::F32 as u8;
        header.order = StorageOrder::C as u8;
        header.nrows = 3;
        header.ncols = 4;
        header.row_property_width = 2;
        header.metadata_offset = 96;
        header.metadata_size = 120;
        header.values_offset = 256;
        header.values_size = 3 * 4 * 4;
        header
    }

    #[test]
    fn test_header_bytes() {
        let header = sample();
        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], b"LZMT");
        assert_eq!(MatHeader::from_bytes(&bytes), Ok(header));
    }

    #[test]
    fn test_header_rejects_bad_magic() {
        let mut bytes = sample().to_bytes();
        bytes[0] = b'X';
        assert_eq!(MatHeader::from_bytes(&bytes), Err(CoreError::InvalidHeader));
    }

    #[test]
    fn test_header_rejects_short_buffer() {
        let bytes = sample().to_bytes();
        assert_eq!(
            MatHeader::from_bytes(&bytes[..40]),
            Err(CoreError::InsufficientBuffer)
        );
    }

    #[test]
    fn test_header_detects_size_mismatch() {
        let mut header = sample();
        header.values_size += 4;
        assert_eq!(
            MatHeader::from_bytes(&header.to_bytes()),
            Err(CoreError::CorruptedData)
        );
    }

    #[test]
    fn test_depth_requires_three_dims() {
        let mut header = sample();
        header.depth = 3;
        header.values_size *= 3;
        assert_eq!(header.validate(), Err(CoreError::InvalidHeader));
        header.ndim = 3;
        assert_eq!(header.validate(), Ok(()));
    }

    #[test]
    fn test_storage_offsets() {
        let dims = (2, 3, 1);
        assert_eq!(StorageOrder::C.offset(dims, 1, 2, 0), 5);
        assert_eq!(StorageOrder::F.offset(dims, 1, 2, 0), 5);
        assert_eq!(StorageOrder::C.offset(dims, 1, 0, 0), 3);
        assert_eq!(StorageOrder::F.offset(dims, 1, 0, 0), 1);
        let deep = (2, 3, 4);
        assert_eq!(StorageOrder::C.offset(deep, 1, 2, 3), 23);
        assert_eq!(StorageOrder::F.offset(deep, 1, 2, 3), 23);
        assert_eq!(StorageOrder::F.offset(deep, 0, 1, 2), 14);
    }
}
