//! Label table layout for lazymat files
//!
//! The table holds three fixed-stride label arrays: family ids, individual
//! ids and column ids. Each label is padded with zero bytes to the array's
//! stride, so a label may not itself contain a zero byte.

use super::constants::labels::*;
use super::constants::{ALIGNMENT_BOUNDARY, MAX_LABEL_STRIDE};
use crate::validation::align_to_boundary;
use crate::{CoreError, Result};

/// Fixed-size label table header (56 bytes, 8-byte aligned)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelTableHeader {
    /// Magic bytes: "META"
    pub magic: [u8; 4],
    pub version: u8,
    pub _padding: [u8; 3],
    /// Offset to the family id array from table start
    pub fid_offset: u64,
    pub fid_size: u64,
    /// Offset to the individual id array from table start
    pub iid_offset: u64,
    pub iid_size: u64,
    /// Offset to the column id array from table start
    pub col_offset: u64,
    pub col_size: u64,
}

impl Default for LabelTableHeader {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelTableHeader {
    pub const fn new() -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            _padding: [0; 3],
            fid_offset: 0,
            fid_size: 0,
            iid_offset: 0,
            iid_size: 0,
            col_offset: 0,
            col_size: 0,
        }
    }

    /// Parse the table header from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(CoreError::InsufficientBuffer);
        }
        if bytes[0..4] != MAGIC {
            return Err(CoreError::InvalidMetadata);
        }
        let version = bytes[4];
        if version > VERSION {
            return Err(CoreError::UnsupportedFormat);
        }

        let field = |index: usize| -> Result<u64> {
            let start = 8 + index * 8;
            let raw: [u8; 8] = bytes[start..start + 8]
                .try_into()
                .map_err(|_| CoreError::InvalidMetadata)?;
            Ok(u64::from_le_bytes(raw))
        };

        Ok(Self {
            magic: MAGIC,
            version,
            _padding: [0; 3],
            fid_offset: field(0)?,
            fid_size: field(1)?,
            iid_offset: field(2)?,
            iid_size: field(3)?,
            col_offset: field(4)?,
            col_size: field(5)?,
        })
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        let fields = [
            self.fid_offset,
            self.fid_size,
            self.iid_offset,
            self.iid_size,
            self.col_offset,
            self.col_size,
        ];
        for (i, value) in fields.iter().enumerate() {
            let start = 8 + i * 8;
            bytes[start..start + 8].copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }
}

/// Label array header (8 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelArrayHeader {
    /// Number of labels in the array
    pub count: u32,
    /// Fixed stride (width) of each label in bytes
    pub stride: u32,
}

impl LabelArrayHeader {
    pub const fn new(count: u32, stride: u32) -> Self {
        Self { count, stride }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < LABEL_ARRAY_HEADER_SIZE {
            return Err(CoreError::InsufficientBuffer);
        }
        let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let stride = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        if stride == 0 || stride > MAX_LABEL_STRIDE {
            return Err(CoreError::InvalidMetadata);
        }
        Ok(Self { count, stride })
    }

    pub fn to_bytes(&self) -> [u8; LABEL_ARRAY_HEADER_SIZE] {
        let mut bytes = [0u8; LABEL_ARRAY_HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.count.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.stride.to_le_bytes());
        bytes
    }

    /// Total size of header plus label data
    pub fn total_size(&self) -> Result<usize> {
        (self.count as usize)
            .checked_mul(self.stride as usize)
            .and_then(|n| n.checked_add(LABEL_ARRAY_HEADER_SIZE))
            .ok_or(CoreError::ArraySizeOverflow)
    }
}

/// Builder for the serialized label table
#[derive(Debug, Default, Clone)]
pub struct LabelTableBuilder {
    fid: Vec<Vec<u8>>,
    iid: Vec<Vec<u8>>,
    col: Vec<Vec<u8>>,
}

impl LabelTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fid<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.fid = labels.into_iter().map(|s| s.as_ref().to_vec()).collect();
        self
    }

    pub fn with_iid<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.iid = labels.into_iter().map(|s| s.as_ref().to_vec()).collect();
        self
    }

    pub fn with_col<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        self.col = labels.into_iter().map(|s| s.as_ref().to_vec()).collect();
        self
    }

    /// Serialize the label table
    pub fn build(&self) -> Result<Vec<u8>> {
        let mut header = LabelTableHeader::new();
        let mut body = Vec::new();
        let mut cursor = HEADER_SIZE;

        for (labels, slot) in [(&self.fid, 0usize), (&self.iid, 1), (&self.col, 2)] {
            let array = encode_label_array(labels)?;
            let offset = align_to_boundary(cursor, ALIGNMENT_BOUNDARY);
            body.resize(offset - HEADER_SIZE, 0);
            let (offset, size) = (offset as u64, array.len() as u64);
            match slot {
                0 => (header.fid_offset, header.fid_size) = (offset, size),
                1 => (header.iid_offset, header.iid_size) = (offset, size),
                _ => (header.col_offset, header.col_size) = (offset, size),
            }
            body.extend_from_slice(&array);
            cursor = HEADER_SIZE + body.len();
        }

        let mut out = Vec::with_capacity(HEADER_SIZE + body.len());
        out.extend_from_slice(&header.to_bytes());
        out.extend_from_slice(&body);
        Ok(out)
    }
}

fn encode_label_array(labels: &[Vec<u8>]) -> Result<Vec<u8>> {
    let widest = labels.iter().map(Vec::len).max().unwrap_or(0).max(1);
    let stride = u32::try_from(widest).map_err(|_| CoreError::InvalidMetadata)?;
    if stride > MAX_LABEL_STRIDE {
        return Err(CoreError::InvalidMetadata);
    }
    let count = u32::try_from(labels.len()).map_err(|_| CoreError::ArraySizeOverflow)?;
    let header = LabelArrayHeader::new(count, stride);

    let mut out = Vec::with_capacity(header.total_size()?);
    out.extend_from_slice(&header.to_bytes());
    for label in labels {
        if label.contains(&0) {
            return Err(CoreError::InvalidMetadata);
        }
        out.extend_from_slice(label);
        out.resize(out.len() + (widest - label.len()), 0);
    }
    Ok(out)
}

/// Borrowed view over one fixed-stride label array
#[derive(Debug, Clone, Copy)]
pub struct LabelArrayView<'a> {
    header: LabelArrayHeader,
    data: &'a [u8],
}

impl<'a> LabelArrayView<'a> {
    pub fn new(bytes: &'a [u8]) -> Result<Self> {
        let header = LabelArrayHeader::from_bytes(bytes)?;
        if bytes.len() < header.total_size()? {
            return Err(CoreError::InvalidMetadata);
        }
        let data = &bytes[LABEL_ARRAY_HEADER_SIZE..header.total_size()?];
        Ok(Self { header, data })
    }

    pub fn len(&self) -> usize {
        self.header.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.header.count == 0
    }

    /// Label bytes at `index` with padding removed
    pub fn get(&self, index: usize) -> Option<&'a [u8]> {
        if index >= self.len() {
            return None;
        }
        let stride = self.header.stride as usize;
        let raw = &self.data[index * stride..(index + 1) * stride];
        let end = raw.iter().position(|&b| b == 0).unwrap_or(stride);
        Some(&raw[..end])
    }

    /// Label at `index` decoded as UTF-8
    pub fn get_str(&self, index: usize) -> Result<&'a str> {
        let bytes = self.get(index).ok_or(CoreError::IndexOutOfBounds {
            index: index as isize,
            len: self.len(),
        })?;
        core::str::from_utf8(bytes).map_err(|_| CoreError::CorruptedData)
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a [u8]> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// View over a serialized label table
#[derive(Debug, Clone, Copy)]
pub struct LabelTableView<'a> {
    data: &'a [u8],
    header: LabelTableHeader,
}

impl<'a> LabelTableView<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self> {
        let header = LabelTableHeader::from_bytes(data)?;
        for (offset, size) in [
            (header.fid_offset, header.fid_size),
            (header.iid_offset, header.iid_size),
            (header.col_offset, header.col_size),
        ] {
            let end = offset.checked_add(size).ok_or(CoreError::ArraySizeOverflow)?;
            if end > data.len() as u64 {
                return Err(CoreError::InvalidMetadata);
            }
        }
        Ok(Self { data, header })
    }

    fn array(&self, offset: u64, size: u64) -> Result<LabelArrayView<'a>> {
        let start = offset as usize;
        LabelArrayView::new(&self.data[start..start + size as usize])
    }

    pub fn fid(&self) -> Result<LabelArrayView<'a>> {
        self.array(self.header.fid_offset, self.header.fid_size)
    }

    pub fn iid(&self) -> Result<LabelArrayView<'a>> {
        self.array(self.header.iid_offset, self.header.iid_size)
    }

    pub fn col(&self) -> Result<LabelArrayView<'a>> {
        self.array(self.header.col_offset, self.header.col_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_table_round_trip() {
        let bytes = LabelTableBuilder::new()
            .with_fid(["f1", "f2"])
            .with_iid(["individual_1", "i2"])
            .with_col(["snp1", "rs12345", "c"])
            .build()
            .unwrap();

        let view = LabelTableView::new(&bytes).unwrap();
        let fid = view.fid().unwrap();
        assert_eq!(fid.len(), 2);
        assert_eq!(fid.get(1), Some(&b"f2"[..]));
        assert_eq!(view.iid().unwrap().get_str(0).unwrap(), "individual_1");
        let col = view.col().unwrap();
        let labels: Vec<&[u8]> = col.iter().collect();
        assert_eq!(labels, vec![&b"snp1"[..], b"rs12345", b"c"]);
        assert_eq!(col.get(3), None);
    }

    #[test]
    fn test_empty_labels_and_arrays() {
        let bytes = LabelTableBuilder::new()
            .with_fid(["", ""])
            .build()
            .unwrap();
        let view = LabelTableView::new(&bytes).unwrap();
        assert_eq!(view.fid().unwrap().get_str(1).unwrap(), "");
        assert!(view.iid().unwrap().is_empty());
        assert!(view.col().unwrap().is_empty());
    }

    #[test]
    fn test_arrays_are_aligned() {
        let bytes = LabelTableBuilder::new()
            .with_fid(["abc"])
            .with_iid(["de"])
            .with_col(["x"])
            .build()
            .unwrap();
        let header = LabelTableHeader::from_bytes(&bytes).unwrap();
        assert_eq!(header.fid_offset % 8, 0);
        assert_eq!(header.iid_offset % 8, 0);
        assert_eq!(header.col_offset % 8, 0);
    }

    #[test]
    fn test_rejects_embedded_nul() {
        let result = LabelTableBuilder::new().with_col([&b"a\0b"[..]]).build();
        assert_eq!(result, Err(CoreError::InvalidMetadata));
    }

    #[test]
    fn test_rejects_truncated_table() {
        let bytes = LabelTableBuilder::new()
            .with_col(["one", "two"])
            .build()
            .unwrap();
        assert!(LabelTableView::new(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn test_label_array_header_validation() {
        let header = LabelArrayHeader::new(10, 0);
        assert_eq!(
            LabelArrayHeader::from_bytes(&header.to_bytes()),
            Err(CoreError::InvalidMetadata)
        );
    }
}
