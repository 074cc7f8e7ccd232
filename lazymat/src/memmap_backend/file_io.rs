//! File layout and creation for lazymat files
//!
//! A file is the 96-byte header, the label table, the row and column
//! property matrices (f64, little-endian, row-major) and finally the value
//! region. Every region starts on an 8-byte boundary.

use crate::Result;
use lazymat_core::format::LabelTableBuilder;
use lazymat_core::validation::{align_to_8, checked_byte_len};
use lazymat_core::{CoreError, DataType, Iid, LabeledAxis, MatHeader, StorageOrder};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Region offsets and sizes for a new file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FileLayout {
    pub metadata_offset: usize,
    pub metadata_size: usize,
    pub row_property_offset: usize,
    pub row_property_size: usize,
    pub col_property_offset: usize,
    pub col_property_size: usize,
    pub values_offset: usize,
    pub values_size: usize,
}

impl FileLayout {
    pub fn calculate(
        metadata_size: usize,
        row_property_len: usize,
        col_property_len: usize,
        element_count: usize,
        data_type: DataType,
    ) -> Result<Self> {
        let metadata_offset = align_to_8(MatHeader::SIZE);
        let row_property_offset = align_to_8(end(metadata_offset, metadata_size)?);
        let row_property_size = checked_byte_len(row_property_len, 8)?;
        let col_property_offset = align_to_8(end(row_property_offset, row_property_size)?);
        let col_property_size = checked_byte_len(col_property_len, 8)?;
        let values_offset = align_to_8(end(col_property_offset, col_property_size)?);
        let values_size = checked_byte_len(element_count, data_type.size_bytes())?;
        end(values_offset, values_size)?;

        Ok(Self {
            metadata_offset,
            metadata_size,
            row_property_offset,
            row_property_size,
            col_property_offset,
            col_property_size,
            values_offset,
            values_size,
        })
    }

    /// Total file length
    pub fn file_len(&self) -> usize {
        self.values_offset + self.values_size
    }
}

fn end(offset: usize, size: usize) -> Result<usize> {
    Ok(offset
        .checked_add(size)
        .ok_or(CoreError::ArraySizeOverflow)?)
}

/// Everything needed to lay out a new file, minus the values
pub(crate) struct Preamble<'a> {
    pub row: &'a LabeledAxis<Iid>,
    pub col: &'a LabeledAxis<String>,
    pub row_property: &'a Array2<f64>,
    pub col_property: &'a Array2<f64>,
    pub data_type: DataType,
    pub order: StorageOrder,
    pub depth: Option<usize>,
}

impl Preamble<'_> {
    fn label_table(&self) -> Result<Vec<u8>> {
        Ok(LabelTableBuilder::new()
            .with_fid(self.row.iter().map(|iid| iid.fid.as_bytes()))
            .with_iid(self.row.iter().map(|iid| iid.iid.as_bytes()))
            .with_col(self.col.iter().map(String::as_bytes))
            .build()?)
    }

    fn header(&self, layout: &FileLayout) -> MatHeader {
        let mut header = MatHeader::new();
        header.data_type = self.data_type as u8;
        header.order = self.order as u8;
        header.ndim = if self.depth.is_some() { 3 } else { 2 };
        header.nrows = self.row.len() as u64;
        header.ncols = self.col.len() as u64;
        header.depth = self.depth.unwrap_or(1) as u64;
        header.row_property_width = self.row_property.ncols() as u64;
        header.col_property_width = self.col_property.ncols() as u64;
        header.metadata_offset = layout.metadata_offset as u64;
        header.metadata_size = layout.metadata_size as u64;
        header.row_property_offset = layout.row_property_offset as u64;
        header.col_property_offset = layout.col_property_offset as u64;
        header.values_offset = layout.values_offset as u64;
        header.values_size = layout.values_size as u64;
        header
    }

    /// Create the file at `path` with a zero-filled value region
    pub fn create(&self, path: &Path) -> Result<File> {
        let table = self.label_table()?;
        let element_count = self
            .row
            .len()
            .checked_mul(self.col.len())
            .and_then(|n| n.checked_mul(self.depth.unwrap_or(1)))
            .ok_or(CoreError::ArraySizeOverflow)?;
        let layout = FileLayout::calculate(
            table.len(),
            self.row_property.len(),
            self.col_property.len(),
            element_count,
            self.data_type,
        )?;
        let header = self.header(&layout);
        header.validate()?;

        let file = File::options()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        {
            let mut out = BufWriter::new(&file);
            out.write_all(&header.to_bytes())?;
            out.seek(SeekFrom::Start(layout.metadata_offset as u64))?;
            out.write_all(&table)?;
            out.seek(SeekFrom::Start(layout.row_property_offset as u64))?;
            write_property(&mut out, self.row_property)?;
            out.seek(SeekFrom::Start(layout.col_property_offset as u64))?;
            write_property(&mut out, self.col_property)?;
            out.flush()?;
        }
        // Extending the file zero-fills the value region
        file.set_len(layout.file_len() as u64)?;
        tracing::debug!(
            path = %path.display(),
            bytes = layout.file_len(),
            values_offset = layout.values_offset,
            "created lazymat file"
        );
        Ok(file)
    }
}

fn write_property<W: Write>(out: &mut W, property: &Array2<f64>) -> Result<()> {
    for value in property.iter() {
        out.write_all(&value.to_le_bytes())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_alignment() {
        let layout = FileLayout::calculate(61, 3, 0, 7, DataType::F32).unwrap();
        assert_eq!(layout.metadata_offset, 96);
        assert_eq!(layout.row_property_offset, 160);
        assert_eq!(layout.col_property_offset, 184);
        assert_eq!(layout.values_offset, 184);
        assert_eq!(layout.file_len(), 184 + 28);
        for offset in [
            layout.metadata_offset,
            layout.row_property_offset,
            layout.col_property_offset,
            layout.values_offset,
        ] {
            assert_eq!(offset % 8, 0);
        }
    }

    #[test]
    fn test_layout_overflow() {
        assert!(FileLayout::calculate(0, 0, 0, usize::MAX, DataType::F64).is_err());
    }
}
