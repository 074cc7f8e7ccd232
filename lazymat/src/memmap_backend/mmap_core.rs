//! Mapped file regions and their parsed metadata

use crate::{Error, Result};
use lazymat_core::format::LabelTableView;
use lazymat_core::validation::validate_typed_slice;
use lazymat_core::{CoreError, Element, Iid, LabeledAxis, MatHeader, StorageOrder};
use memmap2::{Mmap, MmapMut, MmapOptions};
use ndarray::{Array2, ArrayViewD, ArrayViewMutD, IxDyn, ShapeBuilder};
use std::fs::File;
use std::ops::Range;

/// The raw mapping, read-only or writable
pub(crate) enum Mapping {
    ReadOnly(Mmap),
    Writable(MmapMut),
}

impl Mapping {
    pub fn read_only(file: &File) -> Result<Self> {
        // SAFETY: the file is not truncated by this process while mapped
        let mmap = unsafe { MmapOptions::new().map(file)? };
        Ok(Mapping::ReadOnly(mmap))
    }

    pub fn writable(file: &File) -> Result<Self> {
        // SAFETY: as above; writes go through this mapping only
        let mmap = unsafe { MmapOptions::new().map_mut(file)? };
        Ok(Mapping::Writable(mmap))
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Mapping::ReadOnly(mmap) => &mmap[..],
            Mapping::Writable(mmap) => &mmap[..],
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, Mapping::Writable(_))
    }

    pub fn flush(&self) -> Result<()> {
        if let Mapping::Writable(mmap) = self {
            mmap.flush()?;
        }
        Ok(())
    }
}

/// Byte range of a region, checked against the mapping length
fn region(offset: u64, size: u64, file_len: usize) -> Result<Range<usize>> {
    let start = usize::try_from(offset).map_err(|_| CoreError::ArraySizeOverflow)?;
    let size = usize::try_from(size).map_err(|_| CoreError::ArraySizeOverflow)?;
    let end = start.checked_add(size).ok_or(CoreError::ArraySizeOverflow)?;
    if end > file_len {
        return Err(CoreError::CorruptedData.into());
    }
    Ok(start..end)
}

fn property_bytes(count: u64, width: u64) -> Result<u64> {
    Ok(count
        .checked_mul(width)
        .and_then(|n| n.checked_mul(8))
        .ok_or(CoreError::ArraySizeOverflow)?)
}

fn read_property(bytes: &[u8], rows: usize, width: usize) -> Result<Array2<f64>> {
    let count = rows.checked_mul(width).ok_or(CoreError::ArraySizeOverflow)?;
    if validate_typed_slice::<f64>(bytes)? != count {
        return Err(CoreError::CorruptedData.into());
    }
    let values = bytes
        .chunks_exact(8)
        .map(|chunk| {
            let raw: [u8; 8] = chunk.try_into().map_err(|_| CoreError::CorruptedData)?;
            Ok(f64::from_le_bytes(raw))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Array2::from_shape_vec((rows, width), values)?)
}

fn decode_labels(table: &LabelTableView<'_>) -> Result<(LabeledAxis<Iid>, LabeledAxis<String>)> {
    let (fid, iid, col) = (table.fid()?, table.iid()?, table.col()?);
    if fid.len() != iid.len() {
        return Err(CoreError::InvalidMetadata.into());
    }
    let rows = (0..iid.len())
        .map(|i| Ok(Iid::new(fid.get_str(i)?, iid.get_str(i)?)))
        .collect::<Result<Vec<_>>>()?;
    let cols = (0..col.len())
        .map(|i| Ok(col.get_str(i)?.to_string()))
        .collect::<Result<Vec<_>>>()?;
    Ok((LabeledAxis::new(rows), LabeledAxis::new(cols)))
}

/// An open mapping together with everything parsed out of it
pub(crate) struct OpenMap {
    mapping: Mapping,
    pub header: MatHeader,
    pub dims: (usize, usize, usize),
    pub order: StorageOrder,
    pub row: LabeledAxis<Iid>,
    pub col: LabeledAxis<String>,
    pub row_property: Array2<f64>,
    pub col_property: Array2<f64>,
    values: Range<usize>,
}

impl OpenMap {
    /// Validate the header and label table and locate the value region
    pub fn parse(mapping: Mapping) -> Result<Self> {
        let bytes = mapping.bytes();
        let header = MatHeader::from_bytes(bytes)?;
        let dims = header.dims()?;
        let order = header.storage_order()?;

        let metadata = region(header.metadata_offset, header.metadata_size, bytes.len())?;
        let table = LabelTableView::new(&bytes[metadata])?;
        let (row, col) = decode_labels(&table)?;
        for (declared, actual) in [(dims.0, row.len()), (dims.1, col.len())] {
            if declared != actual {
                return Err(CoreError::CountMismatch { declared, actual }.into());
            }
        }

        let row_width = header.row_property_width;
        let col_width = header.col_property_width;
        let row_property_range = region(
            header.row_property_offset,
            property_bytes(header.nrows, row_width)?,
            bytes.len(),
        )?;
        let col_property_range = region(
            header.col_property_offset,
            property_bytes(header.ncols, col_width)?,
            bytes.len(),
        )?;
        let row_property = read_property(&bytes[row_property_range], dims.0, row_width as usize)?;
        let col_property = read_property(&bytes[col_property_range], dims.1, col_width as usize)?;
        let values = region(header.values_offset, header.values_size, bytes.len())?;

        Ok(Self {
            mapping,
            header,
            dims,
            order,
            row,
            col,
            row_property,
            col_property,
            values,
        })
    }

    pub fn is_writable(&self) -> bool {
        self.mapping.is_writable()
    }

    pub fn flush(&self) -> Result<()> {
        self.mapping.flush()
    }

    pub fn depth(&self) -> Option<usize> {
        (self.header.ndim == 3).then_some(self.dims.2)
    }

    fn shape(&self) -> IxDyn {
        let (nrows, ncols, depth) = self.dims;
        match self.depth() {
            Some(_) => IxDyn(&[nrows, ncols, depth]),
            None => IxDyn(&[nrows, ncols]),
        }
    }

    /// Value region as a flat slice in storage order
    pub fn values<T: Element>(&self) -> Result<&[T]> {
        let bytes = &self.mapping.bytes()[self.values.clone()];
        bytemuck::try_cast_slice(bytes).map_err(|_| CoreError::ArrayAlignment.into())
    }

    /// Value region as an array view in its storage layout
    pub fn view<T: Element>(&self) -> Result<ArrayViewD<'_, T>> {
        let shape = self.shape().set_f(self.order == StorageOrder::F);
        Ok(ArrayViewD::from_shape(shape, self.values::<T>()?)?)
    }

    /// Mutable array view; only writable mappings have one
    pub fn view_mut<T: Element>(&mut self) -> Result<ArrayViewMutD<'_, T>> {
        let shape = self.shape().set_f(self.order == StorageOrder::F);
        let range = self.values.clone();
        let mmap = match &mut self.mapping {
            Mapping::Writable(mmap) => mmap,
            Mapping::ReadOnly(_) => return Err(Error::Core(CoreError::ReadOnly)),
        };
        let values: &mut [T] = bytemuck::try_cast_slice_mut(&mut mmap[range])
            .map_err(|_| CoreError::ArrayAlignment)?;
        Ok(ArrayViewMutD::from_shape(shape, values)?)
    }
}
