//! Memory-mapped file backend
//!
//! [`MemMap`] is a dataset stored in a single lazymat file and accessed
//! through a memory mapping. It moves through three states:
//!
//! - **Unopened**: only the path is known
//! - **Open**: header, labels and properties are parsed and the value region
//!   is mapped, read-only after [`MemMap::open`] or writable after
//!   [`MemMap::empty`]
//! - **Flushed**: a writable map was synced to disk and unmapped
//!
//! Accessors report [`CoreError::NotOpen`] outside the open state. A flushed
//! map can be reopened read-only.

mod file_io;
mod mmap_core;

use crate::config::{ReadOptions, WriteConfig};
use crate::file_cache::{FileCache, ReadGuard, WriteGuard};
use crate::gather::{checked_positions, fill_columns, output_array};
use crate::reader::Reader;
use crate::{Error, Result};
use file_io::Preamble;
use lazymat_core::{CoreError, Element, Iid, LabeledAxis, MatHeader, Resolved, StorageOrder};
use mmap_core::{Mapping, OpenMap};
use ndarray::{Array2, ArcArray, ArrayViewD, ArrayViewMutD, Axis, IxDyn, Slice};
use std::fmt;
use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

enum MapState {
    Unopened,
    Open(OpenMap),
    Flushed,
}

/// Observable lifecycle state of a [`MemMap`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapStatus {
    Unopened,
    ReadOnly,
    Writable,
    Flushed,
}

/// Dataset backed by a memory-mapped lazymat file
pub struct MemMap<T: Element> {
    path: PathBuf,
    state: MapState,
    cached: Option<ReadGuard>,
    _element: PhantomData<T>,
}

impl<T: Element> MemMap<T> {
    /// Handle for `path`; nothing is read until [`MemMap::open`]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            state: MapState::Unopened,
            cached: None,
            _element: PhantomData,
        }
    }

    /// Open and validate the file read-only
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self> {
        let mut map = Self::new(path);
        map.open()?;
        Ok(map)
    }

    /// Open the file stored as `name` in `cache`
    ///
    /// The cache's read guard is held until the map is dropped.
    pub fn open_cached<C: FileCache + ?Sized>(cache: &C, name: &str) -> Result<Self> {
        let guard = cache.open_read(name)?;
        let mut map = Self::new(guard.path());
        map.cached = Some(guard);
        map.open()?;
        Ok(map)
    }

    /// Write `source` into `cache` as `name` and open the stored file
    pub fn write_cached<C, R>(cache: &C, name: &str, source: &R, config: &WriteConfig) -> Result<Self>
    where
        C: FileCache + ?Sized,
        R: Reader,
    {
        let _span = tracing::info_span!("memmap_write", cache = %cache, name, source = %source.name())
            .entered();
        let guard = cache.open_write(name)?;
        write_to::<T, R>(guard.path(), source, config)?;
        guard.commit()?;
        Self::open_cached(cache, name)
    }

    /// Map the file read-only; a no-op when already open
    pub fn open(&mut self) -> Result<&mut Self> {
        if matches!(self.state, MapState::Open(_)) {
            return Ok(self);
        }
        let _span = tracing::debug_span!("memmap_open", path = %self.path.display()).entered();
        let file = File::open(&self.path)?;
        let open = Self::parse(Mapping::read_only(&file)?)?;
        tracing::debug!(
            rows = open.dims.0,
            cols = open.dims.1,
            order = ?open.order,
            "opened read-only"
        );
        self.state = MapState::Open(open);
        Ok(self)
    }

    fn parse(mapping: Mapping) -> Result<OpenMap> {
        if cfg!(target_endian = "big") {
            return Err(Error::unsupported(
                "memory-mapped values are little-endian; big-endian targets are not supported",
            ));
        }
        let open = OpenMap::parse(mapping)?;
        let stored = open.header.data_type()?;
        if stored != T::data_type() {
            return Err(CoreError::DataTypeMismatch {
                expected: T::data_type(),
                actual: stored,
            }
            .into());
        }
        Ok(open)
    }

    /// Create a zero-filled file and map it writable
    ///
    /// Property matrices must have one row per label on their axis. With
    /// `depth`, values get a trailing third dimension.
    pub fn empty(
        path: impl AsRef<Path>,
        row: impl Into<LabeledAxis<Iid>>,
        col: impl Into<LabeledAxis<String>>,
        row_property: Option<Array2<f64>>,
        col_property: Option<Array2<f64>>,
        order: StorageOrder,
        depth: Option<usize>,
    ) -> Result<Self> {
        let (row, col) = (row.into(), col.into());
        let row_property = row_property.unwrap_or_else(|| Array2::zeros((row.len(), 0)));
        let col_property = col_property.unwrap_or_else(|| Array2::zeros((col.len(), 0)));
        for (expected, actual) in [
            (row.len(), row_property.nrows()),
            (col.len(), col_property.nrows()),
        ] {
            if expected != actual {
                return Err(CoreError::PropertyLength { expected, actual }.into());
            }
        }

        let path = path.as_ref().to_path_buf();
        let _span = tracing::debug_span!("memmap_empty", path = %path.display()).entered();
        let file = Preamble {
            row: &row,
            col: &col,
            row_property: &row_property,
            col_property: &col_property,
            data_type: T::data_type(),
            order,
            depth,
        }
        .create(&path)?;
        let open = Self::parse(Mapping::writable(&file)?)?;
        Ok(Self {
            path,
            state: MapState::Open(open),
            cached: None,
            _element: PhantomData,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> MapStatus {
        match &self.state {
            MapState::Unopened => MapStatus::Unopened,
            MapState::Open(open) if open.is_writable() => MapStatus::Writable,
            MapState::Open(_) => MapStatus::ReadOnly,
            MapState::Flushed => MapStatus::Flushed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, MapState::Open(_))
    }

    fn opened(&self) -> Result<&OpenMap> {
        match &self.state {
            MapState::Open(open) => Ok(open),
            _ => Err(CoreError::NotOpen.into()),
        }
    }

    pub fn header(&self) -> Result<&MatHeader> {
        Ok(&self.opened()?.header)
    }

    /// Storage order of the value region
    pub fn order(&self) -> Result<StorageOrder> {
        Ok(self.opened()?.order)
    }

    /// Borrow the mapped values without copying
    pub fn val(&self) -> Result<ArrayViewD<'_, T>> {
        self.opened()?.view()
    }

    /// Mutable view of the mapped values; writable maps only
    pub fn val_mut(&mut self) -> Result<ArrayViewMutD<'_, T>> {
        match &mut self.state {
            MapState::Open(open) => open.view_mut(),
            _ => Err(CoreError::NotOpen.into()),
        }
    }

    /// Sync pending writes to disk and release the mapping
    pub fn flush(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.state, MapState::Flushed) {
            MapState::Open(open) => {
                open.flush()?;
                tracing::debug!(path = %self.path.display(), "flushed");
                Ok(())
            }
            MapState::Flushed => Ok(()),
            MapState::Unopened => {
                self.state = MapState::Unopened;
                Err(CoreError::NotOpen.into())
            }
        }
    }
}

impl<T: Element> Reader for MemMap<T> {
    fn row(&self) -> Result<&LabeledAxis<Iid>> {
        Ok(&self.opened()?.row)
    }

    fn col(&self) -> Result<&LabeledAxis<String>> {
        Ok(&self.opened()?.col)
    }

    fn row_property(&self) -> Result<&Array2<f64>> {
        Ok(&self.opened()?.row_property)
    }

    fn col_property(&self) -> Result<&Array2<f64>> {
        Ok(&self.opened()?.col_property)
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.opened()?.dims.0)
    }

    fn col_count(&self) -> Result<usize> {
        Ok(self.opened()?.dims.1)
    }

    fn depth(&self) -> Result<Option<usize>> {
        Ok(self.opened()?.depth())
    }

    /// Mapped reads always copy into a new buffer
    fn read_val<U: Element>(
        &self,
        rows: &Resolved,
        cols: &Resolved,
        options: &ReadOptions,
    ) -> Result<ArcArray<U, IxDyn>> {
        let open = self.opened()?;
        let values = open.values::<T>()?;
        let dims = open.dims;
        let row_index = checked_positions(rows, dims.0)?;
        let col_index = checked_positions(cols, dims.1)?;
        let order = options.order.resolve(open.order);
        tracing::trace!(
            path = %self.path.display(),
            rows = row_index.len(),
            cols = col_index.len(),
            "memmap read"
        );

        let mut out = output_array::<U>(row_index.len(), col_index.len(), open.depth(), order);
        fill_columns(&mut out, options.threads(), |j, i, d| {
            U::from_f64(values[open.order.offset(dims, row_index[i], col_index[j], d)].to_f64())
        })?;
        Ok(out.into_shared())
    }

    fn name(&self) -> String {
        self.to_string()
    }
}

impl<T: Element> fmt::Display for MemMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemMap('{}')", self.path.display())
    }
}

impl<T: Element> fmt::Debug for MemMap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemMap")
            .field("path", &self.path)
            .field("status", &self.status())
            .finish()
    }
}

/// Persist any [`Reader`] into a file-backed dataset
pub trait Writer: Sized {
    /// Write `source` to `path` and return a handle opened on the result
    ///
    /// The file is assembled under a temporary name and renamed into place,
    /// so a failed write never leaves a partial file at `path`.
    fn write<R: Reader>(path: impl AsRef<Path>, source: &R, config: &WriteConfig) -> Result<Self>;
}

impl<T: Element> Writer for MemMap<T> {
    fn write<R: Reader>(path: impl AsRef<Path>, source: &R, config: &WriteConfig) -> Result<Self> {
        let path = path.as_ref();
        let _span = tracing::info_span!("memmap_write", path = %path.display(), source = %source.name())
            .entered();

        // Dropping an uncommitted guard removes the partial file
        let guard = WriteGuard::for_path(path);
        write_to::<T, R>(guard.path(), source, config)?;
        guard.commit()?;
        Self::open_path(path)
    }
}

fn write_to<T: Element, R: Reader>(temp: &Path, source: &R, config: &WriteConfig) -> Result<()> {
    let mut target = MemMap::<T>::empty(
        temp,
        source.row()?.clone(),
        source.col()?.clone(),
        Some(source.row_property()?.clone()),
        Some(source.col_property()?.clone()),
        config.order,
        source.depth()?,
    )?;

    if let Some(data) = source.as_materialized::<T>() {
        tracing::debug!("copying materialized values");
        target.val_mut()?.assign(data.val());
    } else {
        let (nrows, ncols) = (source.row_count()?, source.col_count()?);
        let block = config.block_size_for(nrows);
        let options = config.read_options();
        for start in (0..ncols).step_by(block) {
            let end = (start + block).min(ncols);
            let cols = Resolved::Strided {
                start,
                step: 1,
                count: end - start,
            };
            let values = source.read_val::<T>(&Resolved::Full(nrows), &cols, &options)?;
            crate::reader::check_read_shape(&values, nrows, end - start)?;
            tracing::trace!(start, end, "wrote column block");
            target
                .val_mut()?
                .slice_axis_mut(Axis(1), Slice::from(start..end))
                .assign(&values);
        }
    }
    target.flush()
}
