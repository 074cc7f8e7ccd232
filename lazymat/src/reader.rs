//! The dataset handle contract shared by in-memory, file-backed and derived datasets
//!
//! Every dataset exposes two labeled axes, two property matrices and a
//! physical read primitive that takes already-resolved positions. Views,
//! materialization and label lookup are built on top of that primitive by
//! [`ReaderExt`], so a new backend only implements [`Reader`].

use crate::config::ReadOptions;
use crate::data::Data;
use crate::subset::Subset;
use crate::{Error, Result};
use lazymat_core::{CoreError, Element, Iid, LabeledAxis, Resolved, Selector};
use ndarray::{Array2, ArcArray, IxDyn};
use std::borrow::Cow;
use std::sync::Arc;

/// Read access to a labeled matrix dataset
pub trait Reader: Send + Sync {
    /// Row labels
    fn row(&self) -> Result<&LabeledAxis<Iid>>;

    /// Column labels
    fn col(&self) -> Result<&LabeledAxis<String>>;

    /// Per-row numeric properties, one row per dataset row
    fn row_property(&self) -> Result<&Array2<f64>>;

    /// Per-column numeric properties, one row per dataset column
    fn col_property(&self) -> Result<&Array2<f64>>;

    fn row_count(&self) -> Result<usize> {
        Ok(self.row()?.len())
    }

    fn col_count(&self) -> Result<usize> {
        Ok(self.col()?.len())
    }

    /// Trailing value dimension, `None` for plain matrices
    fn depth(&self) -> Result<Option<usize>> {
        Ok(None)
    }

    /// Physically read the selected entries
    ///
    /// `rows` and `cols` are positions in this dataset's own axes. The
    /// result has shape `(rows.len(), cols.len()[, depth])`, the requested
    /// element type, and the layout requested by `options.order`.
    fn read_val<T: Element>(
        &self,
        rows: &Resolved,
        cols: &Resolved,
        options: &ReadOptions,
    ) -> Result<ArcArray<T, IxDyn>>;

    /// This dataset as an in-memory [`Data`], if it already is one
    fn as_materialized<T: Element>(&self) -> Option<&Data<T>> {
        None
    }

    /// Human-readable description
    fn name(&self) -> String;
}

/// Check that a physical read returned what the metadata promised
pub(crate) fn check_read_shape<T>(
    val: &ArcArray<T, IxDyn>,
    rows: usize,
    cols: usize,
) -> Result<()> {
    if val.ndim() < 2 {
        return Err(CoreError::DimensionCount { actual: val.ndim() }.into());
    }
    for (declared, actual) in [(rows, val.shape()[0]), (cols, val.shape()[1])] {
        if declared != actual {
            return Err(CoreError::CountMismatch { declared, actual }.into());
        }
    }
    Ok(())
}

/// Operations every [`Reader`] gets for free
pub trait ReaderExt: Reader {
    /// `(row_count, col_count)`
    fn shape(&self) -> Result<(usize, usize)> {
        Ok((self.row_count()?, self.col_count()?))
    }

    /// Materialize the whole dataset
    ///
    /// Each call performs a fresh physical read; nothing is cached.
    fn read<T: Element>(&self, options: &ReadOptions) -> Result<Data<T>> {
        let (rows, cols) = self.shape()?;
        let val = self.read_val::<T>(&Resolved::Full(rows), &Resolved::Full(cols), options)?;
        check_read_shape(&val, rows, cols)?;
        Data::from_parts(
            self.row()?.clone(),
            self.col()?.clone(),
            self.row_property()?.clone(),
            self.col_property()?.clone(),
            val,
            self.name(),
        )
    }

    /// Borrow the dataset if it is already in memory, otherwise read it
    fn as_data<T: Element>(&self) -> Result<Cow<'_, Data<T>>> {
        match self.as_materialized::<T>() {
            Some(data) => Ok(Cow::Borrowed(data)),
            None => Ok(Cow::Owned(self.read(&ReadOptions::default())?)),
        }
    }

    /// Row positions of the given labels
    fn row_to_index(&self, labels: &[Iid]) -> Result<Vec<usize>> {
        let axis = self.row()?;
        labels
            .iter()
            .map(|label| match axis.index_of(label) {
                Err(CoreError::LabelNotFound) => Err(Error::LabelNotFound {
                    label: label.to_string(),
                }),
                other => Ok(other?),
            })
            .collect()
    }

    /// Column positions of the given labels
    fn col_to_index<S: AsRef<str>>(&self, labels: &[S]) -> Result<Vec<usize>> {
        let axis = self.col()?;
        labels
            .iter()
            .map(|label| {
                let label = label.as_ref().to_string();
                match axis.index_of(&label) {
                    Err(CoreError::LabelNotFound) => Err(Error::LabelNotFound { label }),
                    other => Ok(other?),
                }
            })
            .collect()
    }

    /// Lazy view of the selected rows and columns
    fn subset(
        self: &Arc<Self>,
        rows: impl Into<Selector>,
        cols: impl Into<Selector>,
    ) -> Result<Subset<Self>>
    where
        Self: Sized,
    {
        Subset::new(Arc::clone(self), rows, cols)
    }
}

impl<R: Reader + ?Sized> ReaderExt for R {}
