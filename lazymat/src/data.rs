//! In-memory datasets
//!
//! [`Data`] owns its value buffer and both axes. The buffer is a shared
//! [`ArcArray`]: reading with `allow_view` hands out a handle to the same
//! storage, and mutation through [`Data::val_mut`] copies on write when the
//! storage is shared.

use crate::config::ReadOptions;
use crate::gather::{gather, has_layout, native_order};
use crate::reader::Reader;
use crate::standardize::Standardizer;
use crate::{Error, Result};
use lazymat_core::{CoreError, Element, Iid, LabeledAxis, Resolved};
use ndarray::{Array2, ArcArray, ArrayD, ArrayViewMut2, ArrayViewMutD, Ix2, IxDyn, Zip};
use std::any::Any;
use std::fmt;

/// Relative tolerance used by [`Data::allclose`]
pub const DEFAULT_RTOL: f64 = 1e-5;
/// Absolute tolerance used by [`Data::allclose`]
pub const DEFAULT_ATOL: f64 = 1e-8;

/// Materialized dataset: labels, properties and values held in memory
#[derive(Debug, Clone)]
pub struct Data<T: Element> {
    row: LabeledAxis<Iid>,
    col: LabeledAxis<String>,
    row_property: Array2<f64>,
    col_property: Array2<f64>,
    val: ArcArray<T, IxDyn>,
    name: String,
}

fn validate<T>(
    row: &LabeledAxis<Iid>,
    col: &LabeledAxis<String>,
    row_property: &Array2<f64>,
    col_property: &Array2<f64>,
    val: &ArcArray<T, IxDyn>,
) -> Result<()> {
    validate_val(row.len(), col.len(), val)?;
    for (expected, property) in [(row.len(), row_property), (col.len(), col_property)] {
        if property.nrows() != expected {
            return Err(CoreError::PropertyLength {
                expected,
                actual: property.nrows(),
            }
            .into());
        }
    }
    Ok(())
}

fn validate_val<T>(rows: usize, cols: usize, val: &ArcArray<T, IxDyn>) -> Result<()> {
    if !(2..=3).contains(&val.ndim()) {
        return Err(CoreError::DimensionCount { actual: val.ndim() }.into());
    }
    let actual = (val.shape()[0], val.shape()[1]);
    if actual != (rows, cols) {
        return Err(CoreError::ShapeMismatch {
            expected: (rows, cols),
            actual,
        }
        .into());
    }
    Ok(())
}

/// Value buffers accepted by [`Data`]
pub trait IntoShared<T> {
    fn into_shared_val(self) -> ArcArray<T, IxDyn>;
}

impl<T: Element> IntoShared<T> for ArrayD<T> {
    fn into_shared_val(self) -> ArcArray<T, IxDyn> {
        self.into_shared()
    }
}

impl<T: Element> IntoShared<T> for ArcArray<T, IxDyn> {
    fn into_shared_val(self) -> ArcArray<T, IxDyn> {
        self
    }
}

/// Reinterpret a shared buffer as element type `U` when it already is one
fn share_as<S: Element, U: Element>(val: &ArcArray<S, IxDyn>) -> Option<ArcArray<U, IxDyn>> {
    (val as &dyn Any)
        .downcast_ref::<ArcArray<U, IxDyn>>()
        .cloned()
}

impl<T: Element> Data<T> {
    /// Dataset with zero-width properties
    pub fn new(
        row: impl Into<LabeledAxis<Iid>>,
        col: impl Into<LabeledAxis<String>>,
        val: impl IntoShared<T>,
    ) -> Result<Self> {
        let row = row.into();
        let col = col.into();
        let row_property = Array2::zeros((row.len(), 0));
        let col_property = Array2::zeros((col.len(), 0));
        Self::from_parts(row, col, row_property, col_property, val.into_shared_val(), String::new())
    }

    /// Dataset from fully specified parts, validated
    pub fn from_parts(
        row: LabeledAxis<Iid>,
        col: LabeledAxis<String>,
        row_property: Array2<f64>,
        col_property: Array2<f64>,
        val: ArcArray<T, IxDyn>,
        name: impl Into<String>,
    ) -> Result<Self> {
        validate(&row, &col, &row_property, &col_property, &val)?;
        Ok(Self {
            row,
            col,
            row_property,
            col_property,
            val,
            name: name.into(),
        })
    }

    pub fn builder() -> DataBuilder<T> {
        DataBuilder::default()
    }

    pub fn val(&self) -> &ArcArray<T, IxDyn> {
        &self.val
    }

    /// Replace the value buffer
    ///
    /// The new buffer is validated first; on error the current buffer is
    /// left untouched.
    pub fn set_val(&mut self, val: impl IntoShared<T>) -> Result<()> {
        let val = val.into_shared_val();
        validate(
            &self.row,
            &self.col,
            &self.row_property,
            &self.col_property,
            &val,
        )?;
        self.val = val;
        Ok(())
    }

    /// Mutable access to the values, unsharing the buffer if needed
    pub fn val_mut(&mut self) -> ArrayViewMutD<'_, T> {
        self.val.view_mut()
    }

    /// Values as a 2-D view, for plain matrices
    pub fn val_mut_2d(&mut self) -> Result<ArrayViewMut2<'_, T>> {
        Ok(self.val.view_mut().into_dimensionality::<Ix2>()?)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn into_val(self) -> ArcArray<T, IxDyn> {
        self.val
    }

    /// Standardize the values in place, column by column
    pub fn standardize<S: Standardizer>(
        &mut self,
        standardizer: &S,
        num_threads: Option<usize>,
    ) -> Result<&mut Self> {
        let threads = crate::config::resolve_num_threads(num_threads);
        standardizer.standardize(self.val_mut_2d()?, threads)?;
        Ok(self)
    }

    /// Equality with numeric tolerance on the values
    ///
    /// Labels and properties must match exactly; NaN properties match NaN
    /// when `equal_nan` is set.
    pub fn allclose(&self, other: &Self, equal_nan: bool) -> bool {
        self.allclose_with(other, DEFAULT_RTOL, DEFAULT_ATOL, equal_nan)
    }

    pub fn allclose_with(&self, other: &Self, rtol: f64, atol: f64, equal_nan: bool) -> bool {
        let exact = |a: f64, b: f64| a == b || (equal_nan && a.is_nan() && b.is_nan());
        let close = |a: f64, b: f64| {
            if a.is_nan() || b.is_nan() {
                return equal_nan && a.is_nan() && b.is_nan();
            }
            a == b || (a - b).abs() <= atol + rtol * b.abs()
        };

        self.row == other.row
            && self.col == other.col
            && self.row_property.shape() == other.row_property.shape()
            && self.col_property.shape() == other.col_property.shape()
            && self.val.shape() == other.val.shape()
            && Zip::from(&self.row_property)
                .and(&other.row_property)
                .all(|&a, &b| exact(a, b))
            && Zip::from(&self.col_property)
                .and(&other.col_property)
                .all(|&a, &b| exact(a, b))
            && Zip::from(&self.val)
                .and(&other.val)
                .all(|&a, &b| close(a.to_f64(), b.to_f64()))
    }
}

impl<T: Element> PartialEq for Data<T> {
    /// Strict equality; NaN never equals NaN and the name is ignored
    fn eq(&self, other: &Self) -> bool {
        self.row == other.row
            && self.col == other.col
            && self.row_property == other.row_property
            && self.col_property == other.col_property
            && self.val == other.val
    }
}

impl<T: Element> fmt::Display for Data<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Data({})", self.name)
    }
}

impl<T: Element> Reader for Data<T> {
    fn row(&self) -> Result<&LabeledAxis<Iid>> {
        Ok(&self.row)
    }

    fn col(&self) -> Result<&LabeledAxis<String>> {
        Ok(&self.col)
    }

    fn row_property(&self) -> Result<&Array2<f64>> {
        Ok(&self.row_property)
    }

    fn col_property(&self) -> Result<&Array2<f64>> {
        Ok(&self.col_property)
    }

    fn depth(&self) -> Result<Option<usize>> {
        Ok((self.val.ndim() == 3).then(|| self.val.shape()[2]))
    }

    fn read_val<U: Element>(
        &self,
        rows: &Resolved,
        cols: &Resolved,
        options: &ReadOptions,
    ) -> Result<ArcArray<U, IxDyn>> {
        let order = options.order.resolve(native_order(&self.val));
        if options.allow_view && rows.is_full() && cols.is_full() && has_layout(&self.val, order) {
            if let Some(shared) = share_as::<T, U>(&self.val) {
                return Ok(shared);
            }
        }
        let out: ArrayD<U> = gather(self.val.view(), rows, cols, order, options.threads())?;
        Ok(out.into_shared())
    }

    fn as_materialized<U: Element>(&self) -> Option<&Data<U>> {
        (self as &dyn Any).downcast_ref::<Data<U>>()
    }

    fn name(&self) -> String {
        self.to_string()
    }
}

/// Builder that fills omitted parts with deterministic placeholders
#[derive(Debug, Clone)]
pub struct DataBuilder<T: Element> {
    row: Option<LabeledAxis<Iid>>,
    col: Option<LabeledAxis<String>>,
    row_property: Option<Array2<f64>>,
    col_property: Option<Array2<f64>>,
    val: Option<ArcArray<T, IxDyn>>,
    name: String,
}

impl<T: Element> Default for DataBuilder<T> {
    fn default() -> Self {
        Self {
            row: None,
            col: None,
            row_property: None,
            col_property: None,
            val: None,
            name: String::new(),
        }
    }
}

impl<T: Element> DataBuilder<T> {
    pub fn row(mut self, row: impl Into<LabeledAxis<Iid>>) -> Self {
        self.row = Some(row.into());
        self
    }

    pub fn col(mut self, col: impl Into<LabeledAxis<String>>) -> Self {
        self.col = Some(col.into());
        self
    }

    pub fn row_property(mut self, property: Array2<f64>) -> Self {
        self.row_property = Some(property);
        self
    }

    pub fn col_property(mut self, property: Array2<f64>) -> Self {
        self.col_property = Some(property);
        self
    }

    pub fn val(mut self, val: impl IntoShared<T>) -> Self {
        self.val = Some(val.into_shared_val());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Assemble the dataset
    ///
    /// Axis lengths come from whichever of labels, properties or values is
    /// given. A missing value buffer is filled with NaN.
    pub fn build(self) -> Result<Data<T>> {
        let val_dim = |axis: usize| self.val.as_ref().map(|v| v.shape().get(axis).copied());
        let row_count = match (&self.row, &self.row_property, val_dim(0)) {
            (Some(row), _, _) => row.len(),
            (None, Some(property), _) => property.nrows(),
            (None, None, Some(Some(n))) => n,
            _ => 0,
        };
        let col_count = match (&self.col, &self.col_property, val_dim(1)) {
            (Some(col), _, _) => col.len(),
            (None, Some(property), _) => property.nrows(),
            (None, None, Some(Some(n))) => n,
            _ => 0,
        };

        let val = match self.val {
            Some(val) => val,
            None => ArrayD::from_elem(IxDyn(&[row_count, col_count]), T::nan()).into_shared(),
        };
        let row = self
            .row
            .unwrap_or_else(|| LabeledAxis::<Iid>::placeholder(row_count));
        let col = self
            .col
            .unwrap_or_else(|| LabeledAxis::<String>::placeholder(col_count));
        let row_property = self
            .row_property
            .unwrap_or_else(|| Array2::zeros((row_count, 0)));
        let col_property = self
            .col_property
            .unwrap_or_else(|| Array2::zeros((col_count, 0)));

        Data::from_parts(row, col, row_property, col_property, val, self.name)
    }
}

impl<T: Element> TryFrom<ArrayD<T>> for Data<T> {
    type Error = Error;

    fn try_from(val: ArrayD<T>) -> Result<Self> {
        Data::builder().val(val).build()
    }
}
