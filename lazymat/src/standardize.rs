//! Column standardizers applied to in-memory values

use crate::gather::{run_parallel, with_pool};
use crate::{Error, Result};
use lazymat_core::Element;
use ndarray::parallel::prelude::*;
use ndarray::{ArrayViewMut1, ArrayViewMut2, Axis};
use statrs::distribution::{Beta as BetaDistribution, Continuous};
use std::fmt;

/// In-place, column-wise standardization of a value matrix
pub trait Standardizer: fmt::Debug + fmt::Display + Send + Sync {
    fn standardize<T: Element>(&self, val: ArrayViewMut2<'_, T>, threads: usize) -> Result<()>;
}

/// Mean and count of the non-NaN entries of a column
fn nan_mean<T: Element>(column: &ArrayViewMut1<'_, T>) -> (f64, usize) {
    let (sum, n) = column
        .iter()
        .map(|v| v.to_f64())
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        (f64::NAN, 0)
    } else {
        (sum / n as f64, n)
    }
}

fn for_each_column<T, F>(mut val: ArrayViewMut2<'_, T>, threads: usize, work: F) -> Result<()>
where
    T: Element,
    F: Fn(ArrayViewMut1<'_, T>) + Sync + Send,
{
    if !run_parallel(threads, val.len()) {
        val.axis_iter_mut(Axis(1)).for_each(work);
        return Ok(());
    }
    with_pool(threads, || {
        val.axis_iter_mut(Axis(1))
            .into_par_iter()
            .for_each(|column| work(column));
    })
}

/// Zero mean, unit standard deviation; missing values become 0
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Unit;

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unit()")
    }
}

impl Standardizer for Unit {
    fn standardize<T: Element>(&self, val: ArrayViewMut2<'_, T>, threads: usize) -> Result<()> {
        tracing::debug!(cols = val.ncols(), rows = val.nrows(), "unit standardize");
        for_each_column(val, threads, |mut column| {
            let (mean, n) = nan_mean(&column);
            let variance = if n == 0 {
                0.0
            } else {
                column
                    .iter()
                    .map(|v| v.to_f64())
                    .filter(|v| !v.is_nan())
                    .map(|v| (v - mean) * (v - mean))
                    .sum::<f64>()
                    / n as f64
            };
            let std = variance.sqrt();
            for cell in column.iter_mut() {
                let v = cell.to_f64();
                *cell = if v.is_nan() || std == 0.0 {
                    T::from_f64(0.0)
                } else {
                    T::from_f64((v - mean) / std)
                };
            }
        })
    }
}

/// Centre each column and weight it by the Beta(a, b) density at its minor allele frequency
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beta {
    pub a: f64,
    pub b: f64,
}

impl Default for Beta {
    fn default() -> Self {
        Self { a: 1.0, b: 25.0 }
    }
}

impl Beta {
    pub fn new(a: f64, b: f64) -> Self {
        Self { a, b }
    }

    fn distribution(&self) -> Result<BetaDistribution> {
        BetaDistribution::new(self.a, self.b).map_err(|err| {
            Error::unsupported(format!("invalid Beta({}, {}) weighting: {err}", self.a, self.b))
        })
    }

    /// Beta(a, b) probability density at `x`
    pub fn pdf(&self, x: f64) -> Result<f64> {
        Ok(self.distribution()?.pdf(x))
    }
}

impl fmt::Display for Beta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Beta({},{})", self.a, self.b)
    }
}

impl Standardizer for Beta {
    fn standardize<T: Element>(&self, val: ArrayViewMut2<'_, T>, threads: usize) -> Result<()> {
        let distribution = self.distribution()?;
        tracing::debug!(a = self.a, b = self.b, cols = val.ncols(), "beta standardize");
        for_each_column(val, threads, |mut column| {
            let (mean, n) = nan_mean(&column);
            if n == 0 {
                column.fill(T::from_f64(0.0));
                return;
            }
            let mut maf = mean / 2.0;
            if maf > 0.5 {
                maf = 1.0 - maf;
            }
            let weight = distribution.pdf(maf);
            for cell in column.iter_mut() {
                let v = cell.to_f64();
                *cell = if v.is_nan() {
                    T::from_f64(0.0)
                } else {
                    T::from_f64((v - mean) * weight)
                };
            }
        })
    }
}

/// Leaves values unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Identity;

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity()")
    }
}

impl Standardizer for Identity {
    fn standardize<T: Element>(&self, _val: ArrayViewMut2<'_, T>, _threads: usize) -> Result<()> {
        Ok(())
    }
}
