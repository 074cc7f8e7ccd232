//! Shared helpers for copying selected entries into a freshly laid out buffer

use crate::Result;
use lazymat_core::{CoreError, Element, Resolved, StorageOrder};
use ndarray::parallel::prelude::*;
use hashbrown::HashMap;
use ndarray::{
    ArrayD, ArrayView3, ArrayViewD, ArrayViewMutD, Axis, Dimension, IxDyn, ShapeBuilder,
};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Value shape for `rows x cols`, with an optional trailing dimension
pub(crate) fn value_shape(rows: usize, cols: usize, depth: Option<usize>) -> Vec<usize> {
    match depth {
        Some(d) => vec![rows, cols, d],
        None => vec![rows, cols],
    }
}

/// Zero-filled output buffer in the requested layout
pub(crate) fn output_array<U: Element>(
    rows: usize,
    cols: usize,
    depth: Option<usize>,
    order: StorageOrder,
) -> ArrayD<U> {
    let shape = IxDyn(&value_shape(rows, cols, depth)).set_f(order == StorageOrder::F);
    ArrayD::from_elem(shape, U::default())
}

/// Whether `val` is laid out in `order`
pub(crate) fn has_layout<T, S>(val: &ndarray::ArrayBase<S, IxDyn>, order: StorageOrder) -> bool
where
    S: ndarray::Data<Elem = T>,
{
    match order {
        StorageOrder::C => val.is_standard_layout(),
        StorageOrder::F => val.t().is_standard_layout(),
    }
}

/// Layout that `val` already has, preferring C when both apply
pub(crate) fn native_order<T, S>(val: &ndarray::ArrayBase<S, IxDyn>) -> StorageOrder
where
    S: ndarray::Data<Elem = T>,
{
    if has_layout(val, StorageOrder::F) && !val.is_standard_layout() {
        StorageOrder::F
    } else {
        StorageOrder::C
    }
}

/// Buffers with fewer cells than this are filled on the calling thread
pub(crate) const PARALLEL_MIN_CELLS: usize = 1 << 14;

static POOLS: OnceLock<Mutex<HashMap<usize, Arc<ThreadPool>>>> = OnceLock::new();

/// Pool of exactly `threads` workers, built once per distinct count
fn pool(threads: usize) -> Result<Arc<ThreadPool>> {
    let mut pools = POOLS
        .get_or_init(Default::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);
    if let Some(pool) = pools.get(&threads) {
        return Ok(pool.clone());
    }
    tracing::debug!(threads, "building thread pool");
    let pool = Arc::new(ThreadPoolBuilder::new().num_threads(threads).build()?);
    pools.insert(threads, pool.clone());
    Ok(pool)
}

/// Run `work` with `threads` workers available to rayon
///
/// The global pool is used when it already has that many threads; any other
/// count gets a cached dedicated pool.
pub(crate) fn with_pool<R, F>(threads: usize, work: F) -> Result<R>
where
    R: Send,
    F: FnOnce() -> R + Send,
{
    if threads == rayon::current_num_threads() {
        return Ok(work());
    }
    Ok(pool(threads)?.install(work))
}

/// Whether a buffer of `cells` entries is worth splitting over `threads`
pub(crate) fn run_parallel(threads: usize, cells: usize) -> bool {
    threads > 1 && cells >= PARALLEL_MIN_CELLS
}

/// Fill `out` column by column from `value(col, row, depth_index)`
pub(crate) fn fill_columns<U, F>(out: &mut ArrayD<U>, threads: usize, value: F) -> Result<()>
where
    U: Element,
    F: Fn(usize, usize, usize) -> U + Sync,
{
    fn fill_column<U, F>(j: usize, mut column: ArrayViewMutD<'_, U>, value: &F)
    where
        F: Fn(usize, usize, usize) -> U,
    {
        for (index, cell) in column.indexed_iter_mut() {
            let d = if index.ndim() > 1 { index[1] } else { 0 };
            *cell = value(j, index[0], d);
        }
    }

    if !run_parallel(threads, out.len()) {
        for (j, column) in out.axis_iter_mut(Axis(1)).enumerate() {
            fill_column(j, column, &value);
        }
        return Ok(());
    }
    with_pool(threads, || {
        out.axis_iter_mut(Axis(1))
            .into_par_iter()
            .enumerate()
            .for_each(|(j, column)| fill_column(j, column, &value));
    })
}

/// Check every selected position against the axis length up front
pub(crate) fn checked_positions(selection: &Resolved, len: usize) -> Result<Vec<usize>> {
    let positions = selection.to_vec();
    if let Some(&bad) = positions.iter().find(|&&p| p >= len) {
        return Err(CoreError::IndexOutOfBounds {
            index: bad as isize,
            len,
        }
        .into());
    }
    Ok(positions)
}

/// View a 2-D or 3-D value buffer as 3-D
pub(crate) fn as_three_d<T>(val: ArrayViewD<'_, T>) -> Result<ArrayView3<'_, T>> {
    match val.ndim() {
        2 => Ok(val.insert_axis(Axis(2)).into_dimensionality()?),
        3 => Ok(val.into_dimensionality()?),
        n => Err(CoreError::DimensionCount { actual: n }.into()),
    }
}

/// Copy `rows x cols` of `src` into a new buffer of element type `U`
pub(crate) fn gather<T: Element, U: Element>(
    src: ArrayViewD<'_, T>,
    rows: &Resolved,
    cols: &Resolved,
    order: StorageOrder,
    threads: usize,
) -> Result<ArrayD<U>> {
    let depth = (src.ndim() == 3).then(|| src.shape()[2]);
    let src = as_three_d(src)?;
    let (nrows, ncols, _) = src.dim();
    let row_index = checked_positions(rows, nrows)?;
    let col_index = checked_positions(cols, ncols)?;

    let mut out = output_array::<U>(row_index.len(), col_index.len(), depth, order);
    fill_columns(&mut out, threads, |j, i, d| {
        U::from_f64(src[(row_index[i], col_index[j], d)].to_f64())
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_gather_layout_and_values() {
        let src = array![[1.0f64, 2.0, 3.0], [4.0, 5.0, 6.0]].into_dyn();
        let rows = Resolved::List(vec![1, 0]);
        let cols = Resolved::Strided {
            start: 2,
            step: -2,
            count: 2,
        };
        let out: ArrayD<f32> = gather(src.view(), &rows, &cols, StorageOrder::F, 2).unwrap();
        assert_eq!(out, array![[6.0f32, 4.0], [3.0, 1.0]].into_dyn());
        assert!(has_layout(&out, StorageOrder::F));

        let out: ArrayD<f64> = gather(src.view(), &rows, &cols, StorageOrder::C, 1).unwrap();
        assert!(out.is_standard_layout());
    }

    #[test]
    fn test_gather_three_d() {
        let src = ndarray::Array3::from_shape_fn((2, 2, 3), |(i, j, k)| (i * 100 + j * 10 + k) as f64)
            .into_dyn();
        let out: ArrayD<f64> = gather(
            src.view(),
            &Resolved::List(vec![1]),
            &Resolved::Full(2),
            StorageOrder::C,
            1,
        )
        .unwrap();
        assert_eq!(out.shape(), &[1, 2, 3]);
        assert_eq!(out[&[0, 1, 2][..]], 112.0);
    }

    #[test]
    fn test_gather_rejects_out_of_range() {
        let src = array![[1.0f64]].into_dyn();
        let result: Result<ArrayD<f64>> = gather(
            src.view(),
            &Resolved::List(vec![1]),
            &Resolved::Full(1),
            StorageOrder::C,
            1,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_pools_are_reused() {
        let first = pool(3).unwrap();
        let second = pool(3).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.current_num_threads(), 3);
    }

    #[test]
    fn test_with_pool_prefers_global() {
        let global = rayon::current_num_threads();
        assert_eq!(with_pool(global, rayon::current_thread_index).unwrap(), None);
        assert_eq!(with_pool(global + 1, rayon::current_num_threads).unwrap(), global + 1);
    }

    #[test]
    fn test_large_fill_splits_columns() {
        let (rows, cols) = (256, 128);
        assert!(run_parallel(4, rows * cols));
        assert!(!run_parallel(4, PARALLEL_MIN_CELLS - 1));
        assert!(!run_parallel(1, rows * cols));

        let mut out = output_array::<f64>(rows, cols, None, StorageOrder::F);
        fill_columns(&mut out, 4, |j, i, _| (i * cols + j) as f64).unwrap();
        assert_eq!(out[&[0, 5][..]], 5.0);
        assert_eq!(out[&[rows - 1, cols - 1][..]], (rows * cols - 1) as f64);
    }

    #[test]
    fn test_native_order() {
        let c = ArrayD::<f64>::zeros(IxDyn(&[2, 3]));
        let f = ArrayD::<f64>::zeros(IxDyn(&[2, 3]).f());
        assert_eq!(native_order(&c), StorageOrder::C);
        assert_eq!(native_order(&f), StorageOrder::F);
    }
}
