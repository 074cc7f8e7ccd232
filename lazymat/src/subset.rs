//! Lazy row/column views
//!
//! A [`Subset`] records a selector pair against its parent and nothing else.
//! Views of views form a chain back to a root dataset; a read composes every
//! selection along the chain, root first, and issues exactly one physical
//! read against the root. Axis labels and properties are derived from the
//! parent on first access and memoized; deriving them never reads values.

use crate::config::ReadOptions;
use crate::reader::Reader;
use crate::Result;
use lazymat_core::{Element, Iid, LabeledAxis, Resolved, Selector};
use ndarray::{Array2, ArcArray, Axis, IxDyn};
use std::fmt;
use std::sync::{Arc, OnceLock};

enum Parent<R> {
    Root(Arc<R>),
    View(Subset<R>),
}

impl<R> Clone for Parent<R> {
    fn clone(&self) -> Self {
        match self {
            Parent::Root(root) => Parent::Root(Arc::clone(root)),
            Parent::View(view) => Parent::View(view.clone()),
        }
    }
}

struct Inner<R> {
    parent: Parent<R>,
    row_selector: Selector,
    col_selector: Selector,
    rows: Resolved,
    cols: Resolved,
    row: OnceLock<LabeledAxis<Iid>>,
    col: OnceLock<LabeledAxis<String>>,
    row_property: OnceLock<Array2<f64>>,
    col_property: OnceLock<Array2<f64>>,
}

/// Lazy view selecting rows and columns of a dataset
pub struct Subset<R> {
    inner: Arc<Inner<R>>,
}

impl<R> Clone for Subset<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Memoize a fallible computation in a `OnceLock`
fn memo<'a, V>(cell: &'a OnceLock<V>, compute: impl FnOnce() -> Result<V>) -> Result<&'a V> {
    if let Some(value) = cell.get() {
        return Ok(value);
    }
    let value = compute()?;
    Ok(cell.get_or_init(|| value))
}

impl<R: Reader> Subset<R> {
    /// View of `root`
    ///
    /// Selectors are checked against the root's axis lengths here, so a bad
    /// index fails before any values are touched.
    pub fn new(root: Arc<R>, rows: impl Into<Selector>, cols: impl Into<Selector>) -> Result<Self> {
        let (row_count, col_count) = (root.row_count()?, root.col_count()?);
        Self::with_parent(Parent::Root(root), row_count, col_count, rows.into(), cols.into())
    }

    /// View of this view
    pub fn subset(&self, rows: impl Into<Selector>, cols: impl Into<Selector>) -> Result<Self> {
        let (row_count, col_count) = (self.inner.rows.len(), self.inner.cols.len());
        Self::with_parent(
            Parent::View(self.clone()),
            row_count,
            col_count,
            rows.into(),
            cols.into(),
        )
    }

    fn with_parent(
        parent: Parent<R>,
        row_count: usize,
        col_count: usize,
        row_selector: Selector,
        col_selector: Selector,
    ) -> Result<Self> {
        let rows = row_selector.resolve(row_count)?;
        let cols = col_selector.resolve(col_count)?;
        Ok(Self {
            inner: Arc::new(Inner {
                parent,
                row_selector,
                col_selector,
                rows,
                cols,
                row: OnceLock::new(),
                col: OnceLock::new(),
                row_property: OnceLock::new(),
                col_property: OnceLock::new(),
            }),
        })
    }

    /// The dataset at the bottom of the view chain
    pub fn root(&self) -> &Arc<R> {
        match &self.inner.parent {
            Parent::Root(root) => root,
            Parent::View(view) => view.root(),
        }
    }

    /// Number of views between this one and the root, counting this one
    pub fn depth_of_chain(&self) -> usize {
        match &self.inner.parent {
            Parent::Root(_) => 1,
            Parent::View(view) => view.depth_of_chain() + 1,
        }
    }

    /// Row and column positions in the root, composed root first
    pub fn resolve_chain(&self) -> Result<(Resolved, Resolved)> {
        match &self.inner.parent {
            Parent::Root(_) => Ok((self.inner.rows.clone(), self.inner.cols.clone())),
            Parent::View(view) => {
                let (rows, cols) = view.resolve_chain()?;
                Ok((rows.compose(&self.inner.rows)?, cols.compose(&self.inner.cols)?))
            }
        }
    }

    fn parent_row(&self) -> Result<&LabeledAxis<Iid>> {
        match &self.inner.parent {
            Parent::Root(root) => root.row(),
            Parent::View(view) => view.row(),
        }
    }

    fn parent_col(&self) -> Result<&LabeledAxis<String>> {
        match &self.inner.parent {
            Parent::Root(root) => root.col(),
            Parent::View(view) => view.col(),
        }
    }

    fn parent_row_property(&self) -> Result<&Array2<f64>> {
        match &self.inner.parent {
            Parent::Root(root) => root.row_property(),
            Parent::View(view) => view.row_property(),
        }
    }

    fn parent_col_property(&self) -> Result<&Array2<f64>> {
        match &self.inner.parent {
            Parent::Root(root) => root.col_property(),
            Parent::View(view) => view.col_property(),
        }
    }
}

fn select_rows(property: &Array2<f64>, selection: &Resolved) -> Array2<f64> {
    match selection {
        Resolved::Full(_) => property.clone(),
        other => property.select(Axis(0), &other.to_vec()),
    }
}

impl<R: Reader> Reader for Subset<R> {
    fn row(&self) -> Result<&LabeledAxis<Iid>> {
        memo(&self.inner.row, || {
            Ok(self.parent_row()?.select(&self.inner.rows))
        })
    }

    fn col(&self) -> Result<&LabeledAxis<String>> {
        memo(&self.inner.col, || {
            Ok(self.parent_col()?.select(&self.inner.cols))
        })
    }

    fn row_property(&self) -> Result<&Array2<f64>> {
        memo(&self.inner.row_property, || {
            Ok(select_rows(self.parent_row_property()?, &self.inner.rows))
        })
    }

    fn col_property(&self) -> Result<&Array2<f64>> {
        memo(&self.inner.col_property, || {
            Ok(select_rows(self.parent_col_property()?, &self.inner.cols))
        })
    }

    fn row_count(&self) -> Result<usize> {
        Ok(self.inner.rows.len())
    }

    fn col_count(&self) -> Result<usize> {
        Ok(self.inner.cols.len())
    }

    fn depth(&self) -> Result<Option<usize>> {
        self.root().depth()
    }

    fn read_val<T: Element>(
        &self,
        rows: &Resolved,
        cols: &Resolved,
        options: &ReadOptions,
    ) -> Result<ArcArray<T, IxDyn>> {
        let (chain_rows, chain_cols) = self.resolve_chain()?;
        let rows = chain_rows.compose(rows)?;
        let cols = chain_cols.compose(cols)?;
        tracing::trace!(
            rows = rows.len(),
            cols = cols.len(),
            views = self.depth_of_chain(),
            "subset read"
        );
        self.root().read_val(&rows, &cols, options)
    }

    fn name(&self) -> String {
        self.to_string()
    }
}

impl<R: Reader> fmt::Display for Subset<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = match &self.inner.parent {
            Parent::Root(root) => root.name(),
            Parent::View(view) => view.to_string(),
        };
        write!(
            f,
            "{}[{},{}]",
            parent, self.inner.row_selector, self.inner.col_selector
        )
    }
}

impl<R: Reader> fmt::Debug for Subset<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subset")
            .field("name", &self.to_string())
            .field("rows", &self.inner.rows.len())
            .field("cols", &self.inner.cols.len())
            .finish()
    }
}
