//! A lazy dataset of column-pair products
//!
//! [`PairReader`] pairs the columns of one dataset with those of another, or
//! with themselves, in [`Pairs`] order. Column `k` holds the element-wise
//! product of the two columns of pair `k`, by default after unit
//! standardization of each input column. Column labels are `"a,b"`.
//!
//! The column count comes straight from the pair arithmetic, so a reader
//! over hundreds of thousands of columns can be subset and read in blocks
//! without ever listing every pair.

use crate::config::{Order, ReadOptions};
use crate::gather::{checked_positions, fill_columns, output_array};
use crate::reader::{check_read_shape, Reader};
use crate::standardize::{Standardizer, Unit};
use crate::{Error, Result};
use hashbrown::HashMap;
use lazymat_core::{CoreError, Element, Iid, LabeledAxis, Pairs, Resolved, StorageOrder};
use ndarray::{Array2, ArcArray, IxDyn, Ix2};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Default ceiling on the number of pair labels built in memory
pub const DEFAULT_LABEL_LIMIT: usize = 1_000_000;

enum Right<A, B> {
    SameAs(Arc<A>),
    Other(Arc<B>),
}

/// Dataset whose columns are products of column pairs
pub struct PairReader<A, B = A> {
    left: Arc<A>,
    right: Right<A, B>,
    pairs: Pairs<String>,
    standardize: bool,
    label_limit: usize,
    col: OnceLock<LabeledAxis<String>>,
    col_property: OnceLock<Array2<f64>>,
}

impl<A: Reader> PairReader<A, A> {
    /// Pairs of columns drawn from a single dataset, excluding self-pairs
    pub fn within(reader: Arc<A>) -> Result<Self> {
        let labels = reader.col()?.labels().to_vec();
        let pairs = Pairs::new_unique(labels.clone(), labels, false)?;
        Ok(Self::from_parts(Arc::clone(&reader), Right::SameAs(reader), pairs))
    }
}

impl<A: Reader, B: Reader> PairReader<A, B> {
    /// Pairs of a column of `left` with a column of `right`
    ///
    /// Both datasets must list the same rows in the same order.
    pub fn new(left: Arc<A>, right: Arc<B>) -> Result<Self> {
        if left.row()? != right.row()? {
            return Err(Error::inconsistent(format!(
                "{} and {} must have the same rows in the same order",
                left.name(),
                right.name()
            )));
        }
        let pairs = Pairs::new_unique(
            left.col()?.labels().to_vec(),
            right.col()?.labels().to_vec(),
            false,
        )?;
        Ok(Self::from_parts(left, Right::Other(right), pairs))
    }

    fn from_parts(left: Arc<A>, right: Right<A, B>, pairs: Pairs<String>) -> Self {
        Self {
            left,
            right,
            pairs,
            standardize: true,
            label_limit: DEFAULT_LABEL_LIMIT,
            col: OnceLock::new(),
            col_property: OnceLock::new(),
        }
    }

    /// Also pair each shared column with itself
    pub fn with_singles(mut self, include_singles: bool) -> Result<Self> {
        let list0 = self.pairs.list0().to_vec();
        let list1 = self.pairs.list1().to_vec();
        self.pairs = Pairs::new_unique(list0, list1, include_singles)?;
        self.col = OnceLock::new();
        self.col_property = OnceLock::new();
        Ok(self)
    }

    /// Toggle unit standardization of the input columns before multiplying
    pub fn with_standardize(mut self, standardize: bool) -> Self {
        self.standardize = standardize;
        self
    }

    pub fn with_label_limit(mut self, limit: usize) -> Self {
        self.label_limit = limit;
        self
    }

    pub fn pairs(&self) -> &Pairs<String> {
        &self.pairs
    }

    fn check_limit(&self) -> Result<()> {
        let count = self.pairs.count();
        if count >= self.label_limit {
            return Err(Error::MaterializeLimit {
                count,
                limit: self.label_limit,
            });
        }
        Ok(())
    }

    /// Read `rows` of the given columns as a 2-D f64 array, standardized if configured
    fn read_inputs<R: Reader>(
        &self,
        reader: &R,
        rows: &Resolved,
        columns: Vec<usize>,
        options: &ReadOptions,
    ) -> Result<Array2<f64>> {
        let cols = Resolved::from_list(columns, reader.col_count()?);
        let inner = ReadOptions {
            order: Order::F,
            allow_view: true,
            num_threads: options.num_threads,
        };
        let val = reader.read_val::<f64>(rows, &cols, &inner)?;
        check_read_shape(&val, rows.len(), cols.len())?;
        let mut val = val.into_dimensionality::<Ix2>()?.into_owned();
        if self.standardize {
            Unit.standardize(val.view_mut(), options.threads())?;
        }
        Ok(val)
    }
}

/// Distinct positions in first-seen order, plus each input's slot among them
fn unique_slots(positions: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let mut slot_of = HashMap::with_capacity(positions.len());
    let mut unique = Vec::new();
    let slots = positions
        .iter()
        .map(|&p| {
            *slot_of.entry(p).or_insert_with(|| {
                unique.push(p);
                unique.len() - 1
            })
        })
        .collect();
    (unique, slots)
}

impl<A: Reader, B: Reader> Reader for PairReader<A, B> {
    fn row(&self) -> Result<&LabeledAxis<Iid>> {
        self.left.row()
    }

    /// Materialized on first use, subject to the label limit
    fn col(&self) -> Result<&LabeledAxis<String>> {
        if let Some(col) = self.col.get() {
            return Ok(col);
        }
        self.check_limit()?;
        tracing::debug!(count = self.pairs.count(), "materializing pair labels");
        let labels = self
            .pairs
            .iter()
            .map(|(a, b)| format!("{a},{b}"))
            .collect::<LabeledAxis<String>>();
        Ok(self.col.get_or_init(|| labels))
    }

    fn row_property(&self) -> Result<&Array2<f64>> {
        self.left.row_property()
    }

    fn col_property(&self) -> Result<&Array2<f64>> {
        if let Some(property) = self.col_property.get() {
            return Ok(property);
        }
        self.check_limit()?;
        Ok(self
            .col_property
            .get_or_init(|| Array2::zeros((self.pairs.count(), 3))))
    }

    fn row_count(&self) -> Result<usize> {
        self.left.row_count()
    }

    fn col_count(&self) -> Result<usize> {
        Ok(self.pairs.count())
    }

    fn read_val<T: Element>(
        &self,
        rows: &Resolved,
        cols: &Resolved,
        options: &ReadOptions,
    ) -> Result<ArcArray<T, IxDyn>> {
        let positions = checked_positions(cols, self.pairs.count())?;
        let left_axis = self.left.col()?;
        let mut left_index = Vec::with_capacity(positions.len());
        let mut right_index = Vec::with_capacity(positions.len());
        for &k in &positions {
            let (a, b) = self.pairs.get(k).ok_or(CoreError::IndexOutOfBounds {
                index: k as isize,
                len: self.pairs.count(),
            })?;
            left_index.push(left_axis.index_of(a)?);
            right_index.push(match &self.right {
                Right::SameAs(reader) => reader.col()?.index_of(b)?,
                Right::Other(reader) => reader.col()?.index_of(b)?,
            });
        }
        tracing::trace!(
            rows = rows.len(),
            pairs = positions.len(),
            standardize = self.standardize,
            "pair read"
        );

        let (left_val, left_slots, right_val, right_slots) = match &self.right {
            Right::SameAs(_) => {
                let mut both = left_index.clone();
                both.extend_from_slice(&right_index);
                let (unique, slots) = unique_slots(&both);
                let val = self.read_inputs(self.left.as_ref(), rows, unique, options)?;
                let right_slots = slots[left_index.len()..].to_vec();
                let left_slots = slots[..left_index.len()].to_vec();
                (val.clone(), left_slots, val, right_slots)
            }
            Right::Other(right) => {
                let (left_unique, left_slots) = unique_slots(&left_index);
                let (right_unique, right_slots) = unique_slots(&right_index);
                let left_val = self.read_inputs(self.left.as_ref(), rows, left_unique, options)?;
                let right_val = self.read_inputs(right.as_ref(), rows, right_unique, options)?;
                (left_val, left_slots, right_val, right_slots)
            }
        };

        let order = options.order.resolve(StorageOrder::F);
        let mut out = output_array::<T>(rows.len(), positions.len(), None, order);
        fill_columns(&mut out, options.threads(), |j, i, _| {
            T::from_f64(left_val[(i, left_slots[j])] * right_val[(i, right_slots[j])])
        })?;
        Ok(out.into_shared())
    }

    fn name(&self) -> String {
        self.to_string()
    }
}

impl<A: Reader, B: Reader> fmt::Display for PairReader<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.right {
            Right::SameAs(_) => write!(f, "PairReader({})", self.left.name()),
            Right::Other(right) => write!(f, "PairReader({},{})", self.left.name(), right.name()),
        }
    }
}

impl<A: Reader, B: Reader> fmt::Debug for PairReader<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairReader")
            .field("name", &self.to_string())
            .field("pairs", &self.pairs.count())
            .finish()
    }
}
