//! Labeled axes with lazily built label lookup

use crate::selector::Resolved;
use crate::{CoreError, Result};
use core::fmt;
use core::hash::Hash;
use hashbrown::HashMap;
use std::sync::OnceLock;

/// Types usable as axis labels
pub trait Label: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + fmt::Debug + Send + Sync + 'static> Label for T {}

/// Row label: a (family id, individual id) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Iid {
    pub fid: String,
    pub iid: String,
}

impl Iid {
    pub fn new(fid: impl Into<String>, iid: impl Into<String>) -> Self {
        Self {
            fid: fid.into(),
            iid: iid.into(),
        }
    }
}

impl From<(&str, &str)> for Iid {
    fn from((fid, iid): (&str, &str)) -> Self {
        Self::new(fid, iid)
    }
}

impl From<(String, String)> for Iid {
    fn from((fid, iid): (String, String)) -> Self {
        Self { fid, iid }
    }
}

impl fmt::Display for Iid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.fid, self.iid)
    }
}

type LabelIndex<L> = core::result::Result<HashMap<L, usize>, CoreError>;

/// Ordered sequence of labels for one dataset axis
///
/// The label-to-position map is built on the first lookup and reused after
/// that. Axes may hold duplicates; looking up a label on such an axis
/// reports the first duplicate position.
#[derive(Clone)]
pub struct LabeledAxis<L> {
    labels: Vec<L>,
    index: OnceLock<LabelIndex<L>>,
}

impl<L: Label> LabeledAxis<L> {
    pub fn new(labels: Vec<L>) -> Self {
        Self {
            labels,
            index: OnceLock::new(),
        }
    }

    /// Build an axis that must not contain duplicate labels
    pub fn new_unique(labels: Vec<L>) -> Result<Self> {
        let axis = Self::new(labels);
        axis.lookup()?;
        Ok(axis)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    pub fn get(&self, position: usize) -> Option<&L> {
        self.labels.get(position)
    }

    pub fn iter(&self) -> core::slice::Iter<'_, L> {
        self.labels.iter()
    }

    pub fn into_labels(self) -> Vec<L> {
        self.labels
    }

    /// Whether the lookup map has been built yet
    pub fn is_indexed(&self) -> bool {
        self.index.get().is_some()
    }

    fn lookup(&self) -> Result<&HashMap<L, usize>> {
        self.index
            .get_or_init(|| {
                let mut map = HashMap::with_capacity(self.labels.len());
                for (position, label) in self.labels.iter().enumerate() {
                    if map.insert(label.clone(), position).is_some() {
                        return Err(CoreError::DuplicateLabel { position });
                    }
                }
                Ok(map)
            })
            .as_ref()
            .map_err(|e| *e)
    }

    /// Position of `label`
    pub fn index_of(&self, label: &L) -> Result<usize> {
        self.lookup()?
            .get(label)
            .copied()
            .ok_or(CoreError::LabelNotFound)
    }

    /// Positions of every label in `labels`, in the given order
    pub fn indices_of<'a, I>(&self, labels: I) -> Result<Vec<usize>>
    where
        I: IntoIterator<Item = &'a L>,
    {
        let map = self.lookup()?;
        labels
            .into_iter()
            .map(|label| map.get(label).copied().ok_or(CoreError::LabelNotFound))
            .collect()
    }

    pub fn contains(&self, label: &L) -> Result<bool> {
        Ok(self.lookup()?.contains_key(label))
    }

    /// Labels at the positions named by `selection`
    pub fn select(&self, selection: &Resolved) -> Self {
        match selection {
            Resolved::Full(_) => self.clone(),
            _ => Self::new(selection.select(&self.labels)),
        }
    }
}

impl LabeledAxis<String> {
    /// Placeholder column labels `id0, id1, ...`
    pub fn placeholder(count: usize) -> Self {
        Self::new((0..count).map(|i| format!("id{i}")).collect())
    }
}

impl LabeledAxis<Iid> {
    /// Placeholder row labels with empty family id and `id0, id1, ...`
    pub fn placeholder(count: usize) -> Self {
        Self::new((0..count).map(|i| Iid::new("", format!("id{i}"))).collect())
    }
}

impl<L: Label> FromIterator<L> for LabeledAxis<L> {
    fn from_iter<I: IntoIterator<Item = L>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<L: Label> From<Vec<L>> for LabeledAxis<L> {
    fn from(labels: Vec<L>) -> Self {
        Self::new(labels)
    }
}

impl<L: PartialEq> PartialEq for LabeledAxis<L> {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl<L: Eq> Eq for LabeledAxis<L> {}

impl<L: fmt::Debug> fmt::Debug for LabeledAxis<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels.iter()).finish()
    }
}
