//! Axis selectors and their composition
//!
//! A [`Selector`] is what a caller writes; a [`Resolved`] is the same
//! selection checked against a concrete axis length. Resolved selections
//! compose: `inner.compose(&outer)` yields the positions in the inner
//! selection's parent that `outer` picks, so a chain of views collapses
//! into a single selection against the root dataset.

use crate::validation::parse_isize;
use crate::{CoreError, Result};
use core::fmt;
use core::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo};
use core::str::FromStr;

/// Caller-facing selection along one axis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Selector {
    /// Every position
    All,
    /// Explicit positions; negative values count from the end
    Indices(Vec<isize>),
    /// Boolean mask, one entry per position
    Mask(Vec<bool>),
    /// Half-open slice with a signed step; out-of-range bounds are clamped
    Slice {
        start: Option<isize>,
        stop: Option<isize>,
        step: isize,
    },
}

impl Default for Selector {
    fn default() -> Self {
        Selector::All
    }
}

impl Selector {
    pub const fn slice(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Selector::Slice { start, stop, step }
    }

    /// Check this selector against an axis of `len` positions
    pub fn resolve(&self, len: usize) -> Result<Resolved> {
        match self {
            Selector::All => Ok(Resolved::Full(len)),
            Selector::Indices(indices) => {
                let positions = indices
                    .iter()
                    .map(|&index| normalize_index(index, len))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Resolved::from_list(positions, len))
            }
            Selector::Mask(mask) => {
                if mask.len() != len {
                    return Err(CoreError::MaskLength {
                        expected: len,
                        actual: mask.len(),
                    });
                }
                let positions = mask
                    .iter()
                    .enumerate()
                    .filter_map(|(i, &keep)| keep.then_some(i))
                    .collect();
                Ok(Resolved::from_list(positions, len))
            }
            Selector::Slice { start, stop, step } => resolve_slice(*start, *stop, *step, len),
        }
    }
}

fn normalize_index(index: isize, len: usize) -> Result<usize> {
    let signed_len = isize::try_from(len).map_err(|_| CoreError::ArraySizeOverflow)?;
    let position = if index < 0 { index + signed_len } else { index };
    if position < 0 || position >= signed_len {
        return Err(CoreError::IndexOutOfBounds { index, len });
    }
    Ok(position as usize)
}

fn resolve_slice(
    start: Option<isize>,
    stop: Option<isize>,
    step: isize,
    len: usize,
) -> Result<Resolved> {
    if step == 0 {
        return Err(CoreError::ZeroStep);
    }
    let n = len as i128;
    let k = step as i128;
    let (lower, upper) = if k < 0 { (-1, n - 1) } else { (0, n) };
    let clamp = |bound: Option<isize>, default: i128| match bound {
        None => default,
        Some(v) if v < 0 => (v as i128 + n).max(lower),
        Some(v) => (v as i128).min(upper),
    };
    let first = clamp(start, if k < 0 { upper } else { lower });
    let last = clamp(stop, if k < 0 { lower } else { upper });

    let count = if k > 0 && last > first {
        (last - first - 1) / k + 1
    } else if k < 0 && first > last {
        (first - last - 1) / (-k) + 1
    } else {
        0
    };

    if count == 0 {
        return Ok(Resolved::List(Vec::new()));
    }
    if first == 0 && k == 1 && count == n {
        return Ok(Resolved::Full(len));
    }
    Ok(Resolved::Strided {
        start: first as usize,
        step,
        count: count as usize,
    })
}

/// Selection checked against a concrete axis
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Resolved {
    /// Every position of an axis with this many entries
    Full(usize),
    /// `count` positions starting at `start`, `step` apart
    Strided {
        start: usize,
        step: isize,
        count: usize,
    },
    List(Vec<usize>),
}

impl Resolved {
    /// Positions as a list, collapsed to `Full` when they are the identity over `len`
    pub fn from_list(positions: Vec<usize>, len: usize) -> Self {
        if positions.len() == len && positions.iter().enumerate().all(|(i, &p)| i == p) {
            Resolved::Full(len)
        } else {
            Resolved::List(positions)
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Resolved::Full(len) => *len,
            Resolved::Strided { count, .. } => *count,
            Resolved::List(positions) => positions.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        matches!(self, Resolved::Full(_))
    }

    /// Parent position of the `i`-th selected entry
    #[inline]
    pub fn get(&self, i: usize) -> Option<usize> {
        match self {
            Resolved::Full(len) => (i < *len).then_some(i),
            Resolved::Strided { start, step, count } => {
                (i < *count).then(|| (*start as isize + i as isize * *step) as usize)
            }
            Resolved::List(positions) => positions.get(i).copied(),
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        (0..self.len()).map(move |i| match self {
            Resolved::Full(_) => i,
            Resolved::Strided { start, step, .. } => (*start as isize + i as isize * *step) as usize,
            Resolved::List(positions) => positions[i],
        })
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }

    /// Explicit positions, or `None` when every position is selected
    pub fn as_index_list(&self) -> Option<Vec<usize>> {
        match self {
            Resolved::Full(_) => None,
            other => Some(other.to_vec()),
        }
    }

    /// Items of `items` at the selected positions
    pub fn select<L: Clone>(&self, items: &[L]) -> Vec<L> {
        self.iter().map(|i| items[i].clone()).collect()
    }

    /// Largest selected position, if any
    fn max_position(&self) -> Option<usize> {
        match self {
            Resolved::Full(len) => len.checked_sub(1),
            Resolved::Strided { start, step, count } => {
                if *count == 0 {
                    None
                } else if *step > 0 {
                    self.get(count - 1)
                } else {
                    Some(*start)
                }
            }
            Resolved::List(positions) => positions.iter().copied().max(),
        }
    }

    /// Apply `outer`, expressed against this selection, to this selection's parent
    pub fn compose(&self, outer: &Resolved) -> Result<Resolved> {
        let len = self.len();
        if let Some(max) = outer.max_position() {
            if max >= len {
                return Err(CoreError::IndexOutOfBounds {
                    index: max as isize,
                    len,
                });
            }
        }

        match (self, outer) {
            (Resolved::Full(_), _) => Ok(outer.clone()),
            (_, Resolved::Full(outer_len)) => {
                if *outer_len != len {
                    return Err(CoreError::CountMismatch {
                        declared: len,
                        actual: *outer_len,
                    });
                }
                Ok(self.clone())
            }
            (_, outer) if outer.is_empty() => Ok(Resolved::List(Vec::new())),
            (
                Resolved::Strided {
                    start: inner_start,
                    step: inner_step,
                    ..
                },
                Resolved::Strided {
                    start: outer_start,
                    step: outer_step,
                    count,
                },
            ) => {
                let start = *inner_start as isize + *outer_start as isize * *inner_step;
                let step = inner_step
                    .checked_mul(*outer_step)
                    .ok_or(CoreError::ArraySizeOverflow)?;
                Ok(Resolved::Strided {
                    start: start as usize,
                    step,
                    count: *count,
                })
            }
            (inner, outer) => Ok(Resolved::List(
                outer
                    .iter()
                    .map(|i| inner.get(i).ok_or(CoreError::IndexOutOfBounds {
                        index: i as isize,
                        len,
                    }))
                    .collect::<Result<Vec<_>>>()?,
            )),
        }
    }
}

/// Positions past `isize::MAX` saturate and so stay out of range
fn to_index(i: usize) -> isize {
    isize::try_from(i).unwrap_or(isize::MAX)
}

impl From<RangeFull> for Selector {
    fn from(_: RangeFull) -> Self {
        Selector::All
    }
}

impl From<Range<usize>> for Selector {
    fn from(range: Range<usize>) -> Self {
        Selector::slice(Some(to_index(range.start)), Some(to_index(range.end)), 1)
    }
}

impl From<RangeFrom<usize>> for Selector {
    fn from(range: RangeFrom<usize>) -> Self {
        Selector::slice(Some(to_index(range.start)), None, 1)
    }
}

impl From<RangeTo<usize>> for Selector {
    fn from(range: RangeTo<usize>) -> Self {
        Selector::slice(None, Some(to_index(range.end)), 1)
    }
}

impl From<RangeInclusive<usize>> for Selector {
    fn from(range: RangeInclusive<usize>) -> Self {
        Selector::slice(
            Some(to_index(*range.start())),
            Some(to_index(*range.end()).saturating_add(1)),
            1,
        )
    }
}

impl From<usize> for Selector {
    fn from(index: usize) -> Self {
        Selector::Indices(vec![to_index(index)])
    }
}

impl From<Vec<usize>> for Selector {
    fn from(indices: Vec<usize>) -> Self {
        Selector::Indices(indices.into_iter().map(to_index).collect())
    }
}

impl From<&[usize]> for Selector {
    fn from(indices: &[usize]) -> Self {
        Selector::Indices(indices.iter().copied().map(to_index).collect())
    }
}

impl From<Vec<bool>> for Selector {
    fn from(mask: Vec<bool>) -> Self {
        Selector::Mask(mask)
    }
}

impl From<&[bool]> for Selector {
    fn from(mask: &[bool]) -> Self {
        Selector::Mask(mask.to_vec())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            write!(f, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, "]")
        }

        match self {
            Selector::All => write!(f, ":"),
            Selector::Indices(indices) => list(f, indices),
            Selector::Mask(mask) => list(f, mask),
            Selector::Slice { start, stop, step } => {
                if let Some(start) = start {
                    write!(f, "{start}")?;
                }
                write!(f, ":")?;
                if let Some(stop) = stop {
                    write!(f, "{stop}")?;
                }
                if *step != 1 {
                    write!(f, ":{step}")?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for Selector {
    type Err = CoreError;

    /// Parse `:`, `a:b`, `a:b:c`, `[i,j,...]` or a single index
    fn from_str(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::InvalidSelector);
        }

        if let Some(inner) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
            if inner.trim().is_empty() {
                return Ok(Selector::Indices(Vec::new()));
            }
            return inner
                .split(',')
                .map(parse_isize)
                .collect::<Result<Vec<_>>>()
                .map(Selector::Indices);
        }

        if !text.contains(':') {
            return Ok(Selector::Indices(vec![parse_isize(text)?]));
        }

        let parts: Vec<&str> = text.split(':').collect();
        if parts.len() > 3 {
            return Err(CoreError::InvalidSelector);
        }
        let bound = |part: &str| -> Result<Option<isize>> {
            if part.trim().is_empty() {
                Ok(None)
            } else {
                parse_isize(part).map(Some)
            }
        };
        let start = bound(parts[0])?;
        let stop = bound(parts[1])?;
        let step = match parts.get(2) {
            Some(part) => bound(part)?.unwrap_or(1),
            None => 1,
        };
        if start.is_none() && stop.is_none() && step == 1 {
            return Ok(Selector::All);
        }
        Ok(Selector::Slice { start, stop, step })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_huge_positions_stay_out_of_range() {
        let err = Selector::from(usize::MAX).resolve(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Index);
        assert!(Selector::from(vec![0, usize::MAX]).resolve(3).is_err());
        assert!(Selector::from(usize::MAX..).resolve(3).unwrap().is_empty());
        assert_eq!(Selector::from(1..=usize::MAX).resolve(3).unwrap().len(), 2);
    }

    #[test]
    fn test_negative_indices() {
        let resolved = Selector::Indices(vec![-1, 0, -3]).resolve(5).unwrap();
        assert_eq!(resolved, Resolved::List(vec![4, 0, 2]));
    }

    #[test]
    fn test_out_of_range_is_error_not_clamped() {
        assert_eq!(
            Selector::Indices(vec![5]).resolve(5),
            Err(CoreError::IndexOutOfBounds { index: 5, len: 5 })
        );
        assert_eq!(
            Selector::Indices(vec![-6]).resolve(5),
            Err(CoreError::IndexOutOfBounds { index: -6, len: 5 })
        );
    }

    #[test]
    fn test_mask_length_checked() {
        let err = Selector::Mask(vec![true, false]).resolve(3).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Shape);
        let ok = Selector::Mask(vec![false, true, true]).resolve(3).unwrap();
        assert_eq!(ok.to_vec(), vec![1, 2]);
    }

    #[test]
    fn test_identity_selections_become_full() {
        assert_eq!(Selector::from(0..4).resolve(4), Ok(Resolved::Full(4)));
        assert_eq!(
            Selector::Mask(vec![true; 3]).resolve(3),
            Ok(Resolved::Full(3))
        );
        assert_eq!(
            Selector::from(vec![0usize, 1, 2]).resolve(3),
            Ok(Resolved::Full(3))
        );
    }

    #[test]
    fn test_slice_clamping_semantics() {
        let cases: &[(Option<isize>, Option<isize>, isize, usize, Vec<usize>)] = &[
            (None, None, 2, 7, vec![0, 2, 4, 6]),
            (Some(-3), None, 1, 7, vec![4, 5, 6]),
            (None, None, -1, 4, vec![3, 2, 1, 0]),
            (Some(10), Some(2), -3, 8, vec![7, 4]),
            (Some(2), Some(100), 1, 5, vec![2, 3, 4]),
            (Some(-100), Some(2), 1, 5, vec![0, 1]),
            (Some(3), Some(1), 1, 5, vec![]),
            (None, Some(-6), -1, 5, vec![4, 3, 2, 1, 0]),
            (None, None, 1, 0, vec![]),
            (None, None, -1, 0, vec![]),
        ];
        for (start, stop, step, len, expected) in cases {
            let resolved = Selector::slice(*start, *stop, *step).resolve(*len).unwrap();
            assert_eq!(&resolved.to_vec(), expected, "{start:?}:{stop:?}:{step} of {len}");
        }
        assert_eq!(
            Selector::slice(None, None, 0).resolve(3),
            Err(CoreError::ZeroStep)
        );
    }

    #[test]
    fn test_compose_strided_stays_strided() {
        let inner = Selector::slice(Some(1), None, 2).resolve(20).unwrap();
        let outer = Selector::slice(None, None, -3).resolve(inner.len()).unwrap();
        let composed = inner.compose(&outer).unwrap();
        assert!(matches!(composed, Resolved::Strided { .. }));
        let expected: Vec<usize> = outer.iter().map(|i| inner.get(i).unwrap()).collect();
        assert_eq!(composed.to_vec(), expected);
    }

    #[test]
    fn test_compose_mixed() {
        let inner = Resolved::List(vec![9, 4, 7, 1]);
        let outer = Selector::Mask(vec![true, false, true, true]).resolve(4).unwrap();
        assert_eq!(inner.compose(&outer).unwrap().to_vec(), vec![9, 7, 1]);

        let full = Resolved::Full(10);
        assert_eq!(full.compose(&inner), Ok(inner.clone()));
        assert_eq!(inner.compose(&Resolved::Full(4)), Ok(inner.clone()));
        assert!(inner.compose(&Resolved::Full(5)).is_err());
        assert!(inner.compose(&Resolved::List(vec![4])).is_err());
    }

    #[test]
    fn test_display_and_parse() {
        let slice = Selector::slice(None, None, 2);
        assert_eq!(slice.to_string(), "::2");
        assert_eq!("::2".parse::<Selector>(), Ok(slice));
        assert_eq!(Selector::Indices(vec![3, 4]).to_string(), "[3,4]");
        assert_eq!("[3, 4]".parse::<Selector>(), Ok(Selector::Indices(vec![3, 4])));
        assert_eq!("1:5".parse::<Selector>(), Ok(Selector::from(1..5)));
        assert_eq!(":".parse::<Selector>(), Ok(Selector::All));
        assert_eq!("-2".parse::<Selector>(), Ok(Selector::Indices(vec![-2])));
        assert_eq!(
            "1:2:3:4".parse::<Selector>(),
            Err(CoreError::InvalidSelector)
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_selector_serde() {
        let selector = Selector::slice(Some(1), None, -1);
        let json = serde_json::to_string(&selector).unwrap();
        assert_eq!(serde_json::from_str::<Selector>(&json).unwrap(), selector);
    }
}
