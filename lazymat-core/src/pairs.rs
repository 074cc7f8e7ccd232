//! Enumeration of unordered pairs drawn from two label lists
//!
//! Pairs are produced in a fixed order in two phases. Phase one pairs every
//! label found only in the first list with every label of the second list.
//! Phase two walks the labels common to both lists. The common label at
//! position `r` pairs with the labels found only in the second list, then
//! with the common labels from position `r` onward. The start is `r + 1`
//! when self-pairs are excluded. Each unordered pair therefore appears
//! exactly once.
//!
//! Any global position can be located in O(1). Phase two inverts the closed
//! form for "pairs before common row `r`" with a square root.

use crate::{CoreError, Result};
use core::hash::Hash;
use core::iter::FusedIterator;
use core::ops::Range;
use hashbrown::HashSet;

/// Deterministic pair enumerator over two label lists
#[derive(Debug, Clone)]
pub struct Pairs<L> {
    list0: Vec<L>,
    list1: Vec<L>,
    common: Vec<L>,
    only0: Vec<L>,
    only1: Vec<L>,
    include_singles: bool,
    count0: usize,
    count1: usize,
}

fn dedup<L: Clone + Eq + Hash>(items: impl IntoIterator<Item = L>) -> Vec<L> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

/// Pairs emitted by common rows `0..row`
#[inline]
fn pairs_before(row: usize, only1_len: usize, common_len: usize, include_singles: bool) -> usize {
    let r = row as i128;
    let b = 2 * (only1_len as i128 + common_len as i128) + if include_singles { 1 } else { -1 };
    ((b * r - r * r) / 2) as usize
}

impl<L: Clone + Eq + Hash> Pairs<L> {
    /// Build from two lists, dropping repeated labels after their first occurrence
    pub fn new<I0, I1>(list0: I0, list1: I1, include_singles: bool) -> Self
    where
        I0: IntoIterator<Item = L>,
        I1: IntoIterator<Item = L>,
    {
        Self::from_distinct(dedup(list0), dedup(list1), include_singles)
    }

    /// Build from two lists that must not contain repeated labels
    pub fn new_unique<I0, I1>(list0: I0, list1: I1, include_singles: bool) -> Result<Self>
    where
        I0: IntoIterator<Item = L>,
        I1: IntoIterator<Item = L>,
    {
        let list0: Vec<L> = list0.into_iter().collect();
        let list1: Vec<L> = list1.into_iter().collect();
        for list in [&list0, &list1] {
            let mut seen = HashSet::with_capacity(list.len());
            if let Some(position) = list.iter().position(|label| !seen.insert(label)) {
                return Err(CoreError::DuplicateLabel { position });
            }
        }
        Ok(Self::from_distinct(list0, list1, include_singles))
    }

    fn from_distinct(list0: Vec<L>, list1: Vec<L>, include_singles: bool) -> Self {
        let (common, only0, only1) = {
            let set0: HashSet<&L> = list0.iter().collect();
            let set1: HashSet<&L> = list1.iter().collect();
            let (common, only0): (Vec<L>, Vec<L>) =
                list0.iter().cloned().partition(|label| set1.contains(label));
            let only1: Vec<L> = list1
                .iter()
                .filter(|label| !set0.contains(label))
                .cloned()
                .collect();
            (common, only0, only1)
        };

        let count0 = only0.len() * list1.len();
        let count1 = pairs_before(common.len(), only1.len(), common.len(), include_singles);

        Self {
            list0,
            list1,
            common,
            only0,
            only1,
            include_singles,
            count0,
            count1,
        }
    }
}

impl<L> Pairs<L> {
    pub fn list0(&self) -> &[L] {
        &self.list0
    }

    pub fn list1(&self) -> &[L] {
        &self.list1
    }

    /// Labels present in both lists, in first-list order
    pub fn common(&self) -> &[L] {
        &self.common
    }

    pub fn only0(&self) -> &[L] {
        &self.only0
    }

    pub fn only1(&self) -> &[L] {
        &self.only1
    }

    pub fn include_singles(&self) -> bool {
        self.include_singles
    }

    /// Pairs in phase one
    pub fn count0(&self) -> usize {
        self.count0
    }

    /// Pairs in phase two
    pub fn count1(&self) -> usize {
        self.count1
    }

    pub fn count(&self) -> usize {
        self.count0 + self.count1
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Phase-two pairs emitted before common row `row`
    pub fn count_before(&self, row: usize) -> usize {
        pairs_before(
            row.min(self.common.len()),
            self.only1.len(),
            self.common.len(),
            self.include_singles,
        )
    }

    /// Common row holding phase-two offset `offset`
    ///
    /// Returns the largest row `r` with `count_before(r) <= offset`. The
    /// floating-point root is only a starting guess; the result is settled
    /// with exact integer comparisons.
    pub fn common_row_at(&self, offset: usize) -> usize {
        let common_len = self.common.len();
        let b = 2.0 * (self.only1.len() + common_len) as f64
            + if self.include_singles { 1.0 } else { -1.0 };
        let discriminant = b * b - 8.0 * offset as f64;
        let guess = if discriminant <= 0.0 {
            common_len
        } else {
            ((b - discriminant.sqrt()) / 2.0).floor().max(0.0) as usize
        };

        let mut row = guess.min(common_len);
        while row > 0 && self.count_before(row) > offset {
            row -= 1;
        }
        while row < common_len && self.count_before(row + 1) <= offset {
            row += 1;
        }
        row
    }

    /// Partners of common row `row` start at this common position
    #[inline]
    fn partner_start(&self, row: usize) -> usize {
        if self.include_singles {
            row
        } else {
            row + 1
        }
    }

    /// Number of pairs emitted by global row `row` (phase one rows first)
    #[inline]
    fn row_width(&self, row: usize) -> usize {
        if row < self.only0.len() {
            self.list1.len()
        } else {
            let start = self.partner_start(row - self.only0.len());
            self.only1.len() + self.common.len().saturating_sub(start)
        }
    }

    #[inline]
    fn partner(&self, column: usize, common_start: usize) -> &L {
        if column < self.only1.len() {
            &self.only1[column]
        } else {
            &self.common[common_start + column - self.only1.len()]
        }
    }

    /// Global `(row, column)` cursor of pair `index`
    fn locate(&self, index: usize) -> (usize, usize) {
        if index < self.count0 {
            let width = self.list1.len();
            (index / width, index % width)
        } else {
            let offset = index - self.count0;
            let row = self.common_row_at(offset);
            (self.only0.len() + row, offset - self.count_before(row))
        }
    }

    fn pair_at(&self, row: usize, column: usize) -> (&L, &L) {
        if row < self.only0.len() {
            (&self.only0[row], self.partner(column, 0))
        } else {
            let common_row = row - self.only0.len();
            (
                &self.common[common_row],
                self.partner(column, self.partner_start(common_row)),
            )
        }
    }

    /// Pair at global position `index`
    pub fn get(&self, index: usize) -> Option<(&L, &L)> {
        if index >= self.count() {
            return None;
        }
        let (row, column) = self.locate(index);
        Some(self.pair_at(row, column))
    }

    pub fn iter(&self) -> PairIter<'_, L> {
        self.range(0, self.count())
    }

    /// Pairs at positions `start..stop`; `stop` is clamped to `count()`
    pub fn range(&self, start: usize, stop: usize) -> PairIter<'_, L> {
        let stop = stop.min(self.count());
        if start >= stop {
            return PairIter {
                pairs: self,
                row: 0,
                column: 0,
                remaining: 0,
            };
        }
        let (row, column) = self.locate(start);
        PairIter {
            pairs: self,
            row,
            column,
            remaining: stop - start,
        }
    }

    /// Split `0..count()` into at most `parts` contiguous, near-equal ranges
    pub fn chunk_ranges(&self, parts: usize) -> Vec<Range<usize>> {
        let count = self.count();
        let parts = parts.clamp(1, count.max(1));
        let base = count / parts;
        let extra = count % parts;
        let mut start = 0;
        (0..parts)
            .map(|i| {
                let len = base + usize::from(i < extra);
                let range = start..start + len;
                start += len;
                range
            })
            .collect()
    }
}

/// Lazy iterator over a run of pairs
#[derive(Debug, Clone)]
pub struct PairIter<'a, L> {
    pairs: &'a Pairs<L>,
    row: usize,
    column: usize,
    remaining: usize,
}

impl<'a, L> Iterator for PairIter<'a, L> {
    type Item = (&'a L, &'a L);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        while self.column >= self.pairs.row_width(self.row) {
            self.row += 1;
            self.column = 0;
        }
        let pair = self.pairs.pair_at(self.row, self.column);
        self.column += 1;
        self.remaining -= 1;
        Some(pair)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<L> ExactSizeIterator for PairIter<'_, L> {}

impl<L> FusedIterator for PairIter<'_, L> {}

#[cfg(test)]
mod tests {
    use super::*;

    /// Straightforward nested-loop enumeration used as ground truth
    fn slow<L: Clone + Eq + Hash>(pairs: &Pairs<L>) -> Vec<(L, L)> {
        let mut out = Vec::new();
        for a in pairs.only0() {
            for b in pairs.only1().iter().chain(pairs.common()) {
                out.push((a.clone(), b.clone()));
            }
        }
        for (i, a) in pairs.common().iter().enumerate() {
            let start = if pairs.include_singles() { i } else { i + 1 };
            for b in pairs.only1().iter().chain(&pairs.common()[start..]) {
                out.push((a.clone(), b.clone()));
            }
        }
        out
    }

    fn owned<'a>(iter: impl Iterator<Item = (&'a char, &'a char)>) -> Vec<(char, char)> {
        iter.map(|(a, b)| (*a, *b)).collect()
    }

    fn little() -> (Vec<char>, Vec<char>) {
        (vec!['a', 'z', 'a', 'b', 'y'], vec!['z', 'y', 'x', 'v'])
    }

    #[test]
    fn test_little_with_singles() {
        let (list0, list1) = little();
        let pairs = Pairs::new(list0, list1, true);
        assert_eq!(pairs.list0(), &['a', 'z', 'b', 'y']);
        assert_eq!(pairs.common(), &['z', 'y']);
        assert_eq!(pairs.only0(), &['a', 'b']);
        assert_eq!(pairs.only1(), &['x', 'v']);
        assert_eq!(pairs.count0(), 8);
        assert_eq!(pairs.count1(), 7);
        assert_eq!(pairs.count(), 15);

        let all = owned(pairs.iter());
        assert_eq!(
            &all[8..],
            &[
                ('z', 'x'),
                ('z', 'v'),
                ('z', 'z'),
                ('z', 'y'),
                ('y', 'x'),
                ('y', 'v'),
                ('y', 'y'),
            ]
        );
        assert_eq!(all, slow(&pairs));
        assert_eq!(owned(pairs.range(11, 12)), vec![('z', 'y')]);
    }

    #[test]
    fn test_little_without_singles() {
        let (list0, list1) = little();
        let pairs = Pairs::new(list0, list1, false);
        assert_eq!(pairs.count1(), 5);
        assert_eq!(pairs.count(), 13);
        let all = owned(pairs.iter());
        assert_eq!(all, slow(&pairs));
        assert_eq!(owned(pairs.range(12, 13)), vec![('y', 'v')]);
        assert!(!all.iter().any(|(a, b)| a == b));
    }

    #[test]
    fn test_every_window_matches_full_enumeration() {
        let (list0, list1) = little();
        for singles in [true, false] {
            let pairs = Pairs::new(list0.clone(), list1.clone(), singles);
            let full = slow(&pairs);
            for start in 0..=pairs.count() + 1 {
                for stop in start..=pairs.count() + 1 {
                    let window = owned(pairs.range(start, stop));
                    let end = stop.min(full.len());
                    let begin = start.min(end);
                    assert_eq!(window, full[begin..end], "{start}..{stop} singles={singles}");
                }
            }
        }
    }

    #[test]
    fn test_count_formula_over_shapes() {
        for common_len in 0..5usize {
            for only1_len in 0..5usize {
                for only0_len in 0..3usize {
                    for singles in [true, false] {
                        let list0: Vec<usize> =
                            (0..common_len).chain(100..100 + only0_len).collect();
                        let list1: Vec<usize> =
                            (200..200 + only1_len).chain(0..common_len).collect();
                        let pairs = Pairs::new(list0, list1, singles);
                        let reference = slow(&pairs);
                        assert_eq!(pairs.count(), reference.len());
                        let fast: Vec<(usize, usize)> =
                            pairs.iter().map(|(a, b)| (*a, *b)).collect();
                        assert_eq!(fast, reference);
                        for (k, expected) in reference.iter().enumerate() {
                            assert_eq!(pairs.get(k).map(|(a, b)| (*a, *b)), Some(*expected));
                        }
                        assert_eq!(pairs.get(reference.len()), None);
                    }
                }
            }
        }
    }

    #[test]
    fn test_common_row_at_matches_scan() {
        let list: Vec<u32> = (0..40).collect();
        for singles in [true, false] {
            let pairs = Pairs::new(list.clone(), list.clone(), singles);
            for offset in 0..pairs.count1() {
                let expected = (0..=pairs.common().len())
                    .filter(|&r| pairs.count_before(r) <= offset)
                    .max()
                    .unwrap();
                assert_eq!(pairs.common_row_at(offset), expected);
            }
        }
    }

    #[test]
    fn test_large_offset_jump() {
        let list: Vec<u64> = (0..100_000).collect();
        let pairs = Pairs::new(list.clone(), list, false);
        assert_eq!(pairs.count(), 100_000 * 99_999 / 2);
        let last = pairs.get(pairs.count() - 1).unwrap();
        assert_eq!((*last.0, *last.1), (99_998, 99_999));
        let middle: Vec<_> = pairs.range(2_000_000_000, 2_000_000_003).collect();
        assert_eq!(middle.len(), 3);
        for (k, pair) in middle.into_iter().enumerate() {
            assert_eq!(pairs.get(2_000_000_000 + k), Some(pair));
        }
    }

    #[test]
    fn test_disjoint_lists() {
        let pairs = Pairs::new(["a", "b"], ["c"], true);
        assert_eq!(pairs.count1(), 0);
        assert_eq!(
            pairs.iter().map(|(a, b)| (*a, *b)).collect::<Vec<_>>(),
            vec![("a", "c"), ("b", "c")]
        );
    }

    #[test]
    fn test_empty_second_list() {
        let pairs = Pairs::new(["a", "b"], Vec::<&str>::new(), true);
        assert_eq!(pairs.count(), 0);
        assert_eq!(pairs.iter().next(), None);
    }

    #[test]
    fn test_new_unique_rejects_duplicates() {
        let err = Pairs::new_unique(["a", "b", "a"], ["c"], true).unwrap_err();
        assert_eq!(err, CoreError::DuplicateLabel { position: 2 });
        assert!(Pairs::new_unique(["a"], ["c", "c"], true).is_err());
        assert!(Pairs::new_unique(["a", "b"], ["b", "c"], false).is_ok());
    }

    #[test]
    fn test_chunk_ranges_cover_everything() {
        let list: Vec<u32> = (0..23).collect();
        let pairs = Pairs::new(list.clone(), list, true);
        let ranges = pairs.chunk_ranges(7);
        assert_eq!(ranges.len(), 7);
        assert_eq!(ranges.first().map(|r| r.start), Some(0));
        assert_eq!(ranges.last().map(|r| r.end), Some(pairs.count()));
        let stitched: Vec<_> = ranges
            .iter()
            .flat_map(|r| pairs.range(r.start, r.end))
            .collect();
        assert_eq!(stitched, pairs.iter().collect::<Vec<_>>());
    }

    #[test]
    fn test_exact_size() {
        let pairs = Pairs::new(0..10u8, 5..12u8, false);
        let iter = pairs.range(3, 17);
        assert_eq!(iter.len(), 14);
    }
}
