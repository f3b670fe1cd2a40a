use std::{
    cmp::Ordering,
    iter::{Copied, Zip},
    ops::RangeFrom,
    slice,
};

use super::bit_vector::BitVector;

/// Ranges below this size are always filtered into an index vector.
pub const SMALL_RANGE_LIMIT: u32 = 2048;

/// Half-open interval `[start, end)` of row indices.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Range {
    pub start: u32,
    pub end: u32,
}

impl Range {
    pub fn new(start: u32, end: u32) -> Self {
        assert!(start <= end, "range end {end} precedes start {start}");
        Self { start, end }
    }

    pub fn size(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, index: u32) -> bool {
        index >= self.start && index < self.end
    }
}

impl From<std::ops::Range<u32>> for Range {
    fn from(range: std::ops::Range<u32>) -> Self {
        Range::new(range.start, range.end)
    }
}

/// Representation hint used when a range has to be materialized by
/// [`RowSelection::filter`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OptimizeFor {
    /// Pick whichever of bit vector or index vector is cheaper to hold.
    #[default]
    Memory,
    /// Always materialize into an index vector, which has O(1) `get`.
    LookupSpeed,
}

#[derive(Clone, Debug)]
enum Repr {
    Range(Range),
    BitVector(BitVector),
    IndexVector(Vec<u32>),
}

/// An ordered selection of row indices.
///
/// A selection maps a row (its ordinal position inside the selection) to an
/// index (an absolute position in the underlying column). Three encodings are
/// used interchangeably:
///
/// * a contiguous [`Range`], the cheapest form and the one every filter starts
///   from,
/// * a [`BitVector`] whose set bits are the selected indices, always sorted
///   and duplicate free,
/// * an index vector, which may be unsorted and may repeat indices.
///
/// Out of bounds rows and indices are caller bugs and panic.
#[derive(Clone, Debug)]
pub struct RowSelection {
    repr: Repr,
    optimize_for: OptimizeFor,
}

impl Default for RowSelection {
    fn default() -> Self {
        Self::range(0, 0)
    }
}

impl RowSelection {
    /// Empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects every index in `[start, end)`.
    pub fn range(start: u32, end: u32) -> Self {
        Range::new(start, end).into()
    }

    /// Selects only `index`.
    pub fn single_row(index: u32) -> Self {
        Self::range(index, index + 1)
    }

    pub fn with_optimize_for(self, optimize_for: OptimizeFor) -> Self {
        Self {
            optimize_for,
            ..self
        }
    }

    pub fn optimize_for(&self) -> OptimizeFor {
        self.optimize_for
    }

    fn with_repr(&self, repr: Repr) -> Self {
        Self {
            repr,
            optimize_for: self.optimize_for,
        }
    }

    pub fn size(&self) -> u32 {
        match &self.repr {
            Repr::Range(range) => range.size(),
            Repr::BitVector(bv) => bv.count_set_bits(),
            Repr::IndexVector(vec) => vec.len() as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Index stored at ordinal `row`.
    pub fn get(&self, row: u32) -> u32 {
        debug_assert!(row < self.size(), "row {row} out of bounds ({})", self.size());
        match &self.repr {
            Repr::Range(range) => range.start + row,
            Repr::BitVector(bv) => bv.index_of_nth_set(row),
            Repr::IndexVector(vec) => vec[row as usize],
        }
    }

    pub fn contains(&self, index: u32) -> bool {
        match &self.repr {
            Repr::Range(range) => range.contains(index),
            Repr::BitVector(bv) => index < bv.len() && bv.is_set(index),
            Repr::IndexVector(vec) => vec.contains(&index),
        }
    }

    /// First row holding `index`, if any.
    pub fn row_of(&self, index: u32) -> Option<u32> {
        match &self.repr {
            Repr::Range(range) => range.contains(index).then(|| index - range.start),
            Repr::BitVector(bv) => {
                (index < bv.len() && bv.is_set(index)).then(|| bv.count_set_bits_until(index))
            }
            Repr::IndexVector(vec) => vec.iter().position(|i| *i == index).map(|p| p as u32),
        }
    }

    /// Inserts `index`, keeping the selection sorted.
    ///
    /// A range only stays a range when `index` extends it by one; any other
    /// insertion converts it into a bit vector. Index vectors must already be
    /// sorted.
    pub fn insert(&mut self, index: u32) {
        match &mut self.repr {
            Repr::Range(range) => {
                if index == range.end {
                    range.end += 1;
                    return;
                }
                let mut bv = BitVector::with_len(range.start, false);
                bv.resize(range.end, true);
                insert_into_bit_vector(&mut bv, index);
                self.repr = Repr::BitVector(bv);
            }
            Repr::BitVector(bv) => insert_into_bit_vector(bv, index),
            Repr::IndexVector(vec) => {
                debug_assert!(vec.windows(2).all(|w| w[0] <= w[1]), "index vector unsorted");
                let at = vec.partition_point(|i| *i <= index);
                vec.insert(at, index);
            }
        }
    }

    /// Gathers `self[selector[i]]` for every row `i` of `selector`.
    ///
    /// For `self = [0, 1, 4, 10, 11]` and `selector = [0, 3, 4, 4, 2]` the
    /// result is `[0, 10, 11, 11, 4]`.
    pub fn select_rows(&self, selector: &RowSelection) -> RowSelection {
        match selector.size() {
            0 => self.with_repr(Repr::Range(Range::default())),
            1 => self.with_repr(Repr::Range(Range::new(
                self.get(selector.get(0)),
                self.get(selector.get(0)) + 1,
            ))),
            _ => self.select_rows_slow(selector),
        }
    }

    fn select_rows_slow(&self, selector: &RowSelection) -> RowSelection {
        let repr = match (&self.repr, &selector.repr) {
            (Repr::Range(range), Repr::Range(sel)) => {
                assert!(sel.end <= range.size(), "selector out of bounds");
                Repr::Range(Range::new(range.start + sel.start, range.start + sel.end))
            }
            (Repr::Range(range), Repr::BitVector(sel)) => {
                assert!(sel.len() <= range.size(), "selector out of bounds");
                Repr::BitVector(BitVector::from_indices(
                    range.start + sel.len(),
                    sel.iter_set_bits().map(|row| range.start + row),
                ))
            }
            (Repr::Range(range), Repr::IndexVector(sel)) => Repr::IndexVector(
                sel.iter()
                    .map(|row| {
                        debug_assert!(*row < range.size());
                        range.start + row
                    })
                    .collect(),
            ),
            (Repr::BitVector(bv), Repr::Range(sel)) => {
                let first = bv.index_of_nth_set(sel.start);
                let last = bv.index_of_nth_set(sel.end - 1);
                let mut out = bv.intersect_range(first, last + 1);
                out.resize(bv.len(), false);
                Repr::BitVector(out)
            }
            (Repr::BitVector(bv), Repr::BitVector(sel)) => {
                let count = bv.count_set_bits();
                assert!(sel.len() <= count, "selector out of bounds");
                let mut update = sel.clone();
                update.resize(count, false);
                let mut out = bv.clone();
                out.update_set_bits(&update);
                Repr::BitVector(out)
            }
            (Repr::BitVector(bv), Repr::IndexVector(sel)) => {
                // Per-row select is logarithmic; materialize once the
                // selector is a sizeable fraction of the set bits.
                if (sel.len() as u64) * 32 < u64::from(bv.count_set_bits()) {
                    Repr::IndexVector(sel.iter().map(|row| bv.index_of_nth_set(*row)).collect())
                } else {
                    let indices = bv.set_bit_indices();
                    Repr::IndexVector(sel.iter().map(|row| indices[*row as usize]).collect())
                }
            }
            (Repr::IndexVector(vec), Repr::Range(sel)) => {
                Repr::IndexVector(vec[sel.start as usize..sel.end as usize].to_vec())
            }
            (Repr::IndexVector(vec), Repr::BitVector(sel)) => {
                assert!(sel.len() as usize <= vec.len(), "selector out of bounds");
                Repr::IndexVector(sel.iter_set_bits().map(|row| vec[row as usize]).collect())
            }
            (Repr::IndexVector(vec), Repr::IndexVector(sel)) => {
                Repr::IndexVector(sel.iter().map(|row| vec[*row as usize]).collect())
            }
        };
        self.with_repr(repr)
    }

    /// Keeps only the indices also present in `other`, preserving order.
    pub fn intersect(&mut self, other: &RowSelection) {
        if let (Repr::Range(range), Repr::Range(second)) = (&mut self.repr, &other.repr) {
            let start = range.start.max(second.start);
            let end = start.max(range.end.min(second.end));
            *range = Range { start, end };
            return;
        }
        self.filter(|index| other.contains(index));
    }

    /// Collapses to `[index]` if present, otherwise becomes empty.
    pub fn intersect_exact(&mut self, index: u32) {
        if self.contains(index) {
            self.repr = Repr::Range(Range::new(index, index + 1));
        } else {
            self.clear();
        }
    }

    /// Resets to the empty range, keeping the optimization hint.
    pub fn clear(&mut self) {
        self.repr = Repr::Range(Range::default());
    }

    /// Keeps the indices for which `pred` returns true.
    pub fn filter<P>(&mut self, mut pred: P)
    where
        P: FnMut(u32) -> bool,
    {
        match &mut self.repr {
            Repr::Range(range) => {
                let range = *range;
                self.repr = filter_range(&mut pred, range, self.optimize_for);
            }
            Repr::BitVector(bv) => {
                let dropped: Vec<u32> = bv.iter_set_bits().filter(|i| !pred(*i)).collect();
                for index in dropped {
                    bv.clear(index);
                }
            }
            Repr::IndexVector(vec) => vec.retain(|i| pred(*i)),
        }
    }

    /// Lazily yields `(row, index)` pairs in row order.
    pub fn iter_rows(&self) -> RowIter<'_> {
        let inner = match &self.repr {
            Repr::Range(range) => RowIterInner::Range((0..).zip(range.start..range.end)),
            Repr::BitVector(bv) => RowIterInner::BitVector((0..).zip(bv.set_bits())),
            Repr::IndexVector(vec) => RowIterInner::IndexVector((0..).zip(vec.iter().copied())),
        };
        RowIter { inner }
    }

    /// Calls `f(row, index)` for every row in order.
    ///
    /// The encoding is matched once and each arm runs its own loop.
    pub fn for_each_row<F>(&self, mut f: F)
    where
        F: FnMut(u32, u32),
    {
        self.iter_rows().for_each(|(row, index)| f(row, index));
    }

    /// One past the largest index this selection can hold.
    pub fn max(&self) -> u32 {
        match &self.repr {
            Repr::Range(range) => range.end,
            Repr::BitVector(bv) => bv.len(),
            Repr::IndexVector(vec) => vec.iter().max().map_or(0, |max| max + 1),
        }
    }

    pub fn all_indices(&self) -> Vec<u32> {
        match &self.repr {
            Repr::Range(range) => (range.start..range.end).collect(),
            Repr::BitVector(bv) => bv.set_bit_indices(),
            Repr::IndexVector(vec) => vec.clone(),
        }
    }

    pub fn take_as_index_vector(self) -> Vec<u32> {
        match self.repr {
            Repr::Range(range) => (range.start..range.end).collect(),
            Repr::BitVector(bv) => bv.set_bit_indices(),
            Repr::IndexVector(vec) => vec,
        }
    }

    /// Stable-sorts `rows` (ordinals into this selection) by comparing the
    /// indices they resolve to.
    pub fn stable_sort<C>(&self, rows: &mut [u32], mut cmp: C)
    where
        C: FnMut(u32, u32) -> Ordering,
    {
        rows.sort_by(|a, b| cmp(self.get(*a), self.get(*b)));
    }

    pub fn is_range(&self) -> bool {
        matches!(self.repr, Repr::Range(_))
    }

    pub fn is_bit_vector(&self) -> bool {
        matches!(self.repr, Repr::BitVector(_))
    }

    pub fn is_index_vector(&self) -> bool {
        matches!(self.repr, Repr::IndexVector(_))
    }

    pub fn as_range(&self) -> Option<Range> {
        match &self.repr {
            Repr::Range(range) => Some(*range),
            _ => None,
        }
    }

    pub fn as_bit_vector(&self) -> Option<&BitVector> {
        match &self.repr {
            Repr::BitVector(bv) => Some(bv),
            _ => None,
        }
    }

    pub fn as_index_vector(&self) -> Option<&[u32]> {
        match &self.repr {
            Repr::IndexVector(vec) => Some(vec),
            _ => None,
        }
    }
}

impl From<Range> for RowSelection {
    fn from(range: Range) -> Self {
        Self {
            repr: Repr::Range(range),
            optimize_for: OptimizeFor::default(),
        }
    }
}

impl From<BitVector> for RowSelection {
    fn from(bv: BitVector) -> Self {
        Self {
            repr: Repr::BitVector(bv),
            optimize_for: OptimizeFor::default(),
        }
    }
}

impl From<Vec<u32>> for RowSelection {
    fn from(vec: Vec<u32>) -> Self {
        Self {
            repr: Repr::IndexVector(vec),
            optimize_for: OptimizeFor::default(),
        }
    }
}

fn insert_into_bit_vector(bv: &mut BitVector, index: u32) {
    if index == bv.len() {
        bv.append_true();
        return;
    }
    if index > bv.len() {
        bv.resize(index + 1, false);
    }
    bv.set(index);
}

fn filter_range<P>(pred: &mut P, range: Range, optimize_for: OptimizeFor) -> Repr
where
    P: FnMut(u32) -> bool,
{
    let count = range.size();
    let is_small_range = count < SMALL_RANGE_LIMIT;
    let index_vector_cost_ub = u64::from(count) * std::mem::size_of::<u32>() as u64;
    let bit_vector_cost = BitVector::approx_bytes_cost(range.end);

    if is_small_range
        || index_vector_cost_ub <= bit_vector_cost
        || optimize_for == OptimizeFor::LookupSpeed
    {
        let mut out = Vec::with_capacity(count.min(SMALL_RANGE_LIMIT) as usize);
        out.extend((range.start..range.end).filter(|i| pred(*i)));
        out.shrink_to_fit();
        return Repr::IndexVector(out);
    }
    Repr::BitVector(BitVector::range(range.start, range.end, pred))
}

type Rows<I> = Zip<RangeFrom<u32>, I>;

/// Iterator returned by [`RowSelection::iter_rows`].
///
/// Internal iteration (`fold`, `for_each` and everything built on them)
/// picks the encoding once and then runs that encoding's loop.
pub struct RowIter<'a> {
    inner: RowIterInner<'a>,
}

enum RowIterInner<'a> {
    Range(Rows<std::ops::Range<u32>>),
    BitVector(Rows<roaring::bitmap::Iter<'a>>),
    IndexVector(Rows<Copied<slice::Iter<'a, u32>>>),
}

impl Iterator for RowIter<'_> {
    type Item = (u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            RowIterInner::Range(rows) => rows.next(),
            RowIterInner::BitVector(rows) => rows.next(),
            RowIterInner::IndexVector(rows) => rows.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            RowIterInner::Range(rows) => rows.size_hint(),
            RowIterInner::BitVector(rows) => rows.size_hint(),
            RowIterInner::IndexVector(rows) => rows.size_hint(),
        }
    }

    fn fold<B, F>(self, init: B, f: F) -> B
    where
        F: FnMut(B, Self::Item) -> B,
    {
        match self.inner {
            RowIterInner::Range(rows) => rows.fold(init, f),
            RowIterInner::BitVector(rows) => rows.fold(init, f),
            RowIterInner::IndexVector(rows) => rows.fold(init, f),
        }
    }
}
