//! Layered column evaluation.
//!
//! A logical column is a leaf storage (ids, numbers, strings, set ids)
//! wrapped by zero or more overlays that remap row positions or inject
//! nullability. Positions seen by the outermost layer are *table space*,
//! positions seen by the leaf are *storage space*.
//!
//! Storages and overlays own their data. Per query they are realized into a
//! [`DataChain`]: a transient tree of evaluators that borrows that data and is
//! queried through one polymorphic interface.

mod arrangement_overlay;
mod chain;
mod dense_null_overlay;
mod dummy_storage;
#[cfg(test)]
pub(crate) mod fake_storage;
mod glob;
mod id_storage;
mod null_overlay;
mod numeric_storage;
mod range_overlay;
mod selector_overlay;
mod set_id_storage;
mod string_storage;
pub(crate) mod utils;

use std::fmt;

pub use arrangement_overlay::ArrangementOverlay;
pub use chain::build_chain;
pub use dense_null_overlay::DenseNullOverlay;
pub use dummy_storage::DummyStorage;
pub use glob::GlobMatcher;
pub use id_storage::IdStorage;
pub use null_overlay::NullOverlay;
pub use numeric_storage::{NumericStorage, NumericValue};
pub use range_overlay::RangeOverlay;
pub use selector_overlay::{SelectorOverlay, DEFAULT_SELECT_RATIO};
pub use set_id_storage::SetIdStorage;
pub use strata_predicate::{FilterOp, Value};
pub use string_storage::StringStorage;

use crate::{
    containers::{BitVector, Range},
    serdes::StorageDescriptor,
};

/// Outcome of checking whether a search needs to touch any data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchValidationResult {
    /// The search must run.
    Ok,
    /// Every row matches.
    AllData,
    /// No row matches.
    NoData,
}

/// Outcome of evaluating a predicate against a single row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SingleSearchResult {
    Match,
    NoMatch,
    /// The cheap path could not decide; run a normal search.
    NeedsFullSearch,
}

/// Physical element type of a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnType {
    Id,
    Uint32,
    Int32,
    Int64,
    Double,
    String,
    Dummy,
}

impl ColumnType {
    pub(crate) fn tag(self) -> u8 {
        match self {
            ColumnType::Id => 0,
            ColumnType::Uint32 => 1,
            ColumnType::Int32 => 2,
            ColumnType::Int64 => 3,
            ColumnType::Double => 4,
            ColumnType::String => 5,
            ColumnType::Dummy => 6,
        }
    }
}

/// Result of a search: positions are either one contiguous run or a bit
/// vector.
///
/// For [`DataChain::search`] over `[start, end)` a bit vector has length
/// `end` with bits only inside the window. For [`DataChain::index_search`]
/// positions refer to offsets into the index list and a bit vector has the
/// list's length.
#[derive(Clone, Debug, PartialEq)]
pub enum RangeOrBitVector {
    Range(Range),
    BitVector(BitVector),
}

impl RangeOrBitVector {
    pub fn empty() -> Self {
        RangeOrBitVector::Range(Range::default())
    }

    pub fn is_range(&self) -> bool {
        matches!(self, RangeOrBitVector::Range(_))
    }

    pub fn is_bit_vector(&self) -> bool {
        matches!(self, RangeOrBitVector::BitVector(_))
    }

    /// # Panics
    ///
    /// Panics if this is a bit vector.
    pub fn take_if_range(self) -> Range {
        match self {
            RangeOrBitVector::Range(range) => range,
            RangeOrBitVector::BitVector(_) => panic!("expected a range, found a bit vector"),
        }
    }

    /// # Panics
    ///
    /// Panics if this is a range.
    pub fn take_if_bit_vector(self) -> BitVector {
        match self {
            RangeOrBitVector::BitVector(bv) => bv,
            RangeOrBitVector::Range(_) => panic!("expected a bit vector, found a range"),
        }
    }

    /// Whether `position` is part of the result.
    pub fn contains(&self, position: u32) -> bool {
        match self {
            RangeOrBitVector::Range(range) => range.contains(position),
            RangeOrBitVector::BitVector(bv) => position < bv.len() && bv.is_set(position),
        }
    }

    /// Materializes the result as a bit vector of exactly `len` bits.
    pub fn into_bit_vector(self, len: u32) -> BitVector {
        match self {
            RangeOrBitVector::Range(range) => {
                let end = range.end.min(len);
                let start = range.start.min(end);
                let mut bv = BitVector::with_len(start, false);
                bv.resize(end, true);
                bv.resize(len, false);
                bv
            }
            RangeOrBitVector::BitVector(mut bv) => {
                bv.resize(len, false);
                bv
            }
        }
    }

    /// Number of matching positions.
    pub fn count(&self) -> u32 {
        match self {
            RangeOrBitVector::Range(range) => range.size(),
            RangeOrBitVector::BitVector(bv) => bv.count_set_bits(),
        }
    }
}

impl From<Range> for RangeOrBitVector {
    fn from(range: Range) -> Self {
        RangeOrBitVector::Range(range)
    }
}

impl From<BitVector> for RangeOrBitVector {
    fn from(bv: BitVector) -> Self {
        RangeOrBitVector::BitVector(bv)
    }
}

/// Ordering knowledge about an index list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IndicesState {
    /// Indices are non-decreasing.
    Monotonic,
    /// No ordering can be assumed.
    Nonmonotonic,
}

/// Borrowed list of positions handed to [`DataChain::index_search`].
#[derive(Clone, Copy, Debug)]
pub struct Indices<'a> {
    pub data: &'a [u32],
    pub state: IndicesState,
}

impl<'a> Indices<'a> {
    pub fn new(data: &'a [u32], state: IndicesState) -> Self {
        Self { data, state }
    }

    /// Inspects `data` to pick the state.
    pub fn detect(data: &'a [u32]) -> Self {
        let state = if data.windows(2).all(|w| w[0] <= w[1]) {
            IndicesState::Monotonic
        } else {
            IndicesState::Nonmonotonic
        };
        Self { data, state }
    }

    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Row position carried through a sort together with caller data.
///
/// Chains rewrite `index` in place while translating into storage space, so
/// callers keep whatever they need to recover in `payload`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SortToken {
    pub index: u32,
    pub payload: u32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

/// Evaluation interface shared by every node of a realized chain.
///
/// `search*` methods with the `_validated` suffix may only be called after
/// [`validate_search_constraints`](Self::validate_search_constraints)
/// returned [`SearchValidationResult::Ok`] for the same operator and value;
/// the unsuffixed methods run that check themselves.
pub trait DataChain: fmt::Debug {
    /// Evaluates `op` against the row at `index` without a full scan, when
    /// possible.
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult;

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult;

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector;

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector;

    /// Searches indices whose values are already sorted ascending, nulls
    /// first, returning the matching run of positions in `indices`.
    ///
    /// Not defined for [`FilterOp::Ne`], [`FilterOp::Glob`] and
    /// [`FilterOp::Regex`].
    fn ordered_index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> Range;

    /// Stable sort of `tokens` by the value at each token's index.
    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection);

    /// Number of table-space rows.
    fn size(&self) -> u32;

    fn serialize(&self) -> StorageDescriptor<'_>;

    /// For overlays, the index translation and the wrapped chain.
    fn as_overlay(&self) -> Option<(&dyn OverlayMapping, &dyn DataChain)> {
        None
    }

    fn search(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        debug_assert!(range.end <= self.size(), "{range:?} exceeds chain size {}", self.size());
        match self.validate_search_constraints(op, value) {
            SearchValidationResult::AllData => RangeOrBitVector::Range(range),
            SearchValidationResult::NoData => RangeOrBitVector::empty(),
            SearchValidationResult::Ok => self.search_validated(op, value, range),
        }
    }

    fn index_search(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> RangeOrBitVector {
        match self.validate_search_constraints(op, value) {
            SearchValidationResult::AllData => Range::new(0, indices.len()).into(),
            SearchValidationResult::NoData => RangeOrBitVector::empty(),
            SearchValidationResult::Ok => self.index_search_validated(op, value, indices),
        }
    }

    fn ordered_index_search(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        match self.validate_search_constraints(op, value) {
            SearchValidationResult::AllData => Range::new(0, indices.len()),
            SearchValidationResult::NoData => Range::default(),
            SearchValidationResult::Ok => self.ordered_index_search_validated(op, value, indices),
        }
    }

    /// Sorts `tokens`; the relative order of equal keys is unspecified.
    fn sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        self.stable_sort(tokens, direction);
    }
}

/// Index translation exposed by overlays.
///
/// The executor's index search strategy walks a chain layer by layer through
/// this interface, resolving rows an overlay can answer on its own and
/// translating the rest into the next layer's space.
pub trait OverlayMapping {
    /// Smallest storage window covering table-space `range`.
    fn map_to_storage_range(&self, range: Range) -> Range;

    /// Translates a storage-space result over
    /// [`map_to_storage_range`](Self::map_to_storage_range)`(table_range)`
    /// back into table space.
    fn reconcile(
        &self,
        op: FilterOp,
        storage_result: RangeOrBitVector,
        table_range: Range,
    ) -> RangeOrBitVector;

    /// Bit `i` is set when `indices[i]` must be answered by the inner chain.
    fn is_storage_lookup_required(&self, op: FilterOp, indices: &[u32]) -> BitVector;

    /// Answers `op` for indices that need no inner lookup.
    fn resolve_without_lookup(&self, op: FilterOp, indices: &[u32]) -> BitVector;

    /// Translates table-space indices into the inner chain's space.
    fn map_to_storage_indices(&self, indices: &[u32]) -> Vec<u32>;

    /// Ordering of translated indices, given the ordering of the input.
    fn storage_indices_state(&self, state: IndicesState) -> IndicesState {
        state
    }
}

/// A leaf data source.
pub trait Storage: fmt::Debug {
    fn make_chain(&self) -> Box<dyn DataChain + '_>;
}

/// A layer wrapping another chain.
pub trait Overlay: fmt::Debug {
    /// Wraps `inner`.
    ///
    /// # Panics
    ///
    /// Panics when the overlay's control data addresses storage positions
    /// beyond `inner.size()`.
    fn make_chain<'a>(&'a self, inner: Box<dyn DataChain + 'a>) -> Box<dyn DataChain + 'a>;
}

/// Shared search path for overlays that only remap positions: map the
/// window down, search the inner chain and reconcile the result back up.
pub(crate) fn search_through(
    mapping: &dyn OverlayMapping,
    inner: &dyn DataChain,
    op: FilterOp,
    value: &Value,
    range: Range,
) -> RangeOrBitVector {
    if range.is_empty() {
        return RangeOrBitVector::empty();
    }
    let storage_range = mapping.map_to_storage_range(range);
    let storage_result = inner.search_validated(op, value, storage_range);
    mapping.reconcile(op, storage_result, range)
}

/// Shared index search path for overlays mapping each table row to exactly
/// one storage row. Results are position-aligned, so no reconcile is needed.
pub(crate) fn index_search_through(
    mapping: &dyn OverlayMapping,
    inner: &dyn DataChain,
    op: FilterOp,
    value: &Value,
    indices: Indices<'_>,
) -> RangeOrBitVector {
    let storage = mapping.map_to_storage_indices(indices.data);
    let state = mapping.storage_indices_state(indices.state);
    inner.index_search_validated(op, value, Indices::new(&storage, state))
}

pub(crate) fn ordered_index_search_through(
    mapping: &dyn OverlayMapping,
    inner: &dyn DataChain,
    op: FilterOp,
    value: &Value,
    indices: Indices<'_>,
) -> Range {
    let storage = mapping.map_to_storage_indices(indices.data);
    inner.ordered_index_search_validated(op, value, Indices::new(&storage, indices.state))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_or_bit_vector_materializes() {
        let bv = RangeOrBitVector::from(Range::new(2, 4)).into_bit_vector(6);
        assert_eq!(bv.len(), 6);
        assert_eq!(bv.set_bit_indices(), vec![2, 3]);

        let empty = RangeOrBitVector::empty().into_bit_vector(3);
        assert_eq!(empty.count_set_bits(), 0);
        assert_eq!(empty.len(), 3);
    }

    #[test]
    #[should_panic(expected = "expected a range")]
    fn take_wrong_arm_panics() {
        RangeOrBitVector::from(BitVector::with_len(2, true)).take_if_range();
    }

    #[test]
    fn indices_detect_state() {
        assert_eq!(Indices::detect(&[1, 1, 4]).state, IndicesState::Monotonic);
        assert_eq!(Indices::detect(&[3, 1]).state, IndicesState::Nonmonotonic);
        assert_eq!(Indices::detect(&[]).state, IndicesState::Monotonic);
    }
}
