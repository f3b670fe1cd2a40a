//! Scripted storage for exercising overlays in isolation.

use super::{
    utils, DataChain, FilterOp, Indices, RangeOrBitVector, SearchValidationResult,
    SingleSearchResult, SortDirection, SortToken, Storage, Value,
};
use crate::{
    containers::{BitVector, Range},
    serdes::StorageDescriptor,
};

/// Which storage rows every search reports as matching, regardless of the
/// operator and value.
#[derive(Debug, Clone)]
pub(crate) enum FakeMatches {
    All,
    None,
    Range(Range),
    BitVector(BitVector),
}

#[derive(Debug, Clone)]
pub(crate) struct FakeStorage {
    size: u32,
    matches: FakeMatches,
}

impl FakeStorage {
    pub(crate) fn search_all(size: u32) -> Self {
        Self {
            size,
            matches: FakeMatches::All,
        }
    }

    pub(crate) fn search_none(size: u32) -> Self {
        Self {
            size,
            matches: FakeMatches::None,
        }
    }

    pub(crate) fn search_subset(size: u32, range: Range) -> Self {
        Self {
            size,
            matches: FakeMatches::Range(range),
        }
    }

    pub(crate) fn search_bits(bits: BitVector) -> Self {
        Self {
            size: bits.len(),
            matches: FakeMatches::BitVector(bits),
        }
    }

    /// Matches exactly `rows` out of `size`.
    pub(crate) fn search_rows(size: u32, rows: &[u32]) -> Self {
        Self::search_bits(BitVector::from_indices(size, rows.iter().copied()))
    }
}

impl Storage for FakeStorage {
    fn make_chain(&self) -> Box<dyn DataChain + '_> {
        Box::new(FakeChain { storage: self })
    }
}

#[derive(Debug)]
struct FakeChain<'a> {
    storage: &'a FakeStorage,
}

impl FakeChain<'_> {
    fn contains(&self, index: u32) -> bool {
        match &self.storage.matches {
            FakeMatches::All => true,
            FakeMatches::None => false,
            FakeMatches::Range(range) => range.contains(index),
            FakeMatches::BitVector(bv) => bv.is_set(index),
        }
    }
}

impl DataChain for FakeChain<'_> {
    fn single_search(&self, _: FilterOp, _: &Value, index: u32) -> SingleSearchResult {
        if self.contains(index) {
            SingleSearchResult::Match
        } else {
            SingleSearchResult::NoMatch
        }
    }

    fn validate_search_constraints(&self, _: FilterOp, _: &Value) -> SearchValidationResult {
        SearchValidationResult::Ok
    }

    fn search_validated(&self, _: FilterOp, _: &Value, range: Range) -> RangeOrBitVector {
        match &self.storage.matches {
            FakeMatches::All => range.into(),
            FakeMatches::None => RangeOrBitVector::empty(),
            FakeMatches::Range(matching) => {
                utils::clamp_range(matching.start, matching.end, range).into()
            }
            FakeMatches::BitVector(bv) => {
                let mut window = bv.intersect_range(range.start, range.end);
                window.resize(range.end, false);
                window.into()
            }
        }
    }

    fn index_search_validated(&self, _: FilterOp, _: &Value, indices: Indices<'_>) -> RangeOrBitVector {
        match &self.storage.matches {
            FakeMatches::All => Range::new(0, indices.len()).into(),
            FakeMatches::None => RangeOrBitVector::empty(),
            FakeMatches::Range(_) | FakeMatches::BitVector(_) => {
                utils::index_search(indices.data, |i| self.contains(i)).into()
            }
        }
    }

    fn ordered_index_search_validated(&self, _: FilterOp, _: &Value, indices: Indices<'_>) -> Range {
        let first = indices.data.iter().position(|i| self.contains(*i));
        let last = indices.data.iter().rposition(|i| self.contains(*i));
        match (first, last) {
            (Some(first), Some(last)) => Range::new(first as u32, last as u32 + 1),
            _ => Range::default(),
        }
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        utils::sort_tokens(tokens, direction, |a, b| a.cmp(&b));
    }

    fn size(&self) -> u32 {
        self.storage.size
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::Dummy
    }
}
