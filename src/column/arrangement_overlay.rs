use super::{
    index_search_through, ordered_index_search_through, search_through, utils, DataChain,
    FilterOp, Indices, IndicesState, Overlay, OverlayMapping, RangeOrBitVector,
    SearchValidationResult, SingleSearchResult, SortDirection, SortToken, Value,
};
use crate::{
    containers::{BitVector, Range},
    observability::log_trace,
    serdes::StorageDescriptor,
};

/// Reorders and/or duplicates the rows of the inner chain: table row `i`
/// reads storage row `arrangement[i]`.
#[derive(Debug, Clone)]
pub struct ArrangementOverlay {
    arrangement: Vec<u32>,
    is_sorted: bool,
}

impl ArrangementOverlay {
    pub fn new(arrangement: Vec<u32>) -> Self {
        let is_sorted = arrangement.windows(2).all(|w| w[0] <= w[1]);
        Self {
            arrangement,
            is_sorted,
        }
    }

    pub fn arrangement(&self) -> &[u32] {
        &self.arrangement
    }

    /// Whether the arrangement is non-decreasing.
    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }
}

impl Overlay for ArrangementOverlay {
    fn make_chain<'a>(&'a self, inner: Box<dyn DataChain + 'a>) -> Box<dyn DataChain + 'a> {
        if let Some(max) = self.arrangement.iter().max() {
            assert!(
                *max < inner.size(),
                "arrangement references storage row {max} but inner size is {}",
                inner.size()
            );
        }
        Box::new(ArrangementChain {
            arrangement: &self.arrangement,
            is_sorted: self.is_sorted,
            inner,
        })
    }
}

#[derive(Debug)]
struct ArrangementChain<'a> {
    arrangement: &'a [u32],
    is_sorted: bool,
    inner: Box<dyn DataChain + 'a>,
}

impl OverlayMapping for ArrangementChain<'_> {
    fn map_to_storage_range(&self, range: Range) -> Range {
        let slice = &self.arrangement[range.start as usize..range.end as usize];
        if self.is_sorted {
            return match (slice.first(), slice.last()) {
                (Some(first), Some(last)) => Range::new(*first, last + 1),
                _ => Range::default(),
            };
        }
        let min = slice.iter().min();
        let max = slice.iter().max();
        match (min, max) {
            (Some(min), Some(max)) => Range::new(*min, max + 1),
            _ => Range::default(),
        }
    }

    fn reconcile(
        &self,
        _: FilterOp,
        storage_result: RangeOrBitVector,
        table_range: Range,
    ) -> RangeOrBitVector {
        let arrangement = self.arrangement;
        if self.is_sorted {
            if let RangeOrBitVector::Range(r) = &storage_result {
                let slice = &arrangement[table_range.start as usize..table_range.end as usize];
                let start = table_range.start + slice.partition_point(|s| *s < r.start) as u32;
                let end = table_range.start + slice.partition_point(|s| *s < r.end) as u32;
                return Range::new(start, end.max(start)).into();
            }
        }
        utils::linear_search(table_range, |t| storage_result.contains(arrangement[t as usize])).into()
    }

    fn is_storage_lookup_required(&self, _: FilterOp, indices: &[u32]) -> BitVector {
        BitVector::with_len(indices.len() as u32, true)
    }

    fn resolve_without_lookup(&self, _: FilterOp, indices: &[u32]) -> BitVector {
        BitVector::with_len(indices.len() as u32, false)
    }

    fn map_to_storage_indices(&self, indices: &[u32]) -> Vec<u32> {
        indices.iter().map(|i| self.arrangement[*i as usize]).collect()
    }

    fn storage_indices_state(&self, state: IndicesState) -> IndicesState {
        if self.is_sorted {
            state
        } else {
            IndicesState::Nonmonotonic
        }
    }
}

impl DataChain for ArrangementChain<'_> {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        self.inner.single_search(op, value, self.arrangement[index as usize])
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        self.inner.validate_search_constraints(op, value)
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(
            component = "arrangement_overlay",
            event = "search",
            op = %op,
            sorted = self.is_sorted,
            start = range.start,
            end = range.end,
        );
        search_through(self, &*self.inner, op, value, range)
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(
            component = "arrangement_overlay",
            event = "index_search",
            op = %op,
            len = indices.len(),
            state = ?indices.state,
        );
        index_search_through(self, &*self.inner, op, value, indices)
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        ordered_index_search_through(self, &*self.inner, op, value, indices)
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        for token in tokens.iter_mut() {
            token.index = self.arrangement[token.index as usize];
        }
        self.inner.stable_sort(tokens, direction);
    }

    fn size(&self) -> u32 {
        self.arrangement.len() as u32
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::Arrangement {
            arrangement: self.arrangement,
            inner: Box::new(self.inner.serialize()),
        }
    }

    fn as_overlay(&self) -> Option<(&dyn OverlayMapping, &dyn DataChain)> {
        Some((self, &*self.inner))
    }
}
