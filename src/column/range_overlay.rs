use super::{
    index_search_through, ordered_index_search_through, search_through, DataChain, FilterOp,
    Indices, Overlay, OverlayMapping, RangeOrBitVector, SearchValidationResult,
    SingleSearchResult, SortDirection, SortToken, Value,
};
use crate::{
    containers::{BitVector, Range},
    observability::log_trace,
    serdes::StorageDescriptor,
};

/// Exposes the contiguous storage window `range` as rows `[0, range.size())`.
#[derive(Debug, Clone, Copy)]
pub struct RangeOverlay {
    range: Range,
}

impl RangeOverlay {
    pub fn new(range: Range) -> Self {
        Self { range }
    }

    pub fn range(&self) -> Range {
        self.range
    }
}

impl Overlay for RangeOverlay {
    fn make_chain<'a>(&'a self, inner: Box<dyn DataChain + 'a>) -> Box<dyn DataChain + 'a> {
        assert!(
            self.range.end <= inner.size(),
            "range overlay {:?} exceeds inner size {}",
            self.range,
            inner.size()
        );
        Box::new(RangeChain {
            range: self.range,
            inner,
        })
    }
}

#[derive(Debug)]
struct RangeChain<'a> {
    range: Range,
    inner: Box<dyn DataChain + 'a>,
}

impl RangeChain<'_> {
    fn offset(&self) -> u32 {
        self.range.start
    }
}

impl OverlayMapping for RangeChain<'_> {
    fn map_to_storage_range(&self, range: Range) -> Range {
        Range::new(range.start + self.offset(), range.end + self.offset())
    }

    fn reconcile(
        &self,
        _: FilterOp,
        storage_result: RangeOrBitVector,
        table_range: Range,
    ) -> RangeOrBitVector {
        let offset = self.offset();
        match storage_result {
            RangeOrBitVector::Range(r) if r.is_empty() => RangeOrBitVector::empty(),
            RangeOrBitVector::Range(r) => Range::new(r.start - offset, r.end - offset).into(),
            RangeOrBitVector::BitVector(bv) => {
                BitVector::from_indices(table_range.end, bv.iter_set_bits().map(|i| i - offset))
                    .into()
            }
        }
    }

    fn is_storage_lookup_required(&self, _: FilterOp, indices: &[u32]) -> BitVector {
        BitVector::with_len(indices.len() as u32, true)
    }

    fn resolve_without_lookup(&self, _: FilterOp, indices: &[u32]) -> BitVector {
        BitVector::with_len(indices.len() as u32, false)
    }

    fn map_to_storage_indices(&self, indices: &[u32]) -> Vec<u32> {
        indices.iter().map(|i| i + self.offset()).collect()
    }
}

impl DataChain for RangeChain<'_> {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        self.inner.single_search(op, value, index + self.offset())
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        self.inner.validate_search_constraints(op, value)
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(component = "range_overlay", event = "search", op = %op, start = range.start, end = range.end);
        search_through(self, &*self.inner, op, value, range)
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(component = "range_overlay", event = "index_search", op = %op, len = indices.len());
        index_search_through(self, &*self.inner, op, value, indices)
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        ordered_index_search_through(self, &*self.inner, op, value, indices)
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        for token in tokens.iter_mut() {
            token.index += self.offset();
        }
        self.inner.stable_sort(tokens, direction);
    }

    fn size(&self) -> u32 {
        self.range.size()
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::Range {
            range: self.range,
            inner: Box::new(self.inner.serialize()),
        }
    }

    fn as_overlay(&self) -> Option<(&dyn OverlayMapping, &dyn DataChain)> {
        Some((self, &*self.inner))
    }
}
