use super::{
    index_search_through, ordered_index_search_through, search_through, utils, DataChain,
    FilterOp, Indices, Overlay, OverlayMapping, RangeOrBitVector, SearchValidationResult,
    SingleSearchResult, SortDirection, SortToken, Value,
};
use crate::{
    containers::{BitVector, Range},
    observability::{log_trace, log_warn},
    serdes::StorageDescriptor,
};

/// Batch-to-selector size ratio below which set positions are located one
/// select at a time rather than by walking the whole selector.
pub const DEFAULT_SELECT_RATIO: u32 = 32;

/// Keeps a subset of the inner rows, in order.
///
/// Table row `t` is the `t`th set bit of `selector`, so the table has
/// `selector.count_set_bits()` rows.
#[derive(Debug, Clone)]
pub struct SelectorOverlay {
    selector: BitVector,
    select_ratio: u32,
}

impl SelectorOverlay {
    pub fn new(selector: BitVector) -> Self {
        Self {
            selector,
            select_ratio: DEFAULT_SELECT_RATIO,
        }
    }

    /// Tunes when batch translation materializes every set position.
    pub fn with_select_ratio(self, select_ratio: u32) -> Self {
        if select_ratio == 0 {
            log_warn!(component = "selector_overlay", event = "select_ratio_clamped", select_ratio);
        }
        Self {
            select_ratio: select_ratio.max(1),
            ..self
        }
    }

    pub fn selector(&self) -> &BitVector {
        &self.selector
    }
}

impl Overlay for SelectorOverlay {
    fn make_chain<'a>(&'a self, inner: Box<dyn DataChain + 'a>) -> Box<dyn DataChain + 'a> {
        assert!(
            self.selector.len() <= inner.size(),
            "selector covers {} rows but inner size is {}",
            self.selector.len(),
            inner.size()
        );
        Box::new(SelectorChain {
            selector: &self.selector,
            select_ratio: self.select_ratio,
            inner,
        })
    }
}

#[derive(Debug)]
struct SelectorChain<'a> {
    selector: &'a BitVector,
    select_ratio: u32,
    inner: Box<dyn DataChain + 'a>,
}

impl SelectorChain<'_> {
    fn storage_index(&self, index: u32) -> u32 {
        self.selector.index_of_nth_set(index)
    }

    /// Whether translating `batch` rows is cheaper with one select per row.
    fn prefers_select(&self, batch: u32) -> bool {
        u64::from(batch) * u64::from(self.select_ratio) < u64::from(self.selector.len())
    }

    /// Storage positions of table rows `[range.start, range.end)`.
    fn storage_positions(&self, range: Range) -> Vec<u32> {
        if self.prefers_select(range.size()) {
            return (range.start..range.end).map(|t| self.storage_index(t)).collect();
        }
        self.selector
            .iter_set_bits()
            .skip(range.start as usize)
            .take(range.size() as usize)
            .collect()
    }
}

impl OverlayMapping for SelectorChain<'_> {
    fn map_to_storage_range(&self, range: Range) -> Range {
        if range.is_empty() {
            return Range::default();
        }
        Range::new(self.storage_index(range.start), self.storage_index(range.end - 1) + 1)
    }

    fn reconcile(
        &self,
        _: FilterOp,
        storage_result: RangeOrBitVector,
        table_range: Range,
    ) -> RangeOrBitVector {
        match storage_result {
            RangeOrBitVector::Range(r) => {
                let start = self.selector.count_set_bits_until(r.start);
                let end = self.selector.count_set_bits_until(r.end);
                utils::clamp_range(start, end, table_range).into()
            }
            RangeOrBitVector::BitVector(bv) => {
                let positions = self.storage_positions(table_range);
                let start = table_range.start;
                utils::linear_search(table_range, |t| {
                    let position = positions[(t - start) as usize];
                    position < bv.len() && bv.is_set(position)
                })
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
        if self.prefers_select(indices.len() as u32) {
            return indices.iter().map(|i| self.storage_index(*i)).collect();
        }
        let positions = self.selector.set_bit_indices();
        indices.iter().map(|i| positions[*i as usize]).collect()
    }
}

impl DataChain for SelectorChain<'_> {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        self.inner.single_search(op, value, self.storage_index(index))
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        self.inner.validate_search_constraints(op, value)
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(component = "selector_overlay", event = "search", op = %op, start = range.start, end = range.end);
        search_through(self, &*self.inner, op, value, range)
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(component = "selector_overlay", event = "index_search", op = %op, len = indices.len());
        index_search_through(self, &*self.inner, op, value, indices)
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        ordered_index_search_through(self, &*self.inner, op, value, indices)
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        for token in tokens.iter_mut() {
            token.index = self.storage_index(token.index);
        }
        self.inner.stable_sort(tokens, direction);
    }

    fn size(&self) -> u32 {
        self.selector.count_set_bits()
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::Selector {
            selector: self.selector,
            inner: Box::new(self.inner.serialize()),
        }
    }

    fn as_overlay(&self) -> Option<(&dyn OverlayMapping, &dyn DataChain)> {
        Some((self, &*self.inner))
    }
}
