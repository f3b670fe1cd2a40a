use super::{
    null_overlay::{
        index_validation_shortcut, non_nulls_in, nulls_in, sort_nulls_first, validate_nullable,
        validation_shortcut,
    },
    DataChain, FilterOp, Indices, Overlay, OverlayMapping, RangeOrBitVector,
    SearchValidationResult, SingleSearchResult, SortDirection, SortToken, Value,
};
use crate::{
    containers::{BitVector, Range},
    observability::log_trace,
    serdes::StorageDescriptor,
};

/// Adds nulls to a column that keeps a (meaningless) slot for every null row.
///
/// Table row `i` is storage row `i`; bit `i` of `non_null` says whether the
/// slot holds a value.
#[derive(Debug, Clone)]
pub struct DenseNullOverlay {
    non_null: BitVector,
}

impl DenseNullOverlay {
    pub fn new(non_null: BitVector) -> Self {
        Self { non_null }
    }

    pub fn non_null(&self) -> &BitVector {
        &self.non_null
    }
}

impl Overlay for DenseNullOverlay {
    fn make_chain<'a>(&'a self, inner: Box<dyn DataChain + 'a>) -> Box<dyn DataChain + 'a> {
        assert!(
            self.non_null.len() <= inner.size(),
            "dense null overlay covers {} rows but inner size is {}",
            self.non_null.len(),
            inner.size()
        );
        Box::new(DenseNullChain {
            non_null: &self.non_null,
            inner,
        })
    }
}

#[derive(Debug)]
struct DenseNullChain<'a> {
    non_null: &'a BitVector,
    inner: Box<dyn DataChain + 'a>,
}

impl OverlayMapping for DenseNullChain<'_> {
    fn map_to_storage_range(&self, range: Range) -> Range {
        range
    }

    fn reconcile(
        &self,
        op: FilterOp,
        storage_result: RangeOrBitVector,
        table_range: Range,
    ) -> RangeOrBitVector {
        let mut res = storage_result.into_bit_vector(table_range.end);
        res.and(&non_nulls_in(self.non_null, table_range));
        if op == FilterOp::IsNull {
            res.or(&nulls_in(self.non_null, table_range));
        }
        res.into()
    }

    fn is_storage_lookup_required(&self, _: FilterOp, indices: &[u32]) -> BitVector {
        indices.iter().map(|i| self.non_null.is_set(*i)).collect()
    }

    fn resolve_without_lookup(&self, op: FilterOp, indices: &[u32]) -> BitVector {
        BitVector::with_len(indices.len() as u32, op == FilterOp::IsNull)
    }

    fn map_to_storage_indices(&self, indices: &[u32]) -> Vec<u32> {
        indices.to_vec()
    }
}

impl DataChain for DenseNullChain<'_> {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        if !self.non_null.is_set(index) {
            return if op == FilterOp::IsNull {
                SingleSearchResult::Match
            } else {
                SingleSearchResult::NoMatch
            };
        }
        self.inner.single_search(op, value, index)
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        validate_nullable(op, value, &*self.inner)
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(component = "dense_null_overlay", event = "search", op = %op, start = range.start, end = range.end);
        let inner = self.inner.validate_search_constraints(op, value);
        if let Some(res) = validation_shortcut(op, inner, self.non_null, range) {
            return res;
        }
        let storage_result = if range.is_empty() {
            RangeOrBitVector::empty()
        } else {
            self.inner.search_validated(op, value, range)
        };
        self.reconcile(op, storage_result, range)
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(component = "dense_null_overlay", event = "index_search", op = %op, len = indices.len());
        let inner = self.inner.validate_search_constraints(op, value);
        if let Some(res) = index_validation_shortcut(op, inner, self.non_null, indices.data) {
            return res;
        }
        let mask = self.is_storage_lookup_required(op, indices.data);
        let mut res = if indices.is_empty() {
            BitVector::new()
        } else {
            self.inner
                .index_search_validated(op, value, indices)
                .into_bit_vector(indices.len())
        };
        res.and(&mask);
        if op == FilterOp::IsNull {
            let mut nulls = mask;
            nulls.not();
            res.or(&nulls);
        }
        res.into()
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        let non_null = indices.data.partition_point(|i| !self.non_null.is_set(*i));
        let inner = self.inner.ordered_index_search(
            op,
            value,
            Indices::new(&indices.data[non_null..], indices.state),
        );
        let non_null = non_null as u32;
        if op == FilterOp::IsNull {
            return Range::new(0, non_null + inner.end);
        }
        Range::new(non_null + inner.start, non_null + inner.end)
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        sort_nulls_first(self.non_null, tokens, direction, |non_null| {
            self.inner.stable_sort(non_null, direction);
        });
    }

    fn size(&self) -> u32 {
        self.non_null.len()
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::DenseNull {
            non_null: self.non_null,
            inner: Box::new(self.inner.serialize()),
        }
    }

    fn as_overlay(&self) -> Option<(&dyn OverlayMapping, &dyn DataChain)> {
        Some((self, &*self.inner))
    }
}
