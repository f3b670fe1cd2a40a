use super::{
    DataChain, FilterOp, Indices, Overlay, OverlayMapping, RangeOrBitVector,
    SearchValidationResult, SingleSearchResult, SortDirection, SortToken, Value,
};
use crate::{
    containers::{BitVector, Range},
    observability::log_trace,
    serdes::StorageDescriptor,
};

/// Adds nulls to a column by storing only its non-null values.
///
/// Bit `i` of `non_null` marks table row `i` as holding a value; the `k`th
/// set bit corresponds to storage row `k`. Table rows therefore translate to
/// storage rows by rank and back by select.
#[derive(Debug, Clone)]
pub struct NullOverlay {
    non_null: BitVector,
}

impl NullOverlay {
    pub fn new(non_null: BitVector) -> Self {
        Self { non_null }
    }

    pub fn non_null(&self) -> &BitVector {
        &self.non_null
    }
}

impl Overlay for NullOverlay {
    fn make_chain<'a>(&'a self, inner: Box<dyn DataChain + 'a>) -> Box<dyn DataChain + 'a> {
        assert!(
            self.non_null.count_set_bits() <= inner.size(),
            "null overlay has {} non-null rows but inner size is {}",
            self.non_null.count_set_bits(),
            inner.size()
        );
        Box::new(NullChain {
            non_null: &self.non_null,
            inner,
        })
    }
}

/// Null rows of `non_null` inside `range`, as a bit vector of length
/// `range.end`.
pub(super) fn nulls_in(non_null: &BitVector, range: Range) -> BitVector {
    let mut nulls = non_null.clone();
    nulls.resize(range.end, false);
    nulls.not();
    let mut out = nulls.intersect_range(range.start, range.end);
    out.resize(range.end, false);
    out
}

/// Non-null rows of `non_null` inside `range`, as a bit vector of length
/// `range.end`.
pub(super) fn non_nulls_in(non_null: &BitVector, range: Range) -> BitVector {
    let mut out = non_null.intersect_range(range.start, range.end);
    out.resize(range.end, false);
    out
}

/// Answers a search over `range` from the inner chain's validation alone,
/// or `None` when the inner chain must run. Null rows only ever satisfy
/// `IS NULL`.
pub(super) fn validation_shortcut(
    op: FilterOp,
    inner: SearchValidationResult,
    non_null: &BitVector,
    range: Range,
) -> Option<RangeOrBitVector> {
    match (op, inner) {
        (_, SearchValidationResult::Ok) => None,
        (FilterOp::IsNull, SearchValidationResult::NoData) => Some(nulls_in(non_null, range).into()),
        (FilterOp::IsNull, SearchValidationResult::AllData) => Some(range.into()),
        (_, SearchValidationResult::NoData) => Some(RangeOrBitVector::empty()),
        (_, SearchValidationResult::AllData) => Some(non_nulls_in(non_null, range).into()),
    }
}

/// Index-list flavour of [`validation_shortcut`]: bit `p` refers to
/// `indices[p]`.
pub(super) fn index_validation_shortcut(
    op: FilterOp,
    inner: SearchValidationResult,
    non_null: &BitVector,
    indices: &[u32],
) -> Option<RangeOrBitVector> {
    match (op, inner) {
        (_, SearchValidationResult::Ok) => None,
        (FilterOp::IsNull, SearchValidationResult::NoData) => Some(
            indices
                .iter()
                .map(|i| !non_null.is_set(*i))
                .collect::<BitVector>()
                .into(),
        ),
        (FilterOp::IsNull, SearchValidationResult::AllData) => {
            Some(Range::new(0, indices.len() as u32).into())
        }
        (_, SearchValidationResult::NoData) => Some(RangeOrBitVector::empty()),
        (_, SearchValidationResult::AllData) => Some(
            indices
                .iter()
                .map(|i| non_null.is_set(*i))
                .collect::<BitVector>()
                .into(),
        ),
    }
}

/// Validation of a nullable layer: null checks always run, and a predicate
/// every value satisfies still has to skip the null rows.
pub(super) fn validate_nullable(
    op: FilterOp,
    value: &Value,
    inner: &dyn DataChain,
) -> SearchValidationResult {
    if op.is_null_check() {
        return SearchValidationResult::Ok;
    }
    match inner.validate_search_constraints(op, value) {
        SearchValidationResult::AllData => SearchValidationResult::Ok,
        other => other,
    }
}

/// Combines per-position inner matches with the position null mask.
///
/// `mask` marks the positions that reached the inner chain and
/// `storage_result` covers exactly those positions, in order.
fn spread_matches(op: FilterOp, mask: &BitVector, storage_result: RangeOrBitVector) -> BitVector {
    let mut res = mask.clone();
    res.update_set_bits(&storage_result.into_bit_vector(mask.count_set_bits()));
    if op == FilterOp::IsNull {
        let mut nulls = mask.clone();
        nulls.not();
        res.or(&nulls);
    }
    res
}

/// Partitions tokens into nulls and non-nulls, then orders non-nulls with
/// `sort_non_null`. Nulls sort first ascending and last descending.
pub(super) fn sort_nulls_first<F>(
    non_null: &BitVector,
    tokens: &mut [SortToken],
    direction: SortDirection,
    sort_non_null: F,
) where
    F: FnOnce(&mut [SortToken]),
{
    tokens.sort_by_key(|token| non_null.is_set(token.index));
    let null_count = tokens.partition_point(|token| !non_null.is_set(token.index));
    sort_non_null(&mut tokens[null_count..]);
    if direction == SortDirection::Descending {
        tokens.rotate_left(null_count);
    }
}

#[derive(Debug)]
struct NullChain<'a> {
    non_null: &'a BitVector,
    inner: Box<dyn DataChain + 'a>,
}

impl NullChain<'_> {
    fn storage_index(&self, index: u32) -> u32 {
        self.non_null.count_set_bits_until(index)
    }
}

impl OverlayMapping for NullChain<'_> {
    fn map_to_storage_range(&self, range: Range) -> Range {
        Range::new(self.storage_index(range.start), self.storage_index(range.end))
    }

    fn reconcile(
        &self,
        op: FilterOp,
        storage_result: RangeOrBitVector,
        table_range: Range,
    ) -> RangeOrBitVector {
        let mut res = match storage_result {
            RangeOrBitVector::Range(r) if r.is_empty() => BitVector::with_len(table_range.end, false),
            RangeOrBitVector::Range(r) => {
                let start = self.non_null.index_of_nth_set(r.start);
                let end = self.non_null.index_of_nth_set(r.end - 1) + 1;
                self.non_null.intersect_range(start, end)
            }
            RangeOrBitVector::BitVector(bv) => {
                let mut res = self.non_null.clone();
                let mut update = bv;
                update.resize(self.non_null.count_set_bits(), false);
                res.update_set_bits(&update);
                res
            }
        };
        res.resize(table_range.end, false);
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
        indices.iter().map(|i| self.storage_index(*i)).collect()
    }
}

impl DataChain for NullChain<'_> {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        if !self.non_null.is_set(index) {
            return if op == FilterOp::IsNull {
                SingleSearchResult::Match
            } else {
                SingleSearchResult::NoMatch
            };
        }
        self.inner.single_search(op, value, self.storage_index(index))
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        validate_nullable(op, value, &*self.inner)
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(component = "null_overlay", event = "search", op = %op, start = range.start, end = range.end);
        let inner = self.inner.validate_search_constraints(op, value);
        if let Some(res) = validation_shortcut(op, inner, self.non_null, range) {
            return res;
        }
        let storage_range = self.map_to_storage_range(range);
        let storage_result = if storage_range.is_empty() {
            RangeOrBitVector::empty()
        } else {
            self.inner.search_validated(op, value, storage_range)
        };
        self.reconcile(op, storage_result, range)
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(component = "null_overlay", event = "index_search", op = %op, len = indices.len());
        let inner = self.inner.validate_search_constraints(op, value);
        if let Some(res) = index_validation_shortcut(op, inner, self.non_null, indices.data) {
            return res;
        }
        let mut storage_indices = Vec::with_capacity(indices.data.len());
        let mask: BitVector = indices
            .data
            .iter()
            .map(|i| {
                let non_null = self.non_null.is_set(*i);
                if non_null {
                    storage_indices.push(self.storage_index(*i));
                }
                non_null
            })
            .collect();
        let storage_result = if storage_indices.is_empty() {
            RangeOrBitVector::empty()
        } else {
            self.inner
                .index_search_validated(op, value, Indices::new(&storage_indices, indices.state))
        };
        spread_matches(op, &mask, storage_result).into()
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        let non_null = indices.data.partition_point(|i| !self.non_null.is_set(*i));
        let storage_indices = self.map_to_storage_indices(&indices.data[non_null..]);
        let inner = self.inner.ordered_index_search(
            op,
            value,
            Indices::new(&storage_indices, indices.state),
        );
        let non_null = non_null as u32;
        if op == FilterOp::IsNull {
            return Range::new(0, non_null + inner.end);
        }
        Range::new(non_null + inner.start, non_null + inner.end)
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        sort_nulls_first(self.non_null, tokens, direction, |non_null| {
            for token in non_null.iter_mut() {
                token.index = self.storage_index(token.index);
            }
            self.inner.stable_sort(non_null, direction);
        });
    }

    fn size(&self) -> u32 {
        self.non_null.len()
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::Null {
            non_null: self.non_null,
            inner: Box::new(self.inner.serialize()),
        }
    }

    fn as_overlay(&self) -> Option<(&dyn OverlayMapping, &dyn DataChain)> {
        Some((self, &*self.inner))
    }
}
