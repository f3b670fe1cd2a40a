use super::{
    utils::{
        self, clamp_range, invert_equal_range, position_range, single_search_ordering,
    },
    DataChain, FilterOp, Indices, IndicesState, RangeOrBitVector, SearchValidationResult,
    SingleSearchResult, SortDirection, SortToken, Storage, Value,
};
use crate::{containers::Range, observability::log_trace, serdes::StorageDescriptor};

/// Column whose value at row `i` is `i`.
///
/// Nothing is stored; every search is answered arithmetically.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdStorage {
    size: u32,
}

impl IdStorage {
    pub fn new(size: u32) -> Self {
        Self { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

impl Storage for IdStorage {
    fn make_chain(&self) -> Box<dyn DataChain + '_> {
        Box::new(IdChain { size: self.size })
    }
}

#[derive(Debug)]
struct IdChain {
    size: u32,
}

/// Rows of `range` whose id satisfies `op val`, computed without a scan.
fn binary_search_intrinsic(op: FilterOp, val: u32, range: Range) -> Range {
    let next = val.saturating_add(1);
    match op {
        FilterOp::Eq => {
            let hit = u32::from(range.contains(val));
            clamp_range(val, val + hit, range)
        }
        FilterOp::Le => clamp_range(range.start, next.min(range.end), range),
        FilterOp::Lt => clamp_range(range.start, val.min(range.end), range),
        FilterOp::Ge => clamp_range(val.max(range.start), range.end, range),
        FilterOp::Gt => clamp_range(next.max(range.start), range.end, range),
        FilterOp::Ne | FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
            panic!("{op} has no contiguous answer on an id column")
        }
    }
}

impl DataChain for IdChain {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        if op.is_null_check() || op.is_pattern() {
            return single_search_ordering(op, None);
        }
        match value {
            Value::Long(v) => single_search_ordering(op, Some(i64::from(index).cmp(v))),
            Value::Double(d) => single_search_ordering(op, f64::from(index).partial_cmp(d)),
            _ => SingleSearchResult::NeedsFullSearch,
        }
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        utils::validate_integer_column(op, value, 0, i64::from(u32::MAX))
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(component = "id_storage", event = "search", op = %op, start = range.start, end = range.end);
        let val = match utils::u32_operand(op, value) {
            Ok(val) => val,
            Err(SearchValidationResult::AllData) => return range.into(),
            Err(_) => return RangeOrBitVector::empty(),
        };
        if op == FilterOp::Ne {
            if !range.contains(val) {
                return range.into();
            }
            return invert_equal_range(Range::new(val, val + 1), range).into();
        }
        binary_search_intrinsic(op, val, range).into()
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(component = "id_storage", event = "index_search", op = %op, len = indices.len());
        let val = match utils::u32_operand(op, value) {
            Ok(val) => val,
            Err(SearchValidationResult::AllData) => return Range::new(0, indices.len()).into(),
            Err(_) => return RangeOrBitVector::empty(),
        };
        if indices.state == IndicesState::Monotonic && op != FilterOp::Ne {
            return self.ordered_index_search_validated(op, value, indices).into();
        }
        let data = indices.data;
        let bv = match op {
            FilterOp::Eq => utils::index_search(data, |i| i == val),
            FilterOp::Ne => utils::index_search(data, |i| i != val),
            FilterOp::Lt => utils::index_search(data, |i| i < val),
            FilterOp::Le => utils::index_search(data, |i| i <= val),
            FilterOp::Gt => utils::index_search(data, |i| i > val),
            FilterOp::Ge => utils::index_search(data, |i| i >= val),
            FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
                panic!("{op} reached an id column unvalidated")
            }
        };
        bv.into()
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        let (Some(first), Some(last)) = (indices.data.first(), indices.data.last()) else {
            return Range::default();
        };
        let val = match utils::u32_operand(op, value) {
            Ok(val) => val,
            Err(SearchValidationResult::AllData) => return Range::new(0, indices.len()),
            Err(_) => return Range::default(),
        };
        let storage = binary_search_intrinsic(op, val, Range::new(*first, last + 1));
        position_range(indices.data, storage)
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        utils::sort_tokens(tokens, direction, |a, b| a.cmp(&b));
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::Id { size: self.size }
    }
}
