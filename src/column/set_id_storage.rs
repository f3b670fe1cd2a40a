use super::{
    utils::{self, invert_equal_range, single_search_ordering},
    DataChain, FilterOp, Indices, IndicesState, RangeOrBitVector, SearchValidationResult,
    SingleSearchResult, SortDirection, SortToken, Storage, Value,
};
use crate::{containers::Range, observability::log_trace, serdes::StorageDescriptor};

/// Column of group ids where every group is a contiguous run whose id is the
/// position of its first row.
///
/// So `data[i] <= i` and `data[data[i]] == data[i]`, which makes the column
/// sorted and lets equality lookups jump straight to the group head.
#[derive(Debug, Clone, Default)]
pub struct SetIdStorage {
    data: Vec<u32>,
}

impl SetIdStorage {
    /// # Panics
    ///
    /// Panics in debug builds when a row does not point at the head of its
    /// group.
    pub fn new(data: Vec<u32>) -> Self {
        debug_assert!(
            data.iter()
                .enumerate()
                .all(|(i, id)| *id as usize <= i && data[*id as usize] == *id),
            "set ids must point at the first row of their group"
        );
        Self { data }
    }

    pub fn data(&self) -> &[u32] {
        &self.data
    }
}

impl Storage for SetIdStorage {
    fn make_chain(&self) -> Box<dyn DataChain + '_> {
        Box::new(SetIdChain { data: &self.data })
    }
}

#[derive(Debug)]
struct SetIdChain<'a> {
    data: &'a [u32],
}

impl SetIdChain<'_> {
    /// First position in `range` holding a value `>= id`.
    fn lower_bound(&self, id: u32, range: Range) -> u32 {
        if range.is_empty() {
            return range.start;
        }
        if self.data[range.start as usize] == id {
            return range.start;
        }
        if range.contains(id) && self.data[id as usize] == id {
            return id;
        }
        self.upper_bound(id, range)
    }

    /// First position in `range` holding a value `> id`.
    fn upper_bound(&self, id: u32, range: Range) -> u32 {
        if id >= range.end {
            return range.end;
        }
        let from = range.start.max(id);
        let tail = &self.data[from as usize..range.end as usize];
        from + tail.partition_point(|v| *v <= id) as u32
    }

    fn binary_search_intrinsic(&self, op: FilterOp, id: u32, range: Range) -> Range {
        match op {
            FilterOp::Eq => {
                let start = self.lower_bound(id, range);
                Range::new(start, self.upper_bound(id, range).max(start))
            }
            FilterOp::Lt => Range::new(range.start, self.lower_bound(id, range)),
            FilterOp::Le => Range::new(range.start, self.upper_bound(id, range)),
            FilterOp::Ge => Range::new(self.lower_bound(id, range), range.end),
            FilterOp::Gt => Range::new(self.upper_bound(id, range), range.end),
            FilterOp::Ne | FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
                panic!("{op} has no contiguous answer on a set id column")
            }
        }
    }
}

impl DataChain for SetIdChain<'_> {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        if op.is_null_check() || op.is_pattern() {
            return single_search_ordering(op, None);
        }
        let id = self.data[index as usize];
        match value {
            Value::Long(v) => single_search_ordering(op, Some(i64::from(id).cmp(v))),
            Value::Double(d) => single_search_ordering(op, f64::from(id).partial_cmp(d)),
            _ => SingleSearchResult::NeedsFullSearch,
        }
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        utils::validate_integer_column(op, value, 0, i64::from(u32::MAX))
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(component = "set_id_storage", event = "search", op = %op, start = range.start, end = range.end);
        let id = match utils::u32_operand(op, value) {
            Ok(id) => id,
            Err(SearchValidationResult::AllData) => return range.into(),
            Err(_) => return RangeOrBitVector::empty(),
        };
        if range.is_empty() {
            return RangeOrBitVector::empty();
        }
        if op == FilterOp::Ne {
            let eq = self.binary_search_intrinsic(FilterOp::Eq, id, range);
            if eq.is_empty() {
                return range.into();
            }
            return invert_equal_range(eq, range).into();
        }
        self.binary_search_intrinsic(op, id, range).into()
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(component = "set_id_storage", event = "index_search", op = %op, len = indices.len());
        let id = match utils::u32_operand(op, value) {
            Ok(id) => id,
            Err(SearchValidationResult::AllData) => return Range::new(0, indices.len()).into(),
            Err(_) => return RangeOrBitVector::empty(),
        };
        if indices.state == IndicesState::Monotonic && op != FilterOp::Ne {
            return self.ordered_index_search_validated(op, value, indices).into();
        }
        let data = self.data;
        let bv = match op {
            FilterOp::Eq => utils::index_search(indices.data, |i| data[i as usize] == id),
            FilterOp::Ne => utils::index_search(indices.data, |i| data[i as usize] != id),
            FilterOp::Lt => utils::index_search(indices.data, |i| data[i as usize] < id),
            FilterOp::Le => utils::index_search(indices.data, |i| data[i as usize] <= id),
            FilterOp::Gt => utils::index_search(indices.data, |i| data[i as usize] > id),
            FilterOp::Ge => utils::index_search(indices.data, |i| data[i as usize] >= id),
            FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
                panic!("{op} reached a set id column unvalidated")
            }
        };
        bv.into()
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        let id = match utils::u32_operand(op, value) {
            Ok(id) => id,
            Err(SearchValidationResult::AllData) => return Range::new(0, indices.len()),
            Err(_) => return Range::default(),
        };
        let data = self.data;
        let lower = indices.data.partition_point(|i| data[*i as usize] < id) as u32;
        let upper = indices.data.partition_point(|i| data[*i as usize] <= id) as u32;
        utils::sorted_op_range(op, lower, upper, Range::new(0, indices.len()))
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        let data = self.data;
        utils::sort_tokens(tokens, direction, |a, b| data[a as usize].cmp(&data[b as usize]));
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::SetId { data: self.data }
    }
}
