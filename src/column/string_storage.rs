use std::sync::Arc;

use regex::Regex;

use super::{
    glob::GlobMatcher,
    utils::{self, invert_equal_range},
    DataChain, FilterOp, Indices, IndicesState, RangeOrBitVector, SearchValidationResult,
    SingleSearchResult, SortDirection, SortToken, Storage, Value,
};
use crate::{
    containers::{BitVector, Range, StringId, StringPool},
    observability::log_trace,
    serdes::StorageDescriptor,
};

/// Column of interned strings; [`StringId::NULL`] marks SQL `NULL`.
///
/// When `is_sorted` is set the column is ordered by string value with nulls
/// first, and comparisons other than `!=`, `GLOB` and `REGEXP` binary search.
#[derive(Debug, Clone)]
pub struct StringStorage {
    pool: Arc<StringPool>,
    data: Vec<StringId>,
    is_sorted: bool,
}

impl StringStorage {
    /// # Panics
    ///
    /// Panics in debug builds when `is_sorted` is set but `data` is not
    /// sorted by value.
    pub fn new(pool: Arc<StringPool>, data: Vec<StringId>, is_sorted: bool) -> Self {
        debug_assert!(
            !is_sorted || data.windows(2).all(|w| pool.get(w[0]) <= pool.get(w[1])),
            "data flagged as sorted is not sorted"
        );
        Self {
            pool,
            data,
            is_sorted,
        }
    }

    pub fn pool(&self) -> &Arc<StringPool> {
        &self.pool
    }

    pub fn data(&self) -> &[StringId] {
        &self.data
    }
}

impl Storage for StringStorage {
    fn make_chain(&self) -> Box<dyn DataChain + '_> {
        Box::new(StringChain {
            pool: &self.pool,
            data: &self.data,
            is_sorted: self.is_sorted,
        })
    }
}

#[derive(Debug)]
struct StringChain<'a> {
    pool: &'a StringPool,
    data: &'a [StringId],
    is_sorted: bool,
}

fn compile_glob(pattern: &str) -> GlobMatcher {
    match GlobMatcher::new(pattern) {
        Ok(matcher) => matcher,
        Err(err) => panic!("invalid glob pattern {pattern:?}: {err}"),
    }
}

fn compile_regex(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(err) => panic!("invalid regex {pattern:?}: {err}"),
    }
}

fn string_operand(op: FilterOp, value: &Value) -> &str {
    match value.as_str() {
        Some(s) => s,
        None => panic!("{op} {value} reached a string column unvalidated"),
    }
}

impl<'a> StringChain<'a> {
    fn value(&self, index: u32) -> Option<&'a str> {
        self.pool.get(self.data[index as usize])
    }

    /// Match table indexed by raw string id; the null slot never matches.
    fn pool_matches<M>(&self, matches: M) -> Vec<bool>
    where
        M: Fn(&str) -> bool,
    {
        let mut table = vec![false; self.pool.len() as usize];
        for (id, s) in self.pool.iter() {
            table[id.raw() as usize] = matches(s);
        }
        table
    }

    /// Evaluates `matches` over every non-null row in `range`.
    ///
    /// When the window is at least as large as the pool each distinct string
    /// is tested once up front.
    fn scan<M>(&self, range: Range, matches: M) -> BitVector
    where
        M: Fn(&str) -> bool,
    {
        let data = self.data;
        if range.size() >= self.pool.len() {
            let table = self.pool_matches(matches);
            return utils::linear_search(range, |i| table[data[i as usize].raw() as usize]);
        }
        let pool = self.pool;
        utils::linear_search(range, |i| pool.get(data[i as usize]).is_some_and(&matches))
    }

    fn index_scan<M>(&self, indices: &[u32], matches: M) -> BitVector
    where
        M: Fn(&str) -> bool,
    {
        let data = self.data;
        if indices.len() as u32 >= self.pool.len() {
            let table = self.pool_matches(matches);
            return utils::index_search(indices, |i| table[data[i as usize].raw() as usize]);
        }
        let pool = self.pool;
        utils::index_search(indices, |i| pool.get(data[i as usize]).is_some_and(&matches))
    }

    fn linear_search(&self, op: FilterOp, value: &Value, range: Range) -> BitVector {
        let data = self.data;
        match op {
            FilterOp::IsNull => utils::linear_search(range, |i| data[i as usize].is_null()),
            FilterOp::IsNotNull => utils::linear_search(range, |i| !data[i as usize].is_null()),
            FilterOp::Eq => match self.pool.get_id(string_operand(op, value)) {
                Some(id) => utils::linear_search(range, |i| data[i as usize] == id),
                None => BitVector::with_len(range.end, false),
            },
            FilterOp::Ne => match self.pool.get_id(string_operand(op, value)) {
                Some(id) => utils::linear_search(range, |i| {
                    let row = data[i as usize];
                    row != id && !row.is_null()
                }),
                None => utils::linear_search(range, |i| !data[i as usize].is_null()),
            },
            FilterOp::Lt => {
                let s = string_operand(op, value);
                self.scan(range, |v| v < s)
            }
            FilterOp::Le => {
                let s = string_operand(op, value);
                self.scan(range, |v| v <= s)
            }
            FilterOp::Gt => {
                let s = string_operand(op, value);
                self.scan(range, |v| v > s)
            }
            FilterOp::Ge => {
                let s = string_operand(op, value);
                self.scan(range, |v| v >= s)
            }
            FilterOp::Glob => {
                let matcher = compile_glob(string_operand(op, value));
                match matcher.literal() {
                    Some(literal) => self.linear_search(FilterOp::Eq, &Value::from(literal), range),
                    None => self.scan(range, |v| matcher.matches(v)),
                }
            }
            FilterOp::Regex => {
                let regex = compile_regex(string_operand(op, value));
                self.scan(range, |v| regex.is_match(v))
            }
        }
    }

    /// First position in `range` that is not null. Sorted columns only.
    fn first_non_null(&self, range: Range) -> u32 {
        let window = &self.data[range.start as usize..range.end as usize];
        range.start + window.partition_point(|id| id.is_null()) as u32
    }

    fn binary_search(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        let non_null = self.first_non_null(range);
        match op {
            FilterOp::IsNull => return Range::new(range.start, non_null).into(),
            FilterOp::IsNotNull => return Range::new(non_null, range.end).into(),
            _ => {}
        }
        let s = Some(string_operand(op, value));
        let pool = self.pool;
        let window = &self.data[non_null as usize..range.end as usize];
        let lower = non_null + window.partition_point(|id| pool.get(*id) < s) as u32;
        let upper = non_null + window.partition_point(|id| pool.get(*id) <= s) as u32;
        match op {
            FilterOp::Ne if lower == upper => Range::new(non_null, range.end).into(),
            FilterOp::Ne => {
                invert_equal_range(Range::new(lower, upper), Range::new(non_null, range.end)).into()
            }
            _ => utils::sorted_op_range(op, lower, upper, Range::new(non_null, range.end)).into(),
        }
    }
}

impl DataChain for StringChain<'_> {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        let row = self.data[index as usize];
        let hit = match op {
            FilterOp::IsNull => row.is_null(),
            FilterOp::IsNotNull => !row.is_null(),
            FilterOp::Glob | FilterOp::Regex => return SingleSearchResult::NeedsFullSearch,
            _ => {
                let Some(s) = value.as_str() else {
                    return SingleSearchResult::NeedsFullSearch;
                };
                utils::compare(op, self.pool.get(row).map(|v| v.cmp(s)))
            }
        };
        if hit {
            SingleSearchResult::Match
        } else {
            SingleSearchResult::NoMatch
        }
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        if op.is_null_check() {
            return SearchValidationResult::Ok;
        }
        match value {
            Value::Null => panic!("NULL can only be compared with IS NULL and IS NOT NULL, got {op}"),
            Value::String(_) => SearchValidationResult::Ok,
            // Every string sorts after every number; `>` and `>=` still have
            // to drop nulls.
            Value::Long(_) | Value::Double(_) => match op {
                FilterOp::Gt | FilterOp::Ge => SearchValidationResult::Ok,
                _ => SearchValidationResult::NoData,
            },
            Value::Bytes(_) => SearchValidationResult::NoData,
        }
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(
            component = "string_storage",
            event = "search",
            op = %op,
            sorted = self.is_sorted,
            start = range.start,
            end = range.end,
        );
        if value.is_numeric() {
            return self.search_validated(FilterOp::IsNotNull, &Value::Null, range);
        }
        if self.is_sorted && !op.is_pattern() {
            return self.binary_search(op, value, range);
        }
        self.linear_search(op, value, range).into()
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(component = "string_storage", event = "index_search", op = %op, len = indices.len());
        if value.is_numeric() {
            return self.index_search_validated(FilterOp::IsNotNull, &Value::Null, indices);
        }
        if self.is_sorted
            && indices.state == IndicesState::Monotonic
            && !op.is_pattern()
            && op != FilterOp::Ne
        {
            return self.ordered_index_search_validated(op, value, indices).into();
        }
        let data = self.data;
        let bv = match op {
            FilterOp::IsNull => utils::index_search(indices.data, |i| data[i as usize].is_null()),
            FilterOp::IsNotNull => utils::index_search(indices.data, |i| !data[i as usize].is_null()),
            FilterOp::Eq => match self.pool.get_id(string_operand(op, value)) {
                Some(id) => utils::index_search(indices.data, |i| data[i as usize] == id),
                None => BitVector::with_len(indices.len(), false),
            },
            FilterOp::Ne => match self.pool.get_id(string_operand(op, value)) {
                Some(id) => utils::index_search(indices.data, |i| {
                    let row = data[i as usize];
                    row != id && !row.is_null()
                }),
                None => utils::index_search(indices.data, |i| !data[i as usize].is_null()),
            },
            FilterOp::Lt => {
                let s = string_operand(op, value);
                self.index_scan(indices.data, |v| v < s)
            }
            FilterOp::Le => {
                let s = string_operand(op, value);
                self.index_scan(indices.data, |v| v <= s)
            }
            FilterOp::Gt => {
                let s = string_operand(op, value);
                self.index_scan(indices.data, |v| v > s)
            }
            FilterOp::Ge => {
                let s = string_operand(op, value);
                self.index_scan(indices.data, |v| v >= s)
            }
            FilterOp::Glob => {
                let matcher = compile_glob(string_operand(op, value));
                self.index_scan(indices.data, |v| matcher.matches(v))
            }
            FilterOp::Regex => {
                let regex = compile_regex(string_operand(op, value));
                self.index_scan(indices.data, |v| regex.is_match(v))
            }
        };
        bv.into()
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        if value.is_numeric() {
            return self.ordered_index_search_validated(FilterOp::IsNotNull, &Value::Null, indices);
        }
        let data = self.data;
        let non_null = indices.data.partition_point(|i| data[*i as usize].is_null()) as u32;
        let all = Range::new(non_null, indices.len());
        match op {
            FilterOp::IsNull => return Range::new(0, non_null),
            FilterOp::IsNotNull => return all,
            FilterOp::Ne | FilterOp::Glob | FilterOp::Regex => {
                panic!("{op} has no contiguous answer over sorted strings")
            }
            _ => {}
        }
        let s = Some(string_operand(op, value));
        let lower = indices.data.partition_point(|i| self.value(*i) < s) as u32;
        let upper = indices.data.partition_point(|i| self.value(*i) <= s) as u32;
        utils::sorted_op_range(op, lower, upper, all)
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        utils::sort_tokens(tokens, direction, |a, b| self.value(a).cmp(&self.value(b)));
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::String {
            is_sorted: self.is_sorted,
            data: self.data,
        }
    }
}
