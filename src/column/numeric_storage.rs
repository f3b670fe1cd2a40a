use std::{cmp::Ordering, fmt};

use super::{
    utils::{self, integer_bound, invert_equal_range, single_search_ordering, IntegerBound},
    ColumnType, DataChain, FilterOp, Indices, IndicesState, RangeOrBitVector,
    SearchValidationResult, SingleSearchResult, SortDirection, SortToken, Storage, Value,
};
use crate::{
    containers::{BitVector, Range},
    observability::log_trace,
    serdes::{NumericPayload, StorageDescriptor},
};

/// Element type of a [`NumericStorage`].
pub trait NumericValue: Copy + PartialOrd + fmt::Debug + 'static {
    const COLUMN_TYPE: ColumnType;

    /// Type specific validation of `column <op> value`.
    fn validate(op: FilterOp, value: &Value) -> SearchValidationResult;

    /// Converts a validated operand into the column's domain.
    ///
    /// Integer columns round doubles towards the operator and may resolve the
    /// search outright.
    fn operand(op: FilterOp, value: &Value) -> Result<Self, SearchValidationResult>;

    /// Ordering of `self` relative to a numeric `value`.
    fn cmp_value(self, value: &Value) -> Option<Ordering>;

    /// Total order used for sorting.
    fn total_cmp(&self, other: &Self) -> Ordering;

    fn payload(data: &[Self]) -> NumericPayload<'_>;
}

macro_rules! implement_integer_value {
    ($($ty:ty => $column_type:ident, $payload:ident;)*) => {
        $(
            impl NumericValue for $ty {
                const COLUMN_TYPE: ColumnType = ColumnType::$column_type;

                fn validate(op: FilterOp, value: &Value) -> SearchValidationResult {
                    utils::validate_integer_column(
                        op,
                        value,
                        i64::from(<$ty>::MIN),
                        i64::from(<$ty>::MAX),
                    )
                }

                fn operand(op: FilterOp, value: &Value) -> Result<Self, SearchValidationResult> {
                    match integer_bound(op, value) {
                        IntegerBound::Resolved(result) => Err(result),
                        IntegerBound::Long(v) => <$ty>::try_from(v).map_err(|_| {
                            let below = v < i64::from(<$ty>::MIN);
                            if op == FilterOp::Ne
                                || below == matches!(op, FilterOp::Ge | FilterOp::Gt)
                            {
                                SearchValidationResult::AllData
                            } else {
                                SearchValidationResult::NoData
                            }
                        }),
                    }
                }

                fn cmp_value(self, value: &Value) -> Option<Ordering> {
                    match value {
                        Value::Long(v) => Some(i64::from(self).cmp(v)),
                        Value::Double(d) => (self as f64).partial_cmp(d),
                        _ => None,
                    }
                }

                fn total_cmp(&self, other: &Self) -> Ordering {
                    self.cmp(other)
                }

                fn payload(data: &[Self]) -> NumericPayload<'_> {
                    NumericPayload::$payload(data)
                }
            }
        )*
    };
}

implement_integer_value! {
    u32 => Uint32, Uint32;
    i32 => Int32, Int32;
    i64 => Int64, Int64;
}

impl NumericValue for f64 {
    const COLUMN_TYPE: ColumnType = ColumnType::Double;

    fn validate(op: FilterOp, value: &Value) -> SearchValidationResult {
        utils::validate_non_null_numeric(op, value).unwrap_or(SearchValidationResult::Ok)
    }

    fn operand(_: FilterOp, value: &Value) -> Result<Self, SearchValidationResult> {
        match value.as_double() {
            Some(d) => Ok(d),
            None => panic!("{value} reached a double search unvalidated"),
        }
    }

    fn cmp_value(self, value: &Value) -> Option<Ordering> {
        self.partial_cmp(&value.as_double()?)
    }

    fn total_cmp(&self, other: &Self) -> Ordering {
        f64::total_cmp(self, other)
    }

    fn payload(data: &[Self]) -> NumericPayload<'_> {
        NumericPayload::Double(data)
    }
}

/// Column of fixed-width numbers, optionally known to be sorted ascending.
///
/// Sorted columns answer every comparison except `!=` with a binary search
/// and return a [`Range`]; unsorted columns scan.
#[derive(Debug, Clone)]
pub struct NumericStorage<T> {
    data: Vec<T>,
    is_sorted: bool,
}

impl<T: NumericValue> NumericStorage<T> {
    /// # Panics
    ///
    /// Panics in debug builds when `is_sorted` is set but `data` is not
    /// sorted.
    pub fn new(data: Vec<T>, is_sorted: bool) -> Self {
        debug_assert!(
            !is_sorted || data.windows(2).all(|w| w[0].total_cmp(&w[1]).is_le()),
            "data flagged as sorted is not sorted"
        );
        Self { data, is_sorted }
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn is_sorted(&self) -> bool {
        self.is_sorted
    }
}

impl<T: NumericValue> Storage for NumericStorage<T> {
    fn make_chain(&self) -> Box<dyn DataChain + '_> {
        Box::new(NumericChain {
            data: &self.data,
            is_sorted: self.is_sorted,
        })
    }
}

#[derive(Debug)]
struct NumericChain<'a, T> {
    data: &'a [T],
    is_sorted: bool,
}

impl<T: NumericValue> NumericChain<'_, T> {
    fn binary_search(&self, op: FilterOp, val: T, range: Range) -> RangeOrBitVector {
        let window = &self.data[range.start as usize..range.end as usize];
        let lower = range.start + window.partition_point(|x| *x < val) as u32;
        if op == FilterOp::Ne {
            let upper = lower + window[(lower - range.start) as usize..].partition_point(|x| *x <= val) as u32;
            return invert_equal_range(Range::new(lower, upper), range).into();
        }
        let upper = range.start + window.partition_point(|x| *x <= val) as u32;
        utils::sorted_op_range(op, lower, upper, range).into()
    }

    fn linear_search(&self, op: FilterOp, val: T, range: Range) -> BitVector {
        let data = self.data;
        match op {
            FilterOp::Eq => utils::linear_search(range, |i| data[i as usize] == val),
            FilterOp::Ne => utils::linear_search(range, |i| data[i as usize] != val),
            FilterOp::Lt => utils::linear_search(range, |i| data[i as usize] < val),
            FilterOp::Le => utils::linear_search(range, |i| data[i as usize] <= val),
            FilterOp::Gt => utils::linear_search(range, |i| data[i as usize] > val),
            FilterOp::Ge => utils::linear_search(range, |i| data[i as usize] >= val),
            FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
                panic!("{op} reached a numeric column unvalidated")
            }
        }
    }
}

impl<T: NumericValue> DataChain for NumericChain<'_, T> {
    fn single_search(&self, op: FilterOp, value: &Value, index: u32) -> SingleSearchResult {
        if op.is_null_check() || op.is_pattern() {
            return single_search_ordering(op, None);
        }
        if !value.is_numeric() {
            return SingleSearchResult::NeedsFullSearch;
        }
        single_search_ordering(op, self.data[index as usize].cmp_value(value))
    }

    fn validate_search_constraints(&self, op: FilterOp, value: &Value) -> SearchValidationResult {
        T::validate(op, value)
    }

    fn search_validated(&self, op: FilterOp, value: &Value, range: Range) -> RangeOrBitVector {
        log_trace!(
            component = "numeric_storage",
            event = "search",
            op = %op,
            column_type = ?T::COLUMN_TYPE,
            sorted = self.is_sorted,
            start = range.start,
            end = range.end,
        );
        let val = match T::operand(op, value) {
            Ok(val) => val,
            Err(SearchValidationResult::AllData) => return range.into(),
            Err(_) => return RangeOrBitVector::empty(),
        };
        if self.is_sorted {
            return self.binary_search(op, val, range);
        }
        self.linear_search(op, val, range).into()
    }

    fn index_search_validated(
        &self,
        op: FilterOp,
        value: &Value,
        indices: Indices<'_>,
    ) -> RangeOrBitVector {
        log_trace!(
            component = "numeric_storage",
            event = "index_search",
            op = %op,
            column_type = ?T::COLUMN_TYPE,
            len = indices.len(),
        );
        if self.is_sorted && indices.state == IndicesState::Monotonic && op != FilterOp::Ne {
            return self.ordered_index_search_validated(op, value, indices).into();
        }
        let val = match T::operand(op, value) {
            Ok(val) => val,
            Err(SearchValidationResult::AllData) => return Range::new(0, indices.len()).into(),
            Err(_) => return RangeOrBitVector::empty(),
        };
        let data = self.data;
        let bv = match op {
            FilterOp::Eq => utils::index_search(indices.data, |i| data[i as usize] == val),
            FilterOp::Ne => utils::index_search(indices.data, |i| data[i as usize] != val),
            FilterOp::Lt => utils::index_search(indices.data, |i| data[i as usize] < val),
            FilterOp::Le => utils::index_search(indices.data, |i| data[i as usize] <= val),
            FilterOp::Gt => utils::index_search(indices.data, |i| data[i as usize] > val),
            FilterOp::Ge => utils::index_search(indices.data, |i| data[i as usize] >= val),
            FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
                panic!("{op} reached a numeric column unvalidated")
            }
        };
        bv.into()
    }

    fn ordered_index_search_validated(&self, op: FilterOp, value: &Value, indices: Indices<'_>) -> Range {
        let val = match T::operand(op, value) {
            Ok(val) => val,
            Err(SearchValidationResult::AllData) => return Range::new(0, indices.len()),
            Err(_) => return Range::default(),
        };
        let data = self.data;
        let lower = indices.data.partition_point(|i| data[*i as usize] < val) as u32;
        let upper = indices.data.partition_point(|i| data[*i as usize] <= val) as u32;
        utils::sorted_op_range(op, lower, upper, Range::new(0, indices.len()))
    }

    fn stable_sort(&self, tokens: &mut [SortToken], direction: SortDirection) {
        let data = self.data;
        utils::sort_tokens(tokens, direction, |a, b| {
            data[a as usize].total_cmp(&data[b as usize])
        });
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::Numeric {
            column_type: T::COLUMN_TYPE,
            is_sorted: self.is_sorted,
            payload: T::payload(self.data),
        }
    }
}
