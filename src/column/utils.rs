//! Search helpers shared by leaf storages and overlays.

use std::cmp::Ordering;

use super::{FilterOp, SearchValidationResult, SingleSearchResult, SortDirection, SortToken, Value};
use crate::containers::{BitVector, BitVectorBuilder, Range};

const WORD_BITS: u32 = u64::BITS;

/// Fills positions `[skip, size)` with `matches(position)`.
///
/// Positions are visited in three passes: single bits up to the first word
/// boundary, whole 64-bit words, then the remaining tail. The word loop has no
/// data-dependent branches so it can be vectorized.
#[inline]
fn fill_word_parallel<F>(size: u32, skip: u32, mut matches: F) -> BitVector
where
    F: FnMut(u32) -> bool,
{
    let mut builder = BitVectorBuilder::new(size, skip);
    let mut pos = skip;

    let front = builder.bits_until_word_boundary_or_full();
    for _ in 0..front {
        builder.append(matches(pos));
        pos += 1;
    }

    let fast = builder.bits_in_complete_words_until_full();
    for _ in 0..fast / WORD_BITS {
        let mut word = 0u64;
        for k in 0..WORD_BITS {
            word |= u64::from(matches(pos + k)) << k;
        }
        builder.append_word(word);
        pos += WORD_BITS;
    }

    let back = builder.bits_until_full();
    for _ in 0..back {
        builder.append(matches(pos));
        pos += 1;
    }
    builder.build()
}

/// Bit vector of length `range.end` with bit `i` set for each `i` in `range`
/// where `matches(i)`.
pub(crate) fn linear_search<F>(range: Range, matches: F) -> BitVector
where
    F: FnMut(u32) -> bool,
{
    fill_word_parallel(range.end, range.start, matches)
}

/// Bit vector of length `indices.len()` with bit `p` set where
/// `matches(indices[p])`.
pub(crate) fn index_search<F>(indices: &[u32], mut matches: F) -> BitVector
where
    F: FnMut(u32) -> bool,
{
    fill_word_parallel(indices.len() as u32, 0, |p| matches(indices[p as usize]))
}

/// Evaluates a comparison operator given `lhs.cmp(rhs)`.
///
/// Callers match on the operator once and hand a specialized closure to the
/// scan helpers; this is for the cold single-row paths.
pub(crate) fn compare(op: FilterOp, ordering: Option<Ordering>) -> bool {
    ordering.is_some_and(|ordering| op.test_ordering(ordering))
}

pub(crate) fn single_search_ordering(op: FilterOp, ordering: Option<Ordering>) -> SingleSearchResult {
    match op {
        FilterOp::IsNotNull => SingleSearchResult::Match,
        FilterOp::IsNull | FilterOp::Glob | FilterOp::Regex => SingleSearchResult::NoMatch,
        _ if compare(op, ordering) => SingleSearchResult::Match,
        _ => SingleSearchResult::NoMatch,
    }
}

/// An integer-column comparison against a double, rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntegerBound {
    /// Compare against this integer with the same operator.
    Long(i64),
    /// No comparison needed.
    Resolved(SearchValidationResult),
}

/// Rewrites `column <op> value` for an integer column and a double `value`.
///
/// Integral doubles compare as integers. Otherwise equality can never hold,
/// inequality always holds and the ordered operators round towards the
/// operator: `<= 3.5` is `<= 3`, `< 3.5` is `< 4`, `> 3.5` is `> 3` and
/// `>= 3.5` is `>= 4`. NaN is unordered against every integer.
pub(crate) fn compare_int_column_with_double(op: FilterOp, value: f64) -> IntegerBound {
    if value.is_nan() {
        return IntegerBound::Resolved(nan_comparison(op));
    }
    if value.fract() == 0.0 {
        return IntegerBound::Long(value as i64);
    }
    match op {
        FilterOp::Eq => IntegerBound::Resolved(SearchValidationResult::NoData),
        FilterOp::Ne => IntegerBound::Resolved(SearchValidationResult::AllData),
        FilterOp::Le | FilterOp::Gt => IntegerBound::Long(value.floor() as i64),
        FilterOp::Lt | FilterOp::Ge => IntegerBound::Long(value.ceil() as i64),
        FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
            panic!("{op} cannot compare an integer column with a double")
        }
    }
}

/// Only `!=` holds against NaN.
fn nan_comparison(op: FilterOp) -> SearchValidationResult {
    if op == FilterOp::Ne {
        SearchValidationResult::AllData
    } else {
        SearchValidationResult::NoData
    }
}

/// Integer comparison value for an already validated constraint.
pub(crate) fn integer_bound(op: FilterOp, value: &Value) -> IntegerBound {
    match value {
        Value::Long(v) => IntegerBound::Long(*v),
        Value::Double(d) => compare_int_column_with_double(op, *d),
        other => panic!("{other} reached an integer search unvalidated"),
    }
}

/// Resolves a validated constraint on a `u32`-valued column to the value
/// it compares with.
pub(crate) fn u32_operand(op: FilterOp, value: &Value) -> Result<u32, SearchValidationResult> {
    match integer_bound(op, value) {
        IntegerBound::Resolved(result) => Err(result),
        // Out-of-range values are rejected by validation, except for rounded
        // doubles which can land one past either end.
        IntegerBound::Long(v) => u32::try_from(v).map_err(|_| {
            if op == FilterOp::Ne || (v < 0) == matches!(op, FilterOp::Ge | FilterOp::Gt) {
                SearchValidationResult::AllData
            } else {
                SearchValidationResult::NoData
            }
        }),
    }
}

/// Common checks for columns that never hold NULL and are not strings.
///
/// `IS NULL` never matches and `IS NOT NULL` always does, pattern operators
/// never match, and any string sorts after any number.
pub(crate) fn validate_non_null_numeric(op: FilterOp, value: &Value) -> Option<SearchValidationResult> {
    match op {
        FilterOp::IsNull => return Some(SearchValidationResult::NoData),
        FilterOp::IsNotNull => return Some(SearchValidationResult::AllData),
        FilterOp::Glob | FilterOp::Regex => return Some(SearchValidationResult::NoData),
        _ => {}
    }
    match value {
        Value::Null => panic!("NULL can only be compared with IS NULL and IS NOT NULL, got {op}"),
        Value::String(_) => Some(if matches!(op, FilterOp::Lt | FilterOp::Le) {
            SearchValidationResult::AllData
        } else {
            SearchValidationResult::NoData
        }),
        Value::Bytes(_) => Some(SearchValidationResult::NoData),
        Value::Double(d) if d.is_nan() => Some(nan_comparison(op)),
        Value::Long(_) | Value::Double(_) => None,
    }
}

/// Bounds check for integer columns whose values lie in `[min, max]`.
pub(crate) fn validate_integer_bounds(
    op: FilterOp,
    value: &Value,
    min: i64,
    max: i64,
) -> SearchValidationResult {
    let (too_big, too_small) = match value {
        Value::Long(v) => (*v > max, *v < min),
        Value::Double(d) => (*d >= max as f64 + 1.0, *d < min as f64),
        _ => return SearchValidationResult::Ok,
    };
    if too_big {
        return if matches!(op, FilterOp::Le | FilterOp::Lt | FilterOp::Ne) {
            SearchValidationResult::AllData
        } else {
            SearchValidationResult::NoData
        };
    }
    if too_small {
        return if matches!(op, FilterOp::Ge | FilterOp::Gt | FilterOp::Ne) {
            SearchValidationResult::AllData
        } else {
            SearchValidationResult::NoData
        };
    }
    SearchValidationResult::Ok
}

/// Full validation for integer columns in `[min, max]`.
pub(crate) fn validate_integer_column(
    op: FilterOp,
    value: &Value,
    min: i64,
    max: i64,
) -> SearchValidationResult {
    match validate_non_null_numeric(op, value) {
        Some(result) => result,
        None => validate_integer_bounds(op, value, min, max),
    }
}

/// Turns an equality match range into a `!=` result over `search`.
pub(crate) fn invert_equal_range(eq: Range, search: Range) -> BitVector {
    let mut bv = BitVector::with_len(search.start, false);
    bv.resize(eq.start.max(search.start), true);
    bv.resize(eq.end.max(search.start), false);
    bv.resize(search.end, true);
    bv
}

/// Positions in `indices` (sorted ascending) falling into `range`.
pub(crate) fn position_range(indices: &[u32], range: Range) -> Range {
    let start = indices.partition_point(|i| *i < range.start);
    let end = start + indices[start..].partition_point(|i| *i < range.end);
    Range::new(start as u32, end as u32)
}

/// Positions satisfying `op` in a run sorted by value, given the first
/// position holding a value `>= operand` (`lower`) and the first holding a
/// value `> operand` (`upper`).
pub(crate) fn sorted_op_range(op: FilterOp, lower: u32, upper: u32, range: Range) -> Range {
    match op {
        FilterOp::Eq => Range::new(lower, upper),
        FilterOp::Lt => Range::new(range.start, lower),
        FilterOp::Le => Range::new(range.start, upper),
        FilterOp::Gt => Range::new(upper, range.end),
        FilterOp::Ge => Range::new(lower, range.end),
        FilterOp::Ne | FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
            panic!("{op} has no contiguous answer over sorted values")
        }
    }
}

/// Clamps a possibly inverted `[start, end)` into `outer`.
pub(crate) fn clamp_range(start: u32, end: u32, outer: Range) -> Range {
    let start = start.clamp(outer.start, outer.end);
    let end = end.clamp(start, outer.end);
    Range::new(start, end)
}

/// Stable sort of `tokens` by comparing the values at their indices.
pub(crate) fn sort_tokens<C>(tokens: &mut [SortToken], direction: SortDirection, mut cmp: C)
where
    C: FnMut(u32, u32) -> Ordering,
{
    match direction {
        SortDirection::Ascending => tokens.sort_by(|a, b| cmp(a.index, b.index)),
        SortDirection::Descending => tokens.sort_by(|a, b| cmp(b.index, a.index)),
    }
}
