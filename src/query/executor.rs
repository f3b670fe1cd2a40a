use crate::{
    column::{
        DataChain, FilterOp, Indices, IndicesState, RangeOrBitVector, SearchValidationResult,
        SingleSearchResult, SortDirection, SortToken, Value,
    },
    containers::{Range, RowSelection},
    observability::log_debug,
    option::ExecutorOptions,
};

use super::{Constraint, Order};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Strategy {
    Skipped,
    ShortCircuit,
    SingleRow,
    Bounded,
    Index,
}

impl Strategy {
    fn as_str(self) -> &'static str {
        match self {
            Strategy::Skipped => "skipped",
            Strategy::ShortCircuit => "short_circuit",
            Strategy::SingleRow => "single_row",
            Strategy::Bounded => "bounded",
            Strategy::Index => "index",
        }
    }
}

/// Filters and sorts the rows of one table.
///
/// Every column is a realized chain of `row_count` rows.
#[derive(Debug)]
pub struct QueryExecutor<'a> {
    columns: &'a [Box<dyn DataChain + 'a>],
    row_count: u32,
    options: ExecutorOptions,
}

impl<'a> QueryExecutor<'a> {
    /// # Panics
    ///
    /// Panics when a column does not hold `row_count` rows.
    pub fn new(columns: &'a [Box<dyn DataChain + 'a>], row_count: u32) -> Self {
        for (i, column) in columns.iter().enumerate() {
            assert_eq!(
                column.size(),
                row_count,
                "column {i} has {} rows but the table has {row_count}",
                column.size()
            );
        }
        Self {
            columns,
            row_count,
            options: ExecutorOptions::default(),
        }
    }

    pub fn with_options(self, options: ExecutorOptions) -> Self {
        Self { options, ..self }
    }

    pub fn row_count(&self) -> u32 {
        self.row_count
    }

    fn column(&self, column_index: u32) -> &'a dyn DataChain {
        match self.columns.get(column_index as usize) {
            Some(column) => &**column,
            None => panic!(
                "column {column_index} out of bounds for table with {} columns",
                self.columns.len()
            ),
        }
    }

    /// Rows satisfying every constraint, applied left to right.
    pub fn filter(&self, constraints: &[Constraint]) -> RowSelection {
        let mut selection = RowSelection::range(0, self.row_count);
        for constraint in constraints {
            self.filter_column(constraint, &mut selection);
        }
        selection
    }

    /// Narrows `selection` to the rows satisfying `constraint`.
    pub fn filter_column(&self, constraint: &Constraint, selection: &mut RowSelection) {
        let chain = self.column(constraint.column_index);
        let rows_before = selection.size();
        let strategy = self.apply(chain, constraint.op, &constraint.value, selection);
        log_debug!(
            component = "executor",
            event = "constraint_applied",
            column = constraint.column_index,
            op = %constraint.op,
            strategy = strategy.as_str(),
            rows_before,
            rows_after = selection.size(),
        );
    }

    fn apply(
        &self,
        chain: &dyn DataChain,
        op: FilterOp,
        value: &Value,
        selection: &mut RowSelection,
    ) -> Strategy {
        if selection.is_empty() {
            return Strategy::Skipped;
        }
        if !requires_search(chain, op, value, selection) {
            return Strategy::ShortCircuit;
        }
        if self.options.single_row_fast_path && selection.size() == 1 {
            match chain.single_search(op, value, selection.get(0)) {
                SingleSearchResult::Match => return Strategy::SingleRow,
                SingleSearchResult::NoMatch => {
                    selection.clear();
                    return Strategy::SingleRow;
                }
                SingleSearchResult::NeedsFullSearch => {}
            }
        }
        if self.prefers_index_search(selection) {
            index_search(chain, op, value, selection);
            Strategy::Index
        } else {
            bounded_search(chain, op, value, selection);
            Strategy::Bounded
        }
    }

    fn prefers_index_search(&self, selection: &RowSelection) -> bool {
        if selection.is_range() {
            return false;
        }
        if selection.is_index_vector() {
            return true;
        }
        let (first, last) = bounds(selection);
        self.options.prefers_index_search(selection.size(), first, last)
    }

    /// Narrows `selection` by searching the storage window covering it.
    pub fn bounded_column_filter(
        chain: &dyn DataChain,
        op: FilterOp,
        value: &Value,
        selection: &mut RowSelection,
    ) {
        if !selection.is_empty() && requires_search(chain, op, value, selection) {
            bounded_search(chain, op, value, selection);
        }
    }

    /// Narrows `selection` by probing its indices layer by layer.
    pub fn index_column_filter(
        chain: &dyn DataChain,
        op: FilterOp,
        value: &Value,
        selection: &mut RowSelection,
    ) {
        if !selection.is_empty() && requires_search(chain, op, value, selection) {
            index_search(chain, op, value, selection);
        }
    }

    /// Indices of `selection` reordered by `orders`, the first order being
    /// the most significant.
    pub fn sort(&self, selection: &RowSelection, orders: &[Order]) -> RowSelection {
        let indices = selection.all_indices();
        let mut tokens: Vec<SortToken> = indices
            .iter()
            .enumerate()
            .map(|(position, index)| SortToken {
                index: *index,
                payload: position as u32,
            })
            .collect();
        for order in orders.iter().rev() {
            for token in tokens.iter_mut() {
                token.index = indices[token.payload as usize];
            }
            let direction = if order.descending {
                SortDirection::Descending
            } else {
                SortDirection::Ascending
            };
            self.column(order.column_index).stable_sort(&mut tokens, direction);
        }
        log_debug!(
            component = "executor",
            event = "sorted",
            keys = orders.len(),
            rows = tokens.len(),
        );
        let sorted: Vec<u32> = tokens
            .iter()
            .map(|token| indices[token.payload as usize])
            .collect();
        RowSelection::from(sorted).with_optimize_for(selection.optimize_for())
    }
}

/// Handles NULL literals and constraints decidable without data. Returns
/// whether a search still has to run.
fn requires_search(
    chain: &dyn DataChain,
    op: FilterOp,
    value: &Value,
    selection: &mut RowSelection,
) -> bool {
    if value.is_null() && !op.is_null_check() {
        selection.clear();
        return false;
    }
    match chain.validate_search_constraints(op, value) {
        SearchValidationResult::Ok => true,
        SearchValidationResult::AllData => false,
        SearchValidationResult::NoData => {
            selection.clear();
            false
        }
    }
}

/// First and last index held by a non-empty selection.
fn bounds(selection: &RowSelection) -> (u32, u32) {
    if let Some(indices) = selection.as_index_vector() {
        let first = indices.iter().copied().min().unwrap_or_default();
        let last = indices.iter().copied().max().unwrap_or_default();
        return (first, last);
    }
    (selection.get(0), selection.get(selection.size() - 1))
}

fn bounded_search(chain: &dyn DataChain, op: FilterOp, value: &Value, selection: &mut RowSelection) {
    let (first, last) = bounds(selection);
    let result = chain.search_validated(op, value, Range::new(first, last + 1));
    let optimize_for = selection.optimize_for();
    let matches = match result {
        RangeOrBitVector::Range(range) => RowSelection::from(range),
        RangeOrBitVector::BitVector(bv) => RowSelection::from(bv),
    };
    if selection.is_range() {
        *selection = matches.with_optimize_for(optimize_for);
    } else {
        selection.intersect(&matches);
    }
}

fn index_search(chain: &dyn DataChain, op: FilterOp, value: &Value, selection: &mut RowSelection) {
    // `global` keeps the table index of each entry of `current`, which moves
    // into the address space of each successive layer.
    let mut global = selection.all_indices();
    let starting_count = global.len();
    let mut current = global.clone();
    let mut state = match selection.as_index_vector() {
        Some(indices) => Indices::detect(indices).state,
        None => IndicesState::Monotonic,
    };
    let mut matched = Vec::with_capacity(starting_count);
    let mut removed = 0;

    let mut layer = chain;
    while let Some((mapping, inner)) = layer.as_overlay() {
        if current.is_empty() {
            break;
        }
        let lookup = mapping.is_storage_lookup_required(op, &current);
        if lookup.count_set_bits() as usize != current.len() {
            let mut next_current = Vec::with_capacity(current.len());
            let mut next_global = Vec::with_capacity(current.len());
            let mut resolved = Vec::new();
            let mut resolved_global = Vec::new();
            for (i, (index, table_index)) in current.iter().zip(&global).enumerate() {
                if lookup.is_set(i as u32) {
                    next_current.push(*index);
                    next_global.push(*table_index);
                } else {
                    resolved.push(*index);
                    resolved_global.push(*table_index);
                }
            }
            let answers = mapping.resolve_without_lookup(op, &resolved);
            for (i, table_index) in resolved_global.into_iter().enumerate() {
                if answers.is_set(i as u32) {
                    matched.push(table_index);
                } else {
                    removed += 1;
                }
            }
            current = next_current;
            global = next_global;
        }

        current = mapping.map_to_storage_indices(&current);
        state = mapping.storage_indices_state(state);
        layer = inner;

        match layer.validate_search_constraints(op, value) {
            SearchValidationResult::Ok => {}
            SearchValidationResult::AllData => {
                matched.append(&mut global);
                current.clear();
            }
            SearchValidationResult::NoData => {
                removed += global.len();
                global.clear();
                current.clear();
            }
        }
    }

    if !current.is_empty() {
        match layer.index_search_validated(op, value, Indices::new(&current, state)) {
            RangeOrBitVector::Range(range) => {
                matched.extend_from_slice(&global[range.start as usize..range.end as usize]);
                removed += global.len() - range.size() as usize;
            }
            RangeOrBitVector::BitVector(bv) => {
                for (i, table_index) in global.iter().enumerate() {
                    if bv.is_set(i as u32) {
                        matched.push(*table_index);
                    } else {
                        removed += 1;
                    }
                }
            }
        }
    }

    assert_eq!(
        starting_count,
        matched.len() + removed,
        "index search lost track of rows"
    );
    matched.sort_unstable();
    let optimize_for = selection.optimize_for();
    *selection = RowSelection::from(matched).with_optimize_for(optimize_for);
}
