//! Constraint evaluation over realized columns.
//!
//! The executor threads one [`RowSelection`] through every constraint,
//! picking per constraint between a bounded search over a storage window and
//! probing the selected indices one layer at a time.

mod executor;

pub use executor::QueryExecutor;
pub use strata_predicate::{Constraint, Order};

use crate::{column::DataChain, containers::RowSelection};

/// Applies `constraints` in order to a table of `row_count` rows.
///
/// # Panics
///
/// Panics when a constraint names a column outside `columns`.
pub fn filter(
    columns: &[Box<dyn DataChain + '_>],
    row_count: u32,
    constraints: &[Constraint],
) -> RowSelection {
    QueryExecutor::new(columns, row_count).filter(constraints)
}
