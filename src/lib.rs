//! Row selection and predicate evaluation over layered columns.
//!
//! A table column is a leaf storage wrapped by overlays that reorder, subset
//! or add nulls to its rows. Columns are realized into chains and filtered
//! by the [`QueryExecutor`], which narrows a [`RowSelection`] one constraint
//! at a time.

/// Row containers: bit vectors, row selections, interned strings.
pub mod containers;

/// Leaf storages, overlays and the chains built from them.
pub mod column;

/// Constraint evaluation and sorting over realized columns.
pub mod query;

/// Binary descriptions of realized chains.
pub mod serdes;

/// Executor configuration.
pub mod option;

pub(crate) mod observability;

pub use crate::{
    column::{build_chain, DataChain, Overlay, Storage},
    containers::{BitVector, Range, RowSelection},
    option::ExecutorOptions,
    query::QueryExecutor,
};
pub use strata_predicate::{Constraint, FilterOp, Order, Value};
