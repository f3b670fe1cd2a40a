#![deny(missing_docs)]
//! Strata predicate facade crate.
//!
//! Constraints handed to the engine are flat `(column, operator, value)`
//! triples. Values follow SQL semantics: `NULL` only compares through
//! `IS NULL` / `IS NOT NULL`, integers and doubles compare numerically and any
//! string sorts after any number.

mod core;

pub use core::{Constraint, ConstraintError, FilterOp, Order, Value, ValueType};
