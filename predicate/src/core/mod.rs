//! Core predicate structures shared between the engine and its callers.

mod constraint;
mod error;
mod value;

use std::fmt;

pub use constraint::{Constraint, Order};
pub use error::ConstraintError;
pub use value::{Value, ValueType};

/// Filter operator applied by a [`Constraint`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOp {
    /// Equals (`=`).
    Eq,
    /// Not equals (`!=`).
    Ne,
    /// Less than (`<`).
    Lt,
    /// Less than or equal to (`<=`).
    Le,
    /// Greater than (`>`).
    Gt,
    /// Greater than or equal to (`>=`).
    Ge,
    /// `IS NULL`.
    IsNull,
    /// `IS NOT NULL`.
    IsNotNull,
    /// SQLite style `GLOB` pattern match.
    Glob,
    /// Regular expression search.
    Regex,
}

impl FilterOp {
    /// Every operator, in declaration order.
    pub const ALL: [FilterOp; 10] = [
        FilterOp::Eq,
        FilterOp::Ne,
        FilterOp::Lt,
        FilterOp::Le,
        FilterOp::Gt,
        FilterOp::Ge,
        FilterOp::IsNull,
        FilterOp::IsNotNull,
        FilterOp::Glob,
        FilterOp::Regex,
    ];

    /// Returns a textual representation of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::IsNull => "IS NULL",
            FilterOp::IsNotNull => "IS NOT NULL",
            FilterOp::Glob => "GLOB",
            FilterOp::Regex => "REGEXP",
        }
    }

    /// Returns true for `IS NULL` and `IS NOT NULL`.
    #[must_use]
    pub fn is_null_check(self) -> bool {
        matches!(self, FilterOp::IsNull | FilterOp::IsNotNull)
    }

    /// Returns true for the six ordered comparison operators.
    #[must_use]
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            FilterOp::Eq | FilterOp::Ne | FilterOp::Lt | FilterOp::Le | FilterOp::Gt | FilterOp::Ge
        )
    }

    /// Returns true for the pattern operators (`GLOB`, `REGEXP`).
    #[must_use]
    pub fn is_pattern(self) -> bool {
        matches!(self, FilterOp::Glob | FilterOp::Regex)
    }

    /// Evaluates a comparison operator against an ordering of `lhs` relative to `rhs`.
    ///
    /// # Panics
    ///
    /// Panics when called on a non-comparison operator.
    #[must_use]
    pub fn test_ordering(self, ordering: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering;
        match self {
            FilterOp::Eq => ordering == Ordering::Equal,
            FilterOp::Ne => ordering != Ordering::Equal,
            FilterOp::Lt => ordering == Ordering::Less,
            FilterOp::Le => ordering != Ordering::Greater,
            FilterOp::Gt => ordering == Ordering::Greater,
            FilterOp::Ge => ordering != Ordering::Less,
            FilterOp::IsNull | FilterOp::IsNotNull | FilterOp::Glob | FilterOp::Regex => {
                panic!("{self} is not an ordering comparison")
            }
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
