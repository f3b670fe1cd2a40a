use thiserror::Error;

use super::{FilterOp, ValueType};

/// Reasons a constraint cannot be handed to the engine.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConstraintError {
    /// `NULL` compared with something other than `IS NULL` / `IS NOT NULL`.
    #[error("Comparison of NULL with {op} is not allowed; use IS NULL/IS NOT NULL")]
    NullComparison {
        /// Offending operator.
        op: FilterOp,
    },
    /// Pattern operator given a non-string value.
    #[error("{op} requires a string pattern, got {actual:?}")]
    InvalidPattern {
        /// Offending operator.
        op: FilterOp,
        /// Type of the supplied value.
        actual: ValueType,
    },
    /// Regular expression failed to compile.
    #[error("Invalid regular expression '{pattern}': {reason}")]
    InvalidRegex {
        /// Pattern as supplied.
        pattern: String,
        /// Compiler diagnostic.
        reason: String,
    },
}
