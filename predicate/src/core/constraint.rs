use super::{ConstraintError, FilterOp, Value};

/// A single filter over one column: `column <op> value`.
#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    /// Index of the filtered column.
    pub column_index: u32,
    /// Operator to apply.
    pub op: FilterOp,
    /// Right-hand side literal.
    pub value: Value,
}

impl Constraint {
    /// Creates a new constraint.
    #[must_use]
    pub fn new<V>(column_index: u32, op: FilterOp, value: V) -> Self
    where
        V: Into<Value>,
    {
        Self {
            column_index,
            op,
            value: value.into(),
        }
    }

    /// `column IS NULL`.
    #[must_use]
    pub fn is_null(column_index: u32) -> Self {
        Self::new(column_index, FilterOp::IsNull, Value::Null)
    }

    /// `column IS NOT NULL`.
    #[must_use]
    pub fn is_not_null(column_index: u32) -> Self {
        Self::new(column_index, FilterOp::IsNotNull, Value::Null)
    }

    /// Checks that the operator/value pairing can be evaluated.
    ///
    /// The engine treats malformed pairings reaching a storage as fatal, so
    /// callers run this before building a query.
    ///
    /// # Errors
    ///
    /// Returns [`ConstraintError`] when `NULL` is compared with an ordering or
    /// pattern operator, when a pattern operator gets a non-string value, or
    /// when a `REGEXP` pattern fails to compile.
    pub fn check(&self) -> Result<(), ConstraintError> {
        if self.value.is_null() && !self.op.is_null_check() {
            return Err(ConstraintError::NullComparison { op: self.op });
        }
        if self.op.is_pattern() {
            let Some(pattern) = self.value.as_str() else {
                return Err(ConstraintError::InvalidPattern {
                    op: self.op,
                    actual: self.value.value_type(),
                });
            };
            if self.op == FilterOp::Regex {
                if let Err(err) = regex::Regex::new(pattern) {
                    return Err(ConstraintError::InvalidRegex {
                        pattern: pattern.to_owned(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Sort key over one column.
///
/// Sorting is driven by the engine's executor through each column's
/// `stable_sort`; keys are applied with the first order being the most
/// significant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Order {
    /// Index of the sorted column.
    pub column_index: u32,
    /// True for descending order.
    pub descending: bool,
}

impl Order {
    /// Ascending order on `column_index`.
    #[must_use]
    pub fn asc(column_index: u32) -> Self {
        Self {
            column_index,
            descending: false,
        }
    }

    /// Descending order on `column_index`.
    #[must_use]
    pub fn desc(column_index: u32) -> Self {
        Self {
            column_index,
            descending: true,
        }
    }
}
