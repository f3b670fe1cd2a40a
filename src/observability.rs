//! Logging infrastructure for strata.
//!
//! strata uses `tracing` for structured logging. All events use target
//! "strata" and include an `event` field for filtering.
//!
//! The engine never initializes a global subscriber; embedding applications
//! configure one themselves.
//!
//! ## Conventions
//!
//! - `event`: snake_case event name (required)
//! - `component`: subsystem (e.g. "executor", "null_overlay", "numeric")
//! - Use `%` for Display, `?` for Debug formatting
//! - Per-search events are `trace`; per-constraint events are `debug`

/// Target for all strata log events.
pub(crate) const STRATA_TARGET: &str = "strata";

/// Macro for debug-level log events.
///
/// # Example
/// ```ignore
/// log_debug!(
///     component = "executor",
///     event = "constraint_applied",
///     strategy = "bounded",
///     rows_before = before,
///     rows_after = after,
/// );
/// ```
macro_rules! log_debug {
    ($($field:tt)*) => {
        ::tracing::debug!(target: $crate::observability::STRATA_TARGET, $($field)*)
    };
}

/// Macro for trace-level log events.
macro_rules! log_trace {
    ($($field:tt)*) => {
        ::tracing::trace!(target: $crate::observability::STRATA_TARGET, $($field)*)
    };
}

/// Macro for warn-level log events.
macro_rules! log_warn {
    ($($field:tt)*) => {
        ::tracing::warn!(target: $crate::observability::STRATA_TARGET, $($field)*)
    };
}

pub(crate) use log_debug;
pub(crate) use log_trace;
pub(crate) use log_warn;
