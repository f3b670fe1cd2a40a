//! Row containers shared by storages, overlays and the executor.

mod bit_vector;
mod row_selection;
mod string_pool;

pub use bit_vector::{BitVector, BitVectorBuilder};
pub use row_selection::{OptimizeFor, Range, RowIter, RowSelection, SMALL_RANGE_LIMIT};
pub use string_pool::{StringId, StringPool};
