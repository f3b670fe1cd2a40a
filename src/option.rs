/// Tunables for [`QueryExecutor`](crate::query::QueryExecutor).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutorOptions {
    pub(crate) index_search_max_rows: u32,
    pub(crate) index_search_sparsity: u32,
    pub(crate) single_row_fast_path: bool,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        ExecutorOptions {
            index_search_max_rows: 1024,
            index_search_sparsity: 10,
            single_row_fast_path: true,
        }
    }
}

impl ExecutorOptions {
    /// Selections with fewer rows than this are searched index by index.
    pub fn index_search_max_rows(self, index_search_max_rows: u32) -> Self {
        ExecutorOptions {
            index_search_max_rows,
            ..self
        }
    }

    /// A selection whose size times this factor is below its span is searched
    /// index by index.
    pub fn index_search_sparsity(self, index_search_sparsity: u32) -> Self {
        ExecutorOptions {
            index_search_sparsity,
            ..self
        }
    }

    pub fn single_row_fast_path(self, single_row_fast_path: bool) -> Self {
        ExecutorOptions {
            single_row_fast_path,
            ..self
        }
    }

    /// Whether a non-range selection of `size` rows spanning `[first, last]`
    /// should use index probing.
    pub(crate) fn prefers_index_search(&self, size: u32, first: u32, last: u32) -> bool {
        size < self.index_search_max_rows
            || u64::from(size) * u64::from(self.index_search_sparsity)
                < u64::from(last - first)
    }
}
