use super::{
    DataChain, FilterOp, Indices, RangeOrBitVector, SearchValidationResult, SingleSearchResult,
    SortDirection, SortToken, Storage, Value,
};
use crate::{containers::Range, serdes::StorageDescriptor};

/// Placeholder for columns that exist in a schema but must never be queried.
///
/// Building a chain and asking its size is allowed; any evaluation panics.
#[derive(Debug, Clone, Copy, Default)]
pub struct DummyStorage {
    size: u32,
}

impl DummyStorage {
    pub fn new(size: u32) -> Self {
        Self { size }
    }
}

impl Storage for DummyStorage {
    fn make_chain(&self) -> Box<dyn DataChain + '_> {
        Box::new(DummyChain { size: self.size })
    }
}

#[derive(Debug)]
struct DummyChain {
    size: u32,
}

fn unreachable_column(operation: &str) -> ! {
    panic!("{operation} called on a dummy column")
}

impl DataChain for DummyChain {
    fn single_search(&self, _: FilterOp, _: &Value, _: u32) -> SingleSearchResult {
        unreachable_column("single_search")
    }

    fn validate_search_constraints(&self, _: FilterOp, _: &Value) -> SearchValidationResult {
        unreachable_column("validate_search_constraints")
    }

    fn search_validated(&self, _: FilterOp, _: &Value, _: Range) -> RangeOrBitVector {
        unreachable_column("search")
    }

    fn index_search_validated(&self, _: FilterOp, _: &Value, _: Indices<'_>) -> RangeOrBitVector {
        unreachable_column("index_search")
    }

    fn ordered_index_search_validated(&self, _: FilterOp, _: &Value, _: Indices<'_>) -> Range {
        unreachable_column("ordered_index_search")
    }

    fn stable_sort(&self, _: &mut [SortToken], _: SortDirection) {
        unreachable_column("stable_sort")
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn serialize(&self) -> StorageDescriptor<'_> {
        StorageDescriptor::Dummy
    }
}
