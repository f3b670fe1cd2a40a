use super::{DataChain, Overlay, Storage};

/// Realizes a column: the leaf chain of `storage`, wrapped by `overlays`
/// listed innermost first.
///
/// # Panics
///
/// Panics when an overlay does not fit the chain it wraps.
pub fn build_chain<'a>(
    storage: &'a dyn Storage,
    overlays: &[&'a dyn Overlay],
) -> Box<dyn DataChain + 'a> {
    overlays
        .iter()
        .fold(storage.make_chain(), |inner, overlay| overlay.make_chain(inner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        column::{
            ArrangementOverlay, FilterOp, IdStorage, Indices, NullOverlay, NumericStorage,
            RangeOverlay, SelectorOverlay, Value,
        },
        containers::{BitVector, Range},
        serdes::StorageDescriptor,
    };

    #[test]
    fn leaf_only() {
        let storage = IdStorage::new(10);
        let chain = build_chain(&storage, &[]);
        assert_eq!(chain.size(), 10);
        assert!(chain.as_overlay().is_none());
    }

    #[test]
    fn overlays_wrap_innermost_first() {
        let storage = NumericStorage::new(vec![0i64, 1, 2, 3, 0, 1, 2, 3], false);
        let selector = SelectorOverlay::new(BitVector::from([
            true, true, false, true, true, true, false, true,
        ]));
        let nulls = NullOverlay::new(BitVector::from([true, false, true, true, true, false, true, true]));
        let chain = build_chain(&storage, &[&selector, &nulls]);
        assert_eq!(chain.size(), 8);

        // Storage rows kept by the selector: [0, 1, 3, 4, 5, 7] -> [0, 1, 3, 0, 1, 3].
        // Table rows 1 and 5 are null.
        let bv = chain
            .search(FilterOp::Ge, &Value::Long(1), Range::new(0, 8))
            .into_bit_vector(8);
        assert_eq!(bv.set_bit_indices(), vec![2, 3, 6, 7]);

        let StorageDescriptor::Null { inner, .. } = chain.serialize() else {
            panic!("outermost layer should be the null overlay");
        };
        assert!(matches!(*inner, StorageDescriptor::Selector { .. }));
    }

    #[test]
    fn deep_chain_index_search() {
        let storage = IdStorage::new(20);
        let window = RangeOverlay::new(Range::new(5, 15));
        let arrangement = ArrangementOverlay::new(vec![9, 0, 4, 4, 7]);
        let chain = build_chain(&storage, &[&window, &arrangement]);
        assert_eq!(chain.size(), 5);
        let bv = chain
            .index_search(FilterOp::Lt, &Value::Long(10), Indices::detect(&[0, 1, 2, 3, 4]))
            .into_bit_vector(5);
        // Ids seen: [14, 5, 9, 9, 12].
        assert_eq!(bv.set_bit_indices(), vec![1, 2, 3]);
    }

    #[test]
    #[should_panic(expected = "exceeds inner size")]
    fn misfit_overlay_panics() {
        let storage = IdStorage::new(4);
        let window = RangeOverlay::new(Range::new(0, 5));
        build_chain(&storage, &[&window]);
    }
}
