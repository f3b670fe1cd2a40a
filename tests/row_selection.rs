use strata::{
    containers::{OptimizeFor, SMALL_RANGE_LIMIT},
    BitVector, Range, RowSelection,
};

fn encodings(indices: &[u32], len: u32) -> Vec<RowSelection> {
    vec![
        RowSelection::from(indices.to_vec()),
        RowSelection::from(BitVector::from_indices(len, indices.iter().copied())),
    ]
}

#[test]
fn range_accessors() {
    let selection = RowSelection::range(10, 20);
    assert_eq!(selection.size(), 10);
    for row in 0..10 {
        assert_eq!(selection.get(row), 10 + row);
    }
    for index in 0..30 {
        assert_eq!(selection.contains(index), (10..20).contains(&index));
    }
    assert_eq!(selection.row_of(15), Some(5));
    assert_eq!(selection.row_of(20), None);
}

#[test]
fn get_and_row_of_are_inverse() {
    let indices = [1, 4, 5, 9, 12];
    for selection in encodings(&indices, 16) {
        assert_eq!(selection.size(), 5);
        for (row, index) in indices.iter().enumerate() {
            assert_eq!(selection.get(row as u32), *index);
            assert_eq!(selection.row_of(*index), Some(row as u32));
            assert!(selection.contains(*index));
        }
        assert!(!selection.contains(2));
        assert_eq!(selection.row_of(2), None);
    }
}

#[test]
fn insert_keeps_order() {
    let mut selection = RowSelection::range(2, 5);
    selection.insert(5);
    assert_eq!(selection.as_range(), Some(Range::new(2, 6)));
    selection.insert(9);
    assert!(selection.is_bit_vector());
    selection.insert(0);
    assert_eq!(selection.all_indices(), vec![0, 2, 3, 4, 5, 9]);

    let mut list = RowSelection::from(vec![1, 3, 8]);
    list.insert(4);
    assert_eq!(list.all_indices(), vec![1, 3, 4, 8]);
}

#[test]
fn select_rows_gathers() {
    let selector = RowSelection::from(vec![0, 3, 4, 4, 2]);
    for selection in encodings(&[0, 1, 4, 10, 11], 12) {
        let gathered = selection.select_rows(&selector);
        assert_eq!(gathered.all_indices(), vec![0, 10, 11, 11, 4]);
    }
    let single = RowSelection::range(5, 10).select_rows(&RowSelection::from(vec![3]));
    assert_eq!(single.as_range(), Some(Range::new(8, 9)));
}

#[test]
fn intersect_and_intersect_exact() {
    let mut range = RowSelection::range(0, 10);
    range.intersect(&RowSelection::range(5, 15));
    assert_eq!(range.as_range(), Some(Range::new(5, 10)));

    for mut selection in encodings(&[1, 4, 5, 9], 12) {
        selection.intersect(&RowSelection::range(3, 9));
        assert_eq!(selection.all_indices(), vec![4, 5]);
        selection.intersect_exact(5);
        assert_eq!(selection.all_indices(), vec![5]);
        selection.intersect_exact(4);
        assert!(selection.is_empty());
    }
}

#[test]
fn filter_is_idempotent() {
    let starts = vec![
        RowSelection::range(0, 100),
        RowSelection::range(0, 5000),
        RowSelection::from((0..50).collect::<Vec<u32>>()),
        RowSelection::from(BitVector::with_len(64, true)),
    ];
    for mut selection in starts {
        selection.filter(|i| i % 3 == 0);
        let once = selection.all_indices();
        selection.filter(|_| true);
        assert_eq!(selection.all_indices(), once);
        assert!(once.iter().all(|i| i % 3 == 0));
    }
}

#[test]
fn filter_picks_representation() {
    let mut small = RowSelection::range(0, SMALL_RANGE_LIMIT - 1);
    small.filter(|i| i % 2 == 0);
    assert!(small.is_index_vector());

    let mut dense = RowSelection::range(0, 1 << 20);
    dense.filter(|i| i % 2 == 0);
    assert!(dense.is_bit_vector());
    assert_eq!(dense.size(), 1 << 19);

    let mut fast = RowSelection::range(0, 1 << 20).with_optimize_for(OptimizeFor::LookupSpeed);
    fast.filter(|i| i % 2 == 0);
    assert!(fast.is_index_vector());
    assert_eq!(fast.optimize_for(), OptimizeFor::LookupSpeed);
}

#[test]
fn iteration_restarts() {
    for selection in encodings(&[3, 6, 7], 8) {
        let first: Vec<(u32, u32)> = selection.iter_rows().collect();
        let second: Vec<(u32, u32)> = selection.iter_rows().collect();
        assert_eq!(first, vec![(0, 3), (1, 6), (2, 7)]);
        assert_eq!(first, second);
    }
}

#[test]
fn extras() {
    let selection = RowSelection::from(vec![7, 2, 9]);
    assert_eq!(selection.max(), 10);
    assert_eq!(selection.as_index_vector(), Some(&[7, 2, 9][..]));

    let mut rows = vec![0, 1, 2];
    selection.stable_sort(&mut rows, |a, b| a.cmp(&b));
    assert_eq!(rows, vec![1, 0, 2]);
    assert_eq!(selection.clone().take_as_index_vector(), vec![7, 2, 9]);

    let mut cleared = selection;
    cleared.clear();
    assert!(cleared.is_empty());
    assert!(cleared.is_range());
}
