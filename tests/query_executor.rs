use std::sync::Arc;

use regex::Regex;
use strata::{
    build_chain,
    column::{
        ArrangementOverlay, DenseNullOverlay, IdStorage, NullOverlay, NumericStorage, RangeOverlay,
        SelectorOverlay, SetIdStorage, StringStorage,
    },
    containers::{StringId, StringPool},
    query, BitVector, Constraint, DataChain, FilterOp, Order, Overlay, QueryExecutor, Range,
    RowSelection, Storage, Value,
};

const SEEDS: u64 = 128;

const OPS: [FilterOp; 10] = [
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

const WORDS: [&str; 8] = ["ant", "bat", "bee", "cat", "cow", "doe", "dog", "eel"];
const OUTSIDERS: [&str; 5] = ["a", "cz", "d", "zz", "bee"];
const GLOBS: [&str; 6] = ["c*", "*o*", "?o?", "b[ae]*", "dog", "*t"];
const REGEXES: [&str; 5] = ["^c", "t$", "o.", "^(ant|eel)$", "e+"];

fn sorted(selection: &RowSelection) -> Vec<u32> {
    let mut indices = selection.all_indices();
    indices.sort_unstable();
    indices
}

/// One table-space value as the reference evaluator sees it.
#[derive(Clone, Debug, PartialEq)]
enum Cell {
    Int(i64),
    Real(f64),
    Text(&'static str),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Kind {
    Integer,
    Real,
    Text,
}

/// `*`, `?` and plain character classes.
fn glob_matches(pattern: &str, text: &str) -> bool {
    fn walk(p: &[char], t: &[char]) -> bool {
        match p.split_first() {
            None => t.is_empty(),
            Some(('*', rest)) => (0..=t.len()).any(|skip| walk(rest, &t[skip..])),
            Some(('?', rest)) => !t.is_empty() && walk(rest, &t[1..]),
            Some(('[', rest)) => {
                let close = rest.iter().position(|c| *c == ']').unwrap();
                !t.is_empty() && rest[..close].contains(&t[0]) && walk(&rest[close + 1..], &t[1..])
            }
            Some((c, rest)) => t.first() == Some(c) && walk(rest, &t[1..]),
        }
    }
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    walk(&p, &t)
}

/// Reference semantics: numbers sort before strings, NULL only answers the
/// null checks and NaN is unordered.
fn holds(op: FilterOp, value: &Value, cell: Option<&Cell>) -> bool {
    match op {
        FilterOp::IsNull => return cell.is_none(),
        FilterOp::IsNotNull => return cell.is_some(),
        _ => {}
    }
    let Some(cell) = cell else {
        return false;
    };
    match (cell, value) {
        (Cell::Text(s), Value::String(p)) => match op {
            FilterOp::Glob => glob_matches(p, s),
            FilterOp::Regex => Regex::new(p).unwrap().is_match(s),
            _ => op.test_ordering((*s).cmp(p.as_str())),
        },
        (Cell::Text(_), _) => matches!(op, FilterOp::Gt | FilterOp::Ge),
        (_, Value::String(_)) => matches!(op, FilterOp::Lt | FilterOp::Le),
        (cell, value) => {
            if op.is_pattern() {
                return false;
            }
            let lhs = match cell {
                Cell::Int(v) => *v as f64,
                Cell::Real(v) => *v,
                Cell::Text(_) => unreachable!(),
            };
            match lhs.partial_cmp(&value.as_double().unwrap()) {
                Some(ordering) => op.test_ordering(ordering),
                None => op == FilterOp::Ne,
            }
        }
    }
}

fn random_word(rng: &mut fastrand::Rng) -> Option<&'static str> {
    if rng.u8(0..6) == 0 {
        None
    } else {
        Some(WORDS[rng.usize(0..WORDS.len())])
    }
}

fn string_storage(words: &[Option<&'static str>], is_sorted: bool) -> Box<dyn Storage> {
    let mut pool = StringPool::new();
    let data: Vec<StringId> = words.iter().map(|w| pool.intern_nullable(*w)).collect();
    Box::new(StringStorage::new(Arc::new(pool), data, is_sorted))
}

/// Table-space values of a column together with the layers producing them.
struct RandomColumn {
    kind: Kind,
    storage: Box<dyn Storage>,
    overlays: Vec<Box<dyn Overlay>>,
    values: Vec<Option<Cell>>,
}

impl RandomColumn {
    fn leaf(rng: &mut fastrand::Rng) -> (Kind, Box<dyn Storage>, Vec<Option<Cell>>) {
        let len = rng.u32(1..200);
        let ints = |data: &[i64]| -> Vec<Option<Cell>> {
            data.iter().map(|v| Some(Cell::Int(*v))).collect()
        };
        match rng.u8(0..7) {
            0 | 1 => {
                let is_sorted = rng.bool();
                let mut data: Vec<i64> = (0..len).map(|_| rng.i64(-3..12)).collect();
                if is_sorted {
                    data.sort_unstable();
                }
                let values = ints(&data);
                (Kind::Integer, Box::new(NumericStorage::new(data, is_sorted)), values)
            }
            2 => {
                let data: Vec<i64> = (0..i64::from(len)).collect();
                (Kind::Integer, Box::new(IdStorage::new(len)), ints(&data))
            }
            3 => {
                let mut data: Vec<u32> = Vec::with_capacity(len as usize);
                for i in 0..len {
                    let head = match data.last() {
                        Some(last) if rng.u8(0..3) != 0 => *last,
                        _ => i,
                    };
                    data.push(head);
                }
                let values = ints(&data.iter().map(|v| i64::from(*v)).collect::<Vec<_>>());
                (Kind::Integer, Box::new(SetIdStorage::new(data)), values)
            }
            4 => {
                let is_sorted = rng.bool();
                let mut data: Vec<f64> = (0..len).map(|_| rng.i64(-6..24) as f64 / 2.0).collect();
                if is_sorted {
                    data.sort_unstable_by(f64::total_cmp);
                }
                let values = data.iter().map(|v| Some(Cell::Real(*v))).collect();
                (Kind::Real, Box::new(NumericStorage::new(data, is_sorted)), values)
            }
            _ => {
                let is_sorted = rng.bool();
                let mut words: Vec<Option<&'static str>> =
                    (0..len).map(|_| random_word(rng)).collect();
                if is_sorted {
                    words.sort_unstable();
                }
                let values = words.iter().map(|w| w.map(Cell::Text)).collect();
                (Kind::Text, string_storage(&words, is_sorted), values)
            }
        }
    }

    fn generate(rng: &mut fastrand::Rng) -> Self {
        let (kind, storage, mut values) = Self::leaf(rng);
        let mut overlays: Vec<Box<dyn Overlay>> = Vec::new();
        let mut has_nulls = false;

        for _ in 0..rng.usize(0..4) {
            let current = values.len() as u32;
            if current == 0 {
                break;
            }
            match rng.u8(0..5) {
                0 => {
                    let bits: Vec<bool> = (0..current).map(|_| rng.u8(0..10) < 7).collect();
                    values = values
                        .iter()
                        .zip(&bits)
                        .filter(|(_, keep)| **keep)
                        .map(|(v, _)| v.clone())
                        .collect();
                    let ratio = if rng.bool() { 1 } else { 1000 };
                    overlays.push(Box::new(
                        SelectorOverlay::new(BitVector::from(bits.as_slice())).with_select_ratio(ratio),
                    ));
                }
                1 if !has_nulls => {
                    has_nulls = true;
                    let mut bits = vec![true; current as usize];
                    bits.extend(std::iter::repeat(false).take(rng.usize(0..=current as usize)));
                    rng.shuffle(&mut bits);
                    let mut inner = values.iter();
                    values = bits
                        .iter()
                        .map(|set| if *set { inner.next().cloned().flatten() } else { None })
                        .collect();
                    overlays.push(Box::new(NullOverlay::new(BitVector::from(bits.as_slice()))));
                }
                2 if !has_nulls => {
                    has_nulls = true;
                    let bits: Vec<bool> = (0..current).map(|_| rng.bool()).collect();
                    values = values
                        .iter()
                        .zip(&bits)
                        .map(|(v, set)| if *set { v.clone() } else { None })
                        .collect();
                    overlays.push(Box::new(DenseNullOverlay::new(BitVector::from(
                        bits.as_slice(),
                    ))));
                }
                3 => {
                    let sorted = rng.bool();
                    let mut arrangement: Vec<u32> = (0..rng.u32(1..2 * current + 1))
                        .map(|_| rng.u32(0..current))
                        .collect();
                    if sorted {
                        arrangement.sort_unstable();
                    }
                    values = arrangement.iter().map(|i| values[*i as usize].clone()).collect();
                    overlays.push(Box::new(ArrangementOverlay::new(arrangement)));
                }
                _ => {
                    let start = rng.u32(0..=current);
                    let end = rng.u32(start..=current);
                    values = values[start as usize..end as usize].to_vec();
                    overlays.push(Box::new(RangeOverlay::new(Range::new(start, end))));
                }
            }
        }
        Self {
            kind,
            storage,
            overlays,
            values,
        }
    }

    fn chain(&self) -> Box<dyn DataChain + '_> {
        let overlays: Vec<&dyn Overlay> = self.overlays.iter().map(|o| &**o).collect();
        build_chain(&*self.storage, &overlays)
    }

    fn expected(&self, op: FilterOp, value: &Value, selection: &RowSelection) -> Vec<u32> {
        let mut expected: Vec<u32> = selection
            .all_indices()
            .into_iter()
            .filter(|i| holds(op, value, self.values[*i as usize].as_ref()))
            .collect();
        expected.sort_unstable();
        expected
    }
}

fn random_selection(rng: &mut fastrand::Rng, size: u32) -> RowSelection {
    match rng.u8(0..4) {
        0 => RowSelection::range(0, size),
        1 => {
            let start = rng.u32(0..=size);
            RowSelection::range(start, rng.u32(start..=size))
        }
        2 => (0..size).map(|_| rng.bool()).collect::<BitVector>().into(),
        _ => {
            let len = rng.usize(0..=size as usize * 2);
            let indices: Vec<u32> = (0..len).map(|_| rng.u32(0..size)).collect();
            indices.into()
        }
    }
}

fn random_number(rng: &mut fastrand::Rng) -> Value {
    match rng.u8(0..10) {
        0 => Value::Double(f64::NAN),
        1 | 2 => Value::Double(rng.i64(-4..13) as f64 + 0.5),
        _ => Value::Long(rng.i64(-4..13)),
    }
}

fn random_value(rng: &mut fastrand::Rng, op: FilterOp, kind: Kind) -> Value {
    match op {
        FilterOp::IsNull | FilterOp::IsNotNull => return Value::Null,
        FilterOp::Glob => return Value::from(GLOBS[rng.usize(0..GLOBS.len())]),
        FilterOp::Regex => return Value::from(REGEXES[rng.usize(0..REGEXES.len())]),
        _ => {}
    }
    match kind {
        Kind::Text if rng.u8(0..8) == 0 => random_number(rng),
        Kind::Text if rng.bool() => Value::from(OUTSIDERS[rng.usize(0..OUTSIDERS.len())]),
        Kind::Text => Value::from(WORDS[rng.usize(0..WORDS.len())]),
        Kind::Integer | Kind::Real if rng.u8(0..12) == 0 => Value::from("m"),
        Kind::Integer | Kind::Real => random_number(rng),
    }
}

#[test]
fn bounded_and_index_search_agree() {
    let mut kinds = Vec::new();
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed);
        let column = RandomColumn::generate(&mut rng);
        kinds.push(column.kind);
        let chain = column.chain();
        let size = chain.size();
        assert_eq!(size as usize, column.values.len(), "seed {seed}");
        if size == 0 {
            continue;
        }

        for _ in 0..12 {
            let op = OPS[rng.usize(0..OPS.len())];
            let value = random_value(&mut rng, op, column.kind);
            let start = random_selection(&mut rng, size);
            let expected = column.expected(op, &value, &start);

            let mut bounded = start.clone();
            QueryExecutor::bounded_column_filter(&*chain, op, &value, &mut bounded);
            let mut indexed = start.clone();
            QueryExecutor::index_column_filter(&*chain, op, &value, &mut indexed);

            assert_eq!(sorted(&bounded), expected, "seed {seed}: bounded {op} {value:?}");
            assert_eq!(sorted(&indexed), expected, "seed {seed}: index {op} {value:?}");
        }
    }
    for kind in [Kind::Integer, Kind::Real, Kind::Text] {
        assert!(kinds.contains(&kind), "{kind:?} never generated");
    }
}

#[test]
fn glob_reference_agrees_with_examples() {
    assert!(glob_matches("c*", "cow"));
    assert!(glob_matches("?o?", "dog"));
    assert!(!glob_matches("?o?", "doe!"));
    assert!(glob_matches("b[ae]*", "bat"));
    assert!(!glob_matches("b[ae]*", "cat"));
    assert!(glob_matches("*t", "ant"));
}

#[test]
fn executor_matches_reference_over_constraint_lists() {
    for seed in 0..SEEDS {
        let mut rng = fastrand::Rng::with_seed(seed ^ 0x5eed);
        let row_count = rng.u32(1..300);
        let a: Vec<i64> = (0..row_count).map(|_| rng.i64(0..10)).collect();
        let b: Vec<i64> = (0..row_count).map(|_| rng.i64(0..10)).collect();
        let a_storage = NumericStorage::new(a.clone(), false);
        let b_storage = NumericStorage::new(b.clone(), false);
        let ids = IdStorage::new(row_count);
        let columns = vec![ids.make_chain(), a_storage.make_chain(), b_storage.make_chain()];

        let constraints: Vec<Constraint> = (0..rng.usize(1..4))
            .map(|_| {
                let column = rng.u32(0..3);
                let op = OPS[rng.usize(0..6)];
                Constraint::new(column, op, rng.i64(-1..11))
            })
            .collect();

        let res = query::filter(&columns, row_count, &constraints);
        let expected: Vec<u32> = (0..row_count)
            .filter(|row| {
                constraints.iter().all(|c| {
                    let v = match c.column_index {
                        0 => i64::from(*row),
                        1 => a[*row as usize],
                        _ => b[*row as usize],
                    };
                    holds(c.op, &c.value, Some(&Cell::Int(v)))
                })
            })
            .collect();
        assert_eq!(sorted(&res), expected, "seed {seed}: {constraints:?}");
    }
}

#[test]
fn id_storage_equality_windows() {
    let storage = IdStorage::new(100);
    let chain = storage.make_chain();
    assert_eq!(
        chain.search(FilterOp::Eq, &Value::Long(15), Range::new(10, 20)),
        Range::new(15, 16).into()
    );
    assert_eq!(
        chain
            .search(FilterOp::Eq, &Value::Long(25), Range::new(10, 20))
            .count(),
        0
    );
}

#[test]
fn unsorted_numeric_window() {
    let storage = NumericStorage::new(vec![-5i64, 5, -4, 4, -3, 3, 0], false);
    let chain = storage.make_chain();
    let bv = chain
        .search(FilterOp::Lt, &Value::Long(4), Range::new(1, 5))
        .into_bit_vector(7);
    assert_eq!(bv.set_bit_indices(), vec![2, 4]);
}

#[test]
fn arrangement_duplicates_matches() {
    let storage = NumericStorage::new(vec![0u32, 7, 0, 7, 0], false);
    let arrangement = ArrangementOverlay::new(vec![1, 1, 2, 2, 3, 3, 4, 4, 1, 1]);
    let chain = build_chain(&storage, &[&arrangement]);
    let bv = chain
        .search(FilterOp::Eq, &Value::Long(7), Range::new(0, 10))
        .into_bit_vector(10);
    assert_eq!(bv.set_bit_indices(), vec![0, 1, 4, 5, 8, 9]);
}

#[test]
fn null_overlay_is_null() {
    let mask = [
        true, true, false, false, true, true, false, false, true, true, true, false,
    ];
    let storage = NumericStorage::new(vec![1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], false);
    let nulls = NullOverlay::new(BitVector::from(mask));
    let chain = build_chain(&storage, &[&nulls]);
    let bv = chain
        .search(FilterOp::IsNull, &Value::Null, Range::new(0, 12))
        .into_bit_vector(12);
    assert_eq!(bv.set_bit_indices(), vec![2, 3, 6, 7, 11]);
}

#[test]
fn null_and_selector_chain_strategies_agree() {
    let storage = NumericStorage::new(vec![0u32, 1, 2, 3, 0, 1, 2, 3], false);
    let selector = SelectorOverlay::new(BitVector::from([
        true, true, false, true, true, true, false, true,
    ]));
    let nulls = NullOverlay::new(BitVector::from([
        true, false, true, true, true, true, false, true,
    ]));
    // Table values: [0, null, 1, 3, 0, 1, null, 3]
    let chain = build_chain(&storage, &[&selector, &nulls]);
    let value = Value::Long(2);

    for start in [
        RowSelection::range(0, 8),
        RowSelection::from((0..8).collect::<Vec<u32>>()),
        RowSelection::from(BitVector::with_len(8, true)),
    ] {
        let mut bounded = start.clone();
        QueryExecutor::bounded_column_filter(&*chain, FilterOp::Ge, &value, &mut bounded);
        let mut indexed = start;
        QueryExecutor::index_column_filter(&*chain, FilterOp::Ge, &value, &mut indexed);
        assert_eq!(sorted(&bounded), vec![3, 7]);
        assert_eq!(sorted(&indexed), vec![3, 7]);
    }
}

#[test]
fn string_column_filters_and_sorts() {
    let mut pool = StringPool::new();
    let names = ["cat", "dog", "", "cow", "ant", "dog"];
    let mut data: Vec<StringId> = names.iter().map(|n| pool.intern(n)).collect();
    data[2] = StringId::NULL;
    let strings = StringStorage::new(Arc::new(pool), data, false);
    let ids = IdStorage::new(6);
    let columns = vec![ids.make_chain(), strings.make_chain()];
    let executor = QueryExecutor::new(&columns, 6);

    let res = executor.filter(&[Constraint::new(1, FilterOp::Glob, "c*")]);
    assert_eq!(res.all_indices(), vec![0, 3]);

    let res = executor.filter(&[
        Constraint::new(0, FilterOp::Ge, 1i64),
        Constraint::new(1, FilterOp::Eq, "dog"),
    ]);
    assert_eq!(res.all_indices(), vec![1, 5]);

    let res = executor.filter(&[Constraint::is_null(1)]);
    assert_eq!(res.all_indices(), vec![2]);

    let res = executor.filter(&[Constraint::new(1, FilterOp::Regex, "^c.w$")]);
    assert_eq!(res.all_indices(), vec![3]);

    let sorted = executor.sort(&RowSelection::range(0, 6), &[Order::asc(1), Order::desc(0)]);
    assert_eq!(sorted.all_indices(), vec![2, 4, 0, 3, 5, 1]);
}

#[test]
fn set_id_column_groups() {
    let storage = SetIdStorage::new(vec![0, 0, 0, 3, 3, 5, 6, 6]);
    let columns = vec![storage.make_chain()];
    let executor = QueryExecutor::new(&columns, 8);
    assert_eq!(
        executor
            .filter(&[Constraint::new(0, FilterOp::Eq, 3i64)])
            .all_indices(),
        vec![3, 4]
    );
    assert_eq!(
        executor
            .filter(&[Constraint::new(0, FilterOp::Gt, 3i64)])
            .all_indices(),
        vec![5, 6, 7]
    );
    let mut selection = RowSelection::from(vec![7, 0, 4]);
    executor.filter_column(&Constraint::new(0, FilterOp::Ne, 3i64), &mut selection);
    assert_eq!(selection.all_indices(), vec![0, 7]);
}
