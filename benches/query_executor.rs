use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use strata::{
    column::{NullOverlay, NumericStorage, SelectorOverlay},
    build_chain, BitVector, DataChain, FilterOp, Overlay, QueryExecutor, RowSelection, Storage,
    Value,
};

const ROWS: u32 = 1 << 16;

struct Column {
    storage: NumericStorage<i64>,
    selector: SelectorOverlay,
    nulls: NullOverlay,
}

impl Column {
    fn generate(rng: &mut fastrand::Rng) -> Self {
        let non_null = BitVector::range(0, ROWS, |_| rng.u8(..) > 25);
        let inner_len = non_null.count_set_bits();
        let data = (0..inner_len * 2).map(|_| rng.i64(0..1_000)).collect();
        let selector = BitVector::range(0, inner_len * 2, |i| i % 2 == 0);

        Self {
            storage: NumericStorage::new(data, false),
            selector: SelectorOverlay::new(selector),
            nulls: NullOverlay::new(non_null),
        }
    }

    fn chain(&self) -> Box<dyn DataChain + '_> {
        build_chain(
            &self.storage as &dyn Storage,
            &[&self.selector as &dyn Overlay, &self.nulls],
        )
    }
}

fn sparse_selection(rng: &mut fastrand::Rng, every: u32) -> RowSelection {
    BitVector::range(0, ROWS, |_| rng.u32(0..every) == 0).into()
}

fn column_filter(c: &mut Criterion) {
    let mut rng = fastrand::Rng::with_seed(42);
    let column = Column::generate(&mut rng);
    let chain = column.chain();
    let value = Value::Long(500);

    let mut group = c.benchmark_group("column_filter");
    for every in [2, 64, 1024] {
        let selection = sparse_selection(&mut rng, every);
        group.bench_with_input(BenchmarkId::new("bounded", every), &selection, |b, selection| {
            b.iter(|| {
                let mut rows = selection.clone();
                QueryExecutor::bounded_column_filter(&*chain, FilterOp::Lt, &value, &mut rows);
                black_box(rows)
            })
        });
        group.bench_with_input(BenchmarkId::new("index", every), &selection, |b, selection| {
            b.iter(|| {
                let mut rows = selection.clone();
                QueryExecutor::index_column_filter(&*chain, FilterOp::Lt, &value, &mut rows);
                black_box(rows)
            })
        });
    }
    group.finish();
}

criterion_group!(benches, column_filter);
criterion_main!(benches);
