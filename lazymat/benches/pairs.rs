use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lazymat::{Data, PairReader, Pairs, ReadOptions, Reader, ReaderExt, Resolved, Selector};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

fn labels(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

fn bench_pair_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairs_get");
    for size in [1_000usize, 100_000] {
        let mut list1 = labels("a", size / 2);
        list1.extend(labels("b", size / 2));
        let pairs = Pairs::new(labels("a", size), list1, false);
        let count = pairs.count();
        let mut rng = StdRng::seed_from_u64(42);
        let lookups: Vec<usize> = (0..1_000).map(|_| rng.gen_range(0..count)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(size), &lookups, |b, lookups| {
            b.iter(|| {
                for &k in lookups {
                    black_box(pairs.get(k));
                }
            })
        });
    }
    group.finish();
}

fn bench_pair_range(c: &mut Criterion) {
    let pairs = Pairs::new(labels("s", 5_000), labels("s", 5_000), false);
    let start = pairs.count() / 2;
    c.bench_function("pairs_range_10k", |b| {
        b.iter(|| pairs.range(start, start + 10_000).count())
    });
}

fn bench_pair_reader(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let val = Array2::from_shape_fn((500, 200), |_| rng.gen_range(0..3) as f64).into_dyn();
    let data = Arc::new(Data::<f64>::try_from(val).expect("bench data"));
    let reader = Arc::new(PairReader::within(data).expect("pair reader"));
    let view = reader
        .subset(.., Selector::slice(Some(5_000), Some(6_000), 1))
        .expect("subset");

    c.bench_function("pair_reader_read_1k_columns", |b| {
        b.iter(|| {
            let out = view
                .read_val::<f32>(
                    &Resolved::Full(500),
                    &Resolved::Full(1_000),
                    &ReadOptions::default().with_num_threads(1),
                )
                .expect("read");
            black_box(out)
        })
    });

    c.bench_function("pair_reader_col_count", |b| {
        b.iter(|| black_box(reader.col_count().expect("count")))
    });
}

criterion_group!(benches, bench_pair_lookup, bench_pair_range, bench_pair_reader);
criterion_main!(benches);
