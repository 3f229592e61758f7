use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use isoimpute::imputation::{HybridConfig, HybridImputer, Imputer, KnnImputer};
use ndarray::Array2;
use rand::prelude::*;

fn create_dataset(n_rows: usize, n_cols: usize, missing_frac: f64) -> Array2<f64> {
    let mut rng = rand::thread_rng();

    let mut x = Array2::zeros((n_rows, n_cols));
    for r in 0..n_rows {
        let base = r as f64 * 0.1;
        for c in 0..n_cols {
            x[[r, c]] = base * (c as f64 + 1.0) + rng.gen::<f64>() * 0.05;
        }
    }

    // Keep the first row fully observed so every column retains donors.
    for r in 1..n_rows {
        for c in 0..n_cols {
            if rng.gen::<f64>() < missing_frac {
                x[[r, c]] = f64::NAN;
            }
        }
    }

    x
}

fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn");

    for n_rows in [40, 80].iter() {
        let x = create_dataset(*n_rows, 6, 0.15);
        let imputer = KnnImputer::new(5);

        group.bench_with_input(BenchmarkId::new("impute", n_rows), &x, |b, x| {
            b.iter(|| imputer.impute(black_box(x)).unwrap())
        });
    }

    group.finish();
}

fn bench_hybrid(c: &mut Criterion) {
    let mut group = c.benchmark_group("hybrid");
    group.sample_size(10);

    for n_rows in [40, 80].iter() {
        let x = create_dataset(*n_rows, 6, 0.15);
        let imputer = HybridImputer::new(
            HybridConfig::default()
                .with_tree_count(25)
                .with_max_iterations(5),
        )
        .unwrap();

        group.bench_with_input(BenchmarkId::new("fit_transform", n_rows), &x, |b, x| {
            b.iter(|| imputer.fit_transform(black_box(x)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_knn, bench_hybrid);
criterion_main!(benches);
