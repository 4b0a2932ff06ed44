use criterion::{black_box, criterion_group, criterion_main, Criterion};
use price_analysis::significance::{kruskal_wallis, mann_whitney_u, spearman, tukey_hsd};

fn sample(len: usize, offset: f64) -> Vec<f64> {
    // Deterministic spread without ties.
    (0..len)
        .map(|i| offset + ((i * 37) % 101) as f64 * 0.13 + i as f64 * 1e-4)
        .collect()
}

fn benchmark_tukey(c: &mut Criterion) {
    let mut values = Vec::new();
    let mut groups = Vec::new();
    for (label, offset) in [("Pre-COVID", 0.0), ("During-COVID", 1.5), ("Post-COVID", 0.7)] {
        values.extend(sample(60, offset));
        groups.extend(std::iter::repeat(label.to_string()).take(60));
    }

    c.bench_function("tukey_hsd_3x60", |b| {
        b.iter(|| black_box(tukey_hsd(&values, &groups, 0.05)));
    });
}

fn benchmark_kruskal(c: &mut Criterion) {
    let east = sample(200, 0.0);
    let west = sample(200, 0.4);
    let interior = sample(200, 0.2);

    c.bench_function("kruskal_wallis_3x200", |b| {
        b.iter(|| {
            let samples: [&[f64]; 3] = [&east, &west, &interior];
            black_box(kruskal_wallis(&samples))
        });
    });
}

fn benchmark_mann_whitney(c: &mut Criterion) {
    let urban = sample(8, 0.0);
    let rural = sample(300, 0.3);
    let large = sample(300, 0.1);

    c.bench_function("mann_whitney_exact_8x300", |b| {
        b.iter(|| black_box(mann_whitney_u(&urban, &rural)));
    });
    c.bench_function("mann_whitney_asymptotic_300x300", |b| {
        b.iter(|| black_box(mann_whitney_u(&large, &rural)));
    });
}

fn benchmark_spearman(c: &mut Criterion) {
    let income = sample(500, 800.0);
    let price = sample(500, 3.0);

    c.bench_function("spearman_500", |b| {
        b.iter(|| black_box(spearman(&income, &price)));
    });
}

criterion_group!(
    benches,
    benchmark_tukey,
    benchmark_kruskal,
    benchmark_mann_whitney,
    benchmark_spearman
);
criterion_main!(benches);
