use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kommun_core::{Breakpoints, Palette, SortDirection};

fn sample(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| ((i * 7919) % 1009) as f64 * 0.37)
        .collect()
}

fn bench_breakpoints(c: &mut Criterion) {
    let mut group = c.benchmark_group("breakpoints");

    for size in [50usize, 290, 1_000, 10_000] {
        let values = sample(size);
        group.bench_with_input(BenchmarkId::new("compute", size), &values, |b, values| {
            b.iter(|| Breakpoints::compute(values.iter().copied()))
        });
    }

    group.finish();
}

fn bench_classify(c: &mut Criterion) {
    let values = sample(290);
    let breakpoints = Breakpoints::compute(values.iter().copied());
    let palette = Palette::default();

    c.bench_function("classify_290", |b| {
        b.iter(|| {
            values
                .iter()
                .map(|v| palette.color_of(Some(*v), &breakpoints, SortDirection::LowIsGood))
                .count()
        })
    });
}

criterion_group!(bucket_benches, bench_breakpoints, bench_classify);
criterion_main!(bucket_benches);
