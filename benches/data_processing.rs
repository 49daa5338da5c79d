//! Benchmarks for derived-signal evaluation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use datavis_math::transform::rewrite_channels;
use datavis_math::{CompiledTransform, Definition, Point, Series, SeriesMap};

fn registry(size: usize) -> SeriesMap {
    let mut registry = SeriesMap::new();
    let mut linked = Series::new("x");
    let mut aux = Series::new("aux");
    for i in 0..size {
        let t = i as f64 * 0.001;
        linked.push_back(Point::new(t, (t * 10.0).sin()));
        // Auxiliary channel sampled at half the rate
        if i % 2 == 0 {
            aux.push_back(Point::new(t, t.cos()));
        }
    }
    registry.insert(linked);
    registry.insert(aux);
    registry
}

fn definition() -> Definition {
    Definition::new(
        "mag",
        "x",
        "let prev = 0.0;",
        "let m = sqrt($$x$$ * $$x$$ + $$aux$$ * $$aux$$); prev = m; m",
    )
}

fn bench_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("rebuild");

    for size in [1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("full", size), size, |b, &size| {
            let mut registry = registry(size);
            let mut transform = CompiledTransform::compile(definition()).unwrap();
            transform.register(&mut registry);
            b.iter(|| black_box(transform.rebuild(&mut registry).unwrap()));
        });
    }

    group.finish();
}

fn bench_incremental_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_update");

    for batch in [1, 10, 100].iter() {
        group.throughput(Throughput::Elements(*batch as u64));
        group.bench_with_input(BenchmarkId::new("append", batch), batch, |b, &batch| {
            let mut registry = registry(10_000);
            let mut transform = CompiledTransform::compile(definition()).unwrap();
            transform.register(&mut registry);
            transform.update(&mut registry).unwrap();

            let mut t = 10.0;
            b.iter(|| {
                let linked = registry.find_mut("x").unwrap();
                for _ in 0..batch {
                    t += 0.001;
                    linked.push_back(Point::new(t, t.sin()));
                }
                black_box(transform.update(&mut registry).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_alignment_lookup(c: &mut Criterion) {
    let registry = registry(100_000);
    let aux = registry.find("aux").unwrap();

    c.bench_function("value_at_or_before", |b| {
        let mut x = 0.0;
        b.iter(|| {
            x = (x + 0.0137) % 100.0;
            black_box(aux.value_at_or_before(x))
        });
    });
}

fn bench_macro_rewrite(c: &mut Criterion) {
    let expression = "($$speed$$ - $$speed_ref$$) * $$gain$$ + $$x$$ / $$scale$$ - $$speed$$";

    c.bench_function("rewrite_channels", |b| {
        b.iter(|| black_box(rewrite_channels(black_box(expression), "x").unwrap()))
    });
}

criterion_group!(
    benches,
    bench_rebuild,
    bench_incremental_update,
    bench_alignment_lookup,
    bench_macro_rewrite
);
criterion_main!(benches);
