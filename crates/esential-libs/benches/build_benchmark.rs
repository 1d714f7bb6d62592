use criterion::{criterion_group, criterion_main, Criterion};
use esential::{CompileOptions, Esential, LibArgs};
use esential_libs::{mount, LIBRARIES};
use std::hint::black_box;

fn build_all(options: &CompileOptions) -> usize {
    LIBRARIES
        .iter()
        .map(|name| {
            let mut esen = Esential::new();
            mount(&mut esen, name, &LibArgs::new()).unwrap();
            esen.compile(options).unwrap().len()
        })
        .sum()
}

fn build_optimized_bench(c: &mut Criterion) {
    let options = CompileOptions::default();
    c.bench_function("build + compile all demo libraries", |b| {
        b.iter(|| build_all(black_box(&options)))
    });
}

fn build_unoptimized_bench(c: &mut Criterion) {
    let options = CompileOptions {
        optimize: false,
        validate: false,
        ..CompileOptions::default()
    };
    c.bench_function("build + compile all demo libraries, no passes", |b| {
        b.iter(|| build_all(black_box(&options)))
    });
}

// ─── Runtime ─────────────────────────────────────────────────────────────────

fn sum_to_bench(c: &mut Criterion) {
    let mut esen = Esential::new();
    mount(&mut esen, "loop", &LibArgs::new()).unwrap();
    let mut instance = esen.start(&CompileOptions::default()).unwrap();
    c.bench_function("sumTo 1000", |b| {
        b.iter(|| {
            instance
                .call_typed::<i32, i32>("sumTo", black_box(1000))
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    build_optimized_bench,
    build_unoptimized_bench,
    sum_to_bench
);
criterion_main!(benches);
