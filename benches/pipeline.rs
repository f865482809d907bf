//! Benchmarks for the install pipeline.
//!
//! Measures composing and finalizing the built-in units, finalizing large
//! operation logs, and a full install against an in-memory store.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use stackweave::config::Layout;
use stackweave::mutation::{MutationSet, Operation};
use stackweave::options::{Options, RawOptions};
use stackweave::phases::{compose, orchestrator};
use stackweave::store::MemoryStore;
use stackweave::tasks::RecordingTaskRunner;
use stackweave::units::Registry;

fn option_sets() -> Vec<(&'static str, RawOptions)> {
    vec![
        ("react_ts", RawOptions::new()),
        (
            "vue_js_ssr",
            RawOptions::new()
                .with("framework", "vue")
                .with("typescript", "false")
                .with("ssr", "true"),
        ),
        ("svelte_ts_ssr", RawOptions::new().with("framework", "svelte").with("ssr", "true")),
    ]
}

/// Benchmarks Compose followed by Finalize for the built-in units.
fn bench_compose_finalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("compose_finalize");
    let registry = Registry::builtin();

    for (name, raw) in option_sets() {
        let (options, _) = Options::validate(&raw);
        group.bench_with_input(BenchmarkId::from_parameter(name), &options, |b, options| {
            b.iter(|| {
                let mut set = MutationSet::new();
                compose::execute(&registry, black_box(options), &mut set);
                set.finalize()
            })
        });
    }

    group.finish();
}

/// Benchmarks Finalize on synthetic logs with many duplicate assertions.
fn bench_finalize_large_log(c: &mut Criterion) {
    let mut group = c.benchmark_group("finalize_large_log");

    for size in [100usize, 1_000] {
        let mut set = MutationSet::new();
        for i in 0..size {
            let origin = format!("unit-{}", i % 10);
            set.append(&origin, Operation::dependency(format!("pkg-{}", i % 50), "^1.0.0"));
            set.append(
                &origin,
                Operation::config("bench", format!("key_{}", i % 25), (i % 25) as u64),
            );
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), &set, |b, set| {
            b.iter(|| black_box(set.clone()).finalize())
        });
    }

    group.finish();
}

/// Benchmarks a complete install, first run and re-run.
fn bench_full_install(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_install");
    let registry = Registry::builtin();
    let layout = Layout::default();
    let raw = RawOptions::new();

    group.bench_function("fresh", |b| {
        b.iter(|| {
            let mut store = MemoryStore::new();
            orchestrator::run(
                &registry,
                black_box(&raw),
                &layout,
                &mut store,
                &mut RecordingTaskRunner::new(),
            )
        })
    });

    let mut installed = MemoryStore::new();
    let _ = orchestrator::run(
        &registry,
        &raw,
        &layout,
        &mut installed,
        &mut RecordingTaskRunner::new(),
    );
    group.bench_function("rerun", |b| {
        b.iter(|| {
            let mut store = installed.clone();
            orchestrator::run(
                &registry,
                black_box(&raw),
                &layout,
                &mut store,
                &mut RecordingTaskRunner::new(),
            )
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_compose_finalize,
    bench_finalize_large_log,
    bench_full_install,
);
criterion_main!(benches);
