//! Criterion benchmarks for the treap-backed `Timeline` (spec §4.7),
//! mirroring the size-ladder shape of the pipeline benchmark this
//! crate is modeled on.
//!
//! Run with: `cargo bench -p codefang-bench --bench treap`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use codefang_timeline::Timeline;

const SEED: u64 = 0x5151_C0DE;

fn bench_new(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_new");
    for &lines in &[100u32, 1_000, 10_000, 100_000] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter(|| Timeline::new(0, lines, SEED));
        });
    }
    group.finish();
}

fn bench_replace_sequential_edits(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_replace_sequential");
    for &lines in &[1_000u32, 10_000, 100_000] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter_batched(
                || Timeline::new(0, lines, SEED),
                |mut timeline| {
                    for tick in 1..20u32 {
                        let pos = (timeline.len() / 2).min(timeline.len().saturating_sub(1));
                        timeline.replace(pos, 1, 3, tick);
                    }
                    timeline
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_flatten");
    for &lines in &[1_000u32, 10_000, 100_000] {
        let mut timeline = Timeline::new(0, lines, SEED);
        for tick in 1..50u32 {
            let pos = tick as u64 % timeline.len().max(1);
            timeline.replace(pos, 0, 2, tick);
        }
        group.throughput(Throughput::Elements(timeline.len()));
        group.bench_with_input(
            BenchmarkId::from_parameter(lines),
            &timeline,
            |b, timeline| {
                b.iter(|| timeline.flatten());
            },
        );
    }
    group.finish();
}

fn bench_merge_branches(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_merge");
    for &lines in &[1_000u32, 10_000] {
        group.throughput(Throughput::Elements(lines as u64));
        group.bench_with_input(BenchmarkId::from_parameter(lines), &lines, |b, &lines| {
            b.iter_batched(
                || {
                    let base = Timeline::new(0, lines, SEED);
                    let mut left = base.clone_deep(1);
                    let mut right = base.clone_deep(2);
                    left.replace(0, 1, 1, 1);
                    right.replace(lines as u64 - 1, 1, 1, 2);
                    (base, left, right)
                },
                |(mut base, left, right)| {
                    base.merge(&[left, right], 3);
                    base
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_new,
    bench_replace_sequential_edits,
    bench_flatten,
    bench_merge_branches,
);
criterion_main!(benches);
