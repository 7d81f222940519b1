//! Simulation benchmarks for terra_core.
//!
//! Run with: `cargo bench -p terra_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use terra_core::map::{GameMap, TileRef};
use terra_core::pathfinding::{
    PathFinder, PathStep, RecomputePolicy, SearchLimits, SearchStrategy, Traversal,
};
use terra_test_utils::fixtures::{coast, skirmish};

/// Drive a finder from `from` to `to` and return the number of calls.
fn walk(map: &dyn GameMap, strategy: SearchStrategy, from: TileRef, to: TileRef) -> u32 {
    let mut finder = PathFinder::new(strategy, SearchLimits::default(), RecomputePolicy::default());
    let mut current = from;
    let mut calls = 0;
    loop {
        calls += 1;
        match finder.next_tile(map, current, to, 1) {
            PathStep::Next(tile) => current = tile,
            PathStep::Pending => {}
            PathStep::Completed(_) | PathStep::PathNotFound => return calls,
        }
    }
}

/// Full-resolution and coarse sea crossings of increasing length.
pub fn pathfinding_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("sea_crossing");
    for size in [64u32, 128, 256] {
        let map = coast(size, size, size / 4);
        let from = map.tile_ref(1, size / 4 + 1);
        let to = map.tile_ref(size - 2, size - 2);
        for (label, strategy) in [
            ("terrain", SearchStrategy::Terrain(Traversal::Water)),
            ("coarse", SearchStrategy::Coarse(Traversal::Water)),
        ] {
            group.bench_with_input(BenchmarkId::new(label, size), &size, |b, _| {
                b.iter(|| black_box(walk(&map, strategy, from, to)));
            });
        }
    }
    group.finish();
}

/// Scheduler throughput on the two-player skirmish.
pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("skirmish_200_ticks", |b| {
        b.iter(|| {
            let mut sim = skirmish(black_box(42));
            sim.run(200);
            black_box(sim.state_hash())
        })
    });

    c.bench_function("state_hash", |b| {
        let mut sim = skirmish(42);
        sim.run(100);
        b.iter(|| black_box(sim.state_hash()));
    });
}

criterion_group!(benches, pathfinding_benchmark, simulation_benchmark);
criterion_main!(benches);
