//! Benchmarks for directional candidate search and full navigation steps.
//!
//! Run with: `cargo bench --package spotlight --bench spatial_bench`

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use spotlight::focus::spatial::{nearest_to_point, select_neighbor};
use spotlight::focus::{Direction, FocusId, FocusNode, FocusTree};
use spotlight::{FocusConfig, FocusManager};
use spotlight_core::geometry::{Point, Rect};
use std::hint::black_box;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Tiles of a `cols`-wide grid, 120×80 with 20px gutters.
fn grid(count: usize, cols: usize) -> Vec<(FocusId, Rect)> {
    (0..count)
        .map(|i| {
            let (row, col) = (i / cols, i % cols);
            let bounds = Rect::new(col as f64 * 140.0, row as f64 * 100.0, 120.0, 80.0);
            (i as FocusId + 1, bounds)
        })
        .collect()
}

fn grid_manager(count: usize, cols: usize) -> FocusManager {
    let mut tree = FocusTree::new();
    tree.insert(None, FocusNode::plain(0, Rect::new(0.0, 0.0, 1e6, 1e6)));
    for (id, bounds) in grid(count, cols) {
        tree.insert(Some(0), FocusNode::new(id, bounds));
    }
    let mut mgr = FocusManager::with_tree(tree, FocusConfig::default());
    let _ = mgr.initialize(0);
    mgr
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_select_neighbor(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_neighbor");
    for count in [16usize, 256, 4096] {
        let candidates = grid(count, 16);
        let origin = candidates[candidates.len() / 2].1;
        group.throughput(Throughput::Elements(count as u64));
        for dir in Direction::ALL {
            group.bench_with_input(
                BenchmarkId::new(dir.as_str(), count),
                &candidates,
                |b, candidates| {
                    b.iter(|| {
                        select_neighbor(
                            black_box(dir),
                            black_box(origin),
                            candidates.iter().copied(),
                            None,
                        )
                    })
                },
            );
        }
    }
    group.finish();
}

fn bench_pointer_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("nearest_to_point");
    let candidates = grid(1024, 32);
    let point = Point::new(2000.0, 1500.0);
    group.bench_function("no_direction", |b| {
        b.iter(|| nearest_to_point(black_box(point), None, candidates.iter().copied()))
    });
    group.bench_function("left", |b| {
        b.iter(|| {
            nearest_to_point(
                black_box(point),
                Some(Direction::Left),
                candidates.iter().copied(),
            )
        })
    });
    group.finish();
}

fn bench_navigate(c: &mut Criterion) {
    let mut group = c.benchmark_group("navigate");
    for count in [64usize, 1024] {
        let mut mgr = grid_manager(count, 16);
        group.bench_function(BenchmarkId::new("right_then_left", count), |b| {
            b.iter(|| {
                let _ = mgr.navigate(Direction::Right);
                let _ = mgr.navigate(Direction::Left);
                mgr.take_events().len()
            })
        });
    }
    group.finish();
}

// ============================================================================
// Criterion Configuration
// ============================================================================

criterion_group!(
    benches,
    bench_select_neighbor,
    bench_pointer_search,
    bench_navigate
);

criterion_main!(benches);
