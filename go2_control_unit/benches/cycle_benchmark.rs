//! Cycle benchmark: trajectory step and full cycle body.
//!
//! The full cycle covers snapshot read, trajectory step, command update,
//! CRC stamping and a publish into a discarding sink. Transport delivery
//! cost is excluded.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;
use std::time::Duration;

use go2_common::transport::{Publisher, TransportError};
use go2_common::wire::LowState;
use go2_control_unit::cache::SnapshotCache;
use go2_control_unit::cycle::CycleRunner;
use go2_control_unit::trajectory::{TrackedJoint, TrajectoryGenerator, TrajectoryParams};

struct Discard;

impl Publisher for Discard {
    fn publish(&self, frame: &[u8]) -> Result<(), TransportError> {
        black_box(frame);
        Ok(())
    }
}

/// Parameters commanding the first `n` slots, already past bootstrap.
fn params_with_joints(n: usize) -> TrajectoryParams {
    TrajectoryParams {
        joints: (0..n)
            .map(|slot| TrackedJoint {
                slot,
                neutral: 0.1 * slot as f32,
                amplitude: 0.3,
                commanded: true,
            })
            .collect(),
        ..TrajectoryParams::default()
    }
}

fn bench_trajectory_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("trajectory_step");
    let state = LowState::default();

    for &n in &[1usize, 3, 12, 20] {
        let mut generator = TrajectoryGenerator::new(params_with_joints(n));
        // Move into the oscillation window.
        for _ in 0..500 {
            generator.step(&state);
        }
        group.bench_with_input(BenchmarkId::new("joints", n), &n, |b, _| {
            b.iter(|| black_box(generator.step(black_box(&state)).map(|t| t.len())));
        });
    }

    group.finish();
}

fn bench_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_full");
    group.significance_level(0.01);
    group.sample_size(500);

    for &n in &[1usize, 12, 20] {
        let cache = Arc::new(SnapshotCache::new(LowState::default()));
        let mut runner = match CycleRunner::new(
            params_with_joints(n),
            Duration::from_micros(2000),
            Arc::clone(&cache),
            Discard,
        ) {
            Ok(runner) => runner,
            Err(e) => panic!("benchmark parameters rejected: {e}"),
        };

        group.bench_with_input(BenchmarkId::new("joints", n), &n, |b, _| {
            b.iter(|| black_box(runner.tick()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_trajectory_step, bench_cycle);
criterion_main!(benches);
