use std::sync::OnceLock;

use proptest::prelude::*;
use tilefw_compute::{
    generate_input, ExecutionStrategy, Harness, HarnessConfig, RunParams, StrategyKind, TaskEngine,
    Tiling,
};
use tilefw_core::{FwError, Matrix, INF};

fn serial(input: &Matrix, engine: &TaskEngine) -> Matrix {
    let mut m = input.clone();
    StrategyKind::Serial
        .build()
        .run(engine, &mut m, &RunParams::new(1))
        .unwrap();
    m
}

/// Run `kind` on a copy of `input`; `None` if the size/params combination
/// is outside what the strategy accepts.
fn try_run(
    kind: StrategyKind,
    engine: &TaskEngine,
    input: &Matrix,
    params: &RunParams,
) -> Option<Matrix> {
    let strategy = kind.build();
    if strategy.check(input.size(), params).is_err() {
        return None;
    }
    let mut m = input.clone();
    strategy.run(engine, &mut m, params).unwrap();
    Some(m)
}

fn scenario() -> Matrix {
    Matrix::from_rows(&[
        vec![0, 3, 8, INF],
        vec![INF, 0, INF, 1],
        vec![4, INF, 0, INF],
        vec![INF, 1, 4, 0],
    ])
    .unwrap()
}

#[test]
fn every_strategy_matches_serial_across_sizes_and_threads() {
    let shapes = [
        (8, 2, 2, 2),
        (8, 4, 3, 1),
        (12, 3, 3, 6),
        (16, 4, 4, 4),
        (16, 16, 5, 7),
        (24, 6, 1, 12),
        (32, 8, 8, 8),
        (32, 4, 16, 2),
    ];
    for threads in [1, 2, 4, 8] {
        let engine = TaskEngine::new(threads).unwrap();
        for (i, &(n, bs, x, y)) in shapes.iter().enumerate() {
            let input = generate_input(n, 1000 + i as u64, 1 << 10).unwrap();
            let expected = serial(&input, &engine);
            let params = RunParams::new(bs).with_grains(x, y);
            for kind in StrategyKind::ALL {
                if let Some(out) = try_run(kind, &engine, &input, &params) {
                    assert_eq!(
                        out, expected,
                        "{} disagrees with serial: n={} bs={} x_gs={} y_gs={} threads={}",
                        kind, n, bs, x, y, threads
                    );
                }
            }
        }
    }
}

#[test]
fn recursive_strategies_are_covered() {
    let engine = TaskEngine::new(4).unwrap();
    for (n, bs) in [(8, 2), (16, 4), (32, 8), (16, 16), (64, 4)] {
        let input = generate_input(n, 3, 500).unwrap();
        let expected = serial(&input, &engine);
        for kind in [StrategyKind::Recursive, StrategyKind::RecursiveTasks] {
            let out = try_run(kind, &engine, &input, &RunParams::new(bs))
                .unwrap_or_else(|| panic!("{} rejected n={} bs={}", kind, n, bs));
            assert_eq!(out, expected, "{} n={} bs={}", kind, n, bs);
        }
    }
}

#[test]
fn four_node_scenario_converges_under_every_strategy() {
    let engine = TaskEngine::new(2).unwrap();
    let converged = Matrix::from_rows(&[
        vec![0, 3, 8, 4],
        vec![9, 0, 5, 1],
        vec![4, 7, 0, 8],
        vec![8, 1, 4, 0],
    ])
    .unwrap();
    for kind in StrategyKind::ALL {
        let out = try_run(kind, &engine, &scenario(), &RunParams::new(2)).unwrap();
        assert_eq!(out, converged, "{}", kind);
    }
}

#[test]
fn converged_matrix_is_a_fixed_point() {
    let engine = TaskEngine::new(4).unwrap();
    let input = generate_input(32, 77, 1 << 16).unwrap();
    let converged = serial(&input, &engine);
    let params = RunParams::new(8).with_grains(4, 4);
    for kind in StrategyKind::ALL {
        if let Some(again) = try_run(kind, &engine, &converged, &params) {
            assert_eq!(again, converged, "{} changed a converged matrix", kind);
        }
    }
}

#[test]
fn repeated_runs_are_deterministic() {
    let engine = TaskEngine::new(8).unwrap();
    let input = generate_input(48, 5, 1 << 20).unwrap();
    let params = RunParams::new(12).with_grains(5, 7);
    for kind in StrategyKind::ALL {
        let first = try_run(kind, &engine, &input, &params);
        let second = try_run(kind, &engine, &input, &params);
        assert_eq!(first, second, "{}", kind);
    }
}

#[test]
fn block_equal_to_size_is_a_single_diagonal_phase() {
    let engine = TaskEngine::new(4).unwrap();
    let input = generate_input(16, 9, 100).unwrap();
    let expected = serial(&input, &engine);
    let params = RunParams::new(16);
    for kind in StrategyKind::ALL.into_iter().filter(|k| k.is_tiled()) {
        let strategy = kind.build();
        let mut m = input.clone();
        let stats = strategy.run(&engine, &mut m, &params).unwrap();
        assert_eq!(m, expected, "{}", kind);
        assert_eq!(stats.tasks_spawned, 0, "{} spawned work for empty phases", kind);
    }
}

#[test]
fn single_cell_matrix_is_unchanged() {
    let engine = TaskEngine::new(2).unwrap();
    let input = Matrix::new(1, 0).unwrap();
    for kind in StrategyKind::ALL {
        let out = try_run(kind, &engine, &input, &RunParams::new(1)).unwrap();
        assert_eq!(out, input, "{}", kind);
    }
}

#[test]
fn recycled_variant_stays_within_its_pool() {
    let engine = TaskEngine::new(4).unwrap();
    let input = generate_input(64, 13, 1 << 12).unwrap();
    for bs in [4, 8, 16, 32, 64] {
        let tiling = Tiling::new(64, bs).unwrap();
        let mut m = input.clone();
        let stats = StrategyKind::FineTaskRecycled
            .build()
            .run(&engine, &mut m, &RunParams::new(bs))
            .unwrap();
        let capacity = tiling.max_cross_tasks() + tiling.max_remainder_tasks();
        assert_eq!(stats.pool_capacity, Some(capacity));
        assert!(stats.pool_high_water.unwrap() <= capacity);
        assert!(stats.tasks_spawned <= (capacity * tiling.tiles_per_side()) as u64);
    }
}

#[test]
fn harness_rejects_bad_tiling_for_every_tiled_strategy() {
    let engine = TaskEngine::new(1).unwrap();
    let mut harness = Harness::new(&engine, HarnessConfig::default());
    let input = harness.input(10).unwrap();
    for kind in StrategyKind::ALL.into_iter().filter(|k| k.is_tiled()) {
        assert_eq!(
            harness.run(kind, &input, &RunParams::new(4)).unwrap_err(),
            FwError::InvalidTiling { size: 10, block: 4 }
        );
    }
}

#[test]
#[ignore = "long-running: cargo test --release -- --ignored"]
fn large_matrix_all_strategies_agree() {
    let input = generate_input(1024, 2024, 1 << 20).unwrap();
    let reference = serial(&input, &TaskEngine::new(1).unwrap());
    for threads in [1, 32] {
        let engine = TaskEngine::new(threads).unwrap();
        for bs in [16, 32, 64, 128] {
            let params = RunParams::new(bs);
            for kind in StrategyKind::ALL {
                let Some(out) = try_run(kind, &engine, &input, &params) else {
                    continue;
                };
                assert_eq!(out, reference, "{} bs={} threads={}", kind, bs, threads);
            }
            let tiling = Tiling::new(1024, bs).unwrap();
            let mut m = input.clone();
            let stats = StrategyKind::FineTaskRecycled
                .build()
                .run(&engine, &mut m, &params)
                .unwrap();
            let capacity = tiling.max_cross_tasks() + tiling.max_remainder_tasks();
            assert!(stats.pool_high_water.unwrap() <= capacity);
        }
    }
}

fn shared_engine() -> &'static TaskEngine {
    static ENGINE: OnceLock<TaskEngine> = OnceLock::new();
    ENGINE.get_or_init(|| TaskEngine::new(4).unwrap())
}

/// `(n, bs)` with `bs` dividing `n`.
fn tiled_shape() -> impl Strategy<Value = (usize, usize)> {
    (1usize..=8, 1usize..=6).prop_map(|(tiles, bs)| (tiles * bs, bs))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn proptest_any_tiling_matches_serial(
        (n, bs) in tiled_shape(),
        x in 1usize..10,
        y in 1usize..10,
        seed: u64,
        max_weight in 1i32..1_000,
    ) {
        let engine = shared_engine();
        let input = generate_input(n, seed, max_weight).unwrap();
        let expected = serial(&input, engine);
        let params = RunParams::new(bs).with_grains(x, y);
        for kind in StrategyKind::ALL {
            if let Some(out) = try_run(kind, engine, &input, &params) {
                prop_assert_eq!(out, expected.clone(), "{} n={} bs={}", kind, n, bs);
            }
        }
    }
}
