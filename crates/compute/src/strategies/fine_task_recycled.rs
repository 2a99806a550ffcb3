use std::sync::Arc;

use tilefw_core::{FwResult, Matrix};
use tracing::{debug, trace};

use crate::engine::{ExecContext, TaskEngine, TaskGroup, TaskPool};
use crate::scheduler::TileSpan;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// [`FineTask`](super::FineTask) with task objects drawn from two fixed
/// pools, one sized for the cross phase and one for the remainder phase,
/// and recycled every pivot instead of reallocated.
#[derive(Debug, Clone, Copy, Default)]
pub struct FineTaskRecycled;

/// Recycle one slot per span, spawn them all, then wait and rewind.
///
/// # Safety
///
/// Same contract as spawning the spans as fresh tasks.
unsafe fn spawn_pooled(
    ctx: &ExecContext<'_>,
    pool: &mut TaskPool,
    spans: &[TileSpan],
) -> FwResult<()> {
    let group = Arc::new(TaskGroup::new());
    let mut result = Ok(());
    for span in spans {
        match pool.acquire(ctx.engine(), *span) {
            Ok(slot) => {
                if let Err(e) = ctx.spawn(&group, slot) {
                    result = Err(e);
                    break;
                }
            }
            Err(e) => {
                result = Err(e);
                break;
            }
        }
    }
    // Slots already queued must finish before the pool can be rewound.
    ctx.wait(&group);
    pool.reset();
    result
}

impl ExecutionStrategy for FineTaskRecycled {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FineTaskRecycled
    }

    fn check(&self, n: usize, params: &RunParams) -> FwResult<()> {
        params.tiling(n).map(|_| ())
    }

    fn run(
        &self,
        engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats> {
        let tiling = params.tiling(matrix.size())?;
        let mut cross_pool = TaskPool::new(tiling.max_cross_tasks());
        let mut remainder_pool = TaskPool::new(tiling.max_remainder_tasks());
        debug!(
            n = tiling.size(),
            bs = tiling.block_size(),
            cross_slots = cross_pool.capacity(),
            remainder_slots = remainder_pool.capacity(),
            "Fine-task-recycled run"
        );

        let mut stats = engine.execute(matrix, |ctx| {
            for plan in tiling.pivots() {
                trace!(k = plan.k(), "Pivot");
                // SAFETY: the previous phase was waited on; nothing is running.
                unsafe { plan.diagonal().relax(ctx.view()) };
                // SAFETY: per-tile spans of one phase are disjoint and read
                // only the phase before.
                unsafe {
                    spawn_pooled(ctx, &mut cross_pool, &plan.cross_tiles())?;
                    spawn_pooled(ctx, &mut remainder_pool, &plan.remainder_tiles())?;
                }
            }
            Ok(RunStats::from_context(ctx))
        })?;

        stats.pool_capacity = Some(cross_pool.capacity() + remainder_pool.capacity());
        stats.pool_high_water = Some(cross_pool.high_water() + remainder_pool.high_water());
        debug!(
            spawned = stats.tasks_spawned,
            recycled = cross_pool.acquired() + remainder_pool.acquired(),
            "Task pools drained"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Tiling;
    use crate::strategies::{FineTask, Serial};

    #[test]
    fn pools_are_reused_every_pivot() {
        let engine = TaskEngine::new(4).unwrap();
        let input = Matrix::random(48, 17, 1 << 12).unwrap();
        let mut expected = input.clone();
        Serial.run(&engine, &mut expected, &RunParams::new(1)).unwrap();

        let mut m = input.clone();
        let stats = FineTaskRecycled
            .run(&engine, &mut m, &RunParams::new(8))
            .unwrap();
        assert_eq!(m, expected);

        let tiling = Tiling::new(48, 8).unwrap();
        let capacity = tiling.max_cross_tasks() + tiling.max_remainder_tasks();
        assert_eq!(stats.pool_capacity, Some(capacity));
        assert_eq!(stats.pool_high_water, Some(capacity));
        // Every pivot fills both pools completely, from the same slots.
        assert_eq!(stats.tasks_spawned, (capacity * tiling.tiles_per_side()) as u64);
    }

    #[test]
    fn spawns_as_many_tasks_as_fine_task() {
        let engine = TaskEngine::new(2).unwrap();
        let input = Matrix::random(16, 99, 77).unwrap();
        let params = RunParams::new(2);

        let mut a = input.clone();
        let fresh = FineTask.run(&engine, &mut a, &params).unwrap();
        let mut b = input.clone();
        let pooled = FineTaskRecycled.run(&engine, &mut b, &params).unwrap();

        assert_eq!(a, b);
        assert_eq!(fresh.tasks_spawned, pooled.tasks_spawned);
        assert_eq!(fresh.pool_capacity, None);
    }

    #[test]
    fn undersized_pool_reports_exhaustion() {
        let engine = TaskEngine::new(2).unwrap();
        let mut m = Matrix::random(8, 1, 10).unwrap();
        let plan = Tiling::new(8, 2).unwrap().pivots().next().unwrap();
        let mut pool = TaskPool::new(2);
        let err = engine
            .execute(&mut m, |ctx| {
                // SAFETY: per-tile spans of one phase are disjoint.
                unsafe { spawn_pooled(ctx, &mut pool, &plan.cross_tiles()) }
            })
            .unwrap_err();
        assert_eq!(
            err,
            tilefw_core::FwError::PoolExhausted { capacity: 2, requested: 3 }
        );
        assert_eq!(pool.high_water(), 2);
    }
}
