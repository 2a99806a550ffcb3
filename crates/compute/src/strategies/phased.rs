use std::sync::Arc;

use tilefw_core::{FwResult, Matrix};
use tracing::trace;

use crate::engine::{ExecContext, RelaxTask, TaskEngine, TaskGroup};
use crate::scheduler::{PivotPlan, TileSpan, Tiling};
use crate::strategies::RunStats;

/// Spawn one fresh task per non-empty span under a new group and wait for
/// the group.
///
/// # Safety
///
/// The spans must be pairwise disjoint and only read cells no other span
/// writes.
pub(crate) unsafe fn spawn_and_wait(ctx: &ExecContext<'_>, spans: &[TileSpan]) -> FwResult<()> {
    let group = Arc::new(TaskGroup::new());
    for span in spans.iter().filter(|s| !s.is_empty()) {
        ctx.spawn(&group, RelaxTask::new(*span))?;
    }
    ctx.wait(&group);
    Ok(())
}

/// Task-per-span driver shared by the task strategies: the diagonal on the
/// calling thread, then one task group per phase.
pub(crate) fn run_phased<C, R>(
    engine: &TaskEngine,
    matrix: &mut Matrix,
    tiling: Tiling,
    cross: C,
    remainder: R,
) -> FwResult<RunStats>
where
    C: Fn(&PivotPlan) -> Vec<TileSpan>,
    R: Fn(&PivotPlan) -> Vec<TileSpan>,
{
    engine.execute(matrix, |ctx| {
        for plan in tiling.pivots() {
            trace!(k = plan.k(), "Pivot");
            // SAFETY: the previous phase was waited on; nothing is running.
            unsafe { plan.diagonal().relax(ctx.view()) };
            // SAFETY: `PivotPlan` partitions each phase into disjoint spans
            // that read only the phase before.
            unsafe {
                spawn_and_wait(ctx, &cross(&plan))?;
                spawn_and_wait(ctx, &remainder(&plan))?;
            }
        }
        Ok(RunStats::from_context(ctx))
    })
}
