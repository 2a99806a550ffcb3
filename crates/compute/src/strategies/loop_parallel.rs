use std::ops::Range;

use rayon::prelude::*;
use tilefw_core::{FwResult, Matrix};
use tracing::{debug, trace};

use crate::engine::TaskEngine;
use crate::kernel::MatrixView;
use crate::strategies::grain::{quadrant_pieces, stripe_pieces};
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// Cross stripes and remainder quadrants each run as their own parallel
/// loop: 1D over a stripe by `x_grain`, 2D over a quadrant by
/// `x_grain × y_grain`. Eight loops, eight barriers per pivot.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopParallel;

/// Relax every piece against `pivot` in parallel. Returns after all of
/// them are done.
///
/// # Safety
///
/// Pieces must be pairwise disjoint and none may overlap the rows or
/// columns of `pivot` read by another piece.
pub(crate) unsafe fn relax_pieces(
    view: MatrixView,
    pivot: Range<usize>,
    pieces: &[(Range<usize>, Range<usize>)],
) {
    pieces.par_iter().for_each(|(rows, cols)| {
        // SAFETY: forwarded from the caller.
        unsafe { view.relax(pivot.clone(), rows.clone(), cols.clone()) }
    });
}

impl ExecutionStrategy for LoopParallel {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LoopParallel
    }

    fn check(&self, n: usize, params: &RunParams) -> FwResult<()> {
        params.tiling(n)?;
        params.check_grains()
    }

    fn run(
        &self,
        engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats> {
        self.check(matrix.size(), params)?;
        let tiling = params.tiling(matrix.size())?;
        let (x_gs, y_gs) = (params.x_grain, params.y_grain);
        debug!(n = tiling.size(), bs = tiling.block_size(), x_gs, y_gs, "Loop-parallel run");

        engine.execute(matrix, |ctx| {
            let view = ctx.view();
            for plan in tiling.pivots() {
                trace!(k = plan.k(), "Pivot");
                let diagonal = plan.diagonal();
                // SAFETY: nothing else is running between barriers.
                unsafe { diagonal.relax(view) };

                for (_, stripe) in plan.cross_stripes() {
                    if stripe.is_empty() {
                        continue;
                    }
                    let pieces = stripe_pieces(&stripe, x_gs);
                    // SAFETY: pieces cut a stripe along its length, so each
                    // owns the pivot cells it reads besides the diagonal.
                    engine.install(|| unsafe { relax_pieces(view, stripe.pivot_range(), &pieces) });
                    ctx.count_barrier();
                }

                for quadrant in plan.remainder_quadrants() {
                    if quadrant.is_empty() {
                        continue;
                    }
                    let pieces = quadrant_pieces(&quadrant, x_gs, y_gs);
                    // SAFETY: the quadrant only reads the finished cross.
                    engine.install(|| unsafe {
                        relax_pieces(view, quadrant.pivot_range(), &pieces)
                    });
                    ctx.count_barrier();
                }
            }
            Ok(RunStats::from_context(ctx))
        })
    }
}
