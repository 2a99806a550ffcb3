use std::ops::Range;

use tilefw_core::{FwResult, Matrix};
use tracing::{debug, trace};

use crate::engine::TaskEngine;
use crate::kernel::MatrixView;
use crate::strategies::grain::{quadrant_pieces, stripe_pieces};
use crate::strategies::loop_parallel::relax_pieces;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// Like [`LoopParallel`](super::LoopParallel), but the four stripes (and
/// then the four quadrants) are forked together and each runs its own
/// parallel loop. One barrier per phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct Nested;

type Pieces = Vec<(Range<usize>, Range<usize>)>;

/// Relax four independent groups of pieces as a two-level fork.
///
/// # Safety
///
/// All pieces of all four groups must satisfy [`relax_pieces`]'s contract
/// together.
unsafe fn fork_four(view: MatrixView, k: Range<usize>, groups: &[Pieces; 4]) {
    let run = |pieces: &Pieces| {
        // SAFETY: forwarded from the caller.
        unsafe { relax_pieces(view, k.clone(), pieces) }
    };
    rayon::join(
        || rayon::join(|| run(&groups[0]), || run(&groups[1])),
        || rayon::join(|| run(&groups[2]), || run(&groups[3])),
    );
}

impl ExecutionStrategy for Nested {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Nested
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
        debug!(n = tiling.size(), bs = tiling.block_size(), x_gs, y_gs, "Nested run");

        engine.execute(matrix, |ctx| {
            let view = ctx.view();
            for plan in tiling.pivots() {
                trace!(k = plan.k(), "Pivot");
                let diagonal = plan.diagonal();
                // SAFETY: nothing else is running between barriers.
                unsafe { diagonal.relax(view) };

                let stripes = plan.cross_stripes().map(|(_, s)| stripe_pieces(&s, x_gs));
                // SAFETY: stripes are disjoint and each is cut along its length.
                engine.install(|| unsafe { fork_four(view, diagonal.pivot_range(), &stripes) });
                ctx.count_barrier();

                let quadrants = plan
                    .remainder_quadrants()
                    .map(|q| quadrant_pieces(&q, x_gs, y_gs));
                // SAFETY: quadrants are disjoint and only read the cross.
                engine.install(|| unsafe { fork_four(view, diagonal.pivot_range(), &quadrants) });
                ctx.count_barrier();
            }
            Ok(RunStats::from_context(ctx))
        })
    }
}
