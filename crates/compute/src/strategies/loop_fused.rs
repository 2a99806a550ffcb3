use rayon::prelude::*;
use tilefw_core::{FwResult, Matrix};
use tracing::{debug, trace};

use crate::engine::TaskEngine;
use crate::scheduler::TileSpan;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// One parallel loop per phase over tile indices.
///
/// In the cross phase iteration `t` relaxes the symmetric pair (t,k) and
/// (k,t); in the remainder phase iteration `t` relaxes the whole tile row
/// `t`, skipping the pivot column.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopFused;

impl ExecutionStrategy for LoopFused {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LoopFused
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
        let (n, bs) = (tiling.size(), tiling.block_size());
        debug!(n, bs, "Loop-fused run");

        engine.execute(matrix, |ctx| {
            let view = ctx.view();
            for plan in tiling.pivots() {
                let (p, k) = (plan.pivot_tile(), plan.k());
                trace!(k, "Pivot");
                // SAFETY: nothing else is running between barriers.
                unsafe { plan.diagonal().relax(view) };

                let others: Vec<usize> =
                    (0..tiling.tiles_per_side()).filter(|&t| t != p).collect();

                engine.install(|| {
                    others.par_iter().for_each(|&t| {
                        let off = t * bs;
                        // SAFETY: iteration t alone writes (t,k) and (k,t);
                        // both only read themselves and the diagonal.
                        unsafe {
                            TileSpan::tile(k, off, k, bs).relax(view);
                            TileSpan::tile(k, k, off, bs).relax(view);
                        }
                    })
                });
                ctx.count_barrier();

                engine.install(|| {
                    others.par_iter().for_each(|&t| {
                        let rows = t * bs..t * bs + bs;
                        // SAFETY: iteration t alone writes tile row t outside
                        // the pivot column; the cross is finished.
                        unsafe {
                            TileSpan::new(k, rows.clone(), 0..k, bs).relax(view);
                            TileSpan::new(k, rows, k + bs..n, bs).relax(view);
                        }
                    })
                });
                ctx.count_barrier();
            }
            Ok(RunStats::from_context(ctx))
        })
    }
}
