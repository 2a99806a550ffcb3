use tilefw_core::{FwResult, Matrix};
use tracing::debug;

use crate::engine::TaskEngine;
use crate::strategies::phased::run_phased;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// Four tasks per phase: one per cross stripe, then one per remainder
/// quadrant. Empty spans at the matrix edge are not spawned.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoarseTask;

impl ExecutionStrategy for CoarseTask {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CoarseTask
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
        debug!(n = tiling.size(), bs = tiling.block_size(), "Coarse-task run");
        run_phased(
            engine,
            matrix,
            tiling,
            |plan| plan.cross_stripes().iter().map(|(_, s)| *s).collect(),
            |plan| plan.remainder_quadrants().to_vec(),
        )
    }
}
