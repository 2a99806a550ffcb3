use tilefw_core::{FwResult, Matrix};
use tracing::debug;

use crate::engine::TaskEngine;
use crate::strategies::phased::run_phased;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// One freshly allocated task per tile in both the cross and remainder
/// phases.
#[derive(Debug, Clone, Copy, Default)]
pub struct FineTask;

impl ExecutionStrategy for FineTask {
    fn kind(&self) -> StrategyKind {
        StrategyKind::FineTask
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
        debug!(n = tiling.size(), bs = tiling.block_size(), "Fine-task run");
        run_phased(
            engine,
            matrix,
            tiling,
            |plan| plan.cross_tiles(),
            |plan| plan.remainder_tiles(),
        )
    }
}
