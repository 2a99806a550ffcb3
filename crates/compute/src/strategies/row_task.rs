use tilefw_core::{FwResult, Matrix};
use tracing::debug;

use crate::engine::TaskEngine;
use crate::strategies::phased::run_phased;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// One task per cross tile, then one task per tile row on each side of the
/// pivot column.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowTask;

impl ExecutionStrategy for RowTask {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RowTask
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
        debug!(n = tiling.size(), bs = tiling.block_size(), "Row-task run");
        run_phased(
            engine,
            matrix,
            tiling,
            |plan| plan.cross_tiles(),
            |plan| plan.remainder_rows(),
        )
    }
}
