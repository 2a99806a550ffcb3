use tilefw_core::{FwResult, Matrix};
use tracing::debug;

use crate::engine::TaskEngine;
use crate::strategies::phased::run_phased;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// One task per cross stripe, then one task per tile row on each side of
/// the pivot column.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoarseRowTask;

impl ExecutionStrategy for CoarseRowTask {
    fn kind(&self) -> StrategyKind {
        StrategyKind::CoarseRowTask
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
        debug!(n = tiling.size(), bs = tiling.block_size(), "Coarse-row-task run");
        run_phased(
            engine,
            matrix,
            tiling,
            |plan| plan.cross_stripes().iter().map(|(_, s)| *s).collect(),
            |plan| plan.remainder_rows(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::Serial;

    #[test]
    fn stripes_then_rows() {
        let engine = TaskEngine::new(4).unwrap();
        let input = Matrix::random(20, 11, 500).unwrap();
        let mut expected = input.clone();
        Serial.run(&engine, &mut expected, &RunParams::new(1)).unwrap();

        let mut m = input.clone();
        let stats = CoarseRowTask.run(&engine, &mut m, &RunParams::new(5)).unwrap();
        assert_eq!(m, expected);

        // Stripes: 2 at edge pivots, 4 inside. Rows: 3 per non-empty side.
        let stripes = 2 + 4 + 4 + 2;
        let rows = 3 + 6 + 6 + 3;
        assert_eq!(stats.tasks_spawned, (stripes + rows) as u64);
        assert_eq!(stats.barriers, 2 * 4);
    }
}
