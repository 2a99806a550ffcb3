use tilefw_core::{FwError, FwResult, Matrix};
use tracing::debug;

use crate::engine::TaskEngine;
use crate::kernel;
use crate::scheduler::TileSpan;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// The naive triple loop over the whole matrix. Every other strategy is
/// validated against it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Serial;

impl ExecutionStrategy for Serial {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Serial
    }

    fn check(&self, n: usize, _params: &RunParams) -> FwResult<()> {
        if n == 0 {
            return Err(FwError::InvalidParams("matrix size must be positive".into()));
        }
        Ok(())
    }

    fn run(
        &self,
        _engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats> {
        self.check(matrix.size(), params)?;
        let n = matrix.size();
        kernel::relax(matrix, 0..n, 0..n, 0..n);
        Ok(RunStats::default())
    }
}

/// The three-phase tile order of the parallel strategies, run on the
/// calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct TiledSerial;

fn relax_span(matrix: &mut Matrix, span: &TileSpan) {
    for tile in span.tiles() {
        kernel::relax(matrix, tile.pivot_range(), tile.rows(), tile.cols());
    }
}

impl ExecutionStrategy for TiledSerial {
    fn kind(&self) -> StrategyKind {
        StrategyKind::TiledSerial
    }

    fn check(&self, n: usize, params: &RunParams) -> FwResult<()> {
        params.tiling(n).map(|_| ())
    }

    fn run(
        &self,
        _engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats> {
        let tiling = params.tiling(matrix.size())?;
        debug!(n = tiling.size(), bs = tiling.block_size(), "Tiled serial run");
        for plan in tiling.pivots() {
            relax_span(matrix, &plan.diagonal());
            for (_, stripe) in plan.cross_stripes() {
                relax_span(matrix, &stripe);
            }
            for quadrant in plan.remainder_quadrants() {
                relax_span(matrix, &quadrant);
            }
        }
        Ok(RunStats::default())
    }
}
