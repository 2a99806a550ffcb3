use rayon::prelude::*;
use tilefw_core::{FwError, FwResult, Matrix, Weight};
use tracing::{debug, trace};

use crate::engine::TaskEngine;
use crate::kernel;
use crate::strategies::grain::blocks;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// Untiled FW: for every single pivot, one parallel loop over rows, at
/// least `x_grain` rows per work unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standard1d;

/// Untiled FW: for every single pivot, one parallel loop over
/// `x_grain × y_grain` blocks of the matrix.
#[derive(Debug, Clone, Copy, Default)]
pub struct Standard2d;

fn check_standard(n: usize, params: &RunParams) -> FwResult<()> {
    if n == 0 {
        return Err(FwError::InvalidParams("matrix size must be positive".into()));
    }
    params.check_grains()
}

impl ExecutionStrategy for Standard1d {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Standard1d
    }

    fn check(&self, n: usize, params: &RunParams) -> FwResult<()> {
        check_standard(n, params)
    }

    fn run(
        &self,
        engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats> {
        self.check(matrix.size(), params)?;
        let n = matrix.size();
        let x_gs = params.x_grain;
        debug!(n, x_gs, "Standard 1d run");

        let mut pivot_row: Vec<Weight> = vec![0; n];
        let mut stats = RunStats::default();
        for k in 0..n {
            // Row k is read by every worker and written by one; the copy
            // keeps the loop free of that overlap.
            pivot_row.copy_from_slice(matrix.row(k));
            let pivot_row = &pivot_row;
            engine.install(|| {
                matrix
                    .as_mut_slice()
                    .par_chunks_mut(n)
                    .with_min_len(x_gs)
                    .for_each(|row| {
                        let a_ik = row[k];
                        kernel::relax_row(row, a_ik, pivot_row);
                    })
            });
            stats.barriers += 1;
        }
        Ok(stats)
    }
}

impl ExecutionStrategy for Standard2d {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Standard2d
    }

    fn check(&self, n: usize, params: &RunParams) -> FwResult<()> {
        check_standard(n, params)
    }

    fn run(
        &self,
        engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats> {
        self.check(matrix.size(), params)?;
        let n = matrix.size();
        let (x_gs, y_gs) = (params.x_grain, params.y_grain);
        debug!(n, x_gs, y_gs, "Standard 2d run");

        let pieces = blocks(0..n, 0..n, x_gs, y_gs);
        let mut pivot_row: Vec<Weight> = vec![0; n];
        let mut pivot_col: Vec<Weight> = vec![0; n];
        engine.execute(matrix, |ctx| {
            let view = ctx.view();
            for k in 0..n {
                trace!(k, "Pivot");
                // SAFETY: no work is in flight between pivots.
                unsafe { view.snapshot_pivot(k, &mut pivot_row, &mut pivot_col) };
                let (row, col) = (&pivot_row, &pivot_col);
                engine.install(|| {
                    pieces.par_iter().for_each(|(rows, cols)| {
                        // SAFETY: blocks are disjoint and pivot values come
                        // from the snapshots.
                        unsafe { view.relax_with_pivots(rows.clone(), cols.clone(), row, col) }
                    })
                });
                ctx.count_barrier();
            }
            Ok(RunStats::from_context(ctx))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::Serial;

    fn expected(input: &Matrix) -> Matrix {
        let engine = TaskEngine::new(1).unwrap();
        let mut m = input.clone();
        Serial.run(&engine, &mut m, &RunParams::new(1)).unwrap();
        m
    }

    #[test]
    fn standard_1d_matches_serial() {
        let engine = TaskEngine::new(4).unwrap();
        let input = Matrix::random(37, 4, 900).unwrap();
        for x in [1, 5, 37, 64] {
            let mut m = input.clone();
            let stats = Standard1d
                .run(&engine, &mut m, &RunParams::new(1).with_grains(x, 1))
                .unwrap();
            assert_eq!(m, expected(&input), "x_gs={}", x);
            assert_eq!(stats.barriers, 37);
        }
    }

    #[test]
    fn standard_2d_matches_serial() {
        let engine = TaskEngine::new(4).unwrap();
        let input = Matrix::random(30, 6, 900).unwrap();
        for (x, y) in [(1, 1), (4, 7), (30, 30), (8, 64)] {
            let mut m = input.clone();
            Standard2d
                .run(&engine, &mut m, &RunParams::new(1).with_grains(x, y))
                .unwrap();
            assert_eq!(m, expected(&input), "x_gs={} y_gs={}", x, y);
        }
    }

    #[test]
    fn rejects_zero_grain() {
        let engine = TaskEngine::new(1).unwrap();
        let mut m = Matrix::new(4, 0).unwrap();
        let params = RunParams::new(1).with_grains(0, 1);
        assert!(matches!(
            Standard2d.run(&engine, &mut m, &params),
            Err(FwError::InvalidParams(_))
        ));
    }
}
