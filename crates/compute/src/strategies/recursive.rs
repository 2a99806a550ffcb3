use tilefw_core::{FwError, FwResult, Matrix};
use tracing::debug;

use crate::engine::TaskEngine;
use crate::kernel::MatrixView;
use crate::strategies::{ExecutionStrategy, RunParams, RunStats, StrategyKind};

/// Divide-and-conquer FW on the calling thread: eight half-size calls per
/// level, the kernel on blocks of at most `block_size`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Recursive;

/// The same recursion with the two independent pairs of half-size calls
/// forked through the engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursiveTasks;

/// Top-left corner of a square block.
type Corner = (usize, usize);

/// Corner of quadrant `(r, c)` of the block at `p` with half size `h`.
fn quad(p: Corner, r: usize, c: usize, h: usize) -> Corner {
    (p.0 + r * h, p.1 + c * h)
}

fn check_recursion(n: usize, params: &RunParams) -> FwResult<()> {
    let bs = params.block_size;
    let ok = n > 0 && bs > 0 && (n <= bs || (n % bs == 0 && (n / bs).is_power_of_two()));
    if !ok {
        return Err(FwError::InvalidRecursion { size: n, block: bs });
    }
    Ok(())
}

/// `A = min(A, B ⊗ C)` on `m × m` blocks.
///
/// # Safety
///
/// Blocks lie inside the matrix and nothing else writes `A`, `B` or `C`.
unsafe fn recurse(view: MatrixView, a: Corner, b: Corner, c: Corner, m: usize, bs: usize) {
    if m <= bs {
        view.relax_quadrant(a, b, c, m);
        return;
    }
    let h = m / 2;
    let q = |p: Corner, r, s| quad(p, r, s, h);
    recurse(view, q(a, 0, 0), q(b, 0, 0), q(c, 0, 0), h, bs);
    recurse(view, q(a, 0, 1), q(b, 0, 0), q(c, 0, 1), h, bs);
    recurse(view, q(a, 1, 0), q(b, 1, 0), q(c, 0, 0), h, bs);
    recurse(view, q(a, 1, 1), q(b, 1, 0), q(c, 0, 1), h, bs);
    recurse(view, q(a, 1, 1), q(b, 1, 1), q(c, 1, 1), h, bs);
    recurse(view, q(a, 1, 0), q(b, 1, 1), q(c, 1, 0), h, bs);
    recurse(view, q(a, 0, 1), q(b, 0, 1), q(c, 1, 1), h, bs);
    recurse(view, q(a, 0, 0), q(b, 0, 1), q(c, 1, 0), h, bs);
}

/// Parallel [`recurse`]. Returns the number of forks performed.
///
/// # Safety
///
/// As for [`recurse`].
unsafe fn recurse_tasks(
    engine: &TaskEngine,
    view: MatrixView,
    a: Corner,
    b: Corner,
    c: Corner,
    m: usize,
    bs: usize,
) -> u64 {
    if m <= bs {
        view.relax_quadrant(a, b, c, m);
        return 0;
    }
    let h = m / 2;
    let q = |p: Corner, r, s| quad(p, r, s, h);
    let rec = |a, b, c| unsafe { recurse_tasks(engine, view, a, b, c, h, bs) };

    let mut forks = 2;
    forks += rec(q(a, 0, 0), q(b, 0, 0), q(c, 0, 0));
    // The off-diagonal quadrants write disjoint blocks and read only the
    // quadrant finished above.
    let (x, y) = engine.join(
        || rec(q(a, 0, 1), q(b, 0, 0), q(c, 0, 1)),
        || rec(q(a, 1, 0), q(b, 1, 0), q(c, 0, 0)),
    );
    forks += x + y;
    forks += rec(q(a, 1, 1), q(b, 1, 0), q(c, 0, 1));
    forks += rec(q(a, 1, 1), q(b, 1, 1), q(c, 1, 1));
    let (x, y) = engine.join(
        || rec(q(a, 1, 0), q(b, 1, 1), q(c, 1, 0)),
        || rec(q(a, 0, 1), q(b, 0, 1), q(c, 1, 1)),
    );
    forks += x + y;
    forks += rec(q(a, 0, 0), q(b, 0, 1), q(c, 1, 0));
    forks
}

impl ExecutionStrategy for Recursive {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Recursive
    }

    fn check(&self, n: usize, params: &RunParams) -> FwResult<()> {
        check_recursion(n, params)
    }

    fn run(
        &self,
        _engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats> {
        self.check(matrix.size(), params)?;
        let n = matrix.size();
        debug!(n, bs = params.block_size, "Recursive run");
        let view = MatrixView::new(matrix);
        // SAFETY: size checked above; `matrix` is exclusively borrowed.
        unsafe { recurse(view, (0, 0), (0, 0), (0, 0), n, params.block_size) };
        Ok(RunStats::default())
    }
}

impl ExecutionStrategy for RecursiveTasks {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RecursiveTasks
    }

    fn check(&self, n: usize, params: &RunParams) -> FwResult<()> {
        check_recursion(n, params)
    }

    fn run(
        &self,
        engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats> {
        self.check(matrix.size(), params)?;
        let (n, bs) = (matrix.size(), params.block_size);
        debug!(n, bs, "Recursive-tasks run");
        engine.execute(matrix, |ctx| {
            let view = ctx.view();
            // SAFETY: size checked above; concurrent calls write disjoint
            // quadrants.
            let forks = engine.install(|| unsafe {
                recurse_tasks(engine, view, (0, 0), (0, 0), (0, 0), n, bs)
            });
            Ok(RunStats {
                tasks_spawned: 2 * forks,
                barriers: forks,
                ..RunStats::from_context(ctx)
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::Serial;

    #[test]
    fn sizes_must_be_block_times_power_of_two() {
        assert!(check_recursion(64, &RunParams::new(8)).is_ok());
        assert!(check_recursion(8, &RunParams::new(8)).is_ok());
        assert!(check_recursion(5, &RunParams::new(8)).is_ok());
        assert_eq!(
            check_recursion(48, &RunParams::new(8)),
            Err(FwError::InvalidRecursion { size: 48, block: 8 })
        );
        assert!(check_recursion(60, &RunParams::new(8)).is_err());
        assert!(check_recursion(8, &RunParams::new(0)).is_err());
    }

    #[test]
    fn both_variants_match_serial() {
        let engine = TaskEngine::new(4).unwrap();
        let input = Matrix::random(64, 31, 5_000).unwrap();
        let mut expected = input.clone();
        Serial.run(&engine, &mut expected, &RunParams::new(1)).unwrap();

        for bs in [1, 4, 16, 64, 128] {
            let params = RunParams::new(bs);
            let mut a = input.clone();
            Recursive.run(&engine, &mut a, &params).unwrap();
            assert_eq!(a, expected, "recursive bs={}", bs);

            let mut b = input.clone();
            RecursiveTasks.run(&engine, &mut b, &params).unwrap();
            assert_eq!(b, expected, "recursive-tasks bs={}", bs);
        }
    }

    #[test]
    fn fork_count_follows_recursion_depth() {
        let engine = TaskEngine::new(2).unwrap();
        let mut m = Matrix::random(16, 0, 9).unwrap();
        // One level: 2 forks. Two levels: 2 + 8 * 2.
        let one = RecursiveTasks.run(&engine, &mut m.clone(), &RunParams::new(8)).unwrap();
        assert_eq!(one.barriers, 2);
        let two = RecursiveTasks.run(&engine, &mut m, &RunParams::new(4)).unwrap();
        assert_eq!(two.barriers, 2 + 8 * 2);
        assert_eq!(two.tasks_spawned, 2 * two.barriers);
    }

    #[test]
    fn invalid_size_leaves_matrix_untouched() {
        let engine = TaskEngine::new(1).unwrap();
        let input = Matrix::random(12, 3, 9).unwrap();
        let mut m = input.clone();
        assert!(RecursiveTasks.run(&engine, &mut m, &RunParams::new(4)).is_err());
        assert_eq!(m, input);
    }
}
