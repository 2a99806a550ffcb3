//! The sequential relaxation primitive of Floyd-Warshall.
//!
//! Everything parallel in this crate eventually bottoms out in one of the
//! functions here. None of them synchronize: ordering between phases and
//! disjointness of concurrently written cells are the caller's job.

use std::ops::Range;
use std::ptr::NonNull;

use tilefw_core::{Matrix, Weight};

/// Shared, copyable view of a [`Matrix`] handed to concurrently running tasks.
///
/// The view erases the borrow so it can travel into worker threads. It is
/// only ever created by [`crate::engine::TaskEngine::execute`] (or from an
/// exclusive borrow in the serial helpers below), which keeps the matrix
/// borrowed until every task holding a copy has finished.
#[derive(Debug, Clone, Copy)]
pub struct MatrixView {
    ptr: NonNull<Weight>,
    n: usize,
}

// SAFETY: the view is a plain pointer + size. All accesses go through the
// unsafe methods below, whose callers guarantee that concurrently running
// tasks write disjoint cells and never write a cell another task reads in
// the same phase.
unsafe impl Send for MatrixView {}
unsafe impl Sync for MatrixView {}

impl MatrixView {
    pub(crate) fn new(matrix: &mut Matrix) -> Self {
        let n = matrix.size();
        let ptr = NonNull::new(matrix.as_mut_slice().as_mut_ptr()).unwrap_or(NonNull::dangling());
        Self { ptr, n }
    }

    /// Side length N of the underlying matrix.
    pub fn size(&self) -> usize {
        self.n
    }

    /// `A[i][j] = min(A[i][j], A[i][k] + A[k][j])` over the cuboid
    /// `k × i × j`, with `k` outermost.
    ///
    /// # Safety
    ///
    /// All ranges must lie inside `0..N`, the matrix must still be alive, and
    /// no concurrently running call may write a cell in `i × j`, or write a
    /// cell in `i × k` or `k × j` that this call reads.
    pub unsafe fn relax(&self, k: Range<usize>, i: Range<usize>, j: Range<usize>) {
        debug_assert!(k.end <= self.n && i.end <= self.n && j.end <= self.n);
        let n = self.n;
        let base = self.ptr.as_ptr();
        for kk in k {
            let row_k = base.add(kk * n);
            for ii in i.clone() {
                let row_i = base.add(ii * n);
                let a_ik = *row_i.add(kk);
                for jj in j.clone() {
                    let via = a_ik.saturating_add(*row_k.add(jj));
                    let cell = row_i.add(jj);
                    if via < *cell {
                        *cell = via;
                    }
                }
            }
        }
    }

    /// Base case of recursive FW: `A[a+i][a+j] = min(A[a+i][a+j], B[i][k] + C[k][j])`
    /// for `k, i, j` in `0..m`, where `A`, `B` and `C` are `m × m` sub-blocks
    /// identified by their top-left corners. The blocks may alias.
    ///
    /// # Safety
    ///
    /// Same contract as [`MatrixView::relax`], applied to the block `A`
    /// (written) and the blocks `B`, `C` (read).
    pub unsafe fn relax_quadrant(
        &self,
        a: (usize, usize),
        b: (usize, usize),
        c: (usize, usize),
        m: usize,
    ) {
        debug_assert!(a.0 + m <= self.n && a.1 + m <= self.n);
        debug_assert!(b.0 + m <= self.n && b.1 + m <= self.n);
        debug_assert!(c.0 + m <= self.n && c.1 + m <= self.n);
        let n = self.n;
        let base = self.ptr.as_ptr();
        for k in 0..m {
            let row_c = base.add((c.0 + k) * n + c.1);
            for i in 0..m {
                let b_ik = *base.add((b.0 + i) * n + b.1 + k);
                let row_a = base.add((a.0 + i) * n + a.1);
                for j in 0..m {
                    let via = b_ik.saturating_add(*row_c.add(j));
                    let cell = row_a.add(j);
                    if via < *cell {
                        *cell = via;
                    }
                }
            }
        }
    }

    /// Copy row `k` into `row` and column `k` into `col`.
    ///
    /// # Safety
    ///
    /// `k < N`, both buffers hold N values, and no task writes row or
    /// column `k` concurrently.
    pub unsafe fn snapshot_pivot(&self, k: usize, row: &mut [Weight], col: &mut [Weight]) {
        debug_assert!(k < self.n && row.len() == self.n && col.len() == self.n);
        let n = self.n;
        let base = self.ptr.as_ptr();
        std::ptr::copy_nonoverlapping(base.add(k * n), row.as_mut_ptr(), n);
        for (i, cell) in col.iter_mut().enumerate() {
            *cell = *base.add(i * n + k);
        }
    }

    /// Relax `rows × cols` for the single pivot `k` using snapshots of the
    /// pivot row and pivot column taken before the iteration started.
    ///
    /// # Safety
    ///
    /// Ranges inside `0..N`; no concurrent call writes a cell in `rows × cols`.
    /// Reads of row `k` / column `k` come from the snapshots, so overlap with
    /// the pivot row or column is allowed.
    pub unsafe fn relax_with_pivots(
        &self,
        rows: Range<usize>,
        cols: Range<usize>,
        pivot_row: &[Weight],
        pivot_col: &[Weight],
    ) {
        debug_assert!(rows.end <= self.n && cols.end <= self.n);
        let n = self.n;
        let base = self.ptr.as_ptr();
        for i in rows {
            let a_ik = pivot_col[i];
            let row_i = base.add(i * n);
            for j in cols.clone() {
                let via = a_ik.saturating_add(pivot_row[j]);
                let cell = row_i.add(j);
                if via < *cell {
                    *cell = via;
                }
            }
        }
    }
}

/// Exclusive-borrow version of [`MatrixView::relax`] for serial code.
///
/// Panics if a range reaches past the matrix.
pub fn relax(matrix: &mut Matrix, k: Range<usize>, i: Range<usize>, j: Range<usize>) {
    let n = matrix.size();
    assert!(
        k.end <= n && i.end <= n && j.end <= n,
        "relax cuboid {:?}x{:?}x{:?} exceeds matrix of size {}",
        k,
        i,
        j,
        n
    );
    let view = MatrixView::new(matrix);
    // SAFETY: ranges checked above; `matrix` is exclusively borrowed, so no
    // other access can race.
    unsafe { view.relax(k, i, j) }
}

/// Relax one full row against a snapshot of the pivot row.
///
/// Used by the untiled row-parallel strategy, where each worker owns a set
/// of rows outright.
pub fn relax_row(row: &mut [Weight], a_ik: Weight, pivot_row: &[Weight]) {
    for (cell, &a_kj) in row.iter_mut().zip(pivot_row) {
        let via = a_ik.saturating_add(a_kj);
        if via < *cell {
            *cell = via;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilefw_core::INF;

    fn scenario() -> Matrix {
        Matrix::from_rows(&[
            vec![0, 3, 8, INF],
            vec![INF, 0, INF, 1],
            vec![4, INF, 0, INF],
            vec![INF, 1, 4, 0],
        ])
        .unwrap()
    }

    #[test]
    fn full_cuboid_is_floyd_warshall() {
        let mut m = scenario();
        relax(&mut m, 0..4, 0..4, 0..4);
        let expected = Matrix::from_rows(&[
            vec![0, 3, 8, 4],
            vec![9, 0, 5, 1],
            vec![4, 7, 0, 8],
            vec![8, 1, 4, 0],
        ])
        .unwrap();
        assert_eq!(m, expected);
    }

    #[test]
    fn empty_ranges_touch_nothing() {
        let mut m = scenario();
        relax(&mut m, 0..0, 0..4, 0..4);
        relax(&mut m, 0..4, 2..2, 0..4);
        assert_eq!(m, scenario());
    }

    #[test]
    fn infinity_never_overflows() {
        let mut m = Matrix::new(3, INF).unwrap();
        relax(&mut m, 0..3, 0..3, 0..3);
        assert!(m.as_slice().iter().all(|&w| w == INF));

        let mut huge = Matrix::new(2, Weight::MAX).unwrap();
        relax(&mut huge, 0..2, 0..2, 0..2);
        assert!(huge.as_slice().iter().all(|&w| w == Weight::MAX));
    }

    #[test]
    #[should_panic(expected = "exceeds matrix")]
    fn out_of_bounds_cuboid_panics() {
        let mut m = scenario();
        relax(&mut m, 0..5, 0..4, 0..4);
    }

    #[test]
    fn relax_row_uses_snapshot() {
        let mut row = vec![10, 10, 10];
        relax_row(&mut row, 2, &[1, 20, 3]);
        assert_eq!(row, vec![3, 10, 5]);
    }

    #[test]
    fn pivot_snapshot_copies_row_and_column() {
        let mut m = scenario();
        let view = MatrixView::new(&mut m);
        let (mut row, mut col) = (vec![0; 4], vec![0; 4]);
        // SAFETY: sole access to the matrix.
        unsafe { view.snapshot_pivot(2, &mut row, &mut col) };
        assert_eq!(row, vec![4, INF, 0, INF]);
        assert_eq!(col, vec![8, INF, 0, 4]);
    }

    #[test]
    fn single_cell_matrix_is_fixed_point() {
        let mut m = Matrix::new(1, 0).unwrap();
        relax(&mut m, 0..1, 0..1, 0..1);
        assert_eq!(m.get(0, 0), 0);
    }
}
