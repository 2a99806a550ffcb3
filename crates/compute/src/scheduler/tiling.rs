use std::ops::Range;

use serde::Serialize;
use tilefw_core::{FwError, FwResult};

use crate::kernel::MatrixView;

use super::plan::PivotPlan;

/// Partition of an N×N matrix into `bs × bs` tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tiling {
    n: usize,
    bs: usize,
}

impl Tiling {
    /// Validate that `bs` divides `n` (both positive).
    pub fn new(n: usize, bs: usize) -> FwResult<Self> {
        if n == 0 || bs == 0 || n % bs != 0 {
            return Err(FwError::InvalidTiling { size: n, block: bs });
        }
        Ok(Self { n, bs })
    }

    pub fn size(&self) -> usize {
        self.n
    }

    pub fn block_size(&self) -> usize {
        self.bs
    }

    /// Number of tiles along one side (N / bs).
    pub fn tiles_per_side(&self) -> usize {
        self.n / self.bs
    }

    /// One plan per pivot tile, in the order they must execute.
    pub fn pivots(&self) -> impl Iterator<Item = PivotPlan> + '_ {
        (0..self.tiles_per_side()).map(move |t| PivotPlan::new(*self, t))
    }

    /// Tasks the cross phase needs when every stripe tile is its own task.
    pub fn max_cross_tasks(&self) -> usize {
        2 * (self.tiles_per_side() - 1)
    }

    /// Tasks the remainder phase needs when every tile is its own task.
    pub fn max_remainder_tasks(&self) -> usize {
        let off = self.tiles_per_side() - 1;
        off * off
    }
}

/// A rectangle of whole tiles relaxed against one pivot tile.
///
/// The span is relaxed tile by tile (row-major), each tile with the full
/// pivot range as the outermost loop. A single tile is a span of one row
/// and one column of tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileSpan {
    /// First index of the pivot tile (k).
    pub pivot: usize,
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
    /// Tile edge length.
    pub bs: usize,
}

impl TileSpan {
    pub fn new(pivot: usize, rows: Range<usize>, cols: Range<usize>, bs: usize) -> Self {
        Self {
            pivot,
            row_start: rows.start,
            row_end: rows.end.max(rows.start),
            col_start: cols.start,
            col_end: cols.end.max(cols.start),
            bs,
        }
    }

    /// The single tile whose top-left corner is `(row, col)`.
    pub fn tile(pivot: usize, row: usize, col: usize, bs: usize) -> Self {
        Self::new(pivot, row..row + bs, col..col + bs, bs)
    }

    pub fn pivot_range(&self) -> Range<usize> {
        self.pivot..self.pivot + self.bs
    }

    pub fn rows(&self) -> Range<usize> {
        self.row_start..self.row_end
    }

    pub fn cols(&self) -> Range<usize> {
        self.col_start..self.col_end
    }

    pub fn is_empty(&self) -> bool {
        self.row_start == self.row_end || self.col_start == self.col_end
    }

    pub fn tile_count(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        ((self.row_end - self.row_start) / self.bs) * ((self.col_end - self.col_start) / self.bs)
    }

    /// Tile coordinates `(row_tile, col_tile)` covered by this span.
    pub fn tile_coords(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        let bs = self.bs;
        self.rows()
            .step_by(bs)
            .flat_map(move |r| self.cols().step_by(bs).map(move |c| (r / bs, c / bs)))
    }

    /// Split into single-tile spans, row-major.
    pub fn tiles(&self) -> impl Iterator<Item = TileSpan> + '_ {
        let bs = self.bs;
        self.tile_coords()
            .map(move |(r, c)| TileSpan::tile(self.pivot, r * bs, c * bs, bs))
    }

    pub fn overlaps(&self, other: &TileSpan) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.row_start < other.row_end
            && other.row_start < self.row_end
            && self.col_start < other.col_end
            && other.col_start < self.col_end
    }

    /// Relax every tile of the span against the pivot tile.
    ///
    /// # Safety
    ///
    /// See [`MatrixView::relax`]: the span must lie inside the matrix and no
    /// concurrently running span may overlap it or write the pivot row/column
    /// tiles it reads.
    pub unsafe fn relax(&self, view: MatrixView) {
        let bs = self.bs;
        for r in self.rows().step_by(bs) {
            for c in self.cols().step_by(bs) {
                view.relax(self.pivot_range(), r..r + bs, c..c + bs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiling_rejects_non_divisible_sizes() {
        assert_eq!(
            Tiling::new(10, 4).unwrap_err(),
            FwError::InvalidTiling { size: 10, block: 4 }
        );
        assert!(Tiling::new(0, 4).is_err());
        assert!(Tiling::new(8, 0).is_err());
        assert_eq!(Tiling::new(8, 4).unwrap().tiles_per_side(), 2);
    }

    #[test]
    fn pool_sizes_follow_tile_count() {
        let t = Tiling::new(1024, 64).unwrap();
        assert_eq!(t.max_cross_tasks(), 2 * 15);
        assert_eq!(t.max_remainder_tasks(), 15 * 15);

        let single = Tiling::new(16, 16).unwrap();
        assert_eq!(single.max_cross_tasks(), 0);
        assert_eq!(single.max_remainder_tasks(), 0);
    }

    #[test]
    fn span_splits_into_tiles_row_major() {
        let span = TileSpan::new(0, 0..4, 4..8, 2);
        let coords: Vec<_> = span.tile_coords().collect();
        assert_eq!(coords, vec![(0, 2), (0, 3), (1, 2), (1, 3)]);
        assert_eq!(span.tile_count(), 4);
        assert!(span.tiles().all(|t| t.tile_count() == 1));
    }

    #[test]
    fn empty_span_has_no_tiles() {
        let span = TileSpan::new(0, 0..0, 2..8, 2);
        assert!(span.is_empty());
        assert_eq!(span.tile_count(), 0);
        assert_eq!(span.tiles().count(), 0);
    }

    #[test]
    fn overlap_detection() {
        let a = TileSpan::new(0, 0..4, 0..4, 2);
        let b = TileSpan::new(0, 2..4, 2..6, 2);
        let c = TileSpan::new(0, 4..6, 0..4, 2);
        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&TileSpan::new(0, 0..0, 0..4, 2)));
    }
}
