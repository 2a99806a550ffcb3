use serde::Serialize;

use super::tiling::{TileSpan, Tiling};

/// Dependency-ordered stage of one pivot iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, PartialOrd, Ord)]
pub enum Phase {
    /// The pivot tile (k,k), relaxed alone.
    Diagonal,
    /// Row stripe (k,j) and column stripe (i,k), j,i ≠ k.
    Cross,
    /// Every tile (i,j) with i ≠ k and j ≠ k.
    Remainder,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Diagonal, Phase::Cross, Phase::Remainder];

    /// The phase that must be fully complete before this one starts.
    pub fn depends_on(self) -> Option<Phase> {
        match self {
            Phase::Diagonal => None,
            Phase::Cross => Some(Phase::Diagonal),
            Phase::Remainder => Some(Phase::Cross),
        }
    }
}

/// Which side of the pivot a cross stripe lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stripe {
    RowBefore,
    RowAfter,
    ColBefore,
    ColAfter,
}

/// The work of one pivot iteration, split into its three phases.
///
/// Tiles are addressed by their first matrix index; `pivot_tile` is the
/// tile index of the pivot (k / bs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PivotPlan {
    tiling: Tiling,
    pivot_tile: usize,
}

impl PivotPlan {
    pub fn new(tiling: Tiling, pivot_tile: usize) -> Self {
        debug_assert!(pivot_tile < tiling.tiles_per_side());
        Self { tiling, pivot_tile }
    }

    pub fn pivot_tile(&self) -> usize {
        self.pivot_tile
    }

    /// First matrix index of the pivot tile.
    pub fn k(&self) -> usize {
        self.pivot_tile * self.tiling.block_size()
    }

    pub fn tiling(&self) -> Tiling {
        self.tiling
    }

    fn bs(&self) -> usize {
        self.tiling.block_size()
    }

    fn n(&self) -> usize {
        self.tiling.size()
    }

    /// Phase 1: the pivot tile.
    pub fn diagonal(&self) -> TileSpan {
        TileSpan::tile(self.k(), self.k(), self.k(), self.bs())
    }

    /// Phase 2 as four stripes: row before/after the pivot, column
    /// before/after the pivot. Stripes at the matrix edge are empty.
    pub fn cross_stripes(&self) -> [(Stripe, TileSpan); 4] {
        let (k, bs, n) = (self.k(), self.bs(), self.n());
        let pivot = k..k + bs;
        [
            (Stripe::RowBefore, TileSpan::new(k, pivot.clone(), 0..k, bs)),
            (Stripe::RowAfter, TileSpan::new(k, pivot.clone(), k + bs..n, bs)),
            (Stripe::ColBefore, TileSpan::new(k, 0..k, pivot.clone(), bs)),
            (Stripe::ColAfter, TileSpan::new(k, k + bs..n, pivot, bs)),
        ]
    }

    /// Phase 2 as one span per tile.
    pub fn cross_tiles(&self) -> Vec<TileSpan> {
        self.cross_stripes()
            .iter()
            .flat_map(|(_, stripe)| stripe.tiles().collect::<Vec<_>>())
            .collect()
    }

    /// Phase 3 as the four off-diagonal quadrants around the pivot cross.
    pub fn remainder_quadrants(&self) -> [TileSpan; 4] {
        let (k, bs, n) = (self.k(), self.bs(), self.n());
        [
            TileSpan::new(k, 0..k, 0..k, bs),
            TileSpan::new(k, 0..k, k + bs..n, bs),
            TileSpan::new(k, k + bs..n, 0..k, bs),
            TileSpan::new(k, k + bs..n, k + bs..n, bs),
        ]
    }

    /// Phase 3 as one span per tile row on each side of the pivot column.
    pub fn remainder_rows(&self) -> Vec<TileSpan> {
        let (k, bs, n) = (self.k(), self.bs(), self.n());
        let mut rows = Vec::with_capacity(2 * self.tiling.tiles_per_side());
        for quadrant in self.remainder_quadrants() {
            if quadrant.is_empty() {
                continue;
            }
            for r in quadrant.rows().step_by(bs) {
                rows.push(TileSpan::new(k, r..r + bs, quadrant.cols(), bs));
            }
        }
        debug_assert!(rows.iter().all(|s| s.col_end <= n));
        rows
    }

    /// Phase 3 as one span per tile.
    pub fn remainder_tiles(&self) -> Vec<TileSpan> {
        self.remainder_quadrants()
            .iter()
            .flat_map(|q| q.tiles().collect::<Vec<_>>())
            .collect()
    }

    /// All spans of a phase at single-tile granularity.
    pub fn phase_tiles(&self, phase: Phase) -> Vec<TileSpan> {
        match phase {
            Phase::Diagonal => vec![self.diagonal()],
            Phase::Cross => self.cross_tiles(),
            Phase::Remainder => self.remainder_tiles(),
        }
    }

    /// Every phase with its tiles, in execution order.
    pub fn phases(&self) -> impl Iterator<Item = (Phase, Vec<TileSpan>)> + '_ {
        Phase::ALL.into_iter().map(move |phase| (phase, self.phase_tiles(phase)))
    }

    /// Phase a tile (by tile coordinates) belongs to in this iteration.
    pub fn phase_of(&self, row_tile: usize, col_tile: usize) -> Phase {
        let p = self.pivot_tile;
        match (row_tile == p, col_tile == p) {
            (true, true) => Phase::Diagonal,
            (true, false) | (false, true) => Phase::Cross,
            (false, false) => Phase::Remainder,
        }
    }

    /// Tiles, other than itself, whose values this iteration reads when
    /// relaxing tile `(row_tile, col_tile)`.
    ///
    /// Relaxing (i,j) against pivot k reads (i,k) and (k,j); for the cross
    /// stripes one of those is the tile itself and the other the diagonal.
    pub fn reads(&self, row_tile: usize, col_tile: usize) -> Vec<(usize, usize)> {
        let p = self.pivot_tile;
        let mut deps = Vec::with_capacity(2);
        for dep in [(row_tile, p), (p, col_tile)] {
            if dep != (row_tile, col_tile) && !deps.contains(&dep) {
                deps.push(dep);
            }
        }
        deps
    }
}
