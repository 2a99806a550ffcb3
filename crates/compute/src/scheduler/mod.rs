//! Block-level dependency scheduling for tiled Floyd-Warshall.
//!
//! For every pivot tile k the work splits into three phases:
//! the diagonal tile (k,k), the cross stripes through it, and the remaining
//! tiles. Each phase reads only what earlier phases wrote, and tiles within a
//! phase never overlap, so a phase can run with unbounded parallelism once
//! the previous one has finished. Execution strategies differ only in how
//! they package the cross and remainder phases into units of work.

pub mod plan;
pub mod tiling;

pub use plan::{Phase, PivotPlan, Stripe};
pub use tiling::{TileSpan, Tiling};
