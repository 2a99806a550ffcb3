//! Execution strategies: the same Floyd-Warshall computation packaged into
//! work units of different granularity.
//!
//! Every strategy mutates the matrix in place and produces output identical
//! to the naive [`Serial`] triple loop.

mod coarse_row_task;
mod coarse_task;
mod fine_task;
mod fine_task_recycled;
mod grain;
mod loop_fused;
mod loop_parallel;
mod nested;
mod phased;
mod recursive;
mod row_task;
mod serial;
mod standard;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tilefw_core::{FwError, FwResult, Matrix};

use crate::engine::{ExecContext, TaskEngine};
use crate::scheduler::Tiling;

pub use coarse_row_task::CoarseRowTask;
pub use coarse_task::CoarseTask;
pub use fine_task::FineTask;
pub use fine_task_recycled::FineTaskRecycled;
pub use loop_fused::LoopFused;
pub use loop_parallel::LoopParallel;
pub use nested::Nested;
pub use recursive::{Recursive, RecursiveTasks};
pub use row_task::RowTask;
pub use serial::{Serial, TiledSerial};
pub use standard::{Standard1d, Standard2d};

/// Sizing parameters shared by all strategies. Each strategy reads the
/// fields it needs and ignores the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunParams {
    /// Tile edge length (tiled strategies) or recursion cut-off (recursive).
    pub block_size: usize,
    /// Minimum contiguous row range per work unit in loop strategies.
    pub x_grain: usize,
    /// Minimum contiguous column range per work unit in 2D loop strategies.
    pub y_grain: usize,
}

impl RunParams {
    /// Grains default to the block size.
    pub fn new(block_size: usize) -> Self {
        Self {
            block_size,
            x_grain: block_size,
            y_grain: block_size,
        }
    }

    pub fn with_grains(mut self, x_grain: usize, y_grain: usize) -> Self {
        self.x_grain = x_grain;
        self.y_grain = y_grain;
        self
    }

    pub(crate) fn tiling(&self, n: usize) -> FwResult<Tiling> {
        Tiling::new(n, self.block_size)
    }

    pub(crate) fn check_grains(&self) -> FwResult<()> {
        if self.x_grain == 0 || self.y_grain == 0 {
            return Err(FwError::InvalidParams(format!(
                "grain sizes must be positive (x_grain={}, y_grain={})",
                self.x_grain, self.y_grain
            )));
        }
        Ok(())
    }
}

/// What one strategy run did besides relaxing cells.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    /// Tasks handed to the engine.
    pub tasks_spawned: u64,
    /// Synchronization points crossed.
    pub barriers: u64,
    /// Slots pre-allocated by a recycling strategy.
    pub pool_capacity: Option<usize>,
    /// Most slots in use between two barriers.
    pub pool_high_water: Option<usize>,
}

impl RunStats {
    pub(crate) fn from_context(ctx: &ExecContext<'_>) -> Self {
        Self {
            tasks_spawned: ctx.spawned(),
            barriers: ctx.barriers(),
            ..Default::default()
        }
    }
}

/// A way of scheduling the Floyd-Warshall computation on a [`TaskEngine`].
pub trait ExecutionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().name()
    }

    fn family(&self) -> Family {
        self.kind().family()
    }

    /// Reject matrix sizes and parameters this strategy cannot handle.
    fn check(&self, n: usize, params: &RunParams) -> FwResult<()>;

    /// Compute all-pairs shortest paths of `matrix` in place. Returns once
    /// every phase of every pivot iteration has completed.
    fn run(
        &self,
        engine: &TaskEngine,
        matrix: &mut Matrix,
        params: &RunParams,
    ) -> FwResult<RunStats>;
}

/// Benchmark group a strategy is run in; maps to a CLI subcommand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    /// Tile-based loops and tasks, with grain sizes.
    Tiled,
    /// Tile-per-task strategies, with and without recycling.
    Tasks,
    /// Divide-and-conquer.
    Recursive,
    /// Untiled per-pivot loops.
    Standard,
}

impl Family {
    /// Strategies the family's benchmark runs, baseline first.
    pub fn members(self) -> &'static [StrategyKind] {
        match self {
            Family::Tiled => &[
                StrategyKind::TiledSerial,
                StrategyKind::LoopParallel,
                StrategyKind::Nested,
                StrategyKind::LoopFused,
                StrategyKind::CoarseTask,
                StrategyKind::CoarseRowTask,
                StrategyKind::RowTask,
                StrategyKind::FineTask,
            ],
            Family::Tasks => &[StrategyKind::FineTask, StrategyKind::FineTaskRecycled],
            Family::Recursive => &[StrategyKind::Recursive, StrategyKind::RecursiveTasks],
            Family::Standard => &[
                StrategyKind::Serial,
                StrategyKind::Standard1d,
                StrategyKind::Standard2d,
            ],
        }
    }
}

/// Every available strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Serial,
    TiledSerial,
    LoopParallel,
    LoopFused,
    Nested,
    CoarseTask,
    CoarseRowTask,
    RowTask,
    FineTask,
    FineTaskRecycled,
    #[serde(rename = "standard-1d")]
    Standard1d,
    #[serde(rename = "standard-2d")]
    Standard2d,
    Recursive,
    RecursiveTasks,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 14] = [
        StrategyKind::Serial,
        StrategyKind::TiledSerial,
        StrategyKind::LoopParallel,
        StrategyKind::LoopFused,
        StrategyKind::Nested,
        StrategyKind::CoarseTask,
        StrategyKind::CoarseRowTask,
        StrategyKind::RowTask,
        StrategyKind::FineTask,
        StrategyKind::FineTaskRecycled,
        StrategyKind::Standard1d,
        StrategyKind::Standard2d,
        StrategyKind::Recursive,
        StrategyKind::RecursiveTasks,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::Serial => "serial",
            StrategyKind::TiledSerial => "tiled-serial",
            StrategyKind::LoopParallel => "loop-parallel",
            StrategyKind::LoopFused => "loop-fused",
            StrategyKind::Nested => "nested",
            StrategyKind::CoarseTask => "coarse-task",
            StrategyKind::CoarseRowTask => "coarse-row-task",
            StrategyKind::RowTask => "row-task",
            StrategyKind::FineTask => "fine-task",
            StrategyKind::FineTaskRecycled => "fine-task-recycled",
            StrategyKind::Standard1d => "standard-1d",
            StrategyKind::Standard2d => "standard-2d",
            StrategyKind::Recursive => "recursive",
            StrategyKind::RecursiveTasks => "recursive-tasks",
        }
    }

    /// The family this strategy primarily belongs to.
    pub fn family(self) -> Family {
        match self {
            StrategyKind::Serial | StrategyKind::Standard1d | StrategyKind::Standard2d => {
                Family::Standard
            }
            StrategyKind::Recursive | StrategyKind::RecursiveTasks => Family::Recursive,
            StrategyKind::FineTaskRecycled => Family::Tasks,
            _ => Family::Tiled,
        }
    }

    /// Whether the strategy needs `block_size` to divide the matrix size.
    pub fn is_tiled(self) -> bool {
        !matches!(
            self,
            StrategyKind::Serial
                | StrategyKind::Standard1d
                | StrategyKind::Standard2d
                | StrategyKind::Recursive
                | StrategyKind::RecursiveTasks
        )
    }

    pub fn build(self) -> Box<dyn ExecutionStrategy> {
        match self {
            StrategyKind::Serial => Box::new(Serial),
            StrategyKind::TiledSerial => Box::new(TiledSerial),
            StrategyKind::LoopParallel => Box::new(LoopParallel),
            StrategyKind::LoopFused => Box::new(LoopFused),
            StrategyKind::Nested => Box::new(Nested),
            StrategyKind::CoarseTask => Box::new(CoarseTask),
            StrategyKind::CoarseRowTask => Box::new(CoarseRowTask),
            StrategyKind::RowTask => Box::new(RowTask),
            StrategyKind::FineTask => Box::new(FineTask),
            StrategyKind::FineTaskRecycled => Box::new(FineTaskRecycled),
            StrategyKind::Standard1d => Box::new(Standard1d),
            StrategyKind::Standard2d => Box::new(Standard2d),
            StrategyKind::Recursive => Box::new(Recursive),
            StrategyKind::RecursiveTasks => Box::new(RecursiveTasks),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = StrategyKind::ALL.iter().map(|k| k.name()).collect();
                format!("unknown strategy '{}' (expected one of: {})", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for kind in StrategyKind::ALL {
            assert_eq!(kind.name().parse::<StrategyKind>(), Ok(kind));
            assert_eq!(kind.to_string(), kind.name());
            assert_eq!(kind.build().kind(), kind);
        }
        assert_eq!("Fine_Task".parse::<StrategyKind>(), Ok(StrategyKind::FineTask));
        assert!("quantum".parse::<StrategyKind>().unwrap_err().contains("loop-parallel"));
    }

    #[test]
    fn serde_names_match_display() {
        for kind in StrategyKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn every_kind_is_run_by_some_family() {
        let families = [Family::Tiled, Family::Tasks, Family::Recursive, Family::Standard];
        for kind in StrategyKind::ALL {
            assert!(
                families.iter().any(|f| f.members().contains(&kind)),
                "{} is not run by any family",
                kind
            );
            assert!(kind.family().members().contains(&kind));
        }
    }

    #[test]
    fn grains_default_to_block_size() {
        let p = RunParams::new(16);
        assert_eq!((p.x_grain, p.y_grain), (16, 16));
        let p = p.with_grains(4, 8);
        assert_eq!((p.block_size, p.x_grain, p.y_grain), (16, 4, 8));
        assert!(RunParams::new(4).with_grains(0, 4).check_grains().is_err());
    }

    #[test]
    fn tiled_strategies_reject_non_dividing_block() {
        let params = RunParams::new(3);
        for kind in StrategyKind::ALL.into_iter().filter(|k| k.is_tiled()) {
            assert_eq!(
                kind.build().check(8, &params),
                Err(FwError::InvalidTiling { size: 8, block: 3 }),
                "{}",
                kind
            );
        }
    }
}
