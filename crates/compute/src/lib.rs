pub mod engine;
pub mod harness;
pub mod kernel;
pub mod scheduler;
pub mod strategies;

pub use engine::{ExecContext, TaskEngine, TaskGroup, TaskPool};
pub use harness::{generate_input, validate, Harness, HarnessConfig, RunReport};
pub use kernel::MatrixView;
pub use scheduler::{Phase, PivotPlan, TileSpan, Tiling};
pub use strategies::{ExecutionStrategy, Family, RunParams, RunStats, StrategyKind};
