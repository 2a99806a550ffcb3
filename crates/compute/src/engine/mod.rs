//! Worker pool and task lifecycle.
//!
//! [`TaskEngine`] wraps a rayon thread pool. Task-style strategies spawn
//! [`Task`]s under a [`TaskGroup`] parent inside an [`ExecContext`] and wait
//! on the group at every phase barrier. [`TaskPool`] keeps a fixed set of
//! [`PooledTask`]s that are recycled across pivot iterations instead of being
//! allocated per phase.

mod context;
mod core;
mod latch;
mod metrics;
mod pool;
mod task;

pub use self::context::ExecContext;
pub use self::core::TaskEngine;
pub use self::latch::TaskGroup;
pub use self::metrics::{EngineMetrics, MetricsSnapshot};
pub use self::pool::{PoolSlot, PooledTask, TaskPool, TaskState};
pub use self::task::{RelaxTask, Task};
