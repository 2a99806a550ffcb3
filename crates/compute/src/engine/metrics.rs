use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Engine counters, updated lock-free from the driver and worker threads.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    tasks_spawned: AtomicU64,
    tasks_completed: AtomicU64,
    tasks_recycled: AtomicU64,
    barriers: AtomicU64,
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Tasks handed to the pool.
    pub tasks_spawned: u64,
    /// Tasks that finished executing.
    pub tasks_completed: u64,
    /// Pooled tasks reset with new parameters.
    pub tasks_recycled: u64,
    /// Barriers waited on by drivers.
    pub barriers: u64,
}

impl EngineMetrics {
    pub fn record_spawn(&self) {
        self.tasks_spawned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.tasks_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recycle(&self) {
        self.tasks_recycled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_barrier(&self) {
        self.barriers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_spawned: self.tasks_spawned.load(Ordering::Relaxed),
            tasks_completed: self.tasks_completed.load(Ordering::Relaxed),
            tasks_recycled: self.tasks_recycled.load(Ordering::Relaxed),
            barriers: self.barriers.load(Ordering::Relaxed),
        }
    }
}

impl MetricsSnapshot {
    /// Counter deltas accumulated since `earlier`.
    pub fn since(&self, earlier: &MetricsSnapshot) -> MetricsSnapshot {
        MetricsSnapshot {
            tasks_spawned: self.tasks_spawned - earlier.tasks_spawned,
            tasks_completed: self.tasks_completed - earlier.tasks_completed,
            tasks_recycled: self.tasks_recycled - earlier.tasks_recycled,
            barriers: self.barriers - earlier.barriers,
        }
    }

    /// Tasks spawned but not yet finished at snapshot time.
    pub fn in_flight(&self) -> u64 {
        self.tasks_spawned.saturating_sub(self.tasks_completed)
    }
}
