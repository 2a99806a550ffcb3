use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tilefw_core::{FwError, FwResult};

use crate::kernel::MatrixView;
use crate::scheduler::TileSpan;

use super::core::TaskEngine;
use super::task::Task;

/// Lifecycle of a pooled task object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u8)]
pub enum TaskState {
    /// Parameters set, not yet handed to the engine.
    Idle = 0,
    /// Spawned, waiting for a worker.
    Queued = 1,
    /// A worker is relaxing its span.
    Running = 2,
    /// Finished; may be recycled.
    Done = 3,
}

impl TaskState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskState::Idle,
            1 => TaskState::Queued,
            2 => TaskState::Running,
            _ => TaskState::Done,
        }
    }
}

/// A pre-allocated task whose parameters are reset between uses.
///
/// Parameters live in atomics so a slot can be reset by the driver and read
/// by a worker without locks; the state machine decides who may touch them.
#[derive(Debug)]
pub struct PooledTask {
    state: AtomicU8,
    params: [AtomicUsize; 6],
}

impl Default for PooledTask {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(TaskState::Idle as u8),
            params: Default::default(),
        }
    }
}

impl PooledTask {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> TaskState {
        TaskState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Current parameters.
    pub fn span(&self) -> TileSpan {
        let p = &self.params;
        TileSpan {
            pivot: p[0].load(Ordering::Relaxed),
            row_start: p[1].load(Ordering::Relaxed),
            row_end: p[2].load(Ordering::Relaxed),
            col_start: p[3].load(Ordering::Relaxed),
            col_end: p[4].load(Ordering::Relaxed),
            bs: p[5].load(Ordering::Relaxed),
        }
    }

    /// Reset a finished (or never used) task with new parameters.
    pub(crate) fn reset(&self, span: TileSpan) -> FwResult<()> {
        let current = self.state.load(Ordering::Acquire);
        if !matches!(TaskState::from_u8(current), TaskState::Idle | TaskState::Done) {
            return Err(FwError::TaskBusy);
        }
        self.state
            .compare_exchange(current, TaskState::Idle as u8, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| FwError::TaskBusy)?;
        let p = &self.params;
        p[0].store(span.pivot, Ordering::Relaxed);
        p[1].store(span.row_start, Ordering::Relaxed);
        p[2].store(span.row_end, Ordering::Relaxed);
        p[3].store(span.col_start, Ordering::Relaxed);
        p[4].store(span.col_end, Ordering::Relaxed);
        p[5].store(span.bs, Ordering::Relaxed);
        Ok(())
    }

    fn transition(&self, from: TaskState, to: TaskState) -> FwResult<()> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|_| FwError::TaskBusy)
    }
}

/// Handle to a pooled task, spawnable through [`TaskEngine::spawn`].
#[derive(Debug, Clone)]
pub struct PoolSlot(Arc<PooledTask>);

impl PoolSlot {
    pub fn task(&self) -> &PooledTask {
        &self.0
    }
}

impl Task for PoolSlot {
    fn prepare(&self) -> FwResult<()> {
        self.0.transition(TaskState::Idle, TaskState::Queued)
    }

    unsafe fn execute(&self, view: MatrixView) {
        let started = self.0.transition(TaskState::Queued, TaskState::Running);
        debug_assert!(started.is_ok(), "pooled task executed without being queued");
        self.0.span().relax(view);
        self.0.state.store(TaskState::Done as u8, Ordering::Release);
    }
}

/// Fixed set of task objects reused across every pivot iteration.
///
/// Sized up front to the largest number of tasks any single phase spawns;
/// asking for more is a configuration error, reported rather than
/// overwriting a slot that may still be in flight.
#[derive(Debug)]
pub struct TaskPool {
    slots: Vec<Arc<PooledTask>>,
    cursor: usize,
    high_water: usize,
    acquired: u64,
}

impl TaskPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity).map(|_| Arc::new(PooledTask::new())).collect(),
            cursor: 0,
            high_water: 0,
            acquired: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Largest number of slots handed out between two resets.
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Total slots handed out over the pool's lifetime.
    pub fn acquired(&self) -> u64 {
        self.acquired
    }

    /// Take the next slot, recycled with `span`.
    pub fn acquire(&mut self, engine: &TaskEngine, span: TileSpan) -> FwResult<PoolSlot> {
        let slot = self.slots.get(self.cursor).ok_or(FwError::PoolExhausted {
            capacity: self.slots.len(),
            requested: self.cursor + 1,
        })?;
        engine.recycle(slot, span)?;
        self.cursor += 1;
        self.acquired += 1;
        self.high_water = self.high_water.max(self.cursor);
        Ok(PoolSlot(Arc::clone(slot)))
    }

    /// Rewind after a barrier so the next phase reuses the same slots.
    pub fn reset(&mut self) {
        debug_assert!(
            self.slots[..self.cursor]
                .iter()
                .all(|t| t.state() == TaskState::Done),
            "pool reset while tasks are still in flight"
        );
        self.cursor = 0;
    }
}
