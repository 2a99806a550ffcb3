use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use tilefw_core::{FwResult, Matrix};

use crate::kernel::MatrixView;

use super::core::TaskEngine;
use super::latch::TaskGroup;
use super::task::Task;

/// Execution context of one strategy run, created by [`TaskEngine::execute`].
///
/// Holds the matrix borrow for as long as any task spawned through it may
/// still be running. Dropping the context waits for all of them.
pub struct ExecContext<'a> {
    engine: &'a TaskEngine,
    view: MatrixView,
    outstanding: Arc<TaskGroup>,
    spawned: Cell<u64>,
    barriers: Cell<u64>,
    _matrix: PhantomData<&'a mut Matrix>,
}

impl<'a> ExecContext<'a> {
    pub(crate) fn new(engine: &'a TaskEngine, matrix: &'a mut Matrix) -> Self {
        Self {
            engine,
            view: MatrixView::new(matrix),
            outstanding: Arc::new(TaskGroup::new()),
            spawned: Cell::new(0),
            barriers: Cell::new(0),
            _matrix: PhantomData,
        }
    }

    pub fn engine(&self) -> &'a TaskEngine {
        self.engine
    }

    pub fn view(&self) -> MatrixView {
        self.view
    }

    /// Tasks spawned through this context so far.
    pub fn spawned(&self) -> u64 {
        self.spawned.get()
    }

    /// Barriers waited through this context so far.
    pub fn barriers(&self) -> u64 {
        self.barriers.get()
    }

    /// Spawn `task` under `parent` on the context's engine.
    ///
    /// # Safety
    ///
    /// See [`TaskEngine::spawn`].
    pub unsafe fn spawn<T: Task>(&self, parent: &Arc<TaskGroup>, task: T) -> FwResult<()> {
        self.engine.spawn(self, parent, task)
    }

    /// Phase barrier: wait for every child of `parent`.
    pub fn wait(&self, parent: &TaskGroup) {
        self.engine.wait_for_children(parent);
        self.count_barrier();
    }

    /// Record a barrier crossed outside the task API (a parallel loop
    /// returning, a join completing).
    pub fn count_barrier(&self) {
        self.barriers.set(self.barriers.get() + 1);
    }

    pub(crate) fn outstanding(&self) -> &Arc<TaskGroup> {
        &self.outstanding
    }

    pub(crate) fn count_spawn(&self) {
        self.spawned.set(self.spawned.get() + 1);
    }
}

impl Drop for ExecContext<'_> {
    fn drop(&mut self) {
        self.engine.drain(&self.outstanding);
    }
}
