use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder, Yield};
use tilefw_core::{FwError, FwResult, Matrix};
use tracing::{debug, info, trace};

use crate::scheduler::TileSpan;

use super::context::ExecContext;
use super::latch::TaskGroup;
use super::metrics::{EngineMetrics, MetricsSnapshot};
use super::pool::PooledTask;
use super::task::Task;

/// Fixed pool of worker threads shared by every strategy of a process run.
///
/// Two ways in: task-style strategies [`spawn`](TaskEngine::spawn) units of
/// work under a parent [`TaskGroup`] and wait for the group at each phase
/// barrier; loop-style strategies [`install`](TaskEngine::install) rayon
/// parallel iterators or [`join`](TaskEngine::join) closures on the same
/// workers.
pub struct TaskEngine {
    pool: ThreadPool,
    threads: usize,
    metrics: Arc<EngineMetrics>,
}

impl std::fmt::Debug for TaskEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEngine")
            .field("threads", &self.threads)
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}

impl TaskEngine {
    /// Start `threads` named worker threads.
    pub fn new(threads: usize) -> FwResult<Self> {
        if threads == 0 {
            return Err(FwError::InvalidParams(
                "task engine needs at least one worker thread".into(),
            ));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("tilefw-worker-{}", i))
            .build()
            .map_err(|e| FwError::ThreadPool(e.to_string()))?;
        info!(threads, "Task engine started");
        Ok(Self {
            pool,
            threads,
            metrics: Arc::new(EngineMetrics::default()),
        })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Run `op` on a worker of this pool and return its result.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.pool.install(op)
    }

    /// Run `a` and `b` potentially in parallel on this pool.
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        self.pool.install(|| rayon::join(a, b))
    }

    /// Open a context for spawning tasks against `matrix`.
    ///
    /// The context owns the only [`MatrixView`](crate::kernel::MatrixView) of
    /// the matrix. When `body` returns, successfully or not, the context
    /// waits for every task spawned through it before the borrow ends.
    pub fn execute<R>(
        &self,
        matrix: &mut Matrix,
        body: impl FnOnce(&ExecContext<'_>) -> FwResult<R>,
    ) -> FwResult<R> {
        let ctx = ExecContext::new(self, matrix);
        let result = body(&ctx);
        debug!(
            spawned = ctx.spawned(),
            barriers = ctx.barriers(),
            ok = result.is_ok(),
            "Execution context closing"
        );
        drop(ctx);
        result
    }

    /// Queue `task` as a child of `parent`. Returns as soon as it is queued.
    ///
    /// The parent's counter is incremented before the task becomes visible to
    /// any worker, so a concurrent [`wait_for_children`] cannot miss it.
    ///
    /// # Safety
    ///
    /// Until `parent` is waited on, no other task spawned through `ctx` may
    /// write a cell this task reads or writes.
    ///
    /// [`wait_for_children`]: TaskEngine::wait_for_children
    pub unsafe fn spawn<T: Task>(
        &self,
        ctx: &ExecContext<'_>,
        parent: &Arc<TaskGroup>,
        task: T,
    ) -> FwResult<()> {
        task.prepare()?;
        parent.add(1);
        ctx.outstanding().add(1);
        ctx.count_spawn();
        self.metrics.record_spawn();

        let view = ctx.view();
        let parent = Arc::clone(parent);
        let outstanding = Arc::clone(ctx.outstanding());
        let metrics = Arc::clone(&self.metrics);
        self.pool.spawn(move || {
            // SAFETY: forwarded from the caller of `spawn`; the context keeps
            // the matrix borrowed until `outstanding` drains.
            unsafe { task.execute(view) };
            metrics.record_completion();
            parent.complete();
            outstanding.complete();
        });
        Ok(())
    }

    /// Block until every child of `parent` has finished.
    ///
    /// A worker of this pool keeps executing other queued work while it
    /// waits instead of parking, so nested waits cannot starve the pool.
    pub fn wait_for_children(&self, parent: &TaskGroup) {
        trace!(pending = parent.pending(), "Waiting for children");
        self.drain(parent);
        self.metrics.record_barrier();
    }

    /// Reset a finished pooled task with new parameters.
    pub fn recycle(&self, task: &PooledTask, span: TileSpan) -> FwResult<()> {
        task.reset(span)?;
        self.metrics.record_recycle();
        Ok(())
    }

    pub(crate) fn drain(&self, group: &TaskGroup) {
        if self.pool.current_thread_index().is_none() {
            group.wait();
            return;
        }
        while !group.is_done() {
            match rayon::yield_now() {
                Some(Yield::Executed) => {}
                Some(Yield::Idle) | None => std::thread::yield_now(),
            }
        }
    }
}
