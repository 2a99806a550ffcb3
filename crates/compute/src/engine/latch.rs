use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};

/// Countdown latch acting as the parent of a batch of spawned tasks.
///
/// Every spawn increments the counter before the task is queued; every task
/// decrements it once when it finishes. Waiters block until the counter is
/// back at zero. A group can be reused for the next phase once drained.
#[derive(Debug, Default)]
pub struct TaskGroup {
    pending: AtomicUsize,
    lock: Mutex<()>,
    drained: Condvar,
}

impl TaskGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `count` additional children.
    pub fn add(&self, count: usize) {
        self.pending.fetch_add(count, Ordering::AcqRel);
    }

    /// Signal that one child finished. Wakes waiters on the last one.
    pub fn complete(&self) {
        let prev = self.pending.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(prev > 0, "TaskGroup completed more children than it spawned");
        if prev == 1 {
            // Taking the lock orders this wake-up after a waiter's
            // check-then-wait, so the notification cannot be lost.
            let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
            self.drained.notify_all();
        }
    }

    /// Children spawned but not yet finished.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn is_done(&self) -> bool {
        self.pending() == 0
    }

    /// Block the calling thread until every child has completed.
    pub fn wait(&self) {
        let mut guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        while !self.is_done() {
            guard = self.drained.wait(guard).unwrap_or_else(|e| e.into_inner());
        }
    }
}
