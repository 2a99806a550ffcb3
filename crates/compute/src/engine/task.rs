use tilefw_core::FwResult;

use crate::kernel::MatrixView;
use crate::scheduler::TileSpan;

/// A unit of work the [`TaskEngine`](super::TaskEngine) can run on a worker.
///
/// Implementations are bound to a fixed region of the matrix. The engine
/// calls [`prepare`](Task::prepare) on the spawning thread before the task
/// is queued, then [`execute`](Task::execute) exactly once on a worker.
pub trait Task: Send + 'static {
    /// Last chance to refuse being queued.
    fn prepare(&self) -> FwResult<()> {
        Ok(())
    }

    /// Do the work.
    ///
    /// # Safety
    ///
    /// The caller guarantees that no task running concurrently with this one
    /// writes the region it writes or the regions it reads.
    unsafe fn execute(&self, view: MatrixView);
}

/// Freshly allocated task relaxing one span against its pivot tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaxTask {
    pub span: TileSpan,
}

impl RelaxTask {
    pub fn new(span: TileSpan) -> Self {
        Self { span }
    }
}

impl Task for RelaxTask {
    unsafe fn execute(&self, view: MatrixView) {
        self.span.relax(view);
    }
}
