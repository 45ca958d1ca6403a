//! Build Coordinator: combined completion of one phase's task list.
//!
//! All tasks of a phase are merged into one multiplexed stream, the
//! build hooks run over it in their fixed order, and the result is
//! drained until every constituent task has signaled end-of-data. There
//! is no ordering guarantee between distinct tasks within a phase.

use crate::scheduler::Inner;
use crate::task::{PhaseStream, TaskStream};

impl Inner {
    pub(crate) async fn run_phase(&self, tasks: Vec<TaskStream>, is_async_task: bool) {
        let hooks = &self.config.hooks;
        let phase = hooks.on_start_build(PhaseStream::merge(tasks, is_async_task));
        let phase = hooks.on_before_build(phase);
        let phase = hooks.on_after_build(phase);
        phase.drain().await;
    }
}
