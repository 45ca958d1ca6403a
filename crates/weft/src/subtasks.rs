//! The append-only subtask queue.
//!
//! Async sub-bundles discovered while phase one runs are queued here from
//! the engine's discovery callbacks. The coordinator seals the queue
//! exactly once between the two phases; a sealed queue accepts nothing,
//! so "no more entries will arrive" is an explicit state rather than an
//! ordering convention.

use parking_lot::Mutex;

use crate::task::TaskStream;

enum State {
    Open(Vec<TaskStream>),
    Sealed,
}

pub(crate) struct SubtaskQueue {
    state: Mutex<State>,
}

impl SubtaskQueue {
    pub fn new() -> Self {
        Self { state: Mutex::new(State::Open(Vec::new())) }
    }

    /// Discard any previous state and start accepting subtasks again.
    /// Called at the start of every build.
    pub fn reopen(&self) {
        *self.state.lock() = State::Open(Vec::new());
    }

    /// Append a discovered subtask. Appends after sealing are dropped:
    /// phase two is a strict snapshot of what phase one discovered.
    pub fn push(&self, task: TaskStream) {
        match &mut *self.state.lock() {
            State::Open(tasks) => tasks.push(task),
            State::Sealed => {
                tracing::warn!(
                    filename = task.filename(),
                    "async sub-bundle discovered after phase one completed; dropping"
                );
            }
        }
    }

    /// Seal the queue and take everything queued so far.
    pub fn seal(&self) -> Vec<TaskStream> {
        match std::mem::replace(&mut *self.state.lock(), State::Sealed) {
            State::Open(tasks) => tasks,
            State::Sealed => Vec::new(),
        }
    }
}
