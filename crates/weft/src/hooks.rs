//! Lifecycle hooks.
//!
//! Callers intercept build streams at fixed points by implementing
//! [`Hooks`]. Every method has a provided default (pass-through for the
//! stream transformers, a `tracing` event for the observers), so an
//! implementation overrides only the points it cares about.
//!
//! For any single task the write hooks always run in the order
//! start → before → after, regardless of configuration; the build hooks
//! run in the same order once per coordinator phase. Stream transformers
//! take and return the stream by value, so "forgetting" to return one is
//! a compile error rather than a runtime contract violation.

use std::path::Path;

use crate::builder::SetupContext;
use crate::engine::Engine;
use crate::task::{PhaseStream, TaskStream};

/// Caller-overridable interception points for the build lifecycle.
pub trait Hooks: Send + Sync {
    /// Receives low-level engine log events when verbose mode is on,
    /// tagged with the originating entry path.
    fn verbose_log(&self, entry: &Path, message: &str) {
        tracing::debug!(entry = %entry.display(), message, "engine log");
    }

    /// Receives every compile or write failure. The failing task ends
    /// gracefully afterwards; escalate here if a failed entry should
    /// abort the embedding process.
    fn on_error(&self, error: &anyhow::Error) {
        tracing::error!(error = %error, "bundle task failed");
    }

    /// Customize a freshly configured engine before the async-splitting
    /// transform is attached. May return a replacement engine.
    fn setup_engine(&self, engine: Box<dyn Engine>, _ctx: &SetupContext) -> Box<dyn Engine> {
        engine
    }

    /// First write hook, after compilation output is buffered and any
    /// inline source map has been detached.
    fn on_start_write(&self, task: TaskStream) -> TaskStream {
        task
    }

    /// Runs after the source map is reattached, immediately before the
    /// stream is written to the output directory.
    fn on_before_write(&self, task: TaskStream) -> TaskStream {
        task
    }

    /// Runs after the write stage; its result is the task's terminal
    /// stream.
    fn on_after_write(&self, task: TaskStream) -> TaskStream {
        task
    }

    /// First build hook, over the merged stream of a whole phase.
    fn on_start_build(&self, phase: PhaseStream) -> PhaseStream {
        phase
    }

    fn on_before_build(&self, phase: PhaseStream) -> PhaseStream {
        phase
    }

    fn on_after_build(&self, phase: PhaseStream) -> PhaseStream {
        phase
    }
}

/// The pass-through hook set used when a [`Config`](crate::Config) does
/// not supply one.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl Hooks for DefaultHooks {}
