//! Task Scheduler: the public [`Weft`] handle and the per-entry task
//! list.
//!
//! `build()` sets up and schedules one write-pipeline task per
//! configured entry (in entry-map insertion order), then hands the task
//! list to the coordinator for the two-phase combined drain.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use path_clean::PathClean;

use crate::builder::SetupContext;
use crate::config::Config;
use crate::subtasks::SubtaskQueue;
use crate::task::TaskFlags;

/// Summary of one `build()` invocation.
///
/// The build's completion never reflects per-entry compile failures
/// (those go to [`Hooks::on_error`](crate::Hooks::on_error) and leave
/// the other entries running); `failed_tasks` is the explicit
/// partial-failure signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Main tasks scheduled, one per configured entry.
    pub tasks: usize,
    /// Async sub-bundle tasks discovered during phase one and drained in
    /// phase two.
    pub subtasks: usize,
    /// Compile or write failures swallowed into `on_error` across both
    /// phases.
    pub failed_tasks: usize,
}

pub(crate) struct Inner {
    pub(crate) config: Config,
    pub(crate) subtasks: SubtaskQueue,
    failures: AtomicUsize,
}

impl Inner {
    pub(crate) fn note_failure(&self, error: &anyhow::Error) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.config.hooks.on_error(error);
    }
}

/// The build orchestrator.
///
/// Owns the configuration for its lifetime; engines, watching, and
/// compilation are delegated through the configured
/// [`EngineFactory`](crate::EngineFactory).
pub struct Weft {
    inner: Arc<Inner>,
}

impl Weft {
    /// Finalize a configuration and create the orchestrator.
    ///
    /// The output directory is resolved against the working directory
    /// here, once; the configuration is read-only afterwards.
    pub fn new(mut config: Config) -> Self {
        config.output.dir = resolve_against(&config.cwd, &config.output.dir);
        Self {
            inner: Arc::new(Inner {
                config,
                subtasks: SubtaskQueue::new(),
                failures: AtomicUsize::new(0),
            }),
        }
    }

    /// The finalized configuration, with the output directory already
    /// resolved.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Run the full two-phase build.
    ///
    /// Phase one drains the combined stream of every main entry task;
    /// any async sub-bundle discovered while it runs is queued. Phase
    /// two drains the queued subtasks. The returned future resolves only
    /// once both phases have fully drained.
    pub async fn build(&self) -> crate::Result<BuildReport> {
        let inner = &self.inner;
        inner.subtasks.reopen();
        inner.failures.store(0, Ordering::Relaxed);

        let mut tasks = Vec::with_capacity(inner.config.entries.len());
        for (key, file) in &inner.config.entries {
            let entry = resolve_against(&inner.config.cwd, file);
            let filename = (*inner.config.output.filename)(key, &entry);
            let engine = inner.setup(SetupContext {
                key: Some(key.clone()),
                entry,
                output_filename: filename.clone(),
                is_async_task: false,
            })?;
            tasks.push(inner.write(engine, filename, TaskFlags::default()));
        }

        let report_tasks = tasks.len();
        tracing::info!(tasks = report_tasks, "build phase one");
        inner.run_phase(tasks, false).await;

        let subtasks = inner.subtasks.seal();
        let report_subtasks = subtasks.len();
        tracing::info!(subtasks = report_subtasks, "build phase two");
        inner.run_phase(subtasks, true).await;

        Ok(BuildReport {
            tasks: report_tasks,
            subtasks: report_subtasks,
            failed_tasks: inner.failures.load(Ordering::Relaxed),
        })
    }
}

fn resolve_against(cwd: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() { path.clean() } else { cwd.join(path).clean() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_against_joins_relative_paths() {
        assert_eq!(
            resolve_against(Path::new("/work"), Path::new("./src/a.js")),
            Path::new("/work/src/a.js")
        );
    }

    #[test]
    fn resolve_against_keeps_absolute_paths() {
        assert_eq!(
            resolve_against(Path::new("/work"), Path::new("/elsewhere/a.js")),
            Path::new("/elsewhere/a.js")
        );
    }
}
