//! Shared fixtures for the integration tests: an in-memory source tree,
//! a real temporary output directory, and a hook set that records every
//! lifecycle event it sees.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use weft::{
    AsyncSplitOptions, CompileStream, Config, Engine, EngineFactory, EngineSpec, Hooks,
    OptimizeOptions, PhaseStream, RequireOptions, SetupContext, TaskStream, WatchUpdate,
};
use weft_memory::{MemoryEngineFactory, MemoryFs};

/// Sources live in a [`MemoryFs`] under `/src`; outputs land in a real
/// temporary directory so the atomic-write path is exercised end to end.
pub struct Fixture {
    pub fs: Arc<MemoryFs>,
    pub out: tempfile::TempDir,
}

pub fn fixture() -> Fixture {
    Fixture { fs: MemoryFs::new(), out: tempfile::tempdir().expect("create temp output dir") }
}

impl Fixture {
    /// A configuration rooted at `/src` writing into the temp directory.
    pub fn config(&self) -> Config {
        Config::new(MemoryEngineFactory::new(Arc::clone(&self.fs)))
            .cwd("/src")
            .output_dir(self.out.path())
    }

    pub fn read_output(&self, name: &str) -> String {
        std::fs::read_to_string(self.out.path().join(name))
            .unwrap_or_else(|e| panic!("read output '{name}': {e}"))
    }

    pub fn output_exists(&self, name: &str) -> bool {
        self.out.path().join(name).exists()
    }

    /// All filenames present in the output directory, sorted.
    pub fn output_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.out.path())
            .expect("list output dir")
            .map(|entry| entry.expect("dir entry").file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }
}

/// An engine that replays a fixed chunk script, for pipeline edge cases
/// the naive in-memory compiler cannot produce (zero-byte successes,
/// failures after partial output).
pub struct ScriptedEngine {
    chunks: Vec<Result<Vec<u8>, String>>,
}

impl Engine for ScriptedEngine {
    fn external(&self, _module_id: &str) {}
    fn require(&self, _module_id: &str, _options: RequireOptions) {}
    fn optimize(&self, _options: OptimizeOptions) {}
    fn async_split(&self, _options: AsyncSplitOptions) {}

    fn take_updates(&self) -> Option<UnboundedReceiver<WatchUpdate>> {
        None
    }

    fn take_logs(&self) -> Option<UnboundedReceiver<String>> {
        None
    }

    fn compile(&self) -> CompileStream {
        let chunks = self.chunks.clone();
        stream::iter(chunks.into_iter().map(|item| item.map_err(|m| anyhow::anyhow!(m)))).boxed()
    }
}

pub struct ScriptedFactory {
    chunks: Vec<Result<Vec<u8>, String>>,
}

impl ScriptedFactory {
    pub fn new(chunks: Vec<Result<Vec<u8>, String>>) -> Arc<Self> {
        Arc::new(Self { chunks })
    }
}

impl EngineFactory for ScriptedFactory {
    fn create(&self, _spec: EngineSpec) -> weft::Result<Box<dyn Engine>> {
        Ok(Box::new(ScriptedEngine { chunks: self.chunks.clone() }))
    }
}

/// Records one label per lifecycle event, in the order the orchestrator
/// invoked them.
#[derive(Default)]
pub struct RecordingHooks {
    pub events: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingHooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().clone()
    }

    fn record(&self, label: String) {
        self.events.lock().push(label);
    }

    fn task_label(stage: &str, task: &TaskStream) -> String {
        let mut label = format!("{stage}:{}", task.filename());
        if task.is_async_task() {
            label.push_str(":async");
        }
        if task.is_watch_update() {
            label.push_str(":watch");
        }
        label
    }

    fn phase_label(stage: &str, phase: &PhaseStream) -> String {
        format!("{stage}:{}", if phase.is_async_task() { "async" } else { "main" })
    }
}

impl Hooks for RecordingHooks {
    fn verbose_log(&self, entry: &Path, message: &str) {
        self.record(format!("log:{}:{message}", entry.display()));
    }

    fn on_error(&self, error: &anyhow::Error) {
        self.errors.lock().push(error.to_string());
    }

    fn setup_engine(&self, engine: Box<dyn Engine>, ctx: &SetupContext) -> Box<dyn Engine> {
        self.record(format!(
            "setup:{}:{}",
            ctx.key.as_deref().unwrap_or("-"),
            ctx.output_filename
        ));
        engine
    }

    fn on_start_write(&self, task: TaskStream) -> TaskStream {
        self.record(Self::task_label("start_write", &task));
        task
    }

    fn on_before_write(&self, task: TaskStream) -> TaskStream {
        self.record(Self::task_label("before_write", &task));
        task
    }

    fn on_after_write(&self, task: TaskStream) -> TaskStream {
        self.record(Self::task_label("after_write", &task));
        task
    }

    fn on_start_build(&self, phase: PhaseStream) -> PhaseStream {
        self.record(Self::phase_label("start_build", &phase));
        phase
    }

    fn on_before_build(&self, phase: PhaseStream) -> PhaseStream {
        self.record(Self::phase_label("before_build", &phase));
        phase
    }

    fn on_after_build(&self, phase: PhaseStream) -> PhaseStream {
        self.record(Self::phase_label("after_build", &phase));
        phase
    }
}

/// Poll until `predicate` holds or two seconds elapse.
pub async fn wait_until(mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
