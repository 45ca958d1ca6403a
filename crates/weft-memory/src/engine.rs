//! The in-memory engine: a naive `require`-inlining compiler over
//! [`MemoryFs`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::bail;
use futures::future;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use weft::{
    AsyncModule, AsyncSplitOptions, CompileStream, Engine, EngineFactory, EngineSpec,
    OptimizeOptions, RequireOptions, WatchUpdate,
};

use crate::fs::MemoryFs;

const ERROR_DIRECTIVE: &str = "// !error";
const INLINE_MAP_COMMENT: &str = "//# sourceMappingURL=data:application/json;base64,e30=";

/// One engine instance, scoped to a single entry of the virtual file
/// map.
pub struct MemoryEngine {
    fs: Arc<MemoryFs>,
    spec: EngineSpec,
    externals: Mutex<FxHashSet<String>>,
    forced: Mutex<Vec<(String, RequireOptions)>>,
    optimize: Mutex<Option<OptimizeOptions>>,
    // Cloned out before the callbacks run; they construct further
    // engines and must not re-enter this engine's state under a lock.
    async_split: Mutex<Option<Arc<AsyncSplitOptions>>>,
    updates: Mutex<Option<UnboundedReceiver<WatchUpdate>>>,
    logs: Mutex<Option<UnboundedReceiver<String>>>,
    logs_tx: UnboundedSender<String>,
    interest: Arc<Mutex<FxHashSet<PathBuf>>>,
}

impl MemoryEngine {
    fn new(fs: Arc<MemoryFs>, spec: EngineSpec) -> Self {
        let interest = Arc::new(Mutex::new(FxHashSet::default()));
        let updates = if spec.watch {
            let (tx, rx) = mpsc::unbounded_channel();
            fs.register_watcher(Arc::clone(&interest), tx);
            Some(rx)
        } else {
            None
        };
        let (logs_tx, logs_rx) = mpsc::unbounded_channel();

        Self {
            fs,
            spec,
            externals: Mutex::new(FxHashSet::default()),
            forced: Mutex::new(Vec::new()),
            optimize: Mutex::new(None),
            async_split: Mutex::new(None),
            updates: Mutex::new(updates),
            logs: Mutex::new(Some(logs_rx)),
            logs_tx,
            interest,
        }
    }

    fn compile_once(&self) -> anyhow::Result<Vec<String>> {
        let externals = self.externals.lock().clone();
        let forced = self.forced.lock().clone();
        let optimize = self.optimize.lock().clone();
        let split = self.async_split.lock().clone();

        let mut compilation = Compilation {
            fs: &self.fs,
            search_paths: &self.spec.paths,
            externals,
            split,
            visited: FxHashSet::default(),
            chunks: Vec::new(),
        };

        let mut markers: Vec<&String> = compilation.externals.iter().collect();
        markers.sort();
        for module_id in markers {
            compilation.chunks.push(format!("/* external: {module_id} */\n"));
        }

        let result = compilation.inline(&self.spec.entry);
        if result.is_ok() {
            compilation.append_forced(&forced);
        }

        *self.interest.lock() = compilation.visited.clone();
        result?;

        let mut chunks = compilation.chunks;
        if optimize.is_some() {
            for chunk in &mut chunks {
                strip_blank_lines(chunk);
            }
        }
        if self.spec.debug {
            chunks.push(format!("{INLINE_MAP_COMMENT}\n"));
        }

        let _ = self.logs_tx.send(format!("compiled {} modules", compilation.visited.len()));
        Ok(chunks)
    }
}

impl Engine for MemoryEngine {
    fn external(&self, module_id: &str) {
        self.externals.lock().insert(module_id.to_string());
    }

    fn require(&self, module_id: &str, options: RequireOptions) {
        self.forced.lock().push((module_id.to_string(), options));
    }

    fn optimize(&self, options: OptimizeOptions) {
        *self.optimize.lock() = Some(options);
    }

    fn async_split(&self, options: AsyncSplitOptions) {
        *self.async_split.lock() = Some(Arc::new(options));
    }

    fn take_updates(&self) -> Option<UnboundedReceiver<WatchUpdate>> {
        self.updates.lock().take()
    }

    fn take_logs(&self) -> Option<UnboundedReceiver<String>> {
        self.logs.lock().take()
    }

    fn compile(&self) -> CompileStream {
        match self.compile_once() {
            Ok(chunks) => {
                stream::iter(chunks.into_iter().map(|chunk| Ok(chunk.into_bytes()))).boxed()
            }
            Err(error) => stream::once(future::ready(Err(error))).boxed(),
        }
    }
}

/// State of one [`MemoryEngine::compile`] call.
struct Compilation<'a> {
    fs: &'a MemoryFs,
    search_paths: &'a [PathBuf],
    externals: FxHashSet<String>,
    split: Option<Arc<AsyncSplitOptions>>,
    visited: FxHashSet<PathBuf>,
    chunks: Vec<String>,
}

impl Compilation<'_> {
    /// Inline `path` and, depth-first, everything it requires.
    fn inline(&mut self, path: &Path) -> anyhow::Result<()> {
        self.visited.insert(path.to_path_buf());

        let Some(content) = self.fs.read(path) else {
            bail!("module not found: {}", path.display());
        };
        for line in content.lines() {
            if let Some(message) = line.trim_start().strip_prefix(ERROR_DIRECTIVE) {
                bail!("{}: {}", path.display(), message.trim());
            }
        }

        self.chunks.push(format!("// module: {}\n", path.display()));
        let mut body = content.clone();
        if !body.ends_with('\n') {
            body.push('\n');
        }
        self.chunks.push(body);

        let dir = path.parent().map_or_else(|| PathBuf::from("/"), Path::to_path_buf);

        for spec in extract_calls(&content, "require(\"") {
            if self.externals.contains(&spec) {
                continue;
            }
            match self.fs.resolve(&dir, &spec, self.search_paths) {
                Some(resolved) if !self.visited.contains(&resolved) => self.inline(&resolved)?,
                Some(_) => {}
                None => self.chunks.push(format!("/* unresolved: {spec} */\n")),
            }
        }

        for spec in extract_calls(&content, "require.async(\"") {
            self.split_async(&dir, &spec)?;
        }

        Ok(())
    }

    /// Hand one dynamically-loaded module through the async-splitting
    /// callbacks and emit the loader call in its place.
    fn split_async(&mut self, dir: &Path, spec: &str) -> anyhow::Result<()> {
        let Some(resolved) = self.fs.resolve(dir, spec, self.search_paths) else {
            self.chunks.push(format!("/* unresolved: {spec} */\n"));
            return Ok(());
        };
        let Some(split) = self.split.clone() else {
            self.chunks.push(format!("/* async (unsplit): {spec} */\n"));
            return Ok(());
        };

        let content = self.fs.read(&resolved).unwrap_or_default();
        let hash = format!("{:016x}", seahash::hash(content.as_bytes()));

        let mut module = AsyncModule {
            input_dir: dir.to_path_buf(),
            input_file: resolved
                .strip_prefix(dir)
                .map_or_else(|_| resolved.clone(), Path::to_path_buf),
            output_file: String::new(),
        };
        module.output_file = (split.resolve_output_file)(&hash, &module);

        let engine = (split.setup)(&module)?;
        (split.bundle)(engine, &module);

        self.chunks.push(format!(
            "weft.loadAsync(\"{}{}\");\n",
            split.public_url, module.output_file
        ));
        Ok(())
    }

    /// Append the forced (required) modules after the entry graph.
    fn append_forced(&mut self, forced: &[(String, RequireOptions)]) {
        for (module_id, options) in forced {
            let dir = PathBuf::from("/");
            match self.fs.resolve(&dir, module_id, self.search_paths) {
                Some(resolved) => {
                    self.chunks.push(format!("/* required: {module_id} */\n"));
                    if self.visited.insert(resolved.clone()) {
                        let mut body = self.fs.read(&resolved).unwrap_or_default();
                        if !body.ends_with('\n') {
                            body.push('\n');
                        }
                        self.chunks.push(body);
                    }
                }
                None => {
                    self.chunks.push(format!("/* required (unresolved): {module_id} */\n"));
                }
            }
            if let Some(name) = &options.expose {
                self.chunks.push(format!("/* exposed as: {name} */\n"));
            }
        }
    }
}

/// Every string literal passed to `needle` call sites in `content`.
fn extract_calls(content: &str, needle: &str) -> Vec<String> {
    let mut specs = Vec::new();
    let mut rest = content;
    while let Some(at) = rest.find(needle) {
        rest = &rest[at + needle.len()..];
        if let Some(end) = rest.find('"') {
            specs.push(rest[..end].to_string());
            rest = &rest[end..];
        } else {
            break;
        }
    }
    specs
}

fn strip_blank_lines(chunk: &mut String) {
    if chunk.lines().any(|line| line.trim().is_empty()) {
        let mut stripped = String::with_capacity(chunk.len());
        for line in chunk.lines().filter(|line| !line.trim().is_empty()) {
            stripped.push_str(line);
            stripped.push('\n');
        }
        *chunk = stripped;
    }
}

/// Creates [`MemoryEngine`] instances over one shared [`MemoryFs`].
pub struct MemoryEngineFactory {
    fs: Arc<MemoryFs>,
}

impl MemoryEngineFactory {
    pub fn new(fs: Arc<MemoryFs>) -> Arc<Self> {
        Arc::new(Self { fs })
    }
}

impl EngineFactory for MemoryEngineFactory {
    fn create(&self, spec: EngineSpec) -> weft::Result<Box<dyn Engine>> {
        Ok(Box::new(MemoryEngine::new(Arc::clone(&self.fs), spec)))
    }
}
