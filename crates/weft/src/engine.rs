//! The delegated bundling engine surface.
//!
//! weft never resolves modules, transforms code, generates source maps,
//! or watches files itself - all of that lives behind [`Engine`] and
//! [`EngineFactory`]. The orchestrator configures one engine instance per
//! entry (shared or external modules, the async-loader runtime, the
//! async-module-splitting transform, optimization presets) and then
//! drives [`Engine::compile`].
//!
//! Engine events are plain channels rather than string-keyed callback
//! registration: watch-mode change notifications arrive on the receiver
//! returned by [`Engine::take_updates`], and low-level log lines on the
//! one returned by [`Engine::take_logs`].

use std::path::PathBuf;
use std::sync::Arc;

use futures::stream::BoxStream;
use path_clean::PathClean;
use tokio::sync::mpsc::UnboundedReceiver;

/// The byte-chunk stream produced by [`Engine::compile`].
///
/// Errors are in-band: a compile failure surfaces as an `Err` item, after
/// which the stream is expected to end.
pub type CompileStream = BoxStream<'static, anyhow::Result<Vec<u8>>>;

/// An engine shared between the orchestrator and its watch-mode re-runs.
pub type SharedEngine = Arc<dyn Engine>;

/// Construction arguments for one engine instance.
#[derive(Debug, Clone)]
pub struct EngineSpec {
    /// Absolute entry file this engine compiles.
    pub entry: PathBuf,
    /// Enable debug output and inline source-map references.
    pub debug: bool,
    /// Module-resolution search paths.
    pub paths: Vec<PathBuf>,
    /// Construct the engine in watch mode; [`Engine::take_updates`] must
    /// then yield a receiver.
    pub watch: bool,
}

/// Options for a forced (bundled) module dependency.
#[derive(Debug, Clone, Default)]
pub struct RequireOptions {
    /// Expose the module under this public identifier so other bundles
    /// can reference it at runtime.
    pub expose: Option<String>,
}

/// Configuration for the engine's dead-code / reference-collapsing
/// optimization pass, applied to one-shot (non-watch) builds.
#[derive(Debug, Clone, Default)]
pub struct OptimizeOptions {
    pub presets: Vec<String>,
}

/// A change notification from a watch-mode engine.
#[derive(Debug, Clone)]
pub struct WatchUpdate {
    /// Files whose change triggered this update.
    pub paths: Vec<PathBuf>,
}

/// A dynamically-loaded module discovered by the async-splitting
/// transform during compilation.
#[derive(Debug, Clone)]
pub struct AsyncModule {
    /// Directory of the importing module.
    pub input_dir: PathBuf,
    /// The discovered module, relative to `input_dir`.
    pub input_file: PathBuf,
    /// Output filename chosen via
    /// [`AsyncSplitOptions::resolve_output_file`]. Empty while that
    /// resolver itself runs.
    pub output_file: String,
}

impl AsyncModule {
    /// The discovered module as an absolute, cleaned entry path.
    pub fn resolved_entry(&self) -> PathBuf {
        self.input_dir.join(&self.input_file).clean()
    }
}

/// Configuration for the engine's async-module-splitting transform.
///
/// The engine invokes `setup` and then `bundle` exactly once per
/// discovered dynamically-loaded module, synchronously, while the parent
/// bundle is compiling.
pub struct AsyncSplitOptions {
    /// Public URL prefix emitted into the parent bundle's loader calls.
    pub public_url: String,
    /// Directory the sub-bundle will be written to.
    pub output_dir: PathBuf,
    /// Maps a generated async-chunk content hash plus the discovered
    /// module to an output filename.
    pub resolve_output_file: Box<dyn Fn(&str, &AsyncModule) -> String + Send + Sync>,
    /// Produces a fully configured engine for the sub-entry. This is the
    /// recursive re-entry into the orchestrator's own setup procedure.
    pub setup: Box<dyn Fn(&AsyncModule) -> crate::Result<SharedEngine> + Send + Sync>,
    /// Hands the configured sub-engine back for scheduling. The
    /// orchestrator queues a write-pipeline run as a subtask here.
    pub bundle: Box<dyn Fn(SharedEngine, &AsyncModule) + Send + Sync>,
}

impl std::fmt::Debug for AsyncSplitOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncSplitOptions")
            .field("public_url", &self.public_url)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

/// One bundling engine instance, scoped to a single entry.
///
/// Configuration methods take `&self`: an engine is configured once by
/// the orchestrator and afterwards shared (watch-mode re-runs reuse the
/// same instance), so implementations use interior mutability.
/// [`Engine::compile`] may be called more than once; each call reflects
/// the current state of the sources.
pub trait Engine: Send + Sync {
    /// Mark a module as supplied by another bundle at runtime and
    /// exclude it from this bundle's output.
    fn external(&self, module_id: &str);

    /// Force a module into this bundle, regardless of whether the entry
    /// graph references it.
    fn require(&self, module_id: &str, options: RequireOptions);

    /// Configure the dead-code / reference-collapsing pass.
    fn optimize(&self, options: OptimizeOptions);

    /// Attach the async-module-splitting transform.
    fn async_split(&self, options: AsyncSplitOptions);

    /// Take the watch-mode update receiver. Yields `Some` at most once,
    /// and only for engines constructed with [`EngineSpec::watch`] set.
    fn take_updates(&self) -> Option<UnboundedReceiver<WatchUpdate>>;

    /// Take the low-level log event receiver. Yields `Some` at most
    /// once. Engines emit at least one line per completed compilation.
    fn take_logs(&self) -> Option<UnboundedReceiver<String>>;

    /// Compile the bundle, producing a byte stream of the output asset.
    fn compile(&self) -> CompileStream;
}

/// Creates engine instances, one per entry (main or async sub-entry).
pub trait EngineFactory: Send + Sync {
    fn create(&self, spec: EngineSpec) -> crate::Result<Box<dyn Engine>>;
}
