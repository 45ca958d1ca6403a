//! Build configuration.
//!
//! [`Config`] merges caller-supplied options with documented defaults and
//! is immutable once handed to [`Weft::new`](crate::Weft::new). All
//! fields are optional; an empty configuration with just an engine
//! factory and one entry is a valid build.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;

use crate::engine::EngineFactory;
use crate::hooks::{DefaultHooks, Hooks};

/// Maps an entry key and its resolved entry path to an output filename.
pub type FilenameFn = dyn Fn(&str, &Path) -> String + Send + Sync;

/// Maps an async-chunk content hash and the resolved sub-entry path to an
/// output filename.
pub type AsyncFilenameFn = dyn Fn(&str, &Path) -> String + Send + Sync;

/// Where and under which names output bundles are written.
#[derive(Clone)]
pub struct OutputOptions {
    /// Output directory, resolved against the working directory when the
    /// configuration is finalized. Default: `"./"`.
    pub dir: PathBuf,
    /// Public URL prefix emitted into async loader calls. Default: `"/"`.
    pub public_url: String,
    /// Naming function for main entry bundles. Default: `{key}.js`.
    pub filename: Arc<FilenameFn>,
    /// Naming function for async sub-bundles. Default: `{hash}.js`.
    pub async_filename: Arc<AsyncFilenameFn>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./"),
            public_url: "/".to_string(),
            filename: Arc::new(|key, _file| format!("{key}.js")),
            async_filename: Arc::new(|hash, _file| format!("{hash}.js")),
        }
    }
}

impl std::fmt::Debug for OutputOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputOptions")
            .field("dir", &self.dir)
            .field("public_url", &self.public_url)
            .finish_non_exhaustive()
    }
}

/// A named set of modules shared across multiple entries.
///
/// For every declared module, an entry listed in `entries` bundles it
/// (owner); every other entry marks it external and assumes the owner
/// supplies it at runtime. Exactly one of the two applies per
/// (entry, module) pair.
#[derive(Debug, Clone, Default)]
pub struct CommonBundle {
    /// Entry keys that own (bundle) this module set.
    pub entries: Vec<String>,
    /// Module identifiers in the set.
    pub modules: Vec<String>,
}

/// Caller overrides for the async-splitting transform configuration.
///
/// When unset, the transform inherits [`OutputOptions::public_url`] and
/// [`OutputOptions::dir`].
#[derive(Debug, Clone, Default)]
pub struct AsyncOverrides {
    pub public_url: Option<String>,
    pub output_dir: Option<PathBuf>,
}

/// The merged build configuration.
///
/// Construct with [`Config::new`] and the builder-style methods; the
/// scheduler treats the result as read-only for its whole lifetime, so it
/// is safely shared across all concurrent tasks.
pub struct Config {
    /// Working directory entries and the output directory resolve
    /// against. Default: the process working directory.
    pub cwd: PathBuf,
    /// Keep engines alive and rebuild on file change. Default: `false`.
    pub watch: bool,
    /// Development mode: debug output and inline source-map handling.
    /// Default: `false`.
    pub dev: bool,
    /// Forward engine log events to [`Hooks::verbose_log`]. Default:
    /// `false`.
    pub verbose: bool,
    /// Module-resolution search paths handed to every engine.
    pub paths: Vec<PathBuf>,
    /// Shared module declarations; see [`CommonBundle`].
    pub common_bundles: Vec<CommonBundle>,
    /// Entry key → entry file. Iteration order is insertion order, and
    /// the main task list of a build matches it.
    pub entries: IndexMap<String, PathBuf>,
    /// Output directory, URL prefix, and naming functions.
    pub output: OutputOptions,
    /// Entry keys that embed the async-loader runtime; every other entry
    /// marks it external.
    pub loader_entries: Vec<String>,
    /// Module id of the async-loader runtime. Default: `"weft/loader"`.
    pub loader_module: String,
    /// Preset list for the engine's dead-code pass in one-shot builds.
    pub optimize_presets: Vec<String>,
    /// Overrides for the async-splitting transform.
    pub async_overrides: AsyncOverrides,
    /// The delegated engine.
    pub engine_factory: Arc<dyn EngineFactory>,
    /// Lifecycle hooks. Default: [`DefaultHooks`].
    pub hooks: Arc<dyn Hooks>,
}

impl Config {
    /// A configuration with documented defaults for everything except
    /// the engine.
    pub fn new(engine_factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            watch: false,
            dev: false,
            verbose: false,
            paths: Vec::new(),
            common_bundles: Vec::new(),
            entries: IndexMap::new(),
            output: OutputOptions::default(),
            loader_entries: Vec::new(),
            loader_module: "weft/loader".to_string(),
            optimize_presets: Vec::new(),
            async_overrides: AsyncOverrides::default(),
            engine_factory,
            hooks: Arc::new(DefaultHooks),
        }
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    /// Enable or disable watch mode.
    pub fn watch(mut self, enabled: bool) -> Self {
        self.watch = enabled;
        self
    }

    /// Enable or disable development mode.
    pub fn dev(mut self, enabled: bool) -> Self {
        self.dev = enabled;
        self
    }

    /// Enable or disable verbose engine logging.
    pub fn verbose(mut self, enabled: bool) -> Self {
        self.verbose = enabled;
        self
    }

    /// Add a module-resolution search path.
    pub fn search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    /// Add a named entry point.
    pub fn entry(mut self, key: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.entries.insert(key.into(), file.into());
        self
    }

    /// Add a common-bundle declaration.
    pub fn common_bundle(
        mut self,
        entries: impl IntoIterator<Item = impl Into<String>>,
        modules: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.common_bundles.push(CommonBundle {
            entries: entries.into_iter().map(Into::into).collect(),
            modules: modules.into_iter().map(Into::into).collect(),
        });
        self
    }

    /// Set the output directory.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output.dir = dir.into();
        self
    }

    /// Set the public URL prefix for async loader calls.
    pub fn public_url(mut self, url: impl Into<String>) -> Self {
        self.output.public_url = url.into();
        self
    }

    /// Set the naming function for main entry bundles.
    pub fn filename(mut self, f: impl Fn(&str, &Path) -> String + Send + Sync + 'static) -> Self {
        self.output.filename = Arc::new(f);
        self
    }

    /// Set the naming function for async sub-bundles.
    pub fn async_filename(
        mut self,
        f: impl Fn(&str, &Path) -> String + Send + Sync + 'static,
    ) -> Self {
        self.output.async_filename = Arc::new(f);
        self
    }

    /// Mark an entry as embedding the async-loader runtime.
    pub fn loader_entry(mut self, key: impl Into<String>) -> Self {
        self.loader_entries.push(key.into());
        self
    }

    /// Override the async-loader runtime module id.
    pub fn loader_module(mut self, module_id: impl Into<String>) -> Self {
        self.loader_module = module_id.into();
        self
    }

    /// Set the optimization preset list for one-shot builds.
    pub fn optimize_presets(
        mut self,
        presets: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.optimize_presets = presets.into_iter().map(Into::into).collect();
        self
    }

    /// Override the public URL seen by the async-splitting transform.
    pub fn async_public_url(mut self, url: impl Into<String>) -> Self {
        self.async_overrides.public_url = Some(url.into());
        self
    }

    /// Override the output directory seen by the async-splitting
    /// transform.
    pub fn async_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.async_overrides.output_dir = Some(dir.into());
        self
    }

    /// Install a hook set.
    pub fn hooks(mut self, hooks: Arc<dyn Hooks>) -> Self {
        self.hooks = hooks;
        self
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("cwd", &self.cwd)
            .field("watch", &self.watch)
            .field("dev", &self.dev)
            .field("verbose", &self.verbose)
            .field("paths", &self.paths)
            .field("entries", &self.entries)
            .field("output", &self.output)
            .field("loader_entries", &self.loader_entries)
            .field("loader_module", &self.loader_module)
            .finish_non_exhaustive()
    }
}
