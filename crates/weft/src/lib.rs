//! # weft
//!
//! Entry-oriented build orchestration over a delegated bundling engine.
//!
//! weft takes a set of named entry points and produces one written output
//! bundle per entry. It schedules the work (main entries plus any async
//! sub-bundles the engine discovers while compiling), runs every output
//! stream through a fixed sequence of caller-overridable lifecycle hooks,
//! and writes the results to an output directory. Module resolution,
//! transforms, source-map generation, and file watching are all delegated
//! to the engine behind the [`Engine`] / [`EngineFactory`] traits.
//!
//! ## Quick start
//!
//! ```no_run
//! use weft::{Config, Weft};
//! use weft_memory::{MemoryEngineFactory, MemoryFs};
//!
//! # #[tokio::main]
//! # async fn main() -> weft::Result<()> {
//! let fs = MemoryFs::new();
//! fs.write("/src/app.js", "console.log('hi');");
//!
//! let config = Config::new(MemoryEngineFactory::new(fs))
//!     .cwd("/src")
//!     .entry("app", "app.js")
//!     .output_dir("/tmp/dist");
//!
//! let report = Weft::new(config).build().await?;
//! assert_eq!(report.tasks, 1);
//! # Ok(()) }
//! ```
//!
//! ## Hooks
//!
//! Implement [`Hooks`] to intercept each task stream at well-defined
//! points (start/before/after write, start/before/after build) or to
//! observe engine errors and log events. Every method has a pass-through
//! default, so implementors override only what they need.
//!
//! ## Build phases
//!
//! [`Weft::build`] runs two sequential phases: first the combined
//! completion of all main entry tasks, then the combined completion of
//! every async sub-bundle discovered while phase one was running. Nothing
//! discovered after phase one completes is built; see
//! [`BuildReport`] for the per-build summary.

mod builder;
mod config;
mod coordinator;
mod engine;
mod hooks;
mod pipeline;
mod scheduler;
mod sourcemap;
mod subtasks;
mod task;
pub mod writer;

pub use builder::SetupContext;
pub use config::{AsyncOverrides, CommonBundle, Config, OutputOptions};
pub use engine::{
    AsyncModule, AsyncSplitOptions, CompileStream, Engine, EngineFactory, EngineSpec,
    OptimizeOptions, RequireOptions, SharedEngine, WatchUpdate,
};
pub use hooks::{DefaultHooks, Hooks};
pub use scheduler::{BuildReport, Weft};
pub use task::{ByteStream, PhaseStream, TaskFlags, TaskStream};

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
pub mod logging;

#[cfg(feature = "logging")]
pub use logging::{init_logging, init_logging_from_env};

/// Error types for weft operations.
///
/// Engine *compile* failures never appear here: they are delivered
/// exclusively to [`Hooks::on_error`] so that one failing entry cannot
/// abort the rest of the build.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("write failure: {0}")]
    WriteFailure(String),

    /// Error from the delegated bundling engine while constructing it.
    #[error("engine error: {0}")]
    Engine(#[from] anyhow::Error),
}

/// Result type alias for weft operations.
pub type Result<T> = std::result::Result<T, Error>;
