//! # weft-memory
//!
//! A hermetic in-memory bundling engine for [`weft`].
//!
//! This crate implements weft's [`Engine`](weft::Engine) and
//! [`EngineFactory`](weft::EngineFactory) traits over a virtual file
//! map: no disk reads, no real module resolver, no file watcher. It
//! exists for weft's own integration tests and for embedders who want to
//! exercise their hook implementations without a real bundler.
//!
//! The "compilation" model is deliberately naive:
//!
//! - `require("spec")` inlines the referenced module (resolved relative
//!   to the importing file, or through the engine's search paths for
//!   bare specifiers) unless the module was marked external, in which
//!   case the output carries an `/* external: spec */` marker instead.
//! - `require.async("spec")` leaves the module out of the parent and
//!   drives weft's async-splitting callbacks, naming the sub-bundle
//!   after a seahash of the module's content.
//! - A line starting with `// !error` fails the compilation with the
//!   rest of the line as the message.
//! - Watch-mode engines re-emit an update whenever
//!   [`MemoryFs::write`] touches a file the last compilation visited.

mod engine;
mod fs;

pub use engine::{MemoryEngine, MemoryEngineFactory};
pub use fs::MemoryFs;
