//! Bundle Builder: configures one engine instance per entry.
//!
//! The same procedure applies uniformly to top-level entries and to
//! dynamically-discovered async sub-entries; the differences are carried
//! by an explicit [`SetupContext`] and the recursion is a plain method
//! call through the async-splitting transform's `setup` callback.

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::engine::{
    AsyncSplitOptions, Engine, EngineSpec, OptimizeOptions, RequireOptions, SharedEngine,
    WatchUpdate,
};
use crate::scheduler::Inner;
use crate::task::TaskFlags;

/// Context for one invocation of the setup procedure.
///
/// `key` is present only for top-level configured entries; async
/// sub-bundles have no key and therefore own no common-bundle module
/// set.
#[derive(Debug, Clone)]
pub struct SetupContext {
    pub key: Option<String>,
    /// Absolute entry file path.
    pub entry: PathBuf,
    pub output_filename: String,
    pub is_async_task: bool,
}

impl Inner {
    /// Configure a new engine for `ctx` and return it, not yet compiled.
    ///
    /// Errors from the engine itself surface only once the bundle is
    /// actually compiled by the write pipeline; this layer fails only if
    /// the factory cannot construct an engine at all.
    pub(crate) fn setup(self: &Arc<Self>, ctx: SetupContext) -> crate::Result<SharedEngine> {
        let config = &self.config;
        tracing::debug!(
            key = ctx.key.as_deref(),
            entry = %ctx.entry.display(),
            output = ctx.output_filename,
            is_async_task = ctx.is_async_task,
            "setting up bundle"
        );

        let engine = config.engine_factory.create(EngineSpec {
            entry: ctx.entry.clone(),
            debug: config.dev,
            paths: config.paths.clone(),
            watch: config.watch,
        })?;

        apply_common_bundles(config, &*engine, ctx.key.as_deref());
        apply_loader_policy(config, &*engine, ctx.key.as_deref());

        let updates = engine.take_updates();
        let logs = if config.verbose { engine.take_logs() } else { None };

        if !config.watch {
            engine.optimize(OptimizeOptions { presets: config.optimize_presets.clone() });
        }

        let engine = config.hooks.setup_engine(engine, &ctx);

        engine.async_split(self.async_split_options());

        let engine: SharedEngine = Arc::from(engine);

        if let Some(rx) = updates {
            self.spawn_watch_loop(rx, Arc::clone(&engine), &ctx);
        }
        if let Some(rx) = logs {
            self.spawn_log_forwarder(rx, ctx.entry);
        }

        Ok(engine)
    }

    /// The async-splitting transform configuration, closing over this
    /// scheduler so discovered sub-entries recurse through [`Inner::setup`]
    /// and their write-pipeline streams accumulate as subtasks.
    fn async_split_options(self: &Arc<Self>) -> AsyncSplitOptions {
        let output = &self.config.output;
        let overrides = &self.config.async_overrides;

        let async_filename = Arc::clone(&output.async_filename);
        let setup_inner = Arc::clone(self);
        let bundle_inner = Arc::clone(self);

        AsyncSplitOptions {
            public_url: overrides.public_url.clone().unwrap_or_else(|| output.public_url.clone()),
            output_dir: overrides.output_dir.clone().unwrap_or_else(|| output.dir.clone()),
            resolve_output_file: Box::new(move |hash, module| {
                (*async_filename)(hash, &module.resolved_entry())
            }),
            setup: Box::new(move |module| {
                setup_inner.setup(SetupContext {
                    key: None,
                    entry: module.resolved_entry(),
                    output_filename: module.output_file.clone(),
                    is_async_task: true,
                })
            }),
            bundle: Box::new(move |engine, module| {
                let task = bundle_inner.write(
                    engine,
                    module.output_file.clone(),
                    TaskFlags { is_async_task: true, is_watch_update: false },
                );
                bundle_inner.subtasks.push(task);
            }),
        }
    }

    /// Re-run the write pipeline on every change update, reusing the
    /// same engine instance and bypassing the coordinator phases.
    fn spawn_watch_loop(
        self: &Arc<Self>,
        mut updates: tokio::sync::mpsc::UnboundedReceiver<WatchUpdate>,
        engine: SharedEngine,
        ctx: &SetupContext,
    ) {
        let inner = Arc::clone(self);
        let filename = ctx.output_filename.clone();
        let is_async_task = ctx.is_async_task;
        tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                tracing::debug!(output = filename, changed = update.paths.len(), "watch update");
                let task = inner.write(
                    Arc::clone(&engine),
                    filename.clone(),
                    TaskFlags { is_async_task, is_watch_update: true },
                );
                task.drain().await;
            }
        });
    }

    fn spawn_log_forwarder(
        self: &Arc<Self>,
        mut logs: tokio::sync::mpsc::UnboundedReceiver<String>,
        entry: PathBuf,
    ) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(message) = logs.recv().await {
                inner.config.hooks.verbose_log(&entry, &message);
            }
        });
    }
}

/// Apply the common-bundle policy: for each declared module, an owner
/// entry bundles it and every other entry (including keyless async
/// sub-bundles) marks it external. Exactly one of the two per
/// (entry, module) pair.
fn apply_common_bundles(config: &Config, engine: &dyn Engine, key: Option<&str>) {
    for declaration in &config.common_bundles {
        let owner = key.is_some_and(|k| declaration.entries.iter().any(|e| e == k));
        for module in &declaration.modules {
            if owner {
                engine.require(module, RequireOptions::default());
            } else {
                engine.external(module);
            }
        }
    }
}

/// Entries on the loader list embed the async-loader runtime as an
/// exposed dependency; every other keyed entry assumes some other bundle
/// supplies it.
fn apply_loader_policy(config: &Config, engine: &dyn Engine, key: Option<&str>) {
    let Some(key) = key else { return };
    if config.loader_entries.iter().any(|e| e == key) {
        engine.require(
            &config.loader_module,
            RequireOptions { expose: Some(config.loader_module.clone()) },
        );
    } else {
        engine.external(&config.loader_module);
    }
}
