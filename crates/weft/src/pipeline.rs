//! Write Pipeline: turns one configured engine into a written output
//! file.
//!
//! Stages, in order: trigger compilation, swallow compile errors into
//! the `on_error` hook (a failed entry must not abort the whole build),
//! buffer the chunk stream, detach any inline source map (dev mode),
//! `on_start_write`, reattach the source map (dev mode),
//! `on_before_write`, write atomically into the output directory,
//! `on_after_write`. The returned stream is lazy: nothing compiles or
//! writes until it is driven.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::stream::{self, StreamExt};
use futures::future;
use parking_lot::Mutex;

use crate::engine::{CompileStream, SharedEngine};
use crate::scheduler::Inner;
use crate::task::{ByteStream, TaskFlags, TaskStream};
use crate::{sourcemap, writer};

impl Inner {
    /// Build the write-pipeline stream for one task.
    pub(crate) fn write(
        self: &Arc<Self>,
        engine: SharedEngine,
        filename: String,
        flags: TaskFlags,
    ) -> TaskStream {
        tracing::debug!(
            output = filename,
            is_async_task = flags.is_async_task,
            is_watch_update = flags.is_watch_update,
            "scheduling write pipeline"
        );

        // Marks the task as failed so the buffer stage skips the write;
        // an empty buffer alone is a valid zero-byte asset.
        let failed = Arc::new(AtomicBool::new(false));

        let compiled = deferred_compile(engine);
        let guarded = self.swallow_errors(compiled, Arc::clone(&failed));
        let task = TaskStream::new(filename, flags, buffer(guarded, failed));

        let hooks = &self.config.hooks;
        // Holds the inline map detached before on_start_write so the
        // hook transforms only the code body; reattached right after.
        let held_map: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));

        let task = if self.config.dev {
            let held = Arc::clone(&held_map);
            task.map_bytes(|bytes| detach_sourcemap(bytes, held))
        } else {
            task
        };

        let task = hooks.on_start_write(task);

        let task = if self.config.dev {
            task.map_bytes(|bytes| reattach_sourcemap(bytes, held_map))
        } else {
            task
        };

        let task = hooks.on_before_write(task);
        let task = self.write_stage(task);
        hooks.on_after_write(task)
    }

    /// Strip error items from the compile stream: report each through
    /// `on_error`, then end the stream gracefully in place of the
    /// failure.
    fn swallow_errors(
        self: &Arc<Self>,
        compiled: CompileStream,
        failed: Arc<AtomicBool>,
    ) -> ByteStream {
        let inner = Arc::clone(self);
        compiled
            .take_while(move |item| {
                if let Err(error) = item {
                    failed.store(true, Ordering::Relaxed);
                    inner.note_failure(error);
                }
                future::ready(item.is_ok())
            })
            .filter_map(|item| future::ready(item.ok()))
            .boxed()
    }

    /// Write the buffered asset to the output directory when it arrives,
    /// then re-emit it so downstream hooks and the coordinator still see
    /// data to drain.
    fn write_stage(self: &Arc<Self>, task: TaskStream) -> TaskStream {
        let inner = Arc::clone(self);
        let dir = self.config.output.dir.clone();
        let filename = task.filename().to_string();

        task.map_bytes(move |bytes| {
            bytes
                .then(move |buffer| {
                    let inner = Arc::clone(&inner);
                    let dir = dir.clone();
                    let filename = filename.clone();
                    async move {
                        match writer::write_asset(&dir, &filename, &buffer) {
                            Ok(()) => {
                                tracing::debug!(
                                    output = filename,
                                    bytes = buffer.len(),
                                    "wrote bundle"
                                );
                            }
                            Err(error) => inner.note_failure(&anyhow::Error::new(error)),
                        }
                        buffer
                    }
                })
                .boxed()
        })
    }
}

/// Defer [`Engine::compile`](crate::Engine::compile) to the first poll,
/// so every entry's compilation kicks off when the coordinator starts
/// draining and all entries run concurrently.
fn deferred_compile(engine: SharedEngine) -> CompileStream {
    stream::once(async move { engine.compile() }).flatten().boxed()
}

/// Materialize the chunk stream into a single in-memory buffer.
///
/// A task whose compilation failed yields nothing, so the write stage
/// never touches the output file for it. A compilation that succeeded
/// with zero bytes still yields its (empty) buffer.
fn buffer(bytes: ByteStream, failed: Arc<AtomicBool>) -> ByteStream {
    stream::once(bytes.concat())
        .filter(move |_buffer: &Vec<u8>| future::ready(!failed.load(Ordering::Relaxed)))
        .boxed()
}

fn detach_sourcemap(bytes: ByteStream, held: Arc<Mutex<Option<Vec<u8>>>>) -> ByteStream {
    bytes
        .map(move |buffer| {
            let (body, map) = sourcemap::split(buffer);
            *held.lock() = map;
            body
        })
        .boxed()
}

fn reattach_sourcemap(bytes: ByteStream, held: Arc<Mutex<Option<Vec<u8>>>>) -> ByteStream {
    bytes
        .map(move |body| match held.lock().take() {
            Some(map) => sourcemap::join(body, &map),
            None => body,
        })
        .boxed()
}
