//! Filename-tagged byte streams flowing through the write pipeline and
//! the build coordinator.
//!
//! A [`TaskStream`] is one in-flight output bundle: a lazy stream of byte
//! chunks tagged with its output filename and the flags that describe why
//! it is being built. A [`PhaseStream`] is the multiplexed combination of
//! every task in one coordinator phase.

use futures::StreamExt;
use futures::stream::{self, BoxStream};

/// A lazy stream of compiled byte chunks.
pub type ByteStream = BoxStream<'static, Vec<u8>>;

/// Why a task is being built.
///
/// `is_async_task` marks streams produced for dynamically-loaded
/// sub-bundles; `is_watch_update` marks re-runs triggered by a file
/// change in watch mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFlags {
    pub is_async_task: bool,
    pub is_watch_update: bool,
}

/// One in-flight output bundle.
///
/// Created when a bundle's compilation is scheduled, transformed by the
/// write hooks, and terminated when the stream signals end-of-data.
/// Nothing is compiled or written until the stream is actually driven.
pub struct TaskStream {
    filename: String,
    flags: TaskFlags,
    inner: ByteStream,
}

impl TaskStream {
    pub fn new(filename: impl Into<String>, flags: TaskFlags, inner: ByteStream) -> Self {
        Self { filename: filename.into(), flags, inner }
    }

    /// A task that immediately signals end-of-data.
    pub fn empty(filename: impl Into<String>, flags: TaskFlags) -> Self {
        Self::new(filename, flags, stream::empty().boxed())
    }

    /// The output filename this stream will be written to.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn flags(&self) -> TaskFlags {
        self.flags
    }

    pub fn is_async_task(&self) -> bool {
        self.flags.is_async_task
    }

    pub fn is_watch_update(&self) -> bool {
        self.flags.is_watch_update
    }

    /// Replace the byte stream while keeping the filename and flags.
    ///
    /// This is how hooks and pipeline stages transform a task: the tag
    /// rides along, the bytes change.
    pub fn map_bytes<F>(self, f: F) -> Self
    where
        F: FnOnce(ByteStream) -> ByteStream,
    {
        Self { filename: self.filename, flags: self.flags, inner: f(self.inner) }
    }

    pub fn into_bytes(self) -> ByteStream {
        self.inner
    }

    /// Consume the stream to completion, discarding data payloads.
    pub async fn drain(self) {
        let mut inner = self.inner;
        while inner.next().await.is_some() {}
    }
}

impl std::fmt::Debug for TaskStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskStream")
            .field("filename", &self.filename)
            .field("flags", &self.flags)
            .finish_non_exhaustive()
    }
}

/// The multiplexed stream for one coordinator phase.
///
/// Emits data from all constituent tasks with no relative ordering
/// guarantee between tasks, and signals end-of-data only once every
/// constituent has.
pub struct PhaseStream {
    is_async_task: bool,
    inner: ByteStream,
}

impl PhaseStream {
    pub(crate) fn merge(tasks: Vec<TaskStream>, is_async_task: bool) -> Self {
        let inner = stream::select_all(tasks.into_iter().map(TaskStream::into_bytes)).boxed();
        Self { is_async_task, inner }
    }

    /// Whether this phase drains async sub-bundle tasks (phase two) or
    /// main entry tasks (phase one).
    pub fn is_async_task(&self) -> bool {
        self.is_async_task
    }

    /// Replace the merged byte stream while keeping the phase flag.
    pub fn map_bytes<F>(self, f: F) -> Self
    where
        F: FnOnce(ByteStream) -> ByteStream,
    {
        Self { is_async_task: self.is_async_task, inner: f(self.inner) }
    }

    pub fn into_bytes(self) -> ByteStream {
        self.inner
    }

    pub(crate) async fn drain(self) {
        let mut inner = self.inner;
        while inner.next().await.is_some() {}
    }
}
