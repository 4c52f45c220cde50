//! Disk Write Queue
//!
//! A single background worker that applies disk mutations strictly in
//! submission order. Callers enqueue and return immediately; failures are
//! logged and counted, never reported back.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::{DiskStore, Expiration, StatsRecorder};
use crate::error::{CacheError, Result};

// == Disk Task ==
/// A disk mutation waiting to run.
#[derive(Debug, Clone)]
pub enum DiskTask {
    /// Replace the entry for `key`
    Write {
        key: String,
        expiration: Expiration,
        payload: Bytes,
    },
    /// Delete the entry for `key`
    Remove { key: String },
    /// Delete the entry for `key` only if it is still expired at `now` (or
    /// unreadable). A write queued ahead of the purge survives it.
    Purge { key: String, now: i64 },
    /// Delete every entry
    Clear,
    /// Store the contents of `source` as the entry for `key`
    CopyFile {
        key: String,
        source: PathBuf,
        expiration: Expiration,
    },
}

impl DiskTask {
    /// Applies the task to the store. Blocking.
    pub fn run(self, disk: &DiskStore) -> Result<()> {
        match self {
            DiskTask::Write {
                key,
                expiration,
                payload,
            } => disk.write(&key, expiration, &payload),
            DiskTask::Remove { key } => disk.remove(&key),
            DiskTask::Purge { key, now } => match disk.read_meta(&key) {
                Ok(expiration) if !expiration.is_expired(now) => Ok(()),
                Err(CacheError::NotFound(_)) => Ok(()),
                _ => disk.remove(&key),
            },
            DiskTask::Clear => disk.clear().map(|_| ()),
            DiskTask::CopyFile {
                key,
                source,
                expiration,
            } => {
                let payload = std::fs::read(&source)?;
                disk.write(&key, expiration, &payload)
            }
        }
    }
}

impl fmt::Display for DiskTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskTask::Write { key, payload, .. } => {
                write!(f, "write {} ({} bytes)", key, payload.len())
            }
            DiskTask::Remove { key } => write!(f, "remove {}", key),
            DiskTask::Purge { key, .. } => write!(f, "purge {}", key),
            DiskTask::Clear => write!(f, "clear"),
            DiskTask::CopyFile { key, source, .. } => {
                write!(f, "copy {} -> {}", source.display(), key)
            }
        }
    }
}

enum Message {
    Task(DiskTask),
    Flush(oneshot::Sender<()>),
}

/// Runtime owned by the queue when no ambient runtime was available.
struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
    fn drop(&mut self) {
        // Dropping a runtime from async context panics; shut down without blocking.
        if let Some(runtime) = self.0.take() {
            runtime.shutdown_background();
        }
    }
}

// == Write Queue ==
/// FIFO single-worker queue in front of a [`DiskStore`].
pub struct WriteQueue {
    sender: mpsc::UnboundedSender<Message>,
    worker: JoinHandle<()>,
    _runtime: Option<OwnedRuntime>,
}

impl WriteQueue {
    // == Spawn ==
    /// Starts the worker on the current tokio runtime, or on a dedicated
    /// one when called outside any runtime.
    pub fn spawn(disk: DiskStore, stats: Arc<StatsRecorder>) -> Result<Self> {
        match Handle::try_current() {
            Ok(handle) => Ok(Self::start(&handle, None, disk, stats)),
            Err(_) => Self::spawn_dedicated(disk, stats),
        }
    }

    /// Starts the worker on a runtime owned by the queue, independent of
    /// whichever runtime the caller happens to be on.
    pub fn spawn_dedicated(disk: DiskStore, stats: Arc<StatsRecorder>) -> Result<Self> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("tiercache-writer")
            .enable_all()
            .build()?;
        let handle = runtime.handle().clone();
        Ok(Self::start(
            &handle,
            Some(OwnedRuntime(Some(runtime))),
            disk,
            stats,
        ))
    }

    fn start(
        handle: &Handle,
        runtime: Option<OwnedRuntime>,
        disk: DiskStore,
        stats: Arc<StatsRecorder>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let worker = handle.spawn(run_worker(disk, receiver, stats));

        Self {
            sender,
            worker,
            _runtime: runtime,
        }
    }

    // == Enqueue ==
    /// Submits a task. Never waits for the disk.
    pub fn enqueue(&self, task: DiskTask) {
        debug!(task = %task, "Disk task enqueued");
        if let Err(mpsc::error::SendError(Message::Task(task))) =
            self.sender.send(Message::Task(task))
        {
            warn!(task = %task, "Disk write queue stopped, dropping task");
        }
    }

    // == Flush ==
    /// Resolves once every task enqueued before this call has run.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Message::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Blocking form of [`flush`](Self::flush).
    ///
    /// Must not be called from async context; use `flush().await` there.
    pub fn flush_blocking(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Message::Flush(done)).is_ok() {
            let _ = wait.blocking_recv();
        }
    }

    /// True once the worker task has exited.
    pub fn is_stopped(&self) -> bool {
        self.worker.is_finished()
    }
}

impl fmt::Debug for WriteQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteQueue")
            .field("dedicated_runtime", &self._runtime.is_some())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

async fn run_worker(
    disk: DiskStore,
    mut receiver: mpsc::UnboundedReceiver<Message>,
    stats: Arc<StatsRecorder>,
) {
    info!(root = ?disk.root(), "Disk write queue started");

    while let Some(message) = receiver.recv().await {
        match message {
            Message::Task(task) => {
                let label = task.to_string();
                let disk = disk.clone();

                // Awaited before the next message is taken, which keeps FIFO order.
                match tokio::task::spawn_blocking(move || task.run(&disk)).await {
                    Ok(Ok(())) => debug!(task = %label, "Disk task done"),
                    Ok(Err(err)) => {
                        stats.record_write_failure();
                        warn!(task = %label, error = %err, "Disk task failed");
                    }
                    Err(err) => {
                        stats.record_write_failure();
                        warn!(task = %label, error = %err, "Disk task aborted");
                    }
                }
            }
            Message::Flush(done) => {
                let _ = done.send(());
            }
        }
    }

    debug!("Disk write queue stopped");
}
