// Hydrating the task list from a blob store and persisting it back

use crate::blob::BlobStore;
use crate::task::{TASKS_KEY, Task};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// Load the persisted task list
///
/// Never fails: a missing key, an unreadable store or a payload that is not a
/// JSON array all hydrate to an empty list. Individual elements that do not
/// decode as a task are skipped, as are repeated ids after their first
/// occurrence. Stored order is kept.
pub fn hydrate(blobs: &dyn BlobStore) -> Vec<Task> {
    let payload = match blobs.get(TASKS_KEY) {
        Ok(Some(payload)) => payload,
        Ok(None) => {
            debug!(key = TASKS_KEY, "No persisted tasks, starting empty");
            return Vec::new();
        }
        Err(e) => {
            warn!(key = TASKS_KEY, error = ?e, "Failed to read persisted tasks, starting empty");
            return Vec::new();
        }
    };

    let elements: Vec<serde_json::Value> = match serde_json::from_str(&payload) {
        Ok(elements) => elements,
        Err(e) => {
            warn!(key = TASKS_KEY, error = ?e, "Persisted tasks are not a JSON array, starting empty");
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    let mut tasks = Vec::with_capacity(elements.len());

    for (index, element) in elements.into_iter().enumerate() {
        let mut task: Task = match serde_json::from_value(element) {
            Ok(t) => t,
            Err(e) => {
                warn!(index, error = ?e, "Failed to parse persisted task, skipping");
                continue;
            }
        };

        if task.text.trim().is_empty() {
            warn!(index, id = %task.id, "Persisted task has empty text, skipping");
            continue;
        }

        if !task.completed && task.completed_at.is_some() {
            warn!(index, id = %task.id, "Pending task has a completion time, clearing it");
            task.completed_at = None;
        }

        if !seen.insert(task.id.clone()) {
            warn!(index, id = %task.id, "Duplicate persisted task id, keeping first");
            continue;
        }

        tasks.push(task);
    }

    info!(key = TASKS_KEY, count = tasks.len(), "Hydrated tasks");
    tasks
}

/// Serialize the list into the persisted payload
pub fn encode(tasks: &[Task]) -> serde_json::Result<String> {
    serde_json::to_string(tasks)
}

// Write one payload, logging instead of propagating failures
fn write_payload(blobs: &dyn BlobStore, version: u64, payload: &str) {
    match blobs.set(TASKS_KEY, payload) {
        Ok(()) => debug!(version, bytes = payload.len(), "Persisted tasks"),
        Err(e) => warn!(version, error = ?e, "Failed to persist tasks, keeping in-memory state"),
    }
}

enum Message {
    Write { version: u64, payload: String },
    Flush(Sender<()>),
}

enum Sink {
    Inline(Arc<dyn BlobStore>),
    Background {
        tx: Option<Sender<Message>>,
        handle: Option<JoinHandle<()>>,
    },
}

/// Where a [`Persister`] does its writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// On the calling thread, before the operation returns
    #[default]
    Inline,
    /// On a dedicated writer thread, coalescing queued snapshots
    Background,
}

/// Fire-and-forget writer for task list snapshots
///
/// Every snapshot gets the next version number. Failures are logged and never
/// reach the caller.
pub struct Persister {
    sink: Sink,
    version: u64,
}

impl Persister {
    pub fn new(blobs: Arc<dyn BlobStore>, mode: WriteMode) -> Self {
        match mode {
            WriteMode::Inline => Self::inline(blobs),
            WriteMode::Background => Self::background(blobs),
        }
    }

    /// Write synchronously on the calling thread
    pub fn inline(blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            sink: Sink::Inline(blobs),
            version: 0,
        }
    }

    /// Write on a dedicated thread; queued snapshots are coalesced so only the newest is written
    pub fn background(blobs: Arc<dyn BlobStore>) -> Self {
        let (tx, rx) = mpsc::channel();
        let handle = thread::Builder::new()
            .name("tasklist-writer".to_string())
            .spawn(move || writer_loop(blobs.as_ref(), rx));

        let sink = match handle {
            Ok(handle) => Sink::Background {
                tx: Some(tx),
                handle: Some(handle),
            },
            Err(e) => {
                // The receiver went down with the closure; nothing would ever be written
                warn!(error = ?e, "Failed to spawn writer thread, persistence disabled");
                Sink::Background { tx: None, handle: None }
            }
        };

        Self { sink, version: 0 }
    }

    /// Version of the most recently submitted snapshot (0 before the first)
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Submit the full list for writing
    pub fn persist(&mut self, tasks: &[Task]) {
        let payload = match encode(tasks) {
            Ok(p) => p,
            Err(e) => {
                warn!(error = ?e, "Failed to serialize tasks, skipping persist");
                return;
            }
        };

        self.version += 1;
        let version = self.version;

        match &self.sink {
            Sink::Inline(blobs) => write_payload(blobs.as_ref(), version, &payload),
            Sink::Background { tx: Some(tx), .. } => {
                if tx.send(Message::Write { version, payload }).is_err() {
                    warn!(version, "Writer thread is gone, dropping snapshot");
                }
            }
            Sink::Background { tx: None, .. } => {
                debug!(version, "Persistence disabled, dropping snapshot");
            }
        }
    }

    /// Block until every snapshot submitted so far has been written
    pub fn flush(&self) {
        let Sink::Background { tx: Some(tx), .. } = &self.sink else {
            return;
        };

        let (ack_tx, ack_rx) = mpsc::channel();
        if tx.send(Message::Flush(ack_tx)).is_err() {
            warn!("Writer thread is gone, nothing to flush");
            return;
        }
        // An Err here means the writer exited, which also means it is done writing
        let _ = ack_rx.recv();
    }
}

impl Drop for Persister {
    fn drop(&mut self) {
        if let Sink::Background { tx, handle } = &mut self.sink {
            // Closing the channel lets the writer drain its queue and exit
            drop(tx.take());
            if let Some(handle) = handle.take()
                && handle.join().is_err()
            {
                warn!("Writer thread panicked");
            }
        }
    }
}

fn writer_loop(blobs: &dyn BlobStore, rx: Receiver<Message>) {
    debug!("Writer thread started");
    let mut written: u64 = 0;

    while let Ok(first) = rx.recv() {
        let mut latest: Option<(u64, String)> = None;
        let mut acks = Vec::new();

        // Drain whatever else is already queued and keep only the newest snapshot
        let mut next = Some(first);
        while let Some(message) = next {
            match message {
                Message::Write { version, payload } => {
                    if latest.as_ref().is_none_or(|(v, _)| version > *v) {
                        latest = Some((version, payload));
                    }
                }
                Message::Flush(ack) => acks.push(ack),
            }
            next = rx.try_recv().ok();
        }

        if let Some((version, payload)) = latest
            && version > written
        {
            write_payload(blobs, version, &payload);
            written = version;
        }

        for ack in acks {
            let _ = ack.send(());
        }
    }

    debug!(written, "Writer thread exiting");
}
