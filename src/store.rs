// Task list state: ordered tasks plus the shared add/edit input buffer

use crate::blob::BlobStore;
use crate::input::{InputBuffer, InputMode};
use crate::persist::{self, Persister, WriteMode};
use std::sync::Arc;
use crate::task::Task;
use tracing::{debug, info};

/// Ordered to-do list with a single shared input buffer
///
/// Every operation is synchronous and silently ignores empty text and unknown
/// ids. When a [`Persister`] is attached, each change to the list is handed to
/// it as a full snapshot; buffer-only changes are not persisted.
pub struct TaskListStore {
    tasks: Vec<Task>,
    input: InputBuffer,
    persister: Option<Persister>,
}

impl Default for TaskListStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskListStore {
    /// Empty store with no persistence
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            input: InputBuffer::new(),
            persister: None,
        }
    }

    /// Hydrate from `blobs` and write every later change back to it
    pub fn open(blobs: Arc<dyn BlobStore>, mode: WriteMode) -> Self {
        let tasks = persist::hydrate(blobs.as_ref());
        info!(count = tasks.len(), ?mode, "Opened task list");

        Self {
            tasks,
            input: InputBuffer::new(),
            persister: Some(Persister::new(blobs, mode)),
        }
    }

    /// Store seeded with an existing list, no persistence
    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::new()
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Current contents of the input buffer
    pub fn input(&self) -> &str {
        self.input.text()
    }

    pub fn mode(&self) -> &InputMode {
        self.input.mode()
    }

    pub fn persister(&self) -> Option<&Persister> {
        self.persister.as_ref()
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Replace the input buffer (the text field changed)
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input.set_text(text);
    }

    /// Append a new task with the trimmed `text`
    ///
    /// Ignored when `text` is blank, and while a task is being edited so the
    /// pending edit in the buffer is not thrown away.
    pub fn add(&mut self, text: &str) -> &[Task] {
        if let Some(id) = self.input.mode().editing_id() {
            debug!(editing = id, "add: ignored while editing");
            return &self.tasks;
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("add: ignored blank text");
            return &self.tasks;
        }

        let task = Task::new(trimmed);
        debug!(id = %task.id, "add: appending task");
        self.tasks.push(task);
        self.input.clear_text();

        self.changed();
        &self.tasks
    }

    /// Flip completion on the task with `id`
    pub fn toggle_complete(&mut self, id: &str) -> &[Task] {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "toggle_complete: unknown id");
            return &self.tasks;
        };

        task.toggle();
        debug!(id, completed = task.completed, "toggle_complete: toggled");

        self.changed();
        &self.tasks
    }

    /// Remove the task with `id`, keeping the others in order
    ///
    /// Deleting the task under edit also abandons the edit.
    pub fn delete(&mut self, id: &str) -> &[Task] {
        let Some(index) = self.tasks.iter().position(|t| t.id == id) else {
            debug!(id, "delete: unknown id");
            return &self.tasks;
        };

        self.tasks.remove(index);
        debug!(id, remaining = self.tasks.len(), "delete: removed task");

        if self.input.mode().editing_id() == Some(id) {
            debug!(id, "delete: edited task removed, back to composing");
            self.input.reset();
        }

        self.changed();
        &self.tasks
    }

    /// Point the input buffer at the task with `id` and load its text
    pub fn start_edit(&mut self, id: &str) -> &InputMode {
        match self.tasks.iter().find(|t| t.id == id) {
            Some(task) => {
                debug!(id, "start_edit: editing");
                self.input.begin_edit(&task.id, &task.text);
            }
            None => debug!(id, "start_edit: unknown id"),
        }
        self.input.mode()
    }

    /// Write the trimmed buffer back into the task under edit
    ///
    /// Only `text` changes; completion state is left alone. Ignored when not
    /// editing or when the buffer is blank.
    pub fn commit_edit(&mut self) -> &[Task] {
        let Some(id) = self.input.mode().editing_id() else {
            debug!("commit_edit: not editing");
            return &self.tasks;
        };
        let Some(text) = self.input.trimmed() else {
            debug!(id, "commit_edit: ignored blank text");
            return &self.tasks;
        };

        // Deleting the edited task resets the mode, so the id is always present
        if let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) {
            task.text = text.to_string();
            debug!(id, "commit_edit: updated text");
        }

        self.input.reset();
        self.changed();
        &self.tasks
    }

    /// Leave edit mode without touching the task
    pub fn cancel_edit(&mut self) {
        if self.input.mode().is_editing() {
            self.input.reset();
        }
    }

    /// The single "commit" action: add in composing mode, commit the edit otherwise
    pub fn submit(&mut self) -> &[Task] {
        if self.input.mode().is_editing() {
            return self.commit_edit();
        }

        let text = self.input.text().to_string();
        self.add(&text)
    }

    fn changed(&mut self) {
        if let Some(persister) = self.persister.as_mut() {
            persister.persist(&self.tasks);
        }
    }
}
