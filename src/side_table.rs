// Presentation-only state keyed by task id

use crate::task::Task;
use std::collections::HashMap;

/// Per-task data owned by the presentation layer (animation progress, highlight, row height)
///
/// Lives beside the task list rather than inside [`Task`] so nothing in here is
/// ever persisted or compared. Call [`prune`](Self::prune) after deletes to
/// drop entries for tasks that are gone.
#[derive(Debug, Clone)]
pub struct SideTable<V> {
    entries: HashMap<String, V>,
}

impl<V> Default for SideTable<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V> SideTable<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(id.into(), value)
    }

    pub fn get(&self, id: &str) -> Option<&V> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut V> {
        self.entries.get_mut(id)
    }

    /// Value for `id`, inserting `V::default()` first if missing
    pub fn entry_or_default(&mut self, id: &str) -> &mut V
    where
        V: Default,
    {
        self.entries.entry(id.to_string()).or_default()
    }

    pub fn remove(&mut self, id: &str) -> Option<V> {
        self.entries.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop entries whose task is no longer in `tasks`; returns how many were dropped
    pub fn prune(&mut self, tasks: &[Task]) -> usize {
        let before = self.entries.len();
        self.entries.retain(|id, _| tasks.iter().any(|t| &t.id == id));
        before - self.entries.len()
    }
}
