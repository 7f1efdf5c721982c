// TaskList - Ordered to-do list state with pluggable key-value persistence

pub mod blob;
pub mod input;
pub mod persist;
pub mod side_table;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use blob::{BlobStore, FileBlobStore, MemoryBlobStore, SqliteBlobStore};
pub use input::InputMode;
pub use persist::{Persister, WriteMode, hydrate};
pub use side_table::SideTable;
pub use store::TaskListStore;
pub use task::{TASKS_KEY, Task};
