// Key-value blob stores the task list is persisted into

use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::debug;

/// Opaque string store keyed by name
///
/// Implementations must be usable from the background writer thread, hence
/// `Send + Sync`.
pub trait BlobStore: Send + Sync {
    /// Read the value stored under `key`, `None` if nothing was ever written
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<()>;
}

// ============================================================================
// In-memory
// ============================================================================

/// Process-local blob store, mostly useful for tests and previews
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<HashMap<String, String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl BlobStore for MemoryBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let blobs = self.blobs.lock().map_err(|_| eyre!("Blob store lock poisoned"))?;
        Ok(blobs.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut blobs = self.blobs.lock().map_err(|_| eyre!("Blob store lock poisoned"))?;
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// ============================================================================
// Single JSON file per key
// ============================================================================

/// Blob store writing each key to `{dir}/{key}.json`
///
/// Writes go to a temp file that is renamed into place, so a reader sees
/// either the old value or the new one, never a torn write.
#[derive(Debug, Clone)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open a file store rooted at `dir`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create blob directory")?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing `key`
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl BlobStore for FileBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).context("Failed to read blob file")?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        // Serializes writers; the blob itself is swapped by rename so it never needs locking
        let lock_path = self.dir.join(format!("{}.lock", key));
        let lock = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .context("Failed to open blob lock file")?;
        lock.lock_exclusive().context("Failed to acquire file lock")?;

        replace_file(&self.dir, &path, |file| file.write_all(value.as_bytes()))?;

        debug!(path = ?path, bytes = value.len(), "FileBlobStore::set: wrote blob");
        Ok(())
    }
}

/// Write a sibling temp file, sync it, then rename it over `path`
///
/// If `write` fails or the process dies first, `path` still holds its previous
/// contents and the temp file is removed (or left as an orphan `.tmp*` file).
fn replace_file<F>(dir: &Path, path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut fs::File) -> std::io::Result<()>,
{
    let mut temp = NamedTempFile::new_in(dir).context("Failed to create temp blob file")?;
    write(temp.as_file_mut()).context("Failed to write temp blob file")?;
    temp.as_file().sync_all().context("Failed to sync temp blob file")?;
    temp.persist(path).context("Failed to replace blob file")?;
    Ok(())
}

// ============================================================================
// SQLite key-value table
// ============================================================================

/// Blob store backed by a `blobs` table in a SQLite database
pub struct SqliteBlobStore {
    db: Mutex<Connection>,
}

impl SqliteBlobStore {
    /// Open or create the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let db = Connection::open(path).context("Failed to open SQLite database")?;
        Self::from_connection(db)
    }

    /// In-memory database, gone when the store is dropped
    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::from_connection(db)
    }

    fn from_connection(db: Connection) -> Result<Self> {
        debug!("Creating blob schema");
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS blobs (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;

        Ok(Self { db: Mutex::new(db) })
    }
}

impl BlobStore for SqliteBlobStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let db = self.db.lock().map_err(|_| eyre!("Database lock poisoned"))?;

        let value = db
            .query_row("SELECT value FROM blobs WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let db = self.db.lock().map_err(|_| eyre!("Database lock poisoned"))?;

        db.execute(
            "INSERT OR REPLACE INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, now_ms()],
        )?;
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Blob key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Blob key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid blob key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// Helper function for timestamps
pub fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_get_missing() {
        let store = MemoryBlobStore::new();
        assert_eq!(store.get("tasks").unwrap(), None);
    }

    #[test]
    fn test_memory_set_overwrites() {
        let store = MemoryBlobStore::new();
        store.set("tasks", "[1]").unwrap();
        store.set("tasks", "[2]").unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[2]"));
    }

    #[test]
    fn test_file_store_creates_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested/tasklist");

        let store = FileBlobStore::open(&dir).unwrap();
        assert!(dir.exists());
        assert_eq!(store.dir(), dir.as_path());
    }

    #[test]
    fn test_file_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::open(temp.path()).unwrap();

        assert_eq!(store.get("tasks").unwrap(), None);

        store.set("tasks", r#"[{"id":"1"}]"#).unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some(r#"[{"id":"1"}]"#));
        assert!(temp.path().join("tasks.json").exists());
    }

    #[test]
    fn test_file_store_shorter_value_truncates() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::open(temp.path()).unwrap();

        store.set("tasks", "a much longer first value").unwrap();
        store.set("tasks", "[]").unwrap();

        let content = fs::read_to_string(temp.path().join("tasks.json")).unwrap();
        assert_eq!(content, "[]");
    }

    #[test]
    fn test_failed_write_keeps_previous_value() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::open(temp.path()).unwrap();
        store.set("tasks", r#"[{"id":"1","text":"Buy milk"}]"#).unwrap();
        let path = store.path_for("tasks").unwrap();

        // Write half the new payload, then fail like a full disk would
        let result = replace_file(temp.path(), &path, |file| {
            file.write_all(b"[{\"id\":\"2\",\"te")?;
            Err(std::io::Error::other("disk full"))
        });
        assert!(result.is_err());

        assert_eq!(
            store.get("tasks").unwrap().as_deref(),
            Some(r#"[{"id":"1","text":"Buy milk"}]"#)
        );

        // No temp file is left behind next to the blob
        let leftovers: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_orphaned_temp_file_is_ignored() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::open(temp.path()).unwrap();
        store.set("tasks", "[]").unwrap();

        // What a crash between write and rename leaves behind
        fs::write(temp.path().join(".tmpABC123"), "[{\"id\":").unwrap();

        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[]"));
        store.set("tasks", "[1]").unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[1]"));
    }

    #[test]
    fn test_file_store_rejects_bad_keys() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::open(temp.path()).unwrap();

        assert!(store.set("../escape", "x").is_err());
        assert!(store.get("").is_err());
        assert!(store.set(&"a".repeat(65), "x").is_err());
    }

    #[test]
    fn test_sqlite_store_round_trip() {
        let temp = TempDir::new().unwrap();
        let db_path = temp.path().join("tasklist.db");

        {
            let store = SqliteBlobStore::open(&db_path).unwrap();
            assert_eq!(store.get("tasks").unwrap(), None);
            store.set("tasks", "[1]").unwrap();
            store.set("tasks", "[1,2]").unwrap();
        }

        // Reopen to make sure the value hit disk
        let store = SqliteBlobStore::open(&db_path).unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_sqlite_in_memory() {
        let store = SqliteBlobStore::open_in_memory().unwrap();
        store.set("tasks", "[]").unwrap();
        assert_eq!(store.get("tasks").unwrap().as_deref(), Some("[]"));
        assert_eq!(store.get("other").unwrap(), None);
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("tasks").is_ok());
        assert!(validate_key("tasks-v2_backup").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key("a/b").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }
}
