use crate::core::errors::{DispatchError, Result};
use dashmap::DashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::CounterId;

/// Storage trait for persisted counter values.
///
/// Implementations do no locking of their own; `CounterStore` serializes
/// every read-modify-write on a given id before it reaches the backend.
pub trait CounterBackend: Send + Sync {
    /// Create (or truncate) the storage for a counter with value 0
    fn reset(&self, id: CounterId) -> Result<()>;

    /// Read the current persisted value
    fn load(&self, id: CounterId) -> Result<i64>;

    /// Overwrite the persisted value
    fn store(&self, id: CounterId, value: i64) -> Result<()>;
}

/// One text file per counter, `countNN.txt`, holding the decimal value
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the file backing counter `id`
    pub fn path_for(&self, id: CounterId) -> PathBuf {
        counter_file_path(&self.dir, id)
    }
}

/// `count00.txt`, `count01.txt`, ... inside `dir`
pub fn counter_file_path(dir: &Path, id: CounterId) -> PathBuf {
    dir.join(format!("count{:02}.txt", id))
}

impl CounterBackend for FileBackend {
    fn reset(&self, id: CounterId) -> Result<()> {
        let path = self.path_for(id);
        fs::write(&path, "0\n")
            .map_err(|e| DispatchError::io(format!("create {}", path.display()), e))
    }

    fn load(&self, id: CounterId) -> Result<i64> {
        let text = fs::read_to_string(self.path_for(id))
            .map_err(|e| DispatchError::counter_storage(id, "read", e))?;
        text.trim()
            .parse::<i64>()
            .map_err(|e| DispatchError::counter_storage(id, "parse", e))
    }

    fn store(&self, id: CounterId, value: i64) -> Result<()> {
        fs::write(self.path_for(id), format!("{}\n", value))
            .map_err(|e| DispatchError::counter_storage(id, "write", e))
    }
}

/// In-process backend, for embedding and tests
#[derive(Debug, Default)]
pub struct MemoryBackend {
    values: DashMap<CounterId, i64>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value, `None` if the counter has no storage
    pub fn get(&self, id: CounterId) -> Option<i64> {
        self.values.get(&id).map(|v| *v)
    }

    /// Drop the storage for a counter, as if its file had been deleted
    pub fn remove(&self, id: CounterId) {
        self.values.remove(&id);
    }
}

impl CounterBackend for MemoryBackend {
    fn reset(&self, id: CounterId) -> Result<()> {
        self.values.insert(id, 0);
        Ok(())
    }

    fn load(&self, id: CounterId) -> Result<i64> {
        self.get(id).ok_or_else(|| DispatchError::CounterStorage {
            counter: id,
            operation: "read".to_string(),
            source: None,
        })
    }

    fn store(&self, id: CounterId, value: i64) -> Result<()> {
        self.values.insert(id, value);
        Ok(())
    }
}
