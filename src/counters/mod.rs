//! Persisted counters with per-id locking
//!
//! Every counter owns its own lock, so workers touching different counters
//! never contend. A read-modify-write on one id is serialized by that id's
//! lock from load through store.

pub mod backend;

pub use backend::{counter_file_path, CounterBackend, FileBackend, MemoryBackend};

use crate::core::errors::{DispatchError, Result};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, warn};

pub type CounterId = usize;

/// Fixed set of independently lockable counters
pub struct CounterStore {
    locks: Vec<Mutex<()>>,
    backend: Arc<dyn CounterBackend>,
}

impl CounterStore {
    /// Create a store for ids `0..count` on top of `backend`
    pub fn new(count: usize, backend: Arc<dyn CounterBackend>) -> Self {
        Self {
            locks: (0..count).map(|_| Mutex::new(())).collect(),
            backend,
        }
    }

    /// Create every counter with value 0.
    ///
    /// Unlike later accesses, a failure here is fatal: the run must not start
    /// with counters in an undefined state.
    pub fn initialize(&self) -> Result<()> {
        for id in 0..self.len() {
            self.backend.reset(id)?;
        }
        debug!(counters = self.len(), "Counters initialized");
        Ok(())
    }

    /// Number of counters
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Add 1 to counter `id`, returning the new value
    pub fn increment(&self, id: CounterId) -> Result<i64> {
        self.apply(id, 1)
    }

    /// Subtract 1 from counter `id`, returning the new value
    pub fn decrement(&self, id: CounterId) -> Result<i64> {
        self.apply(id, -1)
    }

    /// Read the persisted value of counter `id`
    pub fn value(&self, id: CounterId) -> Result<i64> {
        let lock = self.lock_for(id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.backend.load(id)
    }

    /// Apply `delta` to counter `id` under that counter's lock.
    ///
    /// Missing or unreadable storage counts as 0 and a failed write is only
    /// logged; the sole error returned is an id outside the store.
    pub fn apply(&self, id: CounterId, delta: i64) -> Result<i64> {
        let lock = self.lock_for(id)?;
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = match self.backend.load(id) {
            Ok(value) => value,
            Err(e) => {
                warn!(counter = id, error = %e, "Counter storage unreadable, treating as 0");
                0
            }
        };
        let updated = current.wrapping_add(delta);

        if let Err(e) = self.backend.store(id, updated) {
            warn!(counter = id, error = %e, "Failed to persist counter value");
        }
        Ok(updated)
    }

    fn lock_for(&self, id: CounterId) -> Result<&Mutex<()>> {
        self.locks.get(id).ok_or_else(|| DispatchError::CounterStorage {
            counter: id,
            operation: format!("lookup (store holds {} counters)", self.len()),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use tempfile::TempDir;

    fn memory_store(count: usize) -> (CounterStore, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = CounterStore::new(count, backend.clone());
        store.initialize().unwrap();
        (store, backend)
    }

    #[test]
    fn test_increment_decrement() {
        let (store, backend) = memory_store(2);

        assert_eq!(store.increment(0).unwrap(), 1);
        assert_eq!(store.increment(0).unwrap(), 2);
        assert_eq!(store.decrement(1).unwrap(), -1);

        assert_eq!(backend.get(0), Some(2));
        assert_eq!(backend.get(1), Some(-1));
        assert_eq!(store.value(0).unwrap(), 2);
    }

    #[test]
    fn test_out_of_range_id() {
        let (store, _) = memory_store(1);
        let err = store.increment(1).unwrap_err();
        assert!(matches!(err, DispatchError::CounterStorage { counter: 1, .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_missing_storage_treated_as_zero() {
        let (store, backend) = memory_store(1);
        store.increment(0).unwrap();
        backend.remove(0);

        assert_eq!(store.increment(0).unwrap(), 1);
        assert_eq!(backend.get(0), Some(1));
    }

    #[test]
    fn test_corrupt_file_treated_as_zero() {
        let dir = TempDir::new().unwrap();
        let backend = Arc::new(FileBackend::new(dir.path()));
        let store = CounterStore::new(1, backend.clone());
        store.initialize().unwrap();

        std::fs::write(backend.path_for(0), "garbage").unwrap();
        assert_eq!(store.decrement(0).unwrap(), -1);
        assert_eq!(std::fs::read_to_string(backend.path_for(0)).unwrap(), "-1\n");
    }

    #[test]
    fn test_initialize_resets_existing_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("count00.txt"), "41\n").unwrap();

        let store = CounterStore::new(2, Arc::new(FileBackend::new(dir.path())));
        store.initialize().unwrap();

        assert_eq!(store.value(0).unwrap(), 0);
        assert_eq!(store.value(1).unwrap(), 0);
    }

    #[test]
    fn test_concurrent_updates_serialize() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(CounterStore::new(
            3,
            Arc::new(FileBackend::new(dir.path())),
        ));
        store.initialize().unwrap();

        let num_threads = 8;
        let ops_per_thread = 50;
        let mut handles = vec![];

        for i in 0..num_threads {
            let store = Arc::clone(&store);
            handles.push(thread::spawn(move || {
                for _ in 0..ops_per_thread {
                    store.increment(0).unwrap();
                    if i % 2 == 0 {
                        store.decrement(1).unwrap();
                    } else {
                        store.increment(2).unwrap();
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.value(0).unwrap(), (num_threads * ops_per_thread) as i64);
        assert_eq!(store.value(1).unwrap(), -((num_threads / 2 * ops_per_thread) as i64));
        assert_eq!(store.value(2).unwrap(), (num_threads / 2 * ops_per_thread) as i64);
    }
}
