//! Identity-keyed storage that never extends the keyed object's lifetime.
//!
//! Rust exposes no finalizer hook to evict entries the instant an object is
//! reclaimed, so the store trades the GC-hook design for deterministic
//! sweeping: every mutating access and every count purges entries whose weak
//! reference has died, and [`WeakIdentityStore::remove`] gives hosts an
//! explicit scope-exit eviction point.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use canopy_common::{ObjectHandle, ObjectId, WeakObject};

struct StoreEntry<T> {
    /// Non-owning reference used solely to detect that the key object died.
    key: WeakObject,
    data: Arc<Mutex<T>>,
}

/// An associative store keyed by object identity.
///
/// Entries hold only a [`WeakObject`] for the key, so the store never keeps
/// an object alive. The map itself sits behind one mutex, making insert,
/// eviction, and lookup atomic with respect to each other; the per-entry data
/// sits behind its own mutex so callers get per-object locking.
pub struct WeakIdentityStore<T> {
    entries: Mutex<HashMap<ObjectId, StoreEntry<T>>>,
}

impl<T: Default> WeakIdentityStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the entry for `object`, creating it if absent.
    ///
    /// Dead entries are purged on the way in, so a long-lived store does not
    /// accumulate tombstones for short-lived objects.
    pub fn get_or_create(&self, object: &ObjectHandle) -> Arc<Mutex<T>> {
        let mut entries = self.entries.lock().unwrap();
        Self::sweep(&mut entries);
        entries
            .entry(object.id())
            .or_insert_with(|| StoreEntry {
                key: object.downgrade(),
                data: Arc::new(Mutex::new(T::default())),
            })
            .data
            .clone()
    }

    /// Returns the entry for `object` if one exists.
    pub fn get(&self, object: &ObjectHandle) -> Option<Arc<Mutex<T>>> {
        let entries = self.entries.lock().unwrap();
        entries.get(&object.id()).map(|entry| entry.data.clone())
    }

    /// Explicitly evicts the entry for `object`, if any.
    pub fn remove(&self, object: &ObjectHandle) {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&object.id());
    }

    /// Evicts every entry.
    pub fn clear_all(&self) {
        let mut entries = self.entries.lock().unwrap();
        entries.clear();
    }

    /// Returns the number of live entries, purging dead ones first.
    pub fn len(&self) -> usize {
        let mut entries = self.entries.lock().unwrap();
        Self::sweep(&mut entries);
        entries.len()
    }

    /// Returns `true` if the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn sweep(entries: &mut HashMap<ObjectId, StoreEntry<T>>) {
        entries.retain(|_, entry| entry.key.is_alive());
    }
}

impl<T: Default> Default for WeakIdentityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}
