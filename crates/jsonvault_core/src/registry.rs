//! Per-document lock registry.
//!
//! Every document name maps to exactly one mutex for the lifetime of the
//! store. The table is seeded from the startup directory scan and extended
//! by `register` when documents are created later. Entries are never
//! removed; the store is meant to live as long as the process.

use crate::error::{StoreError, StoreResult};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// A single document's lock.
///
/// The mutex guards the document's file; holders may read and write
/// `<name>.json` freely for the duration of the guard.
pub type DocumentLock = Arc<Mutex<()>>;

/// Process-wide table mapping document name to its mutex.
#[derive(Debug, Default)]
pub struct LockRegistry {
    entries: RwLock<HashMap<String, DocumentLock>>,
}

impl LockRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with an entry for each of the given names.
    #[must_use]
    pub fn with_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = names
            .into_iter()
            .map(|name| (name.into(), Arc::new(Mutex::new(()))))
            .collect();
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Returns the lock for `name`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownDocument` if no entry exists.
    pub fn lock_for(&self, name: &str) -> StoreResult<DocumentLock> {
        self.entries
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::unknown_document(name))
    }

    /// Registers a lock for `name`, returning the existing entry if present.
    ///
    /// Lookup and insertion happen under a single registry-wide write lock,
    /// so two concurrent callers can never create two different locks for
    /// the same new name.
    pub fn register(&self, name: &str) -> DocumentLock {
        let mut entries = self.entries.write();
        entries
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Registers a lock for `name` only if no entry exists.
    ///
    /// Returns the new lock, or `None` if the name was already registered.
    /// Used by document creation to decide, atomically with respect to the
    /// registry, whether it owns the creation of the backing file.
    pub fn register_if_absent(&self, name: &str) -> Option<DocumentLock> {
        let mut entries = self.entries.write();
        if entries.contains_key(name) {
            return None;
        }
        let lock: DocumentLock = Arc::new(Mutex::new(()));
        entries.insert(name.to_string(), lock.clone());
        Some(lock)
    }

    /// Returns whether `name` has an entry.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Returns all registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Returns the number of registered documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn lock_for_unknown_name_fails() {
        let registry = LockRegistry::new();
        let result = registry.lock_for("missing");
        assert!(matches!(result, Err(StoreError::UnknownDocument { .. })));
    }

    #[test]
    fn register_is_idempotent() {
        let registry = LockRegistry::new();

        let first = registry.register("users");
        let second = registry.register("users");

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn lock_for_returns_registered_lock() {
        let registry = LockRegistry::new();
        let registered = registry.register("users");
        let looked_up = registry.lock_for("users").unwrap();

        assert!(Arc::ptr_eq(&registered, &looked_up));
    }

    #[test]
    fn with_names_seeds_entries() {
        let registry = LockRegistry::with_names(["users", "tokens"]);

        assert!(registry.contains("users"));
        assert!(registry.contains("tokens"));
        assert_eq!(registry.names(), vec!["tokens", "users"]);
    }

    #[test]
    fn register_if_absent_only_inserts_once() {
        let registry = LockRegistry::new();

        assert!(registry.register_if_absent("users").is_some());
        assert!(registry.register_if_absent("users").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn concurrent_register_yields_one_lock() {
        let registry = Arc::new(LockRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.register("shared"))
            })
            .collect();

        let locks: Vec<DocumentLock> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for lock in &locks[1..] {
            assert!(Arc::ptr_eq(&locks[0], lock));
        }
        assert_eq!(registry.len(), 1);
    }
}
