//! Transactional sessions.
//!
//! A session binds to one document: it takes the document's lock for its
//! whole lifetime, loads the content into a working map and snapshots the
//! pre-session state. Committing persists the working map atomically;
//! anything else leaves the file exactly as it was at session entry.
//!
//! The document lock is not reentrant. While a session is open, all reads
//! of that document on the owning thread must go through the session
//! (`get`, `contains_key`, `as_map`) — calling the store's locking
//! operations for the same document would deadlock.

use crate::document::{self, Document};
use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::RawMutex;
use serde_json::Value;
use tracing::{debug, warn};

/// State of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Session holds the lock and can read and mutate the working map.
    Active,
    /// Working map was persisted; the session is finished.
    Committed,
    /// Document was left in its pre-session state; the session is finished.
    RolledBack,
}

/// A scoped transaction on a single document.
///
/// Obtained from [`DocumentStore::session`]. Ends in one of three ways:
///
/// - [`commit`](Self::commit): persist the working map, or on persistence
///   failure write the snapshot back and surface the error
/// - [`rollback`](Self::rollback): discard the working map, no write at all
/// - drop while active: same as rollback
///
/// The lock is released exactly once on every path.
pub struct Session<'store> {
    store: &'store DocumentStore,
    name: String,
    state: SessionState,
    working: Document,
    snapshot: Document,
    /// Owned guard on the document's mutex; `None` once finished.
    guard: Option<ArcMutexGuard<RawMutex, ()>>,
}

impl<'store> Session<'store> {
    /// Acquires the document's lock and loads its content.
    pub(crate) fn begin(store: &'store DocumentStore, name: &str) -> StoreResult<Self> {
        let lock = store.registry().lock_for(name)?;
        let guard = lock.lock_arc();
        // Errors here drop the guard and release the lock.
        let working = document::read_file(name, &store.document_path(name))?;
        let snapshot = working.clone();

        debug!(name, keys = working.len(), "session opened");
        Ok(Self {
            store,
            name: name.to_string(),
            state: SessionState::Active,
            working,
            snapshot,
            guard: Some(guard),
        })
    }

    /// Returns the document name this session is bound to.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Returns whether the session is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// Looks up `key` in the working map.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.working.get(key)
    }

    /// Returns whether the working map contains `key`.
    ///
    /// Reads the in-session map directly instead of re-acquiring the
    /// document lock, which the session already holds.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.working.contains_key(key)
    }

    /// Returns the number of top-level keys in the working map.
    #[must_use]
    pub fn len(&self) -> usize {
        self.working.len()
    }

    /// Returns whether the working map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.working.is_empty()
    }

    /// Returns the working map.
    #[must_use]
    pub fn as_map(&self) -> &Document {
        &self.working
    }

    /// Returns the working map for arbitrary (nested) edits.
    pub fn as_map_mut(&mut self) -> StoreResult<&mut Document> {
        self.ensure_active()?;
        Ok(&mut self.working)
    }

    /// Sets `key` to `value` in the working map.
    ///
    /// Returns the previous value, if any.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> StoreResult<Option<Value>> {
        self.ensure_active()?;
        Ok(self.working.insert(key.into(), value.into()))
    }

    /// Removes `key` from the working map.
    pub fn remove(&mut self, key: &str) -> StoreResult<Option<Value>> {
        self.ensure_active()?;
        Ok(self.working.remove(key))
    }

    /// Persists the working map and finishes the session.
    ///
    /// On persistence failure the pre-session snapshot is written back
    /// (best effort — the atomic replace means the file usually still holds
    /// it untouched), the session transitions to `RolledBack` and the
    /// original error is returned. The lock is released either way.
    pub fn commit(&mut self) -> StoreResult<()> {
        self.ensure_active()?;

        let path = self.store.document_path(&self.name);
        match document::write_file_atomic(&path, &self.working, self.store.sync_writes()) {
            Ok(()) => {
                debug!(name = %self.name, "session committed");
                self.finish(SessionState::Committed);
                Ok(())
            }
            Err(e) => {
                warn!(name = %self.name, error = %e, "session persist failed, rolling back");
                if let Err(rollback_err) =
                    document::write_file_atomic(&path, &self.snapshot, self.store.sync_writes())
                {
                    warn!(name = %self.name, error = %rollback_err, "rollback write failed");
                }
                self.finish(SessionState::RolledBack);
                Err(e)
            }
        }
    }

    /// Discards the working map and finishes the session.
    ///
    /// No write happens: the file has held the pre-session content,
    /// untouched, since entry.
    pub fn rollback(&mut self) -> StoreResult<()> {
        self.ensure_active()?;
        debug!(name = %self.name, "session rolled back");
        self.finish(SessionState::RolledBack);
        Ok(())
    }

    fn finish(&mut self, state: SessionState) {
        self.state = state;
        // Releases the document lock.
        self.guard = None;
    }

    fn ensure_active(&self) -> StoreResult<()> {
        match self.state {
            SessionState::Active => Ok(()),
            SessionState::Committed => Err(StoreError::invalid_session_state(
                "session already committed",
            )),
            SessionState::RolledBack => Err(StoreError::invalid_session_state(
                "session already rolled back",
            )),
        }
    }
}

impl Drop for Session<'_> {
    /// A session dropped while active counts as a rollback: nothing is
    /// written and the guard's drop releases the lock.
    fn drop(&mut self) {
        if self.state == SessionState::Active {
            debug!(name = %self.name, "session dropped without commit, rolling back");
            self.state = SessionState::RolledBack;
        }
    }
}
