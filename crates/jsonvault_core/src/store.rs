//! The document store facade.

use crate::backup::{BackupManager, BackupReport, BackupSelection};
use crate::config::Config;
use crate::dir::StoreDir;
use crate::document::{self, Document};
use crate::error::{StoreError, StoreResult};
use crate::registry::LockRegistry;
use crate::session::Session;
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// An embedded store of named JSON documents.
///
/// Each document lives in its own `<name>.json` file and is guarded by its
/// own mutex, so operations on different documents never block each other
/// while operations on the same document are strictly serialized.
///
/// A `DocumentStore` is meant to be constructed once at startup and handed
/// to consumers by reference; the per-document locks live for the store's
/// lifetime.
///
/// # One-shot operations
///
/// ```rust,ignore
/// let store = DocumentStore::open(Path::new("data"))?;
/// store.create("users", Document::new(), false)?;
/// store.add("users", "alice", &serde_json::json!({"id": 1}))?;
/// let users = store.read("users")?;
/// ```
///
/// # Sessions
///
/// For multi-step edits under a single lock hold, open a [`Session`]:
///
/// ```rust,ignore
/// store.with_session("users", |session| {
///     session.remove("alice")?;
///     session.insert("bob", serde_json::json!({"id": 2}))?;
///     Ok(())
/// })?;
/// ```
///
/// The session commits atomically on success and rolls back on failure;
/// the document is never left partially written.
pub struct DocumentStore {
    /// Configuration.
    config: Config,
    /// Storage directory (holds the process LOCK file).
    dir: StoreDir,
    /// Per-document lock table.
    registry: LockRegistry,
}

impl DocumentStore {
    /// Opens a store rooted at `path` with default configuration.
    ///
    /// Scans the directory for `*.json` files and registers a lock for each.
    /// Documents created after this scan must go through [`Self::create`]
    /// before first use.
    ///
    /// # Errors
    ///
    /// Returns `StoreLocked` if another process has the directory open, or
    /// an I/O error if the directory cannot be created or scanned.
    pub fn open(path: &Path) -> StoreResult<Self> {
        Self::open_with_config(path, Config::default())
    }

    /// Opens a store rooted at `path` with the given configuration.
    pub fn open_with_config(path: &Path, config: Config) -> StoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;

        let mut names = Vec::new();
        for name in dir.scan_documents()? {
            match document::validate_name(&name) {
                Ok(()) => names.push(name),
                Err(_) => warn!(name = %name, "skipping file with unusable document name"),
            }
        }

        info!(root = %path.display(), documents = names.len(), "opened document store");
        Ok(Self {
            config,
            dir,
            registry: LockRegistry::with_names(names),
        })
    }

    /// Closes the store, releasing the process LOCK file.
    ///
    /// All writes are synchronous, so there is nothing to flush; dropping
    /// the store has the same effect. Provided for explicit lifecycles.
    pub fn close(self) -> StoreResult<()> {
        info!(root = %self.dir.path().display(), "closing document store");
        Ok(())
    }

    /// Reads the content of document `name`.
    ///
    /// # Errors
    ///
    /// - `UnknownDocument` if `name` has no registry entry
    /// - `NotFound` if the backing file has gone missing
    /// - `Corrupt` if the file is not valid JSON
    pub fn read(&self, name: &str) -> StoreResult<Document> {
        let lock = self.registry.lock_for(name)?;
        let _guard = lock.lock();
        document::read_file(name, &self.dir.document_path(name))
    }

    /// Replaces the content of document `name` with `data`.
    ///
    /// `data` must serialize to a JSON object. Serialization happens before
    /// the lock is taken and the file write is an atomic replace, so on any
    /// failure the previous content is left untouched.
    pub fn write<T: Serialize + ?Sized>(&self, name: &str, data: &T) -> StoreResult<()> {
        let content = document::to_document(name, data)?;
        let lock = self.registry.lock_for(name)?;
        let _guard = lock.lock();
        debug!(name, keys = content.len(), "writing document");
        document::write_file_atomic(&self.dir.document_path(name), &content, self.config.sync_writes)
    }

    /// Creates document `name` with `initial` content.
    ///
    /// Registers the document's lock and writes the file together, so a
    /// second lock can never be created for an existing name. If the
    /// document already exists this is a no-op returning `None`, unless
    /// `replace` is true, in which case the file is overwritten.
    pub fn create(
        &self,
        name: &str,
        initial: Document,
        replace: bool,
    ) -> StoreResult<Option<Document>> {
        document::validate_name(name)?;

        let lock = match self.registry.register_if_absent(name) {
            Some(lock) => {
                debug!(name, "creating document");
                lock
            }
            None if replace => {
                debug!(name, "replacing existing document");
                self.registry.lock_for(name)?
            }
            None => return Ok(None),
        };

        let _guard = lock.lock();
        document::write_file_atomic(
            &self.dir.document_path(name),
            &initial,
            self.config.sync_writes,
        )?;
        Ok(Some(initial))
    }

    /// Sets `key` to `value` in document `name`.
    ///
    /// The read-modify-write runs under a single lock acquisition, so no
    /// other writer can interleave between the read and the write.
    pub fn add<T: Serialize + ?Sized>(&self, name: &str, key: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value).map_err(StoreError::Serialization)?;
        let lock = self.registry.lock_for(name)?;
        let _guard = lock.lock();

        let path = self.dir.document_path(name);
        let mut content = document::read_file(name, &path)?;
        content.insert(key.to_string(), value);
        document::write_file_atomic(&path, &content, self.config.sync_writes)
    }

    /// Appends `value` to the list stored under the document's own name.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` if the document has no entry named after itself
    /// - `NotAList` if that entry is not a JSON array
    pub fn append<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> StoreResult<()> {
        let value = serde_json::to_value(value).map_err(StoreError::Serialization)?;
        let lock = self.registry.lock_for(name)?;
        let _guard = lock.lock();

        let path = self.dir.document_path(name);
        let mut content = document::read_file(name, &path)?;
        match content.get_mut(name) {
            Some(Value::Array(list)) => list.push(value),
            Some(_) => return Err(StoreError::not_a_list(name, name)),
            None => return Err(StoreError::key_not_found(name, name)),
        }
        document::write_file_atomic(&path, &content, self.config.sync_writes)
    }

    /// Overwrites every registered document with `default`.
    ///
    /// Each document is reset under its own lock acquisition; the set as a
    /// whole is not atomic, and unrelated documents may be touched by other
    /// callers in between.
    pub fn reset_all(&self, default: &Document) -> StoreResult<()> {
        let names = self.registry.names();
        info!(documents = names.len(), "resetting all documents");
        for name in names {
            let lock = self.registry.lock_for(&name)?;
            let _guard = lock.lock();
            document::write_file_atomic(
                &self.dir.document_path(&name),
                default,
                self.config.sync_writes,
            )?;
        }
        Ok(())
    }

    /// Looks up `key` in document `name`.
    ///
    /// Shorthand for `read(name)` followed by a key lookup; fails with
    /// `KeyNotFound` if the key is absent.
    pub fn translate(&self, name: &str, key: &str) -> StoreResult<Value> {
        self.read(name)?
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::key_not_found(name, key))
    }

    /// Returns whether document `name` contains `key`.
    ///
    /// Takes the document's lock. Never call this while a [`Session`] on
    /// the same document is open on the current thread; use
    /// [`Session::contains_key`] there instead, the lock is not reentrant.
    pub fn contains(&self, name: &str, key: &str) -> StoreResult<bool> {
        Ok(self.read(name)?.contains_key(key))
    }

    /// Opens a transactional session on document `name`.
    ///
    /// Blocks until the document's lock is available, then loads the
    /// current content and snapshots it for rollback.
    pub fn session(&self, name: &str) -> StoreResult<Session<'_>> {
        Session::begin(self, name)
    }

    /// Runs `body` inside a session on document `name`.
    ///
    /// Commits if `body` returns `Ok`, rolls back (leaving the document
    /// untouched) and propagates the error otherwise.
    pub fn with_session<R, F>(&self, name: &str, body: F) -> StoreResult<R>
    where
        F: FnOnce(&mut Session<'_>) -> StoreResult<R>,
    {
        let mut session = self.session(name)?;
        match body(&mut session) {
            Ok(value) => {
                session.commit()?;
                Ok(value)
            }
            Err(e) => {
                // The body may have finished the session itself; the
                // original error still wins.
                let _ = session.rollback();
                Err(e)
            }
        }
    }

    /// Returns a backup manager for this store.
    #[must_use]
    pub fn backup(&self) -> BackupManager<'_> {
        BackupManager::new(self)
    }

    /// Copies the selected documents into a fresh timestamped backup set.
    ///
    /// Convenience for [`BackupManager::create`].
    pub fn create_backup(&self, selection: BackupSelection) -> StoreResult<Option<BackupReport>> {
        self.backup().create(selection)
    }

    /// Returns the storage directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Returns the backup root directory path.
    #[must_use]
    pub fn backup_root(&self) -> PathBuf {
        self.dir.path().join(&self.config.backup_dir_name)
    }

    /// Returns all registered document names, sorted.
    #[must_use]
    pub fn document_names(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Returns the number of registered documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Returns whether the store has no registered documents.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub(crate) fn registry(&self) -> &LockRegistry {
        &self.registry
    }

    pub(crate) fn document_path(&self, name: &str) -> PathBuf {
        self.dir.document_path(name)
    }

    pub(crate) fn sync_writes(&self) -> bool {
        self.config.sync_writes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_content() -> Document {
        let mut content = Document::new();
        content.insert("1".into(), json!(1));
        content.insert("test".into(), json!("test"));
        content.insert("list".into(), json!(["1", 2, {"3": 3}]));
        content.insert("dict".into(), json!({"test": "data"}));
        content
    }

    fn open_store(tmp: &TempDir) -> DocumentStore {
        DocumentStore::open(tmp.path()).unwrap()
    }

    #[test]
    fn open_scans_existing_documents() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("users.json"), "{}").unwrap();
        std::fs::write(tmp.path().join("tokens.json"), "{}").unwrap();

        let store = open_store(&tmp);
        assert_eq!(store.document_names(), vec!["tokens", "users"]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn write_then_read_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("doc", Document::new(), false).unwrap();

        let content = test_content();
        store.write("doc", &content).unwrap();
        assert_eq!(store.read("doc").unwrap(), content);
    }

    #[test]
    fn read_unknown_document_fails() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let result = store.read("missing");
        assert!(matches!(result, Err(StoreError::UnknownDocument { .. })));
    }

    #[test]
    fn read_corrupt_document_fails() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("bad.json"), "{ nope").unwrap();

        let store = open_store(&tmp);
        assert!(matches!(store.read("bad"), Err(StoreError::Corrupt { .. })));
    }

    #[test]
    fn read_missing_file_fails_with_not_found() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("doc.json"), "{}").unwrap();
        let store = open_store(&tmp);
        std::fs::remove_file(tmp.path().join("doc.json")).unwrap();

        assert!(matches!(store.read("doc"), Err(StoreError::NotFound { .. })));
    }

    #[test]
    fn create_registers_lock_and_writes_file() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let created = store.create("users", test_content(), false).unwrap();
        assert_eq!(created, Some(test_content()));
        assert!(tmp.path().join("users.json").is_file());
        assert_eq!(store.read("users").unwrap(), test_content());
    }

    #[test]
    fn create_without_replace_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("users", test_content(), false).unwrap();

        let mut other = Document::new();
        other.insert("hi".into(), json!("there!"));

        assert_eq!(store.create("users", other, false).unwrap(), None);
        assert_eq!(store.read("users").unwrap(), test_content());
    }

    #[test]
    fn create_with_replace_overwrites() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("users", test_content(), false).unwrap();

        let mut other = Document::new();
        other.insert("hi".into(), json!("there"));

        let created = store.create("users", other.clone(), true).unwrap();
        assert_eq!(created, Some(other.clone()));
        assert_eq!(store.read("users").unwrap(), other);
    }

    #[test]
    fn create_rejects_invalid_name() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let result = store.create("../escape", Document::new(), false);
        assert!(matches!(result, Err(StoreError::InvalidName { .. })));
    }

    #[test]
    fn write_rejects_non_object_data() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("doc", test_content(), false).unwrap();

        let result = store.write("doc", &vec![1, 2, 3]);
        assert!(matches!(result, Err(StoreError::NotAnObject { .. })));
        // Previous content untouched
        assert_eq!(store.read("doc").unwrap(), test_content());
    }

    #[test]
    fn write_serialization_failure_leaves_file_intact() {
        use std::collections::HashMap;
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("doc", test_content(), false).unwrap();

        // serde_json refuses maps with non-string keys
        let bad: HashMap<Vec<u8>, u32> = HashMap::from([(vec![1u8], 1)]);
        let result = store.write("doc", &bad);
        assert!(matches!(result, Err(StoreError::Serialization(_))));
        assert_eq!(store.read("doc").unwrap(), test_content());
    }

    #[test]
    fn add_sets_key_under_one_lock() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("doc", test_content(), false).unwrap();

        store.add("doc", "some_key", "some_data").unwrap();
        assert_eq!(store.read("doc").unwrap()["some_key"], json!("some_data"));

        // Overwrites the previous value and is idempotent under repeats
        store.add("doc", "some_key", &json!({"some_data": 1})).unwrap();
        store.add("doc", "some_key", &json!({"some_data": 1})).unwrap();
        assert_eq!(
            store.read("doc").unwrap()["some_key"],
            json!({"some_data": 1})
        );
    }

    #[test]
    fn append_pushes_to_self_named_list() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let mut content = Document::new();
        content.insert("doc".into(), json!([]));
        store.create("doc", content, false).unwrap();

        store.append("doc", "hi").unwrap();
        store.append("doc", "hi2").unwrap();

        let list = store.read("doc").unwrap()["doc"].clone();
        assert_eq!(list, json!(["hi", "hi2"]));
    }

    #[test]
    fn append_to_non_list_fails() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);

        let mut content = Document::new();
        content.insert("doc".into(), json!("not a list"));
        store.create("doc", content, false).unwrap();

        assert!(matches!(
            store.append("doc", "hi"),
            Err(StoreError::NotAList { .. })
        ));
    }

    #[test]
    fn append_without_self_named_entry_fails() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("doc", Document::new(), false).unwrap();

        assert!(matches!(
            store.append("doc", "hi"),
            Err(StoreError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn reset_all_overwrites_every_document() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("a", test_content(), false).unwrap();
        store.create("b", test_content(), false).unwrap();

        let mut default = Document::new();
        default.insert("fresh".into(), json!(true));
        store.reset_all(&default).unwrap();

        assert_eq!(store.read("a").unwrap(), default);
        assert_eq!(store.read("b").unwrap(), default);
    }

    #[test]
    fn translate_returns_value_or_key_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("doc", test_content(), false).unwrap();

        assert_eq!(store.translate("doc", "test").unwrap(), json!("test"));
        assert_eq!(store.translate("doc", "1").unwrap(), json!(1));
        assert!(matches!(
            store.translate("doc", "absent"),
            Err(StoreError::KeyNotFound { .. })
        ));
    }

    #[test]
    fn contains_checks_key_presence() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("doc", test_content(), false).unwrap();

        assert!(store.contains("doc", "test").unwrap());
        assert!(!store.contains("doc", "2").unwrap());
    }

    #[test]
    fn deterministic_bytes_on_disk() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.create("doc", Document::new(), false).unwrap();

        store.write("doc", &test_content()).unwrap();
        let first = std::fs::read(tmp.path().join("doc.json")).unwrap();
        store.write("doc", &test_content()).unwrap();
        let second = std::fs::read(tmp.path().join("doc.json")).unwrap();

        assert_eq!(first, second);
        let text = String::from_utf8(first).unwrap();
        assert!(text.starts_with("{\n    \""));
    }

    #[test]
    fn close_releases_process_lock() {
        let tmp = TempDir::new().unwrap();
        let store = open_store(&tmp);
        store.close().unwrap();

        assert!(DocumentStore::open(tmp.path()).is_ok());
    }
}
