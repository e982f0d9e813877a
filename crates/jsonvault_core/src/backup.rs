//! Timestamped document backups.
//!
//! Each backup invocation creates a fresh subdirectory of the backup root,
//! named `YYYYMMDD-HHMMSS`, and copies the selected document files into it.
//! Every copy runs under that document's own lock, so each copied file is
//! self-consistent at the instant of its copy — the set as a whole is not a
//! cross-document snapshot.

use crate::error::{StoreError, StoreResult};
use crate::store::DocumentStore;
use chrono::Local;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// Which documents to include in a backup.
#[derive(Debug, Clone)]
pub enum BackupSelection {
    /// Every registered document.
    All,
    /// The named documents only.
    Named(Vec<String>),
}

impl BackupSelection {
    /// Builds a named selection from anything iterable over names.
    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Named(names.into_iter().map(Into::into).collect())
    }
}

/// Description of a completed backup set.
#[derive(Debug, Clone)]
pub struct BackupReport {
    /// Directory the copies were written into.
    pub path: PathBuf,
    /// Timestamp label of the set (`YYYYMMDD-HHMMSS`).
    pub label: String,
    /// Names of the documents that were copied.
    pub documents: Vec<String>,
}

/// Copies documents into timestamped backup sets.
///
/// Borrowed from a [`DocumentStore`] via [`DocumentStore::backup`].
pub struct BackupManager<'store> {
    store: &'store DocumentStore,
}

impl<'store> BackupManager<'store> {
    pub(crate) fn new(store: &'store DocumentStore) -> Self {
        Self { store }
    }

    /// Creates a new backup set containing the selected documents.
    ///
    /// Resolving [`BackupSelection::All`] against an empty store, or
    /// passing an empty name list, is a no-op returning `None` — no
    /// directory is created.
    ///
    /// # Errors
    ///
    /// - `UnknownDocument` if a named document has no registry entry
    /// - `NotFound` if a document's file has gone missing
    /// - I/O errors from directory creation or copying (including a second
    ///   backup within the same second colliding on the set directory)
    pub fn create(&self, selection: BackupSelection) -> StoreResult<Option<BackupReport>> {
        let names = match selection {
            BackupSelection::All => self.store.registry().names(),
            BackupSelection::Named(names) => {
                for name in &names {
                    if !self.store.registry().contains(name) {
                        return Err(StoreError::unknown_document(name));
                    }
                }
                names
            }
        };

        if names.is_empty() {
            return Ok(None);
        }

        let backup_root = self.store.backup_root();
        fs::create_dir_all(&backup_root)?;

        let label = Local::now().format("%Y%m%d-%H%M%S").to_string();
        let set_path = backup_root.join(&label);
        fs::create_dir(&set_path)?;

        for name in &names {
            let lock = self.store.registry().lock_for(name)?;
            let _guard = lock.lock();
            let src = self.store.document_path(name);
            let dst = set_path.join(format!("{name}.json"));
            match fs::copy(&src, &dst) {
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(StoreError::not_found(name));
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(label = %label, documents = names.len(), "created backup set");
        Ok(Some(BackupReport {
            path: set_path,
            label,
            documents: names,
        }))
    }
}
