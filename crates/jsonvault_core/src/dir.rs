//! Storage directory management.
//!
//! This module handles the file system layout for a jsonvault store:
//!
//! ```text
//! <root>/
//! ├─ LOCK           # Advisory lock for single-process access
//! ├─ <name>.json    # One file per document
//! └─ backups/       # Timestamped backup sets (name configurable)
//! ```
//!
//! The LOCK file ensures only one process operates on the store at a time;
//! within that process, per-document mutexes serialize access.

use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Advisory lock file name within the storage directory.
const LOCK_FILE: &str = "LOCK";

/// Extension of document files.
pub(crate) const DOCUMENT_EXT: &str = "json";

/// Manages the storage directory and its advisory process lock.
///
/// Only one `StoreDir` instance can exist per directory at a time; the
/// exclusive lock is released when the value is dropped.
#[derive(Debug)]
pub struct StoreDir {
    /// Root directory path.
    path: PathBuf,
    /// Lock file handle (held for exclusive access).
    _lock_file: File,
}

impl StoreDir {
    /// Opens or creates a storage directory.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The directory doesn't exist and `create_if_missing` is false
    /// - Another process holds the lock (returns `StoreLocked`)
    /// - I/O errors occur
    pub fn open(path: &Path, create_if_missing: bool) -> StoreResult<Self> {
        if !path.exists() {
            if create_if_missing {
                fs::create_dir_all(path)?;
            } else {
                return Err(StoreError::not_found(path.display().to_string()));
            }
        }

        if !path.is_dir() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("path is not a directory: {}", path.display()),
            )));
        }

        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if lock_file.try_lock_exclusive().is_err() {
            return Err(StoreError::StoreLocked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Returns the path to the storage directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the path of the file backing `name`.
    #[must_use]
    pub fn document_path(&self, name: &str) -> PathBuf {
        self.path.join(format!("{name}.{DOCUMENT_EXT}"))
    }

    /// Scans the directory for `*.json` files and returns their stems.
    ///
    /// Files whose stem is not valid UTF-8 are skipped.
    pub fn scan_documents(&self) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(DOCUMENT_EXT) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }
}
