//! Error types for jsonvault.

use std::io;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process holds the store's LOCK file.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// Document name is not a filesystem-safe identifier.
    #[error("invalid document name: {name:?}")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Operation referenced a name with no registry entry.
    #[error("unknown document: {name}")]
    UnknownDocument {
        /// The name that was looked up.
        name: String,
    },

    /// Document file is missing on disk.
    #[error("document not found: {name}")]
    NotFound {
        /// The document whose file is absent.
        name: String,
    },

    /// A key was not present in a document mapping.
    #[error("key {key:?} not found in document {document}")]
    KeyNotFound {
        /// The document that was read.
        document: String,
        /// The absent key.
        key: String,
    },

    /// Document file content is not valid JSON.
    #[error("document {name} is corrupt: {source}")]
    Corrupt {
        /// The document whose file failed to parse.
        name: String,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// A value could not be serialized as JSON.
    #[error("serialization error: {0}")]
    Serialization(serde_json::Error),

    /// A document's top-level JSON value must be an object.
    #[error("document {name} content is not a JSON object")]
    NotAnObject {
        /// The document being written.
        name: String,
    },

    /// `append` target is not a list.
    #[error("entry {key:?} in document {document} is not a list")]
    NotAList {
        /// The document that was read.
        document: String,
        /// The key whose value was expected to be a list.
        key: String,
    },

    /// Operation not permitted in the session's current state.
    #[error("invalid session state: {message}")]
    InvalidSessionState {
        /// Description of why the operation is invalid.
        message: String,
    },
}

impl StoreError {
    /// Creates an invalid name error.
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Creates an unknown document error.
    pub fn unknown_document(name: impl Into<String>) -> Self {
        Self::UnknownDocument { name: name.into() }
    }

    /// Creates a not found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    /// Creates a key not found error.
    pub fn key_not_found(document: impl Into<String>, key: impl Into<String>) -> Self {
        Self::KeyNotFound {
            document: document.into(),
            key: key.into(),
        }
    }

    /// Creates a corrupt document error.
    pub fn corrupt(name: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Corrupt {
            name: name.into(),
            source,
        }
    }

    /// Creates a not-an-object error.
    pub fn not_an_object(name: impl Into<String>) -> Self {
        Self::NotAnObject { name: name.into() }
    }

    /// Creates a not-a-list error.
    pub fn not_a_list(document: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotAList {
            document: document.into(),
            key: key.into(),
        }
    }

    /// Creates an invalid session state error.
    pub fn invalid_session_state(message: impl Into<String>) -> Self {
        Self::InvalidSessionState {
            message: message.into(),
        }
    }
}
