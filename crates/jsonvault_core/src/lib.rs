//! # jsonvault
//!
//! An embedded store of named JSON documents, each backed by one
//! `<name>.json` file and guarded by its own mutex.
//!
//! ## What it provides
//!
//! - One-shot operations (`read`, `write`, `create`, `add`, `append`,
//!   `translate`, `reset_all`), each taking the document's lock for its
//!   duration
//! - [`Session`]: a scoped transaction on one document with a single lock
//!   hold and all-or-nothing persistence
//! - [`BackupManager`]: timestamped backup sets, each document copied
//!   under its own lock
//!
//! ## Concurrency model
//!
//! One mutex per document name. Operations on different documents never
//! block each other; operations on the same document serialize in
//! acquisition order. Locks are **not** reentrant — inside a session, use
//! the session's own accessors rather than the store's locking operations.
//!
//! ## Example
//!
//! ```rust,ignore
//! use jsonvault_core::{Document, DocumentStore};
//! use std::path::Path;
//!
//! let store = DocumentStore::open(Path::new("data"))?;
//! store.create("users", Document::new(), false)?;
//! store.add("users", "alice", &serde_json::json!({"id": 1}))?;
//!
//! store.with_session("users", |session| {
//!     session.insert("bob", serde_json::json!({"id": 2}))?;
//!     Ok(())
//! })?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backup;
mod config;
mod dir;
mod document;
mod error;
mod registry;
mod session;
mod store;

pub use backup::{BackupManager, BackupReport, BackupSelection};
pub use config::Config;
pub use dir::StoreDir;
pub use document::{validate_name, Document};
pub use error::{StoreError, StoreResult};
pub use registry::{DocumentLock, LockRegistry};
pub use session::{Session, SessionState};
pub use store::DocumentStore;
