//! Document content and on-disk representation.
//!
//! A document is a JSON object, held in memory as a
//! [`serde_json::Map`]. The map is backed by a `BTreeMap`, so keys are
//! always lexicographically ordered and the encoded form is deterministic.
//!
//! Files are written with 4-space indentation, and every write goes through
//! a temp-file-plus-rename so readers never observe a partial document.

use crate::error::{StoreError, StoreResult};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;

/// In-memory content of a document: a JSON object.
pub type Document = serde_json::Map<String, Value>;

/// Suffix of the scratch file used for atomic replacement.
const TEMP_SUFFIX: &str = "json.tmp";

/// Validates that `name` is a filesystem-safe document identifier.
///
/// Accepted characters are ASCII alphanumerics, `-` and `_`. Anything that
/// could traverse directories or collide with the store's own files is
/// rejected.
pub fn validate_name(name: &str) -> StoreResult<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if ok {
        Ok(())
    } else {
        Err(StoreError::invalid_name(name))
    }
}

/// Encodes a document with sorted keys and 4-space indentation.
pub(crate) fn encode(content: &Document) -> StoreResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(128);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    content
        .serialize(&mut serializer)
        .map_err(StoreError::Serialization)?;
    Ok(buf)
}

/// Parses document bytes, requiring a top-level JSON object.
pub(crate) fn parse(name: &str, bytes: &[u8]) -> StoreResult<Document> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| StoreError::corrupt(name, e))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::not_an_object(name)),
    }
}

/// Converts any serializable value into a document.
///
/// Fails with `Serialization` if the value cannot be represented as JSON,
/// or `NotAnObject` if it is representable but not an object.
pub(crate) fn to_document<T: Serialize + ?Sized>(name: &str, data: &T) -> StoreResult<Document> {
    let value = serde_json::to_value(data).map_err(StoreError::Serialization)?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::not_an_object(name)),
    }
}

/// Reads and parses `<name>.json` at `path`.
///
/// The caller must hold the document's lock.
pub(crate) fn read_file(name: &str, path: &Path) -> StoreResult<Document> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::not_found(name));
        }
        Err(e) => return Err(e.into()),
    };
    parse(name, &bytes)
}

/// Atomically replaces the file at `path` with the encoded document.
///
/// The content is written to a sibling scratch file first and renamed over
/// the target, so the previous content stays intact if anything fails
/// mid-write. The caller must hold the document's lock.
pub(crate) fn write_file_atomic(path: &Path, content: &Document, sync: bool) -> StoreResult<()> {
    let bytes = encode(content)?;
    let tmp_path = path.with_extension(TEMP_SUFFIX);

    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;
    file.write_all(&bytes)?;
    if sync {
        file.sync_all()?;
    }
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}
