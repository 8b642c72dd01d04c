//! Byte-level backend contract shared by the on-disk and in-memory stores.

use crate::Result;

/// Byte-level storage over a hierarchical key namespace (`/Kind/UID`).
///
/// Backends know nothing about objects. No guarantees are made across calls:
/// two writers racing on one key resolve as last writer wins.
pub trait RawStorage: Send + Sync {
    /// Reports whether readable content is stored under `key`.
    fn exists(&self, key: &str) -> bool;
    /// Reads the content under `key`, failing with [`Error::NotFound`](crate::Error::NotFound) when absent.
    fn read(&self, key: &str) -> Result<Vec<u8>>;
    /// Creates or overwrites the content under `key`.
    fn write(&self, key: &str, content: &[u8]) -> Result<()>;
    /// Removes `key`, failing with [`Error::NotFound`](crate::Error::NotFound) when absent.
    fn delete(&self, key: &str) -> Result<()>;
    /// Lists the keys directly nested under `prefix`.
    ///
    /// The order is stable for an unmutated namespace. A listed key is not
    /// guaranteed to [`exist`](RawStorage::exists).
    fn list(&self, prefix: &str) -> Result<Vec<String>>;
}

pub(crate) fn child_key(prefix: &str, name: &str) -> String {
    format!("{}/{}", prefix.trim_end_matches('/'), name)
}
