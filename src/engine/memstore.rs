use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::engine::raw::RawStorage;
use crate::{Error, Result};

/// In-memory [`RawStorage`] for tests and ephemeral use. Data is lost on drop.
#[derive(Debug, Default)]
pub struct MemoryRawStorage {
    data: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryRawStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_lock(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.data
            .read()
            .map_err(|e| Error::Internal(format!("lock poisoned: {e}")))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.data
            .write()
            .map_err(|e| Error::Internal(format!("lock poisoned: {e}")))
    }
}

impl RawStorage for MemoryRawStorage {
    fn exists(&self, key: &str) -> bool {
        self.read_lock()
            .map(|data| data.contains_key(key))
            .unwrap_or(false)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        self.read_lock()?
            .get(key)
            .cloned()
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn write(&self, key: &str, content: &[u8]) -> Result<()> {
        self.write_lock()?.insert(key.to_string(), content.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.write_lock()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(key.to_string()))
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = format!("{}/", prefix.trim_end_matches('/'));
        let data = self.read_lock()?;
        Ok(data
            .range(dir.clone()..)
            .take_while(|(k, _)| k.starts_with(&dir))
            .filter(|(k, _)| !k[dir.len()..].contains('/'))
            .map(|(k, _)| k.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memstore_read_write() {
        let storage = MemoryRawStorage::new();
        storage.write("/VM/a", b"v1").unwrap();

        assert!(storage.exists("/VM/a"));
        assert_eq!(storage.read("/VM/a").unwrap(), b"v1");
    }

    #[test]
    fn test_memstore_delete() {
        let storage = MemoryRawStorage::new();
        storage.write("/VM/a", b"v1").unwrap();
        storage.delete("/VM/a").unwrap();

        assert!(matches!(storage.read("/VM/a"), Err(Error::NotFound(_))));
        assert!(matches!(storage.delete("/VM/a"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_memstore_list_prefix_boundary() {
        let storage = MemoryRawStorage::new();
        storage.write("/VM/b", b"").unwrap();
        storage.write("/VM/a", b"").unwrap();
        storage.write("/VMX/c", b"").unwrap();
        storage.write("/Kernel/k", b"").unwrap();

        assert_eq!(storage.list("/VM").unwrap(), vec!["/VM/a", "/VM/b"]);
        assert!(storage.list("/Image").unwrap().is_empty());
    }
}
