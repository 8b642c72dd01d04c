use std::fs;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use log::debug;
use tempfile::NamedTempFile;

use crate::engine::raw::{child_key, RawStorage};
use crate::{Error, Result};

/// Name of the content file inside each key directory.
pub const METADATA_FILE: &str = "metadata.json";

/// On-disk [`RawStorage`].
///
/// Every key is a directory below the data directory holding a single
/// `metadata.json`, so `/VM/abc123` lives at `<data_dir>/VM/abc123/metadata.json`.
/// Writes go to a temporary file in the key directory first and are then renamed
/// over the content file, so readers never observe a partially written record.
pub struct FileRawStorage {
    data_dir: PathBuf,
}

impl FileRawStorage {
    /// Opens a storage rooted at `dir`, creating the directory if needed.
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(Self { data_dir: dir })
    }

    fn dir_for(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::Internal(format!("invalid storage key {:?}", key)));
        }
        Ok(self.data_dir.join(relative))
    }

    fn file_for(&self, key: &str) -> Result<PathBuf> {
        Ok(self.dir_for(key)?.join(METADATA_FILE))
    }
}

fn not_found(key: &str, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound(key.to_string())
    } else {
        Error::Io(err)
    }
}

impl RawStorage for FileRawStorage {
    fn exists(&self, key: &str) -> bool {
        self.file_for(key).map(|p| p.is_file()).unwrap_or(false)
    }

    fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.file_for(key)?;
        fs::read(&path).map_err(|e| not_found(key, e))
    }

    fn write(&self, key: &str, content: &[u8]) -> Result<()> {
        let dir = self.dir_for(key)?;
        fs::create_dir_all(&dir)?;

        let mut temp = NamedTempFile::new_in(&dir)?;
        temp.write_all(content)?;
        temp.as_file().sync_all()?;
        temp.persist(dir.join(METADATA_FILE)).map_err(|e| e.error)?;

        debug!("wrote {} bytes to {:?}", content.len(), dir);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        let dir = self.dir_for(key)?;
        // Only object keys (`/Kind/UID`) are deletable, never a whole kind or the root.
        if Path::new(key.trim_start_matches('/')).components().count() < 2 {
            return Err(Error::NotFound(key.to_string()));
        }
        fs::remove_dir_all(&dir).map_err(|e| not_found(key, e))?;
        debug!("removed {:?}", dir);
        Ok(())
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let dir = self.dir_for(prefix)?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            match entry.file_name().to_str() {
                Some(name) => keys.push(child_key(prefix, name)),
                None => debug!("skipping non UTF-8 entry {:?}", entry.path()),
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_and_read() {
        let dir = tempdir().unwrap();
        let storage = FileRawStorage::new(dir.path()).unwrap();

        storage.write("/VM/abc", b"{}").unwrap();

        assert!(storage.exists("/VM/abc"));
        assert_eq!(storage.read("/VM/abc").unwrap(), b"{}");
        assert!(dir.path().join("VM/abc").join(METADATA_FILE).is_file());
    }

    #[test]
    fn test_overwrite_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let storage = FileRawStorage::new(dir.path()).unwrap();

        storage.write("/VM/abc", b"one").unwrap();
        storage.write("/VM/abc", b"two").unwrap();

        assert_eq!(storage.read("/VM/abc").unwrap(), b"two");
        let names: Vec<_> = fs::read_dir(dir.path().join("VM/abc"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![METADATA_FILE]);
    }

    #[test]
    fn test_read_and_delete_missing() {
        let dir = tempdir().unwrap();
        let storage = FileRawStorage::new(dir.path()).unwrap();

        assert!(matches!(storage.read("/VM/nope"), Err(Error::NotFound(k)) if k == "/VM/nope"));
        assert!(matches!(storage.delete("/VM/nope"), Err(Error::NotFound(_))));
        assert!(!storage.exists("/VM/nope"));
    }

    #[test]
    fn test_delete_refuses_kind_and_root_keys() {
        let dir = tempdir().unwrap();
        let storage = FileRawStorage::new(dir.path()).unwrap();

        storage.write("/VM/abc", b"{}").unwrap();
        for key in ["/VM", "/VM/", "/", ""] {
            assert!(matches!(storage.delete(key), Err(Error::NotFound(_))), "{key:?}");
        }

        assert!(storage.exists("/VM/abc"));
        assert_eq!(storage.list("/VM").unwrap(), vec!["/VM/abc"]);
    }

    #[test]
    fn test_delete_removes_key() {
        let dir = tempdir().unwrap();
        let storage = FileRawStorage::new(dir.path()).unwrap();

        storage.write("/VM/abc", b"{}").unwrap();
        storage.delete("/VM/abc").unwrap();

        assert!(!storage.exists("/VM/abc"));
        assert!(!dir.path().join("VM/abc").exists());
        assert!(storage.list("/VM").unwrap().is_empty());
    }

    #[test]
    fn test_list_is_sorted_and_scoped() {
        let dir = tempdir().unwrap();
        let storage = FileRawStorage::new(dir.path()).unwrap();

        storage.write("/VM/b", b"{}").unwrap();
        storage.write("/VM/a", b"{}").unwrap();
        storage.write("/Kernel/k", b"{}").unwrap();

        assert_eq!(storage.list("/VM").unwrap(), vec!["/VM/a", "/VM/b"]);
        assert_eq!(storage.list("/Kernel").unwrap(), vec!["/Kernel/k"]);
        assert!(storage.list("/Image").unwrap().is_empty());
    }

    #[test]
    fn test_directory_without_content_is_listed_but_absent() {
        let dir = tempdir().unwrap();
        let storage = FileRawStorage::new(dir.path()).unwrap();

        fs::create_dir_all(dir.path().join("VM/half")).unwrap();

        assert_eq!(storage.list("/VM").unwrap(), vec!["/VM/half"]);
        assert!(!storage.exists("/VM/half"));
        assert!(matches!(storage.read("/VM/half"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let dir = tempdir().unwrap();
        let storage = FileRawStorage::new(dir.path()).unwrap();

        assert!(matches!(storage.write("/VM/../../etc", b"x"), Err(Error::Internal(_))));
        assert!(!storage.exists("/../x"));
    }
}
