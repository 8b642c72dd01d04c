use std::sync::Arc;

use log::debug;

use crate::engine::raw::RawStorage;
use crate::engine::serializer::Serializer;
use crate::filter::Filter;
use crate::meta::{self, ApiType, Kind, Object, Time, Uid};
use crate::{Error, Result};

/// Persists and retrieves objects of every registered kind.
///
/// [`find`](Storage::find) and [`find_all`](Storage::find_all) are provided on
/// top of [`list`](Storage::list) and [`list_meta`](Storage::list_meta), so every
/// implementation resolves filters the same way.
pub trait Storage: Send + Sync {
    /// Populates `obj` from storage, using its concrete type and UID to locate the record.
    fn get(&self, obj: &mut dyn Object) -> Result<()>;
    /// Saves `obj`. The first write of a UID stamps `metadata.created`.
    fn set(&self, obj: &mut dyn Object) -> Result<()>;
    /// Returns a freshly decoded object for the record at `kind`/`uid`.
    fn get_by_id(&self, kind: &Kind, uid: &Uid) -> Result<Box<dyn Object>>;
    /// Removes the record at `kind`/`uid`.
    fn delete(&self, kind: &Kind, uid: &Uid) -> Result<()>;
    /// Fully decodes every stored object of `kind`.
    fn list(&self, kind: &Kind) -> Result<Vec<Box<dyn Object>>>;
    /// Decodes only the metadata of every stored object of `kind`.
    fn list_meta(&self, kind: &Kind) -> Result<Vec<ApiType>>;
    /// Number of stored objects of `kind`, always equal to `list(kind).len()`
    /// for an unmutated namespace.
    fn count(&self, kind: &Kind) -> Result<u64>;

    /// Resolves `filter` to exactly one object of `kind`.
    ///
    /// Zero matches and multiple matches are reported through the filter's own
    /// [`err_nonexistent`](Filter::err_nonexistent) and
    /// [`err_ambiguous`](Filter::err_ambiguous).
    fn find(&self, kind: &Kind, filter: &mut dyn Filter) -> Result<Box<dyn Object>> {
        let mut matches = self.find_all(kind, filter)?;
        match matches.len() {
            0 => Err(filter.err_nonexistent(kind)),
            1 => Ok(matches.remove(0)),
            _ => Err(filter.err_ambiguous(kind)),
        }
    }

    /// Returns every object of `kind` accepted by `filter`, in listing order.
    ///
    /// Metadata-only filters see [`ApiType`] projections instead of full objects.
    /// An error from the filter aborts the traversal.
    fn find_all(&self, kind: &Kind, filter: &mut dyn Filter) -> Result<Vec<Box<dyn Object>>> {
        let candidates: Vec<Box<dyn Object>> = if filter.meta_only() {
            self.list_meta(kind)?
                .into_iter()
                .map(|m| Box::new(m) as Box<dyn Object>)
                .collect()
        } else {
            self.list(kind)?
        };

        let mut matches = Vec::new();
        for candidate in candidates {
            if let Some(obj) = filter.filter(candidate)? {
                matches.push(obj);
            }
        }
        Ok(matches)
    }
}

/// Storage key addressing every object of `kind`.
pub fn key_for_kind(kind: &Kind) -> String {
    format!("/{}", kind)
}

/// Storage key of a single object.
pub fn key_for_id(kind: &Kind, uid: &Uid) -> String {
    format!("/{}/{}", kind, uid)
}

/// Whether `uid` can address exactly one entry directly below its kind.
pub fn is_storable_uid(uid: &Uid) -> bool {
    let uid = uid.as_str();
    !uid.is_empty() && uid != "." && uid != ".." && !uid.contains(['/', '\\'])
}

// No object can be stored under an unusable UID, so lookups report it as absent.
fn lookup_key(kind: &Kind, uid: &Uid) -> Result<String> {
    let key = key_for_id(kind, uid);
    if !is_storable_uid(uid) {
        return Err(Error::NotFound(key));
    }
    Ok(key)
}

/// [`Storage`] built from a [`RawStorage`] backend and a [`Serializer`].
#[derive(Clone)]
pub struct GenericStorage {
    raw: Arc<dyn RawStorage>,
    serializer: Serializer,
}

impl GenericStorage {
    /// Combines a byte backend with the serializer holding the application's scheme.
    pub fn new(raw: Arc<dyn RawStorage>, serializer: Serializer) -> Self {
        Self { raw, serializer }
    }

    /// The underlying byte backend.
    pub fn raw(&self) -> &dyn RawStorage {
        self.raw.as_ref()
    }

    /// The serializer used for every record.
    pub fn serializer(&self) -> &Serializer {
        &self.serializer
    }

    fn key_for_obj(&self, obj: &dyn Object) -> Result<String> {
        let type_meta = self.serializer.resolve_kind(obj)?;
        lookup_key(&type_meta.kind, obj.uid())
    }

    /// Calls `f` with the content of every existing record of `kind`.
    ///
    /// A listed key without content (a directory caught mid-write or mid-delete)
    /// is skipped; every other error aborts the walk.
    fn walk_kind<F>(&self, kind: &Kind, mut f: F) -> Result<()>
    where
        F: FnMut(Vec<u8>) -> Result<()>,
    {
        for key in self.raw.list(&key_for_kind(kind))? {
            if !self.raw.exists(&key) {
                debug!("skipping {}: no content", key);
                continue;
            }
            let content = match self.raw.read(&key) {
                Ok(content) => content,
                Err(Error::NotFound(_)) => {
                    debug!("skipping {}: removed while listing", key);
                    continue;
                }
                Err(e) => return Err(e),
            };
            f(content)?;
        }
        Ok(())
    }

    /// The `created` stamp of the record currently stored under `key`, if any.
    fn stored_created(&self, key: &str) -> Result<Option<Time>> {
        let content = match self.raw.read(key) {
            Ok(content) => content,
            Err(Error::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e),
        };
        let stored = self.serializer.decode_as::<ApiType>(&content)?;
        Ok(stored.metadata.created)
    }
}

impl Storage for GenericStorage {
    fn get(&self, obj: &mut dyn Object) -> Result<()> {
        let key = self.key_for_obj(obj)?;
        let content = self.raw.read(&key)?;
        self.serializer.decode_into(&content, obj)
    }

    fn set(&self, obj: &mut dyn Object) -> Result<()> {
        let type_meta = self.serializer.resolve_kind(obj)?;
        if !is_storable_uid(obj.uid()) {
            return Err(Error::Internal(format!(
                "cannot store {} object under UID {:?}",
                type_meta.kind,
                obj.uid().as_str()
            )));
        }
        let key = key_for_id(&type_meta.kind, obj.uid());

        let created = if self.raw.exists(&key) {
            self.stored_created(&key)?.or_else(|| obj.created())
        } else {
            None
        };
        obj.object_meta_mut().created = Some(created.unwrap_or_else(meta::timestamp));
        *obj.type_meta_mut() = type_meta;

        let content = self.serializer.encode_json(obj)?;
        self.raw.write(&key, &content)?;
        debug!("stored {}", key);
        Ok(())
    }

    fn get_by_id(&self, kind: &Kind, uid: &Uid) -> Result<Box<dyn Object>> {
        let content = self.raw.read(&lookup_key(kind, uid)?)?;
        self.serializer.decode(&content)
    }

    fn delete(&self, kind: &Kind, uid: &Uid) -> Result<()> {
        let key = lookup_key(kind, uid)?;
        self.raw.delete(&key)?;
        debug!("deleted {}", key);
        Ok(())
    }

    fn list(&self, kind: &Kind) -> Result<Vec<Box<dyn Object>>> {
        let mut result = Vec::new();
        self.walk_kind(kind, |content| {
            result.push(self.serializer.decode(&content)?);
            Ok(())
        })?;
        Ok(result)
    }

    fn list_meta(&self, kind: &Kind) -> Result<Vec<ApiType>> {
        let mut result = Vec::new();
        self.walk_kind(kind, |content| {
            result.push(self.serializer.decode_as::<ApiType>(&content)?);
            Ok(())
        })?;
        Ok(result)
    }

    fn count(&self, kind: &Kind) -> Result<u64> {
        let keys = self.raw.list(&key_for_kind(kind))?;
        Ok(keys.iter().filter(|key| self.raw.exists(key)).count() as u64)
    }
}
