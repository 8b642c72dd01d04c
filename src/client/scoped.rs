use std::marker::PhantomData;
use std::sync::Arc;

use crate::api::{Image, Kernel, Vm, KIND_IMAGE, KIND_KERNEL, KIND_VM};
use crate::engine::Storage;
use crate::filter::Filter;
use crate::meta::{ApiType, Kind, Object, Uid};
use crate::{Error, Result};

/// Entry point handed to orchestration code.
#[derive(Clone)]
pub struct Client {
    storage: Arc<dyn Storage>,
}

impl Client {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &dyn Storage {
        self.storage.as_ref()
    }

    pub fn vms(&self) -> KindClient<'_, Vm> {
        self.for_kind(KIND_VM)
    }

    pub fn kernels(&self) -> KindClient<'_, Kernel> {
        self.for_kind(KIND_KERNEL)
    }

    pub fn images(&self) -> KindClient<'_, Image> {
        self.for_kind(KIND_IMAGE)
    }

    /// Returns a client for `kind`, whose records must decode to `T`.
    pub fn for_kind<T>(&self, kind: impl Into<Kind>) -> KindClient<'_, T>
    where
        T: Object + Default,
    {
        KindClient {
            storage: self.storage.as_ref(),
            kind: kind.into(),
            _marker: PhantomData,
        }
    }
}

/// A scoped client pinning one kind and its record type.
pub struct KindClient<'a, T> {
    storage: &'a dyn Storage,
    kind: Kind,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T> KindClient<'a, T>
where
    T: Object + Default,
{
    /// The kind every call of this client is scoped to.
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Reads the object stored under `uid`.
    pub fn get(&self, uid: &Uid) -> Result<T> {
        let mut obj = T::default();
        obj.object_meta_mut().uid = uid.clone();
        self.storage.get(&mut obj)?;
        Ok(obj)
    }

    /// Saves `obj`, stamping `metadata.created` on its first write.
    pub fn set(&self, obj: &mut T) -> Result<()> {
        self.storage.set(obj)
    }

    /// Removes the object stored under `uid`.
    pub fn delete(&self, uid: &Uid) -> Result<()> {
        self.storage.delete(&self.kind, uid)
    }

    /// Every stored object of this kind.
    pub fn list(&self) -> Result<Vec<T>> {
        self.storage
            .list(&self.kind)?
            .into_iter()
            .map(|obj| self.resolve(obj))
            .collect()
    }

    /// Number of stored objects of this kind.
    pub fn count(&self) -> Result<u64> {
        self.storage.count(&self.kind)
    }

    /// Resolves `filter` to exactly one fully decoded object.
    pub fn find(&self, filter: &mut dyn Filter) -> Result<T> {
        let obj = self.storage.find(&self.kind, filter)?;
        self.resolve(obj)
    }

    /// Every object accepted by `filter`, fully decoded.
    pub fn find_all(&self, filter: &mut dyn Filter) -> Result<Vec<T>> {
        self.storage
            .find_all(&self.kind, filter)?
            .into_iter()
            .map(|obj| self.resolve(obj))
            .collect()
    }

    // Metadata-only matches come back as projections and are re-read in full.
    fn resolve(&self, obj: Box<dyn Object>) -> Result<T> {
        if obj.as_any().is::<ApiType>() {
            return self.get(obj.uid());
        }
        obj.into_any()
            .downcast::<T>()
            .map(|obj| *obj)
            .map_err(|_| Error::Internal(format!("{} record has an unexpected type", self.kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api;
    use crate::engine::{GenericStorage, MemoryRawStorage, Serializer};
    use crate::filter::IdNameFilter;

    fn client() -> Client {
        let storage = GenericStorage::new(
            Arc::new(MemoryRawStorage::new()),
            Serializer::new(api::scheme()),
        );
        Client::new(Arc::new(storage))
    }

    #[test]
    fn test_typed_round_trip() {
        let client = client();
        let mut vm = Vm::new("web");
        vm.spec.cpus = 2;
        client.vms().set(&mut vm).unwrap();

        let fetched = client.vms().get(&vm.metadata.uid).unwrap();
        assert_eq!(fetched, vm);
        assert_eq!(client.vms().count().unwrap(), 1);
        assert_eq!(client.kernels().count().unwrap(), 0);
    }

    #[test]
    fn test_find_returns_full_object() {
        let client = client();
        let mut vm = Vm::new("web");
        vm.spec.memory_mib = 1024;
        client.vms().set(&mut vm).unwrap();
        client.vms().set(&mut Vm::new("db")).unwrap();

        let found = client.vms().find(&mut IdNameFilter::new("we")).unwrap();
        assert_eq!(found.spec.memory_mib, 1024);
        assert_eq!(found.metadata.uid, vm.metadata.uid);

        let all = client.vms().find_all(&mut IdNameFilter::new("")).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_list_and_delete() {
        let client = client();
        let mut kernel = Kernel::new("5.10");
        client.kernels().set(&mut kernel).unwrap();

        assert_eq!(client.kernels().list().unwrap(), vec![kernel.clone()]);
        client.kernels().delete(&kernel.metadata.uid).unwrap();
        assert!(client.kernels().list().unwrap().is_empty());
        assert!(matches!(
            client.kernels().get(&kernel.metadata.uid),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_wrong_record_type_is_an_error() {
        let client = client();
        client.vms().set(&mut Vm::new("web")).unwrap();

        let images_over_vms = client.for_kind::<Image>(KIND_VM);
        assert!(matches!(images_over_vms.list(), Err(Error::Internal(_))));
    }
}
