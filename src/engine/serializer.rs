use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::meta::{Kind, Object, TypeMeta};
use crate::{Error, Result};

type Factory = Box<dyn Fn() -> Box<dyn Object> + Send + Sync>;

/// Type registry mapping apiVersion/kind pairs to concrete record types.
///
/// The registry is assembled by the application and handed to the
/// [`Serializer`]; the engine never registers types itself.
#[derive(Default)]
pub struct Scheme {
    types: HashMap<TypeId, TypeMeta>,
    factories: HashMap<TypeMeta, Factory>,
}

impl Scheme {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `api_version` and `kind`.
    pub fn register<T>(&mut self, api_version: &str, kind: &str) -> &mut Self
    where
        T: Object + Default,
    {
        let type_meta = TypeMeta::new(api_version, kind);
        self.types.insert(TypeId::of::<T>(), type_meta.clone());
        let factory: Factory = Box::new(|| Box::new(T::default()) as Box<dyn Object>);
        self.factories.insert(type_meta, factory);
        self
    }

    /// Registers `T` without version information. Such types can be listed in the
    /// registry but never resolved for storage.
    pub fn register_unversioned<T>(&mut self, kind: &str) -> &mut Self
    where
        T: Object + Default,
    {
        self.register::<T>("", kind)
    }

    /// Resolves the apiVersion/kind registered for the concrete type of `obj`.
    pub fn object_kind(&self, obj: &dyn Object) -> Result<TypeMeta> {
        let type_meta = self
            .types
            .get(&obj.as_any().type_id())
            .ok_or_else(|| Error::UnregisteredType(format!("{:?}", obj.type_meta())))?;
        if type_meta.api_version.is_empty() {
            return Err(Error::UnversionedType(type_meta.kind.to_string()));
        }
        Ok(type_meta.clone())
    }

    /// Returns an empty object of the type registered for `type_meta`.
    pub fn new_object(&self, type_meta: &TypeMeta) -> Result<Box<dyn Object>> {
        if type_meta.api_version.is_empty() && self.is_unversioned(&type_meta.kind) {
            return Err(Error::UnversionedType(type_meta.kind.to_string()));
        }
        match self.factories.get(type_meta) {
            Some(factory) => Ok(factory()),
            None => Err(Error::UnregisteredType(type_meta.to_string())),
        }
    }

    /// All kinds with a versioned registration, sorted.
    pub fn kinds(&self) -> Vec<Kind> {
        let mut kinds: Vec<Kind> = self
            .factories
            .keys()
            .filter(|tm| !tm.api_version.is_empty())
            .map(|tm| tm.kind.clone())
            .collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    fn is_unversioned(&self, kind: &Kind) -> bool {
        self.factories
            .contains_key(&TypeMeta::new("", kind.clone()))
    }
}

impl fmt::Debug for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheme")
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Encodes objects to JSON and decodes JSON or YAML records back into typed objects.
#[derive(Clone, Debug)]
pub struct Serializer {
    scheme: Arc<Scheme>,
}

impl Serializer {
    pub fn new(scheme: Scheme) -> Self {
        Self {
            scheme: Arc::new(scheme),
        }
    }

    pub fn scheme(&self) -> &Scheme {
        &self.scheme
    }

    /// Resolves the apiVersion/kind of an in-memory object through the registry.
    pub fn resolve_kind(&self, obj: &dyn Object) -> Result<TypeMeta> {
        self.scheme.object_kind(obj)
    }

    /// Decodes a record, picking its concrete type from the embedded apiVersion/kind.
    pub fn decode(&self, content: &[u8]) -> Result<Box<dyn Object>> {
        let value = parse(content)?;
        let type_meta = type_meta_of(&value)?;
        let mut obj = self.scheme.new_object(&type_meta)?;
        obj.load_value(value)
            .map_err(|e| Error::MalformedContent(format!("{}: {}", type_meta, e)))?;
        Ok(obj)
    }

    /// Decodes a record into an object whose concrete type is already known.
    pub fn decode_into(&self, content: &[u8], obj: &mut dyn Object) -> Result<()> {
        let value = parse(content)?;
        obj.load_value(value)
            .map_err(|e| Error::MalformedContent(e.to_string()))
    }

    /// Decodes any record into `T`, bypassing the registry.
    ///
    /// Used for the metadata projection, where unknown fields are skipped.
    pub fn decode_as<T: serde::de::DeserializeOwned>(&self, content: &[u8]) -> Result<T> {
        serde_yaml::from_slice(content).map_err(|e| Error::MalformedContent(e.to_string()))
    }

    /// Encodes `obj` as pretty-printed JSON.
    pub fn encode_json(&self, obj: &dyn Object) -> Result<Vec<u8>> {
        let value = obj.to_value()?;
        Ok(serde_json::to_vec_pretty(&value)?)
    }
}

// The YAML grammar is a superset of JSON, so both record styles parse here.
fn parse(content: &[u8]) -> Result<serde_json::Value> {
    let value: serde_json::Value =
        serde_yaml::from_slice(content).map_err(|e| Error::MalformedContent(e.to_string()))?;
    if !value.is_object() {
        return Err(Error::MalformedContent("record is not a mapping".to_string()));
    }
    Ok(value)
}

fn type_meta_of(value: &serde_json::Value) -> Result<TypeMeta> {
    let field = |name: &str| value.get(name).and_then(|v| v.as_str()).unwrap_or_default();
    let kind = field("kind");
    if kind.is_empty() {
        return Err(Error::MalformedContent("object 'kind' is missing".to_string()));
    }
    Ok(TypeMeta::new(field("apiVersion"), kind))
}
