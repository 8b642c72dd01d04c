//! The data model shared by every part of the store.
//!
//! Every stored record carries a [`TypeMeta`] (apiVersion + kind) at its top level
//! and an [`ObjectMeta`] block under `metadata`. The [`Object`] trait erases the
//! concrete record type so the engine can store and decode any registered kind.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Timestamps stored in object metadata.
pub type Time = DateTime<Utc>;

/// Returns the current time truncated to whole seconds, as stored in records.
pub fn timestamp() -> Time {
    Utc::now().trunc_subsecs(0)
}

/// Type tag partitioning the object namespace (e.g. `VM`, `Kernel`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(String);

impl Kind {
    /// Wraps a kind name such as `VM`. Kinds are case-sensitive.
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Kind {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Kind {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Opaque identifier assigned once when an object is created.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Uid(String);

impl Uid {
    /// Wraps an existing UID verbatim; see [`Uid::random`] for new objects.
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    /// Generates a fresh 16 character hex UID.
    pub fn random() -> Self {
        let mut simple = uuid::Uuid::new_v4().simple().to_string();
        simple.truncate(16);
        Self(simple)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Uid {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Uid {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The apiVersion/kind discriminator embedded at the top of every record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeMeta {
    #[serde(rename = "apiVersion", default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Kind::is_empty")]
    pub kind: Kind,
}

impl TypeMeta {
    pub fn new(api_version: impl Into<String>, kind: impl Into<Kind>) -> Self {
        Self {
            api_version: api_version.into(),
            kind: kind.into(),
        }
    }
}

impl fmt::Display for TypeMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.api_version.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}, Kind={}", self.api_version, self.kind)
        }
    }
}

/// Identity and bookkeeping fields shared by all kinds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub uid: Uid,
    /// Set by the store on the first write of this UID, never changed afterwards.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Time>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// A stored record whose concrete type is known only to the type registry.
///
/// Implement it for a record struct with `type_meta` and `metadata` fields via
/// [`impl_object!`](crate::impl_object).
pub trait Object: fmt::Debug + Send + Sync + 'static {
    fn type_meta(&self) -> &TypeMeta;
    fn type_meta_mut(&mut self) -> &mut TypeMeta;
    fn object_meta(&self) -> &ObjectMeta;
    fn object_meta_mut(&mut self) -> &mut ObjectMeta;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Encodes the whole record as a JSON value.
    fn to_value(&self) -> serde_json::Result<serde_json::Value>;
    /// Replaces the record with the contents of `value`.
    fn load_value(&mut self, value: serde_json::Value) -> serde_json::Result<()>;

    fn kind(&self) -> &Kind {
        &self.type_meta().kind
    }

    fn uid(&self) -> &Uid {
        &self.object_meta().uid
    }

    fn name(&self) -> &str {
        &self.object_meta().name
    }

    fn created(&self) -> Option<Time> {
        self.object_meta().created
    }
}

/// Implements [`Object`] for structs that have `type_meta: TypeMeta` (flattened)
/// and `metadata: ObjectMeta` fields and derive serde's traits.
#[macro_export]
macro_rules! impl_object {
    ($($ty:ty),+ $(,)?) => {$(
        impl $crate::meta::Object for $ty {
            fn type_meta(&self) -> &$crate::meta::TypeMeta {
                &self.type_meta
            }
            fn type_meta_mut(&mut self) -> &mut $crate::meta::TypeMeta {
                &mut self.type_meta
            }
            fn object_meta(&self) -> &$crate::meta::ObjectMeta {
                &self.metadata
            }
            fn object_meta_mut(&mut self) -> &mut $crate::meta::ObjectMeta {
                &mut self.metadata
            }
            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
            fn to_value(&self) -> ::serde_json::Result<::serde_json::Value> {
                ::serde_json::to_value(self)
            }
            fn load_value(&mut self, value: ::serde_json::Value) -> ::serde_json::Result<()> {
                *self = ::serde_json::from_value(value)?;
                Ok(())
            }
        }
    )+};
}

/// Metadata projection of a stored record: everything but the kind-specific payload.
///
/// Unknown fields (`spec`, `status`, ...) are skipped when decoding, which is what
/// makes [`Storage::list_meta`](crate::engine::Storage::list_meta) cheap.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiType {
    #[serde(flatten)]
    pub type_meta: TypeMeta,
    #[serde(default)]
    pub metadata: ObjectMeta,
}

impl_object!(ApiType);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_random_uid_shape() {
        let uid = Uid::random();
        assert_eq!(uid.as_str().len(), 16);
        assert!(uid.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(uid, Uid::random());
    }

    #[test]
    fn test_api_type_ignores_payload() {
        let doc = json!({
            "apiVersion": "fleet.dev/v1alpha1",
            "kind": "VM",
            "metadata": { "name": "web", "uid": "abc123", "created": "2024-03-01T10:00:00Z" },
            "spec": { "cpus": 2 },
            "status": { "state": "Running" }
        });
        let projection: ApiType = serde_json::from_value(doc).unwrap();
        assert_eq!(projection.kind().as_str(), "VM");
        assert_eq!(projection.uid().as_str(), "abc123");
        assert_eq!(projection.name(), "web");
        assert_eq!(
            projection.created().unwrap().to_rfc3339(),
            "2024-03-01T10:00:00+00:00"
        );
    }

    #[test]
    fn test_empty_meta_fields_are_omitted() {
        let projection = ApiType {
            type_meta: TypeMeta::new("fleet.dev/v1alpha1", "Kernel"),
            metadata: ObjectMeta {
                name: "k".to_string(),
                uid: Uid::from("1"),
                ..Default::default()
            },
        };
        let value = projection.to_value().unwrap();
        assert_eq!(
            value,
            json!({
                "apiVersion": "fleet.dev/v1alpha1",
                "kind": "Kernel",
                "metadata": { "name": "k", "uid": "1" }
            })
        );
    }

    #[test]
    fn test_timestamp_has_no_subseconds() {
        assert_eq!(timestamp().timestamp_subsec_nanos(), 0);
    }
}
