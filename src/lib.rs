//! Fleet Store is the persistence and identity-resolution engine behind `fleetctl`.
//!
//! Objects (VMs, kernels, images) are stored as JSON records in a hierarchical
//! `/Kind/UID` key space. User-supplied short identifiers are resolved to exactly
//! one stored object, or to an error that explains why the query is ambiguous or
//! matches nothing.
//!
//! ## Core Components
//! - [`meta`]: The shared data model (kinds, UIDs, object metadata).
//! - [`engine`]: Raw byte storage, the type registry/serializer and the typed object store.
//! - [`filter`]: Pluggable predicates used by [`engine::Storage::find`].
//! - [`api`]: The concrete kinds managed by the fleet CLI.
//! - [`client`]: A typed, per-kind convenience layer over [`engine::Storage`].

pub mod api;
pub mod client;
pub mod engine;
pub mod filter;
pub mod meta;

use thiserror::Error;

use crate::meta::Kind;

/// Errors returned by the Fleet Store.
#[derive(Error, Debug)]
pub enum Error {
    /// No record is stored under the given key.
    #[error("key not found: {0}")]
    NotFound(String),
    /// The stored bytes could not be parsed into an object.
    #[error("malformed content: {0}")]
    MalformedContent(String),
    /// The type registry has no entry for the given apiVersion/kind.
    #[error("no type registered for {0}")]
    UnregisteredType(String),
    /// The type registry resolved a kind that carries no version.
    #[error("type for kind {0} is unversioned")]
    UnversionedType(String),
    /// A query matched more than one object.
    #[error("ambiguous {kind} query: {query:?} matched the following IDs/names: {}", .matches.join(", "))]
    AmbiguousQuery {
        kind: Kind,
        query: String,
        matches: Vec<String>,
    },
    /// A query matched no object.
    #[error("can't find {kind}: no ID/name matches for {query:?}")]
    NoMatch { kind: Kind, query: String },
    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
    /// An I/O error occurred in the raw storage backend.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error during JSON encoding.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A specialized Result type for Fleet Store operations.
pub type Result<T> = std::result::Result<T, Error>;

pub use client::{Client, KindClient};
pub use engine::{FileRawStorage, GenericStorage, MemoryRawStorage, RawStorage, Scheme, Serializer, Storage};
pub use filter::{AllFilter, Filter, IdNameFilter};
pub use meta::{ApiType, Object, ObjectMeta, TypeMeta, Uid};
