//! Predicates used to resolve user queries against stored objects.
//!
//! [`Storage::find`](crate::engine::Storage::find) feeds every candidate of a kind
//! to a [`Filter`], then asks the filter itself to describe the failure when the
//! query matched nothing or more than one object.

pub mod idname;

pub use idname::{match_prefix, IdNameFilter};

use crate::meta::{Kind, Object};
use crate::{Error, Result};

/// A stateful per-object predicate plus the errors it reports on failed resolution.
///
/// Filters accumulate state while inspecting candidates; use a fresh filter for
/// every lookup.
pub trait Filter {
    /// Inspects one candidate.
    ///
    /// Returns `Ok(Some(obj))` to select it, `Ok(None)` to skip it, and `Err` to
    /// abort the whole lookup.
    fn filter(&mut self, object: Box<dyn Object>) -> Result<Option<Box<dyn Object>>>;

    /// Whether the metadata projection is enough to decide a match.
    fn meta_only(&self) -> bool {
        false
    }

    /// Error for a lookup of `kind` that matched more than one object.
    fn err_ambiguous(&self, kind: &Kind) -> Error;

    /// Error for a lookup of `kind` that matched nothing.
    fn err_nonexistent(&self, kind: &Kind) -> Error;
}

/// Selects every object. Resolving it with `find` succeeds only when exactly one
/// object of the kind is stored.
#[derive(Debug, Default)]
pub struct AllFilter {
    uids: Vec<String>,
}

impl AllFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Filter for AllFilter {
    fn filter(&mut self, object: Box<dyn Object>) -> Result<Option<Box<dyn Object>>> {
        self.uids.push(object.uid().to_string());
        Ok(Some(object))
    }

    fn meta_only(&self) -> bool {
        true
    }

    fn err_ambiguous(&self, kind: &Kind) -> Error {
        Error::AmbiguousQuery {
            kind: kind.clone(),
            query: String::new(),
            matches: self.uids.clone(),
        }
    }

    fn err_nonexistent(&self, kind: &Kind) -> Error {
        Error::NoMatch {
            kind: kind.clone(),
            query: String::new(),
        }
    }
}
