use crate::filter::Filter;
use crate::meta::{Kind, Object};
use crate::{Error, Result};

/// Matches objects whose UID or name starts with a user-supplied prefix.
///
/// Matching is byte-wise and case-sensitive. The empty prefix matches every
/// object, and an exact match does not take precedence over longer matches.
#[derive(Debug)]
pub struct IdNameFilter {
    prefix: String,
    matches: Vec<String>,
    kind: Option<Kind>,
}

impl IdNameFilter {
    /// A fresh filter for one lookup of `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            matches: Vec::new(),
            kind: None,
        }
    }

    /// Every UID/name that matched so far, in the order encountered.
    pub fn matches(&self) -> &[String] {
        &self.matches
    }

    // Label errors with the kind actually inspected, if any.
    fn label(&self, searched: &Kind) -> Kind {
        match &self.kind {
            Some(kind) if !kind.is_empty() => kind.clone(),
            _ => searched.clone(),
        }
    }
}

impl Filter for IdNameFilter {
    fn filter(&mut self, object: Box<dyn Object>) -> Result<Option<Box<dyn Object>>> {
        if self.kind.is_none() {
            self.kind = Some(object.kind().clone());
        }

        let found = match_prefix(&self.prefix, [object.uid().as_str(), object.name()]);
        if found.is_empty() {
            return Ok(None);
        }
        self.matches.extend(found);
        Ok(Some(object))
    }

    fn meta_only(&self) -> bool {
        true
    }

    fn err_ambiguous(&self, kind: &Kind) -> Error {
        Error::AmbiguousQuery {
            kind: self.label(kind),
            query: self.prefix.clone(),
            matches: self.matches.clone(),
        }
    }

    fn err_nonexistent(&self, kind: &Kind) -> Error {
        Error::NoMatch {
            kind: self.label(kind),
            query: self.prefix.clone(),
        }
    }
}

/// Returns the candidates that start with `prefix`, in order.
pub fn match_prefix<'a>(prefix: &str, candidates: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    candidates
        .into_iter()
        .filter(|c| c.starts_with(prefix))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{ApiType, TypeMeta, Uid};

    fn candidate(uid: &str, name: &str) -> Box<dyn Object> {
        let mut obj = ApiType {
            type_meta: TypeMeta::new("fleet.dev/v1alpha1", "VM"),
            ..Default::default()
        };
        obj.metadata.uid = Uid::from(uid);
        obj.metadata.name = name.to_string();
        Box::new(obj)
    }

    #[test]
    fn test_match_prefix() {
        assert_eq!(match_prefix("ab", ["abc", "xab", "ab"]), vec!["abc", "ab"]);
        assert_eq!(match_prefix("", ["a", "b"]), vec!["a", "b"]);
        assert!(match_prefix("AB", ["abc"]).is_empty());
    }

    #[test]
    fn test_filter_records_matches_in_order() {
        let mut filter = IdNameFilter::new("ab");
        assert!(filter.filter(candidate("abc123", "web")).unwrap().is_some());
        assert!(filter.filter(candidate("zzz", "db")).unwrap().is_none());
        assert!(filter.filter(candidate("abd456", "abacus")).unwrap().is_some());

        assert_eq!(filter.matches(), ["abc123", "abd456", "abacus"]);
    }

    #[test]
    fn test_ambiguous_error_text() {
        let mut filter = IdNameFilter::new("ab");
        filter.filter(candidate("abc123", "web")).unwrap();
        filter.filter(candidate("abd456", "db")).unwrap();

        let err = filter.err_ambiguous(&Kind::from("VM"));
        assert_eq!(
            err.to_string(),
            "ambiguous VM query: \"ab\" matched the following IDs/names: abc123, abd456"
        );
    }

    #[test]
    fn test_nonexistent_error_uses_searched_kind_when_empty() {
        let filter = IdNameFilter::new("zz");
        let err = filter.err_nonexistent(&Kind::from("Kernel"));
        assert_eq!(err.to_string(), "can't find Kernel: no ID/name matches for \"zz\"");
    }

    #[test]
    fn test_exact_match_is_still_ambiguous() {
        let mut filter = IdNameFilter::new("web");
        filter.filter(candidate("1", "web")).unwrap();
        filter.filter(candidate("2", "web2")).unwrap();
        assert!(matches!(
            filter.err_ambiguous(&Kind::from("VM")),
            Error::AmbiguousQuery { matches, .. } if matches == vec!["web", "web2"]
        ));
    }
}
