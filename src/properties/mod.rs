//! Per-call option sets.
//!
//! A virtual-graph call is configured by inline `key=value` parameters in
//! the service address and by `(fx:properties, key, value)` triples in the
//! service body. Both are merged by the [`PropertyResolver`] into one
//! normalized [`OptionSet`].

use crate::error::{FacadeError, Result};
use regex::Regex;
use std::collections::BTreeMap;

pub mod address;
pub mod resolver;

pub use address::{AddressParser, ServiceAddress};
pub use resolver::{PropertyAssertion, PropertyResolver, Resolution};

/// Well-known option keys.
pub mod keys {
    pub const LOCATION: &str = "location";
    pub const CONTENT: &str = "content";
    pub const FROM_ARCHIVE: &str = "from-archive";
    pub const MEDIA_TYPE: &str = "media-type";
    pub const TRIPLIFIER: &str = "triplifier";
    pub const NAMESPACE: &str = "namespace";
    pub const ROOT: &str = "root";
    pub const BLANK_NODES: &str = "blank-nodes";
    pub const USE_RDFS_MEMBER: &str = "use-rdfs-member";
    pub const AUDIT: &str = "audit";
    pub const HTTP_HEADER_PREFIX: &str = "http.header.";
}

/// Normalized option set of one call.
///
/// Keys are kept sorted so that equal sets compare and hash equal no matter
/// in which order their entries were supplied. Values are opaque strings
/// interpreted only by the component that reads them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OptionSet {
    values: BTreeMap<String, String>,
}

impl OptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key`, returning the value it replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.values.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries whose key starts with `prefix`, with the prefix stripped.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter().filter_map(move |(k, v)| k.strip_prefix(prefix).map(|rest| (rest, v)))
    }

    pub fn location(&self) -> Option<&str> {
        self.get(keys::LOCATION)
    }

    pub fn content(&self) -> Option<&str> {
        self.get(keys::CONTENT)
    }

    pub fn from_archive(&self) -> Option<&str> {
        self.get(keys::FROM_ARCHIVE)
    }

    pub fn media_type(&self) -> Option<&str> {
        self.get(keys::MEDIA_TYPE)
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) if value.eq_ignore_ascii_case("true") => Ok(Some(true)),
            Some(value) if value.eq_ignore_ascii_case("false") => Ok(Some(false)),
            Some(value) => Err(invalid(key, format!("expected true or false, got '{value}'"))),
        }
    }

    /// A single character option. `\t` is accepted for a tab.
    pub fn get_char(&self, key: &str) -> Result<Option<char>> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        if value == "\\t" {
            return Ok(Some('\t'));
        }
        let mut chars = value.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(Some(c)),
            _ => Err(invalid(key, format!("expected a single character, got '{value}'"))),
        }
    }

    pub fn get_regex(&self, key: &str) -> Result<Option<Regex>> {
        self.get(key)
            .map(|pattern| Regex::new(pattern).map_err(|e| invalid(key, e.to_string())))
            .transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut options = OptionSet::new();
        for (key, value) in iter {
            options.insert(key, value);
        }
        options
    }
}

fn invalid(key: &str, reason: String) -> FacadeError {
    FacadeError::InvalidOption { key: key.to_string(), reason }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_does_not_matter() {
        let a: OptionSet = [("location", "a.csv"), ("csv.headers", "true")].into_iter().collect();
        let b: OptionSet = [("csv.headers", "true"), ("location", "a.csv")].into_iter().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_typed_getters() {
        let options: OptionSet =
            [("csv.headers", "TRUE"), ("csv.delimiter", "\\t"), ("blank-nodes", "maybe")]
                .into_iter()
                .collect();
        assert_eq!(options.get_bool("csv.headers").unwrap(), Some(true));
        assert_eq!(options.get_char("csv.delimiter").unwrap(), Some('\t'));
        assert_eq!(options.get_bool("missing").unwrap(), None);
        assert!(matches!(
            options.get_bool("blank-nodes"),
            Err(FacadeError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_prefix_iteration() {
        let options: OptionSet =
            [("http.header.Accept", "text/csv"), ("location", "x")].into_iter().collect();
        let headers: Vec<_> = options.with_prefix(keys::HTTP_HEADER_PREFIX).collect();
        assert_eq!(headers, vec![("Accept", "text/csv")]);
    }
}
