//! Canonical URI and query-string model.
//!
//! A `CanonicalUri` is an absolute resource path plus an optional query.
//! The path never carries query parameters; those live only in the
//! `QueryString`, an ordered map with unique, case-sensitive keys.
//!
//! An absent query and an empty query both mean "no filtering and no
//! envelope yet". The difference matters only to the owner of the URI: an
//! existing query may be merged into in place, an absent one has to be
//! supplied by building a new URI.

use std::fmt;

use indexmap::IndexMap;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::error::FilterError;

/// Everything except RFC 3986 unreserved characters is encoded.
const QUERY_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

// ---------------------------------------------------------------------------
// Query string
// ---------------------------------------------------------------------------

/// Ordered, multi-entry query parameter map.
///
/// Keys are unique. Insertion order is preserved and a `put` on an existing
/// key overwrites the value without moving the key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryString {
    params: IndexMap<String, String>,
}

impl QueryString {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Set `key` to `value`, returning the previous value if there was one.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.params.insert(key.into(), value.into())
    }

    /// Merge every entry of `other` into this query. Colliding keys take
    /// the value from `other`.
    pub fn put_all(&mut self, other: &QueryString) {
        for (key, value) in other.iter() {
            self.put(key, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse the `k1=v1&k2=v2` wire form. Keys and values are percent-decoded.
    /// A key with no `=` decodes to an empty value. Later duplicates win.
    pub fn parse(raw: &str) -> Result<Self, FilterError> {
        let mut query = Self::new();
        for pair in raw.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            query.put(decode(key)?, decode(value)?);
        }
        Ok(query)
    }
}

fn decode(part: &str) -> Result<String, FilterError> {
    percent_decode_str(part)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| FilterError::InvalidQueryString(e.to_string()))
}

impl fmt::Display for QueryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("&")?;
            }
            write!(
                f,
                "{}={}",
                utf8_percent_encode(key, QUERY_ENCODE_SET),
                utf8_percent_encode(value, QUERY_ENCODE_SET)
            )?;
        }
        Ok(())
    }
}

impl<K, V> FromIterator<(K, V)> for QueryString
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Self::new();
        for (key, value) in iter {
            query.put(key, value);
        }
        query
    }
}

// ---------------------------------------------------------------------------
// Canonical URI
// ---------------------------------------------------------------------------

/// A resource path plus its query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalUri {
    absolute_path: String,
    query: Option<QueryString>,
}

impl CanonicalUri {
    /// Build a URI from a bare path. A path carrying its own `?query` is
    /// rejected; use [`CanonicalUri::parse`] to split an href.
    pub fn new(
        absolute_path: impl Into<String>,
        query: Option<QueryString>,
    ) -> Result<Self, FilterError> {
        let absolute_path = absolute_path.into();
        if absolute_path.contains('?') {
            return Err(FilterError::InvalidUri(format!(
                "path carries a query: {absolute_path}"
            )));
        }
        Ok(Self {
            absolute_path,
            query,
        })
    }

    /// Split an href into path and query. No `?`, or nothing after it,
    /// yields an absent query.
    pub fn parse(href: &str) -> Result<Self, FilterError> {
        match href.split_once('?') {
            Some((path, raw)) if !raw.is_empty() => {
                Self::new(path, Some(QueryString::parse(raw)?))
            }
            Some((path, _)) => Self::new(path, None),
            None => Self::new(href, None),
        }
    }

    pub fn absolute_path(&self) -> &str {
        &self.absolute_path
    }

    pub fn query(&self) -> Option<&QueryString> {
        self.query.as_ref()
    }

    /// Mutable access to an existing query. There is nothing to mutate
    /// when the query is absent; use [`CanonicalUri::with_query`] instead.
    pub fn query_mut(&mut self) -> Option<&mut QueryString> {
        self.query.as_mut()
    }

    /// Returns true when there is no query or it has no entries.
    pub fn has_empty_query(&self) -> bool {
        self.query.as_ref().map_or(true, QueryString::is_empty)
    }

    /// Same path, new query.
    pub fn with_query(&self, query: QueryString) -> Self {
        Self {
            absolute_path: self.absolute_path.clone(),
            query: Some(query),
        }
    }
}

impl fmt::Display for CanonicalUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.absolute_path)?;
        match &self.query {
            Some(query) if !query.is_empty() => write!(f, "?{query}"),
            _ => Ok(()),
        }
    }
}
