//! Store Paths
//!
//! A [`Path`] is the sequence of keys leading from a store's root to one of its
//! values. Object keys and array indices are both stored as strings; an index
//! segment is simply the decimal form of the index.
//!
//! Paths are compared structurally. For subscription bookkeeping they are also
//! turned into an [`EncodedPath`], a single string in which every segment is
//! percent-encoded and prefixed with `/`. The root encodes to the empty string,
//! so the root and a path made of one empty key never collide.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use smallvec::SmallVec;

use crate::error::{ReactiveError, Result};

/// A key sequence into a store value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(SmallVec<[String; 4]>);

impl Path {
    /// The empty path, pointing at the store root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// This path extended by an object key.
    pub fn child(&self, key: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.0.push(key.into());
        next
    }

    /// This path extended by an array index.
    pub fn index(&self, index: usize) -> Self {
        self.child(index.to_string())
    }

    /// This path extended by every segment of `other`.
    pub fn join(&self, other: &Path) -> Self {
        let mut next = self.clone();
        next.0.extend(other.0.iter().cloned());
        next
    }

    /// Split off the last segment, returning it with the parent path.
    pub fn split_last(&self) -> Option<(&str, Path)> {
        let (last, parent) = self.0.split_last()?;
        Some((last.as_str(), Path::from_segments(parent.iter().cloned())))
    }

    /// Whether `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &Path) -> bool {
        other.0.starts_with(&self.0)
    }

    /// The bookkeeping form of this path.
    pub fn encode(&self) -> EncodedPath {
        let mut encoded = String::new();
        for segment in &self.0 {
            encoded.push('/');
            encoded.push_str(&urlencoding::encode(segment));
        }
        EncodedPath(encoded)
    }

    /// Walk the path against `root`. Returns `None` if any segment is missing
    /// or traverses a scalar.
    pub fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.0.iter().try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => parse_index(segment).and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Mutable counterpart of [`resolve`](Self::resolve).
    pub fn resolve_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        self.0.iter().try_fold(root, |value, segment| match value {
            Value::Object(map) => map.get_mut(segment),
            Value::Array(items) => parse_index(segment).and_then(|i| items.get_mut(i)),
            _ => None,
        })
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for Path {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_segments(iter)
    }
}

/// Parse an array index segment. Leading zeros and signs are rejected so
/// every index has exactly one spelling.
pub(crate) fn parse_index(segment: &str) -> Option<usize> {
    if segment.is_empty()
        || (segment.len() > 1 && segment.starts_with('0'))
        || !segment.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    segment.parse().ok()
}

/// Percent-encoded, `/`-separated form of a [`Path`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedPath(String);

impl EncodedPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn decode(&self) -> Result<Path> {
        if self.0.is_empty() {
            return Ok(Path::root());
        }
        let body = self.0.strip_prefix('/').ok_or_else(|| {
            ReactiveError::InvalidChange(format!("encoded path `{}` lacks a leading `/`", self.0))
        })?;
        body.split('/')
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|s| s.into_owned())
                    .map_err(|_| {
                        ReactiveError::InvalidChange(format!(
                            "segment `{segment}` is not valid percent-encoded UTF-8"
                        ))
                    })
            })
            .collect::<Result<SmallVec<_>>>()
            .map(Path)
    }
}

impl fmt::Display for EncodedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn builders_and_prefixes() {
        let friends = Path::root().child("friends");
        let id = friends.index(0).child("id");

        assert_eq!(id.segments(), ["friends", "0", "id"]);
        assert!(Path::root().is_prefix_of(&id));
        assert!(friends.is_prefix_of(&id));
        assert!(id.is_prefix_of(&id));
        assert!(!id.is_prefix_of(&friends));
        assert!(!Path::from_segments(["friend"]).is_prefix_of(&id));
        assert_eq!(friends.join(&Path::from_segments(["0", "id"])), id);
    }

    #[test]
    fn split_last() {
        let path = Path::from_segments(["a", "b"]);
        let (last, parent) = path.split_last().unwrap();
        assert_eq!(last, "b");
        assert_eq!(parent, Path::from_segments(["a"]));
        assert!(Path::root().split_last().is_none());
    }

    #[test]
    fn encoding_escapes_separators() {
        let path = Path::from_segments(["a/b", "c d", "0"]);
        let encoded = path.encode();
        assert_eq!(encoded.as_str(), "/a%2Fb/c%20d/0");
        assert_eq!(encoded.decode().unwrap(), path);
    }

    #[test]
    fn root_and_empty_key_are_distinct() {
        let root = Path::root().encode();
        let empty_key = Path::from_segments([""]).encode();

        assert_eq!(root.as_str(), "");
        assert_ne!(root, empty_key);
        assert_eq!(root.decode().unwrap(), Path::root());
        assert_eq!(empty_key.decode().unwrap(), Path::from_segments([""]));
    }

    #[test]
    fn resolve_against_values() {
        let value = json!({"list": [1, 2, 3], "friends": [{"id": "2"}]});

        let id = Path::from_segments(["friends", "0", "id"]);
        assert_eq!(id.resolve(&value), Some(&json!("2")));
        assert_eq!(Path::root().resolve(&value), Some(&value));
        assert_eq!(Path::from_segments(["list", "5"]).resolve(&value), None);
        assert_eq!(Path::from_segments(["list", "01"]).resolve(&value), None);
        assert_eq!(Path::from_segments(["list", "0", "x"]).resolve(&value), None);
    }

    #[test]
    fn resolve_mut_writes_through() {
        let mut value = json!({"a": {"b": 1}});
        *Path::from_segments(["a", "b"]).resolve_mut(&mut value).unwrap() = json!(2);
        assert_eq!(value, json!({"a": {"b": 2}}));
    }

    #[test]
    fn index_parsing() {
        assert_eq!(parse_index("0"), Some(0));
        assert_eq!(parse_index("42"), Some(42));
        assert_eq!(parse_index("007"), None);
        assert_eq!(parse_index("-1"), None);
        assert_eq!(parse_index("+1"), None);
        assert_eq!(parse_index(""), None);
    }

    #[test]
    fn display() {
        assert_eq!(Path::root().to_string(), "<root>");
        assert_eq!(Path::from_segments(["a", "0"]).to_string(), "a/0");
    }
}
