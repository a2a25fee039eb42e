//! Performance oriented JSON manipulation.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use serde_json_bytes::ByteString;
use serde_json_bytes::Map;
pub use serde_json_bytes::Value;

/// A JSON object.
pub type Object = Map<ByteString, Value>;

/// A path element inside a [`Path`].
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl PathElement {
    pub(crate) fn as_key(&self) -> Option<&str> {
        match self {
            PathElement::Key(key) => Some(key.as_str()),
            PathElement::Index(_) => None,
        }
    }

    pub(crate) fn as_index(&self) -> Option<usize> {
        match self {
            PathElement::Index(index) => Some(*index),
            PathElement::Key(_) => None,
        }
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{index}"),
            PathElement::Key(key) => f.write_str(key),
        }
    }
}

impl From<usize> for PathElement {
    fn from(index: usize) -> Self {
        PathElement::Index(index)
    }
}

impl From<&str> for PathElement {
    fn from(key: &str) -> Self {
        PathElement::Key(key.to_owned())
    }
}

impl From<String> for PathElement {
    fn from(key: String) -> Self {
        PathElement::Key(key)
    }
}

/// A path into the result document.
///
/// Error paths in GraphQL responses are made of field response keys and list
/// indexes, relative to the `data` root. The same representation serves as the
/// stable handle of a node inside a delegated result.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    /// The empty path, addressing the root of a result.
    pub fn empty() -> Path {
        Path(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }

    pub fn first(&self) -> Option<&PathElement> {
        self.0.first()
    }

    pub fn get(&self, index: usize) -> Option<&PathElement> {
        self.0.get(index)
    }

    pub fn push(&mut self, element: impl Into<PathElement>) {
        self.0.push(element.into())
    }

    /// Returns a new path with `element` appended.
    pub fn join(&self, element: impl Into<PathElement>) -> Path {
        let mut joined = self.clone();
        joined.push(element);
        joined
    }

    /// Returns the path without its first element.
    ///
    /// The empty path stays empty.
    pub fn strip_first(&self) -> Path {
        Path(self.0.iter().skip(1).cloned().collect())
    }

    /// Returns the rest of the path if it begins with `prefix`.
    pub fn strip_prefix(&self, prefix: &[PathElement]) -> Option<Path> {
        self.0
            .starts_with(prefix)
            .then(|| Path(self.0[prefix.len()..].to_vec()))
    }

    /// Returns `true` if the path is exactly one key equal to `key`.
    pub(crate) fn is_single_key(&self, key: &str) -> bool {
        self.0.len() == 1 && self.starts_with_key(key)
    }

    /// Returns `true` if the path begins with the key `key`.
    pub(crate) fn starts_with_key(&self, key: &str) -> bool {
        self.first().and_then(PathElement::as_key) == Some(key)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in self.iter() {
            write!(f, "/{element}")?;
        }
        Ok(())
    }
}

impl<T: Into<PathElement>> FromIterator<T> for Path {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Path(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Vec<PathElement>> for Path {
    fn from(elements: Vec<PathElement>) -> Self {
        Path(elements)
    }
}

impl From<&str> for Path {
    fn from(key: &str) -> Self {
        Path(vec![PathElement::from(key)])
    }
}

/// Extension trait for [`serde_json_bytes::Value`].
pub trait ValueExt {
    /// Get a reference to the value at `path`.
    ///
    /// Returns `None` as soon as a key is missing, an index is out of bounds,
    /// or the value at the current position cannot be descended into.
    fn get_path<'a>(&'a self, path: &Path) -> Option<&'a Value>;

    /// Descend through a sequence of object keys.
    fn get_keys<'a, 'k>(&'a self, keys: impl IntoIterator<Item = &'k str>) -> Option<&'a Value>;
}

impl ValueExt for Value {
    fn get_path<'a>(&'a self, path: &Path) -> Option<&'a Value> {
        path.iter().try_fold(self, |current, element| match element {
            PathElement::Key(key) => current.as_object()?.get(key.as_str()),
            PathElement::Index(index) => current.as_array()?.get(*index),
        })
    }

    fn get_keys<'a, 'k>(&'a self, keys: impl IntoIterator<Item = &'k str>) -> Option<&'a Value> {
        keys.into_iter()
            .try_fold(self, |current, key| current.as_object()?.get(key))
    }
}
