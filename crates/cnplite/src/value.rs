//! Structured documents flowing into and out of the XML codec
//!
//! A document is a tree of [`Value`]s. Elements collapse into a [`Node`]
//! (attributes and children share one key space), repeated siblings fold into a
//! [`Sequence`], and terminal text is a [`Scalar`] leaf.

use indexmap::map::{IntoIter, Iter, Keys, Values};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::fmt;
use std::ops::Index;
use time::Date;

use crate::coerce;
use crate::error::{Error, Result};

/// Terminal value of a document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scalar {
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Date(Date),
    /// Caller-defined kind, rendered through a coercion registered for `tag`
    Custom { tag: String, value: String },
}

impl Scalar {
    pub fn custom(tag: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Custom {
            tag: tag.into(),
            value: value.into(),
        }
    }

    /// Returns the text if this scalar came straight from a parser
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the scalar through the process-wide coercion registry
    pub fn render(&self) -> String {
        coerce::render(self)
    }
}

/// Default string conversion, used when no coercion is registered
impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(d) => write!(f, "{d}"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Date(d) => write!(
                f,
                "{:04}-{:02}-{:02}",
                d.year(),
                u8::from(d.month()),
                d.day()
            ),
            Self::Custom { value, .. } => f.write_str(value),
        }
    }
}

/// A node of a structured document
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value; skipped entirely on serialization
    #[default]
    Null,
    Leaf(Scalar),
    Node(Node),
    Sequence(Sequence),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    pub fn is_node(&self) -> bool {
        matches!(self, Self::Node(_))
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(_))
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Leaf(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the leaf text, for values produced by a parser
    pub fn as_text(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_text)
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Self::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_node_mut(&mut self) -> Option<&mut Node> {
        match self {
            Self::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&Sequence> {
        match self {
            Self::Sequence(s) => Some(s),
            _ => None,
        }
    }

    /// Looks up `key` when this value is a node
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_node().and_then(|n| n.get(key))
    }

    /// Walks `path` one key at a time.
    ///
    /// A node is indexed by key and a sequence by a numeric key. Walking
    /// through a missing key or a null yields `Ok(None)`. Indexing a leaf, or
    /// a sequence with a non-numeric key, is a type error.
    pub fn dig<S: AsRef<str>>(&self, path: &[S]) -> Result<Option<&Self>> {
        let mut current = self;
        for key in path {
            let key = key.as_ref();
            let next = match current {
                Self::Null => return Ok(None),
                Self::Node(node) => node.get(key),
                Self::Sequence(seq) => {
                    let index = key.parse::<usize>().map_err(|_| {
                        Error::type_error(format!(
                            "sequence cannot be indexed by non-numeric key `{key}`"
                        ))
                    })?;
                    seq.get(index)
                }
                Self::Leaf(_) => {
                    return Err(Error::type_error(format!(
                        "leaf value cannot be indexed by `{key}`"
                    )));
                }
            };
            match next {
                Some(value) => current = value,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Self::Leaf(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Leaf(Scalar::Text(value.to_owned()))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Leaf(Scalar::Text(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Leaf(Scalar::Integer(value))
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Leaf(Scalar::Integer(i64::from(value)))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Leaf(Scalar::Integer(i64::from(value)))
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Leaf(Scalar::Boolean(value))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Self::Leaf(Scalar::Decimal(value))
    }
}

impl From<Date> for Value {
    fn from(value: Date) -> Self {
        Self::Leaf(Scalar::Date(value))
    }
}

impl From<Node> for Value {
    fn from(value: Node) -> Self {
        Self::Node(value)
    }
}

impl From<Sequence> for Value {
    fn from(value: Sequence) -> Self {
        Self::Sequence(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::Sequence(Sequence(values))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// An element's attributes and children, keyed by name in insertion order.
///
/// Equality ignores key order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Node(pub(crate) IndexMap<String, Value>);

impl Node {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self(IndexMap::with_capacity(capacity))
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Inserts a key-value pair, replacing (in place) any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Inserts only when `key` is not present yet
    pub fn insert_default(&mut self, key: &str, value: impl Into<Value>) {
        if !self.0.contains_key(key) {
            self.0.insert(key.to_owned(), value.into());
        }
    }

    /// Replaces the key `from` with `to`, keeping its position
    pub fn rename(&mut self, from: &str, to: &str) {
        if let Some((mut index, _, value)) = self.0.shift_remove_full(from) {
            if let Some((existing, _, _)) = self.0.shift_remove_full(to) {
                if existing < index {
                    index -= 1;
                }
            }
            self.0.shift_insert(index, to.to_owned(), value);
        }
    }

    /// Adds a sibling occurrence of `key`.
    ///
    /// The first occurrence is stored bare, the second promotes the stored
    /// value into a two-item sequence, and later ones append to it.
    pub fn push(&mut self, key: String, value: Value) {
        match self.0.get_mut(&key) {
            None => {
                self.0.insert(key, value);
            }
            Some(Value::Sequence(seq)) => seq.push(value),
            Some(existing) => {
                let first = std::mem::take(existing);
                *existing = Value::Sequence(Sequence(vec![first, value]));
            }
        }
    }

    /// Merges `other` into this node; entries of `other` win on collision
    pub fn merge(&mut self, other: Self) {
        self.0.extend(other.0);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> Keys<'_, String, Value> {
        self.0.keys()
    }

    pub fn values(&self) -> Values<'_, String, Value> {
        self.0.values()
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> indexmap::map::IterMut<'_, String, Value> {
        self.0.iter_mut()
    }
}

static NULL: Value = Value::Null;

impl Index<&str> for Node {
    type Output = Value;

    /// Missing keys index to [`Value::Null`]
    fn index(&self, key: &str) -> &Self::Output {
        self.0.get(key).unwrap_or(&NULL)
    }
}

impl Index<&str> for Value {
    type Output = Self;

    /// Anything but a node holding `key` indexes to [`Value::Null`]
    fn index(&self, key: &str) -> &Self::Output {
        self.get(key).unwrap_or(&NULL)
    }
}

impl<'a> IntoIterator for &'a Node {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Node {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Node {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Repeated sibling values sharing one key, in document order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sequence(pub(crate) Vec<Value>);

impl Sequence {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Value> {
        self.0.iter_mut()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Sequence {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<V: Into<Value>> FromIterator<V> for Sequence {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[cfg(feature = "serde")]
mod ser {
    use super::{Node, Scalar, Sequence, Value};
    use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

    impl Serialize for Scalar {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.render())
        }
    }

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self {
                Self::Null => serializer.serialize_unit(),
                Self::Leaf(scalar) => scalar.serialize(serializer),
                Self::Node(node) => node.serialize(serializer),
                Self::Sequence(seq) => seq.serialize(serializer),
            }
        }
    }

    impl Serialize for Node {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut map = serializer.serialize_map(Some(self.len()))?;
            for (key, value) in self {
                map.serialize_entry(key, value)?;
            }
            map.end()
        }
    }

    impl Serialize for Sequence {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            let mut seq = serializer.serialize_seq(Some(self.len()))?;
            for value in self {
                seq.serialize_element(value)?;
            }
            seq.end()
        }
    }
}
