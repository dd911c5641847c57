//! Attribute-vs-element placement

use std::collections::HashSet;

use crate::error::{Error, Result};

/// Keys written as attributes unless a serializer is given its own policy
pub const DEFAULT_ATTRIBUTES: &[&str] = &[
    "customerId",
    "id",
    "merchantId",
    "reportGroup",
    "version",
    "xmlns",
];

/// Set of mapping keys serialized as attributes of the current element
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributePolicy {
    keys: HashSet<String>,
}

impl AttributePolicy {
    /// Builds a policy; every key must be a legal XML attribute name
    pub fn new<I, S>(keys: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys = keys
            .into_iter()
            .map(Into::into)
            .map(|key| {
                if is_xml_name(&key) {
                    Ok(key)
                } else {
                    Err(Error::config(format!("invalid attribute key `{key}`")))
                }
            })
            .collect::<Result<HashSet<_>>>()?;
        Ok(Self { keys })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl Default for AttributePolicy {
    fn default() -> Self {
        Self {
            keys: DEFAULT_ATTRIBUTES.iter().map(|k| (*k).to_owned()).collect(),
        }
    }
}

pub(crate) fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

pub(crate) fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}

/// Whether `name` can be used as an element or attribute name
pub(crate) fn is_xml_name(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if is_name_start(first) => bytes.all(is_name_char),
        _ => false,
    }
}
