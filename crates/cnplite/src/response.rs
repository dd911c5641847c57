//! Validated wrapper around one parsed endpoint response

use std::ops::Index;

use tracing::warn;

use crate::error::{Error, Result};
use crate::transport::RawResponse;
use crate::value::{Node, Value};
use crate::xml::XmlParser;

/// HTTP status of a delivered response
pub const SUCCESS_STATUS: u16 = 200;

/// `response` attribute of an approved response root
pub const SUCCESS_CODE: &str = "0";

static NULL: Value = Value::Null;

/// Response envelope.
///
/// Construction checks, in order: the HTTP status, that the body parses, that
/// the expected root element is present, and that the root reports success.
/// The first failing check is the error. When all pass, the value at the
/// requested path below the root is exposed.
#[derive(Clone, Debug, PartialEq)]
pub struct Response {
    status: u16,
    value: Value,
    error: Option<String>,
}

impl Response {
    /// Builds the envelope, failing with a server error on any check
    pub fn new<S: AsRef<str>>(
        raw: &RawResponse,
        path: &[S],
        root_key: &str,
        parser: &dyn XmlParser,
    ) -> Result<Self> {
        let root = validated_root(raw, root_key, parser)?;
        if let Some(message) = failure(&root) {
            return Err(Error::server(message));
        }
        Self::extract(raw.status, root, path)
    }

    /// Like [`Response::new`], but a declined response is kept instead of
    /// raised: [`Response::is_success`] is false, the message is available
    /// through [`Response::error_message`] and the value is the whole root.
    pub fn lenient<S: AsRef<str>>(
        raw: &RawResponse,
        path: &[S],
        root_key: &str,
        parser: &dyn XmlParser,
    ) -> Result<Self> {
        let root = validated_root(raw, root_key, parser)?;
        match failure(&root) {
            Some(message) => Ok(Self {
                status: raw.status,
                value: root,
                error: Some(message),
            }),
            None => Self::extract(raw.status, root, path),
        }
    }

    fn extract<S: AsRef<str>>(status: u16, root: Value, path: &[S]) -> Result<Self> {
        let value = if path.is_empty() {
            root
        } else {
            root.dig(path)?.cloned().unwrap_or_default()
        };
        Ok(Self {
            status,
            value,
            error: None,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    pub fn dig<S: AsRef<str>>(&self, path: &[S]) -> Result<Option<&Value>> {
        self.value.dig(path)
    }

    /// Entries of the exposed value when it is a node
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.value.as_node().into_iter().flat_map(Node::iter)
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl Index<&str> for Response {
    type Output = Value;

    fn index(&self, key: &str) -> &Value {
        self.get(key).unwrap_or(&NULL)
    }
}

fn validated_root(raw: &RawResponse, root_key: &str, parser: &dyn XmlParser) -> Result<Value> {
    if raw.status != SUCCESS_STATUS {
        warn!(status = raw.status, "unexpected http status");
        return Err(Error::server(format!(
            "server responded with {} instead of {SUCCESS_STATUS}",
            raw.status
        )));
    }

    let mut document = parser.parse(&raw.body)?;
    document.remove(root_key).ok_or_else(|| {
        warn!(root_key, "response root missing");
        Error::server(format!("missing root: {root_key}"))
    })
}

/// Message of a declined response, `None` when the root reports success
fn failure(root: &Value) -> Option<String> {
    let code = root.get("response").and_then(Value::as_text);
    if code == Some(SUCCESS_CODE) {
        return None;
    }

    let message = root
        .get("message")
        .and_then(Value::as_text)
        .map(str::to_owned)
        .unwrap_or_else(|| match code {
            Some(code) => format!("response code {code}"),
            None => "response code missing".to_owned(),
        });
    warn!(code, "response declined");
    Some(message)
}
