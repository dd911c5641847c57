//! XML-to-document folding shared by every backend

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt::Debug;

use crate::error::{Error, Result};
use crate::value::{Node, Scalar, Value};

/// Turns an XML document into a structured document
pub trait XmlParser: Debug + Send + Sync {
    /// Parses `xml` into a node holding a single entry: the root element's
    /// name mapped to its value.
    fn parse(&self, xml: &str) -> Result<Node>;
}

/// Collects one element while a backend walks its tree.
///
/// An element without attributes and child elements becomes a text leaf;
/// anything else becomes a node of its attributes merged with its folded
/// children. Children win over attributes of the same name.
#[derive(Debug, Default)]
pub(crate) struct ElementBuilder {
    attributes: Node,
    children: Node,
    has_children: bool,
    text: String,
}

impl ElementBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(name.into(), Value::from(value.into()));
    }

    pub(crate) fn child(&mut self, name: impl Into<String>, value: Value) {
        self.has_children = true;
        self.children.push(name.into(), value);
    }

    pub(crate) fn text(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub(crate) fn finish(self) -> Value {
        if self.attributes.is_empty() && !self.has_children {
            return Value::Leaf(Scalar::Text(self.text.trim().to_owned()));
        }
        let mut node = self.attributes;
        node.merge(self.children);
        Value::Node(node)
    }
}

/// Namespace declaration attribute that binds the reserved `xml` prefix
const XML_PREFIX_DECLARATION: &str = "xmlns:xml";

/// Whether an attribute name declares a namespace
pub(crate) fn is_declaration(key: &str) -> bool {
    key == "xmlns" || key.starts_with("xmlns:")
}

/// Namespace bindings in scope while a backend walks an element tree.
///
/// A declaration that binds a prefix to the URI an ancestor already bound it
/// to does not change the scope and is not reported.
#[derive(Debug, Default)]
pub(crate) struct NamespaceScope {
    frames: Vec<Vec<(String, String)>>,
}

impl NamespaceScope {
    pub(crate) fn open(&mut self) {
        self.frames.push(Vec::new());
    }

    /// Records `key="uri"` on the innermost open element; false when the
    /// declaration is redundant
    pub(crate) fn declare(&mut self, key: &str, uri: &str) -> bool {
        let redundant = key == XML_PREFIX_DECLARATION || self.lookup(key) == Some(uri);
        if let Some(frame) = self.frames.last_mut() {
            frame.push((key.to_owned(), uri.to_owned()));
        }
        !redundant
    }

    pub(crate) fn close(&mut self) {
        self.frames.pop();
    }

    fn lookup(&self, key: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flatten()
            .find(|(bound, _)| bound == key)
            .map(|(_, uri)| uri.as_str())
    }
}

/// Line breaks as an XML processor sees them: `\r\n` and lone `\r` become `\n`
pub(crate) fn normalize_newlines(xml: &str) -> Cow<'_, str> {
    if xml.contains('\r') {
        Cow::Owned(xml.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(xml)
    }
}

/// Folds literal whitespace in a raw attribute value to spaces. Runs before
/// references are decoded, so `&#9;`, `&#10;` and `&#13;` survive.
pub(crate) fn normalize_attribute(raw: &str) -> Cow<'_, str> {
    const BREAKS: [char; 3] = ['\t', '\n', '\r'];
    if raw.contains(BREAKS) {
        Cow::Owned(raw.replace(BREAKS, " "))
    } else {
        Cow::Borrowed(raw)
    }
}

/// Internal general entities declared in a document type declaration.
///
/// Only literal replacement text is supported. Parameter entities, external
/// entities, attribute list declarations and replacement text carrying
/// markup or references are rejected, so every engine expands the same
/// documents the same way.
#[derive(Debug, Default)]
pub(crate) struct Entities {
    text: HashMap<String, String>,
    attribute: HashMap<String, String>,
}

impl Entities {
    /// Reads the internal subset of `doctype`, the declaration with or
    /// without its `<!DOCTYPE` and `>` delimiters
    pub(crate) fn declared_in(doctype: &str) -> Result<Self> {
        let mut entities = Self::default();
        let Some((_, subset)) = doctype.split_once('[') else {
            return Ok(entities);
        };
        let subset = subset.rsplit_once(']').map_or(subset, |(inner, _)| inner);

        let mut rest = subset.trim_start();
        while !rest.is_empty() {
            rest = if let Some(after) = rest.strip_prefix("<!--") {
                skip_past(after, "-->")?
            } else if let Some(after) = rest.strip_prefix("<?") {
                skip_past(after, "?>")?
            } else if let Some(after) = rest.strip_prefix("<!ENTITY") {
                entities.declare(after)?
            } else if rest.starts_with("<!ELEMENT") || rest.starts_with("<!NOTATION") {
                skip_declaration(rest)?
            } else {
                let near: String = rest.chars().take(16).collect();
                return Err(Error::parse(format!("unsupported DTD markup near `{near}`")));
            };
            rest = rest.trim_start();
        }
        Ok(entities)
    }

    /// Replacement text inside character data
    pub(crate) fn text(&self, name: &str) -> Option<&str> {
        self.text.get(name).map(String::as_str)
    }

    /// Replacement text inside an attribute value, whitespace folded
    pub(crate) fn attribute(&self, name: &str) -> Option<&str> {
        self.attribute.get(name).map(String::as_str)
    }

    fn declare<'a>(&mut self, input: &'a str) -> Result<&'a str> {
        let input = input.trim_start();
        if input.starts_with('%') {
            return Err(Error::parse("parameter entities are not supported"));
        }
        let (name, rest) = input
            .split_once(|c: char| c.is_ascii_whitespace())
            .ok_or_else(|| Error::parse("unterminated entity declaration"))?;
        let mut chars = rest.trim_start().chars();
        let quote = match chars.next() {
            Some(quote @ ('"' | '\'')) => quote,
            _ => {
                return Err(Error::parse(format!(
                    "external entity `{name}` is not supported"
                )))
            }
        };
        let (value, rest) = chars
            .as_str()
            .split_once(quote)
            .ok_or_else(|| Error::parse(format!("unterminated value of entity `{name}`")))?;
        if value.contains(['<', '>', '&', '%']) {
            return Err(Error::parse(format!(
                "entity `{name}` holds markup or references"
            )));
        }
        let rest = rest
            .trim_start()
            .strip_prefix('>')
            .ok_or_else(|| Error::parse(format!("malformed declaration of entity `{name}`")))?;

        // the first declaration of a name is binding
        if !self.text.contains_key(name) {
            self.text.insert(name.to_owned(), value.to_owned());
            self.attribute
                .insert(name.to_owned(), normalize_attribute(value).into_owned());
        }
        Ok(rest)
    }
}

fn skip_past<'a>(input: &'a str, terminator: &str) -> Result<&'a str> {
    input
        .split_once(terminator)
        .map(|(_, rest)| rest)
        .ok_or_else(|| Error::parse("unterminated markup in DTD"))
}

/// Skips one markup declaration, honoring quoted literals
fn skip_declaration(input: &str) -> Result<&str> {
    let mut quote = None;
    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '>') => return Ok(input.get(i + 1..).unwrap_or_default()),
            _ => {}
        }
    }
    Err(Error::parse("unterminated DTD declaration"))
}

/// Wraps the root element's value under its name
pub(crate) fn document(root: impl Into<String>, value: Value) -> Node {
    let mut doc = Node::with_capacity(1);
    doc.insert(root, value);
    doc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaf_text_trimmed() {
        let mut builder = ElementBuilder::new();
        builder.text("\n  01  \n");
        assert_eq!(builder.finish(), Value::from("01"));
    }

    #[test]
    fn test_empty_element_is_empty_leaf() {
        assert_eq!(ElementBuilder::new().finish(), Value::from(""));
    }

    #[test]
    fn test_attributes_make_a_node() {
        let mut builder = ElementBuilder::new();
        builder.attribute("orderId", "01");
        builder.text("dropped");
        assert_eq!(
            builder.finish(),
            Value::Node(Node::new().with("orderId", "01"))
        );
    }

    #[test]
    fn test_children_fold_and_override_attributes() {
        let mut builder = ElementBuilder::new();
        builder.attribute("id", "attr");
        builder.child("id", Value::from("child"));
        builder.child("item", Value::from("1"));
        builder.child("item", Value::from("2"));

        let expected = Node::new()
            .with("id", "child")
            .with("item", vec![Value::from("1"), Value::from("2")]);
        assert_eq!(builder.finish(), Value::Node(expected));
    }

    #[test]
    fn test_blank_text_between_children_is_ignored() {
        let mut builder = ElementBuilder::new();
        builder.text("\n  ");
        builder.child("a", Value::from("1"));
        builder.text("\n");
        assert_eq!(
            builder.finish(),
            Value::Node(Node::new().with("a", "1"))
        );
    }

    #[test]
    fn test_newlines_normalized() {
        assert_eq!(normalize_newlines("a\r\nb\rc\nd"), "a\nb\nc\nd");
        assert!(matches!(normalize_newlines("plain"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_attribute_whitespace_folded_before_references() {
        assert_eq!(normalize_attribute("x\ny\tz&#9;"), "x y z&#9;");
    }

    #[test]
    fn test_scope_drops_only_redundant_declarations() {
        let mut scope = NamespaceScope::default();
        scope.open();
        assert!(scope.declare("xmlns", "u"));
        scope.open();
        assert!(!scope.declare("xmlns", "u"));
        assert!(scope.declare("xmlns:p", "u"));
        assert!(!scope.declare(XML_PREFIX_DECLARATION, "http://www.w3.org/XML/1998/namespace"));
        scope.open();
        assert!(scope.declare("xmlns", "v"));
        scope.close();
        scope.close();
        scope.open();
        assert!(!scope.declare("xmlns", "u"));
    }

    #[test]
    fn test_entities_from_internal_subset() -> Result<()> {
        let entities = Entities::declared_in(
            "r [\n  <!-- names -->\n  <!ELEMENT r ANY>\n  <!ENTITY co 'Acme\tInc'>\n  \
             <!ENTITY co \"ignored\">\n]",
        )?;
        assert_eq!(entities.text("co"), Some("Acme\tInc"));
        assert_eq!(entities.attribute("co"), Some("Acme Inc"));
        assert_eq!(entities.text("other"), None);
        Ok(())
    }

    #[test]
    fn test_entities_without_subset() -> Result<()> {
        assert_eq!(Entities::declared_in("<!DOCTYPE r>")?.text("r"), None);
        Ok(())
    }

    #[test]
    fn test_unsupported_dtd_markup_rejected() {
        for doctype in [
            "r [<!ENTITY % p 'x'>]",
            "r [<!ENTITY e SYSTEM 'e.xml'>]",
            "r [<!ENTITY e '<b/>'>]",
            "r [<!ENTITY e 'a>b'>]",
            "r [<!ENTITY e '&f;'>]",
            "r [<!ATTLIST r a CDATA 'd'>]",
            "r [%p;]",
            "r [<!ENTITY e 'x'",
        ] {
            assert!(Entities::declared_in(doctype).is_err(), "accepted {doctype:?}");
        }
    }
}
