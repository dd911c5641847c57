//! Native engine: the crate's own cursor reader and element tree writer

mod cursor;
pub mod model;
pub mod reader;

pub use model::{Content, Document, Element, Quote};
pub use reader::Reader;

use crate::error::{Error, Result};
use crate::value::{Node, Value};
use crate::xml::parser::{
    document, is_declaration, normalize_newlines, ElementBuilder, NamespaceScope, XmlParser,
};
use crate::xml::policy::AttributePolicy;
use crate::xml::serializer::{write_document, ElementSink, XmlSerializer};

#[derive(Clone, Copy, Debug, Default)]
pub struct NativeParser;

impl NativeParser {
    pub fn new() -> Self {
        Self
    }
}

impl XmlParser for NativeParser {
    fn parse(&self, xml: &str) -> Result<Node> {
        let xml = normalize_newlines(xml);
        let doc = Reader::new(xml.as_bytes()).read()?;
        let value = element_value(&doc.root, &mut NamespaceScope::default());
        Ok(document(doc.root.name, value))
    }
}

fn element_value(element: &Element, scope: &mut NamespaceScope) -> Value {
    let mut builder = ElementBuilder::new();
    scope.open();
    for (key, value) in &element.attributes {
        if is_declaration(key) && !scope.declare(key, value) {
            continue;
        }
        builder.attribute(key.as_str(), value.as_str());
    }
    for child in &element.children {
        match child {
            Content::Element(child) => {
                builder.child(child.name.as_str(), element_value(child, scope));
            }
            Content::Text(text) => builder.text(text),
        }
    }
    scope.close();
    builder.finish()
}

#[derive(Clone, Debug)]
pub struct NativeSerializer {
    policy: AttributePolicy,
    quote: Quote,
    declaration: bool,
}

impl NativeSerializer {
    pub fn new(policy: AttributePolicy) -> Self {
        Self {
            policy,
            // The element tree writes single quotes by default, which is also
            // what the endpoint answers with, but it rejects single-quoted
            // attributes in requests with an internal server error.
            quote: Quote::Double,
            declaration: true,
        }
    }

    #[must_use]
    pub fn with_quote(mut self, quote: Quote) -> Self {
        self.quote = quote;
        self
    }

    #[must_use]
    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    /// Builds the element tree without writing it
    pub fn to_document(&self, value: &Value, root: &str) -> Result<Document> {
        let mut sink = TreeSink::default();
        write_document(&mut sink, &self.policy, root, value)?;
        sink.root
            .map(|root| Document { root })
            .ok_or_else(|| Error::serialize("no root element was written"))
    }
}

impl Default for NativeSerializer {
    fn default() -> Self {
        Self::new(AttributePolicy::default())
    }
}

impl XmlSerializer for NativeSerializer {
    fn serialize(&self, value: &Value, root: &str) -> Result<String> {
        Ok(self
            .to_document(value, root)?
            .to_xml(self.quote, self.declaration))
    }

    fn policy(&self) -> &AttributePolicy {
        &self.policy
    }
}

#[derive(Debug, Default)]
struct TreeSink {
    stack: Vec<Element>,
    root: Option<Element>,
}

impl ElementSink for TreeSink {
    fn open(&mut self, name: &str, attributes: &[(&str, String)]) -> Result<()> {
        let mut element = Element::new(name);
        for (key, value) in attributes {
            element.attributes.insert((*key).to_owned(), value.clone());
        }
        self.stack.push(element);
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let current = self
            .stack
            .last_mut()
            .ok_or_else(|| Error::serialize("text outside of an element"))?;
        current.children.push(Content::Text(text.to_owned()));
        Ok(())
    }

    fn close(&mut self, name: &str) -> Result<()> {
        let element = self
            .stack
            .pop()
            .filter(|e| e.name == name)
            .ok_or_else(|| Error::serialize(format!("unbalanced close of <{name}>")))?;
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Content::Element(element)),
            None => self.root = Some(element),
        }
        Ok(())
    }
}
