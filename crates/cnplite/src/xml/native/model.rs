//! Element tree of the native engine

use indexmap::IndexMap;

/// XML document
#[derive(Clone, Debug, PartialEq)]
pub struct Document {
    pub root: Element,
}

/// XML element
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: IndexMap<String, String>,
    pub children: Vec<Content>,
}

/// XML content node
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Element(Element),
    Text(String),
}

/// Attribute delimiter used when writing
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Quote {
    #[default]
    Single,
    Double,
}

impl Quote {
    const fn as_char(self) -> char {
        match self {
            Self::Single => '\'',
            Self::Double => '"',
        }
    }
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    pub fn write(&self, output: &mut String, quote: Quote) {
        output.push('<');
        output.push_str(&self.name);

        let q = quote.as_char();
        for (key, value) in &self.attributes {
            output.push(' ');
            output.push_str(key);
            output.push('=');
            output.push(q);
            output.push_str(&escape_attribute(value));
            output.push(q);
        }

        if self.children.is_empty() {
            output.push_str("/>");
            return;
        }

        output.push('>');
        for child in &self.children {
            match child {
                Content::Element(child) => child.write(output, quote),
                Content::Text(text) => output.push_str(&escape_text(text)),
            }
        }
        output.push_str("</");
        output.push_str(&self.name);
        output.push('>');
    }
}

impl Document {
    /// Writes the document, optionally preceded by an XML declaration
    pub fn to_xml(&self, quote: Quote, declaration: bool) -> String {
        let mut output = String::new();
        if declaration {
            let q = quote.as_char();
            output.push_str(&format!("<?xml version={q}1.0{q} encoding={q}UTF-8{q}?>"));
        }
        self.root.write(&mut output, quote);
        output
    }
}

fn escape_markup(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// A reader folds literal tabs and line breaks in attribute values into
/// spaces, so they go out as character references.
fn escape_attribute(input: &str) -> String {
    escape_markup(input)
        .replace('\t', "&#9;")
        .replace('\n', "&#10;")
        .replace('\r', "&#13;")
}

/// A reader turns a literal `\r` into `\n`
fn escape_text(input: &str) -> String {
    escape_markup(input).replace('\r', "&#13;")
}
