//! quick-xml engine: pull reader and event writer

use std::borrow::Cow;

use quick_xml::escape::{escape, resolve_predefined_entity, unescape_with};
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesDecl, BytesEnd, BytesRef, BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};

use crate::error::{Error, Result};
use crate::value::{Node, Value};
use crate::xml::parser::{
    document, is_declaration, normalize_attribute, normalize_newlines, ElementBuilder, Entities,
    NamespaceScope, XmlParser,
};
use crate::xml::policy::AttributePolicy;
use crate::xml::serializer::{write_document, ElementSink, XmlSerializer};

#[derive(Clone, Copy, Debug, Default)]
pub struct QuickXmlParser;

impl QuickXmlParser {
    pub fn new() -> Self {
        Self
    }
}

impl XmlParser for QuickXmlParser {
    fn parse(&self, xml: &str) -> Result<Node> {
        let xml = normalize_newlines(xml);
        let mut reader = Reader::from_str(&xml);
        let mut entities = Entities::default();
        let mut scope = NamespaceScope::default();
        let mut stack: Vec<(String, ElementBuilder)> = Vec::new();
        let mut root: Option<(String, Value)> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    let open = open_element(&start, &entities, &mut scope)?;
                    if root.is_some() {
                        return Err(Error::parse("content after root element"));
                    }
                    stack.push(open);
                }
                Event::Empty(start) => {
                    let (name, builder) = open_element(&start, &entities, &mut scope)?;
                    scope.close();
                    close_element(&mut stack, &mut root, name, builder.finish())?;
                }
                Event::End(_) => {
                    let (name, builder) = stack
                        .pop()
                        .ok_or_else(|| Error::parse("unexpected closing tag"))?;
                    scope.close();
                    close_element(&mut stack, &mut root, name, builder.finish())?;
                }
                Event::Text(text) => {
                    let decoded = text.decode().map_err(|e| Error::parse(e.to_string()))?;
                    push_text(&mut stack, &decoded)?;
                }
                Event::CData(cdata) => {
                    let raw = cdata.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|_| Error::parse("invalid utf-8 in CDATA section"))?;
                    push_text(&mut stack, text)?;
                }
                Event::GeneralRef(reference) => {
                    let text = resolve_reference(&reference, &entities)?;
                    push_text(&mut stack, &text)?;
                }
                Event::DocType(doctype) => {
                    let declaration = doctype.decode().map_err(|e| Error::parse(e.to_string()))?;
                    entities = Entities::declared_in(&declaration)?;
                }
                Event::Eof => break,
                // comments, declarations, processing instructions
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(Error::parse("unterminated element"));
        }
        root.map(|(name, value)| document(name, value))
            .ok_or_else(|| Error::parse("missing root element"))
    }
}

/// Reads a start tag and opens its namespace scope
fn open_element(
    start: &BytesStart<'_>,
    entities: &Entities,
    scope: &mut NamespaceScope,
) -> Result<(String, ElementBuilder)> {
    let name = utf8(start.name().as_ref())?.to_owned();
    let mut builder = ElementBuilder::new();
    scope.open();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::parse(e.to_string()))?;
        let key = utf8(attr.key.as_ref())?;
        let raw = normalize_attribute(utf8(&attr.value)?);
        let value = unescape_with(&raw, |entity| {
            resolve_predefined_entity(entity).or_else(|| entities.attribute(entity))
        })
        .map_err(|e| Error::parse(e.to_string()))?;
        if is_declaration(key) && !scope.declare(key, &value) {
            continue;
        }
        builder.attribute(key, value);
    }
    Ok((name, builder))
}

fn resolve_reference(reference: &BytesRef<'_>, entities: &Entities) -> Result<String> {
    if let Some(ch) = reference.resolve_char_ref()? {
        return Ok(ch.to_string());
    }
    let name = reference.decode().map_err(|e| Error::parse(e.to_string()))?;
    resolve_predefined_entity(&name)
        .or_else(|| entities.text(&name))
        .map(str::to_owned)
        .ok_or_else(|| Error::parse(format!("invalid xml entity `&{name};`")))
}

fn close_element(
    stack: &mut [(String, ElementBuilder)],
    root: &mut Option<(String, Value)>,
    name: String,
    value: Value,
) -> Result<()> {
    match stack.last_mut() {
        Some((_, parent)) => parent.child(name, value),
        None if root.is_none() => *root = Some((name, value)),
        None => return Err(Error::parse("content after root element")),
    }
    Ok(())
}

fn push_text(stack: &mut [(String, ElementBuilder)], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some((_, builder)) => builder.text(text),
        None if text.trim().is_empty() => {}
        None => return Err(Error::parse("text outside of the root element")),
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::parse("invalid utf-8"))
}

#[derive(Clone, Debug)]
pub struct QuickXmlSerializer {
    policy: AttributePolicy,
    indent: Option<usize>,
    declaration: bool,
}

impl QuickXmlSerializer {
    pub fn new(policy: AttributePolicy) -> Self {
        Self {
            policy,
            indent: None,
            declaration: true,
        }
    }

    /// Pretty-prints with `width` spaces per level
    #[must_use]
    pub fn indented(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }

    #[must_use]
    pub fn with_declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }
}

impl Default for QuickXmlSerializer {
    fn default() -> Self {
        Self::new(AttributePolicy::default())
    }
}

impl XmlSerializer for QuickXmlSerializer {
    fn serialize(&self, value: &Value, root: &str) -> Result<String> {
        let writer = match self.indent {
            Some(width) => Writer::new_with_indent(Vec::new(), b' ', width),
            None => Writer::new(Vec::new()),
        };
        let mut sink = EventSink { writer };
        if self.declaration {
            sink.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }
        write_document(&mut sink, &self.policy, root, value)?;
        String::from_utf8(sink.writer.into_inner())
            .map_err(|_| Error::serialize("writer produced invalid utf-8"))
    }

    fn policy(&self) -> &AttributePolicy {
        &self.policy
    }
}

struct EventSink {
    writer: Writer<Vec<u8>>,
}

impl EventSink {
    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::serialize(e.to_string()))
    }
}

impl ElementSink for EventSink {
    fn open(&mut self, name: &str, attributes: &[(&str, String)]) -> Result<()> {
        let mut start = BytesStart::new(name);
        for (key, value) in attributes {
            // a reader folds literal tabs and line breaks in attribute values
            let escaped = escape(value)
                .replace('\t', "&#9;")
                .replace('\n', "&#10;")
                .replace('\r', "&#13;");
            start.push_attribute(Attribute {
                key: QName(key.as_bytes()),
                value: Cow::Owned(escaped.into_bytes()),
            });
        }
        self.write(Event::Start(start))
    }

    fn text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let escaped = escape(text).replace('\r', "&#13;");
        self.write(Event::Text(BytesText::from_escaped(escaped)))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.write(Event::End(BytesEnd::new(name)))
    }
}
