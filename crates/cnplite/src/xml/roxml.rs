//! roxmltree engine: read-only DOM parse

use roxmltree::{Document, ParsingOptions};

use crate::error::Result;
use crate::value::{Node, Value};
use crate::xml::parser::{document, ElementBuilder, Entities, XmlParser};

const XML_PREFIX: &str = "xml";

#[derive(Clone, Copy, Debug, Default)]
pub struct RoxmltreeParser;

impl RoxmltreeParser {
    pub fn new() -> Self {
        Self
    }
}

impl XmlParser for RoxmltreeParser {
    fn parse(&self, xml: &str) -> Result<Node> {
        // roxmltree expands whatever the internal subset declares; hold it to
        // the declarations the other engines support
        if let Some(doctype) = prolog_doctype(xml) {
            Entities::declared_in(doctype)?;
        }
        let options = ParsingOptions {
            allow_dtd: true,
            ..ParsingOptions::default()
        };
        let doc = Document::parse_with_options(xml, options)?;
        let root = doc.root_element();
        Ok(document(qualified_name(root), element_value(root)))
    }
}

fn element_value(element: roxmltree::Node<'_, '_>) -> Value {
    let mut builder = ElementBuilder::new();

    // roxmltree resolves namespace declarations instead of reporting them as
    // attributes; restore the ones introduced on this element.
    for ns in element.namespaces() {
        let prefix = ns.name();
        if prefix == Some(XML_PREFIX) || inherited(element, prefix, ns.uri()) {
            continue;
        }
        match prefix {
            Some(prefix) => builder.attribute(format!("xmlns:{prefix}"), ns.uri()),
            None => builder.attribute("xmlns", ns.uri()),
        }
    }

    for attr in element.attributes() {
        let name = match attr.namespace().and_then(|uri| element.lookup_prefix(uri)) {
            Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", attr.name()),
            _ => attr.name().to_owned(),
        };
        builder.attribute(name, attr.value());
    }

    for child in element.children() {
        if child.is_element() {
            builder.child(qualified_name(child), element_value(child));
        } else if child.is_text() {
            builder.text(child.text().unwrap_or_default());
        }
    }

    builder.finish()
}

fn inherited(element: roxmltree::Node<'_, '_>, prefix: Option<&str>, uri: &str) -> bool {
    element.parent_element().is_some_and(|parent| {
        parent
            .namespaces()
            .any(|ns| ns.name() == prefix && ns.uri() == uri)
    })
}

/// The `<!DOCTYPE ...>` declaration of `xml`, if its prolog has one
fn prolog_doctype(xml: &str) -> Option<&str> {
    let mut rest = xml.trim_start_matches('\u{feff}');
    loop {
        rest = rest.trim_start();
        if let Some(after) = rest.strip_prefix("<?") {
            rest = after.split_once("?>")?.1;
        } else if let Some(after) = rest.strip_prefix("<!--") {
            rest = after.split_once("-->")?.1;
        } else if rest.starts_with("<!DOCTYPE") {
            return rest.get(..doctype_len(rest)?);
        } else {
            return None;
        }
    }
}

/// Length of the declaration opening `input`, internal subset included
fn doctype_len(input: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote = None;
    for (i, ch) in input.char_indices() {
        match (quote, ch) {
            (Some(open), _) if ch == open => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(ch),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, '>') if depth == 0 => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn qualified_name(element: roxmltree::Node<'_, '_>) -> String {
    let tag = element.tag_name();
    match tag.namespace().and_then(|uri| element.lookup_prefix(uri)) {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}:{}", tag.name()),
        _ => tag.name().to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_parse_keeps_root_namespace() -> Result<()> {
        let doc = RoxmltreeParser.parse(
            "<cnpOnlineResponse xmlns='http://www.vantivcnp.com/schema' response='0'>\
             <saleResponse id='1'><orderId>7</orderId></saleResponse></cnpOnlineResponse>",
        )?;
        let expected = Node::new()
            .with("xmlns", "http://www.vantivcnp.com/schema")
            .with("response", "0")
            .with(
                "saleResponse",
                Node::new().with("id", "1").with("orderId", "7"),
            );
        assert_eq!(doc, Node::new().with("cnpOnlineResponse", expected));
        Ok(())
    }

    #[test]
    fn test_parse_prefixed_names() -> Result<()> {
        let doc = RoxmltreeParser.parse("<p:r xmlns:p='urn:x' p:a='1'><p:b>2</p:b></p:r>")?;
        let expected = Node::new()
            .with("xmlns:p", "urn:x")
            .with("p:a", "1")
            .with("p:b", "2");
        assert_eq!(doc, Node::new().with("p:r", expected));
        Ok(())
    }

    #[test]
    fn test_parse_pretty_printed_and_cdata() -> Result<()> {
        let doc = RoxmltreeParser.parse(
            "<?xml version=\"1.0\"?>\n<r>\n  <!-- note -->\n  <a>\n    x\n  </a>\n  \
             <b><![CDATA[1 < 2]]></b>\n</r>\n",
        )?;
        let expected = Node::new().with("a", "x").with("b", "1 < 2");
        assert_eq!(doc, Node::new().with("r", expected));
        Ok(())
    }

    #[test]
    fn test_parse_accepts_doctype() -> Result<()> {
        let doc = RoxmltreeParser.parse("<!DOCTYPE r [<!ENTITY x 'y'>]><r><a>1</a></r>")?;
        assert_eq!(doc, Node::new().with("r", Node::new().with("a", "1")));
        Ok(())
    }

    #[test]
    fn test_parse_expands_internal_entities() -> Result<()> {
        let doc = RoxmltreeParser
            .parse("<!DOCTYPE r [<!ENTITY co 'Acme\tInc'>]><r><a n='&co;'/><b>&co;</b></r>")?;
        let expected = Node::new()
            .with("a", Node::new().with("n", "Acme Inc"))
            .with("b", "Acme\tInc");
        assert_eq!(doc, Node::new().with("r", expected));
        Ok(())
    }

    #[test]
    fn test_doctype_stops_at_its_end() {
        let xml = "<!DOCTYPE r [<!ENTITY x 'a]b'>]><r><![CDATA[[1]]]></r>";
        assert_eq!(prolog_doctype(xml), Some("<!DOCTYPE r [<!ENTITY x 'a]b'>]>"));
        assert_eq!(prolog_doctype("<r>[x]</r>"), None);
    }

    #[test]
    fn test_parse_rejects_unsupported_dtd_markup() {
        for bad in [
            "<?xml version='1.0'?><!-- c --><!DOCTYPE r [<!ENTITY e '<b/>'>]><r>&e;</r>",
            "<!DOCTYPE r [<!ATTLIST r a CDATA 'd'>]><r/>",
        ] {
            assert!(RoxmltreeParser.parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_drops_redundant_namespace_declaration() -> Result<()> {
        let doc = RoxmltreeParser.parse("<r xmlns='u'><a xmlns='u'>1</a><b xmlns='v'>2</b></r>")?;
        let expected = Node::new()
            .with("xmlns", "u")
            .with("a", "1")
            .with("b", Node::new().with("xmlns", "v"));
        assert_eq!(doc, Node::new().with("r", expected));
        Ok(())
    }

    #[test]
    fn test_parse_error_is_parse_kind() {
        let err = RoxmltreeParser.parse("<r><a></r>").err().map(|e| e.kind());
        assert_eq!(err, Some(ErrorKind::Parse));
    }
}
