//! Cursor-based XML reader producing the native element tree

use indexmap::IndexMap;

use crate::error::{Error, ErrorKind, Result, Span};
use crate::xml::native::cursor::Cursor;
use crate::xml::native::model::{Content, Document, Element};
use crate::xml::parser::{normalize_attribute, Entities};
use crate::xml::policy::{is_name_char, is_name_start};

/// XML reader. Expects line breaks already normalized to `\n`.
#[derive(Debug)]
pub struct Reader<'a> {
    cursor: Cursor<'a>,
    entities: Entities,
}

impl<'a> Reader<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(input),
            entities: Entities::default(),
        }
    }

    /// Reads a whole document: prolog, one root element, trailing misc
    pub fn read(&mut self) -> Result<Document> {
        self.skip_misc()?;
        if self.cursor.is_eof() {
            return Err(self.error_here("missing root element"));
        }
        let root = self.read_element()?;
        self.skip_misc()?;

        if !self.cursor.is_eof() {
            return Err(self.error_here("content after root element"));
        }

        Ok(Document { root })
    }

    /// Skips whitespace, comments, processing instructions and doctype
    /// declarations outside the root element.
    fn skip_misc(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(b"?>")?;
            } else if self.cursor.starts_with(b"<!--") {
                self.cursor.advance_by(4);
                self.skip_until(b"-->")?;
            } else if self.cursor.starts_with(b"<!") {
                let start = self.cursor.pos();
                self.skip_doctype()?;
                let declaration = bytes_to_str(self.cursor.slice_from(start))?;
                self.entities = Entities::declared_in(declaration)?;
            } else {
                return Ok(());
            }
        }
    }

    fn read_element(&mut self) -> Result<Element> {
        self.expect_byte(b'<')?;
        let name = self.read_name()?;
        let attributes = self.read_attributes()?;

        if self.cursor.current() == Some(b'/') {
            self.cursor.advance();
            self.expect_byte(b'>')?;
            return Ok(Element {
                name,
                attributes,
                children: Vec::new(),
            });
        }

        self.expect_byte(b'>')?;

        let mut children = Vec::new();
        loop {
            if self.cursor.is_eof() {
                return Err(self.error_here("unterminated element"));
            }

            if self.cursor.starts_with(b"</") {
                self.cursor.advance_by(2);
                let close_name = self.read_name()?;
                if close_name != name {
                    return Err(self.error_here("mismatched closing tag"));
                }
                self.cursor.skip_whitespace();
                self.expect_byte(b'>')?;
                break;
            }

            if self.cursor.starts_with(b"<!--") {
                self.cursor.advance_by(4);
                self.skip_until(b"-->")?;
            } else if self.cursor.starts_with(b"<![CDATA[") {
                self.cursor.advance_by(9);
                children.push(Content::Text(self.read_cdata()?));
            } else if self.cursor.starts_with(b"<?") {
                self.cursor.advance_by(2);
                self.skip_until(b"?>")?;
            } else if self.cursor.current() == Some(b'<') {
                children.push(Content::Element(self.read_element()?));
            } else {
                children.push(Content::Text(self.read_text()?));
            }
        }

        Ok(Element {
            name,
            attributes,
            children,
        })
    }

    fn read_attributes(&mut self) -> Result<IndexMap<String, String>> {
        let mut attrs = IndexMap::new();

        loop {
            self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/' | b'>') => break,
                Some(_) => {}
                None => return Err(self.error_here("unexpected end of input")),
            }

            let name = self.read_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.read_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(self.error_here("duplicate attribute"));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn read_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(q @ (b'"' | b'\'')) => q,
            _ => return Err(self.error_here("expected quoted attribute value")),
        };
        self.cursor.advance();

        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == quote {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance();
                let raw = normalize_attribute(bytes_to_str(raw)?);
                return decode_entities(&raw, |name| self.entities.attribute(name));
            }
            if b == b'<' {
                return Err(self.error_here("`<` in attribute value"));
            }
            self.cursor.advance();
        }

        Err(self.error_here("unterminated attribute value"))
    }

    /// Character data up to the next markup
    fn read_text(&mut self) -> Result<String> {
        let start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b'<' {
                break;
            }
            self.cursor.advance();
        }

        let raw = bytes_to_str(self.cursor.slice_from(start))?;
        decode_entities(raw, |name| self.entities.text(name))
    }

    fn read_cdata(&mut self) -> Result<String> {
        let start = self.cursor.pos();
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(b"]]>") {
                let raw = self.cursor.slice_from(start);
                self.cursor.advance_by(3);
                return bytes_to_str(raw).map(str::to_owned);
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated CDATA section"))
    }

    fn read_name(&mut self) -> Result<String> {
        let start = self.cursor.pos();

        match self.cursor.current() {
            Some(first) if is_name_start(first) => self.cursor.advance(),
            _ => return Err(self.error_here("expected name")),
        }
        while let Some(b) = self.cursor.current() {
            if !is_name_char(b) {
                break;
            }
            self.cursor.advance();
        }

        bytes_to_str(self.cursor.slice_from(start)).map(str::to_owned)
    }

    /// Skips `<!DOCTYPE ...>` including an internal subset in brackets
    fn skip_doctype(&mut self) -> Result<()> {
        let mut depth = 0usize;
        let mut quote = None;
        while let Some(b) = self.cursor.current() {
            self.cursor.advance();
            match (quote, b) {
                (Some(open), _) if b == open => quote = None,
                (Some(_), _) => {}
                (None, b'"' | b'\'') => quote = Some(b),
                (None, b'[') => depth += 1,
                (None, b']') => depth = depth.saturating_sub(1),
                (None, b'>') if depth == 0 => return Ok(()),
                _ => {}
            }
        }
        Err(self.error_here("unterminated declaration"))
    }

    fn skip_until(&mut self, pattern: &[u8]) -> Result<()> {
        while !self.cursor.is_eof() {
            if self.cursor.starts_with(pattern) {
                self.cursor.advance_by(pattern.len());
                return Ok(());
            }
            self.cursor.advance();
        }
        Err(self.error_here("unterminated markup"))
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.current() == Some(expected) {
            self.cursor.advance();
            Ok(())
        } else {
            Err(self.error_here(&format!("expected `{}`", char::from(expected))))
        }
    }

    fn error_here(&self, message: &str) -> Error {
        Error::with_span(
            ErrorKind::Parse,
            Span::at(self.cursor.position()),
            message.to_string(),
        )
    }
}

fn bytes_to_str(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|_| Error::parse("invalid utf-8"))
}

/// Resolves references in `input`: the predefined entities, character
/// references, then whatever `declared` knows
fn decode_entities<'e>(
    input: &str,
    declared: impl Fn(&str) -> Option<&'e str>,
) -> Result<String> {
    if !input.contains('&') {
        return Ok(input.to_owned());
    }

    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch != '&' {
            result.push(ch);
            continue;
        }

        let mut entity = String::new();
        let mut terminated = false;
        for next in chars.by_ref() {
            if next == ';' {
                terminated = true;
                break;
            }
            entity.push(next);
        }

        if !terminated {
            return Err(Error::parse(format!("invalid xml entity `&{entity}`")));
        }
        let character = predefined_entity(&entity).or_else(|| decode_numeric_entity(&entity));
        if let Some(ch) = character {
            result.push(ch);
        } else if let Some(replacement) = declared(&entity) {
            result.push_str(replacement);
        } else {
            return Err(Error::parse(format!("invalid xml entity `&{entity}`")));
        }
    }

    Ok(result)
}

fn predefined_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

fn decode_numeric_entity(entity: &str) -> Option<char> {
    if let Some(hex) = entity.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
    } else if let Some(dec) = entity.strip_prefix('#') {
        dec.parse::<u32>().ok().and_then(char::from_u32)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ensure_eq<T: PartialEq + std::fmt::Debug>(left: T, right: T) -> Result<()> {
        if left == right {
            Ok(())
        } else {
            Err(Error::parse(format!(
                "assertion failed: left={left:?} right={right:?}"
            )))
        }
    }

    fn read(input: &str) -> Result<Document> {
        Reader::new(input.as_bytes()).read()
    }

    #[test]
    fn test_read_simple_element() -> Result<()> {
        let doc = read("<root></root>")?;
        ensure_eq(doc.root.name, "root".to_string())?;
        ensure_eq(doc.root.children.len(), 0)?;
        Ok(())
    }

    #[test]
    fn test_read_with_attributes() -> Result<()> {
        let doc = read("<root id=\"1\" name='test'></root>")?;
        ensure_eq(doc.root.attributes.get("id"), Some(&"1".to_string()))?;
        ensure_eq(doc.root.attributes.get("name"), Some(&"test".to_string()))?;
        Ok(())
    }

    #[test]
    fn test_read_prolog_and_comments() -> Result<()> {
        let doc = read(
            "<?xml version='1.0' encoding='UTF-8'?>\n<!DOCTYPE r [<!ENTITY x 'y'>]>\n\
             <!-- lead --><r><!-- inner --><a>1</a></r><!-- tail -->\n",
        )?;
        ensure_eq(doc.root.name.as_str(), "r")?;
        ensure_eq(doc.root.children.len(), 1)?;
        Ok(())
    }

    fn elements(element: &Element) -> usize {
        element
            .children
            .iter()
            .filter(|c| matches!(c, Content::Element(_)))
            .count()
    }

    #[test]
    fn test_read_keeps_blank_text() -> Result<()> {
        let doc = read("<r>\n  <a>x</a>\n  <b/>\n</r>")?;
        ensure_eq(elements(&doc.root), 2)?;
        ensure_eq(doc.root.children.len(), 5)?;
        Ok(())
    }

    #[test]
    fn test_read_space_between_cdata_and_comments() -> Result<()> {
        let doc = read("<r><![CDATA[x]]> <![CDATA[y]]>a<!--c--> <!--c-->b</r>")?;
        let text: String = doc
            .root
            .children
            .iter()
            .filter_map(|c| match c {
                Content::Text(text) => Some(text.as_str()),
                Content::Element(_) => None,
            })
            .collect();
        ensure_eq(text.as_str(), "x ya b")?;
        Ok(())
    }

    #[test]
    fn test_read_attribute_whitespace_folded() -> Result<()> {
        let doc = read("<r a='x\ny\tz' b='x&#10;y&#9;z'/>")?;
        ensure_eq(doc.root.attributes.get("a").map(String::as_str), Some("x y z"))?;
        ensure_eq(doc.root.attributes.get("b").map(String::as_str), Some("x\ny\tz"))?;
        Ok(())
    }

    #[test]
    fn test_read_internal_entities() -> Result<()> {
        let doc = read(
            "<!DOCTYPE r [<!ENTITY co 'Acme\tInc'> <!ENTITY br \"a]b\">]>\
             <r a='&co;'>&co; &br;</r>",
        )?;
        ensure_eq(doc.root.attributes.get("a").map(String::as_str), Some("Acme Inc"))?;
        ensure_eq(
            doc.root.children,
            vec![Content::Text("Acme\tInc a]b".to_string())],
        )?;
        Ok(())
    }

    #[test]
    fn test_read_cdata_as_text() -> Result<()> {
        let doc = read("<r><![CDATA[a < b & c]]></r>")?;
        ensure_eq(
            doc.root.children,
            vec![Content::Text("a < b & c".to_string())],
        )?;
        Ok(())
    }

    #[test]
    fn test_read_entities() -> Result<()> {
        let doc = read("<r v='&lt;&#65;&#x42;&apos;'>&amp;amp;</r>")?;
        ensure_eq(doc.root.attributes.get("v"), Some(&"<AB'".to_string()))?;
        ensure_eq(
            doc.root.children,
            vec![Content::Text("&amp;".to_string())],
        )?;
        Ok(())
    }

    #[test]
    fn test_read_errors_carry_position() {
        let err = read("<r>\n<a></b></r>").err();
        let line = err.as_ref().and_then(Error::span).map(|s| s.start.line);
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::Parse));
        assert_eq!(line, Some(2));
    }

    #[test]
    fn test_read_rejects_malformed() {
        for bad in [
            "",
            "<r>",
            "<r></r><r></r>",
            "<r a='1' a='2'/>",
            "<r>&bogus;</r>",
            "<r>&amp</r>",
            "<!DOCTYPE r [<!ENTITY % p 'x'>]><r/>",
            "<!DOCTYPE r [<!ATTLIST r a CDATA 'd'>]><r/>",
            "text",
        ] {
            assert!(read(bad).is_err(), "accepted {bad:?}");
        }
    }
}
