//! Byte cursor for XML input navigation

use crate::error::Pos;

/// Cursor over XML bytes with line/column tracking
#[derive(Clone, Debug)]
pub(crate) struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
}

impl<'a> Cursor<'a> {
    pub(crate) const fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Current byte without consuming it
    pub(crate) fn current(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    /// Whether the input continues with `pattern` at the current position
    pub(crate) fn starts_with(&self, pattern: &[u8]) -> bool {
        self.input
            .get(self.pos..)
            .is_some_and(|rest| rest.starts_with(pattern))
    }

    pub(crate) fn advance(&mut self) {
        if let Some(b) = self.current() {
            self.pos += 1;
            if b == b'\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
    }

    pub(crate) fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    pub(crate) fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.current() {
            self.advance();
        }
    }

    pub(crate) const fn position(&self) -> Pos {
        Pos::new(self.pos, self.line, self.col)
    }

    pub(crate) const fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub(crate) const fn pos(&self) -> usize {
        self.pos
    }

    /// Bytes from `start` up to the current position
    pub(crate) fn slice_from(&self, start: usize) -> &'a [u8] {
        self.input.get(start..self.pos).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_basic() {
        let mut cursor = Cursor::new(b"<a/>");
        assert_eq!(cursor.current(), Some(b'<'));
        cursor.advance();
        assert_eq!(cursor.current(), Some(b'a'));
    }

    #[test]
    fn test_cursor_whitespace_tracks_lines() {
        let mut cursor = Cursor::new(b"  \t\n<a/>");
        cursor.skip_whitespace();
        assert_eq!(cursor.current(), Some(b'<'));
        assert_eq!(cursor.position().line, 2);
        assert_eq!(cursor.position().col, 1);
    }

    #[test]
    fn test_cursor_starts_with() {
        let mut cursor = Cursor::new(b"<!-- c -->");
        assert!(cursor.starts_with(b"<!--"));
        cursor.advance_by(4);
        assert!(!cursor.starts_with(b"<!--"));
        assert!(cursor.starts_with(b" c"));
    }

    #[test]
    fn test_cursor_eof() {
        let mut cursor = Cursor::new(b"x");
        assert!(!cursor.is_eof());
        cursor.advance_by(5);
        assert!(cursor.is_eof());
        assert_eq!(cursor.current(), None);
    }

    #[test]
    fn test_cursor_slice() {
        let mut cursor = Cursor::new(b"orderId>");
        let start = cursor.pos();
        cursor.advance_by(7);
        assert_eq!(cursor.slice_from(start), b"orderId");
    }
}
