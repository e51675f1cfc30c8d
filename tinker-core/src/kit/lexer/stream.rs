//! Character stream over in-memory source
//!
//! Decodes UTF-8 once up front and supports arbitrary lookahead.

use super::position::SourcePosition;

/// Peekable character cursor with position tracking
pub struct CharStream<'a> {
    source: &'a str,
    chars: Vec<char>,
    index: usize,
    position: SourcePosition,
}

impl<'a> CharStream<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::starting_at(source, SourcePosition::start())
    }

    /// Stream over a fragment whose first character sits at `base`
    ///
    /// Used to re-scan template substitutions so spans stay absolute.
    pub fn starting_at(source: &'a str, base: SourcePosition) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            index: 0,
            position: base,
        }
    }

    /// Look `n` characters ahead without consuming
    pub fn peek(&self, n: usize) -> Option<char> {
        self.chars.get(self.index + n).copied()
    }

    pub fn advance(&mut self) -> Option<char> {
        let c = self.chars.get(self.index).copied()?;
        self.index += 1;
        self.position.advance(c);
        Some(c)
    }

    /// Consume `expected` if it is next
    pub fn eat(&mut self, expected: char) -> bool {
        if self.peek(0) == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn is_eof(&self) -> bool {
        self.index >= self.chars.len()
    }

    pub fn position(&self) -> SourcePosition {
        self.position
    }

    /// Source text between two absolute positions produced by this stream
    pub fn slice(&self, base: SourcePosition, start: SourcePosition, end: SourcePosition) -> &'a str {
        let from = start.byte_offset - base.byte_offset;
        let to = end.byte_offset - base.byte_offset;
        &self.source[from..to]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peek_and_advance() {
        let mut stream = CharStream::new("ab");
        assert_eq!(stream.peek(1), Some('b'));
        assert_eq!(stream.advance(), Some('a'));
        assert!(stream.eat('b'));
        assert!(stream.is_eof());
        assert_eq!(stream.advance(), None);
    }

    #[test]
    fn test_starting_at_offsets_positions() {
        let base = SourcePosition::new(3, 10, 40);
        let mut stream = CharStream::starting_at("x\ny", base);
        stream.advance();
        stream.advance();
        let pos = stream.position();
        assert_eq!((pos.line, pos.column, pos.byte_offset), (4, 1, 42));
    }
}
