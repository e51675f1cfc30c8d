//! Source position tracking
//!
//! Two coordinate systems are kept side by side:
//! - line/column: human readable diagnostics (1-based, code points)
//! - byte_offset: slicing the source text (0-based, UTF-8)

use std::fmt;

/// A position in source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourcePosition {
    /// Line number, 1-based
    pub line: usize,
    /// Column number, 1-based, counted in code points
    pub column: usize,
    /// Byte offset, 0-based
    pub byte_offset: usize,
}

impl SourcePosition {
    pub fn new(line: usize, column: usize, byte_offset: usize) -> Self {
        Self {
            line,
            column,
            byte_offset,
        }
    }

    /// Start of a file
    pub fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            byte_offset: 0,
        }
    }

    /// Advance past one character
    pub fn advance(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.byte_offset += c.len_utf8();
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            line: self.line,
            column: self.column,
        }
    }
}

/// Human readable line/column pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinate {
    pub line: usize,
    pub column: usize,
}

impl Coordinate {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl Default for Coordinate {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A half-open range of source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceSpan {
    pub start: SourcePosition,
    pub end: SourcePosition,
}

impl SourceSpan {
    /// Empty span at one position
    pub fn at(pos: SourcePosition) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn range(start: SourcePosition, end: SourcePosition) -> Self {
        Self { start, end }
    }

    /// Span covering both `self` and `other`
    pub fn merge(&self, other: &SourceSpan) -> Self {
        let start = if other.start.byte_offset < self.start.byte_offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.byte_offset > self.end.byte_offset {
            other.end
        } else {
            self.end
        };
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.byte_offset - self.start.byte_offset
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Byte range for slicing the source
    pub fn bytes(&self) -> std::ops::Range<usize> {
        self.start.byte_offset..self.end.byte_offset
    }

    pub fn coordinate(&self) -> Coordinate {
        self.start.coordinate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_tracks_lines_and_bytes() {
        let mut pos = SourcePosition::start();
        for c in "ab\né".chars() {
            pos.advance(c);
        }
        assert_eq!(pos.line, 2);
        assert_eq!(pos.column, 2);
        assert_eq!(pos.byte_offset, 5);
    }

    #[test]
    fn test_merge_spans() {
        let a = SourceSpan::range(SourcePosition::new(1, 1, 0), SourcePosition::new(1, 3, 2));
        let b = SourceSpan::range(SourcePosition::new(1, 5, 4), SourcePosition::new(1, 8, 7));
        let merged = a.merge(&b);
        assert_eq!(merged.bytes(), 0..7);
        assert_eq!(b.merge(&a).bytes(), 0..7);
    }
}
