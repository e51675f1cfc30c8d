//! Script scanner
//!
//! Turns source text into a token vector. Whitespace and comments are
//! dropped, but each token remembers whether a line terminator preceded it
//! so the parser can apply automatic semicolon insertion.

use super::token_kind::{TokenKind, PUNCTUATORS};
use crate::kit::lexer::{
    is_identifier_continue, is_identifier_start, is_line_terminator, CharStream, LexError,
    LexErrorKind, SourcePosition, SourceSpan,
};
use tracing::trace;

/// Piece of a template literal
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    /// Literal text with escapes applied
    Str(String),
    /// Substitution source and the position of its first character
    Expr { source: String, start: SourcePosition },
}

/// Decoded literal payload
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TokenValue {
    #[default]
    None,
    Number(f64),
    Str(String),
    Template(Vec<TemplatePart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: SourceSpan,
    /// Raw lexeme
    pub text: String,
    pub value: TokenValue,
    /// A line terminator appeared between this token and the previous one
    pub newline_before: bool,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Identifier with the given spelling (contextual keywords)
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && self.text == word
    }
}

/// Scanner over one source fragment
pub struct Scanner<'a> {
    stream: CharStream<'a>,
    base: SourcePosition,
    saw_newline: bool,
}

/// Scan a whole source into tokens, ending with `Eof`
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Scanner::new(source).scan_all()
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::starting_at(source, SourcePosition::start())
    }

    /// Scanner whose first character sits at `base`
    pub fn starting_at(source: &'a str, base: SourcePosition) -> Self {
        Self {
            stream: CharStream::starting_at(source, base),
            base,
            saw_newline: false,
        }
    }

    pub fn scan_all(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        trace!(target: "tinker::lexer", count = tokens.len(), "scanned tokens");
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.saw_newline = false;
        self.skip_trivia()?;

        let start = self.stream.position();
        let Some(c) = self.stream.peek(0) else {
            return Ok(self.make(TokenKind::Eof, start, TokenValue::None));
        };

        match c {
            '"' | '\'' => self.scan_string(c),
            '`' => self.scan_template(),
            '0'..='9' => self.scan_number(),
            '.' if matches!(self.stream.peek(1), Some('0'..='9')) => self.scan_number(),
            c if is_identifier_start(c) => Ok(self.scan_word()),
            _ => self.scan_punctuator(c),
        }
    }

    fn make(&self, kind: TokenKind, start: SourcePosition, value: TokenValue) -> Token {
        let end = self.stream.position();
        Token {
            kind,
            span: SourceSpan::range(start, end),
            text: self.stream.slice(self.base, start, end).to_string(),
            value,
            newline_before: self.saw_newline,
        }
    }

    fn error(&self, kind: LexErrorKind, at: SourcePosition) -> LexError {
        LexError::new(kind, at)
    }

    /// Skip whitespace and comments, noting line terminators
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        while let Some(c) = self.stream.peek(0) {
            if is_line_terminator(c) {
                self.saw_newline = true;
                self.stream.advance();
            } else if c.is_whitespace() || c == '\u{feff}' {
                self.stream.advance();
            } else if c == '/' && self.stream.peek(1) == Some('/') {
                while let Some(c) = self.stream.peek(0) {
                    if is_line_terminator(c) {
                        break;
                    }
                    self.stream.advance();
                }
            } else if c == '/' && self.stream.peek(1) == Some('*') {
                let start = self.stream.position();
                self.stream.advance();
                self.stream.advance();
                loop {
                    match self.stream.advance() {
                        Some('*') if self.stream.peek(0) == Some('/') => {
                            self.stream.advance();
                            break;
                        }
                        Some(c) if is_line_terminator(c) => self.saw_newline = true,
                        Some(_) => {}
                        None => return Err(self.error(LexErrorKind::UnterminatedComment, start)),
                    }
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn scan_word(&mut self) -> Token {
        let start = self.stream.position();
        while let Some(c) = self.stream.peek(0) {
            if !is_identifier_continue(c) {
                break;
            }
            self.stream.advance();
        }
        let text = self.stream.slice(self.base, start, self.stream.position());
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Identifier);
        self.make(kind, start, TokenValue::None)
    }

    fn scan_punctuator(&mut self, c: char) -> Result<Token, LexError> {
        let start = self.stream.position();
        for (text, kind) in PUNCTUATORS {
            if !self.lookahead_is(text) {
                continue;
            }
            // `a?.5:b` is a conditional, not optional chaining
            if *kind == TokenKind::QuestionDot && matches!(self.stream.peek(2), Some('0'..='9')) {
                continue;
            }
            for _ in 0..text.len() {
                self.stream.advance();
            }
            return Ok(self.make(*kind, start, TokenValue::None));
        }
        self.stream.advance();
        Err(self.error(LexErrorKind::InvalidChar(c), start))
    }

    fn lookahead_is(&self, text: &str) -> bool {
        text.chars()
            .enumerate()
            .all(|(i, expected)| self.stream.peek(i) == Some(expected))
    }

    fn scan_number(&mut self) -> Result<Token, LexError> {
        let start = self.stream.position();

        let radix = match (self.stream.peek(0), self.stream.peek(1)) {
            (Some('0'), Some('x' | 'X')) => Some(16),
            (Some('0'), Some('b' | 'B')) => Some(2),
            (Some('0'), Some('o' | 'O')) => Some(8),
            _ => None,
        };

        let value = if let Some(radix) = radix {
            self.stream.advance();
            self.stream.advance();
            let mut digits = String::new();
            while let Some(c) = self.stream.peek(0) {
                if c == '_' {
                    self.stream.advance();
                } else if c.is_digit(radix) {
                    digits.push(c);
                    self.stream.advance();
                } else {
                    break;
                }
            }
            if digits.is_empty() {
                return Err(self.error(LexErrorKind::InvalidNumber, start));
            }
            digits
                .chars()
                .fold(0.0, |acc, d| acc * radix as f64 + d.to_digit(radix).unwrap_or(0) as f64)
        } else {
            let mut literal = String::new();
            self.take_digits(&mut literal);
            if self.stream.peek(0) == Some('.') {
                literal.push('.');
                self.stream.advance();
                self.take_digits(&mut literal);
            }
            if matches!(self.stream.peek(0), Some('e' | 'E')) {
                let signed = matches!(self.stream.peek(1), Some('+' | '-'));
                let digit_at = if signed { 2 } else { 1 };
                if matches!(self.stream.peek(digit_at), Some('0'..='9')) {
                    literal.push('e');
                    self.stream.advance();
                    if signed {
                        if let Some(sign) = self.stream.advance() {
                            literal.push(sign);
                        }
                    }
                    self.take_digits(&mut literal);
                } else {
                    return Err(self.error(LexErrorKind::InvalidNumber, start));
                }
            }
            literal
                .parse::<f64>()
                .map_err(|_| self.error(LexErrorKind::InvalidNumber, start))?
        };

        // `3in` or `1n` are not numbers this language accepts
        if let Some(c) = self.stream.peek(0) {
            if is_identifier_start(c) {
                return Err(self.error(LexErrorKind::InvalidNumber, start));
            }
        }

        Ok(self.make(TokenKind::Number, start, TokenValue::Number(value)))
    }

    fn take_digits(&mut self, into: &mut String) {
        while let Some(c) = self.stream.peek(0) {
            if c.is_ascii_digit() {
                into.push(c);
                self.stream.advance();
            } else if c == '_' && matches!(self.stream.peek(1), Some('0'..='9')) {
                self.stream.advance();
            } else {
                break;
            }
        }
    }

    fn scan_string(&mut self, quote: char) -> Result<Token, LexError> {
        let start = self.stream.position();
        self.stream.advance();
        let mut cooked = String::new();
        loop {
            match self.stream.peek(0) {
                None => return Err(self.error(LexErrorKind::UnterminatedString, start)),
                Some(c) if c == quote => {
                    self.stream.advance();
                    break;
                }
                Some('\\') => {
                    self.stream.advance();
                    self.scan_escape(&mut cooked)?;
                }
                Some(c) if c == '\n' || c == '\r' => {
                    return Err(self.error(LexErrorKind::UnterminatedString, start))
                }
                Some(c) => {
                    cooked.push(c);
                    self.stream.advance();
                }
            }
        }
        Ok(self.make(TokenKind::String, start, TokenValue::Str(cooked)))
    }

    /// Decode one escape; the backslash is already consumed
    fn scan_escape(&mut self, into: &mut String) -> Result<(), LexError> {
        let at = self.stream.position();
        let Some(c) = self.stream.advance() else {
            return Err(self.error(LexErrorKind::InvalidEscape, at));
        };
        match c {
            'n' => into.push('\n'),
            't' => into.push('\t'),
            'r' => into.push('\r'),
            'b' => into.push('\u{8}'),
            'f' => into.push('\u{c}'),
            'v' => into.push('\u{b}'),
            '0' if !matches!(self.stream.peek(0), Some('0'..='9')) => into.push('\0'),
            'x' => {
                let code = self.hex_digits(2, at)?;
                into.push(char::from_u32(code).ok_or_else(|| self.error(LexErrorKind::InvalidEscape, at))?);
            }
            'u' => {
                let code = if self.stream.eat('{') {
                    let mut code = 0u32;
                    let mut count = 0;
                    while let Some(d) = self.stream.peek(0).and_then(|c| c.to_digit(16)) {
                        code = code.saturating_mul(16).saturating_add(d);
                        count += 1;
                        self.stream.advance();
                    }
                    if count == 0 || !self.stream.eat('}') {
                        return Err(self.error(LexErrorKind::InvalidEscape, at));
                    }
                    code
                } else {
                    let high = self.hex_digits(4, at)?;
                    // surrogate pair written as two escapes
                    if (0xD800..0xDC00).contains(&high)
                        && self.stream.peek(0) == Some('\\')
                        && self.stream.peek(1) == Some('u')
                    {
                        self.stream.advance();
                        self.stream.advance();
                        let low = self.hex_digits(4, at)?;
                        0x10000 + ((high - 0xD800) << 10) + (low.wrapping_sub(0xDC00) & 0x3ff)
                    } else {
                        high
                    }
                };
                into.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            '\r' => {
                self.stream.eat('\n');
            }
            c if is_line_terminator(c) => {}
            c => into.push(c),
        }
        Ok(())
    }

    fn hex_digits(&mut self, count: usize, at: SourcePosition) -> Result<u32, LexError> {
        let mut code = 0;
        for _ in 0..count {
            let digit = self
                .stream
                .peek(0)
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error(LexErrorKind::InvalidEscape, at))?;
            self.stream.advance();
            code = code * 16 + digit;
        }
        Ok(code)
    }

    fn scan_template(&mut self) -> Result<Token, LexError> {
        let start = self.stream.position();
        let newline_before = self.saw_newline;
        self.stream.advance();
        let mut parts = Vec::new();
        let mut cooked = String::new();
        loop {
            match self.stream.peek(0) {
                None => return Err(self.error(LexErrorKind::UnterminatedTemplate, start)),
                Some('`') => {
                    self.stream.advance();
                    break;
                }
                Some('\\') => {
                    self.stream.advance();
                    self.scan_escape(&mut cooked)?;
                }
                Some('$') if self.stream.peek(1) == Some('{') => {
                    self.stream.advance();
                    self.stream.advance();
                    parts.push(TemplatePart::Str(std::mem::take(&mut cooked)));
                    let expr_start = self.stream.position();
                    self.skip_balanced(start)?;
                    let expr_end = self.stream.position();
                    let source = self.stream.slice(self.base, expr_start, expr_end).to_string();
                    self.stream.advance(); // closing brace
                    parts.push(TemplatePart::Expr {
                        source,
                        start: expr_start,
                    });
                }
                Some('\r') => {
                    // template text normalizes CRLF to LF
                    self.stream.advance();
                    self.stream.eat('\n');
                    cooked.push('\n');
                }
                Some(c) => {
                    cooked.push(c);
                    self.stream.advance();
                }
            }
        }
        parts.push(TemplatePart::Str(cooked));
        self.saw_newline = newline_before;
        Ok(self.make(TokenKind::Template, start, TokenValue::Template(parts)))
    }

    /// Skip a substitution body up to (not including) its closing brace
    fn skip_balanced(&mut self, template_start: SourcePosition) -> Result<(), LexError> {
        let mut depth = 0usize;
        loop {
            let Some(c) = self.stream.peek(0) else {
                return Err(self.error(LexErrorKind::UnterminatedTemplate, template_start));
            };
            match c {
                '}' if depth == 0 => return Ok(()),
                '}' => {
                    depth -= 1;
                    self.stream.advance();
                }
                '{' => {
                    depth += 1;
                    self.stream.advance();
                }
                '"' | '\'' => {
                    self.scan_string(c)?;
                }
                '`' => {
                    self.scan_template()?;
                }
                '/' if matches!(self.stream.peek(1), Some('/' | '*')) => {
                    self.skip_trivia()?;
                }
                _ => {
                    self.stream.advance();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            kinds("const x = 1;"),
            vec![
                TokenKind::Const,
                TokenKind::Identifier,
                TokenKind::Equal,
                TokenKind::Number,
                TokenKind::Semicolon,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_longest_punctuator() {
        assert_eq!(
            kinds("a >>>= b ?? c?.d"),
            vec![
                TokenKind::Identifier,
                TokenKind::GreaterGreaterGreaterEqual,
                TokenKind::Identifier,
                TokenKind::QuestionQuestion,
                TokenKind::Identifier,
                TokenKind::QuestionDot,
                TokenKind::Identifier,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_conditional_with_decimal() {
        assert_eq!(
            kinds("a?.5:1"),
            vec![
                TokenKind::Identifier,
                TokenKind::Question,
                TokenKind::Number,
                TokenKind::Colon,
                TokenKind::Number,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_numbers() {
        let tokens = tokenize("0xff 1_000 .5 2e3 0b101").unwrap();
        let values: Vec<f64> = tokens
            .iter()
            .filter_map(|t| match t.value {
                TokenValue::Number(n) => Some(n),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![255.0, 1000.0, 0.5, 2000.0, 5.0]);
    }

    #[test]
    fn test_string_escapes() {
        let tokens = tokenize(r#""a\nA\x42\u{1F600}""#).unwrap();
        assert_eq!(tokens[0].value, TokenValue::Str("a\nAB\u{1F600}".to_string()));
    }

    #[test]
    fn test_newline_before_and_comments() {
        let tokens = tokenize("a // note\n/* x\ny */ b").unwrap();
        assert!(!tokens[0].newline_before);
        assert!(tokens[1].newline_before);
        assert_eq!(tokens[1].text, "b");
        assert_eq!(tokens[1].span.start.line, 3);
    }

    #[test]
    fn test_template_parts() {
        let tokens = tokenize("`a${ {b: 1}.b }c${`d${e}`}`").unwrap();
        let TokenValue::Template(parts) = &tokens[0].value else {
            panic!("expected template");
        };
        assert_eq!(parts.len(), 5);
        assert_eq!(parts[0], TemplatePart::Str("a".to_string()));
        match &parts[1] {
            TemplatePart::Expr { source, start } => {
                assert_eq!(source, " {b: 1}.b ");
                assert_eq!(start.byte_offset, 4);
            }
            other => panic!("unexpected part {:?}", other),
        }
        assert_eq!(parts[2], TemplatePart::Str("c".to_string()));
    }

    #[test]
    fn test_errors() {
        assert_eq!(
            tokenize("'abc").unwrap_err().kind,
            LexErrorKind::UnterminatedString
        );
        assert_eq!(tokenize("a # b").unwrap_err().kind, LexErrorKind::InvalidChar('#'));
        assert_eq!(tokenize("/* open").unwrap_err().kind, LexErrorKind::UnterminatedComment);
        assert_eq!(tokenize("3in").unwrap_err().kind, LexErrorKind::InvalidNumber);
    }
}
