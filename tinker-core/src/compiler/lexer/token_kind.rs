//! Token kinds of the script language

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TokenKind {
    // keywords
    Var,
    Let,
    Const,
    Function,
    Return,
    If,
    Else,
    While,
    Do,
    For,
    In,
    Break,
    Continue,
    Switch,
    Case,
    Default,
    Throw,
    Try,
    Catch,
    Finally,
    New,
    Typeof,
    Instanceof,
    Delete,
    Void,
    True,
    False,
    Null,

    // reserved words this language does not support
    This,
    Class,
    Async,
    Await,
    Yield,
    Import,
    Export,
    Enum,
    Extends,
    Super,

    // literals
    Number,
    String,
    Template,
    Identifier,

    // brackets and separators
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Semicolon,
    Comma,
    Dot,
    Ellipsis,
    QuestionDot,
    Question,
    Colon,
    Arrow,

    // operators
    Equal,
    EqualEqual,
    EqualEqualEqual,
    Bang,
    BangEqual,
    BangEqualEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    LessLess,
    GreaterGreater,
    GreaterGreaterGreater,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    Percent,
    PlusPlus,
    MinusMinus,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    QuestionQuestion,

    // compound assignment
    PlusEqual,
    MinusEqual,
    StarEqual,
    StarStarEqual,
    SlashEqual,
    PercentEqual,
    LessLessEqual,
    GreaterGreaterEqual,
    GreaterGreaterGreaterEqual,
    AmpEqual,
    PipeEqual,
    CaretEqual,
    AmpAmpEqual,
    PipePipeEqual,
    QuestionQuestionEqual,

    #[default]
    Eof,
}

/// Keyword lookup table
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("var", TokenKind::Var),
    ("let", TokenKind::Let),
    ("const", TokenKind::Const),
    ("function", TokenKind::Function),
    ("return", TokenKind::Return),
    ("if", TokenKind::If),
    ("else", TokenKind::Else),
    ("while", TokenKind::While),
    ("do", TokenKind::Do),
    ("for", TokenKind::For),
    ("in", TokenKind::In),
    ("break", TokenKind::Break),
    ("continue", TokenKind::Continue),
    ("switch", TokenKind::Switch),
    ("case", TokenKind::Case),
    ("default", TokenKind::Default),
    ("throw", TokenKind::Throw),
    ("try", TokenKind::Try),
    ("catch", TokenKind::Catch),
    ("finally", TokenKind::Finally),
    ("new", TokenKind::New),
    ("typeof", TokenKind::Typeof),
    ("instanceof", TokenKind::Instanceof),
    ("delete", TokenKind::Delete),
    ("void", TokenKind::Void),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("null", TokenKind::Null),
    ("this", TokenKind::This),
    ("class", TokenKind::Class),
    ("async", TokenKind::Async),
    ("await", TokenKind::Await),
    ("yield", TokenKind::Yield),
    ("import", TokenKind::Import),
    ("export", TokenKind::Export),
    ("enum", TokenKind::Enum),
    ("extends", TokenKind::Extends),
    ("super", TokenKind::Super),
];

/// Punctuators, longest first so the scanner can take the first match
pub const PUNCTUATORS: &[(&str, TokenKind)] = &[
    (">>>=", TokenKind::GreaterGreaterGreaterEqual),
    ("===", TokenKind::EqualEqualEqual),
    ("!==", TokenKind::BangEqualEqual),
    ("**=", TokenKind::StarStarEqual),
    ("<<=", TokenKind::LessLessEqual),
    (">>=", TokenKind::GreaterGreaterEqual),
    (">>>", TokenKind::GreaterGreaterGreater),
    ("&&=", TokenKind::AmpAmpEqual),
    ("||=", TokenKind::PipePipeEqual),
    ("??=", TokenKind::QuestionQuestionEqual),
    ("...", TokenKind::Ellipsis),
    ("=>", TokenKind::Arrow),
    ("==", TokenKind::EqualEqual),
    ("!=", TokenKind::BangEqual),
    ("<=", TokenKind::LessEqual),
    (">=", TokenKind::GreaterEqual),
    ("<<", TokenKind::LessLess),
    (">>", TokenKind::GreaterGreater),
    ("**", TokenKind::StarStar),
    ("++", TokenKind::PlusPlus),
    ("--", TokenKind::MinusMinus),
    ("+=", TokenKind::PlusEqual),
    ("-=", TokenKind::MinusEqual),
    ("*=", TokenKind::StarEqual),
    ("/=", TokenKind::SlashEqual),
    ("%=", TokenKind::PercentEqual),
    ("&=", TokenKind::AmpEqual),
    ("|=", TokenKind::PipeEqual),
    ("^=", TokenKind::CaretEqual),
    ("&&", TokenKind::AmpAmp),
    ("||", TokenKind::PipePipe),
    ("??", TokenKind::QuestionQuestion),
    ("?.", TokenKind::QuestionDot),
    ("(", TokenKind::LeftParen),
    (")", TokenKind::RightParen),
    ("{", TokenKind::LeftBrace),
    ("}", TokenKind::RightBrace),
    ("[", TokenKind::LeftBracket),
    ("]", TokenKind::RightBracket),
    (";", TokenKind::Semicolon),
    (",", TokenKind::Comma),
    (".", TokenKind::Dot),
    ("?", TokenKind::Question),
    (":", TokenKind::Colon),
    ("=", TokenKind::Equal),
    ("!", TokenKind::Bang),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
    ("+", TokenKind::Plus),
    ("-", TokenKind::Minus),
    ("*", TokenKind::Star),
    ("/", TokenKind::Slash),
    ("%", TokenKind::Percent),
    ("&", TokenKind::Amp),
    ("|", TokenKind::Pipe),
    ("^", TokenKind::Caret),
    ("~", TokenKind::Tilde),
];

impl TokenKind {
    pub fn keyword(text: &str) -> Option<TokenKind> {
        KEYWORDS
            .iter()
            .find(|(word, _)| *word == text)
            .map(|(_, kind)| *kind)
    }

    pub fn is_keyword(self) -> bool {
        KEYWORDS.iter().any(|(_, kind)| *kind == self)
    }

    /// Assignment operators, including compound ones
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::StarStarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
                | TokenKind::LessLessEqual
                | TokenKind::GreaterGreaterEqual
                | TokenKind::GreaterGreaterGreaterEqual
                | TokenKind::AmpEqual
                | TokenKind::PipeEqual
                | TokenKind::CaretEqual
                | TokenKind::AmpAmpEqual
                | TokenKind::PipePipeEqual
                | TokenKind::QuestionQuestionEqual
        )
    }

    /// Binary operator a compound assignment applies
    pub fn compound_operator(self) -> Option<TokenKind> {
        let op = match self {
            TokenKind::PlusEqual => TokenKind::Plus,
            TokenKind::MinusEqual => TokenKind::Minus,
            TokenKind::StarEqual => TokenKind::Star,
            TokenKind::StarStarEqual => TokenKind::StarStar,
            TokenKind::SlashEqual => TokenKind::Slash,
            TokenKind::PercentEqual => TokenKind::Percent,
            TokenKind::LessLessEqual => TokenKind::LessLess,
            TokenKind::GreaterGreaterEqual => TokenKind::GreaterGreater,
            TokenKind::GreaterGreaterGreaterEqual => TokenKind::GreaterGreaterGreater,
            TokenKind::AmpEqual => TokenKind::Amp,
            TokenKind::PipeEqual => TokenKind::Pipe,
            TokenKind::CaretEqual => TokenKind::Caret,
            TokenKind::AmpAmpEqual => TokenKind::AmpAmp,
            TokenKind::PipePipeEqual => TokenKind::PipePipe,
            TokenKind::QuestionQuestionEqual => TokenKind::QuestionQuestion,
            _ => return None,
        };
        Some(op)
    }

    /// Source spelling for punctuators and keywords
    pub fn lexeme(self) -> Option<&'static str> {
        PUNCTUATORS
            .iter()
            .chain(KEYWORDS.iter())
            .find(|(_, kind)| *kind == self)
            .map(|(text, _)| *text)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Number => write!(f, "number"),
            TokenKind::String => write!(f, "string"),
            TokenKind::Template => write!(f, "template"),
            TokenKind::Identifier => write!(f, "identifier"),
            TokenKind::Eof => write!(f, "end of file"),
            other => match other.lexeme() {
                Some(text) => write!(f, "{}", text),
                None => write!(f, "{:?}", other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(TokenKind::keyword("const"), Some(TokenKind::Const));
        assert_eq!(TokenKind::keyword("of"), None);
        assert!(TokenKind::Typeof.is_keyword());
    }

    #[test]
    fn test_punctuators_longest_first() {
        for (i, (text, _)) in PUNCTUATORS.iter().enumerate() {
            for (later, _) in &PUNCTUATORS[i + 1..] {
                assert!(
                    !later.starts_with(text) || later.len() <= text.len(),
                    "'{}' shadows '{}'",
                    text,
                    later
                );
            }
        }
    }

    #[test]
    fn test_compound_operator() {
        assert_eq!(TokenKind::PlusEqual.compound_operator(), Some(TokenKind::Plus));
        assert_eq!(TokenKind::Equal.compound_operator(), None);
        assert!(TokenKind::QuestionQuestionEqual.is_assignment());
    }

    #[test]
    fn test_display() {
        assert_eq!(TokenKind::Arrow.to_string(), "=>");
        assert_eq!(TokenKind::Return.to_string(), "return");
        assert_eq!(TokenKind::Eof.to_string(), "end of file");
    }
}
