use std::fmt;

/// Byte range of a token in the scanned source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(&self, other: &Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Token kinds the module scanner cares about.
///
/// Everything outside of the module grammar (operators, JSX angle brackets,
/// arithmetic) collapses into `Punct` so that half-typed editor content still
/// tokenizes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords that start or shape module items
    Import,
    Export,
    From,
    As,
    Default,
    Type,
    Interface,
    Function,
    Class,
    Const,
    Let,
    Var,
    Enum,
    Async,
    Declare,
    Abstract,
    Namespace,

    // Literals
    StringLiteral,
    TemplateLiteral,
    NumberLiteral,

    // Identifier
    Identifier,

    // Delimiters
    LParen,            // (
    RParen,            // )
    LBrace,            // {
    RBrace,            // }
    LBracket,          // [
    RBracket,          // ]
    Semicolon,         // ;
    Comma,             // ,
    Dot,               // .
    DotDotDot,         // ...
    Colon,             // :
    Star,              // *
    Eq,                // =
    Lt,                // <
    Gt,                // >

    /// Any other single operator character
    Punct,

    // Special
    Eof,
    Error,
}

impl TokenKind {
    /// Keywords that may still be used as binding names in `import { x }`
    /// or `export { x }` lists.
    pub fn is_word(&self) -> bool {
        !matches!(
            self,
            TokenKind::StringLiteral
                | TokenKind::TemplateLiteral
                | TokenKind::NumberLiteral
                | TokenKind::LParen
                | TokenKind::RParen
                | TokenKind::LBrace
                | TokenKind::RBrace
                | TokenKind::LBracket
                | TokenKind::RBracket
                | TokenKind::Semicolon
                | TokenKind::Comma
                | TokenKind::Dot
                | TokenKind::DotDotDot
                | TokenKind::Colon
                | TokenKind::Star
                | TokenKind::Eq
                | TokenKind::Lt
                | TokenKind::Gt
                | TokenKind::Punct
                | TokenKind::Eof
                | TokenKind::Error
        )
    }
}

/// Represents a token with its kind, span, and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub value: String,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, span: Span, value: String) -> Self {
        Self { kind, span, value }
    }
}
