use std::fmt;

use crate::runtime::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Literals (payload lives in `Token::literal`)
    Number, // ints, doubles, and the `true` / `false` literals
    Str,
    Ident,

    // Keywords
    Function,
    Return,
    If,
    Else,
    While,
    For,

    // Operators
    Eq,     // =
    Plus,   // +
    Minus,  // -
    Star,   // *
    Slash,  // /
    Lt,     // <
    LtEq,   // <=
    Gt,     // >
    GtEq,   // >=
    EqEq,   // ==
    BangEq, // !=

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    Comma,     // ,
    Semicolon, // ;
    Dot,       // .

    Eof,
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Number | Self::Str)
    }

    pub fn is_arithmetic(&self) -> bool {
        matches!(self, Self::Plus | Self::Minus | Self::Star | Self::Slash)
    }

    pub fn is_comparison(&self) -> bool {
        matches!(self, Self::EqEq | Self::BangEq | Self::Lt | Self::LtEq | Self::Gt | Self::GtEq)
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Function | Self::Return | Self::If | Self::Else | Self::While | Self::For
        )
    }

    /// Binding power of infix operators, higher binds tighter.
    /// Comparisons are ranked even though no production consumes them.
    pub fn precedence(&self) -> Option<u8> {
        match self {
            Self::Eq => Some(1),
            Self::EqEq | Self::BangEq => Some(2),
            Self::Lt | Self::LtEq | Self::Gt | Self::GtEq => Some(3),
            Self::Plus | Self::Minus => Some(4),
            Self::Star | Self::Slash => Some(5),
            _ => None,
        }
    }

    /// Source spelling for fixed tokens, used in diagnostics.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Str => "string",
            Self::Ident => "identifier",
            Self::Function => "`function`",
            Self::Return => "`return`",
            Self::If => "`if`",
            Self::Else => "`else`",
            Self::While => "`while`",
            Self::For => "`for`",
            Self::Eq => "`=`",
            Self::Plus => "`+`",
            Self::Minus => "`-`",
            Self::Star => "`*`",
            Self::Slash => "`/`",
            Self::Lt => "`<`",
            Self::LtEq => "`<=`",
            Self::Gt => "`>`",
            Self::GtEq => "`>=`",
            Self::EqEq => "`==`",
            Self::BangEq => "`!=`",
            Self::LParen => "`(`",
            Self::RParen => "`)`",
            Self::LBrace => "`{`",
            Self::RBrace => "`}`",
            Self::Comma => "`,`",
            Self::Semicolon => "`;`",
            Self::Dot => "`.`",
            Self::Eof => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Maps an identifier to its keyword token, or `Ident`.
/// `true` / `false` are handled by the lexer since they carry a literal.
pub fn keyword_or_ident(s: &str) -> TokenKind {
    match s {
        "function" => TokenKind::Function,
        "return"   => TokenKind::Return,
        "if"       => TokenKind::If,
        "else"     => TokenKind::Else,
        "while"    => TokenKind::While,
        "for"      => TokenKind::For,
        _          => TokenKind::Ident,
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub literal: Option<Value>,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, line: usize, column: usize) -> Self {
        Self { kind, lexeme: lexeme.into(), literal: None, line, column }
    }

    pub fn with_literal(mut self, literal: Value) -> Self {
        self.literal = Some(literal);
        self
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::Number | TokenKind::Str | TokenKind::Ident => write!(f, "`{}`", self.lexeme),
            kind => write!(f, "{kind}"),
        }
    }
}
