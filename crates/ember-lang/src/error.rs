use std::fmt;

/// Error codes prefixed by phase: L = lexer, P = parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCode {
    // Lexer
    L001, // unexpected character
    L002, // unterminated string literal
    L003, // malformed numeric literal

    // Parser
    P001, // unexpected token
    P002, // missing expected token
    P003, // invalid assignment target
    P004, // too many parameters or arguments
    P005, // comparison operator is not supported
}

impl ErrorCode {
    /// Recoverable codes are reported and skipped when the lexer runs leniently.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::L001 | Self::L002)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::L001 => "L001",
            Self::L002 => "L002",
            Self::L003 => "L003",
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
            Self::P004 => "P004",
            Self::P005 => "P005",
        }
    }
}

/// A lexing or parsing diagnostic anchored at a source position.
#[derive(Debug, Clone, thiserror::Error)]
#[error("[{}] {line}:{column}: {message}", .code.as_str())]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, column: usize, message: impl Into<String>) -> Self {
        Self { code, line, column, message: message.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorKind {
    /// Read of a name no enclosing scope defines.
    Name,
    /// Operand mismatch, calling a non-function, missing or rejected member.
    Type,
    /// Argument count differs from parameter count.
    Arity,
    DivisionByZero,
    /// Integer arithmetic left the i64 range.
    Overflow,
    /// Call depth exceeded `Config::max_call_depth`.
    StackOverflow,
}

impl fmt::Display for RuntimeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Name => "name error",
            Self::Type => "type error",
            Self::Arity => "arity error",
            Self::DivisionByZero => "division by zero",
            Self::Overflow => "overflow",
            Self::StackOverflow => "stack overflow",
        })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("[runtime] {line}: {kind}: {message}")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Source line of the failing node; 0 when raised by host code.
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, line: usize, message: impl Into<String>) -> Self {
        Self { kind, line, message: message.into() }
    }

    /// Convenience for host closures (setters, methods, native functions)
    /// that reject a value. The interpreter fills in the line.
    pub fn host(message: impl Into<String>) -> Self {
        Self::new(RuntimeErrorKind::Type, 0, message)
    }

    pub(crate) fn at_line(mut self, line: usize) -> Self {
        if self.line == 0 {
            self.line = line;
        }
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// Everything `evaluate` / `execute` can fail with.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScriptError {
    #[error("lex error: {}", join(.0))]
    Lex(Vec<Error>),
    #[error("parse error: {}", join(.0))]
    Parse(Vec<Error>),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl ScriptError {
    pub fn runtime_kind(&self) -> Option<RuntimeErrorKind> {
        match self {
            Self::Runtime(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Lex or parse diagnostics carried by this error, empty for runtime failures.
    pub fn diagnostics(&self) -> &[Error] {
        match self {
            Self::Lex(errs) | Self::Parse(errs) => errs,
            Self::Runtime(_) => &[],
        }
    }
}

fn join(errors: &[Error]) -> String {
    errors.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
}
