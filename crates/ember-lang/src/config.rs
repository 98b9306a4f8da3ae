//! Interpreter configuration.

use crate::error::Error;

/// How the lexer treats recoverable problems (stray characters, unterminated
/// strings). Malformed numeric literals are fatal in both modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexMode {
    /// Any diagnostic fails the scan.
    #[default]
    Strict,
    /// Diagnostics are logged and collected; the offending input is skipped.
    Lenient,
}

impl LexMode {
    /// Whether `diagnostics` fail the scan under this mode.
    pub fn is_fatal(self, diagnostics: &[Error]) -> bool {
        match self {
            LexMode::Strict => !diagnostics.is_empty(),
            LexMode::Lenient => diagnostics.iter().any(|e| !e.code.is_recoverable()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub lex_mode: LexMode,
    /// Maximum nesting of function calls before `StackOverflow` is raised.
    pub max_call_depth: usize,
}

impl Config {
    pub const DEFAULT_MAX_CALL_DEPTH: usize = 1000;

    pub fn with_lex_mode(mut self, mode: LexMode) -> Self {
        self.lex_mode = mode;
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self { lex_mode: LexMode::Strict, max_call_depth: Self::DEFAULT_MAX_CALL_DEPTH }
    }
}
