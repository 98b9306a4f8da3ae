pub mod config;
pub mod error;
pub mod runtime;
pub mod syntax;
pub mod types;

mod stack;

pub use config::{Config, LexMode};
pub use error::{Error, ErrorCode, RuntimeError, RuntimeErrorKind, ScriptError};
pub use runtime::env::{Env, Environment};
pub use runtime::interpreter::{Flow, Interpreter};
pub use runtime::value::{Function, Value};
pub use syntax::token::{Token, TokenKind};
pub use types::object::{NativeObject, ObjectHandle};

use syntax::ast::Stmt;

// ─── Public API ───────────────────────────────────────────────────────────────

/// Tokenize `source` with the default (strict) lexer.
pub fn tokenize(source: &str) -> Result<Vec<Token>, Vec<Error>> {
    syntax::lexer::Lexer::new(source).tokenize()
}

/// Lex and parse a whole program without running it.
pub fn parse(source: &str) -> Result<Vec<Stmt>, ScriptError> {
    let tokens = tokenize(source).map_err(ScriptError::Lex)?;
    syntax::parser::Parser::new(tokens).parse_all().map_err(ScriptError::Parse)
}
