use std::mem;
use std::rc::Rc;

use crate::error::{Error, ErrorCode};
use crate::stack::ensure_sufficient_stack;
use crate::syntax::ast::*;
use crate::syntax::token::{Token, TokenKind};

/// Maximum number of parameters in a declaration or arguments in a call.
pub const MAX_ARGS: usize = 255;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().is_none_or(|t| t.kind != TokenKind::Eof) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenKind::Eof, "", line, column));
        }
        Self { tokens, pos: 0 }
    }

    /// Parse exactly one statement. `None` for empty input; any tokens left
    /// after the statement are an error.
    pub fn parse_one(mut self) -> Result<Option<Stmt>, Vec<Error>> {
        if self.is_at_end() {
            return Ok(None);
        }
        let stmt = self.parse_stmt().map_err(|e| vec![e])?;
        if !self.is_at_end() {
            let tok = self.peek();
            return Err(vec![Error::new(ErrorCode::P001, tok.line, tok.column,
                format!("unexpected {tok} after statement"))]);
        }
        Ok(Some(stmt))
    }

    /// Parse every statement. Errors are collected across the whole input;
    /// if there is any, no statements are returned.
    pub fn parse_all(mut self) -> Result<Vec<Stmt>, Vec<Error>> {
        let mut errors = Vec::new();
        let mut stmts = Vec::new();

        while !self.is_at_end() {
            let pos_before = self.pos;

            match self.parse_stmt() {
                Ok(s) => stmts.push(s),
                Err(e) => {
                    tracing::debug!(line = e.line, column = e.column, "parse error: {}", e.message);
                    errors.push(e);
                    self.recover();
                }
            }

            // guarantee progress on tokens `recover` stops at
            if self.pos == pos_before {
                self.advance();
            }
        }

        if errors.is_empty() { Ok(stmts) } else { Err(errors) }
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    fn parse_stmt(&mut self) -> Result<Stmt, Error> {
        ensure_sufficient_stack(|| match self.peek_kind() {
            TokenKind::Function => self.parse_function(),
            TokenKind::Return   => self.parse_return(),
            TokenKind::LBrace   => {
                let span = self.span();
                let body = self.parse_block("to start block")?;
                Ok(Stmt::Block(body, span))
            }
            _ => {
                let expr = self.parse_expr()?;
                self.matches(TokenKind::Semicolon);
                Ok(Stmt::Expression(expr))
            }
        })
    }

    fn parse_function(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Function, "")?;
        let name = self.expect_ident("function name")?;
        self.expect(TokenKind::LParen, "after function name")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    return Err(self.error_here(ErrorCode::P004,
                        format!("cannot have more than {MAX_ARGS} parameters")));
                }
                params.push(self.expect_ident("parameter name")?);
                if !self.matches(TokenKind::Comma) { break; }
            }
        }
        self.expect(TokenKind::RParen, "after parameters")?;

        let body = self.parse_block("before function body")?;
        Ok(Stmt::Function(Rc::new(FnDecl { name, params, body, span })))
    }

    fn parse_return(&mut self) -> Result<Stmt, Error> {
        let span = self.span();
        self.expect(TokenKind::Return, "")?;
        let value = if self.check(TokenKind::Semicolon) || self.check(TokenKind::RBrace) || self.is_at_end() {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.matches(TokenKind::Semicolon);
        Ok(Stmt::Return(value, span))
    }

    fn parse_block(&mut self, context: &str) -> Result<Vec<Stmt>, Error> {
        self.expect(TokenKind::LBrace, context)?;
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
        }
        self.expect(TokenKind::RBrace, "after block")?;
        Ok(stmts)
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        ensure_sufficient_stack(|| self.parse_assignment())
    }

    fn parse_assignment(&mut self) -> Result<Expr, Error> {
        let mut target = self.parse_addition()?;

        if self.check(TokenKind::Eq) {
            let eq = self.advance();
            let value = Box::new(self.parse_expr()?);
            return match &mut target {
                Expr::Variable(name, span) => Ok(Expr::Assign { name: mem::take(name), value, span: *span }),
                Expr::Get { object, name, span } => Ok(Expr::Set {
                    object: mem::replace(object, Box::new(Expr::hole())),
                    name: mem::take(name),
                    value,
                    span: *span,
                }),
                _ => Err(Error::new(ErrorCode::P003, eq.line, eq.column, "invalid assignment target")),
            };
        }

        Ok(target)
    }

    fn parse_addition(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplication()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                kind if kind.is_comparison() => {
                    return Err(self.error_here(ErrorCode::P005,
                        format!("comparison operator {kind} is not supported")));
                }
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_multiplication()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_multiplication(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_call()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star  => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                _ => break,
            };
            let span = left.span();
            self.advance();
            let right = self.parse_call()?;
            left = Expr::Binary { left: Box::new(left), op, right: Box::new(right), span };
        }
        Ok(left)
    }

    fn parse_call(&mut self) -> Result<Expr, Error> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    let span = expr.span();
                    self.advance();
                    let args = self.parse_arg_list()?;
                    self.expect(TokenKind::RParen, "after arguments")?;
                    expr = Expr::Call { callee: Box::new(expr), args, span };
                }
                TokenKind::Dot => {
                    let span = expr.span();
                    self.advance();
                    let name = self.expect_ident("property name after `.`")?;
                    expr = Expr::Get { object: Box::new(expr), name, span };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, Error> {
        let mut args = Vec::new();
        if self.check(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            if args.len() >= MAX_ARGS {
                return Err(self.error_here(ErrorCode::P004,
                    format!("cannot have more than {MAX_ARGS} arguments")));
            }
            args.push(self.parse_expr()?);
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        let span = Span::new(tok.line, tok.column);

        match tok.kind {
            TokenKind::Number | TokenKind::Str => {
                self.advance();
                match tok.literal {
                    Some(value) => Ok(Expr::Literal(value, span)),
                    None => Err(Error::new(ErrorCode::P001, tok.line, tok.column,
                        format!("literal {tok} carries no value"))),
                }
            }
            TokenKind::Ident => {
                self.advance();
                Ok(Expr::Variable(tok.lexeme, span))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen, "after expression")?;
                Ok(expr)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, Error> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let tok = self.peek();
        let message = if context.is_empty() {
            format!("expected {kind}, found {tok}")
        } else {
            format!("expected {kind} {context}, found {tok}")
        };
        Err(Error::new(ErrorCode::P002, tok.line, tok.column, message))
    }

    fn expect_ident(&mut self, what: &str) -> Result<String, Error> {
        if self.check(TokenKind::Ident) {
            return Ok(self.advance().lexeme);
        }
        let tok = self.peek();
        Err(Error::new(ErrorCode::P002, tok.line, tok.column, format!("expected {what}, found {tok}")))
    }

    fn is_at_end(&self) -> bool {
        self.check(TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(ErrorCode::P001, tok.line, tok.column, format!("expected {expected}, found {tok}"))
    }

    fn error_here(&self, code: ErrorCode, message: String) -> Error {
        let tok = self.peek();
        Error::new(code, tok.line, tok.column, message)
    }

    /// Skip to the next plausible statement start after an error.
    fn recover(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Semicolon => { self.advance(); break; }
                TokenKind::Eof
                | TokenKind::Function
                | TokenKind::Return
                | TokenKind::RBrace => break,
                _ => { self.advance(); }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
