use crate::config::LexMode;
use crate::error::{Error, ErrorCode};
use crate::runtime::value::Value;
use crate::syntax::token::{Token, TokenKind, keyword_or_ident};

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    mode: LexMode,
    start: usize,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            bytes: source.as_bytes(),
            mode: LexMode::default(),
            start: 0,
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    pub fn with_mode(mut self, mode: LexMode) -> Self {
        self.mode = mode;
        self
    }

    /// Tokens, or every diagnostic that the current mode treats as fatal.
    /// In lenient mode recoverable diagnostics are logged and dropped; use
    /// [`Lexer::scan`] to keep them.
    pub fn tokenize(self) -> Result<Vec<Token>, Vec<Error>> {
        let mode = self.mode;
        let (tokens, diagnostics) = self.scan();
        if mode.is_fatal(&diagnostics) { Err(diagnostics) } else { Ok(tokens) }
    }

    /// Single pass over the whole input. Always returns a token stream ending
    /// in `Eof`, alongside the diagnostics raised on the way.
    pub fn scan(mut self) -> (Vec<Token>, Vec<Error>) {
        let mut tokens = Vec::new();
        let mut diagnostics = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.line, self.column));
                break;
            }

            match self.next_token() {
                Ok(Some(tok)) => tokens.push(tok),
                Ok(None) => {}
                Err(e) => {
                    if self.mode == LexMode::Lenient && e.code.is_recoverable() {
                        tracing::warn!(code = e.code.as_str(), line = e.line, column = e.column, "{}", e.message);
                    }
                    diagnostics.push(e);
                }
            }
        }

        (tokens, diagnostics)
    }

    fn next_token(&mut self) -> Result<Option<Token>, Error> {
        self.start = self.pos;
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'.' => TokenKind::Dot,

            b'/' => {
                if self.peek() == b'/' { self.skip_line(); return Ok(None); }
                else { TokenKind::Slash }
            }
            b'=' => {
                if self.peek() == b'=' { self.advance(); TokenKind::EqEq }
                else { TokenKind::Eq }
            }
            b'!' => {
                if self.peek() == b'=' { self.advance(); TokenKind::BangEq }
                else {
                    return Err(Error::new(ErrorCode::L001, line, col,
                        "expected `!=`, bare `!` is not valid"));
                }
            }
            b'<' => {
                if self.peek() == b'=' { self.advance(); TokenKind::LtEq }
                else { TokenKind::Lt }
            }
            b'>' => {
                if self.peek() == b'=' { self.advance(); TokenKind::GtEq }
                else { TokenKind::Gt }
            }

            b'\'' => {
                let s = self.read_string(line, col)?;
                return Ok(Some(self.token(TokenKind::Str, line, col).with_literal(Value::Str(s))));
            }
            b'0'..=b'9' => {
                let value = self.read_number(line, col)?;
                return Ok(Some(self.token(TokenKind::Number, line, col).with_literal(value)));
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                self.read_ident();
                let text = &self.source[self.start..self.pos];
                let tok = match text {
                    "true" => self.token(TokenKind::Number, line, col).with_literal(Value::Bool(true)),
                    "false" => self.token(TokenKind::Number, line, col).with_literal(Value::Bool(false)),
                    _ => self.token(keyword_or_ident(text), line, col),
                };
                return Ok(Some(tok));
            }

            other => {
                // Consume the rest of a multi-byte character so the error names it whole.
                while !self.is_at_end() && (self.peek() & 0xC0) == 0x80 { self.advance(); }
                let text = String::from_utf8_lossy(&self.bytes[self.start..self.pos]).into_owned();
                let shown = if other.is_ascii() { (other as char).to_string() } else { text };
                return Err(Error::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{shown}`")));
            }
        };

        Ok(Some(self.token(kind, line, col)))
    }

    fn token(&self, kind: TokenKind, line: usize, col: usize) -> Token {
        Token::new(kind, &self.source[self.start..self.pos], line, col)
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let ch = self.bytes[self.pos];
        self.pos += 1;
        if ch == b'\n' { self.line += 1; self.column = 1; }
        else if (ch & 0xC0) != 0x80 { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.bytes[self.pos] }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.bytes.len() { 0 } else { self.bytes[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => { self.advance(); }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' { self.advance(); }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    /// Body of a single-quoted string. No escapes; newlines are allowed.
    fn read_string(&mut self, start_line: usize, start_col: usize) -> Result<String, Error> {
        let body_start = self.pos;
        while !self.is_at_end() && self.peek() != b'\'' {
            self.advance();
        }
        if self.is_at_end() {
            return Err(Error::new(ErrorCode::L002, start_line, start_col,
                "unterminated string literal"));
        }
        let s = self.source[body_start..self.pos].to_string();
        self.advance(); // closing '
        Ok(s)
    }

    fn read_number(&mut self, line: usize, col: usize) -> Result<Value, Error> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        // a `.` only starts a fraction when a digit follows
        let is_double = self.peek() == b'.' && self.peek_next().is_ascii_digit();
        if is_double {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text = &self.source[self.start..self.pos];
        if is_double {
            match text.parse::<f64>() {
                Ok(x) if x.is_finite() => Ok(Value::Double(x)),
                _ => Err(Error::new(ErrorCode::L003, line, col,
                    format!("numeric literal `{text}` is out of range"))),
            }
        } else {
            text.parse::<i64>().map(Value::Int).map_err(|_| Error::new(ErrorCode::L003, line, col,
                format!("integer literal `{text}` does not fit in 64 bits")))
        }
    }

    fn read_ident(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.advance();
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn literals(src: &str) -> Vec<Value> {
        Lexer::new(src).tokenize().unwrap().into_iter().filter_map(|t| t.literal).collect()
    }

    fn lex_err(src: &str) -> Vec<Error> {
        Lexer::new(src).tokenize().unwrap_err()
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
        assert_eq!(lex("  \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn integer_literal() {
        assert_eq!(lex("42"), vec![TokenKind::Number, TokenKind::Eof]);
        assert_eq!(literals("42"), vec![Value::Int(42)]);
    }

    #[test]
    fn double_literal() {
        assert_eq!(literals("3.14"), vec![Value::Double(3.14)]);
        assert_eq!(literals("2.0"), vec![Value::Double(2.0)]);
    }

    #[test]
    fn dot_without_digit_is_separate() {
        assert_eq!(lex("1.x"), vec![TokenKind::Number, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]);
        assert_eq!(literals("1."), vec![Value::Int(1)]);
    }

    #[test]
    fn member_access_tokens() {
        assert_eq!(lex("alice.name"), vec![TokenKind::Ident, TokenKind::Dot, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn keywords() {
        assert_eq!(lex("function"), vec![TokenKind::Function, TokenKind::Eof]);
        assert_eq!(lex("return"), vec![TokenKind::Return, TokenKind::Eof]);
        assert_eq!(lex("if else while for"),
            vec![TokenKind::If, TokenKind::Else, TokenKind::While, TokenKind::For, TokenKind::Eof]);
        assert_eq!(lex("functions"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn bool_literals_are_number_tokens() {
        let tokens = Lexer::new("true false").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].literal, Some(Value::Bool(true)));
        assert_eq!(tokens[1].literal, Some(Value::Bool(false)));
    }

    #[test]
    fn string_literal() {
        let tokens = Lexer::new("'hello world'").tokenize().unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Str);
        assert_eq!(tokens[0].lexeme, "'hello world'");
        assert_eq!(tokens[0].literal, Some(Value::Str("hello world".into())));
    }

    #[test]
    fn strings_have_no_escapes() {
        assert_eq!(literals(r"'a\nb'"), vec![Value::Str(r"a\nb".into())]);
    }

    #[test]
    fn operators() {
        assert_eq!(
            lex("= + - * / < <= > >= == !="),
            vec![
                TokenKind::Eq, TokenKind::Plus, TokenKind::Minus, TokenKind::Star, TokenKind::Slash,
                TokenKind::Lt, TokenKind::LtEq, TokenKind::Gt, TokenKind::GtEq,
                TokenKind::EqEq, TokenKind::BangEq, TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn punctuation() {
        assert_eq!(
            lex("( ) { } , ; ."),
            vec![
                TokenKind::LParen, TokenKind::RParen, TokenKind::LBrace, TokenKind::RBrace,
                TokenKind::Comma, TokenKind::Semicolon, TokenKind::Dot, TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn line_comment_skipped() {
        assert_eq!(lex("// comment\n42 // trailing"), vec![TokenKind::Number, TokenKind::Eof]);
    }

    #[test]
    fn unterminated_string_error() {
        let errs = lex_err("'oops");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L002);
    }

    #[test]
    fn unexpected_character_error() {
        let errs = lex_err("1 # 2 @");
        assert_eq!(errs.len(), 2);
        assert!(errs.iter().all(|e| e.code == ErrorCode::L001));
        assert_eq!(errs[0].message, "unexpected character `#`");
    }

    #[test]
    fn bare_bang_error() {
        let errs = lex_err("!");
        assert_eq!(errs[0].code, ErrorCode::L001);
    }

    #[test]
    fn integer_overflow_is_an_error() {
        let errs = lex_err("9223372036854775808");
        assert_eq!(errs[0].code, ErrorCode::L003);
        assert_eq!(literals("9223372036854775807"), vec![Value::Int(i64::MAX)]);
    }

    #[test]
    fn lenient_mode_skips_recoverable_problems() {
        let tokens = Lexer::new("1 # 2").with_mode(LexMode::Lenient).tokenize().unwrap();
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]);

        let (tokens, diags) = Lexer::new("x = 'open").with_mode(LexMode::Lenient).scan();
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, ErrorCode::L002);
        assert_eq!(tokens.last().map(|t| t.kind), Some(TokenKind::Eof));
    }

    #[test]
    fn lenient_mode_still_rejects_overflow() {
        let errs = Lexer::new("99999999999999999999").with_mode(LexMode::Lenient).tokenize().unwrap_err();
        assert_eq!(errs[0].code, ErrorCode::L003);
    }

    #[test]
    fn line_and_column_tracking() {
        let tokens = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn function_declaration() {
        assert_eq!(
            lex("function add(a, b) { return a + b; }"),
            vec![
                TokenKind::Function, TokenKind::Ident, TokenKind::LParen,
                TokenKind::Ident, TokenKind::Comma, TokenKind::Ident, TokenKind::RParen,
                TokenKind::LBrace, TokenKind::Return, TokenKind::Ident, TokenKind::Plus,
                TokenKind::Ident, TokenKind::Semicolon, TokenKind::RBrace, TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn token_kind_helpers() {
        assert!(TokenKind::Plus.is_arithmetic());
        assert!(TokenKind::EqEq.is_comparison());
        assert!(TokenKind::Number.is_literal());
        assert!(TokenKind::While.is_keyword());
        assert!(!TokenKind::Ident.is_keyword());
        assert!(TokenKind::Star.precedence() > TokenKind::Plus.precedence());
        assert!(TokenKind::Plus.precedence() > TokenKind::Lt.precedence());
    }
}
