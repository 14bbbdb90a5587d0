//! Scanner: source bytes to a token list plus diagnostics.
//!
//! The lexer never fails. Unknown characters become `Invalid` tokens that the
//! parser filters out, and every problem is reported through the sink, so the
//! token sequence with `Invalid` elided is a valid parser input exactly when
//! the diagnostic list is empty.

use crate::diagnostics::{DiagnosticSink, Phase};
use crate::intern::Interner;
use crate::token::{LiteralValue, Span, Token, TokenKind};

pub struct Lexer<'src, 'i> {
    source: &'src str,
    bytes: &'src [u8],
    pos: usize,
    line: u32,
    column: u32,
    interner: &'i mut Interner,
}

impl<'src, 'i> Lexer<'src, 'i> {
    pub fn new(source: &'src str, interner: &'i mut Interner) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            pos: 0,
            line: 1,
            column: 1,
            interner,
        }
    }

    pub fn tokenize(mut self, sink: &mut DiagnosticSink) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token(sink);
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn next_token(&mut self, sink: &mut DiagnosticSink) -> Token {
        self.skip_trivia(sink);

        let start = self.mark();
        if self.at_end() {
            return Token::new(TokenKind::Eof, crate::intern::Symbol::EMPTY, self.span_from(start));
        }

        let c = self.peek();
        if c.is_ascii_alphabetic() || c == b'_' {
            return self.identifier_or_keyword(start);
        }
        if c.is_ascii_digit() {
            return self.number(start, sink);
        }
        if c == b'"' {
            return self.string(start, sink);
        }
        if c == b'\'' {
            return self.char_literal(start, sink);
        }
        self.operator(start, sink)
    }

    // ------------------------------------------------------------------
    // Trivia
    // ------------------------------------------------------------------

    fn skip_trivia(&mut self, sink: &mut DiagnosticSink) {
        loop {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'/' if self.peek_at(1) == b'/' => {
                    while !self.at_end() && self.peek() != b'\n' {
                        self.bump_char();
                    }
                }
                b'/' if self.peek_at(1) == b'*' => {
                    let start = self.mark();
                    self.bump();
                    self.bump();
                    // Block comments nest arbitrarily.
                    let mut depth = 1usize;
                    while depth > 0 {
                        if self.at_end() {
                            sink.error(
                                Phase::Lexer,
                                self.span_from(start),
                                "unterminated block comment",
                            );
                            break;
                        }
                        if self.peek() == b'/' && self.peek_at(1) == b'*' {
                            self.bump();
                            self.bump();
                            depth += 1;
                        } else if self.peek() == b'*' && self.peek_at(1) == b'/' {
                            self.bump();
                            self.bump();
                            depth -= 1;
                        } else {
                            self.bump_char();
                        }
                    }
                }
                _ => break,
            }
        }
    }

    // ------------------------------------------------------------------
    // Identifiers and keywords
    // ------------------------------------------------------------------

    fn identifier_or_keyword(&mut self, start: Mark) -> Token {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.bump();
        }
        let text = &self.source[start.offset..self.pos];
        let span = self.span_from(start);
        let lexeme = self.interner.intern(text);

        if text == "_" {
            return Token::new(TokenKind::Underscore, lexeme, span);
        }

        match TokenKind::keyword(text) {
            Some(TokenKind::Bool) => {
                Token::with_value(TokenKind::Bool, lexeme, span, LiteralValue::Bool(text == "true"))
            }
            Some(TokenKind::Nil) => Token::with_value(TokenKind::Nil, lexeme, span, LiteralValue::Nil),
            Some(kind) => Token::new(kind, lexeme, span),
            None => Token::new(TokenKind::Ident, lexeme, span),
        }
    }

    // ------------------------------------------------------------------
    // Numbers
    // ------------------------------------------------------------------

    fn number(&mut self, start: Mark, sink: &mut DiagnosticSink) -> Token {
        if self.peek() == b'0' {
            let radix = match self.peek_at(1) {
                b'x' | b'X' => Some(16),
                b'b' | b'B' => Some(2),
                b'o' | b'O' => Some(8),
                _ => None,
            };
            if let Some(radix) = radix {
                self.bump();
                self.bump();
                return self.radix_integer(start, radix, sink);
            }
        }

        while self.peek().is_ascii_digit() || self.peek() == b'_' {
            self.bump();
        }

        let mut is_float = false;
        // A decimal point only begins a fraction when a digit follows;
        // otherwise `1..10` would swallow the range operator.
        if self.peek() == b'.' && self.peek_at(1).is_ascii_digit() {
            is_float = true;
            self.bump();
            while self.peek().is_ascii_digit() || self.peek() == b'_' {
                self.bump();
            }
        }
        if self.peek() == b'e' || self.peek() == b'E' {
            let sign_len = if self.peek_at(1) == b'+' || self.peek_at(1) == b'-' { 1 } else { 0 };
            if self.peek_at(1 + sign_len).is_ascii_digit() {
                is_float = true;
                self.bump();
                for _ in 0..sign_len {
                    self.bump();
                }
                while self.peek().is_ascii_digit() || self.peek() == b'_' {
                    self.bump();
                }
            }
        }

        let text = &self.source[start.offset..self.pos];
        let span = self.span_from(start);
        let lexeme = self.interner.intern(text);
        let digits: String = text.chars().filter(|&c| c != '_').collect();

        if is_float {
            match digits.parse::<f64>() {
                Ok(value) => Token::with_value(TokenKind::Float, lexeme, span, LiteralValue::Float(value)),
                Err(_) => {
                    sink.error(Phase::Lexer, span, format!("invalid float literal '{}'", text));
                    Token::with_value(TokenKind::Float, lexeme, span, LiteralValue::Float(0.0))
                }
            }
        } else {
            match digits.parse::<i64>() {
                Ok(value) => Token::with_value(TokenKind::Int, lexeme, span, LiteralValue::Int(value)),
                Err(_) => {
                    sink.error(Phase::Lexer, span, format!("integer literal '{}' out of range", text));
                    Token::with_value(TokenKind::Int, lexeme, span, LiteralValue::Int(0))
                }
            }
        }
    }

    fn radix_integer(&mut self, start: Mark, radix: u32, sink: &mut DiagnosticSink) -> Token {
        let digits_start = self.pos;
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.bump();
        }
        let digits: String = self.source[digits_start..self.pos]
            .chars()
            .filter(|&c| c != '_')
            .collect();

        let text = &self.source[start.offset..self.pos];
        let span = self.span_from(start);
        let lexeme = self.interner.intern(text);

        match i64::from_str_radix(&digits, radix) {
            Ok(value) if !digits.is_empty() => {
                Token::with_value(TokenKind::Int, lexeme, span, LiteralValue::Int(value))
            }
            _ => {
                sink.error(Phase::Lexer, span, format!("invalid integer literal '{}'", text));
                Token::with_value(TokenKind::Int, lexeme, span, LiteralValue::Int(0))
            }
        }
    }

    // ------------------------------------------------------------------
    // Strings and characters
    // ------------------------------------------------------------------

    fn string(&mut self, start: Mark, sink: &mut DiagnosticSink) -> Token {
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            if self.at_end() {
                sink.error(Phase::Lexer, self.span_from(start), "unterminated string literal");
                break;
            }
            match self.peek() {
                b'"' => {
                    self.bump();
                    break;
                }
                b'\\' => {
                    if let Some(c) = self.escape(sink) {
                        value.push(c);
                    }
                }
                _ => {
                    value.push(self.bump_char());
                }
            }
        }

        let text = &self.source[start.offset..self.pos];
        let span = self.span_from(start);
        let lexeme = self.interner.intern(text);
        let cooked = self.interner.intern(&value);
        Token::with_value(TokenKind::Str, lexeme, span, LiteralValue::Str(cooked))
    }

    fn char_literal(&mut self, start: Mark, sink: &mut DiagnosticSink) -> Token {
        self.bump(); // opening quote
        let value = match self.peek() {
            b'\'' => {
                self.bump();
                sink.error(Phase::Lexer, self.span_from(start), "empty character literal");
                return self.finish_char(start, '\0');
            }
            b'\\' => self.escape(sink).unwrap_or('\0'),
            _ if self.at_end() => {
                sink.error(Phase::Lexer, self.span_from(start), "unterminated character literal");
                return self.finish_char(start, '\0');
            }
            _ => self.bump_char(),
        };

        if self.peek() == b'\'' {
            self.bump();
        } else {
            sink.error(Phase::Lexer, self.span_from(start), "unterminated character literal");
        }
        self.finish_char(start, value)
    }

    fn finish_char(&mut self, start: Mark, value: char) -> Token {
        let text = &self.source[start.offset..self.pos];
        let span = self.span_from(start);
        let lexeme = self.interner.intern(text);
        Token::with_value(TokenKind::Char, lexeme, span, LiteralValue::Char(value))
    }

    fn escape(&mut self, sink: &mut DiagnosticSink) -> Option<char> {
        let esc_start = self.mark();
        self.bump(); // backslash
        if self.at_end() {
            sink.error(Phase::Lexer, self.span_from(esc_start), "invalid escape sequence");
            return None;
        }
        let c = self.bump_char();
        match c {
            'n' => Some('\n'),
            't' => Some('\t'),
            'r' => Some('\r'),
            '\\' => Some('\\'),
            '"' => Some('"'),
            '\'' => Some('\''),
            '0' => Some('\0'),
            'x' => {
                let mut code = 0u32;
                for _ in 0..2 {
                    match (self.peek() as char).to_digit(16) {
                        Some(d) if !self.at_end() => {
                            code = code * 16 + d;
                            self.bump();
                        }
                        _ => {
                            sink.error(
                                Phase::Lexer,
                                self.span_from(esc_start),
                                "invalid escape sequence: expected two hex digits after '\\x'",
                            );
                            return None;
                        }
                    }
                }
                char::from_u32(code)
            }
            'u' => {
                if self.peek() != b'{' {
                    sink.error(
                        Phase::Lexer,
                        self.span_from(esc_start),
                        "invalid escape sequence: expected '{' after '\\u'",
                    );
                    return None;
                }
                self.bump();
                let mut code = 0u32;
                let mut digits = 0;
                while (self.peek() as char).is_ascii_hexdigit() && !self.at_end() {
                    code = code.saturating_mul(16) + (self.peek() as char).to_digit(16).unwrap();
                    digits += 1;
                    self.bump();
                }
                if self.peek() == b'}' && digits > 0 {
                    self.bump();
                    match char::from_u32(code) {
                        Some(c) => Some(c),
                        None => {
                            sink.error(
                                Phase::Lexer,
                                self.span_from(esc_start),
                                "invalid escape sequence: not a valid code point",
                            );
                            None
                        }
                    }
                } else {
                    sink.error(
                        Phase::Lexer,
                        self.span_from(esc_start),
                        "invalid escape sequence: unterminated '\\u{...}'",
                    );
                    None
                }
            }
            other => {
                sink.error(
                    Phase::Lexer,
                    self.span_from(esc_start),
                    format!("invalid escape sequence '\\{}'", other),
                );
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // Operators and punctuation
    // ------------------------------------------------------------------

    fn operator(&mut self, start: Mark, sink: &mut DiagnosticSink) -> Token {
        use TokenKind::*;
        let c = self.bump();
        // Maximal munch: longer operators are tried before their prefixes.
        let kind = match c {
            b'(' => LParen,
            b')' => RParen,
            b'{' => LBrace,
            b'}' => RBrace,
            b'[' => LBracket,
            b']' => RBracket,
            b',' => Comma,
            b';' => Semicolon,
            b'@' => At,
            b'~' => Tilde,
            b'^' => Caret,
            b'?' => Question,
            b':' => {
                if self.eat(b':') {
                    ColonColon
                } else {
                    Colon
                }
            }
            b'.' => {
                if self.eat(b'.') {
                    if self.eat(b'=') {
                        DotDotEq
                    } else {
                        DotDot
                    }
                } else {
                    Dot
                }
            }
            b'+' => {
                if self.eat(b'=') {
                    PlusAssign
                } else {
                    Plus
                }
            }
            b'-' => {
                if self.eat(b'>') {
                    Arrow
                } else if self.eat(b'=') {
                    MinusAssign
                } else {
                    Minus
                }
            }
            b'*' => {
                if self.eat(b'*') {
                    StarStar
                } else if self.eat(b'=') {
                    StarAssign
                } else {
                    Star
                }
            }
            b'/' => {
                if self.eat(b'=') {
                    SlashAssign
                } else {
                    Slash
                }
            }
            b'%' => Percent,
            b'=' => {
                if self.eat(b'=') {
                    EqEq
                } else if self.eat(b'>') {
                    FatArrow
                } else {
                    Assign
                }
            }
            b'!' => {
                if self.eat(b'=') {
                    NotEq
                } else {
                    Bang
                }
            }
            b'<' => {
                if self.eat(b'<') {
                    Shl
                } else if self.eat(b'=') {
                    LtEq
                } else {
                    Lt
                }
            }
            b'>' => {
                if self.eat(b'>') {
                    Shr
                } else if self.eat(b'=') {
                    GtEq
                } else {
                    Gt
                }
            }
            b'&' => {
                if self.eat(b'&') {
                    AndAnd
                } else {
                    Amp
                }
            }
            b'|' => {
                if self.eat(b'|') {
                    OrOr
                } else {
                    Pipe
                }
            }
            _ => {
                // Re-decode from the start so multibyte characters report as
                // one character, not a byte.
                self.pos = start.offset;
                self.line = start.line;
                self.column = start.column;
                let bad = self.bump_char();
                sink.error(
                    Phase::Lexer,
                    self.span_from(start),
                    format!("unexpected character '{}'", bad),
                );
                Invalid
            }
        };

        let text = &self.source[start.offset..self.pos];
        let lexeme = self.interner.intern(text);
        Token::new(kind, lexeme, self.span_from(start))
    }

    // ------------------------------------------------------------------
    // Cursor
    // ------------------------------------------------------------------

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.pos).copied().unwrap_or(0)
    }

    fn peek_at(&self, n: usize) -> u8 {
        self.bytes.get(self.pos + n).copied().unwrap_or(0)
    }

    fn eat(&mut self, expected: u8) -> bool {
        if self.peek() == expected {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Consume one ASCII byte.
    fn bump(&mut self) -> u8 {
        let c = self.bytes[self.pos];
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    /// Consume one full character, which may be multibyte.
    fn bump_char(&mut self) -> char {
        let c = self.source[self.pos..].chars().next().unwrap_or('\0');
        self.pos += c.len_utf8().max(1);
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn mark(&self) -> Mark {
        Mark { line: self.line, column: self.column, offset: self.pos }
    }

    fn span_from(&self, start: Mark) -> Span {
        Span::new(start.line, start.column, start.offset, self.pos - start.offset)
    }
}

#[derive(Clone, Copy)]
struct Mark {
    line: u32,
    column: u32,
    offset: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> (Vec<Token>, DiagnosticSink, Interner) {
        let mut interner = Interner::new();
        let mut sink = DiagnosticSink::new(None);
        let tokens = Lexer::new(source, &mut interner).tokenize(&mut sink);
        (tokens, sink, interner)
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).0.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        use TokenKind::*;
        assert_eq!(
            kinds("fn divide requires old forall balance"),
            vec![Fn, Ident, Requires, Old, Forall, Ident, Eof]
        );
    }

    #[test]
    fn boolean_and_nil_carry_values() {
        let (tokens, _, _) = lex("true false nil");
        assert_eq!(tokens[0].value, Some(LiteralValue::Bool(true)));
        assert_eq!(tokens[1].value, Some(LiteralValue::Bool(false)));
        assert_eq!(tokens[2].value, Some(LiteralValue::Nil));
    }

    #[test]
    fn bare_underscore_is_wildcard() {
        use TokenKind::*;
        assert_eq!(kinds("_ _x x_"), vec![Underscore, Ident, Ident, Eof]);
    }

    #[test]
    fn integer_radixes_and_separators() {
        let (tokens, sink, _) = lex("1_000_000 0xff 0b1010 0o17");
        assert!(sink.is_empty());
        assert_eq!(tokens[0].value, Some(LiteralValue::Int(1_000_000)));
        assert_eq!(tokens[1].value, Some(LiteralValue::Int(255)));
        assert_eq!(tokens[2].value, Some(LiteralValue::Int(10)));
        assert_eq!(tokens[3].value, Some(LiteralValue::Int(15)));
    }

    #[test]
    fn float_forms() {
        let (tokens, sink, _) = lex("3.14 1e10 2.5e-3");
        assert!(sink.is_empty());
        assert_eq!(tokens[0].kind, TokenKind::Float);
        assert_eq!(tokens[0].value, Some(LiteralValue::Float(3.14)));
        assert_eq!(tokens[1].value, Some(LiteralValue::Float(1e10)));
        assert_eq!(tokens[2].value, Some(LiteralValue::Float(2.5e-3)));
    }

    #[test]
    fn range_does_not_eat_decimal_point() {
        use TokenKind::*;
        assert_eq!(kinds("0..10"), vec![Int, DotDot, Int, Eof]);
        assert_eq!(kinds("0..=10"), vec![Int, DotDotEq, Int, Eof]);
    }

    #[test]
    fn string_escapes_cook_into_value() {
        let (tokens, sink, interner) = lex(r#""a\n\t\x41\u{1F600}b""#);
        assert!(sink.is_empty());
        match tokens[0].value {
            Some(LiteralValue::Str(sym)) => {
                assert_eq!(interner.resolve(sym), "a\n\tA\u{1F600}b");
            }
            other => panic!("expected string value, got {:?}", other),
        }
    }

    #[test]
    fn char_literals() {
        let (tokens, sink, _) = lex(r"'a' '\n' '\''");
        assert!(sink.is_empty());
        assert_eq!(tokens[0].value, Some(LiteralValue::Char('a')));
        assert_eq!(tokens[1].value, Some(LiteralValue::Char('\n')));
        assert_eq!(tokens[2].value, Some(LiteralValue::Char('\'')));
    }

    #[test]
    fn unterminated_string_reports() {
        let (_, sink, _) = lex("\"no end");
        assert!(sink.has_errors());
    }

    #[test]
    fn nested_block_comments() {
        use TokenKind::*;
        let (tokens, sink, _) = lex("a /* outer /* inner */ still outer */ b");
        assert!(sink.is_empty());
        assert_eq!(tokens.iter().map(|t| t.kind).collect::<Vec<_>>(), vec![Ident, Ident, Eof]);
    }

    #[test]
    fn unterminated_block_comment_reports() {
        let (_, sink, _) = lex("a /* never closed");
        assert!(sink.has_errors());
    }

    #[test]
    fn maximal_munch_operators() {
        use TokenKind::*;
        assert_eq!(
            kinds("< <= << -> -= - ** *= =="),
            vec![Lt, LtEq, Shl, Arrow, MinusAssign, Minus, StarStar, StarAssign, EqEq, Eof]
        );
    }

    #[test]
    fn unknown_character_becomes_invalid_token() {
        let (tokens, sink, _) = lex("let $ = 1;");
        assert!(sink.has_errors());
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Invalid));
    }

    #[test]
    fn token_lexeme_matches_source_slice() {
        let source = "fn add(a: Int, b: Int) -> Int { return a + b; }";
        let (tokens, _, interner) = lex(source);
        for token in &tokens {
            if token.kind == TokenKind::Eof {
                continue;
            }
            let slice = &source[token.span.offset..token.span.end()];
            assert_eq!(interner.resolve(token.lexeme), slice);
        }
    }

    #[test]
    fn spans_stay_within_source_bounds() {
        let source = "let x = \"multi\nline\";\nlet y = 2;";
        let (tokens, _, _) = lex(source);
        for token in &tokens {
            assert!(token.span.end() <= source.len());
        }
    }

    #[test]
    fn line_counter_advances_on_newlines() {
        let (tokens, _, _) = lex("a\nb\n  c");
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[2].span.line, 3);
        assert_eq!(tokens[2].span.column, 3);
    }
}
