//! Tree builder: recursive descent with operator precedence.
//!
//! Grammar is split across submodules by family: declarations and
//! annotations, statements, expressions, types, and patterns. On a parse
//! error the builder records a diagnostic and resynchronizes past the next
//! semicolon or to the next declaration-starting token; it never aborts.

mod decl;
mod expr;
mod pattern;
mod stmt;
mod types;

#[cfg(test)]
mod tests;

use crate::ast::{AstContext, Decl, Program};
use crate::diagnostics::{DiagnosticSink, Phase};
use crate::intern::{Interner, Symbol};
use crate::token::{Span, Token, TokenKind};

/// Marker for an abandoned production. The diagnostic has already been
/// reported by the time this propagates.
pub(super) struct ParseAbort;

pub(super) type ParseResult<T> = Result<T, ParseAbort>;

pub struct Parser<'a, 'i, 's> {
    pub(super) tokens: Vec<Token>,
    pub(super) current: usize,
    pub(super) ctx: AstContext<'a>,
    pub(super) interner: &'i mut Interner,
    pub(super) sink: &'s mut DiagnosticSink,
    /// Non-zero while parsing a position where `Name {` must not be taken as
    /// a struct literal (if/while/for/match heads, quantifier collections).
    pub(super) no_struct_literal: u32,
}

impl<'a, 'i, 's> Parser<'a, 'i, 's> {
    pub fn new(
        tokens: Vec<Token>,
        ctx: AstContext<'a>,
        interner: &'i mut Interner,
        sink: &'s mut DiagnosticSink,
    ) -> Self {
        // Invalid tokens already produced lexer diagnostics; the grammar
        // never has to see them.
        let tokens: Vec<Token> = tokens
            .into_iter()
            .filter(|t| t.kind != TokenKind::Invalid)
            .collect();
        Parser { tokens, current: 0, ctx, interner, sink, no_struct_literal: 0 }
    }

    pub fn parse_program(&mut self) -> Program<'a> {
        let mut decls: Vec<&'a Decl<'a>> = Vec::new();
        while !self.at_end() {
            match self.parse_declaration() {
                Ok(decl) => decls.push(decl),
                Err(ParseAbort) => self.synchronize(),
            }
        }
        Program { decls }
    }

    // ------------------------------------------------------------------
    // Cursor helpers
    // ------------------------------------------------------------------

    pub(super) fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    pub(super) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(super) fn peek_next_kind(&self) -> TokenKind {
        self.tokens
            .get(self.current + 1)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    pub(super) fn at_end(&self) -> bool {
        self.peek_kind() == TokenKind::Eof
    }

    pub(super) fn advance(&mut self) -> Token {
        let token = *self.peek();
        if !self.at_end() {
            self.current += 1;
        }
        token
    }

    pub(super) fn previous_span(&self) -> Span {
        if self.current == 0 {
            self.peek().span
        } else {
            self.tokens[self.current - 1].span
        }
    }

    pub(super) fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(super) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(super) fn expect(&mut self, kind: TokenKind, context: &str) -> ParseResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            let found = *self.peek();
            self.sink.error(
                Phase::Parser,
                found.span,
                format!(
                    "expected {} {}, found {}",
                    kind.describe(),
                    context,
                    found.kind.describe()
                ),
            );
            Err(ParseAbort)
        }
    }

    pub(super) fn expect_ident(&mut self, context: &str) -> ParseResult<Symbol> {
        let token = self.expect(TokenKind::Ident, context)?;
        Ok(token.lexeme)
    }

    pub(super) fn error_here(&mut self, message: impl Into<String>) -> ParseAbort {
        let span = self.peek().span;
        self.sink.error(Phase::Parser, span, message);
        ParseAbort
    }

    /// Skip to the next plausible declaration or statement boundary.
    pub(super) fn synchronize(&mut self) {
        while !self.at_end() {
            if self.eat(TokenKind::Semicolon) {
                return;
            }
            if self.peek_kind().starts_declaration() {
                return;
            }
            self.advance();
        }
    }

    /// Run `f` with struct literals disabled; used for positions where a
    /// `{` must start a block instead.
    pub(super) fn without_struct_literal<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        self.no_struct_literal += 1;
        let result = f(self);
        self.no_struct_literal -= 1;
        result
    }

    pub(super) fn struct_literal_allowed(&self) -> bool {
        self.no_struct_literal == 0
    }

    /// Split a `>>` into two `>`: consume one closing angle bracket of a
    /// generic argument list.
    pub(super) fn expect_generic_close(&mut self) -> ParseResult<()> {
        match self.peek_kind() {
            TokenKind::Gt => {
                self.advance();
                Ok(())
            }
            TokenKind::Shr => {
                // Leave a single `>` in place for the enclosing list.
                let token = &mut self.tokens[self.current];
                token.kind = TokenKind::Gt;
                token.span.offset += 1;
                token.span.column += 1;
                token.span.length = 1;
                Ok(())
            }
            _ => {
                let found = *self.peek();
                self.sink.error(
                    Phase::Parser,
                    found.span,
                    format!(
                        "expected '>' to close generic arguments, found {}",
                        found.kind.describe()
                    ),
                );
                Err(ParseAbort)
            }
        }
    }
}
