//! Pattern grammar for `match` arms.

use super::{ParseResult, Parser};
use crate::ast::{Literal, Pattern, PatternKind};
use crate::token::{LiteralValue, TokenKind};

impl<'a, 'i, 's> Parser<'a, 'i, 's> {
    pub(super) fn parse_pattern(&mut self) -> ParseResult<&'a Pattern<'a>> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::Underscore => {
                self.advance();
                Ok(self.ctx.pattern(PatternKind::Wildcard, start))
            }
            TokenKind::Mut => {
                self.advance();
                let name = self.expect_ident("after 'mut' in pattern")?;
                let end = self.previous_span();
                Ok(self
                    .ctx
                    .pattern(PatternKind::Binding { name, mutable: true }, start.to(end)))
            }
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::Char
            | TokenKind::Bool
            | TokenKind::Nil
            | TokenKind::Minus => self.parse_literal_or_range_pattern(),
            TokenKind::LParen => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        items.push(self.parse_pattern()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let close = self.expect(TokenKind::RParen, "to close tuple pattern")?;
                Ok(self.ctx.pattern(PatternKind::Tuple(items), start.to(close.span)))
            }
            TokenKind::Ident => {
                let name = self.advance().lexeme;
                if self.eat(TokenKind::ColonColon) {
                    let variant = self.expect_ident("as enum variant name")?;
                    let mut fields = Vec::new();
                    if self.eat(TokenKind::LParen) {
                        if !self.check(TokenKind::RParen) {
                            loop {
                                fields.push(self.parse_pattern()?);
                                if !self.eat(TokenKind::Comma) {
                                    break;
                                }
                            }
                        }
                        self.expect(TokenKind::RParen, "to close variant pattern")?;
                    }
                    let end = self.previous_span();
                    Ok(self.ctx.pattern(
                        PatternKind::EnumVariant { ty: name, variant, fields },
                        start.to(end),
                    ))
                } else if self.check(TokenKind::LBrace) {
                    self.parse_struct_pattern(name, start)
                } else {
                    Ok(self
                        .ctx
                        .pattern(PatternKind::Binding { name, mutable: false }, start))
                }
            }
            _ => {
                let found = self.peek().kind.describe();
                Err(self.error_here(format!("expected pattern, found {}", found)))
            }
        }
    }

    fn parse_struct_pattern(
        &mut self,
        name: crate::intern::Symbol,
        start: crate::token::Span,
    ) -> ParseResult<&'a Pattern<'a>> {
        self.expect(TokenKind::LBrace, "to open struct pattern")?;
        let mut fields = Vec::new();
        let mut rest = false;
        while !self.check(TokenKind::RBrace) {
            if self.eat(TokenKind::DotDot) {
                rest = true;
                break;
            }
            let field = self.expect_ident("as struct pattern field")?;
            let pat = if self.eat(TokenKind::Colon) {
                Some(self.parse_pattern()?)
            } else {
                None
            };
            fields.push((field, pat));
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::RBrace, "to close struct pattern")?;
        Ok(self.ctx.pattern(
            PatternKind::Struct { name, fields, rest },
            start.to(close.span),
        ))
    }

    fn parse_literal_or_range_pattern(&mut self) -> ParseResult<&'a Pattern<'a>> {
        let start = self.peek().span;
        let lo = self.parse_pattern_literal()?;
        if self.check(TokenKind::DotDot) || self.check(TokenKind::DotDotEq) {
            let inclusive = self.advance().kind == TokenKind::DotDotEq;
            let hi = self.parse_pattern_literal()?;
            let end = self.previous_span();
            Ok(self
                .ctx
                .pattern(PatternKind::Range { lo, hi, inclusive }, start.to(end)))
        } else {
            Ok(self.ctx.pattern(PatternKind::Literal(lo), start))
        }
    }

    fn parse_pattern_literal(&mut self) -> ParseResult<Literal> {
        let negate = self.eat(TokenKind::Minus);
        let token = self.advance();
        let value = match token.value {
            Some(v) => v,
            None => {
                self.sink.error(
                    crate::diagnostics::Phase::Parser,
                    token.span,
                    format!("expected literal in pattern, found {}", token.kind.describe()),
                );
                return Err(super::ParseAbort);
            }
        };
        if negate {
            match value {
                LiteralValue::Int(n) => Ok(LiteralValue::Int(-n)),
                LiteralValue::Float(f) => Ok(LiteralValue::Float(-f)),
                _ => {
                    self.sink.error(
                        crate::diagnostics::Phase::Parser,
                        token.span,
                        "only numeric literals may be negated in a pattern",
                    );
                    Err(super::ParseAbort)
                }
            }
        } else {
            Ok(value)
        }
    }
}
