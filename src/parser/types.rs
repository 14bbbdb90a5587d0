//! Type grammar.

use super::{ParseResult, Parser};
use crate::ast::{TypeExpr, TypeExprKind};
use crate::token::{LiteralValue, TokenKind};

impl<'a, 'i, 's> Parser<'a, 'i, 's> {
    pub(super) fn parse_type(&mut self) -> ParseResult<&'a TypeExpr<'a>> {
        let ty = self.parse_type_prefix()?;
        // Optional suffix binds to whatever came before it.
        let mut ty = ty;
        while self.check(TokenKind::Question) {
            let q = self.advance();
            ty = self.ctx.ty(TypeExprKind::Optional(ty), ty.span.to(q.span));
        }
        Ok(ty)
    }

    fn parse_type_prefix(&mut self) -> ParseResult<&'a TypeExpr<'a>> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::Amp => {
                self.advance();
                let mutable = self.eat(TokenKind::Mut);
                let inner = self.parse_type_prefix()?;
                Ok(self
                    .ctx
                    .ty(TypeExprKind::Reference { inner, mutable }, start.to(inner.span)))
            }
            TokenKind::LBracket => {
                self.advance();
                let elem = self.parse_type()?;
                let size = if self.eat(TokenKind::Semicolon) {
                    let token = self.expect(TokenKind::Int, "as array size")?;
                    match token.value {
                        Some(LiteralValue::Int(n)) if n >= 0 => Some(n as usize),
                        _ => {
                            self.sink.error(
                                crate::diagnostics::Phase::Parser,
                                token.span,
                                "array size must be a non-negative integer",
                            );
                            None
                        }
                    }
                } else {
                    None
                };
                let close = self.expect(TokenKind::RBracket, "to close array type")?;
                Ok(self
                    .ctx
                    .ty(TypeExprKind::Array { elem, size }, start.to(close.span)))
            }
            TokenKind::LParen => {
                self.advance();
                let mut items = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        items.push(self.parse_type()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                let close = self.expect(TokenKind::RParen, "to close tuple type")?;
                if items.len() == 1 {
                    // Parenthesized single type unwraps.
                    Ok(items[0])
                } else {
                    Ok(self.ctx.ty(TypeExprKind::Tuple(items), start.to(close.span)))
                }
            }
            TokenKind::Fn => {
                self.advance();
                self.expect(TokenKind::LParen, "after 'fn' in function type")?;
                let mut params = Vec::new();
                if !self.check(TokenKind::RParen) {
                    loop {
                        params.push(self.parse_type()?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(TokenKind::RParen, "to close function type parameters")?;
                self.expect(TokenKind::Arrow, "before function type result")?;
                let ret = self.parse_type()?;
                let mut effects = Vec::new();
                if self.eat(TokenKind::Effect) {
                    self.expect(TokenKind::LBracket, "after 'effect'")?;
                    loop {
                        effects.push(self.expect_ident("as effect name")?);
                        if !self.eat(TokenKind::Comma) {
                            break;
                        }
                    }
                    self.expect(TokenKind::RBracket, "to close effect list")?;
                }
                let end = self.previous_span();
                Ok(self
                    .ctx
                    .ty(TypeExprKind::Function { params, ret, effects }, start.to(end)))
            }
            TokenKind::SelfType => {
                let token = self.advance();
                Ok(self.ctx.ty(TypeExprKind::SelfType, token.span))
            }
            TokenKind::Ident => {
                let first = self.advance();
                let mut path = vec![first.lexeme];
                while self.check(TokenKind::Dot) && self.peek_next_kind() == TokenKind::Ident {
                    self.advance();
                    path.push(self.expect_ident("in type path")?);
                }
                let generics = if self.check(TokenKind::Lt) {
                    self.parse_generic_args()?
                } else {
                    Vec::new()
                };
                let end = self.previous_span();
                Ok(self
                    .ctx
                    .ty(TypeExprKind::Named { path, generics }, first.span.to(end)))
            }
            _ => {
                let found = self.peek().kind.describe();
                Err(self.error_here(format!("expected type, found {}", found)))
            }
        }
    }

    pub(super) fn parse_generic_args(&mut self) -> ParseResult<Vec<&'a TypeExpr<'a>>> {
        self.expect(TokenKind::Lt, "to open generic arguments")?;
        let mut args = Vec::new();
        loop {
            args.push(self.parse_type()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect_generic_close()?;
        Ok(args)
    }
}
