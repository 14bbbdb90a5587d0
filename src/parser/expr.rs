//! Expression grammar, precedence low to high: assignment, range, logical
//! or/and, equality, ordering, bitwise or/xor/and, shift, additive,
//! multiplicative, exponentiation (right-associative), unary prefix, postfix,
//! primary.

use super::{ParseResult, Parser};
use crate::ast::{
    BinaryOp, Expr, ExprKind, MatchArm, Param, QuantBinding, QuantifierKind, UnaryOp,
};
use crate::diagnostics::Phase;
use crate::token::{LiteralValue, TokenKind};

impl<'a, 'i, 's> Parser<'a, 'i, 's> {
    pub(super) fn parse_expr(&mut self) -> ParseResult<&'a Expr<'a>> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> ParseResult<&'a Expr<'a>> {
        let target = self.parse_range()?;
        let op = match self.peek_kind() {
            TokenKind::Assign => None,
            TokenKind::PlusAssign => Some(BinaryOp::Add),
            TokenKind::MinusAssign => Some(BinaryOp::Sub),
            TokenKind::StarAssign => Some(BinaryOp::Mul),
            TokenKind::SlashAssign => Some(BinaryOp::Div),
            _ => return Ok(target),
        };
        self.advance();
        // Right-associative: `a = b = c` assigns c to b first.
        let value = self.parse_assignment()?;
        Ok(self.ctx.expr(
            ExprKind::Assign { op, target, value },
            target.span.to(value.span),
        ))
    }

    fn parse_range(&mut self) -> ParseResult<&'a Expr<'a>> {
        let start = self.parse_or()?;
        if self.check(TokenKind::DotDot) || self.check(TokenKind::DotDotEq) {
            let inclusive = self.advance().kind == TokenKind::DotDotEq;
            let end = self.parse_or()?;
            return Ok(self.ctx.expr(
                ExprKind::Range { start, end, inclusive },
                start.span.to(end.span),
            ));
        }
        Ok(start)
    }

    fn parse_or(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_and()?;
        while self.eat(TokenKind::OrOr) {
            let rhs = self.parse_and()?;
            lhs = self.binary(BinaryOp::Or, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_equality()?;
        while self.eat(TokenKind::AndAnd) {
            let rhs = self.parse_equality()?;
            lhs = self.binary(BinaryOp::And, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_equality(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_ordering()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_ordering()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_ordering(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_bit_or()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::LtEq => BinaryOp::LtEq,
                TokenKind::GtEq => BinaryOp::GtEq,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_bit_or()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_or(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_bit_xor()?;
        while self.check(TokenKind::Pipe) && self.peek_next_kind() != TokenKind::Pipe {
            self.advance();
            let rhs = self.parse_bit_xor()?;
            lhs = self.binary(BinaryOp::BitOr, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_xor(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_bit_and()?;
        while self.eat(TokenKind::Caret) {
            let rhs = self.parse_bit_and()?;
            lhs = self.binary(BinaryOp::BitXor, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_bit_and(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_shift()?;
        while self.eat(TokenKind::Amp) {
            let rhs = self.parse_shift()?;
            lhs = self.binary(BinaryOp::BitAnd, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_shift(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Shl => BinaryOp::Shl,
                TokenKind::Shr => BinaryOp::Shr,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_additive()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_multiplicative()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_multiplicative(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            self.advance();
            let rhs = self.parse_power()?;
            lhs = self.binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn parse_power(&mut self) -> ParseResult<&'a Expr<'a>> {
        let lhs = self.parse_unary()?;
        if self.eat(TokenKind::StarStar) {
            // Right-associative: 2 ** 3 ** 2 is 2 ** (3 ** 2).
            let rhs = self.parse_power()?;
            return Ok(self.binary(BinaryOp::Pow, lhs, rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<&'a Expr<'a>> {
        let start = self.peek().span;
        let op = match self.peek_kind() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Star => UnaryOp::Deref,
            TokenKind::Amp => {
                self.advance();
                let mutable = self.eat(TokenKind::Mut);
                let operand = self.parse_unary()?;
                return Ok(self.ctx.expr(
                    ExprKind::Unary { op: UnaryOp::Ref { mutable }, operand },
                    start.to(operand.span),
                ));
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(self
            .ctx
            .expr(ExprKind::Unary { op, operand }, start.to(operand.span)))
    }

    fn parse_postfix(&mut self) -> ParseResult<&'a Expr<'a>> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.in_brackets(|p| {
                        let mut args = Vec::new();
                        if !p.check(TokenKind::RParen) {
                            loop {
                                args.push(p.parse_expr()?);
                                if !p.eat(TokenKind::Comma) {
                                    break;
                                }
                            }
                        }
                        Ok(args)
                    })?;
                    let close = self.expect(TokenKind::RParen, "to close call arguments")?;
                    expr = self.ctx.expr(
                        ExprKind::Call { callee: expr, args },
                        expr.span.to(close.span),
                    );
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.in_brackets(|p| p.parse_expr())?;
                    let close = self.expect(TokenKind::RBracket, "to close index")?;
                    expr = self.ctx.expr(
                        ExprKind::Index { object: expr, index },
                        expr.span.to(close.span),
                    );
                }
                TokenKind::Dot => {
                    self.advance();
                    if self.check(TokenKind::Int) {
                        let token = self.advance();
                        let index = match token.value {
                            Some(LiteralValue::Int(n)) if n >= 0 => n as usize,
                            _ => {
                                self.sink.error(
                                    Phase::Parser,
                                    token.span,
                                    "tuple index must be a non-negative integer",
                                );
                                0
                            }
                        };
                        expr = self.ctx.expr(
                            ExprKind::TupleField { object: expr, index },
                            expr.span.to(token.span),
                        );
                    } else {
                        let field = self.expect_ident("after '.'")?;
                        let end = self.previous_span();
                        expr = self.ctx.expr(
                            ExprKind::Member { object: expr, field },
                            expr.span.to(end),
                        );
                    }
                }
                TokenKind::Question => {
                    let q = self.advance();
                    expr = self.ctx.expr(ExprKind::Try(expr), expr.span.to(q.span));
                }
                TokenKind::As => {
                    self.advance();
                    let ty = self.parse_type()?;
                    expr = self
                        .ctx
                        .expr(ExprKind::Cast { expr, ty }, expr.span.to(ty.span));
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<&'a Expr<'a>> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::Int
            | TokenKind::Float
            | TokenKind::Str
            | TokenKind::Char
            | TokenKind::Bool
            | TokenKind::Nil => {
                let token = self.advance();
                let value = token.value.expect("literal token without value");
                Ok(self.ctx.expr(ExprKind::Literal(value), token.span))
            }
            TokenKind::SelfValue => {
                let token = self.advance();
                Ok(self.ctx.expr(ExprKind::SelfRef, token.span))
            }
            TokenKind::Ident => {
                let token = self.advance();
                let name = token.lexeme;
                if self.eat(TokenKind::ColonColon) {
                    let member = self.expect_ident("after '::'")?;
                    let end = self.previous_span();
                    return Ok(self.ctx.expr(
                        ExprKind::Path { base: name, member },
                        token.span.to(end),
                    ));
                }
                if self.check(TokenKind::LBrace) && self.struct_literal_allowed() {
                    return self.parse_struct_literal(name, token.span);
                }
                Ok(self.ctx.expr(ExprKind::Ident(name), token.span))
            }
            TokenKind::LParen => {
                self.advance();
                let items = self.in_brackets(|p| {
                    let mut items = Vec::new();
                    if !p.check(TokenKind::RParen) {
                        loop {
                            items.push(p.parse_expr()?);
                            if !p.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    Ok(items)
                })?;
                let close = self.expect(TokenKind::RParen, "to close parenthesized expression")?;
                if items.len() == 1 {
                    // Single element unwraps; two or more form a tuple.
                    Ok(items.into_iter().next().unwrap())
                } else {
                    Ok(self.ctx.expr(ExprKind::Tuple(items), start.to(close.span)))
                }
            }
            TokenKind::LBracket => {
                self.advance();
                let items = self.in_brackets(|p| {
                    let mut items = Vec::new();
                    if !p.check(TokenKind::RBracket) {
                        loop {
                            items.push(p.parse_expr()?);
                            if !p.eat(TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    Ok(items)
                })?;
                let close = self.expect(TokenKind::RBracket, "to close array literal")?;
                Ok(self.ctx.expr(ExprKind::Array(items), start.to(close.span)))
            }
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                Ok(self.ctx.expr(ExprKind::Block(block), span))
            }
            TokenKind::If => self.parse_if_expr(),
            TokenKind::Match => self.parse_match_expr(),
            TokenKind::Pipe | TokenKind::OrOr => self.parse_lambda(),
            TokenKind::Old => {
                self.advance();
                self.expect(TokenKind::LParen, "after 'old'")?;
                let inner = self.in_brackets(|p| p.parse_expr())?;
                let close = self.expect(TokenKind::RParen, "to close 'old'")?;
                Ok(self.ctx.expr(ExprKind::Old(inner), start.to(close.span)))
            }
            TokenKind::Forall => self.parse_quantifier(QuantifierKind::Forall),
            TokenKind::Exists => self.parse_quantifier(QuantifierKind::Exists),
            _ => {
                let found = self.peek().kind.describe();
                Err(self.error_here(format!("expected expression, found {}", found)))
            }
        }
    }

    fn parse_struct_literal(
        &mut self,
        name: crate::intern::Symbol,
        start: crate::token::Span,
    ) -> ParseResult<&'a Expr<'a>> {
        self.expect(TokenKind::LBrace, "to open struct literal")?;
        let (fields, spread) = self.in_brackets(|p| {
            let mut fields = Vec::new();
            let mut spread = None;
            while !p.check(TokenKind::RBrace) {
                if p.eat(TokenKind::DotDot) {
                    spread = Some(p.parse_expr()?);
                    p.eat(TokenKind::Comma);
                    break;
                }
                let field = p.expect_ident("as struct literal field")?;
                p.expect(TokenKind::Colon, "after struct literal field name")?;
                let value = p.parse_expr()?;
                fields.push((field, value));
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok((fields, spread))
        })?;
        let close = self.expect(TokenKind::RBrace, "to close struct literal")?;
        Ok(self.ctx.expr(
            ExprKind::StructLit { name, fields, spread },
            start.to(close.span),
        ))
    }

    pub(super) fn parse_if_expr(&mut self) -> ParseResult<&'a Expr<'a>> {
        let start = self.expect(TokenKind::If, "to begin if expression")?.span;
        let cond = self.without_struct_literal(|p| p.parse_expr())?;
        let then_branch = self.parse_block()?;
        let mut end = then_branch.span;
        let else_branch = if self.eat(TokenKind::Else) {
            let branch = if self.check(TokenKind::If) {
                self.parse_if_expr()?
            } else {
                let block = self.parse_block()?;
                let span = block.span;
                self.ctx.expr(ExprKind::Block(block), span)
            };
            end = branch.span;
            Some(branch)
        } else {
            None
        };
        Ok(self.ctx.expr(
            ExprKind::If { cond, then_branch, else_branch },
            start.to(end),
        ))
    }

    pub(super) fn parse_match_expr(&mut self) -> ParseResult<&'a Expr<'a>> {
        let start = self.expect(TokenKind::Match, "to begin match")?.span;
        let subject = self.without_struct_literal(|p| p.parse_expr())?;
        self.expect(TokenKind::LBrace, "to open match arms")?;
        let mut arms = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.at_end() {
            let arm_start = self.peek().span;
            let pattern = self.parse_pattern()?;
            let guard = if self.eat(TokenKind::If) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            self.expect(TokenKind::FatArrow, "before match arm body")?;
            let body = self.parse_expr()?;
            arms.push(MatchArm {
                pattern,
                guard,
                body,
                span: arm_start.to(body.span),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(TokenKind::RBrace, "to close match")?;
        Ok(self
            .ctx
            .expr(ExprKind::Match { subject, arms }, start.to(close.span)))
    }

    fn parse_lambda(&mut self) -> ParseResult<&'a Expr<'a>> {
        let start = self.peek().span;
        let mut params: Vec<Param<'a>> = Vec::new();
        if self.eat(TokenKind::OrOr) {
            // `||` is an empty parameter list.
        } else {
            self.expect(TokenKind::Pipe, "to open lambda parameters")?;
            if !self.check(TokenKind::Pipe) {
                loop {
                    let mutable = self.eat(TokenKind::Mut);
                    let p_start = self.peek().span;
                    let name = self.expect_ident("as lambda parameter")?;
                    let ty = if self.eat(TokenKind::Colon) {
                        Some(self.parse_type()?)
                    } else {
                        None
                    };
                    params.push(Param {
                        name,
                        ty,
                        mutable,
                        span: p_start.to(self.previous_span()),
                    });
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.expect(TokenKind::Pipe, "to close lambda parameters")?;
        }
        let return_type = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let body = self.parse_expr()?;
        Ok(self.ctx.expr(
            ExprKind::Lambda { params, return_type, body },
            start.to(body.span),
        ))
    }

    fn parse_quantifier(&mut self, kind: QuantifierKind) -> ParseResult<&'a Expr<'a>> {
        let start = self.advance().span; // forall / exists
        let mut bindings = Vec::new();
        loop {
            let b_start = self.peek().span;
            let name = self.expect_ident("as quantifier binding")?;
            let collection = if self.eat(TokenKind::In) {
                Some(self.without_struct_literal(|p| p.parse_range_level())?)
            } else {
                None
            };
            bindings.push(QuantBinding {
                name,
                collection,
                span: b_start.to(self.previous_span()),
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Colon, "before quantifier body")?;
        let body = self.parse_expr()?;
        Ok(self.ctx.expr(
            ExprKind::Quantifier { kind, bindings, body },
            start.to(body.span),
        ))
    }

    /// Range-level entry used where a full expression would swallow a
    /// trailing `:` context (quantifier collections).
    pub(super) fn parse_range_level(&mut self) -> ParseResult<&'a Expr<'a>> {
        self.parse_range()
    }

    fn binary(&mut self, op: BinaryOp, lhs: &'a Expr<'a>, rhs: &'a Expr<'a>) -> &'a Expr<'a> {
        self.ctx
            .expr(ExprKind::Binary { op, lhs, rhs }, lhs.span.to(rhs.span))
    }

    /// Reset the struct-literal restriction inside bracketed positions; the
    /// ambiguity it guards against cannot occur there.
    fn in_brackets<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> ParseResult<T>,
    ) -> ParseResult<T> {
        let saved = std::mem::take(&mut self.no_struct_literal);
        let result = f(self);
        self.no_struct_literal = saved;
        result
    }
}
