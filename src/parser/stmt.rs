//! Statement grammar and block parsing.

use super::{ParseResult, Parser};
use crate::ast::{Block, Expr, ExprKind, Stmt, StmtKind};
use crate::token::TokenKind;

impl<'a, 'i, 's> Parser<'a, 'i, 's> {
    /// `{ stmt* tail-expr? }`. A trailing expression without a semicolon
    /// becomes the block's value.
    pub(super) fn parse_block(&mut self) -> ParseResult<Block<'a>> {
        let open = self.expect(TokenKind::LBrace, "to open block")?;
        let saved = std::mem::take(&mut self.no_struct_literal);

        let mut stmts: Vec<Stmt<'a>> = Vec::new();
        let mut tail: Option<&'a Expr<'a>> = None;

        while !self.check(TokenKind::RBrace) && !self.at_end() {
            match self.parse_stmt_or_tail() {
                Ok(StmtOrTail::Stmt(stmt)) => stmts.push(stmt),
                Ok(StmtOrTail::Tail(expr)) => {
                    tail = Some(expr);
                    break;
                }
                Err(abort) => {
                    self.no_struct_literal = saved;
                    return Err(abort);
                }
            }
        }

        self.no_struct_literal = saved;
        let close = self.expect(TokenKind::RBrace, "to close block")?;
        Ok(Block {
            stmts: self.ctx.stmt_slice(stmts),
            tail,
            span: open.span.to(close.span),
        })
    }

    fn parse_stmt_or_tail(&mut self) -> ParseResult<StmtOrTail<'a>> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::Let => {
                self.advance();
                let mutable = self.eat(TokenKind::Mut);
                let name = self.expect_ident("as variable name")?;
                let ty = if self.eat(TokenKind::Colon) {
                    Some(self.parse_type()?)
                } else {
                    None
                };
                let init = if self.eat(TokenKind::Assign) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                self.expect(TokenKind::Semicolon, "after variable declaration")?;
                Ok(StmtOrTail::Stmt(Stmt {
                    kind: StmtKind::Let { name, mutable, ty, init },
                    span: start.to(self.previous_span()),
                }))
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.check(TokenKind::Semicolon) || self.check(TokenKind::RBrace) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                // The semicolon may be elided before a closing brace.
                if !self.eat(TokenKind::Semicolon) && !self.check(TokenKind::RBrace) {
                    let found = self.peek().kind.describe();
                    return Err(
                        self.error_here(format!("expected ';' after return, found {}", found))
                    );
                }
                Ok(StmtOrTail::Stmt(Stmt {
                    kind: StmtKind::Return { value },
                    span: start.to(self.previous_span()),
                }))
            }
            TokenKind::While => {
                self.advance();
                let cond = self.without_struct_literal(|p| p.parse_expr())?;
                let invariants = self.parse_loop_invariants()?;
                let body = self.parse_block()?;
                Ok(StmtOrTail::Stmt(Stmt {
                    kind: StmtKind::While { cond, invariants, body },
                    span: start.to(body.span),
                }))
            }
            TokenKind::For => {
                self.advance();
                let var = self.expect_ident("as loop variable")?;
                self.expect(TokenKind::In, "after loop variable")?;
                let iterable = self.without_struct_literal(|p| p.parse_expr())?;
                let invariants = self.parse_loop_invariants()?;
                let body = self.parse_block()?;
                Ok(StmtOrTail::Stmt(Stmt {
                    kind: StmtKind::For { var, iterable, invariants, body },
                    span: start.to(body.span),
                }))
            }
            _ => {
                let expr = self.parse_expr()?;
                if self.eat(TokenKind::Semicolon) {
                    Ok(StmtOrTail::Stmt(Stmt {
                        kind: StmtKind::Expr(expr),
                        span: start.to(self.previous_span()),
                    }))
                } else if self.check(TokenKind::RBrace) {
                    Ok(StmtOrTail::Tail(expr))
                } else if matches!(
                    expr.kind,
                    ExprKind::If { .. } | ExprKind::Match { .. } | ExprKind::Block(_)
                ) {
                    // Block-shaped statements need no semicolon.
                    Ok(StmtOrTail::Stmt(Stmt {
                        kind: StmtKind::Expr(expr),
                        span: expr.span,
                    }))
                } else {
                    let found = self.peek().kind.describe();
                    Err(self.error_here(format!(
                        "expected ';' after expression statement, found {}",
                        found
                    )))
                }
            }
        }
    }

    fn parse_loop_invariants(&mut self) -> ParseResult<Vec<&'a Expr<'a>>> {
        let mut invariants = Vec::new();
        while self.check(TokenKind::At) && self.peek_next_kind() == TokenKind::Invariant {
            self.advance();
            self.advance();
            let cond = self.without_struct_literal(|p| p.parse_expr())?;
            invariants.push(cond);
        }
        Ok(invariants)
    }
}

enum StmtOrTail<'a> {
    Stmt(Stmt<'a>),
    Tail(&'a Expr<'a>),
}
