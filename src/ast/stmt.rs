use super::expr::{Block, Expr};
use super::types::TypeExpr;
use crate::intern::Symbol;
use crate::token::Span;

#[derive(Debug)]
pub struct Stmt<'a> {
    pub kind: StmtKind<'a>,
    pub span: Span,
}

/// Statements. `if`, `match`, and bare blocks appear in statement position as
/// [`StmtKind::Expr`] wrapping the corresponding expression node; the lowerer
/// recognizes them there and emits plain statement forms instead of IIFEs.
#[derive(Debug)]
pub enum StmtKind<'a> {
    Let {
        name: Symbol,
        mutable: bool,
        ty: Option<&'a TypeExpr<'a>>,
        init: Option<&'a Expr<'a>>,
    },
    Expr(&'a Expr<'a>),
    While {
        cond: &'a Expr<'a>,
        invariants: Vec<&'a Expr<'a>>,
        body: Block<'a>,
    },
    For {
        var: Symbol,
        iterable: &'a Expr<'a>,
        invariants: Vec<&'a Expr<'a>>,
        body: Block<'a>,
    },
    Return {
        value: Option<&'a Expr<'a>>,
    },
}
