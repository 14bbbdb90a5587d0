//! Arena syntax tree.
//!
//! Nodes are allocated in bump arenas owned by the compilation driver and
//! referenced by `&'a` pointers; a whole tree is dropped at once when the
//! arenas go out of scope. Every node carries a [`Span`].

mod decl;
mod expr;
mod pattern;
mod stmt;
mod types;

pub use decl::{
    Annotation, AnnotationKind, CapabilityDecl, ContractDecl, Decl, DeclKind, EffectDecl, EnumDecl,
    FieldDecl, FunctionDecl, GenericParam, ImplDecl, ImportDecl, ImportItems, IntentDecl, Param,
    StructDecl, TraitDecl, VariantDecl,
};
pub use expr::{BinaryOp, Block, Expr, ExprKind, MatchArm, QuantBinding, QuantifierKind, UnaryOp};
pub use pattern::{Pattern, PatternKind};
pub use stmt::{Stmt, StmtKind};
pub use types::{TypeExpr, TypeExprKind};

pub use crate::token::LiteralValue as Literal;

use crate::arena::Arena;
use crate::token::Span;

/// Ordered list of top-level declarations.
pub struct Program<'a> {
    pub decls: Vec<&'a Decl<'a>>,
}

/// Bundle of arena references handed to the parser. Copyable so parsing
/// helpers can pass it around freely.
#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    pub exprs: &'a Arena<Expr<'a>>,
    pub stmts: &'a Arena<Stmt<'a>>,
    pub decls: &'a Arena<Decl<'a>>,
    pub types: &'a Arena<TypeExpr<'a>>,
    pub patterns: &'a Arena<Pattern<'a>>,
}

impl<'a> AstContext<'a> {
    pub fn new(
        exprs: &'a Arena<Expr<'a>>,
        stmts: &'a Arena<Stmt<'a>>,
        decls: &'a Arena<Decl<'a>>,
        types: &'a Arena<TypeExpr<'a>>,
        patterns: &'a Arena<Pattern<'a>>,
    ) -> Self {
        AstContext { exprs, stmts, decls, types, patterns }
    }

    pub fn expr(&self, kind: ExprKind<'a>, span: Span) -> &'a Expr<'a> {
        self.exprs.alloc(Expr { kind, span })
    }

    pub fn stmt_slice(&self, stmts: Vec<Stmt<'a>>) -> &'a [Stmt<'a>] {
        self.stmts.alloc_slice(stmts)
    }

    pub fn decl(&self, kind: DeclKind<'a>, span: Span) -> &'a Decl<'a> {
        self.decls.alloc(Decl { kind, span })
    }

    pub fn ty(&self, kind: TypeExprKind<'a>, span: Span) -> &'a TypeExpr<'a> {
        self.types.alloc(TypeExpr { kind, span })
    }

    pub fn pattern(&self, kind: PatternKind<'a>, span: Span) -> &'a Pattern<'a> {
        self.patterns.alloc(Pattern { kind, span })
    }
}

/// Owns the arenas behind an [`AstContext`]. Convenient for tests and for the
/// driver, which needs all five arenas to outlive the parse.
#[derive(Default)]
pub struct AstArenas<'a> {
    pub exprs: Arena<Expr<'a>>,
    pub stmts: Arena<Stmt<'a>>,
    pub decls: Arena<Decl<'a>>,
    pub types: Arena<TypeExpr<'a>>,
    pub patterns: Arena<Pattern<'a>>,
}

impl<'a> AstArenas<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&'a self) -> AstContext<'a> {
        AstContext::new(&self.exprs, &self.stmts, &self.decls, &self.types, &self.patterns)
    }
}
