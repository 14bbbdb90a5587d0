use super::expr::{Block, Expr};
use super::types::TypeExpr;
use crate::intern::Symbol;
use crate::options::VerifyLevel;
use crate::token::Span;

#[derive(Debug)]
pub struct Decl<'a> {
    pub kind: DeclKind<'a>,
    pub span: Span,
}

#[derive(Debug)]
pub enum DeclKind<'a> {
    Function(FunctionDecl<'a>),
    Variable {
        name: Symbol,
        mutable: bool,
        ty: Option<&'a TypeExpr<'a>>,
        init: Option<&'a Expr<'a>>,
    },
    TypeAlias {
        name: Symbol,
        generics: Vec<GenericParam<'a>>,
        ty: &'a TypeExpr<'a>,
    },
    Struct(StructDecl<'a>),
    Enum(EnumDecl<'a>),
    Trait(TraitDecl<'a>),
    Impl(ImplDecl<'a>),
    Contract(ContractDecl<'a>),
    Intent(IntentDecl<'a>),
    Effect(EffectDecl<'a>),
    Capability(CapabilityDecl<'a>),
    Import(ImportDecl),
    /// `export <decl>`
    Export(&'a Decl<'a>),
}

impl<'a> Decl<'a> {
    /// The declared name, if this declaration introduces one.
    pub fn name(&self) -> Option<Symbol> {
        match &self.kind {
            DeclKind::Function(f) => Some(f.name),
            DeclKind::Variable { name, .. } => Some(*name),
            DeclKind::TypeAlias { name, .. } => Some(*name),
            DeclKind::Struct(s) => Some(s.name),
            DeclKind::Enum(e) => Some(e.name),
            DeclKind::Trait(t) => Some(t.name),
            DeclKind::Contract(c) => Some(c.name),
            DeclKind::Intent(i) => Some(i.name),
            DeclKind::Effect(e) => Some(e.name),
            DeclKind::Capability(c) => Some(c.name),
            DeclKind::Impl(_) | DeclKind::Import(_) => None,
            DeclKind::Export(inner) => inner.name(),
        }
    }
}

/// `name: Type`, `name: mut Type`, or bare `self` in impl/trait methods.
#[derive(Debug, Clone, Copy)]
pub struct Param<'a> {
    pub name: Symbol,
    pub ty: Option<&'a TypeExpr<'a>>,
    pub mutable: bool,
    pub span: Span,
}

/// `T`, `T: Bound + Bound`, or `T = Default`.
#[derive(Debug, Clone)]
pub struct GenericParam<'a> {
    pub name: Symbol,
    pub bounds: Vec<&'a TypeExpr<'a>>,
    pub default: Option<&'a TypeExpr<'a>>,
    pub span: Span,
}

#[derive(Debug)]
pub struct FunctionDecl<'a> {
    pub name: Symbol,
    pub generics: Vec<GenericParam<'a>>,
    pub params: Vec<Param<'a>>,
    pub return_type: Option<&'a TypeExpr<'a>>,
    pub annotations: Vec<Annotation<'a>>,
    pub body: Option<Block<'a>>,
    pub is_pure: bool,
    pub is_extern: bool,
}

impl<'a> FunctionDecl<'a> {
    pub fn requires(&self) -> impl Iterator<Item = &'a Expr<'a>> + '_ {
        self.annotations.iter().filter_map(|a| match &a.kind {
            AnnotationKind::Requires(e) => Some(*e),
            _ => None,
        })
    }

    pub fn ensures(&self) -> impl Iterator<Item = &'a Expr<'a>> + '_ {
        self.annotations.iter().filter_map(|a| match &a.kind {
            AnnotationKind::Ensures(e) => Some(*e),
            _ => None,
        })
    }

    pub fn declared_effects(&self) -> Vec<Symbol> {
        let mut out = Vec::new();
        for a in &self.annotations {
            if let AnnotationKind::Effects(names) = &a.kind {
                out.extend(names.iter().copied());
            }
        }
        out
    }
}

#[derive(Debug)]
pub struct FieldDecl<'a> {
    pub name: Symbol,
    pub ty: &'a TypeExpr<'a>,
    pub default: Option<&'a Expr<'a>>,
    pub annotations: Vec<Annotation<'a>>,
    pub span: Span,
}

#[derive(Debug)]
pub struct StructDecl<'a> {
    pub name: Symbol,
    pub generics: Vec<GenericParam<'a>>,
    pub fields: Vec<FieldDecl<'a>>,
    /// `@invariant` annotations written at struct level.
    pub annotations: Vec<Annotation<'a>>,
}

#[derive(Debug)]
pub struct VariantDecl<'a> {
    pub name: Symbol,
    /// Ordered field types; empty for unit variants.
    pub fields: Vec<&'a TypeExpr<'a>>,
    pub span: Span,
}

#[derive(Debug)]
pub struct EnumDecl<'a> {
    pub name: Symbol,
    pub generics: Vec<GenericParam<'a>>,
    pub variants: Vec<VariantDecl<'a>>,
}

#[derive(Debug)]
pub struct TraitDecl<'a> {
    pub name: Symbol,
    pub generics: Vec<GenericParam<'a>>,
    pub supertraits: Vec<Symbol>,
    pub methods: Vec<FunctionDecl<'a>>,
}

#[derive(Debug)]
pub struct ImplDecl<'a> {
    /// `impl Trait for Type` carries the trait; inherent impls do not.
    pub trait_name: Option<Symbol>,
    pub target: &'a TypeExpr<'a>,
    pub methods: Vec<FunctionDecl<'a>>,
}

/// Body contains only annotations (requires/ensures/invariant).
#[derive(Debug)]
pub struct ContractDecl<'a> {
    pub name: Symbol,
    pub generics: Vec<GenericParam<'a>>,
    pub clauses: Vec<Annotation<'a>>,
}

/// Body contains only ensures annotations.
#[derive(Debug)]
pub struct IntentDecl<'a> {
    pub name: Symbol,
    pub generics: Vec<GenericParam<'a>>,
    pub clauses: Vec<Annotation<'a>>,
}

/// Body contains only method signatures.
#[derive(Debug)]
pub struct EffectDecl<'a> {
    pub name: Symbol,
    pub generics: Vec<GenericParam<'a>>,
    pub methods: Vec<FunctionDecl<'a>>,
}

/// Fields name permissions and their types.
#[derive(Debug)]
pub struct CapabilityDecl<'a> {
    pub name: Symbol,
    pub permissions: Vec<(Symbol, &'a TypeExpr<'a>)>,
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub path: Vec<Symbol>,
    pub items: ImportItems,
}

#[derive(Debug, Clone)]
pub enum ImportItems {
    /// `import a.b`, binding the final segment as a module name.
    Module,
    /// `import a.b.{x, y as z}`
    List(Vec<(Symbol, Option<Symbol>)>),
    /// `import a.b.*`
    Wildcard,
}

#[derive(Debug)]
pub struct Annotation<'a> {
    pub kind: AnnotationKind<'a>,
    pub span: Span,
}

#[derive(Debug)]
pub enum AnnotationKind<'a> {
    Requires(&'a Expr<'a>),
    Ensures(&'a Expr<'a>),
    Invariant(&'a Expr<'a>),
    /// `@effect[IO, FileSystem]`
    Effects(Vec<Symbol>),
    /// `@capability Name { permission: value, … }`
    Capability { name: Symbol, fields: Vec<(Symbol, &'a Expr<'a>)> },
    /// `@contract Name<…>`
    ContractRef { name: Symbol, generics: Vec<&'a TypeExpr<'a>> },
    /// `@intent Name<…>`
    IntentRef { name: Symbol, generics: Vec<&'a TypeExpr<'a>> },
    /// `@verify(level: "…")`
    Verify(VerifyLevel),
}
