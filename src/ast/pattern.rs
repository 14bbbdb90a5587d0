use super::Literal;
use crate::intern::Symbol;
use crate::token::Span;

#[derive(Debug)]
pub struct Pattern<'a> {
    pub kind: PatternKind<'a>,
    pub span: Span,
}

#[derive(Debug)]
pub enum PatternKind<'a> {
    /// `_`
    Wildcard,
    Literal(Literal),
    /// `x` or `mut x`
    Binding { name: Symbol, mutable: bool },
    Tuple(Vec<&'a Pattern<'a>>),
    /// `Name { field, field: pat, .. }`
    Struct { name: Symbol, fields: Vec<(Symbol, Option<&'a Pattern<'a>>)>, rest: bool },
    /// `Type::Variant` or `Type::Variant(p1, p2)`
    EnumVariant { ty: Symbol, variant: Symbol, fields: Vec<&'a Pattern<'a>> },
    /// `lo..hi` / `lo..=hi`
    Range { lo: Literal, hi: Literal, inclusive: bool },
}

impl<'a> Pattern<'a> {
    /// Whether this pattern matches any subject, making a following arm
    /// unreachable and a runtime exhaustiveness check unnecessary.
    pub fn is_irrefutable(&self) -> bool {
        match &self.kind {
            PatternKind::Wildcard | PatternKind::Binding { .. } => true,
            PatternKind::Tuple(items) => items.iter().all(|p| p.is_irrefutable()),
            _ => false,
        }
    }

}
