//! Collection: the first resolver sub-pass.
//!
//! Walks top-level declarations and installs names so that checking may
//! resolve forward references: type names first, then resolved signatures,
//! definition bodies, contract/intent clause strings, and impl methods.
//! Failures here never stop the checking pass; bodies are still checked
//! against whatever partial signatures were installed.

use super::check::Checker;
use super::registry::{
    CapabilityDef, EffectDef, EnumDef, FieldDef, MethodSig, StructDef, TraitDef, VariantDef,
};
use super::scope::{ContractDef, IntentDef, ScopeKind, SymbolEntry, SymbolKind};
use super::ty::{FnParam, FnTy, Ty};
use crate::ast::{
    Annotation, AnnotationKind, Decl, DeclKind, FunctionDecl, GenericParam, ImportItems, Program,
};
use crate::formatter::ExprPrinter;
use crate::intern::Symbol;

impl<'p, 'i, 's> Checker<'p, 'i, 's> {
    pub fn collect(&mut self, program: &Program<'_>) {
        for decl in &program.decls {
            self.collect_type_name(decl);
        }
        // Aliases next so later signatures see them resolved.
        for decl in &program.decls {
            if let DeclKind::TypeAlias { name, ty, .. } = &Self::unwrap_export(decl).kind {
                let resolved = self.resolve_type(ty);
                self.table.update_type(*name, resolved);
            }
        }
        for decl in &program.decls {
            self.collect_definition(decl);
        }
        for decl in &program.decls {
            self.collect_value(decl);
        }
    }

    fn unwrap_export<'d, 'a>(decl: &'d Decl<'a>) -> &'d Decl<'a> {
        match &decl.kind {
            DeclKind::Export(inner) => Self::unwrap_export(inner),
            _ => decl,
        }
    }

    /// Sweep 1: type names become visible, in arbitrary order.
    fn collect_type_name(&mut self, decl: &Decl<'_>) {
        let decl = Self::unwrap_export(decl);
        let span = decl.span;
        let (name, ty) = match &decl.kind {
            DeclKind::Struct(s) => (s.name, Ty::Struct(s.name)),
            DeclKind::Enum(e) => (e.name, Ty::Enum(e.name)),
            DeclKind::Trait(t) => (t.name, Ty::Trait(t.name)),
            DeclKind::Effect(e) => (e.name, Ty::Effect(e.name)),
            DeclKind::Capability(c) => (c.name, Ty::Capability(c.name)),
            DeclKind::TypeAlias { name, .. } => (*name, Ty::Unknown),
            DeclKind::Import(import) => {
                self.collect_import(import);
                return;
            }
            _ => return,
        };
        if self.table.define_type(name, ty.clone()).is_err() {
            self.duplicate(span, name);
            return;
        }
        let _ = self.table.define(SymbolEntry {
            name,
            kind: SymbolKind::Type,
            ty,
            mutable: false,
            span,
        });
    }

    fn collect_import(&mut self, import: &crate::ast::ImportDecl) {
        // Imports introduce opaque names only; nothing is resolved across
        // modules.
        let bind_opaque = |checker: &mut Self, name: Symbol| {
            let _ = checker.table.define(SymbolEntry {
                name,
                kind: SymbolKind::Module,
                ty: Ty::Unknown,
                mutable: false,
                span: crate::token::Span::default(),
            });
            let _ = checker.table.define_type(name, Ty::Unknown);
        };
        match &import.items {
            ImportItems::Module | ImportItems::Wildcard => {
                if let Some(last) = import.path.last() {
                    bind_opaque(self, *last);
                }
            }
            ImportItems::List(list) => {
                for (name, alias) in list {
                    bind_opaque(self, alias.unwrap_or(*name));
                }
            }
        }
    }

    /// Sweep 2: definition bodies resolve now that every name exists.
    fn collect_definition(&mut self, decl: &Decl<'_>) {
        let decl = Self::unwrap_export(decl);
        match &decl.kind {
            DeclKind::Struct(s) => {
                self.table.push(ScopeKind::Block);
                self.bind_generics(&s.generics);
                let fields = s
                    .fields
                    .iter()
                    .map(|f| FieldDef {
                        name: f.name,
                        ty: self.resolve_type(f.ty),
                        has_default: f.default.is_some(),
                    })
                    .collect();
                self.table.pop();
                let printer = ExprPrinter::new(self.interner);
                let invariants = s
                    .annotations
                    .iter()
                    .filter_map(|a| match &a.kind {
                        AnnotationKind::Invariant(e) => Some(printer.print(e)),
                        _ => None,
                    })
                    .collect();
                self.registry.define_struct(StructDef {
                    name: s.name,
                    fields,
                    generics: s.generics.iter().map(|g| g.name).collect(),
                    invariants,
                    module: None,
                });
            }
            DeclKind::Enum(e) => {
                self.table.push(ScopeKind::Block);
                self.bind_generics(&e.generics);
                let variants = e
                    .variants
                    .iter()
                    .map(|v| VariantDef {
                        name: v.name,
                        fields: v.fields.iter().map(|t| self.resolve_type(t)).collect(),
                    })
                    .collect();
                self.table.pop();
                self.registry.define_enum(EnumDef {
                    name: e.name,
                    variants,
                    generics: e.generics.iter().map(|g| g.name).collect(),
                });
            }
            DeclKind::Trait(t) => {
                self.table.push(ScopeKind::Block);
                self.bind_generics(&t.generics);
                let methods = t
                    .methods
                    .iter()
                    .map(|m| MethodSig { name: m.name, ty: self.method_signature(m, &[]) })
                    .collect();
                self.table.pop();
                self.registry.define_trait(TraitDef {
                    name: t.name,
                    methods,
                    supertraits: t.supertraits.clone(),
                    generics: t.generics.iter().map(|g| g.name).collect(),
                });
            }
            DeclKind::Effect(e) => {
                self.table.push(ScopeKind::Block);
                self.bind_generics(&e.generics);
                // Effect methods carry their own effect, so every invocation
                // site needs it in the active set.
                let methods = e
                    .methods
                    .iter()
                    .map(|m| MethodSig { name: m.name, ty: self.method_signature(m, &[e.name]) })
                    .collect();
                self.table.pop();
                self.registry.define_effect(EffectDef {
                    name: e.name,
                    methods,
                    generics: e.generics.iter().map(|g| g.name).collect(),
                });
            }
            DeclKind::Capability(c) => {
                let permissions = c
                    .permissions
                    .iter()
                    .map(|(name, ty)| (*name, self.resolve_type(ty)))
                    .collect();
                self.registry
                    .define_capability(CapabilityDef { name: c.name, permissions });
            }
            _ => {}
        }
    }

    /// Sweep 3: value-level names (functions, variables), impl methods, and
    /// the serialized contract/intent clause tables.
    fn collect_value(&mut self, decl: &Decl<'_>) {
        let decl = Self::unwrap_export(decl);
        let span = decl.span;
        match &decl.kind {
            DeclKind::Function(f) => {
                let fn_ty = self.function_signature(f);
                if self
                    .table
                    .define(SymbolEntry {
                        name: f.name,
                        kind: SymbolKind::Function,
                        ty: Ty::Function(Box::new(fn_ty)),
                        mutable: false,
                        span,
                    })
                    .is_err()
                {
                    self.duplicate(span, f.name);
                }
            }
            DeclKind::Variable { name, ty, mutable, .. } => {
                let declared = ty.map(|t| self.resolve_type(t)).unwrap_or(Ty::Unknown);
                if self
                    .table
                    .define(SymbolEntry {
                        name: *name,
                        kind: SymbolKind::Variable,
                        ty: declared,
                        mutable: *mutable,
                        span,
                    })
                    .is_err()
                {
                    self.duplicate(span, *name);
                }
            }
            DeclKind::Impl(imp) => {
                if let Some(target) = imp.target.head_name() {
                    for method in &imp.methods {
                        let sig = self.method_signature(method, &[]);
                        self.registry.define_method(target, method.name, sig);
                    }
                }
            }
            DeclKind::Contract(c) => {
                let def = self.contract_clauses(c.name, &c.clauses);
                if self.table.define_contract(def).is_err() {
                    self.duplicate(span, c.name);
                }
            }
            DeclKind::Intent(i) => {
                let printer = ExprPrinter::new(self.interner);
                let ensures = i
                    .clauses
                    .iter()
                    .filter_map(|a| match &a.kind {
                        AnnotationKind::Ensures(e) => Some(printer.print(e)),
                        _ => None,
                    })
                    .collect();
                if self
                    .table
                    .define_intent(IntentDef { name: i.name, ensures })
                    .is_err()
                {
                    self.duplicate(span, i.name);
                }
            }
            _ => {}
        }
    }

    fn contract_clauses(&self, name: Symbol, clauses: &[Annotation<'_>]) -> ContractDef {
        let printer = ExprPrinter::new(self.interner);
        let mut def = ContractDef { name, ..Default::default() };
        for clause in clauses {
            match &clause.kind {
                AnnotationKind::Requires(e) => def.requires.push(printer.print(e)),
                AnnotationKind::Ensures(e) => def.ensures.push(printer.print(e)),
                AnnotationKind::Invariant(e) => def.invariants.push(printer.print(e)),
                _ => {}
            }
        }
        def
    }

    /// Resolve a function declaration into its semantic signature. Generic
    /// parameters are bound in a throwaway scope for the duration.
    pub(super) fn function_signature(&mut self, f: &FunctionDecl<'_>) -> FnTy {
        self.table.push(ScopeKind::Block);
        self.bind_generics(&f.generics);
        let params = f
            .params
            .iter()
            .map(|p| FnParam {
                name: p.name,
                ty: match p.ty {
                    Some(t) => self.resolve_type(t),
                    None => self.current_self_type(),
                },
                mutable: p.mutable,
            })
            .collect();
        let ret = f
            .return_type
            .map(|t| self.resolve_type(t))
            .unwrap_or(Ty::VOID);
        self.table.pop();

        let mut capabilities = Vec::new();
        let mut contracts = Vec::new();
        for annotation in &f.annotations {
            match &annotation.kind {
                AnnotationKind::Capability { name, .. } => capabilities.push(*name),
                AnnotationKind::ContractRef { name, .. } => contracts.push(*name),
                _ => {}
            }
        }

        FnTy {
            params,
            ret,
            effects: f.declared_effects(),
            capabilities,
            contracts,
            is_pure: f.is_pure,
        }
    }

    /// Like [`Self::function_signature`] but drops a leading `self`
    /// parameter, so method call sites check the explicit arguments only.
    /// `extra_effects` lets effect declarations stamp their own name onto
    /// every method.
    pub(super) fn method_signature(
        &mut self,
        f: &FunctionDecl<'_>,
        extra_effects: &[Symbol],
    ) -> FnTy {
        let mut sig = self.function_signature(f);
        if let Some(first) = f.params.first() {
            if first.ty.is_none() {
                sig.params.remove(0);
            }
        }
        for effect in extra_effects {
            if !sig.effects.contains(effect) {
                sig.effects.push(*effect);
            }
        }
        sig
    }

    pub(super) fn bind_generics(&mut self, generics: &[GenericParam<'_>]) {
        for generic in generics {
            let bounds = generic
                .bounds
                .iter()
                .filter_map(|b| b.head_name())
                .collect();
            let var = Ty::Var { name: generic.name, id: self.fresh_var_id(), bounds };
            if self.table.define_type(generic.name, var.clone()).is_err() {
                self.duplicate(generic.span, generic.name);
                continue;
            }
            let _ = self.table.define(SymbolEntry {
                name: generic.name,
                kind: SymbolKind::TypeVar,
                ty: var,
                mutable: false,
                span: generic.span,
            });
        }
    }
}
