//! Checking: the second resolver sub-pass.
//!
//! Types every body and annotation against the environment the collection
//! pass installed. Carries the ambient contract-mode flag, the enclosing
//! function's return type, and the active effect and capability sets as
//! explicit checker state. Sub-expressions that fail adopt `Unknown` so one
//! error does not cascade.

use std::collections::HashMap;

use super::registry::{EffectDef, MethodSig, TypeRegistry};
use super::scope::{ScopeKind, SymbolEntry, SymbolKind, SymbolTable};
use super::ty::{is_assignable, widen, FnParam, FnTy, Prim, Ty};
use super::{Analysis, WellKnown};
use crate::ast::{
    Annotation, AnnotationKind, BinaryOp, Block, Decl, DeclKind, Expr, ExprKind, FunctionDecl,
    Literal, Pattern, PatternKind, Program, QuantifierKind, Stmt, StmtKind, TypeExpr,
    TypeExprKind, UnaryOp,
};
use crate::diagnostics::{DiagnosticSink, Phase};
use crate::intern::{Interner, Symbol};
use crate::suggest::find_similar;
use crate::token::Span;

pub struct Checker<'p, 'i, 's> {
    pub(super) interner: &'i Interner,
    pub(super) names: &'p WellKnown,
    pub(super) sink: &'s mut DiagnosticSink,
    pub(super) table: SymbolTable,
    pub(super) registry: TypeRegistry,
    pub(super) types: HashMap<Span, Ty>,
    pub(super) current_return: Option<Ty>,
    pub(super) current_self: Option<Ty>,
    pub(super) in_contract: bool,
    next_var_id: u32,
}

impl<'p, 'i, 's> Checker<'p, 'i, 's> {
    pub fn new(interner: &'i Interner, names: &'p WellKnown, sink: &'s mut DiagnosticSink) -> Self {
        let mut checker = Checker {
            interner,
            names,
            sink,
            table: SymbolTable::new(),
            registry: TypeRegistry::new(),
            types: HashMap::new(),
            current_return: None,
            current_self: None,
            in_contract: false,
            next_var_id: 0,
        };
        checker.seed_builtin_io();
        checker.seed_runtime_values();
        checker
    }

    /// `Ok`, `Err`, `Some`, `None` and their predicates are provided by the
    /// emitted runtime; the checker types them loosely since the language has
    /// no generic inference for free constructors.
    fn seed_runtime_values(&mut self) {
        let loose_result = Ty::Result { ok: Box::new(Ty::Unknown), err: Box::new(Ty::Unknown) };
        let one_arg = |ret: Ty| {
            Ty::Function(Box::new(FnTy::plain(
                vec![FnParam { name: Symbol::EMPTY, ty: Ty::Unknown, mutable: false }],
                ret,
            )))
        };
        let builtins = [
            (self.names.ok_ctor, one_arg(loose_result.clone())),
            (self.names.err_ctor, one_arg(loose_result.clone())),
            (self.names.some_ctor, one_arg(Ty::Optional(Box::new(Ty::Unknown)))),
            (self.names.none_value, Ty::Optional(Box::new(Ty::Unknown))),
            (self.names.is_ok, one_arg(Ty::BOOL)),
            (self.names.is_err, one_arg(Ty::BOOL)),
            (self.names.is_some, one_arg(Ty::BOOL)),
            (self.names.is_none, one_arg(Ty::BOOL)),
            (self.names.unwrap_fn, one_arg(Ty::Unknown)),
        ];
        for (name, ty) in builtins {
            let _ = self.table.define(SymbolEntry {
                name,
                kind: SymbolKind::Function,
                ty,
                mutable: false,
                span: Span::default(),
            });
        }
    }

    /// The `IO` effect is built in: programs may declare `@effect[IO]`
    /// without declaring the effect themselves.
    fn seed_builtin_io(&mut self) {
        let io = self.names.io;
        let def = EffectDef {
            name: io,
            methods: vec![
                MethodSig {
                    name: self.names.io_read,
                    ty: FnTy {
                        params: Vec::new(),
                        ret: Ty::Prim(Prim::Str),
                        effects: vec![io],
                        capabilities: Vec::new(),
                        contracts: Vec::new(),
                        is_pure: false,
                    },
                },
                MethodSig {
                    name: self.names.io_write,
                    ty: FnTy {
                        params: vec![FnParam {
                            name: Symbol::EMPTY,
                            ty: Ty::Unknown,
                            mutable: false,
                        }],
                        ret: Ty::VOID,
                        effects: vec![io],
                        capabilities: Vec::new(),
                        contracts: Vec::new(),
                        is_pure: false,
                    },
                },
            ],
            generics: Vec::new(),
        };
        self.registry.define_effect(def);
        let _ = self.table.define_type(io, Ty::Effect(io));
        let _ = self.table.define(SymbolEntry {
            name: io,
            kind: SymbolKind::Type,
            ty: Ty::Effect(io),
            mutable: false,
            span: Span::default(),
        });
    }

    pub fn finish(self) -> Analysis {
        Analysis { types: self.types, table: self.table, registry: self.registry }
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    pub(super) fn error(&mut self, span: Span, message: impl Into<String>) {
        self.sink.error(Phase::Analyzer, span, message);
    }

    pub(super) fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.sink.warning(Phase::Analyzer, span, message);
    }

    pub(super) fn duplicate(&mut self, span: Span, name: Symbol) {
        let name = self.interner.resolve(name).to_string();
        self.error(span, format!("duplicate definition of '{}'", name));
    }

    pub(super) fn fresh_var_id(&mut self) -> u32 {
        let id = self.next_var_id;
        self.next_var_id += 1;
        id
    }

    pub(super) fn current_self_type(&self) -> Ty {
        self.current_self.clone().unwrap_or(Ty::Unknown)
    }

    fn record(&mut self, span: Span, ty: Ty) -> Ty {
        self.types.insert(span, ty.clone());
        ty
    }

    // ------------------------------------------------------------------
    // Type resolution (syntactic -> semantic)
    // ------------------------------------------------------------------

    pub(super) fn resolve_type(&mut self, ty: &TypeExpr<'_>) -> Ty {
        match &ty.kind {
            TypeExprKind::Named { path, generics } => {
                if path.len() > 1 {
                    // Imports introduce opaque names only; qualified types
                    // stay unresolved without complaint.
                    return Ty::Unknown;
                }
                let name = path[0];
                if let Some(prim) = self.names.prim_for(name) {
                    return Ty::Prim(prim);
                }
                if name == self.names.result_type {
                    return self.resolve_result(generics, ty.span);
                }
                if name == self.names.option_type {
                    if generics.len() != 1 {
                        self.error(ty.span, "Option expects one type argument");
                        return Ty::Unknown;
                    }
                    let inner = self.resolve_type(generics[0]);
                    return Ty::Optional(Box::new(inner));
                }
                match self.table.lookup_type(name).cloned() {
                    Some(base) => {
                        if generics.is_empty() {
                            base
                        } else {
                            let args = generics.iter().map(|g| self.resolve_type(g)).collect();
                            Ty::Generic { base: Box::new(base), args }
                        }
                    }
                    None => {
                        let text = self.interner.resolve(name).to_string();
                        let mut message = format!("unknown type '{}'", text);
                        if let Some(suggestion) = self.suggest_type_name(&text) {
                            message.push_str(&format!("; did you mean '{}'?", suggestion));
                        }
                        self.error(ty.span, message.clone());
                        Ty::Error(message)
                    }
                }
            }
            TypeExprKind::Array { elem, size } => Ty::Array {
                elem: Box::new(self.resolve_type(elem)),
                size: *size,
            },
            TypeExprKind::Tuple(items) => {
                Ty::Tuple(items.iter().map(|t| self.resolve_type(t)).collect())
            }
            TypeExprKind::Function { params, ret, effects } => {
                let params = params
                    .iter()
                    .map(|p| FnParam {
                        name: Symbol::EMPTY,
                        ty: self.resolve_type(p),
                        mutable: false,
                    })
                    .collect();
                let ret = self.resolve_type(ret);
                Ty::Function(Box::new(FnTy {
                    params,
                    ret,
                    effects: effects.clone(),
                    capabilities: Vec::new(),
                    contracts: Vec::new(),
                    is_pure: false,
                }))
            }
            TypeExprKind::Reference { inner, mutable } => Ty::Reference {
                inner: Box::new(self.resolve_type(inner)),
                mutable: *mutable,
            },
            TypeExprKind::Optional(inner) => Ty::Optional(Box::new(self.resolve_type(inner))),
            TypeExprKind::SelfType => match &self.current_self {
                Some(ty) => ty.clone(),
                None => {
                    self.error(ty.span, "'Self' is only valid inside a trait or impl");
                    Ty::Unknown
                }
            },
        }
    }

    fn resolve_result(&mut self, generics: &[&TypeExpr<'_>], span: Span) -> Ty {
        if generics.len() != 2 {
            self.error(span, "Result expects two type arguments");
            return Ty::Unknown;
        }
        let ok = self.resolve_type(generics[0]);
        let err = self.resolve_type(generics[1]);
        Ty::Result { ok: Box::new(ok), err: Box::new(err) }
    }

    fn suggest_type_name(&self, text: &str) -> Option<String> {
        let mut candidates: Vec<&str> = vec![
            "Int", "Int8", "Int16", "Int32", "Int64", "UInt", "Float32", "Float64", "Bool",
            "Char", "String", "Void", "Never", "Result", "Option",
        ];
        let visible = self.table.visible_names();
        let resolved: Vec<&str> = visible
            .iter()
            .map(|s| self.interner.resolve(*s))
            .collect();
        candidates.extend(resolved.iter().copied());
        find_similar(text, candidates.into_iter(), 2).map(|s| s.to_string())
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    pub fn check_program(&mut self, program: &Program<'_>) {
        for decl in &program.decls {
            self.check_decl(decl);
        }
    }

    fn check_decl(&mut self, decl: &Decl<'_>) {
        match &decl.kind {
            DeclKind::Export(inner) => self.check_decl(inner),
            DeclKind::Function(f) => self.check_function(f, None),
            DeclKind::Variable { name, ty, init, mutable } => {
                self.check_variable(decl.span, *name, *ty, *init, *mutable, false)
            }
            DeclKind::Struct(s) => {
                // Struct invariants are contract clauses over the fields.
                self.table.push(ScopeKind::Block);
                self.bind_generics(&s.generics);
                for field in &s.fields {
                    let ty = self.resolve_type(field.ty);
                    if let Some(default) = field.default {
                        let default_ty = self.check_expr(default);
                        self.require_assignable(&default_ty, &ty, default.span, "field default");
                    }
                    let _ = self.table.define(SymbolEntry {
                        name: field.name,
                        kind: SymbolKind::Variable,
                        ty,
                        mutable: false,
                        span: field.span,
                    });
                    for annotation in &field.annotations {
                        self.check_annotation(annotation);
                    }
                }
                for annotation in &s.annotations {
                    self.check_annotation(annotation);
                }
                self.table.pop();
            }
            DeclKind::Enum(_) | DeclKind::Capability(_) | DeclKind::Import(_) => {}
            DeclKind::TypeAlias { .. } => {}
            DeclKind::Trait(t) => {
                let previous_self = self.current_self.take();
                self.current_self = Some(Ty::Trait(t.name));
                for method in &t.methods {
                    if method.body.is_some() {
                        self.check_function(method, Some(Ty::Trait(t.name)));
                    }
                }
                self.current_self = previous_self;
            }
            DeclKind::Impl(imp) => {
                let target = self.resolve_type(imp.target);
                if let Some(trait_name) = imp.trait_name {
                    if self.registry.trait_def(trait_name).is_none() {
                        let text = self.interner.resolve(trait_name).to_string();
                        self.error(decl.span, format!("unknown trait '{}'", text));
                    }
                }
                let previous_self = self.current_self.take();
                self.current_self = Some(target.clone());
                for method in &imp.methods {
                    self.check_function(method, Some(target.clone()));
                }
                self.current_self = previous_self;
            }
            // Contract and intent bodies are templates over free names; they
            // were serialized during collection and are checked at reference
            // sites, not here.
            DeclKind::Contract(_) | DeclKind::Intent(_) => {}
            DeclKind::Effect(_) => {}
        }
    }

    fn check_variable(
        &mut self,
        span: Span,
        name: Symbol,
        ty: Option<&TypeExpr<'_>>,
        init: Option<&Expr<'_>>,
        mutable: bool,
        define: bool,
    ) {
        let declared = ty.map(|t| self.resolve_type(t));
        let init_ty = init.map(|e| self.check_expr(e));
        let final_ty = match (&declared, &init_ty) {
            (Some(d), Some(i)) => {
                if !is_assignable(i, d) {
                    let from = i.display(self.interner);
                    let to = d.display(self.interner);
                    self.error(
                        init.unwrap().span,
                        format!("cannot assign value of type {} to '{}' of type {}", from,
                                self.interner.resolve(name), to),
                    );
                }
                d.clone()
            }
            (Some(d), None) => d.clone(),
            (None, Some(i)) => i.clone(),
            (None, None) => {
                self.error(
                    span,
                    format!("cannot infer type of '{}'", self.interner.resolve(name)),
                );
                Ty::Unknown
            }
        };
        if define {
            if self
                .table
                .define(SymbolEntry {
                    name,
                    kind: SymbolKind::Variable,
                    ty: final_ty,
                    mutable,
                    span,
                })
                .is_err()
            {
                self.duplicate(span, name);
            }
        } else {
            // Top-level variables were installed during collection with their
            // declared type; refine with the inferred one.
            self.table.set_symbol_type(name, final_ty);
        }
    }

    pub(super) fn check_function(&mut self, f: &FunctionDecl<'_>, self_ty: Option<Ty>) {
        self.table.push(ScopeKind::Function);
        self.bind_generics(&f.generics);

        for param in &f.params {
            let ty = match param.ty {
                Some(t) => self.resolve_type(t),
                None => self_ty.clone().unwrap_or_else(|| {
                    self.error(param.span, "'self' parameter outside an impl or trait");
                    Ty::Unknown
                }),
            };
            if self
                .table
                .define(SymbolEntry {
                    name: param.name,
                    kind: SymbolKind::Parameter,
                    ty,
                    mutable: param.mutable,
                    span: param.span,
                })
                .is_err()
            {
                self.duplicate(param.span, param.name);
            }
        }

        // Record the declared effect set as the ambient one.
        let declared_effects = f.declared_effects();
        if f.is_pure && !declared_effects.is_empty() {
            let span = f
                .annotations
                .iter()
                .find(|a| matches!(a.kind, AnnotationKind::Effects(_)))
                .map(|a| a.span)
                .unwrap_or_default();
            self.error(span, "pure function may not declare effects");
        }
        for effect in &declared_effects {
            if self.registry.effect_def(*effect).is_none() {
                let text = self.interner.resolve(*effect).to_string();
                let span = f
                    .annotations
                    .iter()
                    .find(|a| matches!(a.kind, AnnotationKind::Effects(_)))
                    .map(|a| a.span)
                    .unwrap_or_default();
                self.error(span, format!("unknown effect '{}'", text));
            }
        }
        self.table.active_effects = declared_effects.into_iter().collect();

        let previous_return = self.current_return.take();
        self.current_return = Some(
            f.return_type
                .map(|t| self.resolve_type(t))
                .unwrap_or(Ty::VOID),
        );

        for annotation in &f.annotations {
            self.check_annotation(annotation);
        }

        if let Some(body) = &f.body {
            let tail_ty = self.check_block(body, ScopeKind::Block);
            if let Some(tail) = body.tail {
                let expected = self.current_return.clone().unwrap();
                self.require_assignable(&tail_ty, &expected, tail.span, "return value");
            }
        }

        self.current_return = previous_return;
        self.table.active_effects.clear();
        self.table.active_capabilities.clear();
        self.table.pop();
    }

    fn check_annotation(&mut self, annotation: &Annotation<'_>) {
        match &annotation.kind {
            AnnotationKind::Requires(cond)
            | AnnotationKind::Ensures(cond)
            | AnnotationKind::Invariant(cond) => {
                let was = self.in_contract;
                self.in_contract = true;
                let ty = self.check_expr(cond);
                self.in_contract = was;
                if !ty.is_bool() && !ty.is_unknown() {
                    self.error(
                        cond.span,
                        format!(
                            "contract condition must be Bool, found {}",
                            ty.display(self.interner)
                        ),
                    );
                }
            }
            AnnotationKind::Effects(_) => {}
            AnnotationKind::Capability { name, fields } => {
                if self.registry.capability_def(*name).is_none() {
                    let text = self.interner.resolve(*name).to_string();
                    self.error(annotation.span, format!("unknown capability '{}'", text));
                }
                let field_names: Vec<Symbol> = fields.iter().map(|(n, _)| *n).collect();
                for (_, value) in fields {
                    self.check_expr(value);
                }
                self.table.active_capabilities.insert(*name, field_names);
            }
            AnnotationKind::ContractRef { name, .. } => {
                if self.table.lookup_contract(*name).is_none() {
                    let text = self.interner.resolve(*name).to_string();
                    self.error(annotation.span, format!("unknown contract '{}'", text));
                }
            }
            AnnotationKind::IntentRef { name, .. } => {
                if self.table.lookup_intent(*name).is_none() {
                    let text = self.interner.resolve(*name).to_string();
                    self.error(annotation.span, format!("unknown intent '{}'", text));
                }
            }
            AnnotationKind::Verify(_) => {}
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn check_block(&mut self, block: &Block<'_>, kind: ScopeKind) -> Ty {
        self.table.push(kind);
        for stmt in block.stmts {
            self.check_stmt(stmt);
        }
        let ty = match block.tail {
            Some(tail) => self.check_expr(tail),
            None => Ty::VOID,
        };
        self.table.pop();
        ty
    }

    fn check_stmt(&mut self, stmt: &Stmt<'_>) {
        match &stmt.kind {
            StmtKind::Let { name, mutable, ty, init } => {
                self.check_variable(stmt.span, *name, *ty, *init, *mutable, true);
            }
            StmtKind::Expr(expr) => {
                self.check_expr(expr);
            }
            StmtKind::While { cond, invariants, body } => {
                let cond_ty = self.check_expr(cond);
                self.require_bool(&cond_ty, cond.span, "while condition");
                self.check_loop_invariants(invariants);
                self.check_block(body, ScopeKind::Loop);
            }
            StmtKind::For { var, iterable, invariants, body } => {
                let iter_ty = self.check_expr(iterable);
                let elem = self.element_type(&iter_ty);
                self.table.push(ScopeKind::Loop);
                let _ = self.table.define(SymbolEntry {
                    name: *var,
                    kind: SymbolKind::Variable,
                    ty: elem,
                    mutable: false,
                    span: stmt.span,
                });
                self.check_loop_invariants(invariants);
                for inner in body.stmts {
                    self.check_stmt(inner);
                }
                if let Some(tail) = body.tail {
                    self.check_expr(tail);
                }
                self.table.pop();
            }
            StmtKind::Return { value } => {
                let expected = match self.current_return.clone() {
                    Some(ty) => ty,
                    None => {
                        self.error(stmt.span, "'return' outside a function");
                        return;
                    }
                };
                match value {
                    Some(expr) => {
                        let ty = self.check_expr(expr);
                        self.require_assignable(&ty, &expected, expr.span, "return value");
                    }
                    None => {
                        if expected != Ty::VOID && !expected.is_unknown() {
                            self.error(
                                stmt.span,
                                format!(
                                    "bare return in a function returning {}",
                                    expected.display(self.interner)
                                ),
                            );
                        }
                    }
                }
            }
        }
    }

    fn check_loop_invariants(&mut self, invariants: &[&Expr<'_>]) {
        for invariant in invariants {
            let was = self.in_contract;
            self.in_contract = true;
            let ty = self.check_expr(invariant);
            self.in_contract = was;
            self.require_bool(&ty, invariant.span, "loop invariant");
        }
    }

    /// Element type for `for v in e`: arrays yield their element, generic
    /// applications their first argument, anything else `Unknown`.
    fn element_type(&self, iterable: &Ty) -> Ty {
        match iterable.deref_target() {
            Ty::Array { elem, .. } => (**elem).clone(),
            Ty::Generic { args, .. } if !args.is_empty() => args[0].clone(),
            _ => Ty::Unknown,
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    pub(super) fn check_expr(&mut self, expr: &Expr<'_>) -> Ty {
        let ty = self.expr_type(expr);
        self.record(expr.span, ty)
    }

    fn expr_type(&mut self, expr: &Expr<'_>) -> Ty {
        match &expr.kind {
            ExprKind::Literal(lit) => self.literal_type(lit),
            ExprKind::Ident(name) => self.check_ident(*name, expr.span),
            ExprKind::SelfRef => match &self.current_self {
                Some(ty) => ty.clone(),
                None => {
                    self.error(expr.span, "'self' is only valid inside an impl or trait");
                    Ty::Unknown
                }
            },
            ExprKind::Path { base, member } => self.check_path(*base, *member, expr.span),
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, expr.span),
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand, expr.span),
            ExprKind::Assign { op, target, value } => self.check_assign(*op, target, value),
            ExprKind::Call { callee, args } => self.check_call(callee, args, expr.span),
            ExprKind::Member { object, field } => self.check_member(object, *field, expr.span),
            ExprKind::TupleField { object, index } => {
                let object_ty = self.check_expr(object);
                match object_ty.deref_target() {
                    Ty::Tuple(items) => {
                        if *index < items.len() {
                            items[*index].clone()
                        } else {
                            self.error(
                                expr.span,
                                format!("tuple index {} out of bounds for {}", index,
                                        object_ty.display(self.interner)),
                            );
                            Ty::Unknown
                        }
                    }
                    other if other.is_unknown() => Ty::Unknown,
                    other => {
                        self.error(
                            expr.span,
                            format!("cannot index into {}", other.display(self.interner)),
                        );
                        Ty::Unknown
                    }
                }
            }
            ExprKind::Index { object, index } => {
                let object_ty = self.check_expr(object);
                let index_ty = self.check_expr(index);
                match object_ty.deref_target() {
                    Ty::Array { elem, .. } => {
                        if !index_ty.is_integer() && !index_ty.is_unknown() {
                            self.error(
                                index.span,
                                format!(
                                    "array index must be an integer, found {}",
                                    index_ty.display(self.interner)
                                ),
                            );
                        }
                        (**elem).clone()
                    }
                    Ty::Tuple(_) => {
                        self.error(
                            index.span,
                            "tuple elements are accessed with a literal index like '.0'",
                        );
                        Ty::Unknown
                    }
                    other if other.is_unknown() => Ty::Unknown,
                    other => {
                        self.error(
                            expr.span,
                            format!("cannot index {}", other.display(self.interner)),
                        );
                        Ty::Unknown
                    }
                }
            }
            ExprKind::If { cond, then_branch, else_branch } => {
                let cond_ty = self.check_expr(cond);
                self.require_bool(&cond_ty, cond.span, "if condition");
                let then_ty = self.check_block(then_branch, ScopeKind::Block);
                match else_branch {
                    Some(els) => {
                        let else_ty = self.check_expr(els);
                        if !then_ty.is_unknown()
                            && !else_ty.is_unknown()
                            && !is_assignable(&else_ty, &then_ty)
                            && !is_assignable(&then_ty, &else_ty)
                        {
                            // Permissive: report and adopt the then-branch
                            // type rather than failing the expression.
                            self.warning(
                                expr.span,
                                format!(
                                    "if branches have different types: {} and {}",
                                    then_ty.display(self.interner),
                                    else_ty.display(self.interner)
                                ),
                            );
                        }
                        then_ty
                    }
                    None => Ty::VOID,
                }
            }
            ExprKind::Match { subject, arms } => {
                let subject_ty = self.check_expr(subject);
                let mut result: Option<Ty> = None;
                for arm in arms {
                    self.table.push(ScopeKind::Block);
                    self.check_pattern(arm.pattern, &subject_ty);
                    if let Some(guard) = arm.guard {
                        let guard_ty = self.check_expr(guard);
                        self.require_bool(&guard_ty, guard.span, "match guard");
                    }
                    let body_ty = self.check_expr(arm.body);
                    self.table.pop();
                    match &result {
                        None => result = Some(body_ty),
                        Some(first) => {
                            if !first.is_unknown()
                                && !body_ty.is_unknown()
                                && !is_assignable(&body_ty, first)
                                && !is_assignable(first, &body_ty)
                            {
                                self.warning(
                                    arm.span,
                                    format!(
                                        "match arms have different types: {} and {}",
                                        first.display(self.interner),
                                        body_ty.display(self.interner)
                                    ),
                                );
                            }
                        }
                    }
                }
                result.unwrap_or(Ty::Unknown)
            }
            ExprKind::Block(block) => self.check_block(block, ScopeKind::Block),
            ExprKind::Lambda { params, return_type, body } => {
                self.table.push(ScopeKind::Function);
                let mut fn_params = Vec::new();
                for param in params {
                    let ty = param
                        .ty
                        .map(|t| self.resolve_type(t))
                        .unwrap_or(Ty::Unknown);
                    let _ = self.table.define(SymbolEntry {
                        name: param.name,
                        kind: SymbolKind::Parameter,
                        ty: ty.clone(),
                        mutable: param.mutable,
                        span: param.span,
                    });
                    fn_params.push(FnParam { name: param.name, ty, mutable: param.mutable });
                }
                let declared_ret = return_type.map(|t| self.resolve_type(t));
                let previous_return = self.current_return.take();
                self.current_return = Some(declared_ret.clone().unwrap_or(Ty::Unknown));
                let body_ty = self.check_expr(body);
                self.current_return = previous_return;
                self.table.pop();
                let ret = match declared_ret {
                    Some(declared) => {
                        self.require_assignable(&body_ty, &declared, body.span, "lambda body");
                        declared
                    }
                    None => body_ty,
                };
                Ty::Function(Box::new(FnTy::plain(fn_params, ret)))
            }
            ExprKind::Array(items) => {
                let mut elem = Ty::Unknown;
                for (i, item) in items.iter().enumerate() {
                    let item_ty = self.check_expr(item);
                    if i == 0 {
                        elem = item_ty;
                    } else if !is_assignable(&item_ty, &elem) {
                        self.error(
                            item.span,
                            format!(
                                "array element has type {}, expected {}",
                                item_ty.display(self.interner),
                                elem.display(self.interner)
                            ),
                        );
                    }
                }
                Ty::Array { elem: Box::new(elem), size: Some(items.len()) }
            }
            ExprKind::Tuple(items) => {
                Ty::Tuple(items.iter().map(|e| self.check_expr(e)).collect())
            }
            ExprKind::StructLit { name, fields, spread } => {
                self.check_struct_literal(*name, fields, *spread, expr.span)
            }
            ExprKind::Range { start, end, .. } => {
                let start_ty = self.check_expr(start);
                let end_ty = self.check_expr(end);
                for (ty, span) in [(&start_ty, start.span), (&end_ty, end.span)] {
                    if !ty.is_integer() && !ty.is_unknown() {
                        self.error(
                            span,
                            format!(
                                "range endpoint must be an integer, found {}",
                                ty.display(self.interner)
                            ),
                        );
                    }
                }
                let elem = match (start_ty.prim(), end_ty.prim()) {
                    (Some(a), Some(b)) if a.is_integer() && b.is_integer() => widen(a, b),
                    _ => Prim::Int,
                };
                Ty::Array { elem: Box::new(Ty::Prim(elem)), size: None }
            }
            ExprKind::Cast { expr: inner, ty } => {
                self.check_expr(inner);
                self.resolve_type(ty)
            }
            ExprKind::Old(inner) => {
                if !self.in_contract {
                    self.error(expr.span, "'old' is only valid inside a contract context");
                }
                self.check_expr(inner)
            }
            ExprKind::Quantifier { kind, bindings, body } => {
                self.check_quantifier(*kind, bindings, body, expr.span)
            }
            ExprKind::Try(inner) => {
                let inner_ty = self.check_expr(inner);
                let enclosing_is_result = matches!(
                    self.current_return.as_ref().map(Ty::deref_target),
                    Some(Ty::Result { .. }) | Some(Ty::Unknown) | Some(Ty::Error(_))
                );
                if !enclosing_is_result {
                    self.error(
                        expr.span,
                        "'?' requires the enclosing function to return a Result",
                    );
                }
                match inner_ty.deref_target() {
                    Ty::Result { ok, .. } => (**ok).clone(),
                    other if other.is_unknown() => Ty::Unknown,
                    other => {
                        self.error(
                            inner.span,
                            format!(
                                "'?' applied to a non-Result value of type {}",
                                other.display(self.interner)
                            ),
                        );
                        Ty::Unknown
                    }
                }
            }
        }
    }

    fn literal_type(&self, lit: &Literal) -> Ty {
        match lit {
            Literal::Int(_) => Ty::Prim(Prim::Int),
            Literal::Float(_) => Ty::Prim(Prim::Float64),
            Literal::Str(_) => Ty::Prim(Prim::Str),
            Literal::Char(_) => Ty::Prim(Prim::Char),
            Literal::Bool(_) => Ty::Prim(Prim::Bool),
            Literal::Nil => Ty::Optional(Box::new(Ty::Unknown)),
        }
    }

    fn check_ident(&mut self, name: Symbol, span: Span) -> Ty {
        // `result` names the return value inside contract clauses.
        if self.in_contract && name == self.names.result {
            if let Some(ret) = &self.current_return {
                return ret.clone();
            }
        }
        match self.table.lookup(name) {
            Some(entry) => entry.ty.clone(),
            None => {
                let text = self.interner.resolve(name).to_string();
                let mut message = format!("undefined identifier '{}'", text);
                let visible = self.table.visible_names();
                let candidates: Vec<&str> =
                    visible.iter().map(|s| self.interner.resolve(*s)).collect();
                if let Some(suggestion) = find_similar(&text, candidates.into_iter(), 2) {
                    message.push_str(&format!("; did you mean '{}'?", suggestion));
                }
                self.error(span, message);
                Ty::Unknown
            }
        }
    }

    fn check_path(&mut self, base: Symbol, member: Symbol, span: Span) -> Ty {
        match self.registry.enum_def(base) {
            Some(def) => match def.variant(member) {
                Some(variant) => {
                    if variant.fields.is_empty() {
                        Ty::Enum(base)
                    } else {
                        let params = variant
                            .fields
                            .iter()
                            .map(|ty| FnParam {
                                name: Symbol::EMPTY,
                                ty: ty.clone(),
                                mutable: false,
                            })
                            .collect();
                        Ty::Function(Box::new(FnTy::plain(params, Ty::Enum(base))))
                    }
                }
                None => {
                    self.error(
                        span,
                        format!(
                            "enum '{}' has no variant '{}'",
                            self.interner.resolve(base),
                            self.interner.resolve(member)
                        ),
                    );
                    Ty::Unknown
                }
            },
            None => {
                self.error(
                    span,
                    format!("unknown enum '{}'", self.interner.resolve(base)),
                );
                Ty::Unknown
            }
        }
    }

    fn check_binary(&mut self, op: BinaryOp, lhs: &Expr<'_>, rhs: &Expr<'_>, span: Span) -> Ty {
        let lhs_ty = self.check_expr(lhs);
        let rhs_ty = self.check_expr(rhs);
        if lhs_ty.is_unknown() || rhs_ty.is_unknown() {
            return if op.is_equality() || op.is_ordering() || op.is_logical() {
                Ty::BOOL
            } else {
                Ty::Unknown
            };
        }
        if op.is_arithmetic() {
            match (lhs_ty.prim(), rhs_ty.prim()) {
                (Some(a), Some(b)) if a.is_numeric() && b.is_numeric() => {
                    Ty::Prim(widen(a, b))
                }
                _ => {
                    self.error(
                        span,
                        format!(
                            "operator '{}' needs numeric operands, found {} and {}",
                            op.symbol(),
                            lhs_ty.display(self.interner),
                            rhs_ty.display(self.interner)
                        ),
                    );
                    Ty::Unknown
                }
            }
        } else if op.is_equality() {
            if !is_assignable(&lhs_ty, &rhs_ty) && !is_assignable(&rhs_ty, &lhs_ty) {
                self.error(
                    span,
                    format!(
                        "cannot compare {} with {}",
                        lhs_ty.display(self.interner),
                        rhs_ty.display(self.interner)
                    ),
                );
            }
            Ty::BOOL
        } else if op.is_ordering() {
            if !lhs_ty.is_numeric() || !rhs_ty.is_numeric() {
                self.error(
                    span,
                    format!(
                        "operator '{}' needs numeric operands, found {} and {}",
                        op.symbol(),
                        lhs_ty.display(self.interner),
                        rhs_ty.display(self.interner)
                    ),
                );
            }
            Ty::BOOL
        } else if op.is_logical() {
            self.require_bool(&lhs_ty, lhs.span, "logical operand");
            self.require_bool(&rhs_ty, rhs.span, "logical operand");
            Ty::BOOL
        } else {
            // Bitwise and shifts: integer operands, left operand's type.
            if !lhs_ty.is_integer() || !rhs_ty.is_integer() {
                self.error(
                    span,
                    format!(
                        "operator '{}' needs integer operands, found {} and {}",
                        op.symbol(),
                        lhs_ty.display(self.interner),
                        rhs_ty.display(self.interner)
                    ),
                );
                return Ty::Unknown;
            }
            lhs_ty
        }
    }

    fn check_unary(&mut self, op: UnaryOp, operand: &Expr<'_>, span: Span) -> Ty {
        let operand_ty = self.check_expr(operand);
        if operand_ty.is_unknown() && !matches!(op, UnaryOp::Ref { .. }) {
            return Ty::Unknown;
        }
        match op {
            UnaryOp::Neg => {
                if operand_ty.is_numeric() {
                    operand_ty
                } else {
                    self.error(
                        span,
                        format!(
                            "operator '-' needs a numeric operand, found {}",
                            operand_ty.display(self.interner)
                        ),
                    );
                    Ty::Unknown
                }
            }
            UnaryOp::Not => {
                self.require_bool(&operand_ty, operand.span, "operand of '!'");
                Ty::BOOL
            }
            UnaryOp::BitNot => {
                if operand_ty.is_integer() {
                    operand_ty
                } else {
                    self.error(
                        span,
                        format!(
                            "operator '~' needs an integer operand, found {}",
                            operand_ty.display(self.interner)
                        ),
                    );
                    Ty::Unknown
                }
            }
            UnaryOp::Ref { mutable } => Ty::Reference { inner: Box::new(operand_ty), mutable },
            UnaryOp::Deref => match operand_ty {
                Ty::Reference { inner, .. } => *inner,
                other => {
                    self.error(
                        span,
                        format!("cannot dereference {}", other.display(self.interner)),
                    );
                    Ty::Unknown
                }
            },
        }
    }

    fn check_assign(&mut self, op: Option<BinaryOp>, target: &Expr<'_>, value: &Expr<'_>) -> Ty {
        let target_ty = self.check_expr(target);
        let value_ty = self.check_expr(value);

        if let ExprKind::Ident(name) = &target.kind {
            match self.table.lookup(*name) {
                Some(entry) if !entry.mutable && entry.kind != SymbolKind::Function => {
                    let text = self.interner.resolve(*name).to_string();
                    self.error(
                        target.span,
                        format!("cannot assign to immutable binding '{}'", text),
                    );
                }
                _ => {}
            }
        }

        match op {
            None => {
                if !is_assignable(&value_ty, &target_ty) {
                    self.error(
                        value.span,
                        format!(
                            "cannot assign {} to {}",
                            value_ty.display(self.interner),
                            target_ty.display(self.interner)
                        ),
                    );
                }
            }
            Some(op) => {
                if (!target_ty.is_numeric() && !target_ty.is_unknown())
                    || (!value_ty.is_numeric() && !value_ty.is_unknown())
                {
                    self.error(
                        value.span,
                        format!(
                            "compound '{}=' needs numeric operands, found {} and {}",
                            op.symbol(),
                            target_ty.display(self.interner),
                            value_ty.display(self.interner)
                        ),
                    );
                }
            }
        }
        Ty::VOID
    }

    fn check_call(&mut self, callee: &Expr<'_>, args: &[&Expr<'_>], span: Span) -> Ty {
        // A named type in call position is a constructor.
        if let ExprKind::Ident(name) = &callee.kind {
            if let Some(entry) = self.table.lookup(*name) {
                if entry.kind == SymbolKind::Type {
                    let ty = entry.ty.clone();
                    self.record(callee.span, ty.clone());
                    return self.check_constructor(ty, args, span);
                }
            }
        }

        let callee_ty = self.check_expr(callee);
        match callee_ty {
            Ty::Function(fn_ty) => self.check_invocation(&fn_ty, args, span),
            ty if ty.is_unknown() => {
                for arg in args {
                    self.check_expr(arg);
                }
                Ty::Unknown
            }
            other => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.error(
                    span,
                    format!("cannot call value of type {}", other.display(self.interner)),
                );
                Ty::Unknown
            }
        }
    }

    fn check_invocation(&mut self, fn_ty: &FnTy, args: &[&Expr<'_>], span: Span) -> Ty {
        if args.len() != fn_ty.params.len() {
            self.error(
                span,
                format!(
                    "wrong number of arguments: expected {}, found {}",
                    fn_ty.params.len(),
                    args.len()
                ),
            );
        }
        for (arg, param) in args.iter().zip(&fn_ty.params) {
            let arg_ty = self.check_expr(arg);
            if !is_assignable(&arg_ty, &param.ty) {
                self.error(
                    arg.span,
                    format!(
                        "argument has type {}, expected {}",
                        arg_ty.display(self.interner),
                        param.ty.display(self.interner)
                    ),
                );
            }
        }
        for arg in args.iter().skip(fn_ty.params.len()) {
            self.check_expr(arg);
        }
        // Every declared effect of the callee must be active here.
        for effect in &fn_ty.effects {
            if !self.table.active_effects.contains(effect) {
                let text = self.interner.resolve(*effect).to_string();
                self.error(
                    span,
                    format!(
                        "requires effect {}, which the enclosing function does not declare",
                        text
                    ),
                );
            }
        }
        fn_ty.ret.clone()
    }

    fn check_constructor(&mut self, ty: Ty, args: &[&Expr<'_>], span: Span) -> Ty {
        match &ty {
            Ty::Struct(name) => {
                let def = match self.registry.struct_def(*name) {
                    Some(def) => def.clone(),
                    None => return Ty::Unknown,
                };
                if args.len() != def.fields.len() {
                    self.error(
                        span,
                        format!(
                            "constructor for '{}' expects {} arguments, found {}",
                            self.interner.resolve(*name),
                            def.fields.len(),
                            args.len()
                        ),
                    );
                }
                for (arg, field) in args.iter().zip(&def.fields) {
                    let arg_ty = self.check_expr(arg);
                    if !is_assignable(&arg_ty, &field.ty) {
                        self.error(
                            arg.span,
                            format!(
                                "field '{}' has type {}, found {}",
                                self.interner.resolve(field.name),
                                field.ty.display(self.interner),
                                arg_ty.display(self.interner)
                            ),
                        );
                    }
                }
                for arg in args.iter().skip(def.fields.len()) {
                    self.check_expr(arg);
                }
                ty.clone()
            }
            Ty::Enum(_) | Ty::Effect(_) | Ty::Trait(_) | Ty::Capability(_) => {
                for arg in args {
                    self.check_expr(arg);
                }
                self.error(
                    span,
                    format!("{} is not constructible", ty.display(self.interner)),
                );
                Ty::Unknown
            }
            _ => Ty::Unknown,
        }
    }

    fn check_member(&mut self, object: &Expr<'_>, field: Symbol, span: Span) -> Ty {
        let object_ty = self.check_expr(object);
        let mut target = object_ty.deref_target().clone();
        // Generic applications expose their base's members.
        if let Ty::Generic { base, .. } = &target {
            target = (**base).clone();
        }
        match &target {
            Ty::Struct(name) => {
                let name = *name;
                self.struct_member(name, field, span)
            }
            Ty::Effect(name) => {
                let def = match self.registry.effect_def(*name) {
                    Some(def) => def.clone(),
                    None => return Ty::Unknown,
                };
                match def.method(field) {
                    Some(method) => Ty::Function(Box::new(method.ty.clone())),
                    None => {
                        self.error(
                            span,
                            format!(
                                "effect '{}' has no operation '{}'",
                                self.interner.resolve(*name),
                                self.interner.resolve(field)
                            ),
                        );
                        Ty::Unknown
                    }
                }
            }
            Ty::Var { bounds, .. } => {
                for bound in bounds {
                    if let Some(trait_def) = self.registry.trait_def(*bound) {
                        if let Some(method) =
                            trait_def.methods.iter().find(|m| m.name == field)
                        {
                            return Ty::Function(Box::new(method.ty.clone()));
                        }
                    }
                }
                Ty::Unknown
            }
            other if other.is_unknown() => Ty::Unknown,
            other => {
                self.error(
                    span,
                    format!(
                        "value of type {} has no member '{}'",
                        other.display(self.interner),
                        self.interner.resolve(field)
                    ),
                );
                Ty::Unknown
            }
        }
    }

    fn struct_member(&mut self, name: Symbol, field: Symbol, span: Span) -> Ty {
        let def = match self.registry.struct_def(name) {
            Some(def) => def.clone(),
            None => return Ty::Unknown,
        };
        if let Some(field_def) = def.field(field) {
            return field_def.ty.clone();
        }
        if let Some(method) = self.registry.method(name, field) {
            return Ty::Function(Box::new(method.clone()));
        }
        let mut message = format!(
            "struct '{}' has no field '{}'",
            self.interner.resolve(name),
            self.interner.resolve(field)
        );
        let candidates: Vec<&str> = def
            .fields
            .iter()
            .map(|f| self.interner.resolve(f.name))
            .collect();
        if let Some(suggestion) =
            find_similar(self.interner.resolve(field), candidates.into_iter(), 2)
        {
            message.push_str(&format!("; did you mean '{}'?", suggestion));
        }
        self.error(span, message);
        Ty::Unknown
    }

    fn check_struct_literal(
        &mut self,
        name: Symbol,
        fields: &[(Symbol, &Expr<'_>)],
        spread: Option<&Expr<'_>>,
        span: Span,
    ) -> Ty {
        let def = match self.registry.struct_def(name) {
            Some(def) => Some(def.clone()),
            None => {
                self.error(
                    span,
                    format!("unknown struct '{}'", self.interner.resolve(name)),
                );
                None
            }
        };

        if let Some(base) = spread {
            let base_ty = self.check_expr(base);
            if let Some(def) = &def {
                let expected = Ty::Struct(def.name);
                self.require_assignable(&base_ty, &expected, base.span, "spread source");
            }
        }

        for (field_name, value) in fields {
            let value_ty = self.check_expr(value);
            if let Some(def) = &def {
                match def.field(*field_name) {
                    Some(field_def) => {
                        if !is_assignable(&value_ty, &field_def.ty) {
                            self.error(
                                value.span,
                                format!(
                                    "field '{}' has type {}, found {}",
                                    self.interner.resolve(*field_name),
                                    field_def.ty.display(self.interner),
                                    value_ty.display(self.interner)
                                ),
                            );
                        }
                    }
                    None => {
                        self.error(
                            value.span,
                            format!(
                                "struct '{}' has no field '{}'",
                                self.interner.resolve(name),
                                self.interner.resolve(*field_name)
                            ),
                        );
                    }
                }
            }
        }

        if let Some(def) = &def {
            if spread.is_none() {
                for field_def in &def.fields {
                    let provided = fields.iter().any(|(n, _)| *n == field_def.name);
                    if !provided && !field_def.has_default {
                        self.error(
                            span,
                            format!(
                                "missing field '{}' in literal of '{}'",
                                self.interner.resolve(field_def.name),
                                self.interner.resolve(name)
                            ),
                        );
                    }
                }
            }
            Ty::Struct(def.name)
        } else {
            Ty::Unknown
        }
    }

    fn check_quantifier(
        &mut self,
        _kind: QuantifierKind,
        bindings: &[crate::ast::QuantBinding<'_>],
        body: &Expr<'_>,
        span: Span,
    ) -> Ty {
        self.table.push(ScopeKind::Block);
        for binding in bindings {
            let elem = match binding.collection {
                Some(collection) => {
                    let collection_ty = self.check_expr(collection);
                    self.element_type(&collection_ty)
                }
                None => {
                    // Unbounded bindings default to Int and are only
                    // checkable statically, hence contract context only.
                    if !self.in_contract {
                        self.error(
                            span,
                            "unbounded quantifier outside a contract context",
                        );
                    }
                    Ty::INT
                }
            };
            let _ = self.table.define(SymbolEntry {
                name: binding.name,
                kind: SymbolKind::Variable,
                ty: elem,
                mutable: false,
                span: binding.span,
            });
        }
        let body_ty = self.check_expr(body);
        self.require_bool(&body_ty, body.span, "quantifier body");
        self.table.pop();
        Ty::BOOL
    }

    fn check_pattern(&mut self, pattern: &Pattern<'_>, subject: &Ty) {
        match &pattern.kind {
            PatternKind::Wildcard => {}
            PatternKind::Literal(lit) => {
                let lit_ty = self.literal_type(lit);
                if !is_assignable(&lit_ty, subject) && !is_assignable(subject, &lit_ty) {
                    self.error(
                        pattern.span,
                        format!(
                            "pattern of type {} cannot match {}",
                            lit_ty.display(self.interner),
                            subject.display(self.interner)
                        ),
                    );
                }
            }
            PatternKind::Binding { name, mutable } => {
                let _ = self.table.define(SymbolEntry {
                    name: *name,
                    kind: SymbolKind::Variable,
                    ty: subject.clone(),
                    mutable: *mutable,
                    span: pattern.span,
                });
            }
            PatternKind::Tuple(items) => match subject.deref_target() {
                Ty::Tuple(subject_items) if subject_items.len() == items.len() => {
                    let subject_items = subject_items.clone();
                    for (item, subject_ty) in items.iter().zip(&subject_items) {
                        self.check_pattern(item, subject_ty);
                    }
                }
                other if other.is_unknown() => {
                    for item in items {
                        self.check_pattern(item, &Ty::Unknown);
                    }
                }
                other => {
                    let message = format!(
                        "tuple pattern cannot match {}",
                        other.display(self.interner)
                    );
                    self.error(pattern.span, message);
                    for item in items {
                        self.check_pattern(item, &Ty::Unknown);
                    }
                }
            },
            PatternKind::Struct { name, fields, rest: _ } => {
                let def = self.registry.struct_def(*name).cloned();
                if def.is_none() {
                    self.error(
                        pattern.span,
                        format!("unknown struct '{}'", self.interner.resolve(*name)),
                    );
                }
                for (field_name, sub) in fields {
                    let field_ty = def
                        .as_ref()
                        .and_then(|d| d.field(*field_name))
                        .map(|f| f.ty.clone())
                        .unwrap_or(Ty::Unknown);
                    if let Some(def) = &def {
                        if def.field(*field_name).is_none() {
                            self.error(
                                pattern.span,
                                format!(
                                    "struct '{}' has no field '{}'",
                                    self.interner.resolve(*name),
                                    self.interner.resolve(*field_name)
                                ),
                            );
                        }
                    }
                    match sub {
                        Some(sub) => self.check_pattern(sub, &field_ty),
                        None => {
                            let _ = self.table.define(SymbolEntry {
                                name: *field_name,
                                kind: SymbolKind::Variable,
                                ty: field_ty,
                                mutable: false,
                                span: pattern.span,
                            });
                        }
                    }
                }
            }
            PatternKind::EnumVariant { ty, variant, fields } => {
                let def = self.registry.enum_def(*ty).cloned();
                match def.as_ref().and_then(|d| d.variant(*variant).cloned()) {
                    Some(variant_def) => {
                        if variant_def.fields.len() != fields.len() {
                            self.error(
                                pattern.span,
                                format!(
                                    "variant '{}' has {} fields, pattern names {}",
                                    self.interner.resolve(*variant),
                                    variant_def.fields.len(),
                                    fields.len()
                                ),
                            );
                        }
                        for (sub, field_ty) in fields.iter().zip(&variant_def.fields) {
                            self.check_pattern(sub, field_ty);
                        }
                        for sub in fields.iter().skip(variant_def.fields.len()) {
                            self.check_pattern(sub, &Ty::Unknown);
                        }
                    }
                    None => {
                        if def.is_some() {
                            self.error(
                                pattern.span,
                                format!(
                                    "enum '{}' has no variant '{}'",
                                    self.interner.resolve(*ty),
                                    self.interner.resolve(*variant)
                                ),
                            );
                        } else {
                            self.error(
                                pattern.span,
                                format!("unknown enum '{}'", self.interner.resolve(*ty)),
                            );
                        }
                        for sub in fields {
                            self.check_pattern(sub, &Ty::Unknown);
                        }
                    }
                }
            }
            PatternKind::Range { .. } => {
                if !subject.is_numeric() && !subject.is_unknown() {
                    self.error(
                        pattern.span,
                        format!(
                            "range pattern cannot match {}",
                            subject.display(self.interner)
                        ),
                    );
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Small shared checks
    // ------------------------------------------------------------------

    fn require_bool(&mut self, ty: &Ty, span: Span, what: &str) {
        if !ty.is_bool() && !ty.is_unknown() {
            self.error(
                span,
                format!("{} must be Bool, found {}", what, ty.display(self.interner)),
            );
        }
    }

    fn require_assignable(&mut self, from: &Ty, to: &Ty, span: Span, what: &str) {
        if !is_assignable(from, to) {
            self.error(
                span,
                format!(
                    "{} has type {}, expected {}",
                    what,
                    from.display(self.interner),
                    to.display(self.interner)
                ),
            );
        }
    }
}
