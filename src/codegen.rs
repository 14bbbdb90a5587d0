//! Lowerer: annotated tree to JavaScript target text.
//!
//! A single option switch controls runtime contract instrumentation. The
//! value runtime (Result/Option constructors, `unwrap`, match failure) is
//! always embedded; the guard runtime (`__requires`, `__ensures`,
//! `__invariant`, `__clone`) only when instrumentation is on. An internal
//! failure during lowering surfaces as a `codegen` diagnostic in the driver
//! and discards any emitted text.

use std::collections::HashMap;
use std::fmt::Write as _;

use crate::analysis::{Analysis, WellKnown};
use crate::ast::{
    AnnotationKind, BinaryOp, Block, Decl, DeclKind, EffectDecl, EnumDecl, Expr, ExprKind,
    FieldDecl, FunctionDecl, ImplDecl, ImportDecl, ImportItems, Literal, MatchArm, Pattern,
    PatternKind, Program, QuantifierKind, Stmt, StmtKind, StructDecl, TraitDecl, TypeExpr,
    TypeExprKind, UnaryOp,
};
use crate::formatter::ExprPrinter;
use crate::intern::{Interner, Symbol};
use crate::options::{CompileOptions, Dialect, ModuleSystem};
use crate::token::Span;

const RUNTIME_CORE: &str = include_str!("runtime/core.js");
const RUNTIME_CONTRACTS: &str = include_str!("runtime/contracts.js");

/// Internal lowering failure. The driver turns this into a codegen
/// diagnostic and marks the compilation failed.
#[derive(Debug)]
pub struct CodegenError {
    pub message: String,
    pub span: Span,
}

type Lower<T> = Result<T, CodegenError>;

pub fn lower_program<'a>(
    program: &Program<'a>,
    analysis: &'a Analysis,
    interner: &'a Interner,
    names: &'a WellKnown,
    options: &'a CompileOptions,
    file: Option<&'a str>,
) -> Lower<String> {
    let mut emitter = Emitter {
        out: String::new(),
        indent: 0,
        options,
        interner,
        names,
        analysis,
        file,
        exports: Vec::new(),
        temp: 0,
        fn_stack: Vec::new(),
    };
    emitter.emit_program(program)?;
    Ok(emitter.out)
}

struct FnLower<'a> {
    ensures: Vec<&'a Expr<'a>>,
    old_names: HashMap<Span, String>,
}

/// Substitutions active while lowering one expression tree.
#[derive(Clone, Copy, Default)]
struct ExprCtx<'c> {
    /// Rewrites the free name `result` inside an ensures clause.
    result_name: Option<&'c str>,
    /// Rewrites struct invariant free variables to instance fields.
    field_inst: Option<(&'c [Symbol], &'c str)>,
}

struct Emitter<'a> {
    out: String,
    indent: usize,
    options: &'a CompileOptions,
    interner: &'a Interner,
    names: &'a WellKnown,
    analysis: &'a Analysis,
    file: Option<&'a str>,
    exports: Vec<String>,
    temp: u32,
    fn_stack: Vec<FnLower<'a>>,
}

impl<'a> Emitter<'a> {
    // ------------------------------------------------------------------
    // Output plumbing
    // ------------------------------------------------------------------

    fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn fresh(&mut self, prefix: &str) -> String {
        let id = self.temp;
        self.temp += 1;
        format!("{}{}", prefix, id)
    }

    fn pos(&self, span: Span) -> String {
        format!(
            "{}:{}:{}",
            self.file.unwrap_or("<input>"),
            span.line,
            span.column
        )
    }

    fn name(&self, sym: Symbol) -> &'a str {
        self.interner.resolve(sym)
    }

    fn instrument(&self) -> bool {
        self.options.instrument()
    }

    /// Run `f` against a scratch buffer and hand back what it wrote.
    fn capture<F>(&mut self, f: F) -> Lower<String>
    where
        F: FnOnce(&mut Self) -> Lower<()>,
    {
        let saved = std::mem::take(&mut self.out);
        let saved_indent = self.indent;
        let result = f(self);
        let text = std::mem::replace(&mut self.out, saved);
        self.indent = saved_indent;
        result.map(|_| text)
    }

    // ------------------------------------------------------------------
    // Program
    // ------------------------------------------------------------------

    fn emit_program(&mut self, program: &Program<'a>) -> Lower<()> {
        if self.instrument() {
            self.out.push_str(RUNTIME_CONTRACTS);
            self.blank();
        }
        self.out.push_str(RUNTIME_CORE);
        self.blank();

        let declares_io = program.decls.iter().any(|d| {
            matches!(&strip_export(d).kind, DeclKind::Effect(e) if e.name == self.names.io)
        });
        if !declares_io {
            self.emit_io_record();
            self.blank();
        }

        for decl in &program.decls {
            self.emit_decl(decl, false)?;
        }

        if self.options.modules == ModuleSystem::CommonJs && !self.exports.is_empty() {
            self.blank();
            let list = self.exports.join(", ");
            self.line(&format!("module.exports = {{ {} }};", list));
        }
        Ok(())
    }

    fn emit_io_record(&mut self) {
        self.line("const IO = {");
        self.indent += 1;
        self.line("read: () => {");
        self.indent += 1;
        self.line("if (typeof require === \"function\") {");
        self.indent += 1;
        self.line("return require(\"fs\").readFileSync(0, \"utf8\");");
        self.indent -= 1;
        self.line("}");
        self.line("return null;");
        self.indent -= 1;
        self.line("},");
        self.line("write: (value) => {");
        self.indent += 1;
        self.line("console.log(value);");
        self.line("return value;");
        self.indent -= 1;
        self.line("},");
        self.indent -= 1;
        self.line("};");
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn emit_decl(&mut self, decl: &'a Decl<'a>, exported: bool) -> Lower<()> {
        match &decl.kind {
            DeclKind::Export(inner) => self.emit_decl(inner, true),
            DeclKind::Function(f) => {
                if f.body.is_some() {
                    self.emit_function(f, exported)?;
                    self.blank();
                }
                Ok(())
            }
            DeclKind::Variable { name, mutable, init, .. } => {
                let name = self.name(*name).to_string();
                let value = match init {
                    Some(init) => self.expr(init, ExprCtx::default())?,
                    None => "undefined".to_string(),
                };
                let keyword = if *mutable { "let" } else { "const" };
                let prefix = self.export_prefix(exported, &name);
                self.line(&format!("{}{} {} = {};", prefix, keyword, name, value));
                Ok(())
            }
            DeclKind::Struct(s) => {
                self.emit_struct(s, exported)?;
                self.blank();
                Ok(())
            }
            DeclKind::Enum(e) => {
                self.emit_enum(e, exported)?;
                self.blank();
                Ok(())
            }
            DeclKind::Trait(t) => {
                if self.options.dialect == Dialect::Typescript {
                    self.emit_trait_interface(t, exported);
                    self.blank();
                }
                Ok(())
            }
            DeclKind::Impl(imp) => {
                self.emit_impl(imp)?;
                self.blank();
                Ok(())
            }
            DeclKind::Effect(e) => {
                self.emit_effect(e, exported);
                self.blank();
                Ok(())
            }
            // Static only: nothing reaches the target text.
            DeclKind::Contract(_) | DeclKind::Intent(_) | DeclKind::Capability(_) => Ok(()),
            DeclKind::TypeAlias { .. } => Ok(()),
            DeclKind::Import(import) => {
                self.emit_import(import);
                Ok(())
            }
        }
    }

    /// ESM exports prefix the declaration; CommonJS collects names for the
    /// trailing `module.exports`.
    fn export_prefix(&mut self, exported: bool, name: &str) -> &'static str {
        if !exported {
            return "";
        }
        match self.options.modules {
            ModuleSystem::Esm => "export ",
            ModuleSystem::CommonJs => {
                self.exports.push(name.to_string());
                ""
            }
        }
    }

    fn emit_import(&mut self, import: &ImportDecl) {
        let path: Vec<&str> = import.path.iter().map(|s| self.name(*s)).collect();
        let module_path = format!("./{}", path.join("/"));
        match self.options.modules {
            ModuleSystem::Esm => match &import.items {
                ImportItems::Module | ImportItems::Wildcard => {
                    // Wildcard imports bind the final path segment.
                    let binding = path.last().copied().unwrap_or("module");
                    self.line(&format!(
                        "import * as {} from \"{}.js\";",
                        binding, module_path
                    ));
                }
                ImportItems::List(items) => {
                    let items: Vec<String> = items
                        .iter()
                        .map(|(name, alias)| match alias {
                            Some(alias) => {
                                format!("{} as {}", self.name(*name), self.name(*alias))
                            }
                            None => self.name(*name).to_string(),
                        })
                        .collect();
                    self.line(&format!(
                        "import {{ {} }} from \"{}.js\";",
                        items.join(", "),
                        module_path
                    ));
                }
            },
            ModuleSystem::CommonJs => match &import.items {
                ImportItems::Module | ImportItems::Wildcard => {
                    let binding = path.last().copied().unwrap_or("module");
                    self.line(&format!(
                        "const {} = require(\"{}\");",
                        binding, module_path
                    ));
                }
                ImportItems::List(items) => {
                    let items: Vec<String> = items
                        .iter()
                        .map(|(name, alias)| match alias {
                            Some(alias) => {
                                format!("{}: {}", self.name(*name), self.name(*alias))
                            }
                            None => self.name(*name).to_string(),
                        })
                        .collect();
                    self.line(&format!(
                        "const {{ {} }} = require(\"{}\");",
                        items.join(", "),
                        module_path
                    ));
                }
            },
        }
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn emit_function(&mut self, f: &'a FunctionDecl<'a>, exported: bool) -> Lower<()> {
        let name = self.name(f.name).to_string();
        let params: Vec<&str> = f.params.iter().map(|p| self.name(p.name)).collect();
        let prefix = self.export_prefix(exported, &name);
        self.line(&format!("{}function {}({}) {{", prefix, name, params.join(", ")));
        self.indent += 1;
        self.emit_function_body(f)?;
        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    fn emit_function_body(&mut self, f: &'a FunctionDecl<'a>) -> Lower<()> {
        let body = match &f.body {
            Some(body) => body,
            None => return Ok(()),
        };
        let instrumented = self.instrument();

        if instrumented {
            for cond in f.requires() {
                let clause = ExprPrinter::new(self.interner).print(cond);
                let cond_js = self.expr(cond, ExprCtx::default())?;
                let pos = self.pos(cond.span);
                self.line(&format!(
                    "__requires({}, {}, {});",
                    cond_js,
                    js_string(&clause),
                    js_string(&pos)
                ));
            }
        }

        let ensures: Vec<&'a Expr<'a>> = if instrumented {
            f.ensures().collect()
        } else {
            Vec::new()
        };

        // Pre-state snapshots: every old(…) operand anywhere in the ensures
        // clauses is cloned into a stable binding before the body runs.
        let mut old_names = HashMap::new();
        if !ensures.is_empty() {
            let mut olds = Vec::new();
            for cond in &ensures {
                collect_old(cond, &mut olds);
            }
            for inner in olds {
                let binding = self.fresh("__old_");
                let value = self.expr(inner, ExprCtx::default())?;
                self.line(&format!("const {} = __clone({});", binding, value));
                old_names.insert(inner.span, binding);
            }
        }

        self.fn_stack.push(FnLower { ensures, old_names });

        for stmt in body.stmts {
            self.emit_stmt(stmt, ExprCtx::default())?;
        }
        match body.tail {
            Some(tail) => {
                self.emit_return(Some(tail), ExprCtx::default())?;
            }
            None => {
                // A function that can fall off its end still has its
                // postconditions checked on that path.
                let ends_with_return =
                    matches!(body.stmts.last().map(|s| &s.kind), Some(StmtKind::Return { .. }));
                if !ends_with_return && !self.fn_stack.last().unwrap().ensures.is_empty() {
                    self.emit_return(None, ExprCtx::default())?;
                }
            }
        }

        self.fn_stack.pop();
        Ok(())
    }

    fn emit_return(&mut self, value: Option<&'a Expr<'a>>, ctx: ExprCtx<'_>) -> Lower<()> {
        let has_ensures = self
            .fn_stack
            .last()
            .map(|f| !f.ensures.is_empty())
            .unwrap_or(false);
        if !has_ensures {
            match value {
                Some(value) => {
                    let js = self.expr(value, ctx)?;
                    self.line(&format!("return {};", js));
                }
                None => self.line("return;"),
            }
            return Ok(());
        }

        // Bind the returned value, re-evaluate each postcondition with
        // `result` rewritten to the binding, then yield it.
        let binding = self.fresh("__ret");
        let value_js = match value {
            Some(value) => self.expr(value, ctx)?,
            None => "undefined".to_string(),
        };
        self.line(&format!("const {} = {};", binding, value_js));
        let ensures = self.fn_stack.last().unwrap().ensures.clone();
        for cond in ensures {
            let clause = ExprPrinter::new(self.interner).print(cond);
            let cond_js = self.expr(
                cond,
                ExprCtx { result_name: Some(&binding), field_inst: ctx.field_inst },
            )?;
            let pos = self.pos(cond.span);
            self.line(&format!(
                "__ensures({}, {}, {});",
                cond_js,
                js_string(&clause),
                js_string(&pos)
            ));
        }
        self.line(&format!("return {};", binding));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Structs, enums, impls, traits, effects
    // ------------------------------------------------------------------

    fn emit_struct(&mut self, s: &'a StructDecl<'a>, exported: bool) -> Lower<()> {
        let name = self.name(s.name).to_string();
        let params: Vec<String> = s
            .fields
            .iter()
            .map(|f| self.constructor_param(f))
            .collect::<Lower<Vec<_>>>()?;
        let prefix = self.export_prefix(exported, &name);
        self.line(&format!(
            "{}function {}({}) {{",
            prefix,
            name,
            params.join(", ")
        ));
        self.indent += 1;
        self.line(&format!("const self = Object.create({}.prototype);", name));
        // Fields assign in declaration order.
        for field in &s.fields {
            let field_name = self.name(field.name);
            self.line(&format!("self.{} = {};", field_name, field_name));
        }
        if self.instrument() {
            let field_names: Vec<Symbol> = s.fields.iter().map(|f| f.name).collect();
            for annotation in &s.annotations {
                if let AnnotationKind::Invariant(cond) = &annotation.kind {
                    let clause = ExprPrinter::new(self.interner).print(cond);
                    let ctx = ExprCtx {
                        field_inst: Some((&field_names, "self")),
                        ..Default::default()
                    };
                    let cond_js = self.expr(cond, ctx)?;
                    let pos = self.pos(annotation.span);
                    self.line(&format!(
                        "__invariant({}, {}, {});",
                        cond_js,
                        js_string(&clause),
                        js_string(&pos)
                    ));
                }
            }
        }
        self.line("return self;");
        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    fn constructor_param(&mut self, field: &'a FieldDecl<'a>) -> Lower<String> {
        let name = self.name(field.name).to_string();
        match field.default {
            Some(default) => {
                let value = self.expr(default, ExprCtx::default())?;
                Ok(format!("{} = {}", name, value))
            }
            None => Ok(name),
        }
    }

    fn emit_enum(&mut self, e: &'a EnumDecl<'a>, exported: bool) -> Lower<()> {
        let name = self.name(e.name).to_string();
        let prefix = self.export_prefix(exported, &name);
        self.line(&format!("{}const {} = {{", prefix, name));
        self.indent += 1;
        for variant in &e.variants {
            let v_name = self.name(variant.name);
            if variant.fields.is_empty() {
                // Unit variants are frozen singletons.
                self.line(&format!(
                    "{}: Object.freeze({{ tag: \"{}\", fields: [] }}),",
                    v_name, v_name
                ));
            } else {
                let params: Vec<String> =
                    (0..variant.fields.len()).map(|i| format!("__f{}", i)).collect();
                self.line(&format!(
                    "{}: ({}) => ({{ tag: \"{}\", fields: [{}] }}),",
                    v_name,
                    params.join(", "),
                    v_name,
                    params.join(", ")
                ));
            }
        }
        self.indent -= 1;
        self.line("};");
        Ok(())
    }

    fn emit_impl(&mut self, imp: &'a ImplDecl<'a>) -> Lower<()> {
        let target = match imp.target.head_name() {
            Some(name) => self.name(name).to_string(),
            None => {
                return Err(CodegenError {
                    message: "impl target has no attachable name".to_string(),
                    span: imp.target.span,
                })
            }
        };
        for method in &imp.methods {
            if method.body.is_none() {
                continue;
            }
            let method_name = self.name(method.name).to_string();
            let params: Vec<&str> = method
                .params
                .iter()
                .filter(|p| p.ty.is_some())
                .map(|p| self.name(p.name))
                .collect();
            self.line(&format!(
                "{}.prototype.{} = function ({}) {{",
                target,
                method_name,
                params.join(", ")
            ));
            self.indent += 1;
            self.emit_function_body(method)?;
            self.indent -= 1;
            self.line("};");
        }
        Ok(())
    }

    fn emit_trait_interface(&mut self, t: &'a TraitDecl<'a>, exported: bool) {
        let name = self.name(t.name).to_string();
        let prefix = self.export_prefix(exported, &name);
        self.line(&format!("{}interface {} {{", prefix, name));
        self.indent += 1;
        for method in &t.methods {
            let params: Vec<String> = method
                .params
                .iter()
                .filter(|p| p.ty.is_some())
                .map(|p| {
                    let ty = p
                        .ty
                        .map(|t| self.ts_type(t))
                        .unwrap_or_else(|| "any".to_string());
                    format!("{}: {}", self.name(p.name), ty)
                })
                .collect();
            let ret = method
                .return_type
                .map(|t| self.ts_type(t))
                .unwrap_or_else(|| "void".to_string());
            self.line(&format!(
                "{}({}): {};",
                self.name(method.name),
                params.join(", "),
                ret
            ));
        }
        self.indent -= 1;
        self.line("}");
    }

    /// TypeScript surface type for trait interfaces. Best-effort mapping by
    /// name; anything without a direct TS counterpart collapses to `any`.
    fn ts_type(&self, ty: &TypeExpr<'_>) -> String {
        match &ty.kind {
            TypeExprKind::Named { path, .. } => {
                let name = match path.last() {
                    Some(name) => self.interner.resolve(*name),
                    None => return "any".to_string(),
                };
                match name {
                    "Int" | "Int8" | "Int16" | "Int32" | "Int64" | "UInt" | "Float32"
                    | "Float64" => "number".to_string(),
                    "String" | "Char" => "string".to_string(),
                    "Bool" => "boolean".to_string(),
                    "Void" => "void".to_string(),
                    "Never" => "never".to_string(),
                    _ => "any".to_string(),
                }
            }
            TypeExprKind::Array { elem, .. } => format!("{}[]", self.ts_type(elem)),
            TypeExprKind::Tuple(items) => {
                let items: Vec<String> = items.iter().map(|t| self.ts_type(t)).collect();
                format!("[{}]", items.join(", "))
            }
            TypeExprKind::Function { .. } => "(...args: any[]) => any".to_string(),
            TypeExprKind::Reference { inner, .. } => self.ts_type(inner),
            TypeExprKind::Optional(inner) => format!("{} | null", self.ts_type(inner)),
            TypeExprKind::SelfType => "any".to_string(),
        }
    }

    fn emit_effect(&mut self, e: &'a EffectDecl<'a>, exported: bool) {
        let name = self.name(e.name).to_string();
        if e.name == self.names.io {
            // The built-in IO effect keeps its standard-I/O handlers even
            // when redeclared.
            self.emit_io_record();
            return;
        }
        let prefix = self.export_prefix(exported, &name);
        self.line(&format!("{}const {} = {{", prefix, name));
        self.indent += 1;
        for method in &e.methods {
            // Identity stubs by default; hosts override the record fields.
            self.line(&format!(
                "{}: (...__args) => __args[0],",
                self.name(method.name)
            ));
        }
        self.indent -= 1;
        self.line("};");
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn emit_stmt(&mut self, stmt: &'a Stmt<'a>, ctx: ExprCtx<'_>) -> Lower<()> {
        match &stmt.kind {
            StmtKind::Let { name, mutable, init, .. } => {
                let name = self.name(*name).to_string();
                let keyword = if *mutable { "let" } else { "const" };
                match init {
                    Some(init) => {
                        let value = self.expr(init, ctx)?;
                        self.line(&format!("{} {} = {};", keyword, name, value));
                    }
                    None => self.line(&format!("let {};", name)),
                }
                Ok(())
            }
            StmtKind::Expr(expr) => match &expr.kind {
                ExprKind::If { cond, then_branch, else_branch } => {
                    self.emit_if_stmt(cond, then_branch, *else_branch, ctx)
                }
                ExprKind::Match { subject, arms } => {
                    self.emit_match_stmt(subject, arms, expr.span, ctx)
                }
                ExprKind::Block(block) => {
                    self.line("{");
                    self.indent += 1;
                    self.emit_block_stmts(block, ctx)?;
                    self.indent -= 1;
                    self.line("}");
                    Ok(())
                }
                _ => {
                    let js = self.expr(expr, ctx)?;
                    self.line(&format!("{};", js));
                    Ok(())
                }
            },
            StmtKind::While { cond, invariants, body } => {
                let cond_js = self.expr(cond, ctx)?;
                self.line(&format!("while ({}) {{", cond_js));
                self.indent += 1;
                // Invariants check at the start of each iteration.
                self.emit_loop_invariants(invariants, ctx)?;
                self.emit_block_stmts(body, ctx)?;
                self.indent -= 1;
                self.line("}");
                Ok(())
            }
            StmtKind::For { var, iterable, invariants, body } => {
                let var = self.name(*var).to_string();
                if let ExprKind::Range { start, end, inclusive } = &iterable.kind {
                    let start_js = self.expr(start, ctx)?;
                    let end_js = self.expr(end, ctx)?;
                    let cmp = if *inclusive { "<=" } else { "<" };
                    self.line(&format!(
                        "for (let {} = {}; {} {} {}; {}++) {{",
                        var, start_js, var, cmp, end_js, var
                    ));
                } else {
                    let iter_js = self.expr(iterable, ctx)?;
                    self.line(&format!("for (const {} of {}) {{", var, iter_js));
                }
                self.indent += 1;
                self.emit_loop_invariants(invariants, ctx)?;
                self.emit_block_stmts(body, ctx)?;
                self.indent -= 1;
                self.line("}");
                Ok(())
            }
            StmtKind::Return { value } => self.emit_return(*value, ctx),
        }
    }

    fn emit_loop_invariants(&mut self, invariants: &'a [&'a Expr<'a>], ctx: ExprCtx<'_>) -> Lower<()> {
        if !self.instrument() {
            return Ok(());
        }
        for cond in invariants {
            let clause = ExprPrinter::new(self.interner).print(cond);
            let cond_js = self.expr(cond, ctx)?;
            let pos = self.pos(cond.span);
            self.line(&format!(
                "__invariant({}, {}, {});",
                cond_js,
                js_string(&clause),
                js_string(&pos)
            ));
        }
        Ok(())
    }

    fn emit_block_stmts(&mut self, block: &Block<'a>, ctx: ExprCtx<'_>) -> Lower<()> {
        for stmt in block.stmts {
            self.emit_stmt(stmt, ctx)?;
        }
        if let Some(tail) = block.tail {
            let js = self.expr(tail, ctx)?;
            self.line(&format!("{};", js));
        }
        Ok(())
    }

    fn emit_if_stmt(
        &mut self,
        cond: &'a Expr<'a>,
        then_branch: &Block<'a>,
        else_branch: Option<&'a Expr<'a>>,
        ctx: ExprCtx<'_>,
    ) -> Lower<()> {
        let cond_js = self.expr(cond, ctx)?;
        self.line(&format!("if ({}) {{", cond_js));
        self.indent += 1;
        self.emit_block_stmts(then_branch, ctx)?;
        self.indent -= 1;
        match else_branch {
            None => {
                self.line("}");
            }
            Some(els) => {
                self.line("} else {");
                self.indent += 1;
                match &els.kind {
                    ExprKind::Block(block) => self.emit_block_stmts(block, ctx)?,
                    ExprKind::If { cond, then_branch, else_branch } => {
                        self.emit_if_stmt(cond, then_branch, *else_branch, ctx)?
                    }
                    _ => {
                        let js = self.expr(els, ctx)?;
                        self.line(&format!("{};", js));
                    }
                }
                self.indent -= 1;
                self.line("}");
            }
        }
        Ok(())
    }

    fn emit_match_stmt(
        &mut self,
        subject: &'a Expr<'a>,
        arms: &'a [MatchArm<'a>],
        span: Span,
        ctx: ExprCtx<'_>,
    ) -> Lower<()> {
        let subject_js = self.expr(subject, ctx)?;
        let subject_var = self.fresh("__m");
        let hit = self.fresh("__hit");
        self.line("{");
        self.indent += 1;
        self.line(&format!("const {} = {};", subject_var, subject_js));
        self.line(&format!("let {} = false;", hit));
        for arm in arms {
            let test = self.pattern_test(arm.pattern, &subject_var)?;
            self.line(&format!("if (!{} && {}) {{", hit, test));
            self.indent += 1;
            let mut bindings = Vec::new();
            self.pattern_bindings(arm.pattern, &subject_var, &mut bindings);
            for (name, path) in &bindings {
                self.line(&format!("const {} = {};", name, path));
            }
            if let Some(guard) = arm.guard {
                let guard_js = self.expr(guard, ctx)?;
                self.line(&format!("if ({}) {{", guard_js));
                self.indent += 1;
                self.line(&format!("{} = true;", hit));
                self.emit_arm_body(arm.body, ctx)?;
                self.indent -= 1;
                self.line("}");
            } else {
                self.line(&format!("{} = true;", hit));
                self.emit_arm_body(arm.body, ctx)?;
            }
            self.indent -= 1;
            self.line("}");
        }
        let terminal_wildcard = arms
            .last()
            .map(|arm| arm.pattern.is_irrefutable() && arm.guard.is_none())
            .unwrap_or(false);
        if !terminal_wildcard {
            let pos = self.pos(span);
            self.line(&format!("if (!{}) __matchFail({});", hit, js_string(&pos)));
        }
        self.indent -= 1;
        self.line("}");
        Ok(())
    }

    fn emit_arm_body(&mut self, body: &'a Expr<'a>, ctx: ExprCtx<'_>) -> Lower<()> {
        match &body.kind {
            ExprKind::Block(block) => self.emit_block_stmts(block, ctx),
            _ => {
                let js = self.expr(body, ctx)?;
                self.line(&format!("{};", js));
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn expr(&mut self, expr: &'a Expr<'a>, ctx: ExprCtx<'_>) -> Lower<String> {
        match &expr.kind {
            ExprKind::Ident(name) => {
                // `result` rewrites to the bound return value inside an
                // ensures clause.
                if *name == self.names.result {
                    if let Some(binding) = ctx.result_name {
                        return Ok(binding.to_string());
                    }
                }
                // Struct invariant free variables rewrite to instance
                // fields.
                if let Some((fields, instance)) = ctx.field_inst {
                    if fields.contains(name) {
                        return Ok(format!("{}.{}", instance, self.name(*name)));
                    }
                }
                Ok(self.name(*name).to_string())
            }
            ExprKind::SelfRef => Ok("this".to_string()),
            ExprKind::Literal(lit) => Ok(self.literal(lit)),
            ExprKind::Path { base, member } => {
                Ok(format!("{}.{}", self.name(*base), self.name(*member)))
            }
            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_js = self.expr(lhs, ctx)?;
                let rhs_js = self.expr(rhs, ctx)?;
                Ok(match op {
                    BinaryOp::Pow => format!("Math.pow({}, {})", lhs_js, rhs_js),
                    BinaryOp::Eq => format!("({} === {})", lhs_js, rhs_js),
                    BinaryOp::NotEq => format!("({} !== {})", lhs_js, rhs_js),
                    _ => format!("({} {} {})", lhs_js, op.symbol(), rhs_js),
                })
            }
            ExprKind::Unary { op, operand } => {
                let operand_js = self.expr(operand, ctx)?;
                Ok(match op {
                    UnaryOp::Neg => format!("(-{})", operand_js),
                    UnaryOp::Not => format!("(!{})", operand_js),
                    UnaryOp::BitNot => format!("(~{})", operand_js),
                    // References erase in the untyped host.
                    UnaryOp::Ref { .. } | UnaryOp::Deref => operand_js,
                })
            }
            ExprKind::Assign { op, target, value } => {
                let target_js = self.expr(target, ctx)?;
                let value_js = self.expr(value, ctx)?;
                Ok(match op {
                    None => format!("({} = {})", target_js, value_js),
                    Some(op) => format!("({} {}= {})", target_js, op.symbol(), value_js),
                })
            }
            ExprKind::Call { callee, args } => {
                let callee_js = self.expr(callee, ctx)?;
                let args_js = args
                    .iter()
                    .map(|a| self.expr(a, ctx))
                    .collect::<Lower<Vec<_>>>()?;
                Ok(format!("{}({})", callee_js, args_js.join(", ")))
            }
            ExprKind::Member { object, field } => {
                let object_js = self.expr(object, ctx)?;
                Ok(format!("{}.{}", object_js, self.name(*field)))
            }
            ExprKind::TupleField { object, index } => {
                let object_js = self.expr(object, ctx)?;
                Ok(format!("{}[{}]", object_js, index))
            }
            ExprKind::Index { object, index } => {
                let object_js = self.expr(object, ctx)?;
                let index_js = self.expr(index, ctx)?;
                Ok(format!("{}[{}]", object_js, index_js))
            }
            ExprKind::If { cond, then_branch, else_branch } => {
                self.iife(|e| e.emit_if_value(cond, then_branch, *else_branch, ctx))
            }
            ExprKind::Match { subject, arms } => {
                let subject_js = self.expr(subject, ctx)?;
                let body = self.capture(|e| {
                    e.indent += 1;
                    e.emit_match_value(arms, expr.span, ctx)?;
                    e.indent -= 1;
                    Ok(())
                })?;
                Ok(format!("((__m) => {{\n{}}})({})", body, subject_js))
            }
            ExprKind::Block(block) => self.iife(|e| e.emit_block_value(block, ctx)),
            ExprKind::Lambda { params, body, .. } => {
                let params: Vec<&str> = params.iter().map(|p| self.name(p.name)).collect();
                match &body.kind {
                    ExprKind::Block(block) => {
                        let body_js = self.capture(|e| {
                            e.indent += 1;
                            e.emit_block_value(block, ctx)?;
                            e.indent -= 1;
                            Ok(())
                        })?;
                        Ok(format!("(({}) => {{\n{}}})", params.join(", "), body_js))
                    }
                    _ => {
                        let body_js = self.expr(body, ctx)?;
                        Ok(format!("(({}) => {})", params.join(", "), body_js))
                    }
                }
            }
            ExprKind::Array(items) => {
                let items = items
                    .iter()
                    .map(|e| self.expr(e, ctx))
                    .collect::<Lower<Vec<_>>>()?;
                Ok(format!("[{}]", items.join(", ")))
            }
            ExprKind::Tuple(items) => {
                let items = items
                    .iter()
                    .map(|e| self.expr(e, ctx))
                    .collect::<Lower<Vec<_>>>()?;
                Ok(format!("[{}]", items.join(", ")))
            }
            ExprKind::StructLit { name, fields, spread } => {
                self.struct_literal(*name, fields, *spread, expr.span, ctx)
            }
            ExprKind::Range { start, end, inclusive } => {
                let start_js = self.expr(start, ctx)?;
                let end_js = self.expr(end, ctx)?;
                Ok(format!("__range({}, {}, {})", start_js, end_js, inclusive))
            }
            ExprKind::Cast { expr: inner, .. } => {
                // Casts erase; the host is untyped.
                let inner_js = self.expr(inner, ctx)?;
                Ok(format!("({})", inner_js))
            }
            ExprKind::Old(inner) => {
                let fn_ctx = self.fn_stack.last().ok_or_else(|| CodegenError {
                    message: "old(…) outside a lowered function".to_string(),
                    span: expr.span,
                })?;
                match fn_ctx.old_names.get(&inner.span) {
                    Some(binding) => Ok(binding.clone()),
                    None => Err(CodegenError {
                        message: "old(…) operand missing its pre-state snapshot".to_string(),
                        span: expr.span,
                    }),
                }
            }
            ExprKind::Quantifier { kind, bindings, body } => {
                // Bounded quantifiers lower to all-true/any-true over their
                // ranges; an unbounded binding has no runtime range and the
                // whole quantifier is trusted.
                if bindings.iter().any(|b| b.collection.is_none()) {
                    return Ok("true".to_string());
                }
                let method = match kind {
                    QuantifierKind::Forall => "every",
                    QuantifierKind::Exists => "some",
                };
                let mut out = self.expr(body, ctx)?;
                for binding in bindings.iter().rev() {
                    let collection = self.expr(binding.collection.unwrap(), ctx)?;
                    out = format!(
                        "{}.{}(({}) => {})",
                        collection,
                        method,
                        self.name(binding.name),
                        out
                    );
                }
                Ok(out)
            }
            ExprKind::Try(inner) => {
                let inner_js = self.expr(inner, ctx)?;
                Ok(format!("unwrap({})", inner_js))
            }
        }
    }

    fn iife<F>(&mut self, f: F) -> Lower<String>
    where
        F: FnOnce(&mut Self) -> Lower<()>,
    {
        let body = self.capture(|e| {
            e.indent += 1;
            f(e)?;
            e.indent -= 1;
            Ok(())
        })?;
        Ok(format!("(() => {{\n{}}})()", body))
    }

    fn emit_block_value(&mut self, block: &Block<'a>, ctx: ExprCtx<'_>) -> Lower<()> {
        for stmt in block.stmts {
            self.emit_stmt(stmt, ctx)?;
        }
        if let Some(tail) = block.tail {
            let js = self.expr(tail, ctx)?;
            self.line(&format!("return {};", js));
        }
        Ok(())
    }

    fn emit_if_value(
        &mut self,
        cond: &'a Expr<'a>,
        then_branch: &Block<'a>,
        else_branch: Option<&'a Expr<'a>>,
        ctx: ExprCtx<'_>,
    ) -> Lower<()> {
        let cond_js = self.expr(cond, ctx)?;
        self.line(&format!("if ({}) {{", cond_js));
        self.indent += 1;
        self.emit_block_value(then_branch, ctx)?;
        self.indent -= 1;
        match else_branch {
            None => self.line("}"),
            Some(els) => {
                self.line("} else {");
                self.indent += 1;
                match &els.kind {
                    ExprKind::Block(block) => self.emit_block_value(block, ctx)?,
                    ExprKind::If { cond, then_branch, else_branch } => {
                        self.emit_if_value(cond, then_branch, *else_branch, ctx)?
                    }
                    _ => {
                        let js = self.expr(els, ctx)?;
                        self.line(&format!("return {};", js));
                    }
                }
                self.indent -= 1;
                self.line("}");
            }
        }
        Ok(())
    }

    fn emit_match_value(
        &mut self,
        arms: &'a [MatchArm<'a>],
        span: Span,
        ctx: ExprCtx<'_>,
    ) -> Lower<()> {
        for arm in arms {
            let test = self.pattern_test(arm.pattern, "__m")?;
            self.line(&format!("if ({}) {{", test));
            self.indent += 1;
            let mut bindings = Vec::new();
            self.pattern_bindings(arm.pattern, "__m", &mut bindings);
            for (name, path) in &bindings {
                self.line(&format!("const {} = {};", name, path));
            }
            match arm.guard {
                Some(guard) => {
                    let guard_js = self.expr(guard, ctx)?;
                    self.line(&format!("if ({}) {{", guard_js));
                    self.indent += 1;
                    let body_js = self.expr(arm.body, ctx)?;
                    self.line(&format!("return {};", body_js));
                    self.indent -= 1;
                    self.line("}");
                }
                None => {
                    let body_js = self.expr(arm.body, ctx)?;
                    self.line(&format!("return {};", body_js));
                }
            }
            self.indent -= 1;
            self.line("}");
        }
        // A terminal wildcard arm already matches anything; otherwise the
        // fallthrough raises the exhaustiveness failure.
        let terminal_wildcard = arms
            .last()
            .map(|arm| arm.pattern.is_irrefutable() && arm.guard.is_none())
            .unwrap_or(false);
        if !terminal_wildcard {
            let pos = self.pos(span);
            self.line(&format!("__matchFail({});", js_string(&pos)));
        }
        Ok(())
    }

    fn struct_literal(
        &mut self,
        name: Symbol,
        fields: &'a [(Symbol, &'a Expr<'a>)],
        spread: Option<&'a Expr<'a>>,
        span: Span,
        ctx: ExprCtx<'_>,
    ) -> Lower<String> {
        if let Some(base) = spread {
            // Spread form copy-extends an existing record with the named
            // overrides.
            let base_js = self.expr(base, ctx)?;
            let mut parts = vec![format!("...{}", base_js)];
            for (field, value) in fields {
                let value_js = self.expr(value, ctx)?;
                parts.push(format!("{}: {}", self.name(*field), value_js));
            }
            return Ok(format!("({{ {} }})", parts.join(", ")));
        }

        // Non-spread form invokes the declared constructor in field
        // declaration order.
        match self.analysis.registry.struct_def(name) {
            Some(def) => {
                let order: Vec<Symbol> = def.fields.iter().map(|f| f.name).collect();
                let mut args = Vec::with_capacity(order.len());
                for field_name in order {
                    match fields.iter().find(|(n, _)| *n == field_name) {
                        Some((_, value)) => args.push(self.expr(value, ctx)?),
                        // Absent fields fall back to the constructor's
                        // default parameter.
                        None => args.push("undefined".to_string()),
                    }
                }
                Ok(format!("{}({})", self.name(name), args.join(", ")))
            }
            None => Err(CodegenError {
                message: format!(
                    "struct literal for unknown type '{}'",
                    self.name(name)
                ),
                span,
            }),
        }
    }

    fn literal(&self, lit: &Literal) -> String {
        match lit {
            Literal::Int(n) => n.to_string(),
            Literal::Float(f) => {
                if f.fract() == 0.0 && f.is_finite() {
                    format!("{:.1}", f)
                } else {
                    let mut out = String::new();
                    let _ = write!(out, "{}", f);
                    out
                }
            }
            Literal::Str(s) => js_string(self.interner.resolve(*s)),
            Literal::Char(c) => js_string(&c.to_string()),
            Literal::Bool(b) => b.to_string(),
            Literal::Nil => "null".to_string(),
        }
    }

    // ------------------------------------------------------------------
    // Patterns: the test and the bindings are independent traversals over
    // the same shape, composed by conjunction and by fresh names.
    // ------------------------------------------------------------------

    fn pattern_test(&mut self, pattern: &'a Pattern<'a>, subject: &str) -> Lower<String> {
        let mut parts = Vec::new();
        self.pattern_test_into(pattern, subject, &mut parts)?;
        if parts.is_empty() {
            Ok("true".to_string())
        } else {
            Ok(parts.join(" && "))
        }
    }

    fn pattern_test_into(
        &mut self,
        pattern: &'a Pattern<'a>,
        subject: &str,
        out: &mut Vec<String>,
    ) -> Lower<()> {
        match &pattern.kind {
            PatternKind::Wildcard | PatternKind::Binding { .. } => {}
            PatternKind::Literal(lit) => {
                out.push(format!("{} === {}", subject, self.literal(lit)));
            }
            PatternKind::Tuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    let path = format!("{}[{}]", subject, i);
                    self.pattern_test_into(item, &path, out)?;
                }
            }
            PatternKind::Struct { fields, .. } => {
                for (field, sub) in fields {
                    if let Some(sub) = sub {
                        let path = format!("{}.{}", subject, self.name(*field));
                        self.pattern_test_into(sub, &path, out)?;
                    }
                }
            }
            PatternKind::EnumVariant { variant, fields, .. } => {
                out.push(format!(
                    "{}.tag === \"{}\"",
                    subject,
                    self.name(*variant)
                ));
                for (i, sub) in fields.iter().enumerate() {
                    let path = format!("{}.fields[{}]", subject, i);
                    self.pattern_test_into(sub, &path, out)?;
                }
            }
            PatternKind::Range { lo, hi, inclusive } => {
                let upper = if *inclusive { "<=" } else { "<" };
                out.push(format!(
                    "{} >= {} && {} {} {}",
                    subject,
                    self.literal(lo),
                    subject,
                    upper,
                    self.literal(hi)
                ));
            }
        }
        Ok(())
    }

    fn pattern_bindings(
        &mut self,
        pattern: &'a Pattern<'a>,
        subject: &str,
        out: &mut Vec<(String, String)>,
    ) {
        match &pattern.kind {
            PatternKind::Wildcard | PatternKind::Literal(_) | PatternKind::Range { .. } => {}
            PatternKind::Binding { name, .. } => {
                out.push((self.name(*name).to_string(), subject.to_string()));
            }
            PatternKind::Tuple(items) => {
                for (i, item) in items.iter().enumerate() {
                    let path = format!("{}[{}]", subject, i);
                    self.pattern_bindings(item, &path, out);
                }
            }
            PatternKind::Struct { fields, .. } => {
                for (field, sub) in fields {
                    let path = format!("{}.{}", subject, self.name(*field));
                    match sub {
                        Some(sub) => self.pattern_bindings(sub, &path, out),
                        None => out.push((self.name(*field).to_string(), path)),
                    }
                }
            }
            PatternKind::EnumVariant { fields, .. } => {
                for (i, sub) in fields.iter().enumerate() {
                    let path = format!("{}.fields[{}]", subject, i);
                    self.pattern_bindings(sub, &path, out);
                }
            }
        }
    }
}

fn strip_export<'d, 'a>(decl: &'d Decl<'a>) -> &'d Decl<'a> {
    match &decl.kind {
        DeclKind::Export(inner) => strip_export(inner),
        _ => decl,
    }
}

/// Collect every `old(…)` operand reachable from an ensures clause. A full
/// visitor: a partial traversal would miss snapshots and break pre-state
/// evaluation.
fn collect_old<'a>(expr: &'a Expr<'a>, out: &mut Vec<&'a Expr<'a>>) {
    match &expr.kind {
        ExprKind::Old(inner) => {
            out.push(inner);
            collect_old(inner, out);
        }
        ExprKind::Ident(_) | ExprKind::Literal(_) | ExprKind::Path { .. } | ExprKind::SelfRef => {}
        ExprKind::Binary { lhs, rhs, .. } => {
            collect_old(lhs, out);
            collect_old(rhs, out);
        }
        ExprKind::Unary { operand, .. } => collect_old(operand, out),
        ExprKind::Assign { target, value, .. } => {
            collect_old(target, out);
            collect_old(value, out);
        }
        ExprKind::Call { callee, args } => {
            collect_old(callee, out);
            for arg in args {
                collect_old(arg, out);
            }
        }
        ExprKind::Member { object, .. } => collect_old(object, out),
        ExprKind::TupleField { object, .. } => collect_old(object, out),
        ExprKind::Index { object, index } => {
            collect_old(object, out);
            collect_old(index, out);
        }
        ExprKind::If { cond, then_branch, else_branch } => {
            collect_old(cond, out);
            collect_old_block(then_branch, out);
            if let Some(els) = else_branch {
                collect_old(els, out);
            }
        }
        ExprKind::Match { subject, arms } => {
            collect_old(subject, out);
            for arm in arms {
                if let Some(guard) = arm.guard {
                    collect_old(guard, out);
                }
                collect_old(arm.body, out);
            }
        }
        ExprKind::Block(block) => collect_old_block(block, out),
        ExprKind::Lambda { body, .. } => collect_old(body, out),
        ExprKind::Array(items) | ExprKind::Tuple(items) => {
            for item in items {
                collect_old(item, out);
            }
        }
        ExprKind::StructLit { fields, spread, .. } => {
            for (_, value) in fields {
                collect_old(value, out);
            }
            if let Some(base) = spread {
                collect_old(base, out);
            }
        }
        ExprKind::Range { start, end, .. } => {
            collect_old(start, out);
            collect_old(end, out);
        }
        ExprKind::Cast { expr, .. } => collect_old(expr, out),
        ExprKind::Quantifier { bindings, body, .. } => {
            for binding in bindings {
                if let Some(collection) = binding.collection {
                    collect_old(collection, out);
                }
            }
            collect_old(body, out);
        }
        ExprKind::Try(inner) => collect_old(inner, out),
    }
}

fn collect_old_block<'a>(block: &Block<'a>, out: &mut Vec<&'a Expr<'a>>) {
    for stmt in block.stmts {
        match &stmt.kind {
            StmtKind::Let { init, .. } => {
                if let Some(init) = init {
                    collect_old(init, out);
                }
            }
            StmtKind::Expr(expr) => collect_old(expr, out),
            StmtKind::While { cond, invariants, body } => {
                collect_old(cond, out);
                for invariant in invariants {
                    collect_old(invariant, out);
                }
                collect_old_block(body, out);
            }
            StmtKind::For { iterable, invariants, body, .. } => {
                collect_old(iterable, out);
                for invariant in invariants {
                    collect_old(invariant, out);
                }
                collect_old_block(body, out);
            }
            StmtKind::Return { value } => {
                if let Some(value) = value {
                    collect_old(value, out);
                }
            }
        }
    }
    if let Some(tail) = block.tail {
        collect_old(tail, out);
    }
}

/// JavaScript string literal with escaping.
fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_string_escapes_specials() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(js_string("line\nbreak"), "\"line\\nbreak\"");
        assert_eq!(js_string("tab\there"), "\"tab\\there\"");
    }
}
