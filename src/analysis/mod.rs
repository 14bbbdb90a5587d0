//! Resolver and type/contract/effect/capability checker.
//!
//! Two sub-passes over the same tree: *collection* installs every top-level
//! name and declared signature so bodies may refer forward, then *checking*
//! types every body and annotation. Neither pass stops at the first error.

pub mod registry;
pub mod scope;
pub mod ty;

mod check;
mod collect;

pub use check::Checker;
pub use registry::TypeRegistry;
pub use scope::{ContractDef, IntentDef, ScopeKind, SymbolEntry, SymbolKind, SymbolTable};
pub use ty::{is_assignable, FnTy, Prim, Ty};

use std::collections::HashMap;

use crate::ast::Program;
use crate::diagnostics::DiagnosticSink;
use crate::intern::{Interner, Symbol};
use crate::token::Span;

/// Names the analysis and lowering passes need ready-made symbols for.
/// Interned once up front so later passes can hold the interner immutably.
pub struct WellKnown {
    pub result: Symbol,
    pub self_value: Symbol,
    pub io: Symbol,
    pub io_read: Symbol,
    pub io_write: Symbol,
    pub int: Symbol,
    pub int8: Symbol,
    pub int16: Symbol,
    pub int32: Symbol,
    pub int64: Symbol,
    pub uint: Symbol,
    pub float32: Symbol,
    pub float64: Symbol,
    pub bool_: Symbol,
    pub char_: Symbol,
    pub string: Symbol,
    pub void: Symbol,
    pub never: Symbol,
    pub result_type: Symbol,
    pub option_type: Symbol,
    pub ok_ctor: Symbol,
    pub err_ctor: Symbol,
    pub some_ctor: Symbol,
    pub none_value: Symbol,
    pub is_ok: Symbol,
    pub is_err: Symbol,
    pub is_some: Symbol,
    pub is_none: Symbol,
    pub unwrap_fn: Symbol,
}

impl WellKnown {
    pub fn intern(interner: &mut Interner) -> Self {
        WellKnown {
            result: interner.intern("result"),
            self_value: interner.intern("self"),
            io: interner.intern("IO"),
            io_read: interner.intern("read"),
            io_write: interner.intern("write"),
            int: interner.intern("Int"),
            int8: interner.intern("Int8"),
            int16: interner.intern("Int16"),
            int32: interner.intern("Int32"),
            int64: interner.intern("Int64"),
            uint: interner.intern("UInt"),
            float32: interner.intern("Float32"),
            float64: interner.intern("Float64"),
            bool_: interner.intern("Bool"),
            char_: interner.intern("Char"),
            string: interner.intern("String"),
            void: interner.intern("Void"),
            never: interner.intern("Never"),
            result_type: interner.intern("Result"),
            option_type: interner.intern("Option"),
            ok_ctor: interner.intern("Ok"),
            err_ctor: interner.intern("Err"),
            some_ctor: interner.intern("Some"),
            none_value: interner.intern("None"),
            is_ok: interner.intern("isOk"),
            is_err: interner.intern("isErr"),
            is_some: interner.intern("isSome"),
            is_none: interner.intern("isNone"),
            unwrap_fn: interner.intern("unwrap"),
        }
    }

    pub fn prim_for(&self, name: Symbol) -> Option<Prim> {
        let prim = if name == self.int {
            Prim::Int
        } else if name == self.int8 {
            Prim::Int8
        } else if name == self.int16 {
            Prim::Int16
        } else if name == self.int32 {
            Prim::Int32
        } else if name == self.int64 {
            Prim::Int64
        } else if name == self.uint {
            Prim::UInt
        } else if name == self.float32 {
            Prim::Float32
        } else if name == self.float64 {
            Prim::Float64
        } else if name == self.bool_ {
            Prim::Bool
        } else if name == self.char_ {
            Prim::Char
        } else if name == self.string {
            Prim::Str
        } else if name == self.void {
            Prim::Void
        } else if name == self.never {
            Prim::Never
        } else {
            return None;
        };
        Some(prim)
    }
}

/// Everything the checking pass yields: the symbol environment, the nominal
/// definition tables, and the position-keyed expression type map the lowerer
/// consults.
pub struct Analysis {
    pub types: HashMap<Span, Ty>,
    pub table: SymbolTable,
    pub registry: TypeRegistry,
}

impl Analysis {
    pub fn expr_ty(&self, span: Span) -> Option<&Ty> {
        self.types.get(&span)
    }
}

pub fn analyze(
    program: &Program<'_>,
    interner: &Interner,
    names: &WellKnown,
    sink: &mut DiagnosticSink,
) -> Analysis {
    let mut checker = Checker::new(interner, names, sink);
    checker.collect(program);
    checker.check_program(program);
    checker.finish()
}
