//! Symbol scopes.
//!
//! Each scope holds four independent name maps: ordinary symbols, type
//! definitions, contract declarations, and intent declarations. Scopes chain
//! through a parent index; duplicate definition within one scope is an error
//! while inner scopes may shadow outer ones. The table also carries the
//! ambient state of the checking pass: the active effect set and the active
//! capability-permission map.

use std::collections::{HashMap, HashSet};

use super::ty::Ty;
use crate::intern::Symbol;
use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Function,
    Block,
    Loop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Variable,
    Parameter,
    Function,
    Type,
    Module,
    TypeVar,
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub name: Symbol,
    pub kind: SymbolKind,
    pub ty: Ty,
    pub mutable: bool,
    pub span: Span,
}

/// Contract clauses, serialized at collection time.
#[derive(Debug, Clone, Default)]
pub struct ContractDef {
    pub name: Symbol,
    pub requires: Vec<String>,
    pub ensures: Vec<String>,
    pub invariants: Vec<String>,
}

/// Intent ensures list, serialized at collection time.
#[derive(Debug, Clone, Default)]
pub struct IntentDef {
    pub name: Symbol,
    pub ensures: Vec<String>,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<usize>,
    symbols: HashMap<Symbol, SymbolEntry>,
    types: HashMap<Symbol, Ty>,
    contracts: HashMap<Symbol, ContractDef>,
    intents: HashMap<Symbol, IntentDef>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<usize>) -> Self {
        Scope {
            kind,
            parent,
            symbols: HashMap::new(),
            types: HashMap::new(),
            contracts: HashMap::new(),
            intents: HashMap::new(),
        }
    }
}

#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: usize,
    /// Effect names the function being checked may invoke.
    pub active_effects: HashSet<Symbol>,
    /// Capability name to the permission fields supplied at the annotation.
    pub active_capabilities: HashMap<Symbol, Vec<Symbol>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            scopes: vec![Scope::new(ScopeKind::Global, None)],
            current: 0,
            active_effects: HashSet::new(),
            active_capabilities: HashMap::new(),
        }
    }

    pub fn push(&mut self, kind: ScopeKind) {
        let scope = Scope::new(kind, Some(self.current));
        self.scopes.push(scope);
        self.current = self.scopes.len() - 1;
    }

    pub fn pop(&mut self) {
        if let Some(parent) = self.scopes[self.current].parent {
            self.current = parent;
        }
    }

    pub fn current_kind(&self) -> ScopeKind {
        self.scopes[self.current].kind
    }

    /// Install a symbol in the current scope. Fails with the previous span
    /// when the name is already defined in this scope.
    pub fn define(&mut self, entry: SymbolEntry) -> Result<(), Span> {
        let scope = &mut self.scopes[self.current];
        if let Some(existing) = scope.symbols.get(&entry.name) {
            return Err(existing.span);
        }
        scope.symbols.insert(entry.name, entry);
        Ok(())
    }

    pub fn lookup(&self, name: Symbol) -> Option<&SymbolEntry> {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let Some(entry) = self.scopes[i].symbols.get(&name) {
                return Some(entry);
            }
            index = self.scopes[i].parent;
        }
        None
    }

    /// Refine the type of an already-defined symbol (inference on `let`
    /// without a declared type).
    pub fn set_symbol_type(&mut self, name: Symbol, ty: Ty) {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let Some(entry) = self.scopes[i].symbols.get_mut(&name) {
                entry.ty = ty;
                return;
            }
            index = self.scopes[i].parent;
        }
    }

    pub fn define_type(&mut self, name: Symbol, ty: Ty) -> Result<(), ()> {
        let scope = &mut self.scopes[self.current];
        if scope.types.contains_key(&name) {
            return Err(());
        }
        scope.types.insert(name, ty);
        Ok(())
    }

    /// Replace a type entry in place; used when alias resolution completes.
    pub fn update_type(&mut self, name: Symbol, ty: Ty) {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let Some(entry) = self.scopes[i].types.get_mut(&name) {
                *entry = ty;
                return;
            }
            index = self.scopes[i].parent;
        }
    }

    pub fn lookup_type(&self, name: Symbol) -> Option<&Ty> {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let Some(ty) = self.scopes[i].types.get(&name) {
                return Some(ty);
            }
            index = self.scopes[i].parent;
        }
        None
    }

    pub fn define_contract(&mut self, def: ContractDef) -> Result<(), ()> {
        let scope = &mut self.scopes[self.current];
        if scope.contracts.contains_key(&def.name) {
            return Err(());
        }
        scope.contracts.insert(def.name, def);
        Ok(())
    }

    pub fn lookup_contract(&self, name: Symbol) -> Option<&ContractDef> {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let Some(def) = self.scopes[i].contracts.get(&name) {
                return Some(def);
            }
            index = self.scopes[i].parent;
        }
        None
    }

    pub fn define_intent(&mut self, def: IntentDef) -> Result<(), ()> {
        let scope = &mut self.scopes[self.current];
        if scope.intents.contains_key(&def.name) {
            return Err(());
        }
        scope.intents.insert(def.name, def);
        Ok(())
    }

    pub fn lookup_intent(&self, name: Symbol) -> Option<&IntentDef> {
        let mut index = Some(self.current);
        while let Some(i) = index {
            if let Some(def) = self.scopes[i].intents.get(&name) {
                return Some(def);
            }
            index = self.scopes[i].parent;
        }
        None
    }

    /// All symbol names visible from the current scope; suggestion
    /// candidates for undefined-identifier diagnostics.
    pub fn visible_names(&self) -> Vec<Symbol> {
        let mut names = Vec::new();
        let mut index = Some(self.current);
        while let Some(i) = index {
            names.extend(self.scopes[i].symbols.keys().copied());
            index = self.scopes[i].parent;
        }
        names
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ty::Ty;
    use crate::intern::Interner;

    fn entry(name: Symbol) -> SymbolEntry {
        SymbolEntry {
            name,
            kind: SymbolKind::Variable,
            ty: Ty::INT,
            mutable: false,
            span: Span::default(),
        }
    }

    #[test]
    fn duplicate_in_same_scope_fails() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut table = SymbolTable::new();
        assert!(table.define(entry(x)).is_ok());
        assert!(table.define(entry(x)).is_err());
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut table = SymbolTable::new();
        table.define(entry(x)).unwrap();
        table.push(ScopeKind::Block);
        let mut shadow = entry(x);
        shadow.ty = Ty::BOOL;
        assert!(table.define(shadow).is_ok());
        assert_eq!(table.lookup(x).unwrap().ty, Ty::BOOL);
        table.pop();
        assert_eq!(table.lookup(x).unwrap().ty, Ty::INT);
    }

    #[test]
    fn lookup_chains_to_parents() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut table = SymbolTable::new();
        table.define(entry(x)).unwrap();
        table.push(ScopeKind::Function);
        table.push(ScopeKind::Block);
        assert!(table.lookup(x).is_some());
    }

    #[test]
    fn four_name_maps_are_independent() {
        let mut interner = Interner::new();
        let name = interner.intern("Thing");
        let mut table = SymbolTable::new();
        table.define(entry(name)).unwrap();
        table.define_type(name, Ty::Struct(name)).unwrap();
        table
            .define_contract(ContractDef { name, ..Default::default() })
            .unwrap();
        table
            .define_intent(IntentDef { name, ensures: Vec::new() })
            .unwrap();
        assert!(table.lookup(name).is_some());
        assert!(table.lookup_type(name).is_some());
        assert!(table.lookup_contract(name).is_some());
        assert!(table.lookup_intent(name).is_some());
    }
}
