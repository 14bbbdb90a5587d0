//! Definition tables for nominal types.
//!
//! Filled by the collection pass, consulted by the checking pass and the
//! lowerer (field declaration order drives constructor emission).

use std::collections::HashMap;

use super::ty::{FnTy, Ty};
use crate::intern::Symbol;

#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: Ty,
    pub has_default: bool,
}

#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: Symbol,
    /// Declaration order preserved; constructor arguments follow it.
    pub fields: Vec<FieldDef>,
    pub generics: Vec<Symbol>,
    /// Serialized invariant clauses, for reporting parity with contracts.
    pub invariants: Vec<String>,
    /// Module tag for imported opaque types; single-file compiles leave it
    /// empty.
    pub module: Option<Symbol>,
}

impl StructDef {
    pub fn field(&self, name: Symbol) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct VariantDef {
    pub name: Symbol,
    /// Ordered field types; empty for unit variants.
    pub fields: Vec<Ty>,
}

#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: Symbol,
    pub variants: Vec<VariantDef>,
    pub generics: Vec<Symbol>,
}

impl EnumDef {
    pub fn variant(&self, name: Symbol) -> Option<&VariantDef> {
        self.variants.iter().find(|v| v.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct MethodSig {
    pub name: Symbol,
    pub ty: FnTy,
}

#[derive(Debug, Clone)]
pub struct TraitDef {
    pub name: Symbol,
    pub methods: Vec<MethodSig>,
    pub supertraits: Vec<Symbol>,
    pub generics: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct EffectDef {
    pub name: Symbol,
    pub methods: Vec<MethodSig>,
    pub generics: Vec<Symbol>,
}

impl EffectDef {
    pub fn method(&self, name: Symbol) -> Option<&MethodSig> {
        self.methods.iter().find(|m| m.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct CapabilityDef {
    pub name: Symbol,
    pub permissions: Vec<(Symbol, Ty)>,
}

#[derive(Debug, Default)]
pub struct TypeRegistry {
    structs: HashMap<Symbol, StructDef>,
    enums: HashMap<Symbol, EnumDef>,
    traits: HashMap<Symbol, TraitDef>,
    effects: HashMap<Symbol, EffectDef>,
    capabilities: HashMap<Symbol, CapabilityDef>,
    /// Inherent and trait-impl methods, keyed by (type name, method name).
    methods: HashMap<(Symbol, Symbol), FnTy>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_struct(&mut self, def: StructDef) {
        self.structs.insert(def.name, def);
    }

    pub fn struct_def(&self, name: Symbol) -> Option<&StructDef> {
        self.structs.get(&name)
    }

    pub fn define_enum(&mut self, def: EnumDef) {
        self.enums.insert(def.name, def);
    }

    pub fn enum_def(&self, name: Symbol) -> Option<&EnumDef> {
        self.enums.get(&name)
    }

    pub fn define_trait(&mut self, def: TraitDef) {
        self.traits.insert(def.name, def);
    }

    pub fn trait_def(&self, name: Symbol) -> Option<&TraitDef> {
        self.traits.get(&name)
    }

    pub fn define_effect(&mut self, def: EffectDef) {
        self.effects.insert(def.name, def);
    }

    pub fn effect_def(&self, name: Symbol) -> Option<&EffectDef> {
        self.effects.get(&name)
    }

    pub fn define_capability(&mut self, def: CapabilityDef) {
        self.capabilities.insert(def.name, def);
    }

    pub fn capability_def(&self, name: Symbol) -> Option<&CapabilityDef> {
        self.capabilities.get(&name)
    }

    pub fn define_method(&mut self, ty: Symbol, method: Symbol, sig: FnTy) {
        self.methods.insert((ty, method), sig);
    }

    pub fn method(&self, ty: Symbol, method: Symbol) -> Option<&FnTy> {
        self.methods.get(&(ty, method))
    }
}
