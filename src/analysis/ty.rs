//! Semantic types manipulated by the checker, distinct from syntactic
//! [`crate::ast::TypeExpr`]. Owned values, cheap to clone; nominal types
//! point into the [`super::registry::TypeRegistry`] by name.

use crate::intern::{Interner, Symbol};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim {
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt,
    Float32,
    Float64,
    Bool,
    Char,
    Str,
    Void,
    Never,
}

impl Prim {
    pub fn is_integer(self) -> bool {
        use Prim::*;
        matches!(self, Int | Int8 | Int16 | Int32 | Int64 | UInt)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Prim::Float32 | Prim::Float64)
    }

    pub fn is_numeric(self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Width used by the widening rules. `Int` and `UInt` count as 64 bits.
    pub fn bit_width(self) -> u32 {
        use Prim::*;
        match self {
            Int8 => 8,
            Int16 => 16,
            Int32 | Float32 => 32,
            Int | Int64 | UInt | Float64 => 64,
            _ => 0,
        }
    }

    pub fn name(self) -> &'static str {
        use Prim::*;
        match self {
            Int => "Int",
            Int8 => "Int8",
            Int16 => "Int16",
            Int32 => "Int32",
            Int64 => "Int64",
            UInt => "UInt",
            Float32 => "Float32",
            Float64 => "Float64",
            Bool => "Bool",
            Char => "Char",
            Str => "String",
            Void => "Void",
            Never => "Never",
        }
    }
}

/// Result type of mixed numeric arithmetic: floats absorb integers, and
/// within a kind the larger bit width wins. Ties keep the left operand.
pub fn widen(a: Prim, b: Prim) -> Prim {
    match (a.is_float(), b.is_float()) {
        (true, false) => a,
        (false, true) => b,
        _ => {
            if b.bit_width() > a.bit_width() {
                b
            } else {
                a
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnParam {
    pub name: Symbol,
    pub ty: Ty,
    pub mutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FnTy {
    pub params: Vec<FnParam>,
    pub ret: Ty,
    pub effects: Vec<Symbol>,
    pub capabilities: Vec<Symbol>,
    pub contracts: Vec<Symbol>,
    pub is_pure: bool,
}

impl FnTy {
    pub fn plain(params: Vec<FnParam>, ret: Ty) -> Self {
        FnTy {
            params,
            ret,
            effects: Vec::new(),
            capabilities: Vec::new(),
            contracts: Vec::new(),
            is_pure: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Prim(Prim),
    Struct(Symbol),
    Enum(Symbol),
    Trait(Symbol),
    Effect(Symbol),
    Capability(Symbol),
    Function(Box<FnTy>),
    Array { elem: Box<Ty>, size: Option<usize> },
    Tuple(Vec<Ty>),
    Reference { inner: Box<Ty>, mutable: bool },
    Optional(Box<Ty>),
    Result { ok: Box<Ty>, err: Box<Ty> },
    Generic { base: Box<Ty>, args: Vec<Ty> },
    /// Bound generic parameter.
    Var { name: Symbol, id: u32, bounds: Vec<Symbol> },
    /// Propagates silently through later checks so one error does not
    /// cascade.
    Unknown,
    /// Like `Unknown`, but carries the message that produced it.
    Error(String),
}

impl Ty {
    pub const VOID: Ty = Ty::Prim(Prim::Void);
    pub const BOOL: Ty = Ty::Prim(Prim::Bool);
    pub const INT: Ty = Ty::Prim(Prim::Int);

    pub fn prim(&self) -> Option<Prim> {
        match self {
            Ty::Prim(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Ty::Unknown | Ty::Error(_))
    }

    pub fn is_numeric(&self) -> bool {
        self.prim().map(Prim::is_numeric).unwrap_or(false)
    }

    pub fn is_integer(&self) -> bool {
        self.prim().map(Prim::is_integer).unwrap_or(false)
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Ty::Prim(Prim::Bool))
    }

    /// Strip reference layers; member access auto-derefs.
    pub fn deref_target(&self) -> &Ty {
        match self {
            Ty::Reference { inner, .. } => inner.deref_target(),
            other => other,
        }
    }

    pub fn display(&self, interner: &Interner) -> String {
        match self {
            Ty::Prim(p) => p.name().to_string(),
            Ty::Struct(name) | Ty::Enum(name) | Ty::Trait(name) => {
                interner.resolve(*name).to_string()
            }
            Ty::Effect(name) => format!("effect {}", interner.resolve(*name)),
            Ty::Capability(name) => format!("capability {}", interner.resolve(*name)),
            Ty::Function(f) => {
                let params: Vec<String> = f.params.iter().map(|p| p.ty.display(interner)).collect();
                format!("fn({}) -> {}", params.join(", "), f.ret.display(interner))
            }
            Ty::Array { elem, size: Some(n) } => {
                format!("[{}; {}]", elem.display(interner), n)
            }
            Ty::Array { elem, size: None } => format!("[{}]", elem.display(interner)),
            Ty::Tuple(items) => {
                let items: Vec<String> = items.iter().map(|t| t.display(interner)).collect();
                format!("({})", items.join(", "))
            }
            Ty::Reference { inner, mutable: true } => format!("&mut {}", inner.display(interner)),
            Ty::Reference { inner, mutable: false } => format!("&{}", inner.display(interner)),
            Ty::Optional(inner) => format!("{}?", inner.display(interner)),
            Ty::Result { ok, err } => {
                format!("Result<{}, {}>", ok.display(interner), err.display(interner))
            }
            Ty::Generic { base, args } => {
                let args: Vec<String> = args.iter().map(|t| t.display(interner)).collect();
                format!("{}<{}>", base.display(interner), args.join(", "))
            }
            Ty::Var { name, .. } => interner.resolve(*name).to_string(),
            Ty::Unknown => "_".to_string(),
            Ty::Error(_) => "<error>".to_string(),
        }
    }
}

/// Directed assignability: may a value of `from` be supplied where `to` is
/// expected? Not symmetric.
pub fn is_assignable(from: &Ty, to: &Ty) -> bool {
    // Sentinels accept in both directions so one failure does not cascade.
    if from.is_unknown() || to.is_unknown() {
        return true;
    }
    // Never flows into anything.
    if matches!(from, Ty::Prim(Prim::Never)) {
        return true;
    }
    if from == to {
        return true;
    }
    match (from, to) {
        // Plain values lift into optionals.
        (_, Ty::Optional(inner)) => is_assignable(from, inner),
        (Ty::Reference { inner: fi, mutable: fm }, Ty::Reference { inner: ti, mutable: tm }) => {
            // &mut T coerces to &T, never the reverse.
            fi == ti && (fm == tm || (*fm && !*tm))
        }
        (Ty::Prim(f), Ty::Prim(t)) => {
            if f.is_integer() && t.is_integer() {
                t.bit_width() >= f.bit_width()
            } else if f.is_float() && t.is_float() {
                t.bit_width() >= f.bit_width()
            } else {
                // Integers always widen into floats.
                f.is_integer() && t.is_float()
            }
        }
        (Ty::Array { elem: fe, size: fs }, Ty::Array { elem: te, size: ts }) => {
            let size_ok = match (fs, ts) {
                (_, None) => true,
                (Some(a), Some(b)) => a == b,
                (None, Some(_)) => false,
            };
            size_ok && is_assignable(fe, te)
        }
        (Ty::Tuple(fs), Ty::Tuple(ts)) => {
            fs.len() == ts.len() && fs.iter().zip(ts).all(|(f, t)| is_assignable(f, t))
        }
        (Ty::Result { ok: fo, err: fe }, Ty::Result { ok: to, err: te }) => {
            is_assignable(fo, to) && is_assignable(fe, te)
        }
        (Ty::Optional(fi), Ty::Optional(ti)) => is_assignable(fi, ti),
        (Ty::Generic { base: fb, args: fa }, Ty::Generic { base: tb, args: ta }) => {
            fb == tb && fa.len() == ta.len() && fa.iter().zip(ta).all(|(f, t)| is_assignable(f, t))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widening_prefers_floats() {
        assert_eq!(widen(Prim::Int, Prim::Float64), Prim::Float64);
        assert_eq!(widen(Prim::Float32, Prim::Int64), Prim::Float32);
        assert_eq!(widen(Prim::Float32, Prim::Float64), Prim::Float64);
    }

    #[test]
    fn widening_picks_larger_integer() {
        assert_eq!(widen(Prim::Int8, Prim::Int32), Prim::Int32);
        assert_eq!(widen(Prim::Int32, Prim::Int8), Prim::Int32);
        // Int counts as 64-bit.
        assert_eq!(widen(Prim::Int32, Prim::Int), Prim::Int);
    }

    #[test]
    fn never_assigns_to_anything() {
        assert!(is_assignable(&Ty::Prim(Prim::Never), &Ty::BOOL));
        assert!(is_assignable(&Ty::Prim(Prim::Never), &Ty::Struct(Symbol::EMPTY)));
    }

    #[test]
    fn anything_assigns_to_unknown() {
        assert!(is_assignable(&Ty::BOOL, &Ty::Unknown));
        assert!(is_assignable(&Ty::Unknown, &Ty::BOOL));
    }

    #[test]
    fn plain_lifts_into_optional() {
        let int_opt = Ty::Optional(Box::new(Ty::INT));
        assert!(is_assignable(&Ty::INT, &int_opt));
        assert!(!is_assignable(&int_opt, &Ty::INT));
    }

    #[test]
    fn mutable_reference_coerces_to_shared() {
        let shared = Ty::Reference { inner: Box::new(Ty::INT), mutable: false };
        let unique = Ty::Reference { inner: Box::new(Ty::INT), mutable: true };
        assert!(is_assignable(&unique, &shared));
        assert!(!is_assignable(&shared, &unique));
    }

    #[test]
    fn numeric_widening_is_directed() {
        assert!(is_assignable(&Ty::Prim(Prim::Int8), &Ty::Prim(Prim::Int32)));
        assert!(!is_assignable(&Ty::Prim(Prim::Int32), &Ty::Prim(Prim::Int8)));
        assert!(is_assignable(&Ty::Prim(Prim::Int), &Ty::Prim(Prim::Float64)));
        assert!(!is_assignable(&Ty::Prim(Prim::Float64), &Ty::Prim(Prim::Int)));
    }

    #[test]
    fn fixed_arrays_fit_unsized_slots() {
        let fixed = Ty::Array { elem: Box::new(Ty::INT), size: Some(3) };
        let open = Ty::Array { elem: Box::new(Ty::INT), size: None };
        assert!(is_assignable(&fixed, &open));
        assert!(!is_assignable(&open, &fixed));
    }
}
