//! The `Type` algebraic data type (spec.md §3, §4.1).
//!
//! `Type` is a closed, tagged variant family. Composite kinds box their
//! `inner` type; `Generic` carries a name that is resolved against a
//! substitution map by [`Type::resolve`]; `UserDefined`/`Enum` carry a name
//! resolvable against `Program::types`.

use std::fmt;

use rustc_hash::FxHashMap;

/// The marker name used for a variable whose type is deferred until after
/// the comptime folder runs (spec.md §4.2, "Variable" rule).
pub const COMPTIME_INFER: &str = "__comptime_infer__";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Void,
    Bool,
    Int,
    Float,
    String,
    Char,
    Array(Box<Type>),
    Ref(Box<Type>),
    Weak(Box<Type>),
    Generic(String),
    Option(Box<Type>),
    Result(Box<Type>, Box<Type>),
    UserDefined(String),
    Distinct(String, Box<Type>),
    Inferred,
    Tuple(Vec<Type>),
    Channel(Box<Type>),
    Enum(String),
    Function(Vec<Type>, Box<Type>),
    TypeDesc(Box<Type>),
}

impl Type {
    pub fn int() -> Type {
        Type::Int
    }
    pub fn float() -> Type {
        Type::Float
    }
    pub fn bool() -> Type {
        Type::Bool
    }
    pub fn string() -> Type {
        Type::String
    }
    pub fn char() -> Type {
        Type::Char
    }
    pub fn void() -> Type {
        Type::Void
    }
    pub fn array(inner: Type) -> Type {
        Type::Array(Box::new(inner))
    }
    pub fn reference(inner: Type) -> Type {
        Type::Ref(Box::new(inner))
    }
    /// `nil` resolves to `ref[void]` (spec.md §4.2).
    pub fn nil() -> Type {
        Type::Ref(Box::new(Type::Void))
    }
    pub fn generic(name: impl Into<String>) -> Type {
        Type::Generic(name.into())
    }
    pub fn user_defined(name: impl Into<String>) -> Type {
        Type::UserDefined(name.into())
    }

    pub fn is_nil_type(&self) -> bool {
        matches!(self, Type::Ref(inner) if **inner == Type::Void)
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Type::Ref(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_generic(&self) -> bool {
        matches!(self, Type::Generic(_))
    }

    /// True if this type (recursively) still contains a `generic` node —
    /// invariant I1 requires every reachable expression type to be free of
    /// these after typechecking.
    pub fn contains_generic(&self) -> bool {
        match self {
            Type::Generic(_) => true,
            Type::Array(t) | Type::Ref(t) | Type::Weak(t) | Type::Option(t) | Type::Channel(t) => {
                t.contains_generic()
            }
            Type::Distinct(_, t) | Type::TypeDesc(t) => t.contains_generic(),
            Type::Result(a, b) => a.contains_generic() || b.contains_generic(),
            Type::Tuple(ts) => ts.iter().any(Type::contains_generic),
            Type::Function(params, ret) => {
                params.iter().any(Type::contains_generic) || ret.contains_generic()
            }
            _ => false,
        }
    }

    pub fn element_type(&self) -> Option<&Type> {
        match self {
            Type::Array(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn deref_type(&self) -> Option<&Type> {
        match self {
            Type::Ref(inner) => Some(inner),
            _ => None,
        }
    }

    /// Structural equality ignoring source positions. `Type` derives
    /// `PartialEq` directly since it carries no position data, so this is
    /// just `==`; kept as a named method because callers read better
    /// calling `a.structurally_eq(&b)` at type-checking call sites.
    pub fn structurally_eq(&self, other: &Type) -> bool {
        self == other
    }

    /// Substitute every `Generic(name)` leaf found in `subst`, recursively.
    /// Leaves types whose generic name is absent from `subst` unchanged
    /// (used when only some of a function's type parameters have been
    /// bound yet).
    pub fn resolve(&self, subst: &FxHashMap<String, Type>) -> Type {
        match self {
            Type::Generic(name) => subst.get(name).cloned().unwrap_or_else(|| self.clone()),
            Type::Array(t) => Type::Array(Box::new(t.resolve(subst))),
            Type::Ref(t) => Type::Ref(Box::new(t.resolve(subst))),
            Type::Weak(t) => Type::Weak(Box::new(t.resolve(subst))),
            Type::Option(t) => Type::Option(Box::new(t.resolve(subst))),
            Type::Channel(t) => Type::Channel(Box::new(t.resolve(subst))),
            Type::Result(a, b) => Type::Result(Box::new(a.resolve(subst)), Box::new(b.resolve(subst))),
            Type::Distinct(name, t) => Type::Distinct(name.clone(), Box::new(t.resolve(subst))),
            Type::TypeDesc(t) => Type::TypeDesc(Box::new(t.resolve(subst))),
            Type::Tuple(ts) => Type::Tuple(ts.iter().map(|t| t.resolve(subst)).collect()),
            Type::Function(params, ret) => Type::Function(
                params.iter().map(|t| t.resolve(subst)).collect(),
                Box::new(ret.resolve(subst)),
            ),
            other => other.clone(),
        }
    }

    /// Deterministic textual fragment used by name mangling
    /// ([`crate::mangle::generate_overload_signature`]). Must be injective
    /// over distinct resolved types and stable across runs; this is why it
    /// is written by hand rather than derived from `Debug`.
    pub fn mangle_fragment(&self) -> String {
        match self {
            Type::Void => "void".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Int => "int".to_string(),
            Type::Float => "float".to_string(),
            Type::String => "string".to_string(),
            Type::Char => "char".to_string(),
            Type::Array(t) => format!("array[{}]", t.mangle_fragment()),
            Type::Ref(t) => format!("ref[{}]", t.mangle_fragment()),
            Type::Weak(t) => format!("weak[{}]", t.mangle_fragment()),
            Type::Generic(name) => format!("generic:{name}"),
            Type::Option(t) => format!("option[{}]", t.mangle_fragment()),
            Type::Result(a, b) => format!("result[{},{}]", a.mangle_fragment(), b.mangle_fragment()),
            Type::UserDefined(name) => format!("user:{name}"),
            Type::Distinct(name, t) => format!("distinct:{name}[{}]", t.mangle_fragment()),
            Type::Inferred => "inferred".to_string(),
            Type::Tuple(ts) => {
                let parts: Vec<_> = ts.iter().map(Type::mangle_fragment).collect();
                format!("tuple[{}]", parts.join(","))
            }
            Type::Channel(t) => format!("channel[{}]", t.mangle_fragment()),
            Type::Enum(name) => format!("enum:{name}"),
            Type::Function(params, ret) => {
                let parts: Vec<_> = params.iter().map(Type::mangle_fragment).collect();
                format!("fn({})->{}", parts.join(","), ret.mangle_fragment())
            }
            Type::TypeDesc(t) => format!("typedesc[{}]", t.mangle_fragment()),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.mangle_fragment())
    }
}

/// A bounded-parameter constraint ("concept"): a named predicate over
/// types, checked when a generic type-parameter with this bound is
/// instantiated (spec.md §3 "Bounded parameter (concept)").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Concept {
    Addable,
    Divisible,
    Comparable,
    Derefable,
}

impl Concept {
    pub fn by_name(name: &str) -> Option<Concept> {
        match name {
            "Addable" => Some(Concept::Addable),
            "Divisible" => Some(Concept::Divisible),
            "Comparable" => Some(Concept::Comparable),
            "Derefable" => Some(Concept::Derefable),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Concept::Addable => "Addable",
            Concept::Divisible => "Divisible",
            Concept::Comparable => "Comparable",
            Concept::Derefable => "Derefable",
        }
    }

    /// Whether `ty` satisfies this bound.
    pub fn is_satisfied_by(&self, ty: &Type) -> bool {
        match self {
            Concept::Addable | Concept::Divisible | Concept::Comparable => ty.is_numeric(),
            Concept::Derefable => ty.is_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_is_ref_void() {
        assert!(Type::nil().is_nil_type());
        assert!(!Type::reference(Type::Int).is_nil_type());
    }

    #[test]
    fn resolve_substitutes_generic_leaves_only() {
        let mut subst = FxHashMap::default();
        subst.insert("T".to_string(), Type::Int);
        let ty = Type::array(Type::generic("T"));
        assert_eq!(ty.resolve(&subst), Type::array(Type::Int));
    }

    #[test]
    fn resolve_leaves_unbound_generics_untouched() {
        let subst = FxHashMap::default();
        let ty = Type::generic("U");
        assert_eq!(ty.resolve(&subst), Type::generic("U"));
    }

    #[test]
    fn mangle_fragment_is_injective_over_distinct_shapes() {
        let a = Type::array(Type::Int).mangle_fragment();
        let b = Type::array(Type::Float).mangle_fragment();
        let c = Type::reference(Type::Int).mangle_fragment();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn contains_generic_is_recursive() {
        assert!(Type::array(Type::generic("T")).contains_generic());
        assert!(!Type::array(Type::Int).contains_generic());
    }

    #[test]
    fn concept_bounds() {
        assert!(Concept::Addable.is_satisfied_by(&Type::Int));
        assert!(Concept::Addable.is_satisfied_by(&Type::Float));
        assert!(!Concept::Addable.is_satisfied_by(&Type::String));
        assert!(Concept::Derefable.is_satisfied_by(&Type::reference(Type::Int)));
        assert!(!Concept::Derefable.is_satisfied_by(&Type::Int));
    }
}
