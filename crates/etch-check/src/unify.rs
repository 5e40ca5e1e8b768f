//! Left-to-right structural unification used by call resolution to bind a
//! generic function's type parameters from its argument types (spec.md
//! §4.2, call-resolution step 3).

use etch_ast::Type;
use rustc_hash::{FxHashMap, FxHashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum UnifyError {
    /// The same type parameter was bound to two different concrete types
    /// by two different arguments.
    Conflict {
        name: String,
        first: Type,
        second: Type,
    },
    /// The argument's shape doesn't match the parameter's shape at all
    /// (e.g. an `array[T]` parameter called with a `string` argument).
    Mismatch,
}

/// Unifies a declared parameter type (which may mention names in
/// `typarams`) against a concrete argument type, recording bindings.
/// Recurses structurally into composite types; a `Generic` leaf is bound
/// (or checked against its existing binding) the first time it's
/// encountered, left to right.
pub fn unify(
    param: &Type,
    arg: &Type,
    typarams: &FxHashSet<String>,
    bindings: &mut FxHashMap<String, Type>,
) -> Result<(), UnifyError> {
    if let Type::Generic(name) = param {
        if typarams.contains(name) {
            return match bindings.get(name) {
                Some(existing) if existing == arg => Ok(()),
                Some(existing) => Err(UnifyError::Conflict {
                    name: name.clone(),
                    first: existing.clone(),
                    second: arg.clone(),
                }),
                None => {
                    bindings.insert(name.clone(), arg.clone());
                    Ok(())
                }
            };
        }
    }

    match (param, arg) {
        (Type::Array(p), Type::Array(a))
        | (Type::Ref(p), Type::Ref(a))
        | (Type::Weak(p), Type::Weak(a))
        | (Type::Option(p), Type::Option(a))
        | (Type::Channel(p), Type::Channel(a)) => unify(p, a, typarams, bindings),

        (Type::Result(pa, pb), Type::Result(aa, ab)) => {
            unify(pa, aa, typarams, bindings)?;
            unify(pb, ab, typarams, bindings)
        }

        (Type::Tuple(ps), Type::Tuple(as_)) => {
            if ps.len() != as_.len() {
                return Err(UnifyError::Mismatch);
            }
            for (p, a) in ps.iter().zip(as_) {
                unify(p, a, typarams, bindings)?;
            }
            Ok(())
        }

        (Type::Function(pp, pr), Type::Function(ap, ar)) => {
            if pp.len() != ap.len() {
                return Err(UnifyError::Mismatch);
            }
            for (p, a) in pp.iter().zip(ap) {
                unify(p, a, typarams, bindings)?;
            }
            unify(pr, ar, typarams, bindings)
        }

        (p, a) if p == a => Ok(()),
        _ => Err(UnifyError::Mismatch),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typarams(names: &[&str]) -> FxHashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn binds_a_bare_generic_leaf() {
        let mut bindings = FxHashMap::default();
        unify(&Type::generic("T"), &Type::Int, &typarams(&["T"]), &mut bindings).unwrap();
        assert_eq!(bindings.get("T"), Some(&Type::Int));
    }

    #[test]
    fn repeated_use_of_same_param_must_agree() {
        let mut bindings = FxHashMap::default();
        unify(&Type::generic("T"), &Type::Int, &typarams(&["T"]), &mut bindings).unwrap();
        let err = unify(&Type::generic("T"), &Type::Float, &typarams(&["T"]), &mut bindings)
            .unwrap_err();
        assert!(matches!(err, UnifyError::Conflict { .. }));
    }

    #[test]
    fn recurses_into_array_element_type() {
        let mut bindings = FxHashMap::default();
        unify(
            &Type::array(Type::generic("T")),
            &Type::array(Type::Float),
            &typarams(&["T"]),
            &mut bindings,
        )
        .unwrap();
        assert_eq!(bindings.get("T"), Some(&Type::Float));
    }

    #[test]
    fn mismatched_shapes_fail() {
        let mut bindings = FxHashMap::default();
        let err = unify(
            &Type::array(Type::generic("T")),
            &Type::String,
            &typarams(&["T"]),
            &mut bindings,
        )
        .unwrap_err();
        assert_eq!(err, UnifyError::Mismatch);
    }

    #[test]
    fn non_generic_params_require_exact_match() {
        let mut bindings = FxHashMap::default();
        assert!(unify(&Type::Int, &Type::Int, &typarams(&[]), &mut bindings).is_ok());
        assert!(unify(&Type::Int, &Type::Float, &typarams(&[]), &mut bindings).is_err());
    }
}
