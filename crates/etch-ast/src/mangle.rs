//! Deterministic name mangling (spec.md §4.1, invariant I3).

use crate::program::FunDecl;
use crate::types::Type;

/// `generateOverloadSignature`: a deterministic mangled name built from a
/// function's name and the ordered resolved types of its parameters —
/// never from parameter names. Used to disambiguate overloads of the same
/// template name during call resolution (spec.md §4.2 step 2).
pub fn generate_overload_signature(decl: &FunDecl) -> String {
    let params: Vec<String> = decl.params.iter().map(|p| p.ty.mangle_fragment()).collect();
    format!("{}({})", decl.name, params.join(","))
}

/// The monomorphization key (`funInstances` key, invariant I3): depends
/// only on the template name and the ordered sequence of resolved type
/// *arguments* (not parameter types), e.g. `add<int>` / `add<float>` for
/// `fn add[T: Addable](a: T, b: T) -> T` instantiated at `int`/`float`.
///
/// Injective over distinct resolved signatures (distinct type-argument
/// tuples always produce distinct strings, since `Type::mangle_fragment`
/// never emits the separators `<`, `>`, or `,` on its own) and stable
/// across runs (no hashing, no pointer/address data).
pub fn mangle_instance_key(template_name: &str, type_args: &[Type]) -> String {
    if type_args.is_empty() {
        return template_name.to_string();
    }
    let args: Vec<String> = type_args.iter().map(Type::mangle_fragment).collect();
    format!("{}<{}>", template_name, args.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pos::Pos;
    use crate::program::Param;

    fn decl(name: &str, params: Vec<Type>) -> FunDecl {
        FunDecl {
            name: name.to_string(),
            typarams: vec![],
            params: params
                .into_iter()
                .enumerate()
                .map(|(i, ty)| Param {
                    name: format!("p{i}"),
                    ty,
                    default_value: None,
                })
                .collect(),
            declared_return: Some(Type::Int),
            body: vec![],
            is_exported: false,
            is_cffi: false,
            pos: Pos::synthetic(),
        }
    }

    #[test]
    fn overload_signature_ignores_parameter_names() {
        let a = decl("f", vec![Type::Int, Type::Float]);
        let mut b = decl("f", vec![Type::Int, Type::Float]);
        b.params[0].name = "different_name".to_string();
        assert_eq!(
            generate_overload_signature(&a),
            generate_overload_signature(&b)
        );
    }

    #[test]
    fn overload_signature_distinguishes_param_types() {
        let a = decl("f", vec![Type::Int]);
        let b = decl("f", vec![Type::Float]);
        assert_ne!(generate_overload_signature(&a), generate_overload_signature(&b));
    }

    #[test]
    fn instance_key_matches_spec_example() {
        assert_eq!(mangle_instance_key("add", &[Type::Int]), "add<int>");
        assert_eq!(mangle_instance_key("add", &[Type::Float]), "add<float>");
        assert_ne!(
            mangle_instance_key("add", &[Type::Int]),
            mangle_instance_key("add", &[Type::Float])
        );
    }

    #[test]
    fn instance_key_without_type_args_is_bare_name() {
        assert_eq!(mangle_instance_key("main", &[]), "main");
    }
}
