//! Typing rules for Etch's builtin call surface (spec.md §6 "Builtins").
//!
//! These names are recognized before ordinary overload resolution and never
//! appear in [`etch_ast::Program::funs`] — there is no declaration to look
//! up, just a fixed arity/type contract checked here. `inject` is listed
//! even though it only ever legally appears inside a `comptime` block; the
//! comptime folder re-typechecks its arguments itself, but giving it a rule
//! here lets a stray top-level `inject(...)` call still fail with a normal
//! type error instead of falling through to "undeclared function".

use etch_ast::{Pos, Type};

use crate::error::{CheckError, CheckResult};

pub const BUILTIN_NAMES: &[&str] = &[
    "print",
    "println",
    "readFile",
    "rand",
    "seed",
    "new",
    "deref",
    "inject",
    "toString",
    "parseInt",
    "assumeNonZero",
    "assumeNonNil",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTIN_NAMES.contains(&name)
}

pub fn check_builtin_call(name: &str, args: &[Type], pos: &Pos) -> CheckResult<Type> {
    match name {
        "print" | "println" => {
            expect_arity(name, args, 1, pos)?;
            Ok(Type::Void)
        }
        "readFile" => {
            expect_arity(name, args, 1, pos)?;
            expect_type(&args[0], &Type::String, pos)?;
            Ok(Type::String)
        }
        "rand" => {
            if args.len() != 1 && args.len() != 2 {
                return Err(CheckError::NoMatchingOverload {
                    name: name.to_string(),
                    arg_count: args.len(),
                    pos: pos.clone(),
                });
            }
            for a in args {
                expect_type(a, &Type::Int, pos)?;
            }
            Ok(Type::Int)
        }
        "seed" => {
            expect_arity(name, args, 1, pos)?;
            expect_type(&args[0], &Type::Int, pos)?;
            Ok(Type::Void)
        }
        "new" => {
            expect_arity(name, args, 1, pos)?;
            Ok(Type::reference(args[0].clone()))
        }
        "deref" => {
            expect_arity(name, args, 1, pos)?;
            args[0].deref_type().cloned().ok_or_else(|| CheckError::NotDerefable {
                actual: args[0].to_string(),
                pos: pos.clone(),
            })
        }
        "inject" => {
            expect_arity(name, args, 3, pos)?;
            expect_type(&args[0], &Type::String, pos)?;
            expect_type(&args[1], &Type::String, pos)?;
            Ok(Type::Void)
        }
        "toString" => {
            expect_arity(name, args, 1, pos)?;
            expect_type(&args[0], &Type::Int, pos)?;
            Ok(Type::String)
        }
        "parseInt" => {
            expect_arity(name, args, 1, pos)?;
            expect_type(&args[0], &Type::String, pos)?;
            Ok(Type::Int)
        }
        "assumeNonZero" | "assumeNonNil" => {
            expect_arity(name, args, 1, pos)?;
            Ok(args[0].clone())
        }
        _ => unreachable!("is_builtin gates this match"),
    }
}

fn expect_arity(name: &str, args: &[Type], n: usize, pos: &Pos) -> CheckResult<()> {
    if args.len() == n {
        Ok(())
    } else {
        Err(CheckError::NoMatchingOverload {
            name: name.to_string(),
            arg_count: args.len(),
            pos: pos.clone(),
        })
    }
}

fn expect_type(actual: &Type, expected: &Type, pos: &Pos) -> CheckResult<()> {
    if actual == expected {
        Ok(())
    } else {
        Err(CheckError::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
            pos: pos.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rand_accepts_one_or_two_int_args() {
        let pos = Pos::synthetic();
        assert_eq!(check_builtin_call("rand", &[Type::Int], &pos).unwrap(), Type::Int);
        assert_eq!(
            check_builtin_call("rand", &[Type::Int, Type::Int], &pos).unwrap(),
            Type::Int
        );
        assert!(check_builtin_call("rand", &[], &pos).is_err());
    }

    #[test]
    fn new_wraps_argument_type_in_a_ref() {
        let pos = Pos::synthetic();
        assert_eq!(
            check_builtin_call("new", &[Type::Int], &pos).unwrap(),
            Type::reference(Type::Int)
        );
    }

    #[test]
    fn deref_requires_a_ref_argument() {
        let pos = Pos::synthetic();
        assert!(check_builtin_call("deref", &[Type::Int], &pos).is_err());
        assert_eq!(
            check_builtin_call("deref", &[Type::reference(Type::Bool)], &pos).unwrap(),
            Type::Bool
        );
    }

    #[test]
    fn unknown_name_is_not_a_builtin() {
        assert!(!is_builtin("doesNotExist"));
    }
}
