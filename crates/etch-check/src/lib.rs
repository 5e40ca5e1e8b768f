//! Type checking and generic monomorphization for Etch (spec.md §4.2).
//!
//! [`check_program`] is the single entry point: given a parsed
//! [`etch_ast::Program`], it typechecks every declaration, fills in each
//! expression's inferred [`etch_ast::Type`], monomorphizes every generic
//! function actually instantiated at a call site, and rewrites call
//! expressions to reference the resulting mangled instance keys. It either
//! succeeds with a fully-typed program or fails fast on the first
//! [`CheckError`] encountered — there is no partial result.

mod builtin;
mod checker;
mod error;
mod scope;
mod subst;
mod unify;

pub use checker::check_program;
pub use error::{CheckError, CheckResult};
