//! Errors the comptime folder can raise (spec.md §4.3).
//!
//! Every variant here is about a `comptime` construct doing something the
//! language doesn't allow (an `inject` with a non-literal name, a folded
//! value that can't be re-embedded as a literal, ...); unlike the prover or
//! checker, "cannot evaluate" is *not* an error here — that path just
//! leaves the original expression untouched (spec.md §5 "local recovery").

use etch_ast::Pos;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ComptimeError {
    #[error("{0} at {1}: {2}")]
    Vm(&'static str, Pos, etch_vm::VmError),

    #[error("failed to compile a synthetic comptime program at {0}: {1}")]
    Compile(Pos, etch_compiler::CompileError),

    #[error("inject() at {0} requires its name and type arguments to be string literals")]
    NonLiteralInjectArgs(Pos),

    #[error("inject() at {0} names an unknown type '{1}'")]
    UnknownInjectedType(Pos, String),

    #[error("comptime value at {0} cannot be re-embedded as a literal (it is a {1})")]
    UnrepresentableValue(Pos, &'static str),
}

pub type ComptimeResult<T> = Result<T, ComptimeError>;
