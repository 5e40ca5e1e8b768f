//! Safety-violation diagnostics (spec.md §4.4, §7 E-Prover).
//!
//! Each variant corresponds to one of the six provable safety categories
//! (P1-P6). Unlike `etch_check::CheckError`, the prover never accumulates —
//! the first violation found aborts analysis of the whole program.

use etch_ast::Pos;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProveErrorKind {
    /// P1: an arithmetic operation's result cannot be shown to fit in `i64`.
    Overflow,
    /// P2: a `/` or `%` right-hand side could be zero.
    DivideByZero,
    /// P3: a `deref`/`Deref` operand could be `nil`.
    NilDeref,
    /// P4: an index or slice bound could fall outside the array.
    OutOfBounds,
    /// P5: a variable is read before every path to it assigns a value.
    UninitializedUse,
    /// P6: a statement can never execute.
    UnreachableCode,
}

#[derive(Debug, Error, Clone, PartialEq)]
#[error("{kind:?} at {pos}: {message}")]
pub struct ProveError {
    pub kind: ProveErrorKind,
    pub pos: Pos,
    pub message: String,
}

pub type ProveResult<T> = Result<T, ProveError>;
