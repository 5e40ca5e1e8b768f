//! Type-checking error kind (spec.md §7 "E-Typecheck").
//!
//! All type errors are reported with position and terminate typechecking —
//! there is no partial-typed AST handed to later stages, so unlike a
//! language-server checker this is fail-fast rather than error-accumulating.

use etch_ast::Pos;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CheckError {
    #[error("{pos}: undeclared variable '{name}'")]
    UndeclaredVariable { name: String, pos: Pos },

    #[error("{pos}: cannot assign to '{name}', declared with 'let'")]
    AssignToImmutable { name: String, pos: Pos },

    #[error("{pos}: expected type {expected}, found {actual}")]
    TypeMismatch {
        expected: String,
        actual: String,
        pos: Pos,
    },

    #[error("{pos}: operator '{op}' is not defined for {operand}")]
    InvalidUnaryOperand {
        op: &'static str,
        operand: String,
        pos: Pos,
    },

    #[error("{pos}: operator '{op}' is not defined for {lhs} and {rhs}")]
    InvalidBinaryOperands {
        op: &'static str,
        lhs: String,
        rhs: String,
        pos: Pos,
    },

    #[error("{pos}: indexing requires an array, found {actual}")]
    NotIndexable { actual: String, pos: Pos },

    #[error("{pos}: array index must be int, found {actual}")]
    BadIndexType { actual: String, pos: Pos },

    #[error("{pos}: '#' requires an array or string, found {actual}")]
    NotLengthable { actual: String, pos: Pos },

    #[error("{pos}: invalid cast from {from} to {to}")]
    InvalidCast {
        from: String,
        to: String,
        pos: Pos,
    },

    #[error("{pos}: deref requires a ref type, found {actual}")]
    NotDerefable { actual: String, pos: Pos },

    #[error("{pos}: call to undeclared function '{name}'")]
    UndeclaredFunction { name: String, pos: Pos },

    #[error("{pos}: no overload of '{name}' accepts {arg_count} argument(s)")]
    NoMatchingOverload {
        name: String,
        arg_count: usize,
        pos: Pos,
    },

    #[error("{pos}: call to '{name}' is ambiguous among {count} overloads")]
    AmbiguousOverload {
        name: String,
        count: usize,
        pos: Pos,
    },

    #[error("{pos}: conflicting binding for type parameter '{name}': {first} vs {second}")]
    ConflictingTypeBinding {
        name: String,
        first: String,
        second: String,
        pos: Pos,
    },

    #[error("{pos}: type parameter '{name}' bound to {actual}, which does not satisfy concept '{concept}'")]
    ConceptViolation {
        name: String,
        actual: String,
        concept: String,
        pos: Pos,
    },

    #[error("{pos}: unknown concept '{name}'")]
    UnknownConcept { name: String, pos: Pos },

    #[error("{pos}: unresolved type parameter '{name}'")]
    UnresolvedTypeParam { name: String, pos: Pos },

    #[error("{pos}: conflicting inferred return types: {first} vs {second}")]
    ConflictingReturnType {
        first: String,
        second: String,
        pos: Pos,
    },

    #[error("{pos}: 'if'/'while' condition must be bool, found {actual}")]
    NonBoolCondition { actual: String, pos: Pos },

    #[error("{pos}: function must return a value of type {expected}, got none")]
    MissingReturnValue { expected: String, pos: Pos },

    #[error("{pos}: function returns void and must not return a value")]
    UnexpectedReturnValue { pos: Pos },

    #[error("{pos}: unknown type '{name}'")]
    UnknownType { name: String, pos: Pos },

    #[error("{pos}: field '{field}' does not exist on type {ty}")]
    UnknownField { ty: String, field: String, pos: Pos },
}

impl CheckError {
    pub fn pos(&self) -> &Pos {
        match self {
            CheckError::UndeclaredVariable { pos, .. }
            | CheckError::AssignToImmutable { pos, .. }
            | CheckError::TypeMismatch { pos, .. }
            | CheckError::InvalidUnaryOperand { pos, .. }
            | CheckError::InvalidBinaryOperands { pos, .. }
            | CheckError::NotIndexable { pos, .. }
            | CheckError::BadIndexType { pos, .. }
            | CheckError::NotLengthable { pos, .. }
            | CheckError::InvalidCast { pos, .. }
            | CheckError::NotDerefable { pos, .. }
            | CheckError::UndeclaredFunction { pos, .. }
            | CheckError::NoMatchingOverload { pos, .. }
            | CheckError::AmbiguousOverload { pos, .. }
            | CheckError::ConflictingTypeBinding { pos, .. }
            | CheckError::ConceptViolation { pos, .. }
            | CheckError::UnknownConcept { pos, .. }
            | CheckError::UnresolvedTypeParam { pos, .. }
            | CheckError::ConflictingReturnType { pos, .. }
            | CheckError::NonBoolCondition { pos, .. }
            | CheckError::MissingReturnValue { pos, .. }
            | CheckError::UnexpectedReturnValue { pos }
            | CheckError::UnknownType { pos, .. }
            | CheckError::UnknownField { pos, .. } => pos,
        }
    }
}

pub type CheckResult<T> = Result<T, CheckError>;
