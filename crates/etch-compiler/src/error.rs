//! Errors the lowering pass can raise.
//!
//! Every variant here is an internal-invariant violation, not a user-facing
//! diagnostic: by the time a [`etch_ast::Program`] reaches this crate it has
//! already passed `etch_check::check_program` and the comptime fold, so a
//! `CompileError` means an earlier pass let something through it shouldn't
//! have.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CompileError {
    #[error("constant pool overflow: more than u32::MAX entries")]
    TooManyConstants,

    #[error("jump target {0} does not fit in an absolute instruction index")]
    JumpTooLarge(usize),

    #[error("call to undefined function `{0}`")]
    UndefinedFunction(String),

    #[error("call to `{0}` is missing argument {1} and it has no default expression")]
    MissingDefaultArgument(String, usize),

    #[error("global `{0}` has a non-literal initializer; the cache format only stores literal globals")]
    NonLiteralGlobalInitializer(String),

    #[error("a `comptime` node reached the compiler unfolded at {0}")]
    UnfoldedComptime(String),

    #[error("field assignment target `{0}` is not a plain variable; nested field assignment is unsupported")]
    UnsupportedFieldAssignTarget(String),

    #[error("unknown record type `{0}`")]
    UnknownRecordType(String),

    #[error("type `{0}` has no field `{1}`")]
    UnknownRecordField(String, String),
}

pub type CompileResult<T> = Result<T, CompileError>;
