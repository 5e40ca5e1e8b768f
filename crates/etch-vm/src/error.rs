//! VM-time error kind (spec.md §7 "E-Runtime").

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VmError {
    #[error("operand stack overflow")]
    StackOverflow,
    #[error("operand stack underflow")]
    StackUnderflow,
    #[error("call stack overflow (recursion too deep)")]
    CallStackOverflow,
    #[error("no active call frame")]
    NoActiveFrame,
    #[error("invalid opcode byte 0x{0:02x}")]
    InvalidOpcode(u8),
    #[error("instruction pointer {0} out of bounds")]
    InvalidProgramCounter(usize),
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),
    #[error("call to undefined function '{0}'")]
    UndefinedFunction(String),
    #[error("function '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("type error: {0}")]
    TypeError(String),
    #[error("division by zero")]
    DivideByZero,
    #[error("array index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },
    #[error("dereferenced a dangling or invalid reference")]
    DanglingReference,
    #[error("io error: {0}")]
    Io(String),
    #[error("no function named 'main'")]
    MissingEntryPoint,
}

pub type VmResult<T> = Result<T, VmError>;
