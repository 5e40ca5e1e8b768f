//! Bytecode lowering for Etch (spec.md §4.5).
//!
//! [`compile`] takes a fully checked, comptime-folded, and proved
//! [`etch_ast::Program`] and lowers every monomorphic function instance into
//! the flat instruction stream described by `etch_bytecode::Module`. There
//! is no intermediate representation between the AST and bytecode — each
//! statement/expression lowers directly, with jump targets patched after
//! the fact (see [`emitter::Emitter`]).

mod emitter;
mod error;
mod lower;

pub use error::{CompileError, CompileResult};
pub use lower::compile;
