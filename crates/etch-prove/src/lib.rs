//! Abstract-interpretation safety prover for Etch (spec.md §4.4).
//!
//! [`prove_program`] walks a checked, comptime-folded [`etch_ast::Program`]
//! and proves (or refutes) six safety categories without running it:
//! integer overflow (P1), division by a possible zero (P2), dereference of
//! a possible `nil` (P3), an index/slice bound that could fall outside an
//! array (P4), use of a possibly-uninitialized variable (P5), and
//! statements that can never execute (P6). The first violation found
//! aborts the whole program's analysis (spec §7, E-Prover) — there is no
//! error-accumulation mode, unlike the type checker's diagnostics.

mod error;
mod eval;
mod info;
mod interp;
mod purity;

pub use error::{ProveError, ProveErrorKind, ProveResult};
pub use eval::eval_pure_call;
pub use info::Info;
pub use interp::prove_program;
pub use purity::{is_pure_function, IMPURE_BUILTINS};
