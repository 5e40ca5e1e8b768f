//! Pipeline-stage error type (spec.md §7 — the driver is where every stage's
//! distinct error type converges into one value the CLI can report).

use thiserror::Error;

/// One error per pipeline stage (§2's six-step pipeline), so a caller can
/// tell which stage rejected the program without downcasting.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("type checking failed: {0}")]
    Check(#[source] etch_check::CheckError),

    #[error("compile-time evaluation failed: {0}")]
    Comptime(#[source] etch_comptime::ComptimeError),

    #[error("re-checking comptime-folded code failed: {0}")]
    Recheck(#[source] etch_check::CheckError),

    #[error("safety proof failed: {0}")]
    Prove(#[source] etch_prove::ProveError),

    #[error("bytecode lowering failed: {0}")]
    Compile(#[source] etch_compiler::CompileError),

    #[error("bytecode cache error: {0}")]
    Cache(#[source] etch_cache::CacheError),

    #[error("execution failed: {0}")]
    Vm(#[source] etch_vm::VmError),
}

pub type DriverResult<T> = Result<T, DriverError>;
