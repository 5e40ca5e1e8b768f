//! Builds and runs the ephemeral single-function programs the folder needs
//! to evaluate `comptime(e)` and `comptime { stmts }` (spec.md §4.3
//! operations 2-3; §5 "comptime VM re-entrancy" — a fresh, independent
//! `etch_vm::Vm` per run, sharing nothing with the surrounding pipeline but
//! a shallow copy of the already-instantiated function table).

use etch_ast::{FunDecl, Param, Pos, Program, Stmt};
use etch_vm::{Value, Vm};

use crate::error::ComptimeError;

/// Compile and run `body` (which must end in a `return`) as the sole entry
/// point of a fresh program whose other functions are a shallow copy of
/// `program`'s already-instantiated ones, giving `comptime` code the same
/// call surface as the surrounding program without ever touching it.
///
/// `etch_vm::Vm::execute` always enters whichever function is named
/// "main", so the synthetic entry borrows that name for the run — shadowing
/// the real `main`, if any, in this throwaway copy of the function table.
///
/// Returns the value produced together with the `Vm` it ran in, so callers
/// needing to read back a heap-allocated result (e.g. an injected array of
/// captured values) can still reach it through [`Vm::heap`].
pub fn run_block(program: &Program, body: Vec<Stmt>, pos: &Pos) -> Result<(Value, Vm), ComptimeError> {
    let mut synthetic = Program::new();
    synthetic.fun_instances = program.fun_instances.clone();
    synthetic.fun_instances.insert(
        "main".to_string(),
        FunDecl {
            name: "main".to_string(),
            typarams: vec![],
            params: Vec::<Param>::new(),
            declared_return: None,
            body,
            is_exported: false,
            is_cffi: false,
            pos: pos.clone(),
        },
    );

    let module = etch_compiler::compile(&synthetic, "<comptime>", [0u8; 32], false)
        .map_err(|e| ComptimeError::Compile(pos.clone(), e))?;

    let mut vm = Vm::new();
    let value = vm
        .execute(&module)
        .map_err(|e| ComptimeError::Vm("comptime evaluation failed", pos.clone(), e))?;
    Ok((value, vm))
}
