//! Wires the six pipeline stages (spec.md §2) into one call, grounded on the
//! donor runtime's `compile_source` (`raya-runtime/src/compile.rs`): a
//! linear sequence of stages, each mapping its own error type into the
//! caller-facing one, with a cache check spliced in before the expensive
//! lowering step.

use std::fs;

use etch_ast::Program;
use etch_vm::{Value, Vm};

use crate::config::Config;
use crate::error::{DriverError, DriverResult};

/// What a pipeline run produced, beyond the VM's return value — `verbose`
/// callers print the intermediate lines as they happen, so this only
/// carries what's needed for a one-line post-run summary.
#[derive(Debug)]
pub struct PipelineOutput {
    pub value: Value,
    pub used_cache: bool,
}

/// Run `program` (already parsed and monomorphized-or-not — `check_program`
/// does the instantiation) through typecheck → comptime fold → re-typecheck
/// → prove → lower → cache-or-compile → execute, per spec.md §2.
///
/// `program` is consumed because the type checker and comptime folder both
/// mutate a `Program` in place (spec.md §3 "lifecycle") rather than produce
/// a new tree at each stage.
pub fn run(mut program: Program, config: &Config) -> DriverResult<PipelineOutput> {
    verbose(config, "checking types");
    etch_check::check_program(&mut program).map_err(DriverError::Check)?;

    verbose(config, "folding comptime expressions");
    etch_comptime::fold_program(&mut program).map_err(DriverError::Comptime)?;

    verbose(config, "re-checking comptime-folded code");
    etch_check::check_program(&mut program).map_err(DriverError::Recheck)?;

    verbose(config, "proving safety");
    etch_prove::prove_program(&program).map_err(DriverError::Prove)?;

    let debug_info = config.mode.emits_debug_info();
    let source_bytes = fs::read(&config.source_file).unwrap_or_default();
    let source_hash = etch_cache::hash_source(&source_bytes);

    let (module, used_cache) =
        match etch_cache::load_if_fresh(&config.source_file, &source_hash, debug_info).map_err(DriverError::Cache)? {
            Some(cached) => {
                verbose(config, "using cached bytecode");
                (cached, true)
            }
            None => {
                verbose(config, "lowering to bytecode");
                let module = etch_compiler::compile(&program, config.source_file.to_string_lossy(), source_hash, debug_info)
                    .map_err(DriverError::Compile)?;
                if !source_bytes.is_empty() {
                    etch_cache::store(&config.source_file, &module).map_err(DriverError::Cache)?;
                }
                (module, false)
            }
        };

    verbose(config, "executing");
    let mut vm = Vm::new();
    let value = vm.execute(&module).map_err(DriverError::Vm)?;

    Ok(PipelineOutput { value, used_cache })
}

fn verbose(config: &Config, message: &str) {
    if config.verbose {
        eprintln!("etch: {message}");
    }
}
