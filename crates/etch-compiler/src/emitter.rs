//! Low-level instruction-stream bookkeeping: the flat `Vec<Instr>` every
//! function is appended to, the constant pool, and the
//! placeholder-then-patch idiom used for `if`/`while`/`break` jumps
//! (spec.md §4.5).

use etch_bytecode::{ConstantPool, Instr, Opcode};

use crate::error::{CompileError, CompileResult};

/// Per-function bookkeeping for `break`: the index of every `Jump`
/// instruction emitted for a `break` inside the loop currently being
/// lowered, patched to the loop's exit once the loop body is done.
pub(crate) struct LoopCtx {
    pub break_patches: Vec<usize>,
}

pub(crate) struct Emitter {
    pub instructions: Vec<Instr>,
    pub constants: ConstantPool,
    temp_counter: u32,
    pub loop_stack: Vec<LoopCtx>,
}

impl Emitter {
    pub fn new() -> Emitter {
        Emitter {
            instructions: Vec::new(),
            constants: ConstantPool::new(),
            temp_counter: 0,
            loop_stack: Vec::new(),
        }
    }

    pub fn here(&self) -> usize {
        self.instructions.len()
    }

    pub fn emit(&mut self, op: Opcode) -> usize {
        self.instructions.push(Instr::new(op));
        self.here() - 1
    }

    pub fn emit_int(&mut self, op: Opcode, int_arg: i64) -> usize {
        self.instructions.push(Instr::with_int(op, int_arg));
        self.here() - 1
    }

    pub fn emit_str(&mut self, op: Opcode, str_arg: impl Into<String>) -> usize {
        self.instructions.push(Instr::with_str(op, str_arg));
        self.here() - 1
    }

    pub fn emit_str_int(&mut self, op: Opcode, str_arg: impl Into<String>, int_arg: i64) -> usize {
        self.instructions.push(Instr::with_str_and_int(op, str_arg, int_arg));
        self.here() - 1
    }

    /// Reserve a `Jump`/`JumpIfFalse` slot to be patched later with
    /// [`Emitter::patch_jump`], once the target address is known.
    pub fn placeholder(&mut self, op: Opcode) -> usize {
        self.emit_int(op, -1)
    }

    /// Patch a placeholder jump to target the current end of the stream.
    pub fn patch_jump(&mut self, idx: usize) -> CompileResult<()> {
        self.patch_jump_to(idx, self.here())
    }

    pub fn patch_jump_to(&mut self, idx: usize, target: usize) -> CompileResult<()> {
        let target: i64 = target.try_into().map_err(|_| CompileError::JumpTooLarge(target))?;
        self.instructions[idx].int_arg = target;
        Ok(())
    }

    /// A fresh compiler-internal local name, distinct from any source
    /// identifier (those never start with `__`).
    pub fn fresh_temp(&mut self) -> String {
        let name = format!("__t{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    pub fn reset_per_function_state(&mut self) {
        self.temp_counter = 0;
        self.loop_stack.clear();
    }
}
