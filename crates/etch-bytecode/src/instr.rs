//! In-memory instruction representation (spec.md §4.5, §6).

use crate::opcode::Opcode;

/// Per-instruction source position retained for diagnostics (panics,
/// provable-safety violation reports). Present whenever the module was
/// compiled with debug info; always absent is also valid (release builds).
#[derive(Debug, Clone, PartialEq)]
pub struct DebugInfo {
    pub line: u32,
    pub col: u32,
}

/// One bytecode instruction. Every opcode uses this same shape — unused
/// operand fields are simply left at their default (`0` / empty string) —
/// which mirrors the uniform per-instruction layout fixed by §6 rather than
/// giving every opcode its own Rust variant with bespoke operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Instr {
    pub op: Opcode,
    pub int_arg: i64,
    pub str_arg: String,
    pub debug: Option<DebugInfo>,
}

impl Instr {
    pub fn new(op: Opcode) -> Instr {
        Instr {
            op,
            int_arg: 0,
            str_arg: String::new(),
            debug: None,
        }
    }

    pub fn with_int(op: Opcode, int_arg: i64) -> Instr {
        Instr {
            op,
            int_arg,
            str_arg: String::new(),
            debug: None,
        }
    }

    pub fn with_str(op: Opcode, str_arg: impl Into<String>) -> Instr {
        Instr {
            op,
            int_arg: 0,
            str_arg: str_arg.into(),
            debug: None,
        }
    }

    pub fn with_str_and_int(op: Opcode, str_arg: impl Into<String>, int_arg: i64) -> Instr {
        Instr {
            op,
            int_arg,
            str_arg: str_arg.into(),
            debug: None,
        }
    }

    pub fn at(mut self, line: u32, col: u32) -> Instr {
        self.debug = Some(DebugInfo { line, col });
        self
    }
}
