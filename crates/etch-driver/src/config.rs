//! Driver configuration (spec.md §6 "Types.nim-style configuration":
//! `{sourceFile, debug|release, verbose}`).

use std::path::PathBuf;

/// `release` turns off debug-info emission and is meant to raise the
/// bytecode compiler's optimization level (spec.md §6) — today that only
/// affects debug-info emission, since the compiler has no optimization
/// passes of its own beyond what the comptime folder and prover already do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Debug,
    Release,
}

impl Mode {
    pub fn emits_debug_info(self) -> bool {
        matches!(self, Mode::Debug)
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub source_file: PathBuf,
    pub mode: Mode,
    pub verbose: bool,
}

impl Config {
    pub fn new(source_file: impl Into<PathBuf>, mode: Mode, verbose: bool) -> Config {
        Config { source_file: source_file.into(), mode, verbose }
    }
}
