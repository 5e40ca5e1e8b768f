//! The compiled bytecode module and its exact on-disk encoding (spec.md §6).
//!
//! Layout (all integers little-endian):
//!
//! ```text
//! magic         4 bytes   "ETCH"
//! version       1 byte    3
//! source_hash   32 bytes  NUL-padded source file hash
//! flags         1 byte    bit 0: debug info present
//! source_file   string    original source path, for diagnostics
//! constants     pool      untyped byte blobs; interpreted by the opcode
//!                         that references them (LoadFloat: 8-byte IEEE-754
//!                         LE bits, LoadString: raw UTF-8 bytes)
//! globals       [string]  declared global names, declaration order
//! global_values [GlobalValue]  name + typed literal payload, one per global
//! functions     [Function]    name, entry instruction index, and (beyond
//!                              what the format fixes) the parameter-name
//!                              list the VM needs to bind call arguments by
//!                              name even in release builds (spec.md §4.6)
//! instructions  [Instr]   single flat stream shared by every function;
//!                         a Function's entry_pc indexes into it and a
//!                         `Jump`/`JumpIfFalse` address is an absolute
//!                         index into the same stream
//! ```
//!
//! A length-prefixed `string` is a u32 byte count followed by UTF-8 bytes. A
//! `[T]` is a u32 element count followed by that many `T`. Execution begins
//! at the function named `main`; its absence is a VM-time error, not a
//! decode-time one.

use crate::encoder::{DecodeError, Reader, Writer};
use crate::instr::{DebugInfo, Instr};
use crate::opcode::Opcode;

pub const MAGIC: [u8; 4] = *b"ETCH";
pub const VERSION: u8 = 3;
pub const SOURCE_HASH_LEN: usize = 32;
pub const ENTRY_FUNCTION: &str = "main";

const FLAG_DEBUG_INFO: u8 = 0b0000_0001;

/// A pooled constant too large to fit inline in an instruction's `int_arg`.
/// Stored on disk as an untyped length-prefixed blob (spec.md §6); which
/// opcode consumes an index determines how the blob is interpreted.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantPool {
    entries: Vec<Vec<u8>>,
}

impl ConstantPool {
    pub fn new() -> ConstantPool {
        ConstantPool { entries: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a float constant, returning its pool index.
    pub fn push_float(&mut self, f: f64) -> u32 {
        self.entries.push(f.to_bits().to_le_bytes().to_vec());
        (self.entries.len() - 1) as u32
    }

    /// Append a string constant, returning its pool index.
    pub fn push_string(&mut self, s: &str) -> u32 {
        self.entries.push(s.as_bytes().to_vec());
        (self.entries.len() - 1) as u32
    }

    pub fn get_float(&self, idx: u32) -> Option<f64> {
        let bytes: [u8; 8] = self.entries.get(idx as usize)?.as_slice().try_into().ok()?;
        Some(f64::from_bits(u64::from_le_bytes(bytes)))
    }

    pub fn get_string(&self, idx: u32) -> Option<String> {
        let bytes = self.entries.get(idx as usize)?;
        String::from_utf8(bytes.clone()).ok()
    }

    fn encode(&self, w: &mut Writer) {
        w.write_u32(self.entries.len() as u32);
        for entry in &self.entries {
            w.write_u32(entry.len() as u32);
            w.write_bytes(entry);
        }
    }

    fn decode(r: &mut Reader) -> Result<ConstantPool, DecodeError> {
        let count = r.read_u32()? as usize;
        let mut entries = Vec::with_capacity(count);
        for _ in 0..count {
            let len = r.read_u32()? as usize;
            entries.push(r.read_bytes(len)?.to_vec());
        }
        Ok(ConstantPool { entries })
    }
}

impl Default for ConstantPool {
    fn default() -> ConstantPool {
        ConstantPool::new()
    }
}

/// A global variable's compile-time literal initializer (spec.md §6
/// "globals values" — globals in the cache format are restricted to these
/// four primitive kinds; no expression evaluation happens at load time).
#[derive(Debug, Clone, PartialEq)]
pub enum GlobalValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

impl GlobalValue {
    fn kind(&self) -> u8 {
        match self {
            GlobalValue::Int(_) => 0,
            GlobalValue::Float(_) => 1,
            GlobalValue::Bool(_) => 2,
            GlobalValue::Str(_) => 3,
        }
    }

    fn encode(&self, w: &mut Writer) {
        w.write_u8(self.kind());
        match self {
            GlobalValue::Int(i) => w.write_i64(*i),
            GlobalValue::Float(f) => w.write_f64(*f),
            GlobalValue::Bool(b) => w.write_u8(*b as u8),
            GlobalValue::Str(s) => w.write_string(s),
        }
    }

    fn decode(r: &mut Reader) -> Result<GlobalValue, DecodeError> {
        Ok(match r.read_u8()? {
            0 => GlobalValue::Int(r.read_i64()?),
            1 => GlobalValue::Float(r.read_f64()?),
            2 => GlobalValue::Bool(r.read_u8()? != 0),
            3 => GlobalValue::Str(r.read_string()?),
            other => return Err(DecodeError::UnknownOpcode(other, 0)),
        })
    }
}

/// One global's name paired with its literal value, as stored in the
/// "globals values" section.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalEntry {
    pub name: String,
    pub value: GlobalValue,
}

/// One compiled function. `entry_pc` indexes into the module's single
/// shared instruction stream. `param_names` and `local_count` are an
/// extension beyond §6's explicit two fields (name, entry index) — the VM
/// binds call arguments to locals by name (spec.md §4.6), so that mapping
/// must survive even when debug info is stripped in release builds.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub entry_pc: u32,
    pub param_names: Vec<String>,
    pub local_count: u32,
}

impl Function {
    fn encode(&self, w: &mut Writer) {
        w.write_string(&self.name);
        w.write_u32(self.entry_pc);
        w.write_u32(self.param_names.len() as u32);
        for p in &self.param_names {
            w.write_string(p);
        }
        w.write_u32(self.local_count);
    }

    fn decode(r: &mut Reader) -> Result<Function, DecodeError> {
        let name = r.read_string()?;
        let entry_pc = r.read_u32()?;
        let param_count = r.read_u32()?;
        let mut param_names = Vec::with_capacity(param_count as usize);
        for _ in 0..param_count {
            param_names.push(r.read_string()?);
        }
        let local_count = r.read_u32()?;
        Ok(Function {
            name,
            entry_pc,
            param_names,
            local_count,
        })
    }
}

fn encode_instrs(instrs: &[Instr], w: &mut Writer, debug_info: bool) {
    w.write_u32(instrs.len() as u32);
    for i in instrs {
        w.write_u8(i.op.to_u8());
        w.write_i64(i.int_arg);
        w.write_string(&i.str_arg);
        if debug_info {
            match &i.debug {
                Some(d) => {
                    w.write_u8(1);
                    w.write_u32(d.line);
                    w.write_u32(d.col);
                }
                None => w.write_u8(0),
            }
        } else {
            w.write_u8(0);
        }
    }
}

fn decode_instrs(r: &mut Reader, debug_info: bool) -> Result<Vec<Instr>, DecodeError> {
    let count = r.read_u32()? as usize;
    let mut out = Vec::with_capacity(count);
    for idx in 0..count {
        let opcode_byte = r.read_u8()?;
        let op = Opcode::from_u8(opcode_byte).ok_or(DecodeError::UnknownOpcode(opcode_byte, idx))?;
        let int_arg = r.read_i64()?;
        let str_arg = r.read_string()?;
        let debug_present = r.read_u8()? != 0;
        let debug = if debug_info && debug_present {
            Some(DebugInfo {
                line: r.read_u32()?,
                col: r.read_u32()?,
            })
        } else {
            None
        };
        out.push(Instr {
            op,
            int_arg,
            str_arg,
            debug,
        });
    }
    Ok(out)
}

/// A fully compiled unit, ready to be written to or read from the on-disk
/// cache (spec.md §6) and handed to the VM (spec.md §4.6).
#[derive(Debug, Clone, PartialEq)]
pub struct Module {
    /// NUL-padded to exactly [`SOURCE_HASH_LEN`] bytes.
    pub source_hash: [u8; SOURCE_HASH_LEN],
    pub debug_info: bool,
    pub source_file: String,
    pub constants: ConstantPool,
    pub globals: Vec<String>,
    pub global_values: Vec<GlobalEntry>,
    pub functions: Vec<Function>,
    pub instructions: Vec<Instr>,
}

impl Module {
    /// The function the VM enters after `global_values` have been bound
    /// (spec.md §4.6 "Entry point").
    pub fn entry_function(&self) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == ENTRY_FUNCTION)
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut w = Writer::new();
        w.write_bytes(&MAGIC);
        w.write_u8(VERSION);
        w.write_bytes(&self.source_hash);
        w.write_u8(if self.debug_info { FLAG_DEBUG_INFO } else { 0 });
        w.write_string(&self.source_file);

        self.constants.encode(&mut w);

        w.write_u32(self.globals.len() as u32);
        for g in &self.globals {
            w.write_string(g);
        }

        w.write_u32(self.global_values.len() as u32);
        for entry in &self.global_values {
            w.write_string(&entry.name);
            entry.value.encode(&mut w);
        }

        w.write_u32(self.functions.len() as u32);
        for f in &self.functions {
            f.encode(&mut w);
        }

        encode_instrs(&self.instructions, &mut w, self.debug_info);

        w.into_bytes()
    }

    pub fn decode(bytes: &[u8]) -> Result<Module, DecodeError> {
        let mut r = Reader::new(bytes);

        let magic_bytes: [u8; 4] = r.read_bytes(4)?.try_into().unwrap();
        if magic_bytes != MAGIC {
            return Err(DecodeError::BadMagic(magic_bytes));
        }
        let version = r.read_u8()?;
        if version != VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }

        let hash_bytes = r.read_bytes(SOURCE_HASH_LEN)?;
        let mut source_hash = [0u8; SOURCE_HASH_LEN];
        source_hash.copy_from_slice(hash_bytes);

        let flags = r.read_u8()?;
        let debug_info = flags & FLAG_DEBUG_INFO != 0;

        let source_file = r.read_string()?;
        let constants = ConstantPool::decode(&mut r)?;

        let global_count = r.read_u32()? as usize;
        let mut globals = Vec::with_capacity(global_count);
        for _ in 0..global_count {
            globals.push(r.read_string()?);
        }

        let value_count = r.read_u32()? as usize;
        let mut global_values = Vec::with_capacity(value_count);
        for _ in 0..value_count {
            let name = r.read_string()?;
            let value = GlobalValue::decode(&mut r)?;
            global_values.push(GlobalEntry { name, value });
        }

        let fn_count = r.read_u32()? as usize;
        let mut functions = Vec::with_capacity(fn_count);
        for _ in 0..fn_count {
            functions.push(Function::decode(&mut r)?);
        }

        let instructions = decode_instrs(&mut r, debug_info)?;

        Ok(Module {
            source_hash,
            debug_info,
            source_file,
            constants,
            globals,
            global_values,
            functions,
            instructions,
        })
    }

    /// `source_hash` with the supplied hash bytes left-aligned and the rest
    /// NUL-padded (spec.md §6 "source-hash").
    pub fn pad_hash(hash: &[u8]) -> [u8; SOURCE_HASH_LEN] {
        let mut out = [0u8; SOURCE_HASH_LEN];
        let n = hash.len().min(SOURCE_HASH_LEN);
        out[..n].copy_from_slice(&hash[..n]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instr::Instr;
    use crate::opcode::Opcode;

    fn sample_module(debug_info: bool) -> Module {
        let mut constants = ConstantPool::new();
        let pi_idx = constants.push_float(3.5);
        let greeting_idx = constants.push_string("hi");

        let mut main_instrs = vec![
            Instr::with_int(Opcode::LoadFloat, pi_idx as i64),
            Instr::with_int(Opcode::LoadString, greeting_idx as i64),
            Instr::new(Opcode::Pop),
            Instr::with_int(Opcode::LoadInt, 41),
            Instr::with_int(Opcode::LoadInt, 1),
            Instr::new(Opcode::Add),
            Instr::new(Opcode::Return),
        ];
        if debug_info {
            main_instrs[0] = main_instrs[0].clone().at(1, 1);
        }

        Module {
            source_hash: Module::pad_hash(b"abc123"),
            debug_info,
            source_file: "main.etch".to_string(),
            constants,
            globals: vec!["counter".to_string()],
            global_values: vec![GlobalEntry {
                name: "counter".to_string(),
                value: GlobalValue::Int(0),
            }],
            functions: vec![Function {
                name: "main".to_string(),
                entry_pc: 0,
                param_names: vec![],
                local_count: 0,
            }],
            instructions: main_instrs,
        }
    }

    #[test]
    fn round_trips_without_debug_info() {
        let module = sample_module(false);
        let bytes = module.encode();
        assert_eq!(Module::decode(&bytes).unwrap(), module);
    }

    #[test]
    fn round_trips_with_debug_info() {
        let module = sample_module(true);
        let bytes = module.encode();
        assert_eq!(Module::decode(&bytes).unwrap(), module);
    }

    #[test]
    fn encode_is_deterministic() {
        let module = sample_module(true);
        assert_eq!(module.encode(), module.encode());
    }

    #[test]
    fn rejects_bad_magic() {
        let bytes = b"XXXX".to_vec();
        assert!(matches!(
            Module::decode(&bytes),
            Err(DecodeError::BadMagic(_))
        ));
    }

    #[test]
    fn rejects_unsupported_version() {
        let mut bytes = sample_module(false).encode();
        bytes[4] = 99;
        assert!(matches!(
            Module::decode(&bytes),
            Err(DecodeError::UnsupportedVersion(99))
        ));
    }

    #[test]
    fn pad_hash_pads_and_truncates() {
        let padded = Module::pad_hash(b"ab");
        assert_eq!(&padded[..2], b"ab");
        assert!(padded[2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn constant_pool_round_trips_float_and_string() {
        let mut pool = ConstantPool::new();
        let f = pool.push_float(2.71828);
        let s = pool.push_string("etch");
        assert_eq!(pool.get_float(f), Some(2.71828));
        assert_eq!(pool.get_string(s), Some("etch".to_string()));
    }

    #[test]
    fn entry_function_finds_main() {
        let module = sample_module(false);
        assert_eq!(module.entry_function().unwrap().name, "main");
    }
}
