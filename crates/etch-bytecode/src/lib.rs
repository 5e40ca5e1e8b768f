//! Bytecode instruction set, constant pool, and the on-disk cache encoding
//! shared by the compiler, the VM, and the disk cache (spec.md §4.5, §6).

pub mod encoder;
pub mod instr;
pub mod module;
pub mod opcode;

pub use encoder::{DecodeError, Reader, Writer};
pub use instr::{DebugInfo, Instr};
pub use module::{
    ConstantPool, Function, GlobalEntry, GlobalValue, Module, ENTRY_FUNCTION, MAGIC,
    SOURCE_HASH_LEN, VERSION,
};
pub use opcode::{type_code, Opcode};
