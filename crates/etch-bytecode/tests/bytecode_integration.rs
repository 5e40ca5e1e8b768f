//! Round-trip tests for the on-disk cache format (invariants Q5/Q6).

use etch_bytecode::{ConstantPool, DecodeError, Function, GlobalEntry, GlobalValue, Instr, Module, Opcode};

fn fib_module() -> Module {
    let mut constants = ConstantPool::new();
    let one_idx = constants.push_float(1.0);

    let fib_body = vec![
        Instr::with_str(Opcode::LoadVar, "n"),
        Instr::with_int(Opcode::LoadInt, 2),
        Instr::new(Opcode::Lt),
        Instr::with_int(Opcode::JumpIfFalse, 6),
        Instr::with_str(Opcode::LoadVar, "n"),
        Instr::new(Opcode::Return),
        Instr::with_str_and_int(Opcode::Call, "fib<int>", 1),
        Instr::with_int(Opcode::LoadFloat, one_idx as i64),
        Instr::new(Opcode::Pop),
        Instr::new(Opcode::Return),
    ];

    Module {
        source_hash: Module::pad_hash(&[0xAA; 32]),
        debug_info: false,
        source_file: "fib.etch".to_string(),
        constants,
        globals: vec![],
        global_values: vec![],
        functions: vec![Function {
            name: "fib<int>".to_string(),
            entry_pc: 0,
            param_names: vec!["n".to_string()],
            local_count: 1,
        }],
        instructions: fib_body,
    }
}

#[test]
fn decode_of_encode_is_structurally_identical() {
    let module = fib_module();
    let encoded = module.encode();
    let decoded = Module::decode(&encoded).expect("decode should succeed");
    assert_eq!(decoded, module);
}

#[test]
fn re_encoding_an_unchanged_module_is_byte_identical() {
    let module = fib_module();
    let first = module.encode();
    let second = Module::decode(&first).unwrap().encode();
    assert_eq!(first, second);
}

#[test]
fn truncated_file_is_rejected_not_panicked_on() {
    let module = fib_module();
    let mut bytes = module.encode();
    bytes.truncate(bytes.len() / 2);
    assert!(Module::decode(&bytes).is_err());
}

#[test]
fn corrupted_magic_is_rejected() {
    let mut bytes = fib_module().encode();
    bytes[0] = b'X';
    match Module::decode(&bytes) {
        Err(DecodeError::BadMagic(_)) => {}
        other => panic!("expected BadMagic, got {other:?}"),
    }
}

#[test]
fn decode_never_panics_on_corrupted_bytes() {
    let bytes = fib_module().encode();
    for i in 0..bytes.len() {
        let mut corrupted = bytes.clone();
        corrupted[i] = 0xFF;
        let _ = Module::decode(&corrupted);
    }
    assert!(Module::decode(&bytes).is_ok());
}

#[test]
fn entry_function_is_resolved_by_name() {
    let mut module = fib_module();
    module.functions.push(Function {
        name: "main".to_string(),
        entry_pc: 6,
        param_names: vec![],
        local_count: 0,
    });
    assert_eq!(module.entry_function().unwrap().entry_pc, 6);
}

#[test]
fn global_values_round_trip_all_kinds() {
    let mut module = fib_module();
    module.globals = vec![
        "a".to_string(),
        "b".to_string(),
        "c".to_string(),
        "d".to_string(),
    ];
    module.global_values = vec![
        GlobalEntry {
            name: "a".to_string(),
            value: GlobalValue::Int(7),
        },
        GlobalEntry {
            name: "b".to_string(),
            value: GlobalValue::Float(1.5),
        },
        GlobalEntry {
            name: "c".to_string(),
            value: GlobalValue::Bool(true),
        },
        GlobalEntry {
            name: "d".to_string(),
            value: GlobalValue::Str("x".to_string()),
        },
    ];
    let decoded = Module::decode(&module.encode()).unwrap();
    assert_eq!(decoded.global_values, module.global_values);
}
