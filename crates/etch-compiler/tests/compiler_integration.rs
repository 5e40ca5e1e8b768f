//! Lowering tests built directly against hand-assembled `etch_ast::Program`
//! values (there is no parser in this workspace, and `etch_check` isn't a
//! dependency here — these programs are already "checked" by construction).

use etch_ast::{
    AssignStmt, BinaryExpr, BinaryOp, CallExpr, Expr, ExprKind, FunDecl, Param, Pos, Program,
    Stmt, StmtKind, Type, VarStmt, WhileStmt,
};
use etch_bytecode::Opcode;
use etch_compiler::compile;

fn pos() -> Pos {
    Pos::synthetic()
}

fn int(v: i64) -> Expr {
    Expr::new(pos(), ExprKind::Int(v))
}

fn var(name: &str) -> Expr {
    Expr::new(pos(), ExprKind::Var(name.to_string()))
}

fn call(fname: &str, args: Vec<Expr>) -> Expr {
    Expr::new(pos(), ExprKind::Call(CallExpr { fname: fname.to_string(), args, inst_types: vec![] }))
}

fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(pos(), ExprKind::Binary(BinaryExpr { op: BinaryOp::Add, lhs: Box::new(lhs), rhs: Box::new(rhs) }))
}

fn var_stmt(name: &str, init: Expr) -> Stmt {
    Stmt::new(pos(), StmtKind::Var(VarStmt { name: name.to_string(), declared_type: None, initializer: Some(init), is_mutable: false }))
}

fn main_decl(body: Vec<Stmt>) -> FunDecl {
    FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: Some(Type::Void),
        body,
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    }
}

fn program_with_main(body: Vec<Stmt>) -> Program {
    let mut program = Program::new();
    program.fun_instances.insert("main".to_string(), main_decl(body));
    program
}

#[test]
fn lowers_a_straight_line_function_with_an_implicit_void_return() {
    let program = program_with_main(vec![
        var_stmt("x", add(int(2), int(3))),
        Stmt::new(pos(), StmtKind::Expr(call("print", vec![var("x")]))),
    ]);

    let module = compile(&program, "main.etch", [0u8; 32], false).unwrap();
    let main_fn = module.entry_function().unwrap();
    assert_eq!(main_fn.entry_pc, 0);

    let ops: Vec<Opcode> = module.instructions.iter().map(|i| i.op).collect();
    assert_eq!(
        ops,
        vec![
            Opcode::LoadInt,
            Opcode::LoadInt,
            Opcode::Add,
            Opcode::StoreVar,
            Opcode::LoadVar,
            Opcode::Call,
            Opcode::Pop,
            Opcode::LoadInt,
            Opcode::Return,
        ]
    );
    assert_eq!(module.instructions[5].str_arg, "print");
    assert_eq!(module.instructions[5].int_arg, 1);
}

#[test]
fn while_loop_jump_targets_land_inside_the_instruction_stream() {
    let program = program_with_main(vec![
        var_stmt("n", int(0)),
        Stmt::new(
            pos(),
            StmtKind::While(WhileStmt {
                cond: Expr::new(
                    pos(),
                    ExprKind::Binary(BinaryExpr { op: BinaryOp::Lt, lhs: Box::new(var("n")), rhs: Box::new(int(3)) }),
                ),
                body: vec![Stmt::new(
                    pos(),
                    StmtKind::Assign(AssignStmt {
                        name: "n".to_string(),
                        value: add(var("n"), int(1)),
                    }),
                )],
            }),
        ),
    ]);

    let module = compile(&program, "main.etch", [0u8; 32], false).unwrap();
    let len = module.instructions.len() as i64;
    for instr in &module.instructions {
        if matches!(instr.op, Opcode::Jump | Opcode::JumpIfFalse) {
            assert!(instr.int_arg >= 0 && instr.int_arg <= len, "jump target {} out of range", instr.int_arg);
        }
    }
    // JumpIfFalse must target a point strictly after the loop condition.
    let jmp_if_false_idx = module.instructions.iter().position(|i| i.op == Opcode::JumpIfFalse).unwrap();
    assert!(module.instructions[jmp_if_false_idx].int_arg as usize > jmp_if_false_idx);
}

#[test]
fn non_literal_global_initializer_is_rejected() {
    let mut program = program_with_main(vec![]);
    program.globals.push(Stmt::new(
        pos(),
        StmtKind::Var(VarStmt {
            name: "g".to_string(),
            declared_type: None,
            initializer: Some(add(int(1), int(2))),
            is_mutable: false,
        }),
    ));

    let err = compile(&program, "main.etch", [0u8; 32], false).unwrap_err();
    assert!(matches!(err, etch_compiler::CompileError::NonLiteralGlobalInitializer(_)));
}

#[test]
fn literal_global_initializer_is_recorded() {
    let mut program = program_with_main(vec![]);
    program.globals.push(Stmt::new(
        pos(),
        StmtKind::Var(VarStmt { name: "g".to_string(), declared_type: None, initializer: Some(int(7)), is_mutable: false }),
    ));

    let module = compile(&program, "main.etch", [0u8; 32], false).unwrap();
    assert_eq!(module.globals, vec!["g".to_string()]);
    assert_eq!(module.global_values[0].value, etch_bytecode::GlobalValue::Int(7));
}

#[test]
fn call_fills_in_missing_trailing_default_arguments() {
    let mut program = Program::new();
    program.fun_instances.insert(
        "greet".to_string(),
        FunDecl {
            name: "greet".to_string(),
            typarams: vec![],
            params: vec![Param { name: "times".to_string(), ty: Type::Int, default_value: Some(int(1)) }],
            declared_return: Some(Type::Void),
            body: vec![],
            is_exported: false,
            is_cffi: false,
            pos: pos(),
        },
    );
    program.fun_instances.insert(
        "main".to_string(),
        main_decl(vec![Stmt::new(pos(), StmtKind::Expr(call("greet", vec![])))]),
    );

    let module = compile(&program, "main.etch", [0u8; 32], false).unwrap();
    let call_instr = module.instructions.iter().find(|i| i.op == Opcode::Call && i.str_arg == "greet").unwrap();
    assert_eq!(call_instr.int_arg, 1);
}
