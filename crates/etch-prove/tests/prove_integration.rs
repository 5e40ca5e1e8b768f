//! Hand-assembled `etch_ast::Program` fixtures exercising each provable
//! safety category (spec.md §4.4, §8 scenarios S2/S4).

use etch_ast::{
    AssignStmt, BinaryExpr, BinaryOp, CallExpr, Expr, ExprKind, FunDecl, IfStmt, Param, Pos, Program, Stmt, StmtKind, Type, VarStmt,
};
use etch_prove::{prove_program, ProveErrorKind};

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

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(pos(), ExprKind::Binary(BinaryExpr { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }))
}

fn var_stmt(name: &str, init: Option<Expr>) -> Stmt {
    Stmt::new(pos(), StmtKind::Var(VarStmt { name: name.to_string(), declared_type: None, initializer: init, is_mutable: true }))
}

fn main_with(body: Vec<Stmt>) -> Program {
    let mut program = Program::new();
    program.fun_instances.insert(
        "main".to_string(),
        FunDecl {
            name: "main".to_string(),
            typarams: vec![],
            params: vec![],
            declared_return: Some(Type::Void),
            body,
            is_exported: false,
            is_cffi: false,
            pos: pos(),
        },
    );
    program
}

#[test]
fn a_literal_division_by_zero_is_rejected() {
    let program = main_with(vec![var_stmt("x", Some(binary(BinaryOp::Div, int(10), int(0))))]);
    let err = prove_program(&program).unwrap_err();
    assert_eq!(err.kind, ProveErrorKind::DivideByZero);
}

#[test]
fn a_runtime_divisor_not_proven_nonzero_is_rejected() {
    // fun divide(a: int, b: int) -> int { return a / b; }
    let mut program = Program::new();
    program.fun_instances.insert(
        "divide".to_string(),
        FunDecl {
            name: "divide".to_string(),
            typarams: vec![],
            params: vec![
                Param { name: "a".to_string(), ty: Type::Int, default_value: None },
                Param { name: "b".to_string(), ty: Type::Int, default_value: None },
            ],
            declared_return: Some(Type::Int),
            body: vec![Stmt::new(pos(), StmtKind::Return(Some(binary(BinaryOp::Div, var("a"), var("b")))))],
            is_exported: false,
            is_cffi: false,
            pos: pos(),
        },
    );
    let err = prove_program(&program).unwrap_err();
    assert_eq!(err.kind, ProveErrorKind::DivideByZero);
}

#[test]
fn assume_non_zero_clears_the_division_violation() {
    let mut program = Program::new();
    program.fun_instances.insert(
        "divide".to_string(),
        FunDecl {
            name: "divide".to_string(),
            typarams: vec![],
            params: vec![
                Param { name: "a".to_string(), ty: Type::Int, default_value: None },
                Param { name: "b".to_string(), ty: Type::Int, default_value: None },
            ],
            declared_return: Some(Type::Int),
            body: vec![Stmt::new(
                pos(),
                StmtKind::Return(Some(binary(BinaryOp::Div, var("a"), call("assumeNonZero", vec![var("b")])))),
            )],
            is_exported: false,
            is_cffi: false,
            pos: pos(),
        },
    );
    assert!(prove_program(&program).is_ok());
}

#[test]
fn a_variable_only_initialized_on_one_branch_is_uninitialized_after_the_if() {
    // var a: int; if cond { a = 1; } print(a);
    let program = main_with(vec![
        var_stmt("a", None),
        Stmt::new(
            pos(),
            StmtKind::If(IfStmt {
                cond: call("rand", vec![int(2)]),
                then_body: vec![Stmt::new(pos(), StmtKind::Assign(AssignStmt { name: "a".to_string(), value: int(1) }))],
                elifs: vec![],
                else_body: None,
            }),
        ),
        Stmt::new(pos(), StmtKind::Expr(call("print", vec![var("a")]))),
    ]);
    let err = prove_program(&program).unwrap_err();
    assert_eq!(err.kind, ProveErrorKind::UninitializedUse);
}

#[test]
fn a_variable_initialized_on_every_branch_is_fine() {
    let program = main_with(vec![
        var_stmt("a", None),
        Stmt::new(
            pos(),
            StmtKind::If(IfStmt {
                cond: call("rand", vec![int(2)]),
                then_body: vec![Stmt::new(pos(), StmtKind::Assign(AssignStmt { name: "a".to_string(), value: int(1) }))],
                elifs: vec![],
                else_body: Some(vec![Stmt::new(pos(), StmtKind::Assign(AssignStmt { name: "a".to_string(), value: int(2) }))]),
            }),
        ),
        Stmt::new(pos(), StmtKind::Expr(call("print", vec![var("a")]))),
    ]);
    assert!(prove_program(&program).is_ok());
}

#[test]
fn dereferencing_a_literal_nil_is_rejected() {
    let program = main_with(vec![Stmt::new(
        pos(),
        StmtKind::Discard(Expr::new(pos(), ExprKind::Deref(Box::new(Expr::new(pos(), ExprKind::Nil))))),
    )]);
    let err = prove_program(&program).unwrap_err();
    assert_eq!(err.kind, ProveErrorKind::NilDeref);
}

#[test]
fn indexing_a_known_size_array_with_its_own_length_is_out_of_bounds() {
    // let a = [1, 2, 3]; print(a[#a]);
    let array_lit = Expr::new(pos(), ExprKind::Array(vec![int(1), int(2), int(3)]));
    let index_expr = Expr::new(
        pos(),
        ExprKind::Index(etch_ast::IndexExpr {
            array: Box::new(var("a")),
            index: Box::new(Expr::new(pos(), ExprKind::ArrayLen(Box::new(var("a"))))),
        }),
    );
    let program = main_with(vec![
        Stmt::new(pos(), StmtKind::Var(VarStmt { name: "a".to_string(), declared_type: None, initializer: Some(array_lit), is_mutable: false })),
        Stmt::new(pos(), StmtKind::Discard(index_expr)),
    ]);
    let err = prove_program(&program).unwrap_err();
    assert_eq!(err.kind, ProveErrorKind::OutOfBounds);
}

#[test]
fn indexing_within_bounds_is_fine() {
    let array_lit = Expr::new(pos(), ExprKind::Array(vec![int(1), int(2), int(3)]));
    let index_expr = Expr::new(
        pos(),
        ExprKind::Index(etch_ast::IndexExpr { array: Box::new(var("a")), index: Box::new(int(0)) }),
    );
    let program = main_with(vec![
        Stmt::new(pos(), StmtKind::Var(VarStmt { name: "a".to_string(), declared_type: None, initializer: Some(array_lit), is_mutable: false })),
        Stmt::new(pos(), StmtKind::Discard(index_expr)),
    ]);
    assert!(prove_program(&program).is_ok());
}

#[test]
fn two_known_constants_that_overflow_on_multiply_are_rejected() {
    let program = main_with(vec![var_stmt("x", Some(binary(BinaryOp::Mul, int(i64::MAX), int(2))))]);
    let err = prove_program(&program).unwrap_err();
    assert_eq!(err.kind, ProveErrorKind::Overflow);
}

#[test]
fn a_statement_after_an_unconditional_return_is_unreachable() {
    let program = main_with(vec![
        Stmt::new(pos(), StmtKind::Return(None)),
        Stmt::new(pos(), StmtKind::Expr(call("print", vec![int(1)]))),
    ]);
    let err = prove_program(&program).unwrap_err();
    assert_eq!(err.kind, ProveErrorKind::UnreachableCode);
}

#[test]
fn ordinary_parameter_arithmetic_with_no_narrowed_bounds_is_not_flagged() {
    let mut program = Program::new();
    program.fun_instances.insert(
        "add".to_string(),
        FunDecl {
            name: "add".to_string(),
            typarams: vec![],
            params: vec![
                Param { name: "a".to_string(), ty: Type::Int, default_value: None },
                Param { name: "b".to_string(), ty: Type::Int, default_value: None },
            ],
            declared_return: Some(Type::Int),
            body: vec![Stmt::new(pos(), StmtKind::Return(Some(binary(BinaryOp::Add, var("a"), var("b")))))],
            is_exported: false,
            is_cffi: false,
            pos: pos(),
        },
    );
    assert!(prove_program(&program).is_ok());
}
