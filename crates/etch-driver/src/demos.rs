//! A small built-in program registry standing in for the external parser
//! (spec.md §1 explicitly puts "lexer/parser surface syntax" out of scope:
//! "the core consumes a fully-built AST"). Every test and fixture in this
//! workspace constructs an `etch_ast::Program` by hand for the same reason —
//! this module just does the same thing for the CLI binary, keyed by name
//! so `etch run <name>` has something to execute end to end.
//!
//! The names and shapes mirror spec.md §8's scenarios S1, S3 and S5.

use etch_ast::{
    BinaryExpr, BinaryOp, CallExpr, Expr, ExprKind, FunDecl, Param, Pos, Program, Stmt, StmtKind,
    Type, TypeParam, VarStmt,
};

fn pos() -> Pos {
    Pos::synthetic()
}

fn int(v: i64) -> Expr {
    Expr::new(pos(), ExprKind::Int(v))
}

fn str_lit(s: &str) -> Expr {
    Expr::new(pos(), ExprKind::Str(s.to_string()))
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

fn var_stmt(name: &str, ty: Type, init: Expr) -> Stmt {
    Stmt::new(pos(), StmtKind::Var(VarStmt { name: name.to_string(), declared_type: Some(ty), initializer: Some(init), is_mutable: false }))
}

fn expr_stmt(e: Expr) -> Stmt {
    Stmt::new(pos(), StmtKind::Expr(e))
}

fn main_decl(body: Vec<Stmt>) -> FunDecl {
    FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: Some(Type::Void),
        body,
        is_exported: true,
        is_cffi: false,
        pos: pos(),
    }
}

fn program_with_main(body: Vec<Stmt>) -> Program {
    let mut program = Program::new();
    program.add_fun(main_decl(body));
    program
}

/// S1: `let x: int = 2 + 3; print(x);` — prints `5`, exits 0.
pub fn arithmetic() -> Program {
    program_with_main(vec![
        var_stmt("x", Type::Int, binary(BinaryOp::Add, int(2), int(3))),
        expr_stmt(call("print", vec![var("x")])),
    ])
}

/// S2: `let x: int = 10 / 0;` — rejected by the prover (division by zero).
pub fn division_by_zero() -> Program {
    program_with_main(vec![var_stmt("x", Type::Int, binary(BinaryOp::Div, int(10), int(0)))])
}

/// S3: a generic `add[T: Addable]` called with `int` and `float` arguments,
/// producing two monomorphic instances and printing `3` then `4`. The
/// un-instantiated template lives in `funs`; the checker is responsible for
/// producing `fun_instances` entries — this fixture supplies only the
/// template plus the two call sites, matching how every other crate's
/// generic-instantiation fixtures are built.
pub fn generic_add() -> Program {
    let mut program = program_with_main(vec![
        expr_stmt(call("print", vec![call("add", vec![int(1), int(2)])])),
        expr_stmt(call("print", vec![call("add", vec![Expr::new(pos(), ExprKind::Float(1.5)), Expr::new(pos(), ExprKind::Float(2.5))])])),
    ]);

    let add_decl = FunDecl {
        name: "add".to_string(),
        typarams: vec![TypeParam { name: "T".to_string(), bound: Some("Addable".to_string()) }],
        params: vec![
            Param { name: "a".to_string(), ty: Type::generic("T"), default_value: None },
            Param { name: "b".to_string(), ty: Type::generic("T"), default_value: None },
        ],
        declared_return: Some(Type::generic("T")),
        body: vec![Stmt::new(pos(), StmtKind::Return(Some(binary(BinaryOp::Add, var("a"), var("b")))))],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    };
    program.add_fun(add_decl);
    program
}

/// S5: a `comptime` block that injects `greet: string = "hello"`, then
/// prints it.
pub fn comptime_inject() -> Program {
    let block = vec![
        var_stmt("pi_times_two", Type::Float, binary(BinaryOp::Mul, Expr::new(pos(), ExprKind::Float(3.14)), Expr::new(pos(), ExprKind::Float(2.0)))),
        expr_stmt(call("inject", vec![str_lit("greet"), str_lit("string"), str_lit("hello")])),
    ];
    program_with_main(vec![
        Stmt::new(pos(), StmtKind::Comptime(block)),
        expr_stmt(call("print", vec![var("greet")])),
    ])
}

/// Names accepted by [`lookup`], for `--list` and error messages.
pub const NAMES: &[&str] = &["arithmetic", "division-by-zero", "generic-add", "comptime-inject"];

/// The literal source text each fixture's hand-built AST stands in for —
/// used only for diagnostic rendering (`main.rs`'s `codespan_reporting`
/// snippet), never parsed, since there is no parser in this workspace.
pub fn source_text(name: &str) -> Option<&'static str> {
    match name {
        "arithmetic" => Some("let x: int = 2 + 3;\nprint(x);\n"),
        "division-by-zero" => Some("let x: int = 10 / 0;\n"),
        "generic-add" => Some("fn add[T: Addable](a: T, b: T) -> T {\n    return a + b;\n}\nprint(add(1, 2));\nprint(add(1.5, 2.5));\n"),
        "comptime-inject" => Some(
            "comptime {\n    let pi_times_two = 3.14 * 2;\n    inject(\"greet\", \"string\", \"hello\");\n}\nprint(greet);\n",
        ),
        _ => None,
    }
}

pub fn lookup(name: &str) -> Option<Program> {
    match name {
        "arithmetic" => Some(arithmetic()),
        "division-by-zero" => Some(division_by_zero()),
        "generic-add" => Some(generic_add()),
        "comptime-inject" => Some(comptime_inject()),
        _ => None,
    }
}
