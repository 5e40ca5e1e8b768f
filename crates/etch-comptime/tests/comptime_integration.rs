//! Folding tests built directly against hand-assembled `etch_ast::Program`
//! values, in the same style as `etch-compiler`'s integration tests: there
//! is no parser or checker dependency here, so these programs are already
//! "checked" by construction (types filled in, calls already resolved to
//! their mangled instance keys where that matters).

use etch_ast::{
    BinaryExpr, BinaryOp, CallExpr, ComptimeExpr, Expr, ExprKind, FunDecl, Param, Pos, Program,
    Stmt, StmtKind, Type, VarStmt, COMPTIME_INFER,
};
use etch_comptime::fold_program;

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

fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(pos(), ExprKind::Binary(BinaryExpr { op: BinaryOp::Add, lhs: Box::new(lhs), rhs: Box::new(rhs) }))
}

fn var_stmt(name: &str, init: Expr) -> Stmt {
    Stmt::new(pos(), StmtKind::Var(VarStmt { name: name.to_string(), declared_type: None, initializer: Some(init), is_mutable: false }))
}

fn var_stmt_typed(name: &str, declared_type: Type, init: Expr) -> Stmt {
    Stmt::new(pos(), StmtKind::Var(VarStmt { name: name.to_string(), declared_type: Some(declared_type), initializer: Some(init), is_mutable: false }))
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

fn double_decl() -> FunDecl {
    FunDecl {
        name: "double".to_string(),
        typarams: vec![],
        params: vec![Param { name: "x".to_string(), ty: Type::Int, default_value: None }],
        declared_return: Some(Type::Int),
        body: vec![Stmt::new(pos(), StmtKind::Return(Some(add(var("x"), var("x")))))],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    }
}

fn main_body(program: &Program) -> &[Stmt] {
    &program.fun_instances["main"].body
}

#[test]
fn a_pure_call_with_literal_arguments_folds_to_its_result() {
    let mut program = program_with_main(vec![var_stmt("result", call("double", vec![int(21)]))]);
    program.fun_instances.insert("double".to_string(), double_decl());

    fold_program(&mut program).unwrap();

    let StmtKind::Var(v) = &main_body(&program)[0].kind else { panic!("expected a var stmt") };
    assert_eq!(v.initializer.as_ref().unwrap().kind, ExprKind::Int(42));
}

#[test]
fn an_impure_call_is_never_folded() {
    let mut program = program_with_main(vec![Stmt::new(pos(), StmtKind::Expr(call("println", vec![int(1)])))]);

    fold_program(&mut program).unwrap();

    let StmtKind::Expr(e) = &main_body(&program)[0].kind else { panic!("expected an expr stmt") };
    assert!(matches!(&e.kind, ExprKind::Call(c) if c.fname == "println"));
}

#[test]
fn a_comptime_expression_is_evaluated_and_replaced_with_a_literal() {
    let comptime_expr = Expr::new(pos(), ExprKind::Comptime(ComptimeExpr { inner: Box::new(add(int(2), int(3))) }));
    let mut program = program_with_main(vec![var_stmt("x", comptime_expr)]);

    fold_program(&mut program).unwrap();

    let StmtKind::Var(v) = &main_body(&program)[0].kind else { panic!("expected a var stmt") };
    assert_eq!(v.initializer.as_ref().unwrap().kind, ExprKind::Int(5));
}

#[test]
fn a_comptime_block_expands_an_inject_call_into_a_var_declaration() {
    let block = vec![Stmt::new(
        pos(),
        StmtKind::Expr(call("inject", vec![str_lit("greet"), str_lit("string"), str_lit("hello")])),
    )];
    let mut program = program_with_main(vec![Stmt::new(pos(), StmtKind::Comptime(block))]);

    fold_program(&mut program).unwrap();

    let body = main_body(&program);
    assert_eq!(body.len(), 1);
    let StmtKind::Var(v) = &body[0].kind else { panic!("expected an injected var stmt") };
    assert_eq!(v.name, "greet");
    assert_eq!(v.declared_type, Some(Type::String));
    assert_eq!(v.initializer.as_ref().unwrap().kind, ExprKind::Str("hello".to_string()));
}

#[test]
fn a_comptime_block_with_no_inject_calls_disappears_entirely() {
    let block = vec![Stmt::new(pos(), StmtKind::Expr(call("print", vec![int(1)])))];
    let mut program = program_with_main(vec![Stmt::new(pos(), StmtKind::Comptime(block))]);

    fold_program(&mut program).unwrap();

    assert!(main_body(&program).is_empty());
}

#[test]
fn a_deferred_comptime_infer_type_is_finalized_from_the_folded_initializer() {
    let mut program = program_with_main(vec![var_stmt_typed("x", Type::generic(COMPTIME_INFER), int(5))]);

    fold_program(&mut program).unwrap();

    let StmtKind::Var(v) = &main_body(&program)[0].kind else { panic!("expected a var stmt") };
    assert_eq!(v.declared_type, Some(Type::Int));
}

#[test]
fn injected_values_referencing_block_local_variables_are_captured() {
    let block = vec![
        var_stmt("computed", add(int(10), int(2))),
        Stmt::new(pos(), StmtKind::Expr(call("inject", vec![str_lit("twelve"), str_lit("int"), var("computed")]))),
    ];
    let mut program = program_with_main(vec![Stmt::new(pos(), StmtKind::Comptime(block))]);

    fold_program(&mut program).unwrap();

    let body = main_body(&program);
    assert_eq!(body.len(), 1);
    let StmtKind::Var(v) = &body[0].kind else { panic!("expected an injected var stmt") };
    assert_eq!(v.name, "twelve");
    assert_eq!(v.initializer.as_ref().unwrap().kind, ExprKind::Int(12));
}
