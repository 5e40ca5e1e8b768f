//! End-to-end checks built directly against `etch_ast` values (there is no
//! parser in this workspace), exercising generic monomorphization, the
//! fail-fast error contract, and a handful of expression typing rules.

use etch_ast::{
    BinaryExpr, BinaryOp, CallExpr, Expr, ExprKind, FunDecl, Param, Pos, Program, Stmt, StmtKind,
    Type, TypeParam, VarStmt,
};
use etch_check::{check_program, CheckError};

fn pos() -> Pos {
    Pos::synthetic()
}

fn var(name: &str) -> Expr {
    Expr::new(pos(), ExprKind::Var(name.to_string()))
}

fn int(v: i64) -> Expr {
    Expr::new(pos(), ExprKind::Int(v))
}

fn float(v: f64) -> Expr {
    Expr::new(pos(), ExprKind::Float(v))
}

fn string(v: &str) -> Expr {
    Expr::new(pos(), ExprKind::Str(v.to_string()))
}

fn call(fname: &str, args: Vec<Expr>) -> Expr {
    Expr::new(pos(), ExprKind::Call(CallExpr { fname: fname.to_string(), args, inst_types: vec![] }))
}

fn add_expr(lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(
        pos(),
        ExprKind::Binary(BinaryExpr { op: BinaryOp::Add, lhs: Box::new(lhs), rhs: Box::new(rhs) }),
    )
}

fn var_stmt(name: &str, init: Expr, is_mutable: bool) -> Stmt {
    Stmt::new(
        pos(),
        StmtKind::Var(VarStmt {
            name: name.to_string(),
            declared_type: None,
            initializer: Some(init),
            is_mutable,
        }),
    )
}

fn return_stmt(e: Option<Expr>) -> Stmt {
    Stmt::new(pos(), StmtKind::Return(e))
}

/// `fn add[T: Addable](a: T, b: T) -> T { return a + b; }`
fn generic_add_decl() -> FunDecl {
    FunDecl {
        name: "add".to_string(),
        typarams: vec![TypeParam { name: "T".to_string(), bound: Some("Addable".to_string()) }],
        params: vec![
            Param { name: "a".to_string(), ty: Type::generic("T"), default_value: None },
            Param { name: "b".to_string(), ty: Type::generic("T"), default_value: None },
        ],
        declared_return: Some(Type::generic("T")),
        body: vec![return_stmt(Some(add_expr(var("a"), var("b"))))],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    }
}

#[test]
fn generic_function_is_monomorphized_once_per_distinct_type_argument_tuple() {
    let mut program = Program::new();
    program.add_fun(generic_add_decl());
    program.add_fun(FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: None,
        body: vec![
            var_stmt("x", call("add", vec![int(1), int(2)]), false),
            var_stmt("y", call("add", vec![float(1.0), float(2.0)]), false),
            return_stmt(None),
        ],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    check_program(&mut program).expect("well-typed program should check");

    let int_instance = program.fun_instances.get("add<int>").expect("int instance recorded");
    assert_eq!(int_instance.declared_return, Some(Type::Int));
    assert_eq!(int_instance.params[0].ty, Type::Int);

    let float_instance = program.fun_instances.get("add<float>").expect("float instance recorded");
    assert_eq!(float_instance.declared_return, Some(Type::Float));

    let main_instance = program.fun_instances.get("main").expect("main is checked eagerly");
    assert_eq!(main_instance.declared_return, Some(Type::Void));

    let fnames: Vec<&str> = main_instance
        .body
        .iter()
        .filter_map(|s| match &s.kind {
            StmtKind::Var(v) => match v.initializer.as_ref().map(|e| &e.kind) {
                Some(ExprKind::Call(c)) => Some(c.fname.as_str()),
                _ => None,
            },
            _ => None,
        })
        .collect();
    assert_eq!(fnames, vec!["add<int>", "add<float>"]);
}

#[test]
fn concept_violation_is_rejected_even_though_the_shape_unifies() {
    let mut program = Program::new();
    program.add_fun(generic_add_decl());
    program.add_fun(FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: None,
        body: vec![return_stmt(None), Stmt::new(pos(), StmtKind::Expr(call("add", vec![string("a"), string("b")])))],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    let err = check_program(&mut program).unwrap_err();
    assert!(matches!(err, CheckError::ConceptViolation { .. }), "got {err:?}");
}

#[test]
fn assigning_to_a_let_binding_is_a_type_error() {
    let mut program = Program::new();
    program.add_fun(FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: None,
        body: vec![
            var_stmt("n", int(1), false),
            Stmt::new(
                pos(),
                StmtKind::Assign(etch_ast::AssignStmt { name: "n".to_string(), value: int(2) }),
            ),
            return_stmt(None),
        ],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    let err = check_program(&mut program).unwrap_err();
    assert!(matches!(err, CheckError::AssignToImmutable { .. }), "got {err:?}");
}

#[test]
fn assigning_to_a_var_binding_of_the_same_type_succeeds() {
    let mut program = Program::new();
    program.add_fun(FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: None,
        body: vec![
            var_stmt("n", int(1), true),
            Stmt::new(
                pos(),
                StmtKind::Assign(etch_ast::AssignStmt { name: "n".to_string(), value: int(2) }),
            ),
            return_stmt(None),
        ],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    check_program(&mut program).expect("var reassignment of matching type should check");
}

#[test]
fn return_type_is_inferred_from_a_uniform_set_of_return_statements() {
    let mut program = Program::new();
    program.add_fun(FunDecl {
        name: "square".to_string(),
        typarams: vec![],
        params: vec![Param { name: "n".to_string(), ty: Type::Int, default_value: None }],
        declared_return: None,
        body: vec![return_stmt(Some(Expr::new(
            pos(),
            ExprKind::Binary(BinaryExpr { op: BinaryOp::Mul, lhs: Box::new(var("n")), rhs: Box::new(var("n")) }),
        )))],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    check_program(&mut program).expect("should check");
    let decl = &program.funs.get("square").unwrap()[0];
    // The template itself is untouched; the checked copy lives in fun_instances
    // under its bare (unmangled) name since `square` takes no type arguments.
    assert!(decl.declared_return.is_none());
    let instance = program.fun_instances.get("square").unwrap();
    assert_eq!(instance.declared_return, Some(Type::Int));
}

#[test]
fn calling_an_undeclared_function_fails_fast() {
    let mut program = Program::new();
    program.add_fun(FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: None,
        body: vec![Stmt::new(pos(), StmtKind::Expr(call("doesNotExist", vec![])))],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    let err = check_program(&mut program).unwrap_err();
    assert!(matches!(err, CheckError::UndeclaredFunction { .. }), "got {err:?}");
}

#[test]
fn nil_compares_equal_to_any_ref_type() {
    let mut program = Program::new();
    program.add_fun(FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: None,
        body: vec![
            var_stmt("r", Expr::new(pos(), ExprKind::NewRef(Box::new(int(1)))), false),
            Stmt::new(
                pos(),
                StmtKind::Discard(Expr::new(
                    pos(),
                    ExprKind::Binary(BinaryExpr {
                        op: BinaryOp::Eq,
                        lhs: Box::new(var("r")),
                        rhs: Box::new(Expr::new(pos(), ExprKind::Nil)),
                    }),
                )),
            ),
            return_stmt(None),
        ],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    check_program(&mut program).expect("ref == nil should typecheck as bool");
}

#[test]
fn a_name_injected_inside_a_comptime_block_is_visible_to_code_after_it() {
    let mut program = Program::new();
    program.add_fun(FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: None,
        body: vec![
            Stmt::new(
                pos(),
                StmtKind::Comptime(vec![Stmt::new(
                    pos(),
                    StmtKind::Expr(call("inject", vec![string("greet"), string("string"), string("hello")])),
                )]),
            ),
            Stmt::new(pos(), StmtKind::Expr(call("print", vec![var("greet")]))),
            return_stmt(None),
        ],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    check_program(&mut program).expect("injected name should typecheck before folding runs");
}

#[test]
fn a_comptime_blocks_own_locals_do_not_leak_past_it() {
    let mut program = Program::new();
    program.add_fun(FunDecl {
        name: "main".to_string(),
        typarams: vec![],
        params: vec![],
        declared_return: None,
        body: vec![
            Stmt::new(pos(), StmtKind::Comptime(vec![var_stmt("local_only", int(1), false)])),
            Stmt::new(pos(), StmtKind::Expr(call("print", vec![var("local_only")]))),
            return_stmt(None),
        ],
        is_exported: false,
        is_cffi: false,
        pos: pos(),
    });

    let err = check_program(&mut program).unwrap_err();
    assert!(matches!(err, CheckError::UndeclaredVariable { .. }), "got {err:?}");
}
