//! Purity analysis (spec.md §4.3): a function is pure unless it transitively
//! calls one of the five impure builtins. Shared between the prover (to
//! decide when [`crate::eval::eval_pure_call`] may substitute an exact
//! result for a call) and the comptime folder (to decide which calls are
//! eligible for pure-call folding in the first place).

use rustc_hash::FxHashSet;

use etch_ast::{Expr, ExprKind, ForIterable, MatchPattern, Program, Stmt, StmtKind};

pub const IMPURE_BUILTINS: &[&str] = &["print", "readFile", "rand", "println", "seed"];

pub fn is_pure_function(program: &Program, fname: &str) -> bool {
    let mut visited = FxHashSet::default();
    is_pure_rec(program, fname, &mut visited)
}

fn lookup<'a>(program: &'a Program, fname: &str) -> Option<&'a etch_ast::FunDecl> {
    program
        .fun_instances
        .get(fname)
        .or_else(|| program.funs.get(fname).and_then(|v| v.first()))
}

fn is_pure_rec(program: &Program, fname: &str, visited: &mut FxHashSet<String>) -> bool {
    if IMPURE_BUILTINS.contains(&fname) {
        return false;
    }
    if !visited.insert(fname.to_string()) {
        // Already on the call stack we're checking: a recursive function
        // is pure unless some *other* call on the chain proves otherwise.
        return true;
    }
    let decl = match lookup(program, fname) {
        Some(d) => d,
        None => return true,
    };
    decl.body.iter().all(|s| stmt_is_pure(program, s, visited))
}

fn stmt_is_pure(program: &Program, stmt: &Stmt, visited: &mut FxHashSet<String>) -> bool {
    match &stmt.kind {
        StmtKind::Var(v) => v.initializer.as_ref().map_or(true, |e| expr_is_pure(program, e, visited)),
        StmtKind::Assign(a) => expr_is_pure(program, &a.value, visited),
        StmtKind::FieldAssign(fa) => expr_is_pure(program, &fa.target, visited) && expr_is_pure(program, &fa.value, visited),
        StmtKind::If(s) => {
            expr_is_pure(program, &s.cond, visited)
                && s.then_body.iter().all(|st| stmt_is_pure(program, st, visited))
                && s.elifs.iter().all(|(c, b)| expr_is_pure(program, c, visited) && b.iter().all(|st| stmt_is_pure(program, st, visited)))
                && s.else_body.as_ref().map_or(true, |b| b.iter().all(|st| stmt_is_pure(program, st, visited)))
        }
        StmtKind::While(w) => expr_is_pure(program, &w.cond, visited) && w.body.iter().all(|st| stmt_is_pure(program, st, visited)),
        StmtKind::For(f) => {
            let iter_pure = match &f.iterable {
                ForIterable::Range { start, end, .. } => expr_is_pure(program, start, visited) && expr_is_pure(program, end, visited),
                ForIterable::Array(e) => expr_is_pure(program, e, visited),
            };
            iter_pure && f.body.iter().all(|st| stmt_is_pure(program, st, visited))
        }
        StmtKind::Break => true,
        StmtKind::Expr(e) | StmtKind::Discard(e) | StmtKind::Defer(e) => expr_is_pure(program, e, visited),
        StmtKind::Return(opt) => opt.as_ref().map_or(true, |e| expr_is_pure(program, e, visited)),
        StmtKind::Comptime(body) => body.iter().all(|st| stmt_is_pure(program, st, visited)),
        StmtKind::TypeDecl(_) | StmtKind::Import(_) => true,
    }
}

fn expr_is_pure(program: &Program, expr: &Expr, visited: &mut FxHashSet<String>) -> bool {
    match &expr.kind {
        ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Char(_)
        | ExprKind::Bool(_)
        | ExprKind::Nil
        | ExprKind::Var(_)
        | ExprKind::OptionNone => true,
        ExprKind::Unary(u) => expr_is_pure(program, &u.operand, visited),
        ExprKind::Binary(b) => expr_is_pure(program, &b.lhs, visited) && expr_is_pure(program, &b.rhs, visited),
        ExprKind::Call(c) => is_pure_rec(program, &c.fname, visited) && c.args.iter().all(|a| expr_is_pure(program, a, visited)),
        ExprKind::NewRef(e) | ExprKind::Deref(e) | ExprKind::ArrayLen(e) | ExprKind::OptionSome(e) | ExprKind::ResultOk(e) | ExprKind::ResultErr(e) => {
            expr_is_pure(program, e, visited)
        }
        ExprKind::Array(items) => items.iter().all(|i| expr_is_pure(program, i, visited)),
        ExprKind::Index(ix) => expr_is_pure(program, &ix.array, visited) && expr_is_pure(program, &ix.index, visited),
        ExprKind::Slice(sl) => {
            expr_is_pure(program, &sl.array, visited)
                && sl.start.as_ref().map_or(true, |e| expr_is_pure(program, e, visited))
                && sl.end.as_ref().map_or(true, |e| expr_is_pure(program, e, visited))
        }
        ExprKind::Cast(c) => expr_is_pure(program, &c.operand, visited),
        ExprKind::Comptime(c) => expr_is_pure(program, &c.inner, visited),
        ExprKind::If(i) => expr_is_pure(program, &i.cond, visited) && expr_is_pure(program, &i.then_branch, visited) && expr_is_pure(program, &i.else_branch, visited),
        ExprKind::Match(m) => {
            expr_is_pure(program, &m.scrutinee, visited)
                && m.cases.iter().all(|case| {
                    let pattern_pure = match &case.pattern {
                        MatchPattern::Literal(e) => expr_is_pure(program, e, visited),
                        _ => true,
                    };
                    pattern_pure && expr_is_pure(program, &case.body, visited)
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etch_ast::{CallExpr, FunDecl, Param, Pos, Type};

    fn pos() -> Pos {
        Pos::synthetic()
    }

    #[test]
    fn a_function_that_calls_print_is_impure() {
        let mut program = Program::new();
        program.fun_instances.insert(
            "greet".to_string(),
            FunDecl {
                name: "greet".to_string(),
                typarams: vec![],
                params: vec![],
                declared_return: Some(Type::Void),
                body: vec![Stmt::new(
                    pos(),
                    StmtKind::Expr(Expr::new(
                        pos(),
                        ExprKind::Call(CallExpr { fname: "print".to_string(), args: vec![], inst_types: vec![] }),
                    )),
                )],
                is_exported: false,
                is_cffi: false,
                pos: pos(),
            },
        );
        assert!(!is_pure_function(&program, "greet"));
    }

    #[test]
    fn an_arithmetic_only_function_is_pure() {
        let mut program = Program::new();
        program.fun_instances.insert(
            "id".to_string(),
            FunDecl {
                name: "id".to_string(),
                typarams: vec![],
                params: vec![Param { name: "x".to_string(), ty: Type::Int, default_value: None }],
                declared_return: Some(Type::Int),
                body: vec![Stmt::new(pos(), StmtKind::Return(Some(Expr::new(pos(), ExprKind::Var("x".to_string())))))],
                is_exported: false,
                is_cffi: false,
                pos: pos(),
            },
        );
        assert!(is_pure_function(&program, "id"));
    }
}
