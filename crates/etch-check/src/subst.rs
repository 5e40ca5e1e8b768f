//! Resolves `Type::Generic` leaves inside a freshly cloned generic function
//! body against its monomorphization bindings, before the body is
//! typechecked as a concrete instance (spec.md §4.2, step 5).
//!
//! Parameter types and the declared return type are substituted by the
//! caller directly; this walk covers every other place a `Type` can appear
//! inside a function body — `var` declarations and `cast` targets — plus
//! recurses into every nested expression and statement so those reach the
//! checker already free of dangling `T`/`U` names.

use rustc_hash::FxHashMap;

use etch_ast::{Expr, ExprKind, ForIterable, MatchPattern, Stmt, StmtKind, Type};

pub fn substitute_stmts(stmts: &mut [Stmt], bindings: &FxHashMap<String, Type>) {
    for s in stmts {
        substitute_stmt(s, bindings);
    }
}

fn substitute_stmt(stmt: &mut Stmt, bindings: &FxHashMap<String, Type>) {
    match &mut stmt.kind {
        StmtKind::Var(v) => {
            if let Some(t) = &mut v.declared_type {
                *t = t.resolve(bindings);
            }
            if let Some(init) = &mut v.initializer {
                substitute_expr(init, bindings);
            }
        }
        StmtKind::Assign(a) => substitute_expr(&mut a.value, bindings),
        StmtKind::FieldAssign(fa) => {
            substitute_expr(&mut fa.target, bindings);
            substitute_expr(&mut fa.value, bindings);
        }
        StmtKind::If(i) => {
            substitute_expr(&mut i.cond, bindings);
            substitute_stmts(&mut i.then_body, bindings);
            for (c, body) in &mut i.elifs {
                substitute_expr(c, bindings);
                substitute_stmts(body, bindings);
            }
            if let Some(body) = &mut i.else_body {
                substitute_stmts(body, bindings);
            }
        }
        StmtKind::While(w) => {
            substitute_expr(&mut w.cond, bindings);
            substitute_stmts(&mut w.body, bindings);
        }
        StmtKind::For(f) => {
            match &mut f.iterable {
                ForIterable::Range { start, end, .. } => {
                    substitute_expr(start, bindings);
                    substitute_expr(end, bindings);
                }
                ForIterable::Array(arr) => substitute_expr(arr, bindings),
            }
            substitute_stmts(&mut f.body, bindings);
        }
        StmtKind::Break => {}
        StmtKind::Expr(e) => substitute_expr(e, bindings),
        StmtKind::Return(e) => {
            if let Some(e) = e {
                substitute_expr(e, bindings);
            }
        }
        StmtKind::Comptime(body) => substitute_stmts(body, bindings),
        StmtKind::Defer(e) | StmtKind::Discard(e) => substitute_expr(e, bindings),
        StmtKind::TypeDecl(_) | StmtKind::Import(_) => {}
    }
}

fn substitute_expr(expr: &mut Expr, bindings: &FxHashMap<String, Type>) {
    match &mut expr.kind {
        ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Char(_)
        | ExprKind::Bool(_)
        | ExprKind::Nil
        | ExprKind::Var(_)
        | ExprKind::OptionNone => {}
        ExprKind::Unary(u) => substitute_expr(&mut u.operand, bindings),
        ExprKind::Binary(b) => {
            substitute_expr(&mut b.lhs, bindings);
            substitute_expr(&mut b.rhs, bindings);
        }
        ExprKind::Call(c) => {
            for a in &mut c.args {
                substitute_expr(a, bindings);
            }
            for t in &mut c.inst_types {
                *t = t.resolve(bindings);
            }
        }
        ExprKind::NewRef(inner) | ExprKind::Deref(inner) | ExprKind::ArrayLen(inner) => {
            substitute_expr(inner, bindings)
        }
        ExprKind::Array(items) => {
            for i in items {
                substitute_expr(i, bindings);
            }
        }
        ExprKind::Index(ix) => {
            substitute_expr(&mut ix.array, bindings);
            substitute_expr(&mut ix.index, bindings);
        }
        ExprKind::Slice(sl) => {
            substitute_expr(&mut sl.array, bindings);
            if let Some(s) = &mut sl.start {
                substitute_expr(s, bindings);
            }
            if let Some(e) = &mut sl.end {
                substitute_expr(e, bindings);
            }
        }
        ExprKind::Cast(c) => {
            c.target = c.target.resolve(bindings);
            substitute_expr(&mut c.operand, bindings);
        }
        ExprKind::Comptime(ce) => substitute_expr(&mut ce.inner, bindings),
        ExprKind::If(i) => {
            substitute_expr(&mut i.cond, bindings);
            substitute_expr(&mut i.then_branch, bindings);
            substitute_expr(&mut i.else_branch, bindings);
        }
        ExprKind::OptionSome(inner) | ExprKind::ResultOk(inner) | ExprKind::ResultErr(inner) => {
            substitute_expr(inner, bindings)
        }
        ExprKind::Match(m) => {
            substitute_expr(&mut m.scrutinee, bindings);
            for case in &mut m.cases {
                if let MatchPattern::Literal(lit) = &mut case.pattern {
                    substitute_expr(lit, bindings);
                }
                substitute_expr(&mut case.body, bindings);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use etch_ast::{CastExpr, Pos};

    #[test]
    fn resolves_cast_target_inside_a_nested_expression() {
        let mut bindings = FxHashMap::default();
        bindings.insert("T".to_string(), Type::Int);
        let mut expr = Expr::new(
            Pos::synthetic(),
            ExprKind::Cast(CastExpr {
                target: Type::generic("T"),
                operand: Box::new(Expr::new(Pos::synthetic(), ExprKind::Int(1))),
            }),
        );
        substitute_expr(&mut expr, &bindings);
        match expr.kind {
            ExprKind::Cast(c) => assert_eq!(c.target, Type::Int),
            _ => panic!("expected cast"),
        }
    }
}
