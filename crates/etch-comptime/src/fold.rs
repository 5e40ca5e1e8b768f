//! The recursive AST walk that eliminates `comptime` nodes and folds pure
//! calls (spec.md §4.3). Entry point is [`fold_program`].

use etch_ast::{
    CallExpr, Expr, ExprKind, ForIterable, ForStmt, IfStmt, Program, Stmt, StmtKind, Type,
    VarStmt, COMPTIME_INFER,
};

use crate::error::{ComptimeError, ComptimeResult};
use crate::literal::{parse_type_name, value_to_literal};
use crate::vmrun::run_block;

/// Eliminate every `comptime` construct in `program` and fold the pure
/// calls reachable from it, in place. Iteration order over
/// `fun_instances`/`globals` is sorted/positional so two folds of the same
/// checked program agree byte-for-byte on the result.
pub fn fold_program(program: &mut Program) -> ComptimeResult<()> {
    let mut names: Vec<String> = program.fun_instances.keys().cloned().collect();
    names.sort();
    for name in names {
        let mut decl = program.fun_instances.remove(&name).expect("key came from this map");
        decl.body = fold_block(program, decl.body)?;
        program.fun_instances.insert(name, decl);
    }

    let globals = std::mem::take(&mut program.globals);
    program.globals = fold_block(program, globals)?;
    Ok(())
}

/// Fold a statement list, expanding each `comptime { .. }` into zero or
/// more injected `var` declarations in place of the block.
fn fold_block(program: &Program, stmts: Vec<Stmt>) -> ComptimeResult<Vec<Stmt>> {
    let mut out = Vec::with_capacity(stmts.len());
    for stmt in stmts {
        let pos = stmt.pos.clone();
        match stmt.kind {
            StmtKind::Comptime(block) => {
                out.extend(fold_comptime_block(program, block, &pos)?);
            }
            other => out.push(Stmt::new(pos, fold_stmt_kind(program, other)?)),
        }
    }
    Ok(out)
}

fn fold_stmt_kind(program: &Program, kind: StmtKind) -> ComptimeResult<StmtKind> {
    Ok(match kind {
        StmtKind::Var(mut v) => {
            v.initializer = match v.initializer {
                Some(e) => Some(fold_expr(program, e)?),
                None => None,
            };
            finalize_comptime_infer(&mut v);
            StmtKind::Var(v)
        }
        StmtKind::Assign(mut a) => {
            a.value = fold_expr(program, a.value)?;
            StmtKind::Assign(a)
        }
        StmtKind::FieldAssign(mut fa) => {
            fa.target = fold_expr(program, fa.target)?;
            fa.value = fold_expr(program, fa.value)?;
            StmtKind::FieldAssign(fa)
        }
        StmtKind::If(s) => StmtKind::If(fold_if(program, s)?),
        StmtKind::While(mut w) => {
            w.cond = fold_expr(program, w.cond)?;
            w.body = fold_block(program, w.body)?;
            StmtKind::While(w)
        }
        StmtKind::For(f) => StmtKind::For(fold_for(program, f)?),
        StmtKind::Break => StmtKind::Break,
        StmtKind::Expr(e) => StmtKind::Expr(fold_expr(program, e)?),
        StmtKind::Return(opt) => {
            StmtKind::Return(match opt {
                Some(e) => Some(fold_expr(program, e)?),
                None => None,
            })
        }
        // `Comptime` is handled by `fold_block` itself, never reached here.
        StmtKind::Comptime(_) => unreachable!("fold_block intercepts Comptime before calling fold_stmt_kind"),
        StmtKind::Defer(e) => StmtKind::Defer(fold_expr(program, e)?),
        StmtKind::Discard(e) => StmtKind::Discard(fold_expr(program, e)?),
        StmtKind::TypeDecl(t) => StmtKind::TypeDecl(t),
        StmtKind::Import(i) => StmtKind::Import(i),
    })
}

fn fold_if(program: &Program, mut s: IfStmt) -> ComptimeResult<IfStmt> {
    s.cond = fold_expr(program, s.cond)?;
    s.then_body = fold_block(program, s.then_body)?;
    let mut elifs = Vec::with_capacity(s.elifs.len());
    for (cond, body) in s.elifs {
        elifs.push((fold_expr(program, cond)?, fold_block(program, body)?));
    }
    s.elifs = elifs;
    s.else_body = match s.else_body {
        Some(body) => Some(fold_block(program, body)?),
        None => None,
    };
    Ok(s)
}

fn fold_for(program: &Program, mut f: ForStmt) -> ComptimeResult<ForStmt> {
    f.iterable = match f.iterable {
        ForIterable::Range { start, end, inclusive } => ForIterable::Range {
            start: fold_expr(program, start)?,
            end: fold_expr(program, end)?,
            inclusive,
        },
        ForIterable::Array(e) => ForIterable::Array(fold_expr(program, e)?),
    };
    f.body = fold_block(program, f.body)?;
    Ok(f)
}

/// Recursively fold `expr`'s subexpressions first, then apply operations 1
/// and 2 at this node: fold a pure call with all-literal int/bool
/// arguments to its result, or evaluate a `comptime(e)` node through a
/// fresh VM and splice in the literal it produced.
fn fold_expr(program: &Program, expr: Expr) -> ComptimeResult<Expr> {
    let pos = expr.pos.clone();
    let typ = expr.typ.clone();
    let kind = match expr.kind {
        ExprKind::Int(_)
        | ExprKind::Float(_)
        | ExprKind::Str(_)
        | ExprKind::Char(_)
        | ExprKind::Bool(_)
        | ExprKind::Nil
        | ExprKind::Var(_)
        | ExprKind::OptionNone => return Ok(Expr { pos, typ, kind: expr.kind }),

        ExprKind::Unary(mut u) => {
            u.operand = Box::new(fold_expr(program, *u.operand)?);
            ExprKind::Unary(u)
        }
        ExprKind::Binary(mut b) => {
            b.lhs = Box::new(fold_expr(program, *b.lhs)?);
            b.rhs = Box::new(fold_expr(program, *b.rhs)?);
            ExprKind::Binary(b)
        }
        ExprKind::Call(c) => return fold_call(program, c, pos, typ),
        ExprKind::NewRef(inner) => ExprKind::NewRef(Box::new(fold_expr(program, *inner)?)),
        ExprKind::Deref(inner) => ExprKind::Deref(Box::new(fold_expr(program, *inner)?)),
        ExprKind::Array(elems) => {
            let mut folded = Vec::with_capacity(elems.len());
            for e in elems {
                folded.push(fold_expr(program, e)?);
            }
            ExprKind::Array(folded)
        }
        ExprKind::Index(mut ix) => {
            ix.array = Box::new(fold_expr(program, *ix.array)?);
            ix.index = Box::new(fold_expr(program, *ix.index)?);
            ExprKind::Index(ix)
        }
        ExprKind::Slice(mut sl) => {
            sl.array = Box::new(fold_expr(program, *sl.array)?);
            sl.start = match sl.start {
                Some(e) => Some(Box::new(fold_expr(program, *e)?)),
                None => None,
            };
            sl.end = match sl.end {
                Some(e) => Some(Box::new(fold_expr(program, *e)?)),
                None => None,
            };
            ExprKind::Slice(sl)
        }
        ExprKind::ArrayLen(inner) => ExprKind::ArrayLen(Box::new(fold_expr(program, *inner)?)),
        ExprKind::Cast(mut c) => {
            c.operand = Box::new(fold_expr(program, *c.operand)?);
            ExprKind::Cast(c)
        }
        ExprKind::Comptime(c) => {
            let inner = fold_expr(program, *c.inner)?;
            let body = vec![Stmt::new(pos.clone(), StmtKind::Return(Some(inner)))];
            let (value, vm) = run_block(program, body, &pos)?;
            return value_to_literal(&value, vm.heap(), &pos);
        }
        ExprKind::If(mut i) => {
            i.cond = Box::new(fold_expr(program, *i.cond)?);
            i.then_branch = Box::new(fold_expr(program, *i.then_branch)?);
            i.else_branch = Box::new(fold_expr(program, *i.else_branch)?);
            ExprKind::If(i)
        }
        ExprKind::OptionSome(inner) => ExprKind::OptionSome(Box::new(fold_expr(program, *inner)?)),
        ExprKind::ResultOk(inner) => ExprKind::ResultOk(Box::new(fold_expr(program, *inner)?)),
        ExprKind::ResultErr(inner) => ExprKind::ResultErr(Box::new(fold_expr(program, *inner)?)),
        ExprKind::Match(mut m) => {
            m.scrutinee = Box::new(fold_expr(program, *m.scrutinee)?);
            let mut cases = Vec::with_capacity(m.cases.len());
            for mut case in m.cases {
                case.body = fold_expr(program, case.body)?;
                cases.push(case);
            }
            m.cases = cases;
            ExprKind::Match(m)
        }
    };
    Ok(Expr { pos, typ, kind })
}

/// Fold a call whose arguments have already been folded: if `c.fname`
/// names a pure function and every argument is now an int/bool literal,
/// replace the whole call with its evaluated result (spec.md §4.3
/// operation 1). Anything else is left as an (argument-folded) call.
fn fold_call(program: &Program, mut c: CallExpr, pos: etch_ast::Pos, typ: Option<Type>) -> ComptimeResult<Expr> {
    let mut folded_args = Vec::with_capacity(c.args.len());
    for a in c.args {
        folded_args.push(fold_expr(program, a)?);
    }
    c.args = folded_args;

    if etch_prove::is_pure_function(program, &c.fname) {
        if let Some(literal_args) = literal_int_args(&c.args) {
            if let Some(result) = etch_prove::eval_pure_call(program, &c.fname, &literal_args) {
                let kind = if matches!(typ, Some(Type::Bool)) {
                    ExprKind::Bool(result != 0)
                } else {
                    ExprKind::Int(result)
                };
                return Ok(Expr { pos, typ, kind });
            }
        }
    }

    Ok(Expr { pos, typ, kind: ExprKind::Call(c) })
}

fn literal_int_args(args: &[Expr]) -> Option<Vec<i64>> {
    args.iter()
        .map(|a| match &a.kind {
            ExprKind::Int(i) => Some(*i),
            ExprKind::Bool(b) => Some(*b as i64),
            _ => None,
        })
        .collect()
}

/// Finalize a `var` declared with `generic("__comptime_infer__")` by
/// reading the kind of its (now-folded) initializer (spec.md §4.3
/// operation 4). Left untouched if the initializer didn't fold down to a
/// literal — the second typecheck pass will report whatever is still
/// wrong.
fn finalize_comptime_infer(v: &mut VarStmt) {
    let is_deferred = matches!(&v.declared_type, Some(Type::Generic(name)) if name == COMPTIME_INFER);
    if !is_deferred {
        return;
    }
    if let Some(init) = &v.initializer {
        if let Some(t) = literal_kind_to_type(&init.kind) {
            v.declared_type = Some(t);
        }
    }
}

fn literal_kind_to_type(kind: &ExprKind) -> Option<Type> {
    match kind {
        ExprKind::Int(_) => Some(Type::Int),
        ExprKind::Float(_) => Some(Type::Float),
        ExprKind::Bool(_) => Some(Type::Bool),
        ExprKind::Char(_) => Some(Type::Char),
        ExprKind::Str(_) => Some(Type::String),
        ExprKind::Nil => Some(Type::nil()),
        ExprKind::Array(elems) => elems.first().and_then(|e| literal_kind_to_type(&e.kind)).map(Type::array),
        _ => None,
    }
}

/// Execute a `comptime { .. }` block's statements in a fresh VM and expand
/// it into the `var` declarations synthesized from its `inject(...)`
/// calls (spec.md §4.3 operation 3). Returns the (possibly empty)
/// replacement list for the block.
fn fold_comptime_block(program: &Program, block: Vec<Stmt>, pos: &etch_ast::Pos) -> ComptimeResult<Vec<Stmt>> {
    let folded = fold_block(program, block)?;

    let mut setup = Vec::with_capacity(folded.len());
    let mut injects: Vec<(String, Type, String)> = Vec::new();
    for (i, stmt) in folded.into_iter().enumerate() {
        let inject_call = match &stmt.kind {
            StmtKind::Expr(e) | StmtKind::Discard(e) => match &e.kind {
                ExprKind::Call(c) if c.fname == "inject" => Some(c.clone()),
                _ => None,
            },
            _ => None,
        };

        let Some(call) = inject_call else {
            setup.push(stmt);
            continue;
        };

        if call.args.len() != 3 {
            return Err(ComptimeError::NonLiteralInjectArgs(stmt.pos));
        }
        let name = match &call.args[0].kind {
            ExprKind::Str(s) => s.clone(),
            _ => return Err(ComptimeError::NonLiteralInjectArgs(stmt.pos)),
        };
        let type_name = match &call.args[1].kind {
            ExprKind::Str(s) => s.clone(),
            _ => return Err(ComptimeError::NonLiteralInjectArgs(stmt.pos)),
        };
        let ty = parse_type_name(&type_name).ok_or_else(|| ComptimeError::UnknownInjectedType(stmt.pos.clone(), type_name.clone()))?;

        let capture_name = format!("__inject_capture_{i}");
        setup.push(Stmt::new(
            stmt.pos.clone(),
            StmtKind::Var(VarStmt {
                name: capture_name.clone(),
                declared_type: None,
                initializer: Some(call.args[2].clone()),
                is_mutable: false,
            }),
        ));
        injects.push((name, ty, capture_name));
    }

    if injects.is_empty() {
        setup.push(Stmt::new(pos.clone(), StmtKind::Return(None)));
        run_block(program, setup, pos)?;
        return Ok(Vec::new());
    }

    let capture_vars: Vec<Expr> = injects
        .iter()
        .map(|(_, _, capture)| Expr::new(pos.clone(), ExprKind::Var(capture.clone())))
        .collect();
    setup.push(Stmt::new(
        pos.clone(),
        StmtKind::Return(Some(Expr::new(pos.clone(), ExprKind::Array(capture_vars)))),
    ));

    let (value, vm) = run_block(program, setup, pos)?;
    let elems = match value {
        etch_vm::Value::Array(idx) => match vm.heap().get(idx) {
            Ok(etch_vm::HeapObject::Array(elems)) => elems.clone(),
            _ => return Err(ComptimeError::UnrepresentableValue(pos.clone(), "comptime block result")),
        },
        _ => return Err(ComptimeError::UnrepresentableValue(pos.clone(), "comptime block result")),
    };

    let mut injected = Vec::with_capacity(injects.len());
    for ((name, ty, _), value) in injects.into_iter().zip(elems.iter()) {
        let literal = value_to_literal(value, vm.heap(), pos)?;
        injected.push(Stmt::new(
            pos.clone(),
            StmtKind::Var(VarStmt {
                name,
                declared_type: Some(ty),
                initializer: Some(literal),
                is_mutable: false,
            }),
        ));
    }
    Ok(injected)
}
