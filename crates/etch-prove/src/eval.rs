//! Bounded compile-time evaluator for pure, `int`/`bool`-only function
//! bodies (spec.md §4.4 last paragraph). Shared by the prover's call
//! handling (to get an exact result for a call whose arguments are all
//! known constants, instead of falling back to "unknown") and by the
//! comptime folder (to fold a call to a literal without needing a VM).
//!
//! Only a small, straight-line/branch/bounded-while subset of the language
//! is modeled: any construct outside it (arrays, floats, strings, refs,
//! casts, match, an impure builtin) makes evaluation bail out with `None`
//! ("cannot evaluate") rather than guess.

use rustc_hash::FxHashMap;

use etch_ast::{BinaryOp, Expr, ExprKind, Program, Stmt, StmtKind, UnaryOp};

const MAX_EVAL_RECURSION: u32 = 32;
const MAX_EVAL_LOOP_ITERATIONS: u32 = 1000;

/// Evaluate a call to `fname` with concrete `args`, returning the function's
/// `i64` result, or `None` if the body falls outside the evaluable subset.
pub fn eval_pure_call(program: &Program, fname: &str, args: &[i64]) -> Option<i64> {
    eval_call(program, fname, args, 0)
}

fn lookup<'a>(program: &'a Program, fname: &str) -> Option<&'a etch_ast::FunDecl> {
    program
        .fun_instances
        .get(fname)
        .or_else(|| program.funs.get(fname).and_then(|v| v.first()))
}

fn eval_call(program: &Program, fname: &str, args: &[i64], depth: u32) -> Option<i64> {
    if depth > MAX_EVAL_RECURSION {
        return None;
    }
    let decl = lookup(program, fname)?;
    if decl.params.len() != args.len() {
        return None;
    }
    let mut env: FxHashMap<String, i64> = FxHashMap::default();
    for (p, a) in decl.params.iter().zip(args) {
        env.insert(p.name.clone(), *a);
    }
    exec_block(program, &decl.body, &mut env, depth)
}

/// `Some(v)` if a `return` was reached; `None` if the block fell through
/// (callers of `eval_pure_call` always want an explicit result, so falling
/// off the end of a body counts as "cannot evaluate" here) or a construct
/// outside the evaluable subset was hit.
fn exec_block(program: &Program, stmts: &[Stmt], env: &mut FxHashMap<String, i64>, depth: u32) -> Option<i64> {
    for stmt in stmts {
        match &stmt.kind {
            StmtKind::Var(v) => {
                let val = match &v.initializer {
                    Some(e) => eval_expr(program, env, e, depth)?,
                    None => 0,
                };
                env.insert(v.name.clone(), val);
            }
            StmtKind::Assign(a) => {
                let val = eval_expr(program, env, &a.value, depth)?;
                env.insert(a.name.clone(), val);
            }
            StmtKind::If(s) => {
                let c = eval_expr(program, env, &s.cond, depth)?;
                if c != 0 {
                    if let Some(v) = exec_block(program, &s.then_body, env, depth) {
                        return Some(v);
                    }
                    continue;
                }
                let mut matched = false;
                for (cond, body) in &s.elifs {
                    let cv = eval_expr(program, env, cond, depth)?;
                    if cv != 0 {
                        matched = true;
                        if let Some(v) = exec_block(program, body, env, depth) {
                            return Some(v);
                        }
                        break;
                    }
                }
                if !matched {
                    if let Some(else_body) = &s.else_body {
                        if let Some(v) = exec_block(program, else_body, env, depth) {
                            return Some(v);
                        }
                    }
                }
            }
            StmtKind::While(w) => {
                let mut iterations = 0u32;
                loop {
                    let c = eval_expr(program, env, &w.cond, depth)?;
                    if c == 0 {
                        break;
                    }
                    iterations += 1;
                    if iterations > MAX_EVAL_LOOP_ITERATIONS {
                        return None;
                    }
                    if let Some(v) = exec_block(program, &w.body, env, depth) {
                        return Some(v);
                    }
                }
            }
            StmtKind::Return(opt) => {
                return match opt {
                    Some(e) => eval_expr(program, env, e, depth),
                    None => Some(0),
                };
            }
            StmtKind::Expr(e) | StmtKind::Discard(e) => {
                eval_expr(program, env, e, depth)?;
            }
            // Arrays, refs, defers, for-loops, nested type/comptime
            // declarations: outside the evaluable subset.
            _ => return None,
        }
    }
    None
}

fn eval_expr(program: &Program, env: &FxHashMap<String, i64>, expr: &Expr, depth: u32) -> Option<i64> {
    match &expr.kind {
        ExprKind::Int(i) => Some(*i),
        ExprKind::Bool(b) => Some(*b as i64),
        ExprKind::Var(name) => env.get(name).copied(),
        ExprKind::Unary(u) => {
            let v = eval_expr(program, env, &u.operand, depth)?;
            match u.op {
                UnaryOp::Neg => v.checked_neg(),
                UnaryOp::Not => Some((v == 0) as i64),
            }
        }
        ExprKind::Binary(b) => {
            let l = eval_expr(program, env, &b.lhs, depth)?;
            let r = eval_expr(program, env, &b.rhs, depth)?;
            eval_binary(b.op, l, r)
        }
        ExprKind::Call(c) => {
            let mut args = Vec::with_capacity(c.args.len());
            for a in &c.args {
                args.push(eval_expr(program, env, a, depth)?);
            }
            eval_call(program, &c.fname, &args, depth + 1)
        }
        ExprKind::If(i) => {
            let c = eval_expr(program, env, &i.cond, depth)?;
            if c != 0 {
                eval_expr(program, env, &i.then_branch, depth)
            } else {
                eval_expr(program, env, &i.else_branch, depth)
            }
        }
        // Float/Str/Char/Nil/Array/Index/Slice/ArrayLen/Cast/NewRef/Deref/
        // Comptime/Option/Result/Match: outside the int64 subset.
        _ => None,
    }
}

fn eval_binary(op: BinaryOp, l: i64, r: i64) -> Option<i64> {
    use BinaryOp::*;
    Some(match op {
        Add => l.checked_add(r)?,
        Sub => l.checked_sub(r)?,
        Mul => l.checked_mul(r)?,
        Div => {
            if r == 0 {
                return None;
            }
            l.checked_div(r)?
        }
        Mod => {
            if r == 0 {
                return None;
            }
            l.checked_rem(r)?
        }
        Eq => (l == r) as i64,
        Ne => (l != r) as i64,
        Lt => (l < r) as i64,
        Le => (l <= r) as i64,
        Gt => (l > r) as i64,
        Ge => (l >= r) as i64,
        And => ((l != 0) && (r != 0)) as i64,
        Or => ((l != 0) || (r != 0)) as i64,
    })
}
