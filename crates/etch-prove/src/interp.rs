//! The abstract interpreter itself (spec.md §4.4): walks every monomorphic
//! function instance once, threading an [`Env`] of [`Info`] facts through
//! statements and expressions, and raising a [`ProveError`] the moment a
//! P1-P6 violation can be shown.
//!
//! Loops are executed symbolically up to `MAX_LOOP_ITERATIONS`, re-merging
//! the environment each pass until it reaches a fixed point; if it never
//! settles within the cap the loop's result is widened to [`Info::topify`]
//! rather than reported as a false violation. Calls are inlined up to
//! `MAX_RECURSION_DEPTH`, beyond which a call's result is treated as
//! unknown rather than walked further.

use rustc_hash::{FxHashMap, FxHashSet};

use etch_ast::{
    BinaryOp, CallExpr, Expr, ExprKind, ForIterable, ForStmt, FunDecl, IfStmt, MatchPattern, Pos, Program, Stmt, StmtKind, UnaryOp, WhileStmt,
};

use crate::error::{ProveError, ProveErrorKind, ProveResult};
use crate::eval;
use crate::info::Info;
use crate::purity::is_pure_function;

const MAX_LOOP_ITERATIONS: u32 = 1000;
const MAX_RECURSION_DEPTH: u32 = 32;

type Env = FxHashMap<String, Info>;

/// Prove every monomorphic function instance in `program` safe, aborting on
/// the first violation. Functions are visited in name order so that a
/// program's set of errors (were callers to fix them one at a time) is
/// deterministic across repeated runs.
pub fn prove_program(program: &Program) -> ProveResult<()> {
    let prover = Prover { program };
    let mut names: Vec<&String> = program.fun_instances.keys().collect();
    names.sort();
    for name in names {
        let decl = &program.fun_instances[name];
        prover.analyze_function(decl)?;
    }
    Ok(())
}

struct Prover<'a> {
    program: &'a Program,
}

impl<'a> Prover<'a> {
    fn analyze_function(&self, decl: &FunDecl) -> ProveResult<()> {
        let mut env = Env::default();
        for p in &decl.params {
            env.insert(p.name.clone(), Info::unknown());
        }
        self.check_block(&env, &decl.body, 0)?;
        Ok(())
    }

    fn check_block(&self, env: &Env, stmts: &[Stmt], depth: u32) -> ProveResult<Env> {
        let mut cur = env.clone();
        let mut returned = false;
        for stmt in stmts {
            if returned {
                return Err(self.err(ProveErrorKind::UnreachableCode, &stmt.pos, "statement follows an unconditional return".to_string()));
            }
            let (next, did_return) = self.check_stmt(&cur, stmt, depth)?;
            cur = next;
            returned = did_return;
        }
        Ok(cur)
    }

    fn check_stmt(&self, env: &Env, stmt: &Stmt, depth: u32) -> ProveResult<(Env, bool)> {
        match &stmt.kind {
            StmtKind::Var(v) => {
                let mut next = env.clone();
                let info = match &v.initializer {
                    Some(e) => self.eval_expr(&next, e, depth)?,
                    None => Info::uninitialized(),
                };
                next.insert(v.name.clone(), info);
                Ok((next, false))
            }
            StmtKind::Assign(a) => {
                let mut next = env.clone();
                let info = self.eval_expr(&next, &a.value, depth)?;
                next.insert(a.name.clone(), info);
                Ok((next, false))
            }
            StmtKind::FieldAssign(fa) => {
                self.eval_expr(env, &fa.target, depth)?;
                self.eval_expr(env, &fa.value, depth)?;
                Ok((env.clone(), false))
            }
            StmtKind::If(s) => Ok((self.check_if(env, s, depth)?, false)),
            StmtKind::While(w) => Ok((self.check_while(env, w, depth)?, false)),
            StmtKind::For(f) => Ok((self.check_for(env, f, depth)?, false)),
            StmtKind::Break => Ok((env.clone(), false)),
            StmtKind::Expr(e) | StmtKind::Discard(e) | StmtKind::Defer(e) => {
                self.eval_expr(env, e, depth)?;
                Ok((env.clone(), false))
            }
            StmtKind::Return(opt) => {
                if let Some(e) = opt {
                    self.eval_expr(env, e, depth)?;
                }
                Ok((env.clone(), true))
            }
            StmtKind::Comptime(body) => Ok((self.check_block(env, body, depth)?, false)),
            StmtKind::TypeDecl(_) | StmtKind::Import(_) => Ok((env.clone(), false)),
        }
    }

    fn check_if(&self, env: &Env, s: &IfStmt, depth: u32) -> ProveResult<Env> {
        self.eval_expr(env, &s.cond, depth)?;
        let mut branch_envs = vec![self.check_block(env, &s.then_body, depth)?];
        for (cond, body) in &s.elifs {
            self.eval_expr(env, cond, depth)?;
            branch_envs.push(self.check_block(env, body, depth)?);
        }
        let mut has_else = false;
        if let Some(else_body) = &s.else_body {
            branch_envs.push(self.check_block(env, else_body, depth)?);
            has_else = true;
        }
        if !has_else {
            branch_envs.push(env.clone());
        }
        Ok(merge_envs(branch_envs))
    }

    fn check_while(&self, env: &Env, w: &WhileStmt, depth: u32) -> ProveResult<Env> {
        let mut cur = env.clone();
        for _ in 0..MAX_LOOP_ITERATIONS {
            self.eval_expr(&cur, &w.cond, depth)?;
            let next = self.check_block(&cur, &w.body, depth)?;
            let merged = merge_envs(vec![cur.clone(), next]);
            if merged == cur {
                return Ok(merged);
            }
            cur = merged;
        }
        Ok(topify_env(&cur))
    }

    fn check_for(&self, env: &Env, f: &ForStmt, depth: u32) -> ProveResult<Env> {
        let mut base = env.clone();
        match &f.iterable {
            ForIterable::Range { start, end, inclusive } => {
                let start_info = self.eval_expr(env, start, depth)?;
                let end_info = self.eval_expr(env, end, depth)?;
                let maxv = if *inclusive { end_info.maxv } else { end_info.maxv.saturating_sub(1) };
                base.insert(f.var_name.clone(), Info { minv: start_info.minv, maxv, ..Info::unknown() });
            }
            ForIterable::Array(arr_expr) => {
                self.eval_expr(env, arr_expr, depth)?;
                base.insert(f.var_name.clone(), Info::unknown());
            }
        }
        let mut cur = base;
        for _ in 0..MAX_LOOP_ITERATIONS {
            let next = self.check_block(&cur, &f.body, depth)?;
            let merged = merge_envs(vec![cur.clone(), next]);
            if merged == cur {
                return Ok(merged);
            }
            cur = merged;
        }
        Ok(topify_env(&cur))
    }

    fn eval_expr(&self, env: &Env, expr: &Expr, depth: u32) -> ProveResult<Info> {
        let pos = &expr.pos;
        Ok(match &expr.kind {
            ExprKind::Int(i) => Info::constant(*i),
            ExprKind::Float(_) => Info::unknown(),
            ExprKind::Str(_) => Info::string_value(),
            ExprKind::Char(c) => Info::constant(*c as i64),
            ExprKind::Bool(b) => Info::bool_const(*b),
            ExprKind::Nil => Info::nilable_ref(),
            ExprKind::Var(name) => {
                let info = env.get(name).cloned().unwrap_or_else(Info::unknown);
                if !info.initialized {
                    return Err(self.err(ProveErrorKind::UninitializedUse, pos, format!("use of possibly-uninitialized variable `{name}`")));
                }
                info
            }
            ExprKind::Unary(u) => self.eval_unary(env, u.op, &u.operand, depth, pos)?,
            ExprKind::Binary(b) => {
                let l = self.eval_expr(env, &b.lhs, depth)?;
                let r = self.eval_expr(env, &b.rhs, depth)?;
                self.eval_binary(b.op, &l, &r, pos)?
            }
            ExprKind::Call(c) => self.eval_call(env, c, depth, pos)?,
            ExprKind::NewRef(inner) => {
                self.eval_expr(env, inner, depth)?;
                Info::non_nil_ref()
            }
            ExprKind::Deref(inner) => {
                let info = self.eval_expr(env, inner, depth)?;
                if !info.non_nil {
                    return Err(self.err(ProveErrorKind::NilDeref, pos, "dereference of a possibly-nil reference".to_string()));
                }
                Info::unknown()
            }
            ExprKind::Array(items) => {
                for it in items {
                    self.eval_expr(env, it, depth)?;
                }
                Info::array(Some(items.len() as i64))
            }
            ExprKind::Index(ix) => {
                let arr = self.eval_expr(env, &ix.array, depth)?;
                let idx = self.eval_expr(env, &ix.index, depth)?;
                if let Some(size) = arr.array_size {
                    let in_range = (idx.known && idx.cval >= 0 && idx.cval < size) || (!idx.known && idx.minv >= 0 && idx.maxv < size);
                    if !in_range {
                        return Err(self.err(ProveErrorKind::OutOfBounds, pos, format!("index may fall outside [0, {size})")));
                    }
                }
                Info::unknown()
            }
            ExprKind::Slice(sl) => {
                let arr = self.eval_expr(env, &sl.array, depth)?;
                if let Some(start) = &sl.start {
                    let s = self.eval_expr(env, start, depth)?;
                    self.check_slice_bound(&arr, &s, pos)?;
                }
                if let Some(end) = &sl.end {
                    let e = self.eval_expr(env, end, depth)?;
                    self.check_slice_bound(&arr, &e, pos)?;
                }
                Info::array(None)
            }
            ExprKind::ArrayLen(inner) => {
                let arr = self.eval_expr(env, inner, depth)?;
                match arr.array_size {
                    Some(n) => Info::constant(n),
                    None => Info { minv: 0, ..Info::unknown() },
                }
            }
            ExprKind::Cast(c) => {
                self.eval_expr(env, &c.operand, depth)?;
                Info::unknown()
            }
            ExprKind::Comptime(c) => self.eval_expr(env, &c.inner, depth)?,
            ExprKind::If(i) => {
                self.eval_expr(env, &i.cond, depth)?;
                let then_i = self.eval_expr(env, &i.then_branch, depth)?;
                let else_i = self.eval_expr(env, &i.else_branch, depth)?;
                then_i.union(&else_i)
            }
            ExprKind::OptionSome(inner) => {
                self.eval_expr(env, inner, depth)?;
                Info::non_nil_ref()
            }
            ExprKind::OptionNone => Info::nilable_ref(),
            ExprKind::ResultOk(inner) | ExprKind::ResultErr(inner) => {
                self.eval_expr(env, inner, depth)?;
                Info::non_nil_ref()
            }
            ExprKind::Match(m) => {
                self.eval_expr(env, &m.scrutinee, depth)?;
                let mut acc: Option<Info> = None;
                for case in &m.cases {
                    let mut case_env = env.clone();
                    match &case.pattern {
                        MatchPattern::OptionSome(name) | MatchPattern::ResultOk(name) | MatchPattern::ResultErr(name) => {
                            case_env.insert(name.clone(), Info::unknown());
                        }
                        MatchPattern::Literal(e) => {
                            self.eval_expr(env, e, depth)?;
                        }
                        MatchPattern::OptionNone | MatchPattern::Wildcard => {}
                    }
                    let v = self.eval_expr(&case_env, &case.body, depth)?;
                    acc = Some(match acc {
                        None => v,
                        Some(a) => a.union(&v),
                    });
                }
                acc.unwrap_or_else(Info::unknown)
            }
        })
    }

    fn eval_unary(&self, env: &Env, op: UnaryOp, operand: &Expr, depth: u32, pos: &Pos) -> ProveResult<Info> {
        let v = self.eval_expr(env, operand, depth)?;
        Ok(match op {
            UnaryOp::Neg => {
                if v.minv == i64::MIN {
                    return Err(self.err(ProveErrorKind::Overflow, pos, "negation of i64::MIN overflows".to_string()));
                }
                Info {
                    known: v.known,
                    cval: -v.cval,
                    minv: -v.maxv,
                    maxv: -v.minv,
                    non_zero: v.non_zero,
                    ..Info::unknown()
                }
            }
            UnaryOp::Not => {
                if v.known {
                    Info::bool_const(v.cval == 0)
                } else {
                    Info { is_bool: true, ..Info::unknown() }
                }
            }
        })
    }

    fn eval_binary(&self, op: BinaryOp, l: &Info, r: &Info, pos: &Pos) -> ProveResult<Info> {
        use BinaryOp::*;
        Ok(match op {
            Add => self.checked_add(l, r, pos)?,
            Sub => self.checked_sub(l, r, pos)?,
            Mul => self.checked_mul(l, r, pos)?,
            Div => {
                if r.could_be_zero() {
                    return Err(self.err(ProveErrorKind::DivideByZero, pos, "division by a value that could be zero".to_string()));
                }
                if l.known && r.known {
                    Info::constant(l.cval.checked_div(r.cval).unwrap_or(0))
                } else {
                    Info::unknown()
                }
            }
            Mod => {
                if r.could_be_zero() {
                    return Err(self.err(ProveErrorKind::DivideByZero, pos, "modulo by a value that could be zero".to_string()));
                }
                if l.known && r.known {
                    Info::constant(l.cval.checked_rem(r.cval).unwrap_or(0))
                } else {
                    Info::unknown()
                }
            }
            Eq | Ne | Lt | Le | Gt | Ge => {
                if l.known && r.known {
                    let b = match op {
                        Eq => l.cval == r.cval,
                        Ne => l.cval != r.cval,
                        Lt => l.cval < r.cval,
                        Le => l.cval <= r.cval,
                        Gt => l.cval > r.cval,
                        Ge => l.cval >= r.cval,
                        _ => unreachable!(),
                    };
                    Info::bool_const(b)
                } else {
                    Info { is_bool: true, ..Info::unknown() }
                }
            }
            And | Or => {
                if l.known && r.known {
                    let b = match op {
                        And => l.cval != 0 && r.cval != 0,
                        Or => l.cval != 0 || r.cval != 0,
                        _ => unreachable!(),
                    };
                    Info::bool_const(b)
                } else {
                    Info { is_bool: true, ..Info::unknown() }
                }
            }
        })
    }

    /// Only flag overflow when both operands are known constants, or their
    /// ranges are already narrow enough that the bound arithmetic itself
    /// can overflow — an operand left at the default unconstrained range
    /// (an ordinary parameter nothing has narrowed yet) never triggers this,
    /// or every function taking two `int` parameters and adding them would
    /// be rejected outright.
    fn checked_add(&self, l: &Info, r: &Info, pos: &Pos) -> ProveResult<Info> {
        if l.known && r.known {
            return match l.cval.checked_add(r.cval) {
                Some(v) => Ok(Info::constant(v)),
                None => Err(self.overflow(pos, "addition")),
            };
        }
        if l.is_unconstrained_range() || r.is_unconstrained_range() {
            return Ok(Info::unknown());
        }
        match (l.minv.checked_add(r.minv), l.maxv.checked_add(r.maxv)) {
            (Some(minv), Some(maxv)) => Ok(Info { minv, maxv, ..Info::unknown() }),
            _ => Err(self.overflow(pos, "addition")),
        }
    }

    fn checked_sub(&self, l: &Info, r: &Info, pos: &Pos) -> ProveResult<Info> {
        if l.known && r.known {
            return match l.cval.checked_sub(r.cval) {
                Some(v) => Ok(Info::constant(v)),
                None => Err(self.overflow(pos, "subtraction")),
            };
        }
        if l.is_unconstrained_range() || r.is_unconstrained_range() {
            return Ok(Info::unknown());
        }
        match (l.minv.checked_sub(r.maxv), l.maxv.checked_sub(r.minv)) {
            (Some(minv), Some(maxv)) => Ok(Info { minv, maxv, ..Info::unknown() }),
            _ => Err(self.overflow(pos, "subtraction")),
        }
    }

    fn checked_mul(&self, l: &Info, r: &Info, pos: &Pos) -> ProveResult<Info> {
        if l.known && r.known {
            return match l.cval.checked_mul(r.cval) {
                Some(v) => Ok(Info::constant(v)),
                None => Err(self.overflow(pos, "multiplication")),
            };
        }
        if l.is_unconstrained_range() || r.is_unconstrained_range() {
            return Ok(Info::unknown());
        }
        let combos = [
            l.minv.checked_mul(r.minv),
            l.minv.checked_mul(r.maxv),
            l.maxv.checked_mul(r.minv),
            l.maxv.checked_mul(r.maxv),
        ];
        if combos.iter().any(|c| c.is_none()) {
            return Err(self.overflow(pos, "multiplication"));
        }
        let vals: Vec<i64> = combos.into_iter().map(|c| c.unwrap()).collect();
        Ok(Info {
            minv: *vals.iter().min().unwrap(),
            maxv: *vals.iter().max().unwrap(),
            ..Info::unknown()
        })
    }

    fn check_slice_bound(&self, arr: &Info, bound: &Info, pos: &Pos) -> ProveResult<()> {
        if let Some(size) = arr.array_size {
            let ok = (bound.known && bound.cval >= 0 && bound.cval <= size) || (!bound.known && bound.minv >= 0 && bound.maxv <= size);
            if !ok {
                return Err(self.err(ProveErrorKind::OutOfBounds, pos, format!("slice bound may fall outside [0, {size}]")));
            }
        }
        Ok(())
    }

    fn eval_call(&self, env: &Env, c: &CallExpr, depth: u32, pos: &Pos) -> ProveResult<Info> {
        let mut arg_infos = Vec::with_capacity(c.args.len());
        for a in &c.args {
            arg_infos.push(self.eval_expr(env, a, depth)?);
        }

        match c.fname.as_str() {
            "print" | "println" | "seed" | "readFile" | "toString" | "parseInt" | "inject" => return Ok(Info::unknown()),
            "rand" => {
                // Unsound-by-design over-approximation (spec §9): the
                // prover treats the result as the known constant upper
                // bound argument, not as a genuinely random value.
                return Ok(if !arg_infos.is_empty() && arg_infos[0].known {
                    Info::constant(arg_infos[0].cval)
                } else {
                    Info::unknown()
                });
            }
            "new" => return Ok(Info::non_nil_ref()),
            "deref" => {
                if arg_infos.is_empty() || !arg_infos[0].non_nil {
                    return Err(self.err(ProveErrorKind::NilDeref, pos, "deref() of a possibly-nil reference".to_string()));
                }
                return Ok(Info::unknown());
            }
            "assumeNonZero" => {
                let mut i = arg_infos.into_iter().next().unwrap_or_else(Info::unknown);
                i.non_zero = true;
                return Ok(i);
            }
            "assumeNonNil" => {
                let mut i = arg_infos.into_iter().next().unwrap_or_else(Info::unknown);
                i.non_nil = true;
                return Ok(i);
            }
            _ => {}
        }

        if let Some(decl) = self.program.fun_instances.get(&c.fname) {
            if depth + 1 > MAX_RECURSION_DEPTH {
                return Ok(Info::unknown());
            }
            if !arg_infos.is_empty() && arg_infos.iter().all(|i| i.known) && is_pure_function(self.program, &c.fname) {
                let raw_args: Vec<i64> = arg_infos.iter().map(|i| i.cval).collect();
                if let Some(v) = eval::eval_pure_call(self.program, &c.fname, &raw_args) {
                    return Ok(Info::constant(v));
                }
            }
            let mut callee_env = Env::default();
            for (p, a) in decl.params.iter().zip(arg_infos.iter()) {
                callee_env.insert(p.name.clone(), a.clone());
            }
            self.check_block(&callee_env, &decl.body, depth + 1)?;
            return Ok(Info::unknown());
        }

        Ok(Info::unknown())
    }

    fn overflow(&self, pos: &Pos, op: &str) -> ProveError {
        self.err(ProveErrorKind::Overflow, pos, format!("{op} cannot be shown to fit in a 64-bit integer"))
    }

    fn err(&self, kind: ProveErrorKind, pos: &Pos, message: String) -> ProveError {
        ProveError { kind, pos: pos.clone(), message }
    }
}

fn merge_envs(envs: Vec<Env>) -> Env {
    if envs.is_empty() {
        return Env::default();
    }
    let mut keys: FxHashSet<String> = FxHashSet::default();
    for e in &envs {
        keys.extend(e.keys().cloned());
    }
    let mut out = Env::default();
    for k in keys {
        let mut acc: Option<Info> = None;
        for e in &envs {
            let info = e.get(&k).cloned().unwrap_or_else(Info::uninitialized);
            acc = Some(match acc {
                None => info,
                Some(a) => a.union(&info),
            });
        }
        out.insert(k, acc.unwrap());
    }
    out
}

fn topify_env(env: &Env) -> Env {
    env.iter().map(|(k, v)| (k.clone(), v.topify())).collect()
}
