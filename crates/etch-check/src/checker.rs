//! The type checker and generic monomorphizer (spec.md §4.2).
//!
//! Unlike a language-server checker, which accumulates diagnostics and
//! keeps going so it always has something to show, Etch's contract is
//! fail-fast: the first rule violation aborts typechecking and no
//! partially-typed AST is ever handed to the comptime folder or prover.
//! Every fallible method here returns `CheckResult<T>` and is driven with
//! `?` rather than pushed onto an error list.

use rustc_hash::{FxHashMap, FxHashSet};

use etch_ast::{
    mangle_instance_key, BinaryExpr, BinaryOp, CallExpr, CastExpr, Concept, Expr, ExprKind,
    ForIterable, ForStmt, FunDecl, IfExpr, IfStmt, MatchExpr, MatchPattern, Pos, Program, Stmt,
    StmtKind, Type, TypeDef, UnaryExpr, UnaryOp, WhileStmt,
};

use crate::builtin;
use crate::error::{CheckError, CheckResult};
use crate::scope::{Mutability, ScopeStack};
use crate::subst;
use crate::unify::unify;

/// Typechecks and monomorphizes an entire program in place: fills
/// `expr.typ` on every reachable expression, rewrites each generic call's
/// `fname` to its mangled instance key, and populates
/// `program.fun_instances`. Every declared non-generic function is checked
/// eagerly whether or not it is called; generic templates are only
/// instantiated on demand, at the call sites that need them, since there is
/// no concrete type to check a template body against in isolation.
pub fn check_program(program: &mut Program) -> CheckResult<()> {
    let mut checker = TypeChecker {
        templates: program.funs.clone(),
        types: program.types.clone(),
        concepts: program.concepts.clone(),
        instances: FxHashMap::default(),
        scopes: ScopeStack::new(),
        current_return_decl: None,
        returns: Vec::new(),
    };

    let mut names: Vec<String> = checker.templates.keys().cloned().collect();
    names.sort();
    for name in names {
        let decls = checker.templates.get(&name).cloned().unwrap_or_default();
        for decl in decls {
            if !decl.is_generic() {
                checker.instantiate(&decl, FxHashMap::default())?;
            }
        }
    }

    for g in &mut program.globals {
        checker.check_global(g)?;
    }

    program.fun_instances = checker.instances;
    Ok(())
}

struct TypeChecker {
    /// Read-only snapshot of every declared function, by name (overload
    /// groups). The source of truth for call-resolution candidates; never
    /// mutated after construction.
    templates: FxHashMap<String, Vec<FunDecl>>,
    types: FxHashMap<String, TypeDef>,
    concepts: FxHashMap<String, Concept>,
    /// Concretely-typed function bodies, keyed by mangled instance key
    /// (bare name when there are no type arguments). Built up lazily as
    /// functions are actually needed.
    instances: FxHashMap<String, FunDecl>,
    scopes: ScopeStack,
    /// `None` while inside a function whose return type is still being
    /// inferred; `Some(t)` while checking a function that declared `-> t`.
    current_return_decl: Option<Type>,
    returns: Vec<(Type, Pos)>,
}

impl TypeChecker {
    fn check_global(&mut self, stmt: &mut Stmt) -> CheckResult<()> {
        self.check_stmt(stmt)
    }

    /// Checks and monomorphizes a single function body against concrete
    /// parameter/return types already substituted in by the caller.
    /// Returns the (possibly inferred) return type and also writes it back
    /// into `decl.declared_return`.
    fn check_function(&mut self, decl: &mut FunDecl) -> CheckResult<Type> {
        self.scopes.push();

        for p in decl.params.iter_mut() {
            if let Some(default) = &mut p.default_value {
                let t = self.check_expr(default)?;
                if t != p.ty {
                    return Err(CheckError::TypeMismatch {
                        expected: p.ty.to_string(),
                        actual: t.to_string(),
                        pos: decl.pos.clone(),
                    });
                }
            }
            self.scopes.declare(p.name.clone(), p.ty.clone(), Mutability::Let);
        }

        let saved_declared = std::mem::replace(&mut self.current_return_decl, decl.declared_return.clone());
        let saved_returns = std::mem::take(&mut self.returns);

        let body_result = (|| -> CheckResult<()> {
            for s in decl.body.iter_mut() {
                self.check_stmt(s)?;
            }
            Ok(())
        })();

        let returns = std::mem::replace(&mut self.returns, saved_returns);
        self.current_return_decl = saved_declared;
        self.scopes.pop();
        body_result?;

        let inferred = finalize_return_type(&decl.declared_return, &returns)?;
        decl.declared_return = Some(inferred.clone());
        Ok(inferred)
    }

    /// Resolves (and, for generic templates, monomorphizes) a function
    /// call target named `decl.name` bound to `bindings`. Memoized by
    /// mangled instance key so repeat calls to the same instantiation, and
    /// recursive calls within the function being instantiated, reuse the
    /// same entry rather than looping forever.
    fn instantiate(&mut self, decl: &FunDecl, bindings: FxHashMap<String, Type>) -> CheckResult<(String, Type)> {
        let mut type_args = Vec::with_capacity(decl.typarams.len());
        for tp in &decl.typarams {
            let bound_ty = bindings.get(&tp.name).cloned().ok_or_else(|| CheckError::UnresolvedTypeParam {
                name: tp.name.clone(),
                pos: decl.pos.clone(),
            })?;
            type_args.push(bound_ty);
        }
        let key = mangle_instance_key(&decl.name, &type_args);

        if let Some(existing) = self.instances.get(&key) {
            return Ok((key, existing.declared_return.clone().unwrap_or(Type::Void)));
        }

        for tp in &decl.typarams {
            if let Some(bound_name) = &tp.bound {
                let bound_ty = bindings.get(&tp.name).expect("resolved above");
                let concept = *self.concepts.get(bound_name).ok_or_else(|| CheckError::UnknownConcept {
                    name: bound_name.clone(),
                    pos: decl.pos.clone(),
                })?;
                if !concept.is_satisfied_by(bound_ty) {
                    return Err(CheckError::ConceptViolation {
                        name: tp.name.clone(),
                        actual: bound_ty.to_string(),
                        concept: bound_name.clone(),
                        pos: decl.pos.clone(),
                    });
                }
            }
        }

        let mut mono = decl.clone();
        mono.typarams = Vec::new();
        mono.name = key.clone();
        for p in mono.params.iter_mut() {
            p.ty = p.ty.resolve(&bindings);
        }
        mono.declared_return = mono.declared_return.as_ref().map(|t| t.resolve(&bindings));
        subst::substitute_stmts(&mut mono.body, &bindings);

        // Insert a placeholder before checking the body so a recursive call
        // back to this same instantiation finds an entry instead of
        // re-deriving (and re-monomorphizing) it forever.
        self.instances.insert(key.clone(), mono.clone());
        let inferred = self.check_function(&mut mono)?;
        self.instances.insert(key.clone(), mono);
        Ok((key, inferred))
    }

    /// A `comptime { .. }` block's own declarations are local to it (the
    /// comptime folder replaces the whole node with whatever it injects),
    /// but names it `inject(...)`s are meant to be visible to the code
    /// that follows — before the folder has actually run. So before the
    /// block's statements are checked in their own scope, scan its
    /// top-level calls for `inject("name", "type", ..)` and forward-declare
    /// each one into the *surrounding* scope, one level up from the block's
    /// own (spec.md §8 S5: `comptime { inject(...); }` followed by code
    /// that reads the injected name, typechecking in one pass).
    fn check_comptime_block(&mut self, body: &mut [Stmt]) -> CheckResult<()> {
        for stmt in body.iter() {
            if let Some((name, ty)) = inject_signature(stmt) {
                self.scopes.declare(name, ty, Mutability::Let);
            }
        }
        self.check_block(body)
    }

    fn check_block(&mut self, body: &mut [Stmt]) -> CheckResult<()> {
        self.scopes.push();
        let result = (|| -> CheckResult<()> {
            for s in body.iter_mut() {
                self.check_stmt(s)?;
            }
            Ok(())
        })();
        self.scopes.pop();
        result
    }

    fn check_stmt(&mut self, stmt: &mut Stmt) -> CheckResult<()> {
        let pos = stmt.pos.clone();
        match &mut stmt.kind {
            StmtKind::Var(v) => {
                let init_ty = match &mut v.initializer {
                    Some(init) => Some(self.check_expr(init)?),
                    None => None,
                };
                let final_ty = match (&v.declared_type, &init_ty) {
                    (Some(d), Some(i)) => {
                        if d != i {
                            return Err(CheckError::TypeMismatch {
                                expected: d.to_string(),
                                actual: i.to_string(),
                                pos,
                            });
                        }
                        d.clone()
                    }
                    (Some(d), None) => d.clone(),
                    (None, Some(i)) => i.clone(),
                    (None, None) => Type::Void,
                };
                v.declared_type = Some(final_ty.clone());
                self.scopes.declare(
                    v.name.clone(),
                    final_ty,
                    if v.is_mutable { Mutability::Var } else { Mutability::Let },
                );
                Ok(())
            }
            StmtKind::Assign(a) => {
                let value_ty = self.check_expr(&mut a.value)?;
                let (target_ty, mutability) = self
                    .scopes
                    .lookup(&a.name)
                    .cloned()
                    .ok_or_else(|| CheckError::UndeclaredVariable { name: a.name.clone(), pos: pos.clone() })?;
                if !mutability.is_mutable() {
                    return Err(CheckError::AssignToImmutable { name: a.name.clone(), pos });
                }
                if target_ty != value_ty {
                    return Err(CheckError::TypeMismatch {
                        expected: target_ty.to_string(),
                        actual: value_ty.to_string(),
                        pos,
                    });
                }
                Ok(())
            }
            StmtKind::FieldAssign(fa) => {
                let target_ty = self.check_expr(&mut fa.target)?;
                let field_ty = self.field_type(&target_ty, &fa.field, &pos)?;
                let value_ty = self.check_expr(&mut fa.value)?;
                if field_ty != value_ty {
                    return Err(CheckError::TypeMismatch {
                        expected: field_ty.to_string(),
                        actual: value_ty.to_string(),
                        pos,
                    });
                }
                Ok(())
            }
            StmtKind::If(s) => self.check_if(s, &pos),
            StmtKind::While(w) => self.check_while(w, &pos),
            StmtKind::For(f) => self.check_for(f, &pos),
            StmtKind::Break => Ok(()),
            StmtKind::Expr(e) => {
                self.check_expr(e)?;
                Ok(())
            }
            StmtKind::Return(opt) => {
                let ty = match opt {
                    Some(e) => self.check_expr(e)?,
                    None => Type::Void,
                };
                if let Some(declared) = self.current_return_decl.clone() {
                    if declared != ty {
                        return Err(CheckError::TypeMismatch {
                            expected: declared.to_string(),
                            actual: ty.to_string(),
                            pos: pos.clone(),
                        });
                    }
                }
                self.returns.push((ty, pos));
                Ok(())
            }
            StmtKind::Comptime(body) => self.check_comptime_block(body),
            StmtKind::Defer(e) | StmtKind::Discard(e) => {
                self.check_expr(e)?;
                Ok(())
            }
            StmtKind::TypeDecl(_) => Ok(()),
            StmtKind::Import(_) => Ok(()),
        }
    }

    fn check_if(&mut self, s: &mut IfStmt, pos: &Pos) -> CheckResult<()> {
        let c = self.check_expr(&mut s.cond)?;
        if c != Type::Bool {
            return Err(CheckError::NonBoolCondition { actual: c.to_string(), pos: pos.clone() });
        }
        self.check_block(&mut s.then_body)?;
        for (cond, body) in s.elifs.iter_mut() {
            let ct = self.check_expr(cond)?;
            if ct != Type::Bool {
                return Err(CheckError::NonBoolCondition { actual: ct.to_string(), pos: pos.clone() });
            }
            self.check_block(body)?;
        }
        if let Some(else_body) = &mut s.else_body {
            self.check_block(else_body)?;
        }
        Ok(())
    }

    fn check_while(&mut self, w: &mut WhileStmt, pos: &Pos) -> CheckResult<()> {
        let c = self.check_expr(&mut w.cond)?;
        if c != Type::Bool {
            return Err(CheckError::NonBoolCondition { actual: c.to_string(), pos: pos.clone() });
        }
        self.check_block(&mut w.body)
    }

    fn check_for(&mut self, f: &mut ForStmt, pos: &Pos) -> CheckResult<()> {
        self.scopes.push();
        let result = (|| -> CheckResult<()> {
            match &mut f.iterable {
                ForIterable::Range { start, end, .. } => {
                    let st = self.check_expr(start)?;
                    let et = self.check_expr(end)?;
                    if st != Type::Int || et != Type::Int {
                        return Err(CheckError::TypeMismatch {
                            expected: Type::Int.to_string(),
                            actual: if st != Type::Int { st.to_string() } else { et.to_string() },
                            pos: pos.clone(),
                        });
                    }
                    self.scopes.declare(f.var_name.clone(), Type::Int, Mutability::Let);
                }
                ForIterable::Array(arr_expr) => {
                    let at = self.check_expr(arr_expr)?;
                    let elem = at
                        .element_type()
                        .cloned()
                        .ok_or_else(|| CheckError::NotIndexable { actual: at.to_string(), pos: pos.clone() })?;
                    self.scopes.declare(f.var_name.clone(), elem, Mutability::Let);
                }
            }
            for s in f.body.iter_mut() {
                self.check_stmt(s)?;
            }
            Ok(())
        })();
        self.scopes.pop();
        result
    }

    fn field_type(&self, target_ty: &Type, field: &str, pos: &Pos) -> CheckResult<Type> {
        let name = match target_ty {
            Type::UserDefined(n) => n,
            _ => {
                return Err(CheckError::UnknownField {
                    ty: target_ty.to_string(),
                    field: field.to_string(),
                    pos: pos.clone(),
                })
            }
        };
        let def = self
            .types
            .get(name)
            .ok_or_else(|| CheckError::UnknownType { name: name.clone(), pos: pos.clone() })?;
        def.field(field).cloned().ok_or_else(|| CheckError::UnknownField {
            ty: target_ty.to_string(),
            field: field.to_string(),
            pos: pos.clone(),
        })
    }

    fn check_expr(&mut self, expr: &mut Expr) -> CheckResult<Type> {
        let pos = expr.pos.clone();
        let ty = match &mut expr.kind {
            ExprKind::Int(_) => Type::Int,
            ExprKind::Float(_) => Type::Float,
            ExprKind::Str(_) => Type::String,
            ExprKind::Char(_) => Type::Char,
            ExprKind::Bool(_) => Type::Bool,
            ExprKind::Nil => Type::nil(),
            ExprKind::Var(name) => {
                if name == etch_ast::COMPTIME_INFER {
                    Type::Inferred
                } else {
                    let (ty, _) = self
                        .scopes
                        .lookup(name)
                        .cloned()
                        .ok_or_else(|| CheckError::UndeclaredVariable { name: name.clone(), pos: pos.clone() })?;
                    ty
                }
            }
            ExprKind::Unary(u) => self.check_unary(u, &pos)?,
            ExprKind::Binary(b) => self.check_binary(b, &pos)?,
            ExprKind::Call(c) => self.resolve_call(c, &pos)?,
            ExprKind::NewRef(inner) => {
                let t = self.check_expr(inner)?;
                Type::reference(t)
            }
            ExprKind::Deref(inner) => {
                let t = self.check_expr(inner)?;
                t.deref_type()
                    .cloned()
                    .ok_or_else(|| CheckError::NotDerefable { actual: t.to_string(), pos: pos.clone() })?
            }
            ExprKind::Array(items) => {
                let mut elem_ty: Option<Type> = None;
                for item in items.iter_mut() {
                    let t = self.check_expr(item)?;
                    match &elem_ty {
                        None => elem_ty = Some(t),
                        Some(e) if *e == t => {}
                        Some(e) => {
                            return Err(CheckError::TypeMismatch {
                                expected: e.to_string(),
                                actual: t.to_string(),
                                pos: pos.clone(),
                            })
                        }
                    }
                }
                Type::array(elem_ty.unwrap_or(Type::Void))
            }
            ExprKind::Index(ix) => {
                let arr_ty = self.check_expr(&mut ix.array)?;
                let idx_ty = self.check_expr(&mut ix.index)?;
                if idx_ty != Type::Int {
                    return Err(CheckError::BadIndexType { actual: idx_ty.to_string(), pos: pos.clone() });
                }
                arr_ty
                    .element_type()
                    .cloned()
                    .ok_or_else(|| CheckError::NotIndexable { actual: arr_ty.to_string(), pos: pos.clone() })?
            }
            ExprKind::Slice(sl) => {
                let arr_ty = self.check_expr(&mut sl.array)?;
                if arr_ty.element_type().is_none() {
                    return Err(CheckError::NotIndexable { actual: arr_ty.to_string(), pos: pos.clone() });
                }
                if let Some(s) = &mut sl.start {
                    let t = self.check_expr(s)?;
                    if t != Type::Int {
                        return Err(CheckError::BadIndexType { actual: t.to_string(), pos: pos.clone() });
                    }
                }
                if let Some(e) = &mut sl.end {
                    let t = self.check_expr(e)?;
                    if t != Type::Int {
                        return Err(CheckError::BadIndexType { actual: t.to_string(), pos: pos.clone() });
                    }
                }
                arr_ty
            }
            ExprKind::ArrayLen(inner) => {
                let t = self.check_expr(inner)?;
                if t.element_type().is_none() && t != Type::String {
                    return Err(CheckError::NotLengthable { actual: t.to_string(), pos: pos.clone() });
                }
                Type::Int
            }
            ExprKind::Cast(c) => self.check_cast(c, &pos)?,
            ExprKind::Comptime(ce) => self.check_expr(&mut ce.inner)?,
            ExprKind::If(ife) => self.check_if_expr(ife, &pos)?,
            ExprKind::OptionSome(inner) => Type::Option(Box::new(self.check_expr(inner)?)),
            ExprKind::OptionNone => Type::Option(Box::new(Type::Inferred)),
            ExprKind::ResultOk(inner) => Type::Result(Box::new(self.check_expr(inner)?), Box::new(Type::Inferred)),
            ExprKind::ResultErr(inner) => {
                Type::Result(Box::new(Type::Inferred), Box::new(self.check_expr(inner)?))
            }
            ExprKind::Match(m) => self.check_match(m, &pos)?,
        };
        expr.typ = Some(ty.clone());
        Ok(ty)
    }

    fn check_unary(&mut self, u: &mut UnaryExpr, pos: &Pos) -> CheckResult<Type> {
        let operand_ty = self.check_expr(&mut u.operand)?;
        match u.op {
            UnaryOp::Neg => {
                if operand_ty.is_numeric() {
                    Ok(operand_ty)
                } else {
                    Err(CheckError::InvalidUnaryOperand { op: "-", operand: operand_ty.to_string(), pos: pos.clone() })
                }
            }
            UnaryOp::Not => {
                if operand_ty == Type::Bool {
                    Ok(Type::Bool)
                } else {
                    Err(CheckError::InvalidUnaryOperand { op: "!", operand: operand_ty.to_string(), pos: pos.clone() })
                }
            }
        }
    }

    fn check_binary(&mut self, b: &mut BinaryExpr, pos: &Pos) -> CheckResult<Type> {
        let lhs = self.check_expr(&mut b.lhs)?;
        let rhs = self.check_expr(&mut b.rhs)?;
        let op = b.op;
        let mismatch = |op: BinaryOp, lhs: &Type, rhs: &Type, pos: &Pos| CheckError::InvalidBinaryOperands {
            op: op_symbol(op),
            lhs: lhs.to_string(),
            rhs: rhs.to_string(),
            pos: pos.clone(),
        };
        match op {
            BinaryOp::Add => {
                let concatable = lhs == Type::String || lhs.element_type().is_some();
                if lhs == rhs && (lhs.is_numeric() || concatable) {
                    Ok(lhs)
                } else {
                    Err(mismatch(op, &lhs, &rhs, pos))
                }
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if lhs == rhs && lhs.is_numeric() {
                    Ok(lhs)
                } else {
                    Err(mismatch(op, &lhs, &rhs, pos))
                }
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let nil_vs_ref = (lhs.is_nil_type() && rhs.is_ref()) || (rhs.is_nil_type() && lhs.is_ref());
                if lhs == rhs || nil_vs_ref {
                    Ok(Type::Bool)
                } else {
                    Err(mismatch(op, &lhs, &rhs, pos))
                }
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                if lhs == rhs && lhs.is_numeric() {
                    Ok(Type::Bool)
                } else {
                    Err(mismatch(op, &lhs, &rhs, pos))
                }
            }
            BinaryOp::And | BinaryOp::Or => {
                if lhs == Type::Bool && rhs == Type::Bool {
                    Ok(Type::Bool)
                } else {
                    Err(mismatch(op, &lhs, &rhs, pos))
                }
            }
        }
    }

    fn check_cast(&mut self, c: &mut CastExpr, pos: &Pos) -> CheckResult<Type> {
        let from = self.check_expr(&mut c.operand)?;
        let allowed = matches!(
            (&from, &c.target),
            (Type::Int, Type::Float) | (Type::Float, Type::Int) | (Type::Int, Type::String) | (Type::Float, Type::String)
        );
        if allowed {
            Ok(c.target.clone())
        } else {
            Err(CheckError::InvalidCast { from: from.to_string(), to: c.target.to_string(), pos: pos.clone() })
        }
    }

    fn check_if_expr(&mut self, ife: &mut IfExpr, pos: &Pos) -> CheckResult<Type> {
        let c = self.check_expr(&mut ife.cond)?;
        if c != Type::Bool {
            return Err(CheckError::NonBoolCondition { actual: c.to_string(), pos: pos.clone() });
        }
        let then_ty = self.check_expr(&mut ife.then_branch)?;
        let else_ty = self.check_expr(&mut ife.else_branch)?;
        if then_ty != else_ty {
            return Err(CheckError::TypeMismatch {
                expected: then_ty.to_string(),
                actual: else_ty.to_string(),
                pos: pos.clone(),
            });
        }
        Ok(then_ty)
    }

    fn check_match(&mut self, m: &mut MatchExpr, pos: &Pos) -> CheckResult<Type> {
        let scrutinee_ty = self.check_expr(&mut m.scrutinee)?;
        let mut result_ty: Option<Type> = None;
        for case in m.cases.iter_mut() {
            self.scopes.push();
            let pattern_result = (|| -> CheckResult<()> {
                match &mut case.pattern {
                    MatchPattern::OptionSome(name) => {
                        let inner = match &scrutinee_ty {
                            Type::Option(t) => (**t).clone(),
                            _ => {
                                return Err(CheckError::TypeMismatch {
                                    expected: "option[_]".to_string(),
                                    actual: scrutinee_ty.to_string(),
                                    pos: pos.clone(),
                                })
                            }
                        };
                        self.scopes.declare(name.clone(), inner, Mutability::Let);
                        Ok(())
                    }
                    MatchPattern::OptionNone => {
                        if matches!(scrutinee_ty, Type::Option(_)) {
                            Ok(())
                        } else {
                            Err(CheckError::TypeMismatch {
                                expected: "option[_]".to_string(),
                                actual: scrutinee_ty.to_string(),
                                pos: pos.clone(),
                            })
                        }
                    }
                    MatchPattern::ResultOk(name) => {
                        let inner = match &scrutinee_ty {
                            Type::Result(ok, _) => (**ok).clone(),
                            _ => {
                                return Err(CheckError::TypeMismatch {
                                    expected: "result[_,_]".to_string(),
                                    actual: scrutinee_ty.to_string(),
                                    pos: pos.clone(),
                                })
                            }
                        };
                        self.scopes.declare(name.clone(), inner, Mutability::Let);
                        Ok(())
                    }
                    MatchPattern::ResultErr(name) => {
                        let inner = match &scrutinee_ty {
                            Type::Result(_, err) => (**err).clone(),
                            _ => {
                                return Err(CheckError::TypeMismatch {
                                    expected: "result[_,_]".to_string(),
                                    actual: scrutinee_ty.to_string(),
                                    pos: pos.clone(),
                                })
                            }
                        };
                        self.scopes.declare(name.clone(), inner, Mutability::Let);
                        Ok(())
                    }
                    MatchPattern::Literal(lit) => {
                        let lit_ty = self.check_expr(lit)?;
                        if lit_ty != scrutinee_ty {
                            return Err(CheckError::TypeMismatch {
                                expected: scrutinee_ty.to_string(),
                                actual: lit_ty.to_string(),
                                pos: pos.clone(),
                            });
                        }
                        Ok(())
                    }
                    MatchPattern::Wildcard => Ok(()),
                }
            })();
            let body_result = pattern_result.and_then(|_| self.check_expr(&mut case.body));
            self.scopes.pop();
            let body_ty = body_result?;
            match &result_ty {
                None => result_ty = Some(body_ty),
                Some(r) if *r == body_ty => {}
                Some(r) => {
                    return Err(CheckError::TypeMismatch {
                        expected: r.to_string(),
                        actual: body_ty.to_string(),
                        pos: pos.clone(),
                    })
                }
            }
        }
        Ok(result_ty.unwrap_or(Type::Void))
    }

    /// The 6-step call resolution & monomorphization algorithm (spec.md
    /// §4.2): builtin check, overload selection by arity, left-to-right
    /// structural unification, concept-bound verification, mangled-key
    /// computation feeding `funInstances`, and `fname` rewrite.
    fn resolve_call(&mut self, call: &mut CallExpr, pos: &Pos) -> CheckResult<Type> {
        let mut arg_types = Vec::with_capacity(call.args.len());
        for a in call.args.iter_mut() {
            arg_types.push(self.check_expr(a)?);
        }

        if builtin::is_builtin(&call.fname) {
            return builtin::check_builtin_call(&call.fname, &arg_types, pos);
        }

        let candidates = self
            .templates
            .get(&call.fname)
            .cloned()
            .ok_or_else(|| CheckError::UndeclaredFunction { name: call.fname.clone(), pos: pos.clone() })?;

        let arity_matched: Vec<FunDecl> = candidates
            .into_iter()
            .filter(|d| arg_types.len() >= d.min_arity() && arg_types.len() <= d.arity())
            .collect();
        if arity_matched.is_empty() {
            return Err(CheckError::NoMatchingOverload {
                name: call.fname.clone(),
                arg_count: arg_types.len(),
                pos: pos.clone(),
            });
        }

        let mut successes: Vec<(FunDecl, FxHashMap<String, Type>)> = Vec::new();
        for decl in arity_matched {
            let typaram_names: FxHashSet<String> = decl.typarams.iter().map(|t| t.name.clone()).collect();
            let mut bindings = FxHashMap::default();
            for (tp, ty) in decl.typarams.iter().zip(call.inst_types.iter()) {
                bindings.insert(tp.name.clone(), ty.clone());
            }
            let unifies = decl
                .params
                .iter()
                .zip(arg_types.iter())
                .all(|(p, a)| unify(&p.ty, a, &typaram_names, &mut bindings).is_ok());
            if unifies {
                successes.push((decl, bindings));
            }
        }

        match successes.len() {
            0 => Err(CheckError::NoMatchingOverload {
                name: call.fname.clone(),
                arg_count: arg_types.len(),
                pos: pos.clone(),
            }),
            1 => {
                let (decl, bindings) = successes.into_iter().next().expect("len checked above");
                let (key, return_ty) = self.instantiate(&decl, bindings)?;
                call.fname = key;
                Ok(return_ty)
            }
            n => Err(CheckError::AmbiguousOverload { name: call.fname.clone(), count: n, pos: pos.clone() }),
        }
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

fn finalize_return_type(declared: &Option<Type>, returns: &[(Type, Pos)]) -> CheckResult<Type> {
    if let Some(declared_ty) = declared {
        for (ty, pos) in returns {
            if ty != declared_ty {
                return Err(CheckError::TypeMismatch {
                    expected: declared_ty.to_string(),
                    actual: ty.to_string(),
                    pos: pos.clone(),
                });
            }
        }
        Ok(declared_ty.clone())
    } else if returns.is_empty() {
        Ok(Type::Void)
    } else {
        let (first_ty, _) = &returns[0];
        for (ty, pos) in &returns[1..] {
            if ty != first_ty {
                return Err(CheckError::ConflictingReturnType {
                    first: first_ty.to_string(),
                    second: ty.to_string(),
                    pos: pos.clone(),
                });
            }
        }
        Ok(first_ty.clone())
    }
}

/// Recognizes a top-level `inject("name", "typeName", ..)` call-statement
/// and returns the name it will declare and the type it declares it at, if
/// both the name and type arguments are string literals naming a type this
/// function knows how to parse. Anything else (a computed name, a type this
/// doesn't recognize) is left alone here — the comptime folder's own
/// `inject` handling is the authority on whether the call is well-formed;
/// this is only a best-effort forward declaration for typechecking.
fn inject_signature(stmt: &Stmt) -> Option<(String, Type)> {
    let StmtKind::Expr(e) | StmtKind::Discard(e) = &stmt.kind else { return None };
    let ExprKind::Call(call) = &e.kind else { return None };
    if call.fname != "inject" || call.args.len() != 3 {
        return None;
    }
    let ExprKind::Str(name) = &call.args[0].kind else { return None };
    let ExprKind::Str(type_name) = &call.args[1].kind else { return None };
    parse_inject_type_name(type_name).map(|ty| (name.clone(), ty))
}

fn parse_inject_type_name(name: &str) -> Option<Type> {
    match name {
        "void" => Some(Type::Void),
        "bool" => Some(Type::Bool),
        "int" => Some(Type::Int),
        "float" => Some(Type::Float),
        "string" => Some(Type::String),
        "char" => Some(Type::Char),
        _ => {
            let inner = name.strip_prefix("array[").or_else(|| name.strip_prefix("ref["))?.strip_suffix(']')?;
            let inner_ty = parse_inject_type_name(inner)?;
            if name.starts_with("array[") {
                Some(Type::array(inner_ty))
            } else {
                Some(Type::reference(inner_ty))
            }
        }
    }
}
