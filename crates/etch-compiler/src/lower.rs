//! AST → bytecode lowering (spec.md §4.5).
//!
//! Entry point is [`compile`]. Each function in `Program::fun_instances` is
//! appended to one shared flat instruction stream — `Function::entry_pc`
//! records where it starts, matching `etch_bytecode::Module`'s layout.
//! `Program::funs` (the generic templates) is never lowered; only concrete,
//! already-monomorphized bodies reach this pass.

use etch_ast::{
    AssignStmt, BinaryOp, CallExpr, CastExpr, Expr, ExprKind, FieldAssignStmt, ForIterable,
    ForStmt, FunDecl, IfExpr, IfStmt, MatchExpr, MatchPattern, Program, Stmt, StmtKind, Type,
    TypeDef, UnaryOp, VarStmt, WhileStmt,
};
use etch_bytecode::{type_code, Function, GlobalEntry, GlobalValue, Module, Opcode};

use crate::emitter::{Emitter, LoopCtx};
use crate::error::{CompileError, CompileResult};

pub fn compile(
    program: &Program,
    source_file: impl Into<String>,
    source_hash: [u8; 32],
    debug_info: bool,
) -> CompileResult<Module> {
    let mut emitter = Emitter::new();
    let mut functions = Vec::new();

    // Deterministic iteration order: two compilations of the same checked
    // program must byte-for-byte agree on the instruction stream (Q5).
    let mut names: Vec<&String> = program.fun_instances.keys().collect();
    names.sort();

    for name in names {
        let decl = &program.fun_instances[name];
        emitter.reset_per_function_state();
        let entry_pc = emitter.here() as u32;
        {
            let mut lowerer = Lowerer { emitter: &mut emitter, program, defers: Vec::new() };
            for stmt in &decl.body {
                lowerer.lower_stmt(stmt)?;
            }
            lowerer.flush_defers()?;
        }
        if returns_void(decl) {
            emitter.emit_int(Opcode::LoadInt, 0);
            emitter.emit(Opcode::Return);
        }
        functions.push(Function {
            name: name.clone(),
            entry_pc,
            param_names: decl.params.iter().map(|p| p.name.clone()).collect(),
            local_count: 0,
        });
    }

    let (globals, global_values) = lower_globals(program)?;

    Ok(Module {
        source_hash,
        debug_info,
        source_file: source_file.into(),
        constants: emitter.constants,
        globals,
        global_values,
        functions,
        instructions: emitter.instructions,
    })
}

fn returns_void(decl: &FunDecl) -> bool {
    decl.declared_return.as_ref().map(|t| *t == Type::Void).unwrap_or(true)
}

fn lower_globals(program: &Program) -> CompileResult<(Vec<String>, Vec<GlobalEntry>)> {
    let mut names = Vec::new();
    let mut values = Vec::new();
    for stmt in &program.globals {
        if let StmtKind::Var(v) = &stmt.kind {
            names.push(v.name.clone());
            let lit = literal_global_value(v)?;
            values.push(GlobalEntry { name: v.name.clone(), value: lit });
        }
    }
    Ok((names, values))
}

fn literal_global_value(v: &VarStmt) -> CompileResult<GlobalValue> {
    let err = || CompileError::NonLiteralGlobalInitializer(v.name.clone());
    match v.initializer.as_ref().map(|e| &e.kind) {
        Some(ExprKind::Int(i)) => Ok(GlobalValue::Int(*i)),
        Some(ExprKind::Float(f)) => Ok(GlobalValue::Float(*f)),
        Some(ExprKind::Bool(b)) => Ok(GlobalValue::Bool(*b)),
        Some(ExprKind::Str(s)) => Ok(GlobalValue::Str(s.clone())),
        _ => Err(err()),
    }
}

struct Lowerer<'a> {
    emitter: &'a mut Emitter,
    program: &'a Program,
    /// `defer` expressions registered in the function currently being
    /// lowered, run in LIFO order once the fall-through path of the body
    /// has been lowered. Early `return`s do not trigger them — see
    /// `DESIGN.md`.
    defers: Vec<Expr>,
}

impl<'a> Lowerer<'a> {
    fn flush_defers(&mut self) -> CompileResult<()> {
        let defers = std::mem::take(&mut self.defers);
        for e in defers.into_iter().rev() {
            self.lower_expr(&e)?;
            self.emitter.emit(Opcode::Pop);
        }
        Ok(())
    }

    fn lower_block(&mut self, stmts: &[Stmt]) -> CompileResult<()> {
        for s in stmts {
            self.lower_stmt(s)?;
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
        match &stmt.kind {
            StmtKind::Var(v) => self.lower_var(v),
            StmtKind::Assign(a) => self.lower_assign(a),
            StmtKind::FieldAssign(fa) => self.lower_field_assign(fa),
            StmtKind::If(s) => self.lower_if_stmt(s),
            StmtKind::While(w) => self.lower_while(w),
            StmtKind::For(f) => self.lower_for(f),
            StmtKind::Break => self.lower_break(),
            StmtKind::Expr(e) => {
                self.lower_expr(e)?;
                self.emitter.emit(Opcode::Pop);
                Ok(())
            }
            StmtKind::Return(opt) => {
                match opt {
                    Some(e) => self.lower_expr(e)?,
                    None => {
                        self.emitter.emit_int(Opcode::LoadInt, 0);
                    }
                };
                self.emitter.emit(Opcode::Return);
                Ok(())
            }
            StmtKind::Comptime(_) => {
                Err(CompileError::UnfoldedComptime(format!("{}", stmt.pos)))
            }
            StmtKind::Defer(e) => {
                self.defers.push(e.clone());
                Ok(())
            }
            StmtKind::Discard(e) => {
                self.lower_expr(e)?;
                self.emitter.emit(Opcode::Pop);
                Ok(())
            }
            StmtKind::TypeDecl(_) | StmtKind::Import(_) => Ok(()),
        }
    }

    fn lower_var(&mut self, v: &VarStmt) -> CompileResult<()> {
        match &v.initializer {
            Some(e) => self.lower_expr(e)?,
            None => self.lower_default_value(v.declared_type.as_ref()),
        }
        self.emitter.emit_str(Opcode::StoreVar, v.name.clone());
        Ok(())
    }

    fn lower_default_value(&mut self, ty: Option<&Type>) {
        match ty {
            Some(Type::Int) => {
                self.emitter.emit_int(Opcode::LoadInt, 0);
            }
            Some(Type::Float) => {
                let idx = self.emitter.constants.push_float(0.0);
                self.emitter.emit_int(Opcode::LoadFloat, idx as i64);
            }
            Some(Type::Bool) => {
                self.emitter.emit_int(Opcode::LoadBool, 0);
            }
            Some(Type::String) => {
                let idx = self.emitter.constants.push_string("");
                self.emitter.emit_int(Opcode::LoadString, idx as i64);
            }
            _ => {
                self.emitter.emit(Opcode::LoadNil);
            }
        }
    }

    fn lower_assign(&mut self, a: &AssignStmt) -> CompileResult<()> {
        self.lower_expr(&a.value)?;
        self.emitter.emit_str(Opcode::StoreVar, a.name.clone());
        Ok(())
    }

    /// Records are represented as a plain heap array, one slot per field in
    /// declaration order (see `DESIGN.md`). There is no in-place array
    /// mutation opcode, so a field assignment rebuilds the whole record and
    /// rebinds the variable — an aliasing divergence from true in-place
    /// mutation, accepted because the instruction set is closed.
    fn lower_field_assign(&mut self, fa: &FieldAssignStmt) -> CompileResult<()> {
        let name = match &fa.target.kind {
            ExprKind::Var(n) => n.clone(),
            _ => return Err(CompileError::UnsupportedFieldAssignTarget(format!("{}", fa.target.pos))),
        };
        let ty_name = match fa.target.typ() {
            Type::UserDefined(n) => n.clone(),
            other => return Err(CompileError::UnknownRecordType(other.to_string())),
        };
        let fields = match self.program.types.get(&ty_name) {
            Some(TypeDef::Record { fields }) => fields,
            _ => return Err(CompileError::UnknownRecordType(ty_name)),
        };
        let idx = fields
            .iter()
            .position(|f| f.name == fa.field)
            .ok_or_else(|| CompileError::UnknownRecordField(ty_name.clone(), fa.field.clone()))?;
        let field_count = fields.len();
        for i in 0..field_count {
            if i == idx {
                self.lower_expr(&fa.value)?;
            } else {
                self.emitter.emit_str(Opcode::LoadVar, name.clone());
                self.emitter.emit_int(Opcode::LoadInt, i as i64);
                self.emitter.emit(Opcode::ArrayGet);
            }
        }
        self.emitter.emit_int(Opcode::MakeArray, field_count as i64);
        self.emitter.emit_str(Opcode::StoreVar, name);
        Ok(())
    }

    fn lower_if_stmt(&mut self, s: &IfStmt) -> CompileResult<()> {
        self.lower_expr(&s.cond)?;
        let mut jmp_false = self.emitter.placeholder(Opcode::JumpIfFalse);
        self.lower_block(&s.then_body)?;
        let mut end_jumps = vec![self.emitter.placeholder(Opcode::Jump)];
        self.emitter.patch_jump(jmp_false)?;

        for (cond, body) in &s.elifs {
            self.lower_expr(cond)?;
            jmp_false = self.emitter.placeholder(Opcode::JumpIfFalse);
            self.lower_block(body)?;
            end_jumps.push(self.emitter.placeholder(Opcode::Jump));
            self.emitter.patch_jump(jmp_false)?;
        }

        if let Some(else_body) = &s.else_body {
            self.lower_block(else_body)?;
        }

        for j in end_jumps {
            self.emitter.patch_jump(j)?;
        }
        Ok(())
    }

    fn lower_while(&mut self, w: &WhileStmt) -> CompileResult<()> {
        let top = self.emitter.here();
        self.lower_expr(&w.cond)?;
        let jmp_end = self.emitter.placeholder(Opcode::JumpIfFalse);
        self.emitter.loop_stack.push(LoopCtx { break_patches: Vec::new() });
        self.lower_block(&w.body)?;
        self.emitter.emit_int(Opcode::Jump, top as i64);
        self.emitter.patch_jump(jmp_end)?;
        let ctx = self.emitter.loop_stack.pop().expect("pushed above");
        for p in ctx.break_patches {
            self.emitter.patch_jump(p)?;
        }
        Ok(())
    }

    fn lower_for(&mut self, f: &ForStmt) -> CompileResult<()> {
        match &f.iterable {
            ForIterable::Range { start, end, inclusive } => {
                let i_tmp = self.emitter.fresh_temp();
                let end_tmp = self.emitter.fresh_temp();
                self.lower_expr(start)?;
                self.emitter.emit_str(Opcode::StoreVar, i_tmp.clone());
                self.lower_expr(end)?;
                self.emitter.emit_str(Opcode::StoreVar, end_tmp.clone());

                let top = self.emitter.here();
                self.emitter.emit_str(Opcode::LoadVar, i_tmp.clone());
                self.emitter.emit_str(Opcode::LoadVar, end_tmp.clone());
                self.emitter.emit(if *inclusive { Opcode::Le } else { Opcode::Lt });
                let jmp_end = self.emitter.placeholder(Opcode::JumpIfFalse);

                self.emitter.emit_str(Opcode::LoadVar, i_tmp.clone());
                self.emitter.emit_str(Opcode::StoreVar, f.var_name.clone());

                self.emitter.loop_stack.push(LoopCtx { break_patches: Vec::new() });
                self.lower_block(&f.body)?;

                self.emitter.emit_str(Opcode::LoadVar, i_tmp.clone());
                self.emitter.emit_int(Opcode::LoadInt, 1);
                self.emitter.emit(Opcode::Add);
                self.emitter.emit_str(Opcode::StoreVar, i_tmp);
                self.emitter.emit_int(Opcode::Jump, top as i64);
                self.emitter.patch_jump(jmp_end)?;
                let ctx = self.emitter.loop_stack.pop().expect("pushed above");
                for p in ctx.break_patches {
                    self.emitter.patch_jump(p)?;
                }
                Ok(())
            }
            ForIterable::Array(arr_expr) => {
                let arr_tmp = self.emitter.fresh_temp();
                let idx_tmp = self.emitter.fresh_temp();
                let len_tmp = self.emitter.fresh_temp();
                self.lower_expr(arr_expr)?;
                self.emitter.emit_str(Opcode::StoreVar, arr_tmp.clone());
                self.emitter.emit_int(Opcode::LoadInt, 0);
                self.emitter.emit_str(Opcode::StoreVar, idx_tmp.clone());
                self.emitter.emit_str(Opcode::LoadVar, arr_tmp.clone());
                self.emitter.emit(Opcode::ArrayLen);
                self.emitter.emit_str(Opcode::StoreVar, len_tmp.clone());

                let top = self.emitter.here();
                self.emitter.emit_str(Opcode::LoadVar, idx_tmp.clone());
                self.emitter.emit_str(Opcode::LoadVar, len_tmp.clone());
                self.emitter.emit(Opcode::Lt);
                let jmp_end = self.emitter.placeholder(Opcode::JumpIfFalse);

                self.emitter.emit_str(Opcode::LoadVar, arr_tmp.clone());
                self.emitter.emit_str(Opcode::LoadVar, idx_tmp.clone());
                self.emitter.emit(Opcode::ArrayGet);
                self.emitter.emit_str(Opcode::StoreVar, f.var_name.clone());

                self.emitter.loop_stack.push(LoopCtx { break_patches: Vec::new() });
                self.lower_block(&f.body)?;

                self.emitter.emit_str(Opcode::LoadVar, idx_tmp.clone());
                self.emitter.emit_int(Opcode::LoadInt, 1);
                self.emitter.emit(Opcode::Add);
                self.emitter.emit_str(Opcode::StoreVar, idx_tmp);
                self.emitter.emit_int(Opcode::Jump, top as i64);
                self.emitter.patch_jump(jmp_end)?;
                let ctx = self.emitter.loop_stack.pop().expect("pushed above");
                for p in ctx.break_patches {
                    self.emitter.patch_jump(p)?;
                }
                Ok(())
            }
        }
    }

    fn lower_break(&mut self) -> CompileResult<()> {
        let idx = self.emitter.placeholder(Opcode::Jump);
        self.emitter
            .loop_stack
            .last_mut()
            .expect("break only reachable inside a loop body (checked earlier)")
            .break_patches
            .push(idx);
        Ok(())
    }

    fn lower_expr(&mut self, expr: &Expr) -> CompileResult<()> {
        match &expr.kind {
            ExprKind::Int(i) => {
                self.emitter.emit_int(Opcode::LoadInt, *i);
            }
            // Etch's closed opcode set has no dedicated char literal; a
            // `char` is carried through the bytecode/VM layer as its
            // Unicode scalar value (see `DESIGN.md`).
            ExprKind::Char(c) => {
                self.emitter.emit_int(Opcode::LoadInt, *c as i64);
            }
            ExprKind::Float(f) => {
                let idx = self.emitter.constants.push_float(*f);
                self.emitter.emit_int(Opcode::LoadFloat, idx as i64);
            }
            ExprKind::Str(s) => {
                let idx = self.emitter.constants.push_string(s);
                self.emitter.emit_int(Opcode::LoadString, idx as i64);
            }
            ExprKind::Bool(b) => {
                self.emitter.emit_int(Opcode::LoadBool, *b as i64);
            }
            ExprKind::Nil => {
                self.emitter.emit(Opcode::LoadNil);
            }
            ExprKind::Var(name) => {
                self.emitter.emit_str(Opcode::LoadVar, name.clone());
            }
            ExprKind::Unary(u) => {
                self.lower_expr(&u.operand)?;
                self.emitter.emit(match u.op {
                    UnaryOp::Neg => Opcode::Neg,
                    UnaryOp::Not => Opcode::Not,
                });
            }
            ExprKind::Binary(b) => {
                self.lower_expr(&b.lhs)?;
                self.lower_expr(&b.rhs)?;
                self.emitter.emit(binary_opcode(b.op));
            }
            ExprKind::Call(c) => self.lower_call(c)?,
            ExprKind::NewRef(inner) | ExprKind::OptionSome(inner) => {
                self.lower_expr(inner)?;
                self.emitter.emit(Opcode::NewRef);
            }
            ExprKind::Deref(inner) => {
                self.lower_expr(inner)?;
                self.emitter.emit(Opcode::Deref);
            }
            ExprKind::OptionNone => {
                self.emitter.emit(Opcode::LoadNil);
            }
            ExprKind::ResultOk(inner) => {
                self.emitter.emit_int(Opcode::LoadInt, 0);
                self.lower_expr(inner)?;
                self.emitter.emit_int(Opcode::MakeArray, 2);
            }
            ExprKind::ResultErr(inner) => {
                self.emitter.emit_int(Opcode::LoadInt, 1);
                self.lower_expr(inner)?;
                self.emitter.emit_int(Opcode::MakeArray, 2);
            }
            ExprKind::Array(items) => {
                for item in items {
                    self.lower_expr(item)?;
                }
                self.emitter.emit_int(Opcode::MakeArray, items.len() as i64);
            }
            ExprKind::Index(ix) => {
                self.lower_expr(&ix.array)?;
                self.lower_expr(&ix.index)?;
                self.emitter.emit(Opcode::ArrayGet);
            }
            ExprKind::Slice(sl) => {
                let arr_tmp = self.emitter.fresh_temp();
                let start_tmp = self.emitter.fresh_temp();
                let end_tmp = self.emitter.fresh_temp();
                self.lower_expr(&sl.array)?;
                self.emitter.emit_str(Opcode::StoreVar, arr_tmp.clone());

                match &sl.start {
                    Some(s) => self.lower_expr(s)?,
                    None => {
                        self.emitter.emit_int(Opcode::LoadInt, 0);
                    }
                }
                self.emitter.emit_str(Opcode::StoreVar, start_tmp.clone());

                match &sl.end {
                    Some(e) => self.lower_expr(e)?,
                    None => {
                        self.emitter.emit_str(Opcode::LoadVar, arr_tmp.clone());
                        self.emitter.emit(Opcode::ArrayLen);
                    }
                }
                self.emitter.emit_str(Opcode::StoreVar, end_tmp.clone());

                self.emitter.emit_str(Opcode::LoadVar, arr_tmp);
                self.emitter.emit_str(Opcode::LoadVar, start_tmp);
                self.emitter.emit_str(Opcode::LoadVar, end_tmp);
                self.emitter.emit(Opcode::ArraySlice);
            }
            ExprKind::ArrayLen(inner) => {
                self.lower_expr(inner)?;
                self.emitter.emit(Opcode::ArrayLen);
            }
            ExprKind::Cast(c) => self.lower_cast(c)?,
            ExprKind::Comptime(_) => {
                return Err(CompileError::UnfoldedComptime(format!("{}", expr.pos)));
            }
            ExprKind::If(i) => self.lower_if_expr(i)?,
            ExprKind::Match(m) => self.lower_match(m)?,
        }
        Ok(())
    }

    fn lower_cast(&mut self, c: &CastExpr) -> CompileResult<()> {
        self.lower_expr(&c.operand)?;
        let code = match &c.target {
            Type::Int => type_code::INT,
            Type::Float => type_code::FLOAT,
            Type::String => type_code::STRING,
            // The checker only ever admits int/float/string casts
            // (spec.md §4.2); anything else reaching here is a checker bug,
            // not a user error, so fall back to the widest representable
            // code rather than invent a new one.
            _ => type_code::STRING,
        };
        self.emitter.emit_int(Opcode::Cast, code);
        Ok(())
    }

    fn lower_if_expr(&mut self, i: &IfExpr) -> CompileResult<()> {
        self.lower_expr(&i.cond)?;
        let jmp_false = self.emitter.placeholder(Opcode::JumpIfFalse);
        self.lower_expr(&i.then_branch)?;
        let jmp_end = self.emitter.placeholder(Opcode::Jump);
        self.emitter.patch_jump(jmp_false)?;
        self.lower_expr(&i.else_branch)?;
        self.emitter.patch_jump(jmp_end)?;
        Ok(())
    }

    /// Lowered as a sequential test-then-branch chain; a `Wildcard` arm
    /// (required to be last, the checker enforces exhaustiveness up to
    /// that arm) short-circuits the remaining tests. If no arm matches —
    /// unreachable for a program the checker accepted — the expression
    /// evaluates to `nil`.
    fn lower_match(&mut self, m: &MatchExpr) -> CompileResult<()> {
        let scrut_tmp = self.emitter.fresh_temp();
        self.lower_expr(&m.scrutinee)?;
        self.emitter.emit_str(Opcode::StoreVar, scrut_tmp.clone());

        let mut end_jumps = Vec::new();
        let mut fell_through = true;
        for case in &m.cases {
            if matches!(case.pattern, MatchPattern::Wildcard) {
                self.lower_expr(&case.body)?;
                fell_through = false;
                break;
            }
            self.lower_pattern_test(&case.pattern, &scrut_tmp)?;
            let jmp_false = self.emitter.placeholder(Opcode::JumpIfFalse);
            self.lower_pattern_bind(&case.pattern, &scrut_tmp);
            self.lower_expr(&case.body)?;
            end_jumps.push(self.emitter.placeholder(Opcode::Jump));
            self.emitter.patch_jump(jmp_false)?;
        }
        if fell_through {
            self.emitter.emit(Opcode::LoadNil);
        }
        for j in end_jumps {
            self.emitter.patch_jump(j)?;
        }
        Ok(())
    }

    /// `Option` values are represented as a nilable ref (`Some(x)` ==
    /// `NewRef(x)`, `None` == `nil`) and `Result` values as a 2-element
    /// array `[tag, payload]` with `tag` 0 for `Ok`, 1 for `Err` — see
    /// `DESIGN.md`.
    fn lower_pattern_test(&mut self, pat: &MatchPattern, scrut: &str) -> CompileResult<()> {
        match pat {
            MatchPattern::OptionSome(_) => {
                self.emitter.emit_str(Opcode::LoadVar, scrut);
                self.emitter.emit(Opcode::LoadNil);
                self.emitter.emit(Opcode::Ne);
            }
            MatchPattern::OptionNone => {
                self.emitter.emit_str(Opcode::LoadVar, scrut);
                self.emitter.emit(Opcode::LoadNil);
                self.emitter.emit(Opcode::Eq);
            }
            MatchPattern::ResultOk(_) => {
                self.emitter.emit_str(Opcode::LoadVar, scrut);
                self.emitter.emit_int(Opcode::LoadInt, 0);
                self.emitter.emit(Opcode::ArrayGet);
                self.emitter.emit_int(Opcode::LoadInt, 0);
                self.emitter.emit(Opcode::Eq);
            }
            MatchPattern::ResultErr(_) => {
                self.emitter.emit_str(Opcode::LoadVar, scrut);
                self.emitter.emit_int(Opcode::LoadInt, 0);
                self.emitter.emit(Opcode::ArrayGet);
                self.emitter.emit_int(Opcode::LoadInt, 1);
                self.emitter.emit(Opcode::Eq);
            }
            MatchPattern::Literal(e) => {
                self.emitter.emit_str(Opcode::LoadVar, scrut);
                self.lower_expr(e)?;
                self.emitter.emit(Opcode::Eq);
            }
            MatchPattern::Wildcard => unreachable!("handled by the caller before reaching here"),
        }
        Ok(())
    }

    fn lower_pattern_bind(&mut self, pat: &MatchPattern, scrut: &str) {
        match pat {
            MatchPattern::OptionSome(name) => {
                self.emitter.emit_str(Opcode::LoadVar, scrut);
                self.emitter.emit(Opcode::Deref);
                self.emitter.emit_str(Opcode::StoreVar, name.clone());
            }
            MatchPattern::ResultOk(name) | MatchPattern::ResultErr(name) => {
                self.emitter.emit_str(Opcode::LoadVar, scrut);
                self.emitter.emit_int(Opcode::LoadInt, 1);
                self.emitter.emit(Opcode::ArrayGet);
                self.emitter.emit_str(Opcode::StoreVar, name.clone());
            }
            MatchPattern::OptionNone | MatchPattern::Literal(_) | MatchPattern::Wildcard => {}
        }
    }

    /// Arguments are pushed in reverse source order so the callee pops them
    /// in declaration order (spec.md §4.5). Missing trailing arguments to a
    /// user function with defaults are filled in by lowering the
    /// corresponding `default_value` expression in place.
    fn lower_call(&mut self, c: &CallExpr) -> CompileResult<()> {
        let mut full_args: Vec<&Expr> = c.args.iter().collect();
        let mut owned_defaults: Vec<Expr> = Vec::new();

        if let Some(decl) = self.program.fun_instances.get(&c.fname) {
            if c.args.len() < decl.params.len() {
                for (i, p) in decl.params.iter().enumerate().skip(c.args.len()) {
                    let default = p
                        .default_value
                        .clone()
                        .ok_or_else(|| CompileError::MissingDefaultArgument(c.fname.clone(), i))?;
                    owned_defaults.push(default);
                }
            }
        }
        full_args.extend(owned_defaults.iter());

        for a in full_args.iter().rev() {
            self.lower_expr(a)?;
        }
        self.emitter.emit_str_int(Opcode::Call, c.fname.clone(), full_args.len() as i64);
        Ok(())
    }
}

fn binary_opcode(op: BinaryOp) -> Opcode {
    match op {
        BinaryOp::Add => Opcode::Add,
        BinaryOp::Sub => Opcode::Sub,
        BinaryOp::Mul => Opcode::Mul,
        BinaryOp::Div => Opcode::Div,
        BinaryOp::Mod => Opcode::Mod,
        BinaryOp::Eq => Opcode::Eq,
        BinaryOp::Ne => Opcode::Ne,
        BinaryOp::Lt => Opcode::Lt,
        BinaryOp::Le => Opcode::Le,
        BinaryOp::Gt => Opcode::Gt,
        BinaryOp::Ge => Opcode::Ge,
        BinaryOp::And => Opcode::And,
        BinaryOp::Or => Opcode::Or,
    }
}
