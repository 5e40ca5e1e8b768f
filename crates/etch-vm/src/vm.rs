//! Fetch-decode-dispatch loop (spec.md §4.6 "Instruction semantics").

use rand::rngs::StdRng;
use rand::SeedableRng;
use rustc_hash::FxHashMap;

use etch_bytecode::{type_code, GlobalValue, Module, Opcode};

use crate::builtins;
use crate::error::{VmError, VmResult};
use crate::frame::CallFrame;
use crate::heap::{Heap, HeapObject};
use crate::stack::OperandStack;
use crate::value::Value;

/// A single-threaded, strictly sequential Etch virtual machine (spec.md
/// §4.6, §5 "Scheduling model").
pub struct Vm {
    operand_stack: OperandStack,
    frames: Vec<CallFrame>,
    globals: FxHashMap<String, Value>,
    heap: Heap,
    rng: StdRng,
}

impl Vm {
    pub fn new() -> Vm {
        Vm {
            operand_stack: OperandStack::new(),
            frames: Vec::new(),
            globals: FxHashMap::default(),
            heap: Heap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    /// Run a compiled module to completion, returning the value `main`
    /// returns (spec.md §4.6 "Entry point").
    pub fn execute(&mut self, module: &Module) -> VmResult<Value> {
        self.init_globals(module);

        let entry = module.entry_function().ok_or(VmError::MissingEntryPoint)?;
        if !entry.param_names.is_empty() {
            return Err(VmError::ArityMismatch {
                name: "main".to_string(),
                expected: 0,
                got: entry.param_names.len(),
            });
        }
        self.frames.push(CallFrame::new("main".to_string(), 0));
        let mut ip = entry.entry_pc as usize;

        loop {
            let instr = module
                .instructions
                .get(ip)
                .ok_or(VmError::InvalidProgramCounter(ip))?;
            ip += 1;

            match instr.op {
                Opcode::LoadInt => self.operand_stack.push(Value::Int(instr.int_arg))?,
                Opcode::LoadFloat => {
                    let f = module
                        .constants
                        .get_float(instr.int_arg as u32)
                        .ok_or_else(|| VmError::TypeError("bad float constant index".to_string()))?;
                    self.operand_stack.push(Value::Float(f))?;
                }
                Opcode::LoadString => {
                    let s = module
                        .constants
                        .get_string(instr.int_arg as u32)
                        .ok_or_else(|| VmError::TypeError("bad string constant index".to_string()))?;
                    self.operand_stack.push(Value::Str(s.into()))?;
                }
                Opcode::LoadBool => self.operand_stack.push(Value::Bool(instr.int_arg != 0))?,
                Opcode::LoadNil => self.operand_stack.push(Value::Nil)?,
                Opcode::LoadVar => {
                    let v = self.load_var(&instr.str_arg)?;
                    self.operand_stack.push(v)?;
                }
                Opcode::StoreVar => {
                    let v = self.operand_stack.pop()?;
                    self.store_var(&instr.str_arg, v);
                }

                Opcode::Add => self.binary_add()?,
                Opcode::Sub => self.binary_numeric(|a, b| a - b, |a, b| a - b)?,
                Opcode::Mul => self.binary_numeric(|a, b| a * b, |a, b| a * b)?,
                Opcode::Div => self.binary_div()?,
                Opcode::Mod => self.binary_mod()?,
                Opcode::Neg => self.unary_neg()?,

                Opcode::Eq => self.compare_eq(true)?,
                Opcode::Ne => self.compare_eq(false)?,
                Opcode::Lt => self.compare_ord(|o| o == std::cmp::Ordering::Less)?,
                Opcode::Le => self.compare_ord(|o| o != std::cmp::Ordering::Greater)?,
                Opcode::Gt => self.compare_ord(|o| o == std::cmp::Ordering::Greater)?,
                Opcode::Ge => self.compare_ord(|o| o != std::cmp::Ordering::Less)?,
                Opcode::And => self.binary_bool(|a, b| a && b)?,
                Opcode::Or => self.binary_bool(|a, b| a || b)?,
                Opcode::Not => {
                    let v = self.pop_bool()?;
                    self.operand_stack.push(Value::Bool(!v))?;
                }

                Opcode::Jump => ip = instr.int_arg as usize,
                Opcode::JumpIfFalse => {
                    let v = self.operand_stack.pop()?;
                    if v.is_falsy() {
                        ip = instr.int_arg as usize;
                    }
                }
                Opcode::Call => {
                    if let Some(target) = self.dispatch_call(module, &instr.str_arg, instr.int_arg as usize, ip)? {
                        ip = target;
                    }
                }
                Opcode::Return => {
                    let value = self.operand_stack.pop().unwrap_or(Value::Void);
                    let frame = self.frames.pop().ok_or(VmError::NoActiveFrame)?;
                    if self.frames.is_empty() {
                        return Ok(value);
                    }
                    ip = frame.return_pc;
                    self.operand_stack.push(value)?;
                }

                Opcode::NewRef => {
                    let v = self.operand_stack.pop()?;
                    let idx = self.heap.alloc(HeapObject::Cell(v));
                    self.operand_stack.push(Value::Ref(idx))?;
                }
                Opcode::Deref => {
                    let v = self.operand_stack.pop()?;
                    let result = match v {
                        Value::Ref(idx) => match self.heap.get(idx)? {
                            HeapObject::Cell(inner) => inner.clone(),
                            HeapObject::Array(_) => {
                                return Err(VmError::TypeError("deref of an array reference".to_string()))
                            }
                        },
                        _ => return Err(VmError::DanglingReference),
                    };
                    self.operand_stack.push(result)?;
                }

                Opcode::MakeArray => {
                    let n = instr.int_arg as usize;
                    let mut elems = Vec::with_capacity(n);
                    for _ in 0..n {
                        elems.push(self.operand_stack.pop()?);
                    }
                    elems.reverse();
                    let idx = self.heap.alloc(HeapObject::Array(elems));
                    self.operand_stack.push(Value::Array(idx))?;
                }
                Opcode::ArrayGet => {
                    let index = self.pop_int()?;
                    let array = self.operand_stack.pop()?;
                    let elem = self.array_get(array, index)?;
                    self.operand_stack.push(elem)?;
                }
                Opcode::ArraySlice => {
                    let end = self.pop_int()?;
                    let start = self.pop_int()?;
                    let array = self.operand_stack.pop()?;
                    let sliced = self.array_slice(array, start, end)?;
                    self.operand_stack.push(sliced)?;
                }
                Opcode::ArrayLen => {
                    let array = self.operand_stack.pop()?;
                    let len = self.array_len(array)?;
                    self.operand_stack.push(Value::Int(len as i64))?;
                }

                Opcode::Pop => {
                    self.operand_stack.pop()?;
                }
                Opcode::Dup => {
                    let top = self.operand_stack.peek()?.clone();
                    self.operand_stack.push(top)?;
                }
                Opcode::Cast => {
                    let v = self.operand_stack.pop()?;
                    let cast = self.cast(v, instr.int_arg)?;
                    self.operand_stack.push(cast)?;
                }
            }
        }
    }

    fn init_globals(&mut self, module: &Module) {
        for name in &module.globals {
            self.globals.insert(name.clone(), Value::Nil);
        }
        for entry in &module.global_values {
            let v = match &entry.value {
                GlobalValue::Int(i) => Value::Int(*i),
                GlobalValue::Float(f) => Value::Float(*f),
                GlobalValue::Bool(b) => Value::Bool(*b),
                GlobalValue::Str(s) => Value::Str(s.as_str().into()),
            };
            self.globals.insert(entry.name.clone(), v);
        }
    }

    fn load_var(&self, name: &str) -> VmResult<Value> {
        if let Some(frame) = self.frames.last() {
            if let Some(v) = frame.locals.get(name) {
                return Ok(v.clone());
            }
        }
        self.globals
            .get(name)
            .cloned()
            .ok_or_else(|| VmError::UndefinedVariable(name.to_string()))
    }

    fn store_var(&mut self, name: &str, value: Value) {
        if self.globals.contains_key(name) {
            self.globals.insert(name.to_string(), value);
        } else if let Some(frame) = self.frames.last_mut() {
            frame.locals.insert(name.to_string(), value);
        } else {
            self.globals.insert(name.to_string(), value);
        }
    }

    /// Executes `Call`. Returns `Some(new_ip)` when a user function was
    /// entered (the caller must jump there); `None` when a builtin ran
    /// inline and execution simply continues at the next instruction.
    fn dispatch_call(
        &mut self,
        module: &Module,
        name: &str,
        arg_count: usize,
        return_pc: usize,
    ) -> VmResult<Option<usize>> {
        let mut args = Vec::with_capacity(arg_count);
        for _ in 0..arg_count {
            args.push(self.operand_stack.pop()?);
        }

        if builtins::is_builtin(name) {
            let result = builtins::call(name, args, &mut self.heap, &mut self.rng)
                .expect("is_builtin implies call recognizes the name")?;
            self.operand_stack.push(result)?;
            return Ok(None);
        }

        let function = module
            .functions
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| VmError::UndefinedFunction(name.to_string()))?;

        if function.param_names.len() != args.len() {
            return Err(VmError::ArityMismatch {
                name: name.to_string(),
                expected: function.param_names.len(),
                got: args.len(),
            });
        }

        if self.frames.len() >= MAX_CALL_DEPTH {
            return Err(VmError::CallStackOverflow);
        }

        let mut frame = CallFrame::new(name.to_string(), return_pc);
        for (param, value) in function.param_names.iter().zip(args) {
            frame.locals.insert(param.clone(), value);
        }
        self.frames.push(frame);
        Ok(Some(function.entry_pc as usize))
    }

    fn binary_add(&mut self) -> VmResult<()> {
        let b = self.operand_stack.pop()?;
        let a = self.operand_stack.pop()?;
        let result = match (a, b) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_add(b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(a + b),
            (Value::Str(a), Value::Str(b)) => Value::Str(format!("{a}{b}").into()),
            (Value::Array(a), Value::Array(b)) => {
                let mut elems = self.array_elems(a)?;
                elems.extend(self.array_elems(b)?);
                let idx = self.heap.alloc(HeapObject::Array(elems));
                Value::Array(idx)
            }
            (a, b) => {
                return Err(VmError::TypeError(format!(
                    "cannot add {} and {}",
                    a.type_name(),
                    b.type_name()
                )))
            }
        };
        self.operand_stack.push(result)
    }

    fn binary_numeric(&mut self, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> VmResult<()> {
        let b = self.operand_stack.pop()?;
        let a = self.operand_stack.pop()?;
        let result = match (a, b) {
            (Value::Int(a), Value::Int(b)) => Value::Int(int_op(a, b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(float_op(a, b)),
            (a, b) => {
                return Err(VmError::TypeError(format!(
                    "expected two numbers of the same kind, got {} and {}",
                    a.type_name(),
                    b.type_name()
                )))
            }
        };
        self.operand_stack.push(result)
    }

    fn binary_div(&mut self) -> VmResult<()> {
        let b = self.operand_stack.pop()?;
        let a = self.operand_stack.pop()?;
        let result = match (a, b) {
            (Value::Int(_), Value::Int(0)) => return Err(VmError::DivideByZero),
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_div(b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(a / b),
            (a, b) => {
                return Err(VmError::TypeError(format!(
                    "expected two numbers of the same kind, got {} and {}",
                    a.type_name(),
                    b.type_name()
                )))
            }
        };
        self.operand_stack.push(result)
    }

    fn binary_mod(&mut self) -> VmResult<()> {
        let b = self.operand_stack.pop()?;
        let a = self.operand_stack.pop()?;
        let result = match (a, b) {
            (Value::Int(_), Value::Int(0)) => return Err(VmError::DivideByZero),
            (Value::Int(a), Value::Int(b)) => Value::Int(a.wrapping_rem(b)),
            (Value::Float(a), Value::Float(b)) => Value::Float(a % b),
            (a, b) => {
                return Err(VmError::TypeError(format!(
                    "expected two numbers of the same kind, got {} and {}",
                    a.type_name(),
                    b.type_name()
                )))
            }
        };
        self.operand_stack.push(result)
    }

    fn unary_neg(&mut self) -> VmResult<()> {
        let v = self.operand_stack.pop()?;
        let result = match v {
            Value::Int(i) => Value::Int(-i),
            Value::Float(f) => Value::Float(-f),
            other => return Err(VmError::TypeError(format!("cannot negate {}", other.type_name()))),
        };
        self.operand_stack.push(result)
    }

    fn compare_eq(&mut self, want_eq: bool) -> VmResult<()> {
        let b = self.operand_stack.pop()?;
        let a = self.operand_stack.pop()?;
        let eq = a == b;
        self.operand_stack.push(Value::Bool(eq == want_eq))
    }

    fn compare_ord(&mut self, accept: fn(std::cmp::Ordering) -> bool) -> VmResult<()> {
        let b = self.operand_stack.pop()?;
        let a = self.operand_stack.pop()?;
        let ordering = match (&a, &b) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => {
                a.partial_cmp(b).ok_or_else(|| VmError::TypeError("NaN is unordered".to_string()))?
            }
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (a, b) => {
                return Err(VmError::TypeError(format!(
                    "cannot order {} and {}",
                    a.type_name(),
                    b.type_name()
                )))
            }
        };
        self.operand_stack.push(Value::Bool(accept(ordering)))
    }

    fn binary_bool(&mut self, op: fn(bool, bool) -> bool) -> VmResult<()> {
        let b = self.pop_bool()?;
        let a = self.pop_bool()?;
        self.operand_stack.push(Value::Bool(op(a, b)))
    }

    fn pop_bool(&mut self) -> VmResult<bool> {
        match self.operand_stack.pop()? {
            Value::Bool(b) => Ok(b),
            other => Err(VmError::TypeError(format!("expected bool, got {}", other.type_name()))),
        }
    }

    fn pop_int(&mut self) -> VmResult<i64> {
        match self.operand_stack.pop()? {
            Value::Int(i) => Ok(i),
            other => Err(VmError::TypeError(format!("expected int, got {}", other.type_name()))),
        }
    }

    fn array_elems(&self, idx: crate::heap::HeapIndex) -> VmResult<Vec<Value>> {
        match self.heap.get(idx)? {
            HeapObject::Array(elems) => Ok(elems.clone()),
            HeapObject::Cell(_) => Err(VmError::TypeError("expected array, got ref cell".to_string())),
        }
    }

    fn array_get(&self, array: Value, index: i64) -> VmResult<Value> {
        let idx = match array {
            Value::Array(idx) => idx,
            other => return Err(VmError::TypeError(format!("expected array, got {}", other.type_name()))),
        };
        let elems = self.array_elems(idx)?;
        if index < 0 || index as usize >= elems.len() {
            return Err(VmError::IndexOutOfBounds { index, len: elems.len() });
        }
        Ok(elems[index as usize].clone())
    }

    fn array_slice(&mut self, array: Value, start: i64, end: i64) -> VmResult<Value> {
        let idx = match array {
            Value::Array(idx) => idx,
            other => return Err(VmError::TypeError(format!("expected array, got {}", other.type_name()))),
        };
        let elems = self.array_elems(idx)?;
        if start < 0 || end < start || end as usize > elems.len() {
            return Err(VmError::IndexOutOfBounds {
                index: end,
                len: elems.len(),
            });
        }
        let sliced = elems[start as usize..end as usize].to_vec();
        let new_idx = self.heap.alloc(HeapObject::Array(sliced));
        Ok(Value::Array(new_idx))
    }

    fn array_len(&self, array: Value) -> VmResult<usize> {
        let idx = match array {
            Value::Array(idx) => idx,
            other => return Err(VmError::TypeError(format!("expected array, got {}", other.type_name()))),
        };
        Ok(self.array_elems(idx)?.len())
    }

    fn cast(&self, v: Value, target_type_code: i64) -> VmResult<Value> {
        match (target_type_code, v) {
            (type_code::INT, Value::Int(i)) => Ok(Value::Int(i)),
            (type_code::INT, Value::Float(f)) => Ok(Value::Int(f as i64)),
            (type_code::INT, Value::Str(s)) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| VmError::TypeError(format!("cannot cast '{s}' to int"))),
            (type_code::FLOAT, Value::Float(f)) => Ok(Value::Float(f)),
            (type_code::FLOAT, Value::Int(i)) => Ok(Value::Float(i as f64)),
            (type_code::STRING, v) => Ok(Value::Str(v.to_string().into())),
            (code, v) => Err(VmError::TypeError(format!(
                "cannot cast {} to type code {code}",
                v.type_name()
            ))),
        }
    }
}

const MAX_CALL_DEPTH: usize = 512;

impl Default for Vm {
    fn default() -> Vm {
        Vm::new()
    }
}
