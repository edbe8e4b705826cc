//! Stack-machine back-end executing compiled bytecode.
//!
//! Machine state: a value stack of values and references, a block stack,
//! the completion register `C`, the location register (kept on the
//! interpreter), the scope register, and the program counter.
//!
//! Exceptions unwind the block stack: a try-catch block converts into a
//! scope block holding the one-property shield, a try-finally block
//! converts into a finally block remembering the interrupted completion,
//! and a finally block either re-raises its pending throw or resumes the
//! interrupted `End` at its saved program counter.

use std::rc::Rc;

use crate::ast::Function;
use crate::compiler::{self, code::CodeChunk, code::Instr};
use crate::context::{self, Context, Scope, ScopeRef};
use crate::error::JsError;
use crate::interpreter::eval::{literal_value, type_of_name};
use crate::interpreter::{Interpreter, TraceEvent};
use crate::object::{self, Attrs, JsObject, JsObjectRef};
use crate::string::JsString;
use crate::value::{
    self, to_boolean, to_number, to_object, to_primitive, to_string_value, Hint, Operand,
    Reference, Value,
};

impl Interpreter {
    pub(crate) fn exec_body_vm(
        &mut self,
        func: &Rc<Function>,
        ctxt: &Context,
        as_function: bool,
    ) -> Result<Value, JsError> {
        if self.depth >= self.recursion_limit {
            return Err(self.throw_range_error("stack overflow"));
        }
        self.depth += 1;
        let saved_file = std::mem::replace(&mut self.current_file, func.filename.clone());
        let chunk = compiler::get_or_compile(func, as_function);
        self.hoist_declarations(func, ctxt);
        let result = exec(self, &chunk, ctxt);
        self.current_file = saved_file;
        self.depth -= 1;
        result
    }
}

/// Interrupted completion remembered by a finally block.
enum Saved {
    /// A throw passed through; re-raise when the finally ends normally.
    Pending(JsError),
    /// An `End(n)` passed through; resume unwinding to `n` and continue
    /// at `resume_pc`.
    EndTo { n: usize, resume_pc: usize },
}

enum Block {
    Enum {
        obj: JsObjectRef,
        names: Vec<JsString>,
        pos: usize,
    },
    With {
        saved_scope: ScopeRef,
    },
    TryC {
        handler: usize,
        stack: usize,
        ident: JsString,
    },
    TryF {
        handler: usize,
        stack: usize,
    },
    Finally {
        saved: Saved,
    },
}

enum EndOutcome {
    /// Continue at this program counter.
    Continue(usize),
    /// Execution is over; yield the C register.
    Return,
    /// A pending throw resurfaced from a finally block.
    Rethrow(JsError),
}

struct Machine<'c> {
    chunk: &'c CodeChunk,
    stack: Vec<Operand>,
    blocks: Vec<Block>,
    scope: ScopeRef,
    c: Value,
}

fn exec(interp: &mut Interpreter, chunk: &CodeChunk, ctxt: &Context) -> Result<Value, JsError> {
    let mut m = Machine {
        chunk,
        stack: Vec::new(),
        blocks: Vec::new(),
        scope: ctxt.scope.clone(),
        c: Value::Undefined,
    };
    let mut pc: usize = 0;

    // Fallible instructions funnel their error through the block stack;
    // execution resumes at a handler or propagates out.
    macro_rules! throwing {
        ($e:expr) => {
            match $e {
                Ok(v) => v,
                Err(err) => match handle_throw(interp, &mut m, err)? {
                    new_pc => {
                        pc = new_pc;
                        continue;
                    }
                },
            }
        };
    }

    loop {
        let instr = match m.chunk.instrs.get(pc) {
            Some(i) => i.clone(),
            None => return Err(JsError::internal("program counter out of range")),
        };
        pc += 1;

        match instr {
            Instr::Nop => {}

            Instr::Dup => {
                let top = m.top()?.clone();
                m.stack.push(top);
            }

            Instr::Pop => {
                m.pop()?;
            }

            Instr::Exch => {
                let len = m.stack.len();
                if len < 2 {
                    return Err(JsError::internal("stack underflow in EXCH"));
                }
                m.stack.swap(len - 1, len - 2);
            }

            Instr::Roll3 => {
                let len = m.stack.len();
                if len < 3 {
                    return Err(JsError::internal("stack underflow in ROLL3"));
                }
                // Top descends below the next two.
                let top = m.stack.remove(len - 1);
                m.stack.insert(len - 3, top);
            }

            Instr::Throw => {
                let v = m.pop_value(interp)?;
                let err = interp.throw_value(v);
                pc = handle_throw(interp, &mut m, err)?;
            }

            Instr::SetC => {
                m.c = m.pop_value(interp)?;
            }

            Instr::GetC => {
                let c = m.c.clone();
                m.stack.push(Operand::Value(c));
            }

            Instr::This => {
                m.stack.push(Operand::Value(Value::Object(ctxt.this_obj.clone())));
            }

            Instr::Object => {
                m.stack.push(Operand::Value(Value::Object(interp.object_ctor.clone())));
            }

            Instr::Array => {
                m.stack.push(Operand::Value(Value::Object(interp.array_ctor.clone())));
            }

            Instr::Regexp => {
                m.stack.push(Operand::Value(Value::Object(interp.regexp_ctor.clone())));
            }

            Instr::Ref => {
                let name = m.pop_string(interp)?;
                let obj = m.pop_object()?;
                m.stack.push(Operand::Ref(Reference {
                    base: Some(obj),
                    property: name,
                }));
            }

            Instr::GetValue => {
                let op = m.pop()?;
                let v = throwing!(interp.get_value(&op));
                m.stack.push(Operand::Value(v));
            }

            Instr::Lookup => {
                let name = m.pop_string(interp)?;
                let name = interp.intern_js(&name);
                let r = context::lookup(&m.scope, &name);
                m.stack.push(Operand::Ref(r));
            }

            Instr::PutValue => {
                let v = m.pop_value(interp)?;
                let op = m.pop()?;
                throwing!(interp.put_value(&op, v));
            }

            Instr::PutVar => {
                let v = m.pop_value(interp)?;
                let name = m.pop_string(interp)?;
                object::put(&ctxt.variable, &name, v, ctxt.var_attr);
            }

            Instr::Var => {
                let name = m.pop_string(interp)?;
                m.stack.push(Operand::Ref(Reference {
                    base: Some(ctxt.variable.clone()),
                    property: name,
                }));
            }

            Instr::Delete => {
                let op = m.pop()?;
                let result = match &op {
                    Operand::Value(_) => true,
                    Operand::Ref(Reference { base: None, .. }) => true,
                    Operand::Ref(Reference {
                        base: Some(base),
                        property,
                    }) => object::delete(base, property),
                };
                m.stack.push(Operand::Value(Value::Boolean(result)));
            }

            Instr::TypeOf => {
                let op = m.pop()?;
                let name = match &op {
                    Operand::Ref(Reference { base: None, .. }) => "undefined",
                    _ => {
                        let v = throwing!(interp.get_value(&op));
                        type_of_name(&v)
                    }
                };
                m.stack.push(Operand::Value(Value::String(interp.intern(name))));
            }

            Instr::ToObject => {
                let v = m.pop_value(interp)?;
                let obj = throwing!(to_object(interp, &v));
                m.stack.push(Operand::Value(Value::Object(obj)));
            }

            Instr::ToNumber => {
                let v = m.pop_value(interp)?;
                let n = throwing!(to_number(interp, &v));
                m.stack.push(Operand::Value(Value::Number(n)));
            }

            Instr::ToBoolean => {
                let v = m.pop_value(interp)?;
                m.stack.push(Operand::Value(Value::Boolean(to_boolean(&v))));
            }

            Instr::ToString => {
                let v = m.pop_value(interp)?;
                let s = throwing!(to_string_value(interp, &v));
                m.stack.push(Operand::Value(Value::String(s)));
            }

            Instr::ToPrimitive => {
                let v = m.pop_value(interp)?;
                let p = throwing!(to_primitive(interp, &v, Hint::None));
                m.stack.push(Operand::Value(p));
            }

            Instr::Neg => {
                let n = m.pop_number(interp)?;
                m.stack.push(Operand::Value(Value::Number(-n)));
            }

            Instr::Inv => {
                let v = m.pop_value(interp)?;
                let n = throwing!(to_number(interp, &v));
                m.stack
                    .push(Operand::Value(Value::Number(f64::from(!value::to_int32(n)))));
            }

            Instr::Not => {
                let v = m.pop_value(interp)?;
                m.stack.push(Operand::Value(Value::Boolean(!to_boolean(&v))));
            }

            Instr::Mul
            | Instr::Div
            | Instr::Mod
            | Instr::Add
            | Instr::Sub
            | Instr::LShift
            | Instr::RShift
            | Instr::URShift
            | Instr::Lt
            | Instr::Gt
            | Instr::Le
            | Instr::Ge
            | Instr::InstanceOf
            | Instr::In
            | Instr::Eq
            | Instr::Seq
            | Instr::BAnd
            | Instr::BXor
            | Instr::BOr => {
                let y = m.pop_value(interp)?;
                let x = m.pop_value(interp)?;
                let op = binary_op_of(&instr);
                let v = throwing!(interp.apply_binary(op, &x, &y));
                m.stack.push(Operand::Value(v));
            }

            Instr::SEnum => {
                let obj = m.pop_object()?;
                let names = object::enumerate_chain(&obj);
                m.blocks.push(Block::Enum {
                    obj,
                    names,
                    pos: 0,
                });
            }

            Instr::SWith => {
                let obj = m.pop_object()?;
                m.blocks.push(Block::With {
                    saved_scope: m.scope.clone(),
                });
                m.scope = Scope::prepend(obj, &m.scope);
            }

            Instr::New(argc) => {
                let args = m.pop_args(interp, argc as usize)?;
                let v = m.pop_value(interp)?;
                let ctor = match &v {
                    Value::Undefined => {
                        let err = interp.throw_type_error("no such constructor");
                        pc = handle_throw(interp, &mut m, err)?;
                        continue;
                    }
                    Value::Object(o) => o.clone(),
                    _ => {
                        let err = interp.throw_type_error("not a constructor");
                        pc = handle_throw(interp, &mut m, err)?;
                        continue;
                    }
                };
                if !ctor.borrow().has_construct() {
                    let err = interp.throw_type_error("object is not a constructor");
                    pc = handle_throw(interp, &mut m, err)?;
                    continue;
                }
                let obj = throwing!(interp.construct(&ctor, &args));
                m.stack.push(Operand::Value(Value::Object(obj)));
            }

            Instr::Call(argc) => {
                let args = m.pop_args(interp, argc as usize)?;
                let op = m.pop()?;

                let this = match &op {
                    Operand::Ref(Reference {
                        base: Some(base), ..
                    }) if !base.borrow().is_activation() => Some(base.clone()),
                    _ => None,
                };
                let v = throwing!(interp.get_value(&op));
                let func = match &v {
                    Value::Undefined => {
                        let what = match &op {
                            Operand::Ref(r) => format!("{} is not a function", r.property),
                            _ => "value is not a function".to_string(),
                        };
                        let err = interp.throw_type_error(&what);
                        pc = handle_throw(interp, &mut m, err)?;
                        continue;
                    }
                    Value::Object(o) => o.clone(),
                    _ => {
                        let err = interp.throw_type_error("value is not a function");
                        pc = handle_throw(interp, &mut m, err)?;
                        continue;
                    }
                };
                if !func.borrow().has_call() {
                    let err = interp.throw_type_error("object is not callable");
                    pc = handle_throw(interp, &mut m, err)?;
                    continue;
                }

                let result = if Rc::ptr_eq(&func, &interp.global_eval) {
                    // Direct eval runs in this context, with the machine's
                    // current scope chain.
                    let arg = args.first().cloned().unwrap_or(Value::Undefined);
                    let eval_ctxt = ctxt.with_scope(m.scope.clone());
                    interp.eval_with_context(&eval_ctxt, &arg)
                } else {
                    interp.call(&func, this.as_ref(), &args)
                };
                let v = throwing!(result);
                m.stack.push(Operand::Value(v));
            }

            Instr::End(n) => match handle_end(&mut m, n as usize, pc)? {
                EndOutcome::Continue(new_pc) => pc = new_pc,
                EndOutcome::Return => return Ok(m.c),
                EndOutcome::Rethrow(err) => pc = handle_throw(interp, &mut m, err)?,
            },

            Instr::BAlways(addr) => pc = addr as usize,

            Instr::BTrue(addr) => {
                let v = m.pop_value(interp)?;
                if to_boolean(&v) {
                    pc = addr as usize;
                }
            }

            Instr::BEnum(addr) => {
                if let Some(name) = m.next_enum_name() {
                    m.stack.push(Operand::Value(Value::String(name)));
                    pc = addr as usize;
                }
            }

            Instr::STryC(addr) => {
                let ident = m.pop_string(interp)?;
                m.blocks.push(Block::TryC {
                    handler: addr as usize,
                    stack: m.stack.len(),
                    ident,
                });
            }

            Instr::STryF(addr) => {
                m.blocks.push(Block::TryF {
                    handler: addr as usize,
                    stack: m.stack.len(),
                });
            }

            Instr::Func(idx) => {
                let func = m.chunk.functions[idx as usize].clone();
                let scope = m.scope.clone();
                let instance = interp.instantiate_function_expr(&func, &scope);
                m.stack.push(Operand::Value(Value::Object(instance)));
            }

            Instr::Literal(idx) => {
                let v = literal_value(&m.chunk.literals[idx as usize]);
                m.stack.push(Operand::Value(v));
            }

            Instr::Loc(idx) => {
                interp.location = Some(m.chunk.locations[idx as usize].clone());
                interp.trace_event(TraceEvent::Statement);
            }
        }
    }
}

/// Unwind the block stack for a throw. Returns the handler's program
/// counter, or propagates the error out of the machine.
fn handle_throw(
    interp: &mut Interpreter,
    m: &mut Machine<'_>,
    err: JsError,
) -> Result<usize, JsError> {
    loop {
        match m.blocks.pop() {
            None => return Err(err),
            Some(Block::Enum { .. }) => {}
            Some(Block::With { saved_scope }) => m.scope = saved_scope,
            Some(Block::TryC {
                handler,
                stack,
                ident,
            }) => {
                m.stack.truncate(stack);
                let thrown = interp.error_to_value(err);
                let shield = JsObject::ordinary(Some(interp.object_prototype.clone()));
                shield
                    .borrow_mut()
                    .define(ident, thrown, Attrs::DONT_DELETE);
                // The try block becomes a scope block for the catch body.
                m.blocks.push(Block::With {
                    saved_scope: m.scope.clone(),
                });
                m.scope = Scope::prepend(shield, &m.scope);
                return Ok(handler);
            }
            Some(Block::TryF { handler, stack }) => {
                m.stack.truncate(stack);
                m.blocks.push(Block::Finally {
                    saved: Saved::Pending(err),
                });
                return Ok(handler);
            }
            // A throw out of a finally body discards whatever the
            // finally had interrupted.
            Some(Block::Finally { .. }) => {}
        }
    }
}

/// Unwind the block stack for `End(n)`: finish blocks at depth >= n,
/// firing side effects. `pc_after` is where execution resumes once the
/// unwind completes.
fn handle_end(m: &mut Machine<'_>, n: usize, pc_after: usize) -> Result<EndOutcome, JsError> {
    let mut n = n;
    let mut pc_after = pc_after;
    loop {
        let len_before = m.blocks.len();
        if len_before < n {
            return Ok(EndOutcome::Continue(pc_after));
        }
        if len_before == 0 {
            // End(0) with nothing left: the activation is done.
            return Ok(EndOutcome::Return);
        }
        match m.blocks.pop().expect("len checked above") {
            Block::Enum { .. } => {}
            Block::With { saved_scope } => m.scope = saved_scope,
            // A normally-completed try-catch just uninstalls.
            Block::TryC { .. } => {}
            Block::TryF { handler, stack } => {
                m.stack.truncate(stack);
                m.blocks.push(Block::Finally {
                    saved: Saved::EndTo { n, resume_pc: pc_after },
                });
                return Ok(EndOutcome::Continue(handler));
            }
            Block::Finally { saved } => {
                // Natural termination: this End names the finally block's
                // own level. A deeper target means the finally overrode
                // the interrupted completion with its own.
                let natural = n == len_before;
                if natural {
                    match saved {
                        Saved::Pending(err) => return Ok(EndOutcome::Rethrow(err)),
                        Saved::EndTo { n: saved_n, resume_pc } => {
                            n = saved_n;
                            pc_after = resume_pc;
                        }
                    }
                }
            }
        }
    }
}

impl<'c> Machine<'c> {
    fn top(&self) -> Result<&Operand, JsError> {
        self.stack
            .last()
            .ok_or_else(|| JsError::internal("value stack underflow"))
    }

    fn pop(&mut self) -> Result<Operand, JsError> {
        self.stack
            .pop()
            .ok_or_else(|| JsError::internal("value stack underflow"))
    }

    fn pop_value(&mut self, interp: &mut Interpreter) -> Result<Value, JsError> {
        let op = self.pop()?;
        interp.get_value(&op)
    }

    fn pop_number(&mut self, interp: &mut Interpreter) -> Result<f64, JsError> {
        match self.pop_value(interp)? {
            Value::Number(n) => Ok(n),
            other => Err(JsError::internal(format!(
                "expected number on stack, found {}",
                other
            ))),
        }
    }

    fn pop_string(&mut self, interp: &mut Interpreter) -> Result<JsString, JsError> {
        match self.pop_value(interp)? {
            Value::String(s) => Ok(s),
            other => Err(JsError::internal(format!(
                "expected string on stack, found {}",
                other
            ))),
        }
    }

    fn pop_object(&mut self) -> Result<JsObjectRef, JsError> {
        match self.pop()? {
            Operand::Value(Value::Object(o)) => Ok(o),
            other => Err(JsError::internal(format!(
                "expected object on stack, found {:?}",
                other
            ))),
        }
    }

    /// Pop `argc` arguments; the compiler fetches argument values before
    /// the call, so only plain values appear here.
    fn pop_args(&mut self, _interp: &mut Interpreter, argc: usize) -> Result<Vec<Value>, JsError> {
        if self.stack.len() < argc {
            return Err(JsError::internal("value stack underflow in call"));
        }
        let start = self.stack.len() - argc;
        let mut args = Vec::with_capacity(argc);
        for op in self.stack.drain(start..) {
            match op {
                Operand::Value(v) => args.push(v),
                Operand::Ref(_) => {
                    return Err(JsError::internal("reference passed as call argument"))
                }
            }
        }
        Ok(args)
    }

    /// Advance the innermost enumeration, skipping names deleted since
    /// the enumeration began.
    fn next_enum_name(&mut self) -> Option<JsString> {
        let block = self
            .blocks
            .iter_mut()
            .rev()
            .find(|b| matches!(b, Block::Enum { .. }))?;
        if let Block::Enum { obj, names, pos } = block {
            while *pos < names.len() {
                let name = names[*pos].clone();
                *pos += 1;
                if object::has_property(obj, &name) {
                    return Some(name);
                }
            }
        }
        None
    }
}

fn binary_op_of(instr: &Instr) -> crate::ast::BinaryOp {
    use crate::ast::BinaryOp::*;
    match instr {
        Instr::Mul => Mul,
        Instr::Div => Div,
        Instr::Mod => Mod,
        Instr::Add => Add,
        Instr::Sub => Sub,
        Instr::LShift => LShift,
        Instr::RShift => RShift,
        Instr::URShift => URShift,
        Instr::Lt => Lt,
        Instr::Gt => Gt,
        Instr::Le => LtEq,
        Instr::Ge => GtEq,
        Instr::InstanceOf => InstanceOf,
        Instr::In => In,
        Instr::Eq => Eq,
        Instr::Seq => StrictEq,
        Instr::BAnd => BitAnd,
        Instr::BXor => BitXor,
        Instr::BOr => BitOr,
        _ => unreachable!("not a binary instruction"),
    }
}
