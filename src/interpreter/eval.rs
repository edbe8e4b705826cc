//! Tree-walking evaluator.
//!
//! Statements produce [`Completion`]s with the completion value threaded
//! through a `C` register, matching the specification's statement
//! semantics; expressions produce [`Operand`]s (values or references).
//! Throws propagate as `Err`, unwinding to the nearest `try`.

use std::rc::Rc;

use crate::ast::{
    BinaryOp, CatchClause, Expression, ForInLeft, ForInit, Function, LiteralValue, LogicalOp,
    Statement, UnaryOp, UpdateOp, VarDecl,
};
use crate::context::{self, Context, Scope};
use crate::error::{JsError, SourceLocation};
use crate::interpreter::{Interpreter, TraceEvent};
use crate::object::{self, Attrs, JsObject, JsObjectRef, ObjectData};
use crate::string::JsString;
use crate::value::{
    self, abstract_equals, abstract_relational, strict_equals, to_boolean, to_number, to_object,
    to_primitive, to_string_value, Completion, Hint, Operand, Reference, Value,
};

impl Interpreter {
    /// Execute a function body (or Program) against a context: hoist
    /// declarations onto the variable object, then run the statement
    /// list. The result is the `Return` value, or the final `C` value
    /// for code that falls off the end.
    pub(crate) fn exec_body_ast(
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
        let result = self.exec_body_ast_inner(func, ctxt, as_function);
        self.current_file = saved_file;
        self.depth -= 1;
        result
    }

    fn exec_body_ast_inner(
        &mut self,
        func: &Rc<Function>,
        ctxt: &Context,
        as_function: bool,
    ) -> Result<Value, JsError> {
        self.hoist_declarations(func, ctxt);

        let mut c = None;
        for stmt in &func.body.statements {
            match self.eval_stmt(stmt, ctxt, &mut c)? {
                Completion::Normal => {}
                Completion::Return(v) => return Ok(v),
                Completion::Break(_) | Completion::Continue(_) => {
                    return Err(JsError::internal("unhandled break/continue completion"))
                }
            }
        }
        // Falling off the end of a function is `undefined`; program and
        // eval code surface the final completion value.
        if as_function {
            Ok(Value::Undefined)
        } else {
            Ok(c.unwrap_or(Value::Undefined))
        }
    }

    /// Bind nested function declarations (first), then every declared
    /// variable not already bound, onto the context's variable object.
    pub(crate) fn hoist_declarations(&mut self, func: &Rc<Function>, ctxt: &Context) {
        for fd in &func.body.funcdecls {
            let instance = self.make_function_instance(fd, &ctxt.scope);
            if let Some(name) = &fd.name {
                object::put(&ctxt.variable, name, Value::Object(instance), ctxt.var_attr);
            }
        }
        for var in &func.body.vars {
            if !object::has_property(&ctxt.variable, var) {
                object::put(&ctxt.variable, var, Value::Undefined, ctxt.var_attr);
            }
        }
    }

    // ============ STATEMENTS ============

    fn eval_stmt(
        &mut self,
        stmt: &Statement,
        ctxt: &Context,
        c: &mut Option<Value>,
    ) -> Result<Completion, JsError> {
        match stmt {
            Statement::Block(body) => self.eval_stmt_list(body, ctxt, c),

            Statement::Var { decls, line } => {
                self.at_statement(*line);
                for decl in decls {
                    self.eval_var_init(decl, ctxt)?;
                }
                Ok(Completion::Normal)
            }

            Statement::Empty | Statement::FunctionDecl(_) => Ok(Completion::Normal),

            Statement::Expression { expr, line } => {
                self.at_statement(*line);
                let op = self.eval_expr(expr, ctxt)?;
                let v = self.get_value(&op)?;
                *c = Some(v);
                Ok(Completion::Normal)
            }

            Statement::If {
                test,
                consequent,
                alternate,
                line,
            } => {
                self.at_statement(*line);
                if self.eval_to_boolean(test, ctxt)? {
                    self.eval_stmt(consequent, ctxt, c)
                } else if let Some(alt) = alternate {
                    self.eval_stmt(alt, ctxt, c)
                } else {
                    Ok(Completion::Normal)
                }
            }

            Statement::Do {
                body,
                test,
                target,
                line,
            } => {
                self.at_statement(*line);
                loop {
                    match self.eval_stmt(body, ctxt, c)? {
                        Completion::Normal => {}
                        Completion::Continue(t) if t == *target => {}
                        Completion::Break(t) if t == *target => return Ok(Completion::Normal),
                        other => return Ok(other),
                    }
                    if !self.eval_to_boolean(test, ctxt)? {
                        return Ok(Completion::Normal);
                    }
                }
            }

            Statement::While {
                test,
                body,
                target,
                line,
            } => {
                self.at_statement(*line);
                loop {
                    if !self.eval_to_boolean(test, ctxt)? {
                        return Ok(Completion::Normal);
                    }
                    match self.eval_stmt(body, ctxt, c)? {
                        Completion::Normal => {}
                        Completion::Continue(t) if t == *target => {}
                        Completion::Break(t) if t == *target => return Ok(Completion::Normal),
                        other => return Ok(other),
                    }
                }
            }

            Statement::For {
                init,
                test,
                update,
                body,
                target,
                line,
            } => {
                self.at_statement(*line);
                match init {
                    Some(ForInit::Var(decls)) => {
                        for decl in decls {
                            self.eval_var_init(decl, ctxt)?;
                        }
                    }
                    Some(ForInit::Expr(e)) => {
                        let op = self.eval_expr(e, ctxt)?;
                        self.get_value(&op)?;
                    }
                    None => {}
                }
                loop {
                    if let Some(test) = test {
                        if !self.eval_to_boolean(test, ctxt)? {
                            return Ok(Completion::Normal);
                        }
                    }
                    match self.eval_stmt(body, ctxt, c)? {
                        Completion::Normal => {}
                        Completion::Continue(t) if t == *target => {}
                        Completion::Break(t) if t == *target => return Ok(Completion::Normal),
                        other => return Ok(other),
                    }
                    if let Some(update) = update {
                        let op = self.eval_expr(update, ctxt)?;
                        self.get_value(&op)?;
                    }
                }
            }

            Statement::ForIn {
                left,
                object: object_expr,
                body,
                target,
                line,
            } => {
                self.at_statement(*line);
                if let ForInLeft::Var(decl) = left {
                    self.eval_var_init(decl, ctxt)?;
                }
                let op = self.eval_expr(object_expr, ctxt)?;
                let obj_value = self.get_value(&op)?;
                let obj = to_object(self, &obj_value)?;

                // Names are computed once up front; properties deleted
                // while iterating are skipped by the has_property check.
                let names = object::enumerate_chain(&obj);
                for name in names {
                    if !object::has_property(&obj, &name) {
                        continue;
                    }
                    let lhs = match left {
                        ForInLeft::Expr(e) => self.eval_expr(e, ctxt)?,
                        ForInLeft::Var(decl) => Operand::Ref(Reference {
                            base: Some(ctxt.variable.clone()),
                            property: decl.name.clone(),
                        }),
                    };
                    self.put_value(&lhs, Value::String(name))?;
                    match self.eval_stmt(body, ctxt, c)? {
                        Completion::Normal => {}
                        Completion::Continue(t) if t == *target => {}
                        Completion::Break(t) if t == *target => return Ok(Completion::Normal),
                        other => return Ok(other),
                    }
                }
                Ok(Completion::Normal)
            }

            Statement::Continue { target, line, .. } => {
                self.at_statement(*line);
                Ok(Completion::Continue(*target))
            }

            Statement::Break { target, line, .. } => {
                self.at_statement(*line);
                Ok(Completion::Break(*target))
            }

            Statement::Return { value, line } => {
                self.at_statement(*line);
                let v = match value {
                    Some(e) => {
                        let op = self.eval_expr(e, ctxt)?;
                        self.get_value(&op)?
                    }
                    None => Value::Undefined,
                };
                Ok(Completion::Return(v))
            }

            Statement::With { object: e, body, line } => {
                self.at_statement(*line);
                let op = self.eval_expr(e, ctxt)?;
                let v = self.get_value(&op)?;
                let obj = to_object(self, &v)?;
                let inner = ctxt.with_scope(Scope::prepend(obj, &ctxt.scope));
                // The chain restores automatically: the prepended link
                // only lives in `inner`.
                self.eval_stmt(body, &inner, c)
            }

            Statement::Labelled { body, target, .. } => {
                match self.eval_stmt(body, ctxt, c)? {
                    Completion::Break(t) if t == *target => Ok(Completion::Normal),
                    other => Ok(other),
                }
            }

            Statement::Switch {
                discriminant,
                cases,
                default,
                target,
                line,
            } => {
                self.at_statement(*line);
                let op = self.eval_expr(discriminant, ctxt)?;
                let disc = self.get_value(&op)?;

                let mut start = None;
                for (i, case) in cases.iter().enumerate() {
                    if let Some(test) = &case.test {
                        let top = self.eval_expr(test, ctxt)?;
                        let tv = self.get_value(&top)?;
                        if strict_equals(&disc, &tv) {
                            start = Some(i);
                            break;
                        }
                    }
                }
                let start = match start.or(*default) {
                    Some(i) => i,
                    None => return Ok(Completion::Normal),
                };
                for case in &cases[start..] {
                    match self.eval_stmt_list(&case.body, ctxt, c)? {
                        Completion::Normal => {}
                        Completion::Break(t) if t == *target => return Ok(Completion::Normal),
                        other => return Ok(other),
                    }
                }
                Ok(Completion::Normal)
            }

            Statement::Throw { value, line } => {
                self.at_statement(*line);
                let op = self.eval_expr(value, ctxt)?;
                let v = self.get_value(&op)?;
                Err(self.throw_value(v))
            }

            Statement::Try {
                block,
                catch,
                finally,
                line,
            } => {
                self.at_statement(*line);
                let mut outcome = self.eval_stmt_list(block, ctxt, c);

                if let Some(clause) = catch {
                    outcome = match outcome {
                        Err(err) => self.eval_catch(err, clause, ctxt, c),
                        ok => ok,
                    };
                }

                if let Some(fin) = finally {
                    match self.eval_stmt_list(fin, ctxt, c) {
                        // A finally that completes normally preserves the
                        // earlier outcome; anything else overrides it.
                        Ok(Completion::Normal) => {}
                        other => outcome = other,
                    }
                }
                outcome
            }
        }
    }

    fn eval_catch(
        &mut self,
        err: JsError,
        clause: &CatchClause,
        ctxt: &Context,
        c: &mut Option<Value>,
    ) -> Result<Completion, JsError> {
        let thrown = self.error_to_value(err);
        // One-property shield object prepended for the catch body.
        let shield = JsObject::ordinary(Some(self.object_prototype.clone()));
        shield
            .borrow_mut()
            .define(clause.param.clone(), thrown, Attrs::DONT_DELETE);
        let inner = ctxt.with_scope(Scope::prepend(shield, &ctxt.scope));
        self.eval_stmt_list(&clause.body, &inner, c)
    }

    fn eval_stmt_list(
        &mut self,
        body: &[Statement],
        ctxt: &Context,
        c: &mut Option<Value>,
    ) -> Result<Completion, JsError> {
        for stmt in body {
            match self.eval_stmt(stmt, ctxt, c)? {
                Completion::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    /// A `var` initializer writes straight to the variable object the
    /// declaration was hoisted onto, bypassing any `with`/`catch`
    /// shadowing in between.
    fn eval_var_init(&mut self, decl: &VarDecl, ctxt: &Context) -> Result<(), JsError> {
        if let Some(init) = &decl.init {
            let lhs = Operand::Ref(Reference {
                base: Some(ctxt.variable.clone()),
                property: decl.name.clone(),
            });
            let op = self.eval_expr(init, ctxt)?;
            let v = self.get_value(&op)?;
            self.put_value(&lhs, v)?;
        }
        Ok(())
    }

    fn at_statement(&mut self, line: u32) {
        self.location = Some(SourceLocation::new(self.current_file.clone(), line));
        self.trace_event(TraceEvent::Statement);
    }

    fn eval_to_boolean(&mut self, expr: &Expression, ctxt: &Context) -> Result<bool, JsError> {
        let op = self.eval_expr(expr, ctxt)?;
        let v = self.get_value(&op)?;
        Ok(to_boolean(&v))
    }

    // ============ EXPRESSIONS ============

    pub(crate) fn eval_expr(
        &mut self,
        expr: &Expression,
        ctxt: &Context,
    ) -> Result<Operand, JsError> {
        if self.depth >= self.recursion_limit {
            return Err(self.throw_range_error("stack overflow"));
        }
        self.depth += 1;
        let result = self.eval_expr_inner(expr, ctxt);
        self.depth -= 1;
        result
    }

    fn eval_expr_inner(&mut self, expr: &Expression, ctxt: &Context) -> Result<Operand, JsError> {
        match expr {
            Expression::Literal(lit) => Ok(Operand::Value(literal_value(lit))),

            Expression::Regex { source } => {
                let (pattern, flags) = split_regex_source(source);
                let ctor = self.regexp_ctor.clone();
                let obj = self.construct(
                    &ctor,
                    &[Value::String(pattern), Value::String(flags)],
                )?;
                Ok(Operand::Value(Value::Object(obj)))
            }

            Expression::This => Ok(Operand::Value(Value::Object(ctxt.this_obj.clone()))),

            Expression::Identifier(name) => {
                Ok(Operand::Ref(context::lookup(&ctxt.scope, name)))
            }

            Expression::Array { elements } => {
                let arr = self.make_array();
                for (i, element) in elements.iter().enumerate() {
                    if let Some(e) = element {
                        let op = self.eval_expr(e, ctxt)?;
                        let v = self.get_value(&op)?;
                        let name = self.intern(&i.to_string());
                        object::put(&arr, &name, v, Attrs::NONE);
                    }
                }
                // Trailing elisions still count toward length.
                if let ObjectData::Array { length } = &mut arr.borrow_mut().data {
                    *length = (*length).max(elements.len() as u32);
                }
                Ok(Operand::Value(Value::Object(arr)))
            }

            Expression::Object { properties } => {
                let obj = JsObject::ordinary(Some(self.object_prototype.clone()));
                for (name, e) in properties {
                    let op = self.eval_expr(e, ctxt)?;
                    let v = self.get_value(&op)?;
                    let name = self.intern_js(name);
                    object::put(&obj, &name, v, Attrs::NONE);
                }
                Ok(Operand::Value(Value::Object(obj)))
            }

            Expression::Function(func) => {
                let instance = self.instantiate_function_expr(func, &ctxt.scope);
                Ok(Operand::Value(Value::Object(instance)))
            }

            Expression::Member { object: e, property } => {
                let op = self.eval_expr(e, ctxt)?;
                let v = self.get_value(&op)?;
                let base = to_object(self, &v)?;
                Ok(Operand::Ref(Reference {
                    base: Some(base),
                    property: property.clone(),
                }))
            }

            Expression::Index { object: e, index } => {
                let op = self.eval_expr(e, ctxt)?;
                let v = self.get_value(&op)?;
                let base = to_object(self, &v)?;
                let iop = self.eval_expr(index, ctxt)?;
                let iv = self.get_value(&iop)?;
                let name = to_string_value(self, &iv)?;
                let name = self.intern_js(&name);
                Ok(Operand::Ref(Reference {
                    base: Some(base),
                    property: name,
                }))
            }

            Expression::New { callee, arguments } => {
                let cop = self.eval_expr(callee, ctxt)?;
                let cv = self.get_value(&cop)?;
                let args = self.eval_arguments(arguments, ctxt)?;
                let ctor = match &cv {
                    Value::Undefined => {
                        return Err(self.throw_type_error("no such constructor"))
                    }
                    Value::Object(o) => o.clone(),
                    _ => return Err(self.throw_type_error("not a constructor")),
                };
                if !ctor.borrow().has_construct() {
                    return Err(self.throw_type_error("object is not a constructor"));
                }
                let obj = self.construct(&ctor, &args)?;
                Ok(Operand::Value(Value::Object(obj)))
            }

            Expression::Call { callee, arguments } => {
                let cop = self.eval_expr(callee, ctxt)?;

                // The reference base becomes `this`, unless it is an
                // activation object.
                let this = match &cop {
                    Operand::Ref(Reference {
                        base: Some(base), ..
                    }) if !base.borrow().is_activation() => Some(base.clone()),
                    _ => None,
                };

                let cv = self.get_value(&cop)?;
                let args = self.eval_arguments(arguments, ctxt)?;
                let func = match &cv {
                    Value::Undefined => {
                        let what = match &cop {
                            Operand::Ref(r) => format!("{} is not a function", r.property),
                            _ => "value is not a function".to_string(),
                        };
                        return Err(self.throw_type_error(&what));
                    }
                    Value::Object(o) => o.clone(),
                    _ => return Err(self.throw_type_error("value is not a function")),
                };
                if !func.borrow().has_call() {
                    return Err(self.throw_type_error("object is not callable"));
                }

                // A direct call to the global eval borrows this context.
                if Rc::ptr_eq(&func, &self.global_eval) {
                    let arg = args.first().cloned().unwrap_or(Value::Undefined);
                    let v = self.eval_with_context(ctxt, &arg)?;
                    return Ok(Operand::Value(v));
                }

                let v = self.call(&func, this.as_ref(), &args)?;
                Ok(Operand::Value(v))
            }

            Expression::Postfix { op, operand } => {
                let lhs = self.eval_expr(operand, ctxt)?;
                let old = self.get_value(&lhs)?;
                let old = to_number(self, &old)?;
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.put_value(&lhs, Value::Number(new))?;
                Ok(Operand::Value(Value::Number(old)))
            }

            Expression::Prefix { op, operand } => {
                let lhs = self.eval_expr(operand, ctxt)?;
                let old = self.get_value(&lhs)?;
                let old = to_number(self, &old)?;
                let new = match op {
                    UpdateOp::Increment => old + 1.0,
                    UpdateOp::Decrement => old - 1.0,
                };
                self.put_value(&lhs, Value::Number(new))?;
                Ok(Operand::Value(Value::Number(new)))
            }

            Expression::Unary { op, operand } => self.eval_unary(*op, operand, ctxt),

            Expression::Binary { op, left, right } => {
                let lop = self.eval_expr(left, ctxt)?;
                let lv = self.get_value(&lop)?;
                let rop = self.eval_expr(right, ctxt)?;
                let rv = self.get_value(&rop)?;
                let v = self.apply_binary(*op, &lv, &rv)?;
                Ok(Operand::Value(v))
            }

            Expression::Logical { op, left, right } => {
                let lop = self.eval_expr(left, ctxt)?;
                let lv = self.get_value(&lop)?;
                let take_right = match op {
                    LogicalOp::And => to_boolean(&lv),
                    LogicalOp::Or => !to_boolean(&lv),
                };
                if take_right {
                    let rop = self.eval_expr(right, ctxt)?;
                    let rv = self.get_value(&rop)?;
                    Ok(Operand::Value(rv))
                } else {
                    Ok(Operand::Value(lv))
                }
            }

            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                let branch = if self.eval_to_boolean(test, ctxt)? {
                    consequent
                } else {
                    alternate
                };
                let op = self.eval_expr(branch, ctxt)?;
                let v = self.get_value(&op)?;
                Ok(Operand::Value(v))
            }

            Expression::Assign { op, target, value } => {
                let lhs = self.eval_expr(target, ctxt)?;
                let v = match op {
                    None => {
                        let rop = self.eval_expr(value, ctxt)?;
                        self.get_value(&rop)?
                    }
                    Some(op) => {
                        let old = self.get_value(&lhs)?;
                        let rop = self.eval_expr(value, ctxt)?;
                        let rv = self.get_value(&rop)?;
                        self.apply_binary(*op, &old, &rv)?
                    }
                };
                self.put_value(&lhs, v.clone())?;
                Ok(Operand::Value(v))
            }

            Expression::Comma { left, right } => {
                let lop = self.eval_expr(left, ctxt)?;
                self.get_value(&lop)?;
                let rop = self.eval_expr(right, ctxt)?;
                let v = self.get_value(&rop)?;
                Ok(Operand::Value(v))
            }
        }
    }

    fn eval_arguments(
        &mut self,
        arguments: &[Expression],
        ctxt: &Context,
    ) -> Result<Vec<Value>, JsError> {
        let mut args = Vec::with_capacity(arguments.len());
        for a in arguments {
            let op = self.eval_expr(a, ctxt)?;
            args.push(self.get_value(&op)?);
        }
        Ok(args)
    }

    fn eval_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expression,
        ctxt: &Context,
    ) -> Result<Operand, JsError> {
        match op {
            UnaryOp::Delete => {
                let target = self.eval_expr(operand, ctxt)?;
                let result = match &target {
                    Operand::Value(_) => true,
                    Operand::Ref(Reference { base: None, .. }) => true,
                    Operand::Ref(Reference {
                        base: Some(base),
                        property,
                    }) => object::delete(base, property),
                };
                Ok(Operand::Value(Value::Boolean(result)))
            }
            UnaryOp::Void => {
                let op = self.eval_expr(operand, ctxt)?;
                self.get_value(&op)?;
                Ok(Operand::Value(Value::Undefined))
            }
            UnaryOp::TypeOf => {
                let target = self.eval_expr(operand, ctxt)?;
                // An unresolvable reference is "undefined", not a throw.
                let name = match &target {
                    Operand::Ref(Reference { base: None, .. }) => "undefined",
                    _ => {
                        let v = self.get_value(&target)?;
                        type_of_name(&v)
                    }
                };
                Ok(Operand::Value(Value::String(self.intern(name))))
            }
            UnaryOp::Plus => {
                let op = self.eval_expr(operand, ctxt)?;
                let v = self.get_value(&op)?;
                let n = to_number(self, &v)?;
                Ok(Operand::Value(Value::Number(n)))
            }
            UnaryOp::Minus => {
                let op = self.eval_expr(operand, ctxt)?;
                let v = self.get_value(&op)?;
                let n = to_number(self, &v)?;
                Ok(Operand::Value(Value::Number(-n)))
            }
            UnaryOp::BitNot => {
                let op = self.eval_expr(operand, ctxt)?;
                let v = self.get_value(&op)?;
                let n = to_number(self, &v)?;
                Ok(Operand::Value(Value::Number(f64::from(!value::to_int32(n)))))
            }
            UnaryOp::Not => {
                let op = self.eval_expr(operand, ctxt)?;
                let v = self.get_value(&op)?;
                Ok(Operand::Value(Value::Boolean(!to_boolean(&v))))
            }
        }
    }

    /// Instantiate a function *expression*. A named one can refer to
    /// itself (§13), so its name is bound on a scope object wrapped
    /// around the captured chain.
    pub(crate) fn instantiate_function_expr(
        &mut self,
        func: &Rc<Function>,
        scope: &crate::context::ScopeRef,
    ) -> JsObjectRef {
        match &func.name {
            Some(name) => {
                let env = JsObject::ordinary(Some(self.object_prototype.clone()));
                let inner = Scope::prepend(env.clone(), scope);
                let instance = self.make_function_instance(func, &inner);
                env.borrow_mut().define(
                    name.clone(),
                    Value::Object(instance.clone()),
                    Attrs::READ_ONLY.union(Attrs::DONT_DELETE),
                );
                instance
            }
            None => self.make_function_instance(func, scope),
        }
    }

    /// Binary operator semantics on already-fetched values. Shared by the
    /// evaluator's binary nodes, compound assignment, and the VM.
    pub(crate) fn apply_binary(
        &mut self,
        op: BinaryOp,
        x: &Value,
        y: &Value,
    ) -> Result<Value, JsError> {
        use BinaryOp::*;
        let v = match op {
            Add => {
                let px = to_primitive(self, x, Hint::None)?;
                let py = to_primitive(self, y, Hint::None)?;
                if px.as_js_string().is_some() || py.as_js_string().is_some() {
                    let sx = to_string_value(self, &px)?;
                    let sy = to_string_value(self, &py)?;
                    Value::String(value::concat_strings(&sx, &sy))
                } else {
                    let nx = to_number(self, &px)?;
                    let ny = to_number(self, &py)?;
                    Value::Number(nx + ny)
                }
            }
            Sub => Value::Number(to_number(self, x)? - to_number(self, y)?),
            Mul => Value::Number(to_number(self, x)? * to_number(self, y)?),
            Div => Value::Number(to_number(self, x)? / to_number(self, y)?),
            Mod => Value::Number(to_number(self, x)? % to_number(self, y)?),
            LShift => {
                let a = value::to_int32(to_number(self, x)?);
                let b = value::to_uint32(to_number(self, y)?) & 0x1f;
                Value::Number(f64::from(a << b))
            }
            RShift => {
                let a = value::to_int32(to_number(self, x)?);
                let b = value::to_uint32(to_number(self, y)?) & 0x1f;
                Value::Number(f64::from(a >> b))
            }
            URShift => {
                let a = value::to_uint32(to_number(self, x)?);
                let b = value::to_uint32(to_number(self, y)?) & 0x1f;
                Value::Number(f64::from(a >> b))
            }
            Lt => Value::Boolean(abstract_relational(self, x, y)?.unwrap_or(false)),
            Gt => Value::Boolean(abstract_relational(self, y, x)?.unwrap_or(false)),
            LtEq => Value::Boolean(!abstract_relational(self, y, x)?.unwrap_or(true)),
            GtEq => Value::Boolean(!abstract_relational(self, x, y)?.unwrap_or(true)),
            In => {
                let obj = match y {
                    Value::Object(o) => o.clone(),
                    _ => {
                        return Err(
                            self.throw_type_error("right-hand side of 'in' is not an object")
                        )
                    }
                };
                let name = to_string_value(self, x)?;
                let name = self.intern_js(&name);
                Value::Boolean(object::has_property(&obj, &name))
            }
            InstanceOf => {
                let obj = match y {
                    Value::Object(o) => o.clone(),
                    _ => {
                        return Err(self
                            .throw_type_error("right-hand side of 'instanceof' is not an object"))
                    }
                };
                Value::Boolean(self.has_instance(&obj, x)?)
            }
            Eq => Value::Boolean(abstract_equals(self, x, y)?),
            NotEq => Value::Boolean(!abstract_equals(self, x, y)?),
            StrictEq => Value::Boolean(strict_equals(x, y)),
            StrictNotEq => Value::Boolean(!strict_equals(x, y)),
            BitAnd => Value::Number(f64::from(
                value::to_int32(to_number(self, x)?) & value::to_int32(to_number(self, y)?),
            )),
            BitXor => Value::Number(f64::from(
                value::to_int32(to_number(self, x)?) ^ value::to_int32(to_number(self, y)?),
            )),
            BitOr => Value::Number(f64::from(
                value::to_int32(to_number(self, x)?) | value::to_int32(to_number(self, y)?),
            )),
        };
        Ok(v)
    }
}

/// `typeof` name for a fetched value.
pub(crate) fn type_of_name(v: &Value) -> &'static str {
    match v {
        Value::Undefined => "undefined",
        Value::Null => "object",
        Value::Boolean(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Object(o) => {
            if o.borrow().has_call() {
                "function"
            } else {
                "object"
            }
        }
    }
}

pub(crate) fn literal_value(lit: &LiteralValue) -> Value {
    match lit {
        LiteralValue::Undefined => Value::Undefined,
        LiteralValue::Null => Value::Null,
        LiteralValue::Boolean(b) => Value::Boolean(*b),
        LiteralValue::Number(n) => Value::Number(*n),
        LiteralValue::String(s) => Value::String(s.clone()),
    }
}

/// Split a lexed `/pattern/flags` regex literal into its parts.
pub(crate) fn split_regex_source(source: &JsString) -> (JsString, JsString) {
    let len = source.len();
    let mut end = len;
    // The final slash separates flags; the leading one is index 0.
    let mut i = len;
    while i > 1 {
        i -= 1;
        if source.unit_at(i) == Some(b'/' as u16) {
            end = i;
            break;
        }
    }
    let pattern = source.substring(1, end);
    let flags = source.substring(end + 1, len);
    (pattern, flags)
}
