//! The interpreter root object and its entry points.
//!
//! An [`Interpreter`] owns everything a running script can reach: the
//! global object and scope, the built-in constructors and prototypes the
//! language core depends on, the string intern table, the compatibility
//! flags, the recursion budget, and the traceback of the throw in flight.
//!
//! Execution back-ends live in submodules: `eval` walks the tree, `vm`
//! runs compiled bytecode. Both produce identical observable behavior;
//! the back-end is chosen per interpreter.

pub mod eval;
pub mod vm;

use std::rc::Rc;

use crate::ast;
use crate::compat::Compat;
use crate::context::{Context, Scope, ScopeRef};
use crate::error::{CallKind, JsError, SourceLocation, TracebackFrame};
use crate::input::Input;
use crate::object::{
    self, Attrs, FunctionData, JsObject, JsObjectRef, NativeCtor, NativeData, NativeFn, ObjectData,
};
use crate::parser::Parser;
use crate::string::JsString;
use crate::string_dict::{self, StringDict};
use crate::value::{self, Hint, Operand, Value};

/// Which execution engine runs function bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    /// Walk the syntax tree directly.
    #[default]
    Ast,
    /// Compile bodies to bytecode on first execution.
    Bytecode,
}

/// Event passed to the host trace callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Statement,
    Call,
    Return,
    Throw,
}

/// Host trace hook, invoked at statement boundaries and call edges.
pub type TraceFn = Box<dyn FnMut(&Option<SourceLocation>, TraceEvent)>;

/// Default recursion budget. Exceeding it raises RangeError, never
/// corrupts state.
pub const DEFAULT_RECURSION_LIMIT: u32 = 512;

pub struct Interpreter {
    pub compat: Compat,
    pub backend: Backend,

    // Built-in objects the core depends on.
    pub global: JsObjectRef,
    pub global_scope: ScopeRef,
    pub object_ctor: JsObjectRef,
    pub object_prototype: JsObjectRef,
    pub function_ctor: JsObjectRef,
    pub function_prototype: JsObjectRef,
    pub array_ctor: JsObjectRef,
    pub array_prototype: JsObjectRef,
    pub string_prototype: JsObjectRef,
    pub number_prototype: JsObjectRef,
    pub boolean_prototype: JsObjectRef,
    pub regexp_ctor: JsObjectRef,
    pub regexp_prototype: JsObjectRef,
    pub error_ctor: JsObjectRef,
    pub eval_error_ctor: JsObjectRef,
    pub range_error_ctor: JsObjectRef,
    pub reference_error_ctor: JsObjectRef,
    pub syntax_error_ctor: JsObjectRef,
    pub type_error_ctor: JsObjectRef,
    pub uri_error_ctor: JsObjectRef,
    /// The global `eval` function; call sites compare against it to detect
    /// direct eval.
    pub global_eval: JsObjectRef,

    dict: StringDict,

    /// Call traceback for the throw in flight, oldest frame first.
    pub traceback: Vec<TracebackFrame>,
    /// The location register: where evaluation currently is.
    pub location: Option<SourceLocation>,
    /// File of the function body currently executing.
    pub(crate) current_file: Option<JsString>,

    pub recursion_limit: u32,
    pub(crate) depth: u32,

    pub trace: Option<TraceFn>,
}

impl Interpreter {
    /// Create an interpreter with strict ECMA-262 behavior.
    pub fn new() -> Self {
        Interpreter::with_compat(Compat::strict())
    }

    /// Create an interpreter with the given compatibility flags and all
    /// built-in objects populated.
    pub fn with_compat(compat: Compat) -> Self {
        let mut dict = StringDict::with_common_strings();
        string_dict::seed_from_global(&mut dict);

        // The prototype spine has to exist before anything else.
        let object_prototype = JsObject::ordinary(None);
        let function_prototype = JsObject::new(
            "Function",
            Some(object_prototype.clone()),
            ObjectData::Native(NativeData {
                name: dict.intern_str(""),
                call: Some(natives::function_prototype_call),
                construct: None,
            }),
        );
        let global = JsObject::new("Global", Some(object_prototype.clone()), ObjectData::Ordinary);
        let global_scope = Scope::root(global.clone());

        let mut interp = Interpreter {
            compat,
            backend: Backend::default(),
            global: global.clone(),
            global_scope,
            object_ctor: object_prototype.clone(), // placeholders, wired by install()
            object_prototype,
            function_ctor: function_prototype.clone(),
            function_prototype,
            array_ctor: global.clone(),
            array_prototype: global.clone(),
            string_prototype: global.clone(),
            number_prototype: global.clone(),
            boolean_prototype: global.clone(),
            regexp_ctor: global.clone(),
            regexp_prototype: global.clone(),
            error_ctor: global.clone(),
            eval_error_ctor: global.clone(),
            range_error_ctor: global.clone(),
            reference_error_ctor: global.clone(),
            syntax_error_ctor: global.clone(),
            type_error_ctor: global.clone(),
            uri_error_ctor: global.clone(),
            global_eval: global,
            dict,
            traceback: Vec::new(),
            location: None,
            current_file: None,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            depth: 0,
            trace: None,
        };
        natives::install(&mut interp);
        interp
    }

    /// Select the execution back-end.
    pub fn set_backend(&mut self, backend: Backend) {
        self.backend = backend;
    }

    // ============ INTERNING ============

    pub(crate) fn dict_mut(&mut self) -> &mut StringDict {
        &mut self.dict
    }

    pub fn intern(&mut self, s: &str) -> JsString {
        self.dict.intern_str(s)
    }

    pub fn intern_js(&mut self, s: &JsString) -> JsString {
        self.dict.intern(s)
    }

    // ============ ENTRY POINTS ============

    /// Parse and execute a Program; the result is the final value of the
    /// completion register.
    pub fn eval(&mut self, input: Input) -> Result<Value, JsError> {
        let program = self.parse_program(input)?;
        let ctxt = self.global_context();
        self.exec_body(&program, &ctxt, false)
    }

    /// Convenience wrapper over [`Interpreter::eval`] for host strings.
    pub fn eval_str(&mut self, source: &str) -> Result<Value, JsError> {
        self.eval(Input::from_string(source))
    }

    /// Parse a Program without executing it.
    pub fn parse_program(&mut self, input: Input) -> Result<Rc<ast::Function>, JsError> {
        let mut parser = Parser::new(self, input);
        parser.parse_program()
    }

    /// Parse a function from separate parameter-list and body inputs, as
    /// the `Function` constructor does.
    pub fn parse_function(
        &mut self,
        name: Option<JsString>,
        params_input: Input,
        body_input: Input,
    ) -> Result<Rc<ast::Function>, JsError> {
        let params = Parser::new(self, params_input).parse_formal_parameters()?;
        let filename = body_input.filename().cloned();
        let mut parser = Parser::new(self, body_input);
        let body = parser.parse_function_body_only()?;
        Ok(Rc::new(
            ast::Function::new(name, params, body).with_filename(filename),
        ))
    }

    /// Execute a parsed function body in an existing context, binding its
    /// declarations on the context's variable object.
    pub fn eval_function_body(
        &mut self,
        func: &Rc<ast::Function>,
        ctxt: &Context,
    ) -> Result<Value, JsError> {
        self.exec_body(func, ctxt, false)
    }

    /// The context global code runs in.
    pub fn global_context(&self) -> Context {
        Context {
            scope: self.global_scope.clone(),
            variable: self.global.clone(),
            this_obj: self.global.clone(),
            var_attr: Attrs::DONT_DELETE,
        }
    }

    /// Run a body with one of two fall-off semantics: function bodies
    /// yield `undefined` when they fall off the end, programs (and eval
    /// code) yield the final completion value.
    pub(crate) fn exec_body(
        &mut self,
        func: &Rc<ast::Function>,
        ctxt: &Context,
        as_function: bool,
    ) -> Result<Value, JsError> {
        match self.backend {
            Backend::Ast => self.exec_body_ast(func, ctxt, as_function),
            Backend::Bytecode => self.exec_body_vm(func, ctxt, as_function),
        }
    }

    /// Direct `eval`: run `arg` as a Program in the caller's context.
    /// Non-string arguments pass through unchanged.
    pub(crate) fn eval_with_context(
        &mut self,
        ctxt: &Context,
        arg: &Value,
    ) -> Result<Value, JsError> {
        let source = match arg {
            Value::String(s) => s.clone(),
            other => return Ok(other.clone()),
        };
        let input = Input::from_string(&source.to_utf8_lossy()).with_filename("<eval>");
        let program = self.parse_program(input)?;
        // Bindings made by eval code carry no attributes, so they are
        // deletable afterwards.
        let mut eval_ctxt = ctxt.clone();
        eval_ctxt.var_attr = Attrs::NONE;
        self.exec_body(&program, &eval_ctxt, false)
    }

    // ============ REFERENCES ============

    /// `GetValue`: resolve a reference, raising ReferenceError for a null
    /// base (unless the `undefdef` compatibility flag maps it to
    /// `undefined`).
    pub fn get_value(&mut self, op: &Operand) -> Result<Value, JsError> {
        match op {
            Operand::Value(v) => Ok(v.clone()),
            Operand::Ref(r) => match &r.base {
                Some(base) => Ok(object::get(base, &r.property)),
                None => {
                    if self.compat.undefdef {
                        Ok(Value::Undefined)
                    } else {
                        Err(self
                            .throw_reference_error(&format!("{} is not defined", r.property)))
                    }
                }
            },
        }
    }

    /// `PutValue`: write through a reference; a null base writes to the
    /// global object. Assigning to a non-reference raises ReferenceError.
    pub fn put_value(&mut self, op: &Operand, value: Value) -> Result<(), JsError> {
        match op {
            Operand::Ref(r) => {
                let base = r.base.clone().unwrap_or_else(|| self.global.clone());
                object::put(&base, &r.property, value, Attrs::NONE);
                Ok(())
            }
            Operand::Value(_) => Err(self.throw_reference_error("invalid assignment target")),
        }
    }

    // ============ OBJECT PROTOCOL (script-reentrant half) ============

    /// `[[DefaultValue]]`: try `toString`/`valueOf` in hint order; raise
    /// TypeError when neither yields a primitive.
    pub fn default_value(&mut self, obj: &JsObjectRef, hint: Hint) -> Result<Value, JsError> {
        let to_string = self.intern("toString");
        let value_of = self.intern("valueOf");
        let order = match hint {
            Hint::String => [to_string, value_of],
            // The default hint is Number for every object the core knows.
            Hint::Number | Hint::None => [value_of, to_string],
        };
        for name in order {
            let method = object::get(obj, &name);
            if let Value::Object(m) = &method {
                if m.borrow().has_call() {
                    let result = self.call(m, Some(obj), &[])?;
                    if !matches!(result, Value::Object(_)) {
                        return Ok(result);
                    }
                }
            }
        }
        Err(self.throw_type_error("cannot convert object to primitive value"))
    }

    /// `[[Call]]`.
    pub fn call(
        &mut self,
        callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        self.enter_call(callee, CallKind::Call)?;
        let result = self.call_inner(callee, this, args);
        self.leave_call();
        result
    }

    fn call_inner(
        &mut self,
        callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        enum Kind {
            Function(Rc<ast::Function>, ScopeRef),
            Native(NativeFn),
        }
        let kind = {
            let borrowed = callee.borrow();
            match &borrowed.data {
                ObjectData::Function(f) => Kind::Function(f.func.clone(), f.scope.clone()),
                ObjectData::Native(n) => match n.call {
                    Some(f) => Kind::Native(f),
                    None => return Err(self.throw_type_error("object is not callable")),
                },
                _ => return Err(self.throw_type_error("object is not callable")),
            }
        };
        match kind {
            Kind::Native(f) => f(self, callee, this, args),
            Kind::Function(func, scope) => {
                self.call_parsed_function(&func, scope, callee, this, args)
            }
        }
    }

    /// §13.2.1 function invocation: build the activation, bind
    /// `arguments`, formals, nested declarations and vars, then run the
    /// body.
    fn call_parsed_function(
        &mut self,
        func: &Rc<ast::Function>,
        scope: ScopeRef,
        callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        let activation = JsObject::new("Activation", None, ObjectData::Activation);
        let scope = Scope::prepend(activation.clone(), &scope);

        let arguments = self.make_arguments_object(callee, args);
        {
            let mut act = activation.borrow_mut();
            let name = self.dict.intern_str("arguments");
            act.define(name, Value::Object(arguments), Attrs::DONT_DELETE);
            for (i, param) in func.params.iter().enumerate() {
                let actual = args.get(i).cloned().unwrap_or(Value::Undefined);
                act.define(param.clone(), actual, Attrs::DONT_DELETE);
            }
        }

        let this_obj = this.cloned().unwrap_or_else(|| self.global.clone());
        let ctxt = Context {
            scope,
            variable: activation,
            this_obj,
            var_attr: Attrs::DONT_DELETE,
        };
        self.exec_body(func, &ctxt, true)
    }

    /// The array-like `arguments` object: indexed actuals, `length`, and
    /// `callee`. Formals and indices are bound by copy-in; the live
    /// aliasing join of the reference implementation is not reproduced.
    fn make_arguments_object(&mut self, callee: &JsObjectRef, args: &[Value]) -> JsObjectRef {
        let obj = JsObject::new(
            "Arguments",
            Some(self.object_prototype.clone()),
            ObjectData::Ordinary,
        );
        {
            let mut borrowed = obj.borrow_mut();
            let length = self.dict.intern_str("length");
            borrowed.define(length, Value::Number(args.len() as f64), Attrs::DONT_ENUM);
            let callee_name = self.dict.intern_str("callee");
            borrowed.define(callee_name, Value::Object(callee.clone()), Attrs::DONT_ENUM);
            for (i, arg) in args.iter().enumerate() {
                let name = self.dict.intern_str(&i.to_string());
                borrowed.define(name, arg.clone(), Attrs::DONT_ENUM);
            }
        }
        obj
    }

    /// `[[Construct]]`.
    pub fn construct(
        &mut self,
        callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        self.enter_call(callee, CallKind::Construct)?;
        let result = self.construct_inner(callee, args);
        self.leave_call();
        result
    }

    fn construct_inner(
        &mut self,
        callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        enum Kind {
            Function,
            Native(NativeCtor),
        }
        let kind = {
            let borrowed = callee.borrow();
            match &borrowed.data {
                ObjectData::Function(_) => Kind::Function,
                ObjectData::Native(n) => match n.construct {
                    Some(f) => Kind::Native(f),
                    None => return Err(self.throw_type_error("object is not a constructor")),
                },
                _ => return Err(self.throw_type_error("object is not a constructor")),
            }
        };
        match kind {
            Kind::Native(f) => f(self, callee, args),
            Kind::Function => {
                // §13.2.2: allocate with the function's `prototype`
                // property, run the body, keep an explicit object result.
                let proto_name = self.intern("prototype");
                let proto = match object::get(callee, &proto_name) {
                    Value::Object(p) => p,
                    _ => self.object_prototype.clone(),
                };
                let obj = JsObject::new("Object", Some(proto), ObjectData::Ordinary);
                let result = self.call_inner(callee, Some(&obj), args)?;
                match result {
                    Value::Object(o) => Ok(o),
                    _ => Ok(obj),
                }
            }
        }
    }

    /// `[[HasInstance]]` for function objects (§15.3.5.3).
    pub fn has_instance(&mut self, callee: &JsObjectRef, v: &Value) -> Result<bool, JsError> {
        if !callee.borrow().has_hasinstance() {
            return Err(self.throw_type_error("object has no [[HasInstance]]"));
        }
        let obj = match v {
            Value::Object(o) => o.clone(),
            _ => return Ok(false),
        };
        let proto_name = self.intern("prototype");
        let proto = match object::get(callee, &proto_name) {
            Value::Object(p) => p,
            _ => return Err(self.throw_type_error("function has non-object prototype")),
        };
        let mut current = obj.borrow().prototype.clone();
        while let Some(p) = current {
            if Rc::ptr_eq(&p, &proto) {
                return Ok(true);
            }
            current = p.borrow().prototype.clone();
        }
        Ok(false)
    }

    // ============ CALL ACCOUNTING ============

    fn enter_call(&mut self, callee: &JsObjectRef, kind: CallKind) -> Result<(), JsError> {
        if self.depth >= self.recursion_limit {
            return Err(self.throw_range_error("stack overflow"));
        }
        self.depth += 1;
        let callee_name = {
            let borrowed = callee.borrow();
            match &borrowed.data {
                ObjectData::Function(f) => f.func.name.clone(),
                ObjectData::Native(n) => Some(n.name.clone()),
                _ => None,
            }
        };
        self.traceback.push(TracebackFrame {
            call_location: self
                .location
                .clone()
                .unwrap_or_else(|| SourceLocation::new(None, 0)),
            callee_name,
            call_kind: kind,
        });
        self.trace_event(TraceEvent::Call);
        Ok(())
    }

    fn leave_call(&mut self) {
        self.trace_event(TraceEvent::Return);
        self.traceback.pop();
        self.depth -= 1;
    }

    pub(crate) fn trace_event(&mut self, event: TraceEvent) {
        if let Some(trace) = &mut self.trace {
            trace(&self.location, event);
        }
    }

    // ============ WRAPPERS & INSTANCES ============

    pub fn make_string_wrapper(&mut self, s: JsString) -> JsObjectRef {
        JsObject::new(
            "String",
            Some(self.string_prototype.clone()),
            ObjectData::StringWrapper(s),
        )
    }

    pub fn make_number_wrapper(&mut self, n: f64) -> JsObjectRef {
        JsObject::new(
            "Number",
            Some(self.number_prototype.clone()),
            ObjectData::NumberWrapper(n),
        )
    }

    pub fn make_boolean_wrapper(&mut self, b: bool) -> JsObjectRef {
        JsObject::new(
            "Boolean",
            Some(self.boolean_prototype.clone()),
            ObjectData::BooleanWrapper(b),
        )
    }

    /// Make an empty array object.
    pub fn make_array(&mut self) -> JsObjectRef {
        JsObject::new(
            "Array",
            Some(self.array_prototype.clone()),
            ObjectData::Array { length: 0 },
        )
    }

    /// Instantiate a parsed function in a scope (the `FUNC` operation).
    pub fn make_function_instance(
        &mut self,
        func: &Rc<ast::Function>,
        scope: &ScopeRef,
    ) -> JsObjectRef {
        let instance = JsObject::new(
            "Function",
            Some(self.function_prototype.clone()),
            ObjectData::Function(FunctionData {
                func: func.clone(),
                scope: scope.clone(),
            }),
        );
        let length = self.intern("length");
        let prototype = self.intern("prototype");
        let constructor = self.intern("constructor");

        let proto_obj = JsObject::ordinary(Some(self.object_prototype.clone()));
        proto_obj.borrow_mut().define(
            constructor,
            Value::Object(instance.clone()),
            Attrs::DONT_ENUM,
        );
        {
            let mut borrowed = instance.borrow_mut();
            borrowed.define(
                length,
                Value::Number(func.params.len() as f64),
                Attrs::READ_ONLY
                    .union(Attrs::DONT_ENUM)
                    .union(Attrs::DONT_DELETE),
            );
            borrowed.define(prototype, Value::Object(proto_obj), Attrs::DONT_ENUM);
        }
        instance
    }

    /// Wrap a host function pointer as a callable object.
    pub fn native_function(&mut self, func: NativeFn, name: &str, length: u8) -> JsObjectRef {
        let name = self.intern(name);
        let obj = JsObject::new(
            "Function",
            Some(self.function_prototype.clone()),
            ObjectData::Native(NativeData {
                name,
                call: Some(func),
                construct: None,
            }),
        );
        let length_name = self.intern("length");
        obj.borrow_mut().define(
            length_name,
            Value::Number(f64::from(length)),
            Attrs::READ_ONLY
                .union(Attrs::DONT_ENUM)
                .union(Attrs::DONT_DELETE),
        );
        obj
    }

    // ============ THROWING ============

    /// Build an error object from one of the error constructors and return
    /// the throw as a `JsError`, capturing location and traceback.
    pub fn error_throw(&mut self, ctor: &JsObjectRef, message: &str) -> JsError {
        self.trace_event(TraceEvent::Throw);
        let error_obj = self.make_error_object(ctor, message);
        let name = {
            let proto_name = self.intern("prototype");
            let name_name = self.intern("name");
            match object::get(ctor, &proto_name) {
                Value::Object(proto) => match object::get(&proto, &name_name) {
                    Value::String(s) => s.to_utf8_lossy(),
                    _ => "Error".to_string(),
                },
                _ => "Error".to_string(),
            }
        };
        JsError::thrown(
            Value::Object(error_obj),
            format!("{}: {}", name, message),
            self.location.clone(),
            self.traceback.clone(),
        )
    }

    /// Convert a `JsError` to the value `catch` binds: the thrown value
    /// itself, or a freshly built error object for engine-raised errors.
    pub(crate) fn error_to_value(&mut self, error: JsError) -> Value {
        match error {
            JsError::Thrown(t) => t.value,
            JsError::Syntax { message, location } => {
                let ctor = self.syntax_error_ctor.clone();
                let obj = self.make_error_object(&ctor, &format!("{}: {}", location, message));
                Value::Object(obj)
            }
            JsError::Internal(message) => {
                let ctor = self.error_ctor.clone();
                let obj = self.make_error_object(&ctor, &message);
                Value::Object(obj)
            }
        }
    }

    fn make_error_object(&mut self, ctor: &JsObjectRef, message: &str) -> JsObjectRef {
        let proto_name = self.intern("prototype");
        let proto = match object::get(ctor, &proto_name) {
            Value::Object(p) => p,
            _ => self.object_prototype.clone(),
        };
        let obj = JsObject::new("Error", Some(proto), ObjectData::Ordinary);
        let message_name = self.intern("message");
        let message_str = self.intern(message);
        obj.borrow_mut()
            .define(message_name, Value::String(message_str), Attrs::DONT_ENUM);
        obj
    }

    pub fn throw_type_error(&mut self, message: &str) -> JsError {
        let ctor = self.type_error_ctor.clone();
        self.error_throw(&ctor, message)
    }

    pub fn throw_reference_error(&mut self, message: &str) -> JsError {
        let ctor = self.reference_error_ctor.clone();
        self.error_throw(&ctor, message)
    }

    pub fn throw_range_error(&mut self, message: &str) -> JsError {
        let ctor = self.range_error_ctor.clone();
        self.error_throw(&ctor, message)
    }

    /// `throw` statement support: wrap an arbitrary value. The rendered
    /// message never fails, whatever the value is.
    pub fn throw_value(&mut self, value: Value) -> JsError {
        self.trace_event(TraceEvent::Throw);
        let message = match value::to_string_value(self, &value) {
            Ok(s) => s.to_utf8_lossy(),
            Err(_) => value.to_string(),
        };
        JsError::thrown(
            value,
            message,
            self.location.clone(),
            self.traceback.clone(),
        )
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

// ============ CORE NATIVES ============
//
// The minimal built-in objects the language core cannot run without. The
// full library (String/Number/Math/Date/... methods) is the host's
// department; these cover construction, conversion, and error reporting.

mod natives {
    use super::*;
    use crate::value::{to_boolean, to_number, to_object, to_string_value, to_uint32};

    /// Wire up the global object and every constructor the core needs.
    pub fn install(interp: &mut Interpreter) {
        // Object.prototype methods.
        let object_prototype = interp.object_prototype.clone();
        let to_string = interp.native_function(object_proto_to_string, "toString", 0);
        let value_of = interp.native_function(object_proto_value_of, "valueOf", 0);
        let has_own = interp.native_function(object_proto_has_own_property, "hasOwnProperty", 1);
        define_method(interp, &object_prototype, "toString", to_string);
        define_method(interp, &object_prototype, "valueOf", value_of);
        define_method(interp, &object_prototype, "hasOwnProperty", has_own);

        interp.object_ctor =
            constructor(interp, "Object", 1, object_call, object_construct, &object_prototype);

        let function_prototype = interp.function_prototype.clone();
        interp.function_ctor = constructor(
            interp,
            "Function",
            1,
            function_call,
            function_construct,
            &function_prototype,
        );

        // Array.
        interp.array_prototype = JsObject::new(
            "Array",
            Some(interp.object_prototype.clone()),
            ObjectData::Array { length: 0 },
        );
        let array_prototype = interp.array_prototype.clone();
        let array_to_string = interp.native_function(array_proto_to_string, "toString", 0);
        let array_join = interp.native_function(array_proto_join, "join", 1);
        define_method(interp, &array_prototype, "toString", array_to_string);
        define_method(interp, &array_prototype, "join", array_join);
        interp.array_ctor =
            constructor(interp, "Array", 1, array_call, array_construct, &array_prototype);

        // Primitive wrappers.
        interp.string_prototype = JsObject::new(
            "String",
            Some(interp.object_prototype.clone()),
            ObjectData::StringWrapper(JsString::empty()),
        );
        let string_prototype = interp.string_prototype.clone();
        install_wrapper_methods(interp, &string_prototype);
        let string_ctor =
            constructor(interp, "String", 1, string_call, string_construct, &string_prototype);

        interp.number_prototype = JsObject::new(
            "Number",
            Some(interp.object_prototype.clone()),
            ObjectData::NumberWrapper(0.0),
        );
        let number_prototype = interp.number_prototype.clone();
        install_wrapper_methods(interp, &number_prototype);
        let number_ctor =
            constructor(interp, "Number", 1, number_call, number_construct, &number_prototype);

        interp.boolean_prototype = JsObject::new(
            "Boolean",
            Some(interp.object_prototype.clone()),
            ObjectData::BooleanWrapper(false),
        );
        let boolean_prototype = interp.boolean_prototype.clone();
        install_wrapper_methods(interp, &boolean_prototype);
        let boolean_ctor = constructor(
            interp,
            "Boolean",
            1,
            boolean_call,
            boolean_construct,
            &boolean_prototype,
        );

        // RegExp: a structural stub; matching is the host library's job.
        interp.regexp_prototype = JsObject::ordinary(Some(interp.object_prototype.clone()));
        let regexp_prototype = interp.regexp_prototype.clone();
        interp.regexp_ctor =
            constructor(interp, "RegExp", 2, regexp_call, regexp_construct, &regexp_prototype);

        // Error constructors.
        interp.error_ctor = error_constructor(interp, "Error", None);
        let proto_name = interp.intern("prototype");
        let error_ctor = interp.error_ctor.clone();
        let base_error_proto = match object::get(&error_ctor, &proto_name) {
            Value::Object(p) => p,
            _ => interp.object_prototype.clone(),
        };
        interp.eval_error_ctor =
            error_constructor(interp, "EvalError", Some(base_error_proto.clone()));
        interp.range_error_ctor =
            error_constructor(interp, "RangeError", Some(base_error_proto.clone()));
        interp.reference_error_ctor =
            error_constructor(interp, "ReferenceError", Some(base_error_proto.clone()));
        interp.syntax_error_ctor =
            error_constructor(interp, "SyntaxError", Some(base_error_proto.clone()));
        interp.type_error_ctor =
            error_constructor(interp, "TypeError", Some(base_error_proto.clone()));
        interp.uri_error_ctor = error_constructor(interp, "URIError", Some(base_error_proto));

        // eval.
        interp.global_eval = interp.native_function(global_eval, "eval", 1);

        // The global object's own properties.
        let builtin = Attrs::DONT_ENUM;
        let frozen = Attrs::DONT_ENUM.union(Attrs::DONT_DELETE);
        let entries: Vec<(&str, Value, Attrs)> = vec![
            ("NaN", Value::Number(f64::NAN), frozen),
            ("Infinity", Value::Number(f64::INFINITY), frozen),
            ("undefined", Value::Undefined, frozen),
            ("Object", Value::Object(interp.object_ctor.clone()), builtin),
            ("Function", Value::Object(interp.function_ctor.clone()), builtin),
            ("Array", Value::Object(interp.array_ctor.clone()), builtin),
            ("String", Value::Object(string_ctor), builtin),
            ("Number", Value::Object(number_ctor), builtin),
            ("Boolean", Value::Object(boolean_ctor), builtin),
            ("RegExp", Value::Object(interp.regexp_ctor.clone()), builtin),
            ("Error", Value::Object(interp.error_ctor.clone()), builtin),
            ("EvalError", Value::Object(interp.eval_error_ctor.clone()), builtin),
            ("RangeError", Value::Object(interp.range_error_ctor.clone()), builtin),
            (
                "ReferenceError",
                Value::Object(interp.reference_error_ctor.clone()),
                builtin,
            ),
            ("SyntaxError", Value::Object(interp.syntax_error_ctor.clone()), builtin),
            ("TypeError", Value::Object(interp.type_error_ctor.clone()), builtin),
            ("URIError", Value::Object(interp.uri_error_ctor.clone()), builtin),
            ("eval", Value::Object(interp.global_eval.clone()), builtin),
        ];
        for (name, value, attrs) in entries {
            let name = interp.dict.intern_str(name);
            interp.global.borrow_mut().define(name, value, attrs);
        }
    }

    fn define_method(interp: &mut Interpreter, obj: &JsObjectRef, name: &str, func: JsObjectRef) {
        let name = interp.dict.intern_str(name);
        obj.borrow_mut()
            .define(name, Value::Object(func), Attrs::DONT_ENUM);
    }

    /// Build a constructor object with both call and construct behavior
    /// and cross-link it with its prototype.
    fn constructor(
        interp: &mut Interpreter,
        name: &str,
        length: u8,
        call: NativeFn,
        construct: NativeCtor,
        prototype: &JsObjectRef,
    ) -> JsObjectRef {
        let interned = interp.intern(name);
        let ctor = JsObject::new(
            "Function",
            Some(interp.function_prototype.clone()),
            ObjectData::Native(NativeData {
                name: interned,
                call: Some(call),
                construct: Some(construct),
            }),
        );
        let ro = Attrs::READ_ONLY
            .union(Attrs::DONT_ENUM)
            .union(Attrs::DONT_DELETE);
        {
            let length_name = interp.dict.intern_str("length");
            let prototype_name = interp.dict.intern_str("prototype");
            let mut borrowed = ctor.borrow_mut();
            borrowed.define(length_name, Value::Number(f64::from(length)), ro);
            borrowed.define(prototype_name, Value::Object(prototype.clone()), ro);
        }
        let constructor_name = interp.dict.intern_str("constructor");
        prototype
            .borrow_mut()
            .define(constructor_name, Value::Object(ctor.clone()), Attrs::DONT_ENUM);
        ctor
    }

    fn error_constructor(
        interp: &mut Interpreter,
        name: &'static str,
        base_proto: Option<JsObjectRef>,
    ) -> JsObjectRef {
        let proto_parent = base_proto.unwrap_or_else(|| interp.object_prototype.clone());
        let proto = JsObject::new("Error", Some(proto_parent), ObjectData::Ordinary);
        {
            let name_str = interp.intern(name);
            let empty = interp.intern("");
            let error_to_string = interp.native_function(error_proto_to_string, "toString", 0);
            let name_name = interp.dict.intern_str("name");
            let message_name = interp.dict.intern_str("message");
            let to_string_name = interp.dict.intern_str("toString");
            let mut p = proto.borrow_mut();
            p.define(name_name, Value::String(name_str), Attrs::DONT_ENUM);
            p.define(message_name, Value::String(empty), Attrs::DONT_ENUM);
            p.define(to_string_name, Value::Object(error_to_string), Attrs::DONT_ENUM);
        }
        constructor(interp, name, 1, error_call, error_construct, &proto)
    }

    fn install_wrapper_methods(interp: &mut Interpreter, proto: &JsObjectRef) {
        let ts = interp.native_function(wrapper_to_string, "toString", 0);
        let vo = interp.native_function(wrapper_value_of, "valueOf", 0);
        define_method(interp, proto, "toString", ts);
        define_method(interp, proto, "valueOf", vo);
    }

    // --- Object ---

    fn object_call(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        match args.first() {
            None | Some(Value::Undefined) | Some(Value::Null) => Ok(Value::Object(
                JsObject::ordinary(Some(interp.object_prototype.clone())),
            )),
            Some(v) => Ok(Value::Object(to_object(interp, v)?)),
        }
    }

    fn object_construct(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        match args.first() {
            Some(Value::Object(o)) => Ok(o.clone()),
            Some(v @ Value::String(_)) | Some(v @ Value::Number(_)) | Some(v @ Value::Boolean(_)) => {
                to_object(interp, v)
            }
            _ => Ok(JsObject::ordinary(Some(interp.object_prototype.clone()))),
        }
    }

    fn object_proto_to_string(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        _args: &[Value],
    ) -> Result<Value, JsError> {
        let class = match this {
            Some(o) => o.borrow().class,
            None => "Undefined",
        };
        Ok(Value::String(interp.intern(&format!("[object {}]", class))))
    }

    fn object_proto_value_of(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        _args: &[Value],
    ) -> Result<Value, JsError> {
        match this {
            Some(o) => Ok(Value::Object(o.clone())),
            None => Ok(Value::Object(interp.global.clone())),
        }
    }

    fn object_proto_has_own_property(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        let name = match args.first() {
            Some(v) => to_string_value(interp, v)?,
            None => interp.intern("undefined"),
        };
        let name = interp.intern_js(&name);
        let has = match this {
            Some(o) => o.borrow().properties.contains_key(&name),
            None => false,
        };
        Ok(Value::Boolean(has))
    }

    // --- Function ---

    pub fn function_prototype_call(
        _interp: &mut Interpreter,
        _callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        _args: &[Value],
    ) -> Result<Value, JsError> {
        Ok(Value::Undefined)
    }

    fn function_call(
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        function_construct(interp, callee, args).map(Value::Object)
    }

    /// `new Function(p1, ..., pn, body)`: parse and instantiate in the
    /// global scope.
    fn function_construct(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        let mut params_src = String::new();
        let body_src = match args.split_last() {
            None => String::new(),
            Some((body, params)) => {
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        params_src.push(',');
                    }
                    params_src.push_str(&to_string_value(interp, p)?.to_utf8_lossy());
                }
                to_string_value(interp, body)?.to_utf8_lossy()
            }
        };
        let name = interp.intern("anonymous");
        let func = interp.parse_function(
            Some(name),
            Input::from_string(&params_src).with_filename("<function>"),
            Input::from_string(&body_src).with_filename("<function>"),
        )?;
        let scope = interp.global_scope.clone();
        Ok(interp.make_function_instance(&func, &scope))
    }

    // --- Array ---

    fn array_call(
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        array_construct(interp, callee, args).map(Value::Object)
    }

    fn array_construct(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        let arr = interp.make_array();
        if args.len() == 1 {
            if let Some(Value::Number(n)) = args.first() {
                let len = to_uint32(*n);
                if f64::from(len) != *n {
                    return Err(interp.throw_range_error("invalid array length"));
                }
                if let ObjectData::Array { length } = &mut arr.borrow_mut().data {
                    *length = len;
                }
                return Ok(arr);
            }
        }
        for (i, arg) in args.iter().enumerate() {
            let name = interp.dict.intern_str(&i.to_string());
            object::put(&arr, &name, arg.clone(), Attrs::NONE);
        }
        Ok(arr)
    }

    fn array_proto_join(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        let this = match this {
            Some(o) => o.clone(),
            None => return Err(interp.throw_type_error("Array.prototype.join requires an object")),
        };
        let separator = match args.first() {
            None | Some(Value::Undefined) => ",".to_string(),
            Some(v) => to_string_value(interp, v)?.to_utf8_lossy(),
        };
        let length_name = interp.intern("length");
        let len = to_uint32(to_number(interp, &object::get(&this, &length_name))?);
        let mut out = String::new();
        for i in 0..len {
            if i > 0 {
                out.push_str(&separator);
            }
            let name = interp.dict.intern_str(&i.to_string());
            match object::get(&this, &name) {
                Value::Undefined | Value::Null => {}
                v => out.push_str(&to_string_value(interp, &v)?.to_utf8_lossy()),
            }
        }
        Ok(Value::String(JsString::from(out.as_str())))
    }

    fn array_proto_to_string(
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        _args: &[Value],
    ) -> Result<Value, JsError> {
        array_proto_join(interp, callee, this, &[])
    }

    // --- String / Number / Boolean ---

    fn string_call(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        match args.first() {
            None => Ok(Value::String(JsString::empty())),
            Some(v) => Ok(Value::String(to_string_value(interp, v)?)),
        }
    }

    fn string_construct(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        let s = match args.first() {
            None => JsString::empty(),
            Some(v) => to_string_value(interp, v)?,
        };
        Ok(interp.make_string_wrapper(s))
    }

    fn number_call(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        match args.first() {
            None => Ok(Value::Number(0.0)),
            Some(v) => Ok(Value::Number(to_number(interp, v)?)),
        }
    }

    fn number_construct(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        let n = match args.first() {
            None => 0.0,
            Some(v) => to_number(interp, v)?,
        };
        Ok(interp.make_number_wrapper(n))
    }

    fn boolean_call(
        _interp: &mut Interpreter,
        _callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        Ok(Value::Boolean(args.first().map(to_boolean).unwrap_or(false)))
    }

    fn boolean_construct(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        let b = args.first().map(to_boolean).unwrap_or(false);
        Ok(interp.make_boolean_wrapper(b))
    }

    fn wrapper_to_string(
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        let v = wrapper_value_of(interp, callee, this, args)?;
        Ok(Value::String(to_string_value(interp, &v)?))
    }

    fn wrapper_value_of(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        _args: &[Value],
    ) -> Result<Value, JsError> {
        let this = match this {
            Some(o) => o,
            None => return Err(interp.throw_type_error("wrapper method requires an object")),
        };
        let v = match &this.borrow().data {
            ObjectData::StringWrapper(s) => Value::String(s.clone()),
            ObjectData::NumberWrapper(n) => Value::Number(*n),
            ObjectData::BooleanWrapper(b) => Value::Boolean(*b),
            _ => return Err(interp.throw_type_error("method is not generic")),
        };
        Ok(v)
    }

    // --- RegExp ---

    fn regexp_call(
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        regexp_construct(interp, callee, args).map(Value::Object)
    }

    fn regexp_construct(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        let source = match args.first() {
            None | Some(Value::Undefined) => JsString::empty(),
            Some(v) => to_string_value(interp, v)?,
        };
        let flags = match args.get(1) {
            None | Some(Value::Undefined) => JsString::empty(),
            Some(v) => to_string_value(interp, v)?,
        };
        let flags_text = flags.to_utf8_lossy();
        let obj = JsObject::new(
            "RegExp",
            Some(interp.regexp_prototype.clone()),
            ObjectData::Ordinary,
        );
        let ro = Attrs::READ_ONLY
            .union(Attrs::DONT_ENUM)
            .union(Attrs::DONT_DELETE);
        let dd = Attrs::DONT_ENUM.union(Attrs::DONT_DELETE);
        let source_name = interp.dict.intern_str("source");
        let global_name = interp.dict.intern_str("global");
        let ignore_case_name = interp.dict.intern_str("ignoreCase");
        let multiline_name = interp.dict.intern_str("multiline");
        let last_index_name = interp.dict.intern_str("lastIndex");
        {
            let mut b = obj.borrow_mut();
            b.define(source_name, Value::String(source), ro);
            b.define(global_name, Value::Boolean(flags_text.contains('g')), ro);
            b.define(ignore_case_name, Value::Boolean(flags_text.contains('i')), ro);
            b.define(multiline_name, Value::Boolean(flags_text.contains('m')), ro);
            b.define(last_index_name, Value::Number(0.0), dd);
        }
        Ok(obj)
    }

    // --- Error ---

    fn error_call(
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        _this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        // §15.11.1: Error called as a function constructs all the same.
        error_construct(interp, callee, args).map(Value::Object)
    }

    fn error_construct(
        interp: &mut Interpreter,
        callee: &JsObjectRef,
        args: &[Value],
    ) -> Result<JsObjectRef, JsError> {
        let proto_name = interp.intern("prototype");
        let proto = match object::get(callee, &proto_name) {
            Value::Object(p) => p,
            _ => interp.object_prototype.clone(),
        };
        let obj = JsObject::new("Error", Some(proto), ObjectData::Ordinary);
        if let Some(message) = args.first() {
            if !matches!(message, Value::Undefined) {
                let message = to_string_value(interp, message)?;
                let name = interp.intern("message");
                obj.borrow_mut()
                    .define(name, Value::String(message), Attrs::DONT_ENUM);
            }
        }
        Ok(obj)
    }

    fn error_proto_to_string(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        _args: &[Value],
    ) -> Result<Value, JsError> {
        let this = match this {
            Some(o) => o.clone(),
            None => {
                return Err(interp.throw_type_error("Error.prototype.toString requires an object"))
            }
        };
        let name_name = interp.intern("name");
        let message_name = interp.intern("message");
        let name = match object::get(&this, &name_name) {
            Value::Undefined => "Error".to_string(),
            v => to_string_value(interp, &v)?.to_utf8_lossy(),
        };
        let message = match object::get(&this, &message_name) {
            Value::Undefined => String::new(),
            v => to_string_value(interp, &v)?.to_utf8_lossy(),
        };
        let text = if message.is_empty() {
            name
        } else {
            format!("{}: {}", name, message)
        };
        Ok(Value::String(interp.intern(&text)))
    }

    // --- eval ---

    /// The global `eval` function reached *indirectly*. Direct calls are
    /// intercepted at call sites and run in the caller's context; here we
    /// run in the global context, except under ext1 where the receiver
    /// supplies `this`, the variable object, and a scope extension.
    pub fn global_eval(
        interp: &mut Interpreter,
        _callee: &JsObjectRef,
        this: Option<&JsObjectRef>,
        args: &[Value],
    ) -> Result<Value, JsError> {
        let arg = match args.first() {
            None => return Ok(Value::Undefined),
            Some(v) => v.clone(),
        };
        let ctxt = match (interp.compat.ext1, this) {
            (true, Some(receiver)) => Context {
                scope: Scope::prepend(receiver.clone(), &interp.global_scope.clone()),
                variable: receiver.clone(),
                this_obj: receiver.clone(),
                var_attr: Attrs::NONE,
            },
            _ => interp.global_context(),
        };
        interp.eval_with_context(&ctxt, &arg)
    }
}
