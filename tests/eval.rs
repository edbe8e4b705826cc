//! Evaluation semantics tests
//!
//! Drives complete programs through the public API and checks results,
//! error classes, and the completion-value rules.

use es3run::{Compat, Input, Interpreter, JsError, Value};

fn eval(source: &str) -> Value {
    Interpreter::new()
        .eval_str(source)
        .unwrap_or_else(|e| panic!("{} failed: {}", source, e))
}

fn eval_num(source: &str) -> f64 {
    match eval(source) {
        Value::Number(n) => n,
        other => panic!("{} gave {:?}, expected number", source, other),
    }
}

fn eval_str_result(source: &str) -> String {
    match eval(source) {
        Value::String(s) => s.to_utf8_lossy(),
        other => panic!("{} gave {:?}, expected string", source, other),
    }
}

fn eval_bool(source: &str) -> bool {
    match eval(source) {
        Value::Boolean(b) => b,
        other => panic!("{} gave {:?}, expected boolean", source, other),
    }
}

fn eval_err(source: &str) -> JsError {
    match Interpreter::new().eval_str(source) {
        Ok(v) => panic!("{} unexpectedly succeeded with {:?}", source, v),
        Err(e) => e,
    }
}

/// The thrown error's class, read off the error object's `name`.
fn thrown_name(source: &str) -> String {
    let err = eval_err(source);
    match err.thrown_value() {
        Some(Value::Object(o)) => {
            es3run::object::get(o, &es3run::JsString::from("name")).to_string()
        }
        other => panic!("{} threw a non-object: {:?}", source, other),
    }
}

// ============ BOUNDARY SCENARIOS ============

#[test]
fn addition_concatenates_when_either_side_is_string() {
    assert_eq!(eval_str_result("1 + '2'"), "12");
}

#[test]
fn for_loop_accumulates() {
    assert_eq!(eval_num("var x = 0; for (var i=0;i<3;i++) x+=i; x"), 3.0);
}

#[test]
fn catch_binds_thrown_value() {
    assert_eq!(eval_str_result("try { throw 'e' } catch (e) { e + '!' }"), "e!");
}

#[test]
fn return_in_finally_overrides() {
    assert_eq!(
        eval_num("(function(){try { return 1 } finally { return 2 }})()"),
        2.0
    );
}

#[test]
fn string_wrapper_length() {
    assert_eq!(eval_num("'abc'.length + 'd'.length"), 4.0);
}

#[test]
fn typeof_undeclared_does_not_throw() {
    assert_eq!(eval_str_result("typeof undefinedSymbol"), "undefined");
}

#[test]
fn float_addition_is_inexact() {
    assert!(!eval_bool("0.1 + 0.2 === 0.3"));
}

#[test]
fn for_in_over_own_properties() {
    assert_eq!(
        eval_num("var o={a:1,b:2}; var s=''; for (var k in o) s+=k; s.length"),
        2.0
    );
}

#[test]
fn function_length_is_formal_count() {
    assert_eq!(eval_num("function f(){return f.length} f(1,2,3)"), 0.0);
}

#[test]
fn array_elision_counts_toward_length() {
    assert_eq!(eval_num("[1,,3].length"), 3.0);
}

// ============ EQUALITY & RELATIONAL ============

#[test]
fn abstract_equality_coercions() {
    assert!(eval_bool("1 == '1'"));
    assert!(eval_bool("null == undefined"));
    assert!(!eval_bool("null == 0"));
    assert!(eval_bool("true == 1"));
    assert!(eval_bool("'' == 0"));
    assert!(!eval_bool("NaN == NaN"));
    assert!(eval_bool("'0x10' == 16"));
}

#[test]
fn strict_equality_never_coerces() {
    assert!(!eval_bool("1 === '1'"));
    assert!(!eval_bool("null === undefined"));
    assert!(eval_bool("0 === -0"));
    assert!(!eval_bool("NaN === NaN"));
    assert!(eval_bool("var v = NaN; v !== v"));
}

#[test]
fn object_equality_is_identity() {
    assert!(!eval_bool("({}) == ({})"));
    assert!(eval_bool("var o = {}; var p = o; o === p"));
}

#[test]
fn relational_comparisons() {
    assert!(eval_bool("1 < 2"));
    assert!(eval_bool("'a' < 'b'"));
    assert!(eval_bool("'a' < 'ab'"));
    assert!(eval_bool("'2' < '10' === false")); // string compare
    assert!(eval_bool("2 < 10"));
    assert!(!eval_bool("NaN < 1"));
    assert!(!eval_bool("1 <= NaN"));
}

// ============ OPERATORS ============

#[test]
fn bitwise_and_shift_operators() {
    assert_eq!(eval_num("var a = 6; a & 3"), 2.0);
    assert_eq!(eval_num("var a = 6; a | 3"), 7.0);
    assert_eq!(eval_num("var a = 6; a ^ 3"), 5.0);
    assert_eq!(eval_num("var a = 1; a << 31"), -2147483648.0);
    assert_eq!(eval_num("var a = -1; a >>> 0"), 4294967295.0);
    assert_eq!(eval_num("var a = -8; a >> 1"), -4.0);
    // Shift counts mask to five bits.
    assert_eq!(eval_num("var a = 1; a << 33"), 2.0);
    assert_eq!(eval_num("var a = 5; ~a"), -6.0);
}

#[test]
fn modulo_keeps_dividend_sign() {
    assert_eq!(eval_num("var a = -5; a % 3"), -2.0);
    assert_eq!(eval_num("var a = 5; a % -3"), 2.0);
}

#[test]
fn logical_operators_return_operands() {
    assert_eq!(eval_num("0 || 5"), 5.0);
    assert_eq!(eval_num("3 || 5"), 3.0);
    assert_eq!(eval_num("0 && 5"), 0.0);
    assert_eq!(eval_str_result("'a' && 'b'"), "b");
    // Short circuit skips side effects.
    assert_eq!(eval_num("var n = 0; false && n++; n"), 0.0);
}

#[test]
fn unary_operators() {
    assert_eq!(eval_num("var s = '0x10'; +s"), 16.0);
    assert!(eval_bool("var x = +'nope'; x !== x"));
    assert_eq!(eval_num("-'3'"), -3.0);
    assert!(eval_bool("!0"));
    assert_eq!(eval(" void 42 "), Value::Undefined);
}

#[test]
fn typeof_names() {
    assert_eq!(eval_str_result("typeof 1"), "number");
    assert_eq!(eval_str_result("typeof 'x'"), "string");
    assert_eq!(eval_str_result("typeof true"), "boolean");
    assert_eq!(eval_str_result("typeof {}"), "object");
    assert_eq!(eval_str_result("typeof null"), "object");
    assert_eq!(eval_str_result("typeof function(){}"), "function");
    assert_eq!(eval_str_result("var u; typeof u"), "undefined");
}

#[test]
fn delete_operator() {
    assert!(eval_bool("var o = {a:1}; delete o.a"));
    assert!(eval_bool("var o = {a:1}; delete o.a; !('a' in o)"));
    assert!(eval_bool("delete 42")); // non-reference deletes trivially
    assert!(eval_bool("var o = {}; delete o.missing"));
}

#[test]
fn in_and_instanceof() {
    assert!(eval_bool("'a' in {a:1}"));
    assert!(eval_bool("!('b' in {a:1})"));
    assert!(eval_bool("function A(){}; var a = new A(); a instanceof A"));
    assert!(eval_bool("function A(){}; !({} instanceof A)"));
    assert!(eval_bool("function A(){}; !(1 instanceof A)"));
    assert_eq!(thrown_name("1 in 2"), "TypeError");
    assert_eq!(thrown_name("({}) instanceof 1"), "TypeError");
}

#[test]
fn increment_and_compound_assignment() {
    assert_eq!(eval_num("var i = 5; i++"), 5.0);
    assert_eq!(eval_num("var i = 5; i++; i"), 6.0);
    assert_eq!(eval_num("var i = 5; ++i"), 6.0);
    assert_eq!(eval_num("var i = 5; --i; i--; i"), 3.0);
    assert_eq!(eval_num("var x = 4; x *= 3; x -= 2; x"), 10.0);
    assert_eq!(eval_str_result("var s = 'a'; s += 1; s"), "a1");
    assert_eq!(eval_num("var x = 8; x >>>= 2; x"), 2.0);
}

// ============ CONTROL FLOW ============

#[test]
fn completion_value_is_last_expression_statement() {
    assert_eq!(eval_num("1; 2; 3"), 3.0);
    assert_eq!(eval_num("4; if (false) 5;"), 4.0);
    assert_eq!(eval_num("a: { 1; break a; 2 }"), 1.0);
}

#[test]
fn switch_matching_and_fallthrough() {
    assert_eq!(
        eval_str_result(
            "var s=''; switch (2) { case 1: s+='a'; case 2: s+='b'; case 3: s+='c'; break; default: s+='d' } s"
        ),
        "bc"
    );
    assert_eq!(
        eval_str_result("var s=''; switch (9) { case 1: s+='a'; default: s+='d'; case 3: s+='c' } s"),
        "dc"
    );
    // Strict matching: no coercion.
    assert_eq!(
        eval_str_result("var s='none'; switch ('1') { case 1: s='num'; break; } s"),
        "none"
    );
}

#[test]
fn do_while_runs_at_least_once() {
    assert_eq!(eval_num("var n = 0; do n++; while (false); n"), 1.0);
}

#[test]
fn labelled_break_and_continue() {
    assert_eq!(
        eval_str_result(
            "var s=''; outer: for (var i=0;i<3;i++){ for (var j=0;j<3;j++){ if (j>i) continue outer; s+=j; } } s"
        ),
        "001012"
    );
    assert_eq!(
        eval_num("var n=0; outer: while (true) { while (true) { break outer; } n=9; } n"),
        0.0
    );
}

#[test]
fn break_propagates_past_inner_loops() {
    // A break targeting the outer loop is not consumed by the inner one.
    assert_eq!(
        eval_num("var n=0; outer: for(;;) { for(;;) { n++; break outer; } } n"),
        1.0
    );
}

// ============ TRY / CATCH / FINALLY ============

#[test]
fn try_catch_scope_is_restored() {
    assert_eq!(
        eval_str_result("var e = 'outer'; try { throw 'inner' } catch (e) {} e"),
        "outer"
    );
}

#[test]
fn try_finally_reraises() {
    assert_eq!(
        eval_str_result(
            "var s=''; try { try { throw 'x' } finally { s+='f' } } catch (e) { s+=e } s"
        ),
        "fx"
    );
}

#[test]
fn finally_runs_on_normal_completion() {
    assert_eq!(eval_str_result("var s=''; try { s+='t' } finally { s+='f' } s"), "tf");
}

#[test]
fn catch_then_finally() {
    assert_eq!(
        eval_str_result(
            "var s=''; try { throw 'x' } catch (e) { s+='c' } finally { s+='f' } s"
        ),
        "cf"
    );
}

#[test]
fn finally_break_overrides_throw() {
    assert_eq!(
        eval_num("var n=0; for(;;) { try { throw 'x' } finally { n=1; break } } n"),
        1.0
    );
}

#[test]
fn uncaught_throw_surfaces_value_and_traceback() {
    let err = eval_err("function f() { g() } function g() { throw new TypeError('boom') } f()");
    match &err {
        JsError::Thrown(t) => {
            assert!(t.message.contains("boom"));
            // f and g frames were captured.
            assert!(t.traceback.len() >= 2);
        }
        other => panic!("expected thrown error, got {:?}", other),
    }
}

#[test]
fn throwing_non_error_values_is_safe() {
    let err = eval_err("throw 42");
    assert!(matches!(
        err.thrown_value(),
        Some(Value::Number(n)) if *n == 42.0
    ));
    let err = eval_err("throw {toString: 0}");
    assert!(err.thrown_value().is_some());
}

#[test]
fn error_classes() {
    assert_eq!(thrown_name("null.x"), "TypeError");
    assert_eq!(thrown_name("undefinedFn()"), "ReferenceError");
    assert_eq!(thrown_name("var u; u()"), "TypeError");
    assert_eq!(thrown_name("missingVariable"), "ReferenceError");
    assert_eq!(thrown_name("var o = {toString: null, valueOf: null}; o + 1"), "TypeError");
    assert!(eval_bool("try { null.x } catch (e) { e instanceof TypeError }"));
    assert!(eval_bool("try { null.x } catch (e) { e instanceof Error }"));
}

#[test]
fn syntax_errors_from_eval_are_catchable() {
    assert!(eval_bool("try { eval('= broken') } catch (e) { e instanceof SyntaxError }"));
}

// ============ FUNCTIONS & SCOPE ============

#[test]
fn closures_capture_scope() {
    assert_eq!(
        eval_num("function make(n){ return function(m){ return n + m } } make(3)(4)"),
        7.0
    );
}

#[test]
fn hoisting_of_vars_and_functions() {
    assert_eq!(eval_str_result("var t = typeof later; var later = 1; t"), "undefined");
    assert_eq!(eval_num("var r = f(); function f(){ return 9 } r"), 9.0);
    assert_eq!(eval_str_result("var t = typeof h; function h(){} t"), "function");
}

#[test]
fn arguments_object() {
    assert_eq!(eval_num("function f(){ return arguments.length } f(1,2,3)"), 3.0);
    assert_eq!(eval_num("function f(a){ return arguments[1] } f(1,2)"), 2.0);
    assert!(eval_bool("function f(){ return arguments.callee === f } f()"));
}

#[test]
fn missing_parameters_are_undefined() {
    assert_eq!(eval_str_result("function f(a, b){ return typeof b } f(1)"), "undefined");
}

#[test]
fn this_binding() {
    assert_eq!(eval_num("var o = { m: function(){ return this.v }, v: 5 }; o.m()"), 5.0);
    // A bare call gets the global object.
    assert!(eval_bool("var v = 1; function f(){ return this.v === 1 } f()"));
}

#[test]
fn constructors_and_prototypes() {
    assert_eq!(
        eval_num("function C(x){ this.x = x } C.prototype.get = function(){ return this.x }; new C(7).get()"),
        7.0
    );
    // An explicit object return wins over the allocated instance.
    assert!(eval_bool("function C(){ return { marked: true } } new C().marked"));
    // A primitive return is discarded.
    assert!(eval_bool("function C(){ this.ok = true; return 5 } new C().ok"));
}

#[test]
fn named_function_expressions_see_themselves() {
    assert_eq!(
        eval_num("var f = function fact(n){ return n < 2 ? 1 : n * fact(n - 1) }; f(5)"),
        120.0
    );
    // The name does not leak into the enclosing scope.
    assert_eq!(eval_str_result("var f = function g(){}; typeof g"), "undefined");
}

#[test]
fn function_constructor_parses_source() {
    assert_eq!(eval_num("var f = new Function('a', 'b', 'return a + b'); f(2, 3)"), 5.0);
}

#[test]
fn recursion_limit_raises_range_error() {
    assert_eq!(thrown_name("function f(){ return f() } f()"), "RangeError");
    let err = eval_err("function f(){ return f() } f()");
    assert!(err.to_string().contains("stack overflow"));
}

// ============ WITH & EVAL ============

#[test]
fn with_prepends_scope() {
    assert_eq!(eval_num("var o = { x: 5 }; var r; with (o) { r = x } r"), 5.0);
    assert_eq!(eval_num("var o = { x: 5 }; with (o) { x = 6 } o.x"), 6.0);
    // The chain is restored even when the body throws.
    assert_eq!(
        eval_str_result("var x = 'outer'; try { with ({x: 'in'}) { throw 0 } } catch (e) {} x"),
        "outer"
    );
}

#[test]
fn direct_eval_sees_caller_context() {
    assert_eq!(eval_num("function f(){ var loc = 9; return eval('loc') } f()"), 9.0);
    assert_eq!(eval_num("eval('var q = 1'); q"), 1.0);
    assert_eq!(eval_num("eval('1; 2; 3')"), 3.0);
}

#[test]
fn indirect_eval_runs_in_global_context() {
    assert_eq!(
        eval_str_result("var ind = eval; function h(){ var loc = 9; return ind('typeof loc') } h()"),
        "undefined"
    );
}

#[test]
fn eval_of_non_string_passes_through() {
    assert_eq!(eval_num("eval(42)"), 42.0);
}

// ============ FOR-IN ENUMERATION ============

#[test]
fn for_in_deduplicates_shadowed_names() {
    assert_eq!(
        eval_num(
            "function C(){} C.prototype.a = 1; var o = new C(); o.a = 2; \
             var n = 0; for (var k in o) n++; n"
        ),
        1.0
    );
}

#[test]
fn for_in_reaches_prototype_properties() {
    assert_eq!(
        eval_str_result(
            "function C(){} C.prototype.p = 1; var o = new C(); o.q = 2; \
             var s = ''; for (var k in o) s += k; s"
        ),
        "qp"
    );
}

#[test]
fn for_in_skips_deleted_properties() {
    assert_eq!(
        eval_str_result("var o = {a:1, b:2, c:3}; var s=''; for (var k in o) { s += k; delete o.c } s"),
        "ab"
    );
}

#[test]
fn for_in_assigns_through_arbitrary_lhs() {
    assert_eq!(
        eval_str_result("var o = {z: 1}; var box = {}; for (box.key in o); box.key"),
        "z"
    );
}

#[test]
fn for_in_on_null_object_throws() {
    assert_eq!(thrown_name("for (var k in null) {}"), "TypeError");
}

// ============ ARRAYS & OBJECTS ============

#[test]
fn array_length_maintenance() {
    assert_eq!(eval_num("var a = new Array(5); a.length"), 5.0);
    assert_eq!(eval_num("var a = []; a[10] = 1; a.length"), 11.0);
    assert_eq!(eval_str_result("var a = [1,2,3]; a.length = 1; typeof a[2]"), "undefined");
    assert_eq!(eval_str_result("[1,2,3].join('-')"), "1-2-3");
    assert_eq!(eval_str_result("'' + [1,2]"), "1,2");
}

#[test]
fn object_literal_property_forms() {
    assert_eq!(eval_num("({a: 1, 'b': 2, 3: 4})['3']"), 4.0);
    assert_eq!(eval_num("var o = {}; o['k'] = 2; o.k"), 2.0);
}

#[test]
fn has_own_property() {
    assert!(eval_bool("({a:1}).hasOwnProperty('a')"));
    assert!(eval_bool("function C(){} C.prototype.p = 1; !(new C().hasOwnProperty('p'))"));
}

#[test]
fn default_value_via_to_string_and_value_of() {
    assert_eq!(eval_str_result("'' + {toString: function(){ return 'T' }}"), "T");
    assert_eq!(eval_num("1 + {valueOf: function(){ return 41 }}"), 42.0);
    assert_eq!(eval_str_result("'' + {}"), "[object Object]");
}

#[test]
fn error_objects_render() {
    assert_eq!(eval_str_result("'' + new TypeError('boom')"), "TypeError: boom");
    assert_eq!(eval_str_result("new RangeError('r').message"), "r");
    assert_eq!(eval_str_result("new SyntaxError().name"), "SyntaxError");
}

#[test]
fn regexp_literal_carries_source_and_flags() {
    assert_eq!(eval_str_result("/ab+c/gi.source"), "ab+c");
    assert!(eval_bool("/x/g.global"));
    assert!(eval_bool("!/x/.ignoreCase"));
}

// ============ NUMBER FORMATTING ============

#[test]
fn number_to_string_canonical_forms() {
    assert_eq!(eval_str_result("'' + 100"), "100");
    assert_eq!(eval_str_result("'' + 0.5"), "0.5");
    assert_eq!(eval_str_result("'' + 1e21"), "1e+21");
    assert_eq!(eval_str_result("'' + 1e-7"), "1e-7");
    assert_eq!(eval_str_result("'' + 0.000001"), "0.000001");
    assert_eq!(eval_str_result("'' + (0/0)"), "NaN");
    assert_eq!(eval_str_result("'' + (1/0)"), "Infinity");
    assert_eq!(eval_str_result("'' + (-1/0)"), "-Infinity");
    assert_eq!(eval_str_result("'' + -0"), "0");
}

// ============ COMPATIBILITY FLAGS ============

#[test]
fn undefdef_reads_unresolved_as_undefined() {
    let compat = Compat::parse("undefdef").unwrap();
    let mut interp = Interpreter::with_compat(compat);
    let v = interp.eval_str("typeof missingEntirely === 'undefined' && missingEntirely === undefined");
    assert!(matches!(v, Ok(Value::Boolean(true))));
}

#[test]
fn ext1_octal_integers() {
    let compat = Compat::parse("ext1").unwrap();
    let mut interp = Interpreter::with_compat(compat);
    assert!(matches!(
        interp.eval_str("010 + 1"),
        Ok(Value::Number(n)) if n == 9.0
    ));
}

#[test]
fn ext1_relaxed_hex_in_to_number() {
    let compat = Compat::parse("ext1").unwrap();
    let mut interp = Interpreter::with_compat(compat);
    assert!(matches!(
        interp.eval_str("+'-0x10'"),
        Ok(Value::Number(n)) if n == -16.0
    ));
    // Strict mode: NaN.
    assert!(eval_bool("var v = +'-0x10'; v !== v"));
}

// ============ HOST API ============

#[test]
fn input_from_utf8_and_filenames() {
    let mut interp = Interpreter::new();
    let v = interp
        .eval(Input::from_utf8(b"2 + 2".to_vec()).with_filename("mem.js"))
        .unwrap();
    assert!(matches!(v, Value::Number(n) if n == 4.0));
}

#[test]
fn parse_function_entry_point() {
    let mut interp = Interpreter::new();
    let func = interp
        .parse_function(
            None,
            Input::from_string("a, b"),
            Input::from_string("return a * b;"),
        )
        .unwrap();
    assert_eq!(func.params.len(), 2);
    assert_eq!(func.body.vars.len(), 0);
}

#[test]
fn trace_hook_sees_statements_and_calls() {
    use std::cell::RefCell;
    use std::rc::Rc;

    let events: Rc<RefCell<Vec<es3run::TraceEvent>>> = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    let mut interp = Interpreter::new();
    interp.trace = Some(Box::new(move |_loc, event| {
        sink.borrow_mut().push(event);
    }));
    interp.eval_str("function f(){ return 1 } f()").unwrap();
    let events = events.borrow();
    assert!(events.contains(&es3run::TraceEvent::Statement));
    assert!(events.contains(&es3run::TraceEvent::Call));
    assert!(events.contains(&es3run::TraceEvent::Return));
}

#[test]
fn interpreter_isolation() {
    let mut a = Interpreter::new();
    let mut b = Interpreter::new();
    a.eval_str("var shared = 1").unwrap();
    assert_eq!(
        b.eval_str("typeof shared").unwrap().to_string(),
        "undefined"
    );
}
