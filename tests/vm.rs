//! Bytecode back-end parity tests
//!
//! Every program here runs under both back-ends; the two must produce
//! the same result (or the same error class). The block-protocol cases
//! (`with`, enumeration, try conversion, finally resumption) get extra
//! attention since that is where the VM differs structurally from the
//! tree walker.

use es3run::{Backend, Interpreter, Value};

fn run(backend: Backend, source: &str) -> Result<Value, String> {
    let mut interp = Interpreter::new();
    interp.set_backend(backend);
    interp.eval_str(source).map_err(|e| e.to_string())
}

/// Evaluate under both back-ends and insist on matching outcomes.
fn parity(source: &str) -> Result<Value, String> {
    let ast = run(Backend::Ast, source);
    let vm = run(Backend::Bytecode, source);
    match (&ast, &vm) {
        (Ok(a), Ok(b)) => {
            assert_eq!(
                a.to_string(),
                b.to_string(),
                "back-ends disagree on: {}",
                source
            );
        }
        (Err(a), Err(b)) => {
            // Same failure class and message; tracebacks may differ in
            // depth when the recursion budget trips mid-expression.
            assert_eq!(
                a.lines().next(),
                b.lines().next(),
                "back-ends disagree on error for: {}",
                source
            );
        }
        _ => panic!(
            "back-ends disagree on outcome for {}: ast={:?} vm={:?}",
            source, ast, vm
        ),
    }
    vm
}

fn parity_num(source: &str, expected: f64) {
    match parity(source) {
        Ok(Value::Number(n)) => assert_eq!(n, expected, "source: {}", source),
        other => panic!("{} gave {:?}", source, other),
    }
}

fn parity_string(source: &str, expected: &str) {
    match parity(source) {
        Ok(Value::String(s)) => assert_eq!(s.to_utf8_lossy(), expected, "source: {}", source),
        other => panic!("{} gave {:?}", source, other),
    }
}

fn parity_err(source: &str) {
    let result = parity(source);
    assert!(result.is_err(), "{} should fail on both back-ends", source);
}

#[test]
fn arithmetic_and_coercion() {
    parity_num("var a = 2; a + 3 * 4", 14.0);
    parity_string("var one = 1; one + '2'", "12");
    parity_num("var s = '8'; s * '2' - 1", 15.0);
    parity_num("var a = 1; a << 33", 2.0);
    parity_num("var a = -1; a >>> 0", 4294967295.0);
    parity_num("var a = 7; ~a", -8.0);
    parity_num("var b = true; +b + (+false)", 1.0);
}

#[test]
fn comparisons() {
    parity("var x = NaN; x == x").unwrap();
    parity("1 < 2 === true").unwrap();
    parity("var a = 'b'; a >= 'a'").unwrap();
    parity("null == undefined").unwrap();
}

#[test]
fn variables_and_assignment() {
    parity_num("var x = 1; x = x + 1; x", 2.0);
    parity_num("var x = 4; x *= 3; x", 12.0);
    parity_num("var i = 5; i++ + i", 11.0);
    parity_num("var i = 5; ++i + i", 12.0);
    parity_num("var a, b; a = b = 3; a + b", 6.0);
}

#[test]
fn control_flow() {
    parity_num("var x = 0; if (x < 1) x = 10; else x = 20; x", 10.0);
    parity_num("var x = 0; for (var i=0;i<3;i++) x+=i; x", 3.0);
    parity_num("var n = 0; while (n < 5) n++; n", 5.0);
    parity_num("var n = 0; do n++; while (n < 5); n", 5.0);
    parity_num("var n = 0; for (;;) { n++; if (n > 2) break } n", 3.0);
    parity_num(
        "var s = 0; for (var i=0;i<5;i++) { if (i % 2) continue; s += i } s",
        6.0,
    );
}

#[test]
fn switch_statements() {
    parity_string(
        "var s=''; switch (2) { case 1: s+='a'; case 2: s+='b'; case 3: s+='c'; break; default: s+='d' } s",
        "bc",
    );
    parity_string(
        "var s=''; switch (9) { case 1: s+='a'; default: s+='d'; case 3: s+='c' } s",
        "dc",
    );
    parity_string("var s='none'; switch ('1') { case 1: s='num'; break } s", "none");
}

#[test]
fn labelled_jumps() {
    parity_string(
        "var s=''; outer: for (var i=0;i<3;i++){ for (var j=0;j<3;j++){ if (j>i) continue outer; s+=j; } } s",
        "001012",
    );
    parity_num(
        "var n=0; outer: for(;;) { for(;;) { n++; break outer; } } n",
        1.0,
    );
    parity_num("a: { 1; break a; 2 }", 1.0);
}

#[test]
fn completion_register() {
    parity_num("1; 2; 3", 3.0);
    parity_num("4; if (false) 5;", 4.0);
    match parity("var x = 9;") {
        Ok(Value::Undefined) => {}
        other => panic!("declaration-only program gave {:?}", other),
    }
}

#[test]
fn functions_and_closures() {
    parity_num("function f(a, b){ return a + b } f(2, 3)", 5.0);
    parity_num(
        "function make(n){ return function(m){ return n + m } } make(3)(4)",
        7.0,
    );
    parity_num("var f = function fact(n){ return n<2 ? 1 : n*fact(n-1) }; f(5)", 120.0);
    parity_num("function f(){ return arguments.length } f(1,2,3)", 3.0);
    parity_num("function f(){ 42; } f(); 7", 7.0);
    parity_string("function f(){} '' + f()", "undefined");
}

#[test]
fn objects_and_arrays() {
    parity_num("var o = { a: 1, b: 2 }; o.a + o['b']", 3.0);
    parity_num("[1,,3].length", 3.0);
    parity_num("var a = []; a[10] = 1; a.length", 11.0);
    parity_string("var o={a:1,b:2}; var s=''; for (var k in o) s+=k; s", "ab");
    parity_num("function C(x){ this.x = x } new C(7).x", 7.0);
    parity_string("/ab+/gi.source", "ab+");
}

#[test]
fn method_calls_bind_this() {
    parity_num("var o = { v: 5, m: function(){ return this.v } }; o.m()", 5.0);
    parity_num("var v = 3; function f(){ return this.v } f()", 3.0);
}

#[test]
fn with_blocks() {
    parity_num("var o = { x: 5 }; var r; with (o) { r = x } r", 5.0);
    parity_num("var o = { x: 5 }; with (o) { x = 6 } o.x", 6.0);
    parity_string(
        "var x = 'outer'; try { with ({x: 'in'}) { throw 0 } } catch (e) {} x",
        "outer",
    );
    // break out of a with restores the chain.
    parity_string(
        "var x = 'outer'; for (;;) { with ({x: 'in'}) { break } } x",
        "outer",
    );
}

#[test]
fn try_catch_finally_protocol() {
    parity_string("try { throw 'e' } catch (e) { e + '!' }", "e!");
    parity_string("var s=''; try { s+='t' } finally { s+='f' } s", "tf");
    parity_string(
        "var s=''; try { throw 'x' } catch (e) { s+='c' } finally { s+='f' } s",
        "cf",
    );
    parity_string(
        "var s=''; try { try { throw 'x' } finally { s+='f' } } catch (e) { s+=e } s",
        "fx",
    );
    parity_num("(function(){try { return 1 } finally { return 2 }})()", 2.0);
    parity_num("(function(){try { return 1 } finally { }})()", 1.0);
    parity_string(
        "var s = (function(){ try { throw 'x' } catch (e) { return 'c:' + e } finally { } })(); s",
        "c:x",
    );
    parity_num(
        "var n=0; for(;;) { try { throw 'x' } finally { n=1; break } } n",
        1.0,
    );
    parity_string(
        "var s=''; for (var i=0;i<3;i++) { try { if (i==1) break; s+=i } finally { s+='f' } } s",
        "0ff",
    );
    parity_string(
        "var s=''; for (var i=0;i<3;i++) { try { if (i%2==0) continue; s+=i } finally { s+='f' } } s",
        "f1ff",
    );
    parity_num("(function(){ try { throw 'x' } finally { return 9 } })()", 9.0);
    parity_string(
        "var e = 'outer'; try { throw 'inner' } catch (e) {} e",
        "outer",
    );
}

#[test]
fn nested_finally_unwinding() {
    parity_string(
        "var s=''; (function(){ try { try { return 'r' } finally { s+='1' } } finally { s+='2' } })(); s",
        "12",
    );
    parity_string(
        "var s=''; try { try { throw 'x' } finally { s+='1' } } catch (e) { s+='c' } finally { s+='2' } s",
        "1c2",
    );
}

#[test]
fn throws_agree() {
    parity_err("null.x");
    parity_err("missingVariable");
    parity_err("1 in 2");
    parity_err("({}) instanceof 1");
    parity_err("throw 42");
    parity_err("function f(){ return f() } f()");
}

#[test]
fn direct_and_indirect_eval() {
    parity_num("function f(){ var loc = 9; return eval('loc') } f()", 9.0);
    parity_string(
        "var ind = eval; function h(){ var loc = 9; return ind('typeof loc') } h()",
        "undefined",
    );
    parity_num("eval('1; 2; 3')", 3.0);
    // eval sees the with-extended chain at the call site.
    parity_num("var o = { x: 41 }; with (o) { eval('x = x + 1') } o.x", 42.0);
}

#[test]
fn for_in_protocol() {
    parity_string(
        "function C(){} C.prototype.p = 1; var o = new C(); o.q = 2; var s=''; for (var k in o) s += k; s",
        "qp",
    );
    parity_string(
        "var o = {a:1,b:2,c:3}; var s=''; for (var k in o) { s += k; delete o.c } s",
        "ab",
    );
    parity_string(
        "var o = {z: 1}; var box = {}; for (box.key in o); box.key",
        "z",
    );
    // break inside for-in frees the enumeration.
    parity_string(
        "var o = {a:1,b:2}; var s=''; for (var k in o) { s+=k; break } s",
        "a",
    );
    // nested enumerations keep their own state.
    parity_string(
        "var o = {a:1,b:2}; var s=''; for (var k in o) for (var j in o) s += k + j; s",
        "aaabbabb",
    );
}

#[test]
fn deep_expression_parity() {
    parity_num(
        "var t = 0; for (var i = 1; i <= 10; i++) { t += i * (i % 2 ? 1 : -1) } t",
        5.0,
    );
    parity_string(
        "var parts = []; parts[0] = 'a'; parts[1] = 'b'; parts.join('+')",
        "a+b",
    );
}
