//! Tests for the parser
//!
//! Grammar coverage, automatic semicolon insertion, label resolution,
//! constant folding, and the print/re-parse round trip.

use std::rc::Rc;

use es3run::ast::{Expression, Function, LiteralValue, Statement};
use es3run::{Input, Interpreter, JsError};

fn parse(source: &str) -> Rc<Function> {
    let mut interp = Interpreter::new();
    interp
        .parse_program(Input::from_string(source))
        .expect("parses cleanly")
}

fn parse_err(source: &str) -> JsError {
    let mut interp = Interpreter::new();
    match interp.parse_program(Input::from_string(source)) {
        Ok(_) => panic!("expected parse error for: {}", source),
        Err(e) => e,
    }
}

fn first_expr(func: &Function) -> &Expression {
    match &func.body.statements[0] {
        Statement::Expression { expr, .. } => expr,
        other => panic!("expected expression statement, got {:?}", other),
    }
}

// ============ GRAMMAR ============

#[test]
fn expression_precedence() {
    // 1 + 2 * 3 folds, so check shape with an identifier in play.
    let program = parse("a + 2 * 3");
    match first_expr(&program) {
        Expression::Binary { left, right, .. } => {
            assert!(matches!(**left, Expression::Identifier(_)));
            // 2 * 3 folded to 6.
            assert!(matches!(
                **right,
                Expression::Literal(LiteralValue::Number(n)) if n == 6.0
            ));
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn new_with_arguments_binds_tighter_than_call() {
    // new f(1)(2) is (new f(1))(2).
    let program = parse("new f(1)(2)");
    match first_expr(&program) {
        Expression::Call { callee, arguments } => {
            assert_eq!(arguments.len(), 1);
            assert!(matches!(**callee, Expression::New { .. }));
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn new_without_arguments() {
    let program = parse("new f");
    assert!(matches!(
        first_expr(&program),
        Expression::New { arguments, .. } if arguments.is_empty()
    ));
}

#[test]
fn member_chains() {
    let program = parse("a.b[c].d");
    match first_expr(&program) {
        Expression::Member { object, .. } => {
            assert!(matches!(**object, Expression::Index { .. }));
        }
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn all_statement_forms_parse() {
    parse("var a = 1, b;");
    parse(";");
    parse("{ 1; 2; }");
    parse("if (a) b; else c;");
    parse("do a(); while (b)");
    parse("while (a) break;");
    parse("for (var i = 0; i < 3; i++) continue;");
    parse("for (;;) break;");
    parse("for (k in o) f(k);");
    parse("for (var k in o) f(k);");
    parse("with (o) x;");
    parse("switch (a) { case 1: b; default: c; }");
    parse("try { a; } catch (e) { b; } finally { c; }");
    parse("throw e;");
    parse("function f(a, b) { return a; }");
    parse("l: while (a) break l;");
}

#[test]
fn regex_literal_in_expression_position() {
    let program = parse("x = /ab+/g;");
    match first_expr(&program) {
        Expression::Assign { value, .. } => match &**value {
            Expression::Regex { source } => {
                assert_eq!(source.to_utf8_lossy(), "/ab+/g");
            }
            other => panic!("unexpected value: {:?}", other),
        },
        other => panic!("unexpected shape: {:?}", other),
    }
}

#[test]
fn division_is_not_regex_after_operand() {
    let program = parse("a / b / c");
    assert!(matches!(first_expr(&program), Expression::Binary { .. }));
}

// ============ AUTOMATIC SEMICOLON INSERTION ============

#[test]
fn asi_at_newlines() {
    let program = parse("a = 1\nb = 2");
    assert_eq!(program.body.statements.len(), 2);
}

#[test]
fn asi_before_closing_brace_and_eof() {
    parse("{ a = 1 }");
    parse("a = 1");
}

#[test]
fn asi_does_not_split_valid_continuations() {
    // A newline does not terminate when the next token continues the
    // expression.
    let program = parse("a = b\n+ c");
    assert_eq!(program.body.statements.len(), 1);
}

#[test]
fn no_asi_in_for_header() {
    parse_err("for (a = 1\nb = 2; c; d) e;");
}

#[test]
fn restricted_postfix_operator() {
    // a newline before ++ starts a new statement.
    let program = parse("a\n++b");
    assert_eq!(program.body.statements.len(), 2);
}

#[test]
fn restricted_return() {
    // return\nx is return; x.
    let program = parse("function f() { return\n1 }");
    match &program.body.funcdecls[0].body.statements[0] {
        Statement::Return { value, .. } => assert!(value.is_none()),
        other => panic!("expected return, got {:?}", other),
    }
}

#[test]
fn throw_requires_same_line_expression() {
    parse_err("throw\ne;");
}

#[test]
fn missing_semicolon_without_newline_is_an_error() {
    parse_err("a = 1 b = 2");
}

// ============ LABELS & TARGETS ============

#[test]
fn break_and_continue_resolution() {
    parse("outer: for (;;) { inner: for (;;) { break outer; continue inner; } }");
    parse("a: { break a; }");
}

#[test]
fn label_errors() {
    parse_err("break;");
    parse_err("continue;");
    parse_err("while (a) break missing;");
    parse_err("a: { continue a; }"); // not a loop label
    parse_err("a: a: b;"); // duplicate
    parse_err("x: while (1) { }\nwhile (1) break x;"); // out of scope
}

#[test]
fn labels_do_not_cross_function_boundaries() {
    parse_err("a: while (1) { var f = function () { break a; }; }");
}

#[test]
fn return_outside_function() {
    parse_err("return 1;");
    parse("function f() { return 1; }");
}

#[test]
fn switch_allows_only_one_default() {
    parse_err("switch (a) { default: 1; default: 2; }");
}

// ============ VARIABLE LISTS & HOISTING DATA ============

#[test]
fn var_names_collected_per_function() {
    let program = parse("var a; function f() { var b, c; for (var d in o) {} } var e;");
    assert_eq!(program.body.vars.len(), 2); // a, e
    assert_eq!(program.body.funcdecls.len(), 1);
    let f = &program.body.funcdecls[0];
    assert_eq!(f.body.vars.len(), 3); // b, c, d
}

#[test]
fn function_declarations_collected() {
    let program = parse("function a() {} function b() {}");
    assert_eq!(program.body.funcdecls.len(), 2);
}

// ============ CONSTANT FOLDING ============

#[test]
fn arithmetic_folds() {
    let program = parse("1 + 2 * 3");
    assert!(matches!(
        first_expr(&program),
        Expression::Literal(LiteralValue::Number(n)) if *n == 7.0
    ));
}

#[test]
fn string_concat_folds() {
    let program = parse("'a' + 'b'");
    match first_expr(&program) {
        Expression::Literal(LiteralValue::String(s)) => {
            assert_eq!(s.to_utf8_lossy(), "ab");
        }
        other => panic!("did not fold: {:?}", other),
    }
}

#[test]
fn mixed_concat_folds() {
    let program = parse("1 + '2'");
    match first_expr(&program) {
        Expression::Literal(LiteralValue::String(s)) => {
            assert_eq!(s.to_utf8_lossy(), "12");
        }
        other => panic!("did not fold: {:?}", other),
    }
}

#[test]
fn comparison_and_logical_fold() {
    let program = parse("1 < 2 && 3 >= 3");
    assert!(matches!(
        first_expr(&program),
        Expression::Literal(LiteralValue::Boolean(true))
    ));
}

#[test]
fn impure_nodes_do_not_fold() {
    let program = parse("a + 1");
    assert!(matches!(first_expr(&program), Expression::Binary { .. }));
    let program = parse("typeof 1");
    assert!(matches!(first_expr(&program), Expression::Unary { .. }));
}

#[test]
fn division_by_zero_folds_to_infinity() {
    let program = parse("1 / 0");
    assert!(matches!(
        first_expr(&program),
        Expression::Literal(LiteralValue::Number(n)) if n.is_infinite()
    ));
}

// ============ ERRORS ============

#[test]
fn error_messages_carry_file_and_line() {
    let mut interp = Interpreter::new();
    let err = interp
        .parse_program(Input::from_string("a = 1;\n= 2;").with_filename("script.js"))
        .unwrap_err();
    let text = err.to_string();
    assert!(text.contains("script.js:2"), "got: {}", text);
}

#[test]
fn reserved_word_is_an_error() {
    parse_err("var class = 1;");
    parse_err("class;");
}

#[test]
fn invalid_assignment_targets() {
    parse_err("1 = 2;");
    parse_err("a + b = c;");
}

// ============ ROUND TRIP ============

fn print_program(func: &Function) -> String {
    func.body
        .statements
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

#[test]
fn printed_programs_reparse_and_agree() {
    let sources = [
        "var x = 0; for (var i = 0; i < 4; i++) x += i; x",
        "var o = { a: 1, 'b c': 2 }; var s = ''; for (var k in o) s += k; s",
        "function f(n) { return n < 2 ? 1 : n * f(n - 1); } f(5)",
        "try { throw [1, , 3] } catch (e) { e.length }",
        "var s = ''; outer: for (var i = 0; i < 3; i++) { for (var j = 0; j < 3; j++) { if (j > i) continue outer; s += j; } } s",
        "(function () { var t = typeof missing; return t + '!'; })()",
        "'a' < 'b' ? -1 : 1",
    ];
    for source in sources {
        let printed = print_program(&parse(source));
        let reparsed = parse(&printed);
        let reprinted = print_program(&reparsed);
        // Printing is a fixed point after one round.
        assert_eq!(printed, reprinted, "source: {}", source);

        // And the printed program evaluates identically.
        let mut a = Interpreter::new();
        let mut b = Interpreter::new();
        let va = a.eval_str(source).expect("original evaluates");
        let vb = b.eval_str(&printed).expect("printed evaluates");
        assert_eq!(
            va.to_string(),
            vb.to_string(),
            "printed program diverged for: {}",
            source
        );
    }
}
