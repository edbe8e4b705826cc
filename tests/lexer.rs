//! Tests for the lexer
//!
//! Each case tokenizes a source fragment and checks the produced kinds,
//! line numbers, and the newline-before flag that drives semicolon
//! insertion.

use es3run::compat::Compat;
use es3run::input::Input;
use es3run::lexer::{Lexer, Token, TokenKind};
use es3run::string_dict::StringDict;
use es3run::JsString;

fn lex_with(source: &str, compat: Compat) -> Vec<TokenKind> {
    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(Input::from_string(source), &mut dict, compat);
    let mut tokens = vec![];
    loop {
        let token = lexer.next_token().expect("lexes cleanly");
        if token.kind == TokenKind::End {
            break;
        }
        tokens.push(token.kind);
    }
    tokens
}

fn lex(source: &str) -> Vec<TokenKind> {
    lex_with(source, Compat::strict())
}

fn lex_tokens(source: &str) -> Vec<Token> {
    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(Input::from_string(source), &mut dict, Compat::strict());
    let mut tokens = vec![];
    loop {
        let token = lexer.next_token().expect("lexes cleanly");
        let end = token.kind == TokenKind::End;
        tokens.push(token);
        if end {
            break;
        }
    }
    tokens
}

fn lex_err(source: &str) -> es3run::JsError {
    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(Input::from_string(source), &mut dict, Compat::strict());
    loop {
        match lexer.next_token() {
            Ok(token) if token.kind == TokenKind::End => panic!("expected a lex error"),
            Ok(_) => {}
            Err(e) => return e,
        }
    }
}

fn ident(name: &str) -> TokenKind {
    TokenKind::Identifier(JsString::from(name))
}

#[test]
fn numbers() {
    assert_eq!(lex("42"), vec![TokenKind::Number(42.0)]);
    assert_eq!(lex("3.14"), vec![TokenKind::Number(3.14)]);
    assert_eq!(lex(".5"), vec![TokenKind::Number(0.5)]);
    assert_eq!(lex("5."), vec![TokenKind::Number(5.0)]);
    assert_eq!(lex("1e10"), vec![TokenKind::Number(1e10)]);
    assert_eq!(lex("1E-3"), vec![TokenKind::Number(0.001)]);
    assert_eq!(lex("2e+2"), vec![TokenKind::Number(200.0)]);
    assert_eq!(lex("0xff"), vec![TokenKind::Number(255.0)]);
    assert_eq!(lex("0XABC"), vec![TokenKind::Number(2748.0)]);
}

#[test]
fn number_followed_by_dot_member() {
    assert_eq!(
        lex("1..toString"),
        vec![TokenKind::Number(1.0), TokenKind::Dot, ident("toString")]
    );
}

#[test]
fn number_with_trailing_identifier_is_an_error() {
    lex_err("3in");
    lex_err("0x10q");
    lex_err("1e");
}

#[test]
fn octal_literals_need_ext1() {
    // Without ext1 a leading zero is just decimal.
    assert_eq!(lex("010"), vec![TokenKind::Number(10.0)]);
    let ext1 = Compat::parse("ext1").unwrap();
    assert_eq!(lex_with("010", ext1), vec![TokenKind::Number(8.0)]);
    // Digits beyond the octal range fall back to decimal.
    assert_eq!(lex_with("019", ext1), vec![TokenKind::Number(19.0)]);
    // A fraction disables the octal reading.
    assert_eq!(lex_with("010.5", ext1), vec![TokenKind::Number(10.5)]);
}

#[test]
fn strings_and_escapes() {
    assert_eq!(
        lex(r#""hello""#),
        vec![TokenKind::String(JsString::from("hello"))]
    );
    assert_eq!(
        lex(r#"'it\'s'"#),
        vec![TokenKind::String(JsString::from("it's"))]
    );
    assert_eq!(
        lex(r#""a\tb\nc""#),
        vec![TokenKind::String(JsString::from("a\tb\nc"))]
    );
    assert_eq!(
        lex(r#""\x41B""#),
        vec![TokenKind::String(JsString::from("AB"))]
    );
    // Octal escapes, long and short forms.
    assert_eq!(
        lex(r#""\101\7""#),
        vec![TokenKind::String(JsString::from("A\u{7}"))]
    );
    // Any other escaped character is itself.
    assert_eq!(
        lex(r#""\q""#),
        vec![TokenKind::String(JsString::from("q"))]
    );
}

#[test]
fn bare_hex_escape_needs_ext1() {
    lex_err(r#""\xZZ""#);
    let ext1 = Compat::parse("ext1").unwrap();
    assert_eq!(
        lex_with(r#""\xZZ""#, ext1),
        vec![TokenKind::String(JsString::from("xZZ"))]
    );
}

#[test]
fn string_errors() {
    lex_err("\"unterminated");
    lex_err("\"line\nbreak\"");
    lex_err("\"escaped\\\nnewline\"");
}

#[test]
fn punctuators_longest_match() {
    assert_eq!(
        lex(">>>= >>> >> >"),
        vec![
            TokenKind::GtGtGtEq,
            TokenKind::GtGtGt,
            TokenKind::GtGt,
            TokenKind::Gt
        ]
    );
    assert_eq!(
        lex("=== == ="),
        vec![TokenKind::EqEqEq, TokenKind::EqEq, TokenKind::Eq]
    );
    assert_eq!(lex("!=="), vec![TokenKind::BangEqEq]);
    assert_eq!(lex("<<="), vec![TokenKind::LtLtEq]);
    assert_eq!(
        lex("&& & || |"),
        vec![
            TokenKind::AmpAmp,
            TokenKind::Amp,
            TokenKind::PipePipe,
            TokenKind::Pipe
        ]
    );
}

#[test]
fn keywords_and_identifiers() {
    assert_eq!(
        lex("var x in instanceof"),
        vec![TokenKind::Var, ident("x"), TokenKind::In, TokenKind::InstanceOf]
    );
    assert_eq!(lex("$_1"), vec![ident("$_1")]);
}

#[test]
fn escaped_identifier_never_matches_keyword() {
    // The escape spells "if" but stays an identifier.
    assert_eq!(lex("\\u0069f"), vec![ident("if")]);
}

#[test]
fn reserved_words() {
    assert_eq!(
        lex("class"),
        vec![TokenKind::Reserved(JsString::from("class"))]
    );
    let ext1 = Compat::parse("ext1").unwrap();
    assert_eq!(lex_with("class", ext1), vec![ident("class")]);
}

#[test]
fn newline_flag_for_asi() {
    let tokens = lex_tokens("a\nb c");
    assert!(!tokens[0].newline_before);
    assert!(tokens[1].newline_before);
    assert!(!tokens[2].newline_before);
}

#[test]
fn block_comment_with_newline_counts_as_line_terminator() {
    let tokens = lex_tokens("a /* x\ny */ b");
    assert!(tokens[1].newline_before);
    assert_eq!(tokens[1].lineno, 2);

    let tokens = lex_tokens("a /* xy */ b");
    assert!(!tokens[1].newline_before);
}

#[test]
fn line_counting() {
    let tokens = lex_tokens("a\nb\r\nc\u{2028}d\u{2029}e");
    let lines: Vec<u32> = tokens.iter().map(|t| t.lineno).collect();
    assert_eq!(lines, vec![1, 2, 3, 4, 5, 5]);
}

#[test]
fn unterminated_block_comment_is_an_error() {
    lex_err("a /* no end");
}

#[test]
fn sgml_comments_behind_flag() {
    // Strict mode lexes '<' '!' and fails on nothing; the '<!--' is
    // operators.
    assert_eq!(
        lex("1 <!--2"),
        vec![
            TokenKind::Number(1.0),
            TokenKind::Lt,
            TokenKind::Bang,
            TokenKind::MinusMinus,
            TokenKind::Number(2.0)
        ]
    );
    let sgml = Compat::parse("sgml_comments").unwrap();
    assert_eq!(lex_with("1 <!--2", sgml), vec![TokenKind::Number(1.0)]);
}

#[test]
fn division_tokens() {
    assert_eq!(
        lex("a / b /= c"),
        vec![ident("a"), TokenKind::Div, ident("b"), TokenKind::DivEq, ident("c")]
    );
}

#[test]
fn rescan_as_regex() {
    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(
        Input::from_string("/ab+c/gi 1"),
        &mut dict,
        Compat::strict(),
    );
    let slash = lexer.next_token().unwrap();
    assert_eq!(slash.kind, TokenKind::Div);
    let regex = lexer.rescan_as_regex(&slash.kind).unwrap();
    assert_eq!(regex.kind, TokenKind::Regex(JsString::from("/ab+c/gi")));
    assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Number(1.0));
}

#[test]
fn rescan_as_regex_after_diveq() {
    // /=... re-lexed as a regex starting with '='.
    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(Input::from_string("/=a/ x"), &mut dict, Compat::strict());
    let tok = lexer.next_token().unwrap();
    assert_eq!(tok.kind, TokenKind::DivEq);
    let regex = lexer.rescan_as_regex(&tok.kind).unwrap();
    assert_eq!(regex.kind, TokenKind::Regex(JsString::from("/=a/")));
}

#[test]
fn regex_errors() {
    let mut dict = StringDict::new();
    let mut lexer = Lexer::new(Input::from_string("/ab"), &mut dict, Compat::strict());
    let slash = lexer.next_token().unwrap();
    assert!(lexer.rescan_as_regex(&slash.kind).is_err());
}

#[test]
fn unicode_escape_in_string_above_bmp() {
    // A code unit sequence written as surrogates survives.
    let kinds = lex(r#""😀""#);
    match &kinds[0] {
        TokenKind::String(s) => {
            assert_eq!(s.len(), 2);
            assert_eq!(s.to_utf8().unwrap(), "\u{1F600}");
        }
        other => panic!("expected string, got {:?}", other),
    }
}
