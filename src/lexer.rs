//! Lexer for ECMAScript source text
//!
//! Tokenizes the ECMA-262 3rd-edition lexical grammar. Each call to
//! [`Lexer::next_token`] yields one token and reports whether a line
//! terminator appeared since the previous token, which the parser needs for
//! automatic semicolon insertion. Regular expression literals are never
//! produced spontaneously; the parser calls [`Lexer::rescan_as_regex`] when
//! a `/` or `/=` arrives in a position where a regex is grammatical.

use crate::compat::Compat;
use crate::error::{JsError, SourceLocation};
use crate::input::Input;
use crate::string::{GrowableString, JsString};
use crate::string_dict::StringDict;

/// Token types for the ECMA-262 lexical grammar.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    Number(f64),
    String(JsString),
    /// Regex literal source in `/pattern/flags` form, produced only by
    /// [`Lexer::rescan_as_regex`].
    Regex(JsString),
    True,
    False,
    Null,

    // Identifiers and keywords
    Identifier(JsString),
    /// A future-reserved word; using one is a syntax error unless a
    /// compatibility flag downgrades it to an identifier.
    Reserved(JsString),

    Break,
    Case,
    Catch,
    Continue,
    Default,
    Delete,
    Do,
    Else,
    Finally,
    For,
    Function,
    If,
    In,
    InstanceOf,
    New,
    Return,
    Switch,
    This,
    Throw,
    Try,
    TypeOf,
    Var,
    Void,
    While,
    With,

    // Punctuators
    LBrace,    // {
    RBrace,    // }
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    Dot,       // .
    Semicolon, // ;
    Comma,     // ,
    Lt,        // <
    Gt,        // >
    LtEq,      // <=
    GtEq,      // >=
    EqEq,      // ==
    BangEq,    // !=
    EqEqEq,    // ===
    BangEqEq,  // !==
    Plus,      // +
    Minus,     // -
    Star,      // *
    Percent,   // %
    PlusPlus,  // ++
    MinusMinus, // --
    LtLt,      // <<
    GtGt,      // >>
    GtGtGt,    // >>>
    Amp,       // &
    Pipe,      // |
    Caret,     // ^
    Bang,      // !
    Tilde,     // ~
    AmpAmp,    // &&
    PipePipe,  // ||
    Question,  // ?
    Colon,     // :
    Eq,        // =
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    PercentEq, // %=
    LtLtEq,    // <<=
    GtGtEq,    // >>=
    GtGtGtEq,  // >>>=
    AmpEq,     // &=
    PipeEq,    // |=
    CaretEq,   // ^=
    Div,       // /
    DivEq,     // /=

    End,
}

impl TokenKind {
    /// Keyword spelling or a category name, for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Number(_) => "number literal".to_string(),
            TokenKind::String(_) => "string literal".to_string(),
            TokenKind::Regex(_) => "regular expression".to_string(),
            TokenKind::Identifier(name) => format!("identifier '{}'", name),
            TokenKind::Reserved(name) => format!("reserved word '{}'", name),
            TokenKind::End => "end of input".to_string(),
            other => format!("'{}'", other.spelling()),
        }
    }

    fn spelling(&self) -> &'static str {
        match self {
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Null => "null",
            TokenKind::Break => "break",
            TokenKind::Case => "case",
            TokenKind::Catch => "catch",
            TokenKind::Continue => "continue",
            TokenKind::Default => "default",
            TokenKind::Delete => "delete",
            TokenKind::Do => "do",
            TokenKind::Else => "else",
            TokenKind::Finally => "finally",
            TokenKind::For => "for",
            TokenKind::Function => "function",
            TokenKind::If => "if",
            TokenKind::In => "in",
            TokenKind::InstanceOf => "instanceof",
            TokenKind::New => "new",
            TokenKind::Return => "return",
            TokenKind::Switch => "switch",
            TokenKind::This => "this",
            TokenKind::Throw => "throw",
            TokenKind::Try => "try",
            TokenKind::TypeOf => "typeof",
            TokenKind::Var => "var",
            TokenKind::Void => "void",
            TokenKind::While => "while",
            TokenKind::With => "with",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Comma => ",",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::LtEq => "<=",
            TokenKind::GtEq => ">=",
            TokenKind::EqEq => "==",
            TokenKind::BangEq => "!=",
            TokenKind::EqEqEq => "===",
            TokenKind::BangEqEq => "!==",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::Percent => "%",
            TokenKind::PlusPlus => "++",
            TokenKind::MinusMinus => "--",
            TokenKind::LtLt => "<<",
            TokenKind::GtGt => ">>",
            TokenKind::GtGtGt => ">>>",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Bang => "!",
            TokenKind::Tilde => "~",
            TokenKind::AmpAmp => "&&",
            TokenKind::PipePipe => "||",
            TokenKind::Question => "?",
            TokenKind::Colon => ":",
            TokenKind::Eq => "=",
            TokenKind::PlusEq => "+=",
            TokenKind::MinusEq => "-=",
            TokenKind::StarEq => "*=",
            TokenKind::PercentEq => "%=",
            TokenKind::LtLtEq => "<<=",
            TokenKind::GtGtEq => ">>=",
            TokenKind::GtGtGtEq => ">>>=",
            TokenKind::AmpEq => "&=",
            TokenKind::PipeEq => "|=",
            TokenKind::CaretEq => "^=",
            TokenKind::Div => "/",
            TokenKind::DivEq => "/=",
            _ => "?",
        }
    }
}

/// A token with its source line and the ASI flag.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub lineno: u32,
    /// A line terminator (or a block comment containing one) appeared
    /// between the previous token and this one.
    pub newline_before: bool,
}

/// Tokenizer over an [`Input`] stream.
pub struct Lexer<'a> {
    input: Input,
    dict: &'a mut StringDict,
    compat: Compat,
    lineno: u32,
    saw_newline: bool,
    filename: Option<JsString>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: Input, dict: &'a mut StringDict, compat: Compat) -> Self {
        let lineno = input.first_lineno();
        let filename = input.filename().cloned();
        Self {
            input,
            dict,
            compat,
            lineno,
            saw_newline: false,
            filename,
        }
    }

    pub fn filename(&self) -> Option<&JsString> {
        self.filename.as_ref()
    }

    pub fn location(&self) -> SourceLocation {
        SourceLocation::new(self.filename.clone(), self.lineno)
    }

    fn error(&self, message: impl Into<String>) -> JsError {
        JsError::syntax(message, self.location())
    }

    /// Produce the next token, skipping whitespace and comments.
    pub fn next_token(&mut self) -> Result<Token, JsError> {
        self.saw_newline = false;
        self.skip_whitespace_and_comments()?;

        let lineno = self.lineno;
        let newline_before = self.saw_newline;

        let kind = match self.input.lookahead(0) {
            None => TokenKind::End,
            Some('\'') | Some('"') => self.scan_string()?,
            Some(c) if c.is_ascii_digit() => self.scan_number()?,
            Some('.') => {
                if matches!(self.input.lookahead(1), Some(d) if d.is_ascii_digit()) {
                    self.scan_number()?
                } else {
                    self.input.next();
                    TokenKind::Dot
                }
            }
            Some(c) if is_identifier_start(c) || self.at_unicode_escape() => {
                self.scan_identifier()?
            }
            Some(_) => self.scan_punctuator()?,
        };

        Ok(Token {
            kind,
            lineno,
            newline_before,
        })
    }

    /// Re-lex a regular expression literal. The parser calls this right
    /// after receiving a `/` or `/=` token it knows must start a regex; the
    /// already-consumed slash (and `=`) are reconstructed from `prev`.
    pub fn rescan_as_regex(&mut self, prev: &TokenKind) -> Result<Token, JsError> {
        let lineno = self.lineno;
        let mut s = GrowableString::new();
        s.push_ascii("/");
        if *prev == TokenKind::DivEq {
            s.push_ascii("=");
        } else if *prev != TokenKind::Div {
            return Err(self.error("regular expression must begin with '/'"));
        }

        loop {
            match self.input.lookahead(0) {
                None => return Err(self.error("unterminated regular expression")),
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error("regular expression literal contains line terminator"))
                }
                Some('/') => break,
                Some('\\') => {
                    s.push_unit(b'\\' as u16);
                    self.input.next();
                    match self.input.lookahead(0) {
                        None => return Err(self.error("unterminated regular expression")),
                        Some(c) if is_line_terminator(c) => {
                            return Err(
                                self.error("regular expression literal contains line terminator")
                            )
                        }
                        Some(c) => {
                            s.push_char(c);
                            self.input.next();
                        }
                    }
                }
                Some(c) => {
                    s.push_char(c);
                    self.input.next();
                }
            }
        }
        self.input.next(); // closing '/'
        s.push_ascii("/");

        while let Some(c) = self.input.lookahead(0) {
            if !is_identifier_part(c) {
                break;
            }
            s.push_char(c);
            self.input.next();
        }

        Ok(Token {
            kind: TokenKind::Regex(s.finish()),
            lineno,
            newline_before: false,
        })
    }

    // ============ TRIVIA ============

    fn skip_whitespace_and_comments(&mut self) -> Result<(), JsError> {
        loop {
            match self.input.lookahead(0) {
                Some(c) if is_whitespace(c) => {
                    self.input.next();
                }
                Some(c) if is_line_terminator(c) => {
                    self.consume_line_terminator(c);
                }
                Some('/') => match self.input.lookahead(1) {
                    Some('/') => self.skip_line_comment(),
                    Some('*') => self.skip_block_comment()?,
                    _ => return Ok(()),
                },
                Some('<')
                    if self.compat.sgml_comments
                        && self.input.lookahead(1) == Some('!')
                        && self.input.lookahead(2) == Some('-')
                        && self.input.lookahead(3) == Some('-') =>
                {
                    self.skip_line_comment()
                }
                _ => return Ok(()),
            }
        }
    }

    fn consume_line_terminator(&mut self, c: char) {
        self.input.next();
        // CRLF counts as a single terminator for line numbering.
        if c == '\r' && self.input.lookahead(0) == Some('\n') {
            self.input.next();
        }
        self.lineno += 1;
        self.saw_newline = true;
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.input.lookahead(0) {
            if is_line_terminator(c) {
                break;
            }
            self.input.next();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), JsError> {
        self.input.next(); // '/'
        self.input.next(); // '*'
        loop {
            match self.input.lookahead(0) {
                None => return Err(self.error("end of input in comment")),
                Some('*') if self.input.lookahead(1) == Some('/') => {
                    self.input.next();
                    self.input.next();
                    return Ok(());
                }
                Some(c) if is_line_terminator(c) => {
                    // A block comment straddling a line terminator counts
                    // as one for semicolon insertion.
                    self.consume_line_terminator(c);
                }
                Some(_) => {
                    self.input.next();
                }
            }
        }
    }

    // ============ LITERALS ============

    /// Is the input positioned at a full `\uHHHH` escape?
    fn at_unicode_escape(&mut self) -> bool {
        self.input.lookahead(0) == Some('\\')
            && self.input.lookahead(1) == Some('u')
            && (2..6).all(|i| matches!(self.input.lookahead(i), Some(c) if c.is_ascii_hexdigit()))
    }

    /// Is the input positioned at a full `\xHH` escape?
    fn at_hex_escape(&mut self) -> bool {
        self.input.lookahead(0) == Some('\\')
            && self.input.lookahead(1) == Some('x')
            && (2..4).all(|i| matches!(self.input.lookahead(i), Some(c) if c.is_ascii_hexdigit()))
    }

    fn scan_unicode_escape(&mut self) -> u32 {
        self.input.next(); // backslash
        self.input.next(); // 'u'
        let mut v = 0u32;
        for _ in 0..4 {
            let c = self.input.next().expect("checked by at_unicode_escape");
            v = v * 16 + c.to_digit(16).expect("checked by at_unicode_escape");
        }
        v
    }

    fn scan_hex_escape(&mut self) -> u32 {
        self.input.next(); // backslash
        self.input.next(); // 'x'
        let mut v = 0u32;
        for _ in 0..2 {
            let c = self.input.next().expect("checked by at_hex_escape");
            v = v * 16 + c.to_digit(16).expect("checked by at_hex_escape");
        }
        v
    }

    fn scan_string(&mut self) -> Result<TokenKind, JsError> {
        let quote = self.input.next().expect("caller saw the quote");
        let mut s = GrowableString::new();
        loop {
            if self.at_unicode_escape() {
                s.push_code_point(self.scan_unicode_escape());
                continue;
            }
            if self.at_hex_escape() {
                s.push_code_point(self.scan_hex_escape());
                continue;
            }
            match self.input.lookahead(0) {
                None => return Err(self.error("unterminated string literal")),
                Some(c) if c == quote => {
                    self.input.next();
                    return Ok(TokenKind::String(s.finish()));
                }
                Some(c) if is_line_terminator(c) => {
                    return Err(self.error("line terminator in string literal"))
                }
                Some(crate::input::BAD_CHAR) if !self.input.utf_unsafe() => {
                    return Err(self.error("invalid encoding in string literal"))
                }
                Some('\\') => {
                    self.input.next();
                    let c = match self.input.lookahead(0) {
                        None => return Err(self.error("unterminated string literal")),
                        Some(c) if is_line_terminator(c) => {
                            return Err(self.error("escaped line terminator in string literal"))
                        }
                        Some(c) => c,
                    };
                    match c {
                        'b' => push_and_skip(self, &mut s, 0x0008),
                        't' => push_and_skip(self, &mut s, 0x0009),
                        'n' => push_and_skip(self, &mut s, 0x000a),
                        'v' => push_and_skip(self, &mut s, 0x000b),
                        'f' => push_and_skip(self, &mut s, 0x000c),
                        'r' => push_and_skip(self, &mut s, 0x000d),
                        '0'..='3' => {
                            // Up to three octal digits.
                            let mut v = (c as u32) - ('0' as u32);
                            self.input.next();
                            for _ in 0..2 {
                                match self.input.lookahead(0) {
                                    Some(d @ '0'..='7') => {
                                        v = (v << 3) | ((d as u32) - ('0' as u32));
                                        self.input.next();
                                    }
                                    _ => break,
                                }
                            }
                            s.push_code_point(v);
                        }
                        '4'..='7' => {
                            // Up to two octal digits.
                            let mut v = (c as u32) - ('0' as u32);
                            self.input.next();
                            if let Some(d @ '0'..='7') = self.input.lookahead(0) {
                                v = (v << 3) | ((d as u32) - ('0' as u32));
                                self.input.next();
                            }
                            s.push_code_point(v);
                        }
                        'x' | 'u' => {
                            // A bare \x or \u (full escapes were handled
                            // above) is only legal under ext1, where it
                            // denotes the character itself.
                            if !self.compat.ext1 {
                                return Err(self.error(format!("invalid \\{} escape", c)));
                            }
                            push_and_skip(self, &mut s, c as u32);
                        }
                        other => push_and_skip(self, &mut s, other as u32),
                    }
                }
                Some(c) => {
                    s.push_char(c);
                    self.input.next();
                }
            }
        }
    }

    fn scan_number(&mut self) -> Result<TokenKind, JsError> {
        let mut buf = String::new();
        let mut seen_digit = false;

        if self.input.lookahead(0) == Some('0') {
            self.input.next();
            if matches!(self.input.lookahead(0), Some('x') | Some('X')) {
                self.input.next();
                return self.scan_hex_tail();
            }
            buf.push('0');
            seen_digit = true;
        }

        while let Some(c @ '0'..='9') = self.input.lookahead(0) {
            buf.push(c);
            seen_digit = true;
            self.input.next();
        }

        // Leading-zero octal integers, ext1 only. `019` falls back to
        // decimal, as does anything followed by '.', 'e' or 'E'.
        if self.compat.ext1
            && seen_digit
            && buf.len() > 1
            && buf.starts_with('0')
            && !matches!(self.input.lookahead(0), Some('.') | Some('e') | Some('E'))
            && buf[1..].bytes().all(|b| (b'0'..=b'7').contains(&b))
        {
            if matches!(self.input.lookahead(0), Some(c) if is_identifier_start(c)) {
                return Err(self.error("identifier immediately follows numeric literal"));
            }
            let mut n = 0.0f64;
            for b in buf[1..].bytes() {
                n = n * 8.0 + f64::from(b - b'0');
            }
            return Ok(TokenKind::Number(n));
        }

        if self.input.lookahead(0) == Some('.') {
            buf.push('.');
            self.input.next();
            while let Some(c @ '0'..='9') = self.input.lookahead(0) {
                buf.push(c);
                seen_digit = true;
                self.input.next();
            }
        }

        if !seen_digit {
            // A lone '.' is dispatched before scan_number is called.
            return Err(self.error("malformed numeric literal"));
        }

        if matches!(self.input.lookahead(0), Some('e') | Some('E')) {
            buf.push('e');
            self.input.next();
            if matches!(self.input.lookahead(0), Some('+') | Some('-')) {
                buf.push(self.input.next().expect("sign present"));
            }
            let mut exp_digit = false;
            while let Some(c @ '0'..='9') = self.input.lookahead(0) {
                buf.push(c);
                exp_digit = true;
                self.input.next();
            }
            if !exp_digit {
                return Err(self.error("missing digits in exponent"));
            }
        }

        if matches!(self.input.lookahead(0), Some(c) if is_identifier_start(c)) {
            return Err(self.error("identifier immediately follows numeric literal"));
        }

        let n: f64 = buf
            .parse()
            .map_err(|_| self.error("malformed numeric literal"))?;
        Ok(TokenKind::Number(n))
    }

    fn scan_hex_tail(&mut self) -> Result<TokenKind, JsError> {
        let mut digits = Vec::new();
        while let Some(c) = self.input.lookahead(0) {
            if !c.is_ascii_hexdigit() {
                break;
            }
            digits.push(c.to_digit(16).expect("hex digit") as f64);
            self.input.next();
        }
        if digits.is_empty() {
            return Err(self.error("missing digits in hex literal"));
        }
        if matches!(self.input.lookahead(0), Some(c) if is_identifier_start(c)) {
            return Err(self.error("identifier immediately follows numeric literal"));
        }
        let mut n = 0.0f64;
        for d in digits {
            n = n * 16.0 + d;
        }
        Ok(TokenKind::Number(n))
    }

    // ============ IDENTIFIERS ============

    fn scan_identifier(&mut self) -> Result<TokenKind, JsError> {
        let mut s = GrowableString::new();
        let mut has_escape = false;
        loop {
            if self.at_unicode_escape() {
                s.push_code_point(self.scan_unicode_escape());
                has_escape = true;
            } else {
                match self.input.lookahead(0) {
                    Some(c) if is_identifier_part(c) => {
                        s.push_char(c);
                        self.input.next();
                    }
                    Some('\\') => return Err(self.error("malformed identifier escape")),
                    _ => break,
                }
            }
        }

        let name = s.finish();
        // An identifier containing an escape never matches a keyword.
        if !has_escape {
            let text = name.to_utf8_lossy();
            if let Some(kind) = keyword(&text) {
                return Ok(kind);
            }
            if is_reserved_word(&text) {
                // ext1 demotes future-reserved words to plain identifiers.
                if !self.compat.ext1 {
                    return Ok(TokenKind::Reserved(self.dict.intern(&name)));
                }
            }
        }
        Ok(TokenKind::Identifier(self.dict.intern(&name)))
    }

    // ============ PUNCTUATORS ============

    fn scan_punctuator(&mut self) -> Result<TokenKind, JsError> {
        let c = self.input.next().expect("caller saw a character");
        let kind = match c {
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            '~' => TokenKind::Tilde,
            '?' => TokenKind::Question,
            ':' => TokenKind::Colon,
            '<' => match self.input.lookahead(0) {
                Some('=') => self.eat(TokenKind::LtEq),
                Some('<') => {
                    self.input.next();
                    if self.input.lookahead(0) == Some('=') {
                        self.eat(TokenKind::LtLtEq)
                    } else {
                        TokenKind::LtLt
                    }
                }
                _ => TokenKind::Lt,
            },
            '>' => match self.input.lookahead(0) {
                Some('=') => self.eat(TokenKind::GtEq),
                Some('>') => {
                    self.input.next();
                    match self.input.lookahead(0) {
                        Some('=') => self.eat(TokenKind::GtGtEq),
                        Some('>') => {
                            self.input.next();
                            if self.input.lookahead(0) == Some('=') {
                                self.eat(TokenKind::GtGtGtEq)
                            } else {
                                TokenKind::GtGt
                            }
                        }
                        _ => TokenKind::GtGt,
                    }
                }
                _ => TokenKind::Gt,
            },
            '=' => match self.input.lookahead(0) {
                Some('=') => {
                    self.input.next();
                    if self.input.lookahead(0) == Some('=') {
                        self.eat(TokenKind::EqEqEq)
                    } else {
                        TokenKind::EqEq
                    }
                }
                _ => TokenKind::Eq,
            },
            '!' => match self.input.lookahead(0) {
                Some('=') => {
                    self.input.next();
                    if self.input.lookahead(0) == Some('=') {
                        self.eat(TokenKind::BangEqEq)
                    } else {
                        TokenKind::BangEq
                    }
                }
                _ => TokenKind::Bang,
            },
            '+' => match self.input.lookahead(0) {
                Some('+') => self.eat(TokenKind::PlusPlus),
                Some('=') => self.eat(TokenKind::PlusEq),
                _ => TokenKind::Plus,
            },
            '-' => match self.input.lookahead(0) {
                Some('-') => self.eat(TokenKind::MinusMinus),
                Some('=') => self.eat(TokenKind::MinusEq),
                _ => TokenKind::Minus,
            },
            '*' => match self.input.lookahead(0) {
                Some('=') => self.eat(TokenKind::StarEq),
                _ => TokenKind::Star,
            },
            '%' => match self.input.lookahead(0) {
                Some('=') => self.eat(TokenKind::PercentEq),
                _ => TokenKind::Percent,
            },
            '&' => match self.input.lookahead(0) {
                Some('&') => self.eat(TokenKind::AmpAmp),
                Some('=') => self.eat(TokenKind::AmpEq),
                _ => TokenKind::Amp,
            },
            '|' => match self.input.lookahead(0) {
                Some('|') => self.eat(TokenKind::PipePipe),
                Some('=') => self.eat(TokenKind::PipeEq),
                _ => TokenKind::Pipe,
            },
            '^' => match self.input.lookahead(0) {
                Some('=') => self.eat(TokenKind::CaretEq),
                _ => TokenKind::Caret,
            },
            '/' => match self.input.lookahead(0) {
                Some('=') => self.eat(TokenKind::DivEq),
                _ => TokenKind::Div,
            },
            other => return Err(self.error(format!("unexpected character '{}'", other))),
        };
        Ok(kind)
    }

    fn eat(&mut self, kind: TokenKind) -> TokenKind {
        self.input.next();
        kind
    }
}

fn push_and_skip(lexer: &mut Lexer<'_>, s: &mut GrowableString, cp: u32) {
    lexer.input.next();
    s.push_code_point(cp);
}

/// ECMA-262 WhiteSpace.
/// XXX: the Zs category beyond NBSP is not consulted.
fn is_whitespace(c: char) -> bool {
    matches!(c, '\u{0009}' | '\u{000B}' | '\u{000C}' | '\u{0020}' | '\u{00A0}')
}

/// ECMA-262 LineTerminator: LF, CR, LS, PS.
pub fn is_line_terminator(c: char) -> bool {
    matches!(c, '\u{000A}' | '\u{000D}' | '\u{2028}' | '\u{2029}')
}

/// IdentifierStart.
/// XXX: Unicode letter categories (Lu/Ll/Lt/Lm/Lo) are not consulted.
fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '$' || c == '_'
}

/// IdentifierPart.
/// XXX: combining marks and connector punctuation are not consulted.
fn is_identifier_part(c: char) -> bool {
    is_identifier_start(c) || c.is_ascii_digit()
}

fn keyword(text: &str) -> Option<TokenKind> {
    Some(match text {
        "break" => TokenKind::Break,
        "case" => TokenKind::Case,
        "catch" => TokenKind::Catch,
        "continue" => TokenKind::Continue,
        "default" => TokenKind::Default,
        "delete" => TokenKind::Delete,
        "do" => TokenKind::Do,
        "else" => TokenKind::Else,
        "false" => TokenKind::False,
        "finally" => TokenKind::Finally,
        "for" => TokenKind::For,
        "function" => TokenKind::Function,
        "if" => TokenKind::If,
        "in" => TokenKind::In,
        "instanceof" => TokenKind::InstanceOf,
        "new" => TokenKind::New,
        "null" => TokenKind::Null,
        "return" => TokenKind::Return,
        "switch" => TokenKind::Switch,
        "this" => TokenKind::This,
        "throw" => TokenKind::Throw,
        "true" => TokenKind::True,
        "try" => TokenKind::Try,
        "typeof" => TokenKind::TypeOf,
        "var" => TokenKind::Var,
        "void" => TokenKind::Void,
        "while" => TokenKind::While,
        "with" => TokenKind::With,
        _ => return None,
    })
}

/// FutureReservedWord per ECMA-262 3rd edition §7.5.3.
fn is_reserved_word(text: &str) -> bool {
    matches!(
        text,
        "abstract"
            | "boolean"
            | "byte"
            | "char"
            | "class"
            | "const"
            | "debugger"
            | "double"
            | "enum"
            | "export"
            | "extends"
            | "final"
            | "float"
            | "goto"
            | "implements"
            | "import"
            | "int"
            | "interface"
            | "long"
            | "native"
            | "package"
            | "private"
            | "protected"
            | "public"
            | "short"
            | "static"
            | "super"
            | "synchronized"
            | "throws"
            | "transient"
            | "volatile"
    )
}
