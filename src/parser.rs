//! Recursive-descent parser for the ECMA-262 3rd-edition grammar.
//!
//! One token of lookahead suffices almost everywhere; a second is buffered
//! for the two places the grammar needs it (labelled statements and the
//! `new e(a)` production). The parser resolves `break`/`continue` labels
//! to target identities while parsing, collects each function's `var`
//! list for hoisting, folds constant subexpressions, and applies automatic
//! semicolon insertion everywhere except `for` headers.

use std::rc::Rc;

use crate::ast::*;
use crate::error::{JsError, SourceLocation};
use crate::input::Input;
use crate::interpreter::Interpreter;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::string::JsString;
use crate::value;

/// How a resolved label may be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    /// Iteration statement: break and continue both bind.
    Loop,
    /// Switch statement: break only.
    Switch,
    /// Any other labelled statement: break only.
    Statement,
}

struct LabelEntry {
    /// None for the implicit sentinel a loop or switch pushes for
    /// unlabelled break/continue.
    name: Option<JsString>,
    target: TargetId,
    kind: TargetKind,
}

/// Per-function parse state: hoisting lists and whether `return` is legal.
struct FuncState {
    vars: Vec<JsString>,
    funcdecls: Vec<Rc<Function>>,
    is_function: bool,
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    /// Second lookahead slot, filled only on demand.
    peeked: Option<Token>,
    filename: Option<JsString>,
    labels: Vec<LabelEntry>,
    /// How many label entries at the top of `labels` directly precede the
    /// statement about to be parsed (an `a: b: while ...` chain).
    adjacent_labels: usize,
    next_target: u32,
    funcstack: Vec<FuncState>,
    /// Parser recursion gauge, bounded by the interpreter's budget.
    depth: u32,
    recursion_limit: u32,
}

impl<'a> Parser<'a> {
    pub fn new(interp: &'a mut Interpreter, input: Input) -> Self {
        let compat = interp.compat;
        let recursion_limit = interp.recursion_limit;
        let input = input.with_utf_unsafe(compat.utf_unsafe);
        let lexer = Lexer::new(input, interp.dict_mut(), compat);
        let filename = lexer.filename().cloned();
        Self {
            lexer,
            current: Token {
                kind: TokenKind::End,
                lineno: 0,
                newline_before: false,
            },
            peeked: None,
            filename,
            labels: Vec::new(),
            adjacent_labels: 0,
            next_target: 0,
            funcstack: Vec::new(),
            depth: 0,
            recursion_limit,
        }
    }

    // ============ ENTRY POINTS ============

    /// Parse a complete Program.
    pub fn parse_program(&mut self) -> Result<Rc<Function>, JsError> {
        self.advance()?;
        let body = self.parse_source_elements(false, TokenKind::End)?;
        Ok(Rc::new(
            Function::new(None, Vec::new(), body).with_filename(self.filename.clone()),
        ))
    }

    /// Parse a FormalParameterList running to end of input.
    pub fn parse_formal_parameters(&mut self) -> Result<Vec<JsString>, JsError> {
        self.advance()?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::End) {
            loop {
                params.push(self.expect_identifier("parameter name")?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        if !self.check(&TokenKind::End) {
            return Err(self.unexpected("end of parameter list"));
        }
        Ok(params)
    }

    /// Parse a FunctionBody running to end of input.
    pub fn parse_function_body_only(&mut self) -> Result<FunctionBody, JsError> {
        self.advance()?;
        self.parse_source_elements(true, TokenKind::End)
    }

    fn parse_source_elements(
        &mut self,
        is_function: bool,
        terminator: TokenKind,
    ) -> Result<FunctionBody, JsError> {
        self.funcstack.push(FuncState {
            vars: Vec::new(),
            funcdecls: Vec::new(),
            is_function,
        });
        let mut statements = Vec::new();
        while !self.check(&terminator) {
            if self.check(&TokenKind::End) {
                // Only reachable when the terminator is RBrace.
                return Err(self.unexpected("'}'"));
            }
            statements.push(self.parse_statement()?);
        }
        let state = self.funcstack.pop().expect("pushed above");
        Ok(FunctionBody {
            statements,
            vars: state.vars,
            funcdecls: state.funcdecls,
        })
    }

    // ============ TOKEN PLUMBING ============

    fn advance(&mut self) -> Result<Token, JsError> {
        let next = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn peek(&mut self) -> Result<&Token, JsError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.lexer.next_token()?);
        }
        Ok(self.peeked.as_ref().expect("just filled"))
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.current.kind == *kind
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool, JsError> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), JsError> {
        if self.check(kind) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn location(&self) -> SourceLocation {
        SourceLocation::new(self.filename.clone(), self.current.lineno.max(1))
    }

    fn error(&self, message: impl Into<String>) -> JsError {
        JsError::syntax(message, self.location())
    }

    fn unexpected(&self, wanted: &str) -> JsError {
        self.error(format!(
            "expected {}, found {}",
            wanted,
            self.current.kind.describe()
        ))
    }

    fn expect_identifier(&mut self, what: &str) -> Result<JsString, JsError> {
        match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(name)
            }
            _ => Err(self.unexpected(what)),
        }
    }

    /// Automatic semicolon insertion: an explicit `;`, or `}`/end of
    /// input, or a line terminator since the previous token.
    fn expect_semicolon(&mut self) -> Result<(), JsError> {
        if self.eat(&TokenKind::Semicolon)? {
            return Ok(());
        }
        if self.check(&TokenKind::RBrace)
            || self.check(&TokenKind::End)
            || self.current.newline_before
        {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    fn enter(&mut self) -> Result<(), JsError> {
        self.depth += 1;
        if self.depth > self.recursion_limit {
            return Err(self.error("expression nesting too deep"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // ============ LABELS & TARGETS ============

    fn new_target(&mut self) -> TargetId {
        let id = TargetId(self.next_target);
        self.next_target += 1;
        id
    }

    /// Rebind the label chain directly wrapping a loop/switch onto its
    /// target, so `continue label` and `break label` land on the
    /// statement itself.
    fn claim_adjacent_labels(&mut self, target: TargetId, kind: TargetKind) {
        let n = std::mem::take(&mut self.adjacent_labels);
        let len = self.labels.len();
        for entry in &mut self.labels[len - n..] {
            entry.target = target;
            entry.kind = kind;
        }
    }

    fn resolve_break(&self, label: Option<&JsString>) -> Result<TargetId, JsError> {
        match label {
            None => self
                .labels
                .iter()
                .rev()
                .find(|e| e.name.is_none())
                .map(|e| e.target)
                .ok_or_else(|| self.error("break outside of loop or switch")),
            Some(name) => self
                .labels
                .iter()
                .rev()
                .find(|e| e.name.as_ref() == Some(name))
                .map(|e| e.target)
                .ok_or_else(|| self.error(format!("label '{}' not found", name))),
        }
    }

    fn resolve_continue(&self, label: Option<&JsString>) -> Result<TargetId, JsError> {
        match label {
            None => self
                .labels
                .iter()
                .rev()
                .find(|e| e.name.is_none() && e.kind == TargetKind::Loop)
                .map(|e| e.target)
                .ok_or_else(|| self.error("continue outside of loop")),
            Some(name) => {
                let entry = self
                    .labels
                    .iter()
                    .rev()
                    .find(|e| e.name.as_ref() == Some(name))
                    .ok_or_else(|| self.error(format!("label '{}' not found", name)))?;
                if entry.kind != TargetKind::Loop {
                    return Err(self.error(format!("label '{}' is not a loop", name)));
                }
                Ok(entry.target)
            }
        }
    }

    // ============ STATEMENTS ============

    fn parse_statement(&mut self) -> Result<Statement, JsError> {
        self.enter()?;
        let result = self.parse_statement_inner();
        self.leave();
        result
    }

    fn parse_statement_inner(&mut self) -> Result<Statement, JsError> {
        // Labelled statement needs the second lookahead token.
        if matches!(self.current.kind, TokenKind::Identifier(_))
            && self.peek()?.kind == TokenKind::Colon
        {
            return self.parse_labelled_statement();
        }

        // Any statement other than an iteration or switch breaks the
        // label adjacency chain.
        match self.current.kind {
            TokenKind::For | TokenKind::While | TokenKind::Do | TokenKind::Switch => {}
            _ => self.adjacent_labels = 0,
        }

        match &self.current.kind {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Var => self.parse_var_statement(),
            TokenKind::Semicolon => {
                self.advance()?;
                Ok(Statement::Empty)
            }
            TokenKind::If => self.parse_if_statement(),
            TokenKind::Do => self.parse_do_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::With => self.parse_with_statement(),
            TokenKind::Switch => self.parse_switch_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Try => self.parse_try_statement(),
            TokenKind::Function => {
                let func = self.parse_function(true)?;
                self.funcstack
                    .last_mut()
                    .expect("inside a body")
                    .funcdecls
                    .push(func.clone());
                Ok(Statement::FunctionDecl(func))
            }
            TokenKind::Reserved(word) => {
                Err(self.error(format!("'{}' is a reserved word", word)))
            }
            _ => {
                let line = self.current.lineno;
                let expr = self.parse_expression(false)?;
                self.expect_semicolon()?;
                Ok(Statement::Expression { expr, line })
            }
        }
    }

    fn parse_block(&mut self) -> Result<Statement, JsError> {
        self.expect(&TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::End) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance()?;
        Ok(Statement::Block(body))
    }

    fn parse_var_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        self.advance()?;
        let decls = self.parse_var_declarations(false)?;
        self.expect_semicolon()?;
        Ok(Statement::Var { decls, line })
    }

    fn parse_var_declarations(&mut self, noin: bool) -> Result<Vec<VarDecl>, JsError> {
        let mut decls = vec![self.parse_var_declaration(noin)?];
        while self.eat(&TokenKind::Comma)? {
            decls.push(self.parse_var_declaration(noin)?);
        }
        Ok(decls)
    }

    fn parse_var_declaration(&mut self, noin: bool) -> Result<VarDecl, JsError> {
        let name = self.expect_identifier("variable name")?;
        self.funcstack
            .last_mut()
            .expect("inside a body")
            .vars
            .push(name.clone());
        let init = if self.eat(&TokenKind::Eq)? {
            Some(self.parse_assignment(noin)?)
        } else {
            None
        };
        Ok(VarDecl { name, init })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        self.advance()?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression(false)?;
        self.expect(&TokenKind::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(&TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Statement::If {
            test,
            consequent,
            alternate,
            line,
        })
    }

    fn parse_do_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        let target = self.new_target();
        self.claim_adjacent_labels(target, TargetKind::Loop);
        self.labels.push(LabelEntry {
            name: None,
            target,
            kind: TargetKind::Loop,
        });
        self.advance()?;
        let body = Box::new(self.parse_statement()?);
        self.labels.pop();
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression(false)?;
        self.expect(&TokenKind::RParen)?;
        self.expect_semicolon()?;
        Ok(Statement::Do {
            body,
            test,
            target,
            line,
        })
    }

    fn parse_while_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        let target = self.new_target();
        self.claim_adjacent_labels(target, TargetKind::Loop);
        self.advance()?;
        self.expect(&TokenKind::LParen)?;
        let test = self.parse_expression(false)?;
        self.expect(&TokenKind::RParen)?;
        self.labels.push(LabelEntry {
            name: None,
            target,
            kind: TargetKind::Loop,
        });
        let body = Box::new(self.parse_statement()?);
        self.labels.pop();
        Ok(Statement::While {
            test,
            body,
            target,
            line,
        })
    }

    fn parse_for_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        let target = self.new_target();
        self.claim_adjacent_labels(target, TargetKind::Loop);
        self.advance()?;
        self.expect(&TokenKind::LParen)?;

        // Distinguish for(;;) / for(init;;) / for(lhs in obj).
        let mut init: Option<ForInit> = None;
        let mut forin_left: Option<ForInLeft> = None;
        if !self.check(&TokenKind::Semicolon) {
            if self.check(&TokenKind::Var) {
                self.advance()?;
                let decls = self.parse_var_declarations(true)?;
                if self.check(&TokenKind::In) {
                    if decls.len() != 1 {
                        return Err(
                            self.error("for-in takes exactly one variable declaration")
                        );
                    }
                    forin_left =
                        Some(ForInLeft::Var(decls.into_iter().next().expect("one decl")));
                } else {
                    init = Some(ForInit::Var(decls));
                }
            } else {
                let expr = self.parse_expression(true)?;
                if self.check(&TokenKind::In) {
                    if !expr.is_lhs() {
                        return Err(self.error("invalid left-hand side in for-in"));
                    }
                    forin_left = Some(ForInLeft::Expr(expr));
                } else {
                    init = Some(ForInit::Expr(expr));
                }
            }
        }

        if let Some(left) = forin_left {
            self.expect(&TokenKind::In)?;
            let object = self.parse_expression(false)?;
            self.expect(&TokenKind::RParen)?;
            self.labels.push(LabelEntry {
                name: None,
                target,
                kind: TargetKind::Loop,
            });
            let body = Box::new(self.parse_statement()?);
            self.labels.pop();
            return Ok(Statement::ForIn {
                left,
                object,
                body,
                target,
                line,
            });
        }

        // Semicolons inside a for header are never inserted.
        self.expect(&TokenKind::Semicolon)?;
        let test = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.expect(&TokenKind::Semicolon)?;
        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.expect(&TokenKind::RParen)?;
        self.labels.push(LabelEntry {
            name: None,
            target,
            kind: TargetKind::Loop,
        });
        let body = Box::new(self.parse_statement()?);
        self.labels.pop();
        Ok(Statement::For {
            init,
            test,
            update,
            body,
            target,
            line,
        })
    }

    fn parse_continue_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        self.advance()?;
        // [no LineTerminator here] Identifier
        let label = match &self.current.kind {
            TokenKind::Identifier(name) if !self.current.newline_before => {
                let name = name.clone();
                self.advance()?;
                Some(name)
            }
            _ => None,
        };
        let target = self.resolve_continue(label.as_ref())?;
        self.expect_semicolon()?;
        Ok(Statement::Continue {
            label,
            target,
            line,
        })
    }

    fn parse_break_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        self.advance()?;
        let label = match &self.current.kind {
            TokenKind::Identifier(name) if !self.current.newline_before => {
                let name = name.clone();
                self.advance()?;
                Some(name)
            }
            _ => None,
        };
        let target = self.resolve_break(label.as_ref())?;
        self.expect_semicolon()?;
        Ok(Statement::Break {
            label,
            target,
            line,
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        if !self
            .funcstack
            .last()
            .map(|s| s.is_function)
            .unwrap_or(false)
        {
            return Err(self.error("return outside of function"));
        }
        self.advance()?;
        let value = if self.check(&TokenKind::Semicolon)
            || self.check(&TokenKind::RBrace)
            || self.check(&TokenKind::End)
            || self.current.newline_before
        {
            None
        } else {
            Some(self.parse_expression(false)?)
        };
        self.expect_semicolon()?;
        Ok(Statement::Return { value, line })
    }

    fn parse_with_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        self.advance()?;
        self.expect(&TokenKind::LParen)?;
        let object = self.parse_expression(false)?;
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Statement::With { object, body, line })
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        let target = self.new_target();
        self.claim_adjacent_labels(target, TargetKind::Switch);
        self.advance()?;
        self.expect(&TokenKind::LParen)?;
        let discriminant = self.parse_expression(false)?;
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::LBrace)?;

        self.labels.push(LabelEntry {
            name: None,
            target,
            kind: TargetKind::Switch,
        });
        let mut cases = Vec::new();
        let mut default = None;
        while !self.check(&TokenKind::RBrace) {
            let test = if self.eat(&TokenKind::Case)? {
                Some(self.parse_expression(false)?)
            } else if self.check(&TokenKind::Default) {
                self.advance()?;
                if default.is_some() {
                    self.labels.pop();
                    return Err(self.error("more than one default clause in switch"));
                }
                default = Some(cases.len());
                None
            } else {
                self.labels.pop();
                return Err(self.unexpected("'case' or 'default'"));
            };
            self.expect(&TokenKind::Colon)?;
            let mut body = Vec::new();
            while !self.check(&TokenKind::Case)
                && !self.check(&TokenKind::Default)
                && !self.check(&TokenKind::RBrace)
            {
                if self.check(&TokenKind::End) {
                    self.labels.pop();
                    return Err(self.unexpected("'}'"));
                }
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.labels.pop();
        self.advance()?;
        Ok(Statement::Switch {
            discriminant,
            cases,
            default,
            target,
            line,
        })
    }

    fn parse_throw_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        self.advance()?;
        if self.current.newline_before {
            return Err(self.error("no line terminator allowed after throw"));
        }
        let value = self.parse_expression(false)?;
        self.expect_semicolon()?;
        Ok(Statement::Throw { value, line })
    }

    fn parse_try_statement(&mut self) -> Result<Statement, JsError> {
        let line = self.current.lineno;
        self.advance()?;
        let block = self.parse_brace_block()?;
        let catch = if self.eat(&TokenKind::Catch)? {
            self.expect(&TokenKind::LParen)?;
            let param = self.expect_identifier("catch parameter")?;
            self.expect(&TokenKind::RParen)?;
            let body = self.parse_brace_block()?;
            Some(CatchClause { param, body })
        } else {
            None
        };
        let finally = if self.eat(&TokenKind::Finally)? {
            Some(self.parse_brace_block()?)
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(self.error("try needs a catch or finally clause"));
        }
        Ok(Statement::Try {
            block,
            catch,
            finally,
            line,
        })
    }

    fn parse_brace_block(&mut self) -> Result<Vec<Statement>, JsError> {
        self.expect(&TokenKind::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            if self.check(&TokenKind::End) {
                return Err(self.unexpected("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.advance()?;
        Ok(body)
    }

    fn parse_labelled_statement(&mut self) -> Result<Statement, JsError> {
        let label = self.expect_identifier("label")?;
        self.expect(&TokenKind::Colon)?;

        if self.labels.iter().any(|e| e.name.as_ref() == Some(&label)) {
            return Err(self.error(format!("duplicate label '{}'", label)));
        }

        let target = self.new_target();
        self.labels.push(LabelEntry {
            name: Some(label.clone()),
            target,
            kind: TargetKind::Statement,
        });
        self.adjacent_labels += 1;
        let body = self.parse_statement();
        let entry = self.labels.pop().expect("pushed above");
        let body = Box::new(body?);
        // A loop or switch may have rebound the entry onto itself.
        Ok(Statement::Labelled {
            label,
            body,
            target: entry.target,
        })
    }

    // ============ FUNCTIONS ============

    fn parse_function(&mut self, declaration: bool) -> Result<Rc<Function>, JsError> {
        self.expect(&TokenKind::Function)?;
        let name = match &self.current.kind {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Some(name)
            }
            _ if declaration => return Err(self.unexpected("function name")),
            _ => None,
        };

        self.expect(&TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                params.push(self.expect_identifier("parameter name")?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        self.expect(&TokenKind::LBrace)?;

        // Labels do not cross function boundaries.
        let saved_labels = std::mem::take(&mut self.labels);
        let saved_adjacent = std::mem::take(&mut self.adjacent_labels);
        let body = self.parse_source_elements(true, TokenKind::RBrace)?;
        self.labels = saved_labels;
        self.adjacent_labels = saved_adjacent;

        self.expect(&TokenKind::RBrace)?;
        Ok(Rc::new(
            Function::new(name, params, body).with_filename(self.filename.clone()),
        ))
    }

    // ============ EXPRESSIONS ============

    fn parse_expression(&mut self, noin: bool) -> Result<Expression, JsError> {
        self.enter()?;
        let result = self.parse_expression_inner(noin);
        self.leave();
        result
    }

    fn parse_expression_inner(&mut self, noin: bool) -> Result<Expression, JsError> {
        let mut expr = self.parse_assignment(noin)?;
        while self.eat(&TokenKind::Comma)? {
            let right = self.parse_assignment(noin)?;
            expr = fold(Expression::Comma {
                left: Box::new(expr),
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn parse_assignment(&mut self, noin: bool) -> Result<Expression, JsError> {
        let expr = self.parse_conditional(noin)?;

        let op = match &self.current.kind {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinaryOp::Add),
            TokenKind::MinusEq => Some(BinaryOp::Sub),
            TokenKind::StarEq => Some(BinaryOp::Mul),
            TokenKind::DivEq => Some(BinaryOp::Div),
            TokenKind::PercentEq => Some(BinaryOp::Mod),
            TokenKind::LtLtEq => Some(BinaryOp::LShift),
            TokenKind::GtGtEq => Some(BinaryOp::RShift),
            TokenKind::GtGtGtEq => Some(BinaryOp::URShift),
            TokenKind::AmpEq => Some(BinaryOp::BitAnd),
            TokenKind::CaretEq => Some(BinaryOp::BitXor),
            TokenKind::PipeEq => Some(BinaryOp::BitOr),
            _ => return Ok(expr),
        };

        // Only a LeftHandSideExpression may precede an assignment operator.
        if !expr.is_lhs() {
            return Err(self.error("invalid left-hand side in assignment"));
        }
        self.advance()?;
        let value = self.parse_assignment(noin)?;
        Ok(Expression::Assign {
            op,
            target: Box::new(expr),
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self, noin: bool) -> Result<Expression, JsError> {
        let test = self.parse_binary(0, noin)?;
        if !self.eat(&TokenKind::Question)? {
            return Ok(test);
        }
        let consequent = self.parse_assignment(false)?;
        self.expect(&TokenKind::Colon)?;
        let alternate = self.parse_assignment(noin)?;
        Ok(fold(Expression::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
        }))
    }

    /// Binary operators by precedence-climbing over the ES3 levels:
    /// `||`, `&&`, `|`, `^`, `&`, equality, relational, shift, additive,
    /// multiplicative.
    fn parse_binary(&mut self, min_level: u8, noin: bool) -> Result<Expression, JsError> {
        self.enter()?;
        let result = self.parse_binary_inner(min_level, noin);
        self.leave();
        result
    }

    fn parse_binary_inner(&mut self, min_level: u8, noin: bool) -> Result<Expression, JsError> {
        let mut left = self.parse_unary()?;
        loop {
            let (level, kind) = match &self.current.kind {
                TokenKind::PipePipe => (0, BinKind::Logical(LogicalOp::Or)),
                TokenKind::AmpAmp => (1, BinKind::Logical(LogicalOp::And)),
                TokenKind::Pipe => (2, BinKind::Binary(BinaryOp::BitOr)),
                TokenKind::Caret => (3, BinKind::Binary(BinaryOp::BitXor)),
                TokenKind::Amp => (4, BinKind::Binary(BinaryOp::BitAnd)),
                TokenKind::EqEq => (5, BinKind::Binary(BinaryOp::Eq)),
                TokenKind::BangEq => (5, BinKind::Binary(BinaryOp::NotEq)),
                TokenKind::EqEqEq => (5, BinKind::Binary(BinaryOp::StrictEq)),
                TokenKind::BangEqEq => (5, BinKind::Binary(BinaryOp::StrictNotEq)),
                TokenKind::Lt => (6, BinKind::Binary(BinaryOp::Lt)),
                TokenKind::Gt => (6, BinKind::Binary(BinaryOp::Gt)),
                TokenKind::LtEq => (6, BinKind::Binary(BinaryOp::LtEq)),
                TokenKind::GtEq => (6, BinKind::Binary(BinaryOp::GtEq)),
                TokenKind::InstanceOf => (6, BinKind::Binary(BinaryOp::InstanceOf)),
                TokenKind::In if !noin => (6, BinKind::Binary(BinaryOp::In)),
                TokenKind::LtLt => (7, BinKind::Binary(BinaryOp::LShift)),
                TokenKind::GtGt => (7, BinKind::Binary(BinaryOp::RShift)),
                TokenKind::GtGtGt => (7, BinKind::Binary(BinaryOp::URShift)),
                TokenKind::Plus => (8, BinKind::Binary(BinaryOp::Add)),
                TokenKind::Minus => (8, BinKind::Binary(BinaryOp::Sub)),
                TokenKind::Star => (9, BinKind::Binary(BinaryOp::Mul)),
                TokenKind::Div => (9, BinKind::Binary(BinaryOp::Div)),
                TokenKind::Percent => (9, BinKind::Binary(BinaryOp::Mod)),
                _ => break,
            };
            if level < min_level {
                break;
            }
            self.advance()?;
            let right = self.parse_binary(level + 1, noin)?;
            left = fold(match kind {
                BinKind::Binary(op) => Expression::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                BinKind::Logical(op) => Expression::Logical {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
            });
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression, JsError> {
        self.enter()?;
        let result = self.parse_unary_inner();
        self.leave();
        result
    }

    fn parse_unary_inner(&mut self) -> Result<Expression, JsError> {
        let op = match &self.current.kind {
            TokenKind::Delete => Some(UnaryOp::Delete),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::TypeOf => Some(UnaryOp::TypeOf),
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::PlusPlus => {
                self.advance()?;
                let operand = self.parse_unary()?;
                return Ok(Expression::Prefix {
                    op: UpdateOp::Increment,
                    operand: Box::new(operand),
                });
            }
            TokenKind::MinusMinus => {
                self.advance()?;
                let operand = self.parse_unary()?;
                return Ok(Expression::Prefix {
                    op: UpdateOp::Decrement,
                    operand: Box::new(operand),
                });
            }
            _ => None,
        };
        if let Some(op) = op {
            self.advance()?;
            let operand = self.parse_unary()?;
            return Ok(fold(Expression::Unary {
                op,
                operand: Box::new(operand),
            }));
        }

        let expr = self.parse_left_hand_side(true)?;

        // Postfix operators do not follow a line terminator.
        match &self.current.kind {
            TokenKind::PlusPlus if !self.current.newline_before => {
                self.advance()?;
                Ok(Expression::Postfix {
                    op: UpdateOp::Increment,
                    operand: Box::new(expr),
                })
            }
            TokenKind::MinusMinus if !self.current.newline_before => {
                self.advance()?;
                Ok(Expression::Postfix {
                    op: UpdateOp::Decrement,
                    operand: Box::new(expr),
                })
            }
            _ => Ok(expr),
        }
    }

    /// MemberExpression / NewExpression / CallExpression. `allow_call`
    /// is false while parsing the callee of `new`, which binds its
    /// argument list to the constructor: `new e(a)` rather than
    /// `(new e)(a)`.
    fn parse_left_hand_side(&mut self, allow_call: bool) -> Result<Expression, JsError> {
        self.enter()?;
        let result = self.parse_left_hand_side_inner(allow_call);
        self.leave();
        result
    }

    fn parse_left_hand_side_inner(&mut self, allow_call: bool) -> Result<Expression, JsError> {
        let mut expr = if self.check(&TokenKind::New) {
            self.advance()?;
            let callee = self.parse_left_hand_side(false)?;
            let arguments = if self.check(&TokenKind::LParen) {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            Expression::New {
                callee: Box::new(callee),
                arguments,
            }
        } else {
            self.parse_primary()?
        };

        loop {
            match &self.current.kind {
                TokenKind::Dot => {
                    self.advance()?;
                    let property = self.parse_property_name_after_dot()?;
                    expr = Expression::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                TokenKind::LBracket => {
                    self.advance()?;
                    let index = self.parse_expression(false)?;
                    self.expect(&TokenKind::RBracket)?;
                    expr = Expression::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::LParen if allow_call => {
                    let arguments = self.parse_arguments()?;
                    expr = Expression::Call {
                        callee: Box::new(expr),
                        arguments,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    /// After a dot, keywords are still property names in practice; the
    /// reference accepts only identifiers and so do we.
    fn parse_property_name_after_dot(&mut self) -> Result<JsString, JsError> {
        self.expect_identifier("property name")
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>, JsError> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        if !self.check(&TokenKind::RParen) {
            loop {
                args.push(self.parse_assignment(false)?);
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, JsError> {
        match &self.current.kind {
            TokenKind::This => {
                self.advance()?;
                Ok(Expression::This)
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.advance()?;
                Ok(Expression::Identifier(name))
            }
            TokenKind::Number(n) => {
                let n = *n;
                self.advance()?;
                Ok(Expression::Literal(LiteralValue::Number(n)))
            }
            TokenKind::String(s) => {
                let s = s.clone();
                self.advance()?;
                Ok(Expression::Literal(LiteralValue::String(s)))
            }
            TokenKind::True => {
                self.advance()?;
                Ok(Expression::Literal(LiteralValue::Boolean(true)))
            }
            TokenKind::False => {
                self.advance()?;
                Ok(Expression::Literal(LiteralValue::Boolean(false)))
            }
            TokenKind::Null => {
                self.advance()?;
                Ok(Expression::Literal(LiteralValue::Null))
            }
            TokenKind::Div | TokenKind::DivEq => {
                // A slash in expression position starts a regex literal;
                // re-lex from the already-consumed slash.
                let prev = self.current.kind.clone();
                let token = self.lexer.rescan_as_regex(&prev)?;
                let source = match &token.kind {
                    TokenKind::Regex(s) => s.clone(),
                    _ => return Err(self.error("malformed regular expression")),
                };
                self.current = token;
                self.advance()?;
                Ok(Expression::Regex { source })
            }
            TokenKind::LParen => {
                self.advance()?;
                let expr = self.parse_expression(false)?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Function => {
                let func = self.parse_function(false)?;
                Ok(Expression::Function(func))
            }
            TokenKind::Reserved(word) => Err(self.error(format!("'{}' is a reserved word", word))),
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_array_literal(&mut self) -> Result<Expression, JsError> {
        self.expect(&TokenKind::LBracket)?;
        let mut elements = Vec::new();
        loop {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            if self.eat(&TokenKind::Comma)? {
                elements.push(None);
                continue;
            }
            elements.push(Some(self.parse_assignment(false)?));
            if !self.check(&TokenKind::RBracket) {
                self.expect(&TokenKind::Comma)?;
            }
        }
        self.advance()?;
        Ok(Expression::Array { elements })
    }

    fn parse_object_literal(&mut self) -> Result<Expression, JsError> {
        self.expect(&TokenKind::LBrace)?;
        let mut properties = Vec::new();
        if !self.check(&TokenKind::RBrace) {
            loop {
                let name = match &self.current.kind {
                    TokenKind::Identifier(name) => {
                        let name = name.clone();
                        self.advance()?;
                        name
                    }
                    TokenKind::String(s) => {
                        let s = s.clone();
                        self.advance()?;
                        s
                    }
                    TokenKind::Number(n) => {
                        let s = JsString::from(value::number_to_string(*n).as_str());
                        self.advance()?;
                        s
                    }
                    _ => return Err(self.unexpected("property name")),
                };
                self.expect(&TokenKind::Colon)?;
                let value = self.parse_assignment(false)?;
                properties.push((name, value));
                if !self.eat(&TokenKind::Comma)? {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(Expression::Object { properties })
    }
}

enum BinKind {
    Binary(BinaryOp),
    Logical(LogicalOp),
}

// ============ CONSTANT FOLDING ============

/// Evaluate a constant, side-effect-free node at parse time, replacing it
/// with a literal. Anything that could observe the environment or an
/// object is left alone.
fn fold(expr: Expression) -> Expression {
    if !expr.is_const() {
        return expr;
    }
    match eval_const(&expr) {
        Some(lit) => Expression::Literal(lit),
        None => expr,
    }
}

fn eval_const(expr: &Expression) -> Option<LiteralValue> {
    match expr {
        Expression::Literal(lit) => Some(lit.clone()),
        Expression::Unary { op, operand } => {
            let v = eval_const(operand)?;
            match op {
                UnaryOp::Void => Some(LiteralValue::Undefined),
                UnaryOp::Not => Some(LiteralValue::Boolean(!lit_to_boolean(&v))),
                UnaryOp::Plus => Some(LiteralValue::Number(lit_to_number(&v))),
                UnaryOp::Minus => Some(LiteralValue::Number(-lit_to_number(&v))),
                UnaryOp::BitNot => Some(LiteralValue::Number(f64::from(
                    !value::to_int32(lit_to_number(&v)),
                ))),
                UnaryOp::Delete | UnaryOp::TypeOf => None,
            }
        }
        Expression::Binary { op, left, right } => {
            let l = eval_const(left)?;
            let r = eval_const(right)?;
            eval_const_binary(*op, &l, &r)
        }
        Expression::Logical { op, left, right } => {
            let l = eval_const(left)?;
            let take_right = match op {
                LogicalOp::And => lit_to_boolean(&l),
                LogicalOp::Or => !lit_to_boolean(&l),
            };
            if take_right {
                eval_const(right)
            } else {
                Some(l)
            }
        }
        Expression::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let t = eval_const(test)?;
            if lit_to_boolean(&t) {
                eval_const(consequent)
            } else {
                eval_const(alternate)
            }
        }
        Expression::Comma { right, .. } => eval_const(right),
        _ => None,
    }
}

fn eval_const_binary(op: BinaryOp, l: &LiteralValue, r: &LiteralValue) -> Option<LiteralValue> {
    use BinaryOp::*;
    let num = |n: f64| Some(LiteralValue::Number(n));
    match op {
        Add => {
            if l.is_string() || r.is_string() {
                let a = lit_to_string(l);
                let b = lit_to_string(r);
                Some(LiteralValue::String(value::concat_strings(&a, &b)))
            } else {
                num(lit_to_number(l) + lit_to_number(r))
            }
        }
        Sub => num(lit_to_number(l) - lit_to_number(r)),
        Mul => num(lit_to_number(l) * lit_to_number(r)),
        Div => num(lit_to_number(l) / lit_to_number(r)),
        Mod => num(lit_to_number(l) % lit_to_number(r)),
        LShift => num(f64::from(
            value::to_int32(lit_to_number(l)) << (value::to_uint32(lit_to_number(r)) & 0x1f),
        )),
        RShift => num(f64::from(
            value::to_int32(lit_to_number(l)) >> (value::to_uint32(lit_to_number(r)) & 0x1f),
        )),
        URShift => num(f64::from(
            value::to_uint32(lit_to_number(l)) >> (value::to_uint32(lit_to_number(r)) & 0x1f),
        )),
        BitAnd => num(f64::from(
            value::to_int32(lit_to_number(l)) & value::to_int32(lit_to_number(r)),
        )),
        BitXor => num(f64::from(
            value::to_int32(lit_to_number(l)) ^ value::to_int32(lit_to_number(r)),
        )),
        BitOr => num(f64::from(
            value::to_int32(lit_to_number(l)) | value::to_int32(lit_to_number(r)),
        )),
        Lt => lit_relational(l, r, false).map(LiteralValue::Boolean),
        Gt => lit_relational(r, l, false).map(LiteralValue::Boolean),
        LtEq => lit_relational(r, l, true).map(LiteralValue::Boolean),
        GtEq => lit_relational(l, r, true).map(LiteralValue::Boolean),
        Eq => Some(LiteralValue::Boolean(lit_abstract_eq(l, r)?)),
        NotEq => Some(LiteralValue::Boolean(!lit_abstract_eq(l, r)?)),
        StrictEq => Some(LiteralValue::Boolean(lit_strict_eq(l, r))),
        StrictNotEq => Some(LiteralValue::Boolean(!lit_strict_eq(l, r))),
        InstanceOf | In => None,
    }
}

fn lit_to_boolean(v: &LiteralValue) -> bool {
    match v {
        LiteralValue::Undefined | LiteralValue::Null => false,
        LiteralValue::Boolean(b) => *b,
        LiteralValue::Number(n) => *n != 0.0 && !n.is_nan(),
        LiteralValue::String(s) => !s.is_empty(),
    }
}

fn lit_to_number(v: &LiteralValue) -> f64 {
    match v {
        LiteralValue::Undefined => f64::NAN,
        LiteralValue::Null => 0.0,
        LiteralValue::Boolean(b) => f64::from(*b),
        LiteralValue::Number(n) => *n,
        LiteralValue::String(s) => value::string_to_number(s, false),
    }
}

fn lit_to_string(v: &LiteralValue) -> JsString {
    match v {
        LiteralValue::Undefined => JsString::from_static("undefined"),
        LiteralValue::Null => JsString::from_static("null"),
        LiteralValue::Boolean(true) => JsString::from_static("true"),
        LiteralValue::Boolean(false) => JsString::from_static("false"),
        LiteralValue::Number(n) => JsString::from(value::number_to_string(*n).as_str()),
        LiteralValue::String(s) => s.clone(),
    }
}

/// `l < r`; `negate` computes the complement (for `<=`/`>=`, which are
/// `!(r < l)` unless a NaN forces false).
fn lit_relational(l: &LiteralValue, r: &LiteralValue, negate: bool) -> Option<bool> {
    let result = if let (LiteralValue::String(a), LiteralValue::String(b)) = (l, r) {
        Some(a < b)
    } else {
        let a = lit_to_number(l);
        let b = lit_to_number(r);
        if a.is_nan() || b.is_nan() {
            None
        } else {
            Some(a < b)
        }
    };
    match (result, negate) {
        (Some(b), false) => Some(b),
        (Some(b), true) => Some(!b),
        (None, _) => Some(false),
    }
}

fn lit_strict_eq(l: &LiteralValue, r: &LiteralValue) -> bool {
    match (l, r) {
        (LiteralValue::Undefined, LiteralValue::Undefined) => true,
        (LiteralValue::Null, LiteralValue::Null) => true,
        (LiteralValue::Boolean(a), LiteralValue::Boolean(b)) => a == b,
        (LiteralValue::Number(a), LiteralValue::Number(b)) => a == b,
        (LiteralValue::String(a), LiteralValue::String(b)) => a == b,
        _ => false,
    }
}

fn lit_abstract_eq(l: &LiteralValue, r: &LiteralValue) -> Option<bool> {
    use LiteralValue::*;
    match (l, r) {
        (Undefined | Null, Undefined | Null) => Some(true),
        (Number(a), Number(b)) => Some(a == b),
        (String(a), String(b)) => Some(a == b),
        (Boolean(a), Boolean(b)) => Some(a == b),
        (Number(a), String(s)) | (String(s), Number(a)) => {
            Some(*a == value::string_to_number(s, false))
        }
        (Boolean(_), _) => lit_abstract_eq(&Number(lit_to_number(l)), r),
        (_, Boolean(_)) => lit_abstract_eq(l, &Number(lit_to_number(r))),
        _ => Some(false),
    }
}
