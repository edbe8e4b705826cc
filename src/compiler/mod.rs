//! AST to bytecode compiler.
//!
//! Single pass with branch patching. The generated code's observable
//! behavior is identical to the tree walker's; completion propagation is
//! compiled away into `End`/branch pairs, with the block stack handling
//! `with`, enumerations, and try clean-up.

pub mod code;

use std::rc::Rc;

use crate::ast::{
    BinaryOp, Expression, ForInLeft, ForInit, Function, LiteralValue, LogicalOp, Statement,
    TargetId, UnaryOp, UpdateOp, VarDecl,
};
use crate::error::SourceLocation;
use crate::string::JsString;

use self::code::{Addr, CodeChunk, Instr};

/// Fetch the cached chunk for a body, compiling on first use. The two
/// roles (program vs function body) differ only in the fall-off tail.
pub(crate) fn get_or_compile(func: &Rc<Function>, as_function: bool) -> Rc<CodeChunk> {
    let idx = usize::from(as_function);
    if let Some(chunk) = &func.code.borrow()[idx] {
        return chunk.clone();
    }
    let chunk = Rc::new(Compiler::compile(func, as_function));
    func.code.borrow_mut()[idx] = Some(chunk.clone());
    chunk
}

struct LoopCtx {
    target: TargetId,
    /// `End` argument for a `break` out of this statement.
    break_end: u16,
    /// `End` argument for `continue`, None when not continuable.
    continue_end: Option<u16>,
    break_patches: Vec<usize>,
    continue_patches: Vec<usize>,
}

struct Compiler {
    chunk: CodeChunk,
    filename: Option<JsString>,
    loops: Vec<LoopCtx>,
    /// Open block depth (enumeration / with / try blocks).
    depth: u16,
}

impl Compiler {
    fn compile(func: &Rc<Function>, as_function: bool) -> CodeChunk {
        let mut c = Compiler {
            chunk: CodeChunk::default(),
            filename: func.filename.clone(),
            loops: Vec::new(),
            depth: 0,
        };
        c.compile_stmt_list(&func.body.statements);
        if as_function {
            // Function fall-off yields undefined regardless of C.
            let undef = c.literal(LiteralValue::Undefined);
            c.emit(Instr::Literal(undef));
            c.emit(Instr::SetC);
        }
        c.emit(Instr::End(0));
        c.chunk
    }

    // ============ EMISSION ============

    fn emit(&mut self, instr: Instr) -> usize {
        self.chunk.instrs.push(instr);
        self.chunk.instrs.len() - 1
    }

    fn here(&self) -> Addr {
        self.chunk.instrs.len() as Addr
    }

    fn patch(&mut self, at: usize, addr: Addr) {
        match &mut self.chunk.instrs[at] {
            Instr::BAlways(a)
            | Instr::BTrue(a)
            | Instr::BEnum(a)
            | Instr::STryC(a)
            | Instr::STryF(a) => *a = addr,
            other => unreachable!("patching non-branch instruction {:?}", other),
        }
    }

    fn literal(&mut self, value: LiteralValue) -> u16 {
        // Deduplicate; numbers compare by bit pattern so 0 and -0 stay
        // distinct.
        let found = self.chunk.literals.iter().position(|l| match (l, &value) {
            (LiteralValue::Number(a), LiteralValue::Number(b)) => a.to_bits() == b.to_bits(),
            (a, b) => a == b,
        });
        match found {
            Some(i) => i as u16,
            None => {
                self.chunk.literals.push(value);
                (self.chunk.literals.len() - 1) as u16
            }
        }
    }

    fn string_literal(&mut self, s: &JsString) -> u16 {
        self.literal(LiteralValue::String(s.clone()))
    }

    fn function(&mut self, func: &Rc<Function>) -> u16 {
        self.chunk.functions.push(func.clone());
        (self.chunk.functions.len() - 1) as u16
    }

    fn loc(&mut self, line: u32) {
        let location = SourceLocation::new(self.filename.clone(), line);
        let idx = match self.chunk.locations.iter().position(|l| *l == location) {
            Some(i) => i as u16,
            None => {
                self.chunk.locations.push(location);
                (self.chunk.locations.len() - 1) as u16
            }
        };
        self.emit(Instr::Loc(idx));
    }

    fn find_loop(&mut self, target: TargetId) -> &mut LoopCtx {
        self.loops
            .iter_mut()
            .rev()
            .find(|c| c.target == target)
            .expect("parser resolved the target")
    }

    // ============ STATEMENTS ============

    fn compile_stmt_list(&mut self, body: &[Statement]) {
        for stmt in body {
            self.compile_stmt(stmt);
        }
    }

    fn compile_stmt(&mut self, stmt: &Statement) {
        match stmt {
            Statement::Block(body) => self.compile_stmt_list(body),

            Statement::Empty | Statement::FunctionDecl(_) => {}

            Statement::Var { decls, line } => {
                self.loc(*line);
                for decl in decls {
                    self.compile_var_init(decl);
                }
            }

            Statement::Expression { expr, line } => {
                self.loc(*line);
                self.compile_expr_value(expr);
                self.emit(Instr::SetC);
            }

            Statement::If {
                test,
                consequent,
                alternate,
                line,
            } => {
                self.loc(*line);
                self.compile_expr_value(test);
                self.emit(Instr::ToBoolean);
                let to_then = self.emit(Instr::BTrue(0));
                if let Some(alt) = alternate {
                    self.compile_stmt(alt);
                }
                let to_end = self.emit(Instr::BAlways(0));
                let then_addr = self.here();
                self.patch(to_then, then_addr);
                self.compile_stmt(consequent);
                let end_addr = self.here();
                self.patch(to_end, end_addr);
            }

            Statement::Do {
                body,
                test,
                target,
                line,
            } => {
                self.loc(*line);
                self.open_loop(*target, self.depth + 1, Some(self.depth + 1));
                let top = self.here();
                self.compile_stmt(body);
                let cont = self.here();
                self.compile_expr_value(test);
                self.emit(Instr::ToBoolean);
                self.emit(Instr::BTrue(top));
                let end = self.here();
                self.close_loop(end, Some(cont));
            }

            Statement::While {
                test,
                body,
                target,
                line,
            } => {
                self.open_loop(*target, self.depth + 1, Some(self.depth + 1));
                let top = self.here();
                self.loc(*line);
                self.compile_expr_value(test);
                self.emit(Instr::ToBoolean);
                self.emit(Instr::Not);
                let to_end = self.emit(Instr::BTrue(0));
                self.compile_stmt(body);
                self.emit(Instr::BAlways(top));
                let end = self.here();
                self.patch(to_end, end);
                self.close_loop(end, Some(top));
            }

            Statement::For {
                init,
                test,
                update,
                body,
                target,
                line,
            } => {
                self.loc(*line);
                match init {
                    Some(ForInit::Var(decls)) => {
                        for decl in decls {
                            self.compile_var_init(decl);
                        }
                    }
                    Some(ForInit::Expr(e)) => {
                        self.compile_expr_value(e);
                        self.emit(Instr::Pop);
                    }
                    None => {}
                }
                self.open_loop(*target, self.depth + 1, Some(self.depth + 1));
                let top = self.here();
                let to_end = match test {
                    Some(test) => {
                        self.compile_expr_value(test);
                        self.emit(Instr::ToBoolean);
                        self.emit(Instr::Not);
                        Some(self.emit(Instr::BTrue(0)))
                    }
                    None => None,
                };
                self.compile_stmt(body);
                let cont = self.here();
                if let Some(update) = update {
                    self.compile_expr_value(update);
                    self.emit(Instr::Pop);
                }
                self.emit(Instr::BAlways(top));
                let end = self.here();
                if let Some(at) = to_end {
                    self.patch(at, end);
                }
                self.close_loop(end, Some(cont));
            }

            Statement::ForIn {
                left,
                object,
                body,
                target,
                line,
            } => {
                self.loc(*line);
                if let ForInLeft::Var(decl) = left {
                    self.compile_var_init(decl);
                }
                self.compile_expr_value(object);
                self.emit(Instr::ToObject);
                self.emit(Instr::SEnum);
                self.depth += 1;
                // break ends the enumeration block; continue keeps it.
                self.open_loop(*target, self.depth, Some(self.depth + 1));

                let cont = self.here();
                let to_body = self.emit(Instr::BEnum(0));
                self.emit(Instr::End(self.depth));
                let to_end = self.emit(Instr::BAlways(0));

                let body_addr = self.here();
                self.patch(to_body, body_addr);
                // Stack: the enumerated name. Assign it through the loop
                // variable's reference.
                match left {
                    ForInLeft::Expr(e) => self.compile_expr(e),
                    ForInLeft::Var(decl) => {
                        let name = self.string_literal(&decl.name);
                        self.emit(Instr::Literal(name));
                        self.emit(Instr::Var);
                    }
                }
                self.emit(Instr::Exch);
                self.emit(Instr::PutValue);
                self.compile_stmt(body);
                self.emit(Instr::BAlways(cont));

                let end = self.here();
                self.patch(to_end, end);
                self.close_loop(end, Some(cont));
                self.depth -= 1;
            }

            Statement::Continue { target, line, .. } => {
                self.loc(*line);
                let end_arg = self
                    .find_loop(*target)
                    .continue_end
                    .expect("parser validated continue");
                self.emit(Instr::End(end_arg));
                let at = self.emit(Instr::BAlways(0));
                self.find_loop(*target).continue_patches.push(at);
            }

            Statement::Break { target, line, .. } => {
                self.loc(*line);
                let end_arg = self.find_loop(*target).break_end;
                self.emit(Instr::End(end_arg));
                let at = self.emit(Instr::BAlways(0));
                self.find_loop(*target).break_patches.push(at);
            }

            Statement::Return { value, line } => {
                self.loc(*line);
                match value {
                    Some(e) => self.compile_expr_value(e),
                    None => {
                        let undef = self.literal(LiteralValue::Undefined);
                        self.emit(Instr::Literal(undef));
                    }
                }
                self.emit(Instr::SetC);
                self.emit(Instr::End(0));
            }

            Statement::With { object, body, line } => {
                self.loc(*line);
                self.compile_expr_value(object);
                self.emit(Instr::ToObject);
                self.emit(Instr::SWith);
                self.depth += 1;
                self.compile_stmt(body);
                self.emit(Instr::End(self.depth));
                self.depth -= 1;
            }

            Statement::Labelled { body, target, .. } => {
                self.loops.push(LoopCtx {
                    target: *target,
                    break_end: self.depth + 1,
                    continue_end: None,
                    break_patches: Vec::new(),
                    continue_patches: Vec::new(),
                });
                self.compile_stmt(body);
                let end = self.here();
                let ctx = self.loops.pop().expect("pushed above");
                for at in ctx.break_patches {
                    self.patch(at, end);
                }
            }

            Statement::Switch {
                discriminant,
                cases,
                default,
                target,
                line,
            } => {
                self.loc(*line);
                self.compile_expr_value(discriminant);
                self.loops.push(LoopCtx {
                    target: *target,
                    break_end: self.depth + 1,
                    continue_end: None,
                    break_patches: Vec::new(),
                    continue_patches: Vec::new(),
                });

                // Tests in order; each match jumps to a stub that drops
                // the discriminant before entering the case body.
                let mut stub_patches = Vec::new();
                for case in cases {
                    if let Some(test) = &case.test {
                        self.emit(Instr::Dup);
                        self.compile_expr_value(test);
                        self.emit(Instr::Seq);
                        stub_patches.push(Some(self.emit(Instr::BTrue(0))));
                    } else {
                        stub_patches.push(None);
                    }
                }
                self.emit(Instr::Pop);
                let no_match = self.emit(Instr::BAlways(0));

                let mut body_patches = Vec::new();
                for patch_at in &stub_patches {
                    if let Some(at) = patch_at {
                        let stub = self.here();
                        self.patch(*at, stub);
                        self.emit(Instr::Pop);
                        body_patches.push(Some(self.emit(Instr::BAlways(0))));
                    } else {
                        body_patches.push(None);
                    }
                }

                let mut default_addr = None;
                for (i, case) in cases.iter().enumerate() {
                    let addr = self.here();
                    if let Some(at) = body_patches[i] {
                        self.patch(at, addr);
                    }
                    if Some(i) == *default {
                        default_addr = Some(addr);
                    }
                    self.compile_stmt_list(&case.body);
                }

                let end = self.here();
                self.patch(no_match, default_addr.unwrap_or(end));
                let ctx = self.loops.pop().expect("pushed above");
                for at in ctx.break_patches {
                    self.patch(at, end);
                }
            }

            Statement::Throw { value, line } => {
                self.loc(*line);
                self.compile_expr_value(value);
                self.emit(Instr::Throw);
            }

            Statement::Try {
                block,
                catch,
                finally,
                line,
            } => {
                self.loc(*line);
                match (catch, finally) {
                    (Some(clause), None) => {
                        let name = self.string_literal(&clause.param);
                        self.emit(Instr::Literal(name));
                        let tryc = self.emit(Instr::STryC(0));
                        self.depth += 1;
                        self.compile_stmt_list(block);
                        self.emit(Instr::End(self.depth));
                        let to_end = self.emit(Instr::BAlways(0));
                        let catch_addr = self.here();
                        self.patch(tryc, catch_addr);
                        self.compile_stmt_list(&clause.body);
                        self.emit(Instr::End(self.depth));
                        self.depth -= 1;
                        let end = self.here();
                        self.patch(to_end, end);
                    }
                    (None, Some(fin)) => {
                        let tryf = self.emit(Instr::STryF(0));
                        self.depth += 1;
                        self.compile_stmt_list(block);
                        self.emit(Instr::End(self.depth));
                        let to_end = self.emit(Instr::BAlways(0));
                        let fin_addr = self.here();
                        self.patch(tryf, fin_addr);
                        self.compile_stmt_list(fin);
                        self.emit(Instr::End(self.depth));
                        self.depth -= 1;
                        let end = self.here();
                        self.patch(to_end, end);
                    }
                    (Some(clause), Some(fin)) => {
                        let tryf = self.emit(Instr::STryF(0));
                        self.depth += 1;
                        let name = self.string_literal(&clause.param);
                        self.emit(Instr::Literal(name));
                        let tryc = self.emit(Instr::STryC(0));
                        self.depth += 1;
                        self.compile_stmt_list(block);
                        self.emit(Instr::End(self.depth));
                        let join = self.emit(Instr::BAlways(0));
                        let catch_addr = self.here();
                        self.patch(tryc, catch_addr);
                        self.compile_stmt_list(&clause.body);
                        self.emit(Instr::End(self.depth));
                        self.depth -= 1;
                        let join_addr = self.here();
                        self.patch(join, join_addr);
                        self.emit(Instr::End(self.depth));
                        let to_end = self.emit(Instr::BAlways(0));
                        let fin_addr = self.here();
                        self.patch(tryf, fin_addr);
                        self.compile_stmt_list(fin);
                        self.emit(Instr::End(self.depth));
                        self.depth -= 1;
                        let end = self.here();
                        self.patch(to_end, end);
                    }
                    (None, None) => unreachable!("parser requires catch or finally"),
                }
            }
        }
    }

    fn open_loop(&mut self, target: TargetId, break_end: u16, continue_end: Option<u16>) {
        self.loops.push(LoopCtx {
            target,
            break_end,
            continue_end,
            break_patches: Vec::new(),
            continue_patches: Vec::new(),
        });
    }

    fn close_loop(&mut self, break_addr: Addr, continue_addr: Option<Addr>) {
        let ctx = self.loops.pop().expect("opened by the loop");
        for at in ctx.break_patches {
            self.patch(at, break_addr);
        }
        for at in ctx.continue_patches {
            self.patch(at, continue_addr.expect("continuable loop"));
        }
    }

    fn compile_var_init(&mut self, decl: &VarDecl) {
        if let Some(init) = &decl.init {
            let name = self.string_literal(&decl.name);
            self.emit(Instr::Literal(name));
            self.emit(Instr::Var);
            self.compile_expr_value(init);
            self.emit(Instr::PutValue);
        }
    }

    // ============ EXPRESSIONS ============

    /// Compile an expression, leaving its value (never a reference).
    fn compile_expr_value(&mut self, expr: &Expression) {
        self.compile_expr(expr);
        if produces_reference(expr) {
            self.emit(Instr::GetValue);
        }
    }

    /// Compile an expression, leaving a reference for the reference-
    /// producing forms and a value otherwise.
    fn compile_expr(&mut self, expr: &Expression) {
        match expr {
            Expression::Literal(lit) => {
                let idx = self.literal(lit.clone());
                self.emit(Instr::Literal(idx));
            }

            Expression::Regex { source } => {
                let (pattern, flags) = crate::interpreter::eval::split_regex_source(source);
                self.emit(Instr::Regexp);
                let p = self.literal(LiteralValue::String(pattern));
                self.emit(Instr::Literal(p));
                let f = self.literal(LiteralValue::String(flags));
                self.emit(Instr::Literal(f));
                self.emit(Instr::New(2));
            }

            Expression::This => {
                self.emit(Instr::This);
            }

            Expression::Identifier(name) => {
                let idx = self.string_literal(name);
                self.emit(Instr::Literal(idx));
                self.emit(Instr::Lookup);
            }

            Expression::Array { elements } => {
                self.emit(Instr::Array);
                self.emit(Instr::New(0));
                for (i, element) in elements.iter().enumerate() {
                    if let Some(e) = element {
                        self.emit(Instr::Dup);
                        let name = self.literal(LiteralValue::String(JsString::from(
                            i.to_string().as_str(),
                        )));
                        self.emit(Instr::Literal(name));
                        self.emit(Instr::Ref);
                        self.compile_expr_value(e);
                        self.emit(Instr::PutValue);
                    }
                }
                // Trailing elisions still extend length.
                if matches!(elements.last(), Some(None)) {
                    self.emit(Instr::Dup);
                    let name = self.string_literal(&JsString::from_static("length"));
                    self.emit(Instr::Literal(name));
                    self.emit(Instr::Ref);
                    let len = self.literal(LiteralValue::Number(elements.len() as f64));
                    self.emit(Instr::Literal(len));
                    self.emit(Instr::PutValue);
                }
            }

            Expression::Object { properties } => {
                self.emit(Instr::Object);
                self.emit(Instr::New(0));
                for (name, e) in properties {
                    self.emit(Instr::Dup);
                    let idx = self.string_literal(name);
                    self.emit(Instr::Literal(idx));
                    self.emit(Instr::Ref);
                    self.compile_expr_value(e);
                    self.emit(Instr::PutValue);
                }
            }

            Expression::Function(func) => {
                let idx = self.function(func);
                self.emit(Instr::Func(idx));
            }

            Expression::Member { object, property } => {
                self.compile_expr_value(object);
                self.emit(Instr::ToObject);
                let idx = self.string_literal(property);
                self.emit(Instr::Literal(idx));
                self.emit(Instr::Ref);
            }

            Expression::Index { object, index } => {
                self.compile_expr_value(object);
                self.emit(Instr::ToObject);
                self.compile_expr_value(index);
                self.emit(Instr::ToString);
                self.emit(Instr::Ref);
            }

            Expression::New { callee, arguments } => {
                self.compile_expr_value(callee);
                for a in arguments {
                    self.compile_expr_value(a);
                }
                self.emit(Instr::New(arguments.len() as u16));
            }

            Expression::Call { callee, arguments } => {
                // Keep the reference: its base becomes `this`.
                self.compile_expr(callee);
                for a in arguments {
                    self.compile_expr_value(a);
                }
                self.emit(Instr::Call(arguments.len() as u16));
            }

            Expression::Postfix { op, operand } => {
                self.compile_expr(operand);
                self.emit(Instr::Dup);
                self.emit(Instr::GetValue);
                self.emit(Instr::ToNumber);
                self.emit(Instr::Dup);
                let one = self.literal(LiteralValue::Number(1.0));
                self.emit(Instr::Literal(one));
                self.emit(match op {
                    UpdateOp::Increment => Instr::Add,
                    UpdateOp::Decrement => Instr::Sub,
                });
                self.emit(Instr::Exch);
                self.emit(Instr::Roll3);
                self.emit(Instr::PutValue);
            }

            Expression::Prefix { op, operand } => {
                self.compile_expr(operand);
                self.emit(Instr::Dup);
                self.emit(Instr::GetValue);
                self.emit(Instr::ToNumber);
                let one = self.literal(LiteralValue::Number(1.0));
                self.emit(Instr::Literal(one));
                self.emit(match op {
                    UpdateOp::Increment => Instr::Add,
                    UpdateOp::Decrement => Instr::Sub,
                });
                self.emit(Instr::Dup);
                self.emit(Instr::Roll3);
                self.emit(Instr::PutValue);
            }

            Expression::Unary { op, operand } => match op {
                UnaryOp::Delete => {
                    self.compile_expr(operand);
                    self.emit(Instr::Delete);
                }
                UnaryOp::Void => {
                    self.compile_expr_value(operand);
                    self.emit(Instr::Pop);
                    let undef = self.literal(LiteralValue::Undefined);
                    self.emit(Instr::Literal(undef));
                }
                UnaryOp::TypeOf => {
                    self.compile_expr(operand);
                    self.emit(Instr::TypeOf);
                }
                UnaryOp::Plus => {
                    self.compile_expr_value(operand);
                    self.emit(Instr::ToNumber);
                }
                UnaryOp::Minus => {
                    self.compile_expr_value(operand);
                    self.emit(Instr::ToNumber);
                    self.emit(Instr::Neg);
                }
                UnaryOp::BitNot => {
                    self.compile_expr_value(operand);
                    self.emit(Instr::Inv);
                }
                UnaryOp::Not => {
                    self.compile_expr_value(operand);
                    self.emit(Instr::ToBoolean);
                    self.emit(Instr::Not);
                }
            },

            Expression::Binary { op, left, right } => {
                self.compile_expr_value(left);
                self.compile_binary_lhs_conversion(*op);
                self.compile_expr_value(right);
                self.compile_binary_rhs_conversion(*op);
                self.emit_binary_op(*op);
            }

            Expression::Logical { op, left, right } => {
                self.compile_expr_value(left);
                self.emit(Instr::Dup);
                self.emit(Instr::ToBoolean);
                if matches!(op, LogicalOp::And) {
                    self.emit(Instr::Not);
                }
                let to_end = self.emit(Instr::BTrue(0));
                self.emit(Instr::Pop);
                self.compile_expr_value(right);
                let end = self.here();
                self.patch(to_end, end);
            }

            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.compile_expr_value(test);
                self.emit(Instr::ToBoolean);
                let to_then = self.emit(Instr::BTrue(0));
                self.compile_expr_value(alternate);
                let to_end = self.emit(Instr::BAlways(0));
                let then_addr = self.here();
                self.patch(to_then, then_addr);
                self.compile_expr_value(consequent);
                let end = self.here();
                self.patch(to_end, end);
            }

            Expression::Assign { op, target, value } => {
                self.compile_expr(target);
                match op {
                    None => {
                        self.compile_expr_value(value);
                    }
                    Some(op) => {
                        self.emit(Instr::Dup);
                        self.emit(Instr::GetValue);
                        self.compile_binary_lhs_conversion(*op);
                        self.compile_expr_value(value);
                        self.compile_binary_rhs_conversion(*op);
                        self.emit_binary_op(*op);
                    }
                }
                self.emit(Instr::Dup);
                self.emit(Instr::Roll3);
                self.emit(Instr::PutValue);
            }

            Expression::Comma { left, right } => {
                self.compile_expr_value(left);
                self.emit(Instr::Pop);
                self.compile_expr_value(right);
            }
        }
    }

    fn compile_binary_lhs_conversion(&mut self, op: BinaryOp) {
        match op {
            BinaryOp::Add => {
                self.emit(Instr::ToPrimitive);
            }
            BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                self.emit(Instr::ToNumber);
            }
            _ => {}
        }
    }

    fn compile_binary_rhs_conversion(&mut self, op: BinaryOp) {
        self.compile_binary_lhs_conversion(op);
    }

    fn emit_binary_op(&mut self, op: BinaryOp) {
        self.emit(binary_instr(op));
        if matches!(op, BinaryOp::NotEq | BinaryOp::StrictNotEq) {
            self.emit(Instr::Not);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Input;
    use crate::interpreter::Interpreter;

    fn compile_source(source: &str) -> Rc<CodeChunk> {
        let mut interp = Interpreter::new();
        let program = interp
            .parse_program(Input::from_string(source))
            .expect("parses cleanly");
        get_or_compile(&program, false)
    }

    #[test]
    fn chunks_are_cached_per_role() {
        let mut interp = Interpreter::new();
        let program = interp
            .parse_program(Input::from_string("x + 1;"))
            .expect("parses cleanly");
        let a = get_or_compile(&program, false);
        let b = get_or_compile(&program, false);
        assert!(Rc::ptr_eq(&a, &b));
        let as_fn = get_or_compile(&program, true);
        assert!(!Rc::ptr_eq(&a, &as_fn));
    }

    #[test]
    fn literals_deduplicate_but_signed_zero_stays_distinct() {
        let chunk = compile_source("var a = 1; var b = 1; var c = 'k'; var d = 'k';");
        let ones = chunk
            .literals
            .iter()
            .filter(|l| matches!(l, LiteralValue::Number(n) if *n == 1.0))
            .count();
        assert_eq!(ones, 1);

        let chunk = compile_source("var z; z = 0; z = -0;");
        let zeros = chunk
            .literals
            .iter()
            .filter(|l| matches!(l, LiteralValue::Number(n) if *n == 0.0))
            .count();
        assert_eq!(zeros, 2);
    }

    #[test]
    fn programs_end_with_end_zero() {
        let chunk = compile_source("1;");
        assert_eq!(chunk.instrs.last(), Some(&Instr::End(0)));
    }

    #[test]
    fn disassembly_lists_every_instruction() {
        let chunk = compile_source("for (var i = 0; i < 2; i++) { f(i); }");
        let listing = chunk.disassemble();
        assert_eq!(listing.lines().count(), chunk.instrs.len());
        assert!(listing.contains("LOOKUP"));
        assert!(listing.contains("CALL,1"));
        assert!(listing.contains("B.TRUE"));
    }

    #[test]
    fn try_finally_compiles_block_protocol() {
        let chunk = compile_source("try { 1 } finally { 2 }");
        assert!(chunk.instrs.iter().any(|i| matches!(i, Instr::STryF(_))));
        assert!(chunk.instrs.iter().any(|i| matches!(i, Instr::End(1))));
    }
}

fn produces_reference(expr: &Expression) -> bool {
    matches!(
        expr,
        Expression::Identifier(_) | Expression::Member { .. } | Expression::Index { .. }
    )
}

fn binary_instr(op: BinaryOp) -> Instr {
    match op {
        BinaryOp::Mul => Instr::Mul,
        BinaryOp::Div => Instr::Div,
        BinaryOp::Mod => Instr::Mod,
        BinaryOp::Add => Instr::Add,
        BinaryOp::Sub => Instr::Sub,
        BinaryOp::LShift => Instr::LShift,
        BinaryOp::RShift => Instr::RShift,
        BinaryOp::URShift => Instr::URShift,
        BinaryOp::Lt => Instr::Lt,
        BinaryOp::Gt => Instr::Gt,
        BinaryOp::LtEq => Instr::Le,
        BinaryOp::GtEq => Instr::Ge,
        BinaryOp::InstanceOf => Instr::InstanceOf,
        BinaryOp::In => Instr::In,
        BinaryOp::Eq => Instr::Eq,
        BinaryOp::NotEq => Instr::Eq, // negated below
        BinaryOp::StrictEq => Instr::Seq,
        BinaryOp::StrictNotEq => Instr::Seq,
        BinaryOp::BitAnd => Instr::BAnd,
        BinaryOp::BitXor => Instr::BXor,
        BinaryOp::BitOr => Instr::BOr,
    }
}
