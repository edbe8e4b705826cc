//! Abstract syntax tree for the ECMA-262 3rd-edition grammar.
//!
//! Statements carry the source line they start on; the evaluator reports it
//! through the location register when tracing and throwing. `break` and
//! `continue` nodes are already resolved to the [`TargetId`] of their
//! enclosing statement by the parser, so the evaluator never searches by
//! label name.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::compiler::code::CodeChunk;
use crate::string::JsString;

/// Identity of a breakable/continuable statement, assigned at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetId(pub u32);

/// A parsed function: name, formal parameters, and body. The captured
/// scope lives on the function *instance*, not here; one parse may be
/// instantiated many times with different scopes.
#[derive(Debug)]
pub struct Function {
    pub name: Option<JsString>,
    pub params: Vec<JsString>,
    pub body: FunctionBody,
    /// File the function was parsed from, for the location register.
    pub filename: Option<JsString>,
    /// Bytecode cache, filled on first execution under the bytecode
    /// back-end and shared by every instance of this parse. Indexed by
    /// role: [as program, as function body]; the two differ in their
    /// fall-off completion.
    pub(crate) code: RefCell<[Option<Rc<CodeChunk>>; 2]>,
}

impl Function {
    pub fn new(name: Option<JsString>, params: Vec<JsString>, body: FunctionBody) -> Self {
        Function {
            name,
            params,
            body,
            filename: None,
            code: RefCell::new([None, None]),
        }
    }

    pub fn with_filename(mut self, filename: Option<JsString>) -> Self {
        self.filename = filename;
        self
    }
}

/// A program or function body with its hoisting information: the names
/// declared by `var` statements anywhere inside, and the function
/// declarations to instantiate on entry.
#[derive(Debug, Default)]
pub struct FunctionBody {
    pub statements: Vec<Statement>,
    pub vars: Vec<JsString>,
    pub funcdecls: Vec<Rc<Function>>,
}

// ============ STATEMENTS ============

#[derive(Debug)]
pub enum Statement {
    Block(Vec<Statement>),
    Var {
        decls: Vec<VarDecl>,
        line: u32,
    },
    Empty,
    Expression {
        expr: Expression,
        line: u32,
    },
    If {
        test: Expression,
        consequent: Box<Statement>,
        alternate: Option<Box<Statement>>,
        line: u32,
    },
    Do {
        body: Box<Statement>,
        test: Expression,
        target: TargetId,
        line: u32,
    },
    While {
        test: Expression,
        body: Box<Statement>,
        target: TargetId,
        line: u32,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expression>,
        update: Option<Expression>,
        body: Box<Statement>,
        target: TargetId,
        line: u32,
    },
    ForIn {
        left: ForInLeft,
        object: Expression,
        body: Box<Statement>,
        target: TargetId,
        line: u32,
    },
    Continue {
        /// Label as written, kept for printing; `target` is authoritative.
        label: Option<JsString>,
        target: TargetId,
        line: u32,
    },
    Break {
        label: Option<JsString>,
        target: TargetId,
        line: u32,
    },
    Return {
        value: Option<Expression>,
        line: u32,
    },
    With {
        object: Expression,
        body: Box<Statement>,
        line: u32,
    },
    Labelled {
        label: JsString,
        body: Box<Statement>,
        target: TargetId,
    },
    Switch {
        discriminant: Expression,
        cases: Vec<SwitchCase>,
        /// Index into `cases` of the `default:` clause.
        default: Option<usize>,
        target: TargetId,
        line: u32,
    },
    Throw {
        value: Expression,
        line: u32,
    },
    Try {
        block: Vec<Statement>,
        catch: Option<CatchClause>,
        finally: Option<Vec<Statement>>,
        line: u32,
    },
    /// Bound during hoisting; evaluates to nothing at its textual position.
    FunctionDecl(Rc<Function>),
}

#[derive(Debug)]
pub struct VarDecl {
    pub name: JsString,
    pub init: Option<Expression>,
}

#[derive(Debug)]
pub enum ForInit {
    Expr(Expression),
    Var(Vec<VarDecl>),
}

#[derive(Debug)]
pub enum ForInLeft {
    /// `for (lhs in o)`: any LeftHandSideExpression.
    Expr(Expression),
    /// `for (var x in o)`, with an optional initializer.
    Var(VarDecl),
}

#[derive(Debug)]
pub struct SwitchCase {
    /// None for the `default:` clause.
    pub test: Option<Expression>,
    pub body: Vec<Statement>,
}

#[derive(Debug)]
pub struct CatchClause {
    pub param: JsString,
    pub body: Vec<Statement>,
}

// ============ EXPRESSIONS ============

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(JsString),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Delete,
    Void,
    TypeOf,
    Plus,
    Minus,
    BitNot,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    LShift,
    RShift,
    URShift,
    Lt,
    Gt,
    LtEq,
    GtEq,
    InstanceOf,
    In,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    BitAnd,
    BitXor,
    BitOr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug)]
pub enum Expression {
    Literal(LiteralValue),
    Regex {
        /// `/pattern/flags` source text as lexed.
        source: JsString,
    },
    This,
    Identifier(JsString),
    Array {
        /// `None` entries are elisions.
        elements: Vec<Option<Expression>>,
    },
    Object {
        properties: Vec<(JsString, Expression)>,
    },
    Function(Rc<Function>),
    Member {
        object: Box<Expression>,
        property: JsString,
    },
    Index {
        object: Box<Expression>,
        index: Box<Expression>,
    },
    New {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Call {
        callee: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Postfix {
        op: UpdateOp,
        operand: Box<Expression>,
    },
    Prefix {
        op: UpdateOp,
        operand: Box<Expression>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    Conditional {
        test: Box<Expression>,
        consequent: Box<Expression>,
        alternate: Box<Expression>,
    },
    Assign {
        /// `None` for plain `=`; the compound operator otherwise.
        op: Option<BinaryOp>,
        target: Box<Expression>,
        value: Box<Expression>,
    },
    Comma {
        left: Box<Expression>,
        right: Box<Expression>,
    },
}

impl Expression {
    /// True when the node is constant and side-effect free, so the parser
    /// may evaluate it once and cache the result.
    pub fn is_const(&self) -> bool {
        match self {
            Expression::Literal(_) => true,
            Expression::Unary { op, operand } => match op {
                // delete and typeof observe the environment.
                UnaryOp::Delete | UnaryOp::TypeOf => false,
                _ => operand.is_const(),
            },
            Expression::Binary { op, left, right } => match op {
                // Both need an object on the right.
                BinaryOp::InstanceOf | BinaryOp::In => false,
                _ => left.is_const() && right.is_const(),
            },
            Expression::Logical { left, right, .. } => left.is_const() && right.is_const(),
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => test.is_const() && consequent.is_const() && alternate.is_const(),
            Expression::Comma { left, right } => left.is_const() && right.is_const(),
            _ => false,
        }
    }

    /// True when the grammar treats this node as a LeftHandSideExpression,
    /// i.e. an assignment operator may follow it.
    pub fn is_lhs(&self) -> bool {
        matches!(
            self,
            Expression::Identifier(_)
                | Expression::Member { .. }
                | Expression::Index { .. }
                | Expression::Call { .. }
                | Expression::New { .. }
        )
    }
}

// ============ PRINTER ============
//
// Prints a parseable rendition of the tree: expressions are fully
// parenthesized, statements keep their braces. Re-parsing the output yields
// a semantically equivalent program.

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Undefined => write!(f, "(void 0)"),
            LiteralValue::Null => write!(f, "null"),
            LiteralValue::Boolean(b) => write!(f, "{}", b),
            LiteralValue::Number(n) => {
                if n.is_nan() {
                    write!(f, "(0/0)")
                } else if n.is_infinite() {
                    write!(f, "({}1/0)", if *n < 0.0 { "-" } else { "" })
                } else if *n < 0.0 || n.is_sign_negative() {
                    write!(f, "(-{})", crate::value::number_to_string(-n))
                } else {
                    write!(f, "{}", crate::value::number_to_string(*n))
                }
            }
            LiteralValue::String(s) => print_quoted(f, s),
        }
    }
}

impl LiteralValue {
    pub fn is_string(&self) -> bool {
        matches!(self, LiteralValue::String(_))
    }
}

fn print_quoted(f: &mut fmt::Formatter<'_>, s: &JsString) -> fmt::Result {
    write!(f, "\"")?;
    s.with_units(|units| {
        for &u in units {
            match u {
                0x08 => write!(f, "\\b")?,
                0x09 => write!(f, "\\t")?,
                0x0a => write!(f, "\\n")?,
                0x0b => write!(f, "\\v")?,
                0x0c => write!(f, "\\f")?,
                0x0d => write!(f, "\\r")?,
                0x22 => write!(f, "\\\"")?,
                0x5c => write!(f, "\\\\")?,
                0x20..=0x7e => write!(f, "{}", (u as u8) as char)?,
                _ => write!(f, "\\u{:04x}", u)?,
            }
        }
        Ok(())
    })?;
    write!(f, "\"")
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::Regex { source } => write!(f, "{}", source),
            Expression::This => write!(f, "this"),
            Expression::Identifier(name) => write!(f, "{}", name),
            Expression::Array { elements } => {
                write!(f, "[")?;
                for (i, e) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    if let Some(e) = e {
                        write!(f, "{}", e)?;
                    }
                }
                // A trailing elision needs its comma kept.
                if matches!(elements.last(), Some(None)) {
                    write!(f, ",")?;
                }
                write!(f, "]")
            }
            Expression::Object { properties } => {
                write!(f, "{{")?;
                for (i, (name, value)) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    print_quoted(f, name)?;
                    write!(f, ": {}", value)?;
                }
                write!(f, "}}")
            }
            Expression::Function(func) => print_function(f, func),
            Expression::Member { object, property } => write!(f, "({}).{}", object, property),
            Expression::Index { object, index } => write!(f, "({})[{}]", object, index),
            Expression::New { callee, arguments } => {
                write!(f, "new ({})(", callee)?;
                print_args(f, arguments)?;
                write!(f, ")")
            }
            Expression::Call { callee, arguments } => {
                write!(f, "({})(", callee)?;
                print_args(f, arguments)?;
                write!(f, ")")
            }
            Expression::Postfix { op, operand } => write!(f, "({}){}", operand, update_op(*op)),
            Expression::Prefix { op, operand } => write!(f, "{}({})", update_op(*op), operand),
            Expression::Unary { op, operand } => {
                let sp = match op {
                    UnaryOp::Delete => "delete ",
                    UnaryOp::Void => "void ",
                    UnaryOp::TypeOf => "typeof ",
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                    UnaryOp::BitNot => "~",
                    UnaryOp::Not => "!",
                };
                write!(f, "{}({})", sp, operand)
            }
            Expression::Binary { op, left, right } => {
                write!(f, "({}) {} ({})", left, binary_op(*op), right)
            }
            Expression::Logical { op, left, right } => {
                let sp = match op {
                    LogicalOp::And => "&&",
                    LogicalOp::Or => "||",
                };
                write!(f, "({}) {} ({})", left, sp, right)
            }
            Expression::Conditional {
                test,
                consequent,
                alternate,
            } => write!(f, "({}) ? ({}) : ({})", test, consequent, alternate),
            Expression::Assign { op, target, value } => match op {
                None => write!(f, "({}) = ({})", target, value),
                Some(op) => write!(f, "({}) {}= ({})", target, binary_op(*op), value),
            },
            Expression::Comma { left, right } => write!(f, "({}), ({})", left, right),
        }
    }
}

fn update_op(op: UpdateOp) -> &'static str {
    match op {
        UpdateOp::Increment => "++",
        UpdateOp::Decrement => "--",
    }
}

fn binary_op(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Mod => "%",
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::LShift => "<<",
        BinaryOp::RShift => ">>",
        BinaryOp::URShift => ">>>",
        BinaryOp::Lt => "<",
        BinaryOp::Gt => ">",
        BinaryOp::LtEq => "<=",
        BinaryOp::GtEq => ">=",
        BinaryOp::InstanceOf => "instanceof",
        BinaryOp::In => "in",
        BinaryOp::Eq => "==",
        BinaryOp::NotEq => "!=",
        BinaryOp::StrictEq => "===",
        BinaryOp::StrictNotEq => "!==",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitXor => "^",
        BinaryOp::BitOr => "|",
    }
}

fn print_args(f: &mut fmt::Formatter<'_>, args: &[Expression]) -> fmt::Result {
    for (i, a) in args.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", a)?;
    }
    Ok(())
}

fn print_function(f: &mut fmt::Formatter<'_>, func: &Function) -> fmt::Result {
    write!(f, "function")?;
    if let Some(name) = &func.name {
        write!(f, " {}", name)?;
    }
    write!(f, "(")?;
    for (i, p) in func.params.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", p)?;
    }
    write!(f, ") {{ ")?;
    for stmt in &func.body.statements {
        write!(f, "{} ", stmt)?;
    }
    write!(f, "}}")
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Block(body) => {
                write!(f, "{{ ")?;
                for s in body {
                    write!(f, "{} ", s)?;
                }
                write!(f, "}}")
            }
            Statement::Var { decls, .. } => {
                write!(f, "var ")?;
                for (i, d) in decls.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", d.name)?;
                    if let Some(init) = &d.init {
                        write!(f, " = ({})", init)?;
                    }
                }
                write!(f, ";")
            }
            Statement::Empty => write!(f, ";"),
            Statement::Expression { expr, .. } => {
                // Parenthesized so object literals and function
                // expressions survive statement position.
                write!(f, "({});", expr)
            }
            Statement::If {
                test,
                consequent,
                alternate,
                ..
            } => {
                write!(f, "if ({}) {}", test, consequent)?;
                if let Some(alt) = alternate {
                    write!(f, " else {}", alt)?;
                }
                Ok(())
            }
            Statement::Do { body, test, .. } => write!(f, "do {} while ({});", body, test),
            Statement::While { test, body, .. } => write!(f, "while ({}) {}", test, body),
            Statement::For {
                init,
                test,
                update,
                body,
                ..
            } => {
                write!(f, "for (")?;
                match init {
                    Some(ForInit::Expr(e)) => write!(f, "{}", e)?,
                    Some(ForInit::Var(decls)) => {
                        write!(f, "var ")?;
                        for (i, d) in decls.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", d.name)?;
                            if let Some(init) = &d.init {
                                write!(f, " = ({})", init)?;
                            }
                        }
                    }
                    None => {}
                }
                write!(f, "; ")?;
                if let Some(test) = test {
                    write!(f, "{}", test)?;
                }
                write!(f, "; ")?;
                if let Some(update) = update {
                    write!(f, "{}", update)?;
                }
                write!(f, ") {}", body)
            }
            Statement::ForIn {
                left, object, body, ..
            } => {
                write!(f, "for (")?;
                match left {
                    ForInLeft::Expr(e) => write!(f, "{}", e)?,
                    ForInLeft::Var(d) => {
                        write!(f, "var {}", d.name)?;
                        if let Some(init) = &d.init {
                            write!(f, " = ({})", init)?;
                        }
                    }
                }
                write!(f, " in {}) {}", object, body)
            }
            Statement::Continue { label, .. } => match label {
                Some(l) => write!(f, "continue {};", l),
                None => write!(f, "continue;"),
            },
            Statement::Break { label, .. } => match label {
                Some(l) => write!(f, "break {};", l),
                None => write!(f, "break;"),
            },
            Statement::Return { value, .. } => match value {
                Some(v) => write!(f, "return ({});", v),
                None => write!(f, "return;"),
            },
            Statement::With { object, body, .. } => write!(f, "with ({}) {}", object, body),
            Statement::Labelled { label, body, .. } => write!(f, "{}: {}", label, body),
            Statement::Switch {
                discriminant,
                cases,
                ..
            } => {
                write!(f, "switch ({}) {{ ", discriminant)?;
                for case in cases {
                    match &case.test {
                        Some(test) => write!(f, "case ({}): ", test)?,
                        None => write!(f, "default: ")?,
                    }
                    for s in &case.body {
                        write!(f, "{} ", s)?;
                    }
                }
                write!(f, "}}")
            }
            Statement::Throw { value, .. } => write!(f, "throw ({});", value),
            Statement::Try {
                block,
                catch,
                finally,
                ..
            } => {
                write!(f, "try {{ ")?;
                for s in block {
                    write!(f, "{} ", s)?;
                }
                write!(f, "}}")?;
                if let Some(c) = catch {
                    write!(f, " catch ({}) {{ ", c.param)?;
                    for s in &c.body {
                        write!(f, "{} ", s)?;
                    }
                    write!(f, "}}")?;
                }
                if let Some(fin) = finally {
                    write!(f, " finally {{ ")?;
                    for s in fin {
                        write!(f, "{} ", s)?;
                    }
                    write!(f, "}}")?;
                }
                Ok(())
            }
            Statement::FunctionDecl(func) => print_function(f, func),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        print_function(f, self)
    }
}
