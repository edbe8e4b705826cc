//! Bytecode instruction set and code chunk format.
//!
//! The machine is stack-based: a value stack holding values and
//! references, a block stack for scope/enumeration/try bookkeeping, a
//! completion register `C`, a location register `L`, and an enumeration
//! register reaching the innermost enumeration block.
//!
//! Stack-effect notation in the comments reads `pops | pushes`. Branch
//! operands are absolute instruction indices; table operands index the
//! chunk's literal, function, or location tables.
//!
//! `End(n)` finishes every open block down to depth `n - 1`, firing each
//! ended block's side effect (restore scope, free enumeration, convert a
//! try or finally). `End(0)` therefore ends the whole activation and
//! yields the `C` register.

use std::fmt;
use std::rc::Rc;

use crate::ast::{Function, LiteralValue};
use crate::error::SourceLocation;

/// Absolute instruction index.
pub type Addr = u32;

#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    // -------- operand-less --------
    /// ` | `
    Nop,
    /// `any | any any`
    Dup,
    /// `any | `
    Pop,
    /// `a b | b a`
    Exch,
    /// `a b c | c a b`
    Roll3,
    /// `val | ` -- raises the value as an exception
    Throw,
    /// `val | ` -- C := val
    SetC,
    /// ` | val` -- pushes C
    GetC,
    /// ` | obj` -- the context's `this`
    This,
    /// ` | obj` -- the Object constructor
    Object,
    /// ` | obj` -- the Array constructor
    Array,
    /// ` | obj` -- the RegExp constructor
    Regexp,
    /// `obj str | ref`
    Ref,
    /// `any | val` -- GetValue; may raise ReferenceError
    GetValue,
    /// `str | ref` -- scope-chain lookup
    Lookup,
    /// `ref val | ` -- PutValue; may raise ReferenceError
    PutValue,
    /// `str val | ` -- bind on the variable object with the context's
    /// variable attributes
    PutVar,
    /// `str | ref` -- reference rooted at the variable object
    Var,
    /// `any | bool`
    Delete,
    /// `any | str` -- "undefined" for an unresolved reference
    TypeOf,
    /// `val | obj` -- may raise TypeError
    ToObject,
    /// `val | num`
    ToNumber,
    /// `val | bool`
    ToBoolean,
    /// `val | str`
    ToString,
    /// `val | prim`
    ToPrimitive,
    /// `num | num`
    Neg,
    /// `val | num` -- bitwise complement via ToInt32
    Inv,
    /// `bool | bool`
    Not,
    /// `num num | num`
    Mul,
    /// `num num | num`
    Div,
    /// `num num | num`
    Mod,
    /// `prim prim | prim` -- string concatenation or numeric addition
    Add,
    /// `num num | num`
    Sub,
    /// `val val | num`
    LShift,
    /// `val val | num`
    RShift,
    /// `val val | num`
    URShift,
    /// `val val | bool`
    Lt,
    /// `val val | bool`
    Gt,
    /// `val val | bool`
    Le,
    /// `val val | bool`
    Ge,
    /// `val val | bool` -- may raise TypeError
    InstanceOf,
    /// `val val | bool` -- may raise TypeError
    In,
    /// `val val | bool`
    Eq,
    /// `val val | bool`
    Seq,
    /// `val val | num`
    BAnd,
    /// `val val | num`
    BXor,
    /// `val val | num`
    BOr,
    /// `obj | ` -- open an enumeration block over the popped object
    SEnum,
    /// `obj | ` -- prepend the popped object to the scope chain
    SWith,

    // -------- one integer operand --------
    /// `ctor arg0..argn-1 | obj`
    New(u16),
    /// `ref arg0..argn-1 | val` -- the reference base becomes `this`
    Call(u16),
    /// ` | ` -- finish blocks down to depth n-1; End(0) ends execution
    End(u16),

    // -------- one address operand --------
    /// unconditional branch
    BAlways(Addr),
    /// `bool | ` -- branch when true
    BTrue(Addr),
    /// ` | str?` -- push the next enumerated name and branch, or fall
    /// through when exhausted
    BEnum(Addr),
    /// `str | ` -- open a try block whose catch handler is at the address,
    /// binding the popped identifier on a shield object when it fires
    STryC(Addr),
    /// ` | ` -- open a try block whose finally handler is at the address
    STryF(Addr),

    // -------- one table-index operand --------
    /// ` | obj` -- instantiate a function in the current scope
    Func(u16),
    /// ` | val` -- push a deduplicated literal
    Literal(u16),
    /// ` | ` -- set the location register, fire the statement trace
    Loc(u16),
}

/// A compiled function body.
#[derive(Debug, Default)]
pub struct CodeChunk {
    pub instrs: Vec<Instr>,
    pub literals: Vec<LiteralValue>,
    pub functions: Vec<Rc<Function>>,
    pub locations: Vec<SourceLocation>,
}

impl CodeChunk {
    /// Human-readable listing, one instruction per line.
    pub fn disassemble(&self) -> String {
        use fmt::Write;
        let mut out = String::new();
        for (i, instr) in self.instrs.iter().enumerate() {
            let _ = write!(out, "{:4x}: ", i);
            match instr {
                Instr::New(n) => { let _ = writeln!(out, "NEW,{}", n); }
                Instr::Call(n) => { let _ = writeln!(out, "CALL,{}", n); }
                Instr::End(n) => { let _ = writeln!(out, "END,{}", n); }
                Instr::BAlways(a) => { let _ = writeln!(out, "B.ALWAYS,{:#x}", a); }
                Instr::BTrue(a) => { let _ = writeln!(out, "B.TRUE,{:#x}", a); }
                Instr::BEnum(a) => { let _ = writeln!(out, "B.ENUM,{:#x}", a); }
                Instr::STryC(a) => { let _ = writeln!(out, "S.TRYC,{:#x}", a); }
                Instr::STryF(a) => { let _ = writeln!(out, "S.TRYF,{:#x}", a); }
                Instr::Func(i) => { let _ = writeln!(out, "FUNC,{}", i); }
                Instr::Literal(i) => {
                    let _ = writeln!(out, "LITERAL,{} ; {}", i, self.literals[*i as usize]);
                }
                Instr::Loc(i) => {
                    let _ = writeln!(out, "LOC,{} ; {}", i, self.locations[*i as usize]);
                }
                other => { let _ = writeln!(out, "{}", op_name(other)); }
            }
        }
        out
    }
}

fn op_name(instr: &Instr) -> &'static str {
    match instr {
        Instr::Nop => "NOP",
        Instr::Dup => "DUP",
        Instr::Pop => "POP",
        Instr::Exch => "EXCH",
        Instr::Roll3 => "ROLL3",
        Instr::Throw => "THROW",
        Instr::SetC => "SETC",
        Instr::GetC => "GETC",
        Instr::This => "THIS",
        Instr::Object => "OBJECT",
        Instr::Array => "ARRAY",
        Instr::Regexp => "REGEXP",
        Instr::Ref => "REF",
        Instr::GetValue => "GETVALUE",
        Instr::Lookup => "LOOKUP",
        Instr::PutValue => "PUTVALUE",
        Instr::PutVar => "PUTVAR",
        Instr::Var => "VAR",
        Instr::Delete => "DELETE",
        Instr::TypeOf => "TYPEOF",
        Instr::ToObject => "TOOBJECT",
        Instr::ToNumber => "TONUMBER",
        Instr::ToBoolean => "TOBOOLEAN",
        Instr::ToString => "TOSTRING",
        Instr::ToPrimitive => "TOPRIMITIVE",
        Instr::Neg => "NEG",
        Instr::Inv => "INV",
        Instr::Not => "NOT",
        Instr::Mul => "MUL",
        Instr::Div => "DIV",
        Instr::Mod => "MOD",
        Instr::Add => "ADD",
        Instr::Sub => "SUB",
        Instr::LShift => "LSHIFT",
        Instr::RShift => "RSHIFT",
        Instr::URShift => "URSHIFT",
        Instr::Lt => "LT",
        Instr::Gt => "GT",
        Instr::Le => "LE",
        Instr::Ge => "GE",
        Instr::InstanceOf => "INSTANCEOF",
        Instr::In => "IN",
        Instr::Eq => "EQ",
        Instr::Seq => "SEQ",
        Instr::BAnd => "BAND",
        Instr::BXor => "BXOR",
        Instr::BOr => "BOR",
        Instr::SEnum => "S.ENUM",
        Instr::SWith => "S.WITH",
        _ => "?",
    }
}
