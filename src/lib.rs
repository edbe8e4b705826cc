//! Embeddable ECMA-262 (3rd edition) interpreter.
//!
//! Parses source text, compiles it to an internal representation, and
//! executes it against a host-controlled environment. The language core
//! lives here: lexer, recursive-descent parser, value model and type
//! coercions, the object protocol, scope chains, completions and
//! exceptions, a tree-walking evaluator and an opt-in bytecode VM.
//! The full built-in library is the host's department; the core carries
//! just enough of `Object`, `Array`, `Function` and the error
//! constructors to be self-hosting.
//!
//! # Example
//!
//! ```
//! use es3run::Interpreter;
//!
//! let mut interp = Interpreter::new();
//! let result = interp.eval_str("1 + 2 * 3").unwrap();
//! assert_eq!(result.as_number(), Some(7.0));
//!
//! let s = interp.eval_str("'na' + 'n' === 'nan' ? 'yes' : 'no'").unwrap();
//! assert_eq!(s.to_string(), "yes");
//! ```

pub mod api;
pub mod ast;
pub mod compat;
pub mod compiler;
pub mod context;
pub mod error;
pub mod input;
pub mod interpreter;
pub mod lexer;
pub mod object;
pub mod parser;
pub mod string;
pub mod string_dict;
pub mod value;

pub use compat::{Compat, JsVersion};
pub use error::{CallKind, JsError, SourceLocation, TracebackFrame};
pub use input::Input;
pub use interpreter::{Backend, Interpreter, TraceEvent};
pub use object::{Attrs, JsObject, JsObjectRef, NativeFn};
pub use string::{GrowableString, JsString};
pub use string_dict::{intern_global, StringDict};
pub use value::{Completion, Operand, Reference, Value};
