//! Error types for the interpreter

use thiserror::Error;

use crate::string::JsString;
use crate::value::Value;

/// Source position carried by syntax errors, throw sites, and traceback
/// frames. Errors render it as the conventional `file:line: ` prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<JsString>,
    pub line: u32,
}

impl SourceLocation {
    pub fn new(file: Option<JsString>, line: u32) -> Self {
        Self { file, line }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file, self.line),
            None => write!(f, "<input>:{}", self.line),
        }
    }
}

/// How a traceback frame was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Call,
    Construct,
}

/// One frame of the call traceback attached to a throw.
#[derive(Debug, Clone)]
pub struct TracebackFrame {
    /// Where the call happened in the caller.
    pub call_location: SourceLocation,
    /// Name of the callee, when it has one.
    pub callee_name: Option<JsString>,
    pub call_kind: CallKind,
}

impl std::fmt::Display for TracebackFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = self
            .callee_name
            .as_ref()
            .map(|n| n.to_utf8_lossy())
            .unwrap_or_else(|| "<anonymous>".to_string());
        match self.call_kind {
            CallKind::Call => write!(f, "    at {} ({})", name, self.call_location),
            CallKind::Construct => write!(f, "    at new {} ({})", name, self.call_location),
        }
    }
}

/// A value thrown at runtime, together with everything the host needs to
/// report it: a pre-rendered message (the thrown value's `message`
/// coerced to string, or the value itself), the throw location, and the
/// captured call traceback, newest frame last.
#[derive(Debug)]
pub struct Thrown {
    pub value: Value,
    pub message: String,
    pub location: Option<SourceLocation>,
    pub traceback: Vec<TracebackFrame>,
}

impl std::fmt::Display for Thrown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}", loc, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        for frame in self.traceback.iter().rev() {
            write!(f, "\n{}", frame)?;
        }
        Ok(())
    }
}

/// Main error type for the interpreter.
#[derive(Debug, Error)]
pub enum JsError {
    /// Malformed source, raised by the lexer or the parser.
    #[error("SyntaxError: {location}: {message}")]
    Syntax {
        message: String,
        location: SourceLocation,
    },

    /// A script-level throw that reached the embedding API, carrying the
    /// thrown value and its traceback.
    #[error("{0}")]
    Thrown(Box<Thrown>),

    /// Engine invariant violation; never produced by well-formed scripts.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JsError {
    pub fn syntax(message: impl Into<String>, location: SourceLocation) -> Self {
        JsError::Syntax {
            message: message.into(),
            location,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        JsError::Internal(message.into())
    }

    pub fn thrown(
        value: Value,
        message: String,
        location: Option<SourceLocation>,
        traceback: Vec<TracebackFrame>,
    ) -> Self {
        JsError::Thrown(Box::new(Thrown {
            value,
            message,
            location,
            traceback,
        }))
    }

    /// The thrown value, when this error is a script throw.
    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            JsError::Thrown(t) => Some(&t.value),
            _ => None,
        }
    }
}
