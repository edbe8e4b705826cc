//! String interning tables.
//!
//! Interning canonicalizes equal strings to one shared allocation: within a
//! table, two interned strings are equal iff they are pointer-equal. The
//! engine keeps one table per interpreter for script identifiers, plus a
//! process-wide table for names that hosts register before any interpreter
//! exists.

use std::sync::{Mutex, OnceLock};

use rustc_hash::FxHashMap;

use crate::string::JsString;

/// A dictionary canonicalizing `JsString` instances.
///
/// Strings inserted into the dictionary are stored once; later requests for
/// the same code-unit sequence return a cheap clone of the stored instance.
pub struct StringDict {
    /// Content → canonical instance. `Box<[u16]>` keys avoid a second
    /// indirection through the shared pointer.
    strings: FxHashMap<Box<[u16]>, JsString>,
}

impl StringDict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self {
            strings: FxHashMap::default(),
        }
    }

    /// Create a dictionary pre-populated with names the engine touches on
    /// nearly every evaluation.
    pub fn with_common_strings() -> Self {
        let mut dict = Self::new();
        for s in COMMON_STRINGS {
            dict.intern_str(s);
        }
        dict
    }

    /// Canonicalize a string, inserting it on first sight.
    pub fn intern(&mut self, s: &JsString) -> JsString {
        s.with_units(|units| {
            if let Some(existing) = self.strings.get(units) {
                return existing.clone();
            }
            let canonical = JsString::from_units(units.to_vec());
            self.strings.insert(units.into(), canonical.clone());
            canonical
        })
    }

    /// Canonicalize UTF-8 text.
    pub fn intern_str(&mut self, s: &str) -> JsString {
        let units: Vec<u16> = s.encode_utf16().collect();
        if let Some(existing) = self.strings.get(units.as_slice()) {
            return existing.clone();
        }
        let canonical = JsString::from_units(units.clone());
        self.strings
            .insert(units.into_boxed_slice(), canonical.clone());
        canonical
    }

    /// Look up without inserting.
    pub fn get(&self, s: &JsString) -> Option<JsString> {
        s.with_units(|units| self.strings.get(units).cloned())
    }

    /// Number of unique strings in the dictionary.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringDict {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL_DICT: OnceLock<Mutex<StringDict>> = OnceLock::new();

/// Intern into the process-wide table.
///
/// Interpreters seed their own table from this one at init, so strings a
/// host registers before creating interpreters stay canonical everywhere.
/// The mutex serializes the (rare, append-only) writes; behavior does not
/// otherwise depend on it.
pub fn intern_global(s: &str) -> JsString {
    let dict = GLOBAL_DICT.get_or_init(|| Mutex::new(StringDict::new()));
    dict.lock().expect("global intern table poisoned").intern_str(s)
}

/// Copy every process-global string into a per-interpreter dictionary.
pub(crate) fn seed_from_global(dict: &mut StringDict) {
    if let Some(global) = GLOBAL_DICT.get() {
        let global = global.lock().expect("global intern table poisoned");
        for canonical in global.strings.values() {
            dict.intern(canonical);
        }
    }
}

/// Names interned up front in every interpreter.
const COMMON_STRINGS: &[&str] = &[
    // property plumbing
    "length",
    "prototype",
    "constructor",
    "arguments",
    "callee",
    "message",
    "name",
    "value",
    "toString",
    "valueOf",
    // typeof results
    "undefined",
    "object",
    "boolean",
    "number",
    "string",
    "function",
    // built-in constructor names
    "Object",
    "Array",
    "Function",
    "String",
    "Number",
    "Boolean",
    "RegExp",
    "Error",
    "EvalError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "TypeError",
    "URIError",
    // literals the evaluator materializes
    "null",
    "true",
    "false",
    "NaN",
    "Infinity",
    "eval",
    "source",
    "global",
    "ignoreCase",
    "multiline",
    "lastIndex",
];
