//! UTF-16 string representation
//!
//! ECMAScript strings are sequences of 16-bit code units. `JsString` is the
//! immutable, cheaply-clonable value type used everywhere in the engine;
//! `GrowableString` is the appendable builder used while scanning literals
//! and concatenating.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::JsError;

/// An immutable ECMAScript string: a shared sequence of UTF-16 code units.
///
/// Two flavors live behind this one type: heap strings shared through an
/// `Arc`, and static strings pointing at constant ASCII data. Cloning is
/// O(1) in both cases.
#[derive(Clone)]
pub struct JsString {
    repr: Repr,
}

#[derive(Clone)]
enum Repr {
    /// Shared heap allocation. `Arc` rather than `Rc` so interned strings
    /// can live in the process-wide table.
    Shared(Arc<[u16]>),
    /// Constant data, ASCII only. Never grown, never freed.
    Static(&'static str),
}

impl JsString {
    /// The empty string.
    pub fn empty() -> Self {
        JsString {
            repr: Repr::Static(""),
        }
    }

    /// Wrap constant ASCII data without allocating.
    pub const fn from_static(s: &'static str) -> Self {
        // Non-ASCII static data would make the byte/code-unit mapping wrong.
        JsString {
            repr: Repr::Static(s),
        }
    }

    /// Build from UTF-16 code units.
    pub fn from_units(units: Vec<u16>) -> Self {
        JsString {
            repr: Repr::Shared(units.into()),
        }
    }

    /// Number of UTF-16 code units.
    pub fn len(&self) -> usize {
        match &self.repr {
            Repr::Shared(u) => u.len(),
            Repr::Static(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The code unit at `index`, or None past the end.
    pub fn unit_at(&self, index: usize) -> Option<u16> {
        match &self.repr {
            Repr::Shared(u) => u.get(index).copied(),
            Repr::Static(s) => s.as_bytes().get(index).map(|&b| b as u16),
        }
    }

    /// Borrow the code units. Static strings are ASCII, so the borrow is
    /// materialized lazily through `units_vec` instead; callers that need a
    /// slice should go through [`JsString::with_units`].
    pub fn units_vec(&self) -> Vec<u16> {
        match &self.repr {
            Repr::Shared(u) => u.to_vec(),
            Repr::Static(s) => s.bytes().map(|b| b as u16).collect(),
        }
    }

    /// Run `f` over the code units without copying where possible.
    pub fn with_units<R>(&self, f: impl FnOnce(&[u16]) -> R) -> R {
        match &self.repr {
            Repr::Shared(u) => f(u),
            Repr::Static(s) => {
                let tmp: Vec<u16> = s.bytes().map(|b| b as u16).collect();
                f(&tmp)
            }
        }
    }

    /// Pointer identity: true iff both strings share one canonical
    /// allocation. This is the equality fast path the intern tables rely on.
    pub fn ptr_eq(&self, other: &JsString) -> bool {
        match (&self.repr, &other.repr) {
            (Repr::Shared(a), Repr::Shared(b)) => Arc::ptr_eq(a, b),
            (Repr::Static(a), Repr::Static(b)) => std::ptr::eq(a.as_ptr(), b.as_ptr()),
            _ => false,
        }
    }

    /// Concatenate, producing a new shared string.
    pub fn concat(&self, other: &JsString) -> JsString {
        let mut units = self.units_vec();
        units.extend(other.units_vec());
        JsString::from_units(units)
    }

    /// Extract a substring by code-unit range, clamped to the string.
    pub fn substring(&self, start: usize, end: usize) -> JsString {
        let len = self.len();
        let start = start.min(len);
        let end = end.clamp(start, len);
        self.with_units(|u| JsString::from_units(u[start..end].to_vec()))
    }

    /// Convert to UTF-8, combining surrogate pairs. A lone surrogate is an
    /// error: there is no well-formed UTF-8 for it.
    pub fn to_utf8(&self) -> Result<String, JsError> {
        self.with_units(|units| {
            let mut out = String::with_capacity(units.len());
            let mut iter = char::decode_utf16(units.iter().copied());
            for ch in &mut iter {
                match ch {
                    Ok(c) => out.push(c),
                    Err(e) => {
                        return Err(JsError::internal(format!(
                            "lone surrogate 0x{:04x} in string",
                            e.unpaired_surrogate()
                        )))
                    }
                }
            }
            Ok(out)
        })
    }

    /// Lossy UTF-8 conversion: lone surrogates become U+FFFD. Used for
    /// diagnostics, where failing would mask the original error.
    pub fn to_utf8_lossy(&self) -> String {
        self.with_units(|units| {
            char::decode_utf16(units.iter().copied())
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        })
    }

    /// Append this string's code units to a growable buffer.
    pub fn append_to(&self, buf: &mut GrowableString) {
        self.with_units(|u| buf.push_units(u));
    }
}

impl From<&str> for JsString {
    fn from(s: &str) -> Self {
        let units: Vec<u16> = s.encode_utf16().collect();
        JsString::from_units(units)
    }
}

impl From<String> for JsString {
    fn from(s: String) -> Self {
        JsString::from(s.as_str())
    }
}

impl From<char> for JsString {
    fn from(c: char) -> Self {
        let mut buf = [0u16; 2];
        JsString::from_units(c.encode_utf16(&mut buf).to_vec())
    }
}

impl PartialEq for JsString {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        self.with_units(|a| other.with_units(|b| a == b))
    }
}

impl Eq for JsString {}

impl PartialOrd for JsString {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for JsString {
    /// Code-unit lexicographic order, as the abstract relational comparison
    /// requires for string operands.
    fn cmp(&self, other: &Self) -> Ordering {
        self.with_units(|a| other.with_units(|b| a.cmp(b)))
    }
}

impl Hash for JsString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.with_units(|u| u.hash(state));
    }
}

impl fmt::Display for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_utf8_lossy())
    }
}

impl fmt::Debug for JsString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_utf8_lossy())
    }
}

/// An appendable UTF-16 buffer.
///
/// Capacity doubles, starting at 256 code units, so repeated single-unit
/// appends while scanning long literals stay amortized O(1).
pub struct GrowableString {
    units: Vec<u16>,
}

const INITIAL_CAPACITY: usize = 256;

impl GrowableString {
    pub fn new() -> Self {
        GrowableString { units: Vec::new() }
    }

    fn reserve_one(&mut self, extra: usize) {
        let needed = self.units.len() + extra;
        if needed > self.units.capacity() {
            let mut cap = self.units.capacity().max(INITIAL_CAPACITY);
            while cap < needed {
                cap *= 2;
            }
            self.units.reserve_exact(cap - self.units.len());
        }
    }

    /// Append a single code unit.
    pub fn push_unit(&mut self, unit: u16) {
        self.reserve_one(1);
        self.units.push(unit);
    }

    /// Append a Unicode scalar value, encoding astral code points as a
    /// surrogate pair.
    pub fn push_char(&mut self, c: char) {
        let mut buf = [0u16; 2];
        self.push_units(c.encode_utf16(&mut buf));
    }

    /// Append a code point that may exceed U+FFFF but is not required to be
    /// a valid scalar value (the lexer produces raw values from escapes).
    pub fn push_code_point(&mut self, cp: u32) {
        if cp < 0x10000 {
            self.push_unit(cp as u16);
        } else {
            let v = cp - 0x10000;
            self.push_unit(0xd800 | ((v >> 10) & 0x3ff) as u16);
            self.push_unit(0xdc00 | (v & 0x3ff) as u16);
        }
    }

    pub fn push_units(&mut self, units: &[u16]) {
        self.reserve_one(units.len());
        self.units.extend_from_slice(units);
    }

    pub fn push_ascii(&mut self, s: &str) {
        self.reserve_one(s.len());
        self.units.extend(s.bytes().map(|b| b as u16));
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn units(&self) -> &[u16] {
        &self.units
    }

    /// Freeze into an immutable `JsString`.
    pub fn finish(self) -> JsString {
        JsString::from_units(self.units)
    }
}

impl Default for GrowableString {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_round_trip() {
        let s = JsString::from("héllo wörld");
        assert_eq!(s.to_utf8().unwrap(), "héllo wörld");
    }

    #[test]
    fn surrogate_pairs_combine() {
        let s = JsString::from("a\u{1F600}b");
        assert_eq!(s.len(), 4); // a + surrogate pair + b
        assert_eq!(s.to_utf8().unwrap(), "a\u{1F600}b");
    }

    #[test]
    fn lone_surrogate_errors_on_output() {
        let s = JsString::from_units(vec![0xd800]);
        assert!(s.to_utf8().is_err());
        assert_eq!(s.to_utf8_lossy(), "\u{FFFD}");
    }

    #[test]
    fn static_and_shared_compare_equal() {
        let a = JsString::from_static("length");
        let b = JsString::from("length");
        assert_eq!(a, b);
        assert!(!a.ptr_eq(&b));
    }

    #[test]
    fn growable_doubles_from_initial() {
        let mut g = GrowableString::new();
        g.push_unit(b'x' as u16);
        assert!(g.units.capacity() >= INITIAL_CAPACITY);
        for _ in 0..INITIAL_CAPACITY {
            g.push_unit(b'y' as u16);
        }
        assert!(g.units.capacity() >= 2 * INITIAL_CAPACITY);
    }

    #[test]
    fn code_unit_ordering() {
        assert!(JsString::from("a") < JsString::from("b"));
        assert!(JsString::from("ab") < JsString::from("b"));
        assert!(JsString::from("a") < JsString::from("ab"));
    }
}
