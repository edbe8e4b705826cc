//! Compatibility flags.
//!
//! Hosts opt into deviations from strict ECMA-262 3rd-edition behavior
//! through this flag set, either programmatically or via the textual
//! encoding understood by host tooling (see [`Compat::parse`]).

use std::fmt;

/// Netscape JavaScript version tiers. Selecting a tier loosens reserved
/// word handling and related legacy behaviors to match that engine line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum JsVersion {
    Js11,
    Js12,
    Js13,
    Js14,
    Js15,
}

impl JsVersion {
    fn name(self) -> &'static str {
        match self {
            JsVersion::Js11 => "js11",
            JsVersion::Js12 => "js12",
            JsVersion::Js13 => "js13",
            JsVersion::Js14 => "js14",
            JsVersion::Js15 => "js15",
        }
    }
}

/// The compatibility flag set carried by every interpreter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Compat {
    /// Treat `<!--` as a line comment opener.
    pub sgml_comments: bool,
    /// Pass invalid UTF-8 input through as a sentinel character instead of
    /// rejecting it.
    pub utf_unsafe: bool,
    /// ECMA-262 3rd edition Annex B features.
    pub annex_262_3b: bool,
    /// Extension set 1: bare `\x`/`\u` escapes, leading-zero octal
    /// integers, relaxed hex in ToNumber, eval with receiver-supplied
    /// context.
    pub ext1: bool,
    /// Reading an unresolvable reference yields `undefined` instead of
    /// raising ReferenceError.
    pub undefdef: bool,
    /// Netscape JavaScript version tier, when emulating one.
    pub js_version: Option<JsVersion>,
}

impl Compat {
    /// Strict ECMA-262 behavior: every flag off.
    pub fn strict() -> Self {
        Compat::default()
    }

    /// Parse the textual encoding: whitespace-separated flag tokens, each
    /// optionally prefixed with `no_` to clear it; a leading `=` resets the
    /// whole set to zero first. Unknown tokens are an error.
    pub fn parse(s: &str) -> Result<Compat, String> {
        let mut flags = Compat::default();
        let mut rest = s.trim_start();
        if let Some(stripped) = rest.strip_prefix('=') {
            flags = Compat::default();
            rest = stripped;
        }
        for raw in rest.split_whitespace() {
            let (token, on) = match raw.strip_prefix("no_") {
                Some(t) => (t, false),
                None => (raw, true),
            };
            match token {
                "sgml_comments" => flags.sgml_comments = on,
                "utf_unsafe" => flags.utf_unsafe = on,
                "262_3b" => flags.annex_262_3b = on,
                "ext1" => flags.ext1 = on,
                "undefdef" => flags.undefdef = on,
                "js11" => flags.set_version(JsVersion::Js11, on),
                "js12" => flags.set_version(JsVersion::Js12, on),
                "js13" => flags.set_version(JsVersion::Js13, on),
                "js14" => flags.set_version(JsVersion::Js14, on),
                "js15" => flags.set_version(JsVersion::Js15, on),
                _ => return Err(format!("unknown compatibility flag '{}'", raw)),
            }
        }
        Ok(flags)
    }

    fn set_version(&mut self, version: JsVersion, on: bool) {
        if on {
            self.js_version = Some(version);
        } else if self.js_version == Some(version) {
            self.js_version = None;
        }
    }

    /// True when emulating JavaScript `version` or later.
    pub fn at_least(&self, version: JsVersion) -> bool {
        matches!(self.js_version, Some(v) if v >= version)
    }
}

impl fmt::Display for Compat {
    /// Render back to the textual encoding, set flags only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut sep = "";
        let mut put = |f: &mut fmt::Formatter<'_>, name: &str| -> fmt::Result {
            write!(f, "{}{}", sep, name)?;
            sep = " ";
            Ok(())
        };
        if self.sgml_comments {
            put(f, "sgml_comments")?;
        }
        if self.utf_unsafe {
            put(f, "utf_unsafe")?;
        }
        if self.annex_262_3b {
            put(f, "262_3b")?;
        }
        if self.ext1 {
            put(f, "ext1")?;
        }
        if self.undefdef {
            put(f, "undefdef")?;
        }
        if let Some(v) = self.js_version {
            put(f, v.name())?;
        }
        Ok(())
    }
}
