//! Source input readers.
//!
//! The lexer consumes decoded code points through [`Input`], which layers a
//! fixed six-code-point lookahead window over a byte or string source.
//! Readers carry the file name and starting line number used in error
//! messages.

use std::fs;
use std::path::Path;

use crate::error::JsError;
use crate::string::JsString;

/// Sentinel substituted for undecodable input bytes.
pub const BAD_CHAR: char = '\u{FFFD}';

/// Maximum lookahead distance supported by [`Input::lookahead`].
pub const MAX_LOOKAHEAD: usize = 6;

enum Source {
    /// Pre-decoded characters (from a host `&str`).
    Chars(std::vec::IntoIter<char>),
    /// Raw bytes decoded incrementally as UTF-8.
    Utf8 { bytes: Vec<u8>, pos: usize },
}

/// A source reader with bounded lookahead.
pub struct Input {
    source: Source,
    /// Lookahead ring; `window[0..filled]` are the next code points.
    window: [char; MAX_LOOKAHEAD],
    filled: usize,
    eof: bool,
    /// The `utf_unsafe` compatibility knob, consulted by the lexer: with
    /// it set, [`BAD_CHAR`] sentinels pass through string literals.
    utf_unsafe: bool,
    filename: Option<JsString>,
    first_lineno: u32,
}

impl Input {
    /// Read from a host string.
    pub fn from_string(text: &str) -> Self {
        Input::new(Source::Chars(text.chars().collect::<Vec<_>>().into_iter()))
    }

    /// Read from raw bytes, decoding UTF-8 incrementally.
    pub fn from_utf8(bytes: Vec<u8>) -> Self {
        Input::new(Source::Utf8 { bytes, pos: 0 })
    }

    /// Read a file's contents.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, JsError> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .map_err(|e| JsError::internal(format!("cannot read {}: {}", path.display(), e)))?;
        let mut input = Input::from_utf8(bytes);
        input.filename = Some(JsString::from(path.to_string_lossy().as_ref()));
        Ok(input)
    }

    fn new(source: Source) -> Self {
        Input {
            source,
            window: [BAD_CHAR; MAX_LOOKAHEAD],
            filled: 0,
            eof: false,
            utf_unsafe: false,
            filename: None,
            first_lineno: 1,
        }
    }

    /// Attach a file name for diagnostics.
    pub fn with_filename(mut self, name: impl Into<JsString>) -> Self {
        self.filename = Some(name.into());
        self
    }

    /// Override the line number of the first line (for embedded fragments).
    pub fn with_first_lineno(mut self, lineno: u32) -> Self {
        self.first_lineno = lineno;
        self
    }

    /// Permit undecodable bytes, mapping them to [`BAD_CHAR`].
    pub fn with_utf_unsafe(mut self, on: bool) -> Self {
        self.utf_unsafe = on;
        self
    }

    pub fn filename(&self) -> Option<&JsString> {
        self.filename.as_ref()
    }

    pub fn utf_unsafe(&self) -> bool {
        self.utf_unsafe
    }

    pub fn first_lineno(&self) -> u32 {
        self.first_lineno
    }

    /// True once every code point has been consumed.
    pub fn eof(&mut self) -> bool {
        self.fill(1);
        self.filled == 0
    }

    /// Peek `dist` code points ahead (0 = the next code point). `dist` must
    /// be below [`MAX_LOOKAHEAD`].
    pub fn lookahead(&mut self, dist: usize) -> Option<char> {
        debug_assert!(dist < MAX_LOOKAHEAD);
        self.fill(dist + 1);
        if dist < self.filled {
            Some(self.window[dist])
        } else {
            None
        }
    }

    /// Consume and return the next code point.
    pub fn next(&mut self) -> Option<char> {
        self.fill(1);
        if self.filled == 0 {
            return None;
        }
        let c = self.window[0];
        self.window.copy_within(1..self.filled, 0);
        self.filled -= 1;
        Some(c)
    }

    fn fill(&mut self, want: usize) {
        while self.filled < want && !self.eof {
            match self.decode_next() {
                Some(c) => {
                    self.window[self.filled] = c;
                    self.filled += 1;
                }
                None => self.eof = true,
            }
        }
    }

    fn decode_next(&mut self) -> Option<char> {
        match &mut self.source {
            Source::Chars(iter) => iter.next(),
            Source::Utf8 { bytes, pos } => {
                if *pos >= bytes.len() {
                    return None;
                }
                match next_utf8(&bytes[*pos..]) {
                    Ok((c, width)) => {
                        *pos += width;
                        Some(c)
                    }
                    Err(width) => {
                        // Undecodable bytes never reach the lexer as
                        // garbage; the sentinel is rejected downstream
                        // unless utf_unsafe is set.
                        *pos += width;
                        Some(BAD_CHAR)
                    }
                }
            }
        }
    }
}

/// Decode one UTF-8 sequence. On error, returns the number of bytes to skip.
fn next_utf8(bytes: &[u8]) -> Result<(char, usize), usize> {
    let first = bytes[0];
    let width = match first {
        0x00..=0x7f => return Ok((first as char, 1)),
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        0xf0..=0xf7 => 4,
        _ => return Err(1),
    };
    if bytes.len() < width {
        return Err(bytes.len());
    }
    match std::str::from_utf8(&bytes[..width]) {
        Ok(s) => Ok((s.chars().next().expect("validated sequence"), width)),
        Err(_) => Err(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_reads() {
        let mut input = Input::from_string("abc");
        assert_eq!(input.next(), Some('a'));
        assert_eq!(input.next(), Some('b'));
        assert_eq!(input.next(), Some('c'));
        assert_eq!(input.next(), None);
        assert!(input.eof());
    }

    #[test]
    fn lookahead_does_not_consume() {
        let mut input = Input::from_string("abcdefg");
        assert_eq!(input.lookahead(0), Some('a'));
        assert_eq!(input.lookahead(5), Some('f'));
        assert_eq!(input.next(), Some('a'));
        assert_eq!(input.lookahead(0), Some('b'));
    }

    #[test]
    fn lookahead_past_end() {
        let mut input = Input::from_string("xy");
        assert_eq!(input.lookahead(5), None);
        assert_eq!(input.lookahead(1), Some('y'));
    }

    #[test]
    fn utf8_decoding() {
        let mut input = Input::from_utf8("h\u{e9}\u{1F600}".as_bytes().to_vec());
        assert_eq!(input.next(), Some('h'));
        assert_eq!(input.next(), Some('\u{e9}'));
        assert_eq!(input.next(), Some('\u{1F600}'));
        assert_eq!(input.next(), None);
    }

    #[test]
    fn invalid_utf8_becomes_sentinel() {
        let mut input = Input::from_utf8(vec![b'a', 0xff, b'b']);
        assert_eq!(input.next(), Some('a'));
        assert_eq!(input.next(), Some(BAD_CHAR));
        assert_eq!(input.next(), Some('b'));
    }

    #[test]
    fn filename_and_lineno_carried() {
        let mut input = Input::from_string("x").with_filename("script.js").with_first_lineno(10);
        assert_eq!(input.first_lineno(), 10);
        assert_eq!(input.filename().unwrap().to_utf8_lossy(), "script.js");
        let _ = input.next();
    }
}
