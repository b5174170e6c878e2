//! Read and unfold physical lines into logical content lines.
//!
//! A physical line starting with a space or a horizontal tab continues the
//! previous one: the line break and that single whitespace character are
//! removed. Unfolding happens on bytes, because a producer may fold in the
//! middle of a multi-octet UTF-8 sequence; each logical line is decoded only
//! after it has been reassembled.
//!
//! Both CRLF and bare LF line endings are accepted. Empty lines are skipped.

use std::borrow::Cow;
use std::fmt;

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LineError {
    #[error("Line {0}: invalid UTF-8 after unfolding.")]
    InvalidUtf8(usize),
    #[error("Line {0}: unexpected control character.")]
    ControlCharacter(usize),
}

impl LineError {
    /// Invalid UTF-8 means the input is not text. A control character only
    /// spoils the line it is on.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvalidUtf8(_))
    }
}

/// A logical (unfolded) line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'a> {
    pub inner: Cow<'a, str>,
    number: usize,
}

impl<'a> Line<'a> {
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Number of the first physical line, starting at 1.
    #[inline]
    pub fn number(&self) -> usize {
        self.number
    }
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.number, self.inner)
    }
}

pub struct LineReader<'a> {
    input: &'a [u8],
    pos: usize,
    physical_line: usize,
}

impl<'a> LineReader<'a> {
    pub fn from_slice(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            physical_line: 0,
        }
    }

    /// Number of the last physical line consumed.
    pub fn physical_line(&self) -> usize {
        self.physical_line
    }

    fn next_physical(&mut self) -> Option<&'a [u8]> {
        if self.pos >= self.input.len() {
            return None;
        }
        let rest = &self.input[self.pos..];
        let (line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;
        self.physical_line += 1;
        Some(line.strip_suffix(b"\r").unwrap_or(line))
    }

    fn peek_is_continuation(&self) -> bool {
        matches!(self.input.get(self.pos), Some(b' ' | b'\t'))
    }
}

impl<'a> Iterator for LineReader<'a> {
    type Item = Result<Line<'a>, LineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = loop {
            let line = self.next_physical()?;
            if !line.is_empty() {
                break line;
            }
        };
        let number = self.physical_line;

        let bytes: Cow<'a, [u8]> = if self.peek_is_continuation() {
            let mut owned = first.to_vec();
            while self.peek_is_continuation() {
                if let Some(continuation) = self.next_physical() {
                    owned.extend_from_slice(&continuation[1..]);
                }
            }
            Cow::Owned(owned)
        } else {
            Cow::Borrowed(first)
        };

        if bytes.iter().any(|&b| b < 0x20 && b != b'\t') || bytes.contains(&0x7f) {
            return Some(Err(LineError::ControlCharacter(number)));
        }

        let inner = match bytes {
            Cow::Borrowed(bytes) => std::str::from_utf8(bytes).map(Cow::Borrowed),
            Cow::Owned(bytes) => String::from_utf8(bytes)
                .map(Cow::Owned)
                .map_err(|err| err.utf8_error()),
        };
        Some(
            inner
                .map(|inner| Line { inner, number })
                .map_err(|_| LineError::InvalidUtf8(number)),
        )
    }
}
