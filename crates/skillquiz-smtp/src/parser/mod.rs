//! SMTP reply parser.
//!
//! SMTP replies can be single-line or multi-line:
//! - Single: `250 OK\r\n`
//! - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
//!
//! Every line of a reply carries the same three-digit code. Continuation
//! lines put `-` after the code, the last line puts a space (or nothing).

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// One parsed reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLine<'a> {
    /// Reply code on this line.
    pub code: ReplyCode,
    /// True if this line terminates the reply.
    pub is_last: bool,
    /// Text after the code and separator.
    pub text: &'a str,
}

/// Parses a single reply line with its line terminator already removed.
///
/// # Errors
///
/// Returns [`Error::Protocol`] if the line does not start with three digits
/// followed by a space, a hyphen, or nothing.
pub fn parse_reply_line(line: &str) -> Result<ReplyLine<'_>> {
    let bytes = line.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(Error::Protocol(format!("Invalid reply code in line: {line:?}")));
    }

    let code = bytes[..3]
        .iter()
        .fold(0u16, |acc, digit| acc * 10 + u16::from(digit - b'0'));

    let is_last = match bytes.get(3) {
        None | Some(b' ') => true,
        Some(b'-') => false,
        Some(_) => {
            return Err(Error::Protocol(format!(
                "Invalid reply separator in line: {line:?}"
            )));
        }
    };

    Ok(ReplyLine {
        code: ReplyCode::new(code),
        is_last,
        text: line.get(4..).unwrap_or(""),
    })
}

/// Most lines accepted in one reply.
pub const MAX_REPLY_LINES: usize = 512;

/// Accumulates reply lines until a complete reply has been seen.
#[derive(Debug, Default)]
pub struct ReplyAssembler {
    code: Option<ReplyCode>,
    lines: Vec<String>,
}

impl ReplyAssembler {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line. Returns the reply once its last line arrives.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] for malformed lines, a code that differs
    /// from the first line's, or a reply longer than [`MAX_REPLY_LINES`].
    pub fn push(&mut self, line: &str) -> Result<Option<Reply>> {
        let parsed = parse_reply_line(line)?;

        match self.code {
            None => self.code = Some(parsed.code),
            Some(code) if code != parsed.code => {
                return Err(Error::Protocol(format!(
                    "Reply code changed mid-reply from {code} to {}",
                    parsed.code
                )));
            }
            Some(_) => {}
        }

        if self.lines.len() >= MAX_REPLY_LINES {
            return Err(Error::Protocol(format!(
                "Reply exceeds {MAX_REPLY_LINES} lines"
            )));
        }
        self.lines.push(parsed.text.to_string());

        if parsed.is_last {
            let lines = std::mem::take(&mut self.lines);
            self.code = None;
            Ok(Some(Reply::new(parsed.code, lines)))
        } else {
            Ok(None)
        }
    }
}
