//! DATA phase transparency (RFC 5321 section 4.5.2).
//!
//! The message is sent as CRLF-terminated lines followed by a line holding a
//! single `.`. Any message line that itself starts with `.` gets one more `.`
//! prepended so the receiver cannot mistake it for the end marker.

/// Line that terminates the DATA phase. The stuffed body always ends with
/// CRLF, so together they form `CRLF . CRLF`.
pub const END_OF_DATA: &[u8] = b".\r\n";

/// Splits a message into lines, accepting both CRLF and bare LF endings.
/// A trailing line ending does not produce an extra empty line.
fn split_lines(message: &[u8]) -> impl Iterator<Item = &[u8]> {
    let body = message.strip_suffix(b"\n").unwrap_or(message);
    let empty = message.is_empty();
    body.split(|&b| b == b'\n')
        .filter(move |_| !empty)
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
}

/// Normalises line endings to CRLF and doubles leading dots.
///
/// The result ends with CRLF unless the message is empty.
#[must_use]
pub fn dot_stuff(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + message.len() / 32 + 2);
    for line in split_lines(message) {
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Reverses [`dot_stuff`]: strips one leading dot from every line that has
/// one. The input must not include the end-of-data line.
#[must_use]
pub fn dot_unstuff(stuffed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(stuffed.len());
    for line in split_lines(stuffed) {
        out.extend_from_slice(line.strip_prefix(b".").unwrap_or(line));
        out.extend_from_slice(b"\r\n");
    }
    out
}
