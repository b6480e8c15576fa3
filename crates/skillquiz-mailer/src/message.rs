//! Envelope and RFC 5322 message composition.

use base64::Engine;
use chrono::{DateTime, Utc};
use skillquiz_smtp::{Address, Mailbox};
use std::fmt::Write;

/// Longest chunk of raw bytes per RFC 2047 encoded word, keeping each word
/// under the 75 character limit once base64-encoded.
const ENCODED_WORD_CHUNK: usize = 45;

/// One outbound email: who it is from and to, and its rendered content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// Sender (envelope `MAIL FROM` and `From:` header).
    pub from: Mailbox,
    /// Single recipient (envelope `RCPT TO` and `To:` header).
    pub to: Address,
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html_body: String,
}

impl Envelope {
    /// Creates an envelope.
    #[must_use]
    pub fn new(
        from: Mailbox,
        to: Address,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            from,
            to,
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }

    /// Builds the RFC 5322 message stamped with the current time and a fresh
    /// `Message-ID`.
    #[must_use]
    pub fn to_rfc5322(&self) -> String {
        let now = Utc::now();
        let message_id = format!(
            "<{}.{:016x}@{}>",
            now.timestamp_millis(),
            rand::random::<u64>(),
            self.from.address.domain()
        );
        self.render(now, &message_id)
    }

    /// Builds the RFC 5322 message with an explicit date and message id.
    #[must_use]
    pub fn render(&self, date: DateTime<Utc>, message_id: &str) -> String {
        let mut message = String::with_capacity(self.html_body.len() + 512);

        let _ = write!(message, "From: {}\r\n", format_mailbox(&self.from));
        let _ = write!(message, "To: {}\r\n", self.to);
        let _ = write!(message, "Subject: {}\r\n", encode_header_text(&self.subject));
        let _ = write!(message, "Date: {}\r\n", date.to_rfc2822());
        let _ = write!(message, "Message-ID: {message_id}\r\n");
        message.push_str("MIME-Version: 1.0\r\n");
        message.push_str("Content-Type: text/html; charset=utf-8\r\n");
        message.push_str("Content-Transfer-Encoding: 8bit\r\n");
        message.push_str("\r\n");
        message.push_str(&self.html_body);
        if !self.html_body.ends_with('\n') {
            message.push_str("\r\n");
        }

        message
    }
}

/// Formats `Name <addr>`, quoting or encoding the display name as needed.
fn format_mailbox(mailbox: &Mailbox) -> String {
    match &mailbox.name {
        None => mailbox.address.to_string(),
        Some(name) if !name.is_ascii() => {
            format!("{} <{}>", encode_words(name), mailbox.address)
        }
        Some(name) => {
            let clean = strip_line_breaks(name);
            if clean
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == ' ' || "!#$%&'*+-/=?^_`{|}~".contains(c))
            {
                format!("{clean} <{}>", mailbox.address)
            } else {
                let escaped = clean.replace('\\', "\\\\").replace('"', "\\\"");
                format!("\"{escaped}\" <{}>", mailbox.address)
            }
        }
    }
}

/// Returns header text unchanged when plain ASCII, RFC 2047 encoded
/// otherwise. Line breaks are never allowed through.
fn encode_header_text(text: &str) -> String {
    let clean = strip_line_breaks(text);
    if clean.is_ascii() {
        clean
    } else {
        encode_words(&clean)
    }
}

fn strip_line_breaks(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Encodes text as one or more `=?utf-8?B?...?=` words folded onto
/// continuation lines. Chunks never split a UTF-8 sequence.
fn encode_words(text: &str) -> String {
    let engine = &base64::engine::general_purpose::STANDARD;
    let mut words = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + ENCODED_WORD_CHUNK).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        words.push(format!("=?utf-8?B?{}?=", engine.encode(&text[start..end])));
        start = end;
    }

    words.join("\r\n ")
}
