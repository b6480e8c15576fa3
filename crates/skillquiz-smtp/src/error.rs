//! Error types for SMTP operations.

use std::fmt;
use std::io;

/// Result type alias for SMTP operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of the mail transaction at which a reply mismatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// `MAIL FROM` command.
    MailFrom,
    /// `RCPT TO` command.
    RcptTo,
    /// `DATA` command (waiting for 354).
    Data,
    /// Final reply after the end-of-data marker.
    DataEnd,
}

impl Stage {
    /// Returns the short wire name of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MailFrom => "MAIL",
            Self::RcptTo => "RCPT",
            Self::Data => "DATA",
            Self::DataEnd => "DATA-END",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// SMTP error types.
///
/// Every variant is terminal for the session that produced it. A caller that
/// wants to retry must open a brand new connection.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket-level failure, unexpected close, or an expired deadline.
    #[error("Transport error: {0}")]
    Transport(#[from] io::Error),

    /// Malformed or unparseable server reply.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Server greeting or EHLO was rejected.
    #[error("Handshake failed with {code}: {message}")]
    Handshake {
        /// Reply code the server sent.
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Server does not offer or refused STARTTLS.
    #[error("STARTTLS unavailable: {0}")]
    TlsUnavailable(String),

    /// TLS negotiation or certificate validation failed.
    #[error("TLS handshake failed: {0}")]
    TlsHandshake(String),

    /// Server rejected the credentials.
    #[error("Authentication failed with {code}: {message}")]
    Authentication {
        /// Reply code the server sent.
        code: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Envelope or DATA phase reply mismatch.
    #[error("{stage} failed: expected {expected:?}, got {actual}: {message}")]
    MailTransaction {
        /// Stage at which the mismatch happened.
        stage: Stage,
        /// Reply codes that would have been accepted.
        expected: Vec<u16>,
        /// Reply code the server sent.
        actual: u16,
        /// Reply text from the server.
        message: String,
    },

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Message is larger than the server's advertised SIZE limit.
    #[error("Message of {size} bytes exceeds the server limit of {limit} bytes")]
    MessageTooLarge {
        /// Message size in bytes.
        size: usize,
        /// Limit from the EHLO SIZE extension.
        limit: usize,
    },
}

impl Error {
    /// Creates a transport error for an expired deadline.
    #[must_use]
    pub fn timed_out(what: &str) -> Self {
        Self::Transport(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{what} timed out"),
        ))
    }

    /// Returns the server reply code carried by this error, if any.
    #[must_use]
    pub const fn reply_code(&self) -> Option<u16> {
        match self {
            Self::Handshake { code, .. } | Self::Authentication { code, .. } => Some(*code),
            Self::MailTransaction { actual, .. } => Some(*actual),
            _ => None,
        }
    }

    /// Returns true if retrying the same message cannot succeed: a 5xx
    /// reply or a message over the server's size limit.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(self, Self::MessageTooLarge { .. })
            || matches!(self.reply_code(), Some(code) if code >= 500 && code < 600)
    }

    /// Returns true if the server answered with a transient error (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.reply_code(), Some(code) if code >= 400 && code < 500)
    }

    /// Returns true if the error came from an expired deadline.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.kind() == io::ErrorKind::TimedOut)
    }
}
