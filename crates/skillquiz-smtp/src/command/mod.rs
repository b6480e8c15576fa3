//! SMTP command builder.

use crate::types::Address;
use base64::Engine;
use std::fmt;

/// SMTP command sent by the client.
#[derive(Clone, PartialEq, Eq)]
pub enum Command {
    /// EHLO - Extended greeting
    Ehlo {
        /// Client identity announced to the server
        identity: String,
    },
    /// STARTTLS - Upgrade to TLS
    StartTls,
    /// AUTH LOGIN - Begin LOGIN authentication
    AuthLogin,
    /// Base64 answer to an AUTH challenge (never logged)
    AuthResponse(String),
    /// MAIL FROM - Start mail transaction
    MailFrom {
        /// Sender address
        from: Address,
    },
    /// RCPT TO - Add recipient
    RcptTo {
        /// Recipient address
        to: Address,
    },
    /// DATA - Begin message data
    Data,
    /// QUIT - Close connection
    Quit,
}

impl Command {
    /// Builds an AUTH challenge answer by base64-encoding `value`.
    #[must_use]
    pub fn auth_response(value: &str) -> Self {
        Self::AuthResponse(base64::engine::general_purpose::STANDARD.encode(value.as_bytes()))
    }

    /// Serializes the command to bytes, including the trailing CRLF.
    #[must_use]
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = match self {
            Self::Ehlo { identity } => format!("EHLO {identity}").into_bytes(),
            Self::StartTls => b"STARTTLS".to_vec(),
            Self::AuthLogin => b"AUTH LOGIN".to_vec(),
            Self::AuthResponse(encoded) => encoded.as_bytes().to_vec(),
            Self::MailFrom { from } => format!("MAIL FROM:<{from}>").into_bytes(),
            Self::RcptTo { to } => format!("RCPT TO:<{to}>").into_bytes(),
            Self::Data => b"DATA".to_vec(),
            Self::Quit => b"QUIT".to_vec(),
        };
        buf.extend_from_slice(b"\r\n");
        buf
    }
}

/// Renders the command line as it appears on the wire, minus CRLF, with
/// AUTH payloads replaced by `<redacted>`.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AuthResponse(_) => f.write_str("<redacted>"),
            other => {
                let wire = other.serialize();
                f.write_str(String::from_utf8_lossy(&wire).trim_end())
            }
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command({self})")
    }
}
