//! SMTP connection management with type-state pattern.

mod client;
mod transcript;

pub use client::{
    Authenticated, Client, Connected, Data, Delivered, Greeted, MailTransaction, RecipientAdded,
    Secured, SmtpConnection, TlsNegotiating,
};
pub use transcript::{
    DEFAULT_TIMEOUT, MAX_LINE_LEN, Transcript, connect, default_tls_config, start_tls,
};

use crate::error::{Error, Result};
use crate::types::{AuthMechanism, Extension, Reply};
use std::collections::HashSet;

/// Server capabilities from the EHLO reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// Domain the server announced on the first EHLO line.
    pub domain: String,
    /// Advertised extensions.
    pub extensions: HashSet<Extension>,
}

impl Capabilities {
    /// Builds the capability set from an EHLO reply. The first line carries
    /// the server domain; every following line is one extension.
    #[must_use]
    pub fn from_ehlo(reply: &Reply) -> Self {
        let domain = reply
            .first_line()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string();

        let extensions = reply.lines.iter().skip(1).map(|l| Extension::parse(l)).collect();

        Self { domain, extensions }
    }

    /// Checks if the server supports an extension.
    #[must_use]
    pub fn supports(&self, ext: &Extension) -> bool {
        self.extensions.contains(ext)
    }

    /// Checks if STARTTLS is advertised.
    #[must_use]
    pub fn supports_starttls(&self) -> bool {
        self.supports(&Extension::StartTls)
    }

    /// Checks if an AUTH line lists `mechanism`.
    #[must_use]
    pub fn supports_auth(&self, mechanism: &AuthMechanism) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Auth(list) if list.contains(mechanism)))
    }

    /// Returns the maximum message size, if advertised with a value.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }

    /// Checks `size` against the advertised SIZE limit, if any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] when the message is over the limit.
    pub fn check_message_size(&self, size: usize) -> Result<()> {
        match self.max_message_size() {
            Some(limit) if limit > 0 && size > limit => Err(Error::MessageTooLarge { size, limit }),
            _ => Ok(()),
        }
    }
}
