//! Error types for the mailer.

use crate::config::ConfigError;
use thiserror::Error;

/// Errors returned by a send attempt.
///
/// None of these are retried internally. A caller that retries must start a
/// new send, which opens a new connection.
#[derive(Debug, Error)]
pub enum SendError {
    /// Connection parameters are missing or invalid; nothing was sent.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// SMTP session failed.
    #[error(transparent)]
    Smtp(#[from] skillquiz_smtp::Error),
}

impl SendError {
    /// Short machine-readable name of the failure class.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        use skillquiz_smtp::Error as E;
        match self {
            Self::Configuration(_) => "configuration",
            Self::Smtp(E::Transport(_)) => "transport",
            Self::Smtp(E::Protocol(_)) => "protocol",
            Self::Smtp(E::Handshake { .. }) => "handshake",
            Self::Smtp(E::TlsUnavailable(_)) => "tls_unavailable",
            Self::Smtp(E::TlsHandshake(_)) => "tls_handshake",
            Self::Smtp(E::Authentication { .. }) => "authentication",
            Self::Smtp(E::MailTransaction { .. }) => "mail_transaction",
            Self::Smtp(E::InvalidAddress(_)) => "invalid_address",
            Self::Smtp(E::MessageTooLarge { .. }) => "message_too_large",
        }
    }

    /// True if resending the same message cannot succeed without a change:
    /// bad configuration, a 5xx reply or an oversized message.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        match self {
            Self::Configuration(_) => true,
            Self::Smtp(e) => e.is_permanent(),
        }
    }

    /// True if the server asked to try again later (4xx).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Configuration(_) => false,
            Self::Smtp(e) => e.is_transient(),
        }
    }
}

/// Result type alias using [`SendError`].
pub type Result<T> = std::result::Result<T, SendError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, ConfigProblem};

    #[test]
    fn kind_names() {
        let config = SendError::from(ConfigError::new(vec![ConfigProblem::MissingHost]));
        assert_eq!(config.kind(), "configuration");

        let auth = SendError::from(skillquiz_smtp::Error::Authentication {
            code: 535,
            message: "bad".into(),
        });
        assert_eq!(auth.kind(), "authentication");
        assert_eq!(auth.to_string(), "Authentication failed with 535: bad");
        assert!(auth.is_permanent());
        assert!(config.is_permanent());
    }

    #[test]
    fn transient_reply_is_retryable() {
        let busy = SendError::from(skillquiz_smtp::Error::MailTransaction {
            stage: skillquiz_smtp::Stage::RcptTo,
            expected: vec![250, 251],
            actual: 451,
            message: "try later".into(),
        });
        assert!(busy.is_transient());
        assert!(!busy.is_permanent());

        let too_big = SendError::from(skillquiz_smtp::Error::MessageTooLarge {
            size: 10,
            limit: 5,
        });
        assert_eq!(too_big.kind(), "message_too_large");
        assert!(too_big.is_permanent());
    }
}
