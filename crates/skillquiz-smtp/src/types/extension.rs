//! SMTP service extensions advertised in the EHLO reply.

/// SMTP extension keyword from one EHLO line.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Extension {
    /// STARTTLS - TLS upgrade
    StartTls,
    /// AUTH - Authentication mechanisms
    Auth(Vec<AuthMechanism>),
    /// SIZE - Maximum message size
    Size(Option<usize>),
    /// 8BITMIME - 8-bit MIME transport
    EightBitMime,
    /// PIPELINING - Command pipelining (advertised, never used)
    Pipelining,
    /// SMTPUTF8 - UTF-8 email addresses
    SmtpUtf8,
    /// Anything else, kept verbatim
    Other(String),
}

impl Extension {
    /// Parses an extension line from the EHLO reply.
    #[must_use]
    pub fn parse(line: &str) -> Self {
        let mut parts = line.split_whitespace();
        let Some(keyword) = parts.next() else {
            return Self::Other(line.to_string());
        };

        match keyword.to_ascii_uppercase().as_str() {
            "STARTTLS" => Self::StartTls,
            "AUTH" => Self::Auth(parts.map(AuthMechanism::parse).collect()),
            "SIZE" => Self::Size(parts.next().and_then(|s| s.parse().ok())),
            "8BITMIME" => Self::EightBitMime,
            "PIPELINING" => Self::Pipelining,
            "SMTPUTF8" => Self::SmtpUtf8,
            _ => Self::Other(line.to_string()),
        }
    }
}

/// SASL mechanism named in an `AUTH` extension line.
///
/// Only `LOGIN` is ever used by this client; the rest are recognised so the
/// capability set can be logged accurately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AuthMechanism {
    /// LOGIN
    Login,
    /// PLAIN
    Plain,
    /// Any other mechanism name (upper-cased)
    Other(String),
}

impl AuthMechanism {
    /// Parses a mechanism name.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "LOGIN" => Self::Login,
            "PLAIN" => Self::Plain,
            other => Self::Other(other.to_string()),
        }
    }

    /// Returns the mechanism name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Login => "LOGIN",
            Self::Plain => "PLAIN",
            Self::Other(name) => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_starttls_any_case() {
        assert_eq!(Extension::parse("STARTTLS"), Extension::StartTls);
        assert_eq!(Extension::parse("starttls"), Extension::StartTls);
    }

    #[test]
    fn parse_auth_list() {
        assert_eq!(
            Extension::parse("AUTH PLAIN LOGIN XOAUTH2"),
            Extension::Auth(vec![
                AuthMechanism::Plain,
                AuthMechanism::Login,
                AuthMechanism::Other("XOAUTH2".into()),
            ])
        );
    }

    #[test]
    fn parse_size() {
        assert_eq!(
            Extension::parse("SIZE 35882577"),
            Extension::Size(Some(35_882_577))
        );
        assert_eq!(Extension::parse("SIZE"), Extension::Size(None));
    }

    #[test]
    fn parse_other_kept_verbatim() {
        assert_eq!(
            Extension::parse("ENHANCEDSTATUSCODES"),
            Extension::Other("ENHANCEDSTATUSCODES".into())
        );
        assert_eq!(Extension::parse(""), Extension::Other(String::new()));
    }

    #[test]
    fn mechanism_names() {
        assert_eq!(AuthMechanism::parse("login").as_str(), "LOGIN");
        assert_eq!(AuthMechanism::parse("cram-md5").as_str(), "CRAM-MD5");
    }
}
