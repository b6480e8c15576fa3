//! Mailer configuration from the environment.
//!
//! | Variable            | Required | Default          |
//! |---------------------|----------|------------------|
//! | `SMTP_HOST`         | yes      |                  |
//! | `SMTP_PORT`         | no       | `587`            |
//! | `SMTP_USER`         | yes      |                  |
//! | `SMTP_PASSWORD`     | yes      |                  |
//! | `SMTP_FROM`         | no       | `SMTP_USER`      |
//! | `SMTP_FROM_NAME`    | no       | `Skill Quiz Lab` |
//! | `SMTP_EHLO_NAME`    | no       | `localhost`      |
//! | `SMTP_TIMEOUT_SECS` | no       | `30`             |
//! | `APP_LOGIN_URL`     | no       | (no login link)  |

use skillquiz_smtp::{Address, Credentials, Mailbox, SessionOptions, SmtpEndpoint};
use std::fmt;
use std::time::Duration;

/// Submission port used when `SMTP_PORT` is unset.
pub const DEFAULT_PORT: u16 = 587;

/// Display name used when `SMTP_FROM_NAME` is unset.
pub const DEFAULT_FROM_NAME: &str = "Skill Quiz Lab";

/// One problem found while loading or validating configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigProblem {
    /// SMTP host is empty or unset.
    MissingHost,
    /// SMTP port is not a number in 1-65535.
    InvalidPort(String),
    /// SMTP username is empty or unset.
    MissingUsername,
    /// SMTP password is empty or unset.
    MissingPassword,
    /// Neither `SMTP_FROM` nor `SMTP_USER` is set.
    MissingSender,
    /// Sender address does not parse.
    InvalidSender(String),
    /// Timeout is not a positive number of seconds.
    InvalidTimeout(String),
}

impl ConfigProblem {
    /// Environment variable this problem relates to.
    #[must_use]
    pub const fn variable(&self) -> &'static str {
        match self {
            Self::MissingHost => "SMTP_HOST",
            Self::InvalidPort(_) => "SMTP_PORT",
            Self::MissingUsername => "SMTP_USER",
            Self::MissingPassword => "SMTP_PASSWORD",
            Self::MissingSender | Self::InvalidSender(_) => "SMTP_FROM",
            Self::InvalidTimeout(_) => "SMTP_TIMEOUT_SECS",
        }
    }
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingHost => f.write_str("SMTP server is required"),
            Self::InvalidPort(raw) => write!(f, "SMTP port must be 1-65535, got {raw:?}"),
            Self::MissingUsername => f.write_str("SMTP username is required"),
            Self::MissingPassword => f.write_str("SMTP password is required"),
            Self::MissingSender => f.write_str("Sender address is required (SMTP_FROM or SMTP_USER)"),
            Self::InvalidSender(raw) => write!(f, "Sender address is invalid: {raw:?}"),
            Self::InvalidTimeout(raw) => {
                write!(f, "Timeout must be a positive number of seconds, got {raw:?}")
            }
        }
    }
}

/// Every problem found in one configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    problems: Vec<ConfigProblem>,
}

impl ConfigError {
    /// Wraps a list of problems.
    #[must_use]
    pub const fn new(problems: Vec<ConfigProblem>) -> Self {
        Self { problems }
    }

    /// Returns the problems.
    #[must_use]
    pub fn problems(&self) -> &[ConfigProblem] {
        &self.problems
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.problems.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigError {}

/// Checks the parameters a send needs before any connection is opened.
///
/// # Errors
///
/// Returns every problem found, not just the first.
pub fn validate(endpoint: &SmtpEndpoint, credentials: &Credentials) -> Result<(), ConfigError> {
    let mut problems = Vec::new();

    if endpoint.host.trim().is_empty() {
        problems.push(ConfigProblem::MissingHost);
    }
    if endpoint.port == 0 {
        problems.push(ConfigProblem::InvalidPort("0".into()));
    }
    if credentials.username().trim().is_empty() {
        problems.push(ConfigProblem::MissingUsername);
    }
    if credentials.password().is_empty() {
        problems.push(ConfigProblem::MissingPassword);
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::new(problems))
    }
}

/// Everything needed to send mail on behalf of the application.
#[derive(Debug, Clone)]
pub struct MailerConfig {
    /// SMTP server.
    pub endpoint: SmtpEndpoint,
    /// AUTH LOGIN credentials.
    pub credentials: Credentials,
    /// Envelope sender and `From:` header.
    pub sender: Mailbox,
    /// Name announced in EHLO.
    pub ehlo_name: String,
    /// Per-operation deadline.
    pub timeout: Duration,
    /// Base URL of the web app, used for the login link.
    pub login_url: Option<String>,
}

impl MailerConfig {
    /// Loads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns every missing or invalid variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, which maps a variable name to
    /// its value.
    ///
    /// # Errors
    ///
    /// Returns every missing or invalid variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut problems = Vec::new();

        let host = get("SMTP_HOST").unwrap_or_default();
        if host.is_empty() {
            problems.push(ConfigProblem::MissingHost);
        }

        let port = match get("SMTP_PORT") {
            None => DEFAULT_PORT,
            Some(raw) => match raw.parse::<u16>() {
                Ok(port) if port != 0 => port,
                _ => {
                    problems.push(ConfigProblem::InvalidPort(raw));
                    DEFAULT_PORT
                }
            },
        };

        let username = get("SMTP_USER").unwrap_or_default();
        if username.is_empty() {
            problems.push(ConfigProblem::MissingUsername);
        }

        // Passwords may legitimately have surrounding spaces.
        let password = lookup("SMTP_PASSWORD").unwrap_or_default();
        if password.is_empty() {
            problems.push(ConfigProblem::MissingPassword);
        }

        let sender_raw = get("SMTP_FROM").unwrap_or_else(|| username.clone());
        let sender_address = if sender_raw.is_empty() {
            None
        } else {
            match Address::new(sender_raw.clone()) {
                Ok(address) => Some(address),
                Err(_) => {
                    problems.push(ConfigProblem::InvalidSender(sender_raw));
                    None
                }
            }
        };

        let timeout = match get("SMTP_TIMEOUT_SECS") {
            None => skillquiz_smtp::connection::DEFAULT_TIMEOUT,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    problems.push(ConfigProblem::InvalidTimeout(raw));
                    skillquiz_smtp::connection::DEFAULT_TIMEOUT
                }
            },
        };

        let (Some(sender_address), true) = (sender_address, problems.is_empty()) else {
            return Err(ConfigError::new(problems));
        };

        let from_name = get("SMTP_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string());

        Ok(Self {
            endpoint: SmtpEndpoint::new(host, port),
            credentials: Credentials::new(username, password),
            sender: Mailbox::with_name(from_name, sender_address),
            ehlo_name: get("SMTP_EHLO_NAME").unwrap_or_else(|| "localhost".to_string()),
            timeout,
            login_url: get("APP_LOGIN_URL").map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    /// Session settings derived from this configuration.
    #[must_use]
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions::default()
            .local_identity(self.ehlo_name.clone())
            .timeout(self.timeout)
    }
}

/// What composing a message needs: the sender and the login link. Unlike
/// [`MailerConfig`] it needs no server or password, so a dry run can load it.
#[derive(Debug, Clone)]
pub struct ComposeConfig {
    /// `From:` mailbox.
    pub sender: Mailbox,
    /// Base URL of the web app, used for the login link.
    pub login_url: Option<String>,
}

impl ComposeConfig {
    /// Loads from process environment variables.
    ///
    /// # Errors
    ///
    /// Fails if no usable sender address is configured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads through `lookup`. Reads `SMTP_FROM` (falling back to
    /// `SMTP_USER`), `SMTP_FROM_NAME` and `APP_LOGIN_URL`.
    ///
    /// # Errors
    ///
    /// Fails if no usable sender address is configured.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let Some(raw) = get("SMTP_FROM").or_else(|| get("SMTP_USER")) else {
            return Err(ConfigError::new(vec![ConfigProblem::MissingSender]));
        };
        let address = Address::new(raw.clone())
            .map_err(|_| ConfigError::new(vec![ConfigProblem::InvalidSender(raw)]))?;
        let from_name = get("SMTP_FROM_NAME").unwrap_or_else(|| DEFAULT_FROM_NAME.to_string());

        Ok(Self {
            sender: Mailbox::with_name(from_name, address),
            login_url: get("APP_LOGIN_URL").map(|url| url.trim_end_matches('/').to_string()),
        })
    }
}
