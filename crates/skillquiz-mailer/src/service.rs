//! Send orchestration.
//!
//! One call to [`send`] opens exactly one TCP connection and walks it through
//! bootstrap, TLS upgrade, authentication and the mail transaction. Nothing
//! is retried. Dropping the returned future abandons the send, after which
//! delivery is unknown rather than failed.

use crate::config::{self, DEFAULT_FROM_NAME, MailerConfig};
use crate::error::Result;
use crate::message::Envelope;
use crate::template::{Template, TemplateContext};
use chrono::Datelike;
use skillquiz_smtp::session::{self, SessionOptions};
use skillquiz_smtp::{Address, Credentials, Mailbox, SmtpEndpoint};
use std::sync::Arc;
use tracing::info;

/// Sends `envelope` with default session options.
///
/// # Errors
///
/// [`SendError::Configuration`](crate::SendError::Configuration) before any
/// connection is attempted, otherwise the first SMTP failure.
pub async fn send(
    endpoint: &SmtpEndpoint,
    credentials: &Credentials,
    envelope: &Envelope,
) -> Result<()> {
    send_with(endpoint, credentials, envelope, &SessionOptions::default()).await
}

/// Sends `envelope` with explicit session options.
///
/// # Errors
///
/// See [`send`].
pub async fn send_with(
    endpoint: &SmtpEndpoint,
    credentials: &Credentials,
    envelope: &Envelope,
    options: &SessionOptions,
) -> Result<()> {
    config::validate(endpoint, credentials)?;

    info!(server = %endpoint, to = %envelope.to, subject = %envelope.subject, "sending email");

    let client = session::bootstrap(endpoint, options).await?;
    let client = session::upgrade(client, &endpoint.host, options).await?;
    let client = session::authenticate(client, credentials).await?;

    let message = envelope.to_rfc5322();
    session::deliver(
        client,
        &envelope.from.address,
        &envelope.to,
        message.as_bytes(),
    )
    .await?;

    info!(to = %envelope.to, "email sent");
    Ok(())
}

/// Renders `template` into an envelope from `sender`. Needs no server or
/// credentials.
///
/// # Errors
///
/// Fails if the template's recipient is not a usable address.
pub fn compose(template: &Template, sender: &Mailbox, login_url: Option<&str>) -> Result<Envelope> {
    let to = Address::new(template.recipient())?;
    let ctx = TemplateContext {
        brand: DEFAULT_FROM_NAME.to_string(),
        login_url: login_url.map(str::to_string),
        year: chrono::Utc::now().year(),
    };
    let rendered = template.render(&ctx);
    Ok(Envelope::new(
        sender.clone(),
        to,
        rendered.subject,
        rendered.html_body,
    ))
}

/// Configured sender for the application's templates.
#[derive(Debug, Clone)]
pub struct Mailer {
    config: MailerConfig,
    options: SessionOptions,
}

impl Mailer {
    /// Creates a mailer using the configuration's session settings and the
    /// public web PKI roots.
    #[must_use]
    pub fn new(config: MailerConfig) -> Self {
        let options = config.session_options();
        Self { config, options }
    }

    /// Replaces the TLS client configuration.
    #[must_use]
    pub fn with_tls_config(mut self, tls_config: Arc<rustls::ClientConfig>) -> Self {
        self.options = self.options.tls_config(tls_config);
        self
    }

    /// Loaded configuration.
    #[must_use]
    pub const fn config(&self) -> &MailerConfig {
        &self.config
    }

    /// Renders `template` into an envelope from the configured sender.
    ///
    /// # Errors
    ///
    /// Fails if the template's recipient is not a usable address.
    pub fn envelope_for(&self, template: &Template) -> Result<Envelope> {
        compose(template, &self.config.sender, self.config.login_url.as_deref())
    }

    /// Renders and sends `template`.
    ///
    /// # Errors
    ///
    /// See [`send`].
    pub async fn send_template(&self, template: &Template) -> Result<()> {
        let envelope = self.envelope_for(template)?;
        send_with(
            &self.config.endpoint,
            &self.config.credentials,
            &envelope,
            &self.options,
        )
        .await
    }
}
