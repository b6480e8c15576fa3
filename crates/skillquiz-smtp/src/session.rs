//! Stage functions for one submission session.
//!
//! A session runs bootstrap → TLS upgrade → authentication → mail
//! transaction on a single TCP connection and is never reused. Abandoning
//! any of these futures drops the socket; the outcome is then unknown, not
//! failed.

use crate::connection::{
    Authenticated, Client, DEFAULT_TIMEOUT, Secured, SmtpConnection, TlsNegotiating, connect,
    default_tls_config,
};
use crate::error::Result;
use crate::types::{Address, Credentials, SmtpEndpoint};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::ClientConfig;
use tracing::debug;

/// Per-session settings that are not part of the endpoint.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Name announced in EHLO.
    pub local_identity: String,
    /// Deadline for connect, every read and write, and the TLS handshake.
    pub timeout: Duration,
    /// TLS client configuration (trust roots).
    pub tls_config: Arc<ClientConfig>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            local_identity: "localhost".to_string(),
            timeout: DEFAULT_TIMEOUT,
            tls_config: default_tls_config(),
        }
    }
}

impl SessionOptions {
    /// Sets the EHLO identity.
    #[must_use]
    pub fn local_identity(mut self, identity: impl Into<String>) -> Self {
        self.local_identity = identity.into();
        self
    }

    /// Sets the per-operation deadline.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the TLS configuration, e.g. to trust a private CA.
    #[must_use]
    pub fn tls_config(mut self, config: Arc<ClientConfig>) -> Self {
        self.tls_config = config;
        self
    }
}

/// Opens the connection, reads the banner, sends EHLO and STARTTLS.
///
/// # Errors
///
/// [`Error::Transport`](crate::Error::Transport) if the connection fails,
/// [`Error::Handshake`](crate::Error::Handshake) on a bad banner or EHLO, and
/// [`Error::TlsUnavailable`](crate::Error::TlsUnavailable) if the server
/// will not start TLS.
pub async fn bootstrap(
    endpoint: &SmtpEndpoint,
    options: &SessionOptions,
) -> Result<Client<TcpStream, TlsNegotiating>> {
    let stream = connect(endpoint, options.timeout).await?;
    let client = Client::greet(stream, options.local_identity.clone(), options.timeout).await?;
    let client = client.ehlo().await?;
    client.starttls().await
}

/// Wraps the socket in TLS and re-negotiates capabilities.
///
/// # Errors
///
/// [`Error::TlsHandshake`](crate::Error::TlsHandshake) on negotiation or
/// certificate failure.
pub async fn upgrade<S>(
    client: Client<S, TlsNegotiating>,
    server_hostname: &str,
    options: &SessionOptions,
) -> Result<Client<TlsStream<S>, Secured>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    client
        .upgrade(server_hostname, Arc::clone(&options.tls_config))
        .await
}

/// Performs AUTH LOGIN.
///
/// # Errors
///
/// [`Error::Authentication`](crate::Error::Authentication) if the server
/// deviates from 334/334/235.
pub async fn authenticate<S>(
    client: Client<S, Secured>,
    credentials: &Credentials,
) -> Result<Client<S, Authenticated>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    client.auth_login(credentials).await
}

/// Runs the mail transaction and QUIT.
///
/// # Errors
///
/// [`Error::MessageTooLarge`](crate::Error::MessageTooLarge) before
/// `MAIL FROM` if the message is over the advertised SIZE limit, and
/// [`Error::MailTransaction`](crate::Error::MailTransaction) tagged with the
/// failing stage. QUIT is not sent in either case.
pub async fn deliver<S>(
    client: Client<S, Authenticated>,
    from: &Address,
    to: &Address,
    message: &[u8],
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    client.capabilities().check_message_size(message.len())?;
    let client = client.mail_from(from).await?;
    let client = client.rcpt_to(to).await?;
    let client = client.data().await?;
    let client = client.send_message(message).await?;
    debug!(%from, %to, "delivered");
    client.quit().await;
    Ok(())
}
