//! Type-state SMTP client.
//!
//! Each protocol stage is a distinct type, so the compiler rejects any path
//! that would issue `MAIL FROM` before TLS and authentication on the same
//! connection. Every transition consumes the client; on error the client is
//! dropped and the socket closes without `QUIT`.

use super::transcript::{Transcript, start_tls};
use super::Capabilities;
use crate::command::Command;
use crate::data::{END_OF_DATA, dot_stuff};
use crate::error::{Error, Result, Stage};
use crate::types::{Address, AuthMechanism, Credentials, Reply, ReplyCode};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::ClientConfig;
use tracing::{debug, warn};

/// Type-state marker: banner accepted.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker: plaintext EHLO accepted.
#[derive(Debug)]
pub struct Greeted;

/// Type-state marker: server agreed to STARTTLS.
#[derive(Debug)]
pub struct TlsNegotiating;

/// Type-state marker: TLS established and EHLO re-issued.
#[derive(Debug)]
pub struct Secured;

/// Type-state marker: AUTH LOGIN succeeded.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker: MAIL FROM accepted.
#[derive(Debug)]
pub struct MailTransaction;

/// Type-state marker: RCPT TO accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Type-state marker: DATA accepted, server waiting for content.
#[derive(Debug)]
pub struct Data;

/// Type-state marker: message accepted for delivery.
#[derive(Debug)]
pub struct Delivered;

/// SMTP client over stream `S` in protocol state `State`.
#[derive(Debug)]
pub struct Client<S, State> {
    transcript: Transcript<S>,
    capabilities: Capabilities,
    identity: String,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the capabilities from the most recent EHLO.
    fn capabilities(&self) -> &Capabilities;
}

impl<S, State> SmtpConnection for Client<S, State> {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }
}

impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    fn into_state<Next>(self) -> Client<S, Next> {
        Client {
            transcript: self.transcript,
            capabilities: self.capabilities,
            identity: self.identity,
            _state: PhantomData,
        }
    }

    async fn ehlo_reply(&mut self) -> Result<Reply> {
        let cmd = Command::Ehlo {
            identity: self.identity.clone(),
        };
        let reply = self.transcript.send_command(&cmd).await?;
        if reply.code != ReplyCode::OK {
            return Err(Error::Handshake {
                code: reply.code.as_u16(),
                message: reply.text(),
            });
        }
        Ok(reply)
    }

    async fn auth_step(&mut self, cmd: &Command, expected: ReplyCode) -> Result<()> {
        let reply = self.transcript.send_command(cmd).await?;
        if reply.code != expected {
            return Err(Error::Authentication {
                code: reply.code.as_u16(),
                message: reply.text(),
            });
        }
        Ok(())
    }

    async fn envelope_step(
        &mut self,
        cmd: &Command,
        stage: Stage,
        expected: &[ReplyCode],
    ) -> Result<Reply> {
        let reply = self.transcript.send_command(cmd).await?;
        check_stage(reply, stage, expected)
    }
}

fn check_stage(reply: Reply, stage: Stage, expected: &[ReplyCode]) -> Result<Reply> {
    if reply.is_one_of(expected) {
        Ok(reply)
    } else {
        Err(Error::MailTransaction {
            stage,
            expected: expected.iter().map(|c| c.as_u16()).collect(),
            actual: reply.code.as_u16(),
            message: reply.text(),
        })
    }
}

impl<S> Client<S, Connected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a freshly opened stream and reads the server greeting.
    ///
    /// `identity` is the name later announced in EHLO.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] unless the greeting is 220.
    pub async fn greet(stream: S, identity: impl Into<String>, timeout: Duration) -> Result<Self> {
        let mut transcript = Transcript::new(stream, timeout);
        let greeting = transcript.read_reply().await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(Error::Handshake {
                code: greeting.code.as_u16(),
                message: greeting.text(),
            });
        }

        let domain = greeting
            .first_line()
            .split_whitespace()
            .next()
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            transcript,
            capabilities: Capabilities {
                domain,
                ..Capabilities::default()
            },
            identity: identity.into(),
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Handshake`] unless the reply is 250.
    pub async fn ehlo(mut self) -> Result<Client<S, Greeted>> {
        let reply = self.ehlo_reply().await?;
        self.capabilities = Capabilities::from_ehlo(&reply);
        debug!(extensions = ?self.capabilities.extensions, "plaintext EHLO");
        Ok(self.into_state())
    }
}

impl<S> Client<S, Greeted>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Asks the server to start TLS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TlsUnavailable`] if STARTTLS is not advertised or the
    /// server does not answer 220. There is no plaintext fallback.
    pub async fn starttls(mut self) -> Result<Client<S, TlsNegotiating>> {
        if !self.capabilities.supports_starttls() {
            return Err(Error::TlsUnavailable(format!(
                "{} does not advertise STARTTLS",
                self.capabilities.domain
            )));
        }

        let reply = self.transcript.send_command(&Command::StartTls).await?;
        if reply.code != ReplyCode::SERVICE_READY {
            return Err(Error::TlsUnavailable(format!(
                "server answered STARTTLS with {reply}"
            )));
        }

        Ok(self.into_state())
    }
}

impl<S> Client<S, TlsNegotiating>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Runs the TLS handshake, validating the certificate against
    /// `hostname`, then re-issues EHLO over the encrypted channel.
    ///
    /// The pre-TLS capability set is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TlsHandshake`] on negotiation or certificate failure
    /// and [`Error::Handshake`] if the post-TLS EHLO is rejected.
    pub async fn upgrade(
        self,
        hostname: &str,
        tls_config: Arc<ClientConfig>,
    ) -> Result<Client<TlsStream<S>, Secured>> {
        let timeout = self.transcript.timeout();
        let raw = self.transcript.into_inner()?;
        let tls = start_tls(raw, hostname, tls_config, timeout).await?;
        debug!(hostname, "TLS established");

        let mut client = Client {
            transcript: Transcript::new(tls, timeout),
            capabilities: Capabilities::default(),
            identity: self.identity,
            _state: PhantomData,
        };
        let reply = client.ehlo_reply().await?;
        client.capabilities = Capabilities::from_ehlo(&reply);
        debug!(extensions = ?client.capabilities.extensions, "encrypted EHLO");
        Ok(client)
    }
}

impl<S> Client<S, Secured>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Authenticates with AUTH LOGIN: `AUTH LOGIN` → 334, base64 username →
    /// 334, base64 password → 235.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] with the server text at the first
    /// unexpected reply.
    pub async fn auth_login(mut self, credentials: &Credentials) -> Result<Client<S, Authenticated>> {
        if !self.capabilities.supports_auth(&AuthMechanism::Login) {
            warn!(
                server = %self.capabilities.domain,
                "AUTH LOGIN not advertised, attempting anyway"
            );
        }

        self.auth_step(&Command::AuthLogin, ReplyCode::AUTH_CONTINUE)
            .await?;
        self.auth_step(
            &Command::auth_response(credentials.username()),
            ReplyCode::AUTH_CONTINUE,
        )
        .await?;
        self.auth_step(
            &Command::auth_response(credentials.password()),
            ReplyCode::AUTH_SUCCESS,
        )
        .await?;

        debug!(username = credentials.username(), "authenticated");
        Ok(self.into_state())
    }
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Opens the envelope with `MAIL FROM`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailTransaction`] at stage `MAIL` unless 250.
    pub async fn mail_from(mut self, from: &Address) -> Result<Client<S, MailTransaction>> {
        let cmd = Command::MailFrom { from: from.clone() };
        self.envelope_step(&cmd, Stage::MailFrom, &[ReplyCode::OK])
            .await?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, MailTransaction>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds the recipient with `RCPT TO`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailTransaction`] at stage `RCPT` unless 250 or 251.
    pub async fn rcpt_to(mut self, to: &Address) -> Result<Client<S, RecipientAdded>> {
        let cmd = Command::RcptTo { to: to.clone() };
        self.envelope_step(&cmd, Stage::RcptTo, &[ReplyCode::OK, ReplyCode::FORWARD])
            .await?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, RecipientAdded>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends `DATA`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailTransaction`] at stage `DATA` unless 354.
    pub async fn data(mut self) -> Result<Client<S, Data>> {
        self.envelope_step(&Command::Data, Stage::Data, &[ReplyCode::START_DATA])
            .await?;
        Ok(self.into_state())
    }
}

impl<S> Client<S, Data>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Streams the message, dot-stuffed with CRLF line endings, followed by
    /// the end-of-data line, and reads the final reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MailTransaction`] at stage `DATA-END` unless 250.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<S, Delivered>> {
        let mut payload = dot_stuff(message);
        payload.extend_from_slice(END_OF_DATA);
        debug!(bytes = payload.len(), "C: <message data>");
        self.transcript.write_raw(&payload).await?;

        let reply = self.transcript.read_reply().await?;
        let reply = check_stage(reply, Stage::DataEnd, &[ReplyCode::OK])?;
        debug!(reply = %reply.first_line(), "message accepted");
        Ok(self.into_state())
    }
}

impl<S> Client<S, Delivered>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends QUIT and closes the connection.
    ///
    /// The message is already accepted, so a bad or missing reply here is
    /// only logged.
    pub async fn quit(mut self) {
        match self.transcript.send_command(&Command::Quit).await {
            Ok(reply) if reply.code == ReplyCode::CLOSING => {}
            Ok(reply) => warn!(reply = %reply, "unexpected reply to QUIT"),
            Err(e) => debug!(error = %e, "QUIT failed"),
        }
        self.transcript.close().await;
    }
}
