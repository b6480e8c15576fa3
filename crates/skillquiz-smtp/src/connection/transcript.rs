//! Wire transcript engine: one command out, one complete reply in.

use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::ReplyAssembler;
use crate::types::{Reply, SmtpEndpoint};
use rustls::pki_types::ServerName;
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    client::TlsStream,
    rustls::{ClientConfig, RootCertStore},
};
use tracing::{debug, trace};

/// Longest reply line accepted, excluding CRLF.
pub const MAX_LINE_LEN: usize = 4096;

/// Default deadline for every connect, read, write and TLS handshake.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs an I/O future under a deadline, mapping expiry to a transport error.
pub(crate) async fn with_deadline<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = io::Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result.map_err(Error::from),
        Err(_) => Err(Error::timed_out(what)),
    }
}

/// Buffered command/reply channel over any byte stream.
#[derive(Debug)]
pub struct Transcript<S> {
    reader: BufReader<S>,
    timeout: Duration,
}

impl<S> Transcript<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream.
    pub fn new(stream: S, timeout: Duration) -> Self {
        Self {
            reader: BufReader::new(stream),
            timeout,
        }
    }

    /// Returns the per-operation deadline.
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Writes one command (CRLF appended) and reads the complete reply.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on I/O failure, timeout or early close,
    /// and [`Error::Protocol`] if the reply is malformed.
    pub async fn send_command(&mut self, command: &Command) -> Result<Reply> {
        debug!(command = %command, "C:");
        self.write_raw(&command.serialize()).await?;
        self.read_reply().await
    }

    /// Reads one complete, possibly multiline, reply.
    ///
    /// The deadline covers the whole reply, so a server trickling
    /// continuation lines cannot hold the caller past it.
    ///
    /// # Errors
    ///
    /// Same as [`Transcript::send_command`].
    pub async fn read_reply(&mut self) -> Result<Reply> {
        match tokio::time::timeout(self.timeout, self.assemble_reply()).await {
            Ok(result) => result,
            Err(_) => Err(Error::timed_out("reply")),
        }
    }

    async fn assemble_reply(&mut self) -> Result<Reply> {
        let mut assembler = ReplyAssembler::new();
        loop {
            let line = self.read_line().await?;
            trace!(line = %line, "S:");
            if let Some(reply) = assembler.push(&line)? {
                debug!(code = %reply.code, text = %reply.first_line(), "S:");
                return Ok(reply);
            }
        }
    }

    /// Writes raw bytes and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on I/O failure or timeout.
    pub async fn write_raw(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.reader.get_mut();
        with_deadline(self.timeout, "write", async {
            stream.write_all(data).await?;
            stream.flush().await
        })
        .await
    }

    /// Shuts down the write half. Errors are ignored: the peer may already
    /// have closed.
    pub async fn close(mut self) {
        let timeout = self.timeout;
        let _ = with_deadline(timeout, "shutdown", self.reader.get_mut().shutdown()).await;
    }

    /// Returns the raw stream, e.g. to start TLS on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the server already sent bytes that have
    /// not been consumed. After STARTTLS those would otherwise be processed
    /// as if they had arrived over the encrypted channel.
    pub fn into_inner(self) -> Result<S> {
        if !self.reader.buffer().is_empty() {
            return Err(Error::Protocol(
                "Server sent unexpected data before TLS negotiation".into(),
            ));
        }
        Ok(self.reader.into_inner())
    }

    async fn read_line(&mut self) -> Result<String> {
        let limit = (MAX_LINE_LEN + 2) as u64;
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(limit)
            .read_until(b'\n', &mut buf)
            .await?;

        if read == 0 {
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed by server",
            )));
        }

        if buf.last() != Some(&b'\n') {
            if buf.len() as u64 >= limit {
                return Err(Error::Protocol(format!(
                    "Reply line exceeds {MAX_LINE_LEN} bytes"
                )));
            }
            return Err(Error::Transport(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed in the middle of a reply line",
            )));
        }

        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

/// Opens a plain TCP connection to the endpoint.
///
/// # Errors
///
/// Returns [`Error::Transport`] if the connection fails or times out.
pub async fn connect(endpoint: &SmtpEndpoint, timeout: Duration) -> Result<TcpStream> {
    let stream = with_deadline(
        timeout,
        "connect",
        TcpStream::connect(endpoint.authority()),
    )
    .await?;
    debug!(endpoint = %endpoint, "connected");
    Ok(stream)
}

/// Runs a TLS client handshake on an existing stream.
///
/// # Errors
///
/// Returns [`Error::TlsHandshake`] if the hostname is not a valid server
/// name or negotiation fails, and [`Error::Transport`] on timeout.
pub async fn start_tls<S>(
    stream: S,
    hostname: &str,
    config: Arc<ClientConfig>,
    timeout: Duration,
) -> Result<TlsStream<S>>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let server_name = ServerName::try_from(hostname.to_string())
        .map_err(|_| Error::TlsHandshake(format!("Invalid hostname: {hostname}")))?;

    let connector = TlsConnector::from(config);
    match tokio::time::timeout(timeout, connector.connect(server_name, stream)).await {
        Ok(Ok(tls)) => Ok(tls),
        Ok(Err(e)) => Err(Error::TlsHandshake(e.to_string())),
        Err(_) => Err(Error::timed_out("TLS handshake")),
    }
}

/// Creates a TLS client configuration trusting the webpki root set.
#[must_use]
pub fn default_tls_config() -> Arc<ClientConfig> {
    let root_store = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };

    let config = ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Arc::new(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::ReplyCode;
    use tokio_test::io::Builder;

    fn transcript(mock: tokio_test::io::Mock) -> Transcript<tokio_test::io::Mock> {
        Transcript::new(mock, DEFAULT_TIMEOUT)
    }

    #[tokio::test]
    async fn appends_crlf_and_reads_reply() {
        let mock = Builder::new()
            .write(b"DATA\r\n")
            .read(b"354 Go ahead\r\n")
            .build();
        let mut t = transcript(mock);
        let reply = t.send_command(&Command::Data).await.unwrap();
        assert_eq!(reply.code, ReplyCode::START_DATA);
        assert_eq!(reply.lines, vec!["Go ahead"]);
    }

    #[tokio::test]
    async fn reassembles_three_line_reply() {
        let mock = Builder::new()
            .read(b"250-Hello\r\n250-PIPELINING\r\n250 8BITMIME\r\n")
            .build();
        let reply = transcript(mock).read_reply().await.unwrap();
        assert_eq!(reply.code.as_u16(), 250);
        assert_eq!(reply.lines, vec!["Hello", "PIPELINING", "8BITMIME"]);
    }

    #[tokio::test]
    async fn reassembles_reply_split_across_reads() {
        let mock = Builder::new()
            .read(b"250-Hel")
            .read(b"lo\r\n250-PIPE")
            .read(b"LINING\r")
            .read(b"\n250 8BIT")
            .read(b"MIME\r\n")
            .build();
        let reply = transcript(mock).read_reply().await.unwrap();
        assert_eq!(reply.lines, vec!["Hello", "PIPELINING", "8BITMIME"]);
    }

    #[tokio::test]
    async fn consecutive_replies_in_one_read_stay_separate() {
        let mock = Builder::new().read(b"220 ready\r\n250 ok\r\n").build();
        let mut t = transcript(mock);
        assert_eq!(t.read_reply().await.unwrap().code, ReplyCode::SERVICE_READY);
        assert_eq!(t.read_reply().await.unwrap().code, ReplyCode::OK);
    }

    #[tokio::test]
    async fn accepts_bare_lf() {
        let mock = Builder::new().read(b"250-a\n250 b\n").build();
        let reply = transcript(mock).read_reply().await.unwrap();
        assert_eq!(reply.lines, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn close_mid_reply_is_transport_error() {
        let mock = Builder::new().read(b"250-Hello\r\n250-PIPE").build();
        let err = transcript(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Transport(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[tokio::test]
    async fn immediate_close_is_transport_error() {
        let mock = Builder::new().build();
        let err = transcript(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn malformed_code_is_protocol_error() {
        let mock = Builder::new().read(b"OK then\r\n").build();
        let err = transcript(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn overlong_line_is_protocol_error() {
        let mut line = b"250 ".to_vec();
        line.extend(std::iter::repeat_n(b'x', MAX_LINE_LEN + 10));
        line.extend_from_slice(b"\r\n");
        let mock = Builder::new().read(&line).build();
        let mut t = transcript(mock);
        let err = t.read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn silent_server_times_out() {
        let mock = Builder::new().wait(Duration::from_secs(120)).build();
        let mut t = Transcript::new(mock, Duration::from_secs(30));
        let err = t.read_reply().await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn trickled_reply_hits_one_deadline() {
        let mock = Builder::new()
            .wait(Duration::from_secs(25))
            .read(b"250-first\r\n")
            .wait(Duration::from_secs(25))
            .build();
        let mut t = Transcript::new(mock, Duration::from_secs(30));
        let started = tokio::time::Instant::now();
        let err = t.read_reply().await.unwrap_err();
        assert!(err.is_timeout());
        assert!(started.elapsed() <= Duration::from_secs(31));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reply_within_deadline_succeeds() {
        let mock = Builder::new()
            .wait(Duration::from_secs(10))
            .read(b"250-first\r\n")
            .wait(Duration::from_secs(10))
            .read(b"250 last\r\n")
            .build();
        let mut t = Transcript::new(mock, Duration::from_secs(30));
        let reply = t.read_reply().await.unwrap();
        assert_eq!(reply.lines, vec!["first", "last"]);
    }

    #[tokio::test]
    async fn endless_continuation_is_protocol_error() {
        let mut flood = Vec::new();
        for _ in 0..=crate::parser::MAX_REPLY_LINES {
            flood.extend_from_slice(b"250-x\r\n");
        }
        let mock = Builder::new().read(&flood).build();
        let err = transcript(mock).read_reply().await.unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[tokio::test]
    async fn into_inner_rejects_buffered_bytes() {
        let mock = Builder::new()
            .read(b"220 Go ahead\r\n250 injected\r\n")
            .build();
        let mut t = transcript(mock);
        t.read_reply().await.unwrap();
        assert!(matches!(t.into_inner(), Err(Error::Protocol(_))));
    }
}
