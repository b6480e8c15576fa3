//! Scripted SMTP submission server for integration tests.
//!
//! Listens on 127.0.0.1 with a self-signed `localhost` certificate, answers
//! one fixed script and records what the client sent.

#![allow(dead_code, clippy::unwrap_used, clippy::missing_panics_doc)]

use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio_rustls::TlsAcceptor;

use skillquiz_mailer::{Mailer, MailerConfig};

/// How the server answers.
#[derive(Debug, Clone)]
pub struct Behaviour {
    /// Advertise STARTTLS in the plaintext EHLO.
    pub starttls: bool,
    /// Reply to the base64 password line.
    pub password_reply: &'static str,
    /// Reply to `RCPT TO`.
    pub rcpt_reply: &'static str,
}

impl Default for Behaviour {
    fn default() -> Self {
        Self {
            starttls: true,
            password_reply: "235 2.7.0 Authentication successful",
            rcpt_reply: "250 2.1.5 Ok",
        }
    }
}

/// What the server saw.
#[derive(Debug, Default, Clone)]
pub struct Recording {
    /// Accepted TCP connections.
    pub connections: usize,
    /// Command lines without CRLF, in order.
    pub commands: Vec<String>,
    /// Reply codes sent, in order.
    pub replies: Vec<u16>,
    /// DATA payload as received, before the terminating dot line.
    pub data: Vec<u8>,
    /// Whether a TLS handshake completed.
    pub tls_established: bool,
}

impl Recording {
    pub fn sent(&self, verb: &str) -> bool {
        self.commands.iter().any(|c| c.starts_with(verb))
    }
}

pub struct MockServer {
    pub port: u16,
    recording: Arc<Mutex<Recording>>,
    client_tls: Arc<rustls::ClientConfig>,
}

impl MockServer {
    pub async fn start(behaviour: Behaviour) -> Self {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert = CertificateDer::from(certified.cert.der().to_vec());
        let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(
            certified.signing_key.serialize_der(),
        ));

        let server_tls = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(vec![cert.clone()], key)
            .unwrap();
        let acceptor = TlsAcceptor::from(Arc::new(server_tls));

        let mut roots = rustls::RootCertStore::empty();
        roots.add(cert).unwrap();
        let client_tls = rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let recording = Arc::new(Mutex::new(Recording::default()));

        let shared = Arc::clone(&recording);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                shared.lock().unwrap().connections += 1;
                let session = Session {
                    behaviour: behaviour.clone(),
                    recording: Arc::clone(&shared),
                };
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    // Read errors mean the client went away.
                    let _ = session.plaintext(stream, acceptor).await;
                });
            }
        });

        Self {
            port,
            recording,
            client_tls: Arc::new(client_tls),
        }
    }

    /// Client TLS configuration that trusts this server's certificate.
    pub fn client_tls(&self) -> Arc<rustls::ClientConfig> {
        Arc::clone(&self.client_tls)
    }

    pub fn recording(&self) -> Recording {
        self.recording.lock().unwrap().clone()
    }

    /// Configuration pointing at this server.
    pub fn config(&self) -> MailerConfig {
        let vars: HashMap<&str, String> = [
            ("SMTP_HOST", "localhost".to_string()),
            ("SMTP_PORT", self.port.to_string()),
            ("SMTP_USER", "bot@example.com".to_string()),
            ("SMTP_PASSWORD", "s3cret".to_string()),
            ("SMTP_TIMEOUT_SECS", "5".to_string()),
            ("APP_LOGIN_URL", "https://quiz.example.com".to_string()),
        ]
        .into_iter()
        .collect();
        MailerConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    /// Mailer that trusts this server.
    pub fn mailer(&self) -> Mailer {
        Mailer::new(self.config()).with_tls_config(self.client_tls())
    }
}

struct Session {
    behaviour: Behaviour,
    recording: Arc<Mutex<Recording>>,
}

impl Session {
    async fn plaintext(&self, stream: TcpStream, acceptor: TlsAcceptor) -> std::io::Result<()> {
        let mut stream = BufReader::new(stream);
        self.reply(&mut stream, &["220 localhost ESMTP mock"]).await?;

        loop {
            let Some(line) = self.command(&mut stream).await? else {
                return Ok(());
            };
            let verb = line.to_ascii_uppercase();
            if verb.starts_with("EHLO") {
                if self.behaviour.starttls {
                    self.reply(&mut stream, &["250-localhost", "250-PIPELINING", "250 STARTTLS"])
                        .await?;
                } else {
                    self.reply(&mut stream, &["250-localhost", "250 AUTH LOGIN PLAIN"])
                        .await?;
                }
            } else if verb == "STARTTLS" && self.behaviour.starttls {
                self.reply(&mut stream, &["220 2.0.0 Ready to start TLS"]).await?;
                break;
            } else if verb == "QUIT" {
                return self.reply(&mut stream, &["221 2.0.0 Bye"]).await;
            } else {
                self.reply(&mut stream, &["530 5.7.0 Must issue a STARTTLS command first"])
                    .await?;
            }
        }

        let tls = acceptor.accept(stream.into_inner()).await?;
        self.recording.lock().unwrap().tls_established = true;
        self.secured(BufReader::new(tls)).await
    }

    async fn secured<S>(&self, mut stream: BufReader<S>) -> std::io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        loop {
            let Some(line) = self.command(&mut stream).await? else {
                return Ok(());
            };
            let verb = line.to_ascii_uppercase();
            if verb.starts_with("EHLO") {
                self.reply(&mut stream, &["250-localhost", "250-AUTH LOGIN PLAIN", "250 8BITMIME"])
                    .await?;
            } else if verb == "AUTH LOGIN" {
                self.reply(&mut stream, &["334 VXNlcm5hbWU6"]).await?;
                if self.command(&mut stream).await?.is_none() {
                    return Ok(());
                }
                self.reply(&mut stream, &["334 UGFzc3dvcmQ6"]).await?;
                if self.command(&mut stream).await?.is_none() {
                    return Ok(());
                }
                self.reply(&mut stream, &[self.behaviour.password_reply]).await?;
            } else if verb.starts_with("MAIL FROM:") {
                self.reply(&mut stream, &["250 2.1.0 Ok"]).await?;
            } else if verb.starts_with("RCPT TO:") {
                self.reply(&mut stream, &[self.behaviour.rcpt_reply]).await?;
            } else if verb == "DATA" {
                self.reply(&mut stream, &["354 End data with <CR><LF>.<CR><LF>"]).await?;
                let data = read_data(&mut stream).await?;
                self.recording.lock().unwrap().data = data;
                self.reply(&mut stream, &["250 2.0.0 Ok: queued"]).await?;
            } else if verb == "QUIT" {
                return self.reply(&mut stream, &["221 2.0.0 Bye"]).await;
            } else {
                self.reply(&mut stream, &["502 5.5.2 Command not recognized"]).await?;
            }
        }
    }

    async fn command<S>(&self, stream: &mut BufReader<S>) -> std::io::Result<Option<String>>
    where
        S: AsyncRead + Unpin,
    {
        let mut line = String::new();
        if stream.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        let line = line.trim_end_matches(['\r', '\n']).to_string();
        self.recording.lock().unwrap().commands.push(line.clone());
        Ok(Some(line))
    }

    async fn reply<S>(&self, stream: &mut BufReader<S>, lines: &[&str]) -> std::io::Result<()>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Some(code) = lines.first().and_then(|l| l.get(..3)).and_then(|c| c.parse::<u16>().ok()) {
            self.recording.lock().unwrap().replies.push(code);
        }
        let mut out = String::new();
        for line in lines {
            out.push_str(line);
            out.push_str("\r\n");
        }
        let inner = stream.get_mut();
        inner.write_all(out.as_bytes()).await?;
        inner.flush().await
    }
}

/// Reads raw DATA lines up to, not including, the lone `.` line.
async fn read_data<S>(stream: &mut BufReader<S>) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut data = Vec::new();
    loop {
        let mut line = Vec::new();
        if stream.read_until(b'\n', &mut line).await? == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        if line == b".\r\n" {
            return Ok(data);
        }
        data.extend_from_slice(&line);
    }
}
