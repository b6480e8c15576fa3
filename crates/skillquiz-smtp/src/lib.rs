//! # skillquiz-smtp
//!
//! A small SMTP submission client (RFC 5321) that always upgrades with
//! STARTTLS and authenticates with AUTH LOGIN before sending.
//!
//! ## Quick Start
//!
//! ```ignore
//! use skillquiz_smtp::session::{SessionOptions, authenticate, bootstrap, deliver, upgrade};
//! use skillquiz_smtp::{Address, Credentials, SmtpEndpoint};
//!
//! #[tokio::main]
//! async fn main() -> skillquiz_smtp::Result<()> {
//!     let endpoint = SmtpEndpoint::new("mail.example.com", 587);
//!     let credentials = Credentials::new("bot@example.com", "secret");
//!     let options = SessionOptions::default();
//!
//!     let client = bootstrap(&endpoint, &options).await?;
//!     let client = upgrade(client, &endpoint.host, &options).await?;
//!     let client = authenticate(client, &credentials).await?;
//!
//!     let from = Address::new("bot@example.com")?;
//!     let to = Address::new("user@college.edu")?;
//!     let message = b"Subject: Test\r\n\r\nHello, World!\r\n";
//!     deliver(client, &from, &to, message).await
//! }
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ─ehlo→ Greeted ─starttls→ TlsNegotiating ─upgrade→ Secured
//!   ─auth_login→ Authenticated ─mail_from→ MailTransaction ─rcpt_to→
//!   RecipientAdded ─data→ Data ─send_message→ Delivered ─quit→ (closed)
//! ```
//!
//! Any error consumes the client and closes the socket without `QUIT`.
//!
//! ## Modules
//!
//! - [`command`]: SMTP command builders
//! - [`connection`]: Transcript engine and type-state client
//! - [`data`]: DATA phase dot-stuffing
//! - [`parser`]: Reply parser
//! - [`session`]: Stage functions for one submission
//! - [`types`]: Addresses, endpoint, credentials, replies

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
pub mod data;
mod error;
pub mod parser;
pub mod session;
pub mod types;

pub use connection::{
    Authenticated, Capabilities, Client, Connected, Data, Delivered, Greeted, MailTransaction,
    RecipientAdded, Secured, SmtpConnection, TlsNegotiating,
};
pub use error::{Error, Result, Stage};
pub use session::SessionOptions;
pub use types::{
    Address, AuthMechanism, Credentials, Extension, Mailbox, Reply, ReplyCode, SmtpEndpoint,
};
