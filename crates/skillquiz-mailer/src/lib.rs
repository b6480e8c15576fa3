//! # skillquiz-mailer
//!
//! Transactional email for Skill Quiz Lab: account credentials after a
//! college connection request is approved, and a notice when one is not.
//!
//! ## Quick Start
//!
//! ```ignore
//! use skillquiz_mailer::{Mailer, MailerConfig, Template, notify};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mailer = Mailer::new(MailerConfig::from_env()?);
//!     let notice = notify(&mailer, &Template::Rejection {
//!         to: "ada@tech.edu".into(),
//!         name: "Ada".into(),
//!         college_name: "Tech U".into(),
//!         reason: None,
//!     })
//!     .await;
//!     println!("{notice:?}");
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Environment configuration and validation
//! - [`message`]: Envelope and RFC 5322 composition
//! - [`notify`]: Sends that report failure as a warning
//! - [`service`]: One-connection send orchestration
//! - [`template`]: Credentials and rejection templates

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
mod error;
pub mod message;
pub mod notify;
pub mod service;
pub mod template;

pub use config::{ComposeConfig, ConfigError, ConfigProblem, MailerConfig};
pub use error::{Result, SendError};
pub use message::Envelope;
pub use notify::{Notice, notify};
pub use service::{Mailer, compose, send, send_with};
pub use template::{RenderedEmail, Template, TemplateContext};
