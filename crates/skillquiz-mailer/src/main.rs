//! `skillquiz-mailer` - send Skill Quiz Lab transactional email from the
//! command line.
//!
//! Reads SMTP settings from the environment, renders one template, sends it
//! and prints `{"success":true}` or `{"error":"..."}`.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use skillquiz_mailer::config::ComposeConfig;
use skillquiz_mailer::{Mailer, MailerConfig, Template, service};
use std::io::Read;
use std::process::ExitCode;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Send Skill Quiz Lab notification emails over SMTP with STARTTLS.
#[derive(Parser)]
#[command(name = "skillquiz-mailer")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Print the composed message instead of sending it
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Send account credentials after an approved connection request
    Credentials(CredentialsArgs),
    /// Tell a college its connection request was not approved
    Rejection(RejectionArgs),
    /// Read a JSON template request from stdin
    Request,
}

#[derive(Args)]
struct CredentialsArgs {
    /// Recipient address
    #[arg(long)]
    to: String,
    /// Recipient's name
    #[arg(long)]
    name: String,
    /// College name
    #[arg(long = "college")]
    college_name: String,
    /// Login email for the new account
    #[arg(long)]
    email: String,
    /// Generated password
    #[arg(long)]
    password: String,
}

#[derive(Args)]
struct RejectionArgs {
    /// Recipient address
    #[arg(long)]
    to: String,
    /// Recipient's name
    #[arg(long)]
    name: String,
    /// College name
    #[arg(long = "college")]
    college_name: String,
    /// Reason shown to the recipient
    #[arg(long)]
    reason: Option<String>,
}

impl Command {
    fn into_template(self) -> anyhow::Result<Template> {
        Ok(match self {
            Self::Credentials(args) => Template::Credentials {
                to: args.to,
                name: args.name,
                college_name: args.college_name,
                email: args.email,
                password: args.password,
            },
            Self::Rejection(args) => Template::Rejection {
                to: args.to,
                name: args.name,
                college_name: args.college_name,
                reason: args.reason,
            },
            Self::Request => {
                let mut input = String::new();
                std::io::stdin()
                    .read_to_string(&mut input)
                    .context("reading request from stdin")?;
                parse_request(&input)?
            }
        })
    }
}

fn parse_request(input: &str) -> anyhow::Result<Template> {
    serde_json::from_str(input).context("parsing template request")
}

/// What a successful run produced.
enum Outcome {
    Sent,
    /// The composed RFC 5322 message.
    Composed(String),
}

/// Text written to stdout for a finished run.
fn report(result: &anyhow::Result<Outcome>) -> String {
    match result {
        Ok(Outcome::Sent) => format!("{}\n", json!({ "success": true })),
        Ok(Outcome::Composed(message)) => message.clone(),
        Err(e) => format!("{}\n", json!({ "error": format!("{e:#}") })),
    }
}

async fn run(cli: Cli) -> anyhow::Result<Outcome> {
    let template = cli.command.into_template()?;
    debug!(template = template.kind(), to = template.recipient(), "request parsed");

    if cli.dry_run {
        let config = ComposeConfig::from_env()?;
        let envelope = service::compose(&template, &config.sender, config.login_url.as_deref())?;
        return Ok(Outcome::Composed(envelope.to_rfc5322()));
    }

    let mailer = Mailer::new(MailerConfig::from_env()?);
    mailer.send_template(&template).await?;
    Ok(Outcome::Sent)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "skillquiz_mailer=info,skillquiz_smtp=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let result = run(Cli::parse()).await;
    if let Err(e) = &result {
        error!("{e:#}");
    }
    print!("{}", report(&result));

    if result.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
