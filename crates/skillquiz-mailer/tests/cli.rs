//! The `skillquiz-mailer` binary's stdout and exit status.

#![allow(clippy::unwrap_used)]

use std::io::Write;
use std::process::{Command, Output, Stdio};

const SMTP_VARS: &[&str] = &[
    "SMTP_HOST",
    "SMTP_PORT",
    "SMTP_USER",
    "SMTP_PASSWORD",
    "SMTP_FROM",
    "SMTP_FROM_NAME",
    "SMTP_EHLO_NAME",
    "SMTP_TIMEOUT_SECS",
    "APP_LOGIN_URL",
];

/// Runs the binary with only `env` set among the mailer's variables.
fn run(args: &[&str], env: &[(&str, &str)], stdin: &str) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_skillquiz-mailer"));
    command
        .args(args)
        .env("RUST_LOG", "off")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for var in SMTP_VARS {
        command.env_remove(var);
    }
    command.envs(env.iter().copied());

    let mut child = command.spawn().unwrap();
    child
        .stdin
        .take()
        .unwrap()
        .write_all(stdin.as_bytes())
        .unwrap();
    child.wait_with_output().unwrap()
}

fn error_message(output: &Output) -> String {
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    value["error"].as_str().unwrap().to_string()
}

const REJECTION: &str = r#"{"template":"rejection","to":"ada@tech.edu","name":"Ada",
    "collegeName":"Tech U","reason":"Incomplete application"}"#;

#[test]
fn malformed_request_exits_with_error_json() {
    let output = run(&["request"], &[], "{not json");

    assert_eq!(output.status.code(), Some(1));
    assert!(error_message(&output).starts_with("parsing template request"));
}

#[test]
fn missing_configuration_lists_every_problem() {
    let output = run(&["request"], &[], REJECTION);

    assert_eq!(output.status.code(), Some(1));
    let message = error_message(&output);
    assert!(message.contains("SMTP server is required"));
    assert!(message.contains("SMTP username is required"));
    assert!(message.contains("SMTP password is required"));
}

#[test]
fn password_never_printed() {
    let output = run(
        &["request"],
        &[("SMTP_USER", "bot@example.com"), ("SMTP_PASSWORD", "hunter2-secret")],
        REJECTION,
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(!String::from_utf8_lossy(&output.stdout).contains("hunter2-secret"));
    assert!(!String::from_utf8_lossy(&output.stderr).contains("hunter2-secret"));
}

#[test]
fn dry_run_needs_only_a_sender() {
    let output = run(
        &["--dry-run", "request"],
        &[
            ("SMTP_USER", "bot@example.com"),
            ("APP_LOGIN_URL", "https://quiz.example.com/"),
        ],
        REJECTION,
    );

    assert_eq!(output.status.code(), Some(0));
    let message = String::from_utf8(output.stdout).unwrap();
    assert!(message.starts_with("From: Skill Quiz Lab <bot@example.com>\r\n"));
    assert!(message.contains("To: ada@tech.edu\r\n"));
    assert!(message.contains("Subject: Update on Your Skill Quiz Lab Connection Request\r\n"));
    assert!(message.contains("Incomplete application"));
}

#[test]
fn dry_run_without_sender_fails() {
    let output = run(
        &["rejection", "--dry-run", "--to", "ada@tech.edu", "--name", "Ada", "--college", "Tech U"],
        &[],
        "",
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(error_message(&output).contains("Sender address is required"));
}

#[test]
fn dry_run_rejects_bad_recipient() {
    let output = run(
        &["--dry-run", "credentials", "--to", "nobody", "--name", "Ada", "--college", "Tech U",
          "--email", "ada@tech.edu", "--password", "pw"],
        &[("SMTP_FROM", "noreply@example.com")],
        "",
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(error_message(&output).contains("Invalid email address"));
}
