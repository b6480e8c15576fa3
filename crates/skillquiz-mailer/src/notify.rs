//! Notification dispatch for side effects that have already committed.
//!
//! An approval or rejection is recorded before its email goes out. A failed
//! send must not undo that, so [`notify`] reports failure as a
//! [`Notice::Warning`] instead of an error.

use crate::service::Mailer;
use crate::template::Template;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of a notification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Notice {
    /// Delivered to the server.
    Sent {
        /// Recipient address.
        recipient: String,
    },
    /// Not delivered; the caller should surface this as a secondary warning.
    Warning {
        /// Recipient address.
        recipient: String,
        /// Human-readable failure.
        reason: String,
    },
}

impl Notice {
    /// Whether the email went out.
    #[must_use]
    pub const fn is_sent(&self) -> bool {
        matches!(self, Self::Sent { .. })
    }
}

/// Sends `template`, downgrading any failure to a warning.
pub async fn notify(mailer: &Mailer, template: &Template) -> Notice {
    let recipient = template.recipient().to_string();
    match mailer.send_template(template).await {
        Ok(()) => {
            info!(template = template.kind(), %recipient, "notification sent");
            Notice::Sent { recipient }
        }
        Err(e) => {
            warn!(
                template = template.kind(),
                %recipient,
                kind = e.kind(),
                transient = e.is_transient(),
                permanent = e.is_permanent(),
                error = %e,
                "notification not sent"
            );
            Notice::Warning {
                recipient,
                reason: e.to_string(),
            }
        }
    }
}
