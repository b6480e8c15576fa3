//! Core SMTP types.

mod address;
mod endpoint;
mod extension;
mod reply;

pub use address::{Address, Mailbox};
pub use endpoint::{Credentials, SmtpEndpoint};
pub use extension::{AuthMechanism, Extension};
pub use reply::{Reply, ReplyCode};
