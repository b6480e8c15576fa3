//! Transactional email templates.
//!
//! Each [`Template`] variant carries the values one notice needs and renders
//! to a subject and an HTML body. Every interpolated value is HTML-escaped.

use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// A template request, as accepted on the command line or as JSON.
///
/// ```json
/// {"template": "rejection", "to": "a@b.edu", "name": "Ada",
///  "collegeName": "Tech U", "reason": "Incomplete details"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Template {
    /// Account approved; carries the generated login credentials.
    Credentials {
        /// Recipient address.
        to: String,
        /// Recipient's name.
        name: String,
        /// College whose connection request was approved.
        college_name: String,
        /// Login email for the new account.
        email: String,
        /// Generated password.
        password: String,
    },
    /// Connection request was not approved.
    Rejection {
        /// Recipient address.
        to: String,
        /// Recipient's name.
        name: String,
        /// College whose connection request was declined.
        college_name: String,
        /// Optional explanation shown to the recipient.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

/// Values shared by every template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    /// Product name used in subjects, headings and signatures.
    pub brand: String,
    /// Base URL of the application; the login link is `<url>/auth`.
    pub login_url: Option<String>,
    /// Year printed in the footer.
    pub year: i32,
}

/// Output of [`Template::render`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    /// Recipient address, unvalidated.
    pub to: String,
    /// Subject line.
    pub subject: String,
    /// Complete HTML document.
    pub html_body: String,
}

impl Template {
    /// Recipient address as given in the request.
    #[must_use]
    pub fn recipient(&self) -> &str {
        match self {
            Self::Credentials { to, .. } | Self::Rejection { to, .. } => to,
        }
    }

    /// Short name of the template, matching its JSON tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Credentials { .. } => "credentials",
            Self::Rejection { .. } => "rejection",
        }
    }

    /// Renders the subject and body.
    #[must_use]
    pub fn render(&self, ctx: &TemplateContext) -> RenderedEmail {
        let brand = escape(&ctx.brand);
        let (subject, content) = match self {
            Self::Credentials {
                name,
                college_name,
                email,
                password,
                ..
            } => (
                format!("Your {} Account Credentials", ctx.brand),
                credentials_body(ctx, &brand, name, college_name, email, password),
            ),
            Self::Rejection {
                name,
                college_name,
                reason,
                ..
            } => (
                format!("Update on Your {} Connection Request", ctx.brand),
                rejection_body(&brand, name, college_name, reason.as_deref()),
            ),
        };

        RenderedEmail {
            to: self.recipient().to_string(),
            html_body: layout(&brand, ctx.year, &content),
            subject,
        }
    }
}

fn credentials_body(
    ctx: &TemplateContext,
    brand: &str,
    name: &str,
    college_name: &str,
    email: &str,
    password: &str,
) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<h1>Welcome to {brand}</h1>\n\
         <p>Dear {},</p>\n\
         <p>Your connection request for <strong>{}</strong> has been approved. \
         Your account is ready; keep these details somewhere safe:</p>\n\
         <table class=\"credentials\">\n\
         <tr><th>Email</th><td>{}</td></tr>\n\
         <tr><th>Password</th><td><code>{}</code></td></tr>\n\
         </table>\n\
         <p><strong>Important:</strong> change this password after you first sign in.</p>\n",
        escape(name),
        escape(college_name),
        escape(email),
        escape(password),
    );
    if let Some(url) = ctx.login_url.as_deref().filter(|u| !u.is_empty()) {
        let _ = writeln!(
            html,
            "<p>Sign in at <a href=\"{}/auth\">{brand}</a>.</p>",
            escape(url.trim_end_matches('/'))
        );
    }
    let _ = writeln!(html, "<p>Best regards,<br>The {brand} Team</p>");
    html
}

fn rejection_body(brand: &str, name: &str, college_name: &str, reason: Option<&str>) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<h1>{brand} Connection Request</h1>\n\
         <p>Dear {},</p>\n\
         <p>Thank you for your interest in connecting <strong>{}</strong> to {brand}.</p>\n\
         <div class=\"status\">\n\
         <h3>Status: Not Approved</h3>\n\
         <p>After review, we are unable to approve the request at this time.</p>\n",
        escape(name),
        escape(college_name),
    );
    if let Some(reason) = reason.map(str::trim).filter(|r| !r.is_empty()) {
        let _ = writeln!(html, "<p><strong>Reason:</strong> {}</p>", escape(reason));
    }
    html.push_str("</div>\n");
    let _ = writeln!(
        html,
        "<p>You are welcome to contact us with questions or to apply again later.</p>\n\
         <p>Best regards,<br>The {brand} Team</p>"
    );
    html
}

fn layout(brand: &str, year: i32, content: &str) -> String {
    format!(
        "<!DOCTYPE html>\n\
         <html>\n\
         <head>\n\
         <meta charset=\"utf-8\">\n\
         <style>\n\
         body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}\n\
         .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}\n\
         .credentials th {{ text-align: left; padding-right: 12px; }}\n\
         .status {{ background: #fff4f4; border-left: 4px solid #d9534f; padding: 12px; }}\n\
         .footer {{ font-size: 12px; color: #777; margin-top: 24px; }}\n\
         </style>\n\
         </head>\n\
         <body>\n\
         <div class=\"container\">\n\
         {content}\
         <div class=\"footer\">\n\
         <p>&copy; {year} {brand}. All rights reserved.</p>\n\
         <p>This is an automated message; replies are not monitored.</p>\n\
         </div>\n\
         </div>\n\
         </body>\n\
         </html>\n"
    )
}

/// Escapes text for HTML element content and attribute values.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
