//! Outgoing mail.
//!
//! Templates use `{{name}}` placeholders; rendering fails on any placeholder
//! without a value so half-filled mails never go out.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MailError {
    #[error("template placeholder '{0}' has no value")]
    MissingPlaceholder(String),

    #[error("template has an unterminated placeholder")]
    UnterminatedPlaceholder,

    #[error("invalid recipient '{0}'")]
    InvalidRecipient(String),

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailTemplate {
    pub name: &'static str,
    pub subject: &'static str,
    pub body: &'static str,
}

impl MailTemplate {
    pub const WELCOME: MailTemplate = MailTemplate {
        name: "welcome",
        subject: "Welcome to Stockroom, {{display_name}}",
        body: "Hello {{display_name}},\n\n\
               An account has been created for you.\n\
               Username: {{username}}\n\
               Roles: {{roles}}\n\n\
               Sign in and change your password at your earliest convenience.\n",
    };

    pub const SALE_RECEIPT: MailTemplate = MailTemplate {
        name: "sale_receipt",
        subject: "Your receipt {{sale_id}}",
        body: "Dear {{customer_name}},\n\n\
               Thank you for your purchase.\n\n\
               {{lines}}\n\
               Subtotal: {{subtotal}}\n\
               Discount: {{discount}}\n\
               Total: {{total}}\n",
    };

    pub fn render(
        &self,
        from: &str,
        to: &str,
        vars: &BTreeMap<&str, String>,
    ) -> Result<Email, MailError> {
        if stockroom_core::error::validate_email(to).is_err() {
            return Err(MailError::InvalidRecipient(to.to_string()));
        }
        Ok(Email {
            from: from.to_string(),
            to: to.to_string(),
            subject: render(self.subject, vars)?,
            body: render(self.body, vars)?,
        })
    }
}

/// Substitute `{{name}}` placeholders (surrounding whitespace inside the braces is ignored).
pub fn render(template: &str, vars: &BTreeMap<&str, String>) -> Result<String, MailError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(MailError::UnterminatedPlaceholder)?;
        let name = after[..end].trim();
        let value = vars
            .get(name)
            .ok_or_else(|| MailError::MissingPlaceholder(name.to_string()))?;
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Logs mail instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct TracingMailer;

#[async_trait]
impl Mailer for TracingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        info!(
            from = %email.from,
            to = %email.to,
            subject = %email.subject,
            body_len = email.body.len(),
            "mail dispatched"
        );
        Ok(())
    }
}

/// Keeps sent mail in memory; can be told to fail every delivery.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Delivery("recording mailer set to fail".to_string()));
        }
        self.sent
            .lock()
            .map_err(|_| MailError::Delivery("lock poisoned".to_string()))?
            .push(email);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&'static str, &str)]) -> BTreeMap<&'static str, String> {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn render_substitutes_placeholders() {
        let out = render("Hi {{ name }}, you owe {{amount}}.", &vars(&[("name", "Ann"), ("amount", "10.00")]))
            .unwrap();
        assert_eq!(out, "Hi Ann, you owe 10.00.");
    }

    #[test]
    fn render_rejects_missing_and_unterminated() {
        assert_eq!(
            render("Hi {{name}}", &BTreeMap::new()),
            Err(MailError::MissingPlaceholder("name".into()))
        );
        assert_eq!(
            render("Hi {{name", &vars(&[("name", "x")])),
            Err(MailError::UnterminatedPlaceholder)
        );
    }

    #[test]
    fn welcome_template_renders_fully() {
        let email = MailTemplate::WELCOME
            .render(
                "no-reply@stockroom.local",
                "ann@example.com",
                &vars(&[("display_name", "Ann"), ("username", "ann"), ("roles", "staff")]),
            )
            .unwrap();
        assert_eq!(email.subject, "Welcome to Stockroom, Ann");
        assert!(email.body.contains("Username: ann"));
        assert!(!email.body.contains("{{"));
    }

    #[test]
    fn invalid_recipient_is_rejected() {
        let err = MailTemplate::WELCOME
            .render("a@b.c", "not-an-address", &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, MailError::InvalidRecipient(_)));
    }

    #[tokio::test]
    async fn recording_mailer_records_and_can_fail() {
        let mailer = RecordingMailer::new();
        let email = Email {
            from: "a@b.c".into(),
            to: "d@e.f".into(),
            subject: "s".into(),
            body: "b".into(),
        };
        mailer.send(email.clone()).await.unwrap();
        assert_eq!(mailer.sent(), vec![email.clone()]);

        let failing = RecordingMailer::failing();
        assert!(failing.send(email).await.is_err());
        assert!(failing.sent().is_empty());
    }
}
