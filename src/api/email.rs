//! Outbound email delivery abstraction.
//!
//! Registration and password-reset flows hand a message to an
//! [`EmailSender`]; delivery is the sender's concern and is not retried by
//! this core. The default sender for local dev is [`LogEmailSender`], which
//! logs and returns `Ok(())`.

use anyhow::Result;
use tracing::info;

#[derive(Clone, Debug)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Email delivery abstraction.
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error.
    fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

impl EmailSender for LogEmailSender {
    fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "email send stub"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_sender_always_succeeds() {
        let message = EmailMessage {
            to: "ada@example.com".to_string(),
            subject: "Verify your email".to_string(),
            body: "https://custos.dev/verify-email#token=abc".to_string(),
        };
        assert!(LogEmailSender.send(&message).is_ok());
    }
}
