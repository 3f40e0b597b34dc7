//! Outbound SMS delivery abstraction.
//!
//! The challenge service hands the plaintext code to an [`SmsSender`] and
//! never persists it. Delivery failures are the sender's concern; the core
//! does not retry. The default sender for local dev is [`LogSmsSender`],
//! which logs and returns `Ok(())`.

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Deliver a message or return an error.
    async fn send(&self, phone: &str, message: &str) -> Result<()>;
}

/// Local dev sender that logs instead of sending real SMS.
#[derive(Clone, Debug)]
pub struct LogSmsSender;

#[async_trait]
impl SmsSender for LogSmsSender {
    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        info!(phone = %mask_phone(phone), message = %message, "sms send stub");
        Ok(())
    }
}

/// Keep only the last four digits when a number reaches the logs.
fn mask_phone(phone: &str) -> String {
    let visible = phone.len().saturating_sub(4);
    phone
        .char_indices()
        .map(|(i, c)| if i < visible { '*' } else { c })
        .collect()
}
