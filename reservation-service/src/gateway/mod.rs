pub mod email;
pub mod sms;

#[cfg(test)]
pub mod recording;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::EmailMessage;

pub use email::SmtpMailer;
pub use sms::{SmsClient, SmsReceipt};

#[async_trait]
pub trait NotificationGateway: Send + Sync {
    async fn send_sms(&self, to: &str, text: &str, correlation_ref: &str) -> Result<SmsReceipt>;

    async fn send_email(&self, message: &EmailMessage) -> Result<()>;
}

pub struct Notifier {
    sms: SmsClient,
    mailer: Option<SmtpMailer>,
}

impl Notifier {
    pub fn new(sms: SmsClient, mailer: Option<SmtpMailer>) -> Self {
        Self { sms, mailer }
    }
}

#[async_trait]
impl NotificationGateway for Notifier {
    async fn send_sms(&self, to: &str, text: &str, correlation_ref: &str) -> Result<SmsReceipt> {
        self.sms.send(to, text, Some(correlation_ref)).await
    }

    async fn send_email(&self, message: &EmailMessage) -> Result<()> {
        match &self.mailer {
            Some(mailer) => mailer.send(message).await,
            None => Err(anyhow!("email transport is not configured")),
        }
    }
}
