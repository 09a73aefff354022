use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::EmailMessage;
use std::collections::HashSet;
use std::sync::Mutex;

use super::{NotificationGateway, SmsReceipt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentSms {
    pub to: String,
    pub text: String,
    pub correlation_ref: String,
}

#[derive(Default)]
pub struct RecordingGateway {
    sms: Mutex<Vec<SentSms>>,
    emails: Mutex<Vec<EmailMessage>>,
    fail_all: bool,
    failing_numbers: HashSet<String>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail_all: true,
            ..Self::default()
        }
    }

    pub fn failing_for(numbers: &[&str]) -> Self {
        Self {
            failing_numbers: numbers.iter().map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn sms(&self) -> Vec<SentSms> {
        self.sms.lock().unwrap().clone()
    }

    pub fn emails(&self) -> Vec<EmailMessage> {
        self.emails.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    async fn send_sms(&self, to: &str, text: &str, correlation_ref: &str) -> Result<SmsReceipt> {
        self.sms.lock().unwrap().push(SentSms {
            to: to.to_string(),
            text: text.to_string(),
            correlation_ref: correlation_ref.to_string(),
        });
        if self.fail_all || self.failing_numbers.contains(to) {
            return Err(anyhow!("gateway rejected message to {}", to));
        }
        Ok(SmsReceipt {
            response: serde_json::json!({ "status": "complete" }),
        })
    }

    async fn send_email(&self, message: &EmailMessage) -> Result<()> {
        self.emails.lock().unwrap().push(message.clone());
        if self.fail_all {
            return Err(anyhow!("smtp unavailable"));
        }
        Ok(())
    }
}
