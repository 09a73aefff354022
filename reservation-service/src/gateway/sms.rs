use anyhow::{anyhow, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SmsReceipt {
    pub response: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    to: &'a str,
    message: &'a str,
    sender: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_ref: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SendRequest<'a> {
    messages: Vec<OutboundMessage<'a>>,
}

#[derive(Clone)]
pub struct SmsClient {
    http: reqwest::Client,
    api_url: String,
    username: String,
    password: String,
    sender: String,
}

impl SmsClient {
    pub fn new(
        api_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        sender: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_url: api_url.into(),
            username: username.into(),
            password: password.into(),
            sender: sender.into(),
        })
    }

    pub async fn send(&self, to: &str, text: &str, custom_ref: Option<&str>) -> Result<SmsReceipt> {
        let request = SendRequest {
            messages: vec![OutboundMessage {
                to,
                message: text,
                sender: &self.sender,
                custom_ref,
            }],
        };
        debug!("Sending SMS to {} (ref {:?})", to, custom_ref);

        let response = self
            .http
            .post(&self.api_url)
            .basic_auth(&self.username, Some(&self.password))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("SMS API returned {}: {}", status, body);
            return Err(anyhow!("SMS API returned {}: {}", status, body));
        }

        let response = response.json::<serde_json::Value>().await?;
        Ok(SmsReceipt { response })
    }
}
