use anyhow::Result;
use async_trait::async_trait;
use shared::EmailMessage;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::gateway::NotificationGateway;

const BATCH_SIZE: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailJob {
    pub id: Uuid,
    pub message: EmailMessage,
}

impl EmailJob {
    pub fn new(message: EmailMessage) -> Self {
        Self {
            id: Uuid::new_v4(),
            message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailOutcome {
    Sent,
    Failed(String),
}

impl EmailOutcome {
    pub fn state(&self) -> &'static str {
        match self {
            EmailOutcome::Sent => "sent",
            EmailOutcome::Failed(_) => "failed",
        }
    }

    pub fn error(&self) -> Option<String> {
        match self {
            EmailOutcome::Sent => None,
            EmailOutcome::Failed(reason) => Some(reason.clone()),
        }
    }
}

#[async_trait]
pub trait EmailOutbox: Send + Sync {
    async fn enqueue(&self, job: &EmailJob) -> Result<()>;

    async fn pending(&self, limit: i64) -> Result<Vec<EmailJob>>;

    async fn mark_processed(&self, id: Uuid, outcome: &EmailOutcome) -> Result<()>;
}

pub struct EmailOutboxProcessor {
    outbox: Arc<dyn EmailOutbox>,
    gateway: Arc<dyn NotificationGateway>,
    poll_interval: Duration,
}

impl EmailOutboxProcessor {
    pub fn new(
        outbox: Arc<dyn EmailOutbox>,
        gateway: Arc<dyn NotificationGateway>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            outbox,
            gateway,
            poll_interval,
        }
    }

    pub async fn run(&self) {
        let mut interval = time::interval(self.poll_interval);

        loop {
            interval.tick().await;

            if let Err(e) = self.process_pending_emails().await {
                error!("Error processing email outbox: {}", e);
            }
        }
    }

    /// Sends every pending job once; failures are recorded, not retried.
    pub async fn process_pending_emails(&self) -> Result<usize> {
        let jobs = self.outbox.pending(BATCH_SIZE).await?;
        let count = jobs.len();

        for job in jobs {
            let outcome = match self.gateway.send_email(&job.message).await {
                Ok(()) => {
                    info!("Confirmation email {} sent to {}", job.id, job.message.to);
                    EmailOutcome::Sent
                }
                Err(e) => {
                    warn!("Confirmation email {} to {} failed: {}", job.id, job.message.to, e);
                    EmailOutcome::Failed(e.to_string())
                }
            };

            if let Err(e) = self.outbox.mark_processed(job.id, &outcome).await {
                error!("Failed to record outcome of email {}: {}", job.id, e);
            }
        }

        Ok(count)
    }
}
