//! Outbound notification capability.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::permission::AccessLevel;

/// A document was shared with `recipient_email`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareNotice {
    pub recipient_email: String,
    pub sender_name: String,
    pub document_title: String,
    pub document_id: String,
    pub level: AccessLevel,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notifier is not configured: {0}")]
    NotConfigured(String),

    #[error("failed to build message: {0}")]
    Message(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}

/// Delivery of share and welcome messages. Callers treat every failure as
/// non-fatal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_share(&self, notice: &ShareNotice) -> Result<(), NotifyError>;

    async fn notify_welcome(&self, email: &str, name: &str) -> Result<(), NotifyError>;
}

/// Logs instead of sending.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify_share(&self, notice: &ShareNotice) -> Result<(), NotifyError> {
        info!(
            to = %notice.recipient_email,
            from = %notice.sender_name,
            document_id = %notice.document_id,
            level = %notice.level,
            "share notification"
        );
        Ok(())
    }

    async fn notify_welcome(&self, email: &str, name: &str) -> Result<(), NotifyError> {
        info!(to = %email, name, "welcome notification");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotice {
    Share(ShareNotice),
    Welcome { email: String, name: String },
}

/// Records every notice. Can be told to fail.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    sent: Mutex<Vec<SentNotice>>,
    failing: bool,
}

impl MemoryNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::default(),
            failing: true,
        }
    }

    pub async fn sent(&self) -> Vec<SentNotice> {
        self.sent.lock().await.clone()
    }

    async fn record(&self, notice: SentNotice) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError::Delivery("memory notifier set to fail".into()));
        }
        self.sent.lock().await.push(notice);
        Ok(())
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify_share(&self, notice: &ShareNotice) -> Result<(), NotifyError> {
        self.record(SentNotice::Share(notice.clone())).await
    }

    async fn notify_welcome(&self, email: &str, name: &str) -> Result<(), NotifyError> {
        self.record(SentNotice::Welcome {
            email: email.to_string(),
            name: name.to_string(),
        })
        .await
    }
}
