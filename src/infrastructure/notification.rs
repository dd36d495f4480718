use crate::domain::notification::Notification;
use crate::domain::ports::NotificationChannel;
use crate::error::{OrderError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::info;

/// Writes every notification to the log instead of sending it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            kind = notification.kind.as_str(),
            recipient = %notification.recipient,
            subject = %notification.subject,
            "notification sent"
        );
        Ok(())
    }
}

/// Keeps delivered notifications in memory. Clones share the same record.
#[derive(Debug, Default, Clone)]
pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<Notification>>>,
    attempts: Arc<AtomicUsize>,
    failing: bool,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel whose every delivery fails.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub async fn sent(&self) -> Vec<Notification> {
        self.sent.lock().await.clone()
    }

    /// Deliveries attempted, failed ones included.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(OrderError::InternalError(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "mail relay unavailable",
            ))));
        }
        self.sent.lock().await.push(notification.clone());
        Ok(())
    }
}
