use crate::domain::notification::Notification;
use crate::domain::ports::NotificationChannelBox;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Sending half of the notification queue.
///
/// `send` never waits: the message is queued for the dispatcher task or, if
/// the queue is full or closed, dropped with a warning.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<Notification>,
}

impl Notifier {
    /// Starts the dispatcher task that drains the queue into `channel`.
    ///
    /// The task ends once every `Notifier` clone has been dropped and the
    /// queue is empty, so awaiting the handle flushes pending messages.
    pub fn spawn(channel: NotificationChannelBox, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Notification>(capacity.max(1));
        let handle = tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                match channel.deliver(&notification).await {
                    Ok(()) => debug!(
                        kind = notification.kind.as_str(),
                        recipient = %notification.recipient,
                        "notification delivered"
                    ),
                    Err(e) => error!(
                        kind = notification.kind.as_str(),
                        recipient = %notification.recipient,
                        error = %e,
                        "failed to deliver notification"
                    ),
                }
            }
        });
        (Self { tx }, handle)
    }

    pub fn send(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => warn!(
                kind = n.kind.as_str(),
                recipient = %n.recipient,
                "notification queue full, dropping message"
            ),
            Err(TrySendError::Closed(n)) => warn!(
                kind = n.kind.as_str(),
                recipient = %n.recipient,
                "notification dispatcher stopped, dropping message"
            ),
        }
    }
}
