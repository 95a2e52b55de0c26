//! In-memory publisher/notifier for tests and local runs.

use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;

use crate::notification::TransferNotification;
use crate::publisher::{NotificationPublisher, PublishError, TransferNotifier};

/// Publisher that keeps confirmed messages in memory.
///
/// - No IO
/// - Can be told to fail the next `n` publishes, to exercise retry paths
#[derive(Debug, Default)]
pub struct InMemoryPublisher {
    published: Mutex<Vec<TransferNotification>>,
    failures_left: AtomicU32,
    attempts: AtomicU32,
    closed: AtomicBool,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` publish attempts with a connection error.
    pub fn failing(n: u32) -> Self {
        let p = Self::default();
        p.failures_left.store(n, Ordering::SeqCst);
        p
    }

    pub fn published(&self) -> Vec<TransferNotification> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Every publish call, successful or not.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationPublisher for InMemoryPublisher {
    async fn publish(&self, notification: &TransferNotification) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self.closed.load(Ordering::SeqCst) {
            return Err(PublishError::Closed);
        }

        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(PublishError::Connection("simulated broker outage".to_string()));
        }

        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Notifier that records hand-offs synchronously.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<TransferNotification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<TransferNotification> {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl TransferNotifier for RecordingNotifier {
    fn notify(&self, notification: TransferNotification) {
        self.received
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TransferNotification {
        TransferNotification::transaction("bob@example.com", "t-1", 10)
    }

    #[tokio::test]
    async fn failing_publisher_recovers_after_n_attempts() {
        let publisher = InMemoryPublisher::failing(2);

        assert!(publisher.publish(&sample()).await.is_err());
        assert!(publisher.publish(&sample()).await.is_err());
        assert!(publisher.publish(&sample()).await.is_ok());

        assert_eq!(publisher.attempts(), 3);
        assert_eq!(publisher.published(), vec![sample()]);
    }

    #[tokio::test]
    async fn closed_publisher_refuses_messages() {
        let publisher = InMemoryPublisher::new();
        publisher.close().await;

        assert_eq!(publisher.publish(&sample()).await, Err(PublishError::Closed));
        assert!(publisher.published().is_empty());
    }

    #[test]
    fn recording_notifier_keeps_hand_off_order() {
        let notifier = RecordingNotifier::new();
        notifier.notify(TransferNotification::transaction("a@x", "1", 1));
        notifier.notify(TransferNotification::transaction("b@x", "2", 2));

        let ids: Vec<_> = notifier
            .received()
            .into_iter()
            .map(|n| n.transaction_id)
            .collect();
        assert_eq!(ids, vec!["1", "2"]);
    }
}
