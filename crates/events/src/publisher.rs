//! Notification publishing contract (mechanics only).
//!
//! Two seams live here:
//!
//! - [`NotificationPublisher`]: the broker client. One long-lived instance per
//!   process; `publish` returns only after the broker confirmed (or refused)
//!   the message.
//! - [`TransferNotifier`]: the capability the gateway is handed. `notify` must
//!   never block and never fail; delivery happens elsewhere.
//!
//! ```text
//! LedgerGateway ──notify()──▶ TransferNotifier (queue) ──publish()──▶ NotificationPublisher ──▶ broker
//! ```
//!
//! Delivery is best-effort and at-least-once: a confirmed publish may still be
//! retried after a lost confirm, so the downstream consumer must tolerate
//! duplicates (the `transactionId` is the natural dedupe key).

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::notification::TransferNotification;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The broker could not be reached (or the connection dropped mid-call).
    #[error("broker connection error: {0}")]
    Connection(String),

    /// The broker answered but refused the message (negative confirm).
    #[error("broker rejected message: {0}")]
    Rejected(String),

    #[error("failed to serialize notification: {0}")]
    Serialization(String),

    /// The publisher was closed at shutdown.
    #[error("publisher closed")]
    Closed,
}

impl PublishError {
    /// Connection-level failures are worth another attempt; refusals are not.
    pub fn is_retriable(&self) -> bool {
        matches!(self, PublishError::Connection(_))
    }
}

/// Broker client used to deliver transfer notifications.
///
/// Implementations must be safe to share across tasks: a single instance is
/// created at startup and used by every publish until `close` is called.
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, notification: &TransferNotification) -> Result<(), PublishError>;

    /// Release the broker connection. Later publishes fail with [`PublishError::Closed`].
    async fn close(&self) {}
}

#[async_trait]
impl<P> NotificationPublisher for Arc<P>
where
    P: NotificationPublisher + ?Sized,
{
    async fn publish(&self, notification: &TransferNotification) -> Result<(), PublishError> {
        (**self).publish(notification).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

/// Fire-and-forget hand-off used by the gateway after a committed transfer.
pub trait TransferNotifier: Send + Sync {
    fn notify(&self, notification: TransferNotification);
}

impl<N> TransferNotifier for Arc<N>
where
    N: TransferNotifier + ?Sized,
{
    fn notify(&self, notification: TransferNotification) {
        (**self).notify(notification)
    }
}

/// Notifier used when no broker is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

impl TransferNotifier for DisabledNotifier {
    fn notify(&self, notification: TransferNotification) {
        debug!(
            transaction_id = %notification.transaction_id,
            "notifications disabled; event not published"
        );
    }
}
