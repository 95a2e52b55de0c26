use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ledgergate_events::{NotificationPublisher, PublishError, TransferNotification, TransferNotifier};

use super::backoff;

/// How hard the worker tries before dropping a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Publish attempts per notification, including the first.
    pub max_attempts: u32,
    /// Upper bound on waiting for one broker confirm.
    pub publish_timeout: Duration,
    pub retry_base_delay: Duration,
    pub retry_max_delay: Duration,
    pub queue_capacity: usize,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            publish_timeout: Duration::from_secs(2),
            retry_base_delay: Duration::from_millis(100),
            retry_max_delay: Duration::from_secs(2),
            queue_capacity: 1024,
        }
    }
}

/// Queue-backed [`TransferNotifier`].
///
/// `notify` never waits: it enqueues or drops. A single worker task drains the
/// queue in order and publishes with bounded retries.
pub struct NotificationDispatcher {
    sender: Mutex<Option<mpsc::Sender<TransferNotification>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    publisher: Arc<dyn NotificationPublisher>,
    dropped: AtomicU64,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("dropped", &self.dropped())
            .finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    /// Start the delivery worker on the current tokio runtime.
    pub fn spawn(publisher: Arc<dyn NotificationPublisher>, policy: DeliveryPolicy) -> Self {
        let (tx, rx) = mpsc::channel(policy.queue_capacity.max(1));
        let worker = tokio::spawn(run_worker(rx, publisher.clone(), policy));

        Self {
            sender: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            publisher,
            dropped: AtomicU64::new(0),
        }
    }

    /// Notifications discarded because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Stop accepting notifications, drain the queue, then close the publisher.
    ///
    /// Idempotent.
    pub async fn shutdown(&self) {
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());

        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "notification worker aborted");
            }
            self.publisher.close().await;
            info!(dropped = self.dropped(), "notification dispatcher stopped");
        }
    }
}

impl TransferNotifier for NotificationDispatcher {
    fn notify(&self, notification: TransferNotification) {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!(
                transaction_id = %notification.transaction_id,
                "dispatcher stopped; notification dropped"
            );
            return;
        };

        match sender.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(n)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(transaction_id = %n.transaction_id, "notification queue full; dropped");
            }
            Err(TrySendError::Closed(n)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(transaction_id = %n.transaction_id, "notification worker gone; dropped");
            }
        }
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<TransferNotification>,
    publisher: Arc<dyn NotificationPublisher>,
    policy: DeliveryPolicy,
) {
    while let Some(notification) = rx.recv().await {
        // Failures are logged inside; the event is dropped either way.
        let _ = deliver(publisher.as_ref(), &notification, &policy).await;
    }
    debug!("notification queue closed and drained");
}

/// Publish one notification with bounded, timed attempts.
///
/// Returns the number of attempts on success.
pub(crate) async fn deliver(
    publisher: &dyn NotificationPublisher,
    notification: &TransferNotification,
    policy: &DeliveryPolicy,
) -> Result<u32, PublishError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let outcome = match tokio::time::timeout(policy.publish_timeout, publisher.publish(notification)).await {
            Ok(result) => result,
            // A lost confirm may still have been persisted; retrying keeps
            // delivery at-least-once.
            Err(_) => Err(PublishError::Connection(format!(
                "no confirm within {}ms",
                policy.publish_timeout.as_millis()
            ))),
        };

        match outcome {
            Ok(()) => {
                info!(
                    transaction_id = %notification.transaction_id,
                    attempt,
                    "notification published"
                );
                return Ok(attempt);
            }
            Err(e) if e.is_retriable() && attempt < max_attempts => {
                let delay = backoff(policy.retry_base_delay, attempt, policy.retry_max_delay);
                warn!(
                    transaction_id = %notification.transaction_id,
                    attempt,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "notification publish failed; retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                error!(
                    transaction_id = %notification.transaction_id,
                    attempt,
                    error = %e,
                    "notification publish failed; dropping"
                );
                return Err(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ledgergate_events::InMemoryPublisher;

    fn fast_policy() -> DeliveryPolicy {
        DeliveryPolicy {
            max_attempts: 3,
            publish_timeout: Duration::from_millis(50),
            retry_base_delay: Duration::from_millis(1),
            retry_max_delay: Duration::from_millis(5),
            queue_capacity: 8,
        }
    }

    fn sample(id: &str) -> TransferNotification {
        TransferNotification::transaction("alice@example.com", id, 500)
    }

    /// Never answers, like a broker that swallowed the confirm.
    struct SilentPublisher;

    #[async_trait]
    impl NotificationPublisher for SilentPublisher {
        async fn publish(&self, _: &TransferNotification) -> Result<(), PublishError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried() {
        let publisher = InMemoryPublisher::failing(2);
        let attempts = deliver(&publisher, &sample("t-1"), &fast_policy()).await.unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(publisher.published(), vec![sample("t-1")]);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let publisher = InMemoryPublisher::failing(10);
        let err = deliver(&publisher, &sample("t-1"), &fast_policy()).await.unwrap_err();

        assert!(matches!(err, PublishError::Connection(_)));
        assert_eq!(publisher.attempts(), 3);
        assert!(publisher.published().is_empty());
    }

    #[tokio::test]
    async fn broker_refusal_is_not_retried() {
        let publisher = InMemoryPublisher::new();
        publisher.close().await;

        let err = deliver(&publisher, &sample("t-1"), &fast_policy()).await.unwrap_err();
        assert_eq!(err, PublishError::Closed);
        assert_eq!(publisher.attempts(), 1);
    }

    #[tokio::test]
    async fn missing_confirm_times_out_each_attempt() {
        let mut policy = fast_policy();
        policy.max_attempts = 2;
        policy.publish_timeout = Duration::from_millis(10);

        let err = deliver(&SilentPublisher, &sample("t-1"), &policy).await.unwrap_err();
        assert!(err.to_string().contains("no confirm within 10ms"));
    }

    #[tokio::test]
    async fn shutdown_drains_queue_and_closes_publisher() {
        let publisher = Arc::new(InMemoryPublisher::failing(1));
        let dispatcher = NotificationDispatcher::spawn(publisher.clone(), fast_policy());

        dispatcher.notify(sample("t-1"));
        dispatcher.notify(sample("t-2"));
        dispatcher.shutdown().await;

        assert_eq!(publisher.published(), vec![sample("t-1"), sample("t-2")]);
        assert!(publisher.is_closed());
        assert_eq!(dispatcher.dropped(), 0);

        dispatcher.notify(sample("t-3"));
        assert_eq!(dispatcher.dropped(), 1);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_blocking() {
        let mut policy = fast_policy();
        policy.queue_capacity = 1;
        policy.max_attempts = 1;
        policy.publish_timeout = Duration::from_millis(200);
        let dispatcher = NotificationDispatcher::spawn(Arc::new(SilentPublisher), policy);

        for i in 0..5 {
            dispatcher.notify(sample(&format!("t-{i}")));
        }

        // The worker holds at most one in flight and one queued.
        assert!(dispatcher.dropped() >= 3);
        dispatcher.shutdown().await;
    }
}
