//! Redis Streams-backed notification publisher.
//!
//! ## Mapping
//!
//! - **Stream key**: `<exchange>:<routing_key>`, `notifications:email` by default
//! - **Persistence**: the stream append itself; entries survive until trimmed
//! - **Confirm**: the `XADD` reply (the new entry id). An error reply is a refusal
//! - **Fields**: `content_type`, `delivery_mode`, `message_id`, `timestamp`, `payload`
//!
//! One multiplexed connection is opened at startup and shared by every
//! publish. Startup retries with the [`ReconnectPolicy`] backoff. A broken
//! connection is dropped and re-opened by the next publish with a single
//! attempt and no sleep, so a publish always fits inside the dispatcher's
//! per-attempt timeout; the dispatcher's retry backoff spaces the attempts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use redis::aio::MultiplexedConnection;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use ledgergate_events::{NotificationPublisher, PublishError, TransferNotification};

use super::{BrokerRoute, backoff};

const CONTENT_TYPE: &str = "application/json";
const DELIVERY_MODE_PERSISTENT: &str = "persistent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        }
    }
}

pub struct RedisStreamsPublisher {
    client: redis::Client,
    stream_key: String,
    reconnect: ReconnectPolicy,
    connection: Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for RedisStreamsPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStreamsPublisher")
            .field("stream_key", &self.stream_key)
            .field("reconnect", &self.reconnect)
            .finish_non_exhaustive()
    }
}

impl RedisStreamsPublisher {
    /// Create a publisher for `route`. No connection is made yet; call
    /// [`RedisStreamsPublisher::connect`] at startup.
    ///
    /// * `redis_url` - e.g. `redis://localhost:6379`
    pub fn new(
        redis_url: impl AsRef<str>,
        route: &BrokerRoute,
        reconnect: ReconnectPolicy,
    ) -> Result<Self, PublishError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        Ok(Self {
            client,
            stream_key: route.stream_key(),
            reconnect,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
        })
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    /// Establish the shared connection, retrying per the reconnect policy.
    pub async fn connect(&self) -> Result<(), PublishError> {
        self.connection(self.reconnect.max_attempts).await.map(|_| ())
    }

    /// The live connection, (re)connecting with up to `max_attempts` tries
    /// if there is none.
    async fn connection(&self, max_attempts: u32) -> Result<MultiplexedConnection, PublishError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(PublishError::Closed);
        }

        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let max_attempts = max_attempts.max(1);
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get_multiplexed_async_connection().await {
                Ok(conn) => {
                    info!(stream_key = %self.stream_key, attempt, "broker connection established");
                    *slot = Some(conn.clone());
                    return Ok(conn);
                }
                Err(e) if attempt < max_attempts => {
                    let delay = backoff(self.reconnect.base_delay, attempt, self.reconnect.max_delay);
                    warn!(attempt, error = %e, retry_in_ms = delay.as_millis() as u64, "broker connect failed");
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    return Err(PublishError::Connection(format!(
                        "giving up after {attempt} attempts: {e}"
                    )));
                }
            }
        }
    }

    async fn invalidate(&self) {
        if self.connection.lock().await.take().is_some() {
            debug!(stream_key = %self.stream_key, "broker connection discarded");
        }
    }
}

fn is_connection_failure(e: &redis::RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

#[async_trait]
impl NotificationPublisher for RedisStreamsPublisher {
    #[instrument(
        skip(self, notification),
        fields(stream_key = %self.stream_key, transaction_id = %notification.transaction_id),
        err
    )]
    async fn publish(&self, notification: &TransferNotification) -> Result<(), PublishError> {
        let payload = notification
            .to_json()
            .map_err(|e| PublishError::Serialization(e.to_string()))?;

        let mut conn = self.connection(1).await?;

        let reply: Result<String, redis::RedisError> = redis::cmd("XADD")
            .arg(&self.stream_key)
            .arg("*")
            .arg("content_type")
            .arg(CONTENT_TYPE)
            .arg("delivery_mode")
            .arg(DELIVERY_MODE_PERSISTENT)
            .arg("message_id")
            .arg(Uuid::now_v7().to_string())
            .arg("timestamp")
            .arg(Utc::now().timestamp())
            .arg("payload")
            .arg(&payload)
            .query_async(&mut conn)
            .await;

        match reply {
            Ok(entry_id) => {
                debug!(%entry_id, "broker confirmed");
                Ok(())
            }
            Err(e) if is_connection_failure(&e) => {
                self.invalidate().await;
                Err(PublishError::Connection(format!("XADD failed: {e}")))
            }
            Err(e) => Err(PublishError::Rejected(format!("XADD failed: {e}"))),
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if self.connection.lock().await.take().is_some() {
            info!(stream_key = %self.stream_key, "broker connection closed");
        }
    }
}
