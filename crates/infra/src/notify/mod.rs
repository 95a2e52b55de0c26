//! Transfer notification delivery.
//!
//! The gateway only sees a [`TransferNotifier`](ledgergate_events::TransferNotifier).
//! [`NotificationDispatcher`] is that notifier: it queues hand-offs and a
//! background worker publishes them through a
//! [`NotificationPublisher`](ledgergate_events::NotificationPublisher), e.g. the
//! Redis Streams one below.

mod dispatcher;
#[cfg(feature = "redis")]
mod redis_streams;

use std::time::Duration;

pub use dispatcher::{DeliveryPolicy, NotificationDispatcher};
#[cfg(feature = "redis")]
pub use redis_streams::{ReconnectPolicy, RedisStreamsPublisher};

pub const DEFAULT_EXCHANGE: &str = "notifications";
pub const DEFAULT_ROUTING_KEY: &str = "email";

/// Where notifications are published: an exchange plus a routing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerRoute {
    pub exchange: String,
    pub routing_key: String,
}

impl BrokerRoute {
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }

    /// Stream key the route maps to, `<exchange>:<routing_key>`.
    pub fn stream_key(&self) -> String {
        format!("{}:{}", self.exchange, self.routing_key)
    }
}

impl Default for BrokerRoute {
    fn default() -> Self {
        Self::new(DEFAULT_EXCHANGE, DEFAULT_ROUTING_KEY)
    }
}

/// Exponential backoff: `base * 2^(attempt-1)`, capped at `max`.
pub(crate) fn backoff(base: Duration, attempt: u32, max: Duration) -> Duration {
    let pow = 1u32 << attempt.saturating_sub(1).min(16);
    base.saturating_mul(pow).min(max)
}
