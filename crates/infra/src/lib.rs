//! Infrastructure layer: engine client, notification delivery, config.

pub mod config;
pub mod engine;
pub mod notify;


pub use config::{ConfigError, NotifySettings, Settings};
pub use engine::InMemoryEngine;
pub use notify::{BrokerRoute, DeliveryPolicy, NotificationDispatcher};
#[cfg(feature = "redis")]
pub use notify::{ReconnectPolicy, RedisStreamsPublisher};
