//! Process configuration, read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use ledgergate_accounting::GatewayConfig;
use ledgergate_core::DisplayClock;

use crate::notify::{BrokerRoute, DEFAULT_EXCHANGE, DEFAULT_ROUTING_KEY, DeliveryPolicy};

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:50051";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}='{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifySettings {
    pub redis_url: String,
    pub route: BrokerRoute,
    pub delivery: DeliveryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub listen_addr: SocketAddr,
    pub display_offset_minutes: i32,
    pub engine_timeout: Duration,
    pub page_size: u32,
    /// `None` disables notifications.
    pub notify: Option<NotifySettings>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let page_size: u32 = env.parse_or("LEDGERGATE_PAGE_SIZE", 40)?;
        if page_size == 0 {
            return Err(ConfigError::Invalid {
                key: "LEDGERGATE_PAGE_SIZE",
                value: "0".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }

        let display_offset_minutes = env.parse_or(
            "LEDGERGATE_DISPLAY_UTC_OFFSET_MINUTES",
            DisplayClock::DEFAULT_OFFSET_MINUTES,
        )?;
        DisplayClock::from_offset_minutes(display_offset_minutes).map_err(|e| ConfigError::Invalid {
            key: "LEDGERGATE_DISPLAY_UTC_OFFSET_MINUTES",
            value: display_offset_minutes.to_string(),
            reason: e.to_string(),
        })?;

        let notify = match env.get("NOTIFY_REDIS_URL") {
            None => {
                warn!("NOTIFY_REDIS_URL not set; transfer notifications disabled");
                None
            }
            Some(redis_url) => {
                let defaults = DeliveryPolicy::default();
                Some(NotifySettings {
                    redis_url,
                    route: BrokerRoute::new(
                        env.get("NOTIFY_EXCHANGE").unwrap_or_else(|| DEFAULT_EXCHANGE.to_string()),
                        env.get("NOTIFY_ROUTING_KEY")
                            .unwrap_or_else(|| DEFAULT_ROUTING_KEY.to_string()),
                    ),
                    delivery: DeliveryPolicy {
                        max_attempts: env.parse_or("NOTIFY_MAX_ATTEMPTS", defaults.max_attempts)?,
                        publish_timeout: env.millis_or("NOTIFY_PUBLISH_TIMEOUT_MS", defaults.publish_timeout)?,
                        queue_capacity: env.parse_or("NOTIFY_QUEUE_CAPACITY", defaults.queue_capacity)?,
                        ..defaults
                    },
                })
            }
        };

        Ok(Self {
            listen_addr: env.parse_or_str("LEDGERGATE_LISTEN_ADDR", DEFAULT_LISTEN_ADDR)?,
            display_offset_minutes,
            engine_timeout: env.millis_or("LEDGERGATE_ENGINE_TIMEOUT_MS", Duration::from_secs(5))?,
            page_size,
            notify,
        })
    }

    pub fn gateway_config(&self) -> Result<GatewayConfig, ConfigError> {
        let display_clock =
            DisplayClock::from_offset_minutes(self.display_offset_minutes).map_err(|e| {
                ConfigError::Invalid {
                    key: "LEDGERGATE_DISPLAY_UTC_OFFSET_MINUTES",
                    value: self.display_offset_minutes.to_string(),
                    reason: e.to_string(),
                }
            })?;

        Ok(GatewayConfig {
            page_size: self.page_size,
            engine_timeout: self.engine_timeout,
            display_clock,
        })
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Trimmed value; empty counts as unset.
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_or<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn parse_or_str<T>(&self, key: &'static str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.get(key).unwrap_or_else(|| default.to_string());
        value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        })
    }

    fn millis_or(&self, key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(_) => self.parse_or::<u64>(key, 0).map(Duration::from_millis),
        }
    }
}
