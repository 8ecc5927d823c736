//! Core configuration, read from `ORDER_*` environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `ORDER_SHARD_COUNT` | 3 |
//! | `ORDER_SHARD_BUFFER` | 64 |
//! | `ORDER_STORE_TIMEOUT_MS` | 2000 |
//! | `ORDER_SHARD_RETRY_ATTEMPTS` | 3 |
//! | `ORDER_SHARD_RETRY_BACKOFF_MS` | 50 |
//! | `ORDER_PRICING_URL` | unset |
//! | `ORDER_PRICING_TIMEOUT_MS` | 3000 |
//! | `ORDER_PUBLISH_TIMEOUT_MS` | 2000 |
//! | `ORDER_CACHE_TIMEOUT_MS` | 100 |
//! | `ORDER_CACHE_TTL_SECS` | 300 (0 disables expiry) |
//! | `ORDER_EVENT_TOPIC` | `order-topic` |
//! | `ORDER_EVENT_PARTITIONS` | 8 |
//! | `ORDER_REDIS_URL` | unset |
//! | `ORDER_REQUEST_DEADLINE_MS` | 10000 |
//! | `ORDER_SHUTDOWN_TIMEOUT_MS` | 5000 |

use crate::order_core::{CoreSettings, RetryPolicy};
use crate::router::{RouterError, ShardRouter};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{var}={value:?} is not valid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("ORDER_SHARD_COUNT: {0}")]
    ShardCount(#[from] RouterError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    /// Number of shards. Fixed for the life of the deployment.
    pub shard_count: usize,
    /// Request queue capacity per shard task.
    pub shard_buffer: usize,
    pub store_timeout: Duration,
    pub shard_retry: RetryPolicy,
    pub pricing_url: Option<String>,
    pub pricing_timeout: Duration,
    pub publish_timeout: Duration,
    pub cache_timeout: Duration,
    /// `None` keeps cache entries until invalidated.
    pub cache_ttl: Option<Duration>,
    pub event_topic: String,
    pub event_partitions: usize,
    pub redis_url: Option<String>,
    pub request_deadline: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let settings = CoreSettings::default();
        Self {
            shard_count: 3,
            shard_buffer: 64,
            store_timeout: Duration::from_millis(2000),
            shard_retry: settings.shard_retry,
            pricing_url: None,
            pricing_timeout: settings.pricing_timeout,
            publish_timeout: settings.publish_timeout,
            cache_timeout: settings.cache_timeout,
            cache_ttl: Some(Duration::from_secs(300)),
            event_topic: "order-topic".to_string(),
            event_partitions: 8,
            redis_url: None,
            request_deadline: settings.request_deadline,
            shutdown_timeout: Duration::from_millis(5000),
        }
    }
}

impl CoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`, which returns the raw value of a variable if set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let env = Env { lookup: &lookup };

        let shard_count: i64 = env.parse("ORDER_SHARD_COUNT", defaults.shard_count as i64)?;
        if shard_count <= 0 {
            return Err(RouterError::InvalidShardCount(shard_count).into());
        }

        let cache_ttl_secs: u64 = env.parse(
            "ORDER_CACHE_TTL_SECS",
            defaults.cache_ttl.map_or(0, |ttl| ttl.as_secs()),
        )?;

        Ok(Self {
            shard_count: shard_count as usize,
            shard_buffer: env.positive("ORDER_SHARD_BUFFER", defaults.shard_buffer as u64)? as usize,
            store_timeout: env.millis("ORDER_STORE_TIMEOUT_MS", defaults.store_timeout)?,
            shard_retry: RetryPolicy {
                attempts: env.positive("ORDER_SHARD_RETRY_ATTEMPTS", defaults.shard_retry.attempts as u64)?
                    as u32,
                backoff: Duration::from_millis(env.parse(
                    "ORDER_SHARD_RETRY_BACKOFF_MS",
                    defaults.shard_retry.backoff.as_millis() as u64,
                )?),
            },
            pricing_url: env.text("ORDER_PRICING_URL"),
            pricing_timeout: env.millis("ORDER_PRICING_TIMEOUT_MS", defaults.pricing_timeout)?,
            publish_timeout: env.millis("ORDER_PUBLISH_TIMEOUT_MS", defaults.publish_timeout)?,
            cache_timeout: env.millis("ORDER_CACHE_TIMEOUT_MS", defaults.cache_timeout)?,
            cache_ttl: (cache_ttl_secs > 0).then(|| Duration::from_secs(cache_ttl_secs)),
            event_topic: env.text("ORDER_EVENT_TOPIC").unwrap_or(defaults.event_topic),
            event_partitions: env.positive("ORDER_EVENT_PARTITIONS", defaults.event_partitions as u64)?
                as usize,
            redis_url: env.text("ORDER_REDIS_URL"),
            request_deadline: env.millis("ORDER_REQUEST_DEADLINE_MS", defaults.request_deadline)?,
            shutdown_timeout: env.millis("ORDER_SHUTDOWN_TIMEOUT_MS", defaults.shutdown_timeout)?,
        })
    }

    pub fn router(&self) -> Result<ShardRouter, RouterError> {
        ShardRouter::new(self.shard_count)
    }

    pub fn core_settings(&self) -> CoreSettings {
        CoreSettings {
            pricing_timeout: self.pricing_timeout,
            publish_timeout: self.publish_timeout,
            cache_timeout: self.cache_timeout,
            request_deadline: self.request_deadline,
            shard_retry: self.shard_retry,
        }
    }
}

struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    /// Trimmed, non-empty value.
    fn text(&self, var: &str) -> Option<String> {
        (self.lookup)(var)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse<T>(&self, var: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.text(var) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                var,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn positive(&self, var: &'static str, default: u64) -> Result<u64, ConfigError> {
        let value = self.parse(var, default)?;
        if value == 0 {
            return Err(ConfigError::Invalid {
                var,
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    }

    fn millis(&self, var: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        self.positive(var, default.as_millis() as u64)
            .map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<CoreConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        CoreConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.shard_count, 3);
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.core_settings(), CoreSettings::default());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("ORDER_SHARD_COUNT", "16"),
            ("ORDER_SHARD_RETRY_ATTEMPTS", "5"),
            ("ORDER_SHARD_RETRY_BACKOFF_MS", "0"),
            ("ORDER_CACHE_TTL_SECS", "0"),
            ("ORDER_EVENT_TOPIC", " orders "),
            ("ORDER_PRICING_URL", "http://pricing:8080"),
            ("ORDER_REDIS_URL", ""),
        ])
        .unwrap();

        assert_eq!(config.router().unwrap().shard_count(), 16);
        assert_eq!(config.shard_retry.attempts, 5);
        assert_eq!(config.shard_retry.backoff, Duration::ZERO);
        assert_eq!(config.cache_ttl, None);
        assert_eq!(config.event_topic, "orders");
        assert_eq!(config.pricing_url.as_deref(), Some("http://pricing:8080"));
        assert_eq!(config.redis_url, None);
    }

    #[test]
    fn test_shard_count_must_be_positive() {
        assert_eq!(
            config(&[("ORDER_SHARD_COUNT", "0")]),
            Err(ConfigError::ShardCount(RouterError::InvalidShardCount(0)))
        );
        assert_eq!(
            config(&[("ORDER_SHARD_COUNT", "-4")]),
            Err(ConfigError::ShardCount(RouterError::InvalidShardCount(-4)))
        );
        assert!(matches!(
            config(&[("ORDER_SHARD_COUNT", "three")]),
            Err(ConfigError::Invalid { var: "ORDER_SHARD_COUNT", .. })
        ));
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        for var in [
            "ORDER_STORE_TIMEOUT_MS",
            "ORDER_PRICING_TIMEOUT_MS",
            "ORDER_SHARD_BUFFER",
            "ORDER_EVENT_PARTITIONS",
        ] {
            assert!(
                matches!(config(&[(var, "0")]), Err(ConfigError::Invalid { .. })),
                "{} accepted 0",
                var
            );
        }
    }
}
