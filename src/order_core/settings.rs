use std::time::Duration;

/// How often a `ShardUnavailable` result is retried, and how long to pause between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Treated as at least one.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

/// Timeouts and retry policy for [`OrderCore`](crate::order_core::OrderCore).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreSettings {
    pub pricing_timeout: Duration,
    pub publish_timeout: Duration,
    pub cache_timeout: Duration,
    /// Deadline applied by the operations that do not take one.
    pub request_deadline: Duration,
    pub shard_retry: RetryPolicy,
}

impl Default for CoreSettings {
    fn default() -> Self {
        Self {
            pricing_timeout: Duration::from_millis(3000),
            publish_timeout: Duration::from_millis(2000),
            cache_timeout: Duration::from_millis(100),
            request_deadline: Duration::from_millis(10_000),
            shard_retry: RetryPolicy::default(),
        }
    }
}
