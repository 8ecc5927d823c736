//! # Order Events
//!
//! Lifecycle events are appended to a partitioned topic. All events for one
//! order key land on the same partition, chosen with the same stable hash the
//! shard router uses. Delivery is at-least-once: a publish is attempted once
//! per commit and a failure is reported, not retried. Consumers order and
//! de-duplicate by [`OrderEvent::sequence`](crate::model::OrderEvent).

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryTopic;
#[cfg(feature = "redis")]
pub use self::redis::RedisStreamPublisher;

use crate::model::{OrderEvent, OrderKey};
use crate::router::stable_hash;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    #[error("publish timed out after {0} ms")]
    Timeout(u64),

    #[error("request deadline passed before the event was published")]
    DeadlineExceeded,

    #[error("broker error: {0}")]
    Broker(String),

    #[error("event could not be encoded: {0}")]
    Encode(String),
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Appends `event` to the partition owned by its order key.
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError>;
}

/// Partition for `key` out of `partitions`. `partitions` must be positive.
pub fn partition_for(key: &OrderKey, partitions: usize) -> usize {
    stable_hash(key) as usize % partitions.max(1)
}
