//! Redis Streams event publisher.
//!
//! Each partition is its own stream, `{topic}:{partition}`, so per-key order is
//! the stream's append order. Events are appended with `XADD` and an
//! auto-generated entry id. Consumer groups and acknowledgement belong to the
//! consumers and are not managed here.

use crate::events::{partition_for, EventPublisher, PublishError};
use crate::model::OrderEvent;
use async_trait::async_trait;
use tracing::instrument;

#[derive(Debug, Clone)]
pub struct RedisStreamPublisher {
    client: redis::Client,
    topic: String,
    partitions: usize,
}

impl RedisStreamPublisher {
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `topic` - Stream name prefix
    /// * `partitions` - Number of partition streams (at least one)
    pub fn new(
        redis_url: impl AsRef<str>,
        topic: impl Into<String>,
        partitions: usize,
    ) -> Result<Self, PublishError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| PublishError::Broker(e.to_string()))?;
        Ok(Self {
            client,
            topic: topic.into(),
            partitions: partitions.max(1),
        })
    }

    fn stream_key(&self, partition: usize) -> String {
        format!("{}:{}", self.topic, partition)
    }
}

#[async_trait]
impl EventPublisher for RedisStreamPublisher {
    #[instrument(
        skip(self, event),
        fields(topic = %self.topic, key = %event.order_key, sequence = event.sequence),
        err
    )]
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let payload =
            serde_json::to_string(&event.payload).map_err(|e| PublishError::Encode(e.to_string()))?;
        let stream = self.stream_key(partition_for(&event.order_key, self.partitions));

        let mut conn = self
            .client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PublishError::Broker(e.to_string()))?;

        let _: String = redis::cmd("XADD")
            .arg(&stream)
            .arg("*")
            .arg("event_id")
            .arg(event.event_id.to_string())
            .arg("order_key")
            .arg(event.order_key.as_str())
            .arg("event_type")
            .arg(event.event_type.to_string())
            .arg("sequence")
            .arg(event.sequence)
            .arg("emitted_at")
            .arg(event.emitted_at.to_rfc3339())
            .arg("payload")
            .arg(&payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| PublishError::Broker(format!("XADD failed: {}", e)))?;

        Ok(())
    }
}
