use crate::events::{partition_for, EventPublisher, PublishError};
use crate::model::{OrderEvent, OrderKey};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process partitioned topic: one append-only log per partition.
#[derive(Debug)]
pub struct InMemoryTopic {
    name: String,
    partitions: Vec<RwLock<Vec<OrderEvent>>>,
}

impl InMemoryTopic {
    /// Creates a topic with `partitions` partitions (at least one).
    pub fn new(name: impl Into<String>, partitions: usize) -> Self {
        Self {
            name: name.into(),
            partitions: (0..partitions.max(1)).map(|_| RwLock::new(Vec::new())).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Events for `key`, in append order.
    pub async fn events_for(&self, key: &OrderKey) -> Vec<OrderEvent> {
        let partition = partition_for(key, self.partitions.len());
        self.partitions[partition]
            .read()
            .await
            .iter()
            .filter(|e| &e.order_key == key)
            .cloned()
            .collect()
    }

    /// Total number of events across all partitions.
    pub async fn len(&self) -> usize {
        let mut total = 0;
        for partition in &self.partitions {
            total += partition.read().await.len();
        }
        total
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl EventPublisher for InMemoryTopic {
    async fn publish(&self, event: &OrderEvent) -> Result<(), PublishError> {
        let partition = partition_for(&event.order_key, self.partitions.len());
        let mut log = self.partitions[partition].write().await;
        log.push(event.clone());
        debug!(
            topic = %self.name,
            partition,
            offset = log.len() - 1,
            key = %event.order_key,
            event_type = %event.event_type,
            "Event appended"
        );
        Ok(())
    }
}
