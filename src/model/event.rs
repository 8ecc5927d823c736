use crate::model::{Order, OrderKey, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use uuid::Uuid;

/// Kind of state transition an event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderEventType {
    OrderCreated,
    OrderUpdated,
    OrderCancelled,
}

impl From<OrderStatus> for OrderEventType {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Created => OrderEventType::OrderCreated,
            OrderStatus::Updated => OrderEventType::OrderUpdated,
            OrderStatus::Cancelled => OrderEventType::OrderCancelled,
        }
    }
}

impl Display for OrderEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderEventType::OrderCreated => "ORDER_CREATED",
            OrderEventType::OrderUpdated => "ORDER_UPDATED",
            OrderEventType::OrderCancelled => "ORDER_CANCELLED",
        };
        f.write_str(name)
    }
}

/// Immutable record of one committed transition.
///
/// Events are keyed by `order_key` and carry `sequence` (the order version
/// after the transition). Delivery is at-least-once, so consumers de-duplicate
/// and order on `(order_key, sequence)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub event_id: Uuid,
    pub order_key: OrderKey,
    pub event_type: OrderEventType,
    pub sequence: u64,
    /// Snapshot of the order as committed.
    pub payload: serde_json::Value,
    pub emitted_at: DateTime<Utc>,
}

impl OrderEvent {
    /// Builds the event for a committed order snapshot. The event type follows
    /// the snapshot's status.
    pub fn for_commit(order: &Order) -> Result<Self, serde_json::Error> {
        Ok(Self {
            event_id: Uuid::now_v7(),
            order_key: order.key.clone(),
            event_type: order.status.into(),
            sequence: order.version,
            payload: serde_json::to_value(order)?,
            emitted_at: Utc::now(),
        })
    }
}
