//! The order row as stored on its shard.
//!
//! # Sharding
//! An order lives on exactly one shard for its whole life. The shard index is
//! never stored on the row; it is recomputed from [`OrderKey`] by
//! [`ShardRouter`](crate::router::ShardRouter) on every call.
//!
//! The [`ShardRecord`](crate::shard::ShardRecord) impl that plugs the row into
//! the shard tasks lives in [`crate::store`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

/// Stable identifier used for shard resolution, cache keys and event partitioning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderKey(String);

impl OrderKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// True when the key is empty or whitespace only.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<&str> for OrderKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for OrderKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Display for OrderKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One line of an order: a product and how many units of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: String,
    pub quantity: u32,
}

impl LineItem {
    pub fn new(product_id: impl Into<String>, quantity: u32) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
        }
    }
}

/// Lifecycle status. `Cancelled` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    Created,
    Updated,
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled)
    }

    /// `Created -> Updated* -> Cancelled`; nothing leaves `Cancelled`.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        match (self, next) {
            (OrderStatus::Cancelled, _) => false,
            (_, OrderStatus::Created) => false,
            (OrderStatus::Created | OrderStatus::Updated, _) => true,
        }
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Created => "Created",
            OrderStatus::Updated => "Updated",
            OrderStatus::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// Rejected state-machine move, raised by the row itself inside the shard.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("order {key} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub key: OrderKey,
    pub from: OrderStatus,
    pub to: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub key: OrderKey,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub price: Decimal,
    /// Per-key commit sequence, starting at 1.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Creates a new Order in the `Created` state at version 1.
    ///
    /// # Arguments
    /// * `key` - Order key, also the shard routing key
    /// * `items` - Line items as priced by the pricing service
    /// * `price` - Confirmed total price
    /// * `at` - Creation timestamp
    pub fn new(key: OrderKey, items: Vec<LineItem>, price: Decimal, at: DateTime<Utc>) -> Self {
        Self {
            key,
            status: OrderStatus::Created,
            items,
            price,
            version: 1,
            created_at: at,
            updated_at: at,
        }
    }

    /// Replaces items and price, moving the order to `Updated`.
    pub fn revise(
        &mut self,
        items: Vec<LineItem>,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Updated, at)?;
        self.items = items;
        self.price = price;
        Ok(())
    }

    /// Moves the order to `Cancelled`. Cancelling twice is an error.
    pub fn cancel(&mut self, at: DateTime<Utc>) -> Result<(), TransitionError> {
        self.transition(OrderStatus::Cancelled, at)
    }

    fn transition(&mut self, to: OrderStatus, at: DateTime<Utc>) -> Result<(), TransitionError> {
        if !self.status.can_transition_to(to) {
            return Err(TransitionError {
                key: self.key.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.version += 1;
        self.updated_at = at;
        Ok(())
    }
}
