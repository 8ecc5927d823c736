//! # Order Cache
//!
//! A best-effort key/value view of the latest known [`Order`] snapshot per key.
//! The cache is never authoritative: entries may be stale or missing, and every
//! entry can be rebuilt from the owning shard. [`OrderCore`](crate::order_core::OrderCore)
//! only writes to it after a shard commit, and a cache failure never fails the
//! surrounding call.

pub mod memory;
#[cfg(feature = "redis")]
pub mod redis;

pub use memory::InMemoryCache;
#[cfg(feature = "redis")]
pub use self::redis::RedisCache;

use crate::model::{Order, OrderKey};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("cache call timed out after {0} ms")]
    Timeout(u64),

    #[error("request deadline passed before the cache was reached")]
    DeadlineExceeded,

    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cached snapshot could not be decoded: {0}")]
    Decode(String),
}

/// Result of a cache read.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Order),
    Miss,
}

impl CacheLookup {
    pub fn into_order(self) -> Option<Order> {
        match self {
            CacheLookup::Hit(order) => Some(order),
            CacheLookup::Miss => None,
        }
    }
}

#[async_trait]
pub trait OrderCache: Send + Sync {
    async fn get(&self, key: &OrderKey) -> Result<CacheLookup, CacheError>;

    /// Stores `order` as the snapshot for `key`, unless the cache already holds
    /// a newer snapshot or a tombstone at or above `order.version`.
    async fn set(&self, key: &OrderKey, order: &Order) -> Result<(), CacheError>;

    /// Drops the snapshot for `key` and leaves a tombstone at `version`. Later
    /// `set`s at or below that version are ignored, so a slow refresh from an
    /// earlier commit cannot bring the entry back.
    async fn invalidate(&self, key: &OrderKey, version: u64) -> Result<(), CacheError>;
}
