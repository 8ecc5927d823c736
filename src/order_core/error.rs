//! Error types for the order core.

use crate::cache::CacheError;
use crate::events::PublishError;
use crate::model::{OrderKey, OrderStatus, TransitionError};
use crate::pricing::PricingError;
use crate::store::OrderShardError;
use thiserror::Error;

/// Classification every failure falls into exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ValidationFailed,
    PricingUnavailable,
    ShardUnavailable,
    DuplicateKey,
    NotFound,
    InvalidTransition,
    /// Committed, but a post-commit side effect is unconfirmed. Never fatal.
    PublishDegraded,
}

/// Errors that abort an order operation. Nothing was committed when one of
/// these is returned, except where a shard timeout left the outcome unknown.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    /// The request itself is malformed, or pricing refused the items.
    #[error("Order validation failed: {0}")]
    ValidationFailed(String),

    #[error("Pricing unavailable: {0}")]
    PricingUnavailable(String),

    #[error("Shard {shard} unavailable: {reason}")]
    ShardUnavailable { shard: usize, reason: String },

    #[error("Order already exists: {0}")]
    DuplicateKey(OrderKey),

    #[error("Order not found: {0}")]
    NotFound(OrderKey),

    #[error("Order {key} cannot move from {from} to {to}")]
    InvalidTransition {
        key: OrderKey,
        from: OrderStatus,
        to: OrderStatus,
    },
}

impl OrderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::ValidationFailed(_) => ErrorKind::ValidationFailed,
            OrderError::PricingUnavailable(_) => ErrorKind::PricingUnavailable,
            OrderError::ShardUnavailable { .. } => ErrorKind::ShardUnavailable,
            OrderError::DuplicateKey(_) => ErrorKind::DuplicateKey,
            OrderError::NotFound(_) => ErrorKind::NotFound,
            OrderError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
        }
    }

    /// Pricing and shard availability are transient; everything else is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::PricingUnavailable | ErrorKind::ShardUnavailable
        )
    }

    pub(crate) fn from_shard(error: OrderShardError, key: &OrderKey) -> Self {
        match error {
            OrderShardError::Unavailable { shard, reason }
            | OrderShardError::Unconfirmed { shard, reason } => {
                OrderError::ShardUnavailable { shard, reason }
            }
            OrderShardError::DuplicateKey(_) => OrderError::DuplicateKey(key.clone()),
            OrderShardError::NotFound(_) => OrderError::NotFound(key.clone()),
            OrderShardError::Rejected(e) => e.into(),
        }
    }
}

impl From<TransitionError> for OrderError {
    fn from(e: TransitionError) -> Self {
        OrderError::InvalidTransition {
            key: e.key,
            from: e.from,
            to: e.to,
        }
    }
}

impl From<PricingError> for OrderError {
    fn from(e: PricingError) -> Self {
        match e {
            PricingError::Rejected(reason) => OrderError::ValidationFailed(reason),
            other => OrderError::PricingUnavailable(other.to_string()),
        }
    }
}

/// A post-commit side effect that did not complete. The write stands.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Degradation {
    #[error("event unconfirmed: {0}")]
    EventUnconfirmed(PublishError),

    #[error("cache may be stale: {0}")]
    CacheStale(CacheError),
}

impl Degradation {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::PublishDegraded
    }
}

/// Returned by [`OrderCore::new`](crate::order_core::OrderCore::new) when the
/// router and the store disagree on the shard count.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("router resolves over {router} shards but the store holds {store}")]
pub struct ShardCountMismatch {
    pub router: usize,
    pub store: usize,
}
