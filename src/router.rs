//! # Shard Router
//!
//! Maps an [`OrderKey`] to one of `N` shard indices.
//!
//! The mapping is CRC-32C over the key's UTF-8 bytes, reduced modulo `N`.
//! CRC-32C is a published checksum, so the same key lands on the same shard
//! across builds, platforms and restarts. `N` is fixed at construction and
//! never changes for the life of the router; moving to a different `N` needs
//! an offline migration of every row whose index changes.

use crate::model::OrderKey;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RouterError {
    #[error("shard count must be positive, got {0}")]
    InvalidShardCount(i64),
}

/// Stable 32-bit hash of a key. Shared by shard routing and event partitioning.
pub fn stable_hash(key: &OrderKey) -> u32 {
    crc32c::crc32c(key.as_bytes())
}

/// Pure, total key → shard mapping over a fixed shard count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRouter {
    shard_count: usize,
}

impl ShardRouter {
    pub fn new(shard_count: usize) -> Result<Self, RouterError> {
        if shard_count == 0 {
            return Err(RouterError::InvalidShardCount(0));
        }
        Ok(Self { shard_count })
    }

    pub fn shard_count(&self) -> usize {
        self.shard_count
    }

    /// Resolves the shard that owns `key`. Always in `[0, shard_count)`.
    pub fn resolve(&self, key: &OrderKey) -> usize {
        stable_hash(key) as usize % self.shard_count
    }
}
