//! # Shard Errors
//!
//! Failures a single shard call can report. Retrying is the caller's decision;
//! shard tasks and the store never retry on their own.

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ShardError<R> {
    /// The request never reached the shard. Nothing was applied.
    #[error("shard {shard} unavailable: {reason}")]
    Unavailable { shard: usize, reason: String },

    /// The request was handed to the shard but no reply came back. It may or
    /// may not have been applied.
    #[error("shard {shard} did not confirm: {reason}")]
    Unconfirmed { shard: usize, reason: String },

    #[error("key {0} already exists")]
    DuplicateKey(String),

    #[error("key {0} not found")]
    NotFound(String),

    /// The mutator refused the change.
    #[error("change rejected: {0}")]
    Rejected(R),
}

impl<R> ShardError<R> {
    pub fn unavailable(shard: usize, reason: impl Into<String>) -> Self {
        ShardError::Unavailable {
            shard,
            reason: reason.into(),
        }
    }

    pub fn unconfirmed(shard: usize, reason: impl Into<String>) -> Self {
        ShardError::Unconfirmed {
            shard,
            reason: reason.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, ShardError::Unavailable { .. })
    }

    pub fn is_unconfirmed(&self) -> bool {
        matches!(self, ShardError::Unconfirmed { .. })
    }

    /// Either kind of missing answer. Safe to retry for reads only.
    pub fn is_transient(&self) -> bool {
        self.is_unavailable() || self.is_unconfirmed()
    }
}
