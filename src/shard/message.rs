//! # Shard Messages
//!
//! Requests sent from a [`ShardClient`](crate::shard::ShardClient) to its
//! [`ShardActor`](crate::shard::ShardActor). Each carries a one-shot reply
//! channel.

use crate::shard::error::ShardError;
use crate::shard::record::{Mutator, ShardRecord};
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by shard tasks.
pub type Response<T, R> = oneshot::Sender<Result<T, ShardError<<R as ShardRecord>::Rejection>>>;

/// Row counts reported by one shard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardStats {
    pub shard: usize,
    pub rows: usize,
}

/// The four operations a shard understands.
///
/// - **Write**: insert a new row; refuses existing keys.
/// - **Read**: fetch a row by key.
/// - **Update**: run a [`Mutator`] against a staged copy and commit it on success.
/// - **Stats**: report row counts.
pub enum ShardRequest<T: ShardRecord> {
    Write {
        record: T,
        respond_to: Response<(), T>,
    },
    Read {
        key: T::Key,
        respond_to: Response<Option<T>, T>,
    },
    Update {
        key: T::Key,
        mutate: Mutator<T>,
        respond_to: Response<T, T>,
    },
    Stats {
        respond_to: Response<ShardStats, T>,
    },
}

impl<T: ShardRecord> std::fmt::Debug for ShardRequest<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardRequest::Write { record, .. } => {
                f.debug_struct("Write").field("record", record).finish()
            }
            ShardRequest::Read { key, .. } => f.debug_struct("Read").field("key", key).finish(),
            ShardRequest::Update { key, .. } => {
                f.debug_struct("Update").field("key", key).finish_non_exhaustive()
            }
            ShardRequest::Stats { .. } => f.write_str("Stats"),
        }
    }
}
