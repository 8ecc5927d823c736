//! # Sharded Store
//!
//! A fixed pool of shard handles addressed by index. The store never picks a
//! shard itself: callers resolve the index with
//! [`ShardRouter`](crate::router::ShardRouter) and pass it in. There are no
//! cross-shard transactions and no retries here.
//!
//! A call that outlives the store timeout is reported as
//! [`ShardError::Unconfirmed`]: the request may still be queued in the shard
//! and applied later. Requests to one shard are handled in arrival order, so a
//! read sent after the timeout sees the outcome of the call that timed out.

use crate::model::{Order, OrderKey, TransitionError};
use crate::shard::{Mutator, ShardActor, ShardClient, ShardError, ShardRecord, ShardStats};
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

impl ShardRecord for Order {
    type Key = OrderKey;
    type Rejection = TransitionError;

    fn key(&self) -> &OrderKey {
        &self.key
    }
}

pub type OrderShardError = ShardError<TransitionError>;

#[derive(Clone)]
pub struct ShardedStore {
    shards: Vec<ShardClient<Order>>,
    op_timeout: Duration,
}

impl ShardedStore {
    /// Wraps existing shard handles. Index `i` of `shards` is shard `i`.
    ///
    /// Returns `None` for an empty pool.
    pub fn new(shards: Vec<ShardClient<Order>>, op_timeout: Duration) -> Option<Self> {
        if shards.is_empty() {
            return None;
        }
        Some(Self { shards, op_timeout })
    }

    /// Spawns `count` shard tasks and returns the store plus their join handles.
    ///
    /// The tasks stop once every clone of the store has been dropped.
    pub fn spawn(
        count: usize,
        buffer_size: usize,
        op_timeout: Duration,
    ) -> Option<(Self, Vec<JoinHandle<()>>)> {
        let mut shards = Vec::with_capacity(count);
        let mut handles = Vec::with_capacity(count);
        for shard in 0..count {
            let (actor, client) = ShardActor::<Order>::new(shard, buffer_size);
            handles.push(tokio::spawn(actor.run()));
            shards.push(client);
        }
        let store = Self::new(shards, op_timeout)?;
        Some((store, handles))
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Inserts a new row. Fails with `DuplicateKey` if the key exists on that shard.
    pub async fn write(&self, shard: usize, order: Order) -> Result<(), OrderShardError> {
        let client = self.shard(shard)?;
        self.bounded(shard, client.write(order)).await
    }

    pub async fn read(&self, shard: usize, key: &OrderKey) -> Result<Option<Order>, OrderShardError> {
        let client = self.shard(shard)?;
        self.bounded(shard, client.read(key.clone())).await
    }

    /// Applies `mutate` to the row inside its shard and returns the committed row.
    pub async fn update(
        &self,
        shard: usize,
        key: &OrderKey,
        mutate: Mutator<Order>,
    ) -> Result<Order, OrderShardError> {
        let client = self.shard(shard)?;
        self.bounded(shard, client.update(key.clone(), mutate)).await
    }

    /// Row counts for every shard, in index order. Unreachable shards are skipped.
    pub async fn stats(&self) -> Vec<ShardStats> {
        let mut stats = Vec::with_capacity(self.shards.len());
        for (shard, client) in self.shards.iter().enumerate() {
            match self.bounded(shard, client.stats()).await {
                Ok(s) => stats.push(s),
                Err(e) => warn!(shard, error = %e, "Stats unavailable"),
            }
        }
        stats
    }

    fn shard(&self, shard: usize) -> Result<&ShardClient<Order>, OrderShardError> {
        self.shards.get(shard).ok_or_else(|| {
            ShardError::unavailable(
                shard,
                format!("no such shard (pool has {})", self.shards.len()),
            )
        })
    }

    async fn bounded<V>(
        &self,
        shard: usize,
        call: impl Future<Output = Result<V, OrderShardError>>,
    ) -> Result<V, OrderShardError> {
        match tokio::time::timeout(self.op_timeout, call).await {
            Ok(result) => result,
            Err(_) => {
                debug!(shard, timeout_ms = self.op_timeout.as_millis() as u64, "Shard call timed out");
                Err(ShardError::unconfirmed(shard, "timed out"))
            }
        }
    }
}
