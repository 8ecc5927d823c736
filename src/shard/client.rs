//! # Shard Client
//!
//! Cloneable handle for sending requests to one [`ShardActor`](crate::shard::ShardActor).

use crate::shard::error::ShardError;
use crate::shard::message::{ShardRequest, ShardStats};
use crate::shard::record::{Mutator, ShardRecord};
use tokio::sync::{mpsc, oneshot};

type ShardResult<T, R> = Result<T, ShardError<<R as ShardRecord>::Rejection>>;

/// ## ShardClient
///
/// Holds only the sender half of a shard's channel, so cloning is cheap and
/// clones can be shared across tasks. A shard that has stopped is reported as
/// [`ShardError::Unavailable`]; one that took the request and dropped the reply
/// as [`ShardError::Unconfirmed`].
#[derive(Clone)]
pub struct ShardClient<T: ShardRecord> {
    shard: usize,
    sender: mpsc::Sender<ShardRequest<T>>,
}

impl<T: ShardRecord> ShardClient<T> {
    pub fn new(shard: usize, sender: mpsc::Sender<ShardRequest<T>>) -> Self {
        Self { shard, sender }
    }

    pub fn shard(&self) -> usize {
        self.shard
    }

    pub async fn write(&self, record: T) -> ShardResult<(), T> {
        let (respond_to, response) = oneshot::channel();
        self.send(ShardRequest::Write { record, respond_to }).await?;
        self.receive(response).await
    }

    pub async fn read(&self, key: T::Key) -> ShardResult<Option<T>, T> {
        let (respond_to, response) = oneshot::channel();
        self.send(ShardRequest::Read { key, respond_to }).await?;
        self.receive(response).await
    }

    pub async fn update(&self, key: T::Key, mutate: Mutator<T>) -> ShardResult<T, T> {
        let (respond_to, response) = oneshot::channel();
        self.send(ShardRequest::Update {
            key,
            mutate,
            respond_to,
        })
        .await?;
        self.receive(response).await
    }

    pub async fn stats(&self) -> ShardResult<ShardStats, T> {
        let (respond_to, response) = oneshot::channel();
        self.send(ShardRequest::Stats { respond_to }).await?;
        self.receive(response).await
    }

    async fn send(&self, request: ShardRequest<T>) -> ShardResult<(), T> {
        self.sender
            .send(request)
            .await
            .map_err(|_| ShardError::unavailable(self.shard, "shard closed"))
    }

    async fn receive<V>(&self, response: oneshot::Receiver<ShardResult<V, T>>) -> ShardResult<V, T> {
        response
            .await
            .map_err(|_| ShardError::unconfirmed(self.shard, "shard dropped response"))?
    }
}
