//! # Shard Task
//!
//! This module defines the `ShardActor`, the storage unit behind one shard. It
//! owns the shard's rows and processes requests one at a time, which is what
//! serialises concurrent mutations of the same key.

use crate::shard::client::ShardClient;
use crate::shard::error::ShardError;
use crate::shard::message::{ShardRequest, ShardStats};
use crate::shard::record::ShardRecord;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// One independent storage shard.
///
/// # Architecture Note
/// This struct is the "Server" half of a shard. It owns the rows and the
/// receiver end of the channel; [`ShardClient`] is the cloneable "Client" half.
///
/// **Concurrency Model**:
/// Each shard runs in its own Tokio task and handles its requests
/// *sequentially*, so there is no lock around `rows`. Two mutations of the same
/// key always reach the same shard and are applied one after the other in
/// arrival order. Different shards run in parallel.
///
/// ## Operations
///
/// * **Write**: inserts the row, or fails with [`ShardError::DuplicateKey`].
/// * **Read**: returns a clone of the row, or `None`.
/// * **Update**:
///     1. Looks up the row, or fails with [`ShardError::NotFound`].
///     2. Runs the mutator on a staged clone.
///     3. Replaces the stored row with the staged one only if the mutator succeeded.
///     4. Returns the committed row.
/// * **Stats**: returns the row count.
pub struct ShardActor<T: ShardRecord> {
    shard: usize,
    receiver: mpsc::Receiver<ShardRequest<T>>,
    rows: HashMap<T::Key, T>,
}

impl<T: ShardRecord> ShardActor<T> {
    /// Creates a new shard task and its client.
    ///
    /// # Arguments
    ///
    /// * `shard` - Index of this shard, used in logs and errors.
    /// * `buffer_size` - Capacity of the request channel. When full, callers
    ///   wait for space.
    pub fn new(shard: usize, buffer_size: usize) -> (Self, ShardClient<T>) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            shard,
            receiver,
            rows: HashMap::new(),
        };
        (actor, ShardClient::new(shard, sender))
    }

    /// Runs the request loop until every client has been dropped.
    pub async fn run(mut self) {
        let shard = self.shard;
        info!(shard, "Shard started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                ShardRequest::Write { record, respond_to } => {
                    let key = record.key().clone();
                    debug!(shard, %key, "Write");
                    if self.rows.contains_key(&key) {
                        warn!(shard, %key, "Duplicate key");
                        let _ = respond_to.send(Err(ShardError::DuplicateKey(key.to_string())));
                        continue;
                    }
                    self.rows.insert(key.clone(), record);
                    info!(shard, %key, rows = self.rows.len(), "Written");
                    let _ = respond_to.send(Ok(()));
                }
                ShardRequest::Read { key, respond_to } => {
                    let row = self.rows.get(&key).cloned();
                    debug!(shard, %key, found = row.is_some(), "Read");
                    let _ = respond_to.send(Ok(row));
                }
                ShardRequest::Update {
                    key,
                    mutate,
                    respond_to,
                } => {
                    debug!(shard, %key, "Update");
                    let Some(row) = self.rows.get_mut(&key) else {
                        warn!(shard, %key, "Not found");
                        let _ = respond_to.send(Err(ShardError::NotFound(key.to_string())));
                        continue;
                    };
                    let mut staged = row.clone();
                    match mutate(&mut staged) {
                        Ok(()) => {
                            *row = staged.clone();
                            info!(shard, %key, "Updated");
                            let _ = respond_to.send(Ok(staged));
                        }
                        Err(e) => {
                            warn!(shard, %key, error = %e, "Update rejected");
                            let _ = respond_to.send(Err(ShardError::Rejected(e)));
                        }
                    }
                }
                ShardRequest::Stats { respond_to } => {
                    let _ = respond_to.send(Ok(ShardStats {
                        shard,
                        rows: self.rows.len(),
                    }));
                }
            }
        }

        info!(shard, rows = self.rows.len(), "Shutdown");
    }
}
