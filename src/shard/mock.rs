//! # Mock Shards
//!
//! `MockShard<T>` hands out a real [`ShardClient<T>`] whose requests are answered
//! from a queue of expectations instead of a [`ShardActor`](crate::shard::ShardActor).
//! It is how the tests put a shard into states that are hard to reach with a
//! real task: unavailable for a few calls, slow, or returning a fixed row.
//!
//! | | MockShard | ShardActor |
//! |---|---|---|
//! | **State** | None (expectations) | Real rows |
//! | **Error injection** | `return_err` | Only by stopping the task |
//! | **Use case** | Retry and failure paths around the store | The store itself |
//!
//! ## Example
//!
//! ```rust
//! use sharded_orders::shard::{MockShard, ShardError};
//! use sharded_orders::model::{Order, OrderKey};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut mock = MockShard::<Order>::new(0);
//!     mock.expect_read(OrderKey::from("ord-1"))
//!         .return_err(ShardError::unavailable(0, "partitioned"));
//!     mock.expect_read(OrderKey::from("ord-1")).return_ok(None);
//!
//!     let client = mock.client();
//!     assert!(client.read(OrderKey::from("ord-1")).await.is_err());
//!     assert_eq!(client.read(OrderKey::from("ord-1")).await, Ok(None));
//!     mock.verify();
//! }
//! ```
//!
//! For step-by-step control use [`create_mock_shard`] and the `expect_*`
//! receiver helpers, which give the test the reply channel itself.

use crate::shard::client::ShardClient;
use crate::shard::error::ShardError;
use crate::shard::message::{ShardRequest, ShardStats};
use crate::shard::record::ShardRecord;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};

type Rejection<T> = <T as ShardRecord>::Rejection;
type Queue<T> = Arc<Mutex<VecDeque<Expectation<T>>>>;

enum Reply<V, T: ShardRecord> {
    Value(Result<V, ShardError<Rejection<T>>>),
    /// Run the request's mutator against this row and return the outcome.
    Apply(T),
}

struct Expectation<T: ShardRecord> {
    call: Call<T>,
    delay: Option<Duration>,
}

enum Call<T: ShardRecord> {
    Write(Result<(), ShardError<Rejection<T>>>),
    Read {
        key: T::Key,
        response: Result<Option<T>, ShardError<Rejection<T>>>,
    },
    /// Answer with the last record written under `key`.
    ReadBack { key: T::Key },
    Update {
        key: T::Key,
        reply: Reply<T, T>,
    },
    Stats(Result<ShardStats, ShardError<Rejection<T>>>),
}

fn lock<T: ShardRecord>(queue: &Queue<T>) -> MutexGuard<'_, VecDeque<Expectation<T>>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A shard stand-in driven by an ordered queue of expectations.
///
/// Requests are matched against the queue front to back. A request that does
/// not match the next expectation panics the mock's task, which the caller
/// then sees as an unconfirmed call.
pub struct MockShard<T: ShardRecord> {
    client: ShardClient<T>,
    expectations: Queue<T>,
    written: Arc<Mutex<Vec<T>>>,
    _handle: tokio::task::JoinHandle<()>,
}

impl<T: ShardRecord> MockShard<T> {
    pub fn new(shard: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<ShardRequest<T>>(100);
        let expectations: Queue<T> = Arc::new(Mutex::new(VecDeque::new()));
        let queue = expectations.clone();
        let written: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::new()));
        let log = written.clone();

        let handle = tokio::spawn(async move {
            while let Some(request) = receiver.recv().await {
                let expectation = lock(&queue).pop_front();
                let Some(Expectation { call, delay }) = expectation else {
                    panic!("Unexpected request on mock shard {}: {:?}", shard, request);
                };
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }

                match (request, call) {
                    (ShardRequest::Write { record, respond_to }, Call::Write(response)) => {
                        if response.is_ok() {
                            log.lock().unwrap_or_else(PoisonError::into_inner).push(record);
                        }
                        let _ = respond_to.send(response);
                    }
                    (ShardRequest::Read { key, respond_to }, Call::Read { key: want, response }) => {
                        assert_eq!(key, want, "mock shard {} read key mismatch", shard);
                        let _ = respond_to.send(response);
                    }
                    (ShardRequest::Read { key, respond_to }, Call::ReadBack { key: want }) => {
                        assert_eq!(key, want, "mock shard {} read key mismatch", shard);
                        let row = log
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .iter()
                            .rev()
                            .find(|record| *record.key() == key)
                            .cloned();
                        let _ = respond_to.send(Ok(row));
                    }
                    (
                        ShardRequest::Update {
                            key,
                            mutate,
                            respond_to,
                        },
                        Call::Update { key: want, reply },
                    ) => {
                        assert_eq!(key, want, "mock shard {} update key mismatch", shard);
                        let response = match reply {
                            Reply::Value(response) => response,
                            Reply::Apply(mut row) => {
                                mutate(&mut row).map(|()| row).map_err(ShardError::Rejected)
                            }
                        };
                        let _ = respond_to.send(response);
                    }
                    (ShardRequest::Stats { respond_to }, Call::Stats(response)) => {
                        let _ = respond_to.send(response);
                    }
                    (request, _) => {
                        panic!("Expectation mismatch on mock shard {}: {:?}", shard, request);
                    }
                }
            }
        });

        Self {
            client: ShardClient::new(shard, sender),
            expectations,
            written,
            _handle: handle,
        }
    }

    pub fn client(&self) -> ShardClient<T> {
        self.client.clone()
    }

    pub fn expect_write(&mut self) -> ExpectationBuilder<T, ()> {
        ExpectationBuilder::new(self.expectations.clone(), Call::Write)
    }

    pub fn expect_read(&mut self, key: T::Key) -> ExpectationBuilder<T, Option<T>> {
        ExpectationBuilder::new(self.expectations.clone(), move |response| Call::Read {
            key,
            response,
        })
    }

    /// Answers the next read with the last record accepted by a write
    /// expectation under `key`, or `None`.
    pub fn expect_read_back(&mut self, key: T::Key) {
        lock(&self.expectations).push_back(Expectation {
            call: Call::ReadBack { key },
            delay: None,
        });
    }

    /// Records accepted by write expectations, oldest first.
    pub fn written(&self) -> Vec<T> {
        self.written.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn expect_update(&mut self, key: T::Key) -> UpdateExpectationBuilder<T> {
        UpdateExpectationBuilder {
            key,
            delay: None,
            expectations: self.expectations.clone(),
        }
    }

    pub fn expect_stats(&mut self) -> ExpectationBuilder<T, ShardStats> {
        ExpectationBuilder::new(self.expectations.clone(), Call::Stats)
    }

    /// Panics if any expectation was not consumed.
    pub fn verify(&self) {
        let remaining = lock(&self.expectations).len();
        if remaining != 0 {
            panic!("Not all expectations were met. {} remaining", remaining);
        }
    }
}

type MakeCall<T, V> = Box<dyn FnOnce(Result<V, ShardError<Rejection<T>>>) -> Call<T> + Send>;

/// Builder for write, read and stats expectations.
pub struct ExpectationBuilder<T: ShardRecord, V> {
    expectations: Queue<T>,
    make: MakeCall<T, V>,
    delay: Option<Duration>,
}

impl<T: ShardRecord, V> ExpectationBuilder<T, V> {
    fn new(
        expectations: Queue<T>,
        make: impl FnOnce(Result<V, ShardError<Rejection<T>>>) -> Call<T> + Send + 'static,
    ) -> Self {
        Self {
            expectations,
            make: Box::new(make),
            delay: None,
        }
    }

    /// Holds the reply for `delay` before sending it.
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn return_ok(self, value: V) {
        self.push(Ok(value));
    }

    pub fn return_err(self, error: ShardError<Rejection<T>>) {
        self.push(Err(error));
    }

    fn push(self, response: Result<V, ShardError<Rejection<T>>>) {
        let call = (self.make)(response);
        lock(&self.expectations).push_back(Expectation {
            call,
            delay: self.delay,
        });
    }
}

/// Builder for update expectations.
pub struct UpdateExpectationBuilder<T: ShardRecord> {
    key: T::Key,
    delay: Option<Duration>,
    expectations: Queue<T>,
}

impl<T: ShardRecord> UpdateExpectationBuilder<T> {
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn return_ok(self, row: T) {
        self.push(Reply::Value(Ok(row)));
    }

    pub fn return_err(self, error: ShardError<Rejection<T>>) {
        self.push(Reply::Value(Err(error)));
    }

    /// Runs the caller's mutator against `row`, as a real shard would.
    pub fn apply_to(self, row: T) {
        self.push(Reply::Apply(row));
    }

    fn push(self, reply: Reply<T, T>) {
        lock(&self.expectations).push_back(Expectation {
            call: Call::Update {
                key: self.key,
                reply,
            },
            delay: self.delay,
        });
    }
}

/// Creates a shard client and the receiver its requests arrive on.
///
/// Lets a test answer each request by hand, including never answering it.
pub fn create_mock_shard<T: ShardRecord>(
    shard: usize,
    buffer_size: usize,
) -> (ShardClient<T>, mpsc::Receiver<ShardRequest<T>>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (ShardClient::new(shard, sender), receiver)
}

/// Next message, if it is a Write request.
pub async fn expect_write<T: ShardRecord>(
    receiver: &mut mpsc::Receiver<ShardRequest<T>>,
) -> Option<(T, oneshot::Sender<Result<(), ShardError<Rejection<T>>>>)> {
    match receiver.recv().await {
        Some(ShardRequest::Write { record, respond_to }) => Some((record, respond_to)),
        _ => None,
    }
}

/// Next message, if it is a Read request.
pub async fn expect_read<T: ShardRecord>(
    receiver: &mut mpsc::Receiver<ShardRequest<T>>,
) -> Option<(
    T::Key,
    oneshot::Sender<Result<Option<T>, ShardError<Rejection<T>>>>,
)> {
    match receiver.recv().await {
        Some(ShardRequest::Read { key, respond_to }) => Some((key, respond_to)),
        _ => None,
    }
}
