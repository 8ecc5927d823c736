//! # Shards
//!
//! One shard is one Tokio task that owns a disjoint subset of rows. Callers
//! talk to it through a [`ShardClient`]; the task itself is a [`ShardActor`].
//!
//! ```text
//!  ShardClient (clone) ──┐
//!  ShardClient (clone) ──┼── mpsc ──▶ ShardActor { rows: HashMap<Key, T> }
//!  ShardClient (clone) ──┘              │
//!            ▲                          │ one request at a time
//!            └────────── oneshot ───────┘
//! ```
//!
//! - [`record`]: the [`ShardRecord`] trait rows implement.
//! - [`message`]: the request enum and reply channel type.
//! - [`actor`]: the shard task.
//! - [`client`]: the handle callers hold.
//! - [`mock`]: [`MockShard`] for failure injection in tests.

pub mod actor;
pub mod client;
pub mod error;
pub mod message;
pub mod mock;
pub mod record;

pub use actor::ShardActor;
pub use client::ShardClient;
pub use error::ShardError;
pub use message::{ShardRequest, ShardStats};
pub use mock::{create_mock_shard, MockShard};
pub use record::{Mutator, ShardRecord};
