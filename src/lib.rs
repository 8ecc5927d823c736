//! # Sharded Orders
//!
//! > **An order core that spreads orders across independent shards.**
//!
//! Every order key is pinned to one of `N` shards by a stable hash. Each
//! mutation is priced by an external service, written to the owning shard,
//! and then announced on a partitioned event topic and mirrored into a cache.
//! The shard row is the source of truth; events and cache are derived views
//! that may lag it but never contradict it once they converge.
//!
//! ## Core Concepts
//!
//! ### One Task per Shard
//! Each shard is a Tokio task that owns its rows and handles requests one at a
//! time, so there is no lock around the rows. Two updates of the same key meet
//! in the same queue and are applied in order; different shards run in
//! parallel. See [`shard`].
//!
//! ### Commit First, Then Side Effects
//! Pricing and the shard write are pre-commit: if either fails, nothing is
//! written and the caller gets an [`OrderError`](order_core::OrderError).
//! Event publication and cache refresh are post-commit: their failures are
//! attached to the result as [`Degradation`](order_core::Degradation)s and never
//! undo the write.
//!
//! ### Observability
//! `tracing` is used everywhere with structured fields. See the
//! [`lifecycle::tracing`] module for what is logged at which level.
//!
//! ## Module Tour
//!
//! ### 1. Data ([`model`], [`router`])
//! - [`Order`](model::Order) and its state machine, [`OrderEvent`](model::OrderEvent).
//! - [`ShardRouter`](router::ShardRouter): key → shard index.
//!
//! ### 2. Storage ([`shard`], [`store`])
//! - [`ShardActor`](shard::ShardActor) / [`ShardClient`](shard::ShardClient): one shard.
//! - [`ShardedStore`](store::ShardedStore): the pool of shards, addressed by index.
//! - [`MockShard`](shard::MockShard): expectation-driven shard for failure tests.
//!
//! ### 3. Collaborators ([`pricing`], [`events`], [`cache`])
//! - Traits plus in-process implementations; HTTP pricing, and Redis cache and
//!   streams behind the `redis` feature.
//!
//! ### 4. Orchestration ([`order_core`], [`lifecycle`], [`config`])
//! - [`OrderCore`](order_core::OrderCore): create, update, cancel, get.
//! - [`OrderSystem`](lifecycle::OrderSystem): spawns shards, wires the core, shuts down.
//! - [`CoreConfig`](config::CoreConfig): `ORDER_*` environment configuration.
//!
//! ## Quick Start
//!
//! ```bash
//! RUST_LOG=info cargo run
//! cargo test
//! ```

pub mod cache;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod model;
pub mod order_core;
pub mod pricing;
pub mod router;
pub mod shard;
pub mod store;
