//! # ShardRecord Trait
//!
//! The `ShardRecord` trait is the contract a row type satisfies to be owned by a
//! [`ShardActor`](crate::shard::ShardActor). It names the key the row is stored
//! under and the error a mutator may reject a change with.
//!
//! # Architecture Note
//! Shard tasks know nothing about orders. They store rows by key, refuse
//! duplicate inserts, and run caller-supplied mutators against a staged copy of
//! a row. Business rules live in the mutator, which reports refusals through
//! [`ShardRecord::Rejection`].

use std::fmt::{Debug, Display};
use std::hash::Hash;

pub trait ShardRecord: Clone + Send + Sync + Debug + 'static {
    /// Primary key of the row within its shard.
    type Key: Eq + Hash + Clone + Send + Sync + Display + Debug + 'static;

    /// Error a mutator returns to refuse a change. The row is left untouched.
    type Rejection: std::error::Error + Send + Sync + 'static;

    fn key(&self) -> &Self::Key;
}

/// In-place change applied to one row inside its shard task.
pub type Mutator<T> =
    Box<dyn FnOnce(&mut T) -> Result<(), <T as ShardRecord>::Rejection> + Send + 'static>;
