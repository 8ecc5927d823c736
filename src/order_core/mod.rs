//! # Order Core
//!
//! The only component with business rules. [`OrderCore`] turns create, update,
//! cancel and get requests into a fixed sequence of calls against pricing, the
//! shard router, the sharded store, the event publisher and the cache.
//!
//! ## Outcomes
//!
//! | Result | Meaning |
//! |--------|---------|
//! | `Ok(Committed)` with no degradations | Row committed, event published, cache refreshed |
//! | `Ok(Committed)` with degradations | Row committed; event and/or cache unconfirmed |
//! | `Err(OrderError)` | Nothing committed (see [`OrderError`] for the one ambiguous case) |
//!
//! ## Deadlines
//!
//! Every operation runs under a [`Deadline`]. The plain methods use
//! [`CoreSettings::request_deadline`]; the `*_within` methods take one from the
//! caller. Each step is bounded by the shorter of its own timeout and the time
//! left. A deadline that passes before the commit fails the step that was
//! waiting; one that passes after the commit only skips the remaining side
//! effects, which are reported as degradations.

pub mod deadline;
pub mod error;
pub mod outcome;
pub mod service;
pub mod settings;

pub use deadline::Deadline;
pub use error::{Degradation, ErrorKind, OrderError, ShardCountMismatch};
pub use outcome::Committed;
pub use service::OrderCore;
pub use settings::{CoreSettings, RetryPolicy};
