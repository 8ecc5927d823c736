//! Starting and stopping the system, and process-wide logging setup.

pub mod system;
pub mod tracing;

pub use system::{Backends, LifecycleError, OrderSystem};
pub use self::tracing::setup_tracing;
