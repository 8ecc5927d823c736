//! Pure data structures: the order row and the events emitted for it.

pub mod event;
pub mod order;

pub use event::*;
pub use order::*;
