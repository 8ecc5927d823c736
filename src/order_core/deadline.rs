use std::time::Duration;
use tokio::time::Instant;

/// Point in time by which a whole request chain must finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Instant);

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now() + budget)
    }

    pub fn at(instant: Instant) -> Self {
        Self(instant)
    }

    /// Time left, or `None` once the deadline has passed.
    pub fn remaining(&self) -> Option<Duration> {
        let left = self.0.saturating_duration_since(Instant::now());
        (!left.is_zero()).then_some(left)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_none()
    }

    /// The shorter of `step` and the time left, or `None` once expired.
    pub fn bound(&self, step: Duration) -> Option<Duration> {
        self.remaining().map(|left| left.min(step))
    }
}
