use crate::model::Order;
use crate::order_core::error::Degradation;

/// A committed mutation.
///
/// `order` is the row as the shard committed it. `degradations` lists the
/// post-commit side effects (event publication, cache refresh) that could not
/// be confirmed. An empty list is a clean success.
#[derive(Debug, Clone, PartialEq)]
pub struct Committed {
    pub order: Order,
    pub degradations: Vec<Degradation>,
}

impl Committed {
    pub fn is_degraded(&self) -> bool {
        !self.degradations.is_empty()
    }

    pub fn into_order(self) -> Order {
        self.order
    }
}
