//! # Pricing
//!
//! The external pricing/availability service, consumed through one
//! request/response call: line items in, a confirmed total out. The call is
//! idempotent and bounded by a timeout. Create and Update both go through it
//! before anything is written; Cancel never does.

pub mod catalog;
pub mod http;

pub use catalog::CatalogPricing;
pub use http::HttpPricingClient;

use crate::model::LineItem;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PricingError {
    /// The service could not be reached or failed on its side.
    #[error("pricing service unavailable: {0}")]
    Unavailable(String),

    #[error("pricing call timed out after {0} ms")]
    Timeout(u64),

    /// The service answered and refused the items.
    #[error("pricing rejected the items: {0}")]
    Rejected(String),
}

/// Confirmed price for a set of line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub total: Decimal,
}

#[async_trait]
pub trait PricingClient: Send + Sync {
    async fn validate(&self, items: &[LineItem]) -> Result<PriceQuote, PricingError>;
}
