use crate::model::LineItem;
use crate::pricing::{PriceQuote, PricingClient, PricingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// In-process price list. Unknown products are rejected.
#[derive(Debug, Clone, Default)]
pub struct CatalogPricing {
    unit_prices: HashMap<String, Decimal>,
}

impl CatalogPricing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, product_id: impl Into<String>, unit_price: Decimal) -> Self {
        self.unit_prices.insert(product_id.into(), unit_price);
        self
    }
}

#[async_trait]
impl PricingClient for CatalogPricing {
    async fn validate(&self, items: &[LineItem]) -> Result<PriceQuote, PricingError> {
        let mut total = Decimal::ZERO;
        for item in items {
            let unit = self
                .unit_prices
                .get(&item.product_id)
                .ok_or_else(|| PricingError::Rejected(format!("unknown product {}", item.product_id)))?;
            total = unit
                .checked_mul(Decimal::from(item.quantity))
                .and_then(|line| total.checked_add(line))
                .ok_or_else(|| PricingError::Rejected(format!("total overflows at product {}", item.product_id)))?;
        }
        Ok(PriceQuote { total })
    }
}
