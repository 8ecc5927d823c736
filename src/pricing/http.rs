//! HTTP pricing client.
//!
//! `POST {base_url}/pricing` with `{"items": [{"product_id", "quantity"}, …]}`.
//! The service answers `{"total_price": "<decimal>", "available": bool}`.
//!
//! | Outcome | Error |
//! |---------|-------|
//! | 2xx, `available: false` | `Rejected` |
//! | 4xx | `Rejected` |
//! | 5xx, connect failure, bad body, negative total | `Unavailable` |
//! | no answer within the timeout | `Timeout` |

use crate::model::LineItem;
use crate::pricing::{PriceQuote, PricingClient, PricingError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Serialize)]
struct PricingRequest<'a> {
    items: &'a [LineItem],
}

#[derive(Deserialize)]
struct PricingResponse {
    total_price: Decimal,
    available: bool,
}

/// Pooled client for the pricing service. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpPricingClient {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpPricingClient {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, PricingError> {
        let endpoint = format!("{}/pricing", base_url.as_ref().trim_end_matches('/'));
        reqwest::Url::parse(&endpoint)
            .map_err(|e| PricingError::Unavailable(format!("invalid pricing url {}: {}", endpoint, e)))?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PricingError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, e: reqwest::Error) -> PricingError {
        if e.is_timeout() {
            PricingError::Timeout(self.timeout.as_millis() as u64)
        } else {
            PricingError::Unavailable(e.to_string())
        }
    }
}

#[async_trait]
impl PricingClient for HttpPricingClient {
    #[instrument(skip(self, items), fields(lines = items.len()))]
    async fn validate(&self, items: &[LineItem]) -> Result<PriceQuote, PricingError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&PricingRequest { items })
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PricingError::Rejected(format!("{}: {}", status, body)));
        }
        if !status.is_success() {
            return Err(PricingError::Unavailable(format!("pricing answered {}", status)));
        }

        let body: PricingResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                PricingError::Unavailable(format!("malformed pricing response: {}", e))
            }
        })?;
        if !body.available {
            return Err(PricingError::Rejected("items not available".to_string()));
        }
        if body.total_price.is_sign_negative() {
            return Err(PricingError::Unavailable(format!(
                "pricing answered negative total {}",
                body.total_price
            )));
        }

        debug!(total = %body.total_price, "Priced");
        Ok(PriceQuote {
            total: body.total_price,
        })
    }
}
