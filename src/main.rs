//! Demo: create, update and cancel one order against an in-process system.
//!
//! Configuration comes from `ORDER_*` environment variables. Without
//! `ORDER_PRICING_URL` a small in-process catalogue prices the items.

use rust_decimal::Decimal;
use sharded_orders::config::CoreConfig;
use sharded_orders::lifecycle::{setup_tracing, Backends, OrderSystem};
use sharded_orders::model::{LineItem, OrderKey};
use sharded_orders::pricing::CatalogPricing;
use std::sync::Arc;
use tracing::{error, info, Instrument};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    setup_tracing();

    let config = CoreConfig::from_env()?;
    info!(shards = config.shard_count, topic = %config.event_topic, "Starting order core");

    let catalog = CatalogPricing::new()
        .with_price("A", Decimal::new(1000, 2))
        .with_price("B", Decimal::new(450, 2));
    let backends = Backends::from_config(&config, Arc::new(catalog))?;
    let system = OrderSystem::start(&config, backends)?;

    let key = OrderKey::from("ord-1");
    let core = system.core();
    async {
        let created = core.create(key.clone(), vec![LineItem::new("A", 2)]).await?;
        info!(status = %created.order.status, price = %created.order.price, "Order created");

        let updated = core.update(key.clone(), vec![LineItem::new("A", 3)]).await?;
        info!(status = %updated.order.status, price = %updated.order.price, "Order updated");

        let cancelled = core.cancel(key.clone()).await?;
        info!(status = %cancelled.order.status, version = cancelled.order.version, "Order cancelled");

        match core.cancel(key.clone()).await {
            Err(e) => info!(kind = ?e.kind(), "Second cancel refused: {}", e),
            Ok(_) => error!("Second cancel unexpectedly succeeded"),
        }

        for stats in core.store().stats().await {
            info!(shard = stats.shard, rows = stats.rows, "Shard");
        }
        Ok::<_, BoxError>(())
    }
    .instrument(tracing::info_span!("demo", %key))
    .await?;

    drop(core);
    system.shutdown().await?;
    Ok(())
}
