#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use sharded_orders::cache::{CacheError, CacheLookup, InMemoryCache, OrderCache};
use sharded_orders::events::{EventPublisher, InMemoryTopic, PublishError};
use sharded_orders::model::{LineItem, Order, OrderEvent, OrderKey};
use sharded_orders::order_core::{CoreSettings, OrderCore};
use sharded_orders::pricing::{CatalogPricing, PriceQuote, PricingClient, PricingError};
use sharded_orders::router::ShardRouter;
use sharded_orders::store::ShardedStore;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A = 10.00, B = 4.50
pub fn catalog() -> CatalogPricing {
    CatalogPricing::new()
        .with_price("A", Decimal::new(1000, 2))
        .with_price("B", Decimal::new(450, 2))
}

pub fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

pub fn items(product: &str, quantity: u32) -> Vec<LineItem> {
    vec![LineItem::new(product, quantity)]
}

/// A real core over real shard tasks, with the collaborators exposed for inspection.
pub struct Harness {
    pub core: Arc<OrderCore>,
    pub topic: Arc<InMemoryTopic>,
    pub cache: Arc<InMemoryCache>,
}

pub struct HarnessBuilder {
    shards: usize,
    settings: CoreSettings,
    pricing: Arc<dyn PricingClient>,
    publisher: Option<Arc<dyn EventPublisher>>,
    cache: Option<Arc<dyn OrderCache>>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            shards: 3,
            settings: CoreSettings::default(),
            pricing: Arc::new(catalog()),
            publisher: None,
            cache: None,
        }
    }

    pub fn shards(mut self, shards: usize) -> Self {
        self.shards = shards;
        self
    }

    pub fn settings(mut self, settings: CoreSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn pricing(mut self, pricing: impl PricingClient + 'static) -> Self {
        self.pricing = Arc::new(pricing);
        self
    }

    pub fn publisher(mut self, publisher: impl EventPublisher + 'static) -> Self {
        self.publisher = Some(Arc::new(publisher));
        self
    }

    pub fn cache(mut self, cache: impl OrderCache + 'static) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn build(self) -> Harness {
        let topic = Arc::new(InMemoryTopic::new("order-topic", 4));
        let cache = Arc::new(InMemoryCache::new(None));
        let (store, _handles) =
            ShardedStore::spawn(self.shards, 16, Duration::from_secs(1)).expect("shards");

        let core = OrderCore::new(
            ShardRouter::new(self.shards).expect("router"),
            store,
            self.cache.unwrap_or_else(|| cache.clone() as Arc<dyn OrderCache>),
            self.publisher.unwrap_or_else(|| topic.clone() as Arc<dyn EventPublisher>),
            self.pricing,
            self.settings,
        )
        .expect("core");

        Harness {
            core: Arc::new(core),
            topic,
            cache,
        }
    }
}

pub fn harness() -> Harness {
    HarnessBuilder::new().build()
}

/// Total rows across every shard.
pub async fn total_rows(core: &OrderCore) -> usize {
    core.store().stats().await.iter().map(|s| s.rows).sum()
}

/// Pricing that answers after `delay`.
pub struct SlowPricing {
    pub delay: Duration,
}

#[async_trait]
impl PricingClient for SlowPricing {
    async fn validate(&self, items: &[LineItem]) -> Result<PriceQuote, PricingError> {
        tokio::time::sleep(self.delay).await;
        catalog().validate(items).await
    }
}

/// Pricing that counts its calls.
#[derive(Default)]
pub struct CountingPricing {
    pub calls: Arc<AtomicUsize>,
}

#[async_trait]
impl PricingClient for CountingPricing {
    async fn validate(&self, items: &[LineItem]) -> Result<PriceQuote, PricingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        catalog().validate(items).await
    }
}

/// Broker that is down.
pub struct FailingPublisher;

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(&self, _event: &OrderEvent) -> Result<(), PublishError> {
        Err(PublishError::Broker("connection refused".to_string()))
    }
}

/// Broker that accepts after `delay`.
pub struct SlowPublisher {
    pub delay: Duration,
}

#[async_trait]
impl EventPublisher for SlowPublisher {
    async fn publish(&self, _event: &OrderEvent) -> Result<(), PublishError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

/// Cache whose every call fails.
pub struct FailingCache;

#[async_trait]
impl OrderCache for FailingCache {
    async fn get(&self, _key: &OrderKey) -> Result<CacheLookup, CacheError> {
        Err(CacheError::Backend("cache down".to_string()))
    }

    async fn set(&self, _key: &OrderKey, _order: &Order) -> Result<(), CacheError> {
        Err(CacheError::Backend("cache down".to_string()))
    }

    async fn invalidate(&self, _key: &OrderKey, _version: u64) -> Result<(), CacheError> {
        Err(CacheError::Backend("cache down".to_string()))
    }
}

/// In-memory cache whose `set` takes `delay` to land.
pub struct SlowSetCache {
    pub inner: Arc<InMemoryCache>,
    pub delay: Duration,
}

#[async_trait]
impl OrderCache for SlowSetCache {
    async fn get(&self, key: &OrderKey) -> Result<CacheLookup, CacheError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &OrderKey, order: &Order) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, order).await
    }

    async fn invalidate(&self, key: &OrderKey, version: u64) -> Result<(), CacheError> {
        self.inner.invalidate(key, version).await
    }
}
