use crate::cache::{CacheError, CacheLookup, OrderCache};
use crate::events::{EventPublisher, PublishError};
use crate::model::{LineItem, Order, OrderEvent, OrderKey, TransitionError};
use crate::order_core::deadline::Deadline;
use crate::order_core::error::{Degradation, OrderError, ShardCountMismatch};
use crate::order_core::outcome::Committed;
use crate::order_core::settings::{CoreSettings, RetryPolicy};
use crate::pricing::{PriceQuote, PricingClient};
use crate::router::ShardRouter;
use crate::shard::Mutator;
use crate::store::{OrderShardError, ShardedStore};
use chrono::Utc;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, instrument, warn, Span};

/// What a mutation does to the cache once it has committed.
#[derive(Debug, Clone, Copy)]
enum CacheStep {
    Refresh,
    Invalidate,
}

/// Orchestrates pricing, shard writes, events and cache for every order operation.
///
/// # Flows
///
/// | Operation | Steps |
/// |-----------|-------|
/// | `create` | validate input → price → resolve → write → publish → cache set |
/// | `update` | validate input → resolve → price → update → publish → cache set |
/// | `cancel` | resolve → update → publish → cache invalidate |
/// | `get` | resolve → cache get → (miss) shard read |
///
/// Everything up to and including the shard call is pre-commit: a failure
/// there aborts the operation and nothing is written. Publish and cache are
/// post-commit: their failures are collected into
/// [`Committed::degradations`] and never undo the write.
///
/// A shard mutation whose reply is lost may still have been applied. Before
/// retrying or failing, the core reads the row back from the same shard (which
/// answers in arrival order) and treats a mutation it finds there as committed.
///
/// `OrderCore` holds no lock across any of these calls. Two mutations of the
/// same key are serialised by the shard that owns the key.
pub struct OrderCore {
    router: ShardRouter,
    store: ShardedStore,
    cache: Arc<dyn OrderCache>,
    publisher: Arc<dyn EventPublisher>,
    pricing: Arc<dyn PricingClient>,
    settings: CoreSettings,
}

impl OrderCore {
    pub fn new(
        router: ShardRouter,
        store: ShardedStore,
        cache: Arc<dyn OrderCache>,
        publisher: Arc<dyn EventPublisher>,
        pricing: Arc<dyn PricingClient>,
        settings: CoreSettings,
    ) -> Result<Self, ShardCountMismatch> {
        if router.shard_count() != store.len() {
            return Err(ShardCountMismatch {
                router: router.shard_count(),
                store: store.len(),
            });
        }
        Ok(Self {
            router,
            store,
            cache,
            publisher,
            pricing,
            settings,
        })
    }

    pub fn router(&self) -> &ShardRouter {
        &self.router
    }

    pub fn store(&self) -> &ShardedStore {
        &self.store
    }

    pub fn settings(&self) -> &CoreSettings {
        &self.settings
    }

    fn default_deadline(&self) -> Deadline {
        Deadline::after(self.settings.request_deadline)
    }

    pub async fn create(&self, key: OrderKey, items: Vec<LineItem>) -> Result<Committed, OrderError> {
        self.create_within(key, items, self.default_deadline()).await
    }

    pub async fn update(&self, key: OrderKey, items: Vec<LineItem>) -> Result<Committed, OrderError> {
        self.update_within(key, items, self.default_deadline()).await
    }

    pub async fn cancel(&self, key: OrderKey) -> Result<Committed, OrderError> {
        self.cancel_within(key, self.default_deadline()).await
    }

    pub async fn get(&self, key: OrderKey) -> Result<Order, OrderError> {
        self.get_within(key, self.default_deadline()).await
    }

    #[instrument(skip(self, key, items, deadline), fields(key = %key, shard = tracing::field::Empty))]
    pub async fn create_within(
        &self,
        key: OrderKey,
        items: Vec<LineItem>,
        deadline: Deadline,
    ) -> Result<Committed, OrderError> {
        debug!(?items, "create called");
        validate_request(&key, &items)?;

        let quote = self.price(&items, deadline).await?;
        let shard = self.resolve(&key);
        let order = Order::new(key.clone(), items, quote.total, Utc::now());

        self.insert(&order, shard, deadline).await?;
        info!(price = %order.price, "Created");

        Ok(self.settle(order, CacheStep::Refresh, deadline).await)
    }

    #[instrument(skip(self, key, items, deadline), fields(key = %key, shard = tracing::field::Empty))]
    pub async fn update_within(
        &self,
        key: OrderKey,
        items: Vec<LineItem>,
        deadline: Deadline,
    ) -> Result<Committed, OrderError> {
        debug!(?items, "update called");
        validate_request(&key, &items)?;

        let shard = self.resolve(&key);
        let quote = self.price(&items, deadline).await?;

        let price = quote.total;
        let order = self
            .apply(&key, shard, deadline, move |order: &mut Order| {
                order.revise(items.clone(), price, Utc::now())
            })
            .await?;
        info!(price = %order.price, version = order.version, "Updated");

        Ok(self.settle(order, CacheStep::Refresh, deadline).await)
    }

    #[instrument(skip(self, key, deadline), fields(key = %key, shard = tracing::field::Empty))]
    pub async fn cancel_within(&self, key: OrderKey, deadline: Deadline) -> Result<Committed, OrderError> {
        validate_key(&key)?;

        let shard = self.resolve(&key);
        let order = self
            .apply(&key, shard, deadline, |order: &mut Order| order.cancel(Utc::now()))
            .await?;
        info!(version = order.version, "Cancelled");

        Ok(self.settle(order, CacheStep::Invalidate, deadline).await)
    }

    /// Latest snapshot of an order. A cache hit may lag the shard; a miss or
    /// cache failure falls through to the shard.
    #[instrument(skip(self, key, deadline), fields(key = %key, shard = tracing::field::Empty))]
    pub async fn get_within(&self, key: OrderKey, deadline: Deadline) -> Result<Order, OrderError> {
        validate_key(&key)?;

        let shard = self.resolve(&key);
        match self.cache_call(deadline, self.cache.get(&key)).await {
            Ok(CacheLookup::Hit(order)) => {
                debug!("Cache hit");
                return Ok(order);
            }
            Ok(CacheLookup::Miss) => debug!("Cache miss"),
            Err(e) => warn!(error = %e, "Cache read failed, reading shard"),
        }

        let mut retry = self.retry(shard, deadline);
        let row = self.read_row(&key, &mut retry).await?;
        row.ok_or(OrderError::NotFound(key))
    }

    fn resolve(&self, key: &OrderKey) -> usize {
        let shard = self.router.resolve(key);
        Span::current().record("shard", shard);
        shard
    }

    async fn price(&self, items: &[LineItem], deadline: Deadline) -> Result<PriceQuote, OrderError> {
        let Some(bound) = deadline.bound(self.settings.pricing_timeout) else {
            return Err(OrderError::PricingUnavailable(
                "request deadline exceeded before pricing".to_string(),
            ));
        };
        match tokio::time::timeout(bound, self.pricing.validate(items)).await {
            Ok(Ok(quote)) => {
                debug!(total = %quote.total, "Priced");
                Ok(quote)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Pricing failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(timeout_ms = bound.as_millis() as u64, "Pricing timed out");
                Err(OrderError::PricingUnavailable(format!(
                    "no answer within {} ms",
                    bound.as_millis()
                )))
            }
        }
    }

    fn retry(&self, shard: usize, deadline: Deadline) -> ShardRetry {
        ShardRetry {
            shard,
            deadline,
            policy: self.settings.shard_retry,
            attempt: 1,
        }
    }

    /// Reads a row. Any missing answer is retried: reads change nothing.
    async fn read_row(&self, key: &OrderKey, retry: &mut ShardRetry) -> Result<Option<Order>, OrderError> {
        loop {
            let result = retry.call(self.store.read(retry.shard, key)).await?;
            match result {
                Ok(row) => return Ok(row),
                Err(e) if e.is_transient() && retry.backoff(&e).await => {}
                Err(e) => return Err(OrderError::from_shard(e, key)),
            }
        }
    }

    /// Writes a new row. After an unconfirmed write the row is read back; a
    /// row carrying this order's creation stamp means the write landed.
    async fn insert(&self, order: &Order, shard: usize, deadline: Deadline) -> Result<(), OrderError> {
        let key = &order.key;
        let mut retry = self.retry(shard, deadline);
        loop {
            let result = retry.call(self.store.write(shard, order.clone())).await?;
            match result {
                Ok(()) => return Ok(()),
                Err(e) if e.is_unconfirmed() => {
                    warn!(error = %e, "Write unconfirmed, reading back");
                    let found = self.read_row(key, &mut retry).await?;
                    match found {
                        Some(row) if row.created_at == order.created_at => {
                            info!(version = row.version, "Unconfirmed write found on shard");
                            return Ok(());
                        }
                        Some(_) => return Err(OrderError::DuplicateKey(key.clone())),
                        None if retry.backoff(&e).await => {}
                        None => return Err(OrderError::from_shard(e, key)),
                    }
                }
                Err(e) if e.is_unavailable() && retry.backoff(&e).await => {}
                Err(e) => return Err(OrderError::from_shard(e, key)),
            }
        }
    }

    /// Applies `change` to an existing row and returns the committed row.
    ///
    /// Each attempt records what its mutator produced. After an unconfirmed
    /// attempt a read on the same shard drains it; a recorded success is the
    /// committed row and a recorded refusal is the answer, so the change is
    /// never applied twice.
    async fn apply<F>(
        &self,
        key: &OrderKey,
        shard: usize,
        deadline: Deadline,
        change: F,
    ) -> Result<Order, OrderError>
    where
        F: Fn(&mut Order) -> Result<(), TransitionError> + Clone + Send + 'static,
    {
        let mut retry = self.retry(shard, deadline);
        loop {
            let outcome = Outcome::default();
            let mutator = outcome.recording(change.clone());
            let result = retry.call(self.store.update(shard, key, mutator)).await?;
            match result {
                Ok(row) => return Ok(row),
                Err(e) if e.is_unconfirmed() => {
                    warn!(error = %e, "Update unconfirmed, reading back");
                    self.read_row(key, &mut retry).await?;
                    match outcome.take() {
                        Some(Ok(row)) => {
                            info!(version = row.version, "Unconfirmed update found on shard");
                            return Ok(row);
                        }
                        Some(Err(refused)) => return Err(refused.into()),
                        None if retry.backoff(&e).await => {}
                        None => return Err(OrderError::from_shard(e, key)),
                    }
                }
                Err(e) if e.is_unavailable() && retry.backoff(&e).await => {}
                Err(e) => return Err(OrderError::from_shard(e, key)),
            }
        }
    }

    /// Post-commit side effects. Each failure becomes a degradation.
    async fn settle(&self, order: Order, step: CacheStep, deadline: Deadline) -> Committed {
        let mut degradations = Vec::new();

        if let Err(e) = self.publish(&order, deadline).await {
            warn!(error = %e, sequence = order.version, "Event unconfirmed");
            degradations.push(Degradation::EventUnconfirmed(e));
        }

        let cached = match step {
            CacheStep::Refresh => self.cache_call(deadline, self.cache.set(&order.key, &order)).await,
            CacheStep::Invalidate => self.cache_call(deadline, self.cache.invalidate(&order.key, order.version)).await,
        };
        if let Err(e) = cached {
            warn!(error = %e, ?step, "Cache not updated");
            degradations.push(Degradation::CacheStale(e));
        }

        Committed { order, degradations }
    }

    async fn publish(&self, order: &Order, deadline: Deadline) -> Result<(), PublishError> {
        let event = OrderEvent::for_commit(order).map_err(|e| PublishError::Encode(e.to_string()))?;
        let timeout = self.settings.publish_timeout;
        let Some(bound) = deadline.bound(timeout) else {
            return Err(PublishError::DeadlineExceeded);
        };
        match tokio::time::timeout(bound, self.publisher.publish(&event)).await {
            Ok(result) => result,
            Err(_) if bound < timeout => Err(PublishError::DeadlineExceeded),
            Err(_) => Err(PublishError::Timeout(timeout.as_millis() as u64)),
        }
    }

    async fn cache_call<V>(
        &self,
        deadline: Deadline,
        call: impl Future<Output = Result<V, CacheError>>,
    ) -> Result<V, CacheError> {
        let timeout = self.settings.cache_timeout;
        let Some(bound) = deadline.bound(timeout) else {
            return Err(CacheError::DeadlineExceeded);
        };
        match tokio::time::timeout(bound, call).await {
            Ok(result) => result,
            Err(_) if bound < timeout => Err(CacheError::DeadlineExceeded),
            Err(_) => Err(CacheError::Timeout(timeout.as_millis() as u64)),
        }
    }
}

/// Attempt and deadline bookkeeping for the shard calls of one operation.
struct ShardRetry {
    shard: usize,
    deadline: Deadline,
    policy: RetryPolicy,
    attempt: u32,
}

impl ShardRetry {
    /// Awaits one shard call within the request deadline.
    async fn call<V>(
        &self,
        call: impl Future<Output = Result<V, OrderShardError>>,
    ) -> Result<Result<V, OrderShardError>, OrderError> {
        let Some(left) = self.deadline.remaining() else {
            return Err(deadline_exceeded(self.shard));
        };
        tokio::time::timeout(left, call)
            .await
            .map_err(|_| deadline_exceeded(self.shard))
    }

    /// Spends one attempt and pauses. `false` once the policy is used up.
    async fn backoff(&mut self, error: &OrderShardError) -> bool {
        let attempts = self.policy.attempts.max(1);
        if self.attempt >= attempts {
            return false;
        }
        warn!(attempt = self.attempt, attempts, error = %error, "Shard call failed, retrying");
        self.attempt += 1;
        let pause = self.deadline.bound(self.policy.backoff).unwrap_or(Duration::ZERO);
        tokio::time::sleep(pause).await;
        true
    }
}

/// What one mutator run produced inside the shard, if it ran.
#[derive(Clone, Default)]
struct Outcome(Arc<Mutex<Option<Result<Order, TransitionError>>>>);

impl Outcome {
    fn recording<F>(&self, change: F) -> Mutator<Order>
    where
        F: FnOnce(&mut Order) -> Result<(), TransitionError> + Send + 'static,
    {
        let slot = self.clone();
        Box::new(move |order: &mut Order| {
            let result = change(order);
            let seen = match &result {
                Ok(()) => Ok(order.clone()),
                Err(e) => Err(e.clone()),
            };
            *slot.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(seen);
            result
        })
    }

    fn take(&self) -> Option<Result<Order, TransitionError>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).take()
    }
}

fn deadline_exceeded(shard: usize) -> OrderError {
    OrderError::ShardUnavailable {
        shard,
        reason: "request deadline exceeded".to_string(),
    }
}

fn validate_key(key: &OrderKey) -> Result<(), OrderError> {
    if key.is_blank() {
        return Err(OrderError::ValidationFailed("order key is blank".to_string()));
    }
    Ok(())
}

fn validate_request(key: &OrderKey, items: &[LineItem]) -> Result<(), OrderError> {
    validate_key(key)?;
    if items.is_empty() {
        return Err(OrderError::ValidationFailed("order has no line items".to_string()));
    }
    for item in items {
        if item.product_id.trim().is_empty() {
            return Err(OrderError::ValidationFailed("line item has a blank product id".to_string()));
        }
        if item.quantity == 0 {
            return Err(OrderError::ValidationFailed(format!(
                "line item {} has zero quantity",
                item.product_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::events::InMemoryTopic;
    use crate::model::OrderStatus;
    use crate::order_core::error::ErrorKind;
    use crate::order_core::settings::RetryPolicy;
    use crate::pricing::CatalogPricing;
    use crate::shard::{MockShard, ShardError};
    use rust_decimal::Decimal;

    fn pricing() -> Arc<CatalogPricing> {
        Arc::new(CatalogPricing::new().with_price("A", Decimal::new(1000, 2)))
    }

    fn core_over(store: ShardedStore, settings: CoreSettings) -> OrderCore {
        core_with_topic(store, settings).0
    }

    fn core_with_topic(store: ShardedStore, settings: CoreSettings) -> (OrderCore, Arc<InMemoryTopic>) {
        let topic = Arc::new(InMemoryTopic::new("order-topic", 2));
        let core = OrderCore::new(
            ShardRouter::new(store.len()).unwrap(),
            store,
            Arc::new(InMemoryCache::new(None)),
            topic.clone(),
            pricing(),
            settings,
        )
        .unwrap();
        (core, topic)
    }

    /// Store timeout shorter than the mock's reply delay.
    fn slow_store(mock: &MockShard<Order>) -> ShardedStore {
        ShardedStore::new(vec![mock.client()], Duration::from_millis(100)).unwrap()
    }

    fn row(key: &OrderKey) -> Order {
        Order::new(key.clone(), vec![LineItem::new("A", 1)], Decimal::new(1000, 2), Utc::now())
    }

    #[test]
    fn test_request_validation() {
        let key = OrderKey::from("ord-1");
        assert!(validate_request(&key, &[LineItem::new("A", 1)]).is_ok());
        for (key, items) in [
            (OrderKey::from("  "), vec![LineItem::new("A", 1)]),
            (key.clone(), vec![]),
            (key.clone(), vec![LineItem::new("A", 0)]),
            (key.clone(), vec![LineItem::new(" ", 1)]),
        ] {
            assert_eq!(
                validate_request(&key, &items).unwrap_err().kind(),
                ErrorKind::ValidationFailed
            );
        }
    }

    #[tokio::test]
    async fn test_router_and_store_must_agree() {
        let (store, _handles) = ShardedStore::spawn(2, 8, Duration::from_secs(1)).unwrap();
        let result = OrderCore::new(
            ShardRouter::new(3).unwrap(),
            store,
            Arc::new(InMemoryCache::new(None)),
            Arc::new(InMemoryTopic::new("order-topic", 2)),
            pricing(),
            CoreSettings::default(),
        );
        assert_eq!(result.err(), Some(ShardCountMismatch { router: 3, store: 2 }));
    }

    #[tokio::test]
    async fn test_unavailable_shard_is_retried() {
        let key = OrderKey::from("ord-1");
        let mut mock = MockShard::<Order>::new(0);
        mock.expect_write().return_err(ShardError::unavailable(0, "blip"));
        mock.expect_write().return_ok(());

        let store = ShardedStore::new(vec![mock.client()], Duration::from_secs(1)).unwrap();
        let core = core_over(store, CoreSettings::default());

        let committed = core.create(key, vec![LineItem::new("A", 2)]).await.unwrap();
        assert_eq!(committed.order.status, OrderStatus::Created);
        assert!(!committed.is_degraded());
        mock.verify();
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_policy() {
        let mut mock = MockShard::<Order>::new(0);
        for _ in 0..2 {
            mock.expect_write().return_err(ShardError::unavailable(0, "down"));
        }
        let store = ShardedStore::new(vec![mock.client()], Duration::from_secs(1)).unwrap();
        let settings = CoreSettings {
            shard_retry: RetryPolicy {
                attempts: 2,
                backoff: Duration::from_millis(1),
            },
            ..CoreSettings::default()
        };
        let core = core_over(store, settings);

        let result = core.create(OrderKey::from("ord-1"), vec![LineItem::new("A", 1)]).await;
        assert_eq!(
            result,
            Err(OrderError::ShardUnavailable {
                shard: 0,
                reason: "down".to_string()
            })
        );
        mock.verify();
    }

    #[tokio::test]
    async fn test_not_found_is_not_retried() {
        let key = OrderKey::from("ord-1");
        let mut mock = MockShard::<Order>::new(0);
        mock.expect_update(key.clone())
            .return_err(ShardError::NotFound(key.to_string()));
        let store = ShardedStore::new(vec![mock.client()], Duration::from_secs(1)).unwrap();
        let core = core_over(store, CoreSettings::default());

        assert_eq!(core.cancel(key.clone()).await, Err(OrderError::NotFound(key)));
        mock.verify();
    }

    #[tokio::test]
    async fn test_expired_deadline_stops_before_pricing() {
        let (store, _handles) = ShardedStore::spawn(1, 8, Duration::from_secs(1)).unwrap();
        let core = core_over(store, CoreSettings::default());

        let result = core
            .create_within(
                OrderKey::from("ord-1"),
                vec![LineItem::new("A", 1)],
                Deadline::after(Duration::ZERO),
            )
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::PricingUnavailable);
        assert_eq!(core.store().stats().await[0].rows, 0);
    }

    #[tokio::test]
    async fn test_late_write_found_on_shard_is_committed() {
        let key = OrderKey::from("ord-1");
        let mut mock = MockShard::<Order>::new(0);
        mock.expect_write().after(Duration::from_millis(150)).return_ok(());
        mock.expect_read_back(key.clone());
        let (core, topic) = core_with_topic(slow_store(&mock), CoreSettings::default());

        let committed = core.create(key.clone(), vec![LineItem::new("A", 2)]).await.unwrap();

        assert_eq!(committed.order.version, 1);
        assert!(!committed.is_degraded());
        assert_eq!(mock.written(), vec![committed.order.clone()]);
        assert_eq!(topic.events_for(&key).await.len(), 1);
        mock.verify();
    }

    #[tokio::test]
    async fn test_late_write_missing_from_shard_is_retried() {
        let key = OrderKey::from("ord-1");
        let mut mock = MockShard::<Order>::new(0);
        mock.expect_write()
            .after(Duration::from_millis(150))
            .return_err(ShardError::unavailable(0, "disk full"));
        mock.expect_read_back(key.clone());
        mock.expect_write().return_ok(());
        let (core, topic) = core_with_topic(slow_store(&mock), CoreSettings::default());

        let committed = core.create(key.clone(), vec![LineItem::new("A", 2)]).await.unwrap();

        assert_eq!(committed.order.status, OrderStatus::Created);
        assert_eq!(mock.written().len(), 1);
        assert_eq!(topic.events_for(&key).await.len(), 1);
        mock.verify();
    }

    #[tokio::test]
    async fn test_late_write_of_another_order_is_duplicate() {
        let key = OrderKey::from("ord-1");
        let mut mock = MockShard::<Order>::new(0);
        mock.expect_write().after(Duration::from_millis(150)).return_ok(());
        mock.expect_read(key.clone()).return_ok(Some(row(&key)));
        let (core, topic) = core_with_topic(slow_store(&mock), CoreSettings::default());

        let result = core.create(key.clone(), vec![LineItem::new("A", 2)]).await;

        assert_eq!(result, Err(OrderError::DuplicateKey(key)));
        assert!(topic.is_empty().await);
        mock.verify();
    }

    #[tokio::test]
    async fn test_late_cancel_is_committed_once() {
        let key = OrderKey::from("ord-1");
        let before = row(&key);
        let mut mock = MockShard::<Order>::new(0);
        mock.expect_update(key.clone())
            .after(Duration::from_millis(150))
            .apply_to(before.clone());
        mock.expect_read(key.clone()).return_ok(Some(before));
        let (core, topic) = core_with_topic(slow_store(&mock), CoreSettings::default());

        let committed = core.cancel(key.clone()).await.unwrap();

        assert_eq!(committed.order.status, OrderStatus::Cancelled);
        assert_eq!(committed.order.version, 2);
        let events = topic.events_for(&key).await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 2);
        mock.verify();
    }

    #[tokio::test]
    async fn test_late_update_is_not_applied_twice() {
        let key = OrderKey::from("ord-1");
        let before = row(&key);
        let mut mock = MockShard::<Order>::new(0);
        mock.expect_update(key.clone())
            .after(Duration::from_millis(150))
            .apply_to(before.clone());
        mock.expect_read(key.clone()).return_ok(Some(before));
        let (core, _topic) = core_with_topic(slow_store(&mock), CoreSettings::default());

        let committed = core.update(key, vec![LineItem::new("A", 3)]).await.unwrap();

        assert_eq!(committed.order.version, 2);
        assert_eq!(committed.order.price, Decimal::new(3000, 2));
        mock.verify();
    }

    #[tokio::test]
    async fn test_late_refusal_is_reported() {
        let key = OrderKey::from("ord-1");
        let mut cancelled = row(&key);
        cancelled.cancel(Utc::now()).unwrap();
        let mut mock = MockShard::<Order>::new(0);
        mock.expect_update(key.clone())
            .after(Duration::from_millis(150))
            .apply_to(cancelled.clone());
        mock.expect_read(key.clone()).return_ok(Some(cancelled));
        let (core, topic) = core_with_topic(slow_store(&mock), CoreSettings::default());

        let result = core.cancel(key.clone()).await;

        assert_eq!(
            result,
            Err(OrderError::InvalidTransition {
                key,
                from: OrderStatus::Cancelled,
                to: OrderStatus::Cancelled,
            })
        );
        assert!(topic.is_empty().await);
        mock.verify();
    }
}
