use crate::cache::{InMemoryCache, OrderCache};
use crate::config::CoreConfig;
use crate::events::{EventPublisher, InMemoryTopic};
use crate::order_core::{OrderCore, ShardCountMismatch};
use crate::pricing::{HttpPricingClient, PricingClient, PricingError};
use crate::router::RouterError;
use crate::store::ShardedStore;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("invalid shard layout: {0}")]
    Router(#[from] RouterError),

    #[error(transparent)]
    Mismatch(#[from] ShardCountMismatch),

    #[error("pricing client: {0}")]
    Pricing(#[from] PricingError),

    #[error("backend setup failed: {0}")]
    Backend(String),

    #[error("shard {shard} task failed: {reason}")]
    ShardFailed { shard: usize, reason: String },

    #[error("{pending} shard task(s) still running after {timeout_ms} ms")]
    DrainTimeout { pending: usize, timeout_ms: u64 },
}

/// The collaborators the core talks to besides its shards.
#[derive(Clone)]
pub struct Backends {
    pub cache: Arc<dyn OrderCache>,
    pub publisher: Arc<dyn EventPublisher>,
    pub pricing: Arc<dyn PricingClient>,
}

impl Backends {
    /// In-process cache and topic sized from `config`, with the given pricing client.
    pub fn in_memory(config: &CoreConfig, pricing: Arc<dyn PricingClient>) -> Self {
        Self {
            cache: Arc::new(InMemoryCache::new(config.cache_ttl)),
            publisher: Arc::new(InMemoryTopic::new(
                config.event_topic.clone(),
                config.event_partitions,
            )),
            pricing,
        }
    }

    /// Backends selected by `config`.
    ///
    /// `ORDER_PRICING_URL` switches pricing to [`HttpPricingClient`]; otherwise
    /// `fallback_pricing` is used. With the `redis` feature, `ORDER_REDIS_URL`
    /// switches the cache and the publisher to Redis.
    pub fn from_config(
        config: &CoreConfig,
        fallback_pricing: Arc<dyn PricingClient>,
    ) -> Result<Self, LifecycleError> {
        let pricing: Arc<dyn PricingClient> = match &config.pricing_url {
            Some(url) => Arc::new(HttpPricingClient::new(url, config.pricing_timeout)?),
            None => fallback_pricing,
        };
        let backends = Self::in_memory(config, pricing);

        #[cfg(feature = "redis")]
        if let Some(url) = &config.redis_url {
            let cache = crate::cache::RedisCache::new(url, config.cache_ttl)
                .map_err(|e| LifecycleError::Backend(e.to_string()))?;
            let publisher = crate::events::RedisStreamPublisher::new(
                url,
                config.event_topic.clone(),
                config.event_partitions,
            )
            .map_err(|e| LifecycleError::Backend(e.to_string()))?;
            return Ok(Self {
                cache: Arc::new(cache),
                publisher: Arc::new(publisher),
                pricing: backends.pricing,
            });
        }

        #[cfg(not(feature = "redis"))]
        if config.redis_url.is_some() {
            tracing::warn!("ORDER_REDIS_URL is set but the redis feature is disabled; using in-memory backends");
        }

        Ok(backends)
    }
}

/// Runtime orchestrator for the sharded order core.
///
/// `OrderSystem` is responsible for:
/// - **Lifecycle Management**: spawning one task per shard and stopping them
/// - **Dependency Wiring**: building the router, the store and the [`OrderCore`]
///
/// # Example
///
/// ```ignore
/// let config = CoreConfig::from_env()?;
/// let backends = Backends::in_memory(&config, Arc::new(CatalogPricing::new()));
/// let system = OrderSystem::start(&config, backends)?;
///
/// let committed = system.core().create(key, items).await?;
///
/// system.shutdown().await?;
/// ```
pub struct OrderSystem {
    core: Arc<OrderCore>,
    handles: Vec<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl OrderSystem {
    /// Spawns the shard tasks and builds the core. Must be called inside a Tokio runtime.
    pub fn start(config: &CoreConfig, backends: Backends) -> Result<Self, LifecycleError> {
        let router = config.router()?;
        let (store, handles) = ShardedStore::spawn(
            router.shard_count(),
            config.shard_buffer,
            config.store_timeout,
        )
        .ok_or(RouterError::InvalidShardCount(0))?;

        let core = OrderCore::new(
            router,
            store,
            backends.cache,
            backends.publisher,
            backends.pricing,
            config.core_settings(),
        )?;

        info!(shards = handles.len(), "Order system started");
        Ok(Self {
            core: Arc::new(core),
            handles,
            shutdown_timeout: config.shutdown_timeout,
        })
    }

    /// Shared handle to the core. Clones must be dropped before [`shutdown`](Self::shutdown)
    /// can drain the shards.
    pub fn core(&self) -> Arc<OrderCore> {
        self.core.clone()
    }

    /// Gracefully shuts down the system.
    ///
    /// 1. Drops the core, which drops the last shard clients and closes the channels
    /// 2. Waits for every shard task to finish its queue, within the shutdown timeout
    /// 3. Returns an error if a task panicked or did not finish in time
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down order system...");
        drop(self.core);

        let timeout = self.shutdown_timeout;
        let mut handles = self.handles;
        let drain = async {
            for (shard, handle) in handles.iter_mut().enumerate() {
                if let Err(e) = handle.await {
                    error!(shard, "Shard task failed: {:?}", e);
                    return Err(LifecycleError::ShardFailed {
                        shard,
                        reason: e.to_string(),
                    });
                }
            }
            Ok(())
        };

        let drained = tokio::time::timeout(timeout, drain).await;
        match drained {
            Ok(result) => result?,
            Err(_) => {
                let pending = handles.iter().filter(|h| !h.is_finished()).count();
                error!(pending, "Shutdown timed out");
                return Err(LifecycleError::DrainTimeout {
                    pending,
                    timeout_ms: timeout.as_millis() as u64,
                });
            }
        }

        info!("Order system shutdown complete.");
        Ok(())
    }
}
