mod common;

use common::{catalog, items};
use sharded_orders::config::CoreConfig;
use sharded_orders::lifecycle::{Backends, LifecycleError, OrderSystem};
use sharded_orders::model::{OrderKey, OrderStatus};
use std::sync::Arc;
use std::time::Duration;

fn config(shards: usize) -> CoreConfig {
    CoreConfig {
        shard_count: shards,
        shutdown_timeout: Duration::from_millis(200),
        ..CoreConfig::default()
    }
}

#[tokio::test]
async fn test_start_serve_shutdown() {
    let config = config(4);
    let system = OrderSystem::start(&config, Backends::in_memory(&config, Arc::new(catalog()))).unwrap();

    let core = system.core();
    let key = OrderKey::from("ord-1");
    core.create(key.clone(), items("A", 1)).await.unwrap();
    assert_eq!(core.get(key).await.unwrap().status, OrderStatus::Created);
    assert_eq!(core.store().len(), 4);
    drop(core);

    assert!(system.shutdown().await.is_ok());
}

#[tokio::test]
async fn test_shutdown_reports_shards_held_open() {
    let config = config(2);
    let system = OrderSystem::start(&config, Backends::in_memory(&config, Arc::new(catalog()))).unwrap();

    // An outstanding core keeps every shard channel open.
    let held = system.core();
    let result = system.shutdown().await;

    match result {
        Err(LifecycleError::DrainTimeout { pending, timeout_ms }) => {
            assert_eq!(pending, 2);
            assert_eq!(timeout_ms, 200);
        }
        other => panic!("expected drain timeout, got {:?}", other),
    }
    drop(held);
}

#[tokio::test]
async fn test_in_memory_backends_from_config() {
    let config = CoreConfig::from_lookup(|name| match name {
        "ORDER_SHARD_COUNT" => Some("5".to_string()),
        "ORDER_EVENT_PARTITIONS" => Some("2".to_string()),
        _ => None,
    })
    .unwrap();
    let backends = Backends::from_config(&config, Arc::new(catalog())).unwrap();
    let system = OrderSystem::start(&config, backends).unwrap();

    let core = system.core();
    assert_eq!(core.router().shard_count(), 5);
    let committed = core.create(OrderKey::from("ord-9"), items("B", 2)).await.unwrap();
    assert!(!committed.is_degraded());
    drop(core);

    system.shutdown().await.unwrap();
}

#[cfg(not(feature = "redis"))]
#[tokio::test]
async fn test_redis_url_without_feature_falls_back() {
    let config = CoreConfig {
        redis_url: Some("redis://127.0.0.1:1".to_string()),
        ..config(2)
    };
    let backends = Backends::from_config(&config, Arc::new(catalog())).unwrap();
    let system = OrderSystem::start(&config, backends).unwrap();

    let core = system.core();
    let committed = core.create(OrderKey::from("ord-1"), items("A", 1)).await.unwrap();
    assert!(!committed.is_degraded());
    drop(core);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bad_pricing_url_fails_startup() {
    let config = CoreConfig {
        pricing_url: Some("not a url".to_string()),
        ..config(1)
    };
    let result = Backends::from_config(&config, Arc::new(catalog()));
    assert!(matches!(result, Err(LifecycleError::Pricing(_))));
}
