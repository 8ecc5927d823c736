//! Redis-backed order cache.
//!
//! Entries are JSON under `order:{key}`: `{"version": n, "order": {...}}` for a
//! snapshot, `{"version": n}` for a tombstone left by `invalidate`. `set` runs
//! as a Lua script so the version comparison and the write are atomic on the
//! server. With a TTL every entry is written with `EX`.

use crate::cache::{CacheError, CacheLookup, OrderCache};
use crate::model::{Order, OrderKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const KEY_PREFIX: &str = "order:";

/// KEYS[1] entry, ARGV[1] new entry JSON, ARGV[2] offered version, ARGV[3] TTL
/// seconds (0 = none). Returns 1 if written, 0 if a newer entry was kept.
const GUARDED_SET: &str = r#"
local current = redis.call('GET', KEYS[1])
if current then
  local ok, stored = pcall(cjson.decode, current)
  local offered = tonumber(ARGV[2])
  if ok and type(stored) == 'table' and stored.version then
    if stored.version > offered or (stored.order == nil and stored.version >= offered) then
      return 0
    end
  end
end
if tonumber(ARGV[3]) > 0 then
  redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[3])
else
  redis.call('SET', KEYS[1], ARGV[1])
end
return 1
"#;

#[derive(Debug, Serialize, Deserialize)]
struct Stored {
    version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order: Option<Order>,
}

#[derive(Debug, Clone)]
pub struct RedisCache {
    client: redis::Client,
    ttl: Option<Duration>,
}

impl RedisCache {
    /// # Arguments
    ///
    /// * `redis_url` - Redis connection URL (e.g., "redis://localhost:6379")
    /// * `ttl` - Expiry for every entry; `None` keeps them until overwritten
    pub fn new(redis_url: impl AsRef<str>, ttl: Option<Duration>) -> Result<Self, CacheError> {
        let client = redis::Client::open(redis_url.as_ref())
            .map_err(|e| CacheError::Backend(e.to_string()))?;
        Ok(Self { client, ttl })
    }

    fn redis_key(key: &OrderKey) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    fn ttl_secs(&self) -> u64 {
        self.ttl.map_or(0, |ttl| ttl.as_secs().max(1))
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection, CacheError> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| CacheError::Backend(e.to_string()))
    }
}

fn decode(json: &str) -> Result<CacheLookup, CacheError> {
    let stored: Stored = serde_json::from_str(json).map_err(|e| CacheError::Decode(e.to_string()))?;
    Ok(match stored.order {
        Some(order) => CacheLookup::Hit(order),
        None => CacheLookup::Miss,
    })
}

fn encode(stored: &Stored) -> Result<String, CacheError> {
    serde_json::to_string(stored).map_err(|e| CacheError::Decode(e.to_string()))
}

#[async_trait]
impl OrderCache for RedisCache {
    #[instrument(skip(self), err)]
    async fn get(&self, key: &OrderKey) -> Result<CacheLookup, CacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(Self::redis_key(key))
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("GET failed: {}", e)))?;

        match raw {
            Some(json) => decode(&json),
            None => Ok(CacheLookup::Miss),
        }
    }

    #[instrument(skip(self, order), fields(version = order.version), err)]
    async fn set(&self, key: &OrderKey, order: &Order) -> Result<(), CacheError> {
        let json = encode(&Stored {
            version: order.version,
            order: Some(order.clone()),
        })?;

        let mut conn = self.connection().await?;
        let written: i64 = redis::Script::new(GUARDED_SET)
            .key(Self::redis_key(key))
            .arg(json)
            .arg(order.version)
            .arg(self.ttl_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("guarded SET failed: {}", e)))?;
        if written == 0 {
            debug!(%key, offered = order.version, "Kept newer entry");
        }
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn invalidate(&self, key: &OrderKey, version: u64) -> Result<(), CacheError> {
        let json = encode(&Stored { version, order: None })?;
        let mut cmd = redis::cmd("SET");
        cmd.arg(Self::redis_key(key)).arg(json);
        if self.ttl.is_some() {
            cmd.arg("EX").arg(self.ttl_secs());
        }

        let mut conn = self.connection().await?;
        let _: () = cmd
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Backend(format!("SET tombstone failed: {}", e)))?;
        Ok(())
    }
}
