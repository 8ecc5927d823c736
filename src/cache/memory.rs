use crate::cache::{CacheError, CacheLookup, OrderCache};
use crate::model::{Order, OrderKey};
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
enum Slot {
    Snapshot(Order),
    Tombstone(u64),
}

impl Slot {
    /// Whether this slot outranks a snapshot at `version`.
    fn supersedes(&self, version: u64) -> bool {
        match self {
            Slot::Snapshot(order) => order.version > version,
            Slot::Tombstone(at) => *at >= version,
        }
    }
}

#[derive(Debug)]
struct Entry {
    slot: Slot,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Process-local cache with optional TTL.
///
/// `set` never replaces a live snapshot with one of a lower `version`, and
/// never overwrites a live tombstone at or above its version, so post-commit
/// writes that race each other converge on the newest commit. Tombstones
/// expire with the same TTL as snapshots.
#[derive(Debug, Default)]
pub struct InMemoryCache {
    ttl: Option<Duration>,
    entries: RwLock<HashMap<OrderKey, Entry>>,
}

impl InMemoryCache {
    /// `ttl` of `None` keeps entries until invalidated.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of live snapshots. Tombstones are not counted.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|e| e.is_live(now) && matches!(e.slot, Slot::Snapshot(_)))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    fn entry(&self, slot: Slot, now: Instant) -> Entry {
        Entry {
            slot,
            expires_at: self.ttl.map(|ttl| now + ttl),
        }
    }
}

#[async_trait]
impl OrderCache for InMemoryCache {
    async fn get(&self, key: &OrderKey) -> Result<CacheLookup, CacheError> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.is_live(Instant::now()) => match &entry.slot {
                Slot::Snapshot(order) => Ok(CacheLookup::Hit(order.clone())),
                Slot::Tombstone(_) => Ok(CacheLookup::Miss),
            },
            _ => Ok(CacheLookup::Miss),
        }
    }

    async fn set(&self, key: &OrderKey, order: &Order) -> Result<(), CacheError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        if let Some(existing) = entries.get(key) {
            if existing.is_live(now) && existing.slot.supersedes(order.version) {
                debug!(%key, offered = order.version, "Kept newer entry");
                return Ok(());
            }
        }
        let entry = self.entry(Slot::Snapshot(order.clone()), now);
        entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn invalidate(&self, key: &OrderKey, version: u64) -> Result<(), CacheError> {
        let now = Instant::now();
        let entry = self.entry(Slot::Tombstone(version), now);
        self.entries.write().await.insert(key.clone(), entry);
        Ok(())
    }
}
