use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Pool, Sqlite};
use tracing::debug;

use crate::error::AppError;
use crate::realtime::{ChangeBus, ChangeEvent, QueryCache, QueryGroup, QueryKey, RealtimeBridge};

/// Database pool plus the shared query cache and change bus. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Store {
    pool: Pool<Sqlite>,
    cache: Arc<QueryCache>,
    bus: Arc<ChangeBus>,
}

impl Store {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            cache: Arc::new(QueryCache::new()),
            bus: Arc::new(ChangeBus::default()),
        }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub fn bridge(&self) -> RealtimeBridge {
        RealtimeBridge::new(self.bus.clone(), self.cache.clone())
    }

    /// Serves `key` from the cache, or runs `fetch` and caches its result.
    pub async fn cached<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if let Some(hit) = self.cache.get::<T>(&key).await {
            debug!(group = key.group.as_str(), scope = ?key.scope, "Cache hit");
            return Ok(hit);
        }

        let epoch = self.cache.epoch(key.group).await;
        let value = fetch().await?;
        self.cache.put(key, &value, epoch).await;

        Ok(value)
    }

    /// Records a successful mutation: marks the affected groups stale, then
    /// publishes the change.
    pub async fn committed(&self, change: ChangeEvent, groups: &[QueryGroup]) {
        for group in groups {
            self.cache.invalidate_group(*group).await;
        }
        self.bus.publish(change);
    }

    pub async fn invalidate_key(&self, key: &QueryKey) {
        self.cache.invalidate(key).await;
    }
}
