use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{Config, error::CacheError};

pub mod memory;
pub mod upstash;

pub use memory::MemoryCache;
pub use upstash::UpstashCache;

/// Key/value store with expiring entries.
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;
}

/// Pick the cache backend described by `config`: Upstash when both URL and
/// token are configured, a process-local cache otherwise.
pub fn cache_from_config(config: &Config) -> anyhow::Result<Arc<dyn CacheStore>> {
    let store: Arc<dyn CacheStore> = match (&config.cache.url, &config.cache.token) {
        (Some(url), Some(token)) => Arc::new(UpstashCache::new(url.clone(), token.clone())?),
        _ => Arc::new(MemoryCache::new()),
    };

    Ok(store)
}
