//! Redis-backed state store.

use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::StoreResult;
use crate::store::StateStore;

/// State store over a Redis server.
#[derive(Clone)]
pub struct RedisStateStore {
    client: redis::Client,
}

impl RedisStateStore {
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let client = redis::Client::open(config.redis_url.as_str())?;
        Ok(Self { client })
    }

    async fn conn(&self) -> StoreResult<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        // SETEX rejects a zero expiry
        let secs = ttl.as_secs().max(1);
        conn.set_ex::<_, _, ()>(key, value, secs).await?;
        debug!(key = key, ttl_secs = secs, "Stored value");
        Ok(())
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn().await?;
        redis::cmd("PING").query_async::<()>(&mut conn).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_set_get_delete() {
        let store = RedisStateStore::new(&StoreConfig::from_env()).unwrap();
        store.ping().await.unwrap();

        store.set_ex("vcut:test:key", "value", Duration::from_secs(30)).await.unwrap();
        assert_eq!(store.get("vcut:test:key").await.unwrap().as_deref(), Some("value"));

        store.delete("vcut:test:key").await.unwrap();
        assert_eq!(store.get("vcut:test:key").await.unwrap(), None);
    }
}
