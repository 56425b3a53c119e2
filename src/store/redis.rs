use redis::AsyncCommands;
use redis::Client;

use super::KeyValueStore;
use crate::error::AppResult;

const KEY_PREFIX: &str = "watto:";

/// Creates a Redis client for the shared store
///
/// Connections are multiplexed and opened per operation.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Store backed by Redis, namespaced under `watto:`
#[derive(Clone)]
pub struct RedisStore {
    redis_client: Client,
}

impl RedisStore {
    pub fn new(redis_client: Client) -> Self {
        Self { redis_client }
    }

    fn namespaced(key: &str) -> String {
        format!("{}{}", KEY_PREFIX, key)
    }

    async fn namespaced_keys(&self) -> AppResult<Vec<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let keys: Vec<String> = conn.keys(format!("{}*", KEY_PREFIX)).await?;
        Ok(keys)
    }
}

#[async_trait::async_trait]
impl KeyValueStore for RedisStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get(Self::namespaced(key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: String) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set(Self::namespaced(key), value).await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(Self::namespaced(key)).await?;
        Ok(())
    }

    async fn clear(&self) -> AppResult<()> {
        let keys = self.namespaced_keys().await?;
        if keys.is_empty() {
            return Ok(());
        }

        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.del(keys).await?;
        tracing::info!("Cleared Redis store");
        Ok(())
    }

    async fn entries(&self) -> AppResult<Vec<(String, String)>> {
        let keys = self.namespaced_keys().await?;
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;

        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let value: Option<String> = conn.get(&key).await?;
            if let Some(value) = value {
                let key = key.trim_start_matches(KEY_PREFIX).to_string();
                entries.push((key, value));
            }
        }
        Ok(entries)
    }
}

// These tests need a running Redis; point REDIS_URL at one to run them.
