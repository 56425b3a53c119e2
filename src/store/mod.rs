//! Persistent key-value store shared by the auth and browsing modules.
//!
//! Values are JSON strings. Access is last-writer-wins with no transactions.

use std::fmt::Display;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{AppError, AppResult};

pub mod file;
mod macros;
pub mod memory;
pub mod redis;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use self::redis::{create_redis_client, RedisStore};

/// Keys the application persists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Token,
    User,
    RecentIds,
    RecentDetails,
    WatchlistIds,
    WatchlistDetails,
    SelectedGenres,
    FromDate,
    ToDate,
    Genres,
}

impl StoreKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Token => "fbtoken",
            StoreKey::User => "user",
            StoreKey::RecentIds => "movies.recent",
            StoreKey::RecentDetails => "movies.recentDetailed",
            StoreKey::WatchlistIds => "movies.watchlist",
            StoreKey::WatchlistDetails => "movies.watchlistDetails",
            StoreKey::SelectedGenres => "filters.selectedGenres",
            StoreKey::FromDate => "filters.fromDate",
            StoreKey::ToDate => "filters.toDate",
            StoreKey::Genres => "genres",
        }
    }
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw string storage backend
#[async_trait::async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    async fn set(&self, key: &str, value: String) -> AppResult<()>;

    /// Removes a key. Missing keys are not an error.
    async fn remove(&self, key: &str) -> AppResult<()>;

    async fn clear(&self) -> AppResult<()>;

    /// All stored key/value pairs, in no particular order
    async fn entries(&self) -> AppResult<Vec<(String, String)>>;
}

/// Typed handle over a shared [`KeyValueStore`]
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn KeyValueStore>,
}

impl Store {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store backed by process memory only
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Reads and deserializes the value under `key`.
    ///
    /// Returns `None` when the key is absent or holds JSON `null`.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &StoreKey) -> AppResult<Option<T>> {
        let raw = self.backend.get(key.as_str()).await?;

        match raw {
            Some(json) => {
                let value: Option<T> = serde_json::from_str(&json).map_err(|e| {
                    AppError::Storage(format!("Stored value under {} is invalid: {}", key, e))
                })?;
                Ok(value)
            }
            None => Ok(None),
        }
    }

    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &StoreKey, value: &T) -> AppResult<()> {
        let json = serde_json::to_string(value)?;
        self.backend.set(key.as_str(), json).await
    }

    pub async fn remove(&self, key: &StoreKey) -> AppResult<()> {
        self.backend.remove(key.as_str()).await
    }

    pub async fn clear(&self) -> AppResult<()> {
        self.backend.clear().await
    }

    /// Approximate footprint of everything stored, in MiB, counting two bytes per
    /// character of each stored value.
    pub async fn usage_mb(&self) -> AppResult<f64> {
        let entries = self.backend.entries().await?;
        let bytes: usize = entries
            .iter()
            .map(|(_, value)| value.chars().count() * 2)
            .sum();
        Ok(bytes as f64 / 1024.0 / 1024.0)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store").finish_non_exhaustive()
    }
}
