use anyhow::Result;
use async_trait::async_trait;

use crate::types::MovieDetailEntity;

/// TTL cache for raw page bodies.
#[async_trait]
pub trait PageCache: Send + Sync {
    async fn get_cache(&self, key: &str, now: i64) -> Result<Option<String>>;
    async fn put_cache(&self, key: &str, payload: &str, expires_at: i64) -> Result<()>;
}

/// Persisted movie detail rows, keyed by title.
#[async_trait]
pub trait DetailStore: Send + Sync {
    async fn get(&self, title: &str) -> Result<Option<MovieDetailEntity>>;
    async fn put(&self, record: &MovieDetailEntity) -> Result<()>;
    async fn list(&self) -> Result<Vec<MovieDetailEntity>>;
    /// Returns the number of rows removed.
    async fn remove(&self, title: &str) -> Result<u64>;
}
