use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::CacheError;

/// Best-effort key-value cache holding serialized snapshots.
///
/// The cache holds no authority. Callers must treat every error as a miss
/// (for reads) or a no-op (for writes).
#[async_trait]
pub trait SnapshotCache: Send + Sync {
    /// Fetch the bytes stored under `key`, or `None` when absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}
