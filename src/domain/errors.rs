//! Domain errors for the flagstate service.

use thiserror::Error;

use super::models::FlagId;

/// Errors surfaced to callers of the flag repository.
///
/// Cache and snapshot failures never appear here: they are absorbed by the
/// repository and degrade to Store reads or no-op invalidations.
#[derive(Debug, Error)]
pub enum FlagError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Feature flag not found: {0}")]
    NotFound(FlagId),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Notification error: {0}")]
    Notification(String),
}

pub type FlagResult<T> = Result<T, FlagError>;

/// Errors raised by a durable flag store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl From<StoreError> for FlagError {
    fn from(err: StoreError) -> Self {
        FlagError::Storage(err.to_string())
    }
}

/// Errors raised by the ephemeral snapshot cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache operation timed out")]
    Timeout,
}

/// Errors raised while decoding a cached snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Incompatible snapshot format {found} (expected {expected})")]
    IncompatibleFormat { found: u32, expected: u32 },
}

/// Errors raised by either side of the change notifier.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Notification operation timed out")]
    Timeout,

    #[error("Notification channel closed")]
    Closed,

    #[error("Subscriber lagged behind, {0} messages skipped")]
    Lagged(u64),

    #[error("Undecodable notification payload: {0}")]
    Decode(String),
}

impl From<NotificationError> for FlagError {
    fn from(err: NotificationError) -> Self {
        FlagError::Notification(err.to_string())
    }
}
