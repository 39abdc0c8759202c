//! Common test utilities for integration tests
//!
//! Provides an in-memory database, test doubles for every port and a
//! repository builder used across the integration test files.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

use flagstate::adapters::cache::MokaSnapshotCache;
use flagstate::adapters::sqlite::{create_migrated_test_pool, SqliteFlagStore};
use flagstate::domain::errors::{CacheError, NotificationError, StoreError};
use flagstate::domain::models::{FeatureFlag, FlagChange, FlagId};
use flagstate::domain::ports::{ChangePublisher, FlagStore, SnapshotCache};
use flagstate::services::{FlagRepository, NotificationDispatcher, RepositorySettings};

pub const NOTIFY_TIMEOUT: Duration = Duration::from_secs(1);

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
/// Call this at the beginning of tests that need logging.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Fresh SQLite store over an in-memory database with migrations applied.
pub async fn sqlite_store() -> SqliteFlagStore {
    let pool = create_migrated_test_pool()
        .await
        .expect("Failed to create test pool");
    SqliteFlagStore::new(pool)
}

/// Store wrapper that counts calls per operation.
pub struct CountingStore<S> {
    inner: S,
    selects: AtomicUsize,
    writes: AtomicUsize,
}

impl<S: FlagStore> CountingStore<S> {
    pub fn new(inner: S) -> Arc<Self> {
        Arc::new(Self {
            inner,
            selects: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    pub fn selects(&self) -> usize {
        self.selects.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<S: FlagStore> FlagStore for CountingStore<S> {
    async fn insert(&self, name: &str, enabled: bool) -> Result<FeatureFlag, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.insert(name, enabled).await
    }

    async fn select_all(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        self.selects.fetch_add(1, Ordering::SeqCst);
        self.inner.select_all().await
    }

    async fn update(&self, id: FlagId, name: &str, enabled: bool) -> Result<u64, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(id, name, enabled).await
    }

    async fn delete(&self, id: FlagId) -> Result<u64, StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(id).await
    }
}

/// Store whose every call fails.
pub struct BrokenStore;

#[async_trait]
impl FlagStore for BrokenStore {
    async fn insert(&self, _name: &str, _enabled: bool) -> Result<FeatureFlag, StoreError> {
        Err(StoreError::Corrupt("store offline".to_string()))
    }

    async fn select_all(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        Err(StoreError::Corrupt("store offline".to_string()))
    }

    async fn update(&self, _id: FlagId, _name: &str, _enabled: bool) -> Result<u64, StoreError> {
        Err(StoreError::Corrupt("store offline".to_string()))
    }

    async fn delete(&self, _id: FlagId) -> Result<u64, StoreError> {
        Err(StoreError::Corrupt("store offline".to_string()))
    }
}

/// Store whose every call never completes.
pub struct HangStore;

#[async_trait]
impl FlagStore for HangStore {
    async fn insert(&self, _name: &str, _enabled: bool) -> Result<FeatureFlag, StoreError> {
        std::future::pending().await
    }

    async fn select_all(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        std::future::pending().await
    }

    async fn update(&self, _id: FlagId, _name: &str, _enabled: bool) -> Result<u64, StoreError> {
        std::future::pending().await
    }

    async fn delete(&self, _id: FlagId) -> Result<u64, StoreError> {
        std::future::pending().await
    }
}

/// Signals of one held `select_all` call on a [`GatedStore`].
pub struct HeldRead {
    /// Fires once the rows have been read and the call is parked
    pub read: oneshot::Receiver<()>,
    /// Send to let the parked call return its rows
    pub release: oneshot::Sender<()>,
}

/// Store that can park the next `select_all` after it has read its rows.
pub struct GatedStore<S> {
    inner: S,
    gate: Mutex<Option<(oneshot::Sender<()>, oneshot::Receiver<()>)>>,
}

impl<S: FlagStore> GatedStore<S> {
    pub fn new(inner: S) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: Mutex::new(None),
        })
    }

    /// Hold the next `select_all` until released.
    pub fn hold_next_read(&self) -> HeldRead {
        let (read_tx, read_rx) = oneshot::channel();
        let (release_tx, release_rx) = oneshot::channel();
        *self.gate.lock().unwrap() = Some((read_tx, release_rx));
        HeldRead {
            read: read_rx,
            release: release_tx,
        }
    }
}

#[async_trait]
impl<S: FlagStore> FlagStore for GatedStore<S> {
    async fn insert(&self, name: &str, enabled: bool) -> Result<FeatureFlag, StoreError> {
        self.inner.insert(name, enabled).await
    }

    async fn select_all(&self) -> Result<Vec<FeatureFlag>, StoreError> {
        let gate = self.gate.lock().unwrap().take();
        let rows = self.inner.select_all().await?;
        if let Some((read, release)) = gate {
            let _ = read.send(());
            let _ = release.await;
        }
        Ok(rows)
    }

    async fn update(&self, id: FlagId, name: &str, enabled: bool) -> Result<u64, StoreError> {
        self.inner.update(id, name, enabled).await
    }

    async fn delete(&self, id: FlagId) -> Result<u64, StoreError> {
        self.inner.delete(id).await
    }
}

/// Cache that refuses every operation.
pub struct UnavailableCache;

#[async_trait]
impl SnapshotCache for UnavailableCache {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

/// Cache that hangs for `delay` before answering from an inner cache.
pub struct SlowCache {
    pub delay: Duration,
    pub inner: MokaSnapshotCache,
}

#[async_trait]
impl SnapshotCache for SlowCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(key).await
    }
}

/// Publisher that keeps every change it is given.
#[derive(Default)]
pub struct RecordingPublisher {
    published: Mutex<Vec<FlagChange>>,
}

impl RecordingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<FlagChange> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangePublisher for RecordingPublisher {
    async fn publish(&self, change: &FlagChange) -> Result<(), NotificationError> {
        self.published.lock().unwrap().push(change.clone());
        Ok(())
    }
}

/// Publisher that is never reachable.
#[derive(Default)]
pub struct FailingPublisher {
    attempts: AtomicUsize,
}

impl FailingPublisher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChangePublisher for FailingPublisher {
    async fn publish(&self, _change: &FlagChange) -> Result<(), NotificationError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(NotificationError::Publish("broker unreachable".to_string()))
    }
}

/// Publisher whose every call never completes.
pub struct HangPublisher;

#[async_trait]
impl ChangePublisher for HangPublisher {
    async fn publish(&self, _change: &FlagChange) -> Result<(), NotificationError> {
        std::future::pending().await
    }
}

/// Repository with a strict dispatcher over `publisher`.
pub fn strict_repository(
    store: Arc<dyn FlagStore>,
    cache: Arc<dyn SnapshotCache>,
    publisher: Arc<dyn ChangePublisher>,
    settings: RepositorySettings,
) -> FlagRepository {
    FlagRepository::new(
        store,
        cache,
        NotificationDispatcher::strict(publisher, NOTIFY_TIMEOUT),
        settings,
    )
}

/// Settings with a short cache deadline so slow-cache tests finish quickly.
pub fn fast_settings() -> RepositorySettings {
    RepositorySettings {
        cache_timeout: Duration::from_millis(50),
        ..RepositorySettings::default()
    }
}
