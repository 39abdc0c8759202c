//! Cache-aside repository over the flag store.
//!
//! Reads consult the snapshot cache before the store and repopulate it on a
//! miss. Writes go to the store first, then invalidate the snapshot, then
//! hand a change notification to the dispatcher. Store and cache are updated
//! in separate steps, so readers accept a bounded staleness window:
//!
//! - update/delete invalidate the snapshot, so the next read hits the store;
//! - create leaves the snapshot alone unless `invalidate_on_create` is set,
//!   so a cached snapshot may miss the new flag until its TTL runs out.
//!
//! A read that overlaps an invalidation does not write its rows back: every
//! invalidation bumps a generation counter shared by all clones, and a reader
//! whose generation moved while it queried the store leaves the cache empty.
//!
//! Cache failures of any kind are absorbed here and never reach the caller.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::notification_dispatcher::NotificationDispatcher;
use super::snapshot_codec::{decode_snapshot, encode_snapshot};
use crate::domain::errors::{CacheError, FlagError, FlagResult, StoreError};
use crate::domain::models::{Config, FeatureFlag, FlagChange, FlagId, NewFeatureFlag};
use crate::domain::ports::{FlagStore, SnapshotCache};

/// Tunables for [`FlagRepository`].
#[derive(Debug, Clone)]
pub struct RepositorySettings {
    pub snapshot_key: String,
    pub snapshot_ttl: Duration,
    pub invalidate_on_create: bool,
    pub store_timeout: Duration,
    pub cache_timeout: Duration,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RepositorySettings {
    fn from(config: &Config) -> Self {
        Self {
            snapshot_key: config.cache.snapshot_key.clone(),
            snapshot_ttl: config.cache.ttl(),
            invalidate_on_create: config.cache.invalidate_on_create,
            store_timeout: Duration::from_millis(config.timeouts.store_ms),
            cache_timeout: Duration::from_millis(config.timeouts.cache_ms),
        }
    }
}

/// Read/write operations over feature flags.
///
/// Cloning is cheap; clones share the same store, cache and dispatcher.
#[derive(Clone)]
pub struct FlagRepository {
    store: Arc<dyn FlagStore>,
    cache: Arc<dyn SnapshotCache>,
    notifier: NotificationDispatcher,
    settings: RepositorySettings,
    generation: Arc<AtomicU64>,
}

impl FlagRepository {
    pub fn new(
        store: Arc<dyn FlagStore>,
        cache: Arc<dyn SnapshotCache>,
        notifier: NotificationDispatcher,
        settings: RepositorySettings,
    ) -> Self {
        Self {
            store,
            cache,
            notifier,
            settings,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn settings(&self) -> &RepositorySettings {
        &self.settings
    }

    /// All flags, ordered by id.
    ///
    /// Served from the cached snapshot when one is present and readable,
    /// otherwise from the store, in which case the snapshot is refreshed.
    /// Only store failures are reported.
    pub async fn get_all(&self) -> FlagResult<Vec<FeatureFlag>> {
        if let Some(flags) = self.read_snapshot().await {
            tracing::debug!(count = flags.len(), "Serving feature flags from cache");
            return Ok(flags);
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let flags = self.store_call("select_all", self.store.select_all()).await?;
        self.write_snapshot(&flags, generation).await;

        tracing::debug!(
            count = flags.len(),
            "Serving feature flags from store and refreshing cache"
        );
        Ok(flags)
    }

    /// Insert a new flag. The store assigns its id and creation time.
    pub async fn create(&self, flag: impl Into<NewFeatureFlag> + Send) -> FlagResult<FeatureFlag> {
        let flag = flag.into();
        flag.validate()?;

        let created = self
            .store_call("insert", self.store.insert(&flag.name, flag.enabled))
            .await?;
        tracing::info!(
            flag_id = created.id,
            name = %created.name,
            enabled = created.enabled,
            "Feature flag created"
        );

        if self.settings.invalidate_on_create {
            self.invalidate_snapshot().await;
        }
        self.notify(FlagChange::created(created.id)).await?;

        Ok(created)
    }

    /// Overwrite name and enabled of an existing flag.
    ///
    /// `id` selects the flag; `created_at` is ignored.
    pub async fn update(&self, flag: &FeatureFlag) -> FlagResult<()> {
        flag.validate_for_update()?;

        let affected = self
            .store_call("update", self.store.update(flag.id, &flag.name, flag.enabled))
            .await?;
        if affected == 0 {
            return Err(FlagError::NotFound(flag.id));
        }
        tracing::info!(
            flag_id = flag.id,
            name = %flag.name,
            enabled = flag.enabled,
            "Feature flag updated"
        );

        self.invalidate_snapshot().await;
        self.notify(FlagChange::updated(flag.id)).await
    }

    /// Remove a flag permanently.
    pub async fn delete(&self, id: FlagId) -> FlagResult<()> {
        let affected = self.store_call("delete", self.store.delete(id)).await?;
        if affected == 0 {
            return Err(FlagError::NotFound(id));
        }
        tracing::info!(flag_id = id, "Feature flag deleted");

        self.invalidate_snapshot().await;
        self.notify(FlagChange::deleted(id)).await
    }

    async fn read_snapshot(&self) -> Option<Vec<FeatureFlag>> {
        let key = &self.settings.snapshot_key;
        match self.cache_call(self.cache.get(key)).await {
            Ok(Some(bytes)) => match decode_snapshot(&bytes) {
                Ok(flags) => Some(flags),
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Discarding unreadable cached snapshot");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, falling back to store");
                None
            }
        }
    }

    /// Cache `flags` unless an invalidation happened after `generation` was
    /// read.
    async fn write_snapshot(&self, flags: &[FeatureFlag], generation: u64) {
        let key = &self.settings.snapshot_key;
        if self.generation.load(Ordering::SeqCst) != generation {
            tracing::debug!(key = %key, "Flags changed during read, not caching snapshot");
            return;
        }
        let bytes = match encode_snapshot(flags) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Failed to encode flag snapshot");
                return;
            }
        };

        if let Err(e) = self
            .cache_call(self.cache.set(key, bytes, self.settings.snapshot_ttl))
            .await
        {
            tracing::warn!(key = %key, error = %e, "Failed to refresh cached snapshot");
            return;
        }

        // An invalidation may have slipped in between the check and the set.
        if self.generation.load(Ordering::SeqCst) != generation {
            self.delete_snapshot().await;
        }
    }

    async fn invalidate_snapshot(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.delete_snapshot().await;
    }

    async fn delete_snapshot(&self) {
        let key = &self.settings.snapshot_key;
        if let Err(e) = self.cache_call(self.cache.delete(key)).await {
            tracing::warn!(key = %key, error = %e, "Failed to invalidate cached snapshot");
        }
    }

    async fn notify(&self, change: FlagChange) -> FlagResult<()> {
        self.notifier.dispatch(change.clone()).await.map_err(|e| {
            tracing::error!(
                flag_id = change.flag_id,
                action = %change.action,
                error = %e,
                "Failed to propagate flag change"
            );
            FlagError::from(e)
        })
    }

    async fn store_call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> FlagResult<T> {
        match timeout(self.settings.store_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!(operation, error = %e, "Store operation failed");
                Err(e.into())
            }
            Err(_) => {
                tracing::error!(operation, "Store operation timed out");
                Err(FlagError::Storage(format!(
                    "{operation} timed out after {}ms",
                    self.settings.store_timeout.as_millis()
                )))
            }
        }
    }

    async fn cache_call<T>(
        &self,
        call: impl Future<Output = Result<T, CacheError>>,
    ) -> Result<T, CacheError> {
        timeout(self.settings.cache_timeout, call)
            .await
            .unwrap_or(Err(CacheError::Timeout))
    }
}
