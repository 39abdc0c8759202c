//! Process wiring for the flag service.
//!
//! `FlagRuntime` owns every long-lived collaborator: the database pool, the
//! snapshot cache, the broker, the notification worker and the listener task.
//! It hands out a [`FlagRepository`] for request handling and tears the rest
//! down in dependency order on [`FlagRuntime::shutdown`].

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::adapters::cache::MokaSnapshotCache;
use crate::adapters::messaging::InMemoryBroker;
use crate::adapters::sqlite::{initialize_database, SqliteFlagStore};
use crate::domain::models::{Config, DeliveryMode};
use crate::services::{
    ChangeListener, DispatchStats, DispatchWorker, FlagRepository, IdempotentHandler,
    ListenerSettings, ListenerStats, NotificationDispatcher, RecordingHandler, RepositorySettings,
    RetryPolicy,
};

/// How long shutdown waits for the listener to drain before signalling it.
const LISTENER_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Final counters reported by [`FlagRuntime::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    pub dispatch: DispatchStats,
    pub listener: ListenerStats,
}

pub struct FlagRuntime {
    repository: FlagRepository,
    pool: SqlitePool,
    broker: InMemoryBroker,
    worker: Option<DispatchWorker>,
    listener: JoinHandle<ListenerStats>,
    shutdown_tx: watch::Sender<bool>,
    received: Arc<RecordingHandler>,
}

impl FlagRuntime {
    /// Open the configured database and start all background tasks.
    pub async fn start(config: &Config) -> Result<Self> {
        let pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        Self::with_pool(config, pool)
    }

    /// Start on an already migrated pool.
    ///
    /// Must be called from within a tokio runtime.
    pub fn with_pool(config: &Config, pool: SqlitePool) -> Result<Self> {
        let store = Arc::new(SqliteFlagStore::new(pool.clone()));
        let cache = Arc::new(MokaSnapshotCache::with_capacity(config.cache.max_capacity));
        let broker = InMemoryBroker::new(config.notifications.channel_capacity);

        // Subscribe before any write so the listener sees every change.
        let subscription = broker.subscribe(&config.notifications.topic);
        let publisher = Arc::new(broker.publisher(config.notifications.topic.clone()));
        let notify_timeout = Duration::from_millis(config.timeouts.notify_ms);

        let (notifier, worker) = match config.notifications.delivery {
            DeliveryMode::Strict => {
                (NotificationDispatcher::strict(publisher, notify_timeout), None)
            }
            DeliveryMode::Deferred => {
                let (dispatcher, worker) = NotificationDispatcher::deferred_with_capacity(
                    publisher,
                    RetryPolicy::from(&config.notifications),
                    notify_timeout,
                    config.notifications.channel_capacity,
                );
                (dispatcher, Some(worker))
            }
        };

        let received = Arc::new(RecordingHandler::new());
        let handler = IdempotentHandler::from_config(received.clone(), &config.notifications);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener = tokio::spawn(
            ChangeListener::new(
                subscription,
                Arc::new(handler),
                ListenerSettings::from(&config.notifications),
            )
            .listen(shutdown_rx),
        );

        let repository =
            FlagRepository::new(store, cache, notifier, RepositorySettings::from(config));

        tracing::info!(
            delivery = ?config.notifications.delivery,
            ack_mode = ?config.notifications.ack_mode,
            topic = %config.notifications.topic,
            "Flag runtime started"
        );

        Ok(Self {
            repository,
            pool,
            broker,
            worker,
            listener,
            shutdown_tx,
            received,
        })
    }

    /// Repository for request handling.
    ///
    /// Clones must be dropped before [`shutdown`](Self::shutdown), which
    /// otherwise waits for them to release the notification queue.
    pub fn repository(&self) -> &FlagRepository {
        &self.repository
    }

    /// Distinct changes the in-process listener has handled so far.
    pub fn notifications_received(&self) -> u64 {
        self.received.received()
    }

    /// Flush pending notifications, stop the listener and close the pool.
    pub async fn shutdown(self) -> ShutdownReport {
        let Self {
            repository,
            pool,
            broker,
            worker,
            mut listener,
            shutdown_tx,
            received: _,
        } = self;

        drop(repository);
        let dispatch = match worker {
            Some(worker) => worker.join().await,
            None => DispatchStats::default(),
        };

        broker.close();
        let drained = tokio::time::timeout(LISTENER_DRAIN_TIMEOUT, &mut listener).await;
        let listener_stats = match drained {
            Ok(joined) => joined.unwrap_or_else(|e| {
                tracing::error!(error = %e, "Listener task terminated abnormally");
                ListenerStats::default()
            }),
            Err(_) => {
                tracing::warn!("Listener did not drain in time, signalling shutdown");
                let _ = shutdown_tx.send(true);
                listener.await.unwrap_or_default()
            }
        };

        pool.close().await;

        tracing::info!(
            delivered = dispatch.delivered,
            abandoned = dispatch.abandoned,
            handled = listener_stats.handled,
            "Flag runtime stopped"
        );

        ShutdownReport {
            dispatch,
            listener: listener_stats,
        }
    }
}
